use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Amount, OwnerId};
use crate::upstream::AccountSnapshot;

/// A billed prepaid account, identified by its upstream username and tracking
/// a signed debt balance against the subscription price.
///
/// `debt_amount` is positive when the customer owes money, negative on
/// overpayment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub username: String,
    pub owner_id: OwnerId,
    pub name: String,
    pub mobile_number: String,
    pub agent_name: String,
    pub account_name: String,
    pub account_price: Amount,
    pub debt_amount: Amount,
    pub exp_date: DateTime<Utc>,
    pub credentials: String,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Build a customer from a freshly fetched account snapshot.
    pub fn from_snapshot(
        username: String,
        owner_id: OwnerId,
        credentials: String,
        initial_debt: Amount,
        snapshot: &AccountSnapshot,
    ) -> Self {
        Self {
            username,
            owner_id,
            name: snapshot.full_name.clone(),
            mobile_number: snapshot.mobile_number.clone(),
            agent_name: snapshot.agent_name.clone(),
            account_name: snapshot.account_name.clone(),
            account_price: snapshot.account_price,
            debt_amount: initial_debt,
            exp_date: snapshot.expiration,
            credentials,
            created_at: Utc::now(),
        }
    }

    /// True when the billing period has lapsed and the customer is due for
    /// reconciliation against the upstream account.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp_date < now
    }

    pub fn in_debt(&self) -> bool {
        self.debt_amount > 0
    }
}
