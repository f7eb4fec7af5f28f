use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Amount;

/// Aggregate statistics for a single owner's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerStatistics {
    pub owner: String,
    pub total_customers: i64,
    pub customers_in_debt: i64,
    pub total_debt: Amount,
    pub total_payments: Amount,
}

/// A renewal charge applied during a reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewedCustomer {
    pub username: String,
    pub charged: Amount,
    pub new_exp_date: DateTime<Utc>,
}

/// A customer whose upstream fetch failed during reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileFailure {
    pub username: String,
    pub error: String,
}

/// Outcome of one reconciliation pass. A customer lands in exactly one
/// bucket: renewed, unchanged (upstream expiration identical or renewal
/// already applied concurrently), or failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub renewed: Vec<RenewedCustomer>,
    pub unchanged: usize,
    pub failures: Vec<ReconcileFailure>,
}
