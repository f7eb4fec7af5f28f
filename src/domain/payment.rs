use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Amount;

pub type PaymentId = Uuid;

/// An append-only audit record of a registered payment. Never updated or
/// deleted; `amount` is always the unsigned value of the payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub customer_username: String,
    pub amount: Amount,
    pub payment_date: DateTime<Utc>,
}

impl Payment {
    pub fn new(customer_username: String, amount: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_username,
            amount: amount.abs(),
            payment_date: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_amount_is_unsigned() {
        let payment = Payment::new("aram.k".into(), -5000);
        assert_eq!(payment.amount, 5000);

        let payment = Payment::new("aram.k".into(), 5000);
        assert_eq!(payment.amount, 5000);
    }
}
