use chrono::Utc;

use crate::domain::{parse_amount, Amount, Customer, Owner, Payment};
use crate::storage::Repository;
use crate::upstream::SnapshotFetcher;

use super::{AppError, OwnerStatistics, ReconcileFailure, ReconcileReport, RenewedCustomer};

/// Application service providing high-level operations for the debt ledger.
/// This is the primary interface for any client (CLI, API, etc.).
pub struct BillingService {
    repo: Repository,
}

/// Result of registering a payment
#[derive(Debug)]
pub struct PaymentResult {
    pub payment: Payment,
    pub new_balance: Amount,
}

/// Filter for querying an owner's customers
#[derive(Default)]
pub struct CustomerFilter {
    pub username: Option<String>,
    pub name: Option<String>,
    pub agent_name: Option<String>,
}

impl BillingService {
    /// Create a new billing service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Owner operations
    // ========================

    /// Create a new owner.
    pub async fn create_owner(&self, name: String) -> Result<Owner, AppError> {
        if self.repo.get_owner_by_name(&name).await?.is_some() {
            return Err(AppError::OwnerAlreadyExists(name));
        }

        let owner = Owner::new(name);
        self.repo.save_owner(&owner).await?;
        Ok(owner)
    }

    /// Get an owner by name.
    pub async fn get_owner(&self, name: &str) -> Result<Owner, AppError> {
        self.repo
            .get_owner_by_name(name)
            .await?
            .ok_or_else(|| AppError::OwnerNotFound(name.to_string()))
    }

    /// List all owners.
    pub async fn list_owners(&self) -> Result<Vec<Owner>, AppError> {
        Ok(self.repo.list_owners().await?)
    }

    // ========================
    // Customer operations
    // ========================

    /// Register a new customer under an owner. The profile, price and
    /// expiration are populated from a fresh upstream snapshot; nothing is
    /// persisted when validation or the fetch fails.
    pub async fn register_customer(
        &self,
        owner_name: &str,
        username: String,
        credentials: String,
        initial_debt: Amount,
        fetcher: &dyn SnapshotFetcher,
    ) -> Result<Customer, AppError> {
        let owner = self.get_owner(owner_name).await?;

        if self.repo.get_customer(&username).await?.is_some() {
            return Err(AppError::CustomerAlreadyExists(username));
        }

        let snapshot = fetcher
            .fetch_account_snapshot(&username, &credentials)
            .await
            .map_err(|e| AppError::Upstream {
                username: username.clone(),
                message: e.to_string(),
            })?;

        let customer =
            Customer::from_snapshot(username, owner.id, credentials, initial_debt, &snapshot);
        self.repo.save_customer(&customer).await?;
        Ok(customer)
    }

    /// Get a customer, verifying it belongs to the given owner.
    pub async fn get_customer(
        &self,
        owner_name: &str,
        username: &str,
    ) -> Result<Customer, AppError> {
        let owner = self.get_owner(owner_name).await?;

        let customer = self
            .repo
            .get_customer(username)
            .await?
            .ok_or_else(|| AppError::CustomerNotFound(username.to_string()))?;

        if customer.owner_id != owner.id {
            return Err(AppError::OwnerMismatch {
                username: username.to_string(),
                owner: owner_name.to_string(),
            });
        }

        Ok(customer)
    }

    /// List an owner's customers with optional filters.
    /// An empty result set is reported as not-found, with a message distinct
    /// from the missing-owner case.
    pub async fn list_customers(
        &self,
        owner_name: &str,
        filter: CustomerFilter,
    ) -> Result<Vec<Customer>, AppError> {
        let owner = self.get_owner(owner_name).await?;

        let customers = self
            .repo
            .list_customers_filtered(
                owner.id,
                filter.username.as_deref(),
                filter.name.as_deref(),
                filter.agent_name.as_deref(),
            )
            .await?;

        if customers.is_empty() {
            return Err(AppError::NoCustomersFound(owner_name.to_string()));
        }

        Ok(customers)
    }

    /// Refresh a customer's profile fields from a fresh upstream snapshot.
    /// The balance and expiration are not touched.
    pub async fn refresh_customer(
        &self,
        owner_name: &str,
        username: &str,
        fetcher: &dyn SnapshotFetcher,
    ) -> Result<Customer, AppError> {
        let customer = self.get_customer(owner_name, username).await?;

        let snapshot = fetcher
            .fetch_account_snapshot(&customer.username, &customer.credentials)
            .await
            .map_err(|e| AppError::Upstream {
                username: username.to_string(),
                message: e.to_string(),
            })?;

        self.repo
            .update_customer_profile(
                &customer.username,
                &snapshot.full_name,
                &snapshot.mobile_number,
                &snapshot.agent_name,
                &snapshot.account_name,
            )
            .await?;

        self.get_customer(owner_name, username).await
    }

    // ========================
    // Debt/payment operations
    // ========================

    /// Register a debt: add the amount to the customer's balance.
    /// Returns the new balance. Validation failures leave the balance
    /// untouched.
    pub async fn register_debt(
        &self,
        owner_name: &str,
        username: &str,
        amount: &str,
    ) -> Result<Amount, AppError> {
        let customer = self.get_customer(owner_name, username).await?;
        let amount =
            parse_amount(amount).map_err(|_| AppError::InvalidAmount(amount.to_string()))?;

        Ok(self.repo.adjust_debt(&customer.username, amount).await?)
    }

    /// Register a payment: subtract the amount from the customer's balance
    /// and append exactly one payment record carrying the unsigned amount.
    pub async fn register_payment(
        &self,
        owner_name: &str,
        username: &str,
        amount: &str,
    ) -> Result<PaymentResult, AppError> {
        let customer = self.get_customer(owner_name, username).await?;
        let amount =
            parse_amount(amount).map_err(|_| AppError::InvalidAmount(amount.to_string()))?;

        let payment = Payment::new(customer.username.clone(), amount);
        let new_balance = self.repo.apply_payment(&payment, amount).await?;

        Ok(PaymentResult {
            payment,
            new_balance,
        })
    }

    /// List a customer's payment history.
    pub async fn list_payments(
        &self,
        owner_name: &str,
        username: &str,
    ) -> Result<Vec<Payment>, AppError> {
        let customer = self.get_customer(owner_name, username).await?;
        Ok(self
            .repo
            .list_payments_for_customer(&customer.username)
            .await?)
    }

    // ========================
    // Query operations
    // ========================

    /// Aggregate statistics for an owner. All counts and sums are zero when
    /// the owner has no customers.
    pub async fn owner_statistics(&self, owner_name: &str) -> Result<OwnerStatistics, AppError> {
        let owner = self.get_owner(owner_name).await?;
        let aggregates = self.repo.owner_aggregates(owner.id).await?;

        Ok(OwnerStatistics {
            owner: owner.name,
            total_customers: aggregates.total_customers,
            customers_in_debt: aggregates.customers_in_debt,
            total_debt: aggregates.total_debt,
            total_payments: aggregates.total_payments,
        })
    }

    /// Distinct agent names across an owner's customers. Order is not
    /// guaranteed.
    pub async fn unique_agents(&self, owner_name: &str) -> Result<Vec<String>, AppError> {
        let owner = self.get_owner(owner_name).await?;
        Ok(self.repo.distinct_agents(owner.id).await?)
    }

    // ========================
    // Reconciliation
    // ========================

    /// Reconcile expired customers against the upstream billing API,
    /// optionally scoped to a single owner.
    ///
    /// A customer is charged the snapshot's price only when the upstream
    /// expiration has rolled past the stored one; the charge goes through a
    /// conditional update guarded on the stored expiration, so a concurrent
    /// pass that already applied the renewal turns this one into a no-op.
    /// A failed fetch aborts that customer only; the pass continues.
    pub async fn reconcile(
        &self,
        owner_name: Option<&str>,
        fetcher: &dyn SnapshotFetcher,
    ) -> Result<ReconcileReport, AppError> {
        let owner_id = match owner_name {
            Some(name) => Some(self.get_owner(name).await?.id),
            None => None,
        };

        let expired = self
            .repo
            .list_expired_customers(owner_id, Utc::now())
            .await?;

        log::info!("Reconciling {} expired customer(s)", expired.len());

        let mut report = ReconcileReport {
            checked: expired.len(),
            ..Default::default()
        };

        for customer in expired {
            let snapshot = match fetcher
                .fetch_account_snapshot(&customer.username, &customer.credentials)
                .await
            {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    log::warn!("Upstream fetch failed for {}: {}", customer.username, err);
                    report.failures.push(ReconcileFailure {
                        username: customer.username,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            if snapshot.expiration == customer.exp_date {
                // Same billing period upstream, nothing to charge.
                report.unchanged += 1;
                continue;
            }

            let applied = self
                .repo
                .apply_renewal(
                    &customer.username,
                    snapshot.account_price,
                    snapshot.expiration,
                    customer.exp_date,
                )
                .await?;

            if applied {
                log::info!(
                    "Renewed {}: charged {} until {}",
                    customer.username,
                    snapshot.account_price,
                    snapshot.expiration
                );
                report.renewed.push(RenewedCustomer {
                    username: customer.username,
                    charged: snapshot.account_price,
                    new_exp_date: snapshot.expiration,
                });
            } else {
                // A concurrent pass rolled the expiration first.
                report.unchanged += 1;
            }
        }

        Ok(report)
    }
}
