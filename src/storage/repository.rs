use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{Amount, Customer, Owner, OwnerId, Payment};

use super::MIGRATION_001_INITIAL;

/// Aggregate counters for a single owner's ledger.
#[derive(Debug, Clone)]
pub struct OwnerAggregates {
    pub total_customers: i64,
    pub customers_in_debt: i64,
    pub total_debt: Amount,
    pub total_payments: Amount,
}

/// Repository for persisting and querying owners, customers and payments.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Owner operations
    // ========================

    /// Save a new owner to the database.
    pub async fn save_owner(&self, owner: &Owner) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO owners (id, name, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(owner.id.to_string())
        .bind(&owner.name)
        .bind(owner.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save owner")?;
        Ok(())
    }

    /// Get an owner by name.
    pub async fn get_owner_by_name(&self, name: &str) -> Result<Option<Owner>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, created_at
            FROM owners
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch owner by name")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_owner(&row)?)),
            None => Ok(None),
        }
    }

    /// List all owners.
    pub async fn list_owners(&self) -> Result<Vec<Owner>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM owners ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list owners")?;

        rows.iter().map(Self::row_to_owner).collect()
    }

    fn row_to_owner(row: &sqlx::sqlite::SqliteRow) -> Result<Owner> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Owner {
            id: Uuid::parse_str(&id_str).context("Invalid owner ID")?,
            name: row.get("name"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Customer operations
    // ========================

    /// Save a new customer to the database.
    pub async fn save_customer(&self, customer: &Customer) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (username, owner_id, name, mobile_number, agent_name, account_name, account_price, debt_amount, exp_date, credentials, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&customer.username)
        .bind(customer.owner_id.to_string())
        .bind(&customer.name)
        .bind(&customer.mobile_number)
        .bind(&customer.agent_name)
        .bind(&customer.account_name)
        .bind(customer.account_price)
        .bind(customer.debt_amount)
        .bind(customer.exp_date.to_rfc3339())
        .bind(&customer.credentials)
        .bind(customer.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save customer")?;
        Ok(())
    }

    /// Get a customer by username.
    pub async fn get_customer(&self, username: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT username, owner_id, name, mobile_number, agent_name, account_name, account_price, debt_amount, exp_date, credentials, created_at
            FROM customers
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch customer")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_customer(&row)?)),
            None => Ok(None),
        }
    }

    /// List an owner's customers with optional filters.
    pub async fn list_customers_filtered(
        &self,
        owner_id: OwnerId,
        username: Option<&str>,
        name: Option<&str>,
        agent_name: Option<&str>,
    ) -> Result<Vec<Customer>> {
        // Build query dynamically based on filters
        let mut query = String::from(
            "SELECT username, owner_id, name, mobile_number, agent_name, account_name, account_price, debt_amount, exp_date, credentials, created_at FROM customers WHERE owner_id = ?"
        );

        if username.is_some() {
            query.push_str(" AND username = ?");
        }
        if name.is_some() {
            query.push_str(" AND name = ?");
        }
        if agent_name.is_some() {
            query.push_str(" AND agent_name = ?");
        }

        query.push_str(" ORDER BY username");

        let owner_id_str = owner_id.to_string();
        let mut sql_query = sqlx::query(&query).bind(&owner_id_str);

        if let Some(u) = username {
            sql_query = sql_query.bind(u);
        }
        if let Some(n) = name {
            sql_query = sql_query.bind(n);
        }
        if let Some(a) = agent_name {
            sql_query = sql_query.bind(a);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    /// List customers whose billing period has lapsed, oldest expiration
    /// first, optionally scoped to a single owner.
    pub async fn list_expired_customers(
        &self,
        owner_id: Option<OwnerId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Customer>> {
        let now_str = now.to_rfc3339();

        let rows = match owner_id {
            Some(id) => {
                sqlx::query(
                    r#"
                    SELECT username, owner_id, name, mobile_number, agent_name, account_name, account_price, debt_amount, exp_date, credentials, created_at
                    FROM customers
                    WHERE exp_date < ? AND owner_id = ?
                    ORDER BY exp_date
                    "#,
                )
                .bind(&now_str)
                .bind(id.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT username, owner_id, name, mobile_number, agent_name, account_name, account_price, debt_amount, exp_date, credentials, created_at
                    FROM customers
                    WHERE exp_date < ?
                    ORDER BY exp_date
                    "#,
                )
                .bind(&now_str)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to list expired customers")?;

        rows.iter().map(Self::row_to_customer).collect()
    }

    /// Update a customer's profile fields from a fresh snapshot.
    /// The balance and expiration are left untouched.
    pub async fn update_customer_profile(
        &self,
        username: &str,
        name: &str,
        mobile_number: &str,
        agent_name: &str,
        account_name: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE customers
            SET name = ?, mobile_number = ?, agent_name = ?, account_name = ?
            WHERE username = ?
            "#,
        )
        .bind(name)
        .bind(mobile_number)
        .bind(agent_name)
        .bind(account_name)
        .bind(username)
        .execute(&self.pool)
        .await
        .context("Failed to update customer profile")?;
        Ok(())
    }

    /// Apply a signed delta to a customer's debt balance and return the new
    /// balance. The read-modify-write happens inside a single UPDATE so
    /// concurrent adjustments serialize in the store.
    pub async fn adjust_debt(&self, username: &str, delta: Amount) -> Result<Amount> {
        let row = sqlx::query(
            r#"
            UPDATE customers
            SET debt_amount = debt_amount + ?
            WHERE username = ?
            RETURNING debt_amount
            "#,
        )
        .bind(delta)
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .context("Failed to adjust debt")?;

        Ok(row.get("debt_amount"))
    }

    /// Decrement the balance and append the payment log entry in one
    /// transaction, returning the new balance.
    pub async fn apply_payment(&self, payment: &Payment, amount: Amount) -> Result<Amount> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin payment transaction")?;

        let row = sqlx::query(
            r#"
            UPDATE customers
            SET debt_amount = debt_amount - ?
            WHERE username = ?
            RETURNING debt_amount
            "#,
        )
        .bind(amount)
        .bind(&payment.customer_username)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to apply payment to balance")?;

        let new_balance: Amount = row.get("debt_amount");

        sqlx::query(
            r#"
            INSERT INTO payments (id, customer_username, amount, payment_date)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(payment.id.to_string())
        .bind(&payment.customer_username)
        .bind(payment.amount)
        .bind(payment.payment_date.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save payment")?;

        tx.commit()
            .await
            .context("Failed to commit payment transaction")?;

        Ok(new_balance)
    }

    /// Charge a billing-period renewal: add the snapshot price to the balance
    /// and roll expiration and price forward, guarded on the expiration still
    /// matching the value this run observed. Returns false when another run
    /// already applied the renewal.
    pub async fn apply_renewal(
        &self,
        username: &str,
        price: Amount,
        new_exp: DateTime<Utc>,
        expected_exp: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET debt_amount = debt_amount + ?, exp_date = ?, account_price = ?
            WHERE username = ? AND exp_date = ?
            "#,
        )
        .bind(price)
        .bind(new_exp.to_rfc3339())
        .bind(price)
        .bind(username)
        .bind(expected_exp.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to apply renewal")?;

        Ok(result.rows_affected() > 0)
    }

    fn row_to_customer(row: &sqlx::sqlite::SqliteRow) -> Result<Customer> {
        let owner_id_str: String = row.get("owner_id");
        let exp_date_str: String = row.get("exp_date");
        let created_at_str: String = row.get("created_at");

        Ok(Customer {
            username: row.get("username"),
            owner_id: Uuid::parse_str(&owner_id_str).context("Invalid owner ID")?,
            name: row.get("name"),
            mobile_number: row.get("mobile_number"),
            agent_name: row.get("agent_name"),
            account_name: row.get("account_name"),
            account_price: row.get("account_price"),
            debt_amount: row.get("debt_amount"),
            exp_date: DateTime::parse_from_rfc3339(&exp_date_str)
                .context("Invalid exp_date timestamp")?
                .with_timezone(&Utc),
            credentials: row.get("credentials"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Payment operations
    // ========================

    /// List payments for a customer, oldest first.
    pub async fn list_payments_for_customer(&self, username: &str) -> Result<Vec<Payment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_username, amount, payment_date
            FROM payments
            WHERE customer_username = ?
            ORDER BY payment_date
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list payments")?;

        rows.iter().map(Self::row_to_payment).collect()
    }

    fn row_to_payment(row: &sqlx::sqlite::SqliteRow) -> Result<Payment> {
        let id_str: String = row.get("id");
        let payment_date_str: String = row.get("payment_date");

        Ok(Payment {
            id: Uuid::parse_str(&id_str).context("Invalid payment ID")?,
            customer_username: row.get("customer_username"),
            amount: row.get("amount"),
            payment_date: DateTime::parse_from_rfc3339(&payment_date_str)
                .context("Invalid payment_date timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Aggregate queries
    // ========================

    /// Compute an owner's ledger aggregates using SQL aggregation.
    /// Sums default to zero when the owner has no customers or payments.
    pub async fn owner_aggregates(&self, owner_id: OwnerId) -> Result<OwnerAggregates> {
        let owner_id_str = owner_id.to_string();

        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total_customers,
                COALESCE(SUM(CASE WHEN debt_amount > 0 THEN 1 ELSE 0 END), 0) as customers_in_debt,
                COALESCE(SUM(debt_amount), 0) as total_debt
            FROM customers
            WHERE owner_id = ?
            "#,
        )
        .bind(&owner_id_str)
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute owner aggregates")?;

        let total_payments: Amount = sqlx::query(
            r#"
            SELECT COALESCE(SUM(p.amount), 0) as total
            FROM payments p
            JOIN customers c ON c.username = p.customer_username
            WHERE c.owner_id = ?
            "#,
        )
        .bind(&owner_id_str)
        .fetch_one(&self.pool)
        .await
        .context("Failed to sum payments")?
        .get("total");

        Ok(OwnerAggregates {
            total_customers: row.get("total_customers"),
            customers_in_debt: row.get("customers_in_debt"),
            total_debt: row.get("total_debt"),
            total_payments,
        })
    }

    /// List the distinct agent names across an owner's customers.
    pub async fn distinct_agents(&self, owner_id: OwnerId) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT agent_name
            FROM customers
            WHERE owner_id = ? AND agent_name != ''
            "#,
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list distinct agents")?;

        Ok(rows.iter().map(|row| row.get("agent_name")).collect())
    }
}
