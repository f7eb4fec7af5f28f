// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use saldo::application::BillingService;
use saldo::upstream::{AccountSnapshot, FetchError, SnapshotFetcher};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BillingService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = BillingService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// A whole-second timestamp n days in the past.
pub fn days_ago(n: i64) -> DateTime<Utc> {
    (Utc::now() - Duration::days(n)).with_nanosecond(0).unwrap()
}

/// A whole-second timestamp n days in the future.
pub fn days_ahead(n: i64) -> DateTime<Utc> {
    (Utc::now() + Duration::days(n)).with_nanosecond(0).unwrap()
}

/// Build an account snapshot with the given price and expiration.
pub fn snapshot(price: i64, expiration: DateTime<Utc>) -> AccountSnapshot {
    AccountSnapshot {
        full_name: "Aram Khalil".into(),
        mobile_number: "07701234567".into(),
        agent_name: "north-branch".into(),
        account_name: "fiber-50".into(),
        account_price: price,
        expiration,
    }
}

/// In-memory snapshot fetcher backed by a map of username -> snapshot.
/// Usernames without an entry fail the token exchange, which lets a single
/// fetcher serve both success and failure paths in one test.
pub struct StaticFetcher {
    snapshots: Mutex<HashMap<String, AccountSnapshot>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub fn with(username: &str, snapshot: AccountSnapshot) -> Self {
        let fetcher = Self::new();
        fetcher.set(username, snapshot);
        fetcher
    }

    /// Insert or replace the snapshot served for a username.
    pub fn set(&self, username: &str, snapshot: AccountSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(username.to_string(), snapshot);
    }
}

#[async_trait]
impl SnapshotFetcher for StaticFetcher {
    async fn fetch_account_snapshot(
        &self,
        username: &str,
        _credentials: &str,
    ) -> Result<AccountSnapshot, FetchError> {
        self.snapshots
            .lock()
            .unwrap()
            .get(username)
            .cloned()
            .ok_or_else(|| FetchError::Auth {
                username: username.to_string(),
            })
    }
}

/// Test fixture: an owner with one registered customer
pub struct SeededLedger;

impl SeededLedger {
    /// Create owner "vantage" with customer "aram.k" (price 25000, expires in
    /// 30 days, zero debt).
    pub async fn create_basic(service: &BillingService) -> Result<StaticFetcher> {
        service.create_owner("vantage".into()).await?;

        let fetcher = StaticFetcher::with("aram.k", snapshot(25000, days_ahead(30)));
        service
            .register_customer("vantage", "aram.k".into(), "secret".into(), 0, &fetcher)
            .await?;

        Ok(fetcher)
    }
}
