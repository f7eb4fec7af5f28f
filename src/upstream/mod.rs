//! Client for the upstream subscription billing API.
//!
//! The upstream exposes a two-step exchange: a token request authenticated
//! with the customer's stored credentials, then an account-data request with
//! the bearer token. Numeric prices arrive as locale-formatted strings
//! ("25,000 IQD") and expirations in a fixed textual format with a trailing
//! marker character, so both are normalized here before they reach the rest
//! of the crate.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::Amount;

/// Point-in-time account data fetched from the upstream billing API.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub full_name: String,
    pub mobile_number: String,
    pub agent_name: String,
    pub account_name: String,
    pub account_price: Amount,
    pub expiration: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token exchange rejected for {username}")]
    Auth { username: String },

    #[error("malformed {field} in upstream response: {value:?}")]
    Malformed { field: &'static str, value: String },
}

/// Capability to fetch a fresh account snapshot for a customer.
/// The production implementation is [`HttpSnapshotFetcher`]; tests substitute
/// in-memory stubs.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch_account_snapshot(
        &self,
        username: &str,
        credentials: &str,
    ) -> Result<AccountSnapshot, FetchError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct AccountResponse {
    full_name: String,
    mobile: String,
    agent: String,
    account_name: String,
    price: String,
    expiration: String,
}

/// Reqwest-backed fetcher speaking the upstream's token-then-data exchange.
pub struct HttpSnapshotFetcher {
    base: String,
    client: Client,
}

impl HttpSnapshotFetcher {
    pub fn new(base: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn request_token(&self, username: &str, credentials: &str) -> Result<String, FetchError> {
        let url = format!("{}/api/auth/token", self.base);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "username": username,
                "password": credentials,
            }))
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(FetchError::Auth {
                username: username.to_string(),
            });
        }

        let token: TokenResponse = resp.error_for_status()?.json().await?;
        Ok(token.token)
    }
}

#[async_trait]
impl SnapshotFetcher for HttpSnapshotFetcher {
    async fn fetch_account_snapshot(
        &self,
        username: &str,
        credentials: &str,
    ) -> Result<AccountSnapshot, FetchError> {
        let token = self.request_token(username, credentials).await?;

        let url = format!("{}/api/account", self.base);
        let account: AccountResponse = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(AccountSnapshot {
            full_name: account.full_name,
            mobile_number: account.mobile,
            agent_name: account.agent,
            account_name: account.account_name,
            account_price: parse_price(&account.price)?,
            expiration: parse_expiration(&account.expiration)?,
        })
    }
}

/// Parse a locale-formatted price string into whole currency units.
/// Strips thousands separators and a trailing currency suffix:
/// "25,000 IQD" -> 25000.
pub fn parse_price(raw: &str) -> Result<Amount, FetchError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let end = cleaned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(cleaned.len());
    let digits = &cleaned[..end];

    digits.parse().map_err(|_| FetchError::Malformed {
        field: "price",
        value: raw.to_string(),
    })
}

/// Parse an upstream expiration string into a UTC timestamp.
/// The upstream appends a trailing marker character to the fixed
/// "YYYY-MM-DD HH:MM:SS" form; it is stripped before parsing.
pub fn parse_expiration(raw: &str) -> Result<DateTime<Utc>, FetchError> {
    let trimmed = raw.trim().trim_end_matches(|c: char| !c.is_ascii_digit());

    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .map_err(|_| FetchError::Malformed {
            field: "expiration",
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_strips_separators_and_suffix() {
        assert_eq!(parse_price("25,000 IQD").unwrap(), 25000);
        assert_eq!(parse_price("1,234,567IQD").unwrap(), 1234567);
        assert_eq!(parse_price("500").unwrap(), 500);
        assert_eq!(parse_price(" 35,000 ").unwrap(), 35000);
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        assert!(parse_price("IQD").is_err());
        assert!(parse_price("").is_err());
        assert!(parse_price("free").is_err());
    }

    #[test]
    fn test_parse_expiration_strips_trailing_marker() {
        let dt = parse_expiration("2026-09-01 00:00:00.").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-09-01T00:00:00+00:00");

        let dt = parse_expiration("2025-12-31 23:59:59").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-12-31T23:59:59+00:00");
    }

    #[test]
    fn test_parse_expiration_rejects_other_formats() {
        assert!(parse_expiration("2026/09/01").is_err());
        assert!(parse_expiration("next month").is_err());
        assert!(parse_expiration("").is_err());
    }
}
