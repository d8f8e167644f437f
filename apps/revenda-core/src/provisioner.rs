//! Outbound panel integration.
//!
//! The panel (Marzban/X-UI style) is a collaborator: the core only needs to
//! create/toggle/remove accounts and read usage counters. Everything else
//! about the panel protocol stays behind this trait.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct PanelAccount {
    pub id: i64,
    pub username: String,
}

#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn create_account(
        &self,
        username: &str,
        traffic_limit_bytes: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PanelAccount>;

    async fn set_enabled(&self, username: &str, enabled: bool) -> Result<()>;

    async fn remove_account(&self, username: &str) -> Result<()>;

    /// Cumulative bytes used per account, as the panel reports them.
    async fn fetch_usage(&self, usernames: &[String]) -> Result<HashMap<String, i64>>;
}

#[derive(Clone)]
pub struct PanelProvisioner {
    client: Client,
    base_url: String,
    auth_token: String,
}

#[derive(Serialize)]
struct CreateAccountRequest<'a> {
    username: &'a str,
    traffic_limit_bytes: i64,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct SetEnabledRequest {
    enabled: bool,
}

#[derive(Deserialize)]
struct UsageResponse {
    usage: HashMap<String, i64>,
}

impl PanelProvisioner {
    pub fn new(base_url: String, auth_token: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            auth_token,
        }
    }
}

#[async_trait]
impl Provisioner for PanelProvisioner {
    async fn create_account(
        &self,
        username: &str,
        traffic_limit_bytes: i64,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<PanelAccount> {
        let url = format!("{}/api/accounts", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(&CreateAccountRequest {
                username,
                traffic_limit_bytes,
                expires_at,
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn set_enabled(&self, username: &str, enabled: bool) -> Result<()> {
        let url = format!("{}/api/accounts/{}/enabled", self.base_url, username);
        self.client
            .put(&url)
            .bearer_auth(&self.auth_token)
            .json(&SetEnabledRequest { enabled })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn remove_account(&self, username: &str) -> Result<()> {
        let url = format!("{}/api/accounts/{}", self.base_url, username);
        self.client
            .delete(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn fetch_usage(&self, usernames: &[String]) -> Result<HashMap<String, i64>> {
        let url = format!("{}/api/accounts/usage", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(&usernames)
            .send()
            .await?
            .error_for_status()?;
        let body: UsageResponse = response.json().await?;
        Ok(body.usage)
    }
}
