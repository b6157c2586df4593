//! Linked VK accounts of a Telegram user.

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Tokens within this many seconds of expiry are refreshed before use.
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// Connection health.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VkStatus {
    #[default]
    Active,
    /// Refresh failed; the user must authorize again.
    ReauthRequired,
}

/// One linked VK account and its token material.
#[derive(Clone, Serialize, Deserialize)]
pub struct VkAccount {
    pub vk_user_id: i64,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub device_id: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub status: VkStatus,
    #[serde(default = "Utc::now")]
    pub linked_at: DateTime<Utc>,
}

// Token material stays out of logs.
impl std::fmt::Debug for VkAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VkAccount")
            .field("vk_user_id", &self.vk_user_id)
            .field("display_name", &self.display_name)
            .field("expires_at", &self.expires_at)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl VkAccount {
    /// Whether the access token must be refreshed before use at `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= Duration::seconds(REFRESH_MARGIN_SECS)
    }

    /// Replace token material after a successful refresh.
    ///
    /// VK may omit a new refresh token; the old one is kept then.
    pub fn apply_refresh(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) {
        self.access_token = access_token;
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.expires_at = expires_at;
        self.status = VkStatus::Active;
    }
}

/// All VK accounts linked by one Telegram user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VkConnections {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Telegram user ID (indexed)
    pub telegram_user_id: i64,

    #[serde(default)]
    pub accounts: Vec<VkAccount>,
}

impl VkConnections {
    pub fn new(telegram_user_id: i64) -> Self {
        Self {
            id: None,
            telegram_user_id,
            accounts: Vec::new(),
        }
    }

    pub fn account(&self, vk_user_id: i64) -> Option<&VkAccount> {
        self.accounts.iter().find(|a| a.vk_user_id == vk_user_id)
    }

    pub fn account_mut(&mut self, vk_user_id: i64) -> Option<&mut VkAccount> {
        self.accounts.iter_mut().find(|a| a.vk_user_id == vk_user_id)
    }

    /// Insert or replace an account. Returns true if it was new.
    pub fn upsert_account(&mut self, account: VkAccount) -> bool {
        if let Some(existing) = self.account_mut(account.vk_user_id) {
            *existing = account;
            false
        } else {
            self.accounts.push(account);
            true
        }
    }

    /// Remove an account. Returns it if it was linked.
    pub fn remove_account(&mut self, vk_user_id: i64) -> Option<VkAccount> {
        let pos = self.accounts.iter().position(|a| a.vk_user_id == vk_user_id)?;
        Some(self.accounts.remove(pos))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn account(vk_user_id: i64, expires_at: DateTime<Utc>) -> VkAccount {
        VkAccount {
            vk_user_id,
            access_token: format!("access-{vk_user_id}"),
            refresh_token: Some(format!("refresh-{vk_user_id}")),
            device_id: "device".to_string(),
            expires_at,
            email: None,
            display_name: format!("User {vk_user_id}"),
            status: VkStatus::Active,
            linked_at: Utc::now(),
        }
    }

    #[test]
    fn test_refresh_window() {
        let now = Utc::now();
        assert!(account(1, now + Duration::seconds(299)).needs_refresh(now));
        assert!(account(1, now + Duration::seconds(300)).needs_refresh(now));
        assert!(account(1, now - Duration::seconds(10)).needs_refresh(now));
        assert!(!account(1, now + Duration::seconds(301)).needs_refresh(now));
    }

    #[test]
    fn test_upsert_replaces_same_account() {
        let now = Utc::now();
        let mut conns = VkConnections::new(7);
        assert!(conns.upsert_account(account(1, now)));
        assert!(conns.upsert_account(account(2, now)));

        let mut relinked = account(1, now);
        relinked.access_token = "fresh".to_string();
        assert!(!conns.upsert_account(relinked));

        assert_eq!(conns.accounts.len(), 2);
        assert_eq!(conns.account(1).map(|a| a.access_token.as_str()), Some("fresh"));
    }

    #[test]
    fn test_apply_refresh_keeps_old_refresh_token_when_omitted() {
        let now = Utc::now();
        let mut acc = account(1, now);
        acc.status = VkStatus::ReauthRequired;
        acc.apply_refresh("new".to_string(), None, now + Duration::hours(1));

        assert_eq!(acc.access_token, "new");
        assert_eq!(acc.refresh_token.as_deref(), Some("refresh-1"));
        assert_eq!(acc.status, VkStatus::Active);
    }

    #[test]
    fn test_remove_account() {
        let mut conns = VkConnections::new(7);
        conns.upsert_account(account(1, Utc::now()));
        assert!(conns.remove_account(1).is_some());
        assert!(conns.remove_account(1).is_none());
    }

    #[test]
    fn test_debug_hides_tokens() {
        let acc = account(5, Utc::now());
        let out = format!("{acc:?}");
        assert!(!out.contains("access-5"));
        assert!(!out.contains("refresh-5"));
    }
}
