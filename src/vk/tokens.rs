//! Lazy access-token refresh.
//!
//! Expiry is checked only when a token is about to be used. A token inside
//! the refresh margin is refreshed first; if that is impossible the account
//! is flagged for re-authorization instead of failing the caller.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::client::TokenRefresher;
use super::error::VkError;
use crate::database::models::{VkAccount, VkStatus};

/// Result of asking for a usable access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessToken {
    /// Stored token is still valid; account untouched.
    Valid(String),
    /// Token was refreshed; the account must be persisted.
    Refreshed(String),
    /// No valid token; account flagged `ReauthRequired` and must be persisted.
    ReauthRequired,
}

impl AccessToken {
    /// Whether the account changed and needs a write.
    pub fn changed_account(&self) -> bool {
        !matches!(self, Self::Valid(_))
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Valid(t) | Self::Refreshed(t) => Some(t.as_str()),
            Self::ReauthRequired => None,
        }
    }
}

/// Return a token valid at `now`, refreshing through `refresher` if needed.
pub async fn valid_access_token<R: TokenRefresher>(
    account: &mut VkAccount,
    refresher: &R,
    now: DateTime<Utc>,
) -> AccessToken {
    if account.status == VkStatus::Active && !account.needs_refresh(now) {
        return AccessToken::Valid(account.access_token.clone());
    }

    let result = match account.refresh_token.as_deref() {
        Some(refresh_token) => refresher.refresh(refresh_token, &account.device_id).await,
        None => Err(VkError::MissingRefreshToken),
    };

    match result {
        Ok(grant) => {
            let expires_at = grant.expires_at(now);
            account.apply_refresh(grant.access_token, grant.refresh_token, expires_at);
            info!("Refreshed VK token for account {}", account.vk_user_id);
            AccessToken::Refreshed(account.access_token.clone())
        }
        Err(e) => {
            warn!("VK token refresh failed for account {}: {}", account.vk_user_id, e);
            account.status = VkStatus::ReauthRequired;
            AccessToken::ReauthRequired
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Duration;

    use super::*;
    use crate::database::models::vk_connection::tests::account;
    use crate::vk::client::TokenGrant;

    /// Counts calls; answers with a fixed grant or an API error.
    struct FakeRefresher {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeRefresher {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenRefresher for FakeRefresher {
        async fn refresh(&self, refresh_token: &str, device_id: &str) -> Result<TokenGrant, VkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(device_id, "device");
            if self.fail {
                return Err(VkError::Api {
                    code: "invalid_grant".to_string(),
                    description: "Refresh token expired".to_string(),
                });
            }
            Ok(TokenGrant {
                access_token: format!("new-from-{refresh_token}"),
                refresh_token: Some("rotated".to_string()),
                expires_in: 3600,
                user_id: None,
            })
        }
    }

    #[tokio::test]
    async fn test_token_outside_window_is_returned_without_call() {
        let now = Utc::now();
        let mut acc = account(1, now + Duration::seconds(301));
        let refresher = FakeRefresher::ok();

        let token = valid_access_token(&mut acc, &refresher, now).await;

        assert_eq!(token, AccessToken::Valid("access-1".to_string()));
        assert!(!token.changed_account());
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_token_inside_window_is_refreshed_first() {
        let now = Utc::now();
        let mut acc = account(1, now + Duration::seconds(120));
        let refresher = FakeRefresher::ok();

        let token = valid_access_token(&mut acc, &refresher, now).await;

        assert_eq!(token, AccessToken::Refreshed("new-from-refresh-1".to_string()));
        assert_eq!(refresher.calls(), 1);
        assert_eq!(acc.access_token, "new-from-refresh-1");
        assert_eq!(acc.refresh_token.as_deref(), Some("rotated"));
        assert_eq!(acc.expires_at, now + Duration::seconds(3600));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_requires_reauth() {
        let now = Utc::now();
        let mut acc = account(1, now - Duration::seconds(5));
        acc.refresh_token = None;
        let refresher = FakeRefresher::ok();

        let token = valid_access_token(&mut acc, &refresher, now).await;

        assert_eq!(token, AccessToken::ReauthRequired);
        assert_eq!(token.token(), None);
        assert_eq!(refresher.calls(), 0);
        assert_eq!(acc.status, VkStatus::ReauthRequired);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_old_tokens() {
        let now = Utc::now();
        let mut acc = account(1, now + Duration::seconds(10));
        let refresher = FakeRefresher::failing();

        let token = valid_access_token(&mut acc, &refresher, now).await;

        assert_eq!(token, AccessToken::ReauthRequired);
        assert_eq!(refresher.calls(), 1);
        assert_eq!(acc.access_token, "access-1");
        assert_eq!(acc.status, VkStatus::ReauthRequired);
    }

    #[tokio::test]
    async fn test_flagged_account_retries_refresh() {
        let now = Utc::now();
        let mut acc = account(1, now + Duration::hours(1));
        acc.status = VkStatus::ReauthRequired;
        let refresher = FakeRefresher::ok();

        let token = valid_access_token(&mut acc, &refresher, now).await;

        assert!(matches!(token, AccessToken::Refreshed(_)));
        assert_eq!(acc.status, VkStatus::Active);
    }
}
