//! VK connection repository.
//!
//! One document per Telegram user. Not cached: token material changes on
//! every refresh and reads are rare.

use anyhow::Result;
use mongodb::Collection;
use mongodb::bson::{self, Document, doc};
use mongodb::options::ReplaceOptions;
use tracing::{debug, info};

use crate::database::Database;
use crate::database::models::{VkAccount, VkConnections};

/// Outcome of linking an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked,
    /// The same user linked this account before; tokens were replaced.
    Relinked,
    /// Another Telegram user already owns this VK account. Nothing written.
    Conflict { owner_id: i64 },
}

/// Apply a link to the requester's connections.
///
/// `owner` is the Telegram user currently holding the VK account, if any.
/// On conflict the connections are left untouched.
fn plan_link(
    owner: Option<i64>,
    connections: &mut VkConnections,
    account: VkAccount,
) -> LinkOutcome {
    if let Some(owner_id) = owner.filter(|&id| id != connections.telegram_user_id) {
        return LinkOutcome::Conflict { owner_id };
    }
    if connections.upsert_account(account) {
        LinkOutcome::Linked
    } else {
        LinkOutcome::Relinked
    }
}

/// `$set` for one account's token fields, addressed through the positional operator.
fn token_update(account: &VkAccount) -> Result<Document> {
    Ok(doc! {
        "$set": {
            "accounts.$.access_token": account.access_token.clone(),
            "accounts.$.refresh_token": bson::to_bson(&account.refresh_token)?,
            "accounts.$.expires_at": bson::to_bson(&account.expires_at)?,
            "accounts.$.status": bson::to_bson(&account.status)?,
        }
    })
}

/// Repository for linked VK accounts.
pub struct VkRepository {
    collection: Collection<VkConnections>,
}

impl VkRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("vk_connections"),
        }
    }

    /// Get a user's connections, empty if none stored.
    pub async fn get_or_default(&self, telegram_user_id: i64) -> Result<VkConnections> {
        let filter = doc! { "telegram_user_id": telegram_user_id };
        Ok(self
            .collection
            .find_one(filter)
            .await?
            .unwrap_or_else(|| VkConnections::new(telegram_user_id)))
    }

    /// Telegram user currently holding `vk_user_id`, across all users.
    pub async fn owner_of(&self, vk_user_id: i64) -> Result<Option<i64>> {
        let filter = doc! { "accounts.vk_user_id": vk_user_id };
        Ok(self
            .collection
            .find_one(filter)
            .await?
            .map(|c| c.telegram_user_id))
    }

    /// Save connections (upsert).
    pub async fn save(&self, connections: &VkConnections) -> Result<()> {
        let filter = doc! { "telegram_user_id": connections.telegram_user_id };
        let options = ReplaceOptions::builder().upsert(true).build();

        self.collection
            .replace_one(filter, connections)
            .with_options(options)
            .await?;

        debug!(
            "Saved {} VK account(s) for user {}",
            connections.accounts.len(),
            connections.telegram_user_id
        );
        Ok(())
    }

    /// Link an account to a Telegram user, enforcing global uniqueness.
    pub async fn link_account(
        &self,
        telegram_user_id: i64,
        account: VkAccount,
    ) -> Result<LinkOutcome> {
        let vk_user_id = account.vk_user_id;
        let owner = self.owner_of(vk_user_id).await?;
        let mut connections = self.get_or_default(telegram_user_id).await?;

        let outcome = plan_link(owner, &mut connections, account);
        if let LinkOutcome::Conflict { owner_id } = outcome {
            info!(
                "VK account {} already linked to user {}, rejecting link for {}",
                vk_user_id, owner_id, telegram_user_id
            );
            return Ok(outcome);
        }
        self.save(&connections).await?;

        info!("VK account {} linked to user {} ({:?})", vk_user_id, telegram_user_id, outcome);
        Ok(outcome)
    }

    /// Unlink an account. Returns the removed account, if it was linked.
    pub async fn unlink_account(
        &self,
        telegram_user_id: i64,
        vk_user_id: i64,
    ) -> Result<Option<VkAccount>> {
        let mut connections = self.get_or_default(telegram_user_id).await?;
        let removed = connections.remove_account(vk_user_id);
        if removed.is_some() {
            self.save(&connections).await?;
        }
        Ok(removed)
    }

    /// Persist one account's token state (after refresh or a failed refresh).
    ///
    /// Only the token fields of that account are written, so concurrent
    /// changes to the user's other accounts survive. Returns false if the
    /// account is no longer linked.
    pub async fn update_account(&self, telegram_user_id: i64, account: &VkAccount) -> Result<bool> {
        let filter = doc! {
            "telegram_user_id": telegram_user_id,
            "accounts.vk_user_id": account.vk_user_id,
        };
        let result = self
            .collection
            .update_one(filter, token_update(account)?)
            .await?;
        Ok(result.matched_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use mongodb::bson::Bson;

    use super::*;
    use crate::database::VkStatus;
    use crate::database::models::vk_connection::tests::account;

    #[test]
    fn test_conflict_leaves_connections_untouched() {
        let mut connections = VkConnections::new(2);
        connections.upsert_account(account(5, Utc::now()));

        let outcome = plan_link(Some(1), &mut connections, account(9, Utc::now()));
        assert_eq!(outcome, LinkOutcome::Conflict { owner_id: 1 });
        assert_eq!(connections.accounts.len(), 1);
        assert!(connections.account(9).is_none());
    }

    #[test]
    fn test_link_then_relink_for_same_owner() {
        let mut connections = VkConnections::new(2);
        assert_eq!(
            plan_link(None, &mut connections, account(9, Utc::now())),
            LinkOutcome::Linked
        );

        let mut fresh = account(9, Utc::now() + Duration::hours(1));
        fresh.access_token = "new-token".to_string();
        assert_eq!(plan_link(Some(2), &mut connections, fresh), LinkOutcome::Relinked);
        assert_eq!(connections.accounts.len(), 1);
        assert_eq!(
            connections.account(9).map(|a| a.access_token.as_str()),
            Some("new-token")
        );
    }

    #[test]
    fn test_token_update_sets_only_token_fields() {
        let mut acc = account(9, Utc::now());
        acc.status = VkStatus::ReauthRequired;
        acc.refresh_token = None;

        let update = token_update(&acc).expect("update");
        let set = update.get_document("$set").expect("$set");
        let mut keys: Vec<&str> = set.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "accounts.$.access_token",
                "accounts.$.expires_at",
                "accounts.$.refresh_token",
                "accounts.$.status",
            ]
        );
        assert_eq!(set.get_str("accounts.$.access_token").expect("token"), "access-9");
        assert_eq!(set.get_str("accounts.$.status").expect("status"), "reauth_required");
        assert_eq!(set.get("accounts.$.refresh_token"), Some(&Bson::Null));
    }
}
