//! VK ID redirect handler.
//!
//! The `state` parameter identifies the pending login and is consumed on
//! first use. Every outcome with a known user is also pushed to that user's
//! Telegram chat.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use chrono::Utc;
use serde::Deserialize;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use tracing::{debug, error, info, warn};

use super::ServerState;
use crate::bot::dispatcher::AppState;
use crate::database::{LinkOutcome, VkAccount, VkStatus};
use crate::utils::html_escape;

/// Query parameters VK appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub device_id: Option<String>,
}

/// How a redirect ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Unknown, expired or reused state. Nobody to notify.
    InvalidState,
    /// The user declined on the VK side.
    Declined { telegram_user_id: i64, reason: String },
    /// Exchange, profile fetch or storage failed.
    Failed { telegram_user_id: i64, message: String },
    /// The VK account belongs to another Telegram user.
    Conflict { telegram_user_id: i64 },
    Linked {
        telegram_user_id: i64,
        display_name: String,
        relinked: bool,
    },
}

impl CallbackOutcome {
    pub fn telegram_user_id(&self) -> Option<i64> {
        match self {
            Self::InvalidState => None,
            Self::Declined { telegram_user_id, .. }
            | Self::Failed { telegram_user_id, .. }
            | Self::Conflict { telegram_user_id }
            | Self::Linked { telegram_user_id, .. } => Some(*telegram_user_id),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidState => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Failed { .. } => StatusCode::BAD_GATEWAY,
            Self::Declined { .. } | Self::Linked { .. } => StatusCode::OK,
        }
    }

    /// Telegram message (HTML) for the user, if there is one to notify.
    pub fn notification(&self) -> Option<String> {
        let text = match self {
            Self::InvalidState => return None,
            Self::Declined { reason, .. } => format!(
                "❌ VK authorization was cancelled: {}",
                html_escape(reason)
            ),
            Self::Failed { message, .. } => {
                format!("❌ Could not connect VK: {}", html_escape(message))
            }
            Self::Conflict { .. } => {
                "⚠️ This VK account is already linked to another Telegram user.".to_string()
            }
            Self::Linked {
                display_name,
                relinked: false,
                ..
            } => format!("✅ VK account <b>{}</b> connected.", html_escape(display_name)),
            Self::Linked {
                display_name,
                relinked: true,
                ..
            } => format!("✅ VK account <b>{}</b> reconnected.", html_escape(display_name)),
        };
        Some(text)
    }

    /// Short page shown in the browser.
    pub fn page(&self) -> String {
        let (title, body) = match self {
            Self::InvalidState => (
                "Link expired",
                "This login link is invalid or has already been used. Start again from the bot.",
            ),
            Self::Declined { .. } => ("Cancelled", "Authorization was cancelled."),
            Self::Failed { .. } => (
                "Something went wrong",
                "VK could not complete the login. Details were sent to the bot chat.",
            ),
            Self::Conflict { .. } => (
                "Already linked",
                "This VK account is linked to another Telegram user.",
            ),
            Self::Linked { .. } => ("Connected", "You can close this page and return to Telegram."),
        };
        format!(
            "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
             <body><h1>{title}</h1><p>{body}</p></body></html>"
        )
    }
}

/// Consume the pending login and link the account it authorizes.
pub async fn complete_link(app: &AppState, params: CallbackParams) -> CallbackOutcome {
    let Some(state) = params.state.as_deref().filter(|s| !s.is_empty()) else {
        return CallbackOutcome::InvalidState;
    };
    let Some(pending) = app.pkce.take(state) else {
        warn!("VK callback with unknown or expired state");
        return CallbackOutcome::InvalidState;
    };
    let telegram_user_id = pending.telegram_user_id;
    debug!(
        "VK callback for user {} after {}s",
        telegram_user_id,
        (Utc::now() - pending.created_at).num_seconds()
    );

    if let Some(error) = params.error {
        info!("User {} declined VK authorization: {}", telegram_user_id, error);
        return CallbackOutcome::Declined {
            telegram_user_id,
            reason: params.error_description.unwrap_or(error),
        };
    }

    let (Some(code), Some(device_id)) = (params.code.as_deref(), params.device_id.as_deref()) else {
        return CallbackOutcome::Failed {
            telegram_user_id,
            message: "VK did not return an authorization code".to_string(),
        };
    };

    let failed = |message: String| CallbackOutcome::Failed {
        telegram_user_id,
        message,
    };

    let grant = match app
        .vk
        .exchange_code(code, &pending.code_verifier, device_id, state)
        .await
    {
        Ok(grant) => grant,
        Err(e) => {
            warn!("VK code exchange failed for user {}: {}", telegram_user_id, e);
            return failed(e.user_message());
        }
    };

    let profile = match app.vk.user_info(&grant.access_token).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!("VK user_info failed for user {}: {}", telegram_user_id, e);
            return failed(e.user_message());
        }
    };

    let Some(vk_user_id) = profile.user_id.or(grant.user_id) else {
        return failed("VK did not return a user id".to_string());
    };

    let now = Utc::now();
    let display_name = profile.display_name();
    let account = VkAccount {
        vk_user_id,
        expires_at: grant.expires_at(now),
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
        device_id: device_id.to_string(),
        email: profile.email,
        display_name: display_name.clone(),
        status: VkStatus::Active,
        linked_at: now,
    };

    match app.vk_accounts.link_account(telegram_user_id, account).await {
        Ok(LinkOutcome::Conflict { .. }) => CallbackOutcome::Conflict { telegram_user_id },
        Ok(outcome) => CallbackOutcome::Linked {
            telegram_user_id,
            display_name,
            relinked: outcome == LinkOutcome::Relinked,
        },
        Err(e) => {
            error!("Storing VK account for user {} failed: {:#}", telegram_user_id, e);
            failed("could not save the connection, try again later".to_string())
        }
    }
}

/// `GET /vk/callback`
pub async fn vk_callback(
    State(state): State<ServerState>,
    Query(params): Query<CallbackParams>,
) -> (StatusCode, Html<String>) {
    let outcome = complete_link(&state.app, params).await;

    if let (Some(user_id), Some(text)) = (outcome.telegram_user_id(), outcome.notification()) {
        let sent = state
            .bot
            .send_message(ChatId(user_id), text)
            .parse_mode(ParseMode::Html)
            .await;
        if let Err(e) = sent {
            warn!("Could not notify user {} about VK login: {}", user_id, e);
        }
    }

    (outcome.status(), Html(outcome.page()))
}

#[cfg(test)]
mod tests {
    use axum::http::Uri;

    use super::*;

    fn parse(uri: &str) -> CallbackParams {
        let uri: Uri = uri.parse().expect("uri");
        Query::<CallbackParams>::try_from_uri(&uri).expect("query").0
    }

    #[test]
    fn test_query_parsing() {
        let params = parse("/vk/callback?code=c0de&state=st4te&device_id=dev%201&type=code_v2");
        assert_eq!(params.code.as_deref(), Some("c0de"));
        assert_eq!(params.state.as_deref(), Some("st4te"));
        assert_eq!(params.device_id.as_deref(), Some("dev 1"));
        assert!(params.error.is_none());

        let params = parse("/vk/callback?error=access_denied&error_description=User+denied&state=s");
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.error_description.as_deref(), Some("User denied"));

        let params = parse("/vk/callback");
        assert!(params.state.is_none());
    }

    #[test]
    fn test_invalid_state_notifies_nobody() {
        let outcome = CallbackOutcome::InvalidState;
        assert_eq!(outcome.telegram_user_id(), None);
        assert_eq!(outcome.notification(), None);
        assert_eq!(outcome.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_failure_carries_raw_vk_text() {
        let outcome = CallbackOutcome::Failed {
            telegram_user_id: 7,
            message: "Code is <expired>".to_string(),
        };
        assert_eq!(outcome.telegram_user_id(), Some(7));
        let text = outcome.notification().expect("notification");
        assert!(text.contains("Code is &lt;expired&gt;"));
        assert!(!outcome.page().contains("expired&gt;"));
    }

    #[test]
    fn test_linked_and_conflict_messages() {
        let linked = CallbackOutcome::Linked {
            telegram_user_id: 7,
            display_name: "Ivan Petrov".to_string(),
            relinked: true,
        };
        assert!(linked.notification().expect("text").contains("reconnected"));
        assert_eq!(linked.status(), StatusCode::OK);

        let conflict = CallbackOutcome::Conflict { telegram_user_id: 7 };
        assert!(conflict.notification().expect("text").contains("another Telegram user"));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
    }
}
