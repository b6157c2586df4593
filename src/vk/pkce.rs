//! PKCE material and the pending-authorization store.
//!
//! Each login attempt gets a random `state` and code verifier. The verifier
//! waits in a TTL cache keyed by state until VK redirects back; the first
//! callback presenting the state consumes it.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::{CacheConfig, CacheRegistry, TypedCache};

const VERIFIER_LEN: usize = 64;
const STATE_LEN: usize = 32;

/// A login started from the bot, waiting for the OAuth redirect.
#[derive(Debug, Clone)]
pub struct PendingAuth {
    pub telegram_user_id: i64,
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
}

/// Random alphanumeric string (a subset of the PKCE unreserved alphabet).
fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_verifier() -> String {
    random_token(VERIFIER_LEN)
}

/// S256 challenge: base64url(sha256(verifier)) without padding.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// TTL store of pending authorizations, keyed by OAuth state.
#[derive(Clone, Debug)]
pub struct PkceStore {
    pending: TypedCache<String, PendingAuth>,
}

impl PkceStore {
    pub fn new(cache: &CacheRegistry) -> Self {
        Self {
            pending: cache.get_or_create("vk_pending_auth", CacheConfig::pending_auth()),
        }
    }

    /// Start a login for a user. Returns `(state, challenge)`.
    pub fn begin(&self, telegram_user_id: i64) -> (String, String) {
        let state = random_token(STATE_LEN);
        let verifier = generate_verifier();
        let challenge = challenge_for(&verifier);

        self.pending.insert(
            state.clone(),
            PendingAuth {
                telegram_user_id,
                code_verifier: verifier,
                created_at: Utc::now(),
            },
        );
        debug!("PKCE login started for user {}", telegram_user_id);

        (state, challenge)
    }

    /// Consume the pending login for `state`, if it exists and has not expired.
    pub fn take(&self, state: &str) -> Option<PendingAuth> {
        self.pending.take(&state.to_string())
    }
}
