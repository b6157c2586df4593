//! VK integration errors.

use thiserror::Error;

/// Errors from the VK ID / VK API integration.
#[derive(Debug, Error)]
pub enum VkError {
    #[error("VK request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("VK returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Error object in an otherwise successful response.
    #[error("VK error {code}: {description}")]
    Api { code: String, description: String },

    #[error("unexpected VK response: {0}")]
    Decode(String),

    #[error("no refresh token stored, authorization required")]
    MissingRefreshToken,
}

impl VkError {
    /// Text shown to the user, raw from VK where available.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { code, description } if description.is_empty() => code.clone(),
            Self::Api { description, .. } => description.clone(),
            other => other.to_string(),
        }
    }
}
