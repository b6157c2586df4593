//! VK ID OAuth and VK API client.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::error::VkError;
use crate::config::VkConfig;

const AUTHORIZE_URL: &str = "https://id.vk.com/authorize";
const TOKEN_URL: &str = "https://id.vk.com/oauth2/auth";
const USER_INFO_URL: &str = "https://id.vk.com/oauth2/user_info";
const REVOKE_URL: &str = "https://id.vk.com/oauth2/revoke";
const GROUPS_URL: &str = "https://api.vk.com/method/groups.get";
const API_VERSION: &str = "5.199";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Token pair returned by the code exchange and by refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<i64>,
}

impl TokenGrant {
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::seconds(self.expires_in.max(0))
    }
}

/// Profile from `user_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct VkProfile {
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl VkProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user: VkProfile,
}

/// A community the user administers.
#[derive(Debug, Clone, Deserialize)]
pub struct VkGroup {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub screen_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupsPage {
    #[serde(default)]
    items: Vec<VkGroup>,
}

/// VK ids arrive as numbers from some endpoints and strings from others.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Num(i64),
        Text(String),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Num(n)) => Some(n),
        Some(Id::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Decode a VK ID OAuth response.
///
/// Non-2xx status or an `error` field fails with the raw text VK sent.
pub fn parse_oauth<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, VkError> {
    let value: Value = serde_json::from_str(body).map_err(|_| VkError::Status {
        status,
        body: body.chars().take(200).collect(),
    })?;

    if let Some(error) = value.get("error") {
        return Err(VkError::Api {
            code: error.as_str().map_or_else(|| error.to_string(), str::to_string),
            description: value
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }
    if !(200..300).contains(&status) {
        return Err(VkError::Status {
            status,
            body: body.chars().take(200).collect(),
        });
    }

    serde_json::from_value(value).map_err(|e| VkError::Decode(e.to_string()))
}

/// Decode a classic VK API response (`{"response": ...}` or `{"error": {...}}`).
pub fn parse_api<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, VkError> {
    let mut value: Value = serde_json::from_str(body).map_err(|_| VkError::Status {
        status,
        body: body.chars().take(200).collect(),
    })?;

    if let Some(error) = value.get("error") {
        return Err(VkError::Api {
            code: error
                .get("error_code")
                .map_or_else(String::new, Value::to_string),
            description: error
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    let response = value
        .get_mut("response")
        .map(Value::take)
        .ok_or_else(|| VkError::Decode("missing response field".to_string()))?;
    serde_json::from_value(response).map_err(|e| VkError::Decode(e.to_string()))
}

/// Something that can trade a refresh token for a new grant.
pub trait TokenRefresher {
    fn refresh(
        &self,
        refresh_token: &str,
        device_id: &str,
    ) -> impl Future<Output = Result<TokenGrant, VkError>> + Send;
}

/// HTTP client for VK ID and the VK API.
#[derive(Debug, Clone)]
pub struct VkClient {
    http: Client,
    config: VkConfig,
}

impl VkClient {
    pub fn new(config: VkConfig) -> Result<Self, VkError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, config })
    }

    /// Authorization URL the user opens to grant access.
    pub fn authorize_url(&self, state: &str, code_challenge: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", state),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "S256"),
                ("scope", self.config.scope.as_str()),
            ],
        )
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<(u16, String), VkError> {
        let response = self.http.post(url).form(form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
        device_id: &str,
        state: &str,
    ) -> Result<TokenGrant, VkError> {
        let (status, body) = self
            .post_form(
                TOKEN_URL,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("code_verifier", code_verifier),
                    ("client_id", self.config.client_id.as_str()),
                    ("device_id", device_id),
                    ("redirect_uri", self.config.redirect_uri.as_str()),
                    ("state", state),
                ],
            )
            .await?;
        debug!("VK code exchange answered {}", status);
        parse_oauth(status, &body)
    }

    /// Fetch the profile behind an access token.
    pub async fn user_info(&self, access_token: &str) -> Result<VkProfile, VkError> {
        let (status, body) = self
            .post_form(
                USER_INFO_URL,
                &[
                    ("client_id", self.config.client_id.as_str()),
                    ("access_token", access_token),
                ],
            )
            .await?;
        parse_oauth::<UserInfoResponse>(status, &body).map(|r| r.user)
    }

    /// Revoke an access token. Failures are logged, not returned.
    pub async fn revoke(&self, access_token: &str) {
        let result = self
            .post_form(
                REVOKE_URL,
                &[
                    ("client_id", self.config.client_id.as_str()),
                    ("access_token", access_token),
                ],
            )
            .await
            .and_then(|(status, body)| parse_oauth::<Value>(status, &body));
        if let Err(e) = result {
            warn!("VK token revoke failed: {}", e);
        }
    }

    /// Communities the token's user administers.
    pub async fn admin_groups(&self, access_token: &str) -> Result<Vec<VkGroup>, VkError> {
        let response = self
            .http
            .get(GROUPS_URL)
            .query(&[
                ("access_token", access_token),
                ("v", API_VERSION),
                ("extended", "1"),
                ("filter", "admin"),
            ])
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_api::<GroupsPage>(status, &body).map(|page| page.items)
    }
}

impl TokenRefresher for VkClient {
    async fn refresh(&self, refresh_token: &str, device_id: &str) -> Result<TokenGrant, VkError> {
        let state = super::pkce::generate_verifier();
        let (status, body) = self
            .post_form(
                TOKEN_URL,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", self.config.client_id.as_str()),
                    ("device_id", device_id),
                    ("state", state.as_str()),
                ],
            )
            .await?;
        debug!("VK token refresh answered {}", status);
        parse_oauth(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> VkClient {
        VkClient::new(VkConfig {
            client_id: "5100".to_string(),
            redirect_uri: "https://bot.example/vk/callback".to_string(),
            scope: "email groups".to_string(),
        })
        .expect("client")
    }

    #[test]
    fn test_authorize_url_carries_pkce() {
        let url = client().authorize_url("st4te", "ch4llenge").expect("url");
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("id.vk.com"));
        assert!(params.contains(&("code_challenge_method".to_string(), "S256".to_string())));
        assert!(params.contains(&("code_challenge".to_string(), "ch4llenge".to_string())));
        assert!(params.contains(&("state".to_string(), "st4te".to_string())));
        assert!(params.contains(&(
            "redirect_uri".to_string(),
            "https://bot.example/vk/callback".to_string()
        )));
    }

    #[test]
    fn test_parse_token_grant() {
        let body = r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"user_id":1234,"state":"s"}"#;
        let grant: TokenGrant = parse_oauth(200, body).expect("grant");
        assert_eq!(grant.access_token, "a");
        assert_eq!(grant.refresh_token.as_deref(), Some("r"));
        assert_eq!(grant.user_id, Some(1234));

        let now = Utc::now();
        assert_eq!(grant.expires_at(now), now + chrono::Duration::seconds(3600));
    }

    #[test]
    fn test_error_field_fails_even_on_200() {
        let body = r#"{"error":"invalid_grant","error_description":"Code is expired"}"#;
        let err = parse_oauth::<TokenGrant>(200, body).unwrap_err();
        assert!(matches!(err, VkError::Api { ref code, .. } if code == "invalid_grant"));
        assert_eq!(err.user_message(), "Code is expired");
    }

    #[test]
    fn test_non_success_status_fails() {
        let err = parse_oauth::<TokenGrant>(502, "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, VkError::Status { status: 502, .. }));

        let err = parse_oauth::<TokenGrant>(500, r#"{"access_token":"a"}"#).unwrap_err();
        assert!(matches!(err, VkError::Status { status: 500, .. }));
    }

    #[test]
    fn test_user_info_accepts_string_ids() {
        let body = r#"{"user":{"user_id":"987","first_name":"Ivan","last_name":"Petrov","email":"i@example.com"}}"#;
        let info: UserInfoResponse = parse_oauth(200, body).expect("user info");
        assert_eq!(info.user.user_id, Some(987));
        assert_eq!(info.user.display_name(), "Ivan Petrov");
    }

    #[test]
    fn test_parse_groups() {
        let body = r#"{"response":{"count":1,"items":[{"id":5,"name":"Bakery","screen_name":"bakery"}]}}"#;
        let page: GroupsPage = parse_api(200, body).expect("groups");
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].name, "Bakery");

        let body = r#"{"error":{"error_code":5,"error_msg":"User authorization failed"}}"#;
        let err = parse_api::<GroupsPage>(200, body).unwrap_err();
        assert_eq!(err.user_message(), "User authorization failed");
    }
}
