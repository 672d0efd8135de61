use async_trait::async_trait;
use serde::Deserialize;

use crate::models::session::IdentityProfile;
use crate::utils::config::GoogleConfig;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity provider request failed: {0}")]
    Transport(String),
    #[error("identity provider rejected the authorization code")]
    Rejected,
    #[error("identity provider returned no verified email")]
    MissingEmail,
}

/// External OAuth identity provider used for student sign-in.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start the consent flow.
    fn authorization_url(&self, state: &str) -> String;
    /// Exchanges the callback `code` for the signed-in user's profile.
    async fn exchange_code(&self, code: &str) -> Result<IdentityProfile, IdentityError>;
}

#[derive(Debug, Clone)]
pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    config: GoogleConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleIdentityProvider {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorization_url(&self, state: &str) -> String {
        reqwest::Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid profile email"),
                ("state", state),
            ],
        )
        .map(|url| url.to_string())
        .unwrap_or_else(|_| GOOGLE_AUTH_URL.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<IdentityProfile, IdentityError> {
        let response = self
            .client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::Rejected);
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let info: UserInfo = self
            .client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| IdentityError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let email = info
            .email
            .filter(|_| info.email_verified)
            .ok_or(IdentityError::MissingEmail)?;

        Ok(IdentityProfile {
            subject: info.sub,
            name: info.name.unwrap_or_else(|| email.clone()),
            email,
            picture: info.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_url_carries_client_and_state() {
        let provider = GoogleIdentityProvider::new(GoogleConfig {
            client_id: "client-1".into(),
            client_secret: "s".into(),
            redirect_url: "http://localhost:8000/auth/google/callback".into(),
        });
        let url = provider.authorization_url("xyz");
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fauth%2Fgoogle%2Fcallback"
        ));
    }
}
