//! LinkedIn OAuth 2.0 authorization-code flow.

use crate::config::Config;
use crate::errors::AppError;
use crate::linkedin_models::TokenResponse;
use url::Url;

/// Scopes requested at login.
pub const SCOPES: &str = "r_liteprofile,rw_ads,r_ads,r_emailaddress,\
r_marketing_leadgen_automation,r_organization_admin,r_events";

#[derive(Clone)]
pub struct OAuthClient {
    client: reqwest::Client,
    authorization_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl OAuthClient {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create OAuth client: {}", e)))?;

        Ok(Self {
            client,
            authorization_url: format!("{}/authorization", config.oauth_base_url),
            token_url: format!("{}/accessToken", config.oauth_base_url),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    /// URL the browser is sent to for consent.
    pub fn authorize_url(&self, state: &str) -> Result<String, AppError> {
        let url = Url::parse_with_params(
            &self.authorization_url,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state),
                ("scope", SCOPES),
            ],
        )
        .map_err(|e| AppError::InternalError(format!("Failed to build authorize URL: {}", e)))?;

        Ok(url.into())
    }

    /// Exchanges an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("Token exchange failed: {}", e)))?;

        let status = response.status();
        let token: TokenResponse = response.json().await.map_err(|e| {
            tracing::error!("Token endpoint returned {} with unreadable body: {}", status, e);
            AppError::OAuth("Failed to obtain access token.".to_string())
        })?;

        match token.access_token {
            Some(access_token) if !access_token.is_empty() => {
                tracing::info!(
                    "Access token obtained successfully (expires in {:?}s)",
                    token.expires_in
                );
                Ok(access_token)
            }
            _ => {
                tracing::error!(
                    "Token endpoint returned {} without access_token: {} {}",
                    status,
                    token.error.unwrap_or_default(),
                    token.error_description.unwrap_or_default()
                );
                Err(AppError::OAuth("Failed to obtain access token.".to_string()))
            }
        }
    }
}

/// Random value for the `state` parameter.
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
