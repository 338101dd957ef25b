//! Credentials attached to every Google API request.
//!
//! The service either runs with a plain API key, or with an OAuth token obtained through the
//! installed-application flow and cached next to the client-secret file.

use crate::error::CatalogError;
use crate::oauth::OAuthManager;
use eyre::Context;
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::instrument;

#[derive(Debug, Clone)]
pub(crate) struct TimeBoundAccessToken {
    token: BasicTokenResponse,
    /// When the current access token expires (with safety buffer)
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Creates a token that is already expired, forcing a refresh before first use.
    ///
    /// This is what tokens loaded from disk start as, since their age is unknown.
    pub(crate) fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    /// Creates a token whose expiry is derived from its `expires_in` field.
    pub(crate) fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: Self::calculate_token_expiry(&token),
            token,
        }
    }

    pub(crate) fn raw_token(&self) -> &BasicTokenResponse {
        &self.token
    }

    /// Refreshes this token using the provided OAuth manager, preserving the refresh token.
    ///
    /// * `Ok(true)` - Token was successfully refreshed
    /// * `Ok(false)` - Refresh failed (invalid grant, no refresh token, etc.)
    /// * `Err(_)` - Network or other error occurred
    pub(crate) async fn refresh(&mut self, oauth_manager: &OAuthManager) -> eyre::Result<bool> {
        tracing::trace!("refreshing token");
        match oauth_manager
            .refresh_token(self.token.clone())
            .await
            .context("refresh OAuth token")?
        {
            Some(new_token) => {
                let old_token = std::mem::replace(&mut self.token, new_token);

                // Google usually omits the refresh token from refresh responses
                if self.token.refresh_token().is_none() {
                    tracing::trace!("new token lacks refresh token, preserving original");
                    self.token
                        .set_refresh_token(old_token.refresh_token().cloned());
                }

                self.expires_at = Self::calculate_token_expiry(&self.token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Current time + expires_in - 5 minutes, or 55 minutes if the lifetime is unknown.
    fn calculate_token_expiry(token: &BasicTokenResponse) -> SystemTime {
        let now = SystemTime::now();
        match token.expires_in() {
            Some(expires_in) => {
                now + expires_in.saturating_sub(Duration::from_secs(300))
            }
            None => now + Duration::from_secs(3300),
        }
    }
}

/// How requests to Google APIs are authorized.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Appends `key=<key>` to every request.
    ApiKey(String),
    /// Sends a bearer token, refreshing it shortly before it expires.
    OAuth(OAuthSession),
}

#[derive(Debug, Clone)]
pub struct OAuthSession {
    token: Arc<Mutex<TimeBoundAccessToken>>,
    oauth_manager: Arc<OAuthManager>,
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(key.into())
    }

    /// Sets up OAuth credentials from a Google client-secret file.
    ///
    /// A token cached in `token.json` next to the secret file is refreshed and reused; when
    /// there is none, or it can no longer be refreshed, the user is sent through the browser
    /// consent flow. The resulting token is written back to `token.json`.
    pub async fn from_secret_file(secret_file: &Path) -> eyre::Result<Self> {
        let oauth_manager = OAuthManager::from_secret_file(secret_file)
            .await
            .context("load OAuth client")?;
        let token_file = secret_file.with_file_name("token.json");

        let stored = match tokio::fs::read_to_string(&token_file).await {
            Ok(json) => Some(
                serde_json::from_str::<BasicTokenResponse>(&json)
                    .with_context(|| format!("parse cached token {}", token_file.display()))?,
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("read cached token {}", token_file.display()));
            }
        };

        let token = match stored {
            Some(token) => {
                tracing::info!("refreshing cached OAuth token");
                let mut token = TimeBoundAccessToken::expired(token);
                if token
                    .refresh(&oauth_manager)
                    .await
                    .context("refresh cached token")?
                {
                    token
                } else {
                    tracing::warn!("cached token could not be refreshed, re-authenticating");
                    TimeBoundAccessToken::new(
                        oauth_manager
                            .authenticate()
                            .await
                            .context("authorize user to Google")?,
                    )
                }
            }
            None => TimeBoundAccessToken::new(
                oauth_manager
                    .authenticate()
                    .await
                    .context("authorize user to Google")?,
            ),
        };

        save_token(&token_file, token.raw_token())
            .await
            .with_context(|| format!("save token to {}", token_file.display()))?;

        Ok(Self::OAuth(OAuthSession {
            token: Arc::new(Mutex::new(token)),
            oauth_manager: Arc::new(oauth_manager),
        }))
    }

    /// Attaches these credentials to `request`, refreshing the OAuth token first if needed.
    pub(crate) async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<reqwest::RequestBuilder, CatalogError> {
        match self {
            Self::ApiKey(key) => Ok(request.query(&[("key", key.as_str())])),
            Self::OAuth(session) => {
                let access_token = session
                    .fresh_access_token()
                    .await
                    .map_err(|e| CatalogError::remote(endpoint, format!("{e:#}")))?;
                Ok(request.bearer_auth(access_token))
            }
        }
    }
}

impl OAuthSession {
    /// Gets a guaranteed-fresh access token, refreshing if necessary.
    #[instrument(skip(self))]
    async fn fresh_access_token(&self) -> eyre::Result<String> {
        let mut token = self.token.lock().await;

        if SystemTime::now() >= token.expires_at {
            tracing::debug!("access token expired, attempting refresh");
            if !token.refresh(&self.oauth_manager).await? {
                tracing::error!("access token refresh failed, credentials are unusable");
                eyre::bail!("unable to refresh expired access token");
            }
        }

        Ok(token.token.access_token().secret().to_string())
    }
}

/// Writes the token so that only the current user can read it.
async fn save_token(path: &Path, token: &BasicTokenResponse) -> eyre::Result<()> {
    let json = serde_json::to_string(token).context("serialize token")?;
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path).await.context("open token file")?;
    file.write_all(json.as_bytes())
        .await
        .context("write token file")?;
    tracing::info!(path = %path.display(), "saved OAuth token");
    Ok(())
}
