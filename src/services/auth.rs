// src/services/auth.rs

//! Google authorization.
//!
//! The caller authorizes once per process and hands the resulting
//! [`GoogleSession`] to the Drive client. Tokens can be cached on disk so
//! later runs skip the browser step while the cached token is valid or
//! refreshable.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Scopes needed to manage folders and spreadsheets.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/spreadsheets",
];

/// An authorized session for Google Drive and Sheets calls.
#[derive(Clone)]
pub struct GoogleSession {
    access_token: String,
}

impl GoogleSession {
    pub fn from_access_token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for GoogleSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleSession")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Token persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Whether the access token is still usable, with a minute of slack.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires| expires - TimeDelta::seconds(60) > now)
    }

    /// Read a cached token. Missing or unreadable caches yield `None`.
    pub async fn load(path: &Path) -> Option<Self> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Could not read token cache {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(token) => Some(token),
            Err(e) => {
                log::warn!("Ignoring malformed token cache {}: {}", path.display(), e);
                None
            }
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

/// Extract the authorization code from what the user pasted.
///
/// Accepts the full redirect URL, a bare query string, or the code itself.
/// When a `state` parameter is present it must match `expected_state`.
pub fn parse_callback(input: &str, expected_state: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::auth("no authorization code entered"));
    }

    let pairs: Vec<(String, String)> = if let Ok(url) = Url::parse(input) {
        url.query_pairs().into_owned().collect()
    } else if input.contains("code=") || input.contains("error=") {
        url::form_urlencoded::parse(input.trim_start_matches('?').as_bytes())
            .into_owned()
            .collect()
    } else {
        return Ok(input.to_string());
    };

    let param = |name: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    };

    if let Some(error) = param("error") {
        return Err(AppError::auth(format!("authorization denied: {error}")));
    }
    if let Some(state) = param("state") {
        if state != expected_state {
            return Err(AppError::auth("state mismatch in redirect, possible CSRF"));
        }
    }
    param("code")
        .filter(|code| !code.is_empty())
        .ok_or_else(|| AppError::auth("redirect URL has no code parameter"))
}

#[cfg(feature = "sheets")]
mod flow {
    use oauth2::basic::{BasicClient, BasicTokenResponse};
    use oauth2::{
        AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
        RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
    };
    use tokio::io::{AsyncBufReadExt, BufReader};

    use super::*;
    use crate::models::GoogleConfig;
    use crate::utils::http;

    const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

    /// Establish a session: cached token, refreshed token, or the interactive flow.
    ///
    /// Token requests go through `http_client`, normally the one built by
    /// [`http::create_google_client`].
    pub async fn authorize(
        config: &GoogleConfig,
        http_client: &reqwest::Client,
    ) -> Result<GoogleSession> {
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(AppError::config(
                "Google credentials missing: set google.client_id/client_secret or GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET",
            ));
        }
        let client = oauth_client(config)?;
        let cache = config.token_cache.as_deref();

        if let Some(path) = cache {
            if let Some(cached) = CachedToken::load(path).await {
                if cached.is_fresh(Utc::now()) {
                    log::info!("Using cached Google token from {}", path.display());
                    return Ok(GoogleSession::from_access_token(cached.access_token));
                }
                if let Some(refresh) = cached.refresh_token.clone() {
                    match refresh_token(&client, http_client, &refresh).await {
                        Ok(token) => {
                            log::info!("Refreshed cached Google token");
                            token.save(path).await?;
                            return Ok(GoogleSession::from_access_token(token.access_token));
                        }
                        Err(e) => log::warn!("Token refresh failed: {}. Re-authorizing.", e),
                    }
                }
            }
        }

        let token = authorize_interactively(&client, http_client).await?;
        if let Some(path) = cache {
            token.save(path).await?;
            log::info!("Saved Google token to {}", path.display());
        }
        Ok(GoogleSession::from_access_token(token.access_token))
    }

    fn oauth_client(config: &GoogleConfig) -> Result<BasicClient> {
        Ok(BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(AUTH_URL.to_string())?,
            Some(TokenUrl::new(TOKEN_URL.to_string())?),
        )
        .set_redirect_uri(RedirectUrl::new(config.redirect_uri.clone())?))
    }

    fn to_cached(response: &BasicTokenResponse, previous_refresh: Option<String>) -> CachedToken {
        CachedToken {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or(previous_refresh),
            expires_at: response
                .expires_in()
                .and_then(|d| TimeDelta::from_std(d).ok())
                .map(|d| Utc::now() + d),
        }
    }

    async fn refresh_token(
        client: &BasicClient,
        http_client: &reqwest::Client,
        refresh: &str,
    ) -> Result<CachedToken> {
        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh.to_string()))
            .request_async(|request| http::oauth_request(http_client, request))
            .await
            .map_err(|e| AppError::auth(format!("refresh failed: {e}")))?;
        Ok(to_cached(&response, Some(refresh.to_string())))
    }

    async fn authorize_interactively(
        client: &BasicClient,
        http_client: &reqwest::Client,
    ) -> Result<CachedToken> {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let (auth_url, csrf) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(challenge)
            .url();

        println!("Open this URL in a browser to grant access to Google Drive:\n\n{auth_url}\n");
        println!("After approving, paste the URL you were redirected to (or just the code):");

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;
        let code = parse_callback(&line, csrf.secret())?;

        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(verifier)
            .request_async(|request| http::oauth_request(http_client, request))
            .await
            .map_err(|e| AppError::auth(format!("code exchange failed: {e}")))?;
        log::info!("Google authorization complete");
        Ok(to_cached(&response, None))
    }
}

#[cfg(feature = "sheets")]
pub use flow::authorize;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_callback_full_url() {
        let code =
            parse_callback("http://localhost:8080/?state=abc&code=4%2F0xyz&scope=drive", "abc")
                .unwrap();
        assert_eq!(code, "4/0xyz");
    }

    #[test]
    fn test_parse_callback_bare_code() {
        assert_eq!(parse_callback("  4/0abc \n", "abc").unwrap(), "4/0abc");
    }

    #[test]
    fn test_parse_callback_query_string() {
        assert_eq!(parse_callback("?code=xyz&state=s1", "s1").unwrap(), "xyz");
    }

    #[test]
    fn test_parse_callback_rejects_state_mismatch() {
        let result = parse_callback("http://localhost:8080/?state=evil&code=xyz", "abc");
        assert!(matches!(result, Err(AppError::Auth(_))));
    }

    #[test]
    fn test_parse_callback_reports_denial() {
        let result = parse_callback("http://localhost:8080/?error=access_denied&state=abc", "abc");
        assert!(result.unwrap_err().to_string().contains("access_denied"));
    }

    #[test]
    fn test_parse_callback_empty() {
        assert!(parse_callback("   ", "abc").is_err());
    }

    #[test]
    fn test_cached_token_freshness() {
        let now = Utc::now();
        let mut token = CachedToken {
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: Some(now + TimeDelta::minutes(30)),
        };
        assert!(token.is_fresh(now));

        token.expires_at = Some(now + TimeDelta::seconds(30));
        assert!(!token.is_fresh(now));

        token.expires_at = None;
        assert!(!token.is_fresh(now));
    }

    #[tokio::test]
    async fn test_token_cache_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("auth/token.json");
        let token = CachedToken {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: None,
        };

        token.save(&path).await.unwrap();
        assert_eq!(CachedToken::load(&path).await, Some(token));
    }

    #[tokio::test]
    async fn test_token_cache_missing_or_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token.json");
        assert!(CachedToken::load(&path).await.is_none());

        tokio::fs::write(&path, b"not json").await.unwrap();
        assert!(CachedToken::load(&path).await.is_none());
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = GoogleSession::from_access_token("secret-token");
        assert!(!format!("{session:?}").contains("secret-token"));
        assert_eq!(session.access_token(), "secret-token");
    }
}
