//! Keeps a valid OAuth access token, refreshing it when it expires.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use deadline_core::error::{DeadlineError, DeadlineResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{check, from_transport};
use crate::types::TokenResponse;

pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionData {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + Duration::seconds(EXPIRY_MARGIN_SECS) >= expires_at)
    }
}

/// OAuth session backed by a JSON token file.
pub struct Session {
    path: PathBuf,
    credentials: GoogleCredentials,
    token_url: String,
    data: Mutex<Option<SessionData>>,
}

impl Session {
    pub fn new(path: impl Into<PathBuf>, credentials: GoogleCredentials) -> Self {
        Session {
            path: path.into(),
            credentials,
            token_url: TOKEN_URL.to_string(),
            data: Mutex::new(None),
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A usable access token, refreshed and saved first if it has expired.
    pub async fn access_token(&self, http: &reqwest::Client) -> DeadlineResult<String> {
        let mut data = self.data.lock().await;

        let current = match data.take() {
            Some(current) => current,
            None => load(&self.path)?,
        };
        let current = if current.is_expired(Utc::now()) {
            debug!("Access token expired, refreshing");
            let refreshed = self.refresh(http, &current).await?;
            save(&self.path, &refreshed)?;
            refreshed
        } else {
            current
        };

        let token = current.access_token.clone();
        *data = Some(current);
        Ok(token)
    }

    /// Forget the tokens, in memory and on disk.
    pub async fn invalidate(&self) -> DeadlineResult<()> {
        *self.data.lock().await = None;
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Removed stored tokens at {}", self.path.display());
        }
        Ok(())
    }

    async fn refresh(
        &self,
        http: &reqwest::Client,
        current: &SessionData,
    ) -> DeadlineResult<SessionData> {
        let response = http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", current.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(from_transport)?;

        // The token endpoint answers 400 invalid_grant for a revoked refresh token.
        let response = check(response).await.map_err(|e| match e {
            DeadlineError::Rejected { message, .. } => DeadlineError::Auth(message),
            other => other,
        })?;
        let tokens: TokenResponse = response.json().await.map_err(from_transport)?;

        Ok(SessionData {
            access_token: tokens.access_token,
            // Google typically doesn't return a new refresh_token on refresh
            refresh_token: tokens
                .refresh_token
                .unwrap_or_else(|| current.refresh_token.clone()),
            expires_at: tokens
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }
}

fn load(path: &Path) -> DeadlineResult<SessionData> {
    if !path.exists() {
        return Err(DeadlineError::Auth(format!(
            "No Google tokens at {}",
            path.display()
        )));
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn save(path: &Path, data: &SessionData) -> DeadlineResult<()> {
    let contents = serde_json::to_string_pretty(data)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;

    // Set to owner-only (0600) since file contains OAuth tokens:
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
