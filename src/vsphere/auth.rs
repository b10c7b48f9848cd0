//! vSphere Authentication
//!
//! Creates gateway sessions from basic credentials and caches the session
//! identifier between calls.

use super::http::VsphereHttpClient;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Environment variable holding the user name
pub const USERNAME_ENV: &str = "VMINFO_USERNAME";
/// Environment variable holding the password
pub const PASSWORD_ENV: &str = "VMINFO_PASSWORD";

/// Credentials holder with session caching
#[derive(Clone)]
pub struct SessionCredentials {
    username: String,
    password: String,
    session: Arc<RwLock<Option<String>>>,
}

impl std::fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl SessionCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Credentials from `VMINFO_USERNAME` / `VMINFO_PASSWORD`, with an
    /// optional user name taking precedence over the environment
    pub fn from_env(username: Option<&str>) -> Result<Self> {
        let username = match username {
            Some(u) => u.to_string(),
            None => std::env::var(USERNAME_ENV)
                .with_context(|| format!("No user name configured. Set {} or use --username", USERNAME_ENV))?,
        };
        let password = std::env::var(PASSWORD_ENV)
            .with_context(|| format!("No password configured. Set {}", PASSWORD_ENV))?;

        Ok(Self::new(&username, &password))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get a session identifier, logging in if none is cached
    pub async fn get_session(&self, http: &VsphereHttpClient, login_url: &str) -> Result<String> {
        {
            let cache = self.session.read().await;
            if let Some(session) = cache.as_ref() {
                return Ok(session.clone());
            }
        }

        let mut cache = self.session.write().await;
        // Another task may have logged in while we waited for the lock
        if let Some(session) = cache.as_ref() {
            return Ok(session.clone());
        }

        let session = http
            .login(login_url, &self.username, &self.password)
            .await
            .context("Failed to create vSphere session")?;
        tracing::debug!("Created session for {}", self.username);

        *cache = Some(session.clone());
        Ok(session)
    }

    /// Drop the cached session so the next call logs in again
    pub async fn invalidate(&self) {
        let mut cache = self.session.write().await;
        if cache.take().is_some() {
            tracing::debug!("Session invalidated");
        }
    }
}
