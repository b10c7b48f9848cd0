//! vSphere Client
//!
//! Main client for the property gateway, combining session handling and
//! HTTP functionality. Implements [`PropertyCollector`] for the aggregation
//! core.

use super::auth::SessionCredentials;
use super::collector::{CollectorError, Predicate, PropertyBag, PropertyCollector};
use super::http::{ApiError, VsphereHttpClient};
use crate::inventory::ObjectReference;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Connection settings resolved from flags, environment and config file
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub url: Url,
    pub insecure: bool,
    pub poll_interval: Duration,
    pub wait_timeout: Option<Duration>,
}

/// Main vSphere client
#[derive(Clone)]
pub struct VsphereClient {
    pub credentials: SessionCredentials,
    pub http: VsphereHttpClient,
    base_url: Url,
    poll_interval: Duration,
    wait_timeout: Option<Duration>,
}

#[derive(Serialize)]
struct RetrieveRequest<'a> {
    objects: &'a [ObjectReference],
    properties: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct RetrieveResponse {
    #[serde(default)]
    objects: Vec<ObjectContent>,
}

#[derive(Deserialize)]
struct ObjectContent {
    obj: ObjectReference,
    #[serde(default)]
    properties: PropertyBag,
}

impl VsphereClient {
    /// Create a new client. No request is made until the first call.
    pub fn new(settings: &ConnectionSettings, credentials: SessionCredentials) -> Result<Self> {
        let http = VsphereHttpClient::new(settings.insecure)?;

        let mut base_url = settings.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            credentials,
            http,
            base_url,
            poll_interval: settings.poll_interval,
            wait_timeout: settings.wait_timeout,
        })
    }

    /// Build a gateway API URL
    pub fn api_url(&self, path: &str) -> Result<String> {
        let url = self
            .base_url
            .join(&format!("api/{}", path))
            .with_context(|| format!("Invalid API path: {}", path))?;
        Ok(url.to_string())
    }

    /// POST to the gateway, logging in again once if the session expired
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let url = self.api_url(path)?;
        let login_url = self.api_url("session")?;

        let session = self.credentials.get_session(&self.http, &login_url).await?;
        match self.http.post(&url, &session, body).await {
            Err(e) if ApiError::status_of(&e) == Some(StatusCode::UNAUTHORIZED) => {
                tracing::info!("Session rejected, logging in again");
                self.credentials.invalidate().await;
                let session = self.credentials.get_session(&self.http, &login_url).await?;
                self.http.post(&url, &session, body).await
            }
            other => other,
        }
    }
}

#[async_trait]
impl PropertyCollector for VsphereClient {
    async fn retrieve(
        &self,
        references: &[ObjectReference],
        properties: Option<&[String]>,
    ) -> Result<HashMap<ObjectReference, PropertyBag>, CollectorError> {
        let request = RetrieveRequest {
            objects: references,
            properties,
        };

        let response = match self.post("properties/retrieve", &request).await {
            Ok(response) => response,
            Err(e) if references.len() == 1 && ApiError::status_of(&e) == Some(StatusCode::NOT_FOUND) => {
                return Err(CollectorError::NotFound(references[0].clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let parsed: RetrieveResponse = if response.is_null() {
            RetrieveResponse { objects: Vec::new() }
        } else {
            serde_json::from_value(response).context("Malformed property retrieval response")?
        };

        tracing::debug!(
            "Retrieved {} of {} requested object(s)",
            parsed.objects.len(),
            references.len()
        );

        Ok(parsed
            .objects
            .into_iter()
            .map(|content| (content.obj, content.properties))
            .collect())
    }

    async fn wait_until(
        &self,
        reference: &ObjectReference,
        properties: &[String],
        predicate: &Predicate,
    ) -> Result<PropertyBag, CollectorError> {
        let started = Instant::now();

        loop {
            let mut bags = self
                .retrieve(std::slice::from_ref(reference), Some(properties))
                .await?;
            let Some(bag) = bags.remove(reference) else {
                return Err(CollectorError::NotFound(reference.clone()));
            };

            if predicate(&bag) {
                return Ok(bag);
            }

            if let Some(limit) = self.wait_timeout {
                if started.elapsed() >= limit {
                    return Err(CollectorError::Timeout {
                        reference: reference.clone(),
                        after: limit,
                    });
                }
            }

            tracing::trace!("{} not ready, polling again in {:?}", reference, self.poll_interval);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
