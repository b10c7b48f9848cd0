//! Inventory Finder
//!
//! Resolves inventory paths to virtual machine references.

use super::client::VsphereClient;
use super::collector::CollectorError;
use super::http::ApiError;
use crate::inventory::reference::{ObjectReference, VIRTUAL_MACHINE};
use anyhow::Context;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// A virtual machine matched by a path
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FoundObject {
    #[serde(rename = "obj")]
    pub reference: ObjectReference,
    #[serde(default)]
    pub path: String,
}

#[derive(Serialize)]
struct FindRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    paths: &'a [String],
}

#[derive(Deserialize)]
struct FindResponse {
    #[serde(default)]
    objects: Vec<FoundObject>,
}

/// Find virtual machines matching `paths`, in the order the server lists
/// them. No paths matches every virtual machine.
///
/// Returns [`CollectorError::NotFound`] when the server reports no match.
pub async fn find_virtual_machines(
    client: &VsphereClient,
    paths: &[String],
) -> Result<Vec<FoundObject>, CollectorError> {
    let request = FindRequest {
        kind: VIRTUAL_MACHINE,
        paths,
    };

    let response = match client.post("inventory/find", &request).await {
        Ok(response) => response,
        Err(e) if ApiError::status_of(&e) == Some(StatusCode::NOT_FOUND) => {
            tracing::info!("No virtual machines matched {:?}", paths);
            return Err(CollectorError::NotFound(ObjectReference::new(
                VIRTUAL_MACHINE,
                &paths.join(","),
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let parsed: FindResponse =
        serde_json::from_value(response).context("Malformed inventory find response")?;

    tracing::debug!("Found {} virtual machine(s)", parsed.objects.len());
    Ok(parsed.objects)
}
