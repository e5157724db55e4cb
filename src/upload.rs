#![doc = "Hypha client: bridges the core contracts to the artifact-manager HTTP RPC endpoints and to plain HTTP PUT uploads."]
//
//! # Hypha Client (CLI <-> Core)
//!
//! This module provides [`HyphaClient`], the concrete implementation of the core
//! [`ArtifactManager`] and [`FileTransport`] traits used by the CLI.
//!
//! - Every RPC is `POST {server_url}/public/services/artifact-manager/{method}` with a JSON
//!   body of keyword arguments and an `Authorization: Bearer` header. The artifact manager is
//!   a public service; the target workspace only appears in artifact ids and `parent_id`.
//! - File bytes go to the URL returned by `put_file` with a bare `PUT`; that URL is
//!   pre-signed, so no auth header is sent there.
//!
//! Construct it with [`HyphaClient::new`] from loaded [`Settings`].

use async_trait::async_trait;
use model_upload_core::contract::{
    Artifact, ArtifactManager, ContractError, EditArtifact, FileTransport, NewArtifact,
    TransferResponse,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::load_config::Settings;

pub const ARTIFACT_MANAGER_SERVICE: &str = "artifact-manager";
/// Workspace the artifact-manager service is registered under.
pub const SERVICE_WORKSPACE: &str = "public";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response from {method}: {message}")]
    Decode { method: String, message: String },
}

pub struct HyphaClient {
    client: reqwest::Client,
    server_url: String,
    workspace: String,
    token: String,
}

impl HyphaClient {
    pub fn new(settings: &Settings) -> Self {
        tracing::info!(
            server_url = %settings.server_url,
            workspace = %settings.workspace,
            "Initialized HyphaClient"
        );
        Self {
            client: reqwest::Client::new(),
            server_url: settings.server_url.trim_end_matches('/').to_string(),
            workspace: settings.workspace.clone(),
            token: settings.token.clone(),
        }
    }

    /// Endpoint for one artifact-manager method.
    pub fn rpc_url(&self, method: &str) -> String {
        format!(
            "{}/{}/services/{}/{}",
            self.server_url, SERVICE_WORKSPACE, ARTIFACT_MANAGER_SERVICE, method
        )
    }

    async fn call<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> Result<Value, ClientError> {
        let url = self.rpc_url(method);
        tracing::debug!(method, url = %url, "Calling artifact-manager");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = read_body(resp).await;
            tracing::error!(method, status, message = %text, "artifact-manager call failed");
            return Err(ClientError::Api {
                status,
                message: text,
            });
        }

        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Decode {
            method: method.to_string(),
            message: e.to_string(),
        })
    }
}

/// Body text of a response whose status is already known. A failed read is
/// logged and reported in place of the body.
async fn read_body(resp: reqwest::Response) -> String {
    let status = resp.status().as_u16();
    match resp.text().await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(status, error = %e, "Failed to read response body");
            format!("<failed to read response body: {e}>")
        }
    }
}

/// Decodes an artifact response, filling in the id when the service omits it.
fn decode_artifact(method: &str, value: Value, fallback_id: &str) -> Result<Artifact, ClientError> {
    let mut value = match value {
        Value::Object(map) => Value::Object(map),
        Value::Null => json!({}),
        other => {
            return Err(ClientError::Decode {
                method: method.to_string(),
                message: format!("expected an artifact object, got {other}"),
            })
        }
    };
    if value.get("id").and_then(Value::as_str).is_none() {
        value["id"] = Value::String(fallback_id.to_string());
    }
    serde_json::from_value(value).map_err(|e| ClientError::Decode {
        method: method.to_string(),
        message: e.to_string(),
    })
}

/// `put_file` answers with the URL either as a bare string or wrapped in `{"url": ...}`.
fn decode_upload_url(value: Value) -> Result<String, ClientError> {
    match value {
        Value::String(url) => Ok(url),
        Value::Object(ref map) => match map.get("url").and_then(Value::as_str) {
            Some(url) => Ok(url.to_string()),
            None => Err(ClientError::Decode {
                method: "put_file".to_string(),
                message: format!("no url in {value}"),
            }),
        },
        other => Err(ClientError::Decode {
            method: "put_file".to_string(),
            message: format!("expected an upload URL, got {other}"),
        }),
    }
}

#[async_trait]
impl ArtifactManager for HyphaClient {
    async fn create(&self, req: NewArtifact) -> Result<Artifact, ContractError> {
        tracing::info!(alias = %req.alias, parent_id = ?req.parent_id, stage = req.stage, "Creating artifact");
        let fallback = format!("{}/{}", self.workspace, req.alias);
        let value = self.call("create", &req).await?;
        Ok(decode_artifact("create", value, &fallback)?)
    }

    async fn edit(&self, req: EditArtifact) -> Result<Artifact, ContractError> {
        tracing::info!(artifact_id = %req.artifact_id, stage = req.stage, "Editing artifact");
        let value = self.call("edit", &req).await?;
        Ok(decode_artifact("edit", value, &req.artifact_id)?)
    }

    async fn read(&self, artifact_id: &str) -> Result<Artifact, ContractError> {
        tracing::info!(artifact_id, "Reading artifact");
        let value = self
            .call("read", &json!({ "artifact_id": artifact_id }))
            .await?;
        Ok(decode_artifact("read", value, artifact_id)?)
    }

    async fn put_file(&self, artifact_id: &str, file_path: &str) -> Result<String, ContractError> {
        let value = self
            .call(
                "put_file",
                &json!({ "artifact_id": artifact_id, "file_path": file_path }),
            )
            .await?;
        Ok(decode_upload_url(value)?)
    }

    async fn commit(&self, artifact_id: &str) -> Result<Artifact, ContractError> {
        tracing::info!(artifact_id, "Committing artifact");
        let value = self
            .call("commit", &json!({ "artifact_id": artifact_id }))
            .await?;
        Ok(decode_artifact("commit", value, artifact_id)?)
    }
}

#[async_trait]
impl FileTransport for HyphaClient {
    async fn put_bytes(
        &self,
        url: &str,
        content: Vec<u8>,
    ) -> Result<TransferResponse, ContractError> {
        let size = content.len();
        let resp = self
            .client
            .put(url)
            .body(content)
            .send()
            .await
            .map_err(ClientError::from)?;
        let status = resp.status().as_u16();
        let body = read_body(resp).await;
        tracing::debug!(status, size, "PUT completed");
        Ok(TransferResponse { status, body })
    }
}
