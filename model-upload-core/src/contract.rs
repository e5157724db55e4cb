//! # contract: interfaces to the remote artifact catalog
//!
//! This module defines the two traits the publish pipeline talks through:
//!
//! - [`ArtifactManager`]: the artifact-manager RPC surface (`create`, `edit`, `read`,
//!   `put_file`, `commit`).
//! - [`FileTransport`]: the raw HTTP PUT of file bytes to a URL handed out by `put_file`.
//!
//! Neither trait knows about authentication, base URLs or the wire encoding; that lives in
//! the concrete client of the CLI crate.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, so tests can script every remote call and
//!   assert how often (and in which order) the pipeline makes them.
//!
//! ## Errors
//! - All methods return the boxed [`ContractError`]. The pipeline wraps it with the stage
//!   and the artifact id or file path it was working on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error type for contract calls (simple boxed error, as returned by any client).
pub type ContractError = Box<dyn std::error::Error + Send + Sync>;

/// Data needed to create a new artifact (a collection or a model entry).
#[derive(Debug, Clone, Serialize)]
pub struct NewArtifact {
    /// Short name of the artifact inside its workspace, e.g. `ai-model-hub` or `unet-v2`.
    pub alias: String,
    /// Full id of the parent collection, if any (`<workspace>/<collection>`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Artifact type as understood by the catalog (`collection`, `model`, ...).
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// Manifest payload, stored verbatim by the service.
    pub manifest: serde_json::Value,
    /// Whether the artifact starts out staged (invisible until committed).
    pub stage: bool,
}

/// Data needed to edit an existing artifact.
#[derive(Debug, Clone, Serialize)]
pub struct EditArtifact {
    pub artifact_id: String,
    pub manifest: serde_json::Value,
    pub stage: bool,
}

/// An artifact as returned by the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub id: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default, rename = "type")]
    pub artifact_type: Option<String>,
    #[serde(default)]
    pub manifest: Option<serde_json::Value>,
    #[serde(default)]
    pub staging: Option<serde_json::Value>,
}

/// Outcome of a raw byte upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferResponse {
    pub status: u16,
    pub body: String,
}

impl TransferResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for the artifact-manager RPC service.
///
/// The trait is implemented by the real HTTP client and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ArtifactManager: Send + Sync {
    /// Create a new artifact. Fails if it already exists (among other reasons).
    async fn create(&self, req: NewArtifact) -> Result<Artifact, ContractError>;

    /// Replace the manifest of an existing artifact, optionally putting it into staging.
    async fn edit(&self, req: EditArtifact) -> Result<Artifact, ContractError>;

    /// Fetch an artifact by its full id.
    async fn read(&self, artifact_id: &str) -> Result<Artifact, ContractError>;

    /// Request an upload URL for one file of a staged artifact.
    async fn put_file(&self, artifact_id: &str, file_path: &str) -> Result<String, ContractError>;

    /// Commit the staged artifact so its files become visible.
    async fn commit(&self, artifact_id: &str) -> Result<Artifact, ContractError>;
}

/// Trait for sending raw file bytes to an upload URL.
///
/// A non-success HTTP status is returned as data, not as an error: deciding what a bad
/// status means is the caller's job.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait FileTransport: Send + Sync {
    async fn put_bytes(&self, url: &str, content: Vec<u8>)
        -> Result<TransferResponse, ContractError>;
}
