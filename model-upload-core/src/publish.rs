//! High-level pipeline: orchestrates create-or-edit → upload → commit for one model.
//!
//! This module provides the top-level orchestration for publishing a model directory to the
//! artifact catalog. It implements a strictly sequential pipeline that:
//!   - Ensures the parent collection exists (create, or read it back if create fails)
//!   - Ensures the model artifact exists in staging (create, or edit if create fails)
//!   - Uploads every listed file: request an upload URL, then PUT the bytes there
//!   - Commits the staged artifact once every file went through
//!
//! # Major Types
//! - [`PublishTarget`]: where the model goes (workspace, collection, model id)
//! - [`PublishReport`]: what was created or edited and which files were sent
//!
//! # Responsibilities
//! - Fail-fast: the first failing remote call or non-success PUT ends the run, and
//!   `commit` is never reached
//! - Exactly one upload attempt per file, no retries
//! - Logs every step through `tracing`
//!
//! # Callable From
//! - The CLI crate, with the real Hypha client
//! - Tests, with [`MockArtifactManager`](crate::contract::MockArtifactManager) and
//!   [`MockFileTransport`](crate::contract::MockFileTransport)

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::contract::{
    ArtifactManager, ContractError, EditArtifact, FileTransport, NewArtifact, TransferResponse,
};
use crate::files::LocalFile;
use crate::manifest::ModelManifest;

pub const COLLECTION_TYPE: &str = "collection";
pub const MODEL_TYPE: &str = "model";

/// Where a model is published.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishTarget {
    pub workspace: String,
    pub collection: String,
    pub model_id: String,
}

impl PublishTarget {
    pub fn new(workspace: &str, collection: &str, manifest: &ModelManifest) -> Self {
        Self {
            workspace: workspace.to_string(),
            collection: collection.to_string(),
            model_id: manifest.id.clone(),
        }
    }

    pub fn collection_id(&self) -> String {
        format!("{}/{}", self.workspace, self.collection)
    }

    pub fn artifact_id(&self) -> String {
        format!("{}/{}", self.workspace, self.model_id)
    }
}

/// How the model artifact came to exist in staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactAction {
    Created,
    Edited,
}

#[derive(Debug)]
pub struct PublishReport {
    pub artifact_id: String,
    pub action: ArtifactAction,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("collection {collection_id} could not be created or read: {source}")]
    Collection {
        collection_id: String,
        #[source]
        source: ContractError,
    },
    #[error("artifact {artifact_id} could not be created or edited: {source}")]
    Artifact {
        artifact_id: String,
        #[source]
        source: ContractError,
    },
    #[error("failed to get upload URL for {path}: {source}")]
    PutFile {
        path: String,
        #[source]
        source: ContractError,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to transfer {path}: {source}")]
    Transfer {
        path: String,
        #[source]
        source: ContractError,
    },
    #[error("upload of {path} failed with HTTP status {status}: {body}")]
    UploadStatus {
        path: String,
        status: u16,
        body: String,
    },
    #[error("failed to commit artifact {artifact_id}: {source}")]
    Commit {
        artifact_id: String,
        #[source]
        source: ContractError,
    },
}

/// Entrypoint: publish `files` under `target`, described by `manifest`.
pub async fn publish<M, T>(
    target: &PublishTarget,
    manifest: &ModelManifest,
    files: &[LocalFile],
    manager: &M,
    transport: &T,
) -> Result<PublishReport, PublishError>
where
    M: ArtifactManager + ?Sized,
    T: FileTransport + ?Sized,
{
    let artifact_id = target.artifact_id();
    info!(
        artifact_id = %artifact_id,
        collection_id = %target.collection_id(),
        files = files.len(),
        "[PUBLISH] Starting model publish"
    );

    ensure_collection(target, manager).await?;
    let action = ensure_artifact(target, manifest, manager).await?;
    let uploaded = upload_files(&artifact_id, files, manager, transport).await?;

    info!(artifact_id = %artifact_id, "[PUBLISH] Committing staged artifact");
    if let Err(e) = manager.commit(&artifact_id).await {
        error!(artifact_id = %artifact_id, error = ?e, "[PUBLISH][ERROR] commit failed");
        return Err(PublishError::Commit {
            artifact_id,
            source: e,
        });
    }
    info!(artifact_id = %artifact_id, files = uploaded.len(), "[PUBLISH] Commit succeeded");

    Ok(PublishReport {
        artifact_id,
        action,
        files: uploaded,
    })
}

/// Creates the parent collection; if that fails it is assumed to exist and is read back.
pub async fn ensure_collection<M>(target: &PublishTarget, manager: &M) -> Result<(), PublishError>
where
    M: ArtifactManager + ?Sized,
{
    let collection_id = target.collection_id();
    let req = NewArtifact {
        alias: target.collection.clone(),
        parent_id: None,
        artifact_type: COLLECTION_TYPE.to_string(),
        manifest: serde_json::json!({
            "name": target.collection,
            "description": format!("Model collection {}", collection_id),
        }),
        stage: false,
    };

    match manager.create(req).await {
        Ok(created) => {
            info!(collection_id = %created.id, "[PUBLISH] Created collection");
            Ok(())
        }
        Err(e) => {
            info!(collection_id = %collection_id, reason = %e, "Collection likely already exists");
            match manager.read(&collection_id).await {
                Ok(existing) => {
                    debug!(collection_id = %existing.id, "[PUBLISH] Collection confirmed");
                    Ok(())
                }
                Err(e) => {
                    error!(collection_id = %collection_id, error = ?e, "[PUBLISH][ERROR] Collection read failed");
                    Err(PublishError::Collection {
                        collection_id,
                        source: e,
                    })
                }
            }
        }
    }
}

/// Creates the model artifact in staging; if that fails it is edited into staging instead.
pub async fn ensure_artifact<M>(
    target: &PublishTarget,
    manifest: &ModelManifest,
    manager: &M,
) -> Result<ArtifactAction, PublishError>
where
    M: ArtifactManager + ?Sized,
{
    let artifact_id = target.artifact_id();
    let payload = manifest.to_payload();
    let req = NewArtifact {
        alias: target.model_id.clone(),
        parent_id: Some(target.collection_id()),
        artifact_type: MODEL_TYPE.to_string(),
        manifest: payload.clone(),
        stage: true,
    };

    match manager.create(req).await {
        Ok(created) => {
            info!(artifact_id = %created.id, "[PUBLISH] Created staged artifact");
            Ok(ArtifactAction::Created)
        }
        Err(e) => {
            info!(artifact_id = %artifact_id, reason = %e, "Artifact likely already exists, editing instead");
            let edit = EditArtifact {
                artifact_id: artifact_id.clone(),
                manifest: payload,
                stage: true,
            };
            match manager.edit(edit).await {
                Ok(edited) => {
                    info!(artifact_id = %edited.id, "[PUBLISH] Edited artifact into staging");
                    Ok(ArtifactAction::Edited)
                }
                Err(e) => {
                    error!(artifact_id = %artifact_id, error = ?e, "[PUBLISH][ERROR] edit failed");
                    Err(PublishError::Artifact {
                        artifact_id,
                        source: e,
                    })
                }
            }
        }
    }
}

/// Uploads files one after the other. The first failure stops the loop.
pub async fn upload_files<M, T>(
    artifact_id: &str,
    files: &[LocalFile],
    manager: &M,
    transport: &T,
) -> Result<Vec<UploadedFile>, PublishError>
where
    M: ArtifactManager + ?Sized,
    T: FileTransport + ?Sized,
{
    let mut uploaded = Vec::with_capacity(files.len());

    for file in files {
        info!(file = %file.relative_path, size = file.size, "[PUBLISH][UPLOAD] Requesting upload URL");
        let url = manager
            .put_file(artifact_id, &file.relative_path)
            .await
            .map_err(|e| {
                error!(file = %file.relative_path, error = ?e, "[PUBLISH][ERROR] put_file failed");
                PublishError::PutFile {
                    path: file.relative_path.clone(),
                    source: e,
                }
            })?;

        let content = tokio::fs::read(&file.path).await.map_err(|e| {
            error!(file = %file.path.display(), error = ?e, "[PUBLISH][ERROR] Failed to read file");
            PublishError::Io {
                path: file.relative_path.clone(),
                source: e,
            }
        })?;
        let size = content.len() as u64;
        let sha256 = format!("{:x}", Sha256::digest(&content));

        let response = transport.put_bytes(&url, content).await.map_err(|e| {
            error!(file = %file.relative_path, error = ?e, "[PUBLISH][ERROR] Transfer failed");
            PublishError::Transfer {
                path: file.relative_path.clone(),
                source: e,
            }
        })?;
        ensure_success(&file.relative_path, response)?;

        debug!(file = %file.relative_path, size, sha256 = %sha256, "[PUBLISH][UPLOAD] File uploaded");
        uploaded.push(UploadedFile {
            path: file.relative_path.clone(),
            size,
            sha256,
        });
    }

    if uploaded.is_empty() {
        warn!(artifact_id, "[PUBLISH] No files to upload; committing manifest only");
    }
    Ok(uploaded)
}

/// Turns a non-success transfer status into an error, logging it first.
pub fn ensure_success(path: &str, response: TransferResponse) -> Result<(), PublishError> {
    if response.is_success() {
        return Ok(());
    }
    error!(
        file = path,
        status = response.status,
        body = %response.body,
        "[PUBLISH][ERROR] Upload returned non-success status"
    );
    Err(PublishError::UploadStatus {
        path: path.to_string(),
        status: response.status,
        body: response.body,
    })
}
