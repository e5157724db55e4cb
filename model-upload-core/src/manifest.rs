//! Model manifest: the descriptive record sent as the artifact's `manifest` payload.
//!
//! A manifest either comes from `manifest.yaml` inside the model directory, or is
//! synthesized from the model name when no such file exists.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, error, info};

pub const MANIFEST_FILE: &str = "manifest.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Artifact alias inside the workspace.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Every other top-level key, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("manifest {path} has an empty id")]
    EmptyId { path: String },
}

impl ModelManifest {
    /// The manifest as a JSON value, ready for a `create`/`edit` payload.
    pub fn to_payload(&self) -> serde_json::Value {
        // Serializing a struct of strings and JSON values cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Reads `<dir>/manifest.yaml`.
pub fn load_manifest<P: AsRef<Path>>(dir: P) -> Result<ModelManifest, ManifestError> {
    let path = dir.as_ref().join(MANIFEST_FILE);
    let manifest_path = path.display().to_string();
    info!(manifest_path = %manifest_path, "Loading model manifest");

    let content = std::fs::read_to_string(&path).map_err(|e| {
        error!(error = ?e, manifest_path = %manifest_path, "Failed to read manifest file");
        ManifestError::Io {
            path: manifest_path.clone(),
            source: e,
        }
    })?;

    let manifest: ModelManifest = serde_yaml::from_str(&content).map_err(|e| {
        error!(error = ?e, manifest_path = %manifest_path, "Failed to parse manifest YAML");
        ManifestError::Parse {
            path: manifest_path.clone(),
            source: e,
        }
    })?;

    if manifest.id.trim().is_empty() {
        error!(manifest_path = %manifest_path, "Manifest id is empty");
        return Err(ManifestError::EmptyId {
            path: manifest_path,
        });
    }

    debug!(?manifest, "Manifest parsed");
    Ok(manifest)
}

/// Builds a minimal manifest when only a model name is known.
pub fn synthesize_manifest(model_name: &str) -> ModelManifest {
    let manifest = ModelManifest {
        id: slugify(model_name),
        name: Some(model_name.to_string()),
        description: Some(format!("Model {model_name}")),
        extra: serde_json::Map::new(),
    };
    info!(id = %manifest.id, model_name, "Synthesized manifest from model name");
    manifest
}

/// Uses `manifest.yaml` when present, otherwise synthesizes one from `model_name`.
///
/// A manifest file that exists but does not parse is an error, never a silent fallback.
pub fn manifest_for<P: AsRef<Path>>(
    dir: P,
    model_name: &str,
) -> Result<ModelManifest, ManifestError> {
    if dir.as_ref().join(MANIFEST_FILE).is_file() {
        load_manifest(dir)
    } else {
        synthesize_manifest_checked(model_name)
    }
}

fn synthesize_manifest_checked(model_name: &str) -> Result<ModelManifest, ManifestError> {
    let manifest = synthesize_manifest(model_name);
    if manifest.id.is_empty() {
        return Err(ManifestError::EmptyId {
            path: format!("<synthesized from {model_name:?}>"),
        });
    }
    Ok(manifest)
}

/// Lowercases and collapses everything outside `[a-z0-9]` into single dashes.
pub fn slugify(s: &str) -> String {
    static NON_ALNUM: OnceLock<Regex> = OnceLock::new();
    let re = NON_ALNUM.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"));
    re.replace_all(&s.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}
