///
/// This module implements the CLI interface for model-upload: argument parsing, resolving
/// which directory and model name to publish, and the async [`run`] entrypoint.
///
/// All pipeline logic (manifest model, directory listing, create/upload/commit) lives in the
/// [`model-upload-core`] crate. This module is glue only.
///
/// ## How To Use
/// - From the shell: `model-upload <MODEL_DIR_OR_NAME> [--model-dir <DIR>]`.
/// - From code or tests: call [`run`] with a constructed [`Cli`].
///
/// [`model-upload-core`]: ../../model-upload-core/
use crate::load_config::load_config;
use crate::upload::HyphaClient;
use anyhow::{Context, Result};
use clap::Parser;
use model_upload_core::files::collect_files;
use model_upload_core::manifest::manifest_for;
use model_upload_core::publish::{publish, PublishTarget};
use std::path::{Path, PathBuf};

/// Directory searched for a model when only its name is given.
pub const DEFAULT_MODELS_ROOT: &str = "models";

/// CLI for model-upload: publish a model directory to the Hypha artifact catalog.
#[derive(Parser, Debug)]
#[clap(
    name = "model-upload",
    version,
    about = "Upload a model directory to a Hypha artifact collection"
)]
pub struct Cli {
    /// Model directory, or a model name to look up under `models/`
    pub model: String,

    /// Upload this directory instead of the one derived from MODEL
    #[clap(long)]
    pub model_dir: Option<PathBuf>,
}

/// Which directory to upload and under which name.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSource {
    pub name: String,
    pub dir: PathBuf,
}

/// Resolves the positional MODEL and the optional `--model-dir` into a [`ModelSource`].
///
/// An explicit `--model-dir` always wins. Otherwise an existing directory, or anything that
/// looks like a path, is taken as-is; a bare name is looked up under [`DEFAULT_MODELS_ROOT`].
pub fn resolve_model_source(model: &str, model_dir: Option<&Path>) -> ModelSource {
    let name = Path::new(model)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| model.to_string());

    let source = match model_dir {
        Some(dir) => ModelSource {
            name,
            dir: dir.to_path_buf(),
        },
        None if Path::new(model).is_dir() || Path::new(model).components().count() > 1 => {
            ModelSource {
                name,
                dir: PathBuf::from(model),
            }
        }
        None => ModelSource {
            name: model.to_string(),
            dir: Path::new(DEFAULT_MODELS_ROOT).join(model),
        },
    };
    tracing::info!(model_name = %source.name, dir = %source.dir.display(), "Resolved model source");
    source
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let settings = load_config().context("Failed to load settings")?;
    let source = resolve_model_source(&cli.model, cli.model_dir.as_deref());

    let manifest = manifest_for(&source.dir, &source.name)
        .with_context(|| format!("Failed to build manifest for {}", source.dir.display()))?;
    let files = collect_files(&source.dir)
        .with_context(|| format!("Failed to list files in {}", source.dir.display()))?;

    let target = PublishTarget::new(&settings.workspace, &settings.collection, &manifest);
    let client = HyphaClient::new(&settings);

    tracing::info!(command = "upload", artifact_id = %target.artifact_id(), files = files.len(), "Starting upload");
    match publish(&target, &manifest, &files, &client, &client).await {
        Ok(report) => {
            tracing::info!(
                command = "upload",
                artifact_id = %report.artifact_id,
                action = ?report.action,
                files = report.files.len(),
                total_bytes = report.files.iter().map(|f| f.size).sum::<u64>(),
                "Upload complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "upload", error = %e, "Upload failed");
            Err(anyhow::Error::new(e).context(format!("Upload of {} failed", target.artifact_id())))
        }
    }
}
