#![doc = "model-upload-core: core logic library for model-upload."]

//! This crate contains the manifest model, the directory listing and the publish pipeline.
//! No transport code lives here: the remote catalog is reached through the traits in
//! [`contract`], implemented by the CLI crate and by mocks.
//!
//! # Usage
//! Build a [`manifest::ModelManifest`], list files with [`files::collect_files`], then hand
//! both to [`publish::publish`] together with an [`contract::ArtifactManager`] and a
//! [`contract::FileTransport`].

pub mod contract;
pub mod files;
pub mod manifest;
pub mod publish;
