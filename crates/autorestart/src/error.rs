// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Error types for the autorestart crate

use std::path::PathBuf;
use thiserror::Error;

/// Failure to discover the locally installed version.
///
/// Any of these leaves the monitor unarmed for the rest of the process lifetime.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("version metadata not found at {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("PatchVersion not found in {}", .0.display())]
    PatternNotMatched(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reason a single check cycle could not produce a verdict.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("version check API returned success=false")]
    Unsuccessful,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("version check API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum AutoRestartError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("process error: {0}")]
    Process(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

pub type Result<T> = std::result::Result<T, AutoRestartError>;
