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

//! Remote version check against the Steam `UpToDateCheck` endpoint

use crate::config::AutoRestartConfig;
use crate::error::CheckError;
use crate::version::{LocalVersion, RequiredVersion};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("autorestart/", env!("CARGO_PKG_VERSION"));
const UP_TO_DATE_PATH: &str = "/ISteamApps/UpToDateCheck/v0001/";

/// Verdict of a single check cycle. Never persisted.
#[derive(Debug)]
pub enum CheckResult {
    UpToDate,
    StaleAt(RequiredVersion),
    RemoteFailure(CheckError),
}

/// Source of truth for whether the local version is still current.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn check(&self, version: &LocalVersion) -> CheckResult;
}

#[derive(Debug, Deserialize)]
struct UpToDateEnvelope {
    response: UpToDateResponse,
}

#[derive(Debug, Deserialize)]
struct UpToDateResponse {
    success: bool,
    #[serde(default)]
    up_to_date: Option<bool>,
    #[serde(default)]
    required_version: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct UpToDateClient {
    client: reqwest::Client,
    url: String,
    app_id: u32,
}

impl UpToDateClient {
    /// Client for the `UpToDateCheck` endpoint under `base_url`.
    ///
    /// Every request is bounded by `timeout`; running past it is a transport failure.
    pub fn new(base_url: &str, app_id: u32, timeout: Duration) -> Result<Self, CheckError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: format!("{}{UP_TO_DATE_PATH}", base_url.trim_end_matches('/')),
            app_id,
        })
    }

    /// Client using the configured endpoint, app id and request timeout.
    pub fn from_config(config: &AutoRestartConfig) -> Result<Self, CheckError> {
        Self::new(
            config.api_base_url(),
            config.app_id,
            config.request_timeout(),
        )
    }

    async fn fetch(&self, version: &LocalVersion) -> Result<CheckResult, CheckError> {
        let app_id = self.app_id.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[("appid", app_id.as_str()), ("version", version.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_owned());
            return Err(CheckError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let envelope: UpToDateEnvelope = serde_json::from_str(&body)
            .map_err(|e| CheckError::Malformed(format!("Failed to parse response: {e}")))?;

        interpret(&envelope.response)
    }
}

fn interpret(response: &UpToDateResponse) -> Result<CheckResult, CheckError> {
    if !response.success {
        return Err(CheckError::Unsuccessful);
    }

    match response.up_to_date {
        Some(true) => Ok(CheckResult::UpToDate),
        Some(false) => response
            .required_version
            .map(|v| CheckResult::StaleAt(RequiredVersion(v)))
            .ok_or_else(|| CheckError::Malformed("missing required_version".to_owned())),
        None => Err(CheckError::Malformed("missing up_to_date".to_owned())),
    }
}

#[async_trait]
impl UpdateSource for UpToDateClient {
    async fn check(&self, version: &LocalVersion) -> CheckResult {
        self.fetch(version)
            .await
            .unwrap_or_else(CheckResult::RemoteFailure)
    }
}
