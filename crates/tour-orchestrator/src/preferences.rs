//! Preference service client
//!
//! Every terminal outcome leaves exactly one durable trace in the onboarding
//! preference backend. Calls are fire-and-forget: failures are logged and
//! never block a state transition.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::PreferenceError;

/// Onboarding flags read at page mount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub never_show: bool,
}

impl OnboardingStatus {
    pub fn should_auto_start(&self) -> bool {
        !self.completed && !self.never_show
    }
}

#[async_trait]
pub trait PreferenceService: Send + Sync {
    async fn mark_completed(&self) -> Result<(), PreferenceError>;
    async fn mark_never_show(&self) -> Result<(), PreferenceError>;
    async fn mark_skipped(&self) -> Result<(), PreferenceError>;
    async fn status(&self) -> Result<OnboardingStatus, PreferenceError>;
}

/// One preference update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceCall {
    Completed,
    NeverShow,
    Skipped,
}

impl PreferenceCall {
    pub fn name(&self) -> &'static str {
        match self {
            PreferenceCall::Completed => "completed",
            PreferenceCall::NeverShow => "never_show",
            PreferenceCall::Skipped => "skipped",
        }
    }
}

/// Spawns preference updates without awaiting them
#[derive(Clone)]
pub struct PreferenceReporter {
    service: Arc<dyn PreferenceService>,
}

impl PreferenceReporter {
    pub fn new(service: Arc<dyn PreferenceService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<dyn PreferenceService> {
        &self.service
    }

    pub fn report(&self, call: PreferenceCall) {
        let service = Arc::clone(&self.service);
        tokio::spawn(async move {
            let result = match call {
                PreferenceCall::Completed => service.mark_completed().await,
                PreferenceCall::NeverShow => service.mark_never_show().await,
                PreferenceCall::Skipped => service.mark_skipped().await,
            };
            match result {
                Ok(()) => debug!(call = call.name(), "preference recorded"),
                Err(err) => warn!(
                    call = call.name(),
                    retryable = err.is_retryable(),
                    "preference update failed: {err}"
                ),
            }
        });
    }
}

#[derive(Debug, Clone)]
pub struct HttpPreferenceConfig {
    pub api_base: String,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl HttpPreferenceConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            bearer_token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Preference service over the application's REST API
pub struct HttpPreferenceClient {
    client: Client,
    config: HttpPreferenceConfig,
}

impl HttpPreferenceClient {
    pub fn new(config: HttpPreferenceConfig) -> Result<Self, PreferenceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| PreferenceError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/onboarding/{}",
            self.config.api_base.trim_end_matches('/'),
            path
        )
    }

    async fn post(&self, path: &str) -> Result<(), PreferenceError> {
        let mut request = self.client.post(self.url(path));
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(PreferenceError::Status { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceService for HttpPreferenceClient {
    async fn mark_completed(&self) -> Result<(), PreferenceError> {
        self.post("complete").await
    }

    async fn mark_never_show(&self) -> Result<(), PreferenceError> {
        self.post("never-show").await
    }

    async fn mark_skipped(&self) -> Result<(), PreferenceError> {
        self.post("skip").await
    }

    async fn status(&self) -> Result<OnboardingStatus, PreferenceError> {
        let mut request = self.client.get(self.url("status"));
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(PreferenceError::Status { status, body });
        }
        response
            .json::<OnboardingStatus>()
            .await
            .map_err(|err| PreferenceError::Decode(err.to_string()))
    }
}
