// Health classification: remote inference service first, local load threshold as fallback.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{Status, TelemetrySnapshot};
use crate::version::USER_AGENT;

/// Fraction of capacity at or above which the local rule reports a failure.
pub const FAILURE_LOAD_RATIO: f64 = 0.8;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("inference request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("inference response has no status")]
    MissingStatus,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    status: Option<String>,
}

/// Local rule: `Present` iff load >= 80% of capacity. Never fails.
pub fn fallback_status(snapshot: &TelemetrySnapshot, capacity: f64) -> Status {
    if snapshot.load >= capacity * FAILURE_LOAD_RATIO {
        Status::Present
    } else {
        Status::NotPresent
    }
}

#[derive(Debug, Clone)]
pub struct StatusClassifier {
    client: reqwest::Client,
    predict_url: Option<String>,
}

impl StatusClassifier {
    /// Classifier backed by `POST {predict_url}`; requests give up after `timeout`.
    pub fn new(predict_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            predict_url: Some(predict_url.into()),
        })
    }

    /// Classifier that never calls out; always uses [`fallback_status`].
    pub fn local_only() -> Self {
        Self {
            client: reqwest::Client::new(),
            predict_url: None,
        }
    }

    pub fn predict_url(&self) -> Option<&str> {
        self.predict_url.as_deref()
    }

    /// Single inference call. Non-2xx, undecodable body or missing status are all errors.
    pub async fn predict(
        &self,
        url: &str,
        snapshot: &TelemetrySnapshot,
    ) -> Result<Status, ClassifyError> {
        let body: PredictResponse = self
            .client
            .post(url)
            .json(snapshot)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        body.status.map(Status::from).ok_or(ClassifyError::MissingStatus)
    }

    /// Always yields a status: the remote answer verbatim, or the local rule if the call fails.
    pub async fn classify(&self, snapshot: &TelemetrySnapshot, capacity: f64) -> Status {
        let Some(url) = self.predict_url.as_deref() else {
            return fallback_status(snapshot, capacity);
        };
        match self.predict(url, snapshot).await {
            Ok(status) => {
                debug!(operation = "predict", %status, "inference status received");
                status
            }
            Err(e) => {
                let status = fallback_status(snapshot, capacity);
                warn!(
                    error = %e,
                    operation = "predict",
                    fallback_status = %status,
                    "inference unavailable; using load threshold"
                );
                status
            }
        }
    }
}
