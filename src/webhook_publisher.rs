use crate::config::Config;
use crate::errors::AppError;
use crate::linkedin_models::{AnswerRecord, LeadsPayload};

/// Result of a publish attempt. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No webhook configured.
    Skipped,
    /// The webhook answered 2xx.
    Delivered { status: u16 },
    /// Transport failure or non-2xx answer.
    Failed { status: Option<u16>, message: String },
}

/// Forwards synced rows to the configured webhook as `{"data": [...]}`.
#[derive(Clone)]
pub struct WebhookPublisher {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookPublisher {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create webhook client: {}", e))
            })?;

        Ok(Self {
            client,
            url: config.webhook_url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Posts `records` once. Never retries and never returns an error.
    pub async fn publish(&self, records: &[AnswerRecord]) -> PublishOutcome {
        let Some(ref url) = self.url else {
            tracing::warn!(
                "WEBHOOK_URL is not defined or is an empty string. Skipping webhook posting."
            );
            return PublishOutcome::Skipped;
        };

        let payload = LeadsPayload { data: records };
        let result = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("cache-control", "no-cache")
            .json(&payload)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Webhook request error: {}", e);
                return PublishOutcome::Failed {
                    status: None,
                    message: e.to_string(),
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            tracing::info!(
                "Payload of {} record(s) successfully posted to webhook.",
                records.len()
            );
            return PublishOutcome::Delivered {
                status: status.as_u16(),
            };
        }

        let error_text = response.text().await.unwrap_or_default();
        tracing::error!("Webhook returned non-success status");
        tracing::error!("Response status code: {}", status);
        tracing::error!("Response text: {}", error_text);

        PublishOutcome::Failed {
            status: Some(status.as_u16()),
            message: error_text,
        }
    }
}
