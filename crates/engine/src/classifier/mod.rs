use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::multipart::{Form, Part};

use polisense_common::api::classifier::ClassifierResponse;
use polisense_common::config::ClassifierConfig;
use polisense_common::types::{ClassificationResult, Document};

/// HTTP client for the external leaning/bias classification service.
pub struct ClassifierClient {
    http: reqwest::Client,
    endpoint: String,
}

/// Errors from the classification service. All of them are fatal to an analysis run.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classifier HTTP error: {0}")]
    Http(String),

    #[error("Classifier returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Classifier response parse error: {0}")]
    Parse(String),
}

impl From<ClassifierError> for polisense_common::PoliSenseError {
    fn from(e: ClassifierError) -> Self {
        polisense_common::PoliSenseError::ClassificationService(e.to_string())
    }
}

impl ClassifierClient {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ClassifierError::Http(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                config.upload_path
            ),
        })
    }

    /// Upload the document and decode the leaning + bias evaluation.
    pub async fn classify(
        &self,
        document: &Document,
    ) -> Result<ClassificationResult, ClassifierError> {
        let start = std::time::Instant::now();

        let part = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.mime_type)
            .map_err(|e| ClassifierError::Http(e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClassifierError::Http(e.to_string()))?;

        let status = response.status();
        metrics::histogram!("classifier.latency").record(start.elapsed().as_secs_f64());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ClassifierResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        tracing::debug!(
            predicted_class_id = body.leaning.predicted_class_id,
            evidence = body.bias.top_biased_sentences.len(),
            "Classifier response received"
        );

        Ok(body.into())
    }
}

/// Object-safe seam over the classification service.
pub trait Classifier: Send + Sync {
    fn classify<'a>(
        &'a self,
        document: &'a Document,
    ) -> Pin<Box<dyn Future<Output = Result<ClassificationResult, ClassifierError>> + Send + 'a>>;
}

impl Classifier for ClassifierClient {
    fn classify<'a>(
        &'a self,
        document: &'a Document,
    ) -> Pin<Box<dyn Future<Output = Result<ClassificationResult, ClassifierError>> + Send + 'a>>
    {
        Box::pin(self.classify(document))
    }
}
