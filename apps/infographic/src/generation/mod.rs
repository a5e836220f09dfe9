//! Layout generation client, the single point of entry for the remote
//! infographic layout service.
//!
//! Both request shapes POST to `{endpoint}/generate` and come back as parallel
//! box/label sequences. No retry: a transport failure, timeout or non-2xx
//! status reaches the caller as the underlying `reqwest::Error`.

use std::time::Duration;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::layout::NormalizedBox;

pub const DEFAULT_ENDPOINT: &str = "https://infographic-generator-106858723129.herokuapp.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation returned {bboxes} boxes but {labels} labels")]
    LengthMismatch { bboxes: usize, labels: usize },

    #[error("generation returned box {index} outside the unit square: {bbox:?}")]
    InvalidBox { index: usize, bbox: [f64; 4] },
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    num_label: &'a [u32],
    label: &'a [u32],
}

/// Edit constraint between two existing elements of a layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditRequest {
    pub id_a: u32,
    pub id_b: u32,
    pub relation: String,
    pub bbox: Vec<NormalizedBox>,
    pub num_label: Vec<u32>,
    pub label: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    results: GenerationResults,
}

#[derive(Debug, Deserialize)]
struct GenerationResults {
    bbox: Vec<NormalizedBox>,
    label: Vec<u32>,
}

/// Boxes and labels of a generated layout; `bboxes[i]` carries `labels[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub bboxes: Vec<NormalizedBox>,
    pub labels: Vec<u32>,
}

#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    endpoint: String,
}

impl GenerationClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, GenerationError> {
        let endpoint: String = endpoint.into();
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Requests a fresh layout for the given label counts and labels.
    pub async fn generate(
        &self,
        num_label: &[u32],
        label: &[u32],
    ) -> Result<Layout, GenerationError> {
        self.post(&GenerateBody { num_label, label }).await
    }

    /// Requests a layout that applies `request.relation` between elements
    /// `id_a` and `id_b` of an existing layout.
    pub async fn edit(&self, request: &EditRequest) -> Result<Layout, GenerationError> {
        self.post(request).await
    }

    async fn post<B: Serialize + ?Sized>(&self, body: &B) -> Result<Layout, GenerationError> {
        let url = format!("{}/generate", self.endpoint);
        let response: GenerationResponse = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/plain")
            .json(body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let GenerationResults { bbox, label } = response.results;
        if bbox.len() != label.len() {
            return Err(GenerationError::LengthMismatch {
                bboxes: bbox.len(),
                labels: label.len(),
            });
        }
        if let Some(index) = bbox.iter().position(|b| !b.is_normalized()) {
            return Err(GenerationError::InvalidBox {
                index,
                bbox: bbox[index].into(),
            });
        }
        debug!(elements = bbox.len(), "Layout generation succeeded");

        Ok(Layout {
            bboxes: bbox,
            labels: label,
        })
    }
}
