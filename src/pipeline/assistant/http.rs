//! HTTP clients for the assistant's collaborators.
//!
//! Each client posts JSON to a configured base URL. Connection failures,
//! non-success statuses and undecodable bodies map to `AssistantError`.
//! No timeout or retry is applied here.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::types::{
    DataLookup, DataLookupResponse, EmrWriter, KnowledgeGateway, KnowledgeResponse, LookupParams,
};
use super::AssistantError;
use crate::pipeline::entities::{Entity, MedicationEntity};
use crate::pipeline::routing::DataIntent;

/// Structured data lookup over HTTP: `POST {base}/lookup`.
pub struct HttpDataLookup {
    base_url: String,
    client: reqwest::Client,
}

/// Knowledge gateway over HTTP: `POST {base}/query`.
pub struct HttpKnowledgeGateway {
    base_url: String,
    client: reqwest::Client,
}

/// EMR plan writer over HTTP: `POST {base}/records/{id}/plan`.
pub struct HttpEmrWriter {
    base_url: String,
    client: reqwest::Client,
}

impl HttpDataLookup {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

impl HttpKnowledgeGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

impl HttpEmrWriter {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn plan_url(&self, record_id: &str) -> Result<Url, AssistantError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| AssistantError::HttpClient(format!("Invalid EMR URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| AssistantError::HttpClient("EMR URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["records", record_id, "plan"]);
        Ok(url)
    }
}

#[derive(Serialize)]
struct LookupRequest<'a> {
    intent: DataIntent,
    params: &'a LookupParams,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct PlanAppendRequest<'a> {
    snippet: &'a str,
    medication: &'a MedicationEntity,
}

/// Knowledge response as sent on the wire; entities are decoded one by one.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawKnowledgeResponse {
    ok: bool,
    #[serde(default)]
    answer_markdown: String,
    #[serde(default)]
    entities: Vec<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl DataLookup for HttpDataLookup {
    async fn lookup(
        &self,
        intent: DataIntent,
        params: &LookupParams,
    ) -> Result<DataLookupResponse, AssistantError> {
        let url = format!("{}/lookup", self.base_url);
        post_json(&self.client, &url, &LookupRequest { intent, params }).await
    }
}

#[async_trait]
impl KnowledgeGateway for HttpKnowledgeGateway {
    async fn query(&self, text: &str) -> Result<KnowledgeResponse, AssistantError> {
        let url = format!("{}/query", self.base_url);
        let raw: RawKnowledgeResponse = post_json(&self.client, &url, &QueryRequest { text }).await?;

        Ok(KnowledgeResponse {
            ok: raw.ok,
            answer_markdown: raw.answer_markdown,
            entities: decode_entities(raw.entities),
            error: raw.error,
        })
    }
}

#[async_trait]
impl EmrWriter for HttpEmrWriter {
    async fn append_to_plan(
        &self,
        record_id: &str,
        medication: &MedicationEntity,
        snippet: &str,
    ) -> Result<(), AssistantError> {
        let url = self.plan_url(record_id)?;
        let response = self
            .client
            .post(url.clone())
            .json(&PlanAppendRequest {
                snippet,
                medication,
            })
            .send()
            .await
            .map_err(|e| map_send_error(e, url.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

async fn post_json<B, R>(client: &reqwest::Client, url: &str, body: &B) -> Result<R, AssistantError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| map_send_error(e, url))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AssistantError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<R>()
        .await
        .map_err(|e| AssistantError::MalformedResponse(e.to_string()))
}

fn map_send_error(e: reqwest::Error, url: &str) -> AssistantError {
    if e.is_connect() {
        AssistantError::Connection(url.to_string())
    } else {
        AssistantError::HttpClient(e.to_string())
    }
}

/// Decode gateway entities, dropping any that are malformed or whose
/// confidence falls outside [0, 1].
fn decode_entities(raw: Vec<serde_json::Value>) -> Vec<Entity> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<Entity>(value) {
            Ok(entity) if (0.0..=1.0).contains(&entity.confidence()) => Some(entity),
            Ok(entity) => {
                tracing::warn!(
                    kind = entity.kind().as_str(),
                    confidence = entity.confidence(),
                    "Dropping gateway entity with out-of-range confidence"
                );
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed gateway entity");
                None
            }
        })
        .collect()
}
