use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::AssistantError;
use crate::pipeline::entities::{Entity, MedicationEntity};
use crate::pipeline::routing::{AssistantRoute, DataIntent};

/// Caller context attached to an assistant query by the UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContext {
    pub patient_id: Option<String>,
    pub record_id: Option<String>,
}

/// Parameters sent with a structured data lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    /// Values the router lifted from the query.
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
}

impl LookupParams {
    pub fn from_route(route: &AssistantRoute, context: &AssistantContext) -> Self {
        Self {
            patient_id: context.patient_id.clone(),
            record_id: context.record_id.clone(),
            entities: route.entities.clone(),
        }
    }
}

/// Answer from the structured data lookup service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataLookupResponse {
    pub ok: bool,
    #[serde(default)]
    pub answer_markdown: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Answer from the clinical knowledge gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeResponse {
    pub ok: bool,
    #[serde(default)]
    pub answer_markdown: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final result handed back to the UI for one query.
///
/// `ok == false` means "no answer available": `answer_markdown` is absent,
/// `error` carries the message and `confidence` is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub confidence: f32,
    pub route: AssistantRoute,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Knowledge-gateway entities that passed validation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
}

impl AssistantReply {
    pub fn failure(route: AssistantRoute, error: &AssistantError) -> Self {
        Self {
            ok: false,
            answer_markdown: None,
            error: Some(error.to_string()),
            confidence: 0.0,
            route,
            data: None,
            entities: Vec::new(),
        }
    }
}

/// Structured lookup about a specific patient or record.
#[async_trait]
pub trait DataLookup: Send + Sync {
    async fn lookup(
        &self,
        intent: DataIntent,
        params: &LookupParams,
    ) -> Result<DataLookupResponse, AssistantError>;
}

/// Free-text clinical knowledge answers (LLM-backed).
#[async_trait]
pub trait KnowledgeGateway: Send + Sync {
    async fn query(&self, text: &str) -> Result<KnowledgeResponse, AssistantError>;
}

/// Appends medication snippets to a clinical record's plan field.
///
/// Only medications are accepted; other entity kinds have no write path.
#[async_trait]
pub trait EmrWriter: Send + Sync {
    async fn append_to_plan(
        &self,
        record_id: &str,
        medication: &MedicationEntity,
        snippet: &str,
    ) -> Result<(), AssistantError>;
}
