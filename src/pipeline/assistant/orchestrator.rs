use tracing::Instrument;
use uuid::Uuid;

use super::emr::format_plan_snippet;
use super::types::{
    AssistantContext, AssistantReply, DataLookup, DataLookupResponse, EmrWriter, KnowledgeGateway,
    KnowledgeResponse, LookupParams,
};
use super::AssistantError;
use crate::pipeline::entities::{extract_entities, validate_extracted_entities, ValidationResult};
use crate::pipeline::routing::{route_query, AssistantRoute, DataIntent, RouteType};

/// Extract entities from narrative text and validate them.
pub fn extract_and_validate(text: &str) -> ValidationResult {
    validate_extracted_entities(extract_entities(text))
}

/// Query orchestrator.
///
/// Coordinates: route → lookup and/or knowledge → validate → reply.
/// Collaborator calls run one at a time; nothing is retried.
pub struct QueryOrchestrator<D: DataLookup, K: KnowledgeGateway, W: EmrWriter> {
    data: D,
    knowledge: K,
    emr: W,
}

/// Answer gathered from the collaborators before it becomes a reply.
struct Answer {
    markdown: String,
    data: Option<serde_json::Value>,
    knowledge: Option<KnowledgeResponse>,
}

impl<D: DataLookup, K: KnowledgeGateway, W: EmrWriter> QueryOrchestrator<D, K, W> {
    pub fn new(data: D, knowledge: K, emr: W) -> Self {
        Self {
            data,
            knowledge,
            emr,
        }
    }

    /// Answer a UI query. Never fails: collaborator errors become an
    /// `ok == false` reply.
    pub async fn ask(&self, text: &str, context: &AssistantContext) -> AssistantReply {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("assistant_query", %request_id);

        async move {
            let route = route_query(text);
            tracing::info!(
                route_type = ?route.route_type,
                data_intent = ?route.data_intent,
                confidence = route.confidence,
                "Answering assistant query"
            );

            match self.answer(text, &route, context).await {
                Ok(answer) => self.success_reply(route, answer),
                Err(e) => {
                    tracing::warn!(error = %e, "Assistant query failed");
                    AssistantReply::failure(route, &e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Extract and validate entities from narrative text.
    pub fn extract(&self, text: &str) -> ValidationResult {
        extract_and_validate(text)
    }

    /// Append every valid medication to the record's plan field, in order.
    ///
    /// Stops at the first failed write; returns how many were written.
    pub async fn write_medications(
        &self,
        result: &ValidationResult,
        record_id: &str,
    ) -> Result<usize, AssistantError> {
        if record_id.trim().is_empty() {
            return Err(AssistantError::MissingRecordId);
        }

        let today = chrono::Local::now().date_naive();
        let mut written = 0;
        for medication in result.valid_entities.iter().filter_map(|e| e.as_medication()) {
            let snippet = format_plan_snippet(medication, today);
            self.emr.append_to_plan(record_id, medication, &snippet).await?;
            written += 1;
        }

        tracing::info!(record_id, written, "Medications appended to plan");
        Ok(written)
    }

    async fn answer(
        &self,
        text: &str,
        route: &AssistantRoute,
        context: &AssistantContext,
    ) -> Result<Answer, AssistantError> {
        match (route.route_type, route.data_intent) {
            (RouteType::Data, Some(intent)) => {
                let data = self.lookup(intent, route, context).await?;
                Ok(Answer {
                    markdown: data.answer_markdown,
                    data: data.data,
                    knowledge: None,
                })
            }
            (RouteType::Both, Some(intent)) => {
                let data = self.lookup(intent, route, context).await?;
                let knowledge = self.query_knowledge(text).await?;
                Ok(Answer {
                    markdown: format!("{}\n\n{}", data.answer_markdown, knowledge.answer_markdown),
                    data: data.data,
                    knowledge: Some(knowledge),
                })
            }
            // Llm, Free, and any data route the router could not pin to an intent.
            _ => {
                let knowledge = self.query_knowledge(text).await?;
                Ok(Answer {
                    markdown: knowledge.answer_markdown.clone(),
                    data: None,
                    knowledge: Some(knowledge),
                })
            }
        }
    }

    async fn lookup(
        &self,
        intent: DataIntent,
        route: &AssistantRoute,
        context: &AssistantContext,
    ) -> Result<DataLookupResponse, AssistantError> {
        let params = LookupParams::from_route(route, context);
        let response = self.data.lookup(intent, &params).await?;
        if !response.ok {
            return Err(AssistantError::Collaborator {
                service: "data lookup",
                message: response
                    .error
                    .unwrap_or_else(|| format!("no data available for {intent}")),
            });
        }
        tracing::debug!(%intent, "Data lookup answered");
        Ok(response)
    }

    async fn query_knowledge(&self, text: &str) -> Result<KnowledgeResponse, AssistantError> {
        let response = self.knowledge.query(text).await?;
        if !response.ok {
            return Err(AssistantError::Collaborator {
                service: "knowledge gateway",
                message: response
                    .error
                    .unwrap_or_else(|| "no answer available".to_string()),
            });
        }
        tracing::debug!(entities = response.entities.len(), "Knowledge gateway answered");
        Ok(response)
    }

    fn success_reply(&self, route: AssistantRoute, answer: Answer) -> AssistantReply {
        let entities = match answer.knowledge {
            Some(knowledge) => {
                let validation = validate_extracted_entities(knowledge.entities);
                for warning in &validation.warnings {
                    tracing::warn!(warning = %warning, "Knowledge entity rejected");
                }
                validation.valid_entities
            }
            None => Vec::new(),
        };

        AssistantReply {
            ok: true,
            answer_markdown: Some(answer.markdown),
            error: None,
            confidence: route.confidence,
            route,
            data: answer.data,
            entities,
        }
    }
}
