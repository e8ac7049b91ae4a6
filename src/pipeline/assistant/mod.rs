pub mod types;
pub mod emr;
pub mod http;
pub mod orchestrator;

pub use types::*;
pub use emr::format_plan_snippet;
pub use http::{HttpDataLookup, HttpEmrWriter, HttpKnowledgeGateway};
pub use orchestrator::{extract_and_validate, QueryOrchestrator};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Collaborator not reachable at {0}")]
    Connection(String),

    #[error("Collaborator returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed collaborator response: {0}")]
    MalformedResponse(String),

    #[error("{service} reported failure: {message}")]
    Collaborator {
        service: &'static str,
        message: String,
    },

    #[error("A clinical record id is required")]
    MissingRecordId,
}
