use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where an assistant query should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    /// Structured lookup against the patient/record context.
    Data,
    /// Clinical knowledge answer from the LLM gateway.
    Llm,
    /// Data lookup followed by a knowledge answer.
    Both,
    /// Unconstrained conversation. Never produced by the keyword router.
    Free,
}

impl RouteType {
    pub fn has_data_component(&self) -> bool {
        matches!(self, Self::Data | Self::Both)
    }
}

/// Specific structured lookup a data route maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataIntent {
    Age,
    Mri,
    TodayAppointments,
    PendingNotes,
}

impl DataIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Mri => "mri",
            Self::TodayAppointments => "todayAppointments",
            Self::PendingNotes => "pendingNotes",
        }
    }
}

impl std::fmt::Display for DataIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing decision for one assistant query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRoute {
    #[serde(rename = "type")]
    pub route_type: RouteType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_intent: Option<DataIntent>,
    /// Values lifted from the query in their original case.
    #[serde(default)]
    pub entities: BTreeMap<String, String>,
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_serializes_with_type_key() {
        let route = AssistantRoute {
            route_type: RouteType::Data,
            data_intent: Some(DataIntent::TodayAppointments),
            entities: BTreeMap::new(),
            confidence: 0.95,
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["type"], "data");
        assert_eq!(json["dataIntent"], "todayAppointments");
        assert_eq!(json["entities"], serde_json::json!({}));
    }

    #[test]
    fn route_without_intent_omits_field() {
        let route = AssistantRoute {
            route_type: RouteType::Llm,
            data_intent: None,
            entities: BTreeMap::new(),
            confidence: 0.8,
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["type"], "llm");
        assert!(json.get("dataIntent").is_none());
    }

    #[test]
    fn data_component() {
        assert!(RouteType::Data.has_data_component());
        assert!(RouteType::Both.has_data_component());
        assert!(!RouteType::Llm.has_data_component());
        assert!(!RouteType::Free.has_data_component());
    }

    #[test]
    fn data_intent_display_matches_wire_name() {
        for intent in [
            DataIntent::Age,
            DataIntent::Mri,
            DataIntent::TodayAppointments,
            DataIntent::PendingNotes,
        ] {
            let wire = serde_json::to_value(intent).unwrap();
            assert_eq!(wire, intent.to_string());
        }
    }
}
