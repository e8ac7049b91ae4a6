use serde::{Deserialize, Serialize};

/// Route of administration used when the text names none.
pub const DEFAULT_MEDICATION_ROUTE: &str = "oral";

/// A structured clinical fact extracted from free text.
///
/// Serialized as an internally tagged object: `{"kind": "medication", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Medication(MedicationEntity),
    Diagnosis(DiagnosisEntity),
    Procedure(ProcedureEntity),
    Instruction(InstructionEntity),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationEntity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    #[serde(default = "default_route")]
    pub route: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisEntity {
    pub label: String,
    #[serde(default)]
    pub coding: Vec<ClinicalCoding>,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureEntity {
    pub label: String,
    #[serde(default)]
    pub coding: Vec<ClinicalCoding>,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionEntity {
    pub text: String,
    pub confidence: f32,
}

/// A code from an external terminology (ICD-10 for diagnoses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalCoding {
    pub system: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Entity categories, in the order the extractor emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Medication,
    Diagnosis,
    Procedure,
    Instruction,
}

impl EntityKind {
    /// Fixed pass order of the extractor. Output is grouped in this order
    /// regardless of where matches occur in the source text.
    pub const EXTRACTION_ORDER: [EntityKind; 4] = [
        EntityKind::Medication,
        EntityKind::Diagnosis,
        EntityKind::Procedure,
        EntityKind::Instruction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medication => "medication",
            Self::Diagnosis => "diagnosis",
            Self::Procedure => "procedure",
            Self::Instruction => "instruction",
        }
    }
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Medication(_) => EntityKind::Medication,
            Self::Diagnosis(_) => EntityKind::Diagnosis,
            Self::Procedure(_) => EntityKind::Procedure,
            Self::Instruction(_) => EntityKind::Instruction,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Self::Medication(m) => m.confidence,
            Self::Diagnosis(d) => d.confidence,
            Self::Procedure(p) => p.confidence,
            Self::Instruction(i) => i.confidence,
        }
    }

    /// Human-readable primary value: drug name, label, or instruction text.
    pub fn display_value(&self) -> &str {
        match self {
            Self::Medication(m) => &m.name,
            Self::Diagnosis(d) => &d.label,
            Self::Procedure(p) => &p.label,
            Self::Instruction(i) => &i.text,
        }
    }

    pub fn as_medication(&self) -> Option<&MedicationEntity> {
        match self {
            Self::Medication(m) => Some(m),
            _ => None,
        }
    }
}

impl MedicationEntity {
    /// A medication with only a name; other fields are filled by the caller.
    pub fn named(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            strength: None,
            dose: None,
            frequency: None,
            duration_days: None,
            route: default_route(),
            confidence,
        }
    }
}

fn default_route() -> String {
    DEFAULT_MEDICATION_ROUTE.to_string()
}

/// Outcome of entity validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid_entities: Vec<Entity>,
    pub quality_score: f32,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medication_serializes_with_kind_tag_and_camel_case() {
        let mut med = MedicationEntity::named("ibuprofeno", 0.9);
        med.duration_days = Some(7);
        let json = serde_json::to_value(Entity::Medication(med)).unwrap();

        assert_eq!(json["kind"], "medication");
        assert_eq!(json["name"], "ibuprofeno");
        assert_eq!(json["durationDays"], 7);
        assert_eq!(json["route"], "oral");
        assert!(json.get("strength").is_none());
    }

    #[test]
    fn medication_deserializes_with_default_route() {
        let entity: Entity =
            serde_json::from_str(r#"{"kind":"medication","name":"tramadol","confidence":0.8}"#)
                .unwrap();
        let med = entity.as_medication().unwrap();
        assert_eq!(med.route, "oral");
        assert_eq!(med.duration_days, None);
    }

    #[test]
    fn diagnosis_deserializes_without_coding() {
        let entity: Entity =
            serde_json::from_str(r#"{"kind":"diagnosis","label":"lumbalgia","confidence":0.9}"#)
                .unwrap();
        match entity {
            Entity::Diagnosis(d) => assert!(d.coding.is_empty()),
            other => panic!("unexpected entity: {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result: Result<Entity, _> =
            serde_json::from_str(r#"{"kind":"allergy","label":"x","confidence":0.5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn kind_accessor_matches_variant() {
        let entity = Entity::Instruction(InstructionEntity {
            text: "Caminar 30 minutos".into(),
            confidence: 0.8,
        });
        assert_eq!(entity.kind(), EntityKind::Instruction);
        assert_eq!(entity.kind().as_str(), "instruction");
        assert_eq!(entity.display_value(), "Caminar 30 minutos");
        assert!(entity.as_medication().is_none());
    }

    #[test]
    fn validation_result_serializes_camel_case() {
        let result = ValidationResult {
            valid_entities: vec![],
            quality_score: 0.0,
            warnings: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("validEntities").is_some());
        assert!(json.get("qualityScore").is_some());
    }
}
