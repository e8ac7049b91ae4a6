use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::types::{AssistantRoute, DataIntent, RouteType};

/// Confidence of a single, unambiguous data-intent match.
pub const DATA_CONFIDENCE: f32 = 0.95;
/// Confidence of a clinical-knowledge match with no data intent.
pub const KNOWLEDGE_CONFIDENCE: f32 = 0.8;
/// Confidence when both a data intent and knowledge vocabulary match.
pub const AMBIGUOUS_CONFIDENCE: f32 = 0.7;
/// Confidence of the no-match fallback.
pub const FALLBACK_CONFIDENCE: f32 = 0.3;

static PATIENT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[Pp]aciente|[Pp]atient)\s+([A-ZÁÉÍÓÚÑ][a-záéíóúñü]+(?:\s+[A-ZÁÉÍÓÚÑ][a-záéíóúñü]+)*)")
        .unwrap()
});

static BODY_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(rodilla|hombro|columna(?:\s+(?:lumbar|cervical|dorsal))?|cadera|tobillo|muñeca|codo|cervical|lumbar|knee|shoulder|spine|hip|ankle)\b",
    )
    .unwrap()
});

// Data-intent vocabulary is word-bounded: "edad" must not match "enfermedad",
// nor "cita" match "solicita".
static AGE_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:edad|cu[aá]ntos\s+años|años\s+tiene|fecha\s+de\s+nacimiento|how\s+old|age)\b",
    )
    .unwrap()
});

static MRI_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:resonancias?|rmn|mri|pruebas?\s+de\s+imagen|imaging)\b").unwrap()
});

static APPOINTMENT_TERMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:citas?|agendas?|appointments?)\b").unwrap());

static TODAY_TERMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:hoy|today)\b").unwrap());

static NOTE_TERMS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:notas?|notes?)\b").unwrap());

static PENDING_TERMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:pendientes?|sin\s+firmar|sin\s+completar|pending|unsigned)\b").unwrap()
});

/// Route an assistant query using keyword heuristics.
///
/// Never fails: a query matching nothing gets the low-confidence fallback.
pub fn route_query(text: &str) -> AssistantRoute {
    let lower = text.to_lowercase();

    let data_intent = detect_data_intent(&lower);
    let knowledge = has_knowledge_pattern(&lower);

    let (route_type, confidence) = match (data_intent, knowledge) {
        (Some(_), true) => (RouteType::Both, AMBIGUOUS_CONFIDENCE),
        (Some(_), false) => (RouteType::Data, DATA_CONFIDENCE),
        (None, true) => (RouteType::Llm, KNOWLEDGE_CONFIDENCE),
        // Falls back to Data rather than Free; kept as the established behavior.
        (None, false) => (RouteType::Data, FALLBACK_CONFIDENCE),
    };

    let route = AssistantRoute {
        route_type,
        data_intent,
        entities: extract_route_entities(text, data_intent),
        confidence,
    };

    tracing::debug!(
        route_type = ?route.route_type,
        data_intent = ?route.data_intent,
        confidence = route.confidence,
        "Query routed"
    );

    route
}

/// First data intent whose vocabulary matches, in declared order.
fn detect_data_intent(text: &str) -> Option<DataIntent> {
    if has_age_pattern(text) {
        Some(DataIntent::Age)
    } else if has_mri_pattern(text) {
        Some(DataIntent::Mri)
    } else if has_today_appointments_pattern(text) {
        Some(DataIntent::TodayAppointments)
    } else if has_pending_notes_pattern(text) {
        Some(DataIntent::PendingNotes)
    } else {
        None
    }
}

fn has_age_pattern(text: &str) -> bool {
    AGE_TERMS.is_match(text)
}

fn has_mri_pattern(text: &str) -> bool {
    MRI_TERMS.is_match(text)
}

fn has_today_appointments_pattern(text: &str) -> bool {
    APPOINTMENT_TERMS.is_match(text) && TODAY_TERMS.is_match(text)
}

fn has_pending_notes_pattern(text: &str) -> bool {
    NOTE_TERMS.is_match(text) && PENDING_TERMS.is_match(text)
}

/// Clinical knowledge vocabulary not tied to a specific patient record.
fn has_knowledge_pattern(text: &str) -> bool {
    let patterns = [
        // Spanish
        "ejercicio",
        "tratamiento",
        "síntoma",
        "sintoma",
        "recomienda",
        "recomendación",
        "recomendacion",
        "terapia",
        "rehabilitación",
        "rehabilitacion",
        "protocolo",
        "contraindica",
        "evidencia",
        "estiramiento",
        "dolor",
        "pauta",
        "manejo de",
        "diagnóstico diferencial",
        // English
        "exercise",
        "treatment",
        "symptom",
        "therapy",
        "recommend",
    ];
    patterns.iter().any(|p| text.contains(p))
}

/// Lift embedded values from the original-case query.
fn extract_route_entities(text: &str, data_intent: Option<DataIntent>) -> BTreeMap<String, String> {
    let mut entities = BTreeMap::new();

    if let Some(caps) = PATIENT_NAME.captures(text) {
        entities.insert("patientName".to_string(), caps[1].to_string());
    }

    if data_intent == Some(DataIntent::Mri) {
        if let Some(caps) = BODY_REGION.captures(text) {
            entities.insert("bodyRegion".to_string(), caps[1].to_string());
        }
    }

    entities
}
