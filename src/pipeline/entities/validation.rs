// Post-extraction validation for clinical entities.
// Filter-only: kept entities are passed through untouched.

use super::types::{Entity, ValidationResult};

/// Entities at or below this confidence are dropped without a warning.
pub const MIN_CONFIDENCE: f32 = 0.3;

/// Validate extracted entities and compute the quality score.
///
/// Nameless medications and label-less diagnoses are removed with one
/// warning each. Anything else at or below `MIN_CONFIDENCE` is removed
/// silently. The quality score is the mean confidence of what remains,
/// rounded to two decimals, or 0 when nothing remains.
pub fn validate_extracted_entities(entities: Vec<Entity>) -> ValidationResult {
    let input_count = entities.len();
    let mut warnings = Vec::new();
    let mut low_confidence = 0usize;

    let valid_entities: Vec<Entity> = entities
        .into_iter()
        .filter(|entity| {
            if let Some(warning) = missing_field_warning(entity) {
                warnings.push(warning);
                return false;
            }
            if entity.confidence() <= MIN_CONFIDENCE {
                low_confidence += 1;
                return false;
            }
            true
        })
        .collect();

    let quality_score = quality_score(&valid_entities);

    if !warnings.is_empty() {
        tracing::warn!(
            warning_count = warnings.len(),
            "Entity validation removed entities with missing fields"
        );
    }
    tracing::debug!(
        input_count,
        kept = valid_entities.len(),
        low_confidence,
        quality_score,
        "Entity validation complete"
    );

    ValidationResult {
        valid_entities,
        quality_score,
        warnings,
    }
}

fn missing_field_warning(entity: &Entity) -> Option<String> {
    let prefix = match entity {
        Entity::Medication(m) if m.name.trim().is_empty() => "Medicamento sin nombre",
        Entity::Diagnosis(d) if d.label.trim().is_empty() => "Diagnóstico sin etiqueta",
        _ => return None,
    };
    let serialized = serde_json::to_string(entity).unwrap_or_default();
    Some(format!("{prefix}: {serialized}"))
}

/// Mean confidence rounded to two decimals; 0 for an empty slice.
pub fn quality_score(entities: &[Entity]) -> f32 {
    if entities.is_empty() {
        return 0.0;
    }
    let sum: f32 = entities.iter().map(Entity::confidence).sum();
    round2(sum / entities.len() as f32)
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::entities::extract_entities;
    use crate::pipeline::entities::types::*;

    fn medication(name: &str, confidence: f32) -> Entity {
        Entity::Medication(MedicationEntity::named(name, confidence))
    }

    fn diagnosis(label: &str, confidence: f32) -> Entity {
        Entity::Diagnosis(DiagnosisEntity {
            label: label.into(),
            coding: vec![],
            confidence,
        })
    }

    fn instruction(text: &str, confidence: f32) -> Entity {
        Entity::Instruction(InstructionEntity {
            text: text.into(),
            confidence,
        })
    }

    #[test]
    fn nameless_medication_is_dropped_with_warning() {
        let result = validate_extracted_entities(vec![medication("", 0.9)]);
        assert!(result.valid_entities.is_empty());
        assert_eq!(result.quality_score, 0.0);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Medicamento sin nombre"));
        assert!(result.warnings[0].contains(r#""kind":"medication""#));
    }

    #[test]
    fn labelless_diagnosis_is_dropped_with_warning() {
        let result = validate_extracted_entities(vec![diagnosis("  ", 0.9), diagnosis("lumbalgia", 0.9)]);
        assert_eq!(result.valid_entities.len(), 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Diagnóstico sin etiqueta"));
    }

    #[test]
    fn low_confidence_dropped_silently() {
        let result = validate_extracted_entities(vec![
            medication("tramadol", 0.3),
            instruction("Caminar", 0.1),
            diagnosis("cervicalgia", 0.31),
        ]);
        assert_eq!(result.valid_entities, vec![diagnosis("cervicalgia", 0.31)]);
        assert!(result.warnings.is_empty());
        assert_eq!(result.quality_score, 0.31);
    }

    #[test]
    fn missing_field_takes_precedence_over_low_confidence() {
        let result = validate_extracted_entities(vec![medication("", 0.1)]);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn empty_procedure_label_is_not_a_warning_case() {
        let result = validate_extracted_entities(vec![Entity::Procedure(ProcedureEntity {
            label: String::new(),
            coding: vec![],
            confidence: 0.9,
        })]);
        assert_eq!(result.valid_entities.len(), 1);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn quality_score_is_rounded_mean() {
        let result = validate_extracted_entities(vec![
            medication("ibuprofeno", 0.9),
            medication("tramadol", 0.8),
            instruction("Evitar cargas", 0.75),
        ]);
        // (0.9 + 0.8 + 0.75) / 3 = 0.8166...
        assert_eq!(result.quality_score, 0.82);
    }

    #[test]
    fn empty_input_scores_zero() {
        let result = validate_extracted_entities(vec![]);
        assert_eq!(result.quality_score, 0.0);
        assert!(result.valid_entities.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn kept_entities_are_unchanged_and_ordered() {
        let input = extract_entities(
            "Lumbalgia crónica. Naproxeno 550 mg cada 12 horas. Terapia manual. Evitar cargas.",
        );
        let result = validate_extracted_entities(input.clone());
        assert_eq!(result.valid_entities, input);
        assert!(result
            .valid_entities
            .iter()
            .all(|e| e.confidence() > MIN_CONFIDENCE));
    }
}
