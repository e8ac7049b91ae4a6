//! Plan-field snippets for validated medications.

use chrono::NaiveDate;

use crate::pipeline::entities::MedicationEntity;

/// Format a medication as a one-line plan entry.
///
/// `[17/10/2026] Ibuprofeno 400 mg, 1 comprimido, cada 8 horas, durante 7 días, vía oral`
pub fn format_plan_snippet(medication: &MedicationEntity, date: NaiveDate) -> String {
    let mut parts = vec![capitalize(&medication.name)];

    if let Some(strength) = &medication.strength {
        parts[0] = format!("{} {strength}", parts[0]);
    }
    if let Some(dose) = &medication.dose {
        parts.push(dose.clone());
    }
    if let Some(frequency) = &medication.frequency {
        parts.push(frequency.clone());
    }
    if let Some(days) = medication.duration_days {
        let unit = if days == 1 { "día" } else { "días" };
        parts.push(format!("durante {days} {unit}"));
    }
    parts.push(format!("vía {}", medication.route));

    format!("[{}] {}", date.format("%d/%m/%Y"), parts.join(", "))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
