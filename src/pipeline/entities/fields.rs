//! Secondary field patterns for medications.
//!
//! After a drug name matches, the text around it is re-scanned for strength,
//! dose, frequency, duration and route. The scan never crosses another drug
//! mention: a field is taken from the first hit after the name, falling back
//! to the nearest hit before it when no other drug precedes it.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Characters on each side of a drug-name match that are re-scanned.
pub const CONTEXT_RADIUS_CHARS: usize = 50;

static STRENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:[.,]\d+)?)\s*(mg|mcg|µg|g|ml|ui)\b").unwrap()
});

static DOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d+|una?|medio|media|dos|tres)\s+(comprimidos?|tabletas?|c[aá]psulas?|sobres?|gotas?|ampollas?|parches?|inyecci[oó]n(?:es)?)\b",
    )
    .unwrap()
});

static FREQUENCY_INTERVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcada\s+(\d+)\s*(horas?|h|d[ií]as?|semanas?)\b").unwrap()
});

static FREQUENCY_TIMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+|una|dos|tres|cuatro)\s+(?:veces|vez)\s+(?:al|por)\s+(d[ií]a|semana)\b")
        .unwrap()
});

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:por|durante)\s+(\d+)\s+(d[ií]as?|semanas?|mes(?:es)?)\b").unwrap()
});

static ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(intramuscular|v[ií]a\s+im|t[oó]pic[oa]|gel|crema|pomada|subcut[aá]ne[oa])\b",
    )
    .unwrap()
});

/// Fields found around a medication mention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicationFields {
    pub strength: Option<String>,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub duration_days: Option<u32>,
    pub route: Option<&'static str>,
}

/// Text on each side of one drug mention, bounded by the radius and by
/// neighbouring drug mentions. `before` is empty when another mention
/// precedes this one within the radius.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MentionContext<'t> {
    pub before: &'t str,
    pub after: &'t str,
}

/// Slice the context of the mention at `start..end`.
///
/// `others` are the byte spans of every other drug mention in `text`.
/// Offsets are byte offsets on char boundaries (as produced by `regex`);
/// the radius is counted in chars, never splitting a code point.
pub fn mention_context<'t>(
    text: &'t str,
    start: usize,
    end: usize,
    others: &[(usize, usize)],
    radius: usize,
) -> MentionContext<'t> {
    let radius_start = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(start, |(i, _)| i);
    let previous_end = others
        .iter()
        .filter(|&&(_, e)| e <= start)
        .map(|&(_, e)| e)
        .max();

    let radius_end = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);
    let next_start = others
        .iter()
        .filter(|&&(s, _)| s >= end)
        .map(|&(s, _)| s)
        .min()
        .unwrap_or(text.len());

    // Text between two mentions is read forward by the earlier one.
    let before = match previous_end {
        Some(previous_end) if previous_end >= radius_start => "",
        _ => &text[radius_start..start],
    };

    MentionContext {
        before,
        after: &text[end..radius_end.min(next_start)],
    }
}

/// Scan a mention's context for every secondary medication field.
pub fn scan_medication_fields(context: &MentionContext<'_>) -> MedicationFields {
    MedicationFields {
        strength: pick(context, strengths),
        dose: pick(context, doses),
        frequency: pick(context, frequencies),
        duration_days: pick(context, durations),
        route: pick(context, routes),
    }
}

/// First hit after the name, else the last (nearest) hit before it.
fn pick<T>(context: &MentionContext<'_>, scan: fn(&str) -> Vec<T>) -> Option<T> {
    scan(context.after)
        .into_iter()
        .next()
        .or_else(|| scan(context.before).into_iter().last())
}

fn strengths(window: &str) -> Vec<String> {
    STRENGTH.captures_iter(window).map(|c| format_strength(&c)).collect()
}

fn doses(window: &str) -> Vec<String> {
    DOSE.captures_iter(window).map(|c| format_dose(&c)).collect()
}

fn durations(window: &str) -> Vec<u32> {
    DURATION
        .captures_iter(window)
        .filter_map(|c| duration_to_days(&c))
        .collect()
}

fn routes(window: &str) -> Vec<&'static str> {
    ROUTE
        .captures_iter(window)
        .map(|c| normalize_route(&c[1]))
        .collect()
}

fn format_strength(caps: &Captures<'_>) -> String {
    format!("{} {}", &caps[1], caps[2].to_lowercase())
}

fn format_dose(caps: &Captures<'_>) -> String {
    format!("{} {}", caps[1].to_lowercase(), caps[2].to_lowercase())
}

/// Interval form ("cada 8 horas") wins over count form ("3 veces al día").
fn frequencies(window: &str) -> Vec<String> {
    let intervals: Vec<String> = FREQUENCY_INTERVAL
        .captures_iter(window)
        .filter_map(|caps| {
            let count: u32 = caps[1].parse().ok()?;
            let unit = interval_unit(&caps[2], count);
            Some(format!("cada {count} {unit}"))
        })
        .collect();
    if !intervals.is_empty() {
        return intervals;
    }

    FREQUENCY_TIMES
        .captures_iter(window)
        .filter_map(|caps| {
            let count = parse_count(&caps[1])?;
            let times = if count == 1 { "vez" } else { "veces" };
            let period = if caps[2].to_lowercase().starts_with('s') {
                "a la semana"
            } else {
                "al día"
            };
            Some(format!("{count} {times} {period}"))
        })
        .collect()
}

/// Normalize the interval unit, plural when the count is two or more.
fn interval_unit(raw: &str, count: u32) -> &'static str {
    let lower = raw.to_lowercase();
    let plural = count != 1;
    if lower.starts_with('h') {
        if plural { "horas" } else { "hora" }
    } else if lower.starts_with('s') {
        if plural { "semanas" } else { "semana" }
    } else if plural {
        "días"
    } else {
        "día"
    }
}

fn parse_count(raw: &str) -> Option<u32> {
    match raw.to_lowercase().as_str() {
        "una" => Some(1),
        "dos" => Some(2),
        "tres" => Some(3),
        "cuatro" => Some(4),
        digits => digits.parse().ok(),
    }
}

fn duration_to_days(caps: &Captures<'_>) -> Option<u32> {
    let amount: u32 = caps[1].parse().ok()?;
    let unit = caps[2].to_lowercase();
    let factor = if unit.starts_with('s') {
        7
    } else if unit.starts_with('m') {
        30
    } else {
        1
    };
    amount.checked_mul(factor)
}

fn normalize_route(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();
    if lower.starts_with("intra") || lower.starts_with("v") {
        "intramuscular"
    } else if lower.starts_with("sub") {
        "subcutánea"
    } else {
        "tópica"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_after(text: &str) -> MedicationFields {
        scan_medication_fields(&MentionContext { before: "", after: text })
    }

    fn frequency(text: &str) -> Option<String> {
        frequencies(text).into_iter().next()
    }

    #[test]
    fn context_clamps_at_text_edges() {
        let text = "ibuprofeno 400 mg";
        let context = mention_context(text, 0, 10, &[], 50);
        assert_eq!(context.before, "");
        assert_eq!(context.after, " 400 mg");
    }

    #[test]
    fn context_respects_multibyte_chars() {
        let text = "ñññññ tramadol ááááá";
        let start = text.find("tramadol").unwrap();
        let end = start + "tramadol".len();
        let context = mention_context(text, start, end, &[], 3);
        assert_eq!(context.before, "ññ ");
        assert_eq!(context.after, " áá");
    }

    #[test]
    fn context_excludes_text_beyond_radius() {
        let filler = "x".repeat(60);
        let text = format!("600 mg {filler} naproxeno {filler} 200 mg");
        let start = text.find("naproxeno").unwrap();
        let context =
            mention_context(&text, start, start + "naproxeno".len(), &[], CONTEXT_RADIUS_CHARS);
        assert!(!context.before.contains("mg"));
        assert!(!context.after.contains("mg"));
    }

    #[test]
    fn context_stops_at_neighbouring_mentions() {
        let text = "Ibuprofeno 600 mg cada 8 horas y paracetamol 1 g cada 6 horas";
        let ibuprofeno = (0, "Ibuprofeno".len());
        let start = text.find("paracetamol").unwrap();
        let paracetamol = (start, start + "paracetamol".len());

        let first = mention_context(text, ibuprofeno.0, ibuprofeno.1, &[paracetamol], 50);
        assert_eq!(first.after, " 600 mg cada 8 horas y ");

        let second = mention_context(text, paracetamol.0, paracetamol.1, &[ibuprofeno], 50);
        assert_eq!(second.before, "");
        assert_eq!(second.after, " 1 g cada 6 horas");
    }

    #[test]
    fn after_wins_over_before() {
        let fields = scan_medication_fields(&MentionContext {
            before: "500 mg cada 12 horas, ",
            after: " 1 g",
        });
        assert_eq!(fields.strength.as_deref(), Some("1 g"));
        assert_eq!(fields.frequency.as_deref(), Some("cada 12 horas"));
    }

    #[test]
    fn before_falls_back_to_nearest_hit() {
        let fields = scan_medication_fields(&MentionContext {
            before: "5 mg o mejor 10 mg de ",
            after: "",
        });
        assert_eq!(fields.strength.as_deref(), Some("10 mg"));
    }

    #[test]
    fn scans_full_prescription() {
        let fields = scan_after("ibuprofeno 400 mg cada 8 horas por 7 días");
        assert_eq!(fields.strength.as_deref(), Some("400 mg"));
        assert_eq!(fields.frequency.as_deref(), Some("cada 8 horas"));
        assert_eq!(fields.duration_days, Some(7));
        assert_eq!(fields.dose, None);
        assert_eq!(fields.route, None);
    }

    #[test]
    fn interval_unit_singular_and_plural() {
        assert_eq!(frequency("cada 1 horas").as_deref(), Some("cada 1 hora"));
        assert_eq!(frequency("cada 12 h").as_deref(), Some("cada 12 horas"));
        assert_eq!(frequency("cada 2 dia").as_deref(), Some("cada 2 días"));
        assert_eq!(frequency("cada 1 semana").as_deref(), Some("cada 1 semana"));
    }

    #[test]
    fn times_per_day_frequency() {
        assert_eq!(frequency("tres veces al día").as_deref(), Some("3 veces al día"));
        assert_eq!(frequency("una vez al dia").as_deref(), Some("1 vez al día"));
        assert_eq!(frequency("2 veces por semana").as_deref(), Some("2 veces a la semana"));
    }

    #[test]
    fn duration_converts_weeks_and_months() {
        assert_eq!(scan_after("durante 2 semanas").duration_days, Some(14));
        assert_eq!(scan_after("por 1 mes").duration_days, Some(30));
        assert_eq!(scan_after("por 10 dias").duration_days, Some(10));
    }

    #[test]
    fn dose_and_route() {
        let fields = scan_after("1 comprimido de diclofenaco en gel");
        assert_eq!(fields.dose.as_deref(), Some("1 comprimido"));
        assert_eq!(fields.route, Some("tópica"));

        let fields = scan_after("dexametasona vía IM");
        assert_eq!(fields.route, Some("intramuscular"));
    }

    #[test]
    fn strength_keeps_decimal_and_lowercases_unit() {
        let fields = scan_after("prednisona 2,5 MG");
        assert_eq!(fields.strength.as_deref(), Some("2,5 mg"));
    }
}
