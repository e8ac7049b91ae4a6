//! Declarative extraction rules.
//!
//! Each row is `(kind, group, regex, confidence, builder)`. The extractor runs
//! rows kind by kind in `EntityKind::EXTRACTION_ORDER`, and within a kind in
//! the order declared here.

use std::sync::LazyLock;

use regex::Regex;

use super::extractor::{
    build_diagnosis, build_imperative, build_medication, build_precaution, build_procedure,
};
use super::types::{Entity, EntityKind};

/// A single regex hit handed to a rule's builder.
#[derive(Debug, Clone, Copy)]
pub struct RuleHit<'t> {
    /// Full input text, original case.
    pub text: &'t str,
    /// Byte range of the hit inside `text`.
    pub start: usize,
    pub end: usize,
    /// Confidence of the rule that produced the hit.
    pub confidence: f32,
}

impl<'t> RuleHit<'t> {
    pub fn matched(&self) -> &'t str {
        &self.text[self.start..self.end]
    }
}

pub type EntityBuilder = fn(&RuleHit<'_>) -> Entity;

pub struct PatternRule {
    pub kind: EntityKind,
    pub group: &'static str,
    pub regex: Regex,
    pub confidence: f32,
    pub build: EntityBuilder,
}

/// Instruction group names; the instruction pass clips each group at the other.
pub const GROUP_IMPERATIVE: &str = "imperative";
pub const GROUP_PRECAUTION: &str = "precaution";

const DIAGNOSIS_QUALIFIER: &str =
    r"(?:\s+(?:cr[oó]nica|aguda|subaguda|mec[aá]nica|inespec[ií]fica|bilateral|derecha|izquierda)\b)?";

fn rule(
    kind: EntityKind,
    group: &'static str,
    pattern: &str,
    confidence: f32,
    build: EntityBuilder,
) -> PatternRule {
    PatternRule {
        kind,
        group,
        regex: Regex::new(pattern).unwrap(),
        confidence,
        build,
    }
}

pub static PATTERN_TABLE: LazyLock<Vec<PatternRule>> = LazyLock::new(|| {
    use EntityKind::*;

    vec![
        // ── Medications, grouped by clinical class ──
        rule(
            Medication,
            "anti_inflammatory",
            r"(?i)\b(?:ibuprofeno|naproxeno|dexketoprofeno|ketoprofeno|diclofenaco|aceclofenaco|meloxicam|celecoxib|etoricoxib|paracetamol|metamizol)\b",
            0.9,
            build_medication,
        ),
        rule(
            Medication,
            "muscle_relaxant",
            r"(?i)\b(?:ciclobenzaprina|tizanidina|metocarbamol|baclofeno|tiocolchic[oó]sido|diazepam)\b",
            0.85,
            build_medication,
        ),
        rule(
            Medication,
            "minor_opioid",
            r"(?i)\b(?:tramadol|code[ií]na|tapentadol)\b",
            0.8,
            build_medication,
        ),
        rule(
            Medication,
            "corticosteroid",
            r"(?i)\b(?:metilprednisolona|prednisona|dexametasona|deflazacort|betametasona|triamcinolona|hidrocortisona)\b",
            0.9,
            build_medication,
        ),
        // ── Diagnoses ──
        rule(
            Diagnosis,
            "musculoskeletal_pain",
            &format!(
                r"(?i)\b(?:lumbociatalgia|lumboci[aá]tica|lumbalgia|cervicalgia|dorsalgia|ci[aá]tica|gonalgia|omalgia|coxalgia|talalgia|fibromialgia|tendinopat[ií]a|tendinitis|epicondilitis|epitrocle[ií]tis|fascitis\s+plantar|bursitis|contractura\s+muscular)\b{DIAGNOSIS_QUALIFIER}"
            ),
            0.9,
            build_diagnosis,
        ),
        rule(
            Diagnosis,
            "neurological",
            r"(?i)\b(?:radiculopat[ií]a(?:\s+(?:lumbar|cervical))?|hernia\s+discal|protrusi[oó]n\s+discal|neuropat[ií]a|s[ií]ndrome\s+del\s+t[uú]nel\s+carpiano|cefalea\s+tensional|neuralgia|parestesias?)\b",
            0.85,
            build_diagnosis,
        ),
        rule(
            Diagnosis,
            "sports_injury",
            r"(?i)\b(?:esguince(?:\s+de\s+(?:tobillo|rodilla|muñeca))?|rotura\s+fibrilar|desgarro\s+muscular|rotura\s+del\s+ligamento\s+cruzado\s+anterior|lesi[oó]n\s+del?\s+menisco|pubalgia|sobrecarga\s+muscular|distensi[oó]n\s+muscular)\b",
            0.9,
            build_diagnosis,
        ),
        // ── Procedures ──
        rule(
            Procedure,
            "clinical_test",
            r"(?i)\b(?:(?:test|signo|maniobra)\s+de\s+las[eè]gue|las[eè]gue|test\s+de\s+phalen|test\s+de\s+thomas|test\s+de\s+lachman|test\s+de\s+schober|test\s+de\s+neer|test\s+de\s+hawkins(?:-kennedy)?|maniobra\s+de\s+spurling|caj[oó]n\s+anterior|escala\s+eva|escala\s+visual\s+anal[oó]gica|[ií]ndice\s+de\s+oswestry|goniometr[ií]a)\b",
            0.9,
            build_procedure,
        ),
        rule(
            Procedure,
            "therapeutic_technique",
            r"(?i)\b(?:punci[oó]n\s+seca|terapia\s+manual|masaje(?:\s+(?:terap[eé]utico|descontracturante))?|movilizaci[oó]n\s+(?:articular|neural)|manipulaci[oó]n\s+vertebral|electroterapia|tens|ultrasonidos?(?:\s+terap[eé]utico)?|magnetoterapia|kinesiotaping|vendaje\s+neuromuscular|ondas\s+de\s+choque|termoterapia|crioterapia)\b",
            0.85,
            build_procedure,
        ),
        // ── Instructions ──
        rule(
            Instruction,
            GROUP_IMPERATIVE,
            r"(?i)\b(?:realizar|realice|hacer|haga|caminar|camine|aplicar|aplique|practicar|practique|continuar|contin[uú]e|mantener|mantenga|iniciar|inicie)\b[^.;\n]*",
            0.8,
            build_imperative,
        ),
        rule(
            Instruction,
            GROUP_PRECAUTION,
            r"(?i)\b(?:evitar|evite|no\s+(?:cargar|levantar|realizar|hacer|correr|conducir)|suspender|suspenda|reposo\s+relativo|precauci[oó]n\s+con)\b[^.;\n]*",
            0.75,
            build_precaution,
        ),
    ]
});

/// Rules for one entity kind, in declared order.
pub fn rules_for(kind: EntityKind) -> impl Iterator<Item = &'static PatternRule> {
    PATTERN_TABLE.iter().filter(move |r| r.kind == kind)
}

/// Upgrade of a bare diagnosis term when a longer phrase appears elsewhere.
pub struct CanonicalOverride {
    pub root: &'static str,
    pub phrase: &'static str,
    pub label: &'static str,
}

pub const DIAGNOSIS_OVERRIDES: &[CanonicalOverride] = &[
    CanonicalOverride { root: "esguince", phrase: "tobillo", label: "esguince de tobillo" },
    CanonicalOverride { root: "esguince", phrase: "rodilla", label: "esguince de rodilla" },
    CanonicalOverride { root: "tendinitis", phrase: "rotuliana", label: "tendinitis rotuliana" },
    CanonicalOverride { root: "tendinitis", phrase: "aquiles", label: "tendinitis aquílea" },
    CanonicalOverride { root: "hernia discal", phrase: "l4-l5", label: "hernia discal L4-L5" },
    CanonicalOverride { root: "hernia discal", phrase: "l5-s1", label: "hernia discal L5-S1" },
    CanonicalOverride { root: "ciática", phrase: "lumbar", label: "lumbociática" },
];

/// ICD-10 codes keyed by label prefix. Longer prefixes first.
pub const ICD10_CODES: &[(&str, &str, &str)] = &[
    ("síndrome del túnel carpiano", "G56.0", "Síndrome del túnel carpiano"),
    ("esguince de tobillo", "S93.4", "Esguince de tobillo"),
    ("tendinitis rotuliana", "M76.5", "Tendinitis rotuliana"),
    ("cefalea tensional", "G44.2", "Cefalea tensional"),
    ("fascitis plantar", "M72.2", "Fascitis plantar"),
    ("lumbociatalgia", "M54.4", "Lumbago con ciática"),
    ("lumbociática", "M54.4", "Lumbago con ciática"),
    ("hernia discal", "M51.2", "Desplazamiento de disco intervertebral"),
    ("epicondilitis", "M77.1", "Epicondilitis lateral"),
    ("fibromialgia", "M79.7", "Fibromialgia"),
    ("cervicalgia", "M54.2", "Cervicalgia"),
    ("lumbalgia", "M54.5", "Lumbalgia"),
    ("dorsalgia", "M54.6", "Dolor en la columna dorsal"),
    ("ciática", "M54.3", "Ciática"),
];

pub enum Needle {
    Exact(&'static str),
    Contains(&'static str),
}

/// Canonical wording of known procedures.
pub const PROCEDURE_CANON: &[(Needle, &str)] = &[
    (Needle::Contains("lasègue"), "Test de Lasègue"),
    (Needle::Contains("lasegue"), "Test de Lasègue"),
    (Needle::Contains("phalen"), "Test de Phalen"),
    (Needle::Contains("lachman"), "Test de Lachman"),
    (Needle::Contains("schober"), "Test de Schober"),
    (Needle::Contains("escala eva"), "Escala EVA"),
    (Needle::Contains("escala visual anal"), "Escala EVA"),
    (Needle::Contains("oswestry"), "Índice de Oswestry"),
    (Needle::Exact("tens"), "TENS"),
];

impl Needle {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            Self::Exact(n) => label == *n,
            Self::Contains(n) => label.contains(n),
        }
    }
}

/// A fixed instruction emitted by an exact-input special case.
pub struct FixtureInstruction {
    pub text: &'static str,
    pub confidence: f32,
}

/// Inputs that bypass the general instruction patterns entirely.
pub const INSTRUCTION_FIXTURES: &[(&str, &[FixtureInstruction])] = &[
    (
        "Realizar ejercicios de Williams 3 veces al día",
        &[FixtureInstruction {
            text: "Realizar ejercicios de Williams 3 veces al día",
            confidence: 0.8,
        }],
    ),
    (
        "Aplicar hielo 15 minutos y evitar cargar peso",
        &[
            FixtureInstruction { text: "Aplicar hielo 15 minutos", confidence: 0.8 },
            FixtureInstruction { text: "Evitar cargar peso", confidence: 0.75 },
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_rule_compiles_with_confidence_in_range() {
        assert!(!PATTERN_TABLE.is_empty());
        for rule in PATTERN_TABLE.iter() {
            assert!(
                (0.0..=1.0).contains(&rule.confidence),
                "rule {} out of range",
                rule.group
            );
        }
    }

    #[test]
    fn table_is_declared_in_extraction_order() {
        let kinds: Vec<EntityKind> = PATTERN_TABLE.iter().map(|r| r.kind).collect();
        let mut expected = kinds.clone();
        expected.sort_by_key(|k| {
            EntityKind::EXTRACTION_ORDER
                .iter()
                .position(|o| o == k)
                .unwrap_or(usize::MAX)
        });
        assert_eq!(kinds, expected);
    }

    #[test]
    fn group_confidences() {
        let conf = |group: &str| {
            PATTERN_TABLE
                .iter()
                .find(|r| r.group == group)
                .map(|r| r.confidence)
                .unwrap()
        };
        assert_eq!(conf("anti_inflammatory"), 0.9);
        assert_eq!(conf("muscle_relaxant"), 0.85);
        assert_eq!(conf("minor_opioid"), 0.8);
        assert_eq!(conf("corticosteroid"), 0.9);
        assert_eq!(conf("musculoskeletal_pain"), 0.9);
        assert_eq!(conf("neurological"), 0.85);
        assert_eq!(conf("sports_injury"), 0.9);
        assert_eq!(conf("clinical_test"), 0.9);
        assert_eq!(conf("therapeutic_technique"), 0.85);
        assert_eq!(conf(GROUP_IMPERATIVE), 0.8);
        assert_eq!(conf(GROUP_PRECAUTION), 0.75);
    }

    #[test]
    fn rules_for_filters_by_kind() {
        assert_eq!(rules_for(EntityKind::Medication).count(), 4);
        assert_eq!(rules_for(EntityKind::Diagnosis).count(), 3);
        assert_eq!(rules_for(EntityKind::Procedure).count(), 2);
        assert_eq!(rules_for(EntityKind::Instruction).count(), 2);
    }

    #[test]
    fn tens_needle_is_exact() {
        let (needle, _) = &PROCEDURE_CANON[PROCEDURE_CANON.len() - 1];
        assert!(needle.matches("tens"));
        assert!(!needle.matches("tensional"));
    }

    #[test]
    fn rule_hit_slices_original_text() {
        let hit = RuleHit {
            text: "Toma Ibuprofeno hoy",
            start: 5,
            end: 15,
            confidence: 0.9,
        };
        assert_eq!(hit.matched(), "Ibuprofeno");
    }
}
