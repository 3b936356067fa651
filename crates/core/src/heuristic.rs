//! Keyword-lexicon collaborators.
//!
//! Stand-ins for the extraction and classification services so the intake
//! pipeline runs end to end without any remote model. They make no claim of
//! medical accuracy; deployments swap them out through the
//! [`SymptomExtractor`] and [`UrgencyClassifier`] traits.

use async_trait::async_trait;

use talon_storage::Urgency;

use crate::error::CollaboratorError;
use crate::intake::{SymptomExtractor, UrgencyClassifier};
use crate::lifecycle::Classification;

/// Phrase → canonical symptom token.
const LEXICON: &[(&str, &str)] = &[
    ("chest pain", "chest_pain"),
    ("chest pains", "chest_pain"),
    ("chest tightness", "chest_pain"),
    ("heart attack", "cardiac_event"),
    ("can't breathe", "breathing_difficulty"),
    ("cant breathe", "breathing_difficulty"),
    ("cannot breathe", "breathing_difficulty"),
    ("not breathing", "breathing_difficulty"),
    ("difficulty breathing", "breathing_difficulty"),
    ("trouble breathing", "breathing_difficulty"),
    ("struggling to breathe", "breathing_difficulty"),
    ("shortness of breath", "breathing_difficulty"),
    ("short of breath", "breathing_difficulty"),
    ("unconscious", "unconscious"),
    ("unresponsive", "unconscious"),
    ("passed out", "unconscious"),
    ("collapsed", "unconscious"),
    ("seizure", "seizure"),
    ("seizures", "seizure"),
    ("convulsing", "seizure"),
    ("slurred speech", "stroke_symptoms"),
    ("face drooping", "stroke_symptoms"),
    ("stroke", "stroke_symptoms"),
    ("severe bleeding", "severe_bleeding"),
    ("heavy bleeding", "severe_bleeding"),
    ("bleeding heavily", "severe_bleeding"),
    ("won't stop bleeding", "severe_bleeding"),
    ("bleeding", "bleeding"),
    ("choking", "choking"),
    ("overdose", "overdose"),
    ("anaphylaxis", "anaphylaxis"),
    ("throat swelling", "anaphylaxis"),
    ("allergic reaction", "allergic_reaction"),
    ("broken", "fracture"),
    ("fracture", "fracture"),
    ("fractured", "fracture"),
    ("burn", "burn"),
    ("burns", "burn"),
    ("burned", "burn"),
    ("head injury", "head_injury"),
    ("hit my head", "head_injury"),
    ("hit his head", "head_injury"),
    ("hit her head", "head_injury"),
    ("high fever", "high_fever"),
    ("fever", "fever"),
    ("vomiting", "vomiting"),
    ("throwing up", "vomiting"),
    ("headache", "headache"),
    ("dizzy", "dizziness"),
    ("dizziness", "dizziness"),
    ("cough", "cough"),
    ("coughing", "cough"),
    ("sprain", "sprain"),
    ("sprained", "sprain"),
    ("rash", "rash"),
    ("stomach pain", "abdominal_pain"),
    ("abdominal pain", "abdominal_pain"),
    ("fell", "fall"),
    ("fall", "fall"),
];

const CRITICAL_SYMPTOMS: &[&str] = &[
    "chest_pain",
    "cardiac_event",
    "breathing_difficulty",
    "unconscious",
    "seizure",
    "stroke_symptoms",
    "severe_bleeding",
    "choking",
    "overdose",
    "anaphylaxis",
];

const URGENT_SYMPTOMS: &[&str] = &[
    "bleeding",
    "fracture",
    "burn",
    "head_injury",
    "high_fever",
    "allergic_reaction",
];

/// True when `text[start..end]` is not glued to neighbouring letters or digits.
fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// Extracts symptoms by phrase lookup.
///
/// Longer phrases claim their text first, so "severe bleeding" yields
/// `severe_bleeding` and not also `bleeding`. Tokens are ordered by where
/// they first appear and never repeated.
#[derive(Debug, Default, Clone)]
pub struct KeywordExtractor;

impl KeywordExtractor {
    pub fn new() -> Self {
        KeywordExtractor
    }

    pub fn extract_sync(&self, text: &str) -> Vec<String> {
        let normalized = text.to_lowercase().replace('\u{2019}', "'");

        let mut phrases: Vec<&(&str, &str)> = LEXICON.iter().collect();
        phrases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut claimed = vec![false; normalized.len()];
        let mut hits: Vec<(usize, &str)> = Vec::new();
        for &(phrase, token) in phrases {
            for (start, _) in normalized.match_indices(phrase) {
                let end = start + phrase.len();
                if !is_whole_word(&normalized, start, end) {
                    continue;
                }
                if claimed[start..end].iter().any(|c| *c) {
                    continue;
                }
                claimed[start..end].iter_mut().for_each(|c| *c = true);
                hits.push((start, token));
            }
        }

        hits.sort_by_key(|(start, _)| *start);
        let mut symptoms: Vec<String> = Vec::new();
        for (_, token) in hits {
            if !symptoms.iter().any(|s| s == token) {
                symptoms.push(token.to_string());
            }
        }
        symptoms
    }
}

#[async_trait]
impl SymptomExtractor for KeywordExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.extract_sync(text))
    }
}

/// Classifies by the most severe symptom present.
#[derive(Debug, Default, Clone)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        RuleClassifier
    }

    pub fn classify_sync(&self, symptoms: &[String]) -> Classification {
        let label = |s: &str| s.replace('_', " ");
        let critical: Vec<&String> = symptoms
            .iter()
            .filter(|s| CRITICAL_SYMPTOMS.contains(&s.as_str()))
            .collect();
        let urgent: Vec<&String> = symptoms
            .iter()
            .filter(|s| URGENT_SYMPTOMS.contains(&s.as_str()))
            .collect();

        let urgency = if !critical.is_empty() {
            Urgency::Critical
        } else if !urgent.is_empty() {
            Urgency::Urgent
        } else {
            Urgency::Routine
        };

        let mut reasoning: Vec<String> = critical
            .iter()
            .map(|s| format!("{} is a potentially life-threatening symptom", label(s.as_str())))
            .collect();
        reasoning.extend(
            urgent
                .iter()
                .map(|s| format!("{} needs prompt medical attention", label(s.as_str()))),
        );
        if reasoning.is_empty() {
            reasoning.push(if symptoms.is_empty() {
                "No recognizable symptoms; monitor condition and call back if it worsens"
                    .to_string()
            } else {
                "No high-risk symptoms detected; monitor condition".to_string()
            });
        }

        Classification {
            urgency,
            dispatch_required: urgency != Urgency::Routine,
            reasoning,
        }
    }
}

#[async_trait]
impl UrgencyClassifier for RuleClassifier {
    async fn classify(&self, symptoms: &[String]) -> Result<Classification, CollaboratorError> {
        Ok(self.classify_sync(symptoms))
    }
}
