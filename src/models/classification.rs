use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::record::VisitRecord;

// ═══════════════════════════════════════════
// Risk Label
// ═══════════════════════════════════════════

/// The three-valued risk classification of a visit note.
///
/// The wire values (`red`, `amber`, `green`) are the compatibility contract
/// with downstream dashboards; never extend or rename them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    /// Urgent or critical concern requiring immediate attention.
    Red,
    /// Moderate concern needing follow-up.
    Amber,
    /// Routine visit, no significant concern.
    Green,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Amber => "amber",
            Self::Green => "green",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "red" => Some(Self::Red),
            "amber" => Some(Self::Amber),
            "green" => Some(Self::Green),
            _ => None,
        }
    }

    pub fn all() -> &'static [RiskLabel] {
        &[Self::Red, Self::Amber, Self::Green]
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Classification
// ═══════════════════════════════════════════

/// Output of one classification call.
///
/// `fallback` is true when the label was substituted because the model reply
/// could not be parsed. Audit dashboards treat these differently from
/// genuine classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub label: RiskLabel,
    pub fallback: bool,
}

/// Persisted classification row.
///
/// Keyed by `(batch_id, record_index)` in the result store; writing the same
/// key twice overwrites rather than duplicates, so batch redelivery is safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub batch_id: String,
    pub record_index: usize,
    pub ai_classification: RiskLabel,
    pub client: String,
    pub care_pro: String,
    pub visit_date: String,
    pub note: String,
    pub fallback: bool,
    /// Processing time, ISO 8601.
    pub timestamp: String,
}

impl ClassificationRecord {
    /// Build the persisted row for a classified record, stamped with the
    /// current time.
    pub fn new(record: &VisitRecord, classification: Classification) -> Self {
        Self {
            batch_id: record.batch_id.clone(),
            record_index: record.record_index,
            ai_classification: classification.label,
            client: record.client.clone(),
            care_pro: record.care_pro.clone(),
            visit_date: record.visit_date.clone(),
            note: record.note.clone(),
            fallback: classification.fallback,
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}
