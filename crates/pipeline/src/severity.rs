use serde::Serialize;

pub const NO_FINDING: &str = "No finding";
pub const PNEUMONIA: &str = "Pneumonia";

/// Coarse three-level triage label derived from the primary diagnosis and
/// its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Low,
    Medium,
    High,
}

impl SeverityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityTier::Low => "low",
            SeverityTier::Medium => "medium",
            SeverityTier::High => "high",
        }
    }
}

/// Maps the primary diagnosis and its confidence (0-100 scale) to a triage
/// tier. Comparisons are strict, so a confidence sitting exactly on a
/// boundary falls to the lower tier.
///
/// A confident negative is not a severity concern: "No finding" is always
/// low regardless of confidence.
pub fn classify(class_name: &str, confidence_pct: f32) -> SeverityTier {
    match class_name {
        NO_FINDING => SeverityTier::Low,
        PNEUMONIA => tiered(confidence_pct, 60.0, 30.0),
        _ => tiered(confidence_pct, 50.0, 25.0),
    }
}

fn tiered(confidence_pct: f32, high_above: f32, medium_above: f32) -> SeverityTier {
    if confidence_pct > high_above {
        SeverityTier::High
    } else if confidence_pct > medium_above {
        SeverityTier::Medium
    } else {
        SeverityTier::Low
    }
}
