pub mod config;
pub mod executor;
pub mod result_aggregator;
pub mod retry;
pub mod state;

use serde::{Deserialize, Serialize};

/// Severity label attached to every finding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Maps a CVSS 3.x base score onto its qualitative rating.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if (9.0..=10.0).contains(&s) => Severity::Critical,
            s if (7.0..=8.9).contains(&s) => Severity::High,
            s if (4.0..=6.9).contains(&s) => Severity::Medium,
            s if (0.1..=3.9).contains(&s) => Severity::Low,
            _ => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal record produced by a probe. Never mutated after it is emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(rename = "type")]
    pub kind: Severity,
    pub severity: f64,
    pub url: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payloads: Option<Vec<String>>,
}
