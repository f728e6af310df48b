//! CVSS 3.x base scoring.

use std::collections::HashMap;

use crate::core::Severity;
use crate::error::SentinelError;

/// Turns a severity vector into a numeric score and its rating.
pub trait SeverityScorer: Send + Sync {
    fn score(&self, vector: &str) -> Result<(f64, Severity), SentinelError>;
}

/// CVSS v3.0 / v3.1 base-score calculator.
///
/// All eight base metrics are required. Temporal and environmental metrics
/// are accepted and ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cvss3Scorer;

const BASE_METRICS: [&str; 8] = ["AV", "AC", "PR", "UI", "S", "C", "I", "A"];

impl SeverityScorer for Cvss3Scorer {
    fn score(&self, vector: &str) -> Result<(f64, Severity), SentinelError> {
        let metrics = parse_vector(vector)?;
        let metric = |name: &str| metrics.get(name).copied().unwrap_or_default();

        let scope_changed = match metric("S") {
            "U" => false,
            "C" => true,
            other => return Err(bad_value(vector, "S", other)),
        };

        let av = match metric("AV") {
            "N" => 0.85,
            "A" => 0.62,
            "L" => 0.55,
            "P" => 0.2,
            other => return Err(bad_value(vector, "AV", other)),
        };
        let ac = match metric("AC") {
            "L" => 0.77,
            "H" => 0.44,
            other => return Err(bad_value(vector, "AC", other)),
        };
        let pr = match (metric("PR"), scope_changed) {
            ("N", _) => 0.85,
            ("L", false) => 0.62,
            ("L", true) => 0.68,
            ("H", false) => 0.27,
            ("H", true) => 0.5,
            (other, _) => return Err(bad_value(vector, "PR", other)),
        };
        let ui = match metric("UI") {
            "N" => 0.85,
            "R" => 0.62,
            other => return Err(bad_value(vector, "UI", other)),
        };

        let mut cia = [0.0; 3];
        for (slot, name) in cia.iter_mut().zip(["C", "I", "A"]) {
            *slot = match metric(name) {
                "H" => 0.56,
                "L" => 0.22,
                "N" => 0.0,
                other => return Err(bad_value(vector, name, other)),
            };
        }

        let iss = 1.0 - (1.0 - cia[0]) * (1.0 - cia[1]) * (1.0 - cia[2]);
        let impact = if scope_changed {
            7.52 * (iss - 0.029) - 3.25 * (iss - 0.02f64).powi(15)
        } else {
            6.42 * iss
        };
        let exploitability = 8.22 * av * ac * pr * ui;

        let score = if impact <= 0.0 {
            0.0
        } else if scope_changed {
            roundup((1.08 * (impact + exploitability)).min(10.0))
        } else {
            roundup((impact + exploitability).min(10.0))
        };

        Ok((score, Severity::from_score(score)))
    }
}

/// Smallest one-decimal number >= `value`, computed on integers so float
/// noise such as 4.000000000000001 does not round up to 4.1.
fn roundup(value: f64) -> f64 {
    let scaled = (value * 100_000.0).round() as i64;
    if scaled % 10_000 == 0 {
        scaled as f64 / 100_000.0
    } else {
        ((scaled / 10_000) + 1) as f64 / 10.0
    }
}

fn parse_vector(vector: &str) -> Result<HashMap<&str, &str>, SentinelError> {
    let mut parts = vector.trim().split('/').peekable();

    if let Some(prefix) = parts.peek().and_then(|p| p.strip_prefix("CVSS:")) {
        if prefix != "3.0" && prefix != "3.1" {
            return Err(SentinelError::MalformedInput(format!(
                "unsupported CVSS version '{}' in '{}'",
                prefix, vector
            )));
        }
        parts.next();
    }

    let mut metrics = HashMap::new();
    for part in parts {
        let (name, value) = part.split_once(':').ok_or_else(|| {
            SentinelError::MalformedInput(format!("bad metric '{}' in '{}'", part, vector))
        })?;
        if metrics.insert(name, value).is_some() {
            return Err(SentinelError::MalformedInput(format!(
                "metric '{}' repeated in '{}'",
                name, vector
            )));
        }
    }

    let missing: Vec<&str> = BASE_METRICS
        .iter()
        .copied()
        .filter(|name| !metrics.contains_key(name))
        .collect();
    if !missing.is_empty() {
        return Err(SentinelError::MalformedInput(format!(
            "'{}' is missing base metric(s) {}",
            vector,
            missing.join(", ")
        )));
    }

    Ok(metrics)
}

fn bad_value(vector: &str, metric: &str, value: &str) -> SentinelError {
    SentinelError::MalformedInput(format!(
        "invalid value '{}' for {} in '{}'",
        value, metric, vector
    ))
}
