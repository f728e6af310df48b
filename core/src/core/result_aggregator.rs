use std::collections::HashSet;

use tokio::sync::mpsc;

use crate::core::{Finding, Severity};
use crate::SinkRef;

/// Collects findings as probes emit them and reports each one immediately.
pub struct FindingAggregator;

impl FindingAggregator {
    /// Drains `receiver` until every sender is dropped. Findings keep their
    /// arrival order; an exact repeat of the same `(url, description)` is
    /// reported once. Probes that produced nothing may send `None`.
    pub async fn run<R>(mut receiver: mpsc::Receiver<R>, sink: SinkRef) -> Vec<Finding>
    where
        R: Into<Option<Finding>>,
    {
        let mut findings = Vec::new();
        let mut seen = HashSet::new();

        while let Some(item) = receiver.recv().await {
            let Some(finding) = item.into() else {
                continue;
            };
            let key = format!("{}|{}", finding.url, finding.description);
            if !seen.insert(key) {
                continue;
            }

            sink.on_finding(&finding);
            findings.push(finding);
        }
        findings
    }

    pub fn report_summary(findings: &[Finding], sink: &SinkRef) {
        if findings.is_empty() {
            sink.on_log("success", "[+] No findings.");
            return;
        }

        sink.on_log("warn", &format!("[+] {} finding(s) discovered:", findings.len()));
        for severity in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Info,
        ] {
            let count = findings.iter().filter(|f| f.kind == severity).count();
            if count > 0 {
                sink.on_log("info", &format!("    {:<8} {}", severity.as_str(), count));
            }
        }
    }
}
