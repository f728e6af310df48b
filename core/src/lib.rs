pub mod core;
pub mod error;
pub mod http;
pub mod modules;
pub mod utils;

use std::sync::Arc;

pub use crate::core::config::{CrawlConfig, CrawlOptions, PortScanConfig, PortScanOptions};
pub use crate::core::executor::BoundedExecutor;
pub use crate::core::result_aggregator::FindingAggregator;
pub use crate::core::retry::{Backoff, RetryPolicy};
pub use crate::core::state::{CrawlResult, CrawlState};
pub use crate::core::{Finding, Severity};
pub use crate::error::SentinelError;
pub use crate::http::{HttpClient, PageFetcher};
pub use crate::modules::crawler::Spider;
pub use crate::modules::ports::{PortScanner, ServiceKind};
pub use crate::utils::cvss::{Cvss3Scorer, SeverityScorer};
pub use crate::utils::extractor::{FormDescriptor, FormField};

/// Output abstraction injected into every pipeline component.
///
/// Levels used: `debug`, `info`, `warn`, `error`, `success`, `phase`.
pub trait ScanEventSink: Send + Sync {
    fn on_log(&self, level: &str, message: &str);
    fn on_finding(&self, finding: &Finding);
    fn on_progress(&self, phase: &str, current: usize, total: usize);
}

pub type SinkRef = Arc<dyn ScanEventSink>;

/// Terminal output sink for CLI usage. `debug` lines are only printed in
/// verbose mode.
pub struct ConsoleSink {
    verbose: bool,
}

impl ConsoleSink {
    pub fn new_ref(verbose: bool) -> SinkRef {
        Arc::new(Self { verbose })
    }
}

impl ScanEventSink for ConsoleSink {
    fn on_log(&self, level: &str, message: &str) {
        use colored::*;
        use std::io::Write;
        let colored = match level {
            "debug" if !self.verbose => return,
            "debug"   => message.dimmed().to_string(),
            "success" => message.green().to_string(),
            "error"   => message.red().to_string(),
            "warn"    => message.yellow().to_string(),
            "phase"   => message.bright_cyan().bold().to_string(),
            _         => message.to_string(),
        };
        if level == "error" {
            eprint!("{}\r\n", colored);
            std::io::stderr().flush().ok();
        } else {
            print!("{}\r\n", colored);
            std::io::stdout().flush().ok();
        }
    }

    fn on_finding(&self, finding: &Finding) {
        use colored::*;
        use std::io::Write;
        let label = match finding.kind {
            Severity::Critical | Severity::High => finding.kind.as_str().red().bold(),
            Severity::Medium => finding.kind.as_str().yellow().bold(),
            Severity::Low | Severity::Info => finding.kind.as_str().blue().bold(),
        };
        print!(
            "{} [{} {:.1}] {}\r\n",
            "[+]".green().bold(),
            label,
            finding.severity,
            finding.url.white()
        );
        print!("    {}\r\n", finding.description.dimmed());
        std::io::stdout().flush().ok();
    }

    fn on_progress(&self, phase: &str, current: usize, total: usize) {
        use colored::*;
        use std::io::Write;
        if total > 0 {
            print!("{}\r\n", format!("[*] {} ({}/{})", phase, current, total).bright_cyan());
        } else {
            print!("{}\r\n", format!("[*] {}", phase).bright_cyan());
        }
        std::io::stdout().flush().ok();
    }
}
