//! Crawl and port-scan configuration.
//!
//! Both configs are built from a plain options struct through `validate()`,
//! which checks every bound and reports all violations at once. The
//! validated structs are immutable.

use std::collections::BTreeSet;
use std::time::Duration;

use url::Url;

use crate::error::SentinelError;

pub const MAX_CRAWL_DEPTH: u32 = 250;
pub const MAX_CRAWL_CONCURRENCY: usize = 30;
pub const MAX_RETRIES: u32 = 10;
pub const MAX_CRAWL_TIMEOUT_MS: u64 = 60_000;

pub const MAX_PORT_CONCURRENCY: usize = 20;
pub const MAX_PORT_TIMEOUT_MS: u64 = 25_000;
pub const DEFAULT_ALLOW_LIST: [u16; 3] = [22, 80, 443];

#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub seed: String,
    pub max_depth: u32,
    pub concurrency: usize,
    pub max_retries: u32,
    pub timeout_ms: u64,
    pub ignore_external_links: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            seed: String::new(),
            max_depth: MAX_CRAWL_DEPTH,
            concurrency: MAX_CRAWL_CONCURRENCY,
            max_retries: 3,
            timeout_ms: 5000,
            ignore_external_links: true,
        }
    }
}

impl CrawlOptions {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            ..Self::default()
        }
    }

    pub fn validate(self) -> Result<CrawlConfig, SentinelError> {
        let mut violations = Vec::new();

        let seed = match Url::parse(&self.seed) {
            Ok(mut url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
                // crawled links are compared without fragments, so the seed must be too
                url.set_fragment(None);
                Some(url)
            }
            Ok(url) => {
                violations.push(format!("seed must be an http(s) URL with a host, got '{}'", url));
                None
            }
            Err(e) => {
                violations.push(format!("seed '{}' is not a valid URL: {}", self.seed, e));
                None
            }
        };

        if !(1..=MAX_CRAWL_DEPTH).contains(&self.max_depth) {
            violations.push(format!(
                "max_depth must be between 1 and {}, got {}",
                MAX_CRAWL_DEPTH, self.max_depth
            ));
        }
        if !(1..=MAX_CRAWL_CONCURRENCY).contains(&self.concurrency) {
            violations.push(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_CRAWL_CONCURRENCY, self.concurrency
            ));
        }
        if self.max_retries > MAX_RETRIES {
            violations.push(format!(
                "max_retries must be between 0 and {}, got {}",
                MAX_RETRIES, self.max_retries
            ));
        }
        if !(1..=MAX_CRAWL_TIMEOUT_MS).contains(&self.timeout_ms) {
            violations.push(format!(
                "timeout must be between 1 and {} ms, got {}",
                MAX_CRAWL_TIMEOUT_MS, self.timeout_ms
            ));
        }

        match seed {
            Some(seed) if violations.is_empty() => Ok(CrawlConfig {
                seed,
                max_depth: self.max_depth,
                concurrency: self.concurrency,
                max_retries: self.max_retries,
                timeout_ms: self.timeout_ms,
                ignore_external_links: self.ignore_external_links,
            }),
            _ => Err(SentinelError::Validation(violations)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    seed: Url,
    max_depth: u32,
    concurrency: usize,
    max_retries: u32,
    timeout_ms: u64,
    ignore_external_links: bool,
}

impl CrawlConfig {
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn ignore_external_links(&self) -> bool {
        self.ignore_external_links
    }
}

#[derive(Debug, Clone)]
pub struct PortScanOptions {
    pub hosts: BTreeSet<String>,
    pub from_port: u32,
    pub to_port: u32,
    pub allow_list: BTreeSet<u16>,
    pub concurrency: usize,
    pub timeout_ms: u64,
}

impl Default for PortScanOptions {
    fn default() -> Self {
        Self {
            hosts: BTreeSet::new(),
            from_port: 1,
            to_port: 65535,
            allow_list: DEFAULT_ALLOW_LIST.into_iter().collect(),
            concurrency: 10,
            timeout_ms: 5000,
        }
    }
}

impl PortScanOptions {
    pub fn validate(self) -> Result<PortScanConfig, SentinelError> {
        let mut violations = Vec::new();

        if self.hosts.is_empty() {
            violations.push("at least one host is required".to_string());
        }
        for (name, port) in [("from_port", self.from_port), ("to_port", self.to_port)] {
            if !(1..=65535).contains(&port) {
                violations.push(format!("{} must be between 1 and 65535, got {}", name, port));
            }
        }
        if self.from_port > self.to_port {
            violations.push(format!(
                "from_port ({}) must not exceed to_port ({})",
                self.from_port, self.to_port
            ));
        }
        if !(1..=MAX_PORT_CONCURRENCY).contains(&self.concurrency) {
            violations.push(format!(
                "concurrency must be between 1 and {}, got {}",
                MAX_PORT_CONCURRENCY, self.concurrency
            ));
        }
        if self.timeout_ms > MAX_PORT_TIMEOUT_MS {
            violations.push(format!(
                "timeout must be between 0 and {} ms, got {}",
                MAX_PORT_TIMEOUT_MS, self.timeout_ms
            ));
        }

        if !violations.is_empty() {
            return Err(SentinelError::Validation(violations));
        }

        Ok(PortScanConfig {
            hosts: self.hosts,
            from_port: self.from_port as u16,
            to_port: self.to_port as u16,
            allow_list: self.allow_list,
            concurrency: self.concurrency,
            timeout_ms: self.timeout_ms,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PortScanConfig {
    hosts: BTreeSet<String>,
    from_port: u16,
    to_port: u16,
    allow_list: BTreeSet<u16>,
    concurrency: usize,
    timeout_ms: u64,
}

impl PortScanConfig {
    pub fn hosts(&self) -> &BTreeSet<String> {
        &self.hosts
    }

    pub fn from_port(&self) -> u16 {
        self.from_port
    }

    pub fn to_port(&self) -> u16 {
        self.to_port
    }

    pub fn allow_list(&self) -> &BTreeSet<u16> {
        &self.allow_list
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `[from_port..=to_port]` minus the allow-list, ascending.
    pub fn candidate_ports(&self) -> Vec<u16> {
        candidate_ports(self.from_port, self.to_port, &self.allow_list)
    }
}

pub fn candidate_ports(from_port: u16, to_port: u16, allow_list: &BTreeSet<u16>) -> Vec<u16> {
    (from_port..=to_port)
        .filter(|port| !allow_list.contains(port))
        .collect()
}
