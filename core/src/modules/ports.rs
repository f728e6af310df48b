use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::core::config::PortScanConfig;
use crate::core::executor::BoundedExecutor;
use crate::core::result_aggregator::FindingAggregator;
use crate::core::{Finding, Severity};
use crate::utils::cvss::SeverityScorer;
use crate::utils::scope::host_of;
use crate::SinkRef;

const MAX_BANNER_BYTES: usize = 8 * 1024;
const FINDING_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Ssh,
    Http,
    Https,
    MySql,
    Smtp,
    Ftp,
    Unknown,
}

/// Checked in order; the first marker found in the banner decides. "HTTP"
/// precedes "HTTPS", so an HTTPS banner is reported as HTTP.
const SERVICE_MARKERS: [(&str, ServiceKind); 6] = [
    ("SSH", ServiceKind::Ssh),
    ("HTTP", ServiceKind::Http),
    ("HTTPS", ServiceKind::Https),
    ("MySQL", ServiceKind::MySql),
    ("SMTP", ServiceKind::Smtp),
    ("FTP", ServiceKind::Ftp),
];

impl ServiceKind {
    /// Case-sensitive substring match against the marker table.
    pub fn classify(banner: &str) -> Self {
        SERVICE_MARKERS
            .iter()
            .find(|(marker, _)| banner.contains(marker))
            .map(|(_, kind)| *kind)
            .unwrap_or(ServiceKind::Unknown)
    }

    pub fn cvss_vector(&self) -> &'static str {
        match self {
            ServiceKind::Ssh | ServiceKind::MySql => "CVSS:3.0/AV:N/AC:L/PR:H/UI:N/S:U/C:H/I:H/A:H",
            ServiceKind::Http | ServiceKind::Https => "CVSS:3.0/AV:N/AC:L/PR:N/UI:N/S:U/C:N/I:N/A:N",
            ServiceKind::Smtp => "CVSS:3.0/AV:N/AC:L/PR:L/UI:N/S:U/C:L/I:L/A:L",
            ServiceKind::Ftp => "CVSS:3.0/AV:N/AC:L/PR:L/UI:N/S:U/C:H/I:H/A:H",
            ServiceKind::Unknown => "CVSS:3.0/AV:N/AC:H/PR:N/UI:N/S:U/C:L/I:N/A:N",
        }
    }

    pub fn describe(&self, port: u16, banner: &str) -> String {
        match self {
            ServiceKind::Ssh => "SSH service detected. Ensure strong credentials.".to_string(),
            ServiceKind::Http => {
                "HTTP service detected. Check for outdated software or misconfigurations."
                    .to_string()
            }
            ServiceKind::Https => {
                "HTTPS service detected. Ensure SSL/TLS is properly configured.".to_string()
            }
            ServiceKind::MySql => "MySQL service detected. Verify access restrictions and \
                                   secure configurations."
                .to_string(),
            ServiceKind::Smtp => "SMTP service detected. Verify access restrictions and \
                                  secure configurations."
                .to_string(),
            ServiceKind::Ftp => "FTP service detected. Verify access restrictions and \
                                 secure configurations."
                .to_string(),
            ServiceKind::Unknown => format!(
                "Unknown service on port {}. Investigate further. Banner of the service: {}",
                port,
                banner.trim()
            ),
        }
    }
}

/// Reduces crawled URLs to their distinct hostnames. Entries that do not
/// parse are logged and skipped.
pub fn hosts_from_urls(urls: &[String]) -> BTreeSet<String> {
    let mut hosts = BTreeSet::new();
    for raw in urls {
        match host_of(raw) {
            Ok(host) => {
                hosts.insert(host);
            }
            Err(e) => warn!("Skipping URL: {}", e),
        }
    }
    hosts
}

/// TCP connect probe. Refused, unreachable and timed-out all read as closed.
pub async fn probe_port(host: &str, port: u16, deadline: Duration) -> bool {
    match timeout(deadline, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!("{}:{} closed: {}", host, port, e);
            false
        }
        Err(_) => {
            debug!("{}:{} timed out (filtered)", host, port);
            false
        }
    }
}

/// Opens a fresh connection and keeps whatever the service sends until it
/// closes, the deadline passes, an error occurs or 8 KiB have arrived. A
/// partial or empty banner is a valid result.
pub async fn grab_banner(host: &str, port: u16, deadline: Duration) -> String {
    let mut banner = Vec::new();

    let read = async {
        let mut stream = TcpStream::connect((host, port)).await?;
        let mut chunk = [0u8; 1024];
        while banner.len() < MAX_BANNER_BYTES {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            let room = MAX_BANNER_BYTES - banner.len();
            banner.extend_from_slice(&chunk[..n.min(room)]);
        }
        Ok::<(), std::io::Error>(())
    };

    match timeout(deadline, read).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Banner read from {}:{} ended early: {}", host, port, e),
        Err(_) => debug!("Banner read from {}:{} hit the deadline", host, port),
    }

    String::from_utf8_lossy(&banner).into_owned()
}

pub struct PortScanner {
    config: PortScanConfig,
    scorer: Arc<dyn SeverityScorer>,
    sink: SinkRef,
}

impl PortScanner {
    pub fn new(config: PortScanConfig, scorer: Arc<dyn SeverityScorer>, sink: SinkRef) -> Self {
        Self {
            config,
            scorer,
            sink,
        }
    }

    /// Probes every host across every candidate port and returns one finding
    /// per open port, in the order the probes completed.
    pub async fn scan(&self) -> Vec<Finding> {
        let ports = self.config.candidate_ports();
        let hosts = self.config.hosts();
        let total = hosts.len() * ports.len();

        self.sink.on_log(
            "phase",
            &format!(
                "[*] Probing {} host(s) across {} port(s) (concurrency {})",
                hosts.len(),
                ports.len(),
                self.config.concurrency()
            ),
        );
        self.sink.on_progress("Port scan", 0, total);

        let tasks: Vec<_> = hosts
            .iter()
            .flat_map(|host| {
                ports
                    .iter()
                    .map(move |&port| move || self.probe(host, port))
            })
            .collect();

        let executor = BoundedExecutor::new(self.config.concurrency());
        let (tx, rx) = mpsc::channel(FINDING_CHANNEL_CAPACITY);

        let (completed, findings) = tokio::join!(
            executor.run_streaming(tasks, tx),
            FindingAggregator::run(rx, self.sink.clone())
        );

        self.sink.on_progress("Port scan", completed, total);
        findings
    }

    async fn probe(&self, host: &str, port: u16) -> Option<Finding> {
        let deadline = self.config.timeout();
        if !probe_port(host, port, deadline).await {
            return None;
        }

        self.sink
            .on_log("debug", &format!("[*] {}:{} is open, grabbing banner", host, port));
        let banner = grab_banner(host, port, deadline).await;
        let service = ServiceKind::classify(&banner);

        let (severity, kind) = match self.scorer.score(service.cvss_vector()) {
            Ok(scored) => scored,
            Err(e) => {
                warn!("Scoring {:?} on {}:{} failed: {}", service, host, port, e);
                (0.0, Severity::Info)
            }
        };

        Some(Finding {
            kind,
            severity,
            url: endpoint(host, port),
            description: service.describe(port, &banner),
            payloads: None,
        })
    }
}

fn endpoint(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PortScanOptions;
    use crate::error::SentinelError;
    use crate::utils::cvss::Cvss3Scorer;
    use crate::ScanEventSink;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    struct NullSink;

    impl ScanEventSink for NullSink {
        fn on_log(&self, _level: &str, _message: &str) {}
        fn on_finding(&self, _finding: &Finding) {}
        fn on_progress(&self, _phase: &str, _current: usize, _total: usize) {}
    }

    struct BrokenScorer;

    impl SeverityScorer for BrokenScorer {
        fn score(&self, vector: &str) -> Result<(f64, Severity), SentinelError> {
            Err(SentinelError::MalformedInput(vector.to_string()))
        }
    }

    /// Greets every connection with `banner`, then either hangs up or holds
    /// the socket open.
    async fn banner_server(banner: &'static str, hang_up: bool) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream.write_all(banner.as_bytes()).await;
                if hang_up {
                    let _ = stream.shutdown().await;
                } else {
                    held.push(stream);
                }
            }
        });

        port
    }

    fn scanner(port: u16, timeout_ms: u64, scorer: Arc<dyn SeverityScorer>) -> PortScanner {
        let options = PortScanOptions {
            hosts: ["127.0.0.1".to_string()].into_iter().collect(),
            from_port: port as u32,
            to_port: port as u32,
            allow_list: BTreeSet::new(),
            timeout_ms,
            ..PortScanOptions::default()
        };
        PortScanner::new(options.validate().unwrap(), scorer, Arc::new(NullSink))
    }

    #[test]
    fn test_first_marker_wins() {
        assert_eq!(
            ServiceKind::classify("HTTP/1.1 200 OK\r\nServer: MySQL proxy"),
            ServiceKind::Http
        );
        assert_eq!(ServiceKind::classify("HTTPS ready"), ServiceKind::Http);
        assert_eq!(ServiceKind::classify("SSH-2.0-OpenSSH_9.6"), ServiceKind::Ssh);
        assert_eq!(ServiceKind::classify("220 mail.a.test ESMTP Postfix"), ServiceKind::Smtp);
        assert_eq!(ServiceKind::classify("220 ProFTPD Server ready"), ServiceKind::Ftp);
        assert_eq!(ServiceKind::classify("5.7.44 MySQL Community"), ServiceKind::MySql);
        assert_eq!(ServiceKind::classify("ssh-2.0"), ServiceKind::Unknown);
        assert_eq!(ServiceKind::classify(""), ServiceKind::Unknown);
    }

    #[test]
    fn test_hosts_from_urls() {
        let urls = vec![
            "https://a.test/".to_string(),
            "https://a.test/about".to_string(),
            "http://www.a.test:8080/x".to_string(),
            "not a url".to_string(),
        ];
        let hosts: Vec<String> = hosts_from_urls(&urls).into_iter().collect();
        assert_eq!(hosts, vec!["a.test", "www.a.test"]);
    }

    #[test]
    fn test_ipv6_endpoint_is_bracketed() {
        assert_eq!(endpoint("::1", 22), "[::1]:22");
        assert_eq!(endpoint("a.test", 22), "a.test:22");
    }

    #[tokio::test]
    async fn test_ssh_banner_finding() {
        let port = banner_server("SSH-2.0-OpenSSH_9.6\r\n", true).await;

        let findings = scanner(port, 2000, Arc::new(Cvss3Scorer)).scan().await;

        assert_eq!(findings.len(), 1);
        let finding = &findings[0];
        assert_eq!(finding.kind, Severity::High);
        assert_eq!(finding.severity, 7.2);
        assert_eq!(finding.url, format!("127.0.0.1:{}", port));
        assert!(finding.description.starts_with("SSH service detected"));
    }

    #[tokio::test]
    async fn test_silent_service_is_unknown() {
        let port = banner_server("", false).await;

        let findings = scanner(port, 200, Arc::new(Cvss3Scorer)).scan().await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, Severity::Low);
        assert!(findings[0]
            .description
            .starts_with(&format!("Unknown service on port {}", port)));
    }

    #[tokio::test]
    async fn test_closed_port_yields_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let findings = scanner(port, 500, Arc::new(Cvss3Scorer)).scan().await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_scoring_failure_degrades_to_info() {
        let port = banner_server("220 ProFTPD Server ready\r\n", true).await;

        let findings = scanner(port, 2000, Arc::new(BrokenScorer)).scan().await;

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, Severity::Info);
        assert_eq!(findings[0].severity, 0.0);
        assert!(findings[0].description.starts_with("FTP service detected"));
    }

    #[tokio::test]
    async fn test_banner_is_capped() {
        static LARGE: std::sync::LazyLock<String> =
            std::sync::LazyLock::new(|| "A".repeat(MAX_BANNER_BYTES * 2));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream.write_all(LARGE.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        let banner = grab_banner("127.0.0.1", port, Duration::from_secs(2)).await;
        assert_eq!(banner.len(), MAX_BANNER_BYTES);
    }
}
