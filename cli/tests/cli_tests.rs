use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn spider_results(urls: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let body = serde_json::json!({
        "seed": urls.first().copied().unwrap_or("https://a.test/"),
        "urls": urls,
    });
    write!(file, "{}", body).unwrap();
    file
}

/// Spider with --dry-run validates the options and exits 0 without crawling.
#[test]
fn test_spider_dry_run() {
    cargo_bin_cmd!("sentinel")
        .args(["spider", "-u", "https://example.com", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[DRY RUN] Would crawl https://example.com/ (max depth 250, concurrency 30)",
        ));
}

#[test]
fn test_spider_rejects_invalid_url() {
    cargo_bin_cmd!("sentinel")
        .args(["spider", "-u", "not-a-url", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn test_spider_rejects_non_http_seed() {
    cargo_bin_cmd!("sentinel")
        .args(["spider", "-u", "ftp://example.com", "--dry-run"])
        .assert()
        .failure();
}

/// Out-of-range numeric flags are rejected by the argument parser.
#[test]
fn test_spider_rejects_out_of_range_flags() {
    cargo_bin_cmd!("sentinel")
        .args(["spider", "-u", "https://example.com", "-d", "0", "--dry-run"])
        .assert()
        .failure();

    cargo_bin_cmd!("sentinel")
        .args(["spider", "-u", "https://example.com", "-c", "31", "--dry-run"])
        .assert()
        .failure();

    cargo_bin_cmd!("sentinel")
        .args(["spider", "-u", "https://example.com", "-r", "11", "--dry-run"])
        .assert()
        .failure();
}

#[test]
fn test_spider_output_must_be_json() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("crawl.txt");

    cargo_bin_cmd!("sentinel")
        .args(["spider", "-u", "https://example.com", "--dry-run", "-o"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains(".json"));
}

#[test]
fn test_spider_output_must_not_exist() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("crawl.json");
    std::fs::write(&output, "{}").unwrap();

    cargo_bin_cmd!("sentinel")
        .args(["spider", "-u", "https://example.com", "--dry-run", "-o"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_ports_dry_run_counts_candidates() {
    let results = spider_results(&["https://a.test/", "https://a.test/about", "https://b.test/x"]);

    cargo_bin_cmd!("sentinel")
        .args(["ports", "--dry-run", "-s"])
        .arg(results.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[DRY RUN] Would probe 2 host(s) across 65532 port(s)",
        ));
}

#[test]
fn test_ports_dry_run_with_allow_list() {
    let results = spider_results(&["https://a.test/"]);

    cargo_bin_cmd!("sentinel")
        .args([
            "ports",
            "--dry-run",
            "--from-port",
            "1",
            "--to-port",
            "10",
            "--allow-list",
            "3,7",
            "-s",
        ])
        .arg(results.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[DRY RUN] Would probe 1 host(s) across 8 port(s)",
        ));
}

#[test]
fn test_ports_rejects_inverted_range() {
    let results = spider_results(&["https://a.test/"]);

    cargo_bin_cmd!("sentinel")
        .args(["ports", "--dry-run", "--from-port", "100", "--to-port", "10", "-s"])
        .arg(results.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not exceed"));
}

#[test]
fn test_ports_missing_results_file() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("sentinel")
        .args(["ports", "--dry-run", "-s"])
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read spider results"));
}

#[test]
fn test_ports_rejects_malformed_results() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[1, 2, 3]").unwrap();

    cargo_bin_cmd!("sentinel")
        .args(["ports", "--dry-run", "-s"])
        .arg(file.path())
        .assert()
        .failure();
}

#[test]
fn test_ports_rejects_empty_crawl() {
    let results = spider_results(&[]);

    cargo_bin_cmd!("sentinel")
        .args(["ports", "--dry-run", "-s"])
        .arg(results.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one host"));
}

/// Running with no arguments should fail (clap requires a subcommand).
#[test]
fn test_no_args_shows_error() {
    cargo_bin_cmd!("sentinel")
        .assert()
        .failure();
}
