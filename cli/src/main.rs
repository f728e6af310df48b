use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::Path;
use std::process;
use std::sync::Arc;

use sentinel_core::modules::ports::hosts_from_urls;
use sentinel_core::utils::{read_spider_results, resolve_output_path, write_json};
use sentinel_core::{
    ConsoleSink, CrawlOptions, Cvss3Scorer, FindingAggregator, PortScanOptions, PortScanner,
    SinkRef, Spider,
};

#[derive(Parser, Debug)]
#[command(
    name = "sentinel",
    version,
    about = "Breadth-first web crawler and TCP port prober",
    after_help = "\x1b[1;36mEXAMPLES:\x1b[0m
  Crawl a site:                   sentinel spider -u https://target.com
  Shallow, gentle crawl:          sentinel spider -u https://target.com -d 3 -c 5 -t 2000
  Follow external links too:      sentinel spider -u https://target.com --include-external
  Probe crawled hosts:            sentinel ports -s sentinel_output/spider_1700000000000.json
  Narrow port range:              sentinel ports -s crawl.json --from-port 1 --to-port 1024 --allow-list 80,443
  Dry-run test:                   sentinel spider -u https://target.com --dry-run"
)]
pub struct Args {
    #[arg(short = 'v', long, global = true, default_value_t = false, help = "Show the whole process (Verbose Mode)")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a site breadth-first and save every discovered URL
    Spider(SpiderArgs),
    /// Probe the hosts of a previous crawl for open TCP ports
    Ports(PortsArgs),
}

#[derive(clap::Args, Debug)]
pub struct SpiderArgs {
    #[arg(short = 'u', long, help = "Seed URL to start crawling from")]
    pub url: String,

    #[arg(short = 'd', long, default_value_t = 250,
        value_parser = clap::value_parser!(u32).range(1..=250),
        help = "Maximum number of BFS layers to crawl")]
    pub depth: u32,

    #[arg(short = 'c', long, default_value_t = 30,
        value_parser = clap::value_parser!(u32).range(1..=30),
        help = "Number of pages fetched concurrently")]
    pub concurrency: u32,

    #[arg(short = 'r', long, default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(0..=10),
        help = "Retries per page before giving up on it")]
    pub retries: u32,

    #[arg(short = 't', long, default_value_t = 5000,
        value_parser = clap::value_parser!(u64).range(1..=60000),
        help = "Request timeout in milliseconds")]
    pub timeout: u64,

    #[arg(long, default_value_t = false, help = "Follow links that leave the seed's site")]
    pub include_external: bool,

    #[arg(short = 'o', long, help = "Output JSON file (must not exist yet)")]
    pub output: Option<String>,

    #[arg(long, help = "Validate options without sending any request")]
    pub dry_run: bool,
}

#[derive(clap::Args, Debug)]
pub struct PortsArgs {
    #[arg(short = 's', long, help = "JSON file produced by `sentinel spider`")]
    pub spider_results: String,

    #[arg(long, default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..=65535),
        help = "First port of the range")]
    pub from_port: u32,

    #[arg(long, default_value_t = 65535,
        value_parser = clap::value_parser!(u32).range(1..=65535),
        help = "Last port of the range")]
    pub to_port: u32,

    #[arg(long, value_delimiter = ',', default_values_t = [22u16, 80, 443],
        help = "Comma-separated ports to skip")]
    pub allow_list: Vec<u16>,

    #[arg(short = 'c', long, default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..=20),
        help = "Number of ports probed concurrently")]
    pub concurrency: u32,

    #[arg(short = 't', long, default_value_t = 5000,
        value_parser = clap::value_parser!(u64).range(0..=25000),
        help = "Connect and banner timeout in milliseconds")]
    pub timeout: u64,

    #[arg(short = 'o', long, help = "Output JSON file for findings")]
    pub output: Option<String>,

    #[arg(long, help = "Validate options without opening any connection")]
    pub dry_run: bool,
}

#[tokio::main]
async fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let args = Args::parse();
    init_logging(args.verbose);
    print_banner();

    let sink = ConsoleSink::new_ref(args.verbose);
    let outcome = match &args.command {
        Commands::Spider(cmd) => run_spider(cmd, &sink).await,
        Commands::Ports(cmd) => run_ports(cmd, &sink).await,
    };

    if let Err(e) = outcome {
        eprint!("{}\r\n", format!("[!] {:#}", e).red());
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

/// Prints the SENTINEL ASCII banner.
fn print_banner() {
    let banner = r#"
   ____  _____ _   _ _____ ___ _   _ _____ _
  / ___|| ____| \ | |_   _|_ _| \ | | ____| |
  \___ \|  _| |  \| | | |  | ||  \| |  _| | |
   ___) | |___| |\  | | |  | || |\  | |___| |___
  |____/|_____|_| \_| |_| |___|_| \_|_____|_____|
    "#;
    print!("{}\r\n", banner.bright_cyan().bold());
    print!("{}\r\n", "──────────────────────────────────────────────────".dimmed());
    std::io::stdout().flush().ok();
}

/// Crawls from the seed URL and writes `{seed, urls, forms}` to the output file.
async fn run_spider(cmd: &SpiderArgs, sink: &SinkRef) -> anyhow::Result<()> {
    let config = CrawlOptions {
        seed: cmd.url.clone(),
        max_depth: cmd.depth,
        concurrency: cmd.concurrency as usize,
        max_retries: cmd.retries,
        timeout_ms: cmd.timeout,
        ignore_external_links: !cmd.include_external,
    }
    .validate()?;

    if cmd.dry_run {
        if let Some(requested) = cmd.output.as_deref() {
            resolve_output_path(Some(requested), "spider", true)?;
        }
        println!(
            "[DRY RUN] Would crawl {} (max depth {}, concurrency {})",
            config.seed(),
            config.max_depth(),
            config.concurrency()
        );
        return Ok(());
    }

    let output = resolve_output_path(cmd.output.as_deref(), "spider", true)?;
    print_spider_config(cmd, &output);

    let spider = Spider::with_http(config, sink.clone())?;
    let result = spider.scan().await?;

    write_json(&output, &result)?;
    sink.on_log(
        "success",
        &format!(
            "[+] {} URL(s) and {} form(s) saved to {}",
            result.urls.len(),
            result.forms.len(),
            output.display()
        ),
    );
    Ok(())
}

/// Probes every host of a crawl artifact and writes the findings array.
async fn run_ports(cmd: &PortsArgs, sink: &SinkRef) -> anyhow::Result<()> {
    let crawl = read_spider_results(Path::new(&cmd.spider_results))?;

    let config = PortScanOptions {
        hosts: hosts_from_urls(&crawl.urls),
        from_port: cmd.from_port,
        to_port: cmd.to_port,
        allow_list: cmd.allow_list.iter().copied().collect(),
        concurrency: cmd.concurrency as usize,
        timeout_ms: cmd.timeout,
    }
    .validate()?;

    if cmd.dry_run {
        if let Some(requested) = cmd.output.as_deref() {
            resolve_output_path(Some(requested), "ports", false)?;
        }
        println!(
            "[DRY RUN] Would probe {} host(s) across {} port(s)",
            config.hosts().len(),
            config.candidate_ports().len()
        );
        return Ok(());
    }

    let output = resolve_output_path(cmd.output.as_deref(), "ports", false)?;
    print_ports_config(cmd, &output);

    let scanner = PortScanner::new(config, Arc::new(Cvss3Scorer), sink.clone());
    let findings = scanner.scan().await;

    FindingAggregator::report_summary(&findings, sink);
    write_json(&output, &findings)?;
    sink.on_log("success", &format!("[+] Findings saved to {}", output.display()));
    Ok(())
}

fn print_spider_config(cmd: &SpiderArgs, output: &Path) {
    let scope_label = if cmd.include_external { "Follow external links" } else { "Same site only" };

    print!("{}\r\n", format!("[+] Seed:        {}", cmd.url).green().bold());
    print!("{}\r\n", format!("[+] Depth:       {}", cmd.depth).blue());
    print!("{}\r\n", format!("[+] Concurrency: {}", cmd.concurrency).blue());
    print!("{}\r\n", format!("[+] Retries:     {}", cmd.retries).blue());
    print!("{}\r\n", format!("[+] Timeout:     {}ms", cmd.timeout).blue());
    print!("{}\r\n", format!("[+] Scope:       {}", scope_label).yellow());
    print!("{}\r\n", format!("[+] Output:      {}", output.display()).blue());
    print!("{}\r\n", "──────────────────────────────────────────────────".dimmed());
    std::io::stdout().flush().ok();
}

fn print_ports_config(cmd: &PortsArgs, output: &Path) {
    let allow_list: Vec<String> = cmd.allow_list.iter().map(|p| p.to_string()).collect();

    print!("{}\r\n", format!("[+] Input:       {}", cmd.spider_results).green().bold());
    print!("{}\r\n", format!("[+] Ports:       {}-{}", cmd.from_port, cmd.to_port).blue());
    print!("{}\r\n", format!("[+] Skipping:    {}", allow_list.join(",")).yellow());
    print!("{}\r\n", format!("[+] Concurrency: {}", cmd.concurrency).blue());
    print!("{}\r\n", format!("[+] Timeout:     {}ms", cmd.timeout).blue());
    print!("{}\r\n", format!("[+] Output:      {}", output.display()).blue());
    print!("{}\r\n", "──────────────────────────────────────────────────".dimmed());
    std::io::stdout().flush().ok();
}
