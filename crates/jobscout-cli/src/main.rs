use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use jobscout_client::{
    Executor, ExecutorSettings, ExtractorSuite, HumanTiming, ProxyPoolConfig, SessionFingerprints,
    TorConfig, detect_executors,
};
use jobscout_core::traits::NullStore;
use jobscout_core::{
    AcquisitionService, EngineConfig, NullReporter, Orchestrator, ResponseClassifier,
    RotationStrategy, TracingReporter,
};

type Service = AcquisitionService<Executor, ExtractorSuite, NullStore>;

#[derive(Parser)]
#[command(name = "jobscout", version, about = "Job posting acquisition and extraction engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a job posting and print it as JSON
    Acquire {
        /// Posting URL
        #[arg(short, long)]
        url: String,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Acquire every URL listed in a file (one per line), printing NDJSON
    Batch {
        /// File with one URL per line; blank lines and `#` comments are skipped
        #[arg(short, long)]
        file: PathBuf,

        /// Acquisitions in flight at once
        #[arg(short, long, default_value_t = 4)]
        concurrency: usize,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Extract a posting from a saved HTML file, without any network access
    Extract {
        /// HTML file
        #[arg(short, long)]
        file: PathBuf,

        /// URL the page was served from (used for site profiles and repairs)
        #[arg(short, long)]
        url: String,
    },

    /// Run the block classifier over a saved HTML file
    Classify {
        /// HTML file
        #[arg(short, long)]
        file: PathBuf,

        /// HTTP status the page was served with
        #[arg(short, long, default_value_t = 200)]
        status: u16,

        #[arg(short, long, default_value = "https://example.com/")]
        url: String,
    },
}

#[derive(Args)]
struct EngineArgs {
    /// Rotation strategy: direct, proxy, tor, mixed or aggressive
    #[arg(long, env = "JOBSCOUT_STRATEGY", default_value = "mixed")]
    strategy: RotationStrategy,

    /// Attempts per URL, including the first
    #[arg(long, env = "JOBSCOUT_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Comma-separated proxy list URLs (defaults to the built-in sources)
    #[arg(long, env = "JOBSCOUT_PROXY_SOURCES", value_delimiter = ',')]
    proxy_sources: Vec<String>,

    #[arg(long, env = "TOR_HOST", default_value = "127.0.0.1")]
    tor_host: String,

    #[arg(long, env = "TOR_SOCKS_PORT", default_value_t = 9050)]
    tor_socks_port: u16,

    #[arg(long, env = "TOR_CONTROL_PORT", default_value_t = 9051)]
    tor_control_port: u16,

    #[arg(long, env = "TOR_PASSWORD")]
    tor_password: Option<String>,

    /// Chrome/Chromium binary for the browser executor
    #[arg(long, env = "CHROME_BIN")]
    chrome_bin: Option<PathBuf>,

    /// Skip the human-like pauses around requests
    #[arg(long, default_value_t = false)]
    no_pauses: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays clean JSON
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobscout=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Acquire { url, engine } => {
            let service = build_service(&engine).await?;
            cmd_acquire(&service, &url).await
        }
        Commands::Batch {
            file,
            concurrency,
            engine,
        } => {
            let service = Arc::new(build_service(&engine).await?);
            cmd_batch(service, &file, concurrency).await
        }
        Commands::Extract { file, url } => cmd_extract(&file, &url),
        Commands::Classify { file, status, url } => cmd_classify(&file, status, &url),
    }
}

fn executor_settings(args: &EngineArgs) -> ExecutorSettings {
    // Direct-only runs never escalate, so nothing else is worth probing.
    let escalates = args.strategy != RotationStrategy::DirectOnly;
    let proxy = escalates.then(|| {
        if args.proxy_sources.is_empty() {
            ProxyPoolConfig::default()
        } else {
            ProxyPoolConfig::default().with_sources(args.proxy_sources.clone())
        }
    });
    let tor = escalates.then(|| TorConfig {
        host: args.tor_host.clone(),
        socks_port: args.tor_socks_port,
        control_port: args.tor_control_port,
        password: args.tor_password.clone(),
        ..TorConfig::default()
    });

    #[cfg(feature = "browser")]
    let browser = escalates.then(|| jobscout_client::BrowserConfig {
        chrome_bin: args.chrome_bin.clone(),
        ..jobscout_client::BrowserConfig::default()
    });
    #[cfg(not(feature = "browser"))]
    if args.chrome_bin.is_some() {
        tracing::warn!("CHROME_BIN set but this build has no browser support");
    }

    ExecutorSettings {
        proxy,
        tor,
        #[cfg(feature = "browser")]
        browser,
        request_timeout: Duration::from_secs(args.timeout),
        timing: if args.no_pauses {
            HumanTiming::none()
        } else {
            HumanTiming::default()
        },
    }
}

async fn build_service(args: &EngineArgs) -> Result<Service> {
    let fingerprints = SessionFingerprints::random();
    let executors = detect_executors(executor_settings(args), fingerprints)
        .await
        .context("Failed to set up fetch executors")?;

    let config = EngineConfig::default()
        .with_strategy(args.strategy)
        .with_max_retries(args.max_retries);
    let orchestrator = Orchestrator::new(executors, config);
    tracing::info!(
        strategy = %args.strategy,
        executors = ?orchestrator.available_kinds(),
        "Engine ready"
    );

    Ok(AcquisitionService::new(orchestrator, ExtractorSuite::default()))
}

async fn cmd_acquire(service: &Service, url: &str) -> Result<ExitCode> {
    let outcome = service
        .acquire_job_posting(url, None, None, &TracingReporter)
        .await;
    let (json, code) = match outcome {
        Ok(posting) => (serde_json::to_string_pretty(&posting)?, ExitCode::SUCCESS),
        Err(error) => (serde_json::to_string_pretty(&error)?, ExitCode::FAILURE),
    };
    println!("{json}");
    Ok(code)
}

async fn cmd_batch(service: Arc<Service>, file: &Path, concurrency: usize) -> Result<ExitCode> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read URL list: {}", file.display()))?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();
    tracing::info!(count = urls.len(), concurrency, "Starting batch");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing in-flight acquisitions");
            on_signal.cancel();
        }
    });

    let cancel_check = cancel.clone();
    let results: Vec<bool> = futures::stream::iter(urls)
        .take_while(move |_| std::future::ready(!cancel_check.is_cancelled()))
        .map(|url| {
            let service = Arc::clone(&service);
            async move {
                let outcome = service
                    .acquire_job_posting(&url, None, None, &NullReporter)
                    .await;
                let line = match &outcome {
                    Ok(posting) => serde_json::json!({ "url": url, "ok": true, "posting": posting }),
                    Err(error) => serde_json::json!({ "url": url, "ok": false, "error": error }),
                };
                println!("{line}");
                outcome.is_ok()
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let failed = results.iter().filter(|ok| !**ok).count();
    tracing::info!(
        done = results.len(),
        failed,
        cancelled = cancel.is_cancelled(),
        stats = ?service.orchestrator().stats(),
        "Batch finished"
    );
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_extract(file: &Path, url: &str) -> Result<ExitCode> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read HTML file: {}", file.display()))?;
    let service: Service = AcquisitionService::new(
        Orchestrator::new(Vec::new(), EngineConfig::default()),
        ExtractorSuite::default(),
    );
    let posting = service.extract_posting(&html, url);
    println!("{}", serde_json::to_string_pretty(&posting)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_classify(file: &Path, status: u16, url: &str) -> Result<ExitCode> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read HTML file: {}", file.display()))?;
    let signal = ResponseClassifier::default().classify(&html, status, url);
    println!("{}", serde_json::to_string_pretty(&signal)?);
    Ok(if signal.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_acquire_defaults() {
        let cli = parse(&["jobscout", "acquire", "--url", "https://example.com/jobs/1"]);
        let Commands::Acquire { url, engine } = cli.command else {
            panic!("expected acquire");
        };
        assert_eq!(url, "https://example.com/jobs/1");
        assert_eq!(engine.strategy, RotationStrategy::Mixed);
        assert_eq!(engine.max_retries, 3);
    }

    #[test]
    fn test_direct_strategy_skips_other_executors() {
        let cli = parse(&[
            "jobscout",
            "acquire",
            "--url",
            "https://example.com/",
            "--strategy",
            "direct",
            "--no-pauses",
        ]);
        let Commands::Acquire { engine, .. } = cli.command else {
            panic!("expected acquire");
        };
        let settings = executor_settings(&engine);
        assert!(settings.proxy.is_none());
        assert!(settings.tor.is_none());
    }

    #[test]
    fn test_proxy_sources_are_split() {
        let cli = parse(&[
            "jobscout",
            "batch",
            "--file",
            "urls.txt",
            "--proxy-sources",
            "https://a.test/list.txt,https://b.test/list.txt",
        ]);
        let Commands::Batch { engine, concurrency, .. } = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(concurrency, 4);
        let sources = executor_settings(&engine).proxy.unwrap().sources;
        assert_eq!(sources, ["https://a.test/list.txt", "https://b.test/list.txt"]);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["jobscout", "acquire", "--url", "x", "--strategy", "warp"]).is_err());
    }

    #[test]
    fn test_extract_offline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(
            &path,
            r#"<html><head><script type="application/ld+json">{"@type":"JobPosting","title":"SRE","hiringOrganization":{"name":"Acme"}}</script></head><body></body></html>"#,
        )
        .unwrap();
        assert_eq!(cmd_extract(&path, "https://acme.test/jobs/1").unwrap(), ExitCode::SUCCESS);
    }

    #[test]
    fn test_classify_blocked_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocked.html");
        std::fs::write(&path, "").unwrap();
        assert_eq!(cmd_classify(&path, 403, "https://acme.test/").unwrap(), ExitCode::FAILURE);
    }
}
