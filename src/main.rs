/// Version injected at compile time via VMINFO_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("VMINFO_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::io;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use url::Url;
use vminfo::config::Config;
use vminfo::info::{self, InfoRequest};
use vminfo::inventory::ReportOptions;
use vminfo::vsphere::auth::SessionCredentials;
use vminfo::vsphere::client::{ConnectionSettings, VsphereClient};
use vminfo::vsphere::http::format_api_error;

/// Show virtual machine summaries with hosts, datastores and networks resolved
#[derive(Parser, Debug)]
#[command(name = "vminfo", version, about, long_about = None)]
struct Args {
    /// Inventory paths of virtual machines (all when omitted)
    paths: Vec<String>,

    /// Show general summary
    #[arg(short = 'g', long, default_value_t = true, action = ArgAction::Set)]
    general: bool,

    /// Show ExtraConfig
    #[arg(short = 'e', long)]
    extra_config: bool,

    /// Show resource summary
    #[arg(short = 'r', long)]
    resources: bool,

    /// Wait for each VM to acquire an IP address
    #[arg(long)]
    waitip: bool,

    /// Write JSON instead of text
    #[arg(long)]
    json: bool,

    /// Gateway URL (defaults to VMINFO_URL, then the config file)
    #[arg(short, long)]
    url: Option<String>,

    /// User name (defaults to VMINFO_USERNAME, then the config file)
    #[arg(long)]
    username: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Abort the whole run after this many seconds
    #[arg(long, value_name = "SECS")]
    deadline: Option<u64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("vminfo {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("vminfo").join("vminfo.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".vminfo").join("vminfo.log");
    }
    PathBuf::from("vminfo.log")
}

fn build_client(args: &Args, config: &Config) -> Result<VsphereClient> {
    let url = config
        .effective_url(args.url.as_deref())
        .context("No gateway URL configured. Set VMINFO_URL or use --url")?;
    let url = Url::parse(&url).with_context(|| format!("Invalid gateway URL: {}", url))?;

    let username = config.effective_username(args.username.as_deref());
    let credentials = SessionCredentials::from_env(username.as_deref())?;

    let settings = ConnectionSettings {
        url,
        insecure: args.insecure || config.insecure,
        poll_interval: config.poll_interval(),
        wait_timeout: config.wait_timeout(),
    };

    tracing::info!("Using gateway {} as {}", settings.url, credentials.username());
    VsphereClient::new(&settings, credentials)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level)?;

    let config = Config::load();
    let client = build_client(&args, &config)?;

    let request = InfoRequest {
        paths: args.paths.clone(),
        options: ReportOptions {
            general: args.general,
            extra_config: args.extra_config,
            resources: args.resources,
            wait_for_ip: args.waitip,
            json: args.json,
        },
        deadline: config.deadline(args.deadline),
    };

    // Buffer the report so a failed run writes nothing
    let mut report = Vec::new();
    match info::run(&client, &request, &mut report).await {
        Ok(count) => {
            tracing::info!("Reported {} virtual machine(s)", count);
            io::Write::write_all(&mut io::stdout().lock(), &report)?;
            Ok(())
        }
        Err(err) => {
            tracing::error!("vminfo failed: {:#}", err);
            eprintln!("Error: {}", format_api_error(&err));
            drop(log_guard);
            std::process::exit(1);
        }
    }
}
