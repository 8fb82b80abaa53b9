//! WeChat Notify CLI - main entry point
//!
//! Reads a message from stdin and sends it to every OPENID given on the
//! command line. The exit status is the number of failed recipients.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use wechat_notify::commands::{self, NotifyArgs};

const DEFAULT_LOG_FILTER: &str = "wechat_notify=warn";

const TEMPLATE_HELP: &str = "\
Template Format:
    timestamp: 1452504535
    service:   some-service
    event:     some-event
    action:    some-action
    host:      some-host
    url:       https://example.com/details

    you can type your multi-line message here...";

#[derive(Parser, Debug)]
#[command(name = "wechat-notify")]
#[command(about = "Send templated message to specified WeChat users.", long_about = None)]
#[command(version, after_help = TEMPLATE_HELP)]
struct Cli {
    /// Send un-templated message
    #[arg(long, env = "WECHAT_NOTIFY_RAW")]
    raw: bool,

    /// Don't generate URL when URL is empty and message is too long
    #[arg(long, env = "WECHAT_NOTIFY_NO_AUTO_URL")]
    no_auto_url: bool,

    /// YAML config file (default: config.yml, then ../config.yml)
    #[arg(short, long, env = "WECHAT_NOTIFY_CONFIG")]
    config: Option<PathBuf>,

    /// Recipient OPENIDs; an `@label` suffix is accepted and ignored
    #[arg(value_name = "OPENID")]
    recipients: Vec<String>,
}

impl From<Cli> for NotifyArgs {
    fn from(cli: Cli) -> Self {
        NotifyArgs {
            recipients: cli.recipients,
            raw: cli.raw,
            no_auto_url: cli.no_auto_url,
            config: cli.config,
        }
    }
}

/// `RUST_LOG` when it is set and parses, the crate default otherwise.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Failed recipient count, saturating at 255. Fatal errors exit 1.
fn exit_status(outcome: &wechat_notify::Result<usize>) -> u8 {
    match outcome {
        Ok(failed) => u8::try_from(*failed).unwrap_or(u8::MAX),
        Err(_) => 1,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr; stdout carries the per-recipient result lines
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(
            std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
        ))
        .init();

    let cli = Cli::parse();

    let outcome = commands::notify_run(cli.into()).await;
    if let Err(err) = &outcome {
        eprintln!("{}", err);
    }
    Ok(ExitCode::from(exit_status(&outcome)))
}
