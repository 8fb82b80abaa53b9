//! Deliver stdin to every recipient given on the command line.

use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::input::Input;
use crate::message::{template_message, text_message, Message, TemplateOptions};
use crate::wechat::WechatClient;
use crate::{Error, Result};

const TERMINAL_HINT: &str =
    "Paste your message and press CTRL-D to send. See --help for template format.";

/// Arguments for a notification run
#[derive(Debug, Clone, Default)]
pub struct NotifyArgs {
    /// `OPENID` or `OPENID@label`
    pub recipients: Vec<String>,
    pub raw: bool,
    pub no_auto_url: bool,
    pub config: Option<PathBuf>,
}

/// How each recipient's message is built.
#[derive(Debug, Clone)]
pub struct NotifyOptions {
    pub raw: bool,
    pub template: TemplateOptions,
}

impl NotifyOptions {
    pub fn new(config: &Config, raw: bool, no_auto_url: bool) -> Self {
        Self {
            raw,
            template: TemplateOptions {
                template_id: config.template_id.clone(),
                auto_url_prefix: (!no_auto_url).then(|| config.auto_url_prefix.clone()),
            },
        }
    }
}

/// Recipient id of an `OPENID[@label]` argument. The label is dropped.
pub fn recipient_id(arg: &str) -> &str {
    arg.split_once('@').map_or(arg, |(openid, _)| openid)
}

/// Build the payload for one recipient from the shared stdin buffer.
pub fn build_message(openid: &str, stdin: &[u8], options: &NotifyOptions) -> Message {
    if options.raw {
        text_message(openid, stdin)
    } else {
        template_message(openid, &Input::parse(stdin), &options.template)
    }
}

/// Send to every recipient in order, writing one result line each.
/// Returns the number of failed recipients.
///
/// Result lines are best-effort: a closed output stream never stops
/// delivery to the remaining recipients.
pub async fn notify_all<O: Write, E: Write>(
    client: &WechatClient,
    recipients: &[String],
    stdin: &[u8],
    options: &NotifyOptions,
    out: &mut O,
    err: &mut E,
) -> Result<usize> {
    let mut failed = 0;

    for arg in recipients {
        let openid = recipient_id(arg);
        let message = build_message(openid, stdin, options);

        let written = match client.send(&message).await {
            Ok(()) => writeln!(out, "{} ok", openid),
            Err(e) => {
                // The result line on stderr is the report; keep the log quiet
                debug!(%openid, error = %e, "notification failed");
                failed += 1;
                writeln!(err, "{} {}", openid, e)
            }
        };
        if let Err(e) = written {
            warn!(%openid, error = %e, "could not write result line");
        }
    }

    info!(
        sent = recipients.len() - failed,
        failed, "notification run finished"
    );
    Ok(failed)
}

/// CLI entry point. Returns the number of failed recipients; errors are
/// fatal to the whole run.
pub async fn run(args: NotifyArgs) -> Result<usize> {
    if args.recipients.is_empty() {
        return Err(Error::Config("Please provide at least one OPENID.".to_string()));
    }

    let config = Config::load(args.config.as_deref())?;
    let client = WechatClient::new(&config)?;
    let options = NotifyOptions::new(&config, args.raw, args.no_auto_url);

    let stdin = read_stdin().await?;

    notify_all(
        &client,
        &args.recipients,
        &stdin,
        &options,
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    )
    .await
}

async fn read_stdin() -> Result<Vec<u8>> {
    if std::io::stdin().is_terminal() {
        eprintln!("{}", TERMINAL_HINT);
    }
    let mut buf = Vec::new();
    tokio::io::stdin().read_to_end(&mut buf).await?;
    Ok(buf)
}
