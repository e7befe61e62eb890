use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::aggregate::{HistoryAggregator, regroup};
use crate::cache::ReferenceCache;
use crate::cli::Cli;
use crate::client::{PacedClient, RemoteHistoryClient, SlackHttpClient};
use crate::history::HistoryFetcher;
use crate::mail::{FileMailer, Mailer, SendmailMailer, deliver_all};
use crate::model::TimeWindow;
use crate::render::render_section;
use crate::settings::Settings;
use crate::{AppError, Period, Result, load_token};

/// Fetch, regroup and render the histories of every visible conversation.
///
/// Returns one `(title, html)` pair per non-empty section.
pub async fn build_documents<C, Tz>(
    client: &C,
    window: &TimeWindow,
    interval_label: &str,
    tz: &Tz,
    dump_json: Option<&Path>,
) -> Result<Vec<(String, String)>>
where
    C: RemoteHistoryClient,
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let cache = ReferenceCache::new(client);
    let fetcher = HistoryFetcher::new(client);
    let aggregator = HistoryAggregator::new(&cache, &fetcher);

    let histories = aggregator.all_histories(window).await?;
    tracing::info!(
        messages = histories.total_messages(),
        "fetched all conversation histories"
    );

    if let Some(path) = dump_json {
        write_json(path, &histories)?;
    }

    let sections = regroup(&histories, interval_label);
    if sections.is_empty() {
        return Ok(Vec::new());
    }

    let users = cache.users().await?;
    Ok(sections
        .iter()
        .map(|section| (section.title.clone(), render_section(section, users, tz)))
        .collect())
}

pub async fn run_export(cli: Cli) -> Result<()> {
    let token = load_token(&cli.credentials)?;
    let settings = Settings::load(&cli.config)?;
    let period = Period::parse(&cli.date)?;

    let now = Local::now();
    let window = period.window(&now)?;
    let label = period.label();

    println!(
        "Exporting Slack history for {} ({} to {})...",
        label, window.since(), window.till()
    );

    let client = PacedClient::new(
        SlackHttpClient::new(&settings.slack.api_url, &token)?,
        settings.slack.rate_limit_delay(),
    );
    let documents =
        build_documents(&client, &window, &label, &Local, cli.dump_json.as_deref()).await?;

    if documents.is_empty() {
        println!("No messages found for {}.", label);
        return Ok(());
    }

    let mailer: Box<dyn Mailer> = match &cli.output_dir {
        Some(dir) => Box::new(FileMailer::new(dir)?),
        None => Box::new(SendmailMailer::new(&settings.mail.sendmail)),
    };
    let report = deliver_all(mailer.as_ref(), &cli.from, &cli.to, &documents);

    println!(
        "Export completed! {} mails sent, {} failed.",
        report.sent, report.failed
    );
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| AppError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, data).map_err(|e| AppError::JsonSerialize(e.to_string()))?;
    Ok(())
}
