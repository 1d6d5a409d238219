//! CLI handlers for recorded meetings: listing, documents, summaries and
//! uploads.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use super::args::{
    CalendarCliArgs, RecordsCliArgs, ShowCliArgs, SummaryCliArgs, UploadCliArgs,
};
use super::render::{format_record_line, format_utterance};
use super::{parse_session_id, spinner, CliContext};
use crate::api::{mime_type_for_extension, RecordQuery};
use crate::document::{DocumentFeed, DocumentTracker};
use crate::session::{MeetingRecord, MeetingSessionId};
use crate::transport::{PushConnection, PushHub, PushSettings};

pub async fn handle_records_command(args: RecordsCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    ctx.require_login()?;

    let query = RecordQuery {
        page: args.page.max(1),
        limit: args.limit.max(1),
        keyword: args.keyword.filter(|k| !k.trim().is_empty()),
        ..RecordQuery::default()
    };

    let page = ctx
        .client()
        .records(&query)
        .await
        .context("Failed to list records")?;

    if page.data.is_empty() {
        println!("No recorded meetings found matching your criteria.");
        return Ok(());
    }

    for record in &page.data {
        println!("{}", format_record_line(record));
    }

    let pagination = &page.pagination;
    println!(
        "\nPage {} of {} ({} total)",
        pagination.page.max(query.page),
        pagination.page_count.max(1),
        pagination.total
    );
    if pagination.page < pagination.page_count {
        println!("Next page: meetcap records --page {}", pagination.page + 1);
    }
    Ok(())
}

pub async fn handle_show_command(args: ShowCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    ctx.require_login()?;
    let id = parse_session_id(&args.id)?;

    let record = ctx
        .client()
        .meeting_info(&id)
        .await
        .with_context(|| format!("Failed to load meeting {}", id))?;

    let mut tracker = DocumentTracker::new();
    tracker.load(record);

    if !args.follow || !(tracker.is_translating() || tracker.is_summarizing()) {
        if let Some(record) = tracker.record() {
            print_document(record);
        }
        return Ok(());
    }

    follow_document(&ctx, id, tracker).await
}

async fn follow_document(
    ctx: &CliContext,
    id: MeetingSessionId,
    mut tracker: DocumentTracker,
) -> Result<()> {
    let hub = PushHub::new();
    let mut connection = PushConnection::new(hub.clone(), PushSettings::from_config(&ctx.config));
    connection
        .sync_auth(&ctx.credentials)
        .await
        .context("Failed to open push connection")?;
    let mut feed = DocumentFeed::subscribe(hub, id.clone());

    let pb = spinner(&progress_message(&tracker));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = feed.next() => {
                let Some(event) = event else { break };
                if tracker.apply(event) {
                    pb.set_message(progress_message(&tracker));
                }
                if !tracker.is_translating() && !tracker.is_summarizing() {
                    break;
                }
            }
        }
    }
    pb.finish_and_clear();

    feed.close();
    connection.disconnect().await;
    info!("Stopped following {}", id);

    if let Some(record) = tracker.record() {
        print_document(record);
    }
    Ok(())
}

fn progress_message(tracker: &DocumentTracker) -> String {
    let status = tracker
        .record()
        .and_then(|r| r.translate_status)
        .map(|s| s.as_str())
        .unwrap_or("UNKNOWN");
    if tracker.is_summarizing() {
        "Summarizing...".to_string()
    } else {
        format!("Processing transcript ({})...", status)
    }
}

fn print_document(record: &MeetingRecord) {
    println!("{}", record.display_title());
    println!("{}", "=".repeat(record.display_title().chars().count().max(3)));
    println!("ID: {}", record.id);
    if let Some(platform) = record.platform {
        println!("Platform: {}", platform.as_str());
    }
    if let Some(organizer) = record.organizer.as_deref().filter(|o| !o.is_empty()) {
        println!("Organizer: {}", organizer);
    }
    if let Some(status) = record.translate_status {
        println!("Processing: {}", status.as_str());
    }
    if let Some(uri) = record.record_uri.as_deref() {
        println!("Recording: {}", uri);
    }

    if let Some(summary) = record.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        println!("\nSummary\n-------");
        println!("{}", summary.trim());
    }

    if !record.translation_ai.is_empty() {
        println!("\nTranscript\n----------");
        for utterance in &record.translation_ai {
            println!("{}", format_utterance(utterance));
        }
    }
}

pub async fn handle_summary_command(args: SummaryCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    ctx.require_login()?;
    let id = parse_session_id(&args.id)?;
    let language = ctx.language(args.language);

    let pb = spinner("Requesting summary...");
    let result = ctx.client().request_summary(&id, &language).await;
    pb.finish_and_clear();

    let record = result.context("Failed to request summary")?;
    match record.and_then(|r| r.summary).filter(|s| !s.trim().is_empty()) {
        Some(summary) => println!("{}", summary.trim()),
        None => {
            println!("Summary requested ({}).", language);
            println!("Follow progress with: meetcap show {} --follow", id);
        }
    }
    Ok(())
}

pub async fn handle_upload_command(args: UploadCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    ctx.require_login()?;
    validate_upload(&args.file)?;

    let pb = spinner("Uploading...");
    let result = ctx.client().upload_recording(&args.file).await;
    pb.finish_and_clear();

    let record = result.context("Failed to upload recording")?;
    println!("Uploaded as {} ({})", record.display_title(), record.id);
    println!("Follow processing with: meetcap show {} --follow", record.id);
    Ok(())
}

fn validate_upload(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    if !path.is_file() {
        bail!("Not a file: {}", path.display());
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if mime_type_for_extension(&ext).is_none() {
        bail!(
            "Unsupported file format '{}'. Upload an audio or video recording.",
            ext
        );
    }
    Ok(())
}

pub async fn handle_calendar_command(args: CalendarCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    ctx.require_login()?;

    let calendar = ctx
        .client()
        .calendar_meetings(args.today)
        .await
        .context("Failed to load calendar")?;

    if !calendar.register_google_calendar {
        println!("No Google calendar is connected to this account.");
        return Ok(());
    }
    if calendar.list.is_empty() {
        println!("No upcoming meetings.");
        return Ok(());
    }

    for meeting in &calendar.list {
        let link = meeting.hangout_link.as_deref().unwrap_or("-");
        println!("{}  {}  {}", meeting.start_time, meeting.summary, link);
    }
    Ok(())
}
