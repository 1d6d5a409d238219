//! CLI handlers for live meetings: link checks, bot join/stop and the live
//! session view.

use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use super::args::{ClassifyCliArgs, JoinCliArgs, StopCliArgs, WatchCliArgs};
use super::render::{format_record_line, SessionPrinter};
use super::{parse_session_id, spinner, CliContext};
use crate::api::{ApiError, JoinRequest};
use crate::link::LinkClassifier;
use crate::session::{
    MeetingSessionId, SessionNotice, SessionView, SnapshotSource, TerminalNotice,
};
use crate::transport::{PushConnection, PushHub, PushSettings};

pub fn handle_classify_command(args: ClassifyCliArgs) -> Result<()> {
    let classifier = LinkClassifier::new()?;
    let classification = classifier.classify(&args.url);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
        return Ok(());
    }

    match (classification.validate, classification.platform, classification.meeting_code) {
        (true, Some(platform), Some(code)) => {
            println!("Platform: {}", platform.as_str());
            println!("Meeting code: {}", code);
            if let Some(params) = classification.params {
                println!("Params: {}", params);
            }
            Ok(())
        }
        _ => bail!("Not a supported meeting link: {}", args.url.trim()),
    }
}

pub async fn handle_join_command(args: JoinCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    ctx.require_login()?;

    let link = LinkClassifier::new()?.parse(&args.url)?;
    let language = ctx.language(args.language);
    let request = JoinRequest::from_link(link, language);

    let pb = spinner("Sending the bot into the meeting...");
    let result = ctx.client().join_meeting(&request).await;
    pb.finish_and_clear();

    let record = match result {
        Ok(record) => record,
        Err(ApiError::Timeout) => bail!(
            "The bot did not respond within {}s. Check `meetcap live` before retrying.",
            ctx.config.backend.join_timeout_seconds
        ),
        Err(e) => return Err(e).context("Failed to join meeting"),
    };

    let id = MeetingSessionId::parse(&record.id)
        .ok_or_else(|| anyhow!("Backend returned a meeting without an id"))?;
    println!("Bot joining {} (session {})", record.display_title(), id);

    if args.watch {
        watch_session(&ctx, id).await
    } else {
        println!("Follow it with: meetcap watch {}", id);
        Ok(())
    }
}

pub async fn handle_watch_command(args: WatchCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    ctx.require_login()?;
    let id = parse_session_id(&args.id)?;
    watch_session(&ctx, id).await
}

pub async fn handle_stop_command(args: StopCliArgs) -> Result<()> {
    let ctx = CliContext::load()?;
    ctx.require_login()?;
    let id = parse_session_id(&args.id)?;

    let pb = spinner("Stopping the bot...");
    let result = ctx.client().stop_meeting(&id).await;
    pb.finish_and_clear();

    match result {
        Ok(()) => {
            println!("Bot left meeting {}.", id);
            println!("The document will appear under: meetcap show {}", id);
            Ok(())
        }
        Err(ApiError::Timeout) => bail!(
            "Stopping timed out after {}s. The bot may still leave; check `meetcap live`.",
            ctx.config.backend.stop_timeout_seconds
        ),
        Err(e) => Err(e).context("Failed to stop meeting"),
    }
}

pub async fn handle_live_command() -> Result<()> {
    let ctx = CliContext::load()?;
    ctx.require_login()?;

    let meetings = ctx
        .client()
        .live_meetings()
        .await
        .context("Failed to list live meetings")?;

    if meetings.is_empty() {
        println!("No meetings are being recorded right now.");
        return Ok(());
    }

    println!("{} live meeting(s):\n", meetings.len());
    for meeting in &meetings {
        println!("{}", format_record_line(meeting));
    }
    println!("\nTo follow one, use: meetcap watch <ID>");
    Ok(())
}

enum WatchOutcome {
    Notice(SessionNotice),
    Interrupted,
}

/// Mount a session view and print it until a terminal notice or Ctrl-C.
async fn watch_session(ctx: &CliContext, id: MeetingSessionId) -> Result<()> {
    let hub = PushHub::new();
    let mut connection = PushConnection::new(hub.clone(), PushSettings::from_config(&ctx.config));
    connection
        .sync_auth(&ctx.credentials)
        .await
        .context("Failed to open push connection")?;

    let source: Arc<dyn SnapshotSource> = Arc::new(ctx.client());
    let (view, mut notices) = SessionView::mount(id.clone(), hub, source, ctx.policy());
    let mut updates = view.watch();

    let pb = spinner("Loading session...");
    let mut printer = SessionPrinter::new();

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break WatchOutcome::Interrupted,
            notice = notices.recv() => match notice {
                Some(notice) => break WatchOutcome::Notice(notice),
                None => break WatchOutcome::Interrupted,
            },
            changed = updates.changed() => {
                if changed.is_err() {
                    break WatchOutcome::Interrupted;
                }
                let model = updates.borrow_and_update().clone();
                for line in printer.lines(&model) {
                    pb.println(line);
                }
                match printer.caption(&model) {
                    Some(caption) => pb.set_message(caption),
                    None if model.loading => pb.set_message("Loading session..."),
                    None => pb.set_message("Listening..."),
                }
            }
        }
    };

    pb.finish_and_clear();
    for line in printer.flush(&view.view()) {
        println!("{}", line);
    }

    view.unmount().await;
    connection.disconnect().await;
    debug!("Watch of {} finished", id);

    match outcome {
        WatchOutcome::Interrupted => {
            info!("Stopped watching {}", id);
            Ok(())
        }
        WatchOutcome::Notice(SessionNotice::Terminal(notice)) => report_terminal(notice, &id),
        WatchOutcome::Notice(SessionNotice::SnapshotFailed(e)) => {
            Err(e).context(format!("Failed to load session {}", id))
        }
    }
}

fn report_terminal(notice: TerminalNotice, id: &MeetingSessionId) -> Result<()> {
    match notice {
        TerminalNotice::JoinFailed => {
            bail!("{} Start again with `meetcap join <url>`.", notice.message())
        }
        TerminalNotice::MeetingEnded => {
            println!("{}", notice.message());
            println!("View the document with: meetcap show {}", id);
            Ok(())
        }
        TerminalNotice::NotRecording => bail!("{}", notice.message()),
    }
}
