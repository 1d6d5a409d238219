use anyhow::Result;
use clap::Parser;
use meetcap::{
    api::ApiError,
    cli::{
        handle_calendar_command, handle_classify_command, handle_join_command, handle_live_command,
        handle_login_command, handle_logout_command, handle_records_command,
        handle_register_command, handle_session_expired, handle_show_command, handle_stop_command,
        handle_summary_command, handle_upload_command, handle_verify_command,
        handle_watch_command, log_level, Cli, CliCommand,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = log_level(cli.verbose);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Some(CliCommand::Version) => {
            println!("meetcap {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Login(args)) => handle_login_command(args).await,
        Some(CliCommand::Logout) => handle_logout_command(),
        Some(CliCommand::Register(args)) => handle_register_command(args).await,
        Some(CliCommand::Verify(args)) => handle_verify_command(args).await,
        Some(CliCommand::Classify(args)) => handle_classify_command(args),
        Some(CliCommand::Join(args)) => handle_join_command(args).await,
        Some(CliCommand::Watch(args)) => handle_watch_command(args).await,
        Some(CliCommand::Stop(args)) => handle_stop_command(args).await,
        Some(CliCommand::Live) => handle_live_command().await,
        Some(CliCommand::Records(args)) => handle_records_command(args).await,
        Some(CliCommand::Show(args)) => handle_show_command(args).await,
        Some(CliCommand::Summary(args)) => handle_summary_command(args).await,
        Some(CliCommand::Upload(args)) => handle_upload_command(args).await,
        Some(CliCommand::Calendar(args)) => handle_calendar_command(args).await,
        None => {
            println!("Nothing to do. Run `meetcap --help` for the list of commands.");
            Ok(())
        }
    };

    match result {
        Err(err) if is_unauthorized(&err) => {
            handle_session_expired(cli.yes)?;
            std::process::exit(1);
        }
        other => other,
    }
}

fn is_unauthorized(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<ApiError>()
            .is_some_and(ApiError::is_unauthorized)
    })
}
