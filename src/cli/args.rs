use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "meetcap")]
#[command(about = "Meeting bot client: live captions, chat and summaries", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Sign in to the backend
    Login(LoginCliArgs),
    /// Forget the stored credentials
    Logout,
    /// Create an account and activate it with the emailed code
    Register(RegisterCliArgs),
    /// Activate an account with the emailed code
    Verify(VerifyCliArgs),
    /// Check whether a link is a supported meeting link
    Classify(ClassifyCliArgs),
    /// Send the meeting bot into a meeting
    Join(JoinCliArgs),
    /// Follow a live meeting's captions, chat and status
    Watch(WatchCliArgs),
    /// Ask the bot to leave a meeting
    Stop(StopCliArgs),
    /// List meetings currently being recorded
    Live,
    /// List recorded meetings
    Records(RecordsCliArgs),
    /// Show a recorded meeting
    Show(ShowCliArgs),
    /// Request an AI summary for a recorded meeting
    Summary(SummaryCliArgs),
    /// Upload a recording as an imported meeting
    Upload(UploadCliArgs),
    /// List meetings from the connected Google calendar
    Calendar(CalendarCliArgs),
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct LoginCliArgs {
    /// Account email (prompted if omitted)
    #[arg(short, long)]
    pub email: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct RegisterCliArgs {
    /// Display name (prompted if omitted)
    #[arg(short, long)]
    pub name: Option<String>,
    /// Account email (prompted if omitted)
    #[arg(short, long)]
    pub email: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct VerifyCliArgs {
    /// Account email (prompted if omitted)
    #[arg(short, long)]
    pub email: Option<String>,
    /// Ask the backend to send a fresh code first
    #[arg(short, long)]
    pub resend: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ClassifyCliArgs {
    /// Meeting link to check
    pub url: String,
    /// Print the classification as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct JoinCliArgs {
    /// Google Meet, Zoom or Teams link
    pub url: String,
    /// Transcription language (defaults to session.language)
    #[arg(short, long)]
    pub language: Option<String>,
    /// Follow the session right after the bot is sent in
    #[arg(short, long)]
    pub watch: bool,
}

#[derive(ClapArgs, Debug)]
pub struct WatchCliArgs {
    /// Meeting session id
    pub id: String,
}

#[derive(ClapArgs, Debug)]
pub struct StopCliArgs {
    /// Meeting session id
    pub id: String,
}

#[derive(ClapArgs, Debug)]
pub struct RecordsCliArgs {
    #[arg(short, long, default_value = "1")]
    pub page: u32,
    /// Maximum number of records to show
    #[arg(short, long, default_value = "20")]
    pub limit: u32,
    /// Filter records by title
    #[arg(short, long)]
    pub keyword: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct ShowCliArgs {
    /// Meeting session id
    pub id: String,
    /// Keep running and print translation and summary progress
    #[arg(short, long)]
    pub follow: bool,
}

#[derive(ClapArgs, Debug)]
pub struct SummaryCliArgs {
    /// Meeting session id
    pub id: String,
    /// Summary language (defaults to session.language)
    #[arg(short, long)]
    pub language: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct UploadCliArgs {
    /// Audio or video file
    pub file: PathBuf,
}

#[derive(ClapArgs, Debug)]
pub struct CalendarCliArgs {
    /// Only today's meetings
    #[arg(short, long)]
    pub today: bool,
}
