//! `portal` command line front end for the club event portal.
//!
//! Each subcommand corresponds to a portal page. Before calling the API it
//! resolves that page through the client router guard, so an absent or
//! expired session fails fast with "login required" and clears the stored
//! token, exactly as a protected route redirects in the web front end.

mod render;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use client::router::{self, GuardError, Navigation, Route};
use client::{
    ApiClient, ApiError, AuthContext, AuthStatus, Dashboard, FileSessionStore, FileUpload, Session, SessionError,
    TokenStatus, TokenWatch, token,
};
use models::{CreateEventRequest, EventStatus, FileCategory, Role, UpdateEventRequest, User};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("login required; run `portal login` first")]
    LoginRequired,
    #[error("insufficient permissions")]
    Forbidden,
    #[error("already signed in as {0}; run `portal logout` first")]
    AlreadySignedIn(String),
    #[error("page not available: {0}")]
    Redirected(Route),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("file error for {path}: {source}")]
    File { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<GuardError> for CliError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::LoginRequired => Self::LoginRequired,
            GuardError::Forbidden => Self::Forbidden,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "portal", about = "Club event portal CLI")]
struct Cli {
    /// API server root.
    #[arg(long, global = true, env = "PORTAL_BASE_URL", default_value = "http://127.0.0.1:8000")]
    base_url: String,

    /// Session file; defaults to ~/.config/portal/session.json.
    #[arg(long, global = true, env = "PORTAL_SESSION_FILE")]
    session: Option<PathBuf>,

    /// Print raw JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    /// Sign in with email and password.
    Login {
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in.
    Register {
        name: String,
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the Google sign-in URL.
    GoogleLogin {
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Finish Google sign-in with the code and state from the redirect.
    GoogleCallback { code: String, state: String },
    Logout,
    /// Show the signed-in user, refreshed from the server.
    Whoami,
    Dashboard,
    Events(EventsCommand),
    /// Pending events awaiting approval.
    Proposals,
    /// Archived events.
    Archive,
    Files(FilesCommand),
    Users(UsersCommand),
    /// Re-check the stored token periodically until it expires.
    Watch {
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
}

#[derive(Args, Debug)]
struct EventsCommand {
    #[command(subcommand)]
    command: EventsSubcommand,
}

#[derive(Subcommand, Debug)]
enum EventsSubcommand {
    List {
        #[arg(long)]
        status: Option<EventStatus>,
    },
    Show {
        id: Uuid,
    },
    /// Propose a new event (core members and admins).
    Create {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// RFC 3339, e.g. 2025-04-10T18:30:00Z
        #[arg(long, value_parser = parse_time)]
        start: OffsetDateTime,
        #[arg(long, value_parser = parse_time)]
        end: OffsetDateTime,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_parser = parse_time)]
        start: Option<OffsetDateTime>,
        #[arg(long, value_parser = parse_time)]
        end: Option<OffsetDateTime>,
    },
    Approve {
        id: Uuid,
    },
    Archive {
        id: Uuid,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct FilesCommand {
    #[command(subcommand)]
    command: FilesSubcommand,
}

#[derive(Subcommand, Debug)]
enum FilesSubcommand {
    List {
        #[arg(long)]
        event: Option<Uuid>,
        #[arg(long)]
        category: Option<FileCategory>,
    },
    Upload {
        event: Uuid,
        path: PathBuf,
        #[arg(long)]
        category: Option<FileCategory>,
        /// Overrides the type guessed from the file extension.
        #[arg(long)]
        mime: Option<String>,
    },
    Download {
        id: Uuid,
        /// Defaults to the server-supplied filename in the current directory.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum UsersSubcommand {
    List,
    SetRole { id: Uuid, role: Role },
}

struct CliContext {
    auth: AuthContext,
    json: bool,
}

impl CliContext {
    fn api(&self) -> &ApiClient {
        self.auth.api()
    }

    fn output<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", text(value));
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let session_path = cli.session.unwrap_or_else(default_session_path);
    let store = Arc::new(FileSessionStore::new(session_path));
    tracing::debug!(session = %store.path().display(), base_url = %cli.base_url, "using session file");
    let api = ApiClient::new(&cli.base_url, store)?;
    let ctx = CliContext { auth: AuthContext::new(api), json: cli.json };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Login { email, password } => run_login(&ctx, &email, &password).await,
        Command::Register { name, email, password } => run_register(&ctx, &name, &email, &password).await,
        Command::GoogleLogin { redirect_uri } => run_google_login(&ctx, redirect_uri.as_deref()).await,
        Command::GoogleCallback { code, state } => run_google_callback(&ctx, &code, &state).await,
        Command::Logout => run_logout(&ctx).await,
        Command::Whoami => run_whoami(&ctx).await,
        Command::Dashboard => run_dashboard(&ctx).await,
        Command::Events(events) => run_events(&ctx, events.command).await,
        Command::Proposals => run_status_page(&ctx, Route::Proposals, EventStatus::Pending).await,
        Command::Archive => run_status_page(&ctx, Route::Archive, EventStatus::Archived).await,
        Command::Files(files) => run_files(&ctx, files.command).await,
        Command::Users(users) => run_users(&ctx, users.command).await,
        Command::Watch { interval_secs } => run_watch(&ctx, Duration::from_secs(interval_secs.max(1))).await,
    }
}

fn default_session_path() -> PathBuf {
    std::env::var_os("HOME").map_or_else(
        || PathBuf::from(".portal-session.json"),
        |home| PathBuf::from(home).join(".config/portal/session.json"),
    )
}

fn parse_time(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| format!("expected RFC 3339 timestamp: {e}"))
}

// =============================================================================
// GUARD
// =============================================================================

/// Resolve `route` against the stored session. A stale token is cleared on
/// the way to the login redirect.
fn guard(ctx: &CliContext, route: Route) -> Result<Session, CliError> {
    let session = ctx.api().session()?;
    match router::resolve(route, &session, token::now_unix()) {
        Navigation::Render(_) => Ok(session),
        Navigation::Redirect(Route::Login) => {
            if !session.is_empty() {
                tracing::info!("stored session expired; signing out");
                ctx.api().store().clear()?;
            }
            Err(CliError::LoginRequired)
        }
        Navigation::Redirect(Route::Dashboard) => {
            let email = session.user.map(|u| u.email).unwrap_or_default();
            Err(CliError::AlreadySignedIn(email))
        }
        Navigation::Redirect(other) => Err(CliError::Redirected(other)),
    }
}

fn guard_role(
    ctx: &CliContext,
    route: Route,
    check: fn(&Session, i64) -> Result<&User, GuardError>,
) -> Result<User, CliError> {
    let session = guard(ctx, route)?;
    Ok(check(&session, token::now_unix())?.clone())
}

// =============================================================================
// AUTH
// =============================================================================

async fn run_ping(ctx: &CliContext) -> Result<(), CliError> {
    let health = ctx.api().health().await?;
    ctx.output(&health, |v| format!("{}\n", v.get("status").and_then(serde_json::Value::as_str).unwrap_or("ok")))
}

async fn run_login(ctx: &CliContext, email: &str, password: &str) -> Result<(), CliError> {
    guard(ctx, Route::Login)?;
    let user = ctx.auth.login(email, password).await?;
    ctx.output(&user, |u| format!("signed in as {} ({})\n", u.email, u.role))
}

async fn run_register(ctx: &CliContext, name: &str, email: &str, password: &str) -> Result<(), CliError> {
    guard(ctx, Route::Login)?;
    let user = ctx.auth.register(name, email, password).await?;
    ctx.output(&user, |u| format!("registered and signed in as {} ({})\n", u.email, u.role))
}

async fn run_google_login(ctx: &CliContext, redirect_uri: Option<&str>) -> Result<(), CliError> {
    guard(ctx, Route::Login)?;
    let url = ctx.auth.google_login_url(redirect_uri).await?;
    ctx.output(&serde_json::json!({ "auth_url": url }), |_| format!("open this URL to sign in:\n{url}\n"))
}

async fn run_google_callback(ctx: &CliContext, code: &str, state: &str) -> Result<(), CliError> {
    guard(ctx, Route::AuthCallback)?;
    let user = ctx.auth.complete_google_login(code, state).await?;
    ctx.output(&user, |u| format!("signed in as {} ({})\n", u.email, u.role))
}

async fn run_logout(ctx: &CliContext) -> Result<(), CliError> {
    ctx.auth.logout().await?;
    ctx.output(&serde_json::json!({ "message": "logged out" }), |_| "logged out\n".to_owned())
}

async fn run_whoami(ctx: &CliContext) -> Result<(), CliError> {
    guard(ctx, Route::Profile)?;
    match ctx.auth.restore(token::now_unix()).await? {
        AuthStatus::Authenticated(user) => ctx.output(&user, |u| format!("{}\n", render::user_line(u))),
        AuthStatus::Anonymous => Err(CliError::LoginRequired),
    }
}

async fn run_dashboard(ctx: &CliContext) -> Result<(), CliError> {
    let user = guard_role(ctx, Route::Dashboard, router::require_user)?;
    let events = ctx.api().list_events(None).await?;
    let dash = Dashboard::build(user, &events, OffsetDateTime::now_utc());
    ctx.output(&dash, render::dashboard)
}

// =============================================================================
// EVENTS
// =============================================================================

async fn run_status_page(ctx: &CliContext, route: Route, status: EventStatus) -> Result<(), CliError> {
    guard(ctx, route)?;
    let events = ctx.api().list_events(Some(status)).await?;
    ctx.output(&events, |e| render::event_list(e))
}

async fn run_events(ctx: &CliContext, command: EventsSubcommand) -> Result<(), CliError> {
    match command {
        EventsSubcommand::List { status } => {
            guard(ctx, Route::Events)?;
            let events = ctx.api().list_events(status).await?;
            ctx.output(&events, |e| render::event_list(e))
        }
        EventsSubcommand::Show { id } => {
            guard(ctx, Route::EventDetail(id))?;
            let event = ctx.api().get_event(id).await?;
            let files = ctx.api().list_files(Some(id), None).await?;
            let value = serde_json::json!({ "event": event, "files": files });
            ctx.output(&value, |_| render::event_detail(&event, &files))
        }
        EventsSubcommand::Create { title, description, start, end } => {
            guard_role(ctx, Route::Proposals, router::require_core_member)?;
            let req = CreateEventRequest { title, description, start_time: start, end_time: end };
            let event = ctx.api().create_event(&req).await?;
            ctx.output(&event, |e| format!("proposed {}\n", render::event_line(e)))
        }
        EventsSubcommand::Update { id, title, description, start, end } => {
            guard(ctx, Route::EventDetail(id))?;
            let req = UpdateEventRequest { title, description, start_time: start, end_time: end };
            let event = ctx.api().update_event(id, &req).await?;
            ctx.output(&event, |e| format!("updated {}\n", render::event_line(e)))
        }
        EventsSubcommand::Approve { id } => {
            guard_role(ctx, Route::EventDetail(id), router::require_admin)?;
            let event = ctx.api().approve_event(id).await?;
            ctx.output(&event, |e| format!("approved {}\n", render::event_line(e)))
        }
        EventsSubcommand::Archive { id } => {
            guard_role(ctx, Route::EventDetail(id), router::require_core_member)?;
            let event = ctx.api().archive_event(id).await?;
            ctx.output(&event, |e| format!("archived {}\n", render::event_line(e)))
        }
        EventsSubcommand::Delete { id } => {
            guard_role(ctx, Route::EventDetail(id), router::require_admin)?;
            let reply = ctx.api().delete_event(id).await?;
            ctx.output(&reply, |r| format!("{}\n", r.message))
        }
    }
}

// =============================================================================
// FILES
// =============================================================================

/// MIME type from the file extension; unknown extensions are left to the
/// server default.
fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => return None,
    };
    Some(mime)
}

/// Local target for a download: the final component of the server filename,
/// or the file id when there is none.
fn download_path(server_name: Option<&str>, id: Uuid) -> PathBuf {
    server_name
        .and_then(|name| Path::new(name).file_name())
        .map_or_else(|| PathBuf::from(id.to_string()), PathBuf::from)
}

async fn run_files(ctx: &CliContext, command: FilesSubcommand) -> Result<(), CliError> {
    match command {
        FilesSubcommand::List { event, category } => {
            guard(ctx, event.map_or(Route::Events, Route::EventDetail))?;
            let files = ctx.api().list_files(event, category).await?;
            ctx.output(&files, |f| render::file_list(f))
        }
        FilesSubcommand::Upload { event, path, category, mime } => {
            guard(ctx, Route::EventDetail(event))?;
            let bytes = std::fs::read(&path).map_err(|source| CliError::File { path: path.clone(), source })?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or_else(|| "upload".to_owned(), str::to_owned);
            let mime_type = mime.or_else(|| guess_mime(&path).map(str::to_owned));
            let upload = FileUpload { event_id: event, filename, mime_type, category, bytes };
            let file = ctx.api().upload_file(upload).await?;
            ctx.output(&file, |f| format!("uploaded {}\n", render::file_line(f)))
        }
        FilesSubcommand::Download { id, output } => {
            guard(ctx, Route::Events)?;
            let download = ctx.api().download_file(id).await?;
            let path = output.unwrap_or_else(|| download_path(download.filename.as_deref(), id));
            std::fs::write(&path, &download.bytes).map_err(|source| CliError::File { path: path.clone(), source })?;
            let value = serde_json::json!({ "path": path.display().to_string(), "bytes": download.bytes.len() });
            ctx.output(&value, |_| format!("saved {} ({} bytes)\n", path.display(), download.bytes.len()))
        }
        FilesSubcommand::Delete { id } => {
            guard(ctx, Route::Events)?;
            let reply = ctx.api().delete_file(id).await?;
            ctx.output(&reply, |r| format!("{}\n", r.message))
        }
    }
}

// =============================================================================
// USERS
// =============================================================================

async fn run_users(ctx: &CliContext, command: UsersSubcommand) -> Result<(), CliError> {
    guard_role(ctx, Route::Dashboard, router::require_admin)?;
    match command {
        UsersSubcommand::List => {
            let users = ctx.api().list_users().await?;
            ctx.output(&users, |u| render::user_list(u))
        }
        UsersSubcommand::SetRole { id, role } => {
            let user = ctx.api().set_role(id, role.as_str()).await?;
            ctx.output(&user, |u| format!("{}\n", render::user_line(u)))
        }
    }
}

// =============================================================================
// WATCH
// =============================================================================

async fn run_watch(ctx: &CliContext, interval: Duration) -> Result<(), CliError> {
    guard(ctx, Route::Dashboard)?;
    let (mut rx, handle) = TokenWatch::new(ctx.api().store().clone()).with_interval(interval).spawn();
    while let Some(status) = rx.recv().await {
        match status {
            TokenStatus::Valid => tracing::debug!("token valid"),
            TokenStatus::ExpiringSoon { remaining_secs } => {
                eprintln!("session expires in {remaining_secs}s; sign in again soon");
            }
            TokenStatus::Expired => eprintln!("session expired; signed out"),
            TokenStatus::SignedOut => eprintln!("signed out"),
        }
    }
    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "token watch task failed");
    }
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
