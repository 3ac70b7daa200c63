//! sketchboard CLI — REST board management and a headless live session.

mod relay;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use engine::{BoardSession, SessionOptions};
use relay::{HttpBoardStore, RelayClient, ws_url};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing session token; pass --session-token or set SKETCHBOARD_SESSION_TOKEN")]
    MissingSessionToken,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    ServerStatus { status: reqwest::StatusCode, body: String },
    #[error("login response carried no session cookie")]
    MissingSessionCookie,
    #[error("ticket response carried no ticket")]
    MissingTicket,
    #[error(transparent)]
    Relay(#[from] relay::RelayError),
    #[error(transparent)]
    Engine(#[from] engine::EngineError),
    #[error("invalid scene document: {0}")]
    InvalidScene(#[from] scene::SceneError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sketchboard", about = "sketchboard API and websocket CLI")]
struct Cli {
    #[arg(long, env = "SKETCHBOARD_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "SKETCHBOARD_SESSION_TOKEN")]
    session_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    Auth(AuthCommand),
    Board(BoardCommand),
    Ws(WsCommand),
}

#[derive(Args, Debug)]
struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
enum AuthSubcommand {
    /// Register a user and print the session token.
    Register {
        email: String,
        #[arg(long, default_value = "Anonymous")]
        name: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and print the session token.
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Args, Debug)]
struct BoardCommand {
    #[command(subcommand)]
    command: BoardSubcommand,
}

#[derive(Subcommand, Debug)]
enum BoardSubcommand {
    List,
    Read {
        board_id: Uuid,
    },
    Create {
        #[arg(long, default_value = "Untitled Board")]
        name: String,
    },
    Rename {
        board_id: Uuid,
        name: String,
    },
    Delete {
        board_id: Uuid,
    },
    /// Download the board flattened to SVG.
    ExportSvg {
        board_id: Uuid,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct WsCommand {
    #[command(subcommand)]
    command: WsSubcommand,
}

#[derive(Subcommand, Debug)]
enum WsSubcommand {
    /// Join a board and print scene changes and peer cursors as they land.
    Watch {
        board_id: Uuid,
        #[arg(long, default_value = "cli")]
        name: String,
    },
    /// Overwrite the board's shared cell with a scene document.
    Put {
        board_id: Uuid,
        #[arg(long, conflicts_with = "json")]
        file: Option<PathBuf>,
        #[arg(long)]
        json: Option<String>,
    },
    /// Publish one cursor position, then leave.
    Cursor {
        board_id: Uuid,
        x: f64,
        y: f64,
        #[arg(long, default_value = "cli")]
        name: String,
    },
}

// =============================================================================
// CONTEXT
// =============================================================================

struct CliContext {
    http: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl CliContext {
    fn new(cli: &Cli) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: cli.base_url.trim_end_matches('/').to_string(),
            session_token: cli.session_token.clone(),
        }
    }

    fn session_token(&self) -> Result<&str, CliError> {
        self.session_token.as_deref().ok_or(CliError::MissingSessionToken)
    }

    fn cookie(&self) -> Result<String, CliError> {
        Ok(format!("session_token={}", self.session_token()?))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, CliError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(CliError::ServerStatus { status, body })
    }

    /// Mint a one-time websocket ticket for the current session.
    async fn mint_ticket(&self) -> Result<String, CliError> {
        let response = self
            .http
            .post(self.url("/api/auth/ws-ticket"))
            .header(reqwest::header::COOKIE, self.cookie()?)
            .send()
            .await?;
        let body: serde_json::Value = self.check(response).await?.json().await?;
        body.get("ticket")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or(CliError::MissingTicket)
    }
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = CliContext::new(&cli);

    match cli.command {
        Command::Ping => ping(&ctx).await,
        Command::Auth(cmd) => match cmd.command {
            AuthSubcommand::Register { email, name, password } => {
                auth_session(&ctx, "/api/auth/register", &serde_json::json!({
                    "email": email, "name": name, "password": password,
                }))
                .await
            }
            AuthSubcommand::Login { email, password } => {
                auth_session(&ctx, "/api/auth/login", &serde_json::json!({
                    "email": email, "password": password,
                }))
                .await
            }
        },
        Command::Board(cmd) => match cmd.command {
            BoardSubcommand::List => board_list(&ctx).await,
            BoardSubcommand::Read { board_id } => board_read(&ctx, board_id).await,
            BoardSubcommand::Create { name } => board_create(&ctx, &name).await,
            BoardSubcommand::Rename { board_id, name } => board_rename(&ctx, board_id, &name).await,
            BoardSubcommand::Delete { board_id } => board_delete(&ctx, board_id).await,
            BoardSubcommand::ExportSvg { board_id, out } => board_export_svg(&ctx, board_id, out).await,
        },
        Command::Ws(cmd) => match cmd.command {
            WsSubcommand::Watch { board_id, name } => ws_watch(&ctx, board_id, &name).await,
            WsSubcommand::Put { board_id, file, json } => ws_put(&ctx, board_id, file, json).await,
            WsSubcommand::Cursor { board_id, x, y, name } => ws_cursor(&ctx, board_id, x, y, &name).await,
        },
    }
}

// =============================================================================
// REST COMMANDS
// =============================================================================

async fn ping(ctx: &CliContext) -> Result<(), CliError> {
    let response = ctx.http.get(ctx.url("/healthz")).send().await?;
    ctx.check(response).await?;
    println!("ok");
    Ok(())
}

async fn auth_session(ctx: &CliContext, path: &str, body: &serde_json::Value) -> Result<(), CliError> {
    let response = ctx.http.post(ctx.url(path)).json(body).send().await?;
    let response = ctx.check(response).await?;

    let token = response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie| {
            cookie
                .strip_prefix("session_token=")
                .map(|rest| rest.split(';').next().unwrap_or(rest).to_string())
        })
        .ok_or(CliError::MissingSessionCookie)?;

    let user: serde_json::Value = response.json().await?;
    println!("{}", serde_json::to_string_pretty(&user)?);
    println!("session token: {token}");
    Ok(())
}

async fn board_list(ctx: &CliContext) -> Result<(), CliError> {
    let response = ctx
        .http
        .get(ctx.url("/api/board"))
        .header(reqwest::header::COOKIE, ctx.cookie()?)
        .send()
        .await?;
    let boards: serde_json::Value = ctx.check(response).await?.json().await?;
    println!("{}", serde_json::to_string_pretty(&boards)?);
    Ok(())
}

async fn board_read(ctx: &CliContext, board_id: Uuid) -> Result<(), CliError> {
    let response = ctx
        .http
        .get(ctx.url(&format!("/api/board/{board_id}")))
        .header(reqwest::header::COOKIE, ctx.cookie()?)
        .send()
        .await?;
    let board: serde_json::Value = ctx.check(response).await?.json().await?;
    println!("{}", serde_json::to_string_pretty(&board)?);
    Ok(())
}

async fn board_create(ctx: &CliContext, name: &str) -> Result<(), CliError> {
    let response = ctx
        .http
        .post(ctx.url("/api/board"))
        .header(reqwest::header::COOKIE, ctx.cookie()?)
        .json(&serde_json::json!({ "name": name }))
        .send()
        .await?;
    let board: serde_json::Value = ctx.check(response).await?.json().await?;
    println!("{}", serde_json::to_string_pretty(&board)?);
    Ok(())
}

async fn board_rename(ctx: &CliContext, board_id: Uuid, name: &str) -> Result<(), CliError> {
    let response = ctx
        .http
        .patch(ctx.url(&format!("/api/board/{board_id}")))
        .header(reqwest::header::COOKIE, ctx.cookie()?)
        .json(&serde_json::json!({ "name": name }))
        .send()
        .await?;
    ctx.check(response).await?;
    println!("renamed {board_id}");
    Ok(())
}

async fn board_delete(ctx: &CliContext, board_id: Uuid) -> Result<(), CliError> {
    let response = ctx
        .http
        .delete(ctx.url(&format!("/api/board/{board_id}")))
        .header(reqwest::header::COOKIE, ctx.cookie()?)
        .send()
        .await?;
    ctx.check(response).await?;
    println!("deleted {board_id}");
    Ok(())
}

async fn board_export_svg(ctx: &CliContext, board_id: Uuid, out: Option<PathBuf>) -> Result<(), CliError> {
    let response = ctx
        .http
        .get(ctx.url(&format!("/api/board/{board_id}/export.svg")))
        .header(reqwest::header::COOKIE, ctx.cookie()?)
        .send()
        .await?;
    let svg = ctx.check(response).await?.text().await?;

    match out {
        Some(path) => {
            std::fs::write(&path, svg)?;
            println!("wrote {}", path.display());
        }
        None => println!("{svg}"),
    }
    Ok(())
}

// =============================================================================
// WS COMMANDS
// =============================================================================

async fn ws_watch(ctx: &CliContext, board_id: Uuid, name: &str) -> Result<(), CliError> {
    let token = ctx.session_token()?.to_string();
    let ticket = ctx.mint_ticket().await?;

    let (client, _, _) = RelayClient::connect(&ws_url(&ctx.base_url, &ticket), board_id).await?;
    let client = Arc::new(client);
    let store = Arc::new(HttpBoardStore::new(&ctx.base_url, &token));

    let session = BoardSession::connect(
        board_id,
        client.clone(),
        store,
        client,
        SessionOptions::new(name),
    )
    .await?;

    let doc = session.document().await;
    println!("joined board {board_id} ({} objects); ctrl-c to quit", doc.object_count());

    let mut events = session.subscribe_events().await;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let doc = session.document().await;
                    println!("scene {event:?}: {} objects", doc.object_count());
                    for (client_id, record) in session.visible_cursors().await {
                        if let Some(cursor) = record.cursor {
                            println!("  {} ({client_id}) @ ({:.0}, {:.0})", record.name, cursor.x, cursor.y);
                        }
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.shutdown().await;
    Ok(())
}

async fn ws_put(
    ctx: &CliContext,
    board_id: Uuid,
    file: Option<PathBuf>,
    json: Option<String>,
) -> Result<(), CliError> {
    let raw = match (file, json) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, Some(inline)) => inline,
        (None, None) => scene::SceneDocument::new().to_json(),
    };
    // Validate before touching the shared cell.
    let doc = scene::SceneDocument::from_json(&raw)?;

    let ticket = ctx.mint_ticket().await?;
    let (client, _, seq) = RelayClient::connect(&ws_url(&ctx.base_url, &ticket), board_id).await?;

    use engine::SharedCell;
    client
        .write(raw)
        .await
        .map_err(engine::EngineError::Remote)?;
    println!("wrote {} objects (room was at seq {seq})", doc.object_count());

    use engine::PresenceChannel;
    let _ = client.disconnect().await;
    Ok(())
}

async fn ws_cursor(ctx: &CliContext, board_id: Uuid, x: f64, y: f64, name: &str) -> Result<(), CliError> {
    let ticket = ctx.mint_ticket().await?;
    let (client, _, _) = RelayClient::connect(&ws_url(&ctx.base_url, &ticket), board_id).await?;

    use engine::PresenceChannel;
    let record = engine::PresenceRecord::new(name, engine::presence::random_color()).at(x, y);
    client.publish(record).await.map_err(engine::EngineError::Remote)?;

    // Give the fire-and-forget publish a moment to drain before parting.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let _ = client.disconnect().await;
    println!("cursor published at ({x}, {y})");
    Ok(())
}
