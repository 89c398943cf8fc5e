use std::collections::HashMap;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use client::{ClientConfig, Cursor, Renderer, SyncClient, TransportError, TransportHandle};
use frames::{Point, Segment, Stroke, Style, Tool, User};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);
const ACK_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid point `{0}`; expected `x,y`")]
    InvalidPoint(String),
    #[error("a stroke needs at least one point")]
    NoPoints,
    #[error("invalid width {0}; must be a positive number")]
    InvalidWidth(f64),
    #[error("room state not loaded; cannot draw yet")]
    NotHydrated,
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Parser, Debug)]
#[command(name = "inkroom-cli", about = "Join an inkroom drawing room from the terminal")]
struct Cli {
    #[arg(long, env = "INKROOM_URL", default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    #[arg(long, env = "INKROOM_USER_NAME")]
    user_name: Option<String>,

    #[arg(long, env = "INKROOM_USER_ID")]
    user_id: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct RoomArgs {
    #[arg(long, default_value = client::session::DEFAULT_ROOM)]
    room: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every change in a room until Ctrl-C.
    Watch(RoomArgs),
    /// Draw one stroke through the given points.
    Draw(DrawArgs),
    /// Undo the newest stroke in the room.
    Undo(RoomArgs),
    /// Redo the most recently undone stroke.
    Redo(RoomArgs),
}

#[derive(Args, Debug)]
struct DrawArgs {
    #[command(flatten)]
    room: RoomArgs,

    #[arg(long, help = "Space-separated points, e.g. \"0,0 10,5 20,0\"")]
    points: String,

    #[arg(long, default_value = "#000000")]
    color: String,

    #[arg(long, default_value_t = 5.0)]
    width: f64,

    #[arg(long, default_value_t = false)]
    eraser: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Watch(room) => run_watch(&cli, room).await,
        Command::Draw(draw) => run_draw(&cli, draw).await,
        Command::Undo(room) => run_history(&cli, room, History::Undo).await,
        Command::Redo(room) => run_history(&cli, room, History::Redo).await,
    }
}

// =============================================================================
// RENDERERS
// =============================================================================

/// Prints replica changes as lines on stdout.
struct PrintRenderer;

impl Renderer for PrintRenderer {
    fn redraw(&mut self, strokes: &[Stroke]) {
        println!("strokes: {}", strokes.len());
    }

    fn draw_segment(&mut self, stroke: &Stroke, segment: &Segment) {
        println!(
            "segment {} ({}, {}) -> ({}, {})",
            stroke.id, segment.start.x, segment.start.y, segment.end.x, segment.end.y
        );
    }

    fn draw_cursors(&mut self, cursors: &HashMap<String, Cursor>) {
        debug!(count = cursors.len(), "cursors moved");
    }

    fn draw_roster(&mut self, users: &[User]) {
        let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
        println!("users: {}", names.join(", "));
    }
}

/// Keeps one-shot commands quiet.
struct QuietRenderer;

impl Renderer for QuietRenderer {
    fn redraw(&mut self, strokes: &[Stroke]) {
        debug!(strokes = strokes.len(), "redraw");
    }
    fn draw_segment(&mut self, _stroke: &Stroke, _segment: &Segment) {}
    fn draw_cursors(&mut self, _cursors: &HashMap<String, Cursor>) {}
}

// =============================================================================
// COMMANDS
// =============================================================================

fn client_config(cli: &Cli, room: &RoomArgs) -> ClientConfig {
    let mut config =
        ClientConfig { room_id: room.room.clone(), user_name: cli.user_name.clone(), ..ClientConfig::default() };
    if let Some(user_id) = &cli.user_id {
        config.user_id.clone_from(user_id);
    }
    config
}

fn connect<R: Renderer + Send + 'static>(cli: &Cli, room: &RoomArgs, renderer: R) -> TransportHandle<R> {
    info!(url = %cli.url, room_id = %room.room, "connecting");
    TransportHandle::spawn(cli.url.clone(), SyncClient::new(client_config(cli, room), renderer))
}

/// Poll the client until `pred` holds or `limit` passes.
async fn wait_for<R: Renderer>(
    handle: &TransportHandle<R>,
    limit: Duration,
    what: &'static str,
    pred: impl Fn(&SyncClient<R>) -> bool,
) -> Result<(), CliError> {
    let deadline = Instant::now() + limit;
    while !handle.with_client(|c| pred(c)) {
        if Instant::now() >= deadline {
            return Err(CliError::Timeout(what));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Ok(())
}

async fn run_watch(cli: &Cli, room: &RoomArgs) -> Result<(), CliError> {
    let handle = connect(cli, room, PrintRenderer);
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!(error = %e, "ctrl-c handler failed");
    }
    handle.shutdown().await?;
    Ok(())
}

async fn run_draw(cli: &Cli, draw: &DrawArgs) -> Result<(), CliError> {
    let points = parse_points(&draw.points)?;
    let style = Style { color: draw.color.clone(), width: draw.width };
    if !style.is_valid() {
        return Err(CliError::InvalidWidth(draw.width));
    }
    let tool = if draw.eraser { Tool::Eraser } else { Tool::Brush };

    let handle = connect(cli, &draw.room, QuietRenderer);
    wait_for(&handle, JOIN_TIMEOUT, "room join", SyncClient::is_hydrated).await?;

    let stroke_id = handle
        .with_client(|c| {
            c.set_tool(tool);
            c.set_style(style);
            trace_stroke(c, &points, Instant::now())
        })
        .ok_or(CliError::NotHydrated)?;
    wait_for(&handle, ACK_TIMEOUT, "stroke upload", |c| c.pending_outbound() == 0).await?;

    handle.shutdown().await?;
    println!("{stroke_id}");
    Ok(())
}

/// Feed `points` through the pointer handlers spaced one segment interval
/// apart, so every point becomes a segment endpoint. `None` when there are
/// no points or the client cannot draw yet.
fn trace_stroke<R: Renderer>(client: &mut SyncClient<R>, points: &[Point], start: Instant) -> Option<String> {
    let step = client.config().segment_interval;
    let (&first, rest) = points.split_first()?;
    let id = client.pointer_down(first, start)?;
    let mut at = start;
    for &point in rest {
        at += step;
        client.pointer_move(point, at);
    }
    client.pointer_up(points.last().copied().unwrap_or(first));
    Some(id)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum History {
    Undo,
    Redo,
}

impl History {
    fn name(self) -> &'static str {
        match self {
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

/// Queue `op` if the room has something for it to act on. Returns the
/// stroke count it was sent against, or `None` when there is nothing to do.
fn request_history<R: Renderer>(client: &mut SyncClient<R>, op: History) -> Option<usize> {
    let replica = client.replica();
    let before = replica.strokes().len();
    let available = match op {
        History::Undo => before,
        History::Redo => replica.redo_depth(),
    };
    if available == 0 {
        return None;
    }
    match op {
        History::Undo => client.request_undo(),
        History::Redo => client.request_redo(),
    }
    Some(before)
}

async fn run_history(cli: &Cli, room: &RoomArgs, op: History) -> Result<(), CliError> {
    let handle = connect(cli, room, QuietRenderer);
    wait_for(&handle, JOIN_TIMEOUT, "room join", SyncClient::is_hydrated).await?;

    let before = handle.with_client(|c| request_history(c, op));

    let outcome = match before {
        None => {
            println!("nothing to {}", op.name());
            Ok(())
        }
        Some(before) => {
            let what = match op {
                History::Undo => "undo acknowledgement",
                History::Redo => "redo acknowledgement",
            };
            let acked = wait_for(&handle, ACK_TIMEOUT, what, |c| c.replica().strokes().len() != before).await;
            if acked.is_ok() {
                let after = handle.with_client(|c| c.replica().strokes().len());
                println!("strokes: {after}");
            }
            acked
        }
    };

    handle.shutdown().await?;
    outcome
}

/// Parse `"x,y x,y ..."`.
fn parse_points(raw: &str) -> Result<Vec<Point>, CliError> {
    let points = raw
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair.split_once(',').ok_or_else(|| CliError::InvalidPoint(pair.to_owned()))?;
            let coord = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());
            match (coord(x), coord(y)) {
                (Some(x), Some(y)) => Ok(Point::new(x, y)),
                _ => Err(CliError::InvalidPoint(pair.to_owned())),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    if points.is_empty() {
        return Err(CliError::NoPoints);
    }
    Ok(points)
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
