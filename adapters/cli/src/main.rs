#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that connects a headless Tribe War client to a
//! simulation server.
//!
//! Commands are read line by line from standard input (`help` lists them) and
//! frames are reported through tracing. `quit` or the end of input
//! disconnects.

mod commands;
mod config;
mod painter;
mod sprites;

use std::{
    io::{self, BufRead},
    path::PathBuf,
    thread,
};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::{
    sync::mpsc::{self, UnboundedSender},
    time::Instant,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tribe_war_sync::{Session, UserAction};

use crate::{
    commands::{LineCommand, HELP},
    config::{CanvasSize, ClientConfig, Overrides},
    painter::TracingPainter,
};

#[derive(Debug, Parser)]
#[command(name = "tribe-war", about = "Headless Tribe War client", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// WebSocket endpoint of the simulation server.
    #[arg(long)]
    server: Option<String>,
    /// Canvas size the viewport maps onto, as WIDTHxHEIGHT.
    #[arg(long)]
    canvas: Option<CanvasSize>,
    /// Tracing filter, e.g. `debug` or `tribe_war_sync=trace`.
    #[arg(long)]
    log: Option<String>,
    /// Sprite manifest whose files are checked before sprites are drawn.
    #[arg(long)]
    sprites: Option<PathBuf>,
}

/// Entry point for the Tribe War command-line client.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ClientConfig::resolve(
        cli.config.as_deref(),
        Overrides {
            server_url: cli.server,
            canvas: cli.canvas,
            log_filter: cli.log,
            sprite_manifest: cli.sprites,
        },
    )?;

    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("invalid log filter `{}`", config.log_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();

    let sprites = match &config.sprite_manifest {
        Some(path) => sprites::load_manifest(path)?,
        None => Vec::new(),
    };
    info!(
        server = %config.server_url,
        canvas = %config.canvas,
        sprites = sprites.len(),
        "starting client"
    );

    let session = Session::new(
        TracingPainter::default(),
        config.canvas.as_vec2(),
        sprites.len(),
    )?;
    let (actions, inbox) = mpsc::unbounded_channel();
    let _ = tokio::spawn(sprites::settle_sprites(sprites, actions.clone()));
    // Stdin reads block and cannot be cancelled, so they live on a detached
    // thread instead of a runtime task that shutdown would wait for.
    let _ = thread::Builder::new()
        .name("stdin-commands".to_owned())
        .spawn(move || read_commands(io::stdin().lock(), &actions))
        .context("failed to spawn the input thread")?;

    let session = tribe_war_sync::run(&config.server_url, session, inbox, Instant::now()).await?;
    info!(
        frames = session.backend().frames(),
        phase = %session.builder().phase(),
        "client stopped"
    );
    Ok(())
}

/// Forwards parsed input lines to the session until `quit`, end of input or
/// the session going away.
fn read_commands<I>(input: I, actions: &UnboundedSender<UserAction>)
where
    I: BufRead,
{
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                warn!(%error, "failed to read input");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<LineCommand>() {
            Ok(LineCommand::Action(action)) => {
                if actions.send(action).is_err() {
                    break;
                }
            }
            Ok(LineCommand::Help) => println!("{HELP}"),
            Ok(LineCommand::Quit) => break,
            Err(error) => warn!(%error, "ignoring input"),
        }
    }
}
