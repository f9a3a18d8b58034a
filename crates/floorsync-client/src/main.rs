//! floorsync headless client entry point.
//!
//! Connects to a game server, keeps an in-memory world synchronized with it,
//! and reports the controllable player's position until the session ends or
//! Ctrl-C is pressed.
//!
//! ```text
//! floorsync-client [CONFIG_PATH] [--server HOST] [--name NAME] [--log-level LEVEL]
//! ```
//!
//! Command-line flags override the matching fields of the config file.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ ClientConfig::load()       -- TOML file or defaults
//!  └─ Router::connect()          -- sockets + receive/send worker threads
//!  └─ tick loop (~30 Hz)
//!       ├─ ClientUpdateSystem::pull_and_apply()   -- one batch per tick
//!       ├─ lobby report once accepted
//!       └─ periodic position report
//! ```
//!
//! `main` is deliberately synchronous: the gameplay loop is a plain thread
//! that blocks on pipe reads, and the router owns the only async runtime.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use floorsync_client::application::update::{ClientUpdateSystem, PullOutcome};
use floorsync_client::application::world::World;
use floorsync_client::infrastructure::network::Router;
use floorsync_client::infrastructure::storage::config::{ClientConfig, DEFAULT_CONFIG_FILE};
use floorsync_client::infrastructure::world::memory::InMemoryWorld;
use floorsync_core::protocol::{PlayerMotion, OBJECTIVES_PER_FLOOR};

/// Gameplay tick length.
const TICK: Duration = Duration::from_millis(33);

/// Ticks between two position reports.
const POSITION_REPORT_TICKS: u64 = 3;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "floorsync-client",
    about = "Headless floorsync game client",
    version
)]
struct Cli {
    /// Path to the TOML config file.  Missing files fall back to defaults.
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Server host name or address.
    #[arg(long, env = "FLOORSYNC_SERVER")]
    server: Option<String>,

    /// Display name sent with the connect request.
    #[arg(long)]
    name: Option<String>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config;
    let mut config = ClientConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    if let Some(server) = cli.server {
        config.network.server_host = server;
    }
    if let Some(name) = cli.name {
        config.player.name = name;
    }
    if let Some(level) = cli.log_level {
        config.player.log_level = level;
    }

    // Structured logging.  `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.player.log_level)),
        )
        .init();

    info!(config = %config_path.display(), "floorsync client starting");

    let running = Arc::new(AtomicBool::new(true));
    spawn_interrupt_watcher(Arc::clone(&running))?;

    let mut router = Router::connect(&config.network).context("connecting to server")?;
    let mut world = InMemoryWorld::new(OBJECTIVES_PER_FLOOR);
    let mut updates = ClientUpdateSystem::new();
    updates.begin_session();

    router
        .send(&ClientUpdateSystem::connect_request(
            &config.player.name,
            config.player.team,
        ))
        .context("sending connect request")?;

    let mut lobby_sent = false;
    let mut tick: u64 = 0;
    let outcome = loop {
        let started = Instant::now();
        if !running.load(Ordering::Relaxed) {
            router.shutdown("interrupted by user");
        }

        match updates.pull_and_apply(&mut router, &mut world) {
            PullOutcome::Ok => {}
            PullOutcome::Denied => break Err(anyhow!("server denied the connection")),
            PullOutcome::NotReady => break Ok(()),
            PullOutcome::Shutdown(reason) => {
                info!(%reason, "session ended");
                break Ok(());
            }
        }

        if !lobby_sent {
            if let Some(msg) =
                updates.lobby_report(config.player.team, config.player.character, true)
            {
                router.send(&msg).context("sending lobby selection")?;
                lobby_sent = true;
            }
        }
        if tick % POSITION_REPORT_TICKS == 0 {
            if let Some(msg) = updates.position_report(own_motion(&world)) {
                router.send(&msg).context("sending position report")?;
            }
        }
        tick += 1;

        if let Some(rest) = TICK.checked_sub(started.elapsed()) {
            thread::sleep(rest);
        }
    };

    if let Some(err) = router.last_error() {
        warn!(%err, "last network error");
    }
    drop(router);
    info!("floorsync client stopped");
    outcome
}

/// Current motion of the controllable player.
fn own_motion(world: &InMemoryWorld) -> PlayerMotion {
    world
        .entity(world.controllable_player())
        .map(|r| PlayerMotion {
            x: r.x,
            y: r.y,
            vx: r.vx,
            vy: r.vy,
        })
        .unwrap_or_default()
}

/// Clears `running` on Ctrl-C.
fn spawn_interrupt_watcher(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("building signal runtime")?;
    thread::Builder::new()
        .name("floorsync-signal".into())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("shutdown signal received");
                    running.store(false, Ordering::Relaxed);
                }
            });
        })
        .context("spawning signal watcher")?;
    Ok(())
}
