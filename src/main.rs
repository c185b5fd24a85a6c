#![forbid(unsafe_code)]

mod chord;
mod command;
mod config;
mod constants;
mod dispatcher;
mod error;
mod guard;
mod hotkeys;
mod ipc;
mod notify;
mod pointer;
mod tray;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info, Level as TraceLevel};
use tracing_subscriber::FmtSubscriber;

use command::Command;
use config::ConfigStore;
use dispatcher::Dispatcher;
use hotkeys::{EvdevHook, KeyHook, NoHook};
use ipc::{TrayClient, TrayServer};
use notify::{LogNotifier, Notice, Notifier};
use pointer::DryRunPointer;

#[derive(Parser, Debug)]
#[command(name = "mouse-macros", about = "Keyboard-driven mouse automation with variant presets", version)]
struct Cli {
    /// Config file (default: <config dir>/mouse-macros/config.json)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Tray socket (default: $XDG_RUNTIME_DIR/mouse-macros/tray.sock)
    #[arg(long, value_name = "PATH", global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the control panel (default)
    Run {
        /// Skip the OS-level key hook
        #[arg(long)]
        no_hook: bool,

        /// Don't connect to the tray process
        #[arg(long)]
        no_tray: bool,
    },
    /// Run the tray process that mirrors the live selection
    Tray,
}

fn init_logging() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

/// Forward SIGINT/SIGTERM to `on_signal` from a background thread
fn spawn_signal_thread(on_signal: impl FnOnce() + Send + 'static) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(signal, "Received signal, shutting down");
            on_signal();
        }
    });
    Ok(())
}

fn run_tray(socket: PathBuf) -> Result<()> {
    let server = TrayServer::bind_to(socket)?;

    // accept() blocks forever, so Drop never runs on a signal
    let socket_path = server.path().to_path_buf();
    spawn_signal_thread(move || {
        let _ = std::fs::remove_file(&socket_path);
        std::process::exit(0);
    })?;

    tray::serve(&server)
}

fn build_hook(
    no_hook: bool,
    hook_tx: UnboundedSender<hotkeys::HookEvent>,
    notifier: &dyn Notifier,
) -> Box<dyn KeyHook> {
    if no_hook {
        info!("Key hook disabled by --no-hook");
        return Box::new(NoHook);
    }
    if !hotkeys::check_permissions() {
        hotkeys::print_permission_error();
        notifier.notify(&Notice::warning(constants::messages::HOOK_UNAVAILABLE));
        return Box::new(NoHook);
    }
    Box::new(EvdevHook::new(hook_tx))
}

fn connect_tray(no_tray: bool, socket: &Path, notifier: &dyn Notifier) -> Option<TrayClient> {
    if no_tray {
        return None;
    }
    match TrayClient::connect_to(socket) {
        Ok(client) => {
            info!(socket = %socket.display(), "Connected to tray");
            Some(client)
        }
        Err(e) => {
            info!(error = %e, "Tray not running, continuing without it");
            notifier.notify(&Notice::info(constants::messages::TRAY_UNAVAILABLE));
            None
        }
    }
}

fn run_panel(config_path: PathBuf, socket: PathBuf, no_hook: bool, no_tray: bool) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;

    let notifier = LogNotifier;
    let mut store = ConfigStore::new(config_path);
    match store.load_or_create() {
        Ok(()) => info!(path = %store.path().display(), variants = store.variants().len(), "Loaded config"),
        Err(e) => {
            error!(error = %e, "Failed to load config, using defaults");
            notifier.notify(&Notice::error(constants::messages::NOT_OPEN));
        }
    }

    let (hook_tx, mut hook_rx) = mpsc::unbounded_channel();
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();

    let hook = build_hook(no_hook, hook_tx, &notifier);
    let tray = connect_tray(no_tray, &socket, &notifier);
    let mut dispatcher = Dispatcher::new(store, hook, Arc::new(DryRunPointer), Box::new(notifier));
    if let Some(client) = tray {
        dispatcher = dispatcher.with_tray(Box::new(client));
    }

    dispatcher.bind_commands(&command::default_bindings(), &cmd_tx);
    dispatcher.activate();
    dispatcher.publish();

    let quit_tx = cmd_tx.clone();
    spawn_signal_thread(move || {
        let _ = quit_tx.send(Command::Quit);
    })?;
    let _console = command::spawn_console(cmd_tx);

    runtime.block_on(async move {
        loop {
            tokio::select! {
                Some(event) = hook_rx.recv() => {
                    dispatcher.on_hook_event(&event);
                }
                Some(command) = cmd_rx.recv() => {
                    if dispatcher.handle(command).is_break() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    info!("Shut down");
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let socket = match cli.socket {
        Some(path) => path,
        None => ipc::default_socket_path()?,
    };

    match cli.mode.unwrap_or(Mode::Run {
        no_hook: false,
        no_tray: false,
    }) {
        Mode::Tray => run_tray(socket),
        Mode::Run { no_hook, no_tray } => {
            let config_path = cli.config.unwrap_or_else(ConfigStore::default_path);
            run_panel(config_path, socket, no_hook, no_tray)
        }
    }
}
