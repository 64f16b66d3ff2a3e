//! OLED display server.
//!
//! Listens for JSON commands on `127.0.0.1:10010` (newline-delimited over TCP,
//! or a ZeroMQ REP socket with `--transport zmq` when built with the `zmq`
//! feature) and shows the requested text on a 128x64 monochrome display.
//!
//! ```bash
//! display-server --device png --output-dir /tmp/oled
//! echo '{"command":"display","option":{"message":"Hello\nWorld"}}' | nc 127.0.0.1 10010
//! ```
//!
//! Settings come from an optional TOML file (`--config`), then command line
//! overrides. `RUST_LOG` controls logging unless `--log-level` is given.
//!
//! # Startup
//!
//! 1. Load settings and bind the listener
//! 2. Initialize and blank the display, start the render worker
//! 3. Install the Ctrl-C handler (bounded worker stop, then exit)
//! 4. Show the "Waiting for a client" screen
//! 5. Serve requests until the process is interrupted

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;
use log::{LevelFilter, error, info, warn};
#[cfg(feature = "zmq")]
use oled_display_server::config::MAX_REQUEST_BYTES;
use oled_display_server::config::{ConfigError, DeviceKind, Settings, TransportKind};
use oled_display_server::device;
use oled_display_server::server::CommandServer;
use oled_display_server::styles::FontChoice;
use oled_display_server::tasks::{RenderHandle, RenderWorker, WorkerOptions};
#[cfg(feature = "zmq")]
use oled_display_server::transport::ZmqTransport;
use oled_display_server::transport::{TcpOptions, TcpTransport, Transport};
use oled_display_server::{Error, Result};

#[derive(Debug, Parser)]
#[command(name = "display-server", version, about = "Render text on a small OLED display on request")]
struct Cli {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// TCP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Request transport (tcp, or zmq when compiled in)
    #[arg(long)]
    transport: Option<TransportKind>,

    /// Drop TCP clients silent for this long (0 = never)
    #[arg(long)]
    idle_timeout_ms: Option<u64>,

    /// Display backend (console or png)
    #[arg(long)]
    device: Option<DeviceKind>,

    /// Directory for PNG frames
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Font (5x8, 6x10 or profont7)
    #[arg(long)]
    font: Option<FontChoice>,

    /// Do not show the startup screen
    #[arg(long)]
    no_greeting: bool,

    /// Log level (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<LevelFilter>,
}

impl Cli {
    /// File settings (or defaults) with command line overrides applied.
    fn settings(&self) -> core::result::Result<Settings, ConfigError> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };

        if let Some(bind) = &self.bind {
            settings.server.bind.clone_from(bind);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(kind) = self.transport {
            settings.server.transport = kind;
        }
        if let Some(ms) = self.idle_timeout_ms {
            settings.server.idle_timeout_ms = ms;
        }
        if let Some(kind) = self.device {
            settings.device.kind = kind;
        }
        if let Some(dir) = &self.output_dir {
            settings.device.output_dir.clone_from(dir);
        }
        if let Some(font) = self.font {
            settings.display.font = font;
        }
        if self.no_greeting {
            settings.server.greeting = false;
        }

        settings.validate()?;
        Ok(settings)
    }
}

fn init_logger(level: Option<LevelFilter>) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = cli.settings()?;

    match settings.server.transport {
        TransportKind::Tcp => {
            let options = TcpOptions {
                idle_timeout: settings.idle_timeout(),
                ..TcpOptions::default()
            };
            let transport = TcpTransport::bind(&settings.bind_addr(), options)?;
            let addr = transport.local_addr();
            info!("Listening on {addr}");
            serve(transport, &addr.ip().to_string(), &settings)
        }
        #[cfg(feature = "zmq")]
        TransportKind::Zmq => {
            let transport = ZmqTransport::bind(&settings.zmq_endpoint(), MAX_REQUEST_BYTES)?;
            serve(transport, &settings.server.bind, &settings)
        }
        #[cfg(not(feature = "zmq"))]
        TransportKind::Zmq => Err(ConfigError::Invalid("transport 'zmq' is not compiled in".to_owned()).into()),
    }
}

/// Start the render worker and serve `transport` until it fails for good.
fn serve<T: Transport>(
    transport: T,
    host: &str,
    settings: &Settings,
) -> Result<()> {
    let device = device::open(&settings.device, settings.size());
    let worker = RenderWorker::spawn(
        device,
        WorkerOptions {
            size: settings.size(),
            font: settings.display.font,
            wake_poll: settings.wake_poll(),
        },
    )?;
    let handle = worker.handle();
    install_interrupt_handler(handle.clone())?;

    if settings.server.greeting {
        handle.submit(greeting(host));
    }

    let result = CommandServer::new(transport, handle.clone()).run();

    // Only a dead transport gets here
    if handle.shutdown(handle.wake_poll()) {
        worker.join();
    } else {
        warn!("Render worker still busy, leaving it behind");
    }
    result.map_err(Error::from)
}

/// Startup screen shown until the first client sends something.
fn greeting(host: &str) -> Vec<String> { vec!["Waiting for a client".to_owned(), format!("at {host}")] }

/// Ctrl-C / SIGTERM: stop the worker within one wake-poll interval, then exit.
fn install_interrupt_handler(handle: RenderHandle) -> Result<()> {
    ctrlc::set_handler(move || {
        info!("Interrupted, stopping render worker");
        let timeout = handle.wake_poll();
        if !handle.shutdown(timeout) {
            warn!("Render worker did not stop within {timeout:?}, exiting anyway");
        }
        info!("Render stats: {}", handle.stats());
        std::process::exit(0);
    })?;
    Ok(())
}
