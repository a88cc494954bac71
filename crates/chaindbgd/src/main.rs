//! Notifier chain debugger daemon
//!
//! Main entry point for chaindbgd.
//! Subscribes to kernel link and address events and logs one line per event.

use anyhow::Context;
use clap::Parser;
use netdev_chaindbgd::config::{DEFAULT_CONFIG_PATH, LoggingConfig};
use netdev_chaindbgd::{
    AsyncNetlinkMonitor, ChainDebugger, ChaindbgConfig, ChaindbgError, EventBus, EventFormatter,
    LineSink, LogFormat, Result, SinkKind, Source, TracingSink, WriterSink,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Network stack notifier chain debugger
#[derive(Parser, Debug)]
#[command(name = "chaindbgd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Write raw lines to stdout instead of the log
    #[arg(long)]
    stdout: bool,

    /// Do not report devices that already exist at startup
    #[arg(long)]
    no_dump: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ChaindbgConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.stdout {
        config.output.sink = SinkKind::Stdout;
    }
    if args.no_dump {
        config.netlink.dump_on_start = false;
    }
    config.validate()?;

    init_logging(&config.logging)?;

    info!("chaindbgd: Starting notifier chain debugger");
    match run_daemon(config).await {
        Ok(()) => {
            info!("chaindbgd: Daemon exiting normally");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "chaindbgd: Daemon exiting with error");
            Err(e.into())
        }
    }
}

/// Initialize structured logging; `RUST_LOG` wins over the configured level
fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_ascii_lowercase()));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    let result = match config.format {
        LogFormat::Compact => tracing::subscriber::set_global_default(builder.compact().finish()),
        LogFormat::Full => tracing::subscriber::set_global_default(builder.finish()),
    };
    result.map_err(|e| ChaindbgError::Configuration(format!("Failed to set logger: {}", e)))
}

/// Main daemon loop
async fn run_daemon(config: ChaindbgConfig) -> Result<()> {
    let shutdown = setup_signal_handlers();

    let sink: Arc<dyn LineSink> = match config.output.sink {
        SinkKind::Log => Arc::new(TracingSink),
        SinkKind::Stdout => Arc::new(WriterSink::stdout()),
    };
    let bus = Arc::new(EventBus::new());
    let mut debugger = ChainDebugger::new(bus.clone(), EventFormatter::new(), sink);

    let mut monitor = AsyncNetlinkMonitor::new(&config.netlink)?;
    debugger.load();
    if config.netlink.dump_on_start {
        monitor.request_dump()?;
    }
    info!("chaindbgd: Listening to link and address events...");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("chaindbgd: Received shutdown signal");
            break;
        }

        tokio::select! {
            received = monitor.recv_events() => match received {
                Ok(events) => {
                    for event in &events {
                        bus.dispatch(event);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "chaindbgd: Error receiving events");
                }
            },
            _ = tokio::time::sleep(tokio::time::Duration::from_millis(100)) => {}
        }
    }

    debugger.unload();
    let stats = debugger.stats();
    info!(
        netdev = stats.emitted(Source::Netdev),
        inetaddr = stats.emitted(Source::Inetaddr),
        inet6addr = stats.emitted(Source::Inet6addr),
        dropped = stats.dropped(),
        "chaindbgd: Graceful shutdown complete"
    );
    Ok(())
}

/// Setup signal handlers and return atomic flag for shutdown signaling
fn setup_signal_handlers() -> Arc<AtomicBool> {
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("chaindbgd: Received SIGINT/SIGTERM");
            shutdown_flag_clone.store(true, Ordering::Relaxed);
        }
    });

    shutdown_flag
}
