//! FX Event Bridge
//!
//! Monitors simulated rate and account updates through the event bridge.

use clap::{Parser, Subcommand};
use fx_bridge::{
    bridge::signal::install_interrupt_handler,
    config::Config,
    dispatch::{self, DispatchMethod},
    events::{AccountEvent, RateEvent},
    source::{feed::SimulatedFeed, Account, RateTable},
    Dispatcher, EventQueue,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fx-bridge")]
#[command(about = "Dispatch FX rate and account events from producer threads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (defaults to fx-bridge.toml if present)
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor events from a simulated feed
    Monitor {
        /// Dispatch method
        #[arg(short, long, value_enum)]
        method: Option<DispatchMethod>,
        /// Seconds to monitor for (0 = until interrupted)
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Show the queue status of an idle bridge
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    match cli.command {
        Commands::Monitor { method, duration } => monitor(config, method, duration),
        Commands::Status { json } => show_status(json),
    }
}

fn monitor(config: Config, method: Option<DispatchMethod>, duration: Option<u64>) -> anyhow::Result<()> {
    let method = method.unwrap_or(config.dispatch.method);
    let duration = match duration {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => config.dispatch.duration(),
    };

    let queue = Arc::new(EventQueue::new());
    let dispatcher = Dispatcher::new(queue.clone());
    // The readiness loop listens for ctrl-c itself.
    if config.dispatch.interrupt_handler && method != DispatchMethod::Readiness {
        install_interrupt_handler(dispatcher.clone())?;
    }

    let table = Arc::new(RateTable::new(queue.clone()));
    table.event_manager().add(RateEvent::new().on_event(|info, _| {
        println!("RateEvent: {}", info.pair());
        println!("    {}", info.tick());
        Ok(())
    }))?;

    let mut accounts = Vec::new();
    for id in 1..=config.feed.accounts {
        let account = Arc::new(Account::new(id, queue.clone()));
        account.event_manager().add(AccountEvent::new().on_event(move |info, _| {
            println!("AccountEvent: account {}", id);
            println!("    {}", info.transaction());
            Ok(())
        }))?;
        accounts.push(account);
    }

    let mut feed = SimulatedFeed::start(table, accounts, config.feed.settings()?);
    tracing::info!("Monitoring events ({:?})", method);

    let outcome = dispatch::run(method, &dispatcher, duration, config.dispatch.max_events());
    feed.stop();
    let dispatched = outcome?;

    println!("\nDispatched {} events", dispatched);
    print!("{}", dispatcher.dump_events());
    Ok(())
}

fn show_status(json: bool) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::new(Arc::new(EventQueue::new()));

    if json {
        println!("{}", serde_json::to_string_pretty(&dispatcher.stats())?);
    } else {
        print!("{}", dispatcher.dump_events());
    }
    Ok(())
}
