//! Dynbridge - Dynamic Module Bridge
//!
//! CLI entry point: loads a module, registers a printing callback and sends
//! it a sequence of request tags.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use dynbridge::{
    BridgeConfig, BridgeError, CallOutcome, DynamicBridge, ModuleContract, ModuleHandle,
};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "dynbridge")]
#[command(version)]
#[command(about = "Load a shared module and exchange string requests with it", long_about = None)]
struct Cli {
    /// Config file (default: dynbridge.toml in the current directory or a parent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the module, register the callback and send requests (default)
    Run {
        #[command(flatten)]
        module: ModuleArgs,

        /// Request tags to send, in order (default: from config)
        #[arg(value_name = "TAG")]
        requests: Vec<String>,
    },

    /// Report which contract symbols the module exports, without calling it
    Inspect {
        #[command(flatten)]
        module: ModuleArgs,
    },
}

#[derive(Args)]
struct ModuleArgs {
    /// Module path or name
    #[arg(short, long)]
    module: Option<String>,

    /// Name of the init export
    #[arg(long)]
    init_symbol: Option<String>,

    /// Name of the call export
    #[arg(long)]
    call_symbol: Option<String>,

    /// Name of the export that frees responses
    #[arg(long)]
    release_symbol: Option<String>,
}

impl ModuleArgs {
    fn apply(self, config: &mut BridgeConfig) {
        if let Some(module) = self.module {
            config.module.path = module;
        }
        if let Some(init) = self.init_symbol {
            config.symbols.init = init;
        }
        if let Some(call) = self.call_symbol {
            config.symbols.call = call;
        }
        if self.release_symbol.is_some() {
            config.symbols.release = self.release_symbol;
        }
    }
}

dynbridge::host_callback! {
    /// Prints whatever the module sends back through the callback.
    fn print_echo(payload) {
        println!("Received String From Module : {}", String::from_utf8_lossy(payload));
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_config(cli.config.as_ref()).and_then(|mut config| match cli.command {
        None => run(config, Vec::new()),
        Some(Commands::Run { module, requests }) => {
            module.apply(&mut config);
            run(config, requests)
        }
        Some(Commands::Inspect { module }) => {
            module.apply(&mut config);
            inspect(&config)
        }
    });

    if let Err(e) = result {
        println!("Fail to init module: {:#}", e);
        std::process::exit(-1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "dynbridge=debug" } else { "dynbridge=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let json_logging = std::env::var("DYNBRIDGE_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    // Logs go to stderr; stdout carries the step-by-step diagnostics.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => BridgeConfig::load_from_cwd().context("searching for dynbridge.toml"),
    }
}

/// Load the module and resolve the contract one symbol at a time, printing
/// a line per step.
fn open_bridge(config: &BridgeConfig) -> Result<DynamicBridge> {
    let locator = config.locator();
    let module = locator
        .locate(&config.module.path)
        .and_then(ModuleHandle::load)
        .map_err(|e| {
            println!("Error: failed to load library");
            e
        })?;

    // SAFETY: the configured symbols are declared to follow the standard
    // init/call/release signatures.
    let contract: ModuleContract = unsafe { config.contract() };
    for symbol in contract.symbols() {
        if module.exports(symbol) {
            println!("Success to load ({})", symbol);
        } else {
            println!("Error: symbol not found ({})", symbol);
        }
    }

    Ok(DynamicBridge::from_module(module, contract)?)
}

fn run(config: BridgeConfig, requests: Vec<String>) -> Result<()> {
    let requests = if requests.is_empty() {
        config.demo.requests.clone()
    } else {
        requests
    };

    let mut bridge = open_bridge(&config)?;
    bridge
        .register_callback(print_echo)
        .context("registering host callback")?;

    for request in &requests {
        match bridge.invoke(request) {
            Ok(CallOutcome::Response(body)) => println!("Response ({}) : {}", request, body),
            Ok(CallOutcome::NoResponse) => println!("Response ({}) : (null)", request),
            // Call-level failures do not change the exit status.
            Err(e @ BridgeError::InvalidPayload(_)) => println!("Error ({}) : {}", request, e),
            Err(e) => return Err(e.into()),
        }
    }

    bridge.close().context("unloading module")?;
    info!(requests = requests.len(), "run complete");
    Ok(())
}

fn inspect(config: &BridgeConfig) -> Result<()> {
    let bridge = open_bridge(config)?;
    debug!(bridge = ?bridge, "contract resolved");
    match bridge.path() {
        Some(path) => println!("Module: {}", path.display()),
        None => bail!("module closed unexpectedly"),
    }
    println!("Contract: {}", bridge.contract());
    println!("State: {}", bridge.state());
    Ok(())
}
