mod host;
mod terminal_output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use cmdbridge_channels::LoopbackAdapter;
use cmdbridge_config::{config_dir, config_file_path, load_and_prepare, BridgeConfig};
use cmdbridge_executor::{BridgeRuntime, MappingStore};
use cmdbridge_logging::init_logger;

use terminal_output::{dim, note_error, note_info, note_success, render_table};

#[derive(Parser)]
#[command(name = "cmdbridge")]
#[command(about = "Let an LLM run chat commands and read their replies")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.cmdbridge/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mapped command in a conversation and print the LLM-facing result
    Exec {
        /// Routing address, e.g. telegram:GroupMessage:100_42
        origin: String,
        /// Command name; `--` stands for a space
        name: String,
        /// Arguments passed to the command
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
        #[arg(long, default_value = "cli")]
        sender: String,
    },
    /// Call a dynamic LLM function the way the model would
    Call {
        function: String,
        origin: String,
        /// JSON object of arguments, e.g. '{"args":"city=Paris"}'
        #[arg(long, default_value = "{}")]
        args: String,
        #[arg(long, default_value = "cli")]
        sender: String,
    },
    /// Dispatch raw command text and print every captured reply
    Capture {
        origin: String,
        text: String,
        #[arg(long, default_value = "cli")]
        sender: String,
    },
    /// Manage command mappings
    Mappings {
        #[command(subcommand)]
        action: MappingAction,
    },
    /// List the dynamic LLM functions built from the mappings
    Tools,
    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum MappingAction {
    /// Add a mapping
    Add {
        name: String,
        function: String,
        #[arg(default_value = "")]
        description: String,
    },
    /// List mappings
    List,
    /// Remove a mapping
    Remove { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let config = load_and_prepare(&path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    init_logger(config.log_dir().as_deref(), config.log_level());
    info!(config = %path.display(), "Configuration loaded");

    match cli.command {
        Commands::Exec { origin, name, args, sender } => {
            let (runtime, adapters) = start_runtime(config).await;
            let name = cmdbridge_executor::decode_command_name(&name);
            let event = runtime.calling_event(&origin, &name, &sender, None).await;
            let result = runtime.execute(&event, &name, &args.join(" ")).await;
            println!("{result}");
            print_forwarded(&adapters).await;
            runtime.shutdown();
        }
        Commands::Call { function, origin, args, sender } => {
            let args: serde_json::Value =
                serde_json::from_str(&args).context("--args must be a JSON value")?;
            let (runtime, adapters) = start_runtime(config).await;
            let event = runtime.calling_event(&origin, &function, &sender, None).await;
            match runtime.call_tool(&function, &event, args).await {
                Ok(out) => println!("{out}"),
                Err(e) => note_error(&format!("{e:#}")),
            }
            print_forwarded(&adapters).await;
            runtime.shutdown();
        }
        Commands::Capture { origin, text, sender } => {
            let (runtime, adapters) = start_runtime(config).await;
            let outcome = runtime
                .executor()
                .execute_command(&origin, &text, &sender, None)
                .await;
            if !outcome.success {
                note_error("dispatch failed or timed out");
            } else if outcome.units.is_empty() {
                note_info("command finished without replying");
            }
            for (i, unit) in outcome.units.iter().enumerate() {
                println!("[{}] {}", i + 1, serde_json::to_string(unit)?);
            }
            print_forwarded(&adapters).await;
            runtime.shutdown();
        }
        Commands::Mappings { action } => {
            let store = MappingStore::load(config.mappings_path()).await;
            manage_mappings(&store, action).await;
        }
        Commands::Tools => {
            let (runtime, _adapters) = start_runtime(config).await;
            let registry = runtime.tools().tools().read().await;
            let mut names = registry.list();
            names.sort();
            if names.is_empty() {
                note_info("no dynamic LLM functions registered");
            }
            for name in names {
                if let Some(tool) = registry.get(&name) {
                    println!("{name}");
                    println!("  {}", tool.description());
                    println!("  {}", dim(&tool.parameters().to_string()));
                }
            }
            drop(registry);
            runtime.shutdown();
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn start_runtime(config: BridgeConfig) -> (BridgeRuntime, Vec<Arc<LoopbackAdapter>>) {
    let (platforms, adapters) = host::demo_platforms().await;
    let builder = host::with_demo_commands(BridgeRuntime::builder(config).platforms(platforms));
    (builder.start().await, adapters)
}

async fn manage_mappings(store: &MappingStore, action: MappingAction) {
    match action {
        MappingAction::Add { name, function, description } => {
            let name = cmdbridge_executor::decode_command_name(&name);
            match store.add(&name, &function, &description).await {
                Ok(msg) => note_success(&msg),
                Err(e) => note_error(&e.to_string()),
            }
        }
        MappingAction::Remove { name } => {
            match store.remove(&cmdbridge_executor::decode_command_name(&name)).await {
                Ok(msg) => note_success(&msg),
                Err(e) => note_error(&e.to_string()),
            }
        }
        MappingAction::List => {
            let mappings = store.list().await;
            if mappings.is_empty() {
                note_info("当前没有配置任何指令映射");
                return;
            }
            let rows: Vec<Vec<String>> = mappings
                .into_iter()
                .map(|(command, m)| {
                    vec![command, m.handler_function_name, m.description, m.created_at]
                })
                .collect();
            print!("{}", render_table(&["Command", "Function", "Description", "Created"], &rows));
        }
    }
}

/// What the chat side would have received.
async fn print_forwarded(adapters: &[Arc<LoopbackAdapter>]) {
    for adapter in adapters {
        for sent in adapter.sent().await {
            let text = sent.chain.plain_text().unwrap_or_default();
            println!("{}", dim(&format!("-> {}: {}", sent.target, text.replace('\n', " | "))));
        }
    }
}
