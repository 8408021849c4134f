use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use filerouter_core::config::{LogFormat, LoggingConfig, StoreBackend, StoreConfig};
use filerouter_core::{BatchStatus, RouterConfig};
use filerouter_filter::RoutingConfigSet;
use filerouter_mover::{
    parse_events, MoverMetrics, ObjectProcessor, RouterHandler, StaticRules, SystemClock,
};
use filerouter_store::{MemoryStore, ObjectStore};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// FileRouter - event-driven object routing between buckets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long, env = "FILEROUTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route one notification batch read from a file
    Handle {
        /// S3 notification JSON
        #[arg(short, long)]
        event: PathBuf,

        /// Object store backend, overrides the configuration file
        #[arg(short, long, value_enum)]
        store: Option<StoreArg>,

        /// Local rules document used instead of the configured one
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },

    /// Decode a rules document and report configuration problems
    Check {
        /// Rules document
        #[arg(short, long)]
        rules: PathBuf,
    },

    /// Show which rule and destination each key would get
    Resolve {
        /// Rules document
        #[arg(short, long)]
        rules: PathBuf,

        /// Source bucket used for the dry run
        #[arg(short, long, default_value = "source")]
        bucket: String,

        /// Object keys
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreArg {
    Memory,
    S3,
}

impl From<StoreArg> for StoreBackend {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Memory => StoreBackend::Memory,
            StoreArg::S3 => StoreBackend::S3,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = RouterConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging)?;

    match args.command {
        Command::Handle {
            event,
            store,
            rules,
        } => {
            if let Some(store) = store {
                config.store.backend = store.into();
            }
            handle(&config, &event, rules.as_deref()).await
        }
        Command::Check { rules } => check(&rules),
        Command::Resolve {
            rules,
            bucket,
            keys,
        } => resolve(&config, &rules, &bucket, &keys),
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Logs go to stderr; stdout carries command output
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

async fn build_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        #[cfg(feature = "s3")]
        StoreBackend::S3 => {
            let store = filerouter_store::S3Store::connect(config)
                .await
                .context("Failed to create S3 client")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "s3"))]
        StoreBackend::S3 => anyhow::bail!("S3 support is not compiled in; rebuild with --features s3"),
    }
}

fn read_rules(path: &Path) -> Result<RoutingConfigSet> {
    let document = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rules document: {:?}", path))?;
    RoutingConfigSet::from_json(&document)
        .with_context(|| format!("Failed to decode rules document: {:?}", path))
}

async fn handle(config: &RouterConfig, event: &Path, rules: Option<&Path>) -> Result<ExitCode> {
    let payload = fs::read_to_string(event)
        .with_context(|| format!("Failed to read event file: {:?}", event))?;
    let events = parse_events(&payload).context("Failed to decode event file")?;

    let store: Arc<dyn ObjectStore> = match config.store.backend {
        StoreBackend::Memory => {
            // Seed the sources so the dry run has something to copy
            let memory = Arc::new(MemoryStore::new());
            for event in &events {
                memory.put(&event.source_bucket, &event.source_key, "");
            }
            if rules.is_none() {
                warn!("Memory store holds no rules document; pass --rules to route anything");
            }
            memory as Arc<dyn ObjectStore>
        }
        StoreBackend::S3 => build_store(&config.store).await?,
    };

    info!(
        store = store.name(),
        events = events.len(),
        rules = %config.rules_location(),
        "Handling batch"
    );

    let handler = match rules {
        Some(path) => {
            let processor =
                ObjectProcessor::new(Arc::clone(&store), Arc::new(SystemClock), &config.processor_id);
            RouterHandler::new(
                Arc::new(StaticRules::new(read_rules(path)?)),
                processor,
                &config.config_file_key,
                Arc::new(MoverMetrics::new()),
            )
        }
        None => RouterHandler::from_config(config, store),
    };

    let summary = handler.handle(&events).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(match summary.status() {
        BatchStatus::Ok => ExitCode::SUCCESS,
        BatchStatus::MultiStatus => ExitCode::from(2),
    })
}

fn check(path: &Path) -> Result<ExitCode> {
    let rules = read_rules(path)?;

    println!("{} rule(s) in priority order:", rules.len());
    for rule in rules.rules() {
        let priority = rule
            .priority
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let state = if rule.enabled { "" } else { " (disabled)" };
        println!(
            "  [{:>4}] {}{}: {} '{}' -> s3://{}/{}",
            priority,
            rule.name,
            state,
            rule.pattern_type,
            rule.source_pattern,
            rule.destination_bucket,
            rule.destination_prefix
        );
    }

    let issues = rules.validate();
    if issues.is_empty() {
        println!("No issues found");
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} issue(s):", issues.len());
    for issue in &issues {
        println!("  {}", issue);
    }
    Ok(ExitCode::FAILURE)
}

fn resolve(config: &RouterConfig, path: &Path, bucket: &str, keys: &[String]) -> Result<ExitCode> {
    let rules = read_rules(path)?;
    let processor = ObjectProcessor::new(
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        &config.processor_id,
    );

    for key in keys {
        let line = match rules.resolve(key) {
            Some(rule) => {
                let plan = processor.plan(bucket, key, rule);
                json!({
                    "key": key,
                    "rule": rule.name,
                    "priority": rule.priority,
                    "destination": plan.destination.uri(),
                    "delete_source": plan.delete_source,
                })
            }
            None => json!({ "key": key, "rule": null, "destination": null }),
        };
        println!("{}", line);
    }

    Ok(ExitCode::SUCCESS)
}
