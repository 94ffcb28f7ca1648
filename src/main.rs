use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

use channel_adapter::adapter::Adapter;
use channel_adapter::broker::{Broker, TopicAddresses};
use channel_adapter::config::Config;
use channel_adapter::infra::aws::{
    sdk_config, DynamoAssociationStore, DynamoRegistryStore, DynamoRepository, SnsTopic, SqsQueue,
};
use channel_adapter::infra::s3::S3ObjectStore;
use channel_adapter::logging;
use channel_adapter::message;
use channel_adapter::registry::Registry;
use channel_adapter::validator::{NoOpValidator, SchemaValidator, Validator};

#[derive(Parser)]
#[command(name = "channel-adapter")]
#[command(about = "Bridges the research-dataset message bus to per-tenant preservation pipelines")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the adapter server
    Server,
    /// Print the reference configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Config => {
            // Print the commented reference file so it can be redirected
            // into a starting configuration.
            print!("{}", channel_adapter::config::DEFAULT_CONFIG);
            Ok(())
        }
        Commands::Server => run_server(cli.config.as_deref()).await,
    }
}

async fn run_server(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    logging::init(&config.logging.level);
    info!("Starting the channel adapter");

    let sdk = sdk_config().await;

    let queue = Arc::new(SqsQueue::new(
        &sdk,
        config.aws.sqs_endpoint(),
        &config.adapter.queue_recv_main_addr,
    ));
    let topic = Arc::new(SnsTopic::new(&sdk, config.aws.sns_endpoint()));
    let repository = Arc::new(DynamoRepository::new(
        &sdk,
        config.aws.dynamodb_endpoint(),
        &config.adapter.repository_table,
    ));

    let validator: Arc<dyn Validator> = match config.adapter.validation_mode.as_str() {
        "disabled" => Arc::new(NoOpValidator),
        _ if config.schema_service.base_url.is_empty() => {
            warn!("Schema service base URL is empty; message validation is disabled");
            Arc::new(NoOpValidator)
        }
        _ => Arc::new(SchemaValidator::new(
            &config.schema_service.base_url,
            &config.schema_service.user_agent,
            message::VERSION,
        )?),
    };

    let addresses = TopicAddresses {
        main: config.adapter.queue_send_main_addr.clone(),
        invalid: config.adapter.queue_send_invalid_addr.clone(),
        error: config.adapter.queue_send_error_addr.clone(),
    };
    let broker = Arc::new(Broker::new(validator, queue, topic, addresses, repository));

    let registry_store = Arc::new(DynamoRegistryStore::new(
        &sdk,
        config.aws.dynamodb_endpoint(),
        &config.adapter.registry_table,
    ));
    let registry = Registry::new(registry_store).await?;

    let object_store = Arc::new(S3ObjectStore::new(
        &sdk,
        config.aws.s3_endpoint(),
        config.aws.s3_force_path_style,
    ));
    let storage = Arc::new(DynamoAssociationStore::new(
        &sdk,
        config.aws.dynamodb_endpoint(),
        &config.adapter.processing_table,
    ));

    let adapter = Adapter::new(broker, registry, object_store, storage);
    adapter.run().await;
    info!("Adapter is running");

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;
    loop {
        tokio::select! {
            _ = sigint.recv() => break,
            _ = sigterm.recv() => break,
            // SIGHUP reloads the tenant registry, SIGUSR1 dumps it.
            _ = sighup.recv() => adapter.registry().reload(),
            _ = sigusr1.recv() => adapter.registry().log_entries(),
        }
    }

    warn!("Shutting down...");
    adapter.stop().await;
    Ok(())
}
