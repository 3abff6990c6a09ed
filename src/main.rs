use std::sync::Arc;

use tracing::{error, info};

use suimail::mail::PurgeTask;
use suimail::web::WebServer;
use suimail::{blob, Config, Database};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = suimail::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        suimail::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> suimail::Result<()> {
    config.validate()?;

    info!("Suimail starting");
    let db = Arc::new(Database::open(&config.database.path).await?);
    info!("Database opened at {}", config.database.path);

    let blobs = blob::from_config(&config.blob_store)?;

    if config.mail.purge_interval_secs > 0 {
        let task = PurgeTask::with_interval(db.clone(), config.mail.purge_interval_secs);
        tokio::spawn(async move { task.run().await });
    } else {
        info!("Mail purge task disabled");
    }

    let server = WebServer::new(&config, db, blobs)?;
    server.run().await?;
    Ok(())
}
