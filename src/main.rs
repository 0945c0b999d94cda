use std::sync::atomic::Ordering;
use std::time::Duration;

use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
use config::Config;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn, Subscriber, subscriber::set_global_default};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

use eye::console;
use eye::core::msg;
use eye::middleware::shutdown::CheckShutdown;
use eye::model::common::{AppState, DEFAULT_LISTEN, DEFAULT_PORT, DEFAULT_QUEUE_LENGTH};
use eye::service::write::ConfigurationWrite;

const EYE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command()]
struct Cli {
    #[arg(short = 'c', long = "config", default_value = "conf/eye.yml")]
    config: String,
    #[arg(long = "version")]
    version: bool,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    if args.version {
        eprintln!("Eye Configuration Lookup Service");
        eprintln!("Version: {}", EYE_VERSION);
        return Ok(());
    }

    let subscriber = get_subscriber("eye", "info", std::io::stdout);
    init_subscriber(subscriber);

    info!("Starting runtime config initialization, Eye v{}", EYE_VERSION);

    let app_config = Config::builder()
        .add_source(config::File::with_name(&args.config))
        .build()?;

    let url = app_config.get_string("db.url")?;
    let max_connections = app_config.get_int("db.pool.maximumPoolSize").unwrap_or(20) as u32;
    let min_connections = app_config.get_int("db.pool.minimumPoolSize").unwrap_or(1) as u32;
    let connect_timeout = app_config.get_int("db.pool.connectionTimeout").unwrap_or(30) as u64;
    let idle_timeout = app_config.get_int("db.pool.idleTimeout").unwrap_or(10) as u64;
    let max_lifetime = app_config.get_int("db.pool.maxLifetime").unwrap_or(30) as u64;

    let mut opt = ConnectOptions::new(url);
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(connect_timeout))
        .idle_timeout(Duration::from_secs(idle_timeout))
        .max_lifetime(Duration::from_secs(max_lifetime));

    let db: DatabaseConnection = Database::connect(opt).await?;

    let listen = app_config
        .get_string("daemon.listen")
        .unwrap_or(DEFAULT_LISTEN.to_string());
    let port = app_config.get_int("daemon.port").unwrap_or(DEFAULT_PORT as i64) as u16;
    let queue_length = app_config
        .get_int("daemon.queue_length")
        .unwrap_or(DEFAULT_QUEUE_LENGTH as i64) as usize;
    let cams_url = app_config.get_string("cams.url").unwrap_or_default();

    let (write_queue, input) = mpsc::channel::<msg::Request>(queue_length);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker = ConfigurationWrite::new(input, shutdown_rx.clone(), db.clone());
    let worker_handle = tokio::spawn(worker.run());
    tokio::spawn(ping_database(db, shutdown_rx));

    let app_state = AppState::new(app_config, write_queue, cams_url);
    let server_state = app_state.clone();

    info!("Listening on {}:{}", listen, port);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(CheckShutdown)
            .app_data(web::Data::new(server_state.clone()))
            .service(console::routes())
    })
    .bind((listen, port))?
    .run()
    .await?;

    // reject new work, then let the worker finish what is in flight
    app_state.shutdown.store(true, Ordering::Relaxed);
    let _ = shutdown_tx.send(true);
    worker_handle.await?;

    Ok(())
}

/// Periodic keepalive on the shared connection pool.
async fn ping_database(db: DatabaseConnection, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = interval.tick() => {
                if let Err(e) = db.ping().await {
                    warn!("database ping failed: {}", e);
                }
            }
        }
    }
}

pub fn get_subscriber(
    name: &str,
    env_filter: &str,
    sink: impl for<'a> MakeWriter<'a> + 'static + Send + Sync,
) -> impl Subscriber + Send + Sync {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name.into(), sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    LogTracer::init().expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to set subscriber");
}
