#[macro_use]
extern crate rocket;

pub mod api;
pub mod broadcast;
pub mod comfort;
pub mod config;
pub mod db;
pub mod ingest;

use anyhow::{anyhow, Result};
use log::{debug, info};
use rocket::{Build, Rocket};

use broadcast::BroadcastHub;
use config::Config;
use ingest::IngestionGateway;

/// Wires the gateway into a Rocket instance with the `/api` surface.
pub fn build_rocket(gateway: IngestionGateway) -> Rocket<Build> {
    rocket::build()
        .manage(gateway)
        .mount("/api", api::routes())
        .register("/", api::catchers())
}

pub async fn run() -> Result<()> {
    let env_path = dotenv::dotenv().ok();

    // Installed before Rocket ignites so Rocket leaves the global logger alone.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Roomwatch starting up...");
    debug!("Loaded .env from: {:?}", env_path);

    let config = Config::from_env()?;
    let database = config.open_database()?;
    let classifier = config.load_classifier()?;
    let hub = BroadcastHub::new(database.clone());
    let gateway = IngestionGateway::new(database, classifier, hub);

    build_rocket(gateway)
        .launch()
        .await
        .map_err(|err| anyhow!("server failed: {err}"))?;

    info!("Roomwatch stopped");
    Ok(())
}
