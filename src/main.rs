use std::path::PathBuf;
use std::sync::Arc;

use sinopac_gateway::broker::{Catalog, PaperSession};
use sinopac_gateway::config::fetch_config;
use sinopac_gateway::credentials::populate_env_from_keychain;
use sinopac_gateway::publish::ChannelPublisher;
use sinopac_gateway::{GatewayError, SinopacGateway, dispatch, replay};
use tracing::{info, warn};

const USAGE: &str = "usage: sinopac-gateway <replay.jsonl> [catalog.json]";

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    populate_env_from_keychain();
    let config = fetch_config()?;

    let mut args = std::env::args().skip(1);
    let replay_path = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| GatewayError::Config(USAGE.to_string()))?;
    let catalog: Catalog = match args.next() {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Catalog::default(),
    };

    let (publisher, mut published) = ChannelPublisher::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = published.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Unserializable event"),
            }
        }
    });

    let session = Arc::new(PaperSession::new().with_catalog(catalog));
    let gateway = Arc::new(SinopacGateway::new(
        session,
        Arc::new(publisher),
        config.resolve_retry_delay,
    ));
    if !gateway.connect(&config) {
        return Err(GatewayError::Broker("login failed".to_string()));
    }

    let events = replay::load(&replay_path)?;
    let (dispatcher, workers) = dispatch::spawn(Arc::clone(&gateway));
    for event in events {
        dispatcher.send(event);
    }
    drop(dispatcher);
    workers.join().await;

    gateway.close();
    info!(
        orders = gateway.ledger().orders().len(),
        trades = gateway.ledger().trades().len(),
        "Replay finished"
    );
    drop(gateway);
    if let Err(e) = printer.await {
        warn!(error = %e, "Printer task failed");
    }

    Ok(())
}
