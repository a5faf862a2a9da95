use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trello_relay::app::CardMoveHandler;
use trello_relay::config::ServerConfig;
use trello_relay::hostname::StaticHostname;
use trello_relay::server::WebhookServer;
use trello_relay::trello::TrelloClient;
use trello_relay::types::ListId;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trello_relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "error starting Trello webhook server");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let hostname = StaticHostname::from_env()?;
    let trello = TrelloClient::new(config.credentials())?;

    let mut server = WebhookServer::new(config);
    match std::env::var("BPA_TRELLO_LIST_ID") {
        Ok(list) if !list.is_empty() => {
            let handler = CardMoveHandler::new(trello.clone(), ListId::new(list));
            server = server.on("data", handler.into_handler());
        }
        _ => tracing::info!("BPA_TRELLO_LIST_ID not set; card-move automation disabled"),
    }

    let running = server.start(&hostname, trello).await?;
    tracing::info!(webhook_id = %running.webhook_id(), "Trello webhook relay running");

    tokio::signal::ctrl_c().await?;
    running.cleanup().await;
    Ok(())
}
