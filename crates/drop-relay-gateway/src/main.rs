//! Binary entry point for the Drop-Relay gateway.

use clap::Parser;
use drop_relay_gateway::{start_server, GatewayConfig, GatewayState};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[clap(name = "drop-relay-gateway", about = "Message-dispatch gateway for the chat webhook upstream", version)]
struct Args {
    /// Socket address to listen on.
    #[arg(long = "listen", env = "GW_LISTEN", default_value = "0.0.0.0:8081")]
    listen: SocketAddr,

    /// Upstream bot key.
    #[arg(long = "bot-key", env = "GW_BOT_KEY")]
    bot_key: String,

    /// Access tokens admitted to the gateway; empty disables the check.
    #[arg(long = "allow-tokens", env = "GW_ALLOW_TOKENS", value_delimiter = ',')]
    allow_tokens: Vec<String>,

    /// Override for the upstream send endpoint.
    #[arg(long = "send-url", env = "GW_SEND_URL")]
    send_url: Option<String>,

    /// Override for the upstream media upload endpoint.
    #[arg(long = "upload-url", env = "GW_UPLOAD_URL")]
    upload_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drop_relay_gateway=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = GatewayConfig::new(args.bot_key, args.allow_tokens);
    if let Some(send_url) = args.send_url {
        config.send_url = send_url;
    }
    if let Some(upload_url) = args.upload_url {
        config.upload_url = upload_url;
    }

    if config.allow_tokens.is_empty() {
        info!("no access tokens configured, gateway is open");
    }

    info!(listen = %args.listen, "starting gateway");
    start_server(GatewayState::new(config), args.listen).await
}
