use data_channel::{ChannelConfig, ChannelServer, ChannelState, InMemoryLedger, SystemClock};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "data_channel=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ChannelConfig::from_env()?;

    let ledger = Arc::new(InMemoryLedger::new());
    if !config.user_funds.is_zero() {
        ledger.mint(config.user_address, config.user_funds).await;
    }

    let channel = ChannelState::new(config.channel_params(), ledger, Arc::new(SystemClock))?;
    ChannelServer::new(channel, config.max_request_age)
        .run(config.listen_addr)
        .await?;

    Ok(())
}
