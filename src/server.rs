use crate::{create_channel_router, middleware::auth::AppState, state::ChannelState};
use axum::Router;
use std::net::SocketAddr;
use tracing::info;

/// HTTP front end for a single channel.
pub struct ChannelServer {
    state: AppState,
}

impl ChannelServer {
    pub fn new(channel: ChannelState, max_request_age: u64) -> Self {
        Self {
            state: AppState::new(channel, max_request_age),
        }
    }

    pub fn router(&self) -> Router {
        create_channel_router(self.state.clone())
    }

    pub async fn run(self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(
            %addr,
            channel = ?self.state.channel.channel_address(),
            "channel server listening"
        );
        axum::serve(listener, self.router()).await
    }
}
