//! A two-party, uni-directional token payment channel.
//!
//! The payer (user) deposits tokens into channel custody and pays the payee
//! (recipient) off-channel by signing increasing `(nonce, amount)` claims.
//! Either participant can close with the latest claim signed by the other;
//! the counterparty may answer with a higher-nonce claim until the dispute
//! window ends, after which anyone can settle and the channel reopens.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod state;
pub mod types;
pub mod utils;

pub use config::ChannelConfig;
pub use middleware::auth::{AppState, Caller};
pub use server::ChannelServer;
pub use state::{
    ChannelState, InMemoryLedger, ManualClock, SettlementClock, SystemClock, TokenLedger,
};
pub use types::{
    AuthError, ChannelError, ChannelParams, ChannelRecord, ChannelStatus, Settlement,
};

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Routes for one channel. Operations that depend on who is calling sit
/// behind the signed-request middleware.
pub fn create_channel_router(state: AppState) -> Router {
    let auth_state = state.clone();
    let authenticated = Router::new()
        .route("/channel/deposit", post(handlers::channel::deposit))
        .route("/channel/close", post(handlers::channel::close))
        .route(
            "/channel/close-without-signature",
            post(handlers::channel::close_without_signature),
        )
        .route(
            "/channel/update",
            post(handlers::channel::update_closed_channel),
        )
        .route_layer(axum::middleware::from_fn(
            move |req: Request<Body>, next: Next| {
                let state = auth_state.clone();
                middleware::auth::auth_middleware(state, req, next)
            },
        ));

    Router::new()
        .route("/health", get(handlers::channel::health))
        .route("/channel", get(handlers::channel::get_channel))
        .route("/channel/settle", post(handlers::channel::settle))
        .merge(authenticated)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
