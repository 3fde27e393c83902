use crate::{
    state::ChannelState,
    types::AuthError,
    utils::crypto::{recover_signer, request_message},
};
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use ethers::{
    prelude::Signature,
    types::{Address, H256},
    utils::keccak256,
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub const DEFAULT_MAX_REQUEST_AGE: u64 = 300;
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Address recovered from the request signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller(pub Address);

/// Remembers signatures seen inside the freshness window so a captured
/// request cannot be submitted twice.
#[derive(Clone, Default)]
pub struct ReplayGuard {
    seen: Arc<RwLock<HashMap<H256, u64>>>,
}

impl ReplayGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn check_and_record(
        &self,
        key: H256,
        timestamp: u64,
        now: u64,
        max_age: u64,
    ) -> Result<(), AuthError> {
        let mut seen = self.seen.write().await;
        seen.retain(|_, ts| ts.saturating_add(max_age) >= now);

        if seen.contains_key(&key) {
            return Err(AuthError::ReplayedRequest);
        }
        seen.insert(key, timestamp);
        Ok(())
    }
}

/// Shared state behind the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub channel: ChannelState,
    pub replay_guard: ReplayGuard,
    pub max_request_age: u64,
}

impl AppState {
    pub fn new(channel: ChannelState, max_request_age: u64) -> Self {
        Self {
            channel,
            replay_guard: ReplayGuard::new(),
            max_request_age,
        }
    }
}

fn header<'a>(request: &'a Request<Body>, name: &'static str) -> Result<&'a str, AuthError> {
    request
        .headers()
        .get(name)
        .ok_or(AuthError::MissingHeader(name))?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader(name))
}

/// Authenticates the caller from `X-Timestamp`, `X-Message` and `X-Signature`
/// and hands the recovered address to the handler as a [`Caller`] extension.
pub async fn auth_middleware(
    state: AppState,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let timestamp = header(&request, "X-Timestamp")?
        .parse::<u64>()
        .map_err(|_| AuthError::MalformedHeader("X-Timestamp"))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    if now.abs_diff(timestamp) > state.max_request_age {
        warn!(timestamp, now, "request outside freshness window");
        return Err(AuthError::StaleRequest);
    }

    let signature_bytes = hex::decode(header(&request, "X-Signature")?.trim_start_matches("0x"))
        .map_err(|_| AuthError::MalformedHeader("X-Signature"))?;
    let signature = Signature::try_from(signature_bytes.as_slice())
        .map_err(|_| AuthError::MalformedHeader("X-Signature"))?;

    let message = hex::decode(header(&request, "X-Message")?.trim_start_matches("0x"))
        .map_err(|_| AuthError::MalformedHeader("X-Message"))?;

    let (mut parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AuthError::UnreadableBody)?;

    let reconstructed_message = request_message(
        state.channel.channel_address(),
        timestamp,
        parts.uri.path(),
        &body_bytes,
    );
    if message != reconstructed_message {
        return Err(AuthError::MalformedHeader("X-Message"));
    }

    let caller = recover_signer(&message, &signature).map_err(|_| AuthError::InvalidSignature)?;

    state
        .replay_guard
        .check_and_record(
            H256(keccak256(&signature_bytes)),
            timestamp,
            now,
            state.max_request_age,
        )
        .await
        .inspect_err(|_| warn!(caller = ?caller, "replayed request rejected"))?;

    debug!(caller = ?caller, uri = %parts.uri, "request authenticated");
    parts.extensions.insert(Caller(caller));
    Ok(next.run(Request::from_parts(parts, Body::from(body_bytes))).await)
}
