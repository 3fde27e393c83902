use crate::{
    middleware::auth::{AppState, Caller},
    types::{ChannelError, ChannelRecord, ChannelStatus, Settlement},
};
use axum::{extract::State, Extension, Json};
use ethers::types::{Signature, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct DepositRequest {
    pub amount: U256,
}

/// A claim signed by the counterparty (close) or the closing party (update).
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub nonce: U256,
    pub amount: U256,
    /// Hex encoded 65-byte signature.
    pub signature: String,
}

impl ClaimRequest {
    fn signature(&self) -> Result<Signature, ChannelError> {
        let bytes = hex::decode(self.signature.trim_start_matches("0x"))
            .map_err(|_| ChannelError::InvalidSignature)?;
        Signature::try_from(bytes.as_slice()).map_err(|_| ChannelError::InvalidSignature)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelView {
    pub record: ChannelRecord,
    pub status: ChannelStatus,
    pub deposited_balance: U256,
}

async fn view(state: &AppState) -> Result<Json<ChannelView>, ChannelError> {
    let (record, deposited_balance) = state.channel.snapshot().await?;
    Ok(Json(ChannelView {
        status: record.status(),
        record,
        deposited_balance,
    }))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn get_channel(State(state): State<AppState>) -> Result<Json<ChannelView>, ChannelError> {
    view(&state).await
}

/// Only the user may move their own funds into the channel.
pub async fn deposit(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<ChannelView>, ChannelError> {
    if caller != state.channel.record().await.user_address {
        return Err(ChannelError::UnauthorizedCaller);
    }
    state.channel.deposit(request.amount).await?;
    view(&state).await
}

pub async fn close(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ChannelView>, ChannelError> {
    let signature = request.signature()?;
    state
        .channel
        .close(caller, request.nonce, request.amount, &signature)
        .await?;
    view(&state).await
}

pub async fn close_without_signature(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
) -> Result<Json<ChannelView>, ChannelError> {
    state.channel.close_without_signature(caller).await?;
    view(&state).await
}

pub async fn update_closed_channel(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<ChannelView>, ChannelError> {
    let signature = request.signature()?;
    state
        .channel
        .update_closed_channel(caller, request.nonce, request.amount, &signature)
        .await?;
    view(&state).await
}

pub async fn settle(State(state): State<AppState>) -> Result<Json<Settlement>, ChannelError> {
    Ok(Json(state.channel.settle().await?))
}
