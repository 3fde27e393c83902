use crate::{middleware::auth::DEFAULT_MAX_REQUEST_AGE, types::ChannelParams, types::ConfigError};
use ethers::types::{Address, U256};
use std::{net::SocketAddr, str::FromStr};

const DEFAULT_TIMEOUT_WINDOW: u64 = 10;
const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// Settings for a channel node, read from `CHANNEL_*` environment variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel_address: Address,
    pub user_address: Address,
    pub recipient_address: Address,
    pub timeout_window: u64,
    pub listen_addr: SocketAddr,
    pub max_request_age: u64,
    /// Tokens minted to the user on the in-memory ledger at startup.
    pub user_funds: U256,
}

impl ChannelConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        Ok(Self {
            channel_address: parse(
                "CHANNEL_ADDRESS",
                &required("CHANNEL_ADDRESS")?,
                Address::from_str,
            )?,
            user_address: parse(
                "CHANNEL_USER_ADDRESS",
                &required("CHANNEL_USER_ADDRESS")?,
                Address::from_str,
            )?,
            recipient_address: parse(
                "CHANNEL_RECIPIENT_ADDRESS",
                &required("CHANNEL_RECIPIENT_ADDRESS")?,
                Address::from_str,
            )?,
            timeout_window: match lookup("CHANNEL_TIMEOUT_WINDOW") {
                Some(v) => parse("CHANNEL_TIMEOUT_WINDOW", &v, u64::from_str)?,
                None => DEFAULT_TIMEOUT_WINDOW,
            },
            listen_addr: parse(
                "CHANNEL_LISTEN_ADDR",
                &lookup("CHANNEL_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.into()),
                SocketAddr::from_str,
            )?,
            max_request_age: match lookup("CHANNEL_MAX_REQUEST_AGE") {
                Some(v) => parse("CHANNEL_MAX_REQUEST_AGE", &v, u64::from_str)?,
                None => DEFAULT_MAX_REQUEST_AGE,
            },
            user_funds: match lookup("CHANNEL_USER_FUNDS") {
                Some(v) => parse("CHANNEL_USER_FUNDS", &v, U256::from_dec_str)?,
                None => U256::zero(),
            },
        })
    }

    pub fn channel_params(&self) -> ChannelParams {
        ChannelParams {
            channel_address: self.channel_address,
            user_address: self.user_address,
            recipient_address: self.recipient_address,
            timeout_window: self.timeout_window,
        }
    }
}

fn parse<T, E: std::fmt::Display>(
    key: &'static str,
    value: &str,
    parser: impl Fn(&str) -> Result<T, E>,
) -> Result<T, ConfigError> {
    parser(value.trim()).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
