pub mod channel;
pub mod error;

pub use channel::{ChannelParams, ChannelRecord, ChannelStatus, Settlement};
pub use error::{AuthError, ChannelError, ConfigError, LedgerError};
