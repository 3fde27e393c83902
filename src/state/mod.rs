pub mod channel;
pub mod clock;
pub mod ledger;

pub use channel::ChannelState;
pub use clock::{ManualClock, SettlementClock, SystemClock};
pub use ledger::{InMemoryLedger, TokenLedger};
