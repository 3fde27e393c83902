use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use super::ChannelError;

/// Fixed parameters a channel is created with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelParams {
    /// Identity of the channel: its custody account on the ledger and the
    /// domain bound into every claim digest.
    pub channel_address: Address,
    /// The payer.
    pub user_address: Address,
    /// The payee.
    pub recipient_address: Address,
    /// Length of the dispute window in clock ordinals.
    pub timeout_window: u64,
}

impl ChannelParams {
    pub fn validate(&self) -> Result<(), ChannelError> {
        let zero = Address::zero();
        if self.user_address == zero || self.recipient_address == zero {
            return Err(ChannelError::InvalidChannel(
                "participants must be non-zero addresses".into(),
            ));
        }
        if self.user_address == self.recipient_address {
            return Err(ChannelError::InvalidChannel(
                "user and recipient must differ".into(),
            ));
        }
        if self.channel_address == zero
            || self.channel_address == self.user_address
            || self.channel_address == self.recipient_address
        {
            return Err(ChannelError::InvalidChannel(
                "channel address must be a distinct non-zero account".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Open,
    Closing,
}

/// Persisted state of one channel instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub channel_address: Address,
    pub user_address: Address,
    pub recipient_address: Address,
    pub timeout_window: u64,
    pub opened_at: u64,
    /// Zero address while the channel is open.
    pub closing_party: Address,
    pub closed_at: u64,
    pub claimed_amount: U256,
    pub claim_nonce: U256,
}

impl ChannelRecord {
    pub fn new(params: ChannelParams, now: u64) -> Self {
        Self {
            channel_address: params.channel_address,
            user_address: params.user_address,
            recipient_address: params.recipient_address,
            timeout_window: params.timeout_window,
            opened_at: now,
            closing_party: Address::zero(),
            closed_at: 0,
            claimed_amount: U256::zero(),
            claim_nonce: U256::zero(),
        }
    }

    pub fn status(&self) -> ChannelStatus {
        if self.is_closing() {
            ChannelStatus::Closing
        } else {
            ChannelStatus::Open
        }
    }

    pub fn is_closing(&self) -> bool {
        self.closing_party != Address::zero()
    }

    pub fn is_participant(&self, address: Address) -> bool {
        address == self.user_address || address == self.recipient_address
    }

    /// The other participant, or `None` if `address` is not part of the channel.
    pub fn counterparty(&self, address: Address) -> Option<Address> {
        if address == self.user_address {
            Some(self.recipient_address)
        } else if address == self.recipient_address {
            Some(self.user_address)
        } else {
            None
        }
    }

    /// Returns the record to its open defaults, keeping identity and
    /// participants so the channel can be reused.
    pub fn reset(&mut self, now: u64) {
        self.opened_at = now;
        self.closing_party = Address::zero();
        self.closed_at = 0;
        self.claimed_amount = U256::zero();
        self.claim_nonce = U256::zero();
    }
}

/// Funds distributed by a settlement.
///
/// `retained_in_custody` is non-zero only when the refund transfer failed
/// after the recipient was paid; those tokens stay with the channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub paid_to_recipient: U256,
    pub refunded_to_user: U256,
    pub retained_in_custody: U256,
    pub settled_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ChannelParams {
        ChannelParams {
            channel_address: Address::repeat_byte(0xcc),
            user_address: Address::repeat_byte(0x01),
            recipient_address: Address::repeat_byte(0x02),
            timeout_window: 10,
        }
    }

    #[test]
    fn test_new_record_is_open() {
        let record = ChannelRecord::new(params(), 7);
        assert_eq!(record.status(), ChannelStatus::Open);
        assert_eq!(record.opened_at, 7);
        assert_eq!(record.claim_nonce, U256::zero());
        assert_eq!(record.counterparty(record.user_address), Some(record.recipient_address));
        assert_eq!(record.counterparty(Address::repeat_byte(0x03)), None);
    }

    #[test]
    fn test_reset_keeps_identity() {
        let mut record = ChannelRecord::new(params(), 1);
        record.closing_party = record.user_address;
        record.closed_at = 5;
        record.claimed_amount = U256::from(3);
        record.claim_nonce = U256::from(2);

        record.reset(20);

        assert_eq!(record, ChannelRecord::new(params(), 20));
    }

    #[test]
    fn test_params_validation() {
        assert!(params().validate().is_ok());

        let mut same = params();
        same.recipient_address = same.user_address;
        assert!(matches!(same.validate(), Err(ChannelError::InvalidChannel(_))));

        let mut zero = params();
        zero.user_address = Address::zero();
        assert!(matches!(zero.validate(), Err(ChannelError::InvalidChannel(_))));

        let mut self_custody = params();
        self_custody.channel_address = self_custody.recipient_address;
        assert!(matches!(
            self_custody.validate(),
            Err(ChannelError::InvalidChannel(_))
        ));
    }
}
