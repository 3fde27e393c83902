use ethers::{
    signers::{LocalWallet, Signer, WalletError},
    types::{Address, RecoveryMessage, Signature, U256},
    utils::keccak256,
};

use crate::types::ChannelError;

pub trait U256Ext {
    fn to_be_bytes_vec(&self) -> Vec<u8>;
}

impl U256Ext for U256 {
    fn to_be_bytes_vec(&self) -> Vec<u8> {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        bytes.to_vec()
    }
}

/// Digest a participant signs to authorize a claim of `amount` at `nonce`.
///
/// Packed as `channel (20) || nonce (32) || amount (32)` and hashed with
/// keccak256. The channel address ties the signature to one channel.
///
/// The digest does not bind the channel episode, and nonces restart at zero
/// after every settlement. A claim signed in an earlier episode therefore
/// stays valid in later ones and outranks any lower nonce. Signers should keep
/// nonces increasing across settlements instead of restarting them.
pub fn claim_message(channel_address: Address, nonce: U256, amount: U256) -> Vec<u8> {
    let mut packed = Vec::with_capacity(20 + 32 + 32);
    packed.extend_from_slice(channel_address.as_bytes());
    packed.extend_from_slice(&nonce.to_be_bytes_vec());
    packed.extend_from_slice(&amount.to_be_bytes_vec());
    keccak256(packed).to_vec()
}

/// Message a caller signs to authenticate an HTTP request against a channel:
/// `channel (20) || timestamp (8) || keccak256(path) (32) || body`.
pub fn request_message(
    channel_address: Address,
    timestamp: u64,
    path: &str,
    request_data: &[u8],
) -> Vec<u8> {
    let mut message = Vec::new();
    message.extend_from_slice(channel_address.as_bytes());
    message.extend_from_slice(&timestamp.to_be_bytes());
    message.extend_from_slice(&keccak256(path.as_bytes()));
    message.extend_from_slice(request_data);
    message
}

/// Recovers the address whose key produced `signature` over the personal-sign
/// hash of `message`.
pub fn recover_signer(message: &[u8], signature: &Signature) -> Result<Address, ChannelError> {
    let recoverable = RecoveryMessage::Data(message.to_vec());
    signature.recover(recoverable).map_err(|e| {
        tracing::debug!(error = %e, "signature recovery failed");
        ChannelError::InvalidSignature
    })
}

/// Signs a claim the way a participant hands it to the counterparty off-channel.
pub async fn sign_claim(
    wallet: &LocalWallet,
    channel_address: Address,
    nonce: U256,
    amount: U256,
) -> Result<Signature, WalletError> {
    wallet
        .sign_message(claim_message(channel_address, nonce, amount))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn create_test_wallet() -> LocalWallet {
        LocalWallet::from_str("1234567890123456789012345678901234567890123456789012345678901234")
            .unwrap()
    }

    #[tokio::test]
    async fn test_claim_signature_recovers_signer() {
        let wallet = create_test_wallet();
        let channel = Address::repeat_byte(0xcc);

        let signature = sign_claim(&wallet, channel, U256::from(1), U256::from(2))
            .await
            .unwrap();
        let message = claim_message(channel, U256::from(1), U256::from(2));

        assert_eq!(recover_signer(&message, &signature).unwrap(), wallet.address());
    }

    #[tokio::test]
    async fn test_signature_does_not_carry_over_to_another_channel() {
        let wallet = create_test_wallet();
        let signature = sign_claim(
            &wallet,
            Address::repeat_byte(0xcc),
            U256::from(1),
            U256::from(2),
        )
        .await
        .unwrap();

        let other = claim_message(Address::repeat_byte(0xdd), U256::from(1), U256::from(2));
        let recovered = recover_signer(&other, &signature);

        assert!(recovered.map(|addr| addr != wallet.address()).unwrap_or(true));
    }

    #[test]
    fn test_claim_message_binds_every_field() {
        let channel = Address::repeat_byte(0xcc);
        let base = claim_message(channel, U256::from(1), U256::from(2));

        assert_eq!(base.len(), 32);
        assert_ne!(base, claim_message(channel, U256::from(2), U256::from(2)));
        assert_ne!(base, claim_message(channel, U256::from(1), U256::from(3)));
        assert_ne!(
            base,
            claim_message(Address::repeat_byte(0xdd), U256::from(1), U256::from(2))
        );
    }

    #[test]
    fn test_malformed_signature_is_rejected() {
        let signature = Signature {
            r: U256::zero(),
            s: U256::zero(),
            v: 27,
        };
        let message = claim_message(Address::repeat_byte(0xcc), U256::one(), U256::one());

        assert_eq!(
            recover_signer(&message, &signature),
            Err(ChannelError::InvalidSignature)
        );
    }

    #[test]
    fn test_request_message_layout() {
        let channel = Address::repeat_byte(0xcc);
        let message = request_message(channel, 42, "/channel/deposit", b"body");

        assert_eq!(&message[..20], channel.as_bytes());
        assert_eq!(&message[20..28], &42u64.to_be_bytes());
        assert_eq!(&message[28..60], &keccak256(b"/channel/deposit"));
        assert_eq!(&message[60..], b"body");
        assert_ne!(
            message,
            request_message(channel, 42, "/channel/close", b"body")
        );
    }
}
