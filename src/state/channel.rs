use crate::{
    state::{
        clock::{dispute_deadline, has_matured, SettlementClock},
        ledger::TokenLedger,
    },
    types::{ChannelError, ChannelParams, ChannelRecord, ChannelStatus, Settlement},
    utils::crypto::{claim_message, recover_signer},
};
use ethers::types::{Address, Signature, U256};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// One payment channel between a fixed user and recipient.
///
/// Every operation holds the record's write lock from its first check to its
/// last effect, so concurrent submissions are applied one at a time and the
/// first to acquire the lock wins.
#[derive(Clone)]
pub struct ChannelState {
    channel_address: Address,
    record: Arc<RwLock<ChannelRecord>>,
    ledger: Arc<dyn TokenLedger>,
    clock: Arc<dyn SettlementClock>,
}

impl ChannelState {
    pub fn new(
        params: ChannelParams,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn SettlementClock>,
    ) -> Result<Self, ChannelError> {
        params.validate()?;
        let channel_address = params.channel_address;
        let record = ChannelRecord::new(params, clock.now());
        info!(
            channel = ?channel_address,
            user = ?record.user_address,
            recipient = ?record.recipient_address,
            timeout_window = record.timeout_window,
            "channel opened"
        );

        Ok(Self {
            channel_address,
            record: Arc::new(RwLock::new(record)),
            ledger,
            clock,
        })
    }

    pub fn channel_address(&self) -> Address {
        self.channel_address
    }

    pub async fn record(&self) -> ChannelRecord {
        self.record.read().await.clone()
    }

    pub async fn status(&self) -> ChannelStatus {
        self.record.read().await.status()
    }

    /// Tokens currently held in custody by the channel.
    pub async fn deposited_balance(&self) -> Result<U256, ChannelError> {
        Ok(self.ledger.balance_of(self.channel_address).await?)
    }

    /// Record and custody balance read under one lock, so no operation lands
    /// between the two reads.
    pub async fn snapshot(&self) -> Result<(ChannelRecord, U256), ChannelError> {
        let record = self.record.read().await;
        let deposited = self.deposited_balance().await?;
        Ok((record.clone(), deposited))
    }

    /// Pulls `amount` from the user into channel custody.
    pub async fn deposit(&self, amount: U256) -> Result<(), ChannelError> {
        let record = self.record.write().await;

        if record.is_closing() {
            return Err(rejected("deposit", ChannelError::AlreadyClosed));
        }

        self.ledger
            .transfer_from(record.user_address, self.channel_address, amount)
            .await
            .map_err(|e| rejected("deposit", e.into()))?;

        info!(channel = ?self.channel_address, %amount, "deposit received");
        Ok(())
    }

    /// Starts the dispute window with a claim signed by the caller's counterparty.
    pub async fn close(
        &self,
        caller: Address,
        nonce: U256,
        amount: U256,
        signature: &Signature,
    ) -> Result<(), ChannelError> {
        let mut record = self.record.write().await;

        if record.is_closing() {
            return Err(rejected("close", ChannelError::AlreadyClosed));
        }
        let counterparty = record
            .counterparty(caller)
            .ok_or_else(|| rejected("close", ChannelError::UnauthorizedCaller))?;
        self.ensure_covered(amount)
            .await
            .map_err(|e| rejected("close", e))?;

        let message = claim_message(self.channel_address, nonce, amount);
        let signer = recover_signer(&message, signature).map_err(|e| rejected("close", e))?;
        check_signer(signer, counterparty, caller).map_err(|e| rejected("close", e))?;

        let now = self.clock.now();
        record.closing_party = caller;
        record.closed_at = now;
        record.claimed_amount = amount;
        record.claim_nonce = nonce;

        info!(
            channel = ?self.channel_address,
            closing_party = ?caller,
            %nonce,
            %amount,
            closed_at = now,
            "channel closing"
        );
        Ok(())
    }

    /// Lets the user close an idle channel without a counterparty signature,
    /// claiming nothing for the recipient.
    pub async fn close_without_signature(&self, caller: Address) -> Result<(), ChannelError> {
        let mut record = self.record.write().await;

        if record.is_closing() {
            return Err(rejected(
                "close_without_signature",
                ChannelError::AlreadyClosed,
            ));
        }
        if caller != record.user_address {
            return Err(rejected(
                "close_without_signature",
                ChannelError::UnauthorizedCaller,
            ));
        }

        let now = self.clock.now();
        record.closing_party = caller;
        record.closed_at = now;

        info!(
            channel = ?self.channel_address,
            closing_party = ?caller,
            closed_at = now,
            "channel closing without signature"
        );
        Ok(())
    }

    /// Replaces the pending claim with a higher-nonce claim signed by the
    /// closing party. Only the other participant may submit it.
    pub async fn update_closed_channel(
        &self,
        caller: Address,
        nonce: U256,
        amount: U256,
        signature: &Signature,
    ) -> Result<(), ChannelError> {
        const OP: &str = "update_closed_channel";
        let mut record = self.record.write().await;

        if !record.is_closing() {
            return Err(rejected(OP, ChannelError::NotClosed));
        }
        if !record.is_participant(caller) || caller == record.closing_party {
            return Err(rejected(OP, ChannelError::UnauthorizedCaller));
        }
        if has_matured(self.clock.now(), record.closed_at, record.timeout_window) {
            return Err(rejected(OP, ChannelError::Expired));
        }
        if nonce <= record.claim_nonce {
            return Err(rejected(OP, ChannelError::StaleNonce));
        }
        self.ensure_covered(amount)
            .await
            .map_err(|e| rejected(OP, e))?;

        let message = claim_message(self.channel_address, nonce, amount);
        let signer = recover_signer(&message, signature).map_err(|e| rejected(OP, e))?;
        check_signer(signer, record.closing_party, caller).map_err(|e| rejected(OP, e))?;

        let previous_nonce = record.claim_nonce;
        record.claimed_amount = amount;
        record.claim_nonce = nonce;

        info!(
            channel = ?self.channel_address,
            disputed_by = ?caller,
            %previous_nonce,
            %nonce,
            %amount,
            "closing claim updated"
        );
        Ok(())
    }

    /// Pays out the pending claim once the dispute window has elapsed and
    /// reopens the channel.
    pub async fn settle(&self) -> Result<Settlement, ChannelError> {
        let mut record = self.record.write().await;

        if !record.is_closing() {
            return Err(rejected("settle", ChannelError::NotClosed));
        }
        let now = self.clock.now();
        if !has_matured(now, record.closed_at, record.timeout_window) {
            warn!(
                channel = ?self.channel_address,
                now,
                deadline = dispute_deadline(record.closed_at, record.timeout_window),
                "settle rejected: dispute window still open"
            );
            return Err(ChannelError::NotYetExpired);
        }

        let deposited = self
            .deposited_balance()
            .await
            .map_err(|e| rejected("settle", e))?;
        let claimed = record.claimed_amount;
        let refund = deposited.saturating_sub(claimed);

        let pending = record.clone();
        record.reset(now);

        if !claimed.is_zero() {
            if let Err(e) = self
                .ledger
                .transfer(self.channel_address, pending.recipient_address, claimed)
                .await
            {
                *record = pending;
                error!(channel = ?self.channel_address, error = %e, "payout to recipient failed");
                return Err(e.into());
            }
        }

        // The recipient is paid, so the settlement is committed from here on.
        let mut retained = U256::zero();
        if !refund.is_zero() {
            if let Err(e) = self
                .ledger
                .transfer(self.channel_address, pending.user_address, refund)
                .await
            {
                error!(
                    channel = ?self.channel_address,
                    error = %e,
                    %refund,
                    "refund to user failed, remainder kept in custody"
                );
                retained = refund;
            }
        }

        info!(
            channel = ?self.channel_address,
            paid_to_recipient = %claimed,
            refunded_to_user = %(refund - retained),
            retained_in_custody = %retained,
            nonce = %pending.claim_nonce,
            settled_at = now,
            "channel settled"
        );

        Ok(Settlement {
            paid_to_recipient: claimed,
            refunded_to_user: refund - retained,
            retained_in_custody: retained,
            settled_at: now,
        })
    }

    async fn ensure_covered(&self, amount: U256) -> Result<(), ChannelError> {
        if amount > self.deposited_balance().await? {
            return Err(ChannelError::InsufficientBalance);
        }
        Ok(())
    }
}

fn check_signer(signer: Address, expected: Address, caller: Address) -> Result<(), ChannelError> {
    if signer == expected {
        Ok(())
    } else if signer == caller {
        Err(ChannelError::UnauthorizedSigner)
    } else {
        Err(ChannelError::InvalidSignature)
    }
}

fn rejected(operation: &'static str, error: ChannelError) -> ChannelError {
    warn!(operation, error = %error, "channel operation rejected");
    error
}
