use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blockchain::{MINING_REWARD, REWARD_ADDRESS};
use crate::crypto::{Secp256k1Scheme, SignatureScheme, digest_of};
use crate::error::{LedgerError, Result, ValidationFailure};
use crate::now_millis;
use crate::wallet::Wallet;

/// Recipient address -> amount. Ordered so the signed JSON is deterministic.
pub type OutputMap = BTreeMap<String, u64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub timestamp: i64,
    /// Sender balance at signing time; always equals the output total.
    pub amount: u64,
    /// Sender public key (hex), or [`REWARD_ADDRESS`] for rewards.
    pub address: String,
    /// Hex DER signature over the output map. Absent on rewards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub output_map: OutputMap,
    pub input: TransactionInput,
}

impl Transaction {
    /// Send `amount` from `sender` to `recipient`; the sender keeps the rest
    /// of its balance as a self-output.
    pub fn new(sender: &Wallet, recipient: &str, amount: u64) -> Result<Self> {
        let balance = sender.balance();
        if amount > balance {
            return Err(LedgerError::InsufficientBalance { amount, balance });
        }
        if recipient == sender.public_key() {
            return Err(LedgerError::InvalidTransaction(
                "recipient must differ from sender".into(),
            ));
        }

        let mut output_map = OutputMap::new();
        output_map.insert(recipient.to_string(), amount);
        output_map.insert(sender.public_key().to_string(), balance - amount);

        let input = Self::signed_input(sender, &output_map, balance);
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            output_map,
            input,
        })
    }

    /// Miner compensation: sentinel input, no signature, fixed amount.
    pub fn reward(miner: &Wallet) -> Self {
        let mut output_map = OutputMap::new();
        output_map.insert(miner.public_key().to_string(), MINING_REWARD);
        Self {
            id: Uuid::new_v4().to_string(),
            output_map,
            input: TransactionInput {
                timestamp: now_millis(),
                amount: MINING_REWARD,
                address: REWARD_ADDRESS.to_string(),
                signature: None,
            },
        }
    }

    fn signed_input(sender: &Wallet, output_map: &OutputMap, amount: u64) -> TransactionInput {
        TransactionInput {
            timestamp: now_millis(),
            amount,
            address: sender.public_key().to_string(),
            signature: Some(sender.sign(output_map)),
        }
    }

    /// Top up a still-pending transaction: move `amount` from the sender's
    /// remaining share to `recipient` and re-sign.
    pub fn update(&mut self, sender: &Wallet, recipient: &str, amount: u64) -> Result<()> {
        if self.input.address != sender.public_key() {
            return Err(LedgerError::InvalidTransaction(
                "transaction belongs to another sender".into(),
            ));
        }
        if recipient == sender.public_key() {
            return Err(LedgerError::InvalidTransaction(
                "recipient must differ from sender".into(),
            ));
        }
        let remaining = self
            .output_map
            .get(sender.public_key())
            .copied()
            .unwrap_or(0);
        if amount > remaining {
            return Err(LedgerError::InsufficientBalance {
                amount,
                balance: remaining,
            });
        }

        let credited = self
            .output_map
            .get(recipient)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidTransaction("recipient output overflows".into()))?;
        self.output_map.insert(recipient.to_string(), credited);
        self.output_map
            .insert(sender.public_key().to_string(), remaining - amount);

        self.input = Self::signed_input(sender, &self.output_map, self.input.amount);
        Ok(())
    }

    pub fn is_reward(&self) -> bool {
        self.input.address == REWARD_ADDRESS
    }

    pub fn output_total(&self) -> u128 {
        self.output_map.values().map(|v| *v as u128).sum()
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationFailure> {
        self.validate_with(&Secp256k1Scheme)
    }

    /// Output total must equal the input amount; non-reward transactions must
    /// also carry a signature over the output map that verifies under
    /// `input.address`.
    pub fn validate_with<S: SignatureScheme>(
        &self,
        scheme: &S,
    ) -> std::result::Result<(), ValidationFailure> {
        let outputs = self.output_total();
        if outputs != self.input.amount as u128 {
            return Err(ValidationFailure::OutputTotalMismatch {
                id: self.id.clone(),
                input: self.input.amount,
                outputs,
            });
        }
        if self.is_reward() {
            return Ok(());
        }

        let verified = self.input.signature.as_deref().is_some_and(|sig| {
            scheme.verify(&self.input.address, &digest_of(&self.output_map), sig)
        });
        if !verified {
            return Err(ValidationFailure::InvalidSignature {
                id: self.id.clone(),
                address: self.input.address.clone(),
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(reason) => {
                warn!("{reason}");
                false
            }
        }
    }
}
