use log::debug;
use secp256k1::SecretKey;
use serde::Serialize;

use crate::blockchain::{Block, STARTING_BALANCE};
use crate::crypto::{Secp256k1Scheme, SignatureScheme, digest_of, generate_keypair};
use crate::error::{LedgerError, Result};
use crate::transaction::Transaction;

/// A secp256k1 keypair plus a cached balance. The cache is only a hint for
/// building transactions; the chain is the source of truth.
#[derive(Debug, Clone)]
pub struct Wallet {
    secret_key: SecretKey,
    /// Hex of the compressed public key; also the wallet address.
    public_key: String,
    balance: u64,
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet {
    pub fn new() -> Self {
        let (secret_key, public_key) = generate_keypair();
        Self {
            secret_key,
            public_key,
            balance: STARTING_BALANCE,
        }
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    #[cfg(test)]
    pub(crate) fn set_balance(&mut self, balance: u64) {
        self.balance = balance;
    }

    /// Sign the canonical hash of `data`.
    pub fn sign<T: Serialize + ?Sized>(&self, data: &T) -> String {
        Secp256k1Scheme.sign(&self.secret_key, &digest_of(data))
    }

    /// Build a new transaction, refreshing the cached balance from `chain`
    /// first when one is given.
    pub fn create_transaction(
        &mut self,
        recipient: &str,
        amount: u64,
        chain: Option<&[Block]>,
    ) -> Result<Transaction> {
        if let Some(chain) = chain {
            self.balance = Self::calculate_balance(chain, &self.public_key);
            debug!("wallet {} balance refreshed to {}", self.public_key, self.balance);
        }
        if amount > self.balance {
            return Err(LedgerError::InsufficientBalance {
                amount,
                balance: self.balance,
            });
        }
        Transaction::new(self, recipient, amount)
    }

    /// Balance of `address` derived from chain history.
    ///
    /// Walks back from the tip summing outputs paid to `address`, and stops
    /// after the block holding the address's most recent spend: that spend's
    /// self-output already carries everything received before it. Addresses
    /// that never spent also get [`STARTING_BALANCE`].
    pub fn calculate_balance(chain: &[Block], address: &str) -> u64 {
        let mut has_spent = false;
        let mut outputs_total: u64 = 0;

        for block in chain.iter().skip(1).rev() {
            for tx in &block.data {
                if tx.input.address == address {
                    has_spent = true;
                }
                if let Some(amount) = tx.output_map.get(address) {
                    outputs_total = outputs_total.saturating_add(*amount);
                }
            }
            if has_spent {
                break;
            }
        }

        if has_spent {
            outputs_total
        } else {
            STARTING_BALANCE.saturating_add(outputs_total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Blockchain, MINING_REWARD};
    use crate::crypto::verify_signature_hex;

    #[test]
    fn new_wallet_has_starting_balance_and_pubkey() {
        let w = Wallet::new();
        assert_eq!(w.balance(), STARTING_BALANCE);
        // compressed secp256k1 point
        assert_eq!(w.public_key().len(), 66);
        assert!(w.public_key().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signatures_verify_only_for_owner() {
        let w = Wallet::new();
        let sig = w.sign("foobar");
        assert_eq!(
            verify_signature_hex(w.public_key(), &sig, &digest_of("foobar")),
            Ok(true)
        );
        assert_eq!(
            verify_signature_hex(Wallet::new().public_key(), &sig, &digest_of("foobar")),
            Ok(false)
        );
    }

    #[test]
    fn create_transaction_rejects_overspend() {
        let mut w = Wallet::new();
        let err = w
            .create_transaction("bob", STARTING_BALANCE + 1, None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    }

    #[test]
    fn create_transaction_uses_wallet_as_sender() {
        let mut w = Wallet::new();
        let tx = w.create_transaction("bob", 10, None).expect("funds");
        assert_eq!(tx.input.address, w.public_key());
        assert_eq!(tx.output_map["bob"], 10);
    }

    #[test]
    fn create_transaction_refreshes_balance_from_chain() {
        let mut bc = Blockchain::new();
        let mut w = Wallet::new();
        bc.add_block(vec![Transaction::reward(&w)]);

        let tx = w
            .create_transaction("bob", 10, Some(bc.blocks()))
            .expect("funds");
        assert_eq!(w.balance(), STARTING_BALANCE + MINING_REWARD);
        assert_eq!(tx.input.amount, STARTING_BALANCE + MINING_REWARD);
    }

    mod calculate_balance {
        use super::*;

        #[test]
        fn no_history_is_starting_balance() {
            let bc = Blockchain::new();
            assert_eq!(
                Wallet::calculate_balance(bc.blocks(), Wallet::new().public_key()),
                STARTING_BALANCE
            );
        }

        #[test]
        fn receipts_are_added() {
            let mut bc = Blockchain::new();
            let w = Wallet::new();
            let one = Transaction::new(&Wallet::new(), w.public_key(), 50).expect("funds");
            let two = Transaction::new(&Wallet::new(), w.public_key(), 60).expect("funds");
            bc.add_block(vec![one, two]);

            assert_eq!(
                Wallet::calculate_balance(bc.blocks(), w.public_key()),
                STARTING_BALANCE + 110
            );
        }

        #[test]
        fn spend_resets_history() {
            let mut bc = Blockchain::new();
            let mut w = Wallet::new();

            let spend = w
                .create_transaction("bob", 30, Some(bc.blocks()))
                .expect("funds");
            bc.add_block(vec![spend.clone()]);

            assert_eq!(
                Wallet::calculate_balance(bc.blocks(), w.public_key()),
                spend.output_map[w.public_key()]
            );
        }

        #[test]
        fn counts_only_credits_at_or_after_latest_spend() {
            let mut bc = Blockchain::new();
            let mut w = Wallet::new();

            // credit before the spend: already folded into the spend's input
            let early = Transaction::new(&Wallet::new(), w.public_key(), 75).expect("funds");
            bc.add_block(vec![early]);

            let spend = w
                .create_transaction("bob", 100, Some(bc.blocks()))
                .expect("funds");
            let same_block = Transaction::reward(&w);
            bc.add_block(vec![spend.clone(), same_block]);

            let later = Transaction::new(&Wallet::new(), w.public_key(), 20).expect("funds");
            bc.add_block(vec![later]);

            assert_eq!(spend.output_map[w.public_key()], STARTING_BALANCE + 75 - 100);
            assert_eq!(
                Wallet::calculate_balance(bc.blocks(), w.public_key()),
                spend.output_map[w.public_key()] + MINING_REWARD + 20
            );
        }
    }
}
