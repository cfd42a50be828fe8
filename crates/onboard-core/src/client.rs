//! The protocol client seam
//!
//! Everything that touches the chain goes through [`ProtocolClient`]:
//! account enumeration, unlocking, balance reads, funding requests and
//! receipt lookups. Implementations live in `onboard-chain`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::address::{Address, TxHandle};
use crate::error::ClientError;
use crate::token::TokenAmount;

/// Result type for client calls
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Execution status of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Proof that a transaction made it into the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction hash
    pub tx: TxHandle,
    /// Block the transaction was included in
    pub block_number: Option<u64>,
    /// Execution status
    pub status: ReceiptStatus,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// How long and how often to poll for a receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Capabilities the onboarding pipeline needs from a chain node
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Accounts managed by the node, in node order
    async fn list_accounts(&self) -> ClientResult<Vec<Address>>;

    /// Unlock an account with its password
    ///
    /// Returns `Ok(false)` when the node refuses the password.
    async fn unlock(&self, address: &Address, password: &str) -> ClientResult<bool>;

    /// Token balance of an account
    async fn balance(&self, address: &Address) -> ClientResult<TokenAmount>;

    /// Ask the token dispenser to send `amount` to `address`
    async fn request_funds(&self, address: &Address, amount: TokenAmount) -> ClientResult<TxHandle>;

    /// Look up a receipt once; `None` while the transaction is pending
    async fn transaction_receipt(&self, tx: &TxHandle) -> ClientResult<Option<Receipt>>;

    /// Client name (for logging)
    fn name(&self) -> &str;

    /// Poll until the transaction is mined or the policy's timeout elapses
    ///
    /// A reverted receipt is returned as-is.
    async fn wait_for_confirmation(
        &self,
        tx: &TxHandle,
        policy: &ConfirmationPolicy,
    ) -> ClientResult<Receipt> {
        let poll = async {
            loop {
                if let Some(receipt) = self.transaction_receipt(tx).await? {
                    return Ok::<_, ClientError>(receipt);
                }
                debug!("Transaction {} pending", tx);
                tokio::time::sleep(policy.poll_interval).await;
            }
        };

        tokio::time::timeout(policy.timeout, poll)
            .await
            .map_err(|_| ClientError::Timeout {
                duration_ms: policy.timeout.as_millis() as u64,
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Reports a receipt after a fixed number of polls
    struct SlowReceipts {
        remaining: Mutex<u32>,
        status: ReceiptStatus,
    }

    #[async_trait]
    impl ProtocolClient for SlowReceipts {
        async fn list_accounts(&self) -> ClientResult<Vec<Address>> {
            Ok(vec![])
        }

        async fn unlock(&self, _address: &Address, _password: &str) -> ClientResult<bool> {
            Ok(false)
        }

        async fn balance(&self, _address: &Address) -> ClientResult<TokenAmount> {
            Ok(TokenAmount::ZERO)
        }

        async fn request_funds(&self, _address: &Address, _amount: TokenAmount) -> ClientResult<TxHandle> {
            Ok(TxHandle::from_bytes([1; 32]))
        }

        async fn transaction_receipt(&self, tx: &TxHandle) -> ClientResult<Option<Receipt>> {
            let mut remaining = self.remaining.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(None);
            }
            Ok(Some(Receipt {
                tx: *tx,
                block_number: Some(7),
                status: self.status,
            }))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn policy(timeout_ms: u64) -> ConfirmationPolicy {
        ConfirmationPolicy {
            poll_interval: Duration::from_millis(10),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_receipt_after_polls() {
        let client = SlowReceipts {
            remaining: Mutex::new(3),
            status: ReceiptStatus::Success,
        };
        let tx = TxHandle::from_bytes([1; 32]);

        let receipt = client.wait_for_confirmation(&tx, &policy(1_000)).await.unwrap();
        assert!(receipt.is_success());
        assert_eq!(receipt.block_number, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let client = SlowReceipts {
            remaining: Mutex::new(u32::MAX),
            status: ReceiptStatus::Success,
        };
        let tx = TxHandle::from_bytes([1; 32]);

        let err = client.wait_for_confirmation(&tx, &policy(100)).await.unwrap_err();
        assert_eq!(err, ClientError::Timeout { duration_ms: 100 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_reverted_receipt() {
        let client = SlowReceipts {
            remaining: Mutex::new(0),
            status: ReceiptStatus::Reverted,
        };
        let tx = TxHandle::from_bytes([2; 32]);

        let receipt = client.wait_for_confirmation(&tx, &policy(1_000)).await.unwrap();
        assert!(!receipt.is_success());
    }
}
