//! Funding driver
//!
//! Walks the unlocked users one at a time. Users that already hold tokens are
//! left alone, so running the driver again after a successful run requests
//! nothing. For a user with an empty balance the driver requests a random
//! amount, blocks until the transaction is confirmed and re-reads the
//! balance. Any request or confirmation failure ends the run.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::address::{Address, TxHandle};
use crate::client::{ConfirmationPolicy, ProtocolClient};
use crate::config::FundingConfig;
use crate::error::{ClientError, ConfigError, FundingError};
use crate::token::TokenAmount;
use crate::user::User;

/// What the driver did for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FundingAction {
    /// Tokens were requested and the transaction confirmed
    Funded {
        amount: TokenAmount,
        tx: TxHandle,
        block_number: Option<u64>,
    },
    /// Balance was already non-zero
    AlreadyFunded { balance: TokenAmount },
    /// User is locked
    Skipped,
}

/// Per-user outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingOutcome {
    pub address: Address,
    #[serde(flatten)]
    pub action: FundingAction,
}

/// Outcomes of a funding run, in user order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundingReport {
    pub outcomes: Vec<FundingOutcome>,
}

impl FundingReport {
    /// Number of users that received tokens
    pub fn funded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.action, FundingAction::Funded { .. }))
            .count()
    }

    /// Total tokens requested across confirmed transactions
    pub fn total_requested(&self) -> TokenAmount {
        self.outcomes
            .iter()
            .filter_map(|o| match o.action {
                FundingAction::Funded { amount, .. } => Some(amount),
                _ => None,
            })
            .fold(TokenAmount::ZERO, |acc, a| {
                acc.checked_add(a).unwrap_or(TokenAmount(u128::MAX))
            })
    }
}

/// Requests tokens for unlocked users with empty balances
pub struct FundingDriver<'a, C: ProtocolClient + ?Sized> {
    client: &'a C,
    config: FundingConfig,
}

impl<'a, C: ProtocolClient + ?Sized> FundingDriver<'a, C> {
    /// Create a driver, rejecting an empty amount range or a zero poll interval
    pub fn new(client: &'a C, config: FundingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { client, config })
    }

    fn policy(&self) -> ConfirmationPolicy {
        self.config.confirmation_policy()
    }

    /// Fund every eligible user in order, stopping at the first failure
    pub async fn run<R: Rng>(&self, users: &mut [User], rng: &mut R) -> Result<FundingReport, FundingError> {
        let mut report = FundingReport::default();

        for user in users.iter_mut() {
            let action = self.fund_user(user, rng).await?;
            report.outcomes.push(FundingOutcome {
                address: user.address,
                action,
            });
        }

        info!(
            "Funding complete: {} funded, {} requested in total",
            report.funded(),
            report.total_requested()
        );
        Ok(report)
    }

    /// Fund a single user if it is unlocked and empty
    pub async fn fund_user<R: Rng>(&self, user: &mut User, rng: &mut R) -> Result<FundingAction, FundingError> {
        if !user.is_unlocked() {
            debug!("Skipping locked user {}", user.address.short());
            return Ok(FundingAction::Skipped);
        }

        let balance = self.read_balance(&user.address).await?;
        user.balance = Some(balance);
        if !balance.is_zero() {
            debug!("{} already holds {} token", user.address.short(), balance);
            return Ok(FundingAction::AlreadyFunded { balance });
        }

        let amount = TokenAmount(rng.gen_range(self.config.amount_range()));
        info!("Requesting {} token for {} ({})", amount, user.name, user.address);

        let tx = self
            .client
            .request_funds(&user.address, amount)
            .await
            .map_err(|source| FundingError::Request {
                address: user.address.to_hex(),
                source,
            })?;
        debug!("Funding transaction {} submitted", tx);

        let receipt = self
            .client
            .wait_for_confirmation(&tx, &self.policy())
            .await
            .map_err(|source| match source {
                ClientError::Timeout { duration_ms } => FundingError::ConfirmationTimeout {
                    tx: tx.to_hex(),
                    timeout_ms: duration_ms,
                },
                source => FundingError::Confirmation {
                    tx: tx.to_hex(),
                    source,
                },
            })?;

        if !receipt.is_success() {
            warn!("Funding transaction {} reverted", tx);
            return Err(FundingError::Reverted { tx: tx.to_hex() });
        }

        user.balance = Some(self.read_balance(&user.address).await?);
        info!(
            "Transaction {} confirmed in block {:?}",
            tx, receipt.block_number
        );

        Ok(FundingAction::Funded {
            amount,
            tx,
            block_number: receipt.block_number,
        })
    }

    async fn read_balance(&self, address: &Address) -> Result<TokenAmount, FundingError> {
        self.client
            .balance(address)
            .await
            .map_err(|source| FundingError::Balance {
                address: address.to_hex(),
                source,
            })
    }
}

/// Re-read balances of all unlocked users
///
/// Locked users keep whatever balance they had. A failed read is logged and
/// leaves the previous value in place.
pub async fn refresh_balances<C>(client: &C, users: &mut [User])
where
    C: ProtocolClient + ?Sized,
{
    for user in users.iter_mut().filter(|u| u.is_unlocked()) {
        match client.balance(&user.address).await {
            Ok(balance) => user.balance = Some(balance),
            Err(e) => warn!("Could not read balance of {}: {}", user.address, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientResult, Receipt, ReceiptStatus};
    use crate::user::{Role, UnlockState};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Mines every request instantly unless told otherwise
    #[derive(Default)]
    struct Ledger {
        balances: Mutex<HashMap<Address, u128>>,
        pending: Mutex<HashMap<TxHandle, (Address, u128)>>,
        requests: Mutex<Vec<(Address, u128)>>,
        revert: bool,
        never_mine: bool,
        reject_requests: bool,
    }

    #[async_trait]
    impl ProtocolClient for Ledger {
        async fn list_accounts(&self) -> ClientResult<Vec<Address>> {
            Ok(vec![])
        }

        async fn unlock(&self, _address: &Address, _password: &str) -> ClientResult<bool> {
            Ok(true)
        }

        async fn balance(&self, address: &Address) -> ClientResult<TokenAmount> {
            Ok(TokenAmount(*self.balances.lock().get(address).unwrap_or(&0)))
        }

        async fn request_funds(&self, address: &Address, amount: TokenAmount) -> ClientResult<TxHandle> {
            if self.reject_requests {
                return Err(ClientError::Rpc {
                    code: -32000,
                    message: "dispenser paused".into(),
                });
            }
            let mut requests = self.requests.lock();
            requests.push((*address, amount.0));
            let tx = TxHandle::from_bytes([requests.len() as u8; 32]);
            self.pending.lock().insert(tx, (*address, amount.0));
            Ok(tx)
        }

        async fn transaction_receipt(&self, tx: &TxHandle) -> ClientResult<Option<Receipt>> {
            if self.never_mine {
                return Ok(None);
            }
            let Some((address, amount)) = self.pending.lock().remove(tx) else {
                return Ok(None);
            };
            if self.revert {
                return Ok(Some(Receipt {
                    tx: *tx,
                    block_number: Some(1),
                    status: ReceiptStatus::Reverted,
                }));
            }
            *self.balances.lock().entry(address).or_insert(0) += amount;
            Ok(Some(Receipt {
                tx: *tx,
                block_number: Some(1),
                status: ReceiptStatus::Success,
            }))
        }

        fn name(&self) -> &str {
            "ledger"
        }
    }

    fn unlocked_user(byte: u8) -> User {
        let mut user = User::new(
            format!("User {byte}"),
            Role::for_index(byte as usize),
            Address::from_bytes([byte; 20]),
            Some("pw".into()),
        );
        user.unlock = UnlockState::Unlocked;
        user
    }

    fn config(min: u128, max: u128) -> FundingConfig {
        FundingConfig {
            min_amount: min,
            max_amount: max,
            poll_interval: Duration::from_millis(10),
            confirmation_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_funds_empty_unlocked_users() {
        let ledger = Ledger::default();
        let mut users = vec![unlocked_user(1), unlocked_user(2)];
        let mut rng = StdRng::seed_from_u64(9);

        let report = FundingDriver::new(&ledger, config(1, 100))
            .unwrap()
            .run(&mut users, &mut rng)
            .await
            .unwrap();

        assert_eq!(report.funded(), 2);
        for user in &users {
            let balance = user.balance.unwrap();
            assert!(balance.value() >= 1 && balance.value() <= 100);
        }
        assert_eq!(ledger.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_inverted_amount_range_is_rejected() {
        let ledger = Ledger::default();
        let result = FundingDriver::new(&ledger, config(50, 10));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let mut zero_poll = config(1, 100);
        zero_poll.poll_interval = Duration::ZERO;
        assert!(FundingDriver::new(&ledger, zero_poll).is_err());

        // a single-value range is fine
        let mut users = vec![unlocked_user(1)];
        let mut rng = StdRng::seed_from_u64(1);
        let report = FundingDriver::new(&ledger, config(7, 7))
            .unwrap()
            .run(&mut users, &mut rng)
            .await
            .unwrap();
        assert_eq!(report.total_requested(), TokenAmount(7));
    }

    #[tokio::test]
    async fn test_skips_locked_and_funded_users() {
        let ledger = Ledger::default();
        let funded = unlocked_user(1);
        ledger.balances.lock().insert(funded.address, 5);
        let locked = User::new("Locked", Role::Provider, Address::from_bytes([2; 20]), None);
        let mut users = vec![funded, locked];
        let mut rng = StdRng::seed_from_u64(9);

        let report = FundingDriver::new(&ledger, config(1, 100))
            .unwrap()
            .run(&mut users, &mut rng)
            .await
            .unwrap();

        assert_eq!(
            report.outcomes[0].action,
            FundingAction::AlreadyFunded { balance: TokenAmount(5) }
        );
        assert_eq!(report.outcomes[1].action, FundingAction::Skipped);
        assert!(ledger.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_requests_nothing() {
        let ledger = Ledger::default();
        let mut users = vec![unlocked_user(1), unlocked_user(2)];
        let mut rng = StdRng::seed_from_u64(11);
        let driver = FundingDriver::new(&ledger, config(1, 100)).unwrap();

        driver.run(&mut users, &mut rng).await.unwrap();
        let second = driver.run(&mut users, &mut rng).await.unwrap();

        assert_eq!(second.funded(), 0);
        assert_eq!(ledger.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_request_failure_is_fatal() {
        let ledger = Ledger {
            reject_requests: true,
            ..Default::default()
        };
        let mut users = vec![unlocked_user(1), unlocked_user(2)];
        let mut rng = StdRng::seed_from_u64(1);

        let err = FundingDriver::new(&ledger, config(1, 100))
            .unwrap()
            .run(&mut users, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::Request { .. }));
    }

    #[tokio::test]
    async fn test_reverted_transaction_is_fatal() {
        let ledger = Ledger {
            revert: true,
            ..Default::default()
        };
        let mut users = vec![unlocked_user(1), unlocked_user(2)];
        let mut rng = StdRng::seed_from_u64(1);

        let err = FundingDriver::new(&ledger, config(1, 100))
            .unwrap()
            .run(&mut users, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::Reverted { .. }));
        // stopped after the first user
        assert_eq!(ledger.requests.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_timeout_is_fatal() {
        let ledger = Ledger {
            never_mine: true,
            ..Default::default()
        };
        let mut users = vec![unlocked_user(1)];
        let mut rng = StdRng::seed_from_u64(1);

        let err = FundingDriver::new(&ledger, config(1, 100))
            .unwrap()
            .run(&mut users, &mut rng)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FundingError::ConfirmationTimeout { timeout_ms: 200, .. }
        ));
    }

    #[tokio::test]
    async fn test_refresh_balances_only_touches_unlocked() {
        let ledger = Ledger::default();
        let unlocked = unlocked_user(1);
        ledger.balances.lock().insert(unlocked.address, 12);
        let locked = User::new("Locked", Role::Provider, Address::from_bytes([2; 20]), None);
        let mut users = vec![unlocked, locked];

        refresh_balances(&ledger, &mut users).await;
        assert_eq!(users[0].balance, Some(TokenAmount(12)));
        assert_eq!(users[1].balance, None);
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = FundingReport {
            outcomes: vec![FundingOutcome {
                address: Address::from_bytes([1; 20]),
                action: FundingAction::Skipped,
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["action"], "skipped");
    }
}
