//! In-process development chain
//!
//! `DevChain` behaves like a local test node with a token dispenser: it owns
//! a fixed list of password-protected accounts, tracks token balances and
//! mines funding transactions after a configurable number of receipt polls.
//! Requests above the dispenser cap are mined as reverted transactions.

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

use onboard_core::{
    Address, ClientError, ClientResult, Credentials, ProtocolClient, Receipt, ReceiptStatus,
    TokenAmount, TxHandle,
};

/// Default per-request dispenser cap
pub const DEFAULT_DISPENSER_CAP: u128 = 10_000;

/// Tunables for a dev chain
#[derive(Debug, Clone)]
pub struct DevChainOptions {
    /// Receipt polls that return `None` before a transaction is mined
    pub confirmation_polls: u32,
    /// Largest amount the dispenser hands out per request
    pub dispenser_cap: u128,
    /// Reject every funding request
    pub fail_requests: bool,
    /// Never mine submitted transactions
    pub stall_mining: bool,
}

impl Default for DevChainOptions {
    fn default() -> Self {
        Self {
            confirmation_polls: 1,
            dispenser_cap: DEFAULT_DISPENSER_CAP,
            fail_requests: false,
            stall_mining: false,
        }
    }
}

#[derive(Debug)]
struct DevAccount {
    password: String,
    unlocked: bool,
    balance: u128,
}

#[derive(Debug)]
struct PendingTx {
    to: Address,
    amount: u128,
    polls_left: u32,
}

#[derive(Debug, Default)]
struct DevState {
    order: Vec<Address>,
    accounts: HashMap<Address, DevAccount>,
    pending: HashMap<TxHandle, PendingTx>,
    // Never evicted: receipts stay queryable for the life of the chain, as on a node.
    mined: HashMap<TxHandle, Receipt>,
    block_number: u64,
    tx_count: u64,
    unlock_attempts: u64,
    requests: u64,
}

/// Simulated node
#[derive(Debug)]
pub struct DevChain {
    state: Mutex<DevState>,
    options: DevChainOptions,
}

impl DevChain {
    pub fn builder() -> DevChainBuilder {
        DevChainBuilder::default()
    }

    /// Accounts for every credential (in address order) plus `extra`
    /// accounts whose passwords nobody knows
    pub fn from_credentials<R: Rng>(credentials: &Credentials, extra: usize, rng: &mut R) -> Self {
        let mut known: Vec<Address> = credentials.addresses().copied().collect();
        known.sort();

        let mut builder = DevChain::builder();
        for address in known {
            if let Some(password) = credentials.get(&address) {
                builder = builder.account(address, password);
            }
        }
        for _ in 0..extra {
            let password: String = (&mut *rng)
                .sample_iter(&Alphanumeric)
                .take(16)
                .map(char::from)
                .collect();
            builder = builder.account(Address::random(rng), password);
        }
        builder.build()
    }

    /// Current block height
    pub fn block_number(&self) -> u64 {
        self.state.lock().block_number
    }

    /// Number of funding requests accepted so far
    pub fn request_count(&self) -> u64 {
        self.state.lock().requests
    }

    /// Number of unlock calls seen so far
    pub fn unlock_attempts(&self) -> u64 {
        self.state.lock().unlock_attempts
    }

    /// Directly set a balance
    pub fn set_balance(&self, address: &Address, amount: TokenAmount) {
        if let Some(account) = self.state.lock().accounts.get_mut(address) {
            account.balance = amount.0;
        }
    }

    fn next_tx(state: &mut DevState) -> TxHandle {
        state.tx_count += 1;
        let mut bytes = [0u8; 32];
        bytes[0] = 0xde;
        bytes[1] = 0xc0;
        bytes[24..].copy_from_slice(&state.tx_count.to_be_bytes());
        TxHandle::from_bytes(bytes)
    }
}

/// Builder for [`DevChain`]
#[derive(Debug, Default)]
pub struct DevChainBuilder {
    accounts: Vec<(Address, String, u128)>,
    options: DevChainOptions,
}

impl DevChainBuilder {
    /// Add an account with a password and an empty balance
    pub fn account(mut self, address: Address, password: impl Into<String>) -> Self {
        self.accounts.push((address, password.into(), 0));
        self
    }

    /// Add an account that already holds tokens
    pub fn funded_account(mut self, address: Address, password: impl Into<String>, balance: u128) -> Self {
        self.accounts.push((address, password.into(), balance));
        self
    }

    pub fn confirmation_polls(mut self, polls: u32) -> Self {
        self.options.confirmation_polls = polls;
        self
    }

    pub fn dispenser_cap(mut self, cap: u128) -> Self {
        self.options.dispenser_cap = cap;
        self
    }

    pub fn fail_requests(mut self, fail: bool) -> Self {
        self.options.fail_requests = fail;
        self
    }

    pub fn stall_mining(mut self, stall: bool) -> Self {
        self.options.stall_mining = stall;
        self
    }

    pub fn build(self) -> DevChain {
        let mut state = DevState::default();
        for (address, password, balance) in self.accounts {
            if !state.accounts.contains_key(&address) {
                state.order.push(address);
            }
            state.accounts.insert(
                address,
                DevAccount {
                    password,
                    unlocked: false,
                    balance,
                },
            );
        }
        DevChain {
            state: Mutex::new(state),
            options: self.options,
        }
    }
}

#[async_trait]
impl ProtocolClient for DevChain {
    async fn list_accounts(&self) -> ClientResult<Vec<Address>> {
        Ok(self.state.lock().order.clone())
    }

    async fn unlock(&self, address: &Address, password: &str) -> ClientResult<bool> {
        let mut state = self.state.lock();
        state.unlock_attempts += 1;
        let Some(account) = state.accounts.get_mut(address) else {
            return Ok(false);
        };
        if account.password == password {
            account.unlocked = true;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn balance(&self, address: &Address) -> ClientResult<TokenAmount> {
        let state = self.state.lock();
        Ok(TokenAmount(
            state.accounts.get(address).map(|a| a.balance).unwrap_or(0),
        ))
    }

    async fn request_funds(&self, address: &Address, amount: TokenAmount) -> ClientResult<TxHandle> {
        if self.options.fail_requests {
            return Err(ClientError::Rpc {
                code: -32000,
                message: "dispenser unavailable".into(),
            });
        }

        let mut state = self.state.lock();
        let account = state
            .accounts
            .get(address)
            .ok_or_else(|| ClientError::UnknownAccount(address.to_hex()))?;
        if !account.unlocked {
            return Err(ClientError::Rpc {
                code: -32000,
                message: "authentication needed: password or unlock".into(),
            });
        }

        let tx = Self::next_tx(&mut state);
        state.requests += 1;
        state.pending.insert(
            tx,
            PendingTx {
                to: *address,
                amount: amount.0,
                polls_left: self.options.confirmation_polls,
            },
        );
        debug!("dev chain: {} requests {} token as {}", address.short(), amount, tx);
        Ok(tx)
    }

    async fn transaction_receipt(&self, tx: &TxHandle) -> ClientResult<Option<Receipt>> {
        let mut state = self.state.lock();
        if let Some(receipt) = state.mined.get(tx) {
            return Ok(Some(receipt.clone()));
        }
        if self.options.stall_mining {
            return Ok(None);
        }

        let Some(pending) = state.pending.get_mut(tx) else {
            return Ok(None);
        };
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return Ok(None);
        }

        let Some(pending) = state.pending.remove(tx) else {
            return Ok(None);
        };
        state.block_number += 1;
        let status = if pending.amount > self.options.dispenser_cap {
            ReceiptStatus::Reverted
        } else {
            if let Some(account) = state.accounts.get_mut(&pending.to) {
                account.balance = account.balance.saturating_add(pending.amount);
            }
            ReceiptStatus::Success
        };

        let receipt = Receipt {
            tx: *tx,
            block_number: Some(state.block_number),
            status,
        };
        state.mined.insert(*tx, receipt.clone());
        Ok(Some(receipt))
    }

    fn name(&self) -> &str {
        "dev-chain"
    }
}
