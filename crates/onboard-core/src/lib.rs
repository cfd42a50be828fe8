//! Onboard Core - Users, credentials and token funding for a data-exchange chain
//!
//! This crate holds the pieces of an onboarding run that do not depend on a
//! particular node: the credential table, user synthesis, the funding driver
//! and the [`ProtocolClient`] trait they drive.
//!
//! # Modules
//!
//! - [`address`] - Account addresses and transaction hashes
//! - [`token`] - Token amounts
//! - [`credentials`] - Address → password table loaded from a file
//! - [`user`] - Simulated users, roles and unlock state
//! - [`names`] - Display name generation
//! - [`client`] - The protocol client trait and receipts
//! - [`synth`] - Building users from accounts and unlocking them
//! - [`funding`] - Requesting tokens for empty accounts
//! - [`profile`] - Per-user profile files
//! - [`config`] - Configuration types
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use onboard_core::{synthesize_users, Credentials, FundingDriver, OnboardConfig};
//! use rand::thread_rng;
//!
//! let config = OnboardConfig::default();
//! let credentials = Credentials::load(&config.credentials.path)?;
//! let accounts = client.list_accounts().await?;
//!
//! let mut users = synthesize_users(&client, &accounts, &credentials, 4, &mut thread_rng()).await;
//! FundingDriver::new(&client, config.funding.clone())?
//!     .run(&mut users, &mut thread_rng())
//!     .await?;
//! ```

pub mod address;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod funding;
pub mod names;
pub mod profile;
pub mod synth;
pub mod token;
pub mod user;

// Re-exports for convenience
pub use address::{Address, AddressError, TxHandle};
pub use client::{ClientResult, ConfirmationPolicy, ProtocolClient, Receipt, ReceiptStatus};
pub use config::{
    CredentialsConfig, Deployment, FundingConfig, LogFormat, LogLevel, LoggingConfig,
    NetworkConfig, OnboardConfig, ProfileConfig, SimulationConfig,
};
pub use credentials::Credentials;
pub use error::{ClientError, ConfigError, FundingError, OnboardError, Result, UnlockError};
pub use funding::{refresh_balances, FundingAction, FundingDriver, FundingOutcome, FundingReport};
pub use profile::{ProfileStore, UserProfile};
pub use synth::{synthesize_users, unlock_user};
pub use token::TokenAmount;
pub use user::{unlocked, Role, UnlockState, User};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
