//! Onboard Chain - Protocol clients for onboarding runs
//!
//! Two implementations of [`onboard_core::ProtocolClient`]:
//!
//! - [`JsonRpcClient`] talks JSON-RPC over HTTP to an Ethereum-style node
//!   with a token contract and a dispenser contract deployed.
//! - [`DevChain`] is an in-process simulated node for local runs and tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use onboard_chain::JsonRpcClient;
//! use onboard_core::{NetworkConfig, ProtocolClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = NetworkConfig::default();
//!     config.token_address = Some("0x967da4048cd07ab37855c090aaf366e4ce1b9f48".parse()?);
//!     config.dispenser_address = Some("0x1f25d8f4b0a6d2a7e5e4a2c1b3f0b1f1d0c2a3e4".parse()?);
//!
//!     let client = JsonRpcClient::new(&config)?;
//!     for account in client.list_accounts().await? {
//!         println!("{} holds {}", account, client.balance(&account).await?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod dev;
pub mod rpc;

pub use dev::{DevChain, DevChainBuilder, DevChainOptions};
pub use rpc::JsonRpcClient;
