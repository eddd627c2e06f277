//! Solana RPC side of the vault client.
//!
//! - [`rpc`]: [`RpcNetwork`], the RPC implementation of the chain access traits.
//! - [`client`]: [`VaultClient`], fetching vaults and building their transactions.
//! - [`utils`]: rendering of RPC and program errors.
//! - [`logging`]: `RUST_LOG` filtered tracing output.

pub mod client;
pub mod error;
pub mod logging;
pub mod rpc;
pub mod utils;

pub use client::VaultClient;
pub use error::Error;
pub use logging::init_tracing;
pub use rpc::{RpcNetwork, build_client};
pub use vault_lib;
