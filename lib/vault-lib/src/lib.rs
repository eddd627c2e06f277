//! Client core of the vault program.
//!
//! Table of contents:
//! - [`pda`]: addresses of a vault and its sub-accounts.
//! - [`state`]: typed vault and metadata models.
//! - [`codec`]: tagged field lists and account layouts.
//! - [`enrich`]: defaults filled in before creation.
//! - [`registry`]: per-asset token program and pricing accounts.
//! - [`remaining_accounts`]: positional accounts for pricing and withdrawals.
//! - [`instructions`]: vault program instructions.
//! - [`assembler`]: v0 transaction assembly.
//! - [`network`]: chain access the assembler and clients consume.
//! - [`config`]: client configuration.

pub mod assembler;
pub mod codec;
pub mod config;
pub mod enrich;
pub mod errors;
pub mod instructions;
pub mod network;
pub mod pda;
pub mod registry;
pub mod remaining_accounts;
pub mod state;

pub use assembler::{Assembler, SignableTransaction, TxOptions};
pub use config::{ClientConfig, SolanaNet};
pub use errors::Error;
pub use network::{AccountFetcher, BoxError, LookupTableResolver};
pub use state::StateModel;
