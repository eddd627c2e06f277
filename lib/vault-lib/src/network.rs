//! Chain access consumed by the core.
//!
//! Implementations perform a single request per call and never retry, failures
//! surface as [`NetworkError`] so callers can tell them apart from
//! deterministic errors.

use async_trait::async_trait;
use solana_program::{hash::Hash, message::AddressLookupTableAccount};
use solana_pubkey::Pubkey;
use std::sync::Arc;
use thiserror::Error as ThisError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(ThisError, Debug, Clone)]
pub enum NetworkError {
    #[error("lookup table {0} not found")]
    LookupTableNotFound(Pubkey),
    #[error("invalid lookup table {address}: {reason}")]
    InvalidLookupTable { address: Pubkey, reason: String },
    #[error("rpc request failed: {source}")]
    Rpc {
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl NetworkError {
    pub fn rpc(error: impl Into<BoxError>) -> Self {
        Self::Rpc {
            source: Arc::from(error.into()),
        }
    }
}

#[async_trait]
pub trait AccountFetcher: Send + Sync {
    /// Raw account data, `None` if the account does not exist.
    async fn fetch(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, NetworkError>;
}

#[async_trait]
pub trait LookupTableResolver: Send + Sync {
    /// Contents of `tables`, in the same order.
    async fn resolve(
        &self,
        tables: &[Pubkey],
    ) -> Result<Vec<AddressLookupTableAccount>, NetworkError>;

    async fn latest_blockhash(&self) -> Result<Hash, NetworkError>;
}

#[async_trait]
impl<T: AccountFetcher + ?Sized> AccountFetcher for Arc<T> {
    async fn fetch(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, NetworkError> {
        (**self).fetch(address).await
    }
}

#[async_trait]
impl<T: LookupTableResolver + ?Sized> LookupTableResolver for Arc<T> {
    async fn resolve(
        &self,
        tables: &[Pubkey],
    ) -> Result<Vec<AddressLookupTableAccount>, NetworkError> {
        (**self).resolve(tables).await
    }

    async fn latest_blockhash(&self) -> Result<Hash, NetworkError> {
        (**self).latest_blockhash().await
    }
}
