//! RPC backed chain access.

use crate::{Error, utils::decode_lookup_table};
use async_trait::async_trait;
use solana_commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_program::{hash::Hash, message::AddressLookupTableAccount};
use solana_pubkey::Pubkey;
use solana_rpc_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::{
    config::RpcProgramAccountsConfig,
    filter::{Memcmp, RpcFilterType},
};
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use std::{sync::Arc, time::Duration};
use vault_lib::{
    ClientConfig,
    network::{AccountFetcher, LookupTableResolver, NetworkError},
};

/// `getMultipleAccounts` accepts at most this many addresses.
const MAX_MULTIPLE_ACCOUNTS: usize = 100;

pub fn build_client(url: String) -> RpcClient {
    RpcClient::new_with_timeouts_and_commitment(
        url,
        Duration::from_secs(30),
        CommitmentConfig {
            commitment: CommitmentLevel::Confirmed,
        },
        Duration::from_secs(180),
    )
}

#[derive(Clone)]
pub struct RpcNetwork {
    rpc: Arc<RpcClient>,
}

impl RpcNetwork {
    pub fn new(rpc: Arc<RpcClient>) -> Self {
        Self { rpc }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(Arc::new(build_client(config.rpc_url())))
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Raw data of every account owned by `program_id` starting with `discriminator`.
    pub async fn program_accounts(
        &self,
        program_id: &Pubkey,
        discriminator: &[u8],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>, NetworkError> {
        let accounts = self
            .rpc
            .get_program_accounts_with_config(
                program_id,
                RpcProgramAccountsConfig {
                    filters: Some(vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                        0,
                        discriminator,
                    ))]),
                    ..Default::default()
                },
            )
            .await
            .map_err(NetworkError::rpc)?;
        tracing::debug!("{} accounts owned by {}", accounts.len(), program_id);
        Ok(accounts
            .into_iter()
            .map(|(pubkey, account)| (pubkey, account.data))
            .collect())
    }

    /// Submit and wait for confirmation. `inserted` shifts failed instruction
    /// indices back to the caller's numbering.
    pub async fn send_and_confirm(
        &self,
        tx: &VersionedTransaction,
        inserted: usize,
    ) -> Result<Signature, Error> {
        let signature = self
            .rpc
            .send_and_confirm_transaction(tx)
            .await
            .map_err(move |error| Error::solana(error, inserted))?;
        tracing::info!("confirmed {}", signature);
        Ok(signature)
    }
}

#[async_trait]
impl AccountFetcher for RpcNetwork {
    async fn fetch(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, NetworkError> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.rpc.commitment())
            .await
            .map_err(NetworkError::rpc)?;
        Ok(response.value.map(|account| account.data))
    }
}

#[async_trait]
impl LookupTableResolver for RpcNetwork {
    async fn resolve(
        &self,
        tables: &[Pubkey],
    ) -> Result<Vec<AddressLookupTableAccount>, NetworkError> {
        let mut result = Vec::with_capacity(tables.len());
        for chunk in tables.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let accounts = self
                .rpc
                .get_multiple_accounts(chunk)
                .await
                .map_err(NetworkError::rpc)?;
            for (address, account) in chunk.iter().zip(accounts) {
                let account = account.ok_or(NetworkError::LookupTableNotFound(*address))?;
                let table = decode_lookup_table(address, &account.data).map_err(|error| {
                    NetworkError::InvalidLookupTable {
                        address: *address,
                        reason: error.to_string(),
                    }
                })?;
                result.push(table);
            }
        }
        Ok(result)
    }

    async fn latest_blockhash(&self) -> Result<Hash, NetworkError> {
        self.rpc
            .get_latest_blockhash()
            .await
            .map_err(NetworkError::rpc)
    }
}
