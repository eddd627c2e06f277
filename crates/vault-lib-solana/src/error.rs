use crate::utils::{
    find_failed_instruction, preflight_logs, program_error_message, verbose_solana_error,
};
use solana_rpc_client_api::{
    client_error::{Error as ClientError, ErrorKind as ClientErrorKind},
    request::RpcError,
};
use std::sync::Arc;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone)]
pub enum Error {
    #[error(transparent)]
    Vault(#[from] vault_lib::Error),
    #[error("{}", verbose_solana_error(.error))]
    Solana {
        #[source]
        error: Arc<ClientError>,
        inserted: usize,
    },
}

impl From<vault_lib::network::NetworkError> for Error {
    fn from(value: vault_lib::network::NetworkError) -> Self {
        Error::Vault(value.into())
    }
}

impl Error {
    /// `inserted` is the number of instructions the assembler prepended.
    pub fn solana(error: ClientError, inserted: usize) -> Self {
        Self::Solana {
            error: Arc::new(error),
            inserted,
        }
    }

    /// Index of the failed instruction among the caller's instructions.
    pub fn failed_instruction(&self) -> Option<usize> {
        match self {
            Error::Solana { error, inserted } => {
                find_failed_instruction(error)?.checked_sub(*inserted)
            }
            _ => None,
        }
    }

    pub fn program_error_message(&self) -> Option<String> {
        match self {
            Error::Solana { error, .. } => program_error_message(preflight_logs(error)?),
            _ => None,
        }
    }

    /// A response from the cluster rejecting the transaction is final,
    /// transport failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Vault(error) => error.is_transient(),
            Error::Solana { error, .. } => !matches!(
                &error.kind,
                ClientErrorKind::RpcError(RpcError::RpcResponseError { .. })
                    | ClientErrorKind::TransactionError(_)
                    | ClientErrorKind::SigningError(_)
            ),
        }
    }
}
