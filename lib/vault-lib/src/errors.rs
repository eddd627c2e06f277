use crate::{
    assembler::AssembleError, codec::DecodeError, config::ConfigError, enrich::EnrichError,
    network::NetworkError, pda::DeriveError, remaining_accounts::ComposeError,
};
use solana_program::program_error::ProgramError;
use solana_pubkey::Pubkey;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone)]
pub enum Error {
    #[error(transparent)]
    Derive(#[from] DeriveError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Enrich(#[from] EnrichError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build instruction: {0}")]
    Program(#[from] ProgramError),
    #[error("account {0} not found")]
    AccountNotFound(Pubkey),
}

impl Error {
    /// Network failures may succeed when retried, everything else is
    /// deterministic.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        let pk = Pubkey::new_unique();
        assert!(Error::from(NetworkError::LookupTableNotFound(pk)).is_transient());
        assert!(Error::from(NetworkError::rpc("connection reset")).is_transient());
        assert!(!Error::from(DeriveError::ShareClassIndexOutOfRange(256)).is_transient());
        assert!(!Error::from(ComposeError::MissingPricing(pk)).is_transient());
        assert!(!Error::AccountNotFound(pk).is_transient());
        assert_eq!(
            Error::from(ComposeError::MissingPricing(pk)).to_string(),
            format!("no pricing account registered for asset {pk}")
        );
    }
}
