//! Deterministic addresses of a vault and its sub-accounts.
//!
//! Every address is a program-derived address of the vault program:
//!
//! | account            | seeds                                  |
//! |--------------------|----------------------------------------|
//! | state              | `"state"`, owner, identity key         |
//! | vault (custody)    | `"vault"`, state                       |
//! | metadata           | `"metadata"`, state                    |
//! | share class mint   | `"share"`, `[index]`, state            |

use crate::state::StateModel;
use sha2::{Digest, Sha256};
use solana_pubkey::Pubkey;
use thiserror::Error as ThisError;

pub const SEED_STATE: &[u8] = b"state";
pub const SEED_VAULT: &[u8] = b"vault";
pub const SEED_METADATA: &[u8] = b"metadata";
pub const SEED_SHARE: &[u8] = b"share";

/// First 8 bytes of `sha256(name)`, fixed at creation time.
pub type IdentityKey = [u8; 8];

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum DeriveError {
    #[error("no viable bump for seed \"{seed}\" under program {program_id}")]
    NoViableBump { program_id: Pubkey, seed: String },
    #[error("share class index {0} is out of range, a vault has at most 256 share classes")]
    ShareClassIndexOutOfRange(usize),
    #[error("state has neither an identity key nor a name")]
    MissingIdentity,
}

pub fn identity_key_from_name(name: &str) -> IdentityKey {
    let hash = Sha256::digest(name.as_bytes());
    let mut key = IdentityKey::default();
    key.copy_from_slice(&hash[..8]);
    key
}

fn find(program_id: &Pubkey, seeds: &[&[u8]]) -> Result<(Pubkey, u8), DeriveError> {
    Pubkey::try_find_program_address(seeds, program_id).ok_or_else(|| DeriveError::NoViableBump {
        program_id: *program_id,
        seed: String::from_utf8_lossy(seeds[0]).into_owned(),
    })
}

/// Derive `[label, index?, root]` under `program_id`.
pub fn derive(
    program_id: &Pubkey,
    label: &[u8],
    root: &Pubkey,
    index: Option<u8>,
) -> Result<(Pubkey, u8), DeriveError> {
    match index {
        Some(index) => find(program_id, &[label, &[index], root.as_ref()]),
        None => find(program_id, &[label, root.as_ref()]),
    }
}

pub fn find_state_pda(
    program_id: &Pubkey,
    owner: &Pubkey,
    key: &IdentityKey,
) -> Result<(Pubkey, u8), DeriveError> {
    find(program_id, &[SEED_STATE, owner.as_ref(), key])
}

/// State address of `model`.
///
/// Uses the identity key stored in `model.created` when there is one, and only
/// hashes the name for a vault that was never created.
pub fn find_state_pda_for_model(
    program_id: &Pubkey,
    owner: &Pubkey,
    model: &StateModel,
) -> Result<Pubkey, DeriveError> {
    let key = model.identity_key().ok_or(DeriveError::MissingIdentity)?;
    Ok(find_state_pda(program_id, owner, &key)?.0)
}

pub fn find_vault_pda(program_id: &Pubkey, state: &Pubkey) -> Result<(Pubkey, u8), DeriveError> {
    derive(program_id, SEED_VAULT, state, None)
}

pub fn find_metadata_pda(
    program_id: &Pubkey,
    state: &Pubkey,
) -> Result<(Pubkey, u8), DeriveError> {
    derive(program_id, SEED_METADATA, state, None)
}

/// Indices past 255 are rejected rather than wrapped, wrapping would alias
/// share class 0.
pub fn find_mint_pda(
    program_id: &Pubkey,
    state: &Pubkey,
    index: usize,
) -> Result<(Pubkey, u8), DeriveError> {
    let byte = u8::try_from(index).map_err(|_| DeriveError::ShareClassIndexOutOfRange(index))?;
    derive(program_id, SEED_SHARE, state, Some(byte))
}

/// All addresses of one vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultAddresses {
    pub state: Pubkey,
    pub vault: Pubkey,
    pub metadata: Pubkey,
    pub mints: Vec<Pubkey>,
}

impl VaultAddresses {
    pub fn derive(
        program_id: &Pubkey,
        state: Pubkey,
        share_classes: usize,
    ) -> Result<Self, DeriveError> {
        Ok(Self {
            state,
            vault: find_vault_pda(program_id, &state)?.0,
            metadata: find_metadata_pda(program_id, &state)?.0,
            mints: (0..share_classes)
                .map(|index| find_mint_pda(program_id, &state, index).map(|(pk, _)| pk))
                .collect::<Result<_, _>>()?,
        })
    }
}
