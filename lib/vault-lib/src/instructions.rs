//! Vault program instructions.
//!
//! Data is the 8-byte anchor discriminator `sha256("global:<name>")[..8]`
//! followed by the borsh encoded arguments.

use crate::{
    codec::{MetadataField, RawField},
    pda::IdentityKey,
    registry::{TOKEN_2022_PROGRAM_ID, WSOL},
    remaining_accounts::RemainingAccounts,
};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
};
use solana_pubkey::Pubkey;
use spl_associated_token_account_client::{
    address::get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};

pub fn anchor_discriminator(name: &str) -> [u8; 8] {
    let preimage = format!("global:{}", name);
    let hash = solana_program::hash::hash(preimage.as_bytes());
    let mut disc = [0u8; 8];
    disc.copy_from_slice(&hash.to_bytes()[..8]);
    disc
}

fn instruction_data<T: BorshSerialize>(
    name: &str,
    args: &T,
) -> Result<Vec<u8>, ProgramError> {
    let mut data = anchor_discriminator(name).to_vec();
    data.extend(borsh::to_vec(args)?);
    Ok(data)
}

/// Share tokens live in token-2022 accounts.
pub fn share_token_account(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, &TOKEN_2022_PROGRAM_ID)
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq)]
pub struct MetadataArgs {
    pub company: Vec<MetadataField>,
    pub fund: Vec<MetadataField>,
    pub share_classes: Vec<Vec<MetadataField>>,
    pub fund_managers: Vec<Vec<MetadataField>>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct InitializeStateArgs {
    pub key: IdentityKey,
    pub params: Vec<Vec<RawField>>,
    pub metadata: Option<MetadataArgs>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct UpdateStateArgs {
    pub params: Vec<Vec<RawField>>,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeArgs {
    pub share_class: u8,
    pub amount: u64,
    pub skip_state: bool,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemArgs {
    pub amount: u64,
    pub in_kind: bool,
    pub skip_state: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeStateAccounts {
    pub state: Pubkey,
    pub vault: Pubkey,
    pub metadata: Pubkey,
    pub signer: Pubkey,
    pub mints: Vec<Pubkey>,
}

pub fn initialize_state(
    program_id: &Pubkey,
    keys: &InitializeStateAccounts,
    args: &InitializeStateArgs,
) -> Result<Instruction, ProgramError> {
    let accounts = std::iter::empty()
        .chain([
            AccountMeta::new(keys.state, false),            // state
            AccountMeta::new(keys.vault, false),            // vault
            AccountMeta::new(keys.signer, true),            // signer
            AccountMeta::new(keys.metadata, false),         // metadata
            AccountMeta::new_readonly(solana_system_interface::program::ID, false),
            AccountMeta::new_readonly(TOKEN_2022_PROGRAM_ID, false),
        ])
        .chain(keys.mints.iter().map(|mint| AccountMeta::new(*mint, false)))
        .collect();

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: instruction_data("initialize_state", args)?,
    })
}

pub fn update_state(
    program_id: &Pubkey,
    state: &Pubkey,
    signer: &Pubkey,
    args: &UpdateStateArgs,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*state, false), // state
            AccountMeta::new(*signer, true), // signer
        ],
        data: instruction_data("update_state", args)?,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeAccounts {
    pub state: Pubkey,
    pub vault: Pubkey,
    pub share_mint: Pubkey,
    /// Deposited asset.
    pub asset: Pubkey,
    pub asset_token_program: Pubkey,
    pub signer: Pubkey,
}

/// Deposit `args.amount` of `keys.asset`. `pricing` comes from
/// [`Composer::compose_for_pricing`](crate::remaining_accounts::Composer::compose_for_pricing).
pub fn subscribe(
    program_id: &Pubkey,
    keys: &SubscribeAccounts,
    args: &SubscribeArgs,
    pricing: RemainingAccounts,
) -> Result<Instruction, ProgramError> {
    let vault_asset = get_associated_token_address_with_program_id(
        &keys.vault,
        &keys.asset,
        &keys.asset_token_program,
    );
    let signer_asset = get_associated_token_address_with_program_id(
        &keys.signer,
        &keys.asset,
        &keys.asset_token_program,
    );
    let mut instruction = Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(keys.state, false),
            AccountMeta::new(keys.vault, false),
            AccountMeta::new(keys.share_mint, false),
            AccountMeta::new(share_token_account(&keys.signer, &keys.share_mint), false),
            AccountMeta::new(keys.asset, false),
            AccountMeta::new(vault_asset, false),
            AccountMeta::new(signer_asset, false),
            AccountMeta::new(keys.signer, true),
            AccountMeta::new_readonly(solana_system_interface::program::ID, false),
            AccountMeta::new_readonly(spl_associated_token_account_client::program::ID, false),
            AccountMeta::new_readonly(keys.asset_token_program, false),
            AccountMeta::new_readonly(TOKEN_2022_PROGRAM_ID, false),
        ],
        data: instruction_data("subscribe", args)?,
    };
    pricing.append_to(&mut instruction);
    Ok(instruction)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemAccounts {
    pub state: Pubkey,
    pub vault: Pubkey,
    pub share_mint: Pubkey,
    pub signer: Pubkey,
}

/// Burn `args.amount` shares. `withdrawal` comes from
/// [`Composer::compose_for_withdrawal`](crate::remaining_accounts::Composer::compose_for_withdrawal).
pub fn redeem(
    program_id: &Pubkey,
    keys: &RedeemAccounts,
    args: &RedeemArgs,
    withdrawal: RemainingAccounts,
) -> Result<Instruction, ProgramError> {
    let mut instruction = Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(keys.state, false),
            AccountMeta::new(keys.share_mint, false),
            AccountMeta::new(share_token_account(&keys.signer, &keys.share_mint), false),
            AccountMeta::new(keys.signer, true),
            AccountMeta::new_readonly(keys.vault, false),
            AccountMeta::new_readonly(spl_token::ID, false),
            AccountMeta::new_readonly(TOKEN_2022_PROGRAM_ID, false),
        ],
        data: instruction_data("redeem", args)?,
    };
    withdrawal.append_to(&mut instruction);
    Ok(instruction)
}

/// Wrap `lamports` into the owner's wSOL account, creating it if needed.
pub fn wrap_sol(owner: &Pubkey, lamports: u64) -> Result<Vec<Instruction>, ProgramError> {
    let account = get_associated_token_address_with_program_id(owner, &WSOL, &spl_token::ID);
    Ok(vec![
        create_associated_token_account_idempotent(owner, owner, &WSOL, &spl_token::ID),
        solana_system_interface::instruction::transfer(owner, &account, lamports),
        spl_token::instruction::sync_native(&spl_token::ID, &account)?,
    ])
}

/// Close the owner's wSOL account, returning its lamports to the owner.
pub fn unwrap_sol(owner: &Pubkey) -> Result<Instruction, ProgramError> {
    let account = get_associated_token_address_with_program_id(owner, &WSOL, &spl_token::ID);
    spl_token::instruction::close_account(&spl_token::ID, &account, owner, owner, &[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{FieldName, FieldValue};

    #[test]
    fn test_discriminator() {
        let expected = &solana_program::hash::hash(b"global:subscribe").to_bytes()[..8];
        assert_eq!(anchor_discriminator("subscribe"), expected);
        assert_ne!(
            anchor_discriminator("subscribe"),
            anchor_discriminator("redeem")
        );
    }

    #[test]
    fn test_update_state_data() {
        let program_id = Pubkey::new_unique();
        let state = Pubkey::new_unique();
        let signer = Pubkey::new_unique();
        let args = UpdateStateArgs {
            params: vec![vec![RawField::new(
                FieldName::IsEnabled,
                FieldValue::Boolean(false),
            )]],
        };
        let ix = update_state(&program_id, &state, &signer, &args).unwrap();
        assert_eq!(ix.program_id, program_id);
        assert_eq!(
            ix.accounts,
            [AccountMeta::new(state, false), AccountMeta::new(signer, true)]
        );
        assert_eq!(ix.data[..8], anchor_discriminator("update_state"));
        assert_eq!(
            UpdateStateArgs::try_from_slice(&ix.data[8..]).unwrap(),
            args
        );
    }

    #[test]
    fn test_redeem_appends_remaining() {
        let program_id = Pubkey::new_unique();
        let keys = RedeemAccounts {
            state: Pubkey::new_unique(),
            vault: Pubkey::new_unique(),
            share_mint: Pubkey::new_unique(),
            signer: Pubkey::new_unique(),
        };
        let mut remaining = RemainingAccounts::new();
        let custody = Pubkey::new_unique();
        let price = Pubkey::new_unique();
        remaining.push_writable(custody);
        remaining.push_readonly(price);
        let args = RedeemArgs {
            amount: 10,
            in_kind: true,
            skip_state: true,
        };

        let ix = redeem(&program_id, &keys, &args, remaining).unwrap();
        assert_eq!(ix.accounts.len(), 9);
        assert_eq!(ix.accounts[7], AccountMeta::new(custody, false));
        assert_eq!(ix.accounts[8], AccountMeta::new_readonly(price, false));
        assert_eq!(ix.data[8..], borsh::to_vec(&args).unwrap());
    }

    #[test]
    fn test_wrap_sol() {
        let owner = Pubkey::new_unique();
        let wrap = wrap_sol(&owner, 1_000_000).unwrap();
        assert_eq!(wrap.len(), 3);
        assert_eq!(wrap[0].program_id, spl_associated_token_account_client::program::ID);
        // CreateIdempotent
        assert_eq!(wrap[0].data, [1]);
        assert_eq!(wrap[1].program_id, solana_system_interface::program::ID);
        assert_eq!(wrap[2].program_id, spl_token::ID);

        let close = unwrap_sol(&owner).unwrap();
        assert_eq!(close.program_id, spl_token::ID);
        assert_eq!(close.accounts[0].pubkey, wrap[1].accounts[1].pubkey);
    }
}
