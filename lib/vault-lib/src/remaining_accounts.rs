//! Trailing accounts the program walks to value a vault.
//!
//! The program reads these by position only. For every asset, in the order of
//! the vault's asset list, it expects the vault's custody account followed by
//! the asset's price reference; withdrawals additionally carry the signer's
//! destination account for assets that pay out. The vault's external accounts
//! follow last, in their stored order.

use crate::registry::{AssetMeta, AssetRegistry};
use solana_program::instruction::{AccountMeta, Instruction};
use solana_pubkey::Pubkey;
use spl_associated_token_account_client::{
    address::get_associated_token_address_with_program_id,
    instruction::create_associated_token_account_idempotent,
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ComposeError {
    #[error("no pricing account registered for asset {0}")]
    MissingPricing(Pubkey),
}

/// Token custody addressing, associated token accounts by default.
pub trait CustodyAddressing {
    fn custody_account(&self, owner: &Pubkey, asset: &Pubkey, token_program: &Pubkey) -> Pubkey;

    /// Instruction creating the custody account, a no-op if it already exists.
    fn create_idempotent(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        asset: &Pubkey,
        token_program: &Pubkey,
    ) -> Instruction;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AssociatedTokenCustody;

impl CustodyAddressing for AssociatedTokenCustody {
    fn custody_account(&self, owner: &Pubkey, asset: &Pubkey, token_program: &Pubkey) -> Pubkey {
        get_associated_token_address_with_program_id(owner, asset, token_program)
    }

    fn create_idempotent(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        asset: &Pubkey,
        token_program: &Pubkey,
    ) -> Instruction {
        create_associated_token_account_idempotent(payer, owner, asset, token_program)
    }
}

/// Ordered account list, never sorted or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemainingAccounts(Vec<AccountMeta>);

impl RemainingAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_readonly(&mut self, pubkey: Pubkey) {
        self.0.push(AccountMeta::new_readonly(pubkey, false));
    }

    pub fn push_writable(&mut self, pubkey: Pubkey) {
        self.0.push(AccountMeta::new(pubkey, false));
    }

    pub fn as_slice(&self) -> &[AccountMeta] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pubkeys(&self) -> impl Iterator<Item = Pubkey> + '_ {
        self.0.iter().map(|meta| meta.pubkey)
    }

    /// Append to an instruction's account list.
    pub fn append_to(self, instruction: &mut Instruction) {
        instruction.accounts.extend(self.0);
    }
}

impl From<RemainingAccounts> for Vec<AccountMeta> {
    fn from(value: RemainingAccounts) -> Self {
        value.0
    }
}

impl IntoIterator for RemainingAccounts {
    type Item = AccountMeta;
    type IntoIter = std::vec::IntoIter<AccountMeta>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// What composing needs besides the asset lists.
pub struct Composer<'a> {
    /// The vault's custody account (the "vault" PDA), owner of the custody token accounts.
    pub vault: Pubkey,
    pub registry: &'a dyn AssetRegistry,
    pub custody: &'a dyn CustodyAddressing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithdrawalAccounts {
    pub remaining: RemainingAccounts,
    /// Idempotent creation of the signer's destination accounts, in asset order.
    pub pre_instructions: Vec<Instruction>,
    pub destinations: Vec<Pubkey>,
}

impl Composer<'_> {
    fn lookup(&self, asset: &Pubkey) -> Result<(AssetMeta, Pubkey), ComposeError> {
        self.registry
            .lookup(asset)
            .and_then(|meta| Some((meta, meta.price_reference()?)))
            .ok_or(ComposeError::MissingPricing(*asset))
    }

    /// `[custody(a0), price(a0), .., custody(an), price(an), e0, .., em]`, all read-only.
    pub fn compose_for_pricing(
        &self,
        assets: &[Pubkey],
        external: &[Pubkey],
    ) -> Result<RemainingAccounts, ComposeError> {
        let mut accounts = RemainingAccounts::new();
        for asset in assets {
            let (meta, price) = self.lookup(asset)?;
            accounts.push_readonly(
                self.custody
                    .custody_account(&self.vault, asset, &meta.token_program),
            );
            accounts.push_readonly(price);
        }
        for pubkey in external {
            accounts.push_readonly(*pubkey);
        }
        Ok(accounts)
    }

    /// Like [`compose_for_pricing`][Self::compose_for_pricing] with writable
    /// custody, plus the signer's destination after each asset that pays out:
    /// every asset when `in_kind`, only the first otherwise.
    pub fn compose_for_withdrawal(
        &self,
        assets: &[Pubkey],
        external: &[Pubkey],
        signer: &Pubkey,
        in_kind: bool,
    ) -> Result<WithdrawalAccounts, ComposeError> {
        let mut remaining = RemainingAccounts::new();
        let mut pre_instructions = Vec::new();
        let mut destinations = Vec::new();
        for (index, asset) in assets.iter().enumerate() {
            let (meta, price) = self.lookup(asset)?;
            remaining.push_writable(
                self.custody
                    .custody_account(&self.vault, asset, &meta.token_program),
            );
            remaining.push_readonly(price);
            if in_kind || index == 0 {
                let destination = self
                    .custody
                    .custody_account(signer, asset, &meta.token_program);
                remaining.push_writable(destination);
                pre_instructions.push(self.custody.create_idempotent(
                    signer,
                    signer,
                    asset,
                    &meta.token_program,
                ));
                destinations.push(destination);
            }
        }
        for pubkey in external {
            remaining.push_readonly(*pubkey);
        }
        Ok(WithdrawalAccounts {
            remaining,
            pre_instructions,
            destinations,
        })
    }
}
