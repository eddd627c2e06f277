//! Transaction assembly.
//!
//! An envelope is built fresh for every call: pre-instructions, the main
//! instructions and post-instructions, in that order, optionally preceded by
//! compute budget instructions. The result is a v0 message ready to be signed.

use crate::{Error, network::LookupTableResolver};
use borsh::BorshDeserialize;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_program::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::{AddressLookupTableAccount, CompileError, Message, VersionedMessage, v0},
};
use solana_pubkey::{Pubkey, pubkey};
use solana_signature::Signature;
use solana_signer::{SignerError, signers::Signers};
use solana_transaction::{Transaction, versioned::VersionedTransaction};
use std::sync::Arc;
use thiserror::Error as ThisError;

/// Largest serialized transaction that fits in a packet.
pub const MAX_TRANSACTION_SIZE: usize = 1232;

pub const JITO_TIP_ACCOUNT: Pubkey = pubkey!("96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5");

#[derive(ThisError, Debug, Clone)]
pub enum AssembleError {
    #[error(transparent)]
    CompileError(#[from] Arc<CompileError>),
    #[error(transparent)]
    Signer(#[from] Arc<SignerError>),
    #[error("transaction is {size} bytes, the limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("failed to serialize transaction: {0}")]
    Serialize(Arc<bincode::Error>),
    #[error("legacy message has no fee payer")]
    EmptyLegacyMessage,
    #[error("legacy message references account index {0} out of range")]
    InvalidLegacyMessage(usize),
}

impl From<CompileError> for AssembleError {
    fn from(value: CompileError) -> Self {
        AssembleError::CompileError(Arc::new(value))
    }
}

impl From<SignerError> for AssembleError {
    fn from(value: SignerError) -> Self {
        AssembleError::Signer(Arc::new(value))
    }
}

/// Per-call options. Nothing is added to the envelope unless asked for here.
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct TxOptions {
    /// Fee payer and signer, replaces the default signer in every instruction.
    pub signer: Option<Pubkey>,
    #[builder(default)]
    pub pre_instructions: Vec<Instruction>,
    #[builder(default)]
    pub post_instructions: Vec<Instruction>,
    #[builder(default)]
    pub lookup_tables: Vec<Pubkey>,
    pub compute_unit_limit: Option<u32>,
    pub compute_unit_price: Option<u64>,
    pub jito_tip_lamports: Option<u64>,
}

fn is_set_compute_unit_limit(ix: &Instruction) -> Option<()> {
    if solana_compute_budget_interface::check_id(&ix.program_id) {
        let data = ComputeBudgetInstruction::try_from_slice(&ix.data)
            .map_err(|error| tracing::error!("could not decode instruction: {}", error))
            .ok()?;
        matches!(data, ComputeBudgetInstruction::SetComputeUnitLimit(_)).then_some(())
    } else {
        None
    }
}

fn is_set_compute_unit_price(ix: &Instruction) -> Option<()> {
    if solana_compute_budget_interface::check_id(&ix.program_id) {
        let data = ComputeBudgetInstruction::try_from_slice(&ix.data)
            .map_err(|error| tracing::error!("could not decode instruction: {}", error))
            .ok()?;
        matches!(data, ComputeBudgetInstruction::SetComputeUnitPrice(_)).then_some(())
    } else {
        None
    }
}

/// Prepend the requested compute budget instructions that are not already
/// present, returns how many were inserted.
pub fn insert_compute_budget(
    instructions: &mut Vec<Instruction>,
    compute_unit_limit: Option<u32>,
    compute_unit_price: Option<u64>,
) -> usize {
    let mut inserted = 0;

    if let Some(units) = compute_unit_limit
        && !instructions
            .iter()
            .any(|ix| is_set_compute_unit_limit(ix).is_some())
    {
        tracing::info!("setting compute unit limit {}", units);
        instructions.insert(0, ComputeBudgetInstruction::set_compute_unit_limit(units));
        inserted += 1;
    }

    if let Some(price) = compute_unit_price
        && !instructions
            .iter()
            .any(|ix| is_set_compute_unit_price(ix).is_some())
    {
        tracing::info!("adding priority fee {}", price);
        instructions.insert(0, ComputeBudgetInstruction::set_compute_unit_price(price));
        inserted += 1;
    }

    inserted
}

/// Rewrite signer accounts of `from` to `to`, returns how many were rewritten.
pub fn substitute_signer(instructions: &mut [Instruction], from: &Pubkey, to: &Pubkey) -> usize {
    let mut count = 0;
    for meta in instructions.iter_mut().flat_map(|ix| ix.accounts.iter_mut()) {
        if meta.is_signer && meta.pubkey == *from {
            meta.pubkey = *to;
            count += 1;
        }
    }
    count
}

/// Fee payer and instructions of a legacy message.
pub fn decompile_legacy(message: &Message) -> Result<(Pubkey, Vec<Instruction>), AssembleError> {
    let keys = &message.account_keys;
    let payer = *keys.first().ok_or(AssembleError::EmptyLegacyMessage)?;
    let signed = message.header.num_required_signatures as usize;
    let writable_signed =
        signed.saturating_sub(message.header.num_readonly_signed_accounts as usize);
    let writable_unsigned = keys
        .len()
        .saturating_sub(signed)
        .saturating_sub(message.header.num_readonly_unsigned_accounts as usize);

    let meta = |index: u8| -> Result<AccountMeta, AssembleError> {
        let index = usize::from(index);
        let pubkey = *keys
            .get(index)
            .ok_or(AssembleError::InvalidLegacyMessage(index))?;
        let is_signer = index < signed;
        let is_writable = if is_signer {
            index < writable_signed
        } else {
            index - signed < writable_unsigned
        };
        Ok(AccountMeta {
            pubkey,
            is_signer,
            is_writable,
        })
    };

    let instructions = message
        .instructions
        .iter()
        .map(|ix| {
            Ok(Instruction {
                program_id: meta(ix.program_id_index)?.pubkey,
                accounts: ix
                    .accounts
                    .iter()
                    .map(|index| meta(*index))
                    .collect::<Result<_, _>>()?,
                data: ix.data.clone(),
            })
        })
        .collect::<Result<Vec<_>, AssembleError>>()?;

    Ok((payer, instructions))
}

/// A compiled message waiting for signatures.
#[derive(Debug, Clone, PartialEq)]
pub struct SignableTransaction {
    pub message: VersionedMessage,
    /// Compute budget instructions prepended by the assembler. Failed
    /// instruction indices reported by the cluster are shifted by this much.
    pub inserted: usize,
}

impl SignableTransaction {
    pub fn compile(
        payer: &Pubkey,
        instructions: &[Instruction],
        lookups: &[AddressLookupTableAccount],
        blockhash: Hash,
    ) -> Result<Self, AssembleError> {
        let message = v0::Message::try_compile(payer, instructions, lookups, blockhash)?;
        let tx = Self {
            message: VersionedMessage::V0(message),
            inserted: 0,
        };
        let size = tx.serialized_size()?;
        tracing::debug!("compiled transaction, {} bytes", size);
        if size > MAX_TRANSACTION_SIZE {
            return Err(AssembleError::TooLarge {
                size,
                limit: MAX_TRANSACTION_SIZE,
            });
        }
        Ok(tx)
    }

    pub fn fee_payer(&self) -> Option<Pubkey> {
        self.message.static_account_keys().first().copied()
    }

    pub fn required_signers(&self) -> &[Pubkey] {
        let keys = self.message.static_account_keys();
        let count = (self.message.header().num_required_signatures as usize).min(keys.len());
        &keys[..count]
    }

    /// Transaction with placeholder signatures, for simulation or external signing.
    pub fn unsigned(&self) -> VersionedTransaction {
        VersionedTransaction {
            signatures: vec![Signature::default(); self.required_signers().len()],
            message: self.message.clone(),
        }
    }

    pub fn serialized_size(&self) -> Result<usize, AssembleError> {
        bincode::serialized_size(&self.unsigned())
            .map(|size| size as usize)
            .map_err(|error| AssembleError::Serialize(Arc::new(error)))
    }

    pub fn serialize_unsigned(&self) -> Result<Vec<u8>, AssembleError> {
        bincode::serialize(&self.unsigned())
            .map_err(|error| AssembleError::Serialize(Arc::new(error)))
    }

    pub fn sign<T: Signers + ?Sized>(
        self,
        signers: &T,
    ) -> Result<VersionedTransaction, AssembleError> {
        Ok(VersionedTransaction::try_new(self.message, signers)?)
    }
}

pub struct Assembler<N> {
    network: N,
    default_signer: Pubkey,
}

impl<N: LookupTableResolver> Assembler<N> {
    pub fn new(network: N, default_signer: Pubkey) -> Self {
        Self {
            network,
            default_signer,
        }
    }

    pub fn default_signer(&self) -> Pubkey {
        self.default_signer
    }

    /// Assemble instructions built for the default signer.
    pub async fn assemble(
        &self,
        instructions: Vec<Instruction>,
        options: TxOptions,
    ) -> Result<SignableTransaction, Error> {
        self.assemble_from(self.default_signer, instructions, options)
            .await
    }

    /// Re-assemble a legacy transaction as v0. Its fee payer stands in for the
    /// default signer.
    pub async fn assemble_legacy(
        &self,
        tx: &Transaction,
        options: TxOptions,
    ) -> Result<SignableTransaction, Error> {
        let (payer, instructions) = decompile_legacy(&tx.message)?;
        self.assemble_from(payer, instructions, options).await
    }

    async fn assemble_from(
        &self,
        base_signer: Pubkey,
        instructions: Vec<Instruction>,
        options: TxOptions,
    ) -> Result<SignableTransaction, Error> {
        let TxOptions {
            signer,
            pre_instructions,
            post_instructions,
            lookup_tables,
            compute_unit_limit,
            compute_unit_price,
            jito_tip_lamports,
        } = options;
        let signer = signer.unwrap_or(base_signer);

        let mut instructions = pre_instructions
            .into_iter()
            .chain(instructions)
            .chain(post_instructions)
            .collect::<Vec<_>>();
        if signer != base_signer {
            let count = substitute_signer(&mut instructions, &base_signer, &signer);
            tracing::debug!(
                "substituted signer {} -> {} in {} accounts",
                base_signer,
                signer,
                count
            );
        }
        let inserted =
            insert_compute_budget(&mut instructions, compute_unit_limit, compute_unit_price);
        if let Some(lamports) = jito_tip_lamports {
            instructions.push(solana_system_interface::instruction::transfer(
                &signer,
                &JITO_TIP_ACCOUNT,
                lamports,
            ));
        }

        let lookups = if lookup_tables.is_empty() {
            Vec::new()
        } else {
            let lookups = self.network.resolve(&lookup_tables).await?;
            tracing::debug!("resolved {} lookup tables", lookups.len());
            lookups
        };
        let blockhash = self.network.latest_blockhash().await?;

        let tx = SignableTransaction::compile(&signer, &instructions, &lookups, blockhash)?;
        Ok(SignableTransaction { inserted, ..tx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkError;
    use async_trait::async_trait;
    use solana_keypair::Keypair;
    use solana_signer::Signer;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockNetwork {
        tables: HashMap<Pubkey, AddressLookupTableAccount>,
    }

    #[async_trait]
    impl LookupTableResolver for MockNetwork {
        async fn resolve(
            &self,
            tables: &[Pubkey],
        ) -> Result<Vec<AddressLookupTableAccount>, NetworkError> {
            tables
                .iter()
                .map(|pk| {
                    self.tables
                        .get(pk)
                        .cloned()
                        .ok_or(NetworkError::LookupTableNotFound(*pk))
                })
                .collect()
        }

        async fn latest_blockhash(&self) -> Result<Hash, NetworkError> {
            Ok(Hash::new_from_array([7; 32]))
        }
    }

    fn ix(program_id: Pubkey, signer: Pubkey, accounts: &[Pubkey]) -> Instruction {
        Instruction::new_with_bytes(
            program_id,
            &[1, 2, 3],
            std::iter::once(AccountMeta::new(signer, true))
                .chain(accounts.iter().map(|pk| AccountMeta::new(*pk, false)))
                .collect(),
        )
    }

    fn program_ids(tx: &SignableTransaction) -> Vec<Pubkey> {
        let keys = tx.message.static_account_keys();
        tx.message
            .instructions()
            .iter()
            .map(|ix| keys[ix.program_id_index as usize])
            .collect()
    }

    #[tokio::test]
    async fn test_envelope_order() {
        tracing_subscriber::fmt::try_init().ok();

        let signer = Pubkey::new_unique();
        let [pre, main, post] = [(); 3].map(|_| Pubkey::new_unique());
        let assembler = Assembler::new(MockNetwork::default(), signer);
        let tx = assembler
            .assemble(
                vec![ix(main, signer, &[])],
                TxOptions::builder()
                    .pre_instructions(vec![ix(pre, signer, &[])])
                    .post_instructions(vec![ix(post, signer, &[])])
                    .build(),
            )
            .await
            .unwrap();
        // no compute budget unless asked for
        assert_eq!(program_ids(&tx), [pre, main, post]);
        assert_eq!(tx.fee_payer(), Some(signer));
        assert_eq!(tx.required_signers(), [signer]);
        assert_eq!(*tx.message.recent_blockhash(), Hash::new_from_array([7; 32]));
    }

    #[tokio::test]
    async fn test_compute_budget() {
        let signer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let assembler = Assembler::new(MockNetwork::default(), signer);
        let tx = assembler
            .assemble(
                vec![ix(program, signer, &[])],
                TxOptions {
                    compute_unit_limit: Some(400_000),
                    compute_unit_price: Some(50_000),
                    ..<_>::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(tx.inserted, 2);
        assert_eq!(
            program_ids(&tx),
            [
                solana_compute_budget_interface::id(),
                solana_compute_budget_interface::id(),
                program
            ]
        );

        let mut instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(1_000_000),
            ix(program, signer, &[]),
        ];
        let inserted = insert_compute_budget(&mut instructions, Some(400_000), Some(1));
        assert_eq!(inserted, 1);
        assert_eq!(
            instructions[0],
            ComputeBudgetInstruction::set_compute_unit_price(1)
        );
        assert_eq!(
            instructions[1],
            ComputeBudgetInstruction::set_compute_unit_limit(1_000_000)
        );
    }

    #[tokio::test]
    async fn test_signer_substitution() {
        let wallet = Pubkey::new_unique();
        let signer = Keypair::new();
        let program = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        let assembler = Assembler::new(MockNetwork::default(), wallet);
        let tx = assembler
            .assemble(
                vec![ix(program, wallet, &[other])],
                TxOptions {
                    signer: Some(signer.pubkey()),
                    jito_tip_lamports: Some(10_000),
                    ..<_>::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(tx.fee_payer(), Some(signer.pubkey()));
        assert!(!tx.message.static_account_keys().contains(&wallet));
        assert_eq!(
            program_ids(&tx),
            [program, solana_system_interface::program::ID]
        );
        assert!(tx.message.static_account_keys().contains(&JITO_TIP_ACCOUNT));

        let signed = tx.sign(&[&signer]).unwrap();
        assert_eq!(signed.signatures.len(), 1);
        assert_ne!(signed.signatures[0], Signature::default());
    }

    #[tokio::test]
    async fn test_lookup_tables() {
        let signer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let accounts = (0..20).map(|_| Pubkey::new_unique()).collect::<Vec<_>>();
        let table = Pubkey::new_unique();
        let network = MockNetwork {
            tables: HashMap::from([(
                table,
                AddressLookupTableAccount {
                    key: table,
                    addresses: accounts.clone(),
                },
            )]),
        };
        let assembler = Assembler::new(network, signer);

        let plain = assembler
            .assemble(vec![ix(program, signer, &accounts)], <_>::default())
            .await
            .unwrap();
        let with_table = assembler
            .assemble(
                vec![ix(program, signer, &accounts)],
                TxOptions {
                    lookup_tables: vec![table],
                    ..<_>::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(with_table.message.address_table_lookups().map(<[_]>::len), Some(1));
        assert!(
            with_table.serialized_size().unwrap() < plain.serialized_size().unwrap()
        );

        let missing = Pubkey::new_unique();
        let error = assembler
            .assemble(
                vec![ix(program, signer, &accounts)],
                TxOptions {
                    lookup_tables: vec![missing],
                    ..<_>::default()
                },
            )
            .await
            .unwrap_err();
        assert!(error.is_transient());
        assert!(matches!(
            error,
            Error::Network(NetworkError::LookupTableNotFound(pk)) if pk == missing
        ));
    }

    #[tokio::test]
    async fn test_too_large() {
        let signer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let assembler = Assembler::new(MockNetwork::default(), signer);
        let instructions = (0..4)
            .map(|_| Instruction::new_with_bytes(program, &[0; 400], vec![]))
            .collect();
        let error = assembler
            .assemble(instructions, <_>::default())
            .await
            .unwrap_err();
        assert!(!error.is_transient());
        assert!(matches!(
            error,
            Error::Assemble(AssembleError::TooLarge { limit: 1232, .. })
        ));
    }

    #[tokio::test]
    async fn test_legacy_conversion() {
        let payer = Keypair::new();
        let to = Pubkey::new_unique();
        let readonly = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let original = vec![Instruction::new_with_bytes(
            program,
            &[9, 9],
            vec![
                AccountMeta::new(payer.pubkey(), true),
                AccountMeta::new(to, false),
                AccountMeta::new_readonly(readonly, false),
            ],
        )];
        let legacy = Transaction::new_with_payer(&original, Some(&payer.pubkey()));

        let (fee_payer, decompiled) = decompile_legacy(&legacy.message).unwrap();
        assert_eq!(fee_payer, payer.pubkey());
        assert_eq!(decompiled, original);

        let assembler = Assembler::new(MockNetwork::default(), Pubkey::new_unique());
        let tx = assembler
            .assemble_legacy(&legacy, <_>::default())
            .await
            .unwrap();
        assert!(matches!(tx.message, VersionedMessage::V0(_)));
        assert_eq!(tx.fee_payer(), Some(payer.pubkey()));
        assert_eq!(program_ids(&tx), [program]);
    }
}
