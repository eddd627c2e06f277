//! Flat field records to and from [`StateModel`].
//!
//! The program stores vault parameters as lists of `(name-tag, value)` pairs,
//! where the value is itself a tagged union ([`FieldValue`]). The first list
//! holds vault-level fields, each following list holds the fields of one share
//! class; share class index is the list position.
//!
//! Unknown name tags are skipped with a warning so that older clients keep
//! working against newer programs. An unknown value tag, a value of the wrong
//! kind or truncated bytes are hard errors.

use crate::state::{DelegateAcl, ShareClassModel, StateModel};
use borsh::{BorshDeserialize, BorshSerialize};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use solana_pubkey::Pubkey;
use std::sync::Arc;
use thiserror::Error as ThisError;

pub mod accounts;
pub mod metadata;

pub use accounts::{MetadataAccount, StateAccount};
pub use metadata::{DecodedMetadata, MetadataField, decode_metadata, encode_metadata};

/// Name tags. Append-only, the numbering is part of the on-chain format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum FieldName {
    TimeCreated = 0,
    IsEnabled = 1,
    Assets = 2,
    AssetsWeights = 3,
    ShareClassAllowlist = 4,
    ShareClassBlocklist = 5,
    DelegateAcls = 6,
    ExternalVaultAccounts = 7,
    LockUp = 8,
    Name = 9,
    Symbol = 10,
    Uri = 11,
    ImageUri = 12,
    ShareClassAsset = 13,
    PermanentDelegate = 14,
    DefaultAccountStateFrozen = 15,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum FieldValue {
    Boolean(bool),
    Date(String),
    Double(i64),
    Integer(i32),
    String(String),
    Time(String),
    U8(u8),
    U64(u64),
    Pubkey(Pubkey),
    Percentage(u32),
    Uri(String),
    Timestamp(i64),
    VecPubkey(Vec<Pubkey>),
    VecU32(Vec<u32>),
    VecDelegateAcl(Vec<DelegateAcl>),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Boolean(_) => "Boolean",
            FieldValue::Date(_) => "Date",
            FieldValue::Double(_) => "Double",
            FieldValue::Integer(_) => "Integer",
            FieldValue::String(_) => "String",
            FieldValue::Time(_) => "Time",
            FieldValue::U8(_) => "U8",
            FieldValue::U64(_) => "U64",
            FieldValue::Pubkey(_) => "Pubkey",
            FieldValue::Percentage(_) => "Percentage",
            FieldValue::Uri(_) => "Uri",
            FieldValue::Timestamp(_) => "Timestamp",
            FieldValue::VecPubkey(_) => "VecPubkey",
            FieldValue::VecU32(_) => "VecU32",
            FieldValue::VecDelegateAcl(_) => "VecDelegateAcl",
        }
    }
}

/// One on-chain field. `name` stays a raw byte so that unknown tags survive deserialization.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct RawField {
    pub name: u8,
    pub value: FieldValue,
}

impl RawField {
    pub fn new(name: FieldName, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(ThisError, Debug, Clone)]
pub enum DecodeError {
    #[error("malformed {what}: {source}")]
    Malformed {
        what: &'static str,
        #[source]
        source: Arc<std::io::Error>,
    },
    #[error("field {field:?} expects a {expected} value, found {found}")]
    TypeMismatch {
        field: FieldName,
        expected: &'static str,
        found: &'static str,
    },
    #[error("not a {account} account, discriminator {found:?}")]
    Discriminator {
        account: &'static str,
        found: Vec<u8>,
    },
    #[error("metadata field {field} has invalid value {value:?}")]
    InvalidMetadataValue { field: &'static str, value: String },
}

impl DecodeError {
    pub fn malformed(what: &'static str, error: std::io::Error) -> Self {
        Self::Malformed {
            what,
            source: Arc::new(error),
        }
    }
}

/// Which list a field came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    Vault,
    ShareClass(usize),
    Company,
    Fund,
    Manager(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Tag is newer than this client.
    UnknownTag,
    /// Known tag that has no meaning in this record.
    NotInRecord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub record: Record,
    pub name: u8,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub state: StateModel,
    pub skipped: Vec<Skipped>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedState {
    pub vault: Vec<RawField>,
    pub share_classes: Vec<Vec<RawField>>,
}

impl EncodedState {
    /// Account layout: vault-level list first, then one list per share class.
    pub fn into_params(self) -> Vec<Vec<RawField>> {
        std::iter::once(self.vault)
            .chain(self.share_classes)
            .collect()
    }
}

macro_rules! take {
    ($value:expr, $variant:ident, $field:expr) => {
        match $value {
            FieldValue::$variant(inner) => inner,
            other => {
                return Err(DecodeError::TypeMismatch {
                    field: $field,
                    expected: stringify!($variant),
                    found: other.kind(),
                });
            }
        }
    };
}

fn apply_vault_field(
    state: &mut StateModel,
    name: FieldName,
    value: FieldValue,
) -> Result<bool, DecodeError> {
    match name {
        FieldName::TimeCreated => state.created_at = Some(take!(value, Timestamp, name)),
        FieldName::IsEnabled => state.enabled = Some(take!(value, Boolean, name)),
        FieldName::Assets => state.assets = take!(value, VecPubkey, name),
        FieldName::AssetsWeights => state.assets_weights = take!(value, VecU32, name),
        FieldName::DelegateAcls => state.delegate_acls = take!(value, VecDelegateAcl, name),
        FieldName::ExternalVaultAccounts => {
            state.external_vault_accounts = take!(value, VecPubkey, name)
        }
        FieldName::Name => state.name = Some(take!(value, String, name)),
        FieldName::Uri => state.uri = Some(take!(value, Uri, name)),
        FieldName::ShareClassAllowlist
        | FieldName::ShareClassBlocklist
        | FieldName::LockUp
        | FieldName::Symbol
        | FieldName::ImageUri
        | FieldName::ShareClassAsset
        | FieldName::PermanentDelegate
        | FieldName::DefaultAccountStateFrozen => return Ok(false),
    }
    Ok(true)
}

fn apply_share_class_field(
    share_class: &mut ShareClassModel,
    name: FieldName,
    value: FieldValue,
) -> Result<bool, DecodeError> {
    match name {
        FieldName::Name => share_class.name = Some(take!(value, String, name)),
        FieldName::Symbol => share_class.symbol = Some(take!(value, String, name)),
        FieldName::Uri => share_class.uri = Some(take!(value, Uri, name)),
        FieldName::ImageUri => share_class.image_uri = Some(take!(value, Uri, name)),
        FieldName::ShareClassAsset => share_class.asset = Some(take!(value, Pubkey, name)),
        FieldName::ShareClassAllowlist => share_class.allowlist = take!(value, VecPubkey, name),
        FieldName::ShareClassBlocklist => share_class.blocklist = take!(value, VecPubkey, name),
        // the wire calls it "lock up", the model spells out the unit
        FieldName::LockUp => {
            share_class.lock_up_period_in_seconds = Some(take!(value, Timestamp, name))
        }
        FieldName::PermanentDelegate => {
            share_class.permanent_delegate = Some(take!(value, Pubkey, name))
        }
        FieldName::DefaultAccountStateFrozen => {
            share_class.default_account_state_frozen = Some(take!(value, Boolean, name))
        }
        FieldName::TimeCreated
        | FieldName::IsEnabled
        | FieldName::Assets
        | FieldName::AssetsWeights
        | FieldName::DelegateAcls
        | FieldName::ExternalVaultAccounts => return Ok(false),
    }
    Ok(true)
}

fn decode_record<T>(
    target: &mut T,
    record: Record,
    fields: Vec<RawField>,
    skipped: &mut Vec<Skipped>,
    apply: fn(&mut T, FieldName, FieldValue) -> Result<bool, DecodeError>,
) -> Result<(), DecodeError> {
    for RawField { name, value } in fields {
        let reason = match FieldName::try_from(name) {
            Ok(field) => {
                if apply(target, field, value)? {
                    continue;
                }
                SkipReason::NotInRecord
            }
            Err(_) => SkipReason::UnknownTag,
        };
        tracing::warn!("skipping field tag {} in {:?} record: {:?}", name, record, reason);
        skipped.push(Skipped {
            record,
            name,
            reason,
        });
    }
    Ok(())
}

/// Decode the vault-level list and one list per share class.
pub fn decode_state(
    vault: Vec<RawField>,
    share_classes: Vec<Vec<RawField>>,
) -> Result<Decoded, DecodeError> {
    let mut state = StateModel::default();
    let mut skipped = Vec::new();
    decode_record(&mut state, Record::Vault, vault, &mut skipped, apply_vault_field)?;
    for (index, fields) in share_classes.into_iter().enumerate() {
        let mut share_class = ShareClassModel::default();
        decode_record(
            &mut share_class,
            Record::ShareClass(index),
            fields,
            &mut skipped,
            apply_share_class_field,
        )?;
        state.share_classes.push(share_class);
    }
    Ok(Decoded { state, skipped })
}

/// Parse a borsh-encoded field list.
pub fn decode_fields(bytes: &[u8]) -> Result<Vec<RawField>, DecodeError> {
    Vec::<RawField>::try_from_slice(bytes).map_err(|e| DecodeError::malformed("field record", e))
}

fn push(fields: &mut Vec<RawField>, name: FieldName, value: Option<FieldValue>) {
    if let Some(value) = value {
        fields.push(RawField::new(name, value));
    }
}

fn non_empty<T: Clone>(list: &[T]) -> Option<Vec<T>> {
    (!list.is_empty()).then(|| list.to_vec())
}

/// Fields that are set, as a partial update. Empty lists are left out.
pub fn encode_state(state: &StateModel) -> EncodedState {
    let mut vault = Vec::new();
    push(&mut vault, FieldName::TimeCreated, state.created_at.map(FieldValue::Timestamp));
    push(&mut vault, FieldName::IsEnabled, state.enabled.map(FieldValue::Boolean));
    push(&mut vault, FieldName::Assets, non_empty(&state.assets).map(FieldValue::VecPubkey));
    push(
        &mut vault,
        FieldName::AssetsWeights,
        non_empty(&state.assets_weights).map(FieldValue::VecU32),
    );
    push(
        &mut vault,
        FieldName::DelegateAcls,
        non_empty(&state.delegate_acls).map(FieldValue::VecDelegateAcl),
    );
    push(
        &mut vault,
        FieldName::ExternalVaultAccounts,
        non_empty(&state.external_vault_accounts).map(FieldValue::VecPubkey),
    );
    push(&mut vault, FieldName::Name, state.name.clone().map(FieldValue::String));
    push(&mut vault, FieldName::Uri, state.uri.clone().map(FieldValue::Uri));

    let share_classes = state
        .share_classes
        .iter()
        .map(|share_class| {
            let mut fields = Vec::new();
            push(
                &mut fields,
                FieldName::ShareClassAllowlist,
                non_empty(&share_class.allowlist).map(FieldValue::VecPubkey),
            );
            push(
                &mut fields,
                FieldName::ShareClassBlocklist,
                non_empty(&share_class.blocklist).map(FieldValue::VecPubkey),
            );
            push(
                &mut fields,
                FieldName::LockUp,
                share_class.lock_up_period_in_seconds.map(FieldValue::Timestamp),
            );
            push(&mut fields, FieldName::Name, share_class.name.clone().map(FieldValue::String));
            push(
                &mut fields,
                FieldName::Symbol,
                share_class.symbol.clone().map(FieldValue::String),
            );
            push(&mut fields, FieldName::Uri, share_class.uri.clone().map(FieldValue::Uri));
            push(
                &mut fields,
                FieldName::ImageUri,
                share_class.image_uri.clone().map(FieldValue::Uri),
            );
            push(
                &mut fields,
                FieldName::ShareClassAsset,
                share_class.asset.map(FieldValue::Pubkey),
            );
            push(
                &mut fields,
                FieldName::PermanentDelegate,
                share_class.permanent_delegate.map(FieldValue::Pubkey),
            );
            push(
                &mut fields,
                FieldName::DefaultAccountStateFrozen,
                share_class.default_account_state_frozen.map(FieldValue::Boolean),
            );
            fields
        })
        .collect();

    EncodedState {
        vault,
        share_classes,
    }
}
