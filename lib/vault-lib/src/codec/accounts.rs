//! Layouts of the state and metadata accounts.
//!
//! Both start with an 8-byte discriminator, `sha256("account:<Name>")[..8]`.
//! Trailing bytes after the borsh payload are allowed.

use super::{
    DecodeError, Decoded, MetadataField, RawField, decode_metadata, decode_state, encode_metadata,
    encode_state, metadata::DecodedMetadata,
};
use crate::{
    pda::IdentityKey,
    state::{CreatedModel, ManagerModel, MetadataModel, StateModel},
};
use borsh::{BorshDeserialize, BorshSerialize};
use sha2::{Digest, Sha256};
use solana_pubkey::Pubkey;

pub fn account_discriminator(name: &str) -> [u8; 8] {
    let hash = Sha256::digest(format!("account:{name}").as_bytes());
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash[..8]);
    discriminator
}

fn split_discriminator<'a>(
    account: &'static str,
    data: &'a [u8],
) -> Result<&'a [u8], DecodeError> {
    let expected = account_discriminator(account);
    match data.split_at_checked(8) {
        Some((discriminator, rest)) if discriminator == expected => Ok(rest),
        Some((discriminator, _)) => Err(DecodeError::Discriminator {
            account,
            found: discriminator.to_vec(),
        }),
        None => Err(DecodeError::Discriminator {
            account,
            found: data.to_vec(),
        }),
    }
}

fn with_discriminator<T: BorshSerialize>(
    account: &str,
    value: &T,
) -> borsh::io::Result<Vec<u8>> {
    let mut data = account_discriminator(account).to_vec();
    data.extend(borsh::to_vec(value)?);
    Ok(data)
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct StateAccount {
    pub owner: Pubkey,
    pub vault: Pubkey,
    pub metadata: Pubkey,
    pub key: IdentityKey,
    pub mints: Vec<Pubkey>,
    /// `params[0]` is the vault, `params[i + 1]` is share class `i`.
    pub params: Vec<Vec<RawField>>,
}

impl StateAccount {
    pub const NAME: &'static str = "StateAccount";

    pub fn try_from_account_data(data: &[u8]) -> Result<Self, DecodeError> {
        let mut rest = split_discriminator(Self::NAME, data)?;
        Self::deserialize(&mut rest).map_err(|e| DecodeError::malformed(Self::NAME, e))
    }

    pub fn to_account_data(&self) -> borsh::io::Result<Vec<u8>> {
        with_discriminator(Self::NAME, self)
    }

    /// Lay out `model` as the program would store it.
    pub fn from_model(
        owner: Pubkey,
        vault: Pubkey,
        metadata: Pubkey,
        mints: Vec<Pubkey>,
        model: &StateModel,
    ) -> Self {
        Self {
            owner,
            vault,
            metadata,
            key: model.identity_key().unwrap_or_default(),
            mints,
            params: encode_state(model).into_params(),
        }
    }

    /// Decode into a model addressed at `address`.
    pub fn into_model(self, address: Pubkey) -> Result<Decoded, DecodeError> {
        let mut params = self.params.into_iter();
        let vault = params.next().unwrap_or_default();
        let mut decoded = decode_state(vault, params.collect())?;
        let state = &mut decoded.state;
        state.id = Some(address);
        state.created = Some(CreatedModel {
            key: self.key,
            owner: Some(self.owner),
        });
        state.owner = Some(ManagerModel {
            pubkey: Some(self.owner),
            ..<_>::default()
        });
        for share_class in &mut state.share_classes {
            share_class.state_pubkey = Some(address);
        }
        Ok(decoded)
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct MetadataAccount {
    pub state: Pubkey,
    pub company: Vec<MetadataField>,
    pub fund: Vec<MetadataField>,
    pub share_classes: Vec<Vec<MetadataField>>,
    pub fund_managers: Vec<Vec<MetadataField>>,
}

impl MetadataAccount {
    pub const NAME: &'static str = "MetadataAccount";

    pub fn try_from_account_data(data: &[u8]) -> Result<Self, DecodeError> {
        let mut rest = split_discriminator(Self::NAME, data)?;
        Self::deserialize(&mut rest).map_err(|e| DecodeError::malformed(Self::NAME, e))
    }

    pub fn to_account_data(&self) -> borsh::io::Result<Vec<u8>> {
        with_discriminator(Self::NAME, self)
    }

    pub fn from_model(state: Pubkey, model: &MetadataModel) -> Self {
        let (company, fund, share_classes, fund_managers) = encode_metadata(model);
        Self {
            state,
            company,
            fund,
            share_classes,
            fund_managers,
        }
    }

    pub fn decode(&self) -> Result<DecodedMetadata, DecodeError> {
        decode_metadata(
            &self.company,
            &self.fund,
            &self.share_classes,
            &self.fund_managers,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::{FieldName, FieldValue},
        pda::identity_key_from_name,
        state::{CompanyModel, ShareClassModel},
    };

    #[test]
    fn test_state_account_data() {
        let owner = Pubkey::new_unique();
        let address = Pubkey::new_unique();
        let model = StateModel {
            name: Some("Test Vault".to_owned()),
            enabled: Some(true),
            assets: vec![Pubkey::new_unique()],
            share_classes: vec![ShareClassModel {
                symbol: Some("TV".to_owned()),
                ..<_>::default()
            }],
            ..<_>::default()
        };
        let account = StateAccount::from_model(
            owner,
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            vec![Pubkey::new_unique()],
            &model,
        );
        let mut data = account.to_account_data().unwrap();
        // accounts are allocated with slack space
        data.extend([0u8; 64]);

        let parsed = StateAccount::try_from_account_data(&data).unwrap();
        assert_eq!(parsed, account);

        let decoded = parsed.into_model(address).unwrap();
        let state = decoded.state;
        assert_eq!(state.id, Some(address));
        assert_eq!(state.name, model.name);
        assert_eq!(state.assets, model.assets);
        assert_eq!(state.created.unwrap().key, identity_key_from_name("Test Vault"));
        assert_eq!(state.share_classes[0].symbol.as_deref(), Some("TV"));
        assert_eq!(state.share_classes[0].state_pubkey, Some(address));
    }

    #[test]
    fn test_state_account_errors() {
        let account = StateAccount {
            owner: Pubkey::new_unique(),
            vault: Pubkey::new_unique(),
            metadata: Pubkey::new_unique(),
            key: [1; 8],
            mints: vec![],
            params: vec![vec![RawField::new(
                FieldName::IsEnabled,
                FieldValue::Boolean(true),
            )]],
        };
        let data = account.to_account_data().unwrap();

        let error = StateAccount::try_from_account_data(&data[..data.len() - 1]).unwrap_err();
        assert!(matches!(error, DecodeError::Malformed { .. }));

        let error = MetadataAccount::try_from_account_data(&data).unwrap_err();
        assert!(matches!(
            error,
            DecodeError::Discriminator {
                account: "MetadataAccount",
                ..
            }
        ));

        let error = StateAccount::try_from_account_data(&[1, 2, 3]).unwrap_err();
        assert!(matches!(error, DecodeError::Discriminator { .. }));
    }

    #[test]
    fn test_metadata_account_data() {
        let model = MetadataModel {
            company: CompanyModel {
                man_co: Some("Acme".to_owned()),
                ..<_>::default()
            },
            ..<_>::default()
        };
        let account = MetadataAccount::from_model(Pubkey::new_unique(), &model);
        let data = account.to_account_data().unwrap();
        let parsed = MetadataAccount::try_from_account_data(&data).unwrap();
        assert_eq!(parsed.decode().unwrap().metadata, model);
    }
}
