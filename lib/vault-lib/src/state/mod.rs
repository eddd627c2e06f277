//! Typed model of a vault.
//!
//! [`StateModel`] is what callers build before creating a vault, what the
//! [codec][crate::codec] reconstructs from on-chain records, and what partial
//! updates are expressed in: `None` and empty lists mean "leave unchanged".

use crate::pda::{IdentityKey, identity_key_from_name};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use solana_pubkey::Pubkey;

pub mod openfunds;

pub use openfunds::{
    CompanyModel, FundOpenfundsModel, ManagerKind, ManagerModel, MetadataModel,
    ShareClassOpenfundsModel,
};

#[serde_as]
#[derive(
    Serialize, Deserialize, BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq,
)]
pub struct StateModel {
    /// Address of the state account.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub id: Option<Pubkey>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub metadata_uri: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub created: Option<CreatedModel>,
    /// Unix timestamp set by the program at creation.
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    #[serde(default)]
    pub assets: Vec<Pubkey>,
    #[serde(default)]
    pub assets_weights: Vec<u32>,
    /// Accounts holding value outside of custody, e.g. pending withdrawal tickets.
    #[serde_as(as = "Vec<DisplayFromStr>")]
    #[serde(default)]
    pub external_vault_accounts: Vec<Pubkey>,
    #[serde(default)]
    pub delegate_acls: Vec<DelegateAcl>,
    #[serde(default)]
    pub share_classes: Vec<ShareClassModel>,
    #[serde(default)]
    pub owner: Option<ManagerModel>,
    #[serde(default)]
    pub company: Option<CompanyModel>,
    #[serde(default)]
    pub raw_openfunds: Option<FundOpenfundsModel>,
}

impl StateModel {
    /// Stored identity key, or the key a vault with this name would get.
    pub fn identity_key(&self) -> Option<IdentityKey> {
        self.created
            .as_ref()
            .map(|created| created.key)
            .or_else(|| self.name.as_deref().map(identity_key_from_name))
    }

    /// Partial update granting `acls`. Entries for the same delegate are replaced on-chain.
    pub fn upsert_delegate_acls(acls: Vec<DelegateAcl>) -> Self {
        Self {
            delegate_acls: acls,
            ..<_>::default()
        }
    }

    /// Partial update removing every permission of `delegates`.
    pub fn delete_delegate_acls(delegates: impl IntoIterator<Item = Pubkey>) -> Self {
        Self {
            delegate_acls: delegates
                .into_iter()
                .map(|pubkey| DelegateAcl {
                    pubkey,
                    permissions: Vec::new(),
                })
                .collect(),
            ..<_>::default()
        }
    }

    /// Fill in off-chain metadata decoded from the metadata account.
    pub fn with_metadata(mut self, metadata: MetadataModel) -> Self {
        let MetadataModel {
            company,
            fund,
            share_classes,
            managers,
        } = metadata;
        self.company = Some(company);
        self.raw_openfunds = Some(fund);
        if let Some(name) = managers.into_iter().find_map(|m| m.portfolio_manager_name) {
            self.owner
                .get_or_insert_with(<_>::default)
                .portfolio_manager_name = Some(name);
        }
        for (share_class, raw) in self.share_classes.iter_mut().zip(share_classes) {
            share_class.raw_openfunds = Some(raw);
        }
        self
    }

    /// Off-chain metadata to store in the metadata account.
    pub fn metadata(&self) -> MetadataModel {
        MetadataModel {
            company: self.company.clone().unwrap_or_default(),
            fund: self.raw_openfunds.clone().unwrap_or_default(),
            share_classes: self
                .share_classes
                .iter()
                .map(|share_class| share_class.raw_openfunds.clone().unwrap_or_default())
                .collect(),
            managers: self.owner.iter().cloned().collect(),
        }
    }
}

#[serde_as]
#[derive(
    Serialize, Deserialize, BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq,
)]
pub struct CreatedModel {
    pub key: IdentityKey,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub owner: Option<Pubkey>,
}

#[serde_as]
#[derive(
    Serialize, Deserialize, BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq,
)]
pub struct ShareClassModel {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub state_pubkey: Option<Pubkey>,
    /// Base asset the share class is denominated in.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub asset: Option<Pubkey>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    #[serde(default)]
    pub allowlist: Vec<Pubkey>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    #[serde(default)]
    pub blocklist: Vec<Pubkey>,
    #[serde(default)]
    pub lock_up_period_in_seconds: Option<i64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub permanent_delegate: Option<Pubkey>,
    #[serde(default)]
    pub default_account_state_frozen: Option<bool>,
    #[serde(default)]
    pub is_raw_openfunds: Option<bool>,
    #[serde(default)]
    pub raw_openfunds: Option<ShareClassOpenfundsModel>,
}

#[derive(
    Serialize, Deserialize, BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Permission {
    DriftInitialize,
    DriftUpdateUser,
    DriftDeleteUser,
    DriftDeposit,
    DriftWithdraw,
    DriftPlaceOrders,
    DriftCancelOrders,
    DriftPerpMarket,
    DriftSpotMarket,
    Stake,
    Unstake,
    LiquidUnstake,
    JupiterSwapFundAssets,
    JupiterSwapAnyAsset,
    WSolWrap,
    WSolUnwrap,
}

#[serde_as]
#[derive(
    Serialize, Deserialize, BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq,
)]
pub struct DelegateAcl {
    #[serde_as(as = "DisplayFromStr")]
    pub pubkey: Pubkey,
    pub permissions: Vec<Permission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_json() {
        let asset = Pubkey::new_unique();
        let json = serde_json::json!({
            "name": "Test Vault",
            "enabled": true,
            "assets": [asset.to_string()],
            "share_classes": [{ "symbol": "TV" }],
        });
        let state: StateModel = serde_json::from_value(json).unwrap();
        assert_eq!(state.assets, [asset]);
        assert_eq!(state.share_classes[0].symbol.as_deref(), Some("TV"));
        assert_eq!(state.owner, None);
    }

    #[test]
    fn test_delete_delegate_acls() {
        let delegate = Pubkey::new_unique();
        let update = StateModel::delete_delegate_acls([delegate]);
        assert_eq!(
            update.delegate_acls,
            [DelegateAcl {
                pubkey: delegate,
                permissions: vec![],
            }]
        );
        assert_eq!(update.name, None);
    }

    #[test]
    fn test_with_metadata() {
        let state = StateModel {
            share_classes: vec![<_>::default()],
            ..<_>::default()
        };
        let metadata = MetadataModel {
            fund: FundOpenfundsModel {
                fund_currency: Some("USD".to_owned()),
                ..<_>::default()
            },
            share_classes: vec![ShareClassOpenfundsModel {
                isin: Some("XS1082172823".to_owned()),
                ..<_>::default()
            }],
            managers: vec![ManagerModel {
                portfolio_manager_name: Some("Alice".to_owned()),
                ..<_>::default()
            }],
            ..<_>::default()
        };
        let state = state.with_metadata(metadata.clone());
        let extracted = state.metadata();
        assert_eq!(extracted.fund, metadata.fund);
        assert_eq!(extracted.share_classes, metadata.share_classes);
        assert_eq!(
            state.raw_openfunds.unwrap().fund_currency.as_deref(),
            Some("USD")
        );
        assert_eq!(
            state.share_classes[0]
                .raw_openfunds
                .as_ref()
                .unwrap()
                .isin
                .as_deref(),
            Some("XS1082172823")
        );
        assert_eq!(
            state.owner.unwrap().portfolio_manager_name.as_deref(),
            Some("Alice")
        );
    }
}
