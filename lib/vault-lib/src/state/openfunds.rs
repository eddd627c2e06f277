//! Openfunds metadata records, stored as free-form strings in the metadata account.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use solana_pubkey::Pubkey;

#[derive(
    Serialize, Deserialize, BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq,
)]
#[serde(default)]
pub struct CompanyModel {
    pub fund_group_name: Option<String>,
    pub man_co: Option<String>,
    pub domicile_of_man_co: Option<String>,
    pub email_address_of_man_co: Option<String>,
    pub fund_website_of_man_co: Option<String>,
}

#[derive(
    Serialize, Deserialize, BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum ManagerKind {
    Wallet,
    Squads,
}

#[serde_as]
#[derive(
    Serialize, Deserialize, BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq,
)]
#[serde(default)]
pub struct ManagerModel {
    pub portfolio_manager_name: Option<String>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub pubkey: Option<Pubkey>,
    pub kind: Option<ManagerKind>,
}

#[derive(
    Serialize, Deserialize, BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq,
)]
#[serde(default)]
pub struct FundOpenfundsModel {
    pub fund_domicile_alpha2: Option<String>,
    pub legal_fund_name_including_umbrella: Option<String>,
    pub fiscal_year_end: Option<String>,
    pub fund_currency: Option<String>,
    /// `YYYY-MM-DD`
    pub fund_launch_date: Option<String>,
    pub investment_objective: Option<String>,
    pub is_etc: Option<bool>,
    pub is_eu_directive_relevant: Option<bool>,
    pub is_fund_of_funds: Option<bool>,
    pub is_passive_fund: Option<bool>,
    pub is_reit: Option<bool>,
    pub legal_form: Option<String>,
    pub legal_fund_name_only: Option<String>,
    pub open_ended_or_closed_ended_fund_structure: Option<String>,
    pub type_of_eu_directive: Option<String>,
    pub ucits_version: Option<String>,
}

#[derive(
    Serialize, Deserialize, BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq,
)]
#[serde(default)]
pub struct ShareClassOpenfundsModel {
    pub isin: Option<String>,
    pub share_class_currency: Option<String>,
    pub currency_of_minimal_subscription: Option<String>,
    pub full_share_class_name: Option<String>,
    pub investment_status: Option<String>,
    pub minimal_initial_subscription_category: Option<String>,
    pub minimal_initial_subscription_in_amount: Option<String>,
    pub minimal_initial_subscription_in_shares: Option<String>,
    pub share_class_distribution_policy: Option<String>,
    pub share_class_extension: Option<String>,
    /// `YYYY-MM-DD`
    pub share_class_launch_date: Option<String>,
    pub share_class_lifecycle: Option<String>,
    pub launch_price: Option<String>,
    pub launch_price_currency: Option<String>,
    pub launch_price_date: Option<String>,
    pub currency_hedge_share_class: Option<bool>,
    pub has_lock_up_for_redemption: Option<bool>,
    pub has_performance_fee: Option<bool>,
    pub is_etf: Option<bool>,
    pub lock_up_comment: Option<String>,
    pub lock_up_period_in_days: Option<String>,
    pub management_fee_applied: Option<String>,
    pub management_fee_maximum: Option<String>,
    pub performance_fee_applied: Option<String>,
}

/// Everything the metadata account holds.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MetadataModel {
    pub company: CompanyModel,
    pub fund: FundOpenfundsModel,
    pub share_classes: Vec<ShareClassOpenfundsModel>,
    pub managers: Vec<ManagerModel>,
}
