//! Fill in the defaults of a vault before its creation.

use crate::{
    config::{LaunchPolicy, UriTemplates},
    pda::{DeriveError, find_mint_pda, find_state_pda, identity_key_from_name},
    state::{CreatedModel, StateModel},
};
use chrono::NaiveDate;
use solana_pubkey::Pubkey;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum EnrichError {
    #[error("vault has no name, set a name, a legal fund name or a share class name")]
    MissingName,
    #[error("vault with {0} share classes is not supported, at most 1")]
    MultipleShareClasses(usize),
    #[error(transparent)]
    Derive(#[from] DeriveError),
}

#[derive(Debug, Clone, bon::Builder)]
pub struct EnrichConfig {
    pub program_id: Pubkey,
    /// Root account creating the vault.
    pub owner: Pubkey,
    pub today: NaiveDate,
    #[builder(default)]
    pub uris: UriTemplates,
    #[builder(default)]
    pub launch: LaunchPolicy,
}

/// Complete `partial` for creation. Fields set by the caller are kept as they are.
pub fn enrich_state(
    mut partial: StateModel,
    config: &EnrichConfig,
) -> Result<StateModel, EnrichError> {
    if partial.share_classes.len() > 1 {
        return Err(EnrichError::MultipleShareClasses(partial.share_classes.len()));
    }
    let today = config.today.format("%Y-%m-%d").to_string();

    let fund = partial.raw_openfunds.get_or_insert_with(<_>::default);
    let name = partial
        .name
        .clone()
        .or_else(|| fund.legal_fund_name_including_umbrella.clone())
        .or_else(|| partial.share_classes.first().and_then(|s| s.name.clone()))
        .filter(|name| !name.is_empty())
        .ok_or(EnrichError::MissingName)?;

    if let [share_class] = partial.share_classes.as_slice()
        && let Some(currency) = share_class
            .raw_openfunds
            .as_ref()
            .and_then(|raw| raw.share_class_currency.clone())
    {
        fund.fund_currency.get_or_insert(currency);
    }
    if partial.enabled == Some(true) && config.launch.stamp_launch_dates {
        fund.fund_launch_date.get_or_insert_with(|| today.clone());
    }

    let created = partial.created.get_or_insert_with(|| CreatedModel {
        key: identity_key_from_name(&name),
        owner: None,
    });
    created.owner.get_or_insert(config.owner);
    let key = created.key;
    partial.name = Some(name);
    partial
        .owner
        .get_or_insert_with(<_>::default)
        .pubkey
        .get_or_insert(config.owner);
    partial.company.get_or_insert_with(<_>::default);

    let (state, _) = find_state_pda(&config.program_id, &config.owner, &key)?;
    partial.id = Some(state);
    partial.uri.get_or_insert_with(|| config.uris.product(&state));
    partial
        .metadata_uri
        .get_or_insert_with(|| config.uris.metadata(&state));

    for (index, share_class) in partial.share_classes.iter_mut().enumerate() {
        let (mint, _) = find_mint_pda(&config.program_id, &state, index)?;
        share_class
            .is_raw_openfunds
            .get_or_insert(share_class.raw_openfunds.is_some());
        let raw = share_class.raw_openfunds.get_or_insert_with(<_>::default);
        if config.launch.stamp_launch_dates
            && raw.share_class_lifecycle.as_deref() == Some(config.launch.active_lifecycle.as_str())
        {
            raw.share_class_launch_date.get_or_insert_with(|| today.clone());
        }
        share_class.uri.get_or_insert_with(|| config.uris.mint(&mint));
        share_class
            .image_uri
            .get_or_insert_with(|| config.uris.image(&mint));
        share_class.state_pubkey.get_or_insert(state);
    }

    Ok(partial)
}
