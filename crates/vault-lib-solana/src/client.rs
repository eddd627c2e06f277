use crate::{Error, rpc::RpcNetwork};
use chrono::NaiveDate;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use std::sync::Arc;
use vault_lib::{
    Assembler, ClientConfig, SignableTransaction, StateModel, TxOptions,
    codec::{
        DecodeError, Decoded, encode_metadata, encode_state,
        accounts::{MetadataAccount, StateAccount, account_discriminator},
    },
    enrich::{EnrichConfig, enrich_state},
    instructions::{
        self, InitializeStateAccounts, InitializeStateArgs, MetadataArgs, RedeemAccounts,
        RedeemArgs, SubscribeAccounts, SubscribeArgs, UpdateStateArgs,
    },
    network::{AccountFetcher, LookupTableResolver},
    pda::{VaultAddresses, find_metadata_pda, find_mint_pda, find_vault_pda},
    registry::{AssetRegistry, StaticRegistry, WSOL},
    remaining_accounts::{AssociatedTokenCustody, Composer},
    state::MetadataModel,
};

pub struct VaultClient<N> {
    config: ClientConfig,
    network: Arc<N>,
    registry: Arc<dyn AssetRegistry + Send + Sync>,
    signer: Pubkey,
}

impl VaultClient<RpcNetwork> {
    pub fn from_config(config: ClientConfig, signer: Pubkey) -> Self {
        let network = RpcNetwork::from_config(&config);
        Self::new(config, network, signer)
    }

    /// Every vault of the program. A vault that fails to decode keeps its
    /// error, the others are still returned.
    pub async fn list_states(&self) -> Result<Vec<(Pubkey, Result<Decoded, DecodeError>)>, Error> {
        let accounts = self
            .network
            .program_accounts(
                &self.config.program_id,
                &account_discriminator(StateAccount::NAME),
            )
            .await?;
        Ok(decode_state_accounts(accounts))
    }

    pub async fn send_and_confirm(
        &self,
        tx: &VersionedTransaction,
        inserted: usize,
    ) -> Result<Signature, Error> {
        self.network.send_and_confirm(tx, inserted).await
    }
}

fn decode_state_accounts(
    accounts: Vec<(Pubkey, Vec<u8>)>,
) -> Vec<(Pubkey, Result<Decoded, DecodeError>)> {
    accounts
        .into_iter()
        .map(|(address, data)| {
            let decoded = StateAccount::try_from_account_data(&data)
                .and_then(|account| account.into_model(address));
            if let Err(error) = &decoded {
                tracing::warn!("failed to decode state {}: {}", address, error);
            }
            (address, decoded)
        })
        .collect()
}

impl<N> VaultClient<N>
where
    N: AccountFetcher + LookupTableResolver,
{
    pub fn new(config: ClientConfig, network: N, signer: Pubkey) -> Self {
        let registry = Arc::new(StaticRegistry::for_network(config.network));
        Self {
            config,
            network: Arc::new(network),
            registry,
            signer,
        }
    }

    pub fn with_registry(mut self, registry: impl AssetRegistry + Send + Sync + 'static) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn program_id(&self) -> &Pubkey {
        &self.config.program_id
    }

    /// Per-call signer, else the wallet.
    fn signer(&self, options: &TxOptions) -> Pubkey {
        options.signer.unwrap_or(self.signer)
    }

    fn assembler(&self) -> Assembler<Arc<N>> {
        Assembler::new(self.network.clone(), self.signer)
    }

    /// Per-call options layered on top of the configured ones.
    fn options(&self, options: TxOptions) -> TxOptions {
        let defaults = self.config.tx_options();
        TxOptions {
            lookup_tables: if options.lookup_tables.is_empty() {
                defaults.lookup_tables
            } else {
                options.lookup_tables
            },
            compute_unit_limit: options.compute_unit_limit.or(defaults.compute_unit_limit),
            compute_unit_price: options.compute_unit_price.or(defaults.compute_unit_price),
            jito_tip_lamports: options.jito_tip_lamports.or(defaults.jito_tip_lamports),
            ..options
        }
    }

    async fn fetch_account(&self, address: &Pubkey) -> Result<Vec<u8>, Error> {
        self.network
            .fetch(address)
            .await?
            .ok_or_else(|| vault_lib::Error::AccountNotFound(*address).into())
    }

    /// State at `state`, with its metadata when the metadata account exists.
    pub async fn fetch_state(&self, state: &Pubkey) -> Result<Decoded, Error> {
        let data = self.fetch_account(state).await?;
        let account =
            StateAccount::try_from_account_data(&data).map_err(vault_lib::Error::from)?;
        let mut decoded = account
            .into_model(*state)
            .map_err(vault_lib::Error::from)?;
        if let Some(metadata) = self.fetch_metadata(state).await? {
            decoded.state = decoded.state.with_metadata(metadata);
        }
        Ok(decoded)
    }

    pub async fn fetch_metadata(&self, state: &Pubkey) -> Result<Option<MetadataModel>, Error> {
        let (address, _) =
            find_metadata_pda(self.program_id(), state).map_err(vault_lib::Error::from)?;
        let Some(data) = self.network.fetch(&address).await? else {
            return Ok(None);
        };
        let decoded = MetadataAccount::try_from_account_data(&data)
            .and_then(|account| account.decode())
            .map_err(vault_lib::Error::from)?;
        if !decoded.skipped.is_empty() {
            tracing::warn!("skipped {} metadata fields of {}", decoded.skipped.len(), state);
        }
        Ok(Some(decoded.metadata))
    }

    /// Complete `partial` and build the transaction creating it. Returns the
    /// completed model along with the transaction.
    pub async fn create_state_tx(
        &self,
        partial: StateModel,
        today: NaiveDate,
        options: TxOptions,
    ) -> Result<(StateModel, SignableTransaction), Error> {
        let owner = self.signer(&options);
        let config = EnrichConfig::builder()
            .program_id(*self.program_id())
            .owner(owner)
            .today(today)
            .uris(self.config.uris.clone())
            .launch(self.config.launch.clone())
            .build();
        let model = enrich_state(partial, &config).map_err(vault_lib::Error::from)?;

        let state = model.id.ok_or(vault_lib::Error::Derive(
            vault_lib::pda::DeriveError::MissingIdentity,
        ))?;
        let addresses = VaultAddresses::derive(self.program_id(), state, model.share_classes.len())
            .map_err(vault_lib::Error::from)?;
        let (company, fund, share_classes, fund_managers) = encode_metadata(&model.metadata());
        let args = InitializeStateArgs {
            key: model.identity_key().unwrap_or_default(),
            params: encode_state(&model).into_params(),
            metadata: Some(MetadataArgs {
                company,
                fund,
                share_classes,
                fund_managers,
            }),
        };
        let ix = instructions::initialize_state(
            self.program_id(),
            &InitializeStateAccounts {
                state,
                vault: addresses.vault,
                metadata: addresses.metadata,
                signer: owner,
                mints: addresses.mints,
            },
            &args,
        )
        .map_err(vault_lib::Error::from)?;
        let tx = self.assembler().assemble(vec![ix], self.options(options)).await?;
        Ok((model, tx))
    }

    /// Partial update, only the fields set in `update` change.
    pub async fn update_state_tx(
        &self,
        state: &Pubkey,
        update: &StateModel,
        options: TxOptions,
    ) -> Result<SignableTransaction, Error> {
        let args = UpdateStateArgs {
            params: encode_state(update).into_params(),
        };
        let signer = self.signer(&options);
        let ix = instructions::update_state(self.program_id(), state, &signer, &args)
            .map_err(vault_lib::Error::from)?;
        Ok(self.assembler().assemble(vec![ix], self.options(options)).await?)
    }

    /// Deposit `amount` of `asset` into share class `share_class`. SOL
    /// deposits are wrapped first.
    pub async fn subscribe_tx(
        &self,
        state: &Pubkey,
        share_class: usize,
        asset: &Pubkey,
        amount: u64,
        options: TxOptions,
    ) -> Result<SignableTransaction, Error> {
        let signer = self.signer(&options);
        let model = self.fetch_state(state).await?.state;
        let (vault, _) =
            find_vault_pda(self.program_id(), state).map_err(vault_lib::Error::from)?;
        let (share_mint, _) =
            find_mint_pda(self.program_id(), state, share_class).map_err(vault_lib::Error::from)?;
        let share_class = u8::try_from(share_class).map_err(|_| {
            vault_lib::Error::Derive(vault_lib::pda::DeriveError::ShareClassIndexOutOfRange(
                share_class,
            ))
        })?;
        let meta = self
            .registry
            .lookup(asset)
            .ok_or(vault_lib::Error::Compose(
                vault_lib::remaining_accounts::ComposeError::MissingPricing(*asset),
            ))?;

        let composer = Composer {
            vault,
            registry: self.registry.as_ref(),
            custody: &AssociatedTokenCustody,
        };
        let pricing = composer
            .compose_for_pricing(&model.assets, &model.external_vault_accounts)
            .map_err(vault_lib::Error::from)?;

        let ix = instructions::subscribe(
            self.program_id(),
            &SubscribeAccounts {
                state: *state,
                vault,
                share_mint,
                asset: *asset,
                asset_token_program: meta.token_program,
                signer,
            },
            &SubscribeArgs {
                share_class,
                amount,
                skip_state: true,
            },
            pricing,
        )
        .map_err(vault_lib::Error::from)?;

        let mut options = options;
        if *asset == WSOL {
            let mut pre = instructions::wrap_sol(&signer, amount).map_err(vault_lib::Error::from)?;
            pre.append(&mut options.pre_instructions);
            options.pre_instructions = pre;
        }
        Ok(self.assembler().assemble(vec![ix], self.options(options)).await?)
    }

    /// Redeem `amount` shares of share class `share_class`.
    pub async fn redeem_tx(
        &self,
        state: &Pubkey,
        share_class: usize,
        amount: u64,
        in_kind: bool,
        options: TxOptions,
    ) -> Result<SignableTransaction, Error> {
        let signer = self.signer(&options);
        let model = self.fetch_state(state).await?.state;
        let (vault, _) =
            find_vault_pda(self.program_id(), state).map_err(vault_lib::Error::from)?;
        let (share_mint, _) =
            find_mint_pda(self.program_id(), state, share_class).map_err(vault_lib::Error::from)?;

        let composer = Composer {
            vault,
            registry: self.registry.as_ref(),
            custody: &AssociatedTokenCustody,
        };
        let withdrawal = composer
            .compose_for_withdrawal(
                &model.assets,
                &model.external_vault_accounts,
                &signer,
                in_kind,
            )
            .map_err(vault_lib::Error::from)?;

        let ix = instructions::redeem(
            self.program_id(),
            &RedeemAccounts {
                state: *state,
                vault,
                share_mint,
                signer,
            },
            &RedeemArgs {
                amount,
                in_kind,
                skip_state: true,
            },
            withdrawal.remaining,
        )
        .map_err(vault_lib::Error::from)?;

        let mut options = options;
        let mut pre = withdrawal.pre_instructions;
        pre.append(&mut options.pre_instructions);
        options.pre_instructions = pre;
        let paid_out = if in_kind {
            &model.assets[..]
        } else {
            &model.assets[..model.assets.len().min(1)]
        };
        if paid_out.contains(&WSOL) {
            options
                .post_instructions
                .push(instructions::unwrap_sol(&signer).map_err(vault_lib::Error::from)?);
        }
        Ok(self.assembler().assemble(vec![ix], self.options(options)).await?)
    }
}
