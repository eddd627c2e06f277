//! Asset metadata: where each asset's price comes from and which token program owns it.

use crate::config::SolanaNet;
use solana_pubkey::{Pubkey, pubkey};
use std::collections::HashMap;

pub const WSOL: Pubkey = pubkey!("So11111111111111111111111111111111111111112");
pub const USDC: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
pub const USDT: Pubkey = pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB");
pub const BTC: Pubkey = pubkey!("3NZ9JMVBmGAqocybic2c7LQCJScmgsAZ6vQqTDzcqmJh");
pub const TBTC: Pubkey = pubkey!("6DNSN2BJsaPFdFFc1zP37kkeNe4Usc1Sqkzr9C9vPWcU");
pub const ETH: Pubkey = pubkey!("7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs");
pub const PYTH: Pubkey = pubkey!("HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3");
pub const BONK: Pubkey = pubkey!("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263");
pub const MSOL: Pubkey = pubkey!("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So");

pub const TOKEN_PROGRAM_ID: Pubkey = spl_token::ID;
pub const TOKEN_2022_PROGRAM_ID: Pubkey = pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetMeta {
    /// Token program owning the mint.
    pub token_program: Pubkey,
    /// Oracle price feed.
    pub pricing_account: Option<Pubkey>,
    /// Program state the price is derived from, e.g. a stake pool.
    pub state_account: Option<Pubkey>,
}

impl AssetMeta {
    pub const fn oracle(pricing_account: Pubkey) -> Self {
        Self {
            token_program: TOKEN_PROGRAM_ID,
            pricing_account: Some(pricing_account),
            state_account: None,
        }
    }

    pub const fn state(state_account: Pubkey) -> Self {
        Self {
            token_program: TOKEN_PROGRAM_ID,
            pricing_account: None,
            state_account: Some(state_account),
        }
    }

    /// Account the program prices this asset with, the state account if there is one.
    pub fn price_reference(&self) -> Option<Pubkey> {
        self.state_account.or(self.pricing_account)
    }
}

pub trait AssetRegistry {
    fn lookup(&self, asset: &Pubkey) -> Option<AssetMeta>;
}

impl<F> AssetRegistry for F
where
    F: Fn(&Pubkey) -> Option<AssetMeta>,
{
    fn lookup(&self, asset: &Pubkey) -> Option<AssetMeta> {
        self(asset)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    assets: HashMap<Pubkey, AssetMeta>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, asset: Pubkey, meta: AssetMeta) -> Self {
        self.assets.insert(asset, meta);
        self
    }

    pub fn for_network(network: SolanaNet) -> Self {
        match network {
            SolanaNet::Mainnet => Self::mainnet(),
            SolanaNet::Devnet => Self::devnet(),
            SolanaNet::Testnet => Self::new(),
        }
    }

    pub fn mainnet() -> Self {
        Self::new()
            .with(WSOL, AssetMeta::oracle(pubkey!("H6ARHf6YXhGYeQfUzQNGk6rDNnLBQKrenN712K4AQJEG")))
            .with(USDC, AssetMeta::oracle(pubkey!("Gnt27xtC473ZT2Mw5u8wZ68Z3gULkSTb5DuxJy7eJotD")))
            .with(USDT, AssetMeta::oracle(pubkey!("3vxLXJqLqF3JG5TCbYycbKWRBbCJQLxQmBGCkyqEEefL")))
            .with(BTC, AssetMeta::oracle(pubkey!("Eavb8FKNoYPbHnSS8kMi4tnUh8qK8bqxTjCojer4pZrr")))
            .with(TBTC, AssetMeta::oracle(pubkey!("6qCHPXxQiCiM3dEE4W6fpZk17uSZW9WBpD7cyN8Tg2Ac")))
            .with(ETH, AssetMeta::oracle(pubkey!("JBu1AL4obBcCMqKBBxhpWCNUt136ijcuMZLFvTP7iWdB")))
            .with(PYTH, AssetMeta::state(pubkey!("nrYkQQQur7z8rYTST3G9GqATviK5SxTDkrqd21MW6Ue")))
            .with(BONK, AssetMeta::state(pubkey!("8ihFLu5FimgTQ1Unh4dVyEHUGodJ5gJQCrQf4KUVB9bN")))
            .with(MSOL, AssetMeta::state(pubkey!("8szGkuLTAux9XMgZ2vtY39jVSowEcpBfFfD8hXSEqdGC")))
    }

    pub fn devnet() -> Self {
        Self::new()
            .with(WSOL, AssetMeta::oracle(pubkey!("J83w4HKfqxwcq3BEMMkPFSppX3gqekLyLJBexebFVkix")))
            // USDC (Drift)
            .with(
                pubkey!("8zGuJQqwhZafTah7Uc7Z4tXRnguqkn5KLFAP8oV6PHe2"),
                AssetMeta::oracle(pubkey!("5SSkXsEKQepHHAewytPVwdej4epN1nxgLVM84L4KXgy7")),
            )
            // BTC (Drift)
            .with(
                pubkey!("3BZPwbcqB5kKScF3TEXxwNfx5ipV13kbRVDvfVp5c6fv"),
                AssetMeta::oracle(pubkey!("HovQMDrbAgAYPCmHVSrezcSmkMtXSSUsLDFANExrZh2J")),
            )
            .with(MSOL, AssetMeta::state(pubkey!("8szGkuLTAux9XMgZ2vtY39jVSowEcpBfFfD8hXSEqdGC")))
    }
}

impl AssetRegistry for StaticRegistry {
    fn lookup(&self, asset: &Pubkey) -> Option<AssetMeta> {
        self.assets.get(asset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_reference_prefers_state() {
        let pricing = Pubkey::new_unique();
        let state = Pubkey::new_unique();
        let meta = AssetMeta {
            token_program: TOKEN_PROGRAM_ID,
            pricing_account: Some(pricing),
            state_account: Some(state),
        };
        assert_eq!(meta.price_reference(), Some(state));
        assert_eq!(AssetMeta::oracle(pricing).price_reference(), Some(pricing));
    }

    #[test]
    fn test_network_tables() {
        let mainnet = StaticRegistry::for_network(SolanaNet::Mainnet);
        assert_eq!(
            mainnet.lookup(&MSOL).unwrap().price_reference(),
            Some(pubkey!("8szGkuLTAux9XMgZ2vtY39jVSowEcpBfFfD8hXSEqdGC"))
        );
        assert!(mainnet.lookup(&USDC).is_some());
        let devnet = StaticRegistry::for_network(SolanaNet::Devnet);
        assert!(devnet.lookup(&USDC).is_none());
        assert_ne!(
            devnet.lookup(&WSOL).unwrap().pricing_account,
            mainnet.lookup(&WSOL).unwrap().pricing_account
        );
    }
}
