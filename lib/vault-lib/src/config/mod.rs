//! Client configuration, read from the environment or deserialized.

use crate::assembler::TxOptions;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use solana_pubkey::{Pubkey, pubkey};
use std::{
    collections::HashMap,
    str::FromStr,
    sync::LazyLock,
};
use thiserror::Error as ThisError;

pub mod env {
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const VAULT_PROGRAM_ID: &str = "VAULT_PROGRAM_ID";
    pub const SOLANA_NETWORK: &str = "SOLANA_NETWORK";
    pub const SOLANA_RPC_URL: &str = "SOLANA_RPC_URL";
    pub const COMPUTE_UNIT_LIMIT: &str = "COMPUTE_UNIT_LIMIT";
    pub const COMPUTE_UNIT_PRICE: &str = "COMPUTE_UNIT_PRICE";
    pub const JITO_TIP_LAMPORTS: &str = "JITO_TIP_LAMPORTS";
    /// Comma separated addresses.
    pub const LOOKUP_TABLES: &str = "LOOKUP_TABLES";
    pub const PRODUCT_URI_TEMPLATE: &str = "PRODUCT_URI_TEMPLATE";
    pub const METADATA_URI_TEMPLATE: &str = "METADATA_URI_TEMPLATE";
    pub const MINT_URI_TEMPLATE: &str = "MINT_URI_TEMPLATE";
    pub const IMAGE_URI_TEMPLATE: &str = "IMAGE_URI_TEMPLATE";
    pub const STAMP_LAUNCH_DATES: &str = "STAMP_LAUNCH_DATES";
}

pub const DEFAULT_PROGRAM_ID: Pubkey = pubkey!("Gco1pcjxCMYjKJjSNJ7mKV7qezeUTE7arXJgy7PAPNRc");

#[derive(ThisError, Debug, Clone)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error(transparent)]
    UnknownNetwork(#[from] UnknownNetwork),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolanaNet {
    #[serde(rename = "devnet")]
    Devnet,
    #[serde(rename = "testnet")]
    Testnet,
    #[serde(rename = "mainnet-beta")]
    Mainnet,
}

/// Unknown Solana network.
#[derive(Debug, Clone, ThisError)]
#[error("unknown network: {0}")]
pub struct UnknownNetwork(pub String);

impl FromStr for SolanaNet {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "devnet" => Ok(Self::Devnet),
            "testnet" => Ok(Self::Testnet),
            "mainnet-beta" => Ok(Self::Mainnet),
            s => Err(UnknownNetwork(s.to_owned())),
        }
    }
}

impl SolanaNet {
    pub fn url(&self) -> String {
        match self {
            SolanaNet::Devnet => {
                static URL: LazyLock<String> = LazyLock::new(|| {
                    std::env::var("SOLANA_DEVNET_URL")
                        .unwrap_or_else(|_| "https://api.devnet.solana.com".to_owned())
                });
                URL.clone()
            }
            SolanaNet::Testnet => {
                static URL: LazyLock<String> = LazyLock::new(|| {
                    std::env::var("SOLANA_TESTNET_URL")
                        .unwrap_or_else(|_| "https://api.testnet.solana.com".to_owned())
                });
                URL.clone()
            }
            SolanaNet::Mainnet => {
                static URL: LazyLock<String> = LazyLock::new(|| {
                    std::env::var("SOLANA_MAINNET_URL")
                        .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_owned())
                });
                URL.clone()
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolanaNet::Devnet => "devnet",
            SolanaNet::Testnet => "testnet",
            SolanaNet::Mainnet => "mainnet-beta",
        }
    }

    pub fn from_url(url: &str) -> Result<Self, UnknownNetwork> {
        if url.contains("devnet") {
            Ok(SolanaNet::Devnet)
        } else if url.contains("testnet") {
            Ok(SolanaNet::Testnet)
        } else if url.contains("mainnet") {
            Ok(SolanaNet::Mainnet)
        } else {
            Err(UnknownNetwork(url.to_owned()))
        }
    }
}

/// URI templates, `{state}` and `{mint}` are replaced by base58 addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UriTemplates {
    pub product: String,
    pub metadata: String,
    pub mint: String,
    pub image: String,
}

impl Default for UriTemplates {
    fn default() -> Self {
        Self {
            product: "https://gui.glam.systems/products/{state}".to_owned(),
            metadata: "https://api.glam.systems/v0/openfunds?fund={state}".to_owned(),
            mint: "https://api.glam.systems/metadata/{mint}".to_owned(),
            image: "https://api.glam.systems/v0/sparkle?key={mint}&format=png".to_owned(),
        }
    }
}

impl UriTemplates {
    pub fn product(&self, state: &Pubkey) -> String {
        self.product.replace("{state}", &state.to_string())
    }

    pub fn metadata(&self, state: &Pubkey) -> String {
        self.metadata.replace("{state}", &state.to_string())
    }

    pub fn mint(&self, mint: &Pubkey) -> String {
        self.mint.replace("{mint}", &mint.to_string())
    }

    pub fn image(&self, mint: &Pubkey) -> String {
        self.image.replace("{mint}", &mint.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchPolicy {
    /// Stamp today's date as launch date of enabled vaults and active share classes.
    pub stamp_launch_dates: bool,
    /// `share_class_lifecycle` value that counts as launched.
    pub active_lifecycle: String,
}

impl Default for LaunchPolicy {
    fn default() -> Self {
        Self {
            stamp_launch_dates: true,
            active_lifecycle: "active".to_owned(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub program_id: Pubkey,
    pub network: SolanaNet,
    pub rpc_url: Option<String>,
    pub compute_unit_limit: Option<u32>,
    pub compute_unit_price: Option<u64>,
    pub jito_tip_lamports: Option<u64>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub lookup_tables: Vec<Pubkey>,
    pub uris: UriTemplates,
    pub launch: LaunchPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            program_id: DEFAULT_PROGRAM_ID,
            network: SolanaNet::Devnet,
            rpc_url: None,
            compute_unit_limit: None,
            compute_unit_price: None,
            jito_tip_lamports: None,
            lookup_tables: Vec::new(),
            uris: <_>::default(),
            launch: <_>::default(),
        }
    }
}

fn parse<T: FromStr>(
    map: &HashMap<String, String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    map.get(key)
        .map(|value| {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                key,
                value: value.clone(),
            })
        })
        .transpose()
}

impl ClientConfig {
    pub fn from_env(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(program_id) = parse(map, env::VAULT_PROGRAM_ID)? {
            config.program_id = program_id;
        }
        if let Some(url) = map.get(env::SOLANA_RPC_URL) {
            config.network = SolanaNet::from_url(url).unwrap_or(config.network);
            config.rpc_url = Some(url.clone());
        }
        if let Some(network) = map.get(env::SOLANA_NETWORK) {
            config.network = network.parse()?;
        }
        config.compute_unit_limit = parse(map, env::COMPUTE_UNIT_LIMIT)?;
        config.compute_unit_price = parse(map, env::COMPUTE_UNIT_PRICE)?;
        config.jito_tip_lamports = parse(map, env::JITO_TIP_LAMPORTS)?;
        if let Some(tables) = map.get(env::LOOKUP_TABLES) {
            config.lookup_tables = tables
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse().map_err(|_| ConfigError::InvalidValue {
                        key: env::LOOKUP_TABLES,
                        value: s.to_owned(),
                    })
                })
                .collect::<Result<_, _>>()?;
        }
        for (key, template) in [
            (env::PRODUCT_URI_TEMPLATE, &mut config.uris.product),
            (env::METADATA_URI_TEMPLATE, &mut config.uris.metadata),
            (env::MINT_URI_TEMPLATE, &mut config.uris.mint),
            (env::IMAGE_URI_TEMPLATE, &mut config.uris.image),
        ] {
            if let Some(value) = map.get(key) {
                *template = value.clone();
            }
        }
        if let Some(stamp) = parse(map, env::STAMP_LAUNCH_DATES)? {
            config.launch.stamp_launch_dates = stamp;
        }
        Ok(config)
    }

    pub fn rpc_url(&self) -> String {
        self.rpc_url.clone().unwrap_or_else(|| self.network.url())
    }

    /// Per-call transaction options seeded from this config.
    pub fn tx_options(&self) -> TxOptions {
        TxOptions {
            lookup_tables: self.lookup_tables.clone(),
            compute_unit_limit: self.compute_unit_limit,
            compute_unit_price: self.compute_unit_price,
            jito_tip_lamports: self.jito_tip_lamports,
            ..<_>::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use env::*;

    #[test]
    fn test_parse_config() {
        fn t<const N: usize>(kv: [(&str, &str); N], result: ClientConfig) {
            let map = kv
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect::<HashMap<_, _>>();
            let c = ClientConfig::from_env(&map).unwrap();
            let l = serde_json::to_string_pretty(&c).unwrap();
            let r = serde_json::to_string_pretty(&result).unwrap();
            assert_eq!(l, r);
        }
        t([], ClientConfig::default());
        t(
            [(SOLANA_RPC_URL, "https://mainnet.helius-rpc.com/?api-key=x")],
            ClientConfig {
                network: SolanaNet::Mainnet,
                rpc_url: Some("https://mainnet.helius-rpc.com/?api-key=x".to_owned()),
                ..<_>::default()
            },
        );
        t(
            [
                (VAULT_PROGRAM_ID, "HJbqSuV94woJfyxFNnJyfQdACvvJYaNWsW1x6wmJ8kiq"),
                (SOLANA_NETWORK, "testnet"),
                (COMPUTE_UNIT_LIMIT, "400000"),
                (COMPUTE_UNIT_PRICE, "50000"),
                (
                    LOOKUP_TABLES,
                    "HJbqSuV94woJfyxFNnJyfQdACvvJYaNWsW1x6wmJ8kiq, Gco1pcjxCMYjKJjSNJ7mKV7qezeUTE7arXJgy7PAPNRc",
                ),
                (MINT_URI_TEMPLATE, "https://example.org/{mint}.json"),
                (STAMP_LAUNCH_DATES, "false"),
            ],
            ClientConfig {
                program_id: pubkey!("HJbqSuV94woJfyxFNnJyfQdACvvJYaNWsW1x6wmJ8kiq"),
                network: SolanaNet::Testnet,
                compute_unit_limit: Some(400000),
                compute_unit_price: Some(50000),
                lookup_tables: vec![
                    pubkey!("HJbqSuV94woJfyxFNnJyfQdACvvJYaNWsW1x6wmJ8kiq"),
                    DEFAULT_PROGRAM_ID,
                ],
                uris: UriTemplates {
                    mint: "https://example.org/{mint}.json".to_owned(),
                    ..<_>::default()
                },
                launch: LaunchPolicy {
                    stamp_launch_dates: false,
                    ..<_>::default()
                },
                ..<_>::default()
            },
        );
    }

    #[test]
    fn test_parse_config_errors() {
        let map = HashMap::from([(COMPUTE_UNIT_PRICE.to_owned(), "cheap".to_owned())]);
        assert!(matches!(
            ClientConfig::from_env(&map),
            Err(ConfigError::InvalidValue {
                key: COMPUTE_UNIT_PRICE,
                ..
            })
        ));
        let map = HashMap::from([(SOLANA_NETWORK.to_owned(), "localnet".to_owned())]);
        assert!(matches!(
            ClientConfig::from_env(&map),
            Err(ConfigError::UnknownNetwork(_))
        ));
    }

    #[test]
    fn test_uri_templates() {
        let state = Pubkey::new_unique();
        let uris = UriTemplates::default();
        assert_eq!(
            uris.product(&state),
            format!("https://gui.glam.systems/products/{state}")
        );
        assert!(uris.image(&state).ends_with("&format=png"));
    }
}
