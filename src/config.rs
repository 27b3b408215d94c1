use std::collections::HashMap;
use std::str::FromStr;

use alloy::primitives::Address;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::validation;
use crate::constants;
use crate::guards::PresetGuards;
use crate::types::Asset;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    #[serde(default)]
    pub explorer_url: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl NetworkConfig {
    /// 설정값이 없으면 내장 테이블로 떨어지는 익스플로러 URL
    pub fn effective_explorer_url(&self) -> Option<String> {
        self.explorer_url
            .clone()
            .or_else(|| constants::explorer_base_url(self.chain_id).map(|s| s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DexApiConfig {
    /// 0x API 키 (없어도 동작하지만 rate limit이 빡빡해진다)
    #[serde(default)]
    pub zeroex_api_key: Option<String>,
    /// 테스트/프록시용 base URL 오버라이드
    #[serde(default)]
    pub zeroex_base_url: Option<String>,
    #[serde(default = "default_quote_timeout")]
    pub quote_timeout_secs: u64,
}

impl Default for DexApiConfig {
    fn default() -> Self {
        Self {
            zeroex_api_key: None,
            zeroex_base_url: None,
            quote_timeout_secs: default_quote_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapSettingsConfig {
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u32,
    #[serde(default = "default_quote_ttl")]
    pub quote_ttl_secs: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// 온체인 쿼터가 시도할 수수료 티어
    #[serde(default = "default_fee_tiers")]
    pub fee_tiers: Vec<u32>,
}

impl Default for SwapSettingsConfig {
    fn default() -> Self {
        Self {
            default_slippage_bps: default_slippage_bps(),
            quote_ttl_secs: default_quote_ttl(),
            debounce_ms: default_debounce_ms(),
            fee_tiers: default_fee_tiers(),
        }
    }
}

/// 커스텀 토큰 등록 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    pub address: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub networks: Vec<NetworkConfig>,
    #[serde(default)]
    pub dex: DexApiConfig,
    #[serde(default)]
    pub swap: SwapSettingsConfig,
    /// 프리셋 가드 기본값 (사용자 편집본은 밖에서 들어온다)
    #[serde(default)]
    pub guards: PresetGuards,
    /// symbol → 주소/소수점 커스텀 등록 (내장 토큰 테이블보다 우선)
    #[serde(default)]
    pub tokens: HashMap<String, TokenEntry>,
}

fn default_true() -> bool {
    true
}
fn default_quote_timeout() -> u64 {
    constants::PROVIDER_TIMEOUT_SECS
}
fn default_slippage_bps() -> u32 {
    constants::DEFAULT_SLIPPAGE_BPS
}
fn default_quote_ttl() -> u64 {
    constants::QUOTE_TTL_SECS
}
fn default_debounce_ms() -> u64 {
    constants::DEBOUNCE_MS
}
fn default_fee_tiers() -> Vec<u32> {
    constants::DEFAULT_FEE_TIERS.to_vec()
}

impl Config {
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default() -> Self {
        Self {
            networks: vec![NetworkConfig {
                chain_id: constants::ETHEREUM,
                name: "mainnet".to_string(),
                rpc_url: "https://eth-mainnet.g.alchemy.com/v2/YOUR_API_KEY".to_string(),
                explorer_url: None,
                enabled: true,
            }],
            dex: DexApiConfig::default(),
            swap: SwapSettingsConfig::default(),
            guards: PresetGuards::default(),
            tokens: HashMap::new(),
        }
    }

    /// 환경 변수에서 민감한 값 적용 (dotenvy 로드 이후 호출)
    pub fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("ZEROEX_API_KEY") {
            if !api_key.is_empty() {
                debug!("🔑 0x API key loaded from environment");
                self.dex.zeroex_api_key = Some(api_key);
            }
        }
        if let Ok(rpc_url) = std::env::var("SWAPFLOW_RPC_URL") {
            if !rpc_url.is_empty() {
                if let Some(network) = self.networks.first_mut() {
                    debug!("🔌 RPC URL for {} overridden from environment", network.name);
                    network.rpc_url = rpc_url;
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.networks.is_empty() {
            return Err(anyhow!("at least one network must be configured"));
        }
        for network in &self.networks {
            if network.rpc_url.trim().is_empty() {
                return Err(anyhow!("network '{}' has an empty rpc_url", network.name));
            }
            if !validation::is_supported_chain(network.chain_id) {
                return Err(anyhow!(
                    "network '{}' uses unsupported chain id {}",
                    network.name,
                    network.chain_id
                ));
            }
        }
        if !validation::is_valid_slippage_bps(self.swap.default_slippage_bps) {
            return Err(anyhow!(
                "default_slippage_bps {} is out of range",
                self.swap.default_slippage_bps
            ));
        }
        if self.swap.quote_ttl_secs == 0 {
            return Err(anyhow!("quote_ttl_secs must be positive"));
        }
        if self.swap.fee_tiers.is_empty() {
            return Err(anyhow!("fee_tiers must not be empty"));
        }
        for (symbol, entry) in &self.tokens {
            if !validation::is_valid_address(&entry.address) {
                return Err(anyhow!("token '{}' has an invalid address", symbol));
            }
        }
        Ok(())
    }

    pub fn network(&self, chain_id: u64) -> Option<&NetworkConfig> {
        self.networks
            .iter()
            .find(|n| n.chain_id == chain_id && n.enabled)
    }

    /// 심볼을 자산으로 해석한다. 경계에서 단 한 번만 수행하며,
    /// 이후의 모든 코드는 `Asset`만 본다.
    ///
    /// 우선순위: 네이티브 심볼 → 커스텀 등록 → 내장 메인넷 테이블.
    pub fn resolve_asset(&self, chain_id: u64, symbol: &str) -> Result<Asset> {
        let upper = symbol.to_uppercase();

        if let Some(native) = constants::native_symbol(chain_id) {
            if upper == native {
                return Ok(Asset::native(&upper, chain_id));
            }
        }

        if let Some(entry) = self.tokens.get(&upper) {
            let address = Address::from_str(&entry.address)
                .map_err(|e| anyhow!("token '{}' address invalid: {}", upper, e))?;
            return Ok(Asset::token(&upper, address, entry.decimals, chain_id));
        }

        if chain_id == constants::ETHEREUM {
            if let (Some(address), Some(decimals)) = (
                constants::get_token_address(&upper),
                constants::get_token_decimals(&upper),
            ) {
                return Ok(Asset::token(&upper, address, decimals, chain_id));
            }
        }

        warn!("❓ Unknown token symbol '{}' on chain {}", symbol, chain_id);
        Err(anyhow!(
            "unknown token '{}' on chain {} (register it under [tokens])",
            symbol,
            chain_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.swap.default_slippage_bps, 50);
        assert_eq!(config.swap.quote_ttl_secs, 30);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml_src = r#"
            [[networks]]
            chain_id = 1
            name = "mainnet"
            rpc_url = "https://rpc.example"

            [dex]
            quote_timeout_secs = 4
        "#;
        let config: Config = toml::from_str(toml_src).unwrap();
        config.validate().unwrap();
        assert_eq!(config.dex.quote_timeout_secs, 4);
        assert_eq!(config.swap.debounce_ms, constants::DEBOUNCE_MS);
        assert_eq!(config.swap.fee_tiers, constants::DEFAULT_FEE_TIERS.to_vec());
        assert!(!config.guards.enabled);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut config = Config::default();
        config.networks[0].rpc_url = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.networks[0].chain_id = 4242;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.swap.default_slippage_bps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_native_and_builtin_assets() {
        let config = Config::default();

        let eth = config.resolve_asset(1, "eth").unwrap();
        assert!(eth.is_native);
        assert_eq!(eth.symbol, "ETH");

        let usdc = config.resolve_asset(1, "USDC").unwrap();
        assert!(!usdc.is_native);
        assert_eq!(usdc.decimals, 6);

        assert!(config.resolve_asset(1, "NOPE").is_err());
    }

    #[test]
    fn test_custom_token_overrides_builtin() {
        let mut config = Config::default();
        config.tokens.insert(
            "USDC".to_string(),
            TokenEntry {
                address: "0x1111111111111111111111111111111111111111".to_string(),
                decimals: 18,
            },
        );
        let usdc = config.resolve_asset(1, "USDC").unwrap();
        assert_eq!(usdc.decimals, 18);
        assert_eq!(
            usdc.address,
            Address::from_str("0x1111111111111111111111111111111111111111").unwrap()
        );
    }
}
