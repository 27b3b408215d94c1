use alloy::primitives::Address;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::str::FromStr;

// Chain IDs
pub const ETHEREUM: u64 = 1;
pub const OPTIMISM: u64 = 10;
pub const POLYGON: u64 = 137;
pub const ARBITRUM: u64 = 42161;

/// 지원하는 체인 목록
pub const SUPPORTED_CHAINS: [u64; 4] = [ETHEREUM, OPTIMISM, POLYGON, ARBITRUM];

// Swap lifecycle timing
pub const DEBOUNCE_MS: u64 = 350;
pub const QUOTE_TTL_SECS: u64 = 30;
pub const PROVIDER_TIMEOUT_SECS: u64 = 8;

// Slippage (basis points)
pub const DEFAULT_SLIPPAGE_BPS: u32 = 50; // 0.5%
pub const MAX_SLIPPAGE_BPS: u32 = 5_000; // 50%
pub const BPS_DENOMINATOR: u64 = 10_000;

// Uniswap V3 fee tiers tried by the on-chain quoter
pub const DEFAULT_FEE_TIERS: [u32; 3] = [500, 3_000, 10_000];

// Gas
pub const DEFAULT_SWAP_GAS_LIMIT: u64 = 300_000;
pub const APPROVAL_GAS_LIMIT: u64 = 60_000;

/// 네이티브 자산 플레이스홀더 주소 (오프체인 어그리게이터 관례)
pub const NATIVE_PLACEHOLDER: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";

// Common token addresses (mainnet)
pub const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
pub const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
pub const WBTC: &str = "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599";

/// 내장 메인넷 토큰 테이블 (symbol → 주소, 소수점)
static BUILTIN_TOKENS: Lazy<HashMap<&'static str, (Address, u8)>> = Lazy::new(|| {
    let mut tokens = HashMap::new();
    tokens.insert("WETH", (Address::from_str(WETH).unwrap(), 18));
    tokens.insert("USDC", (Address::from_str(USDC).unwrap(), 6));
    tokens.insert("USDT", (Address::from_str(USDT).unwrap(), 6));
    tokens.insert("DAI", (Address::from_str(DAI).unwrap(), 18));
    tokens.insert("WBTC", (Address::from_str(WBTC).unwrap(), 8));
    tokens
});

// Helper function to get mainnet token addresses
pub fn get_token_address(symbol: &str) -> Option<Address> {
    BUILTIN_TOKENS
        .get(symbol.to_uppercase().as_str())
        .map(|(address, _)| *address)
}

/// 내장 토큰의 소수점 자리수
pub fn get_token_decimals(symbol: &str) -> Option<u8> {
    BUILTIN_TOKENS
        .get(symbol.to_uppercase().as_str())
        .map(|(_, decimals)| *decimals)
}

/// 체인 네이티브 자산 심볼
pub fn native_symbol(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        ETHEREUM | OPTIMISM | ARBITRUM => Some("ETH"),
        POLYGON => Some("MATIC"),
        _ => None,
    }
}

/// 체인별 래핑 네이티브 토큰 주소
pub fn wrapped_native_address(chain_id: u64) -> Option<Address> {
    let addr = match chain_id {
        ETHEREUM => WETH,
        OPTIMISM => "0x4200000000000000000000000000000000000006",
        POLYGON => "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270", // WMATIC
        ARBITRUM => "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1",
        _ => return None,
    };
    Some(Address::from_str(addr).unwrap())
}

/// 체인별 Uniswap V3 QuoterV2 주소
pub fn quoter_v2_address(chain_id: u64) -> Option<Address> {
    let addr = match chain_id {
        ETHEREUM | OPTIMISM | POLYGON | ARBITRUM => {
            "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"
        }
        _ => return None,
    };
    Some(Address::from_str(addr).unwrap())
}

/// 체인별 Uniswap V3 SwapRouter02 주소
pub fn swap_router02_address(chain_id: u64) -> Option<Address> {
    let addr = match chain_id {
        ETHEREUM | OPTIMISM | POLYGON | ARBITRUM => {
            "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45"
        }
        _ => return None,
    };
    Some(Address::from_str(addr).unwrap())
}

/// 체인별 0x API base URL
pub fn zeroex_base_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        ETHEREUM => Some("https://api.0x.org"),
        OPTIMISM => Some("https://optimism.api.0x.org"),
        POLYGON => Some("https://polygon.api.0x.org"),
        ARBITRUM => Some("https://arbitrum.api.0x.org"),
        _ => None,
    }
}

/// 체인별 블록 익스플로러 URL
pub fn explorer_base_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        ETHEREUM => Some("https://etherscan.io"),
        OPTIMISM => Some("https://optimistic.etherscan.io"),
        POLYGON => Some("https://polygonscan.com"),
        ARBITRUM => Some("https://arbiscan.io"),
        _ => None,
    }
}

/// 트랜잭션 해시로부터 익스플로러 링크 생성
pub fn explorer_tx_link(chain_id: u64, tx_hash: &str) -> Option<String> {
    explorer_base_url(chain_id).map(|base| format!("{}/tx/{}", base, tx_hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_chain_addresses() {
        for chain_id in SUPPORTED_CHAINS {
            assert!(wrapped_native_address(chain_id).is_some());
            assert!(quoter_v2_address(chain_id).is_some());
            assert!(swap_router02_address(chain_id).is_some());
            assert!(zeroex_base_url(chain_id).is_some());
        }
        assert!(wrapped_native_address(99999).is_none());
    }

    #[test]
    fn test_explorer_link() {
        let link = explorer_tx_link(ETHEREUM, "0xabc").unwrap();
        assert_eq!(link, "https://etherscan.io/tx/0xabc");
    }
}
