use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants;

/// 스왑 대상 자산
///
/// 문자열/객체가 섞여 들어오던 경계를 하나의 필수 타입으로 고정한다.
/// 네이티브 자산 여부는 `is_native`로만 판별하며, 주소 해석은
/// 생성 시점에 한 번만 수행한다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    pub chain_id: u64,
    pub is_native: bool,
}

impl Asset {
    /// ERC-20 토큰 자산 생성
    pub fn token(symbol: &str, address: Address, decimals: u8, chain_id: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            address,
            decimals,
            chain_id,
            is_native: false,
        }
    }

    /// 체인 네이티브 자산 생성 (ETH, MATIC 등)
    pub fn native(symbol: &str, chain_id: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            address: Address::from_str(constants::NATIVE_PLACEHOLDER).unwrap(),
            decimals: 18,
            chain_id,
            is_native: true,
        }
    }

    /// 온체인 쿼터 호출용 주소 (네이티브 → 래핑 토큰 매핑)
    pub fn onchain_address(&self) -> Option<Address> {
        if self.is_native {
            constants::wrapped_native_address(self.chain_id)
        } else {
            Some(self.address)
        }
    }

    /// 오프체인 어그리게이터 API용 주소 (네이티브 플레이스홀더 유지)
    pub fn api_address(&self) -> Address {
        self.address
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.symbol, self.chain_id)
    }
}

/// 안전 등급 (인텔리전스 입력의 일부)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Danger,
}

/// 안전 점수 세부 요인
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyFactor {
    pub name: String,
    pub score: f64,
    pub description: String,
}

/// 외부에서 계산되어 전달되는 토큰 인텔리전스
///
/// 이 코어는 읽기만 하고 절대 계산하지 않는다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIntelligence {
    /// 안전 점수 (0 ~ 100)
    pub safety_score: f64,
    pub safety_level: SafetyLevel,
    #[serde(default)]
    pub factors: Vec<SafetyFactor>,
    /// 예상 가격 영향 (%, 예: 3.1 = 3.1%)
    pub price_impact_pct: Option<f64>,
    /// 유동성 (USD)
    pub liquidity_usd: Option<f64>,
}
