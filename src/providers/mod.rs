pub mod uniswap_v3;
pub mod zeroex;

pub use uniswap_v3::UniswapV3Provider;
pub use zeroex::ZeroExProvider;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::common::formatting::format_units;
use crate::constants;
use crate::types::Asset;

/// 유동성 소스 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// 온체인 직접 쿼터 (Uniswap V3 QuoterV2 static call)
    UniswapV3,
    /// 오프체인 크로스 DEX 어그리게이터 (0x API)
    ZeroEx,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::UniswapV3 => "uniswap_v3",
            ProviderKind::ZeroEx => "0x",
        }
    }

    /// 오프체인 어그리게이터 여부 (동률일 때 우선권을 가진다)
    pub fn is_aggregator(&self) -> bool {
        matches!(self, ProviderKind::ZeroEx)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 어그리게이션 한 건에 대한 견적 요청
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub asset_in: Asset,
    pub asset_out: Asset,
    /// 최소 단위 기준 입력 수량
    pub amount_in: U256,
    /// 슬리피지 허용치 (basis points)
    pub slippage_bps: u32,
    /// 수신자 (오프체인 어그리게이터가 calldata에 넣는다)
    pub taker: Option<Address>,
}

impl QuoteRequest {
    pub fn chain_id(&self) -> u64 {
        self.asset_in.chain_id
    }
}

/// provider 원본 페이로드
///
/// 트랜잭션 빌더가 JSON을 다시 파싱하지 않도록 타입으로 고정한다.
#[derive(Debug, Clone)]
pub enum RawQuote {
    /// 온체인 쿼터 결과. calldata는 빌더가 라우터 호출로 직접 인코딩한다.
    OnchainQuoter {
        fee_tier: u32,
        sqrt_price_x96_after: U256,
        gas_estimate: u64,
    },
    /// 어그리게이터가 견적 시점에 돌려준 서명 준비 완료 calldata
    PreEncoded {
        to: Address,
        data: Bytes,
        value: U256,
        gas: u64,
    },
}

/// 공통 스키마로 정규화된 견적
///
/// 생성 이후 불변. 어그리게이션 호출이 소유하다가 라이프사이클
/// 컨트롤러로 넘어간다.
#[derive(Debug, Clone)]
pub struct NormalizedQuote {
    pub provider: ProviderKind,
    pub chain_id: u64,
    pub amount_in: U256,
    pub amount_out: U256,
    pub amount_out_formatted: String,
    /// 슬리피지 적용 최소 수령량 (basis-point 내림 연산)
    pub min_amount_out: U256,
    /// 예상 가격 영향 (%, provider가 주지 않으면 None)
    pub price_impact: Option<f64>,
    pub gas_hint: u64,
    /// ERC-20 승인 대상 (네이티브 입력이면 None)
    pub spender: Option<Address>,
    pub issued_at: DateTime<Utc>,
    pub raw: RawQuote,
}

impl NormalizedQuote {
    /// provider 결과를 공통 스키마로 정규화
    ///
    /// `min_amount_out` 계산은 반드시 여기서만 한다. provider마다 공식이
    /// 갈리면 슬리피지 의미가 경로에 따라 달라진다.
    pub fn build(
        provider: ProviderKind,
        req: &QuoteRequest,
        amount_out: U256,
        price_impact: Option<f64>,
        gas_hint: u64,
        spender: Option<Address>,
        raw: RawQuote,
    ) -> Self {
        Self {
            provider,
            chain_id: req.chain_id(),
            amount_in: req.amount_in,
            amount_out,
            amount_out_formatted: format_units(amount_out, req.asset_out.decimals),
            min_amount_out: min_amount_out_bps(amount_out, req.slippage_bps),
            price_impact,
            gas_hint,
            spender: if req.asset_in.is_native { None } else { spender },
            issued_at: Utc::now(),
            raw,
        }
    }

    /// 견적 발행 후 경과 시간
    pub fn age(&self) -> Duration {
        let millis = Utc::now()
            .signed_duration_since(self.issued_at)
            .num_milliseconds()
            .max(0) as u64;
        Duration::from_millis(millis)
    }

    /// TTL 기준 만료 여부
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }

    /// TTL까지 남은 유효 시간 (UI 카운트다운용, 실행을 막지는 않는다)
    pub fn remaining_validity(&self, ttl: Duration) -> Duration {
        ttl.saturating_sub(self.age())
    }

    /// ERC-20 승인이 필요한 견적인지
    pub fn requires_approval(&self) -> bool {
        self.spender.is_some()
    }
}

/// 슬리피지 최소 수령량: basis-point 정수 연산, 내림
pub fn min_amount_out_bps(amount_out: U256, slippage_bps: u32) -> U256 {
    let denominator = U256::from(constants::BPS_DENOMINATOR);
    let keep = denominator - U256::from(slippage_bps.min(constants::MAX_SLIPPAGE_BPS));
    amount_out * keep / denominator
}

/// provider 단위 에러
///
/// 어그리게이션 단계에서 흡수된다. 하나라도 성공하면 전체 실패가 아니다.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("no liquidity for the requested pair")]
    NoLiquidity,

    #[error("amount too small to quote")]
    AmountTooSmall,

    #[error("http error: {0}")]
    Http(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("chain {0} not supported by this provider")]
    UnsupportedChain(u64),
}

/// 스왑 견적 provider 트레이트
///
/// 구현체는 체인 하나에 바인딩된다. 견적 실패는 `ProviderError`로
/// 돌려주고 절대 패닉하지 않는다.
#[async_trait]
pub trait SwapProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn chain_id(&self) -> u64;

    /// 견적 조회 (읽기 전용, 상태 변경 없음)
    async fn quote(&self, req: &QuoteRequest) -> Result<NormalizedQuote, ProviderError>;
}

/// provider 상태 메트릭 (관측용)
#[derive(Debug, Clone, Default)]
pub struct ProviderMetrics {
    pub total_quotes: u64,
    pub successful_quotes: u64,
    pub failed_quotes: u64,
    pub consecutive_failures: u32,
    pub last_latency_ms: Option<u64>,
}

impl ProviderMetrics {
    pub fn record_success(&mut self, latency_ms: u64) {
        self.total_quotes += 1;
        self.successful_quotes += 1;
        self.consecutive_failures = 0;
        self.last_latency_ms = Some(latency_ms);
    }

    pub fn record_failure(&mut self, latency_ms: u64) {
        self.total_quotes += 1;
        self.failed_quotes += 1;
        self.consecutive_failures += 1;
        self.last_latency_ms = Some(latency_ms);
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_quotes == 0 {
            return 0.0;
        }
        self.successful_quotes as f64 / self.total_quotes as f64
    }

    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures < 5
    }
}

/// 체인에 유효한 provider 집합 구성
///
/// 이 설계에서는 체인마다 온체인 직접 provider 하나와 오프체인
/// 어그리게이터 하나다. provider를 더 붙여도 선택 알고리즘은 그대로다.
pub fn build_provider_set(
    config: &crate::config::Config,
    chain_id: u64,
    rpc: alloy::providers::DynProvider,
) -> Result<Vec<std::sync::Arc<dyn SwapProvider>>, ProviderError> {
    use std::sync::Arc;

    let uniswap = UniswapV3Provider::new(rpc, chain_id)?
        .with_fee_tiers(config.swap.fee_tiers.clone());
    let zeroex = ZeroExProvider::new(
        chain_id,
        config.dex.zeroex_api_key.clone(),
        config.dex.zeroex_base_url.clone(),
        Duration::from_secs(config.dex.quote_timeout_secs),
    )?;

    Ok(vec![Arc::new(uniswap), Arc::new(zeroex)])
}
