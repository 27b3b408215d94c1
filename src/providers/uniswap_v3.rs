use alloy::primitives::{Address, Uint, U256};
use alloy::providers::DynProvider;
use alloy::sol;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    NormalizedQuote, ProviderError, ProviderKind, QuoteRequest, RawQuote, SwapProvider,
};
use crate::constants;

sol! {
    #[sol(rpc)]
    contract IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }
        function quoteExactInputSingle(QuoteExactInputSingleParams params)
            external returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);
    }
}

/// Uniswap V3 온체인 직접 provider
///
/// QuoterV2에 대한 읽기 전용 시뮬레이션 호출(eth_call)로 견적을 낸다.
/// 상태 변경도 가스 소비도 없다. 표준 수수료 티어를 동시에 조회해서
/// 출력량이 가장 큰 티어를 쓴다.
pub struct UniswapV3Provider {
    rpc: DynProvider,
    quoter: Address,
    router: Address,
    chain_id: u64,
    fee_tiers: Vec<u32>,
}

impl UniswapV3Provider {
    pub fn new(rpc: DynProvider, chain_id: u64) -> Result<Self, ProviderError> {
        let quoter = constants::quoter_v2_address(chain_id)
            .ok_or(ProviderError::UnsupportedChain(chain_id))?;
        let router = constants::swap_router02_address(chain_id)
            .ok_or(ProviderError::UnsupportedChain(chain_id))?;

        Ok(Self {
            rpc,
            quoter,
            router,
            chain_id,
            fee_tiers: constants::DEFAULT_FEE_TIERS.to_vec(),
        })
    }

    pub fn with_fee_tiers(mut self, fee_tiers: Vec<u32>) -> Self {
        if !fee_tiers.is_empty() {
            self.fee_tiers = fee_tiers;
        }
        self
    }

    /// 풀 부재로 인한 revert인지 판별 (revert는 유동성 없음으로 취급)
    fn is_liquidity_miss(message: &str) -> bool {
        let lower = message.to_lowercase();
        lower.contains("revert") || lower.contains("unexpected error")
    }
}

#[async_trait]
impl SwapProvider for UniswapV3Provider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::UniswapV3
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn quote(&self, req: &QuoteRequest) -> Result<NormalizedQuote, ProviderError> {
        if req.amount_in.is_zero() {
            return Err(ProviderError::AmountTooSmall);
        }
        if req.chain_id() != self.chain_id {
            return Err(ProviderError::UnsupportedChain(req.chain_id()));
        }

        // 네이티브 자산은 래핑 토큰으로 치환해서 쿼터에 넣는다
        let token_in = req
            .asset_in
            .onchain_address()
            .ok_or(ProviderError::UnsupportedChain(self.chain_id))?;
        let token_out = req
            .asset_out
            .onchain_address()
            .ok_or(ProviderError::UnsupportedChain(self.chain_id))?;

        if token_in == token_out {
            // ETH↔WETH 래핑은 스왑 경로가 아니다
            return Err(ProviderError::NoLiquidity);
        }

        debug!(
            "🔄 Quoting Uniswap V3: {} -> {} ({} tiers)",
            req.asset_in,
            req.asset_out,
            self.fee_tiers.len()
        );

        let quoter = IQuoterV2::new(self.quoter, self.rpc.clone());

        let mut calls = Vec::with_capacity(self.fee_tiers.len());
        for fee in &self.fee_tiers {
            let fee = *fee;
            let params = IQuoterV2::QuoteExactInputSingleParams {
                tokenIn: token_in,
                tokenOut: token_out,
                amountIn: req.amount_in,
                fee: Uint::from(fee),
                sqrtPriceLimitX96: Uint::ZERO,
            };
            let call = quoter.quoteExactInputSingle(params);
            calls.push(async move { (fee, call.call().await) });
        }

        let results = futures::future::join_all(calls).await;

        let mut best: Option<(u32, U256, U256, u64)> = None;
        let mut last_rpc_error: Option<String> = None;

        for (fee, result) in results {
            match result {
                Ok(out) => {
                    let amount_out = out.amountOut;
                    if amount_out.is_zero() {
                        continue;
                    }
                    let is_better = best
                        .as_ref()
                        .map(|(_, prev, _, _)| amount_out > *prev)
                        .unwrap_or(true);
                    if is_better {
                        let gas = u64::try_from(out.gasEstimate)
                            .unwrap_or(constants::DEFAULT_SWAP_GAS_LIMIT);
                        best = Some((
                            fee,
                            amount_out,
                            out.sqrtPriceX96After.to::<U256>(),
                            gas,
                        ));
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    if Self::is_liquidity_miss(&message) {
                        debug!("  tier {} has no pool/liquidity", fee);
                    } else {
                        warn!("⚠️ Quoter call failed on tier {}: {}", fee, message);
                        last_rpc_error = Some(message);
                    }
                }
            }
        }

        match best {
            Some((fee_tier, amount_out, sqrt_price_x96_after, gas_estimate)) => {
                debug!(
                    "✅ Uniswap V3 quote: tier {} out {}",
                    fee_tier, amount_out
                );
                Ok(NormalizedQuote::build(
                    ProviderKind::UniswapV3,
                    req,
                    amount_out,
                    None, // QuoterV2 gives a post-trade price marker, not an impact figure
                    gas_estimate,
                    Some(self.router),
                    RawQuote::OnchainQuoter {
                        fee_tier,
                        sqrt_price_x96_after,
                        gas_estimate,
                    },
                ))
            }
            None => match last_rpc_error {
                Some(message) => Err(ProviderError::Rpc(message)),
                None => Err(ProviderError::NoLiquidity),
            },
        }
    }
}
