use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::U256;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{QuoteFailure, SwapError};
use crate::providers::{
    NormalizedQuote, ProviderError, ProviderKind, ProviderMetrics, QuoteRequest, SwapProvider,
};

/// 승자 선택 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    /// 유일하게 응답한 provider
    OnlyAvailable,
    /// 원시 출력량(최소 단위 정수 비교)이 가장 큼
    BestOutput,
    /// 출력량 동률, 오프체인 어그리게이터 우선 규칙 적용
    TieBreakAggregator,
}

impl SelectionReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SelectionReason::OnlyAvailable => "only available provider",
            SelectionReason::BestOutput => "largest raw output amount",
            SelectionReason::TieBreakAggregator => "tie broken toward aggregator routing",
        }
    }
}

/// provider별 집계 결과 (관측용)
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    pub provider: ProviderKind,
    pub latency_ms: u64,
    pub result: Result<U256, ProviderError>,
}

/// 어그리게이션 결과: 승자 견적 + 선택 리포트
#[derive(Debug, Clone)]
pub struct QuoteSelection {
    pub quote: NormalizedQuote,
    pub reason: SelectionReason,
    /// 승자 대비 차점자 출력량 차이 (%). 선택에는 영향이 없다.
    pub advantage_pct: Option<f64>,
    pub outcomes: Vec<ProviderOutcome>,
}

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("no liquidity: every provider failed to quote")]
    NoLiquidity {
        failures: Vec<(ProviderKind, ProviderError)>,
    },

    #[error("no providers registered for chain {0}")]
    NoProviders(u64),
}

impl From<AggregationError> for SwapError {
    fn from(e: AggregationError) -> Self {
        match e {
            AggregationError::NoLiquidity { .. } => SwapError::Quote(QuoteFailure::NoLiquidity),
            AggregationError::NoProviders(chain) => {
                SwapError::Unknown(format!("no providers configured for chain {}", chain))
            }
        }
    }
}

/// 견적 어그리게이터
///
/// 체인에 유효한 모든 provider로 동시에 팬아웃하고, 실패는 흡수하며,
/// 비교 규칙으로 승자를 뽑는다. provider 하나의 타임아웃/revert는
/// 그 provider의 실패일 뿐 어그리게이션의 실패가 아니다.
pub struct QuoteAggregator {
    providers: Vec<Arc<dyn SwapProvider>>,
    timeout: Duration,
    metrics: Mutex<HashMap<ProviderKind, ProviderMetrics>>,
}

impl QuoteAggregator {
    pub fn new(providers: Vec<Arc<dyn SwapProvider>>, timeout: Duration) -> Self {
        Self {
            providers,
            timeout,
            metrics: Mutex::new(HashMap::new()),
        }
    }

    /// provider 메트릭 스냅샷
    pub fn metrics(&self) -> HashMap<ProviderKind, ProviderMetrics> {
        self.metrics.lock().expect("metrics lock poisoned").clone()
    }

    /// 모든 유효 provider에서 견적을 모아 승자를 선택
    pub async fn aggregate(&self, req: &QuoteRequest) -> Result<QuoteSelection, AggregationError> {
        let chain_id = req.chain_id();
        let active: Vec<Arc<dyn SwapProvider>> = self
            .providers
            .iter()
            .filter(|p| p.chain_id() == chain_id)
            .map(Arc::clone)
            .collect();

        if active.is_empty() {
            return Err(AggregationError::NoProviders(chain_id));
        }

        debug!(
            "🔍 Aggregating quotes from {} provider(s) on chain {}",
            active.len(),
            chain_id
        );

        let timeout = self.timeout;
        let mut calls = Vec::with_capacity(active.len());
        for provider in active {
            calls.push(async move {
                let started = Instant::now();
                let result = match tokio::time::timeout(timeout, provider.quote(req)).await {
                    Ok(inner) => inner,
                    Err(_) => Err(ProviderError::Timeout(timeout)),
                };
                let latency_ms = started.elapsed().as_millis() as u64;
                (provider.kind(), latency_ms, result)
            });
        }

        let results = futures::future::join_all(calls).await;

        let mut quotes: Vec<NormalizedQuote> = Vec::new();
        let mut failures: Vec<(ProviderKind, ProviderError)> = Vec::new();
        let mut outcomes: Vec<ProviderOutcome> = Vec::new();

        for (kind, latency_ms, result) in results {
            let mut metrics = self.metrics.lock().expect("metrics lock poisoned");
            let entry = metrics.entry(kind).or_default();
            match result {
                Ok(quote) => {
                    entry.record_success(latency_ms);
                    debug!("  ✅ {}: {} ({}ms)", kind, quote.amount_out, latency_ms);
                    outcomes.push(ProviderOutcome {
                        provider: kind,
                        latency_ms,
                        result: Ok(quote.amount_out),
                    });
                    quotes.push(quote);
                }
                Err(e) => {
                    entry.record_failure(latency_ms);
                    warn!("  ❌ {}: {} ({}ms)", kind, e, latency_ms);
                    outcomes.push(ProviderOutcome {
                        provider: kind,
                        latency_ms,
                        result: Err(e.clone()),
                    });
                    failures.push((kind, e));
                }
            }
        }

        if quotes.is_empty() {
            return Err(AggregationError::NoLiquidity { failures });
        }

        let (winner, reason) = Self::select_winner(&quotes);
        let advantage_pct = Self::advantage_pct(&quotes, &winner);

        info!(
            "🏆 Winner: {} out={} ({}){}",
            winner.provider,
            winner.amount_out,
            reason.describe(),
            advantage_pct
                .map(|p| format!(", +{:.3}% vs runner-up", p))
                .unwrap_or_default()
        );

        Ok(QuoteSelection {
            quote: winner,
            reason,
            advantage_pct,
            outcomes,
        })
    }

    /// 비교 규칙: 원시 출력량이 엄격히 큰 쪽 승리, 동률이면 오프체인
    /// 어그리게이터 우선. 포맷된 문자열은 절대 비교하지 않는다.
    fn select_winner(quotes: &[NormalizedQuote]) -> (NormalizedQuote, SelectionReason) {
        let mut winner = &quotes[0];
        for candidate in &quotes[1..] {
            if candidate.amount_out > winner.amount_out {
                winner = candidate;
            } else if candidate.amount_out == winner.amount_out
                && candidate.provider.is_aggregator()
                && !winner.provider.is_aggregator()
            {
                winner = candidate;
            }
        }

        let reason = if quotes.len() == 1 {
            SelectionReason::OnlyAvailable
        } else if quotes
            .iter()
            .any(|q| q.provider != winner.provider && q.amount_out == winner.amount_out)
        {
            SelectionReason::TieBreakAggregator
        } else {
            SelectionReason::BestOutput
        };

        (winner.clone(), reason)
    }

    /// 승자와 차점자의 출력량 차이 (%). 성공이 둘 미만이면 None.
    fn advantage_pct(quotes: &[NormalizedQuote], winner: &NormalizedQuote) -> Option<f64> {
        let runner_up = quotes
            .iter()
            .filter(|q| q.provider != winner.provider)
            .map(|q| q.amount_out)
            .max()?;

        let winner_out = u128::try_from(winner.amount_out).ok()?;
        let runner_out = u128::try_from(runner_up).ok()?;
        if runner_out == 0 {
            return None;
        }
        Some((winner_out as f64 - runner_out as f64) / runner_out as f64 * 100.0)
    }
}
