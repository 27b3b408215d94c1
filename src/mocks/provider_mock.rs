use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;

use crate::providers::{
    NormalizedQuote, ProviderError, ProviderKind, QuoteRequest, RawQuote, SwapProvider,
};

/// 스크립트로 제어되는 모의 provider
///
/// 고정 응답, 고정 실패, 호출 순서별 스크립트 세 가지 모드를 지원한다.
/// 지연을 걸어 느린 provider와 경쟁 조건을 재현할 수 있다.
#[derive(Clone)]
pub struct MockProvider {
    kind: ProviderKind,
    chain_id: u64,
    default_outcome: Result<U256, ProviderError>,
    delay: Duration,
    script: Arc<Mutex<VecDeque<(Duration, Result<U256, ProviderError>)>>>,
    calls: Arc<AtomicUsize>,
    spender: Address,
}

impl MockProvider {
    /// 항상 같은 출력량을 돌려주는 provider
    pub fn returning(kind: ProviderKind, chain_id: u64, amount_out: u64) -> Self {
        Self {
            kind,
            chain_id,
            default_outcome: Ok(U256::from(amount_out)),
            delay: Duration::from_millis(1),
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            spender: Address::repeat_byte(0xaa),
        }
    }

    /// 항상 같은 에러로 실패하는 provider
    pub fn failing(kind: ProviderKind, chain_id: u64, error: ProviderError) -> Self {
        Self {
            kind,
            chain_id,
            default_outcome: Err(error),
            delay: Duration::from_millis(1),
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            spender: Address::repeat_byte(0xaa),
        }
    }

    /// 호출 순서대로 (지연, 결과)를 소비하는 provider.
    /// 스크립트가 바닥나면 마지막 항목을 반복하는 대신 유동성 없음을 낸다.
    pub fn scripted(
        kind: ProviderKind,
        chain_id: u64,
        script: VecDeque<(Duration, Result<U256, ProviderError>)>,
    ) -> Self {
        Self {
            kind,
            chain_id,
            default_outcome: Err(ProviderError::NoLiquidity),
            delay: Duration::from_millis(1),
            script: Arc::new(Mutex::new(script)),
            calls: Arc::new(AtomicUsize::new(0)),
            spender: Address::repeat_byte(0xaa),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// trait object로 쓰기 위한 핸들. 내부 스크립트/카운터는 공유된다.
    pub fn clone_arc(&self) -> Arc<dyn SwapProvider> {
        Arc::new(self.clone())
    }

    /// 실제 quote 호출 횟수
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SwapProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn quote(&self, req: &QuoteRequest) -> Result<NormalizedQuote, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (delay, outcome) = {
            let mut script = self.script.lock().expect("mock script lock poisoned");
            match script.pop_front() {
                Some(step) => step,
                None => (self.delay, self.default_outcome.clone()),
            }
        };

        tokio::time::sleep(delay).await;

        let amount_out = outcome?;
        Ok(NormalizedQuote::build(
            self.kind,
            req,
            amount_out,
            Some(0.1),
            210_000,
            Some(self.spender),
            RawQuote::PreEncoded {
                to: self.spender,
                data: Bytes::from(vec![0xd9, 0x62, 0x7a, 0xa4]),
                value: U256::ZERO,
                gas: 210_000,
            },
        ))
    }
}
