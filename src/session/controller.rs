use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::aggregator::QuoteAggregator;
use crate::common::formatting::short_hex;
use crate::constants;
use crate::errors::{QuoteFailure, SwapError};
use crate::execution::{
    build_approval, build_swap_transaction, AllowanceSource, SignerError, SwapBuildParams,
    TransactionSigner,
};
use crate::guards::{self, PresetGuards};
use crate::providers::QuoteRequest;
use crate::session::generation::RequestGeneration;
use crate::session::state::{
    QuoteInput, SwapErrorInfo, SwapState, SwapStatus, TransitionRecord,
};
use crate::types::TokenIntelligence;
use crate::wallet::{Subscription, WalletEventBroker};

/// 컨트롤러 동작 파라미터
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// 연속 입력을 하나로 합치는 디바운스 창
    pub debounce: Duration,
    /// 견적 유효 시간 (UI 카운트다운 기준)
    pub quote_ttl: Duration,
    /// 슬리피지 허용치 (basis points)
    pub slippage_bps: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(constants::DEBOUNCE_MS),
            quote_ttl: Duration::from_secs(constants::QUOTE_TTL_SECS),
            slippage_bps: constants::DEFAULT_SLIPPAGE_BPS,
        }
    }
}

/// confirm() 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// 스왑이 포함·확정됨
    Executed { tx_hash: String },
    /// 사용자가 승인 트랜잭션을 지갑에서 거부 (프리뷰로 복귀)
    ApprovalRejected,
    /// 사용자가 스왑 서명을 지갑에서 거부 (프리뷰로 복귀)
    SwapRejected,
    /// 프리셋 가드가 실행을 차단
    Blocked { reason: String },
    /// 지갑 이벤트/리셋이 도중에 세션을 취소
    Cancelled,
}

enum ApprovalStep {
    Approved,
    Rejected,
    Cancelled,
}

/// 스왑 라이프사이클 컨트롤러
///
/// 세션 하나의 `SwapState`와 `RequestGeneration`을 단독으로 소유하는
/// 상태 머신. 전역 싱글턴이 아니라 명시적으로 만들어 내려보낸다.
/// 견적 → 승인 확인 → 프리뷰 → 승인 → 실행 → 확정 흐름의 모든 전이는
/// 전이 표를 거치고 기록으로 남는다.
pub struct SwapLifecycleController {
    session_id: Uuid,
    settings: ControllerSettings,
    state: Arc<Mutex<SwapState>>,
    transitions: Arc<Mutex<Vec<TransitionRecord>>>,
    generation: Arc<RequestGeneration>,
    aggregator: Arc<QuoteAggregator>,
    allowance: Arc<dyn AllowanceSource>,
    signer: Arc<dyn TransactionSigner>,
    broker: Arc<WalletEventBroker>,
    subscription: Arc<Mutex<Option<Subscription>>>,
}

impl SwapLifecycleController {
    pub fn new(
        aggregator: Arc<QuoteAggregator>,
        allowance: Arc<dyn AllowanceSource>,
        signer: Arc<dyn TransactionSigner>,
        broker: Arc<WalletEventBroker>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            settings,
            state: Arc::new(Mutex::new(SwapState::new())),
            transitions: Arc::new(Mutex::new(Vec::new())),
            generation: Arc::new(RequestGeneration::new()),
            aggregator,
            allowance,
            signer,
            broker,
            subscription: Arc::new(Mutex::new(None)),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    fn short_id(&self) -> String {
        self.session_id.to_string()[..8].to_string()
    }

    pub fn status(&self) -> SwapStatus {
        self.state.lock().expect("swap state lock poisoned").status
    }

    /// 현재 상태 스냅샷 (표시용 복사본)
    pub fn state_snapshot(&self) -> SwapState {
        self.state.lock().expect("swap state lock poisoned").clone()
    }

    /// 전이 기록 스냅샷 (진단/테스트 단언용)
    pub fn transitions(&self) -> Vec<TransitionRecord> {
        self.transitions
            .lock()
            .expect("transition log lock poisoned")
            .clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.current()
    }

    /// 프리뷰 견적의 남은 유효 시간. UI 카운트다운 전용으로,
    /// 실행을 직접 막지는 않는다.
    pub fn quote_countdown(&self) -> Option<Duration> {
        self.state
            .lock()
            .expect("swap state lock poisoned")
            .current_quote
            .as_ref()
            .map(|q| q.remaining_validity(self.settings.quote_ttl))
    }

    // -----------------------------------------------------------------------
    // Quote flow
    // -----------------------------------------------------------------------

    /// 디바운스된 견적 요청
    ///
    /// 창 안에서 연달아 호출되면 마지막 호출만 실제 어그리게이션을
    /// 일으킨다. 세대가 뒤처진 응답은 네트워크 경계에서 조용히
    /// 버려진다. 추월당한 의도는 실패가 아니다.
    pub async fn request_quote(&self, input: QuoteInput) -> Result<(), SwapError> {
        if input.amount_in.is_zero() {
            return Err(SwapError::Quote(QuoteFailure::AmountTooSmall));
        }
        if input.asset_in.chain_id != input.asset_out.chain_id {
            return Err(SwapError::Unknown(
                "swap pair spans two different chains".to_string(),
            ));
        }
        if input.asset_in == input.asset_out {
            return Err(SwapError::Unknown("identical swap pair".to_string()));
        }
        if self.signer.chain_id() != input.asset_in.chain_id {
            return Err(SwapError::Wallet(format!(
                "signer is on chain {} but the swap targets chain {}",
                self.signer.chain_id(),
                input.asset_in.chain_id
            )));
        }

        {
            let st = self.state.lock().expect("swap state lock poisoned");
            if st.status.is_terminal() {
                return Err(SwapError::Unknown(format!(
                    "reset() is required from {} before a new quote",
                    st.status
                )));
            }
            if !SwapStatus::can_transition(st.status, SwapStatus::FetchingQuote) {
                return Err(SwapError::Unknown(format!(
                    "cannot start a quote while {}",
                    st.status
                )));
            }
        }

        let gen = self.generation.begin();
        self.ensure_subscribed();
        self.transition(SwapStatus::FetchingQuote, Some(format!("gen {}", gen)))?;

        tokio::time::sleep(self.settings.debounce).await;
        if !self.generation.is_current(gen) {
            debug!(
                "⏭ [{}] input superseded during debounce (gen {})",
                self.short_id(),
                gen
            );
            return Ok(());
        }

        let request = QuoteRequest {
            asset_in: input.asset_in.clone(),
            asset_out: input.asset_out.clone(),
            amount_in: input.amount_in,
            slippage_bps: self.settings.slippage_bps,
            taker: Some(self.signer.address()),
        };

        let outcome = self.aggregator.aggregate(&request).await;

        if !self.generation.is_current(gen) {
            debug!(
                "🗑 [{}] stale quote response dropped (gen {}, current {})",
                self.short_id(),
                gen,
                self.generation.current()
            );
            return Ok(());
        }

        let selection = match outcome {
            Ok(selection) => selection,
            Err(e) => {
                let swap_err: SwapError = e.into();
                self.fail(&swap_err);
                return Err(swap_err);
            }
        };

        if !self.guard_transition(SwapStatus::CheckingAllowance, None)? {
            return Ok(());
        }

        let needs_approval = match selection.quote.spender {
            Some(spender) if !input.asset_in.is_native => {
                match self
                    .allowance
                    .needs_approval(
                        &input.asset_in,
                        self.signer.address(),
                        spender,
                        input.amount_in,
                    )
                    .await
                {
                    Ok(needs) => needs,
                    Err(e) => {
                        if !self.generation.is_current(gen) {
                            debug!("🗑 [{}] stale allowance error dropped", self.short_id());
                            return Ok(());
                        }
                        self.fail(&e);
                        return Err(e);
                    }
                }
            }
            _ => false,
        };

        if !self.generation.is_current(gen) {
            debug!("🗑 [{}] stale allowance result dropped", self.short_id());
            return Ok(());
        }

        {
            let mut st = self.state.lock().expect("swap state lock poisoned");
            st.input = Some(input.clone());
            st.current_quote = Some(selection.quote.clone());
            st.selection_note = Some(selection.reason.describe().to_string());
            st.requires_approval = needs_approval;
            st.error = None;
            st.cancelled_notice = None;
        }

        if !self.guard_transition(
            SwapStatus::Previewing,
            Some(format!(
                "{} {} via {}",
                selection.quote.amount_out_formatted,
                input.asset_out.symbol,
                selection.quote.provider
            )),
        )? {
            return Ok(());
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Execution flow
    // -----------------------------------------------------------------------

    /// 프리뷰된 견적 실행 (필요 시 승인 → 스왑 → 확정)
    pub async fn confirm(&self) -> Result<ConfirmOutcome, SwapError> {
        let confirm_gen = self.generation.current();

        let (quote, input, requires_approval) = {
            let st = self.state.lock().expect("swap state lock poisoned");
            if st.status != SwapStatus::Previewing {
                return Err(SwapError::Unknown(format!(
                    "confirm() requires a previewed quote, current state is {}",
                    st.status
                )));
            }
            let quote = st
                .current_quote
                .clone()
                .ok_or_else(|| SwapError::Unknown("previewing without a quote".to_string()))?;
            let input = st
                .input
                .clone()
                .ok_or_else(|| SwapError::Unknown("previewing without input".to_string()))?;
            (quote, input, st.requires_approval)
        };

        // 만료 견적 실행은 호출자 실수다. provider 실패와 구분해 올리고
        // 상태는 프리뷰에 남겨서 재견적을 받게 한다.
        if quote.is_expired(self.settings.quote_ttl) {
            warn!(
                "⌛ [{}] confirm() against an expired quote ({}s old)",
                self.short_id(),
                quote.age().as_secs()
            );
            return Err(SwapError::Quote(QuoteFailure::Expired));
        }

        if requires_approval {
            match self.run_approval(&quote, &input, confirm_gen).await? {
                ApprovalStep::Approved => {}
                ApprovalStep::Rejected => return Ok(ConfirmOutcome::ApprovalRejected),
                ApprovalStep::Cancelled => return Ok(ConfirmOutcome::Cancelled),
            }
        }

        self.run_swap(&quote, &input, confirm_gen).await
    }

    /// 가드 평가를 거친 confirm. 차단이면 실행 없이 돌아온다.
    pub async fn confirm_guarded(
        &self,
        guards: &PresetGuards,
        intelligence: Option<&TokenIntelligence>,
    ) -> Result<ConfirmOutcome, SwapError> {
        let evaluation = guards::evaluate(guards, intelligence);
        for warning in &evaluation.warnings {
            warn!("🛡️ [{}] guard warning: {}", self.short_id(), warning.message);
        }
        if evaluation.blocked {
            let reason = evaluation
                .block_reason
                .unwrap_or_else(|| "blocked by preset guards".to_string());
            warn!("⛔ [{}] execution blocked: {}", self.short_id(), reason);
            return Ok(ConfirmOutcome::Blocked { reason });
        }
        self.confirm().await
    }

    async fn run_approval(
        &self,
        quote: &crate::providers::NormalizedQuote,
        input: &QuoteInput,
        confirm_gen: u64,
    ) -> Result<ApprovalStep, SwapError> {
        if !self.guard_transition(SwapStatus::Approving, None)? {
            return Ok(ApprovalStep::Cancelled);
        }

        let spender = quote
            .spender
            .ok_or_else(|| SwapError::Unknown("approval required but no spender".to_string()))?;
        let tx = build_approval(&input.asset_in, spender)?;

        info!(
            "🔏 [{}] requesting {} approval for {}",
            self.short_id(),
            input.asset_in.symbol,
            short_hex(&format!("{:#x}", spender))
        );

        let pending = match self.signer.send_transaction(tx).await {
            Ok(pending) => pending,
            Err(SignerError::UserRejected) => {
                if !self.generation.is_current(confirm_gen) {
                    return Ok(ApprovalStep::Cancelled);
                }
                // 사용자 거부는 결함이 아니라 선택이다. 프리뷰로 복귀.
                info!("↩️ [{}] approval rejected in wallet", self.short_id());
                if !self.guard_transition(
                    SwapStatus::Previewing,
                    Some("approval rejected in wallet".to_string()),
                )? {
                    return Ok(ApprovalStep::Cancelled);
                }
                return Ok(ApprovalStep::Rejected);
            }
            Err(e) => {
                let swap_err = e.into_swap_error();
                if !self.generation.is_current(confirm_gen) {
                    return Ok(ApprovalStep::Cancelled);
                }
                self.fail(&swap_err);
                return Err(swap_err);
            }
        };

        info!("⏳ [{}] approval sent: {}", self.short_id(), short_hex(&pending.hash()));

        let receipt = match pending.wait().await {
            Ok(receipt) => receipt,
            Err(e) => {
                let swap_err = e.into_swap_error();
                if !self.generation.is_current(confirm_gen) {
                    return Ok(ApprovalStep::Cancelled);
                }
                self.fail(&swap_err);
                return Err(swap_err);
            }
        };

        if !self.generation.is_current(confirm_gen) {
            return Ok(ApprovalStep::Cancelled);
        }

        if !receipt.success {
            let swap_err = receipt.into_contract_error();
            self.fail(&swap_err);
            return Err(swap_err);
        }

        info!("✅ [{}] approval confirmed", self.short_id());
        Ok(ApprovalStep::Approved)
    }

    async fn run_swap(
        &self,
        quote: &crate::providers::NormalizedQuote,
        input: &QuoteInput,
        confirm_gen: u64,
    ) -> Result<ConfirmOutcome, SwapError> {
        if !self.guard_transition(SwapStatus::Swapping, None)? {
            return Ok(ConfirmOutcome::Cancelled);
        }

        let tx = build_swap_transaction(
            quote,
            &SwapBuildParams {
                asset_in: input.asset_in.clone(),
                asset_out: input.asset_out.clone(),
                recipient: self.signer.address(),
            },
        )?;

        let pending = match self.signer.send_transaction(tx).await {
            Ok(pending) => pending,
            Err(SignerError::UserRejected) => {
                if !self.generation.is_current(confirm_gen) {
                    return Ok(ConfirmOutcome::Cancelled);
                }
                info!("↩️ [{}] swap rejected in wallet", self.short_id());
                if !self.guard_transition(
                    SwapStatus::Previewing,
                    Some("swap rejected in wallet".to_string()),
                )? {
                    return Ok(ConfirmOutcome::Cancelled);
                }
                return Ok(ConfirmOutcome::SwapRejected);
            }
            Err(e) => {
                let swap_err = e.into_swap_error();
                if !self.generation.is_current(confirm_gen) {
                    return Ok(ConfirmOutcome::Cancelled);
                }
                self.fail(&swap_err);
                return Err(swap_err);
            }
        };

        let tx_hash = pending.hash();
        if !self.generation.is_current(confirm_gen) {
            return Ok(ConfirmOutcome::Cancelled);
        }

        {
            let mut st = self.state.lock().expect("swap state lock poisoned");
            st.tx_hash = Some(tx_hash.clone());
            st.explorer_link = constants::explorer_tx_link(quote.chain_id, &tx_hash);
        }

        if !self.guard_transition(SwapStatus::Confirming, Some(short_hex(&tx_hash)))? {
            return Ok(ConfirmOutcome::Cancelled);
        }
        info!("🚀 [{}] swap broadcast: {}", self.short_id(), tx_hash);

        let receipt = match pending.wait().await {
            Ok(receipt) => receipt,
            Err(e) => {
                let swap_err = e.into_swap_error();
                if !self.generation.is_current(confirm_gen) {
                    return Ok(ConfirmOutcome::Cancelled);
                }
                self.fail(&swap_err);
                return Err(swap_err);
            }
        };

        if !self.generation.is_current(confirm_gen) {
            return Ok(ConfirmOutcome::Cancelled);
        }

        if receipt.success {
            if !self.guard_transition(SwapStatus::Success, None)? {
                return Ok(ConfirmOutcome::Cancelled);
            }
            self.clear_subscription();
            info!(
                "🎉 [{}] swap confirmed in block {:?}",
                self.short_id(),
                receipt.block_number
            );
            Ok(ConfirmOutcome::Executed { tx_hash })
        } else {
            let swap_err = receipt.into_contract_error();
            self.fail(&swap_err);
            Err(swap_err)
        }
    }

    // -----------------------------------------------------------------------
    // Reset / cancellation
    // -----------------------------------------------------------------------

    /// 세션을 idle로 되돌린다. 종결 상태에서 빠져나오는 유일한 길이고,
    /// 날아가 있는 모든 요청을 무효화한다.
    pub fn reset(&self) {
        self.generation.begin();

        let record = {
            let mut st = self.state.lock().expect("swap state lock poisoned");
            let from = st.status;
            st.reset_to_idle(None);
            if from != SwapStatus::Idle {
                Some(TransitionRecord {
                    from,
                    to: SwapStatus::Idle,
                    at: Utc::now(),
                    note: Some("reset()".to_string()),
                })
            } else {
                None
            }
        };
        if let Some(record) = record {
            info!("🔁 [{}] {} → idle (reset)", self.short_id(), record.from);
            self.transitions
                .lock()
                .expect("transition log lock poisoned")
                .push(record);
        }

        self.clear_subscription();
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn transition(&self, to: SwapStatus, note: Option<String>) -> Result<(), SwapError> {
        let record = {
            let mut st = self.state.lock().expect("swap state lock poisoned");
            let from = st.status;
            if !SwapStatus::can_transition(from, to) {
                return Err(SwapError::Unknown(format!(
                    "illegal transition {} -> {}",
                    from, to
                )));
            }
            if from == to {
                return Ok(());
            }
            st.status = to;
            TransitionRecord {
                from,
                to,
                at: Utc::now(),
                note,
            }
        };

        info!(
            "🔁 [{}] {} → {}{}",
            self.short_id(),
            record.from,
            record.to,
            record
                .note
                .as_ref()
                .map(|n| format!(" ({})", n))
                .unwrap_or_default()
        );
        self.transitions
            .lock()
            .expect("transition log lock poisoned")
            .push(record);
        Ok(())
    }

    /// 전이를 시도하되, 지갑 이벤트가 이미 세션을 idle로 되돌렸다면
    /// `Ok(false)` (= 취소됨)로 알린다.
    fn guard_transition(&self, to: SwapStatus, note: Option<String>) -> Result<bool, SwapError> {
        match self.transition(to, note) {
            Ok(()) => Ok(true),
            Err(e) => {
                if self.status() == SwapStatus::Idle {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    fn fail(&self, swap_err: &SwapError) {
        error!(
            "❌ [{}] swap failed ({}): {}",
            self.short_id(),
            swap_err.category().as_str(),
            swap_err
        );
        let _ = self.transition(SwapStatus::Error, Some(swap_err.user_message()));
        {
            let mut st = self.state.lock().expect("swap state lock poisoned");
            st.error = Some(SwapErrorInfo::from(swap_err));
        }
        self.clear_subscription();
    }

    /// 컨트롤러가 살아있는 동안만 지갑 이벤트를 구독한다.
    ///
    /// 이벤트 핸들러는 publish에 대해 동기적으로 실행되어, 보류 중인
    /// 어떤 네트워크 응답보다 먼저 세대를 올리고 상태를 idle로 강제한다.
    /// 계정/체인이 바뀐 채로 승인이나 스왑이 진행되는 일은 없다.
    fn ensure_subscribed(&self) {
        let mut slot = self.subscription.lock().expect("subscription lock poisoned");
        if slot.is_some() {
            return;
        }

        let state = Arc::clone(&self.state);
        let transitions = Arc::clone(&self.transitions);
        let generation = Arc::clone(&self.generation);
        let sub_slot = Arc::clone(&self.subscription);
        let session = self.short_id();

        let subscription = self.broker.subscribe(move |event| {
            generation.begin();

            let notice = format!("Operation cancelled safely: wallet {}", event.kind);
            let record = {
                let mut st = state.lock().expect("swap state lock poisoned");
                if st.status.is_live() {
                    let from = st.status;
                    warn!(
                        "🛑 [{}] wallet {} while {}, forcing idle",
                        session, event.kind, from
                    );
                    st.reset_to_idle(Some(notice.clone()));
                    Some(TransitionRecord {
                        from,
                        to: SwapStatus::Idle,
                        at: Utc::now(),
                        note: Some(notice),
                    })
                } else {
                    None
                }
            };
            if let Some(record) = record {
                transitions
                    .lock()
                    .expect("transition log lock poisoned")
                    .push(record);
            }

            // idle로 돌아갔으니 구독도 접는다
            if let Some(sub) = sub_slot
                .lock()
                .expect("subscription lock poisoned")
                .take()
            {
                sub.unsubscribe();
            }
        });

        *slot = Some(subscription);
    }

    fn clear_subscription(&self) {
        if let Some(sub) = self
            .subscription
            .lock()
            .expect("subscription lock poisoned")
            .take()
        {
            sub.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use std::collections::VecDeque;
    use std::sync::Arc;

    use crate::constants::ETHEREUM;
    use crate::errors::{ErrorCategory, RevertReason};
    use crate::guards::GuardMode;
    use crate::mocks::provider_mock::MockProvider;
    use crate::mocks::signer_mock::{MockSigner, ScriptedSend};
    use crate::mocks::{test_input, MockAllowance};
    use crate::providers::{ProviderError, ProviderKind, SwapProvider};
    use crate::types::{SafetyLevel, TokenIntelligence};

    fn settings() -> ControllerSettings {
        ControllerSettings {
            debounce: Duration::from_millis(5),
            quote_ttl: Duration::from_secs(30),
            slippage_bps: 50,
        }
    }

    fn make_controller(
        providers: Vec<Arc<dyn SwapProvider>>,
        signer: Arc<MockSigner>,
        needs_approval: bool,
        settings: ControllerSettings,
    ) -> (Arc<SwapLifecycleController>, Arc<WalletEventBroker>) {
        let aggregator = Arc::new(QuoteAggregator::new(providers, Duration::from_millis(500)));
        let allowance: Arc<dyn AllowanceSource> = Arc::new(MockAllowance::new(needs_approval));
        let broker = WalletEventBroker::new();
        let controller = Arc::new(SwapLifecycleController::new(
            aggregator,
            allowance,
            signer,
            Arc::clone(&broker),
            settings,
        ));
        (controller, broker)
    }

    fn transition_path(controller: &SwapLifecycleController) -> Vec<SwapStatus> {
        controller.transitions().iter().map(|t| t.to).collect()
    }

    #[tokio::test]
    async fn test_full_happy_path_to_success_and_reset() {
        let provider = MockProvider::returning(ProviderKind::ZeroEx, ETHEREUM, 500u64);
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        let (controller, broker) =
            make_controller(vec![provider.clone_arc()], signer, false, settings());

        controller.request_quote(test_input()).await.unwrap();
        assert_eq!(controller.status(), SwapStatus::Previewing);

        let snapshot = controller.state_snapshot();
        let quote = snapshot.current_quote.as_ref().unwrap();
        assert_eq!(quote.amount_out, U256::from(500u64));
        assert!(!snapshot.requires_approval);
        assert!(controller.quote_countdown().unwrap() > Duration::from_secs(20));
        assert_eq!(broker.subscriber_count(), 1);

        let outcome = controller.confirm().await.unwrap();
        let tx_hash = match outcome {
            ConfirmOutcome::Executed { tx_hash } => tx_hash,
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert_eq!(controller.status(), SwapStatus::Success);
        let snapshot = controller.state_snapshot();
        assert_eq!(snapshot.tx_hash.as_deref(), Some(tx_hash.as_str()));
        assert!(snapshot
            .explorer_link
            .as_deref()
            .unwrap()
            .starts_with("https://etherscan.io/tx/"));
        // 종결 상태에서는 구독이 접힌다
        assert_eq!(broker.subscriber_count(), 0);

        assert_eq!(
            transition_path(&controller),
            vec![
                SwapStatus::FetchingQuote,
                SwapStatus::CheckingAllowance,
                SwapStatus::Previewing,
                SwapStatus::Swapping,
                SwapStatus::Confirming,
                SwapStatus::Success,
            ]
        );

        controller.reset();
        assert_eq!(controller.status(), SwapStatus::Idle);
        assert!(controller.state_snapshot().current_quote.is_none());
        assert_eq!(
            transition_path(&controller).last().copied(),
            Some(SwapStatus::Idle)
        );
    }

    #[tokio::test]
    async fn test_stale_generation_response_never_commits() {
        // 첫 요청은 느리게 111, 두 번째 요청은 빠르게 222를 돌려준다
        let provider = MockProvider::scripted(
            ProviderKind::ZeroEx,
            ETHEREUM,
            VecDeque::from(vec![
                (Duration::from_millis(200), Ok(U256::from(111u64))),
                (Duration::from_millis(5), Ok(U256::from(222u64))),
            ]),
        );
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        let (controller, _broker) =
            make_controller(vec![provider.clone_arc()], signer, false, settings());

        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.request_quote(test_input()).await })
        };

        // 첫 요청이 디바운스를 지나 네트워크에 들어갈 때까지 기다린 뒤
        // 새 입력으로 추월한다
        tokio::time::sleep(Duration::from_millis(40)).await;
        controller.request_quote(test_input()).await.unwrap();

        // gen=1 응답이 마지막에 도착해도 상태는 gen=2의 결과만 반영한다
        first.await.unwrap().unwrap();
        let snapshot = controller.state_snapshot();
        assert_eq!(controller.status(), SwapStatus::Previewing);
        assert_eq!(
            snapshot.current_quote.as_ref().unwrap().amount_out,
            U256::from(222u64)
        );
    }

    #[tokio::test]
    async fn test_debounce_collapses_rapid_inputs() {
        let provider = MockProvider::returning(ProviderKind::ZeroEx, ETHEREUM, 500u64);
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        let mut s = settings();
        s.debounce = Duration::from_millis(60);
        let (controller, _broker) =
            make_controller(vec![provider.clone_arc()], signer, false, s);

        let first = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.request_quote(test_input()).await })
        };
        tokio::time::sleep(Duration::from_millis(15)).await;
        controller.request_quote(test_input()).await.unwrap();

        first.await.unwrap().unwrap();
        assert_eq!(controller.status(), SwapStatus::Previewing);
        // 디바운스 창 안의 연타는 마지막 하나만 provider에 닿는다
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_all_providers_failing_reaches_error_not_previewing() {
        let a = MockProvider::failing(
            ProviderKind::UniswapV3,
            ETHEREUM,
            ProviderError::NoLiquidity,
        );
        let b = MockProvider::failing(
            ProviderKind::ZeroEx,
            ETHEREUM,
            ProviderError::Timeout(Duration::from_secs(8)),
        );
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        let (controller, broker) =
            make_controller(vec![a.clone_arc(), b.clone_arc()], signer, false, settings());

        let err = controller.request_quote(test_input()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::QuoteError);

        assert_eq!(controller.status(), SwapStatus::Error);
        assert!(!transition_path(&controller).contains(&SwapStatus::Previewing));

        let snapshot = controller.state_snapshot();
        let info = snapshot.error.as_ref().unwrap();
        assert!(!info.recoverable);
        assert_eq!(info.category, ErrorCategory::QuoteError);
        // 실패로 종결되면 구독도 접힌다
        assert_eq!(broker.subscriber_count(), 0);

        // 종결 상태에서는 reset 전까지 새 견적을 받지 않는다
        assert!(controller.request_quote(test_input()).await.is_err());
        controller.reset();
        assert_eq!(controller.status(), SwapStatus::Idle);
    }

    #[tokio::test]
    async fn test_wallet_event_during_approving_forces_idle() {
        let provider = MockProvider::returning(ProviderKind::ZeroEx, ETHEREUM, 500u64);
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        // 승인 트랜잭션이 오래 걸리는 동안 지갑 이벤트가 발생한다
        signer.push(ScriptedSend::Accept {
            success: true,
            wait_delay: Duration::from_millis(200),
            revert_reason: None,
        });
        let (controller, broker) =
            make_controller(vec![provider.clone_arc()], signer, true, settings());

        controller.request_quote(test_input()).await.unwrap();
        assert_eq!(controller.status(), SwapStatus::Previewing);
        assert!(controller.state_snapshot().requires_approval);

        let confirm_task = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.confirm().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(controller.status(), SwapStatus::Approving);

        let prev = alloy::primitives::Address::repeat_byte(0x01);
        let next = alloy::primitives::Address::repeat_byte(0x02);
        broker.publish(&crate::wallet::WalletEvent::account_changed(prev, next));

        // 이벤트는 보류 중인 응답 평가보다 먼저 상태를 강제한다
        assert_eq!(controller.status(), SwapStatus::Idle);
        let snapshot = controller.state_snapshot();
        assert!(snapshot.current_quote.is_none());
        assert!(snapshot
            .cancelled_notice
            .as_deref()
            .unwrap()
            .contains("cancelled safely"));
        assert_eq!(broker.subscriber_count(), 0);

        // 늦게 풀린 승인 결과는 세대 불일치로 버려진다
        assert_eq!(confirm_task.await.unwrap().unwrap(), ConfirmOutcome::Cancelled);
        assert_eq!(controller.status(), SwapStatus::Idle);
    }

    #[tokio::test]
    async fn test_expired_quote_is_a_caller_error() {
        let provider = MockProvider::returning(ProviderKind::ZeroEx, ETHEREUM, 500u64);
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        let mut s = settings();
        s.quote_ttl = Duration::ZERO;
        let (controller, _broker) =
            make_controller(vec![provider.clone_arc()], signer, false, s);

        controller.request_quote(test_input()).await.unwrap();
        let err = controller.confirm().await.unwrap_err();
        assert!(matches!(err, SwapError::Quote(QuoteFailure::Expired)));
        // provider 실패와 달리 상태는 프리뷰에 남는다
        assert_eq!(controller.status(), SwapStatus::Previewing);
    }

    #[tokio::test]
    async fn test_approval_rejection_returns_to_preview_then_retry_succeeds() {
        let provider = MockProvider::returning(ProviderKind::ZeroEx, ETHEREUM, 500u64);
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        signer.push(ScriptedSend::RejectUser);
        let (controller, _broker) =
            make_controller(vec![provider.clone_arc()], signer.clone(), true, settings());

        controller.request_quote(test_input()).await.unwrap();

        let outcome = controller.confirm().await.unwrap();
        assert_eq!(outcome, ConfirmOutcome::ApprovalRejected);
        assert_eq!(controller.status(), SwapStatus::Previewing);

        // 재시도: 이번에는 승인과 스왑이 모두 통과한다 (기본 스크립트)
        let outcome = controller.confirm().await.unwrap();
        assert!(matches!(outcome, ConfirmOutcome::Executed { .. }));
        assert_eq!(controller.status(), SwapStatus::Success);
        // 승인 1회 거부 + 승인 1회 + 스왑 1회 = 총 3회 서명 요청
        assert_eq!(signer.sent_count(), 3);
    }

    #[tokio::test]
    async fn test_swap_rejection_returns_to_preview() {
        let provider = MockProvider::returning(ProviderKind::ZeroEx, ETHEREUM, 500u64);
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        signer.push(ScriptedSend::RejectUser);
        let (controller, _broker) =
            make_controller(vec![provider.clone_arc()], signer, false, settings());

        controller.request_quote(test_input()).await.unwrap();
        let outcome = controller.confirm().await.unwrap();
        assert_eq!(outcome, ConfirmOutcome::SwapRejected);
        assert_eq!(controller.status(), SwapStatus::Previewing);
    }

    #[tokio::test]
    async fn test_reverted_swap_surfaces_contract_error() {
        let provider = MockProvider::returning(ProviderKind::ZeroEx, ETHEREUM, 500u64);
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        signer.push(ScriptedSend::Accept {
            success: false,
            wait_delay: Duration::from_millis(5),
            revert_reason: Some("execution reverted: Too little received".to_string()),
        });
        let (controller, _broker) =
            make_controller(vec![provider.clone_arc()], signer, false, settings());

        controller.request_quote(test_input()).await.unwrap();
        let err = controller.confirm().await.unwrap_err();
        match err {
            SwapError::Contract { reason, .. } => {
                assert_eq!(reason, RevertReason::OutputTooLow)
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(controller.status(), SwapStatus::Error);
        // 트랜잭션 해시는 confirming 진입 시점에 이미 기록되어 있다
        assert!(controller.state_snapshot().tx_hash.is_some());
    }

    #[tokio::test]
    async fn test_hard_guard_blocks_soft_guard_allows() {
        let provider = MockProvider::returning(ProviderKind::ZeroEx, ETHEREUM, 500u64);
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        let (controller, _broker) =
            make_controller(vec![provider.clone_arc()], signer, false, settings());

        controller.request_quote(test_input()).await.unwrap();

        let mut guards = PresetGuards {
            enabled: true,
            mode: GuardMode::Hard,
            min_safety_score: None,
            max_price_impact: Some(2.5),
            min_liquidity_usd: None,
        };
        let intel = TokenIntelligence {
            safety_score: 90.0,
            safety_level: SafetyLevel::Safe,
            factors: vec![],
            price_impact_pct: Some(3.1),
            liquidity_usd: None,
        };

        let outcome = controller
            .confirm_guarded(&guards, Some(&intel))
            .await
            .unwrap();
        assert!(matches!(outcome, ConfirmOutcome::Blocked { .. }));
        assert_eq!(controller.status(), SwapStatus::Previewing);

        guards.mode = GuardMode::Soft;
        let outcome = controller
            .confirm_guarded(&guards, Some(&intel))
            .await
            .unwrap();
        assert!(matches!(outcome, ConfirmOutcome::Executed { .. }));
        assert_eq!(controller.status(), SwapStatus::Success);
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_without_state_change() {
        let provider = MockProvider::returning(ProviderKind::ZeroEx, ETHEREUM, 500u64);
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        let (controller, _broker) =
            make_controller(vec![provider.clone_arc()], signer, false, settings());

        let mut input = test_input();
        input.amount_in = U256::ZERO;
        let err = controller.request_quote(input).await.unwrap_err();
        assert!(matches!(err, SwapError::Quote(QuoteFailure::AmountTooSmall)));
        assert_eq!(controller.status(), SwapStatus::Idle);
        assert!(controller.transitions().is_empty());
    }

    #[tokio::test]
    async fn test_chain_mismatch_with_signer_rejected() {
        let provider = MockProvider::returning(ProviderKind::ZeroEx, ETHEREUM, 500u64);
        let signer = Arc::new(MockSigner::new(137));
        let (controller, _broker) =
            make_controller(vec![provider.clone_arc()], signer, false, settings());

        let err = controller.request_quote(test_input()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::WalletError);
        assert_eq!(controller.status(), SwapStatus::Idle);
    }

    #[tokio::test]
    async fn test_requote_from_preview_replaces_quote() {
        let provider = MockProvider::scripted(
            ProviderKind::ZeroEx,
            ETHEREUM,
            VecDeque::from(vec![
                (Duration::from_millis(1), Ok(U256::from(100u64))),
                (Duration::from_millis(1), Ok(U256::from(300u64))),
            ]),
        );
        let signer = Arc::new(MockSigner::new(ETHEREUM));
        let (controller, _broker) =
            make_controller(vec![provider.clone_arc()], signer, false, settings());

        controller.request_quote(test_input()).await.unwrap();
        assert_eq!(
            controller
                .state_snapshot()
                .current_quote
                .as_ref()
                .unwrap()
                .amount_out,
            U256::from(100u64)
        );

        controller.request_quote(test_input()).await.unwrap();
        assert_eq!(
            controller
                .state_snapshot()
                .current_quote
                .as_ref()
                .unwrap()
                .amount_out,
            U256::from(300u64)
        );
        assert_eq!(controller.status(), SwapStatus::Previewing);
    }
}
