use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorCategory, SwapError};
use crate::providers::NormalizedQuote;
use crate::types::Asset;

/// 스왑 라이프사이클 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    Idle,
    FetchingQuote,
    CheckingAllowance,
    Previewing,
    Approving,
    Swapping,
    Confirming,
    Success,
    Error,
}

impl SwapStatus {
    /// 종결 상태 여부 (reset으로만 빠져나온다)
    pub fn is_terminal(&self) -> bool {
        matches!(self, SwapStatus::Success | SwapStatus::Error)
    }

    /// 살아있는 상태 여부 (비-idle, 비-종결)
    pub fn is_live(&self) -> bool {
        !matches!(self, SwapStatus::Idle) && !self.is_terminal()
    }

    /// 타입 있는 전이 표.
    ///
    /// 불리언 플래그 더미 대신 전이 하나하나를 여기서 선언하고,
    /// 테스트가 표 전체를 소진 검사한다.
    pub fn can_transition(from: SwapStatus, to: SwapStatus) -> bool {
        use SwapStatus::*;

        if from == to {
            // 같은 상태 재진입은 무해하다 (연타 입력이 fetching을 다시 침)
            return true;
        }

        match (from, to) {
            (Idle, FetchingQuote) => true,

            (FetchingQuote, CheckingAllowance) => true,
            (FetchingQuote, Error) => true,

            (CheckingAllowance, Previewing) => true,
            (CheckingAllowance, Error) => true,

            // 재견적, 실행, 승인
            (Previewing, FetchingQuote) => true,
            (Previewing, Approving) => true,
            (Previewing, Swapping) => true,

            // 승인 거부는 프리뷰로 복귀 (비치명), 완료는 스왑으로
            (Approving, Previewing) => true,
            (Approving, Swapping) => true,
            (Approving, Error) => true,

            // 스왑 서명 거부도 프리뷰로 복귀
            (Swapping, Previewing) => true,
            (Swapping, Confirming) => true,
            (Swapping, Error) => true,

            (Confirming, Success) => true,
            (Confirming, Error) => true,

            // 지갑 이벤트/reset은 살아있는 어떤 상태든 idle로 강제한다
            (from, Idle) if from.is_live() => true,
            // 종결 상태는 명시적 reset으로만 idle 복귀
            (from, Idle) if from.is_terminal() => true,

            _ => false,
        }
    }
}

impl std::fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SwapStatus::Idle => "idle",
            SwapStatus::FetchingQuote => "fetching_quote",
            SwapStatus::CheckingAllowance => "checking_allowance",
            SwapStatus::Previewing => "previewing",
            SwapStatus::Approving => "approving",
            SwapStatus::Swapping => "swapping",
            SwapStatus::Confirming => "confirming",
            SwapStatus::Success => "success",
            SwapStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// 사용자 입력으로 들어오는 스왑 의도
#[derive(Debug, Clone)]
pub struct QuoteInput {
    pub asset_in: Asset,
    pub asset_out: Asset,
    /// 최소 단위 기준 입력 수량
    pub amount_in: U256,
}

/// 상태에 실리는 에러 표현 (메시지 + 기술 상세 분리)
#[derive(Debug, Clone)]
pub struct SwapErrorInfo {
    pub category: ErrorCategory,
    pub message: String,
    pub detail: Option<String>,
    pub recoverable: bool,
}

impl From<&SwapError> for SwapErrorInfo {
    fn from(e: &SwapError) -> Self {
        Self {
            category: e.category(),
            message: e.user_message(),
            detail: e.technical_detail(),
            recoverable: e.is_recoverable(),
        }
    }
}

/// 세션당 정확히 하나 존재하는 스왑 상태
///
/// 라이프사이클 컨트롤러만 이 구조체를 변경한다.
#[derive(Debug, Clone)]
pub struct SwapState {
    pub status: SwapStatus,
    pub input: Option<QuoteInput>,
    pub current_quote: Option<NormalizedQuote>,
    /// 승자 선택 사유 (관측용)
    pub selection_note: Option<String>,
    pub requires_approval: bool,
    pub tx_hash: Option<String>,
    pub explorer_link: Option<String>,
    pub error: Option<SwapErrorInfo>,
    /// 지갑 이벤트로 안전하게 취소되었을 때의 안내문
    pub cancelled_notice: Option<String>,
}

impl SwapState {
    pub fn new() -> Self {
        Self {
            status: SwapStatus::Idle,
            input: None,
            current_quote: None,
            selection_note: None,
            requires_approval: false,
            tx_hash: None,
            explorer_link: None,
            error: None,
            cancelled_notice: None,
        }
    }

    /// idle 복귀 시 전부 비운다 (안내문은 따로 싣는다)
    pub fn reset_to_idle(&mut self, notice: Option<String>) {
        *self = Self::new();
        self.cancelled_notice = notice;
    }
}

impl Default for SwapState {
    fn default() -> Self {
        Self::new()
    }
}

/// 관측 가능한 전이 기록
///
/// 모든 전이는 타임스탬프, 전/후 상태, 맥락 노트와 함께 남는다.
/// 디버깅과 테스트 단언이 이 기록에 의존한다.
#[derive(Debug, Clone)]
pub struct TransitionRecord {
    pub from: SwapStatus,
    pub to: SwapStatus,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}
