use thiserror::Error;

/// 컨트랙트 revert 세부 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertReason {
    SlippageExceeded,
    DeadlineExpired,
    OutputTooLow,
    Other,
}

impl RevertReason {
    /// revert 메시지 문자열에서 세부 사유 분류
    pub fn classify(detail: &str) -> Self {
        let lower = detail.to_lowercase();
        if lower.contains("too little received") || lower.contains("insufficient output") {
            RevertReason::OutputTooLow
        } else if lower.contains("slippage") || lower.contains("price slippage check") {
            RevertReason::SlippageExceeded
        } else if lower.contains("deadline") || lower.contains("expired") {
            RevertReason::DeadlineExpired
        } else {
            RevertReason::Other
        }
    }
}

impl std::fmt::Display for RevertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RevertReason::SlippageExceeded => "slippage exceeded",
            RevertReason::DeadlineExpired => "deadline expired",
            RevertReason::OutputTooLow => "output too low",
            RevertReason::Other => "reverted",
        };
        write!(f, "{}", s)
    }
}

/// 견적 실패 세부 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteFailure {
    NoLiquidity,
    Expired,
    AmountTooSmall,
}

impl std::fmt::Display for QuoteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QuoteFailure::NoLiquidity => "no liquidity",
            QuoteFailure::Expired => "quote expired",
            QuoteFailure::AmountTooSmall => "amount too small",
        };
        write!(f, "{}", s)
    }
}

/// 스왑 코어 전역 에러 분류 체계
///
/// 모든 실패는 사람이 읽을 수 있는 메시지 하나와 선택적 기술 상세로
/// 표면화된다. provider 단위 실패는 집계 단계에서 흡수되므로 여기로
/// 오지 않는다.
#[derive(Debug, Clone, Error)]
pub enum SwapError {
    // -- User decisions (recoverable, not defects) --------------------------
    #[error("user rejected the request in the wallet")]
    UserRejected,

    // -- Funds --------------------------------------------------------------
    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    // -- Transport ----------------------------------------------------------
    #[error("network error: {0}")]
    Network(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    // -- On-chain -----------------------------------------------------------
    #[error("contract error ({reason}): {detail}")]
    Contract { reason: RevertReason, detail: String },

    // -- Quoting ------------------------------------------------------------
    #[error("quote error: {0}")]
    Quote(QuoteFailure),

    // -- Wallet -------------------------------------------------------------
    #[error("wallet error: {0}")]
    Wallet(String),

    // -- Fallback -----------------------------------------------------------
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// 분류 체계의 카테고리 식별자 (로그/관측용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UserRejected,
    InsufficientBalance,
    NetworkError,
    RpcError,
    ContractError,
    QuoteError,
    WalletError,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserRejected => "user_rejected",
            ErrorCategory::InsufficientBalance => "insufficient_balance",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::RpcError => "rpc_error",
            ErrorCategory::ContractError => "contract_error",
            ErrorCategory::QuoteError => "quote_error",
            ErrorCategory::WalletError => "wallet_error",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl SwapError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SwapError::UserRejected => ErrorCategory::UserRejected,
            SwapError::InsufficientBalance(_) => ErrorCategory::InsufficientBalance,
            SwapError::Network(_) => ErrorCategory::NetworkError,
            SwapError::Rpc(_) => ErrorCategory::RpcError,
            SwapError::Contract { .. } => ErrorCategory::ContractError,
            SwapError::Quote(_) => ErrorCategory::QuoteError,
            SwapError::Wallet(_) => ErrorCategory::WalletError,
            SwapError::Unknown(_) => ErrorCategory::Unknown,
        }
    }

    /// 재시도 가능 여부 (UI에서 retry 버튼 노출 기준)
    pub fn is_recoverable(&self) -> bool {
        match self {
            SwapError::UserRejected => true,
            SwapError::Network(_) | SwapError::Rpc(_) => true,
            SwapError::Quote(QuoteFailure::Expired) => true,
            SwapError::Contract { reason, .. } => matches!(
                reason,
                RevertReason::SlippageExceeded
                    | RevertReason::DeadlineExpired
                    | RevertReason::OutputTooLow
            ),
            SwapError::InsufficientBalance(_) => false,
            SwapError::Quote(_) => false,
            SwapError::Wallet(_) => false,
            SwapError::Unknown(_) => false,
        }
    }

    /// 사용자에게 보여줄 단문 메시지
    pub fn user_message(&self) -> String {
        match self {
            SwapError::UserRejected => "Request was rejected in your wallet".to_string(),
            SwapError::InsufficientBalance(_) => {
                "Insufficient balance for this swap".to_string()
            }
            SwapError::Network(_) => "Network connection problem, please retry".to_string(),
            SwapError::Rpc(_) => "Node request failed, please retry".to_string(),
            SwapError::Contract { reason, .. } => match reason {
                RevertReason::SlippageExceeded => {
                    "Price moved beyond your slippage tolerance".to_string()
                }
                RevertReason::DeadlineExpired => "Transaction deadline expired".to_string(),
                RevertReason::OutputTooLow => {
                    "Swap output fell below the guaranteed minimum".to_string()
                }
                RevertReason::Other => "Swap transaction reverted on-chain".to_string(),
            },
            SwapError::Quote(QuoteFailure::NoLiquidity) => {
                "No liquidity available for this pair".to_string()
            }
            SwapError::Quote(QuoteFailure::Expired) => {
                "Quote expired, please refresh".to_string()
            }
            SwapError::Quote(QuoteFailure::AmountTooSmall) => {
                "Amount is too small to quote".to_string()
            }
            SwapError::Wallet(_) => "Wallet error, please reconnect".to_string(),
            SwapError::Unknown(_) => "Something went wrong".to_string(),
        }
    }

    /// 기술 상세 (로그/진단용, 사용자 메시지와 분리)
    pub fn technical_detail(&self) -> Option<String> {
        match self {
            SwapError::UserRejected => None,
            SwapError::InsufficientBalance(d)
            | SwapError::Network(d)
            | SwapError::Rpc(d)
            | SwapError::Wallet(d)
            | SwapError::Unknown(d) => Some(d.clone()),
            SwapError::Contract { detail, .. } => Some(detail.clone()),
            SwapError::Quote(_) => None,
        }
    }

    /// 서명자/노드가 돌려준 원문 메시지를 분류 체계로 매핑
    pub fn classify_external(detail: &str) -> Self {
        let lower = detail.to_lowercase();
        if lower.contains("user rejected") || lower.contains("user denied") {
            SwapError::UserRejected
        } else if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
            SwapError::InsufficientBalance(detail.to_string())
        } else if lower.contains("rate limit")
            || lower.contains("timeout")
            || lower.contains("timed out")
        {
            SwapError::Rpc(detail.to_string())
        } else if lower.contains("revert") || lower.contains("execution reverted") {
            SwapError::Contract {
                reason: RevertReason::classify(detail),
                detail: detail.to_string(),
            }
        } else if lower.contains("connection")
            || lower.contains("dns")
            || lower.contains("network")
        {
            SwapError::Network(detail.to_string())
        } else {
            SwapError::Unknown(detail.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_classification() {
        assert_eq!(
            RevertReason::classify("execution reverted: Too little received"),
            RevertReason::OutputTooLow
        );
        assert_eq!(
            RevertReason::classify("Transaction too old: deadline"),
            RevertReason::DeadlineExpired
        );
        assert_eq!(RevertReason::classify("boom"), RevertReason::Other);
    }

    #[test]
    fn test_external_classification() {
        assert!(matches!(
            SwapError::classify_external("MetaMask Tx Signature: User denied transaction"),
            SwapError::UserRejected
        ));
        assert!(matches!(
            SwapError::classify_external("insufficient funds for gas * price + value"),
            SwapError::InsufficientBalance(_)
        ));
        assert!(matches!(
            SwapError::classify_external("429 rate limit exceeded"),
            SwapError::Rpc(_)
        ));
        let e = SwapError::classify_external("execution reverted: Too little received");
        assert_eq!(e.category(), ErrorCategory::ContractError);
    }

    #[test]
    fn test_recoverability() {
        assert!(SwapError::UserRejected.is_recoverable());
        assert!(!SwapError::Quote(QuoteFailure::NoLiquidity).is_recoverable());
        assert!(SwapError::Quote(QuoteFailure::Expired).is_recoverable());
        assert!(!SwapError::InsufficientBalance("x".into()).is_recoverable());
    }

    #[test]
    fn test_user_message_has_no_internals() {
        let e = SwapError::Rpc("HTTP 429 from https://secret-node.example".to_string());
        assert!(!e.user_message().contains("secret-node"));
        assert!(e.technical_detail().unwrap().contains("429"));
    }
}
