use alloy::primitives::Address;
use async_trait::async_trait;

use super::UnsignedTransaction;
use crate::errors::{RevertReason, SwapError};

/// 서명자 단계 에러
///
/// 사용자 거부는 결함이 아니라 선택이므로 별도 variant로 구분한다.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignerError {
    #[error("user rejected the request")]
    UserRejected,

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("rpc error: {0}")]
    Rpc(String),
}

impl SignerError {
    pub fn into_swap_error(self) -> SwapError {
        match self {
            SignerError::UserRejected => SwapError::UserRejected,
            SignerError::InsufficientFunds(d) => SwapError::InsufficientBalance(d),
            SignerError::Wallet(d) => SwapError::Wallet(d),
            SignerError::Rpc(d) => SwapError::Rpc(d),
        }
    }
}

/// 트랜잭션 영수증 요약
#[derive(Debug, Clone)]
pub struct TxReceiptSummary {
    pub tx_hash: String,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub revert_reason: Option<String>,
}

impl TxReceiptSummary {
    /// revert 사유를 분류 체계 에러로 변환
    pub fn into_contract_error(self) -> SwapError {
        let detail = self
            .revert_reason
            .unwrap_or_else(|| format!("transaction {} reverted", self.tx_hash));
        SwapError::Contract {
            reason: RevertReason::classify(&detail),
            detail,
        }
    }
}

/// 브로드캐스트된 트랜잭션 핸들
#[async_trait]
pub trait PendingTransaction: Send + Sync {
    fn hash(&self) -> String;

    /// 포함/확정까지 대기
    async fn wait(self: Box<Self>) -> Result<TxReceiptSummary, SignerError>;
}

/// 외부 서명자 인터페이스
///
/// 이 코어는 이 인터페이스를 소비만 하고 절대 구성하지 않는다.
/// 개인키는 경계 밖에 머무른다.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// 연결된 계정 주소
    fn address(&self) -> Address;

    /// 연결된 체인
    fn chain_id(&self) -> u64;

    /// 서명 + 브로드캐스트 요청
    async fn send_transaction(
        &self,
        tx: UnsignedTransaction,
    ) -> Result<Box<dyn PendingTransaction>, SignerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;

    #[test]
    fn test_signer_error_mapping() {
        assert!(matches!(
            SignerError::UserRejected.into_swap_error(),
            SwapError::UserRejected
        ));
        assert_eq!(
            SignerError::InsufficientFunds("gas".into())
                .into_swap_error()
                .category(),
            ErrorCategory::InsufficientBalance
        );
    }

    #[test]
    fn test_receipt_revert_classification() {
        let receipt = TxReceiptSummary {
            tx_hash: "0xdead".into(),
            success: false,
            block_number: Some(1),
            gas_used: Some(21_000),
            revert_reason: Some("execution reverted: Too little received".into()),
        };
        match receipt.into_contract_error() {
            SwapError::Contract { reason, .. } => {
                assert_eq!(reason, RevertReason::OutputTooLow)
            }
            other => panic!("unexpected: {}", other),
        }
    }
}
