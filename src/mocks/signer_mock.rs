use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::execution::{
    PendingTransaction, SignerError, TransactionSigner, TxReceiptSummary, UnsignedTransaction,
};

/// 서명 요청 한 건의 시나리오
#[derive(Debug, Clone)]
pub enum ScriptedSend {
    /// 브로드캐스트 수락. `success=false`면 영수증이 revert로 나온다.
    Accept {
        success: bool,
        wait_delay: Duration,
        revert_reason: Option<String>,
    },
    /// 사용자가 지갑에서 거부
    RejectUser,
    /// 지갑 자체 오류
    FailWallet(String),
}

/// 스크립트로 제어되는 모의 서명자
///
/// 스크립트가 비어 있으면 즉시 성공한다. 보낸 트랜잭션은 전부
/// 기록되어 테스트가 내용(대상, calldata, value)을 검증할 수 있다.
pub struct MockSigner {
    address: Address,
    chain_id: u64,
    script: Mutex<VecDeque<ScriptedSend>>,
    sent: Mutex<Vec<UnsignedTransaction>>,
    next_nonce: AtomicU64,
}

impl MockSigner {
    pub fn new(chain_id: u64) -> Self {
        Self {
            address: Address::repeat_byte(0xab),
            chain_id,
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            next_nonce: AtomicU64::new(1),
        }
    }

    /// 다음 send_transaction 호출이 따를 시나리오 추가
    pub fn push(&self, step: ScriptedSend) {
        self.script
            .lock()
            .expect("mock signer script lock poisoned")
            .push_back(step);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mock signer sent lock poisoned").len()
    }

    pub fn sent_transactions(&self) -> Vec<UnsignedTransaction> {
        self.sent
            .lock()
            .expect("mock signer sent lock poisoned")
            .clone()
    }
}

struct MockPending {
    hash: String,
    success: bool,
    wait_delay: Duration,
    revert_reason: Option<String>,
}

#[async_trait]
impl PendingTransaction for MockPending {
    fn hash(&self) -> String {
        self.hash.clone()
    }

    async fn wait(self: Box<Self>) -> Result<TxReceiptSummary, SignerError> {
        tokio::time::sleep(self.wait_delay).await;
        Ok(TxReceiptSummary {
            tx_hash: self.hash,
            success: self.success,
            block_number: Some(19_000_000),
            gas_used: Some(182_345),
            revert_reason: self.revert_reason,
        })
    }
}

#[async_trait]
impl TransactionSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn send_transaction(
        &self,
        tx: UnsignedTransaction,
    ) -> Result<Box<dyn PendingTransaction>, SignerError> {
        self.sent
            .lock()
            .expect("mock signer sent lock poisoned")
            .push(tx);

        let step = self
            .script
            .lock()
            .expect("mock signer script lock poisoned")
            .pop_front()
            .unwrap_or(ScriptedSend::Accept {
                success: true,
                wait_delay: Duration::from_millis(1),
                revert_reason: None,
            });

        match step {
            ScriptedSend::RejectUser => Err(SignerError::UserRejected),
            ScriptedSend::FailWallet(message) => Err(SignerError::Wallet(message)),
            ScriptedSend::Accept {
                success,
                wait_delay,
                revert_reason,
            } => {
                let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(MockPending {
                    hash: format!("0x{:064x}", nonce),
                    success,
                    wait_delay,
                    revert_reason,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, U256};

    fn dummy_tx() -> UnsignedTransaction {
        UnsignedTransaction {
            to: Address::repeat_byte(0x01),
            data: Bytes::new(),
            value: U256::ZERO,
            gas_hint: None,
        }
    }

    #[tokio::test]
    async fn test_default_script_accepts() {
        let signer = MockSigner::new(1);
        let pending = signer.send_transaction(dummy_tx()).await.unwrap();
        let hash = pending.hash();
        let receipt = pending.wait().await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.tx_hash, hash);
        assert_eq!(signer.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_rejection() {
        let signer = MockSigner::new(1);
        signer.push(ScriptedSend::RejectUser);
        assert!(matches!(
            signer.send_transaction(dummy_tx()).await,
            Err(SignerError::UserRejected)
        ));
        // 스크립트 소진 후에는 기본 수락으로 돌아간다
        assert!(signer.send_transaction(dummy_tx()).await.is_ok());
    }
}
