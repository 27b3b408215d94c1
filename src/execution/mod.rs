pub mod allowance;
pub mod builder;
pub mod signer;

pub use allowance::{AllowanceChecker, AllowanceSource};
pub use builder::{build_approval, build_swap_transaction, SwapBuildParams};
pub use signer::{PendingTransaction, SignerError, TransactionSigner, TxReceiptSummary};

use alloy::primitives::{Address, Bytes, U256};

/// 서명되지 않은 트랜잭션 페이로드
///
/// 이 코어는 절대 서명하거나 브로드캐스트하지 않는다. 외부 서명자에게
/// 이 형태 그대로 넘긴다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_hint: Option<u64>,
}
