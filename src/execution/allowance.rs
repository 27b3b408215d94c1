use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use alloy::sol;
use async_trait::async_trait;
use tracing::debug;

use crate::errors::SwapError;
use crate::types::Asset;

sol! {
    #[sol(rpc)]
    contract IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
    }
}

/// 승인(allowance) 조회 시임
///
/// 컨트롤러는 이 트레이트만 본다. 실제 구현은 RPC를 때리고,
/// 테스트는 모의 구현을 꽂는다.
#[async_trait]
pub trait AllowanceSource: Send + Sync {
    /// 이 스왑에 ERC-20 승인이 필요한지 확인.
    /// 네이티브 자산은 항상 통과한다.
    async fn needs_approval(
        &self,
        asset: &Asset,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<bool, SwapError>;
}

/// 온체인 allowance 조회 (읽기 전용 호출)
pub struct AllowanceChecker {
    rpc: DynProvider,
}

impl AllowanceChecker {
    pub fn new(rpc: DynProvider) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl AllowanceSource for AllowanceChecker {
    async fn needs_approval(
        &self,
        asset: &Asset,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<bool, SwapError> {
        if asset.is_native {
            return Ok(false);
        }

        let erc20 = IERC20::new(asset.address, self.rpc.clone());
        let allowance = erc20
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| SwapError::Rpc(format!("allowance read failed: {}", e)))?;

        let needs = allowance < amount;
        debug!(
            "🔐 Allowance {}: current {} needed {} -> approval {}",
            asset.symbol,
            allowance,
            amount,
            if needs { "required" } else { "not required" }
        );
        Ok(needs)
    }
}
