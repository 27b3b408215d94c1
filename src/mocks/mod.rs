//! 외부 의존 없이 코어를 시험하기 위한 모의 구현 모음
//!
//! provider와 서명자를 스크립트로 제어해서 경쟁 조건, 거부, revert,
//! 타임아웃 같은 경로를 결정적으로 재현한다.

pub mod provider_mock;
pub mod signer_mock;

pub use provider_mock::MockProvider;
pub use signer_mock::{MockSigner, ScriptedSend};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::constants;
use crate::errors::SwapError;
use crate::execution::AllowanceSource;
use crate::providers::QuoteRequest;
use crate::session::QuoteInput;
use crate::types::Asset;

/// 고정 응답 allowance 소스
pub struct MockAllowance {
    needs: bool,
}

impl MockAllowance {
    pub fn new(needs: bool) -> Self {
        Self { needs }
    }
}

#[async_trait]
impl AllowanceSource for MockAllowance {
    async fn needs_approval(
        &self,
        asset: &Asset,
        _owner: Address,
        _spender: Address,
        _amount: U256,
    ) -> Result<bool, SwapError> {
        if asset.is_native {
            return Ok(false);
        }
        Ok(self.needs)
    }
}

/// 테스트용 USDC 자산 (메인넷 주소, 임의 체인 태그)
pub fn test_asset_in(chain_id: u64) -> Asset {
    Asset::token(
        "USDC",
        constants::get_token_address("USDC").unwrap(),
        6,
        chain_id,
    )
}

/// 테스트용 DAI 자산
pub fn test_asset_out(chain_id: u64) -> Asset {
    Asset::token(
        "DAI",
        constants::get_token_address("DAI").unwrap(),
        18,
        chain_id,
    )
}

/// 1 USDC → DAI, 0.5% 슬리피지 견적 요청
pub fn test_request(chain_id: u64) -> QuoteRequest {
    QuoteRequest {
        asset_in: test_asset_in(chain_id),
        asset_out: test_asset_out(chain_id),
        amount_in: U256::from(1_000_000u64),
        slippage_bps: 50,
        taker: None,
    }
}

/// 컨트롤러 테스트용 입력 (메인넷)
pub fn test_input() -> QuoteInput {
    QuoteInput {
        asset_in: test_asset_in(constants::ETHEREUM),
        asset_out: test_asset_out(constants::ETHEREUM),
        amount_in: U256::from(1_000_000u64),
    }
}
