use alloy::primitives::{Address, Bytes, Uint, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use tracing::debug;

use super::allowance::IERC20;
use super::UnsignedTransaction;
use crate::constants;
use crate::errors::SwapError;
use crate::providers::{NormalizedQuote, RawQuote};
use crate::types::Asset;

sol! {
    contract ISwapRouter02 {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }
        function exactInputSingle(ExactInputSingleParams params) external payable returns (uint256 amountOut);
        function multicall(bytes[] data) external payable returns (bytes[] results);
        function unwrapWETH9(uint256 amountMinimum, address recipient) external payable;
    }
}

/// 스왑 트랜잭션 조립 파라미터
#[derive(Debug, Clone)]
pub struct SwapBuildParams {
    pub asset_in: Asset,
    pub asset_out: Asset,
    /// 스왑 결과를 받을 주소 (보통 서명자 본인)
    pub recipient: Address,
}

/// ERC-20 무제한 승인 트랜잭션 생성 (순수 함수)
pub fn build_approval(asset: &Asset, spender: Address) -> Result<UnsignedTransaction, SwapError> {
    if asset.is_native {
        return Err(SwapError::Unknown(
            "native asset requires no approval".to_string(),
        ));
    }

    let data = IERC20::approveCall {
        spender,
        value: U256::MAX,
    }
    .abi_encode();

    Ok(UnsignedTransaction {
        to: asset.address,
        data: Bytes::from(data),
        value: U256::ZERO,
        gas_hint: Some(constants::APPROVAL_GAS_LIMIT),
    })
}

/// 승자 견적으로 서명되지 않은 스왑 트랜잭션 생성 (순수 함수)
///
/// 온체인 provider는 라우터 호출을 여기서 직접 인코딩하고, 오프체인
/// 어그리게이터는 견적 시점에 받아둔 calldata를 그대로 쓴다.
/// 어느 쪽이든 서명/브로드캐스트는 하지 않는다.
pub fn build_swap_transaction(
    quote: &NormalizedQuote,
    params: &SwapBuildParams,
) -> Result<UnsignedTransaction, SwapError> {
    match &quote.raw {
        RawQuote::PreEncoded { to, data, value, gas } => Ok(UnsignedTransaction {
            to: *to,
            data: data.clone(),
            value: *value,
            gas_hint: Some(*gas),
        }),
        RawQuote::OnchainQuoter { fee_tier, .. } => {
            build_uniswap_swap(quote, params, *fee_tier)
        }
    }
}

fn build_uniswap_swap(
    quote: &NormalizedQuote,
    params: &SwapBuildParams,
    fee_tier: u32,
) -> Result<UnsignedTransaction, SwapError> {
    let router = constants::swap_router02_address(quote.chain_id)
        .ok_or_else(|| SwapError::Unknown(format!("no router for chain {}", quote.chain_id)))?;

    let token_in = params.asset_in.onchain_address().ok_or_else(|| {
        SwapError::Unknown(format!("no wrapped native on chain {}", quote.chain_id))
    })?;
    let token_out = params.asset_out.onchain_address().ok_or_else(|| {
        SwapError::Unknown(format!("no wrapped native on chain {}", quote.chain_id))
    })?;

    let native_in = params.asset_in.is_native;
    let native_out = params.asset_out.is_native;

    // 네이티브 출력이면 라우터가 일단 WETH를 받고, 같은 트랜잭션 안에서
    // 언랩해서 사용자에게 보낸다. 중간에 가치가 라우터에 남지 않는다.
    let recipient = if native_out { router } else { params.recipient };

    let exact = ISwapRouter02::exactInputSingleCall {
        params: ISwapRouter02::ExactInputSingleParams {
            tokenIn: token_in,
            tokenOut: token_out,
            fee: Uint::from(fee_tier),
            recipient,
            amountIn: quote.amount_in,
            amountOutMinimum: quote.min_amount_out,
            sqrtPriceLimitX96: Uint::ZERO,
        },
    }
    .abi_encode();

    let data = if native_out {
        let unwrap = ISwapRouter02::unwrapWETH9Call {
            amountMinimum: quote.min_amount_out,
            recipient: params.recipient,
        }
        .abi_encode();
        ISwapRouter02::multicallCall {
            data: vec![Bytes::from(exact), Bytes::from(unwrap)],
        }
        .abi_encode()
    } else {
        exact
    };

    // 네이티브 입력은 msg.value로 실어 보내면 라우터가 랩핑까지 처리한다
    let value = if native_in { quote.amount_in } else { U256::ZERO };

    debug!(
        "🔧 Built Uniswap swap tx: tier {} native_in={} native_out={} ({} bytes)",
        fee_tier,
        native_in,
        native_out,
        data.len()
    );

    Ok(UnsignedTransaction {
        to: router,
        data: Bytes::from(data),
        value,
        gas_hint: Some(quote.gas_hint.max(constants::DEFAULT_SWAP_GAS_LIMIT)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ETHEREUM;
    use crate::providers::{min_amount_out_bps, ProviderKind, QuoteRequest};

    fn usdc() -> Asset {
        Asset::token(
            "USDC",
            constants::get_token_address("USDC").unwrap(),
            6,
            ETHEREUM,
        )
    }

    fn dai() -> Asset {
        Asset::token(
            "DAI",
            constants::get_token_address("DAI").unwrap(),
            18,
            ETHEREUM,
        )
    }

    fn onchain_quote(asset_in: &Asset, asset_out: &Asset, amount_out: u128) -> NormalizedQuote {
        let req = QuoteRequest {
            asset_in: asset_in.clone(),
            asset_out: asset_out.clone(),
            amount_in: U256::from(1_000_000u64),
            slippage_bps: 50,
            taker: None,
        };
        NormalizedQuote::build(
            ProviderKind::UniswapV3,
            &req,
            U256::from(amount_out),
            None,
            180_000,
            Some(constants::swap_router02_address(ETHEREUM).unwrap()),
            RawQuote::OnchainQuoter {
                fee_tier: 3_000,
                sqrt_price_x96_after: U256::ZERO,
                gas_estimate: 180_000,
            },
        )
    }

    #[test]
    fn test_approval_encoding() {
        let spender = Address::repeat_byte(0x11);
        let tx = build_approval(&usdc(), spender).unwrap();

        assert_eq!(tx.to, usdc().address);
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(&tx.data[..4], IERC20::approveCall::SELECTOR);

        let decoded = IERC20::approveCall::abi_decode(&tx.data).unwrap();
        assert_eq!(decoded.spender, spender);
        assert_eq!(decoded.value, U256::MAX);
    }

    #[test]
    fn test_approval_rejected_for_native() {
        let eth = Asset::native("ETH", ETHEREUM);
        assert!(build_approval(&eth, Address::ZERO).is_err());
    }

    #[test]
    fn test_token_to_token_swap_encoding() {
        let quote = onchain_quote(&usdc(), &dai(), 2_000_000_000_000_000_000u128);
        let recipient = Address::repeat_byte(0x22);
        let tx = build_swap_transaction(
            &quote,
            &SwapBuildParams {
                asset_in: usdc(),
                asset_out: dai(),
                recipient,
            },
        )
        .unwrap();

        assert_eq!(tx.to, constants::swap_router02_address(ETHEREUM).unwrap());
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(&tx.data[..4], ISwapRouter02::exactInputSingleCall::SELECTOR);

        let decoded = ISwapRouter02::exactInputSingleCall::abi_decode(&tx.data).unwrap();
        assert_eq!(decoded.params.recipient, recipient);
        assert_eq!(decoded.params.amountIn, U256::from(1_000_000u64));
        assert_eq!(
            decoded.params.amountOutMinimum,
            min_amount_out_bps(U256::from(2_000_000_000_000_000_000u128), 50)
        );
    }

    #[test]
    fn test_native_input_carries_value() {
        let eth = Asset::native("ETH", ETHEREUM);
        let quote = onchain_quote(&eth, &usdc(), 1_800_000_000u128);
        let tx = build_swap_transaction(
            &quote,
            &SwapBuildParams {
                asset_in: eth,
                asset_out: usdc(),
                recipient: Address::repeat_byte(0x22),
            },
        )
        .unwrap();

        // 라우터가 msg.value로 랩핑하므로 value에 입력량이 실린다
        assert_eq!(tx.value, U256::from(1_000_000u64));
        assert_eq!(&tx.data[..4], ISwapRouter02::exactInputSingleCall::SELECTOR);
    }

    #[test]
    fn test_native_output_batches_unwrap() {
        let eth = Asset::native("ETH", ETHEREUM);
        let recipient = Address::repeat_byte(0x33);
        let quote = onchain_quote(&usdc(), &eth, 500_000_000_000_000_000u128);
        let tx = build_swap_transaction(
            &quote,
            &SwapBuildParams {
                asset_in: usdc(),
                asset_out: eth,
                recipient,
            },
        )
        .unwrap();

        // 스왑 + 언랩이 multicall 하나로 묶인다
        assert_eq!(&tx.data[..4], ISwapRouter02::multicallCall::SELECTOR);

        let decoded = ISwapRouter02::multicallCall::abi_decode(&tx.data).unwrap();
        assert_eq!(decoded.data.len(), 2);
        assert_eq!(
            &decoded.data[0][..4],
            ISwapRouter02::exactInputSingleCall::SELECTOR
        );
        assert_eq!(
            &decoded.data[1][..4],
            ISwapRouter02::unwrapWETH9Call::SELECTOR
        );

        // 스왑 구간의 수령자는 라우터, 언랩의 수령자가 사용자다
        let inner =
            ISwapRouter02::exactInputSingleCall::abi_decode(&decoded.data[0]).unwrap();
        assert_eq!(
            inner.params.recipient,
            constants::swap_router02_address(ETHEREUM).unwrap()
        );
        let unwrap = ISwapRouter02::unwrapWETH9Call::abi_decode(&decoded.data[1]).unwrap();
        assert_eq!(unwrap.recipient, recipient);
        assert_eq!(unwrap.amountMinimum, quote.min_amount_out);
    }

    #[test]
    fn test_pre_encoded_quote_passes_through() {
        let req = QuoteRequest {
            asset_in: usdc(),
            asset_out: dai(),
            amount_in: U256::from(1_000_000u64),
            slippage_bps: 50,
            taker: None,
        };
        let to = Address::repeat_byte(0xde);
        let calldata = Bytes::from(vec![0xd9, 0x62, 0x7a, 0xa4, 0x01]);
        let quote = NormalizedQuote::build(
            ProviderKind::ZeroEx,
            &req,
            U256::from(999u64),
            Some(0.2),
            210_000,
            Some(to),
            RawQuote::PreEncoded {
                to,
                data: calldata.clone(),
                value: U256::ZERO,
                gas: 210_000,
            },
        );

        let tx = build_swap_transaction(
            &quote,
            &SwapBuildParams {
                asset_in: usdc(),
                asset_out: dai(),
                recipient: Address::repeat_byte(0x22),
            },
        )
        .unwrap();

        assert_eq!(tx.to, to);
        assert_eq!(tx.data, calldata);
        assert_eq!(tx.gas_hint, Some(210_000));
    }
}
