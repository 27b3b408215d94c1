use std::collections::HashMap;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{
    NormalizedQuote, ProviderError, ProviderKind, QuoteRequest, RawQuote, SwapProvider,
};
use crate::constants;

/// 0x Protocol API Integration
///
/// 오프체인 크로스 DEX 어그리게이터 provider. 견적 한 번의 왕복으로
/// 서명 준비 완료 calldata까지 받아 `RawQuote::PreEncoded`로 보관한다.
/// 빌더 단계에서는 추가 네트워크 호출이 없다.
pub struct ZeroExProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    chain_id: u64,
}

#[derive(Debug, Deserialize)]
struct ZeroExQuoteResponse {
    #[serde(rename = "sellAmount")]
    sell_amount: String,
    #[serde(rename = "buyAmount")]
    buy_amount: String,
    #[serde(rename = "allowanceTarget")]
    allowance_target: String,
    to: String,
    data: String,
    value: String,
    gas: String,
    #[serde(rename = "estimatedPriceImpact", default)]
    estimated_price_impact: Option<String>,
    #[serde(default)]
    sources: Vec<ZeroExSource>,
}

#[derive(Debug, Deserialize)]
struct ZeroExSource {
    name: String,
    proportion: String,
}

impl ZeroExProvider {
    pub fn new(
        chain_id: u64,
        api_key: Option<String>,
        base_url_override: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base_url = match base_url_override {
            Some(url) => url,
            None => constants::zeroex_base_url(chain_id)
                .ok_or(ProviderError::UnsupportedChain(chain_id))?
                .to_string(),
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            chain_id,
        })
    }

    fn build_headers(&self) -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();

        if let Some(ref api_key) = self.api_key {
            if let Ok(value) = api_key.parse() {
                headers.insert("0x-api-key", value);
            }
        }

        if let Ok(value) = "application/json".parse() {
            headers.insert("Accept", value);
        }

        headers
    }

    /// basis points → 0x API의 fraction 표기 (50 bps → "0.005")
    fn slippage_fraction(slippage_bps: u32) -> String {
        format!("{}", slippage_bps as f64 / constants::BPS_DENOMINATOR as f64)
    }

    /// API 에러 응답을 provider 에러로 분류
    fn classify_api_error(status: u16, body: &str) -> ProviderError {
        let upper = body.to_uppercase();
        if upper.contains("INSUFFICIENT_ASSET_LIQUIDITY") || upper.contains("NO_ROUTES") {
            ProviderError::NoLiquidity
        } else if upper.contains("SELL_AMOUNT_TOO_SMALL") {
            ProviderError::AmountTooSmall
        } else {
            ProviderError::Http(format!("0x API error {}: {}", status, body))
        }
    }

    async fn get_quote_internal(
        &self,
        req: &QuoteRequest,
    ) -> Result<ZeroExQuoteResponse, ProviderError> {
        let mut query_params = HashMap::new();

        query_params.insert("sellToken", format!("{:#x}", req.asset_in.api_address()));
        query_params.insert("buyToken", format!("{:#x}", req.asset_out.api_address()));
        query_params.insert("sellAmount", req.amount_in.to_string());
        query_params.insert(
            "slippagePercentage",
            Self::slippage_fraction(req.slippage_bps),
        );

        if let Some(taker) = req.taker {
            query_params.insert("takerAddress", format!("{:#x}", taker));
        }

        let url = format!("{}/swap/v1/quote", self.base_url);

        debug!(
            "🔄 Requesting 0x quote: {} -> {} ({})",
            req.asset_in, req.asset_out, req.amount_in
        );

        let response = self
            .client
            .get(&url)
            .headers(self.build_headers())
            .query(&query_params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(Duration::from_secs(
                        constants::PROVIDER_TIMEOUT_SECS,
                    ))
                } else {
                    ProviderError::Http(format!("0x API request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::classify_api_error(status.as_u16(), &error_text));
        }

        let quote: ZeroExQuoteResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("0x response parse: {}", e)))?;

        debug!(
            "✅ 0x quote received: {} -> {}",
            quote.sell_amount, quote.buy_amount
        );

        Ok(quote)
    }
}

#[async_trait]
impl SwapProvider for ZeroExProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::ZeroEx
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn quote(&self, req: &QuoteRequest) -> Result<NormalizedQuote, ProviderError> {
        if req.amount_in.is_zero() {
            return Err(ProviderError::AmountTooSmall);
        }
        if req.chain_id() != self.chain_id {
            return Err(ProviderError::UnsupportedChain(req.chain_id()));
        }

        let response = self.get_quote_internal(req).await?;

        let amount_out = U256::from_str_radix(&response.buy_amount, 10)
            .map_err(|e| ProviderError::InvalidResponse(format!("buyAmount: {}", e)))?;

        let to: Address = response
            .to
            .parse()
            .map_err(|e| ProviderError::InvalidResponse(format!("to address: {}", e)))?;

        let allowance_target: Address = response
            .allowance_target
            .parse()
            .map_err(|e| ProviderError::InvalidResponse(format!("allowanceTarget: {}", e)))?;

        let data = hex::decode(response.data.trim_start_matches("0x"))
            .map_err(|e| ProviderError::InvalidResponse(format!("calldata: {}", e)))?;

        let value = U256::from_str_radix(&response.value, 10)
            .map_err(|e| ProviderError::InvalidResponse(format!("value: {}", e)))?;

        let gas = response
            .gas
            .parse::<u64>()
            .map_err(|e| ProviderError::InvalidResponse(format!("gas: {}", e)))?;

        let price_impact = response
            .estimated_price_impact
            .as_deref()
            .and_then(|s| s.parse::<f64>().ok());

        if !response.sources.is_empty() {
            let active: Vec<String> = response
                .sources
                .iter()
                .filter(|s| s.proportion.parse::<f64>().unwrap_or(0.0) > 0.0)
                .map(|s| s.name.clone())
                .collect();
            debug!("  routed through: {}", active.join(", "));
        }

        // buyAmountMin이 응답에 있어도 쓰지 않는다. 최소 수령량 공식은
        // provider와 무관하게 정규화 단계 하나로 통일한다.
        Ok(NormalizedQuote::build(
            ProviderKind::ZeroEx,
            req,
            amount_out,
            price_impact,
            gas,
            Some(allowance_target),
            RawQuote::PreEncoded {
                to,
                data: Bytes::from(data),
                value,
                gas,
            },
        ))
    }
}
