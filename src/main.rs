use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{anyhow, Context, Result};
use clap::{Arg, Command};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alloy::providers::{Provider, ProviderBuilder};

use swapflow::common::formatting::{format_units, parse_units};
use swapflow::config::Config;
use swapflow::providers::{build_provider_set, QuoteRequest};
use swapflow::QuoteAggregator;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("swapflow")
        .version("0.1.0")
        .author("swapflow team <dev@swapflow.xyz>")
        .about("🦀 DEX 스왑 견적 어그리게이터 - 서명 없이 견적만 낸다")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("설정 파일 경로")
                .default_value("config/default.toml"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("로그 레벨 (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("chain")
                .long("chain")
                .value_name("CHAIN_ID")
                .help("체인 ID (1, 10, 137, 42161)")
                .default_value("1"),
        )
        .arg(
            Arg::new("sell")
                .long("sell")
                .value_name("SYMBOL")
                .help("파는 자산 심볼 (예: ETH, USDC)")
                .required(true),
        )
        .arg(
            Arg::new("buy")
                .long("buy")
                .value_name("SYMBOL")
                .help("사는 자산 심볼")
                .required(true),
        )
        .arg(
            Arg::new("amount")
                .long("amount")
                .value_name("AMOUNT")
                .help("파는 수량 (사람이 읽는 단위, 예: 1.5)")
                .required(true),
        )
        .arg(
            Arg::new("slippage-bps")
                .long("slippage-bps")
                .value_name("BPS")
                .help("슬리피지 허용치 (basis points, 기본은 설정값)"),
        )
        .arg(
            Arg::new("taker")
                .long("taker")
                .value_name("ADDRESS")
                .help("수신자 주소 (어그리게이터 calldata에 반영)"),
        )
        .get_matches();

    // 로깅 초기화
    let log_level = matches.get_one::<String>("log-level").unwrap();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    dotenvy::dotenv().ok();

    // 설정 파일 로드
    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = if std::path::Path::new(config_path).exists() {
        info!("📋 설정 파일 로드 중: {}", config_path);
        Config::load(config_path).await?
    } else {
        warn!("📋 설정 파일이 없어 기본값을 사용합니다: {}", config_path);
        Config::default()
    };

    config.apply_env();

    if let Err(e) = config.validate() {
        error!("❌ 설정 검증 실패: {}", e);
        std::process::exit(1);
    }

    let chain_id: u64 = matches
        .get_one::<String>("chain")
        .unwrap()
        .parse()
        .context("chain id must be a number")?;

    let network = config
        .network(chain_id)
        .ok_or_else(|| anyhow!("chain {} is not configured (add it under [[networks]])", chain_id))?
        .clone();

    // 심볼 → 자산 해석은 경계에서 한 번만
    let asset_in = config.resolve_asset(chain_id, matches.get_one::<String>("sell").unwrap())?;
    let asset_out = config.resolve_asset(chain_id, matches.get_one::<String>("buy").unwrap())?;
    let amount_in = parse_units(
        matches.get_one::<String>("amount").unwrap(),
        asset_in.decimals,
    )?;

    let slippage_bps = match matches.get_one::<String>("slippage-bps") {
        Some(raw) => raw.parse::<u32>().context("slippage-bps must be a number")?,
        None => config.swap.default_slippage_bps,
    };

    let taker = match matches.get_one::<String>("taker") {
        Some(raw) => Some(raw.parse::<Address>().context("invalid taker address")?),
        None => None,
    };

    info!("🔌 RPC 연결 중: {}", network.rpc_url);
    let rpc = ProviderBuilder::new()
        .connect_http(network.rpc_url.parse().context("invalid rpc url")?)
        .erased();

    let providers = build_provider_set(&config, chain_id, rpc)
        .map_err(|e| anyhow!("provider set construction failed: {}", e))?;
    let aggregator = QuoteAggregator::new(
        providers,
        Duration::from_secs(config.dex.quote_timeout_secs),
    );

    let request = QuoteRequest {
        asset_in: asset_in.clone(),
        asset_out: asset_out.clone(),
        amount_in,
        slippage_bps,
        taker,
    };

    info!(
        "🔍 견적 요청: {} {} -> {} (슬리피지 {} bps)",
        format_units(amount_in, asset_in.decimals),
        asset_in.symbol,
        asset_out.symbol,
        slippage_bps
    );

    let selection = match aggregator.aggregate(&request).await {
        Ok(selection) => selection,
        Err(e) => {
            error!("❌ 견적 실패: {}", e);
            std::process::exit(1);
        }
    };

    println!();
    println!("📊 Provider results");
    for outcome in &selection.outcomes {
        match &outcome.result {
            Ok(amount_out) => println!(
                "  ✅ {:<12} {:>24} {} ({}ms)",
                outcome.provider.name(),
                format_units(*amount_out, asset_out.decimals),
                asset_out.symbol,
                outcome.latency_ms
            ),
            Err(e) => println!(
                "  ❌ {:<12} {} ({}ms)",
                outcome.provider.name(),
                e,
                outcome.latency_ms
            ),
        }
    }

    let quote = &selection.quote;
    println!();
    println!("🏆 Best route: {} ({})", quote.provider.name(), selection.reason.describe());
    println!(
        "   You receive : {} {}",
        quote.amount_out_formatted, asset_out.symbol
    );
    println!(
        "   Minimum out : {} {} ({} bps slippage)",
        format_units(quote.min_amount_out, asset_out.decimals),
        asset_out.symbol,
        slippage_bps
    );
    if let Some(impact) = quote.price_impact {
        println!("   Price impact: {:.2}%", impact);
    }
    println!("   Gas hint    : {}", quote.gas_hint);
    if let Some(advantage) = selection.advantage_pct {
        println!("   Advantage   : +{:.3}% vs runner-up", advantage);
    }

    Ok(())
}

fn print_banner() {
    println!("🦀 swapflow v0.1.0");
    println!("   multi-provider DEX quote aggregation, no keys, no custody");
    println!();
}
