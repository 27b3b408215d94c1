use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::TokenIntelligence;

/// 가드 동작 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardMode {
    /// 경고만 노출, 실행은 허용
    Soft,
    /// 임계값 위반 시 실행 차단
    Hard,
}

/// 사용자 설정 프리셋 가드
///
/// 외부에 저장되고 값으로 전달된다. 이 코어는 평가만 한다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetGuards {
    pub enabled: bool,
    pub mode: GuardMode,
    /// 최소 안전 점수 (0 ~ 100)
    #[serde(default)]
    pub min_safety_score: Option<f64>,
    /// 최대 가격 영향 (%, 예: 2.5)
    #[serde(default)]
    pub max_price_impact: Option<f64>,
    /// 최소 유동성 (USD)
    #[serde(default)]
    pub min_liquidity_usd: Option<f64>,
}

impl Default for PresetGuards {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: GuardMode::Soft,
            min_safety_score: None,
            max_price_impact: None,
            min_liquidity_usd: None,
        }
    }
}

/// 위반된 임계값 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    SafetyScore,
    PriceImpact,
    Liquidity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardWarning {
    pub kind: GuardKind,
    pub message: String,
}

/// 가드 평가 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardEvaluation {
    pub passed: bool,
    pub warnings: Vec<GuardWarning>,
    pub blocked: bool,
    pub block_reason: Option<String>,
}

impl GuardEvaluation {
    fn pass() -> Self {
        Self {
            passed: true,
            warnings: Vec::new(),
            blocked: false,
            block_reason: None,
        }
    }
}

/// 프리셋 가드를 현재 인텔리전스에 대해 평가
///
/// 순수 함수다. 비활성 설정이나 인텔리전스 부재는 항상 통과한다.
/// hard 모드에서는 위반이 하나라도 있으면 차단하고, 차단 사유는
/// 첫 번째 경고의 메시지를 쓴다 (경고 목록에는 전부 수집된다).
pub fn evaluate(guards: &PresetGuards, intelligence: Option<&TokenIntelligence>) -> GuardEvaluation {
    if !guards.enabled {
        return GuardEvaluation::pass();
    }

    let Some(intel) = intelligence else {
        return GuardEvaluation::pass();
    };

    let mut warnings = Vec::new();

    if let Some(min_score) = guards.min_safety_score {
        if intel.safety_score < min_score {
            warnings.push(GuardWarning {
                kind: GuardKind::SafetyScore,
                message: format!(
                    "Safety score {:.0} is below your minimum of {:.0}",
                    intel.safety_score, min_score
                ),
            });
        }
    }

    if let (Some(max_impact), Some(impact)) = (guards.max_price_impact, intel.price_impact_pct) {
        if impact > max_impact {
            warnings.push(GuardWarning {
                kind: GuardKind::PriceImpact,
                message: format!(
                    "Price impact {:.2}% exceeds your maximum of {:.2}%",
                    impact, max_impact
                ),
            });
        }
    }

    if let (Some(min_liquidity), Some(liquidity)) = (guards.min_liquidity_usd, intel.liquidity_usd)
    {
        if liquidity < min_liquidity {
            warnings.push(GuardWarning {
                kind: GuardKind::Liquidity,
                message: format!(
                    "Liquidity ${:.0} is below your minimum of ${:.0}",
                    liquidity, min_liquidity
                ),
            });
        }
    }

    let blocked = guards.mode == GuardMode::Hard && !warnings.is_empty();
    let block_reason = if blocked {
        Some(warnings[0].message.clone())
    } else {
        None
    };

    if !warnings.is_empty() {
        debug!(
            "🛡️ Guard evaluation: {} warning(s), blocked={}",
            warnings.len(),
            blocked
        );
    }

    GuardEvaluation {
        passed: warnings.is_empty(),
        warnings,
        blocked,
        block_reason,
    }
}
