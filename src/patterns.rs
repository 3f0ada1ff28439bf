// =============================================================================
// Pattern Knowledge Base
// =============================================================================
//
// Known market patterns and what to do about them.  Each kind is a variant
// with its predicate in one `match` over the merged AnalysisResult, so the
// rule set is plain data plus one function.
//
//   NEGATIVE GEX REGIME   net_gex < -2e9   dealers amplify moves
//   POSITIVE GEX REGIME   net_gex >  2e9   dealers dampen moves
//   FII AGGRESSIVE SHORT  FII cash bias bearish
//
// Failure scenarios are the mistakes a signal is known to invite; they are
// attached as warnings to any signal that leans on the concept.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::AnalysisResult;
use crate::smart_money::FlowBias;

/// |net GEX| beyond which dealer hedging dominates intraday flow.
pub const GEX_REGIME_THRESHOLD: f64 = 2e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    NegativeGexRegime,
    PositiveGexRegime,
    FiiAggressiveShort,
}

impl PatternKind {
    pub const ALL: [PatternKind; 3] = [
        PatternKind::NegativeGexRegime,
        PatternKind::PositiveGexRegime,
        PatternKind::FiiAggressiveShort,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::NegativeGexRegime => "Negative GEX Regime",
            Self::PositiveGexRegime => "Positive GEX Regime",
            Self::FiiAggressiveShort => "FII Aggressive Short",
        }
    }

    pub fn meaning(self) -> &'static str {
        match self {
            Self::NegativeGexRegime => "Dealers will AMPLIFY moves",
            Self::PositiveGexRegime => "Dealers will DAMPEN moves",
            Self::FiiAggressiveShort => "Institutional selling detected",
        }
    }

    pub fn action(self) -> &'static str {
        match self {
            Self::NegativeGexRegime => "Directional strategy",
            Self::PositiveGexRegime => "Sell premium",
            Self::FiiAggressiveShort => "Defensive positioning",
        }
    }

    /// Historical hit rate, percent.
    pub fn confidence(self) -> u8 {
        match self {
            Self::NegativeGexRegime => 85,
            Self::PositiveGexRegime => 82,
            Self::FiiAggressiveShort => 77,
        }
    }

    /// Whether the pattern is present.  Engines that were disabled for the
    /// cycle never match.
    pub fn detect(self, result: &AnalysisResult) -> bool {
        match self {
            Self::NegativeGexRegime => result
                .gex
                .as_ref()
                .is_some_and(|g| g.net_gex < -GEX_REGIME_THRESHOLD),
            Self::PositiveGexRegime => result
                .gex
                .as_ref()
                .is_some_and(|g| g.net_gex > GEX_REGIME_THRESHOLD),
            Self::FiiAggressiveShort => result
                .smart_money
                .as_ref()
                .is_some_and(|s| s.flow.fii_bias == FlowBias::Bearish),
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub kind: PatternKind,
    pub name: String,
    pub meaning: String,
    pub action: String,
    pub confidence: u8,
}

impl From<PatternKind> for PatternMatch {
    fn from(kind: PatternKind) -> Self {
        Self {
            kind,
            name: kind.name().to_string(),
            meaning: kind.meaning().to_string(),
            action: kind.action().to_string(),
            confidence: kind.confidence(),
        }
    }
}

/// Every pattern present in `result`, in knowledge-base order.
pub fn find_matching_patterns(result: &AnalysisResult) -> Vec<PatternMatch> {
    let matches: Vec<PatternMatch> = PatternKind::ALL
        .into_iter()
        .filter(|kind| kind.detect(result))
        .map(PatternMatch::from)
        .collect();

    debug!(count = matches.len(), "pattern scan complete");
    matches
}

// ---------------------------------------------------------------------------
// Failure scenarios
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureScenario {
    MaxPainNotGuaranteed,
}

impl FailureScenario {
    pub const ALL: [FailureScenario; 1] = [FailureScenario::MaxPainNotGuaranteed];

    pub fn mistake(self) -> &'static str {
        match self {
            Self::MaxPainNotGuaranteed => "Assuming price WILL close at max pain",
        }
    }

    pub fn approach(self) -> &'static str {
        match self {
            Self::MaxPainNotGuaranteed => "Use as reference, not guarantee",
        }
    }

    pub fn lesson(self) -> &'static str {
        match self {
            Self::MaxPainNotGuaranteed => "Max pain is probability, not destiny",
        }
    }

    fn applies(self, signal: &str, result: &AnalysisResult) -> bool {
        match self {
            Self::MaxPainNotGuaranteed => {
                result.oi.max_pain.is_some() && signal.to_lowercase().contains("max pain")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureWarning {
    pub scenario: FailureScenario,
    pub mistake: String,
    pub approach: String,
    pub lesson: String,
}

impl From<FailureScenario> for FailureWarning {
    fn from(scenario: FailureScenario) -> Self {
        Self {
            scenario,
            mistake: scenario.mistake().to_string(),
            approach: scenario.approach().to_string(),
            lesson: scenario.lesson().to_string(),
        }
    }
}

/// Known failure modes a free-text trade signal walks into.
pub fn check_failure_scenarios(signal: &str, result: &AnalysisResult) -> Vec<FailureWarning> {
    FailureScenario::ALL
        .into_iter()
        .filter(|s| s.applies(signal, result))
        .map(FailureWarning::from)
        .collect()
}
