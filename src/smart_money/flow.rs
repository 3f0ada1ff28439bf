// =============================================================================
// Institutional cash flow: FII / DII bias
// =============================================================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowBias {
    Bullish,
    Bearish,
}

impl FlowBias {
    /// Net buyers are bullish; flat or net selling reads bearish.
    pub fn from_cash(net_cash: f64) -> Self {
        if net_cash > 0.0 {
            Self::Bullish
        } else {
            Self::Bearish
        }
    }
}

impl std::fmt::Display for FlowBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetBias {
    StrongBullish,
    StrongBearish,
    Mixed,
}

impl std::fmt::Display for NetBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongBullish => write!(f, "Strong Bullish"),
            Self::StrongBearish => write!(f, "Strong Bearish"),
            Self::Mixed => write!(f, "Mixed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstitutionalFlow {
    pub fii_bias: FlowBias,
    pub dii_bias: FlowBias,
    pub net_bias: NetBias,
    /// |FII| + |DII|, crore.
    pub magnitude: f64,
}

/// Both desks buying is strong bullish, both selling strong bearish,
/// anything else mixed.
pub fn analyze_flow(fii_net_cash: f64, dii_net_cash: f64) -> InstitutionalFlow {
    let net_bias = if fii_net_cash > 0.0 && dii_net_cash > 0.0 {
        NetBias::StrongBullish
    } else if fii_net_cash < 0.0 && dii_net_cash < 0.0 {
        NetBias::StrongBearish
    } else {
        NetBias::Mixed
    };

    InstitutionalFlow {
        fii_bias: FlowBias::from_cash(fii_net_cash),
        dii_bias: FlowBias::from_cash(dii_net_cash),
        net_bias,
        magnitude: fii_net_cash.abs() + dii_net_cash.abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_buying() {
        let f = analyze_flow(1200.0, 800.0);
        assert_eq!(f.net_bias, NetBias::StrongBullish);
        assert_eq!(f.fii_bias, FlowBias::Bullish);
        assert_eq!(f.magnitude, 2000.0);
    }

    #[test]
    fn both_selling() {
        let f = analyze_flow(-1200.0, -300.0);
        assert_eq!(f.net_bias, NetBias::StrongBearish);
        assert_eq!(f.dii_bias, FlowBias::Bearish);
        assert_eq!(f.magnitude, 1500.0);
    }

    #[test]
    fn opposing_desks_are_mixed() {
        let f = analyze_flow(-2500.0, 3000.0);
        assert_eq!(f.net_bias, NetBias::Mixed);
        assert_eq!(f.fii_bias, FlowBias::Bearish);
        assert_eq!(f.dii_bias, FlowBias::Bullish);
    }

    #[test]
    fn flat_fii_reads_bearish() {
        let f = analyze_flow(0.0, 0.0);
        assert_eq!(f.fii_bias, FlowBias::Bearish);
        assert_eq!(f.net_bias, NetBias::Mixed);
        assert_eq!(f.magnitude, 0.0);
    }
}
