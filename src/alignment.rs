// =============================================================================
// Index Alignment: the 70% participation rule
// =============================================================================
//
// A move in the index is only trusted when the constituents carrying most of
// its weight move the same way.
//
//   total  = Σ weight of every tracked symbol (not the whole index)
//   bull % = Σ weight(direction = +1) / total · 100
//   bear % = Σ weight(direction = -1) / total · 100
//
// Flat constituents count toward neither side, so bull % + bear % may be
// below 100.  Either side at or above ALIGNMENT_THRESHOLD_PCT is a strong
// trend; anything else is neutral.
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::snapshot::Breadth;

/// Share of tracked weight that must agree for a strong trend.
pub const ALIGNMENT_THRESHOLD_PCT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlignmentStatus {
    StrongBullish,
    StrongBearish,
    Neutral,
}

impl std::fmt::Display for AlignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StrongBullish => write!(f, "Strong Bullish (70%+ Aligned)"),
            Self::StrongBearish => write!(f, "Strong Bearish (70%+ Aligned)"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub bullish_pct: f64,
    pub bearish_pct: f64,
    pub status: AlignmentStatus,
}

impl AlignmentResult {
    pub fn neutral() -> Self {
        Self {
            bullish_pct: 0.0,
            bearish_pct: 0.0,
            status: AlignmentStatus::Neutral,
        }
    }
}

/// Weighted participation of the tracked constituents.
///
/// `directions` maps symbol to -1 / 0 / +1; `weights` maps symbol to index
/// weight in percent.  Symbols without a weight contribute nothing.
pub fn calculate(
    directions: &BTreeMap<String, i8>,
    weights: &BTreeMap<String, f64>,
) -> AlignmentResult {
    let mut total = 0.0;
    let mut bullish = 0.0;
    let mut bearish = 0.0;

    for (symbol, direction) in directions {
        let weight = weights.get(symbol).copied().unwrap_or(0.0);
        total += weight;
        match direction.signum() {
            1 => bullish += weight,
            -1 => bearish += weight,
            _ => {}
        }
    }

    if total == 0.0 {
        trace!("no tracked weight, alignment neutral");
        return AlignmentResult::neutral();
    }

    let bullish_pct = bullish / total * 100.0;
    let bearish_pct = bearish / total * 100.0;

    let status = if bullish_pct >= ALIGNMENT_THRESHOLD_PCT {
        AlignmentStatus::StrongBullish
    } else if bearish_pct >= ALIGNMENT_THRESHOLD_PCT {
        AlignmentStatus::StrongBearish
    } else {
        AlignmentStatus::Neutral
    };

    debug!(
        bullish_pct = format!("{:.1}", bullish_pct),
        bearish_pct = format!("{:.1}", bearish_pct),
        status = %status,
        "index alignment computed"
    );

    AlignmentResult {
        bullish_pct,
        bearish_pct,
        status,
    }
}

/// Map percent price changes to directions.  Moves within ±`flat_band_pct`
/// are flat.
pub fn directions_from_changes(
    changes: &BTreeMap<String, f64>,
    flat_band_pct: f64,
) -> BTreeMap<String, i8> {
    changes
        .iter()
        .map(|(symbol, &change)| {
            let direction = if change > flat_band_pct {
                1
            } else if change < -flat_band_pct {
                -1
            } else {
                0
            };
            (symbol.clone(), direction)
        })
        .collect()
}

/// Advancing / declining constituent counts.
pub fn breadth_from_changes(changes: &BTreeMap<String, f64>, flat_band_pct: f64) -> Breadth {
    let directions = directions_from_changes(changes, flat_band_pct);
    Breadth {
        advances: directions.values().filter(|&&d| d > 0).count() as u32,
        declines: directions.values().filter(|&&d| d < 0).count() as u32,
    }
}

/// A constituent's pull on the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoverImpact {
    pub symbol: String,
    pub change_pct: f64,
    pub weight: f64,
    /// change_pct · weight.
    pub impact: f64,
}

/// Weighted contributions of the tracked constituents, largest absolute
/// impact first.
pub fn top_movers(
    changes: &BTreeMap<String, f64>,
    weights: &BTreeMap<String, f64>,
) -> Vec<MoverImpact> {
    let mut movers: Vec<MoverImpact> = changes
        .iter()
        .filter_map(|(symbol, &change_pct)| {
            let weight = *weights.get(symbol)?;
            Some(MoverImpact {
                symbol: symbol.clone(),
                change_pct,
                weight,
                impact: change_pct * weight,
            })
        })
        .collect();
    movers.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));
    movers
}

// ---------------------------------------------------------------------------
// Sector performance
// ---------------------------------------------------------------------------

/// Mean % change per sector over the members present in `changes`, rounded
/// to two decimals.  Sectors with no reporting member are left out.
pub fn sector_performance(
    changes: &BTreeMap<String, f64>,
    sectors: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, f64> {
    sectors
        .iter()
        .filter_map(|(sector, members)| {
            let moves: Vec<f64> = members.iter().filter_map(|s| changes.get(s).copied()).collect();
            if moves.is_empty() {
                return None;
            }
            let avg = moves.iter().sum::<f64>() / moves.len() as f64;
            Some((sector.clone(), (avg * 100.0).round() / 100.0))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectorTrend {
    Supportive,
    Divergent,
}

/// Supportive when more sectors are up than down.  `None` with no sectors.
pub fn sector_trend(performance: &BTreeMap<String, f64>) -> Option<SectorTrend> {
    if performance.is_empty() {
        return None;
    }
    let up = performance.values().filter(|&&c| c > 0.0).count();
    let down = performance.values().filter(|&&c| c < 0.0).count();
    trace!(up, down, "sector breadth");
    Some(if up > down {
        SectorTrend::Supportive
    } else {
        SectorTrend::Divergent
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map<V: Copy>(pairs: &[(&str, V)]) -> BTreeMap<String, V> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn weights() -> BTreeMap<String, f64> {
        map(&[("RELIANCE", 10.0), ("HDFCBANK", 10.0), ("INFY", 5.0), ("TCS", 5.0)])
    }

    #[test]
    fn all_green_is_strong_bullish() {
        let dirs = map(&[("RELIANCE", 1i8), ("HDFCBANK", 1), ("INFY", 1), ("TCS", 1)]);
        let res = calculate(&dirs, &weights());
        assert_eq!(res.bullish_pct, 100.0);
        assert_eq!(res.bearish_pct, 0.0);
        assert_eq!(res.status, AlignmentStatus::StrongBullish);
    }

    #[test]
    fn mostly_green_clears_threshold() {
        let dirs = map(&[("RELIANCE", 1i8), ("HDFCBANK", 1), ("INFY", 1), ("TCS", -1)]);
        let res = calculate(&dirs, &weights());
        assert!((res.bullish_pct - 250.0 / 3.0).abs() < 1e-9);
        assert_eq!(res.status, AlignmentStatus::StrongBullish);
    }

    #[test]
    fn balanced_is_neutral() {
        let dirs = map(&[("RELIANCE", 1i8), ("HDFCBANK", -1), ("INFY", 1), ("TCS", -1)]);
        let res = calculate(&dirs, &weights());
        assert_eq!(res.bullish_pct, 50.0);
        assert_eq!(res.bearish_pct, 50.0);
        assert_eq!(res.status, AlignmentStatus::Neutral);
    }

    #[test]
    fn strong_bearish() {
        let dirs = map(&[("RELIANCE", -1i8), ("HDFCBANK", -1), ("INFY", 0)]);
        let res = calculate(&dirs, &weights());
        assert!((res.bearish_pct - 80.0).abs() < 1e-9);
        assert_eq!(res.bullish_pct, 0.0);
        assert_eq!(res.status, AlignmentStatus::StrongBearish);
    }

    #[test]
    fn flat_counts_toward_neither_side() {
        let dirs = map(&[("RELIANCE", 1i8), ("HDFCBANK", 0), ("INFY", -1), ("TCS", 0)]);
        let res = calculate(&dirs, &weights());
        assert!((res.bullish_pct - 100.0 / 3.0).abs() < 1e-9);
        assert!((res.bearish_pct - 50.0 / 3.0).abs() < 1e-9);
        assert!(res.bullish_pct + res.bearish_pct < 100.0);
    }

    #[test]
    fn exactly_seventy_percent_is_strong() {
        let w = map(&[("A", 70.0), ("B", 30.0)]);
        let dirs = map(&[("A", 1i8), ("B", 0)]);
        assert_eq!(calculate(&dirs, &w).status, AlignmentStatus::StrongBullish);
    }

    #[test]
    fn only_tracked_symbols_count() {
        // TCS and INFY not in the direction map: total weight is 20, not 30.
        let dirs = map(&[("RELIANCE", 1i8), ("HDFCBANK", -1)]);
        let res = calculate(&dirs, &weights());
        assert_eq!(res.bullish_pct, 50.0);
    }

    #[test]
    fn zero_weight_is_neutral() {
        let dirs = map(&[("UNKNOWN", 1i8)]);
        assert_eq!(calculate(&dirs, &weights()), AlignmentResult::neutral());
        assert_eq!(calculate(&BTreeMap::new(), &weights()), AlignmentResult::neutral());
    }

    #[test]
    fn directions_and_breadth_from_changes() {
        let changes = map(&[("A", 1.2), ("B", -0.4), ("C", 0.05), ("D", 0.0)]);
        let dirs = directions_from_changes(&changes, 0.1);
        assert_eq!(dirs["A"], 1);
        assert_eq!(dirs["B"], -1);
        assert_eq!(dirs["C"], 0);
        assert_eq!(dirs["D"], 0);

        let strict = directions_from_changes(&changes, 0.0);
        assert_eq!(strict["C"], 1);
        assert_eq!(strict["D"], 0);

        let b = breadth_from_changes(&changes, 0.0);
        assert_eq!((b.advances, b.declines), (2, 1));
    }

    #[test]
    fn movers_ranked_by_absolute_impact() {
        let changes = map(&[("RELIANCE", 0.5), ("HDFCBANK", -1.0), ("INFY", 2.5), ("XYZ", 9.0)]);
        let movers = top_movers(&changes, &weights());
        let order: Vec<&str> = movers.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(order, vec!["INFY", "HDFCBANK", "RELIANCE"]);
        assert!((movers[0].impact - 12.5).abs() < 1e-12);
    }

    #[test]
    fn sector_averages() {
        let changes = map(&[("HDFCBANK", 1.0), ("ICICIBANK", 0.5), ("INFY", -0.8), ("ITC", 0.3)]);
        let sectors: BTreeMap<String, Vec<String>> = [
            ("BANK", vec!["HDFCBANK", "ICICIBANK", "SBIN"]),
            ("IT", vec!["INFY", "TCS"]),
            ("AUTO", vec!["MARUTI"]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
        .collect();

        let perf = sector_performance(&changes, &sectors);
        assert_eq!(perf.len(), 2);
        assert_eq!(perf.get("BANK"), Some(&0.75));
        assert_eq!(perf.get("IT"), Some(&-0.8));
        assert!(!perf.contains_key("AUTO"));
        assert_eq!(sector_trend(&perf), Some(SectorTrend::Divergent));
    }

    #[test]
    fn sector_trend_majority() {
        let perf = map(&[("BANK", 0.4), ("IT", 0.2), ("FMCG", -0.1)]);
        assert_eq!(sector_trend(&perf), Some(SectorTrend::Supportive));
        assert_eq!(sector_trend(&BTreeMap::new()), None);
    }
}
