// =============================================================================
// Analysis Pipeline: one snapshot in, one merged result out
// =============================================================================
//
// Per cycle:
//
//   1. validate the snapshot (fail loudly on garbage)
//   2. Greeks -> GEX                      (GEX needs per-strike gamma)
//   3. OI: PCR, max pain, regime, trend, build-up, ATM straddle
//   4. Alignment + heavyweight movers     (constituent % changes)
//   5. MMI                                 (OI regime + breadth + IV percentile)
//   6. Smart money                         (cash flow MA, price trend, positioning)
//   7. Swing score                         (structure, sectors, GEX, IV, vomma, ATM OI)
//   8. Pattern scan over the merged result
//
// Everything is synchronous and pure.  The only look-back is the caller-owned
// AnalysisContext; the same snapshot and context always give the same result.
// =============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::alignment::{self, AlignmentResult, MoverImpact, SectorTrend};
use crate::error::Result;
use crate::gex::{GexEngine, GexResult};
use crate::greeks::{ChainGreeks, GreeksEngine};
use crate::history::percentile_rank;
use crate::mood::{self, MoodIndex};
use crate::open_interest::{
    atm_oi_trend, classify_buildup, classify_iv_regime, pcr_trend, straddle_price, AtmOiTrend,
    AtmOpenInterest, IvRegime, OIAnalyzer, OIBuildup, OIResult,
};
use crate::patterns::{find_matching_patterns, PatternMatch};
use crate::runtime_config::EngineParams;
use crate::smart_money::{
    analyze_flow, analyze_positioning, cash_flow_moving_average, price_trend_from_history,
    SmartMoneyResult,
};
use crate::snapshot::{Breadth, MarketSnapshot};
use crate::swing::{swing_score, vomma_level, SwingInputs, SwingScore, VommaLevel};
use crate::types::PriceTrend;

/// IV percentile reported when there is nothing to rank against.
pub const NEUTRAL_IV_PERCENTILE: f64 = 50.0;

/// Caller-owned look-back.  Every series holds prior cycles only, oldest
/// first; the pipeline appends the current snapshot's value where a series
/// needs it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisContext {
    #[serde(default)]
    pub pcr_history: Vec<f64>,
    /// Combined FII + DII net cash per cycle.
    #[serde(default)]
    pub cash_flow_history: Vec<f64>,
    #[serde(default)]
    pub spot_history: Vec<f64>,
    #[serde(default)]
    pub atm_iv_history: Vec<f64>,
    #[serde(default)]
    pub fii_futures_history: Vec<f64>,
    #[serde(default)]
    pub retail_oi_history: Vec<f64>,
    #[serde(default)]
    pub previous_spot: Option<f64>,
    #[serde(default)]
    pub previous_total_oi: Option<u64>,
    /// ATM strike and its combined OI from the previous cycle.
    #[serde(default)]
    pub previous_atm: Option<AtmOpenInterest>,
}

/// Merged output of every engine for one snapshot.  Engines switched off in
/// `EngineParams` leave their slot `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub symbol: String,
    pub spot_price: f64,
    pub greeks: Option<ChainGreeks>,
    pub gex: Option<GexResult>,
    pub oi: OIResult,
    pub pcr_trend: f64,
    pub buildup: OIBuildup,
    pub atm_strike: Option<f64>,
    pub atm_straddle: Option<f64>,
    /// Mean of call and put IV at the ATM strike.
    pub atm_iv: Option<f64>,
    pub iv_percentile: f64,
    pub iv_regime: IvRegime,
    /// `None` when there is no previous ATM reading at the same strike.
    pub atm_oi_trend: Option<AtmOiTrend>,
    pub breadth: Breadth,
    pub mmi: Option<MoodIndex>,
    pub alignment: Option<AlignmentResult>,
    pub top_movers: Vec<MoverImpact>,
    /// Mean constituent % change per configured sector.
    pub sector_performance: BTreeMap<String, f64>,
    pub sector_trend: Option<SectorTrend>,
    pub price_trend: PriceTrend,
    pub smart_money: Option<SmartMoneyResult>,
    pub swing: Option<SwingScore>,
    pub patterns: Vec<PatternMatch>,
}

fn with_current(history: &[f64], current: f64) -> Vec<f64> {
    let mut series = Vec::with_capacity(history.len() + 1);
    series.extend_from_slice(history);
    series.push(current);
    series
}

/// Run every enabled engine over `snapshot`.
pub fn analyze(
    snapshot: &MarketSnapshot,
    params: &EngineParams,
    context: &AnalysisContext,
) -> Result<AnalysisResult> {
    snapshot.validate()?;

    let spot = snapshot.spot_price;
    let chain = &snapshot.option_chain;
    let rate = snapshot.risk_free_rate.unwrap_or(params.risk_free_rate);

    // --- Greeks -> GEX -------------------------------------------------------
    let needs_greeks = params.enable_greeks || params.enable_gex || params.enable_swing;
    let chain_greeks = needs_greeks.then(|| {
        GreeksEngine::new(params.default_iv).analyze(chain, spot, snapshot.time_to_expiry, rate)
    });
    let gex = match (&chain_greeks, params.enable_gex) {
        (Some(g), true) => Some(GexEngine::new(params.lot_multiplier).analyze(chain, g, spot)),
        _ => {
            trace!("gex disabled");
            None
        }
    };

    // --- Open interest -------------------------------------------------------
    let oi = OIAnalyzer::analyze(chain);
    let pcr_trend = pcr_trend(&with_current(&context.pcr_history, oi.pcr));

    let buildup = match (context.previous_spot, context.previous_total_oi) {
        (Some(prev_spot), Some(prev_oi)) => {
            let oi_change = snapshot.total_open_interest() as f64 - prev_oi as f64;
            classify_buildup(spot - prev_spot, oi_change)
        }
        _ => OIBuildup::Neutral,
    };

    let atm = snapshot.atm_row();
    let atm_strike = atm.map(|row| row.strike);
    let atm_straddle = atm.map(|row| straddle_price(row.call_ltp, row.put_ltp));
    let atm_iv = atm.and_then(|row| match (row.call_iv, row.put_iv) {
        (Some(c), Some(p)) => Some((c + p) / 2.0),
        (Some(iv), None) | (None, Some(iv)) => Some(iv),
        (None, None) => None,
    });
    let iv_percentile = atm_iv
        .and_then(|iv| percentile_rank(&context.atm_iv_history, iv))
        .unwrap_or(NEUTRAL_IV_PERCENTILE);

    let price_change_pct = context
        .previous_spot
        .filter(|&prev| prev > 0.0)
        .map_or(0.0, |prev| (spot - prev) / prev * 100.0);
    let prev_atm_iv = context.atm_iv_history.last().copied();
    let iv_change = match (atm_iv, prev_atm_iv) {
        (Some(now), Some(prev)) => now - prev,
        _ => 0.0,
    };
    let iv_regime = classify_iv_regime(price_change_pct, iv_change);
    let atm_oi = atm.and_then(|row| {
        let current = AtmOpenInterest {
            strike: row.strike,
            oi: row.call_oi.saturating_add(row.put_oi),
        };
        atm_oi_trend(context.previous_atm, current)
    });

    // --- Alignment -----------------------------------------------------------
    let weights = &params.heavyweight_weights;
    let (alignment, top_movers) = if params.enable_alignment {
        let directions =
            alignment::directions_from_changes(&snapshot.heavyweights, params.flat_band_pct);
        (
            Some(alignment::calculate(&directions, weights)),
            alignment::top_movers(&snapshot.heavyweights, weights),
        )
    } else {
        (None, Vec::new())
    };
    let sector_performance = alignment::sector_performance(&snapshot.heavyweights, &params.sectors);
    let sector_trend = alignment::sector_trend(&sector_performance);

    // --- Mood ----------------------------------------------------------------
    let breadth = snapshot.breadth.unwrap_or_else(|| {
        alignment::breadth_from_changes(&snapshot.heavyweights, params.flat_band_pct)
    });
    let mmi = params.enable_mood.then(|| {
        let ad = if breadth.advances == 0 && breadth.declines == 0 {
            trace!("no breadth data, neutral A/D");
            1.0
        } else {
            mood::ad_ratio(breadth.advances, breadth.declines)
        };
        mood::analyze(oi.pcr, iv_percentile, ad, oi.regime.sentiment())
    });

    let price_trend =
        price_trend_from_history(&with_current(&context.spot_history, spot), params.trend_band_pct);

    // --- Smart money ---------------------------------------------------------
    let smart_money = params.enable_smart_money.then(|| {
        let flow = analyze_flow(snapshot.fii_net_cash, snapshot.dii_net_cash);
        let cash_flow_ma = cash_flow_moving_average(&with_current(
            &context.cash_flow_history,
            snapshot.institutional_net_cash(),
        ));
        let at_lows = context
            .spot_history
            .iter()
            .copied()
            .reduce(f64::min)
            .is_some_and(|low| spot <= low);
        let positioning = snapshot.participants.map(|p| {
            analyze_positioning(
                &p,
                &context.fii_futures_history,
                &context.retail_oi_history,
                flow.dii_bias,
                at_lows,
            )
        });
        SmartMoneyResult::new(cash_flow_ma, price_trend, flow, positioning)
    });

    // --- Swing score ---------------------------------------------------------
    let swing = params.enable_swing.then(|| {
        let vomma = match (&chain_greeks, atm_strike) {
            (Some(g), Some(k)) => vomma_level(g, k),
            _ => VommaLevel::Low,
        };
        swing_score(SwingInputs {
            structure: price_trend,
            sector_trend,
            net_gex: gex.as_ref().map(|g| g.net_gex),
            iv_rising: prev_atm_iv.zip(atm_iv).is_some_and(|(prev, now)| now > prev),
            vomma,
            atm_oi,
        })
    });

    let greeks = if params.enable_greeks { chain_greeks } else { None };

    let mut result = AnalysisResult {
        symbol: snapshot.symbol.clone(),
        spot_price: spot,
        greeks,
        gex,
        oi,
        pcr_trend,
        buildup,
        atm_strike,
        atm_straddle,
        atm_iv,
        iv_percentile,
        iv_regime,
        atm_oi_trend: atm_oi,
        breadth,
        mmi,
        alignment,
        top_movers,
        sector_performance,
        sector_trend,
        price_trend,
        smart_money,
        swing,
        patterns: Vec::new(),
    };

    if params.enable_patterns {
        result.patterns = find_matching_patterns(&result);
    }

    debug!(
        symbol = %result.symbol,
        spot,
        pcr = format!("{:.3}", result.oi.pcr),
        net_gex = ?result.gex.as_ref().map(|g| g.net_gex),
        mmi = ?result.mmi.as_ref().map(|m| m.score),
        patterns = result.patterns.len(),
        "analysis cycle complete"
    );

    Ok(result)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::alignment::AlignmentStatus;
    use crate::error::AnalysisError;
    use crate::gex::GexRegime;
    use crate::open_interest::OIRegime;
    use crate::smart_money::CyclePhase;
    use crate::snapshot::{ParticipantPositioning, StrikeRecord};
    use crate::types::PriceTrend;

    pub(crate) fn sample_snapshot() -> MarketSnapshot {
        let mut snap = MarketSnapshot::new("NIFTY", 24_500.0, 0.02);
        snap.option_chain = vec![
            StrikeRecord::new(24_300.0, 40_000, 160_000)
                .with_iv(0.16, 0.17)
                .with_ltp(260.0, 45.0),
            StrikeRecord::new(24_400.0, 60_000, 140_000)
                .with_iv(0.155, 0.16)
                .with_ltp(180.0, 70.0),
            StrikeRecord::new(24_500.0, 120_000, 130_000)
                .with_iv(0.15, 0.15)
                .with_ltp(115.0, 105.0),
            StrikeRecord::new(24_600.0, 150_000, 70_000)
                .with_iv(0.145, 0.15)
                .with_ltp(65.0, 160.0),
            StrikeRecord::new(24_700.0, 170_000, 30_000)
                .with_iv(0.14, 0.145)
                .with_ltp(35.0, 230.0),
        ];
        snap.fii_net_cash = 1_200.0;
        snap.dii_net_cash = 400.0;
        snap.heavyweights = [
            ("HDFCBANK", 0.8),
            ("RELIANCE", 1.1),
            ("ICICIBANK", 0.6),
            ("INFY", -0.4),
            ("TCS", 0.2),
        ]
        .into_iter()
        .map(|(s, c)| (s.to_string(), c))
        .collect();
        snap
    }

    pub(crate) fn sample_result() -> AnalysisResult {
        analyze(&sample_snapshot(), &EngineParams::default(), &AnalysisContext::default())
            .expect("sample snapshot is valid")
    }

    #[test]
    fn full_cycle_populates_every_engine() {
        let r = sample_result();
        assert_eq!(r.symbol, "NIFTY");
        assert_eq!(r.greeks.as_ref().map(|g| g.len()), Some(5));

        let gex = r.gex.as_ref().unwrap();
        assert_eq!(gex.profile.len(), 5);
        let summed: f64 = gex.profile.iter().map(|s| s.net_gex).sum();
        assert!((gex.net_gex - summed).abs() < 1e-6 * summed.abs().max(1.0));
        assert_eq!(gex.regime == GexRegime::Positive, gex.net_gex > 0.0);

        assert_eq!(r.oi.total_call_oi, 540_000);
        assert_eq!(r.oi.total_put_oi, 530_000);
        assert_eq!(r.oi.regime, OIRegime::Neutral);
        assert!(r.oi.max_pain.is_some());

        assert_eq!(r.atm_strike, Some(24_500.0));
        assert_eq!(r.atm_straddle, Some(220.0));
        assert_eq!(r.atm_iv, Some(0.15));
        assert_eq!(r.iv_percentile, NEUTRAL_IV_PERCENTILE);
        assert_eq!(r.buildup, OIBuildup::Neutral);
        assert_eq!(r.pcr_trend, 0.0);

        let a = r.alignment.unwrap();
        assert_eq!(a.status, AlignmentStatus::StrongBullish);
        assert_eq!(r.top_movers[0].symbol, "HDFCBANK");

        assert_eq!((r.breadth.advances, r.breadth.declines), (4, 1));
        let mmi = r.mmi.unwrap();
        assert!((0.0..=100.0).contains(&mmi.score));

        let sm = r.smart_money.as_ref().unwrap();
        assert_eq!(sm.cash_flow_ma, 1_600.0);
        assert_eq!(sm.price_trend, PriceTrend::Sideways);
        assert_eq!(sm.phase, CyclePhase::Accumulation);
        assert!(sm.positioning.is_none());

        assert_eq!(r.iv_regime, IvRegime::Neutral);
        assert_eq!(r.atm_oi_trend, None);
        assert!((r.sector_performance["BANK"] - 0.7).abs() < 1e-9);
        assert!((r.sector_performance["IT"] + 0.1).abs() < 1e-9);
        assert_eq!(r.sector_trend, Some(SectorTrend::Supportive));
        let swing = r.swing.unwrap();
        assert!(swing.score <= 4);
        assert_eq!(swing.verdict, crate::swing::SwingVerdict::Avoid);
    }

    #[test]
    fn swing_and_iv_regime_read_previous_cycle() {
        let ctx = AnalysisContext {
            spot_history: vec![24_000.0, 24_200.0],
            atm_iv_history: vec![0.12],
            previous_spot: Some(24_200.0),
            previous_total_oi: Some(1_000_000),
            previous_atm: Some(AtmOpenInterest {
                strike: 24_500.0,
                oi: 300_000,
            }),
            ..AnalysisContext::default()
        };
        let r = analyze(&sample_snapshot(), &EngineParams::default(), &ctx).unwrap();
        assert_eq!(r.price_trend, PriceTrend::Up);
        assert_eq!(r.iv_regime, IvRegime::Accumulation);
        assert_eq!(r.atm_oi_trend, Some(AtmOiTrend::Unwinding));

        let swing = r.swing.unwrap();
        assert!(swing.inputs.iv_rising);
        assert!(swing.score >= 8);
        assert_eq!(swing.verdict, crate::swing::SwingVerdict::StrongSwingBuy);
    }

    #[test]
    fn same_snapshot_same_result() {
        let snap = sample_snapshot();
        let params = EngineParams::default();
        let ctx = AnalysisContext {
            pcr_history: vec![0.9, 0.95],
            cash_flow_history: vec![800.0, -200.0],
            spot_history: vec![24_300.0, 24_400.0],
            atm_iv_history: vec![0.12, 0.14, 0.18],
            previous_spot: Some(24_400.0),
            previous_total_oi: Some(1_000_000),
            ..AnalysisContext::default()
        };
        let first = analyze(&snap, &params, &ctx).unwrap();
        let second = analyze(&snap, &params, &ctx).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn context_drives_trend_inputs() {
        let ctx = AnalysisContext {
            pcr_history: vec![0.8],
            cash_flow_history: vec![1_400.0, 1_600.0],
            spot_history: vec![24_000.0, 24_200.0],
            atm_iv_history: vec![0.12, 0.14, 0.18, 0.2],
            previous_spot: Some(24_200.0),
            previous_total_oi: Some(1_000_000),
            ..AnalysisContext::default()
        };
        let r = analyze(&sample_snapshot(), &EngineParams::default(), &ctx).unwrap();

        // pcr 530/540 against 0.8 a cycle ago
        assert!((r.pcr_trend - (530.0 / 540.0 - 0.8)).abs() < 1e-12);
        // spot up, OI up
        assert_eq!(r.buildup, OIBuildup::LongBuildup);
        // 0.15 sits above two of four samples
        assert_eq!(r.iv_percentile, 50.0);

        let sm = r.smart_money.unwrap();
        assert!((sm.cash_flow_ma - 4_600.0 / 3.0).abs() < 1e-9);
        assert_eq!(sm.price_trend, PriceTrend::Up);
        assert_eq!(sm.phase, CyclePhase::Markup);
    }

    #[test]
    fn positioning_read_when_participants_present() {
        let mut snap = sample_snapshot();
        snap.participants = Some(ParticipantPositioning {
            fii_index_futures_net: 50_000.0,
            retail_net_oi: -10_000.0,
        });
        let ctx = AnalysisContext {
            fii_futures_history: vec![-20_000.0, 0.0, 10_000.0, 20_000.0, 30_000.0],
            retail_oi_history: vec![0.0, 5_000.0],
            ..AnalysisContext::default()
        };
        let r = analyze(&snap, &EngineParams::default(), &ctx).unwrap();
        let read = r.smart_money.unwrap().positioning.unwrap();
        assert_eq!(read.fii_percentile, Some(100.0));
        assert_eq!(read.combined.to_string(), "Institutional Convergence (Strong Bullish)");
    }

    #[test]
    fn disabled_engines_are_skipped() {
        let params = EngineParams {
            enable_greeks: false,
            enable_gex: false,
            enable_alignment: false,
            enable_mood: false,
            enable_smart_money: false,
            enable_swing: false,
            enable_patterns: false,
            ..EngineParams::default()
        };
        let r = analyze(&sample_snapshot(), &params, &AnalysisContext::default()).unwrap();
        assert!(r.greeks.is_none() && r.gex.is_none());
        assert!(r.alignment.is_none() && r.top_movers.is_empty());
        assert!(r.mmi.is_none() && r.smart_money.is_none());
        assert!(r.patterns.is_empty() && r.swing.is_none());
        assert_eq!(r.oi.total_call_oi, 540_000);
    }

    #[test]
    fn greeks_and_gex_toggle_independently() {
        let greeks_only = EngineParams {
            enable_gex: false,
            ..EngineParams::default()
        };
        let r = analyze(&sample_snapshot(), &greeks_only, &AnalysisContext::default()).unwrap();
        assert_eq!(r.greeks.as_ref().map(|g| g.len()), Some(5));
        assert!(r.gex.is_none());

        let gex_only = EngineParams {
            enable_greeks: false,
            ..EngineParams::default()
        };
        let r = analyze(&sample_snapshot(), &gex_only, &AnalysisContext::default()).unwrap();
        assert!(r.greeks.is_none());
        assert!(r.gex.is_some());
    }

    #[test]
    fn invalid_snapshot_fails_loudly() {
        let mut snap = sample_snapshot();
        snap.spot_price = -1.0;
        let err = analyze(&snap, &EngineParams::default(), &AnalysisContext::default()).unwrap_err();
        assert_eq!(err, AnalysisError::InvalidSpot(-1.0));

        let mut snap = sample_snapshot();
        snap.option_chain.push(StrikeRecord::new(24_500.0, 1, 1));
        assert!(matches!(
            analyze(&snap, &EngineParams::default(), &AnalysisContext::default()),
            Err(AnalysisError::DuplicateStrike(_))
        ));

        let mut snap = sample_snapshot();
        snap.option_chain[0].call_oi = u64::MAX / 2 + 1;
        snap.option_chain[1].call_oi = u64::MAX / 2 + 1;
        assert_eq!(
            analyze(&snap, &EngineParams::default(), &AnalysisContext::default()),
            Err(AnalysisError::OpenInterestOverflow)
        );
    }

    #[test]
    fn expiry_day_zeroes_greeks_without_error() {
        let mut snap = sample_snapshot();
        snap.time_to_expiry = 0.0;
        let r = analyze(&snap, &EngineParams::default(), &AnalysisContext::default()).unwrap();
        assert_eq!(r.gex.unwrap().net_gex, 0.0);
    }

    #[test]
    fn empty_snapshot_uses_fallbacks() {
        let snap = MarketSnapshot::new("NIFTY", 24_500.0, 0.02);
        let r = analyze(&snap, &EngineParams::default(), &AnalysisContext::default()).unwrap();
        assert_eq!(r.oi.pcr, 0.0);
        assert_eq!(r.oi.max_pain, None);
        assert_eq!(r.atm_strike, None);
        assert_eq!(r.alignment.unwrap(), AlignmentResult::neutral());
        assert_eq!(r.gex.unwrap().flip_level, 24_500.0);
    }
}
