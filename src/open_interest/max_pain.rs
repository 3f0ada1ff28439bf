// =============================================================================
// Max Pain
// =============================================================================
//
// For a candidate expiry price K the option writers pay out
//
//   payout(K) = Σ_s max(0, K - Ks) · call_oi(Ks) + max(0, Ks - K) · put_oi(Ks)
//
// Max pain is the chain strike with the smallest payout.  Every strike is
// evaluated (O(n²), chains are a few hundred rows at most); ties resolve to
// the lower strike.
// =============================================================================

use crate::snapshot::StrikeRecord;

/// Aggregate writer payout if the underlying settles at `settle`.
pub fn writer_payout(chain: &[StrikeRecord], settle: f64) -> f64 {
    chain
        .iter()
        .map(|row| {
            let call_leg = (settle - row.strike).max(0.0) * row.call_oi as f64;
            let put_leg = (row.strike - settle).max(0.0) * row.put_oi as f64;
            call_leg + put_leg
        })
        .sum()
}

/// Strike minimising [`writer_payout`], or `None` for an empty chain.
pub fn max_pain(chain: &[StrikeRecord]) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;

    for candidate in chain {
        let payout = writer_payout(chain, candidate.strike);
        best = match best {
            None => Some((candidate.strike, payout)),
            Some((strike, best_payout)) => {
                if payout < best_payout || (payout == best_payout && candidate.strike < strike) {
                    Some((candidate.strike, payout))
                } else {
                    Some((strike, best_payout))
                }
            }
        };
    }

    best.map(|(strike, _)| strike)
}
