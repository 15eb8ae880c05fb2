use crate::domain::Money;

/// Rungs shown on the bidding board
pub const DISPLAY_RUNGS: usize = 4;

/// Rungs checked when accepting a bid amount
pub const VERIFY_RUNGS: usize = 100;

/// Bid increment tier for a given price level.
///
/// Step function with strict upper bounds, first match wins.
pub fn increment_for(amount: Money) -> Money {
    let units = amount.units();
    let step = if units < 10_000 {
        500
    } else if units < 30_000 {
        1_000
    } else if units < 50_000 {
        2_000
    } else if units < 150_000 {
        5_000
    } else if units < 300_000 {
        10_000
    } else if units < 500_000 {
        20_000
    } else if units < 1_000_000 {
        30_000
    } else {
        50_000
    };
    Money::new(step)
}

/// Legal next bid amounts above `current`.
///
/// Produces up to `count` rungs, stopping (exclusive) before any rung that
/// would reach `buy_now`. The increment is recomputed as the ladder climbs
/// across tier boundaries: after each rung is emitted the amount advances by
/// the increment in hand, and the increment for the following step is taken
/// at the freshly advanced amount. Pure and deterministic; integer
/// arithmetic only.
pub fn rungs(current: Money, buy_now: Option<Money>, count: usize) -> Vec<Money> {
    if !current.is_positive() {
        return Vec::new();
    }

    let mut inc = increment_for(current);
    let mut next = current + inc;
    let mut steps = Vec::with_capacity(count.min(VERIFY_RUNGS));
    for _ in 0..count {
        if matches!(buy_now, Some(ceiling) if next >= ceiling) {
            break;
        }
        steps.push(next);
        next += inc;
        inc = increment_for(next);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(units: i64) -> Money {
        Money::new(units)
    }

    #[test]
    fn test_increment_tiers() {
        assert_eq!(increment_for(m(9_999)), m(500));
        assert_eq!(increment_for(m(10_000)), m(1_000));
        assert_eq!(increment_for(m(29_999)), m(1_000));
        assert_eq!(increment_for(m(30_000)), m(2_000));
        assert_eq!(increment_for(m(50_000)), m(5_000));
        assert_eq!(increment_for(m(149_999)), m(5_000));
        assert_eq!(increment_for(m(150_000)), m(10_000));
        assert_eq!(increment_for(m(300_000)), m(20_000));
        assert_eq!(increment_for(m(500_000)), m(30_000));
        assert_eq!(increment_for(m(1_000_000)), m(50_000));
    }

    #[test]
    fn test_rungs_from_fifty_thousand() {
        // 50,000 sits in the 5,000 tier
        let steps = rungs(m(50_000), None, 4);
        assert_eq!(steps, vec![m(55_000), m(60_000), m(65_000), m(70_000)]);
    }

    #[test]
    fn test_rungs_recompute_increment_across_tier_boundary() {
        // From 9,000: first rung uses the 500 tier, then the ladder
        // crosses 10,000 and climbs in 1,000 steps.
        let steps = rungs(m(9_000), None, 4);
        assert_eq!(steps, vec![m(9_500), m(10_000), m(11_000), m(12_000)]);
    }

    #[test]
    fn test_rungs_stop_below_buy_now() {
        let steps = rungs(m(50_000), Some(m(63_000)), 100);
        assert_eq!(steps, vec![m(55_000), m(60_000)]);
        assert!(steps.iter().all(|s| *s < m(63_000)));

        // a rung equal to the ceiling is excluded as well
        let steps = rungs(m(50_000), Some(m(60_000)), 100);
        assert_eq!(steps, vec![m(55_000)]);
    }

    #[test]
    fn test_rungs_empty_for_non_positive_current() {
        assert!(rungs(m(0), None, 10).is_empty());
        assert!(rungs(m(-500), None, 10).is_empty());
    }

    #[test]
    fn test_rungs_strictly_increasing_and_deterministic() {
        let a = rungs(m(7_300), Some(m(2_000_000)), VERIFY_RUNGS);
        let b = rungs(m(7_300), Some(m(2_000_000)), VERIFY_RUNGS);
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
    }
}
