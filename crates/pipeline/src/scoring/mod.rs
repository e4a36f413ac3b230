//! Hype score engine
//!
//! Pure functions over metric history slices: inputs in, breakdown out.
//! No clock reads and no store access, so a score can be recomputed
//! bit-for-bit from the same samples.

use chrono::{Duration, NaiveDate};
use paperpulse_common::db::models::Trend;
use paperpulse_common::store::MetricPoint;
use serde::Serialize;

/// Component weights
pub const STAR_GROWTH_WEIGHT: f64 = 0.4;
pub const CITATION_GROWTH_WEIGHT: f64 = 0.3;
pub const ABSOLUTE_NORM_WEIGHT: f64 = 0.2;
pub const RECENCY_WEIGHT: f64 = 0.1;

/// Trailing growth windows in days
pub const STAR_GROWTH_WINDOW_DAYS: i64 = 7;
pub const CITATION_GROWTH_WINDOW_DAYS: i64 = 30;

/// Recency bonus holds at 1.0 up to this age
pub const RECENCY_FULL_DAYS: i64 = 30;
/// Recency bonus reaches 0.0 at this age
pub const RECENCY_ZERO_DAYS: i64 = 60;

/// Trend boundaries on the 7-day star growth rate
pub const TREND_RISING_MIN: f64 = 0.10;
pub const TREND_DECLINING_MAX: f64 = -0.05;

/// Everything the engine needs to score one paper
#[derive(Debug, Clone)]
pub struct ScoreInput<'a> {
    /// Date the score is computed for
    pub as_of: NaiveDate,

    /// Publication date, if known
    pub published: Option<NaiveDate>,

    /// Star history, ascending by date
    pub stars: &'a [MetricPoint],

    /// Citation history, ascending by date
    pub citations: &'a [MetricPoint],

    /// Highest current star count across the comparison set
    pub max_stars_in_set: i64,
}

/// A score with its component breakdown, each on its natural scale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypeBreakdown {
    pub score: f64,
    pub star_growth_7d: f64,
    pub citation_growth_30d: f64,
    pub absolute_norm: f64,
    pub recency_bonus: f64,
    pub trend: Trend,
}

/// Compute the hype score for one paper.
///
/// Growth terms are unbounded in both directions before the final
/// clamp; a shrinking star count legitimately drags the raw sum down.
pub fn compute(input: &ScoreInput<'_>) -> HypeBreakdown {
    let star_growth_7d = growth_rate(input.stars, input.as_of, STAR_GROWTH_WINDOW_DAYS);
    let citation_growth_30d =
        growth_rate(input.citations, input.as_of, CITATION_GROWTH_WINDOW_DAYS);
    let stars_now = value_as_of(input.stars, input.as_of).unwrap_or(0);
    let absolute_norm = absolute_norm(stars_now, input.max_stars_in_set);
    let recency_bonus = recency_bonus(input.published, input.as_of);

    let raw = 100.0
        * (STAR_GROWTH_WEIGHT * star_growth_7d
            + CITATION_GROWTH_WEIGHT * citation_growth_30d
            + ABSOLUTE_NORM_WEIGHT * absolute_norm
            + RECENCY_WEIGHT * recency_bonus);

    HypeBreakdown {
        score: raw.clamp(0.0, 100.0),
        star_growth_7d,
        citation_growth_30d,
        absolute_norm,
        recency_bonus,
        trend: trend_for(star_growth_7d),
    }
}

/// Relative growth over a trailing window. Missing samples read as
/// zero, so a series with no history yields 0.0 rather than an error.
pub fn growth_rate(series: &[MetricPoint], as_of: NaiveDate, window_days: i64) -> f64 {
    let now = value_as_of(series, as_of).unwrap_or(0);
    let then = value_as_of(series, as_of - Duration::days(window_days)).unwrap_or(0);
    (now - then) as f64 / then.max(1) as f64
}

/// Log-scaled position of a star count inside the comparison set
pub fn absolute_norm(stars_now: i64, max_stars_in_set: i64) -> f64 {
    let denominator = ((max_stars_in_set + 1) as f64).log10();
    if denominator == 0.0 {
        return 0.0;
    }
    ((stars_now + 1) as f64).log10() / denominator
}

/// 1.0 through day 30, linear decay to 0.0 at day 60, 0.0 beyond.
/// Unknown publication dates earn no bonus.
pub fn recency_bonus(published: Option<NaiveDate>, as_of: NaiveDate) -> f64 {
    let Some(published) = published else {
        return 0.0;
    };
    let age_days = (as_of - published).num_days();
    if age_days <= RECENCY_FULL_DAYS {
        1.0
    } else if age_days >= RECENCY_ZERO_DAYS {
        0.0
    } else {
        1.0 - (age_days - RECENCY_FULL_DAYS) as f64
            / (RECENCY_ZERO_DAYS - RECENCY_FULL_DAYS) as f64
    }
}

/// Trend label from the 7-day star growth alone
pub fn trend_for(star_growth_7d: f64) -> Trend {
    if star_growth_7d > TREND_RISING_MIN {
        Trend::Rising
    } else if star_growth_7d < TREND_DECLINING_MAX {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Latest value at or before `date` in an ascending series
fn value_as_of(series: &[MetricPoint], date: NaiveDate) -> Option<i64> {
    series.iter().rev().find(|p| p.date <= date).map(|p| p.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn point(y: i32, m: u32, d: u32, value: i64) -> MetricPoint {
        MetricPoint {
            date: date(y, m, d),
            value,
        }
    }

    #[test]
    fn test_fixed_history_scenario() {
        // Stars 100 at day zero, 150 at day seven, no citation data
        let stars = vec![point(2026, 8, 1, 100), point(2026, 8, 8, 150)];
        let input = ScoreInput {
            as_of: date(2026, 8, 8),
            published: Some(date(2026, 8, 1)),
            stars: &stars,
            citations: &[],
            max_stars_in_set: 1000,
        };

        let breakdown = compute(&input);
        assert_eq!(breakdown.star_growth_7d, 0.5);
        assert_eq!(breakdown.citation_growth_30d, 0.0);
        assert_eq!(breakdown.recency_bonus, 1.0);
        assert_eq!(breakdown.trend, Trend::Rising);

        let expected = 100.0
            * (STAR_GROWTH_WEIGHT * 0.5
                + ABSOLUTE_NORM_WEIGHT * breakdown.absolute_norm
                + RECENCY_WEIGHT);
        assert_eq!(breakdown.score, expected);
    }

    #[test]
    fn test_identical_inputs_identical_outputs() {
        let stars = vec![point(2026, 7, 1, 40), point(2026, 7, 20, 90)];
        let citations = vec![point(2026, 7, 1, 3), point(2026, 7, 25, 9)];
        let input = ScoreInput {
            as_of: date(2026, 7, 28),
            published: Some(date(2026, 6, 10)),
            stars: &stars,
            citations: &citations,
            max_stars_in_set: 500,
        };

        assert_eq!(compute(&input), compute(&input));
    }

    #[test]
    fn test_score_monotone_in_star_growth() {
        // Same paper, progressively better week-over-week star deltas
        let mut previous = f64::NEG_INFINITY;
        for now_value in [80, 100, 120, 200, 500] {
            let stars = vec![point(2026, 8, 1, 100), point(2026, 8, 8, now_value)];
            let input = ScoreInput {
                as_of: date(2026, 8, 8),
                published: None,
                stars: &stars,
                citations: &[],
                max_stars_in_set: 1000,
            };
            let score = compute(&input).score;
            assert!(score >= previous, "score dropped as growth rose");
            previous = score;
        }
    }

    #[test]
    fn test_clamping() {
        // Explosive growth pushes the raw sum far above 100
        let hot = vec![point(2026, 8, 1, 1), point(2026, 8, 8, 10_000)];
        let input = ScoreInput {
            as_of: date(2026, 8, 8),
            published: Some(date(2026, 8, 1)),
            stars: &hot,
            citations: &[],
            max_stars_in_set: 10_000,
        };
        assert_eq!(compute(&input).score, 100.0);

        // A collapse produces a negative raw sum, clamped to zero
        let cold = vec![point(2026, 8, 1, 1000), point(2026, 8, 8, 0)];
        let input = ScoreInput {
            as_of: date(2026, 8, 8),
            published: None,
            stars: &cold,
            citations: &[],
            max_stars_in_set: 0,
        };
        let breakdown = compute(&input);
        assert_eq!(breakdown.score, 0.0);
        assert!(breakdown.star_growth_7d < 0.0);
        assert_eq!(breakdown.trend, Trend::Declining);
    }

    #[test]
    fn test_recency_boundaries() {
        let as_of = date(2026, 8, 24);
        assert_eq!(recency_bonus(Some(as_of), as_of), 1.0);
        assert_eq!(recency_bonus(Some(as_of - Duration::days(30)), as_of), 1.0);
        assert_eq!(recency_bonus(Some(as_of - Duration::days(45)), as_of), 0.5);
        assert_eq!(recency_bonus(Some(as_of - Duration::days(60)), as_of), 0.0);
        assert_eq!(recency_bonus(Some(as_of - Duration::days(365)), as_of), 0.0);
        assert_eq!(recency_bonus(None, as_of), 0.0);
    }

    #[test]
    fn test_absolute_norm_edges() {
        // Empty comparison set: denominator is log10(1) = 0
        assert_eq!(absolute_norm(50, 0), 0.0);
        assert_eq!(absolute_norm(0, 1000), 0.0);
        assert_eq!(absolute_norm(1000, 1000), 1.0);
        assert!(absolute_norm(10, 1000) < absolute_norm(100, 1000));
    }

    #[test]
    fn test_trend_thresholds() {
        assert_eq!(trend_for(0.11), Trend::Rising);
        assert_eq!(trend_for(0.10), Trend::Stable);
        assert_eq!(trend_for(0.0), Trend::Stable);
        assert_eq!(trend_for(-0.05), Trend::Stable);
        assert_eq!(trend_for(-0.06), Trend::Declining);
    }

    #[test]
    fn test_missing_history_reads_as_zero() {
        let input = ScoreInput {
            as_of: date(2026, 8, 24),
            published: Some(date(2026, 8, 20)),
            stars: &[],
            citations: &[],
            max_stars_in_set: 1000,
        };

        let breakdown = compute(&input);
        assert_eq!(breakdown.star_growth_7d, 0.0);
        assert_eq!(breakdown.citation_growth_30d, 0.0);
        assert_eq!(breakdown.absolute_norm, 0.0);
        // Only the recency bonus contributes
        assert_eq!(breakdown.score, 100.0 * RECENCY_WEIGHT);
    }

    #[test]
    fn test_growth_window_uses_as_of_semantics() {
        // Sample sits inside the window but before its start: the
        // window-start value is the most recent sample at or before it
        let stars = vec![point(2026, 8, 1, 100), point(2026, 8, 20, 300)];
        let growth = growth_rate(&stars, date(2026, 8, 20), STAR_GROWTH_WINDOW_DAYS);
        // then = value as of Aug 13 = 100
        assert_eq!(growth, 2.0);
    }
}
