//! The viral-score heuristic. Pure, deterministic, order-sensitive: the
//! CTA penalty applies to the value left after the gate and scope
//! multipliers, not to the raw base sum.

/// The six canonical quality metrics extracted from the LLM verdict,
/// each on a 0-100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityMetrics {
    pub topic: i32,
    pub hook: i32,
    pub pacing: i32,
    pub value_delivery: i32,
    pub shareability: i32,
    pub cta: i32,
}

/// Gate threshold: below this, topic relevance or shareability caps the
/// whole score regardless of the other metrics.
const GATE_THRESHOLD: i32 = 60;
const GATE_MULTIPLIER: f64 = 0.6;

/// Scope multiplier applies only when the LLM is reasonably confident in
/// its reach judgment.
const SCOPE_CONFIDENCE_FLOOR: i32 = 70;

/// A maxed-out call-to-action with weak organic shareability reads as
/// manufactured engagement, not virality.
const CTA_PENALTY_CTA_FLOOR: i32 = 90;
const CTA_PENALTY_SHARE_CEILING: i32 = 70;
const CTA_PENALTY: f64 = 0.85;

/// Compute the 0-100 viral score from the six quality metrics plus the
/// scope judgment.
pub fn viral_score(m: QualityMetrics, scope_confidence: i32, scope: &str) -> f64 {
    let base = 0.25 * f64::from(m.hook)
        + 0.20 * f64::from(m.topic)
        + 0.15 * f64::from(m.pacing)
        + 0.15 * f64::from(m.value_delivery)
        + 0.15 * f64::from(m.shareability)
        + 0.10 * f64::from(m.cta);

    let gate = if m.topic < GATE_THRESHOLD || m.shareability < GATE_THRESHOLD {
        GATE_MULTIPLIER
    } else {
        1.0
    };

    let mut score = base * gate;

    if scope_confidence >= SCOPE_CONFIDENCE_FLOOR {
        score *= match scope {
            "Local" => 0.75,
            "National" => 0.9,
            "Global" => 1.0,
            _ => 1.0,
        };
    }

    if m.cta > CTA_PENALTY_CTA_FLOOR && m.shareability < CTA_PENALTY_SHARE_CEILING {
        score *= CTA_PENALTY;
    }

    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(topic: i32, hook: i32, pacing: i32, value: i32, share: i32, cta: i32) -> QualityMetrics {
        QualityMetrics {
            topic,
            hook,
            pacing,
            value_delivery: value,
            shareability: share,
            cta,
        }
    }

    #[test]
    fn gate_applies_when_topic_is_weak() {
        let score = viral_score(metrics(50, 100, 100, 100, 100, 100), 0, "");
        let expected =
            0.6 * (0.25 * 100.0 + 0.20 * 50.0 + 0.15 * 100.0 + 0.15 * 100.0 + 0.15 * 100.0
                + 0.10 * 100.0);
        assert_eq!(score, expected);
    }

    #[test]
    fn gate_applies_when_shareability_is_weak() {
        let gated = viral_score(metrics(80, 80, 80, 80, 59, 50), 0, "");
        let open = viral_score(metrics(80, 80, 80, 80, 60, 50), 0, "");
        // One point of shareability crosses the gate; the jump dwarfs the
        // 0.15-weight difference.
        assert!(gated < open * 0.7);
    }

    #[test]
    fn cta_penalty_isolated_from_gate() {
        // shareability in [60, 70): the gate stays open, only the CTA
        // penalty fires.
        let score = viral_score(metrics(80, 80, 80, 80, 65, 95), 0, "");
        let expected = (0.25 * 80.0 + 0.20 * 80.0 + 0.15 * 80.0 + 0.15 * 80.0 + 0.15 * 65.0
            + 0.10 * 95.0)
            * 0.85;
        assert_eq!(score, expected);
    }

    #[test]
    fn cta_penalty_stacks_with_gate() {
        let score = viral_score(metrics(80, 80, 80, 80, 50, 95), 0, "");
        let expected = (0.25 * 80.0 + 0.20 * 80.0 + 0.15 * 80.0 + 0.15 * 80.0 + 0.15 * 50.0
            + 0.10 * 95.0)
            * 0.6
            * 0.85;
        assert_eq!(score, expected);
    }

    #[test]
    fn scope_multiplier_requires_confidence() {
        let m = metrics(80, 80, 80, 80, 80, 50);
        let unscoped = viral_score(m, 69, "Local");
        let scoped = viral_score(m, 70, "Local");
        assert_eq!(scoped, unscoped * 0.75);

        assert_eq!(viral_score(m, 90, "National"), unscoped * 0.9);
        assert_eq!(viral_score(m, 90, "Global"), unscoped);
        // Unrecognized scope labels leave the multiplier at 1.0.
        assert_eq!(viral_score(m, 90, "Planetary"), unscoped);
    }

    #[test]
    fn penalty_uses_the_running_score_not_the_base_sum() {
        let m = metrics(80, 80, 80, 80, 65, 95);
        let base = 0.25 * 80.0 + 0.20 * 80.0 + 0.15 * 80.0 + 0.15 * 80.0 + 0.15 * 65.0
            + 0.10 * 95.0;
        let score = viral_score(m, 90, "Local");
        assert_eq!(score, base * 0.75 * 0.85);
    }

    #[test]
    fn increasing_hook_never_decreases_score() {
        let mut last = -1.0f64;
        for hook in (0..=100).step_by(5) {
            let score = viral_score(metrics(80, hook, 70, 70, 75, 50), 90, "National");
            assert!(
                score >= last,
                "score regressed from {last} to {score} at hook={hook}"
            );
            last = score;
        }
    }

    #[test]
    fn score_is_clamped_to_0_100() {
        assert_eq!(viral_score(metrics(0, 0, 0, 0, 0, 0), 0, ""), 0.0);
        let max = viral_score(metrics(100, 100, 100, 100, 100, 100), 100, "Global");
        assert!(max <= 100.0);
        // Out-of-range provider scores must not escape the clamp either.
        let wild = viral_score(metrics(500, 500, 500, 500, 500, 0), 0, "");
        assert_eq!(wild, 100.0);
        let negative = viral_score(metrics(-50, -50, -50, -50, -50, -50), 0, "");
        assert_eq!(negative, 0.0);
    }
}
