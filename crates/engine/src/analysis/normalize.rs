use polisense_common::types::{ClassificationResult, Leaning, NormalizedBiasScore};

/// Default |score| a document must exceed to lean Left or Right.
pub const DEFAULT_DIRECTION_THRESHOLD: f64 = 10.0;

/// Turn raw classifier output into the human-facing score.
///
/// Total and deterministic. `label` comes from the predicted class id, `direction`
/// from the score, and the two are kept independent even when they disagree.
pub fn normalize(result: &ClassificationResult, direction_threshold: f64) -> NormalizedBiasScore {
    let p_left = result.probability(Leaning::Left);
    let p_center = result.probability(Leaning::Center);
    let p_right = result.probability(Leaning::Right);

    let score = (p_right - p_left) * 100.0;
    let label = Leaning::from_class_id(result.predicted_class_id);
    let direction = direction_for_score(score, direction_threshold);
    let confidence = p_left.max(p_center).max(p_right);

    if label != direction {
        tracing::debug!(
            label = %label,
            direction = %direction,
            score,
            "Class label and score direction disagree"
        );
    }

    NormalizedBiasScore {
        score,
        label,
        direction,
        confidence,
        confidence_reasoning: format!(
            "The model is {:.1}% confident in this classification.",
            confidence * 100.0
        ),
    }
}

/// Strict thresholds: exactly ±threshold is still Center.
pub fn direction_for_score(score: f64, threshold: f64) -> Leaning {
    if score < -threshold {
        Leaning::Left
    } else if score > threshold {
        Leaning::Right
    } else {
        Leaning::Center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification(class_id: i64, probabilities: &[f64]) -> ClassificationResult {
        ClassificationResult {
            predicted_class_id: class_id,
            probabilities: probabilities.to_vec(),
            evidence: Vec::new(),
        }
    }

    #[test]
    fn test_left_leaning_article() {
        let score = normalize(&classification(0, &[0.7, 0.2, 0.1]), DEFAULT_DIRECTION_THRESHOLD);

        assert_eq!(score.score, (0.1 - 0.7) * 100.0);
        assert_eq!(score.score, -60.0);
        assert_eq!(score.label, Leaning::Left);
        assert_eq!(score.direction, Leaning::Left);
        assert_eq!(score.confidence, 0.7);
        assert_eq!(
            score.confidence_reasoning,
            "The model is 70.0% confident in this classification."
        );
    }

    #[test]
    fn test_balanced_article() {
        let score = normalize(&classification(1, &[0.3, 0.4, 0.3]), DEFAULT_DIRECTION_THRESHOLD);

        assert_eq!(score.score, 0.0);
        assert_eq!(score.label, Leaning::Center);
        assert_eq!(score.direction, Leaning::Center);
        assert_eq!(score.confidence, 0.4);
    }

    #[test]
    fn test_score_and_confidence_follow_probabilities() {
        let triples = [
            [0.2, 0.5, 0.3],
            [0.05, 0.15, 0.8],
            [0.6, 0.3, 0.1],
            [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0],
            [0.0, 0.0, 1.0],
        ];

        for [pl, pc, pr] in triples {
            let score = normalize(&classification(1, &[pl, pc, pr]), DEFAULT_DIRECTION_THRESHOLD);
            assert_eq!(score.score, (pr - pl) * 100.0);
            assert_eq!(score.confidence, pl.max(pc).max(pr));
        }
    }

    #[test]
    fn test_direction_boundaries_are_strict() {
        assert_eq!(direction_for_score(-10.0, 10.0), Leaning::Center);
        assert_eq!(direction_for_score(10.0, 10.0), Leaning::Center);
        assert_eq!(direction_for_score(-10.0001, 10.0), Leaning::Left);
        assert_eq!(direction_for_score(10.0001, 10.0), Leaning::Right);
        assert_eq!(direction_for_score(0.0, 10.0), Leaning::Center);
    }

    #[test]
    fn test_label_ignores_score_magnitude() {
        // Class says Right but probabilities lean hard Left.
        let score = normalize(&classification(2, &[0.9, 0.05, 0.05]), DEFAULT_DIRECTION_THRESHOLD);
        assert_eq!(score.label, Leaning::Right);
        assert_eq!(score.direction, Leaning::Left);

        // Class says Center while the score crosses the Right threshold.
        let score = normalize(&classification(1, &[0.2, 0.45, 0.35]), DEFAULT_DIRECTION_THRESHOLD);
        assert_eq!(score.label, Leaning::Center);
        assert_eq!(score.direction, Leaning::Right);
    }

    #[test]
    fn test_missing_probabilities_are_zero() {
        let score = normalize(&classification(0, &[]), DEFAULT_DIRECTION_THRESHOLD);
        assert_eq!(score.score, 0.0);
        assert_eq!(score.confidence, 0.0);
        assert_eq!(score.direction, Leaning::Center);

        let score = normalize(&classification(0, &[0.4]), DEFAULT_DIRECTION_THRESHOLD);
        assert_eq!(score.score, -40.0);
        assert_eq!(score.direction, Leaning::Left);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = classification(2, &[0.12, 0.33, 0.55]);
        assert_eq!(
            normalize(&input, DEFAULT_DIRECTION_THRESHOLD),
            normalize(&input, DEFAULT_DIRECTION_THRESHOLD)
        );
    }

    #[test]
    fn test_custom_threshold() {
        let input = classification(1, &[0.3, 0.4, 0.3 + 0.05]);
        assert_eq!(normalize(&input, 10.0).direction, Leaning::Center);
        assert_eq!(normalize(&input, 1.0).direction, Leaning::Right);
    }
}
