use crate::error::PriorityError;
use crate::models::{PriorityScore, PriorityWeights, ScoreComponents, StudentSnapshot};

/// Turns a snapshot into a comparable booking priority. Stateless apart from
/// its weights, so one calculator can be shared across threads.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreCalculator {
    weights: PriorityWeights,
}

impl ScoreCalculator {
    pub fn new(weights: PriorityWeights) -> Result<Self, PriorityError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &PriorityWeights {
        &self.weights
    }

    pub fn score(&self, snapshot: &StudentSnapshot) -> Result<PriorityScore, PriorityError> {
        snapshot.validate()?;

        let components = ScoreComponents {
            recency: self.weights.recency * snapshot.recency_days as f64,
            slots: -self.weights.slots * snapshot.slot_count as f64,
            activity: -self.weights.activity * snapshot.activity_count as f64,
            completions: -self.weights.completions * snapshot.completions as f64,
        };
        let score =
            components.recency + components.slots + components.activity + components.completions;

        Ok(PriorityScore { score, components })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(
        recency_days: i64,
        slot_count: i64,
        activity_count: i64,
        completions: i64,
    ) -> StudentSnapshot {
        StudentSnapshot {
            student_id: 1,
            name: "Avery Lee".to_string(),
            recency_days,
            slot_count,
            activity_count,
            completions,
        }
    }

    #[test]
    fn components_follow_weights() {
        let calculator = ScoreCalculator::default();
        let priority = calculator.score(&snapshot(20, 2, 4, 3)).unwrap();

        assert!((priority.components.recency - 20.0).abs() < 1e-9);
        assert!((priority.components.slots + 1.0).abs() < 1e-9);
        assert!((priority.components.activity + 1.0).abs() < 1e-9);
        assert!((priority.components.completions + 1.5).abs() < 1e-9);
        assert!((priority.score - 16.5).abs() < 1e-9);
    }

    #[test]
    fn longer_wait_and_fewer_counts_raise_urgency() {
        let calculator = ScoreCalculator::default();
        let base = calculator.score(&snapshot(10, 2, 2, 2)).unwrap().score;

        assert!(calculator.score(&snapshot(15, 2, 2, 2)).unwrap().score > base);
        assert!(calculator.score(&snapshot(10, 0, 2, 2)).unwrap().score > base);
        assert!(calculator.score(&snapshot(10, 2, 0, 2)).unwrap().score > base);
        assert!(calculator.score(&snapshot(10, 2, 2, 0)).unwrap().score > base);
    }

    #[test]
    fn scoring_is_deterministic() {
        let calculator = ScoreCalculator::default();
        let input = snapshot(12, 1, 9, 4);
        let first = calculator.score(&input).unwrap();
        for _ in 0..10 {
            assert_eq!(calculator.score(&input).unwrap(), first);
        }
    }

    #[test]
    fn negative_counts_are_rejected() {
        let calculator = ScoreCalculator::default();
        let err = calculator.score(&snapshot(5, 0, -1, 0)).unwrap_err();
        assert!(matches!(
            err,
            PriorityError::InvalidSnapshot {
                field: "activity_count",
                value: -1,
                ..
            }
        ));
    }

    #[test]
    fn custom_weights_change_the_balance() {
        let recency_only = ScoreCalculator::new(PriorityWeights {
            recency: 2.0,
            slots: 0.0,
            activity: 0.0,
            completions: 0.0,
        })
        .unwrap();
        let priority = recency_only.score(&snapshot(8, 50, 50, 50)).unwrap();
        assert!((priority.score - 16.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let err = ScoreCalculator::new(PriorityWeights {
            completions: f64::NAN,
            ..PriorityWeights::default()
        })
        .unwrap_err();
        assert!(matches!(err, PriorityError::InvalidConfig(_)));
    }
}
