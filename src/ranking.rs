use serde::Serialize;
use tracing::debug;

use crate::error::PriorityError;
use crate::models::{PriorityScore, StudentSnapshot};
use crate::priority::ScoreCalculator;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStudent {
    pub snapshot: StudentSnapshot,
    pub priority: PriorityScore,
}

/// Students in booking order, most urgent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub students: Vec<RankedStudent>,
    /// Mean recency across the ranked set, rounded up to whole days.
    pub average_wait: i64,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn top(&self, limit: usize) -> &[RankedStudent] {
        &self.students[..limit.min(self.students.len())]
    }
}

/// Scores every snapshot and orders them by descending score. Equal scores
/// keep their input order. Fails on the first invalid snapshot.
pub fn rank(
    calculator: &ScoreCalculator,
    snapshots: &[StudentSnapshot],
) -> Result<Ranking, PriorityError> {
    if snapshots.is_empty() {
        return Err(PriorityError::EmptyInput);
    }

    let mut students = snapshots
        .iter()
        .map(|snapshot| {
            calculator.score(snapshot).map(|priority| RankedStudent {
                snapshot: snapshot.clone(),
                priority,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // sort_by is stable
    students.sort_by(|a, b| b.priority.score.total_cmp(&a.priority.score));

    let average_wait = average_wait(snapshots)?;
    debug!(students = students.len(), average_wait, "ranked students");

    Ok(Ranking {
        students,
        average_wait,
    })
}

/// `ceil(mean(recency_days))` over the set.
pub fn average_wait(snapshots: &[StudentSnapshot]) -> Result<i64, PriorityError> {
    if snapshots.is_empty() {
        return Err(PriorityError::EmptyInput);
    }

    // i128 holds the exact sum of any number of non-negative i64 values
    let mut total: i128 = 0;
    for snapshot in snapshots {
        snapshot.validate()?;
        total += i128::from(snapshot.recency_days);
    }

    let count = snapshots.len() as i128;
    let mean = total / count + i128::from(total % count != 0);
    // a ceiling mean never exceeds the largest value, which fits in i64
    Ok(mean as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(student_id: i64, recency_days: i64, slot_count: i64) -> StudentSnapshot {
        StudentSnapshot {
            student_id,
            name: format!("Student {student_id}"),
            recency_days,
            slot_count,
            activity_count: 0,
            completions: 0,
        }
    }

    fn ids(ranking: &Ranking) -> Vec<i64> {
        ranking
            .students
            .iter()
            .map(|entry| entry.snapshot.student_id)
            .collect()
    }

    #[test]
    fn orders_by_descending_score() {
        let calculator = ScoreCalculator::default();
        let snapshots = vec![student(1, 5, 0), student(2, 30, 0), student(3, 12, 0)];

        let ranking = rank(&calculator, &snapshots).unwrap();
        assert_eq!(ids(&ranking), vec![2, 3, 1]);
        assert_eq!(ranking.len(), 3);
    }

    #[test]
    fn ties_keep_input_order() {
        let calculator = ScoreCalculator::default();
        // 10 days with 0 slots and 11 days with 2 slots both score 10.0
        let snapshots = vec![
            student(4, 11, 2),
            student(1, 10, 0),
            student(9, 30, 0),
            student(2, 10, 0),
        ];

        let ranking = rank(&calculator, &snapshots).unwrap();
        assert_eq!(ids(&ranking), vec![9, 4, 1, 2]);
    }

    #[test]
    fn output_is_a_permutation_of_input() {
        let calculator = ScoreCalculator::default();
        let snapshots: Vec<_> = (0..25).map(|i| student(i, (i * 7) % 11, i % 3)).collect();

        let ranking = rank(&calculator, &snapshots).unwrap();
        let mut ranked: Vec<_> = ranking.students.iter().map(|s| s.snapshot.clone()).collect();
        let mut input = snapshots.clone();
        ranked.sort_by_key(|s| s.student_id);
        input.sort_by_key(|s| s.student_id);
        assert_eq!(ranked, input);
    }

    #[test]
    fn average_wait_rounds_up() {
        let calculator = ScoreCalculator::default();
        let ranking = rank(
            &calculator,
            &[student(1, 10, 0), student(2, 20, 0), student(3, 15, 0)],
        )
        .unwrap();
        assert_eq!(ranking.average_wait, 15);

        assert_eq!(average_wait(&[student(1, 1, 0), student(2, 2, 0)]).unwrap(), 2);
        assert_eq!(average_wait(&[student(1, 0, 0)]).unwrap(), 0);
    }

    #[test]
    fn average_wait_is_exact_for_large_values() {
        assert_eq!(
            average_wait(&[student(1, i64::MAX, 0), student(2, i64::MAX, 0)]).unwrap(),
            i64::MAX
        );
        assert_eq!(
            average_wait(&[student(1, i64::MAX, 0), student(2, i64::MAX - 1, 0)]).unwrap(),
            i64::MAX
        );
    }

    #[test]
    fn empty_input_is_an_error() {
        let calculator = ScoreCalculator::default();
        assert_eq!(rank(&calculator, &[]), Err(PriorityError::EmptyInput));
        assert_eq!(average_wait(&[]), Err(PriorityError::EmptyInput));
    }

    #[test]
    fn invalid_snapshot_fails_the_whole_ranking() {
        let calculator = ScoreCalculator::default();
        let err = rank(&calculator, &[student(1, 4, 0), student(2, -3, 0)]).unwrap_err();
        assert!(matches!(
            err,
            PriorityError::InvalidSnapshot { student_id: 2, .. }
        ));
    }

    #[test]
    fn top_is_clamped_to_length() {
        let calculator = ScoreCalculator::default();
        let ranking = rank(&calculator, &[student(1, 4, 0), student(2, 8, 0)]).unwrap();
        assert_eq!(ranking.top(1).len(), 1);
        assert_eq!(ranking.top(1)[0].snapshot.student_id, 2);
        assert_eq!(ranking.top(10).len(), 2);
    }
}
