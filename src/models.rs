use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PriorityError;

/// Per-student figures gathered for one scoring pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub student_id: i64,
    pub name: String,
    pub recency_days: i64,
    pub slot_count: i64,
    pub activity_count: i64,
    pub completions: i64,
}

impl StudentSnapshot {
    /// Rejects the first negative field found.
    pub fn validate(&self) -> Result<(), PriorityError> {
        let fields = [
            ("recency_days", self.recency_days),
            ("slot_count", self.slot_count),
            ("activity_count", self.activity_count),
            ("completions", self.completions),
        ];

        for (field, value) in fields {
            if value < 0 {
                return Err(PriorityError::InvalidSnapshot {
                    student_id: self.student_id,
                    field,
                    value,
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub recency: f64,
    pub slots: f64,
    pub activity: f64,
    pub completions: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorityScore {
    pub score: f64,
    pub components: ScoreComponents,
}

/// Multipliers applied to each snapshot field. Recency adds urgency, the
/// three counts subtract it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriorityWeights")]
pub struct PriorityWeights {
    pub recency: f64,
    pub slots: f64,
    pub activity: f64,
    pub completions: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            recency: 1.0,
            slots: 0.5,
            activity: 0.25,
            completions: 0.5,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawPriorityWeights {
    recency: f64,
    slots: f64,
    activity: f64,
    completions: f64,
}

impl Default for RawPriorityWeights {
    fn default() -> Self {
        let weights = PriorityWeights::default();
        Self {
            recency: weights.recency,
            slots: weights.slots,
            activity: weights.activity,
            completions: weights.completions,
        }
    }
}

impl TryFrom<RawPriorityWeights> for PriorityWeights {
    type Error = PriorityError;

    fn try_from(raw: RawPriorityWeights) -> Result<Self, Self::Error> {
        let weights = PriorityWeights {
            recency: raw.recency,
            slots: raw.slots,
            activity: raw.activity,
            completions: raw.completions,
        };
        weights.validate()?;
        Ok(weights)
    }
}

impl PriorityWeights {
    pub fn validate(&self) -> Result<(), PriorityError> {
        let weights = [
            ("recency", self.recency),
            ("slots", self.slots),
            ("activity", self.activity),
            ("completions", self.completions),
        ];

        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PriorityError::InvalidConfig(format!(
                    "{name} weight must be a finite non-negative number, got {weight}"
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitWarningLevel {
    None,
    Overdue,
    Late,
}

impl WaitWarningLevel {
    pub fn label(self) -> &'static str {
        match self {
            WaitWarningLevel::None => "none",
            WaitWarningLevel::Overdue => "overdue",
            WaitWarningLevel::Late => "late",
        }
    }
}

impl std::fmt::Display for WaitWarningLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub const DEFAULT_WAIT_DAYS: i64 = 7;
pub const DEFAULT_OVERDUE_MULTIPLIER: f64 = 3.0;
pub const DEFAULT_LATE_MULTIPLIER: f64 = 4.0;

/// Wait thresholds for the overdue and late warnings. Only constructible
/// through [`WaitConfig::new`], so `overdue_multiplier < late_multiplier`
/// always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWaitConfig")]
pub struct WaitConfig {
    base_wait_days: i64,
    overdue_multiplier: f64,
    late_multiplier: f64,
}

impl WaitConfig {
    pub fn new(
        base_wait_days: i64,
        overdue_multiplier: f64,
        late_multiplier: f64,
    ) -> Result<Self, PriorityError> {
        if base_wait_days <= 0 {
            return Err(PriorityError::InvalidConfig(format!(
                "base_wait_days must be positive, got {base_wait_days}"
            )));
        }
        for (name, value) in [
            ("overdue_multiplier", overdue_multiplier),
            ("late_multiplier", late_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PriorityError::InvalidConfig(format!(
                    "{name} must be a finite positive number, got {value}"
                )));
            }
        }
        if overdue_multiplier >= late_multiplier {
            return Err(PriorityError::InvalidConfig(format!(
                "overdue_multiplier ({overdue_multiplier}) must be less than late_multiplier ({late_multiplier})"
            )));
        }

        Ok(Self {
            base_wait_days,
            overdue_multiplier,
            late_multiplier,
        })
    }

    pub fn base_wait_days(&self) -> i64 {
        self.base_wait_days
    }

    pub fn overdue_multiplier(&self) -> f64 {
        self.overdue_multiplier
    }

    pub fn late_multiplier(&self) -> f64 {
        self.late_multiplier
    }

    /// Day counts at which a student becomes overdue and late.
    pub fn thresholds(&self) -> (f64, f64) {
        let base = self.base_wait_days as f64;
        (base * self.overdue_multiplier, base * self.late_multiplier)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            base_wait_days: DEFAULT_WAIT_DAYS,
            overdue_multiplier: DEFAULT_OVERDUE_MULTIPLIER,
            late_multiplier: DEFAULT_LATE_MULTIPLIER,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawWaitConfig {
    base_wait_days: i64,
    overdue_multiplier: f64,
    late_multiplier: f64,
}

impl Default for RawWaitConfig {
    fn default() -> Self {
        Self {
            base_wait_days: DEFAULT_WAIT_DAYS,
            overdue_multiplier: DEFAULT_OVERDUE_MULTIPLIER,
            late_multiplier: DEFAULT_LATE_MULTIPLIER,
        }
    }
}

impl TryFrom<RawWaitConfig> for WaitConfig {
    type Error = PriorityError;

    fn try_from(raw: RawWaitConfig) -> Result<Self, Self::Error> {
        WaitConfig::new(raw.base_wait_days, raw.overdue_multiplier, raw.late_multiplier)
    }
}

/// Enrolment standing. Only `Active` students are ranked for booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    OnHold,
    Suspended,
    Graduated,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::OnHold => "onhold",
            StudentStatus::Suspended => "suspended",
            StudentStatus::Graduated => "graduated",
        }
    }
}

/// A dated training event for one student, as stored in Postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Session,
    Slot,
    Activity,
    Lesson,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Session => "session",
            EventKind::Slot => "slot",
            EventKind::Activity => "activity",
            EventKind::Lesson => "lesson",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StudentEvent {
    pub student_email: String,
    pub kind: EventKind,
    pub occurred_on: NaiveDate,
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(recency_days: i64, slot_count: i64) -> StudentSnapshot {
        StudentSnapshot {
            student_id: 7,
            name: "Dana Cole".to_string(),
            recency_days,
            slot_count,
            activity_count: 0,
            completions: 0,
        }
    }

    #[test]
    fn validate_reports_first_negative_field() {
        let err = snapshot(3, -2).validate().unwrap_err();
        assert_eq!(
            err,
            PriorityError::InvalidSnapshot {
                student_id: 7,
                field: "slot_count",
                value: -2,
            }
        );
        assert!(snapshot(0, 0).validate().is_ok());
    }

    #[test]
    fn wait_config_rejects_bad_values() {
        assert!(WaitConfig::new(0, 3.0, 4.0).is_err());
        assert!(WaitConfig::new(10, 4.0, 4.0).is_err());
        assert!(WaitConfig::new(10, 5.0, 4.0).is_err());
        assert!(WaitConfig::new(10, f64::NAN, 4.0).is_err());
        assert!(WaitConfig::new(10, 3.0, 4.0).is_ok());
    }

    #[test]
    fn wait_config_deserialization_is_validated() {
        let ok: WaitConfig =
            serde_json::from_str(r#"{"base_wait_days": 10, "late_multiplier": 5.0}"#).unwrap();
        assert_eq!(ok.base_wait_days(), 10);
        assert_eq!(ok.overdue_multiplier(), DEFAULT_OVERDUE_MULTIPLIER);
        assert_eq!(ok.late_multiplier(), 5.0);

        let bad = serde_json::from_str::<WaitConfig>(
            r#"{"base_wait_days": 10, "overdue_multiplier": 4.0, "late_multiplier": 3.0}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn weights_must_be_finite_and_non_negative() {
        assert!(PriorityWeights::default().validate().is_ok());
        let negative = PriorityWeights {
            slots: -1.0,
            ..PriorityWeights::default()
        };
        assert!(negative.validate().is_err());
        let infinite = PriorityWeights {
            recency: f64::INFINITY,
            ..PriorityWeights::default()
        };
        assert!(infinite.validate().is_err());
    }

    #[test]
    fn status_labels_match_the_schema() {
        let on_hold: StudentStatus = serde_json::from_str(r#""onhold""#).unwrap();
        assert_eq!(on_hold, StudentStatus::OnHold);
        assert_eq!(on_hold.as_str(), "onhold");
        assert_eq!(StudentStatus::default().as_str(), "active");
    }

    #[test]
    fn weights_deserialization_is_validated() {
        let partial: PriorityWeights = serde_json::from_str(r#"{"slots": 2.0}"#).unwrap();
        assert_eq!(partial.slots, 2.0);
        assert_eq!(partial.recency, 1.0);

        let err = serde_json::from_str::<PriorityWeights>(r#"{"slots": -1.0}"#).unwrap_err();
        assert!(err.to_string().contains("slots weight"));
    }
}
