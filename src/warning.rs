use crate::models::{WaitConfig, WaitWarningLevel};

/// Flags students whose wait since the last session crossed the overdue or
/// late threshold. Each threshold belongs to the tier it starts.
pub fn classify(recency_days: i64, config: &WaitConfig) -> WaitWarningLevel {
    let (overdue_days, late_days) = config.thresholds();
    let days = recency_days as f64;

    if days >= late_days {
        WaitWarningLevel::Late
    } else if days >= overdue_days {
        WaitWarningLevel::Overdue
    } else {
        WaitWarningLevel::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WaitConfig {
        WaitConfig::new(10, 3.0, 4.0).unwrap()
    }

    #[test]
    fn tiers_follow_closed_open_intervals() {
        let config = config();
        assert_eq!(classify(29, &config), WaitWarningLevel::None);
        assert_eq!(classify(30, &config), WaitWarningLevel::Overdue);
        assert_eq!(classify(39, &config), WaitWarningLevel::Overdue);
        assert_eq!(classify(40, &config), WaitWarningLevel::Late);
        assert_eq!(classify(400, &config), WaitWarningLevel::Late);
    }

    #[test]
    fn fresh_and_negative_recency_is_not_flagged() {
        let config = config();
        assert_eq!(classify(0, &config), WaitWarningLevel::None);
        assert_eq!(classify(-5, &config), WaitWarningLevel::None);
    }

    #[test]
    fn fractional_multipliers_round_thresholds_up() {
        // 7 * 2.5 = 17.5 and 7 * 3.5 = 24.5
        let config = WaitConfig::new(7, 2.5, 3.5).unwrap();
        assert_eq!(classify(17, &config), WaitWarningLevel::None);
        assert_eq!(classify(18, &config), WaitWarningLevel::Overdue);
        assert_eq!(classify(24, &config), WaitWarningLevel::Overdue);
        assert_eq!(classify(25, &config), WaitWarningLevel::Late);
    }

    #[test]
    fn default_config_flags_three_and_four_weeks() {
        let config = WaitConfig::default();
        assert_eq!(classify(20, &config), WaitWarningLevel::None);
        assert_eq!(classify(21, &config), WaitWarningLevel::Overdue);
        assert_eq!(classify(28, &config), WaitWarningLevel::Late);
    }
}
