use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{ScoreComponents, WaitConfig, WaitWarningLevel};
use crate::ranking::Ranking;
use crate::warning;

/// One dashboard row: a ranked student with its booking sequence and flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub sequence: usize,
    pub student_id: i64,
    pub name: String,
    pub days_since_last: i64,
    pub score: f64,
    pub components: ScoreComponents,
    pub slots: i64,
    pub activity: i64,
    pub completions: i64,
    pub warning: WaitWarningLevel,
    pub overdue: bool,
    pub late: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRoster {
    pub students: Vec<RosterEntry>,
    pub average_wait: i64,
    pub overdue_days: f64,
    pub late_days: f64,
}

impl BookingRoster {
    pub fn count(&self, level: WaitWarningLevel) -> usize {
        self.students
            .iter()
            .filter(|entry| entry.warning == level)
            .count()
    }
}

pub fn build_roster(ranking: &Ranking, wait: &WaitConfig) -> BookingRoster {
    let students = ranking
        .students
        .iter()
        .enumerate()
        .map(|(index, ranked)| {
            let snapshot = &ranked.snapshot;
            let level = warning::classify(snapshot.recency_days, wait);
            RosterEntry {
                sequence: index + 1,
                student_id: snapshot.student_id,
                name: snapshot.name.clone(),
                days_since_last: snapshot.recency_days,
                score: ranked.priority.score,
                components: ranked.priority.components,
                slots: snapshot.slot_count,
                activity: snapshot.activity_count,
                completions: snapshot.completions,
                warning: level,
                overdue: level == WaitWarningLevel::Overdue,
                late: level == WaitWarningLevel::Late,
            }
        })
        .collect();

    let (overdue_days, late_days) = wait.thresholds();
    BookingRoster {
        students,
        average_wait: ranking.average_wait,
        overdue_days,
        late_days,
    }
}

fn describe(entry: &RosterEntry) -> String {
    let flag = match entry.warning {
        WaitWarningLevel::None => String::new(),
        level => format!(" [{}]", level.label().to_uppercase()),
    };
    format!(
        "{}. {} (#{}) score {:.2}, {} days since last session{} (slots {}, activity {}, completions {})",
        entry.sequence,
        entry.name,
        entry.student_id,
        entry.score,
        entry.days_since_last,
        flag,
        entry.slots,
        entry.activity,
        entry.completions
    )
}

/// Plain listing for the terminal.
pub fn render_text(roster: &BookingRoster, limit: usize) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Students by booking priority:");
    for entry in roster.students.iter().take(limit) {
        let _ = writeln!(output, "{}", describe(entry));
    }
    let _ = writeln!(output, "Average wait: {} days", roster.average_wait);
    output
}

pub fn build_report(
    course_label: &str,
    generated_on: NaiveDate,
    roster: &BookingRoster,
    limit: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Session Booking Priority Report");
    let _ = writeln!(output, "Generated for {} on {}", course_label, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");
    let _ = writeln!(output, "- Active students: {}", roster.students.len());
    let _ = writeln!(output, "- Average wait: {} days", roster.average_wait);
    let _ = writeln!(
        output,
        "- Overdue (>= {:.0} days): {}",
        roster.overdue_days,
        roster.count(WaitWarningLevel::Overdue)
    );
    let _ = writeln!(
        output,
        "- Late (>= {:.0} days): {}",
        roster.late_days,
        roster.count(WaitWarningLevel::Late)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Booking Priority");

    if roster.students.is_empty() {
        let _ = writeln!(output, "No active students.");
    } else {
        for entry in roster.students.iter().take(limit) {
            let _ = writeln!(output, "- {}", describe(entry));
        }
    }

    let mut flagged: Vec<_> = roster
        .students
        .iter()
        .filter(|entry| entry.warning != WaitWarningLevel::None)
        .collect();
    flagged.sort_by(|a, b| b.days_since_last.cmp(&a.days_since_last));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Wait Warnings");

    if flagged.is_empty() {
        let _ = writeln!(output, "No students past the overdue threshold.");
    } else {
        for entry in flagged {
            let _ = writeln!(
                output,
                "- {} ({}): {} days since last session",
                entry.name,
                entry.warning.label(),
                entry.days_since_last
            );
        }
    }

    output
}
