use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::models::{Course, Task};
use crate::pain::{self, Contribution, PainReport};

/// An active task together with the score detail that ranks it.
#[derive(Debug, Clone, Serialize)]
pub struct RankedTask {
    pub task: Task,
    pub course_code: Option<String>,
    pub contribution: Contribution,
}

/// Active tasks due on one calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineDay {
    pub date: NaiveDate,
    pub tasks: Vec<Task>,
}

/// Everything the dashboard shows, computed in one pass.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub report: PainReport,
    /// Score capped at `display_cap`; `report.score` stays untouched.
    pub display_score: u64,
    pub display_cap: u64,
    /// Active tasks by descending time pressure.
    pub ranked: Vec<RankedTask>,
    /// Days in the upcoming window that have something due, in date order.
    pub upcoming: Vec<TimelineDay>,
    pub timeline_days: u32,
}

impl Dashboard {
    /// Builds the dashboard for `tasks` as seen at `now`.
    ///
    /// Calendar days are local. The upcoming window starts today and spans
    /// `config.timeline_days` days; tasks already past their day are left out
    /// of it but still count toward the score.
    pub fn build(tasks: &[Task], courses: &[Course], now: DateTime<Utc>, config: &Config) -> Self {
        let report = pain::pain_score(tasks, now);

        let mut ranked: Vec<RankedTask> = report
            .contributions
            .iter()
            .cloned()
            .filter_map(|c| {
                let task = tasks.iter().find(|t| t.id == c.task_id)?;
                let course_code = task
                    .course
                    .and_then(|id| courses.iter().find(|course| course.id == id))
                    .map(|course| course.code.clone());
                Some(RankedTask {
                    task: task.clone(),
                    course_code,
                    contribution: c,
                })
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.contribution
                .time_pressure
                .total_cmp(&a.contribution.time_pressure)
                .then(a.task.deadline.cmp(&b.task.deadline))
                .then(a.task.id.cmp(&b.task.id))
        });

        let today = now.with_timezone(&Local).date_naive();
        let span = Duration::days(i64::from(config.timeline_days.max(1)) - 1);
        let last = today.checked_add_signed(span).unwrap_or(NaiveDate::MAX);
        let mut days: BTreeMap<NaiveDate, Vec<Task>> = BTreeMap::new();
        for task in tasks.iter().filter(|t| t.is_active()) {
            let due = task.deadline.with_timezone(&Local).date_naive();
            if due >= today && due <= last {
                days.entry(due).or_default().push(task.clone());
            }
        }
        let upcoming = days
            .into_iter()
            .map(|(date, mut tasks)| {
                tasks.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));
                TimelineDay { date, tasks }
            })
            .collect();

        Dashboard {
            display_score: report.display_score(config.display_cap),
            display_cap: config.display_cap,
            report,
            ranked,
            upcoming,
            timeline_days: config.timeline_days,
        }
    }

    /// Fraction of the display cap reached, in `0.0..=1.0`.
    pub fn fill_ratio(&self) -> f64 {
        self.display_score as f64 / self.display_cap as f64
    }
}
