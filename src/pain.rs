use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Task;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Tasks due within this many days also add a procrastination penalty.
pub const PROCRASTINATION_WINDOW_DAYS: i64 = 3;

/// How much a single active task adds to the pain score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub task_id: u64,
    pub days_remaining: i64,
    /// `(weight * difficulty) / days_remaining`, used to rank tasks.
    pub time_pressure: f64,
    /// Extra penalty for tasks due within the procrastination window.
    pub procrastination: f64,
}

impl Contribution {
    pub fn total(&self) -> f64 {
        self.time_pressure + self.procrastination
    }
}

/// Pain score of a set of tasks, with the per-task detail behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PainReport {
    /// Rounded aggregate. Unbounded; clamp only for display.
    pub score: u64,
    /// Aggregate before rounding.
    pub raw: f64,
    pub active_tasks: usize,
    pub average_difficulty: f64,
    /// One entry per active task, in input order.
    pub contributions: Vec<Contribution>,
}

impl PainReport {
    fn empty() -> Self {
        PainReport {
            score: 0,
            raw: 0.0,
            active_tasks: 0,
            average_difficulty: 0.0,
            contributions: Vec::new(),
        }
    }

    /// Score capped at `cap` for progress bars and gauges.
    pub fn display_score(&self, cap: u64) -> u64 {
        self.score.min(cap)
    }

    pub fn contribution(&self, task_id: u64) -> Option<&Contribution> {
        self.contributions.iter().find(|c| c.task_id == task_id)
    }
}

/// Whole days until `deadline`, rounded up and never below 1.
///
/// Past deadlines and deadlines later today both count as one day.
pub fn days_remaining(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (deadline - now).num_milliseconds();
    if millis <= 0 {
        return 1;
    }
    ((millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY).max(1)
}

/// Time pressure of a single task, or `None` once it is completed.
pub fn time_pressure(task: &Task, now: DateTime<Utc>) -> Option<f64> {
    if !task.is_active() {
        return None;
    }
    let days = days_remaining(task.deadline, now) as f64;
    Some(f64::from(task.weight) * f64::from(task.difficulty) / days)
}

fn contribution(task: &Task, now: DateTime<Utc>) -> Contribution {
    let days = days_remaining(task.deadline, now);
    let difficulty = f64::from(task.difficulty);
    let time_pressure = f64::from(task.weight) * difficulty / days as f64;
    let procrastination = if days <= PROCRASTINATION_WINDOW_DAYS {
        (10.0 / days as f64) * (difficulty / 5.0)
    } else {
        0.0
    };
    Contribution {
        task_id: task.id,
        days_remaining: days,
        time_pressure,
        procrastination,
    }
}

/// Computes the pain score of `tasks` as seen at `now`.
///
/// Completed tasks are ignored. The score is
/// `n * avg(difficulty) + sum(time_pressure) + sum(procrastination)`
/// over the active tasks, rounded to the nearest integer.
pub fn pain_score(tasks: &[Task], now: DateTime<Utc>) -> PainReport {
    let active: Vec<&Task> = tasks.iter().filter(|t| t.is_active()).collect();
    if active.is_empty() {
        tracing::debug!(active = 0, score = 0, "pain score computed");
        return PainReport::empty();
    }

    let n = active.len() as f64;
    let average_difficulty = active.iter().map(|t| f64::from(t.difficulty)).sum::<f64>() / n;
    let base = n * average_difficulty;

    let contributions: Vec<Contribution> = active.iter().map(|t| contribution(t, now)).collect();
    let raw = base + contributions.iter().map(Contribution::total).sum::<f64>();
    let score = if raw.is_finite() { raw.round().max(0.0) as u64 } else { 0 };

    tracing::debug!(active = active.len(), score, "pain score computed");
    PainReport {
        score,
        raw,
        active_tasks: active.len(),
        average_difficulty,
        contributions,
    }
}

/// Computes the pain score against the current clock.
pub fn compute_pain_score(tasks: &[Task]) -> PainReport {
    pain_score(tasks, Utc::now())
}

/// Orders contributions by descending time pressure, earliest deadline first on ties.
pub fn rank(report: &PainReport) -> Vec<Contribution> {
    let mut ranked = report.contributions.clone();
    ranked.sort_by(|a, b| {
        b.time_pressure
            .total_cmp(&a.time_pressure)
            .then(a.days_remaining.cmp(&b.days_remaining))
            .then(a.task_id.cmp(&b.task_id))
    });
    ranked
}
