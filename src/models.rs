use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RpsError};

pub const DIFFICULTY_MIN: i64 = 1;
pub const DIFFICULTY_MAX: i64 = 10;
pub const DEFAULT_DIFFICULTY: u8 = 5;
pub const WEIGHT_MIN: i64 = 1;
pub const WEIGHT_MAX: i64 = 100;
pub const DEFAULT_WEIGHT: u8 = 10;
pub const DEFAULT_COURSE_COLOR: &str = "#3b82f6";
pub const DEFAULT_SEMESTER: &str = "Unassigned";

/// The authenticated caller. Every tracker operation is scoped by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: String,
}

impl Session {
    /// Wraps an already-verified user identifier.
    pub fn new(user: impl Into<String>) -> Result<Self> {
        let user = user.into().trim().to_string();
        if user.is_empty() {
            return Err(RpsError::validation("user", "caller identity is required"));
        }
        Ok(Session { user })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn owns(&self, owner: &str) -> bool {
        self.user == owner
    }
}

/// Kind of academic work a task represents.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    Exam,
    Assignment,
    #[serde(rename = "Lab Task")]
    LabTask,
    Presentation,
    Project,
    #[default]
    General,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Exam,
        Category::Assignment,
        Category::LabTask,
        Category::Presentation,
        Category::Project,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Exam => "Exam",
            Category::Assignment => "Assignment",
            Category::LabTask => "Lab Task",
            Category::Presentation => "Presentation",
            Category::Project => "Project",
            Category::General => "General",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RpsError;

    /// Accepts the display names case-insensitively, with `-`/`_` standing in for spaces.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace(['-', '_'], " ");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().to_lowercase() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
                RpsError::validation("category", format!("'{}' is not one of {}", s, names.join(", ")))
            })
    }
}

/// Lifecycle state of a task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Overdue,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = RpsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "overdue" => Ok(TaskStatus::Overdue),
            _ => Err(RpsError::validation(
                "status",
                format!("'{}' is not one of pending, in-progress, completed, overdue", s),
            )),
        }
    }
}

/// A course owned by a single user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Course {
    pub id: u64,
    pub owner: String,
    /// Display name.
    pub title: String,
    /// Unique per owner, compared case-insensitively.
    pub code: String,
    pub color: String,
    pub semester: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A unit of academic work with a deadline.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: u64,
    pub owner: String,
    /// `None` for a general task not tied to any course.
    #[serde(default)]
    pub course: Option<u64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    pub deadline: DateTime<Utc>,
    /// 1..=10
    pub difficulty: u8,
    /// Percentage of the course grade, 1..=100.
    pub weight: u8,
    /// Opaque reference to attached material (URL or path).
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A task counts toward the pain score until it is completed.
    pub fn is_active(&self) -> bool {
        self.status != TaskStatus::Completed
    }

    /// Moves the task to `status`, keeping `completed_at` set exactly while completed.
    pub fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        if status == self.status {
            return;
        }
        self.completed_at = match status {
            TaskStatus::Completed => Some(now),
            _ => None,
        };
        self.status = status;
    }
}

/// A file attached to a course. Only the reference is stored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Material {
    pub id: u64,
    pub owner: String,
    pub course: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub file_ref: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a course.
#[derive(Debug, Clone, Default)]
pub struct CourseDraft {
    pub title: String,
    pub code: String,
    pub color: Option<String>,
    pub semester: Option<String>,
    pub description: Option<String>,
}

/// Fields supplied when creating a task.
///
/// Numeric fields are wider than the stored ones so out-of-range input
/// reaches validation intact.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub deadline: Option<DateTime<Utc>>,
    pub course: Option<u64>,
    pub category: Option<Category>,
    pub difficulty: Option<i64>,
    pub weight: Option<i64>,
    pub description: Option<String>,
    pub materials: Option<String>,
}

/// Partial update of a task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub deadline: Option<DateTime<Utc>>,
    pub difficulty: Option<i64>,
    pub weight: Option<i64>,
    /// `Some(None)` detaches the task from its course.
    pub course: Option<Option<u64>>,
    pub materials: Option<Option<String>>,
    pub status: Option<TaskStatus>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        TaskPatch {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Fields supplied when attaching material to a course.
#[derive(Debug, Clone, Default)]
pub struct MaterialDraft {
    pub title: String,
    pub description: Option<String>,
    pub file_ref: String,
}
