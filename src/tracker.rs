//! Ownership, referential and uniqueness rules for courses, tasks and materials.
//!
//! [`Tracker`] sits between callers and a [`Storage`] backend. Every entry
//! point takes the caller's [`Session`] and only ever sees entities owned by
//! it: an entity owned by someone else is reported exactly like a missing one.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{Result, RpsError};
use crate::models::{
    Course, CourseDraft, Material, MaterialDraft, Session, Task, TaskDraft, TaskPatch, TaskStatus,
    DEFAULT_COURSE_COLOR, DEFAULT_DIFFICULTY, DEFAULT_SEMESTER, DEFAULT_WEIGHT, DIFFICULTY_MAX,
    DIFFICULTY_MIN, WEIGHT_MAX, WEIGHT_MIN,
};
use crate::storage::{Database, Storage};

/// What deleting a course did to the entities that referenced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CourseRemoval {
    /// Tasks whose course reference was cleared.
    pub detached_tasks: usize,
    pub removed_materials: usize,
}

/// Counts of entities removed by [`Tracker::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetSummary {
    pub courses: usize,
    pub tasks: usize,
    pub materials: usize,
}

/// Entry point for every read and write of tracker data.
pub struct Tracker<S> {
    storage: S,
    default_color: String,
    default_semester: String,
}

impl<S: Storage> Tracker<S> {
    pub fn new(storage: S) -> Self {
        Tracker {
            storage,
            default_color: DEFAULT_COURSE_COLOR.into(),
            default_semester: DEFAULT_SEMESTER.into(),
        }
    }

    /// Overrides the color and semester given to courses created without them.
    pub fn with_course_defaults(mut self, color: impl Into<String>, semester: impl Into<String>) -> Self {
        self.default_color = color.into();
        self.default_semester = semester.into();
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ----- courses -----

    pub fn create_course(&self, session: &Session, draft: CourseDraft) -> Result<Course> {
        let title = required_text("title", &draft.title)?;
        let code = required_text("code", &draft.code)?;

        let mut db = self.storage.load()?;
        let taken = db
            .courses
            .iter()
            .any(|c| session.owns(&c.owner) && same_code(&c.code, &code));
        if taken {
            warn!(owner = session.user(), code = %code, "duplicate course code rejected");
            return Err(RpsError::DuplicateCode { code });
        }

        let now = Utc::now();
        let course = Course {
            id: db.allocate_id(),
            owner: session.user().to_string(),
            title,
            code,
            color: optional_text(draft.color).unwrap_or_else(|| self.default_color.clone()),
            semester: optional_text(draft.semester).unwrap_or_else(|| self.default_semester.clone()),
            description: optional_text(draft.description),
            created_at: now,
            updated_at: now,
        };
        db.courses.push(course.clone());
        self.storage.save(&db)?;
        info!(owner = session.user(), course_id = course.id, code = %course.code, "course created");
        Ok(course)
    }

    /// The caller's courses in creation order.
    pub fn list_courses(&self, session: &Session) -> Result<Vec<Course>> {
        let db = self.storage.load()?;
        let mut courses: Vec<Course> = db
            .courses
            .into_iter()
            .filter(|c| session.owns(&c.owner))
            .collect();
        courses.sort_by_key(|c| c.id);
        debug!(owner = session.user(), count = courses.len(), "courses listed");
        Ok(courses)
    }

    pub fn get_course(&self, session: &Session, id: u64) -> Result<Course> {
        let db = self.storage.load()?;
        owned_course(&db, session, id).cloned()
    }

    /// Deletes a course, detaching its tasks and dropping its materials.
    pub fn delete_course(&self, session: &Session, id: u64) -> Result<CourseRemoval> {
        let mut db = self.storage.load()?;
        owned_course(&db, session, id).inspect_err(|e| warn!(owner = session.user(), %e, "course delete rejected"))?;

        db.courses.retain(|c| c.id != id);
        let now = Utc::now();
        let mut removal = CourseRemoval::default();
        for task in db.tasks.iter_mut().filter(|t| t.course == Some(id)) {
            task.course = None;
            task.updated_at = now;
            removal.detached_tasks += 1;
        }
        let before = db.materials.len();
        db.materials.retain(|m| m.course != id);
        removal.removed_materials = before - db.materials.len();

        self.storage.save(&db)?;
        info!(
            owner = session.user(),
            course_id = id,
            detached_tasks = removal.detached_tasks,
            removed_materials = removal.removed_materials,
            "course deleted"
        );
        Ok(removal)
    }

    // ----- tasks -----

    /// Creates a pending task after validating every field.
    pub fn create_task(&self, session: &Session, draft: TaskDraft) -> Result<Task> {
        self.try_create_task(session, draft)
            .inspect_err(|e| warn!(owner = session.user(), %e, "task create rejected"))
    }

    fn try_create_task(&self, session: &Session, draft: TaskDraft) -> Result<Task> {
        let title = required_text("title", &draft.title)?;
        let deadline = draft
            .deadline
            .ok_or_else(|| RpsError::validation("deadline", "a deadline is required"))?;
        let difficulty = match draft.difficulty {
            Some(v) => bounded("difficulty", v, DIFFICULTY_MIN, DIFFICULTY_MAX)?,
            None => DEFAULT_DIFFICULTY,
        };
        let weight = match draft.weight {
            Some(v) => bounded("weight", v, WEIGHT_MIN, WEIGHT_MAX)?,
            None => DEFAULT_WEIGHT,
        };

        let mut db = self.storage.load()?;
        if let Some(course_id) = draft.course {
            owned_course(&db, session, course_id)?;
        }

        let now = Utc::now();
        let task = Task {
            id: db.allocate_id(),
            owner: session.user().to_string(),
            course: draft.course,
            title,
            description: draft.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            category: draft.category.unwrap_or_default(),
            deadline,
            difficulty,
            weight,
            materials: optional_text(draft.materials),
            status: TaskStatus::Pending,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        db.tasks.push(task.clone());
        self.storage.save(&db)?;
        info!(owner = session.user(), task_id = task.id, course_id = ?task.course, "task created");
        Ok(task)
    }

    /// The caller's tasks by ascending deadline.
    pub fn list_tasks(&self, session: &Session) -> Result<Vec<Task>> {
        let db = self.storage.load()?;
        let tasks = sorted_by_deadline(db.tasks.into_iter().filter(|t| session.owns(&t.owner)));
        debug!(owner = session.user(), count = tasks.len(), "tasks listed");
        Ok(tasks)
    }

    /// The caller's tasks that are not completed, by ascending deadline.
    pub fn list_active_tasks(&self, session: &Session) -> Result<Vec<Task>> {
        Ok(self
            .list_tasks(session)?
            .into_iter()
            .filter(Task::is_active)
            .collect())
    }

    /// Tasks attached to one of the caller's courses, by ascending deadline.
    pub fn list_course_tasks(&self, session: &Session, course_id: u64) -> Result<Vec<Task>> {
        let db = self.storage.load()?;
        owned_course(&db, session, course_id)?;
        Ok(sorted_by_deadline(
            db.tasks
                .into_iter()
                .filter(|t| session.owns(&t.owner) && t.course == Some(course_id)),
        ))
    }

    pub fn get_task(&self, session: &Session, id: u64) -> Result<Task> {
        let db = self.storage.load()?;
        let idx = owned_task_index(&db, session, id)?;
        Ok(db.tasks[idx].clone())
    }

    /// Applies a partial update. Nothing is written if any field is invalid.
    pub fn update_task(&self, session: &Session, id: u64, patch: TaskPatch) -> Result<Task> {
        self.try_update_task(session, id, patch)
            .inspect_err(|e| warn!(owner = session.user(), task_id = id, %e, "task update rejected"))
    }

    fn try_update_task(&self, session: &Session, id: u64, patch: TaskPatch) -> Result<Task> {
        let mut db = self.storage.load()?;
        let idx = owned_task_index(&db, session, id)?;

        let title = patch.title.as_deref().map(|t| required_text("title", t)).transpose()?;
        let difficulty = patch
            .difficulty
            .map(|v| bounded("difficulty", v, DIFFICULTY_MIN, DIFFICULTY_MAX))
            .transpose()?;
        let weight = patch
            .weight
            .map(|v| bounded("weight", v, WEIGHT_MIN, WEIGHT_MAX))
            .transpose()?;
        if let Some(Some(course_id)) = patch.course {
            owned_course(&db, session, course_id)?;
        }

        let now = Utc::now();
        let task = &mut db.tasks[idx];
        let previous = task.status;
        if let Some(t) = title {
            task.title = t;
        }
        if let Some(d) = patch.description {
            task.description = d.trim().to_string();
        }
        if let Some(c) = patch.category {
            task.category = c;
        }
        if let Some(d) = patch.deadline {
            task.deadline = d;
        }
        if let Some(d) = difficulty {
            task.difficulty = d;
        }
        if let Some(w) = weight {
            task.weight = w;
        }
        if let Some(c) = patch.course {
            task.course = c;
        }
        if let Some(m) = patch.materials {
            task.materials = optional_text(m);
        }
        match patch.status {
            Some(s) => task.set_status(s, now),
            None if task.status == TaskStatus::Overdue && task.deadline >= now => {
                task.set_status(TaskStatus::Pending, now);
            }
            None => {}
        }
        task.updated_at = now;
        let task = task.clone();

        self.storage.save(&db)?;
        if previous != task.status {
            info!(owner = session.user(), task_id = id, from = %previous, to = %task.status, "task status changed");
        } else {
            info!(owner = session.user(), task_id = id, "task updated");
        }
        Ok(task)
    }

    pub fn delete_task(&self, session: &Session, id: u64) -> Result<()> {
        let mut db = self.storage.load()?;
        let idx = owned_task_index(&db, session, id)
            .inspect_err(|e| warn!(owner = session.user(), %e, "task delete rejected"))?;
        db.tasks.remove(idx);
        self.storage.save(&db)?;
        info!(owner = session.user(), task_id = id, "task deleted");
        Ok(())
    }

    /// Marks the caller's pending and in-progress tasks past their deadline as overdue.
    ///
    /// Returns how many tasks changed. The store is only written when something did.
    pub fn sweep_overdue(&self, session: &Session, now: DateTime<Utc>) -> Result<usize> {
        let mut db = self.storage.load()?;
        let mut changed = 0;
        for task in db.tasks.iter_mut().filter(|t| {
            session.owns(&t.owner)
                && matches!(t.status, TaskStatus::Pending | TaskStatus::InProgress)
                && t.deadline < now
        }) {
            task.set_status(TaskStatus::Overdue, now);
            task.updated_at = now;
            changed += 1;
        }
        if changed > 0 {
            self.storage.save(&db)?;
            info!(owner = session.user(), changed, "tasks marked overdue");
        }
        Ok(changed)
    }

    // ----- materials -----

    pub fn add_material(&self, session: &Session, course_id: u64, draft: MaterialDraft) -> Result<Material> {
        let title = required_text("title", &draft.title)?;
        let file_ref = required_text("file", &draft.file_ref)?;

        let mut db = self.storage.load()?;
        owned_course(&db, session, course_id)
            .inspect_err(|e| warn!(owner = session.user(), %e, "material add rejected"))?;

        let material = Material {
            id: db.allocate_id(),
            owner: session.user().to_string(),
            course: course_id,
            title,
            description: draft.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            file_ref,
            created_at: Utc::now(),
        };
        db.materials.push(material.clone());
        self.storage.save(&db)?;
        info!(owner = session.user(), course_id, material_id = material.id, "material added");
        Ok(material)
    }

    /// Materials of one of the caller's courses, newest first.
    pub fn list_materials(&self, session: &Session, course_id: u64) -> Result<Vec<Material>> {
        let db = self.storage.load()?;
        owned_course(&db, session, course_id)?;
        let mut materials: Vec<Material> = db
            .materials
            .into_iter()
            .filter(|m| m.course == course_id && session.owns(&m.owner))
            .collect();
        materials.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(materials)
    }

    /// Removes a material; it must belong to `course_id` and to the caller.
    pub fn delete_material(&self, session: &Session, course_id: u64, material_id: u64) -> Result<()> {
        let mut db = self.storage.load()?;
        let idx = db
            .materials
            .iter()
            .position(|m| m.id == material_id && m.course == course_id && session.owns(&m.owner))
            .ok_or_else(|| RpsError::not_found("material", material_id))
            .inspect_err(|e| warn!(owner = session.user(), course_id, %e, "material delete rejected"))?;
        db.materials.remove(idx);
        self.storage.save(&db)?;
        info!(owner = session.user(), course_id, material_id, "material deleted");
        Ok(())
    }

    // ----- housekeeping -----

    /// Removes every course, task and material owned by the caller.
    pub fn reset(&self, session: &Session) -> Result<ResetSummary> {
        let mut db = self.storage.load()?;
        let (courses, tasks, materials) = (db.courses.len(), db.tasks.len(), db.materials.len());
        db.courses.retain(|c| !session.owns(&c.owner));
        db.tasks.retain(|t| !session.owns(&t.owner));
        db.materials.retain(|m| !session.owns(&m.owner));
        let summary = ResetSummary {
            courses: courses - db.courses.len(),
            tasks: tasks - db.tasks.len(),
            materials: materials - db.materials.len(),
        };
        self.storage.save(&db)?;
        info!(
            owner = session.user(),
            courses = summary.courses,
            tasks = summary.tasks,
            materials = summary.materials,
            "owner data reset"
        );
        Ok(summary)
    }
}

fn owned_course<'a>(db: &'a Database, session: &Session, id: u64) -> Result<&'a Course> {
    db.courses
        .iter()
        .find(|c| c.id == id && session.owns(&c.owner))
        .ok_or_else(|| RpsError::not_found("course", id))
}

fn owned_task_index(db: &Database, session: &Session, id: u64) -> Result<usize> {
    db.tasks
        .iter()
        .position(|t| t.id == id && session.owns(&t.owner))
        .ok_or_else(|| RpsError::not_found("task", id))
}

fn sorted_by_deadline(tasks: impl Iterator<Item = Task>) -> Vec<Task> {
    let mut tasks: Vec<Task> = tasks.collect();
    tasks.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));
    tasks
}

/// Trimmed value; empty after trimming counts as missing.
fn required_text(field: &'static str, value: &str) -> Result<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(RpsError::validation(field, "must not be empty"));
    }
    Ok(v.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn bounded(field: &'static str, value: i64, min: i64, max: i64) -> Result<u8> {
    if !(min..=max).contains(&value) {
        return Err(RpsError::validation(
            field,
            format!("{} is outside {}..={}", value, min, max),
        ));
    }
    u8::try_from(value).map_err(|_| RpsError::validation(field, format!("{} does not fit", value)))
}

fn same_code(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
