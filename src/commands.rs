use std::io::{self, BufRead, Write};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::error::{Result, RpsError};
use crate::models::{Category, Course, CourseDraft, MaterialDraft, Session, Task, TaskDraft, TaskPatch, TaskStatus};
use crate::pain::{self, compute_pain_score};
use crate::storage::JsonStorage;
use crate::tracker::Tracker;

/// Width of the dashboard's score bar, in characters.
const BAR_WIDTH: usize = 40;

/// What every command needs: the store, the caller and the settings.
pub struct App {
    pub tracker: Tracker<JsonStorage>,
    pub session: Session,
    pub config: Config,
}

impl App {
    /// Opens the JSON store under `config.data_dir` for `user`.
    pub fn open(config: Config, user: &str) -> Result<Self> {
        let session = Session::new(user)?;
        let tracker = Tracker::new(JsonStorage::in_dir(&config.data_dir))
            .with_course_defaults(config.default_color.clone(), config.default_semester.clone());
        Ok(App { tracker, session, config })
    }
}

/// Parses a deadline given as RFC 3339, `YYYY-MM-DD HH:MM` or `YYYY-MM-DD`.
///
/// The last two are local time; a bare date means the end of that day (23:59).
pub fn parse_deadline(input: &str) -> Result<DateTime<Utc>> {
    let s = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(&format!("{} 23:59", s), "%Y-%m-%d %H:%M"));
    let naive = naive.map_err(|e| {
        RpsError::validation(
            "deadline",
            format!("'{}': {}. Use YYYY-MM-DD, 'YYYY-MM-DD HH:MM' or RFC 3339", input, e),
        )
    })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| RpsError::validation("deadline", format!("'{}' does not exist in the local time zone", input)))
}

/// Human description of the time until `deadline`, by local calendar day.
fn time_left(deadline: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let today = now.with_timezone(&Local).date_naive();
    let due = deadline.with_timezone(&Local).date_naive();
    let days_left = (due - today).num_days();
    if days_left < 0 {
        format!("{}d overdue", days_left.abs())
    } else if days_left == 0 {
        "Today".to_string()
    } else {
        format!("{}d", days_left)
    }
}

fn local(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Completed => Color::Green,
        TaskStatus::InProgress => Color::Cyan,
        TaskStatus::Overdue => Color::Red,
        TaskStatus::Pending => Color::Yellow,
    }
}

fn pressure_color(pressure: f64) -> Color {
    if pressure > 50.0 {
        Color::Red
    } else if pressure > 20.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

fn course_code(courses: &[Course], id: Option<u64>) -> String {
    id.and_then(|id| courses.iter().find(|c| c.id == id))
        .map(|c| c.code.clone())
        .unwrap_or_else(|| "-".into())
}

// ----- courses -----

pub fn cmd_course_add(app: &App, draft: CourseDraft) -> Result<Course> {
    let course = app.tracker.create_course(&app.session, draft)?;
    println!("Course {} added (id = {})", course.code, course.id);
    Ok(course)
}

pub fn cmd_course_list(app: &App) -> Result<()> {
    let courses = app.tracker.list_courses(&app.session)?;
    if courses.is_empty() {
        println!("No courses found.");
        return Ok(());
    }
    let tasks = app.tracker.list_active_tasks(&app.session)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Code", "Title", "Semester", "Color", "Active Tasks"]));
    for c in courses {
        let active = tasks.iter().filter(|t| t.course == Some(c.id)).count();
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.code).add_attribute(Attribute::Bold),
            Cell::new(&c.title),
            Cell::new(&c.semester),
            Cell::new(&c.color),
            Cell::new(active),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_course_show(app: &App, id: u64) -> Result<()> {
    let course = app.tracker.get_course(&app.session, id)?;
    app.tracker.sweep_overdue(&app.session, Utc::now())?;
    let tasks = app.tracker.list_course_tasks(&app.session, id)?;
    let materials = app.tracker.list_materials(&app.session, id)?;

    println!("{} - {}", course.code, course.title);
    println!("Semester: {}   Color: {}", course.semester, course.color);
    if let Some(d) = &course.description {
        println!("{}", d);
    }

    let report = compute_pain_score(&tasks);
    println!("Pain from this course: {}", report.score);

    if !tasks.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header(&["ID", "Title", "Category", "Due", "Status"]));
        for t in &tasks {
            table.add_row(vec![
                Cell::new(t.id),
                Cell::new(&t.title),
                Cell::new(t.category),
                Cell::new(local(t.deadline)),
                Cell::new(t.status).fg(status_color(t.status)),
            ]);
        }
        println!("{table}");
    }

    if !materials.is_empty() {
        println!("Materials:");
        for m in materials {
            println!("  [{}] {} -> {}", m.id, m.title, m.file_ref);
        }
    }
    Ok(())
}

pub fn cmd_course_remove(app: &App, id: u64) -> Result<()> {
    let removal = app.tracker.delete_course(&app.session, id)?;
    println!(
        "Course {} removed ({} task(s) detached, {} material(s) deleted).",
        id, removal.detached_tasks, removal.removed_materials
    );
    Ok(())
}

// ----- tasks -----

/// Raw `task add` input, parsed here so bad values surface as validation errors.
#[derive(Debug, Clone, Default)]
pub struct AddTask {
    pub title: String,
    pub due: String,
    pub course: Option<u64>,
    pub category: Option<String>,
    pub difficulty: Option<i64>,
    pub weight: Option<i64>,
    pub description: Option<String>,
    pub materials: Option<String>,
}

/// Raw `task edit` input. Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct EditTask {
    pub title: Option<String>,
    pub due: Option<String>,
    pub course: Option<u64>,
    pub no_course: bool,
    pub category: Option<String>,
    pub difficulty: Option<i64>,
    pub weight: Option<i64>,
    pub description: Option<String>,
    pub materials: Option<String>,
    pub status: Option<String>,
}

pub fn cmd_task_add(app: &App, input: AddTask) -> Result<Task> {
    let draft = TaskDraft {
        title: input.title,
        deadline: Some(parse_deadline(&input.due)?),
        course: input.course,
        category: input.category.as_deref().map(str::parse::<Category>).transpose()?,
        difficulty: input.difficulty,
        weight: input.weight,
        description: input.description,
        materials: input.materials,
    };
    let task = app.tracker.create_task(&app.session, draft)?;
    println!("Task added (id = {})", task.id);
    Ok(task)
}

/// Lists tasks by ascending deadline. Completed ones only with `all`.
pub fn cmd_task_list(app: &App, all: bool, course: Option<u64>) -> Result<()> {
    let now = Utc::now();
    app.tracker.sweep_overdue(&app.session, now)?;
    let mut tasks = match course {
        Some(id) => app.tracker.list_course_tasks(&app.session, id)?,
        None => app.tracker.list_tasks(&app.session)?,
    };
    if !all {
        tasks.retain(Task::is_active);
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    let courses = app.tracker.list_courses(&app.session)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&[
            "ID", "Title", "Course", "Category", "Due", "Time Left", "Diff", "Weight", "Pressure", "Status",
        ]));

    for t in tasks {
        let pressure = pain::time_pressure(&t, now);
        let pressure_cell = match pressure {
            Some(p) => Cell::new(format!("{:.1}", p)).fg(pressure_color(p)),
            None => Cell::new("-").fg(Color::Grey),
        };
        let overdue = t.is_active() && t.deadline < now;
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(course_code(&courses, t.course)),
            Cell::new(t.category),
            Cell::new(local(t.deadline)),
            Cell::new(time_left(t.deadline, now)).fg(if overdue { Color::Red } else { Color::Reset }),
            Cell::new(format!("{}/10", t.difficulty)),
            Cell::new(format!("{}%", t.weight)),
            pressure_cell,
            Cell::new(t.status).fg(status_color(t.status)),
        ]);
    }

    println!("{table}");
    Ok(())
}

pub fn cmd_task_show(app: &App, id: u64) -> Result<()> {
    let t = app.tracker.get_task(&app.session, id)?;
    let courses = app.tracker.list_courses(&app.session)?;
    let now = Utc::now();

    println!("[{}] {}", t.id, t.title);
    println!("Course:     {}", course_code(&courses, t.course));
    println!("Category:   {}", t.category);
    println!("Due:        {} ({})", local(t.deadline), time_left(t.deadline, now));
    println!("Difficulty: {}/10", t.difficulty);
    println!("Weight:     {}%", t.weight);
    println!("Status:     {}", t.status);
    if let Some(at) = t.completed_at {
        println!("Completed:  {}", local(at));
    }
    if let Some(p) = pain::time_pressure(&t, now) {
        println!("Pressure:   {:.1}", p);
    }
    if let Some(m) = &t.materials {
        println!("Materials:  {}", m);
    }
    if !t.description.is_empty() {
        println!();
        println!("{}", t.description);
    }
    Ok(())
}

pub fn cmd_task_edit(app: &App, id: u64, input: EditTask) -> Result<Task> {
    if input.no_course && input.course.is_some() {
        return Err(RpsError::validation("course", "use either --course or --no-course"));
    }
    let course = if input.no_course {
        Some(None)
    } else {
        input.course.map(Some)
    };
    let patch = TaskPatch {
        title: input.title,
        description: input.description,
        category: input.category.as_deref().map(str::parse::<Category>).transpose()?,
        deadline: input.due.as_deref().map(parse_deadline).transpose()?,
        difficulty: input.difficulty,
        weight: input.weight,
        course,
        materials: input.materials.map(Some),
        status: input.status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
    };
    let task = app.tracker.update_task(&app.session, id, patch)?;
    println!("Task {} updated.", id);
    Ok(task)
}

pub fn cmd_task_status(app: &App, id: u64, status: &str) -> Result<Task> {
    let status: TaskStatus = status.parse()?;
    let task = app.tracker.update_task(&app.session, id, TaskPatch::status(status))?;
    println!("Task {} is now {}.", id, task.status);
    Ok(task)
}

/// Marks a task as completed.
pub fn cmd_complete(app: &App, id: u64) -> Result<Task> {
    let task = app
        .tracker
        .update_task(&app.session, id, TaskPatch::status(TaskStatus::Completed))?;
    println!("Task {} marked as complete.", id);
    Ok(task)
}

/// Moves a completed task back to pending.
pub fn cmd_reopen(app: &App, id: u64) -> Result<Task> {
    let task = app
        .tracker
        .update_task(&app.session, id, TaskPatch::status(TaskStatus::Pending))?;
    println!("Task {} reopened.", id);
    Ok(task)
}

pub fn cmd_task_remove(app: &App, id: u64) -> Result<()> {
    app.tracker.delete_task(&app.session, id)?;
    println!("Task {} removed.", id);
    Ok(())
}

// ----- materials -----

pub fn cmd_material_add(app: &App, course: u64, draft: MaterialDraft) -> Result<()> {
    let material = app.tracker.add_material(&app.session, course, draft)?;
    println!("Material added (id = {})", material.id);
    Ok(())
}

pub fn cmd_material_list(app: &App, course: u64) -> Result<()> {
    let materials = app.tracker.list_materials(&app.session, course)?;
    if materials.is_empty() {
        println!("No materials found.");
        return Ok(());
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Title", "File", "Added"]));
    for m in materials {
        table.add_row(vec![
            Cell::new(m.id),
            Cell::new(&m.title),
            Cell::new(&m.file_ref),
            Cell::new(local(m.created_at)),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn cmd_material_remove(app: &App, course: u64, id: u64) -> Result<()> {
    app.tracker.delete_material(&app.session, course, id)?;
    println!("Material {} removed.", id);
    Ok(())
}

// ----- score and dashboard -----

/// Prints the pain score and each active task's share of it.
pub fn cmd_score(app: &App) -> Result<u64> {
    let now = Utc::now();
    app.tracker.sweep_overdue(&app.session, now)?;
    let tasks = app.tracker.list_active_tasks(&app.session)?;
    let report = pain::pain_score(&tasks, now);

    println!("Pain Score: {}", report.score);
    if report.active_tasks == 0 {
        println!("No active tasks.");
        return Ok(report.score);
    }
    println!(
        "{} active task(s), average difficulty {:.1}",
        report.active_tasks, report.average_difficulty
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Title", "Days", "Pressure", "Procrastination"]));
    for c in pain::rank(&report) {
        let title = tasks
            .iter()
            .find(|t| t.id == c.task_id)
            .map(|t| t.title.as_str())
            .unwrap_or("-");
        table.add_row(vec![
            Cell::new(c.task_id),
            Cell::new(title),
            Cell::new(c.days_remaining),
            Cell::new(format!("{:.1}", c.time_pressure)).fg(pressure_color(c.time_pressure)),
            Cell::new(format!("{:.1}", c.procrastination)),
        ]);
    }
    println!("{table}");
    Ok(report.score)
}

fn score_bar(dashboard: &Dashboard) -> String {
    let filled = (dashboard.fill_ratio() * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

pub fn cmd_dashboard(app: &App) -> Result<()> {
    let now = Utc::now();
    app.tracker.sweep_overdue(&app.session, now)?;
    let tasks = app.tracker.list_active_tasks(&app.session)?;
    let courses = app.tracker.list_courses(&app.session)?;
    let dash = Dashboard::build(&tasks, &courses, now, &app.config);

    let color = match dash.display_score {
        s if s >= 70 => Color::Red,
        s if s >= 40 => Color::Yellow,
        _ => Color::Green,
    };
    let mut hero = Table::new();
    hero.load_preset(UTF8_FULL).set_header(vec![
        Cell::new("Pain Score").add_attribute(Attribute::Bold),
        Cell::new(dash.report.score).add_attribute(Attribute::Bold).fg(color),
    ]);
    hero.add_row(vec![Cell::new(score_bar(&dash)).fg(color), Cell::new(format!("/{}", dash.display_cap))]);
    println!("{hero}");
    println!("{} active task(s) across your courses", dash.report.active_tasks);

    if !dash.ranked.is_empty() {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header(&["ID", "Title", "Course", "Due", "Pressure"]));
        for r in &dash.ranked {
            table.add_row(vec![
                Cell::new(r.task.id),
                Cell::new(&r.task.title),
                Cell::new(r.course_code.as_deref().unwrap_or("-")),
                Cell::new(time_left(r.task.deadline, now)),
                Cell::new(format!("{:.1}", r.contribution.time_pressure))
                    .fg(pressure_color(r.contribution.time_pressure)),
            ]);
        }
        println!("{table}");
    }

    println!("Timeline (next {} days):", dash.timeline_days);
    if dash.upcoming.is_empty() {
        println!("  nothing due");
    }
    for day in &dash.upcoming {
        let titles: Vec<String> = day
            .tasks
            .iter()
            .map(|t| format!("{} [{}]", t.title, course_code(&courses, t.course)))
            .collect();
        println!("  {}  {}", day.date.format("%a %d %b"), titles.join(", "));
    }
    Ok(())
}

// ----- housekeeping -----

/// Deletes all of the caller's data, asking first unless `force`.
pub fn cmd_reset(app: &App, force: bool) -> Result<()> {
    if !force {
        print!(
            "Delete all courses, tasks and materials of '{}'? This cannot be undone. [y/N] ",
            app.session.user()
        );
        io::stdout().flush().ok();
        let mut input = String::new();
        io::stdin().lock().read_line(&mut input).ok();
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }

    let summary = app.tracker.reset(&app.session)?;
    println!(
        "Removed {} course(s), {} task(s), {} material(s).",
        summary.courses, summary.tasks, summary.materials
    );
    Ok(())
}
