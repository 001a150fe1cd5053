use chrono::{Duration, Utc};
use rps::models::{
    Category, CourseDraft, MaterialDraft, Session, TaskDraft, TaskPatch, TaskStatus,
};
use rps::storage::{MemoryStorage, Storage};
use rps::tracker::Tracker;
use rps::RpsError;

fn tracker() -> Tracker<MemoryStorage> {
    Tracker::new(MemoryStorage::new())
}

fn user(name: &str) -> Session {
    Session::new(name).unwrap()
}

fn course(title: &str, code: &str) -> CourseDraft {
    CourseDraft {
        title: title.into(),
        code: code.into(),
        ..Default::default()
    }
}

fn task_due_in(title: &str, days: i64) -> TaskDraft {
    TaskDraft {
        title: title.into(),
        deadline: Some(Utc::now() + Duration::days(days)),
        ..Default::default()
    }
}

#[test]
fn test_duplicate_code_for_same_owner_is_rejected() {
    let t = tracker();
    let ana = user("ana");
    t.create_course(&ana, course("Algorithms", "CS301")).unwrap();

    let err = t.create_course(&ana, course("Algorithms", "CS301")).unwrap_err();
    assert!(matches!(err, RpsError::DuplicateCode { ref code } if code == "CS301"));

    let err = t.create_course(&ana, course("Algorithms II", " cs301 ")).unwrap_err();
    assert!(matches!(err, RpsError::DuplicateCode { .. }));
    assert_eq!(t.list_courses(&ana).unwrap().len(), 1);
}

#[test]
fn test_same_code_for_different_owners_is_fine() {
    let t = tracker();
    t.create_course(&user("ana"), course("Algorithms", "CS301")).unwrap();
    t.create_course(&user("ben"), course("Algorithms", "CS301")).unwrap();
    assert_eq!(t.list_courses(&user("ana")).unwrap().len(), 1);
    assert_eq!(t.list_courses(&user("ben")).unwrap().len(), 1);
}

#[test]
fn test_course_requires_title_and_code_and_gets_defaults() {
    let t = tracker().with_course_defaults("#10b981", "Spring 2026");
    let ana = user("ana");
    assert!(matches!(
        t.create_course(&ana, course("  ", "CS1")),
        Err(RpsError::Validation { field: "title", .. })
    ));
    assert!(matches!(
        t.create_course(&ana, course("Networks", "")),
        Err(RpsError::Validation { field: "code", .. })
    ));

    let c = t.create_course(&ana, course(" Networks ", "CSE4561")).unwrap();
    assert_eq!(c.title, "Networks");
    assert_eq!(c.color, "#10b981");
    assert_eq!(c.semester, "Spring 2026");
    assert_eq!(c.owner, "ana");
    assert_eq!(c.description, None);
}

#[test]
fn test_task_defaults() {
    let t = tracker();
    let task = t.create_task(&user("ana"), task_due_in("Read chapter 8", 3)).unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.difficulty, 5);
    assert_eq!(task.weight, 10);
    assert_eq!(task.category, Category::General);
    assert_eq!(task.description, "");
    assert_eq!(task.course, None);
    assert_eq!(task.completed_at, None);
}

#[test]
fn test_out_of_range_values_are_rejected_not_clamped() {
    let t = tracker();
    let ana = user("ana");
    for (difficulty, weight, field) in [(0, 10, "difficulty"), (11, 10, "difficulty"), (5, 0, "weight"), (5, 101, "weight")] {
        let draft = TaskDraft {
            difficulty: Some(difficulty),
            weight: Some(weight),
            ..task_due_in("Lab", 2)
        };
        match t.create_task(&ana, draft) {
            Err(RpsError::Validation { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
    assert!(t.list_tasks(&ana).unwrap().is_empty());
}

#[test]
fn test_task_requires_title_and_deadline() {
    let t = tracker();
    let ana = user("ana");
    let no_deadline = TaskDraft {
        title: "Quiz".into(),
        ..Default::default()
    };
    assert!(matches!(
        t.create_task(&ana, no_deadline),
        Err(RpsError::Validation { field: "deadline", .. })
    ));
    assert!(matches!(
        t.create_task(&ana, task_due_in("", 1)),
        Err(RpsError::Validation { field: "title", .. })
    ));
}

#[test]
fn test_task_course_must_exist_and_be_owned() {
    let t = tracker();
    let ana = user("ana");
    let ben = user("ben");
    let bens = t.create_course(&ben, course("Compilers", "CSE4641")).unwrap();

    let draft = TaskDraft {
        course: Some(999),
        ..task_due_in("Parser", 4)
    };
    assert!(matches!(t.create_task(&ana, draft), Err(RpsError::NotFound { kind: "course", id: 999 })));

    let draft = TaskDraft {
        course: Some(bens.id),
        ..task_due_in("Parser", 4)
    };
    assert!(matches!(t.create_task(&ana, draft), Err(RpsError::NotFound { kind: "course", .. })));

    let draft = TaskDraft {
        course: Some(bens.id),
        category: Some(Category::Assignment),
        ..task_due_in("Parser", 4)
    };
    let task = t.create_task(&ben, draft).unwrap();
    assert_eq!(task.course, Some(bens.id));
    assert_eq!(t.list_course_tasks(&ben, bens.id).unwrap().len(), 1);
}

#[test]
fn test_complete_then_reopen_round_trips() {
    let t = tracker();
    let ana = user("ana");
    let task = t.create_task(&ana, task_due_in("Lab report", 2)).unwrap();

    let done = t.update_task(&ana, task.id, TaskPatch::status(TaskStatus::Completed)).unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert!(done.completed_at.is_some());
    assert!(t.list_active_tasks(&ana).unwrap().is_empty());

    let back = t.update_task(&ana, task.id, TaskPatch::status(TaskStatus::Pending)).unwrap();
    assert_eq!(back.status, TaskStatus::Pending);
    assert_eq!(back.completed_at, None);
    assert_eq!(t.list_active_tasks(&ana).unwrap().len(), 1);

    let started = t.update_task(&ana, task.id, TaskPatch::status(TaskStatus::InProgress)).unwrap();
    assert_eq!(started.completed_at, None);
}

#[test]
fn test_partial_update_touches_only_given_fields() {
    let t = tracker();
    let ana = user("ana");
    let c = t.create_course(&ana, course("Databases", "CSE4541")).unwrap();
    let task = t
        .create_task(
            &ana,
            TaskDraft {
                course: Some(c.id),
                difficulty: Some(8),
                weight: Some(15),
                description: Some("ER diagram".into()),
                ..task_due_in("Lab", 2)
            },
        )
        .unwrap();

    let updated = t
        .update_task(
            &ana,
            task.id,
            TaskPatch {
                weight: Some(20),
                title: Some("Lab 3".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.weight, 20);
    assert_eq!(updated.title, "Lab 3");
    assert_eq!(updated.difficulty, 8);
    assert_eq!(updated.description, "ER diagram");
    assert_eq!(updated.course, Some(c.id));
    assert_eq!(updated.deadline, task.deadline);

    let detached = t
        .update_task(
            &ana,
            task.id,
            TaskPatch {
                course: Some(None),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(detached.course, None);
}

#[test]
fn test_invalid_update_changes_nothing() {
    let t = tracker();
    let ana = user("ana");
    let task = t.create_task(&ana, task_due_in("Slides", 6)).unwrap();
    let bad = TaskPatch {
        title: Some("New title".into()),
        weight: Some(250),
        ..Default::default()
    };
    assert!(matches!(t.update_task(&ana, task.id, bad), Err(RpsError::Validation { field: "weight", .. })));
    assert_eq!(t.get_task(&ana, task.id).unwrap(), task);
}

#[test]
fn test_other_users_entities_look_missing() {
    let t = tracker();
    let ana = user("ana");
    let ben = user("ben");
    let c = t.create_course(&ana, course("Algorithms", "CS301")).unwrap();
    let task = t.create_task(&ana, task_due_in("Homework", 1)).unwrap();

    assert!(matches!(t.get_task(&ben, task.id), Err(RpsError::NotFound { kind: "task", .. })));
    assert!(matches!(
        t.update_task(&ben, task.id, TaskPatch::status(TaskStatus::Completed)),
        Err(RpsError::NotFound { .. })
    ));
    assert!(matches!(t.delete_task(&ben, task.id), Err(RpsError::NotFound { .. })));
    assert!(matches!(t.get_course(&ben, c.id), Err(RpsError::NotFound { kind: "course", .. })));
    assert!(matches!(t.delete_course(&ben, c.id), Err(RpsError::NotFound { .. })));

    // the same error as for an id that never existed
    let missing = t.get_task(&ben, 4242).unwrap_err().to_string();
    assert_eq!(missing, "task 4242 not found");
    assert_eq!(t.get_task(&ben, task.id).unwrap_err().to_string(), format!("task {} not found", task.id));

    assert_eq!(t.get_task(&ana, task.id).unwrap().status, TaskStatus::Pending);
    assert!(t.list_tasks(&ben).unwrap().is_empty());
}

#[test]
fn test_tasks_are_listed_by_deadline() {
    let t = tracker();
    let ana = user("ana");
    t.create_task(&ana, task_due_in("Later", 9)).unwrap();
    t.create_task(&ana, task_due_in("Sooner", 1)).unwrap();
    t.create_task(&ana, task_due_in("Middle", 4)).unwrap();
    t.create_task(&user("ben"), task_due_in("Not mine", 0)).unwrap();

    let titles: Vec<String> = t.list_tasks(&ana).unwrap().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Sooner", "Middle", "Later"]);
}

#[test]
fn test_delete_task() {
    let t = tracker();
    let ana = user("ana");
    let task = t.create_task(&ana, task_due_in("Quiz", 2)).unwrap();
    t.delete_task(&ana, task.id).unwrap();
    assert!(matches!(t.get_task(&ana, task.id), Err(RpsError::NotFound { .. })));
    assert!(matches!(t.delete_task(&ana, task.id), Err(RpsError::NotFound { .. })));
}

#[test]
fn test_deleting_course_detaches_tasks_and_drops_materials() {
    let t = tracker();
    let ana = user("ana");
    let c = t.create_course(&ana, course("Machine Learning", "CSE4643")).unwrap();
    let other = t.create_course(&ana, course("Networks", "CSE4561")).unwrap();
    let linked = t
        .create_task(&ana, TaskDraft { course: Some(c.id), ..task_due_in("Lab 4", 5) })
        .unwrap();
    let unrelated = t
        .create_task(&ana, TaskDraft { course: Some(other.id), ..task_due_in("Quiz", 5) })
        .unwrap();
    t.add_material(
        &ana,
        c.id,
        MaterialDraft {
            title: "Slides".into(),
            file_ref: "https://files.example/ml.pdf".into(),
            ..Default::default()
        },
    )
    .unwrap();

    let removal = t.delete_course(&ana, c.id).unwrap();
    assert_eq!(removal.detached_tasks, 1);
    assert_eq!(removal.removed_materials, 1);
    assert_eq!(t.get_task(&ana, linked.id).unwrap().course, None);
    assert_eq!(t.get_task(&ana, unrelated.id).unwrap().course, Some(other.id));
    assert!(t.storage().load().unwrap().materials.is_empty());
    assert!(matches!(t.list_materials(&ana, c.id), Err(RpsError::NotFound { .. })));
}

#[test]
fn test_materials_follow_course_ownership() {
    let t = tracker();
    let ana = user("ana");
    let ben = user("ben");
    let c = t.create_course(&ana, course("Operating Systems", "CSE4521")).unwrap();
    let other = t.create_course(&ana, course("Compilers", "CSE4641")).unwrap();
    let draft = |title: &str| MaterialDraft {
        title: title.into(),
        description: Some("week notes".into()),
        file_ref: format!("notes/{}.pdf", title),
    };

    assert!(matches!(t.add_material(&ben, c.id, draft("Chapter 8")), Err(RpsError::NotFound { .. })));
    assert!(matches!(
        t.add_material(&ana, c.id, MaterialDraft { file_ref: " ".into(), ..draft("x") }),
        Err(RpsError::Validation { field: "file", .. })
    ));

    let first = t.add_material(&ana, c.id, draft("Chapter 7")).unwrap();
    let second = t.add_material(&ana, c.id, draft("Chapter 8")).unwrap();
    let listed: Vec<u64> = t.list_materials(&ana, c.id).unwrap().iter().map(|m| m.id).collect();
    assert_eq!(listed, vec![second.id, first.id]);
    assert!(matches!(t.list_materials(&ben, c.id), Err(RpsError::NotFound { .. })));

    assert!(matches!(t.delete_material(&ana, other.id, first.id), Err(RpsError::NotFound { .. })));
    assert!(matches!(t.delete_material(&ben, c.id, first.id), Err(RpsError::NotFound { .. })));
    t.delete_material(&ana, c.id, first.id).unwrap();
    assert_eq!(t.list_materials(&ana, c.id).unwrap().len(), 1);
}

#[test]
fn test_sweep_marks_only_open_past_due_tasks() {
    let t = tracker();
    let ana = user("ana");
    let late = t.create_task(&ana, task_due_in("Late", -2)).unwrap();
    let started = t.create_task(&ana, task_due_in("Started", -1)).unwrap();
    t.update_task(&ana, started.id, TaskPatch::status(TaskStatus::InProgress)).unwrap();
    let done = t.create_task(&ana, task_due_in("Done", -3)).unwrap();
    t.update_task(&ana, done.id, TaskPatch::status(TaskStatus::Completed)).unwrap();
    let future = t.create_task(&ana, task_due_in("Future", 3)).unwrap();
    let bens = t.create_task(&user("ben"), task_due_in("Ben's", -5)).unwrap();

    assert_eq!(t.sweep_overdue(&ana, Utc::now()).unwrap(), 2);
    assert_eq!(t.get_task(&ana, late.id).unwrap().status, TaskStatus::Overdue);
    assert_eq!(t.get_task(&ana, started.id).unwrap().status, TaskStatus::Overdue);
    assert_eq!(t.get_task(&ana, done.id).unwrap().status, TaskStatus::Completed);
    assert_eq!(t.get_task(&ana, future.id).unwrap().status, TaskStatus::Pending);
    assert_eq!(t.get_task(&user("ben"), bens.id).unwrap().status, TaskStatus::Pending);

    // overdue tasks still count as active
    assert_eq!(t.list_active_tasks(&ana).unwrap().len(), 3);
    assert_eq!(t.sweep_overdue(&ana, Utc::now()).unwrap(), 0);
}

#[test]
fn test_moving_deadline_out_clears_overdue() {
    let t = tracker();
    let ana = user("ana");
    let late = t.create_task(&ana, task_due_in("Late", -1)).unwrap();
    let kept = t.create_task(&ana, task_due_in("Kept", -1)).unwrap();
    assert_eq!(t.sweep_overdue(&ana, Utc::now()).unwrap(), 2);

    let extended = TaskPatch {
        deadline: Some(Utc::now() + Duration::days(7)),
        ..Default::default()
    };
    let late = t.update_task(&ana, late.id, extended).unwrap();
    assert_eq!(late.status, TaskStatus::Pending);
    assert!(late.completed_at.is_none());
    assert_eq!(t.sweep_overdue(&ana, Utc::now()).unwrap(), 0);

    // still past due, so it stays overdue
    let renamed = TaskPatch {
        title: Some("Kept, renamed".into()),
        ..Default::default()
    };
    assert_eq!(t.update_task(&ana, kept.id, renamed).unwrap().status, TaskStatus::Overdue);

    // an explicit status wins
    let pinned = TaskPatch {
        deadline: Some(Utc::now() + Duration::days(7)),
        status: Some(TaskStatus::Overdue),
        ..Default::default()
    };
    assert_eq!(t.update_task(&ana, kept.id, pinned).unwrap().status, TaskStatus::Overdue);
}

#[test]
fn test_reset_only_touches_caller() {
    let t = tracker();
    let ana = user("ana");
    let ben = user("ben");
    let c = t.create_course(&ana, course("Algorithms", "CS301")).unwrap();
    t.create_task(&ana, task_due_in("HW", 2)).unwrap();
    t.add_material(&ana, c.id, MaterialDraft { title: "Syllabus".into(), file_ref: "s.pdf".into(), ..Default::default() })
        .unwrap();
    t.create_course(&ben, course("Algorithms", "CS301")).unwrap();
    t.create_task(&ben, task_due_in("HW", 2)).unwrap();

    let summary = t.reset(&ana).unwrap();
    assert_eq!((summary.courses, summary.tasks, summary.materials), (1, 1, 1));
    assert!(t.list_courses(&ana).unwrap().is_empty());
    assert_eq!(t.list_courses(&ben).unwrap().len(), 1);
    assert_eq!(t.list_tasks(&ben).unwrap().len(), 1);
}

#[test]
fn test_identifiers_are_unique_and_not_reused() {
    let t = tracker();
    let ana = user("ana");
    let c = t.create_course(&ana, course("Algorithms", "CS301")).unwrap();
    let a = t.create_task(&ana, task_due_in("A", 1)).unwrap();
    t.delete_task(&ana, a.id).unwrap();
    let b = t.create_task(&ana, task_due_in("B", 1)).unwrap();
    assert_ne!(c.id, a.id);
    assert!(b.id > a.id);
}
