use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use rps::commands::*;
use rps::config::Config;
use rps::models::{CourseDraft, MaterialDraft};
use rps::{logging, RpsError};

#[derive(Parser)]
#[command(name = "rps")]
#[command(about = "Student task tracker with a Pain Score", long_about = None)]
struct Cli {
    /// Identifier of the signed-in user
    #[arg(short, long, env = "RPS_USER", global = true)]
    user: Option<String>,
    /// Directory holding the data store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage courses
    Course {
        #[command(subcommand)]
        command: CourseCommands,
    },
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Manage course materials
    Material {
        #[command(subcommand)]
        command: MaterialCommands,
    },
    /// Show the Pain Score and what drives it
    Score,
    /// Score, most pressing tasks and the upcoming timeline
    Dashboard,
    /// Delete all of your courses, tasks and materials
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
}

#[derive(Subcommand)]
enum CourseCommands {
    /// Add a new course
    Add {
        /// Course title, e.g. "Algorithms"
        title: String,
        /// Course code, unique among your courses
        #[arg(short, long)]
        code: String,
        /// Display color
        #[arg(long)]
        color: Option<String>,
        /// Semester label
        #[arg(short, long)]
        semester: Option<String>,
        /// Free-text description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List your courses
    List,
    /// Show a course with its tasks and materials
    Show { id: u64 },
    /// Remove a course; its tasks are kept without a course
    Remove { id: u64 },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        /// Deadline: YYYY-MM-DD, "YYYY-MM-DD HH:MM" or RFC 3339
        #[arg(short, long)]
        due: String,
        /// Course id
        #[arg(short, long)]
        course: Option<u64>,
        /// Exam, Assignment, Lab Task, Presentation, Project or General
        #[arg(short = 'k', long)]
        category: Option<String>,
        /// Difficulty from 1 to 10
        #[arg(short = 'D', long)]
        difficulty: Option<i64>,
        /// Weight toward the course grade, 1 to 100
        #[arg(short, long)]
        weight: Option<i64>,
        /// Free-text description
        #[arg(long)]
        description: Option<String>,
        /// Reference to attached material (URL or path)
        #[arg(short, long)]
        materials: Option<String>,
    },
    /// List tasks by deadline
    List {
        /// Include completed tasks
        #[arg(short, long)]
        all: bool,
        /// Only tasks of this course
        #[arg(short, long)]
        course: Option<u64>,
    },
    /// Show a task
    Show { id: u64 },
    /// Edit a task
    Edit {
        id: u64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        due: Option<String>,
        #[arg(short, long, conflicts_with = "no_course")]
        course: Option<u64>,
        /// Detach the task from its course
        #[arg(long)]
        no_course: bool,
        #[arg(short = 'k', long)]
        category: Option<String>,
        #[arg(short = 'D', long)]
        difficulty: Option<i64>,
        #[arg(short, long)]
        weight: Option<i64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(short, long)]
        materials: Option<String>,
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Set a task's status (pending, in-progress, completed, overdue)
    Status { id: u64, status: String },
    /// Mark a task as completed
    Complete { id: u64 },
    /// Move a completed task back to pending
    Reopen { id: u64 },
    /// Remove a task
    Remove { id: u64 },
}

#[derive(Subcommand)]
enum MaterialCommands {
    /// Attach material to a course
    Add {
        /// Course id
        course: u64,
        title: String,
        /// File URL or path
        #[arg(short, long)]
        file: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List a course's materials, newest first
    List { course: u64 },
    /// Remove material from a course
    Remove { course: u64, id: u64 },
}

fn run(cli: Cli) -> Result<(), RpsError> {
    let Cli { user, data_dir, command, .. } = cli;
    let open = || -> Result<App, RpsError> {
        let mut config = Config::load()?;
        if let Some(dir) = &data_dir {
            config = config.with_data_dir(dir.clone());
        }
        let user = user
            .as_deref()
            .ok_or_else(|| RpsError::validation("user", "pass --user or set RPS_USER"))?;
        App::open(config, user)
    };

    match command {
        Commands::Course { command } => {
            let app = open()?;
            match command {
                CourseCommands::Add { title, code, color, semester, description } => {
                    cmd_course_add(&app, CourseDraft { title, code, color, semester, description }).map(drop)
                }
                CourseCommands::List => cmd_course_list(&app),
                CourseCommands::Show { id } => cmd_course_show(&app, id),
                CourseCommands::Remove { id } => cmd_course_remove(&app, id),
            }
        }
        Commands::Task { command } => {
            let app = open()?;
            match command {
                TaskCommands::Add { title, due, course, category, difficulty, weight, description, materials } => {
                    let input = AddTask { title, due, course, category, difficulty, weight, description, materials };
                    cmd_task_add(&app, input).map(drop)
                }
                TaskCommands::List { all, course } => cmd_task_list(&app, all, course),
                TaskCommands::Show { id } => cmd_task_show(&app, id),
                TaskCommands::Edit {
                    id,
                    title,
                    due,
                    course,
                    no_course,
                    category,
                    difficulty,
                    weight,
                    description,
                    materials,
                    status,
                } => {
                    let input = EditTask {
                        title,
                        due,
                        course,
                        no_course,
                        category,
                        difficulty,
                        weight,
                        description,
                        materials,
                        status,
                    };
                    cmd_task_edit(&app, id, input).map(drop)
                }
                TaskCommands::Status { id, status } => cmd_task_status(&app, id, &status).map(drop),
                TaskCommands::Complete { id } => cmd_complete(&app, id).map(drop),
                TaskCommands::Reopen { id } => cmd_reopen(&app, id).map(drop),
                TaskCommands::Remove { id } => cmd_task_remove(&app, id),
            }
        }
        Commands::Material { command } => {
            let app = open()?;
            match command {
                MaterialCommands::Add { course, title, file, description } => {
                    cmd_material_add(&app, course, MaterialDraft { title, description, file_ref: file })
                }
                MaterialCommands::List { course } => cmd_material_list(&app, course),
                MaterialCommands::Remove { course, id } => cmd_material_remove(&app, course, id),
            }
        }
        Commands::Score => cmd_score(&open()?).map(drop),
        Commands::Dashboard => cmd_dashboard(&open()?),
        Commands::Reset { force } => cmd_reset(&open()?, force),
        Commands::Completions { shell } => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => return Err(RpsError::validation("shell", format!("unsupported shell '{}'", shell))),
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "rps", &mut io::stdout());
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
