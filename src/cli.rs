use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "lessonview",
    version,
    about = "Browse video courses and resume lessons where you left off"
)]
pub struct Cli {
    /// Course catalog API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Anonymous token endpoint
    #[arg(long, global = true)]
    pub auth_url: Option<String>,

    /// Courses per catalog page
    #[arg(long, global = true)]
    pub page_size: Option<usize>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Keep token and progress in memory only
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print one page of the course catalog
    Courses {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Print a course's lessons with saved progress
    Course { id: String },
    /// Play a lesson in the external player, resuming saved progress
    Play {
        course_id: String,
        #[arg(long)]
        lesson: Option<String>,
    },
    /// Forget the stored anonymous token
    Logout,
    Tui,
}
