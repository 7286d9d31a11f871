//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `simpletodo_core` linkage.
//! - Optionally open a database file and report reminders due now.
//!
//! Usage: `simpletodo_cli [DB_PATH]`

use simpletodo_core::db::open_db;
use simpletodo_core::{SqliteTaskStore, TaskStore};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("simpletodo_core ping={}", simpletodo_core::ping());
    println!("simpletodo_core version={}", simpletodo_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    match count_due(&db_path) {
        Ok(due) => {
            println!("due_reminders={due}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error={err}");
            ExitCode::FAILURE
        }
    }
}

fn count_due(db_path: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let store = SqliteTaskStore::try_new(&conn)?;
    let now = chrono::Utc::now().timestamp_millis();
    Ok(store.list_due(now)?.len())
}
