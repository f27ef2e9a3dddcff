use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use crate::commands::board::{self, ProjectNode};
use crate::db::Database;

#[derive(Serialize, Deserialize)]
pub struct BoardExport {
    pub version: i32,
    pub exported_at: String,
    pub members: usize,
    pub projects: Vec<ProjectNode>,
}

pub fn build(db: &Database) -> Result<BoardExport> {
    let projects = board::projects_with_tickets(db)?;
    let members = db.list_members()?.len();

    Ok(BoardExport {
        version: 1,
        exported_at: chrono::Utc::now().to_rfc3339(),
        members,
        projects,
    })
}

/// Writes the board as pretty JSON to `output_path`, or stdout.
pub fn run(db: &Database, output_path: Option<&str>) -> Result<()> {
    let data = build(db)?;
    let json = serde_json::to_string_pretty(&data)?;

    match output_path {
        Some(path) => {
            fs::write(path, json).context("Failed to write export file")?;
            eprintln!("Exported {} projects to {}", data.projects.len(), path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}
