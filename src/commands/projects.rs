use tracing::info;

use crate::db::Database;
use crate::error::{require, Result};
use crate::models::{Project, ProjectUpdate};

pub fn create(
    db: &Database,
    name: Option<&str>,
    description: Option<&str>,
    contributors: Option<&str>,
) -> Result<i64> {
    let name = require(name, "name")?;
    let id = db.create_project(name, description, contributors)?;
    info!(project_id = id, name, "created project");
    Ok(id)
}

/// Edits every project called `old_name`. Its tickets move with it.
pub fn rename(db: &Database, old_name: Option<&str>, update: &ProjectUpdate) -> Result<Vec<Project>> {
    let old_name = require(old_name, "project")?;
    let projects = db.update_projects_named(old_name, update)?;
    info!(old_name, new_name = ?update.name, updated = projects.len(), "edited project");
    Ok(projects)
}

/// Deletes the project and every ticket filed under it, then returns the
/// remaining projects.
pub fn delete(db: &Database, name: Option<&str>) -> Result<Vec<Project>> {
    let name = require(name, "projectName")?;
    let removed = db.delete_projects_named(name)?;
    info!(name, removed, "deleted project");
    db.list_projects()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::NewTicket;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    fn ticket(project: &str, title: &str) -> NewTicket {
        NewTicket {
            project_name: project.to_string(),
            ticket_title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_requires_name() {
        let (db, _dir) = setup_test_db();
        assert!(matches!(create(&db, None, None, None), Err(Error::Validation("name"))));
    }

    #[test]
    fn test_duplicate_names_allowed() {
        let (db, _dir) = setup_test_db();
        create(&db, Some("P"), None, None).unwrap();
        create(&db, Some("P"), None, None).unwrap();
        assert_eq!(db.list_projects().unwrap().len(), 2);
    }

    #[test]
    fn test_rename_moves_tickets() {
        let (db, _dir) = setup_test_db();
        create(&db, Some("Old"), Some("d"), Some("ada")).unwrap();
        let t1 = db.create_ticket(&ticket("Old", "T1")).unwrap();
        let t2 = db.create_ticket(&ticket("Old", "T2")).unwrap();

        let update = ProjectUpdate {
            name: Some("New".to_string()),
            description: Some("new desc".to_string()),
            contributors: Some("ada, grace".to_string()),
        };
        let updated = rename(&db, Some("Old"), &update).unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].name, "New");
        assert_eq!(updated[0].contributors.as_deref(), Some("ada, grace"));
        for id in [t1, t2] {
            assert_eq!(db.get_ticket(id).unwrap().unwrap().project_name, "New");
        }
    }

    #[test]
    fn test_rename_unknown_project_updates_nothing() {
        let (db, _dir) = setup_test_db();
        create(&db, Some("P"), None, None).unwrap();
        let update = ProjectUpdate {
            name: Some("Q".to_string()),
            ..Default::default()
        };
        assert!(rename(&db, Some("missing"), &update).unwrap().is_empty());
        assert_eq!(db.list_projects().unwrap()[0].name, "P");
    }

    #[test]
    fn test_delete_removes_project_and_tickets() {
        let (db, _dir) = setup_test_db();
        create(&db, Some("P1"), None, None).unwrap();
        let keep = create(&db, Some("P2"), None, None).unwrap();
        db.create_ticket(&ticket("P1", "T1")).unwrap();
        let survivor = db.create_ticket(&ticket("P2", "T2")).unwrap();

        let remaining = delete(&db, Some("P1")).unwrap();

        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, keep);
        let tickets = db.list_tickets().unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].id, survivor);
    }

    #[test]
    fn test_delete_removes_all_duplicates() {
        let (db, _dir) = setup_test_db();
        create(&db, Some("P"), None, None).unwrap();
        create(&db, Some("P"), None, None).unwrap();
        assert!(delete(&db, Some("P")).unwrap().is_empty());
    }
}
