use tracing::info;

use crate::db::Database;
use crate::error::{require, Error, Result};
use crate::models::{Member, MemberUpdate};

/// Renames the credential of `old_email` and rewrites its profile. The
/// profile is only touched once the credential update went through.
pub fn edit(db: &Database, old_email: Option<&str>, update: &MemberUpdate) -> Result<Vec<Member>> {
    let old_email = require(old_email, "oldEmail")?;
    let members = db.edit_member(old_email, update)?;
    info!(old_email, new_email = ?update.email, "edited member");
    Ok(members)
}

/// Removes credential and profile, then returns the roster.
pub fn remove(db: &Database, email: Option<&str>) -> Result<Vec<Member>> {
    let email = require(email, "email")?;
    let removed = db.remove_member(email)?;
    info!(email, removed, "removed member");
    db.list_members()
}

pub fn get(db: &Database, id: i64) -> Result<Member> {
    db.get_member(id)?
        .ok_or_else(|| Error::NotFound(format!("member #{}", id)))
}

pub fn list(db: &Database) -> Result<Vec<Member>> {
    db.list_members()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::auth;
    use crate::models::NewMember;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    fn add(db: &Database, first: &str, email: &str) -> Member {
        let profile = NewMember {
            first_name: first.to_string(),
            last_name: "Tester".to_string(),
            phone: Some("555".to_string()),
            email: email.to_string(),
        };
        auth::register(db, &profile, Some("pw"), 4).unwrap()
    }

    #[test]
    fn test_edit_renames_identity_and_profile() {
        let (db, _dir) = setup_test_db();
        let member = add(&db, "Ada", "a@x.com");

        let update = MemberUpdate {
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
            phone: Some("999".to_string()),
            email: Some("g@x.com".to_string()),
            position: Some("Manager".to_string()),
        };
        let edited = edit(&db, Some("a@x.com"), &update).unwrap();

        assert_eq!(edited.len(), 1);
        assert_eq!(edited[0].id, member.id);
        assert_eq!(edited[0].email, "g@x.com");
        assert_eq!(edited[0].position, "Manager");
        assert!(db.get_credential("a@x.com").unwrap().is_none());
        assert_eq!(
            auth::verify(&db, "g@x.com", "pw").unwrap(),
            auth::Verification::Valid
        );
    }

    #[test]
    fn test_edit_keeps_fields_not_supplied() {
        let (db, _dir) = setup_test_db();
        add(&db, "Ada", "a@x.com");

        let update = MemberUpdate {
            position: Some("Lead".to_string()),
            ..Default::default()
        };
        let edited = edit(&db, Some("a@x.com"), &update).unwrap();

        assert_eq!(edited[0].first_name, "Ada");
        assert_eq!(edited[0].email, "a@x.com");
        assert_eq!(edited[0].phone.as_deref(), Some("555"));
        assert_eq!(edited[0].position, "Lead");
    }

    #[test]
    fn test_edit_unknown_member() {
        let (db, _dir) = setup_test_db();
        let result = edit(&db, Some("ghost@x.com"), &MemberUpdate::default());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_remove_returns_roster_in_id_order() {
        let (db, _dir) = setup_test_db();
        let a = add(&db, "A", "a@x.com");
        add(&db, "B", "b@x.com");
        let c = add(&db, "C", "c@x.com");

        let roster = remove(&db, Some("b@x.com")).unwrap();
        let ids: Vec<i64> = roster.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);
        assert!(db.get_credential("b@x.com").unwrap().is_none());
    }

    #[test]
    fn test_remove_unknown_email_is_not_an_error() {
        let (db, _dir) = setup_test_db();
        add(&db, "A", "a@x.com");
        let roster = remove(&db, Some("ghost@x.com")).unwrap();
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_get_member() {
        let (db, _dir) = setup_test_db();
        let member = add(&db, "A", "a@x.com");
        assert_eq!(get(&db, member.id).unwrap(), member);
        assert!(matches!(get(&db, 4242), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let (db, _dir) = setup_test_db();
        add(&db, "Z", "z@x.com");
        add(&db, "A", "a@x.com");
        let names: Vec<String> = list(&db).unwrap().into_iter().map(|m| m.first_name).collect();
        assert_eq!(names, vec!["Z", "A"]);
    }
}
