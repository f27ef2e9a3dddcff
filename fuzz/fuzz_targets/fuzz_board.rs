#![no_main]

//! Fuzz target for board assembly.
//!
//! Builds projects, tickets and comments from arbitrary input, stores them,
//! deletes a few comments by text, and checks that the assembled board stays
//! consistent with the flat rows.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tempfile::tempdir;

use teamtrack::commands::board;
use teamtrack::db::Database;
use teamtrack::models::NewTicket;

#[derive(Arbitrary, Debug)]
struct BoardInput {
    /// Project names; duplicates are expected
    projects: Vec<String>,
    /// (project index, title) pairs
    tickets: Vec<(u8, String)>,
    /// (ticket index, author, text) triples; the author may be absent
    comments: Vec<(u8, Option<String>, String)>,
    /// (ticket index, text) deletions
    deletions: Vec<(u8, String)>,
}

fuzz_target!(|input: BoardInput| {
    if input.projects.is_empty() {
        return;
    }
    let projects: Vec<String> = input.projects.into_iter().take(8).collect();

    let dir = match tempdir() {
        Ok(d) => d,
        Err(_) => return,
    };
    let db = match Database::open(&dir.path().join("board.db")) {
        Ok(d) => d,
        Err(_) => return,
    };

    let mut created = 0;
    for name in &projects {
        if db.create_project(name, None, None).is_ok() {
            created += 1;
        }
    }

    let mut titles = Vec::new();
    for (index, title) in input.tickets.into_iter().take(16) {
        let project_name = projects[index as usize % projects.len()].clone();
        let ticket = NewTicket {
            project_name,
            ticket_title: title.clone(),
            ..Default::default()
        };
        if db.create_ticket(&ticket).is_ok() {
            titles.push(title);
        }
    }
    if titles.is_empty() {
        return;
    }

    for (index, author, text) in input.comments.into_iter().take(32) {
        let title = &titles[index as usize % titles.len()];
        let _ = db.append_comment(title, author.as_deref(), Some("today"), &text);
    }
    for (index, text) in input.deletions.into_iter().take(8) {
        let title = &titles[index as usize % titles.len()];
        let _ = db.remove_first_comment_matching(title, &text);
    }

    let stored = match db.list_tickets() {
        Ok(t) => t,
        Err(_) => return,
    };
    let nodes = match board::projects_with_tickets(&db) {
        Ok(n) => n,
        Err(_) => return,
    };

    assert_eq!(nodes.len(), created);
    for ticket in &stored {
        assert_eq!(ticket.comment_user.len(), ticket.comment_text.len());
        assert_eq!(ticket.comment_date.len(), ticket.comment_text.len());
    }
    for node in &nodes {
        let expected = stored.iter().filter(|t| t.project_name == node.name).count();
        assert_eq!(node.tickets.len(), expected);
    }
});
