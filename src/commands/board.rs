//! Read-side assembly of the project board.
//!
//! Projects, tickets and comments are stored flat. The board nests them:
//! every project carries the tickets filed under its name, and every ticket
//! carries its comments oldest first. Assembly never writes.

use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::Result;
use crate::models::{Project, Ticket};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectNode {
    pub name: String,
    pub description: Option<String>,
    pub contributor: Option<String>,
    pub tickets: Vec<TicketNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketNode {
    pub ticket_title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub time: Option<String>,
    pub assigned_devs: Option<String>,
    pub comments: Vec<CommentNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNode {
    pub user: Option<String>,
    pub date: Option<String>,
    pub comment: String,
}

/// Loads projects and tickets in id order and nests them.
pub fn projects_with_tickets(db: &Database) -> Result<Vec<ProjectNode>> {
    let projects = db.list_projects()?;
    let tickets = db.list_tickets()?;
    Ok(assemble(&projects, &tickets))
}

/// Nests `tickets` under `projects`, both expected in id order.
///
/// A ticket joins every project whose name equals its `project_name`, so two
/// projects sharing a name both list it. A ticket whose project name matches
/// nothing is left out until a project with that name is created.
pub fn assemble(projects: &[Project], tickets: &[Ticket]) -> Vec<ProjectNode> {
    let mut nodes: Vec<ProjectNode> = projects
        .iter()
        .map(|project| ProjectNode {
            name: project.name.clone(),
            description: project.description.clone(),
            contributor: project.contributors.clone(),
            tickets: Vec::new(),
        })
        .collect();

    for ticket in tickets {
        let node = ticket_node(ticket);
        for project in nodes.iter_mut().filter(|p| p.name == ticket.project_name) {
            project.tickets.push(node.clone());
        }
    }

    nodes
}

fn ticket_node(ticket: &Ticket) -> TicketNode {
    TicketNode {
        ticket_title: ticket.ticket_title.clone(),
        author: ticket.author.clone(),
        description: ticket.description.clone(),
        status: ticket.status.clone(),
        priority: ticket.priority.clone(),
        kind: ticket.kind.clone(),
        time: ticket.time.clone(),
        assigned_devs: ticket.assigned_devs.clone(),
        comments: zip_comments(ticket),
    }
}

/// Pairs up the three comment sequences index by index. Stops at the
/// shortest one if they ever disagree in length.
fn zip_comments(ticket: &Ticket) -> Vec<CommentNode> {
    ticket
        .comment_user
        .iter()
        .zip(&ticket.comment_date)
        .zip(&ticket.comment_text)
        .map(|((user, date), text)| CommentNode {
            user: user.clone(),
            date: date.clone(),
            comment: text.clone(),
        })
        .collect()
}
