use tracing::{info, warn};

use crate::db::Database;
use crate::error::{require, Error, Result};
use crate::models::{NewTicket, Ticket, TicketUpdate};

pub fn create(db: &Database, ticket: &NewTicket) -> Result<i64> {
    require(Some(ticket.project_name.as_str()), "projectName")?;
    require(Some(ticket.ticket_title.as_str()), "ticketTitle")?;

    let id = db.create_ticket(ticket)?;
    info!(ticket_id = id, project = %ticket.project_name, title = %ticket.ticket_title, "created ticket");
    Ok(id)
}

/// Edits every ticket currently titled `title`.
pub fn edit(db: &Database, title: Option<&str>, update: &TicketUpdate) -> Result<Vec<Ticket>> {
    let title = require(title, "ticket")?;
    let tickets = db.update_tickets_titled(title, update)?;
    info!(title, updated = tickets.len(), "edited ticket");
    Ok(tickets)
}

/// Deletes every ticket titled `title` and returns the remaining tickets.
pub fn delete(db: &Database, title: Option<&str>) -> Result<Vec<Ticket>> {
    let title = require(title, "ticketName")?;
    let removed = db.delete_tickets_titled(title)?;
    info!(title, removed, "deleted ticket");
    db.list_tickets()
}

pub fn list(db: &Database) -> Result<Vec<Ticket>> {
    db.list_tickets()
}

/// Appends a comment to every ticket titled `title`. A title nobody uses is
/// accepted and changes nothing. `author` and `date` are optional.
pub fn add_comment(
    db: &Database,
    title: Option<&str>,
    author: Option<&str>,
    date: Option<&str>,
    text: Option<&str>,
) -> Result<usize> {
    let title = require(title, "ticketTitle")?;
    let text = require(text, "comment")?;

    let touched = db.append_comment(title, author, date, text)?;
    if touched == 0 {
        warn!(title, "comment dropped, no ticket has this title");
    } else {
        info!(title, tickets = touched, "added comment");
    }
    Ok(touched)
}

/// Removes the oldest comment whose text equals `text` from the ticket(s)
/// titled `title`, then returns all tickets.
///
/// Comments are matched on their text; two identical comments are told apart
/// only by age.
pub fn delete_comment(db: &Database, title: Option<&str>, text: Option<&str>) -> Result<Vec<Ticket>> {
    let title = require(title, "ticketName")?;
    let text = require(text, "delText")?;

    let removed = db.remove_first_comment_matching(title, text)?;
    if removed == 0 {
        return Err(Error::NotFound(format!("comment on '{}'", title)));
    }
    info!(title, removed, "deleted comment");
    db.list_tickets()
}
