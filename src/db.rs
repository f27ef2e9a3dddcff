use anyhow::Context;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{
    Credential, Member, MemberUpdate, NewMember, NewTicket, Project, ProjectUpdate, Ticket,
    TicketUpdate,
};

const SCHEMA_VERSION: i32 = 1;

const DEFAULT_POSITION: &str = "Employee";

const MEMBER_COLUMNS: &str =
    "u.id, u.first_name, u.last_name, u.phone, l.email, u.position FROM users u JOIN login l ON l.id = u.login_id";

const TICKET_COLUMNS: &str = "t.id, t.project_name, t.ticket_title, t.author, t.description, t.status, t.priority, t.type, t.time, t.assigned_devs FROM tickets t";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;
        let db = Database { conn };
        db.init_schema().context("Failed to initialize schema")?;
        Ok(db)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap_or(0);

        if version < SCHEMA_VERSION {
            debug!(from = version, to = SCHEMA_VERSION, "migrating schema");
            self.conn.execute_batch(
                r#"
                -- Credentials
                CREATE TABLE IF NOT EXISTS login (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    hash TEXT NOT NULL
                );

                -- Roster, one profile per credential
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    login_id INTEGER NOT NULL UNIQUE,
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    phone TEXT,
                    position TEXT NOT NULL,
                    joined_at TEXT NOT NULL,
                    FOREIGN KEY (login_id) REFERENCES login(id) ON DELETE CASCADE
                );

                -- Projects (name is not unique)
                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    contributors TEXT,
                    created_at TEXT NOT NULL
                );

                -- Tickets name their project; the project need not exist yet
                CREATE TABLE IF NOT EXISTS tickets (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_name TEXT NOT NULL,
                    ticket_title TEXT NOT NULL,
                    author TEXT,
                    description TEXT,
                    status TEXT,
                    priority TEXT,
                    type TEXT,
                    time TEXT,
                    assigned_devs TEXT,
                    created_at TEXT NOT NULL
                );

                -- Comments, ordered per ticket by seq
                CREATE TABLE IF NOT EXISTS comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ticket_id INTEGER NOT NULL,
                    seq INTEGER NOT NULL,
                    author TEXT,
                    date TEXT,
                    body TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    UNIQUE (ticket_id, seq),
                    FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name);
                CREATE INDEX IF NOT EXISTS idx_tickets_project ON tickets(project_name);
                CREATE INDEX IF NOT EXISTS idx_tickets_title ON tickets(ticket_title);
                CREATE INDEX IF NOT EXISTS idx_comments_ticket ON comments(ticket_id, seq);
                "#,
            )?;

            self.conn
                .execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        }

        // Cascades depend on this; it is per connection.
        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(())
    }

    // Credentials and roster

    /// Inserts the credential and its profile in one transaction.
    pub fn register_member(&self, member: &NewMember, hash: &str) -> Result<Member> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO login (email, hash) VALUES (?1, ?2)",
            params![member.email, hash],
        )?;
        let login_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO users (login_id, first_name, last_name, phone, position, joined_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                login_id,
                member.first_name,
                member.last_name,
                member.phone,
                DEFAULT_POSITION,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();
        let created = member_by_id(&tx, id)?.ok_or_else(|| Error::NotFound(format!("member #{}", id)))?;
        tx.commit()?;
        Ok(created)
    }

    pub fn get_credential(&self, email: &str) -> Result<Option<Credential>> {
        let credential = self
            .conn
            .query_row(
                "SELECT id, email, hash FROM login WHERE email = ?1",
                [email],
                |row| {
                    Ok(Credential {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(credential)
    }

    /// Replaces the stored hash and returns the updated rows.
    pub fn update_password_hash(&self, email: &str, hash: &str) -> Result<Vec<Credential>> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE login SET hash = ?1 WHERE email = ?2",
            params![hash, email],
        )?;
        let mut stmt = tx.prepare("SELECT id, email, hash FROM login WHERE email = ?1")?;
        let rows = stmt
            .query_map([email], |row| {
                Ok(Credential {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    hash: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        tx.commit()?;
        Ok(rows)
    }

    /// Retargets the credential of `old_email`, then rewrites the linked
    /// profile. Nothing is written unless the credential exists.
    pub fn edit_member(&self, old_email: &str, update: &MemberUpdate) -> Result<Vec<Member>> {
        let tx = self.conn.unchecked_transaction()?;
        let login_id: i64 = tx
            .query_row("SELECT id FROM login WHERE email = ?1", [old_email], |row| row.get(0))
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("credential '{}'", old_email)))?;

        tx.execute(
            "UPDATE login SET email = COALESCE(?1, email) WHERE id = ?2",
            params![update.email, login_id],
        )?;
        tx.execute(
            "UPDATE users SET first_name = COALESCE(?1, first_name), last_name = COALESCE(?2, last_name), phone = COALESCE(?3, phone), position = COALESCE(?4, position) WHERE login_id = ?5",
            params![
                update.first_name,
                update.last_name,
                update.phone,
                update.position,
                login_id
            ],
        )?;

        let members = tx
            .prepare(&format!("SELECT {} WHERE u.login_id = ?1", MEMBER_COLUMNS))?
            .query_map([login_id], member_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        tx.commit()?;
        Ok(members)
    }

    /// Deletes the credential; the profile goes with it.
    pub fn remove_member(&self, email: &str) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM login WHERE email = ?1", [email])?;
        Ok(rows)
    }

    pub fn get_member(&self, id: i64) -> Result<Option<Member>> {
        member_by_id(&self.conn, id)
    }

    pub fn get_member_by_email(&self, email: &str) -> Result<Option<Member>> {
        let member = self
            .conn
            .query_row(
                &format!("SELECT {} WHERE l.email = ?1", MEMBER_COLUMNS),
                [email],
                member_from_row,
            )
            .optional()?;
        Ok(member)
    }

    pub fn list_members(&self) -> Result<Vec<Member>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} ORDER BY u.id", MEMBER_COLUMNS))?;
        let members = stmt
            .query_map([], member_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(members)
    }

    // Projects

    pub fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
        contributors: Option<&str>,
    ) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO projects (name, description, contributors, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, description, contributors, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                "SELECT id, name, description, contributors FROM projects WHERE id = ?1",
                [id],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description, contributors FROM projects ORDER BY id")?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// Updates every project named `old_name`. A new name is carried over to
    /// every ticket filed under the old one, including tickets whose project
    /// was never created.
    pub fn update_projects_named(&self, old_name: &str, update: &ProjectUpdate) -> Result<Vec<Project>> {
        let tx = self.conn.unchecked_transaction()?;
        let ids = ids_where(&tx, "SELECT id FROM projects WHERE name = ?1 ORDER BY id", old_name)?;
        if let Some(new_name) = &update.name {
            let moved = tx.execute(
                "UPDATE tickets SET project_name = ?1 WHERE project_name = ?2",
                params![new_name, old_name],
            )?;
            debug!(from = old_name, to = %new_name, tickets = moved, "moved tickets");
        }
        tx.execute(
            "UPDATE projects SET name = COALESCE(?1, name), description = COALESCE(?2, description), contributors = COALESCE(?3, contributors) WHERE name = ?4",
            params![update.name, update.description, update.contributors, old_name],
        )?;
        tx.commit()?;

        let mut projects = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(project) = self.get_project(id)? {
                projects.push(project);
            }
        }
        Ok(projects)
    }

    /// Deletes every project named `name` along with every ticket filed
    /// under that name and their comments. Returns the number of projects
    /// removed.
    pub fn delete_projects_named(&self, name: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let rows = tx.execute("DELETE FROM projects WHERE name = ?1", [name])?;
        tx.execute("DELETE FROM tickets WHERE project_name = ?1", [name])?;
        tx.commit()?;
        Ok(rows)
    }

    // Tickets

    /// Inserts a ticket filed under `ticket.project_name`. The ticket shows up
    /// on the board under every project of that name, whenever one exists.
    pub fn create_ticket(&self, ticket: &NewTicket) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO tickets (project_name, ticket_title, author, description, status, priority, type, time, assigned_devs, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                ticket.project_name,
                ticket.ticket_title,
                ticket.author,
                ticket.description,
                ticket.status,
                ticket.priority,
                ticket.kind,
                ticket.time,
                ticket.assigned_devs,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_ticket(&self, id: i64) -> Result<Option<Ticket>> {
        let ticket = self
            .conn
            .query_row(
                &format!("SELECT {} WHERE t.id = ?1", TICKET_COLUMNS),
                [id],
                ticket_from_row,
            )
            .optional()?;
        match ticket {
            Some(mut ticket) => {
                self.load_comments(&mut ticket)?;
                Ok(Some(ticket))
            }
            None => Ok(None),
        }
    }

    pub fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} ORDER BY t.id", TICKET_COLUMNS))?;
        let mut tickets = stmt
            .query_map([], ticket_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for ticket in &mut tickets {
            self.load_comments(ticket)?;
        }
        Ok(tickets)
    }

    pub fn ticket_ids_titled(&self, title: &str) -> Result<Vec<i64>> {
        ids_where(
            &self.conn,
            "SELECT id FROM tickets WHERE ticket_title = ?1 ORDER BY id",
            title,
        )
    }

    /// Updates every ticket titled `title` and returns them as stored
    /// afterwards, in id order.
    pub fn update_tickets_titled(&self, title: &str, update: &TicketUpdate) -> Result<Vec<Ticket>> {
        let tx = self.conn.unchecked_transaction()?;
        let ids = ids_where(&tx, "SELECT id FROM tickets WHERE ticket_title = ?1 ORDER BY id", title)?;
        tx.execute(
            "UPDATE tickets SET ticket_title = COALESCE(?1, ticket_title), author = COALESCE(?2, author), description = COALESCE(?3, description), status = COALESCE(?4, status), priority = COALESCE(?5, priority), type = COALESCE(?6, type), time = COALESCE(?7, time), assigned_devs = COALESCE(?8, assigned_devs) WHERE ticket_title = ?9",
            params![
                update.ticket_title,
                update.author,
                update.description,
                update.status,
                update.priority,
                update.kind,
                update.time,
                update.assigned_devs,
                title
            ],
        )?;
        tx.commit()?;

        let mut tickets = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(ticket) = self.get_ticket(id)? {
                tickets.push(ticket);
            }
        }
        Ok(tickets)
    }

    pub fn delete_tickets_titled(&self, title: &str) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM tickets WHERE ticket_title = ?1", [title])?;
        Ok(rows)
    }

    // Comments

    /// Appends a comment to every ticket titled `title`. A missing author or
    /// date is stored as NULL. Returns how many tickets received it.
    pub fn append_comment(
        &self,
        title: &str,
        author: Option<&str>,
        date: Option<&str>,
        text: &str,
    ) -> Result<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let ids = ids_where(&tx, "SELECT id FROM tickets WHERE ticket_title = ?1 ORDER BY id", title)?;
        for &ticket_id in &ids {
            tx.execute(
                "INSERT INTO comments (ticket_id, seq, author, date, body, created_at) VALUES (?1, (SELECT COALESCE(MAX(seq), -1) + 1 FROM comments WHERE ticket_id = ?1), ?2, ?3, ?4, ?5)",
                params![ticket_id, author, date, text, now],
            )?;
        }
        tx.commit()?;
        Ok(ids.len())
    }

    /// On each ticket titled `title`, removes the oldest comment whose text is
    /// exactly `text`. Returns how many comments were removed; when that is
    /// zero nothing was written.
    pub fn remove_first_comment_matching(&self, title: &str, text: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let ids = ids_where(&tx, "SELECT id FROM tickets WHERE ticket_title = ?1 ORDER BY id", title)?;
        let mut removed = 0;
        for ticket_id in ids {
            let comment_id: Option<i64> = tx
                .query_row(
                    "SELECT id FROM comments WHERE ticket_id = ?1 AND body = ?2 ORDER BY seq LIMIT 1",
                    params![ticket_id, text],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(comment_id) = comment_id {
                removed += tx.execute("DELETE FROM comments WHERE id = ?1", [comment_id])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn load_comments(&self, ticket: &mut Ticket) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT author, date, body FROM comments WHERE ticket_id = ?1 ORDER BY seq",
        )?;
        let mut rows = stmt.query([ticket.id])?;
        while let Some(row) = rows.next()? {
            ticket.comment_user.push(row.get(0)?);
            ticket.comment_date.push(row.get(1)?);
            ticket.comment_text.push(row.get(2)?);
        }
        Ok(())
    }
}

fn ids_where(conn: &Connection, sql: &str, key: &str) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([key], |row| row.get(0))?
        .collect::<std::result::Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn member_by_id(conn: &Connection, id: i64) -> Result<Option<Member>> {
    let member = conn
        .query_row(
            &format!("SELECT {} WHERE u.id = ?1", MEMBER_COLUMNS),
            [id],
            member_from_row,
        )
        .optional()?;
    Ok(member)
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        position: row.get(5)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        contributors: row.get(3)?,
    })
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        project_name: row.get(1)?,
        ticket_title: row.get(2)?,
        author: row.get(3)?,
        description: row.get(4)?,
        status: row.get(5)?,
        priority: row.get(6)?,
        kind: row.get(7)?,
        time: row.get(8)?,
        assigned_devs: row.get(9)?,
        comment_user: Vec::new(),
        comment_date: Vec::new(),
        comment_text: Vec::new(),
    })
}
