use serde::{Deserialize, Serialize};

/// Login record: the identity a member signs in with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: i64,
    pub email: String,
    pub hash: String,
}

/// Team roster entry. The email lives on the linked credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: String,
    pub position: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewMember {
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: String,
}

/// Profile edit. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct MemberUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub contributors: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub contributors: Option<String>,
}

/// A ticket as served to clients. Comments are exposed as three
/// index-aligned sequences, oldest first. Author and date are null when the
/// comment was posted without them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub project_name: String,
    pub ticket_title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub time: Option<String>,
    pub assigned_devs: Option<String>,
    pub comment_user: Vec<Option<String>>,
    pub comment_date: Vec<Option<String>>,
    pub comment_text: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTicket {
    pub project_name: String,
    pub ticket_title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub kind: Option<String>,
    pub time: Option<String>,
    pub assigned_devs: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TicketUpdate {
    pub ticket_title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub kind: Option<String>,
    pub time: Option<String>,
    pub assigned_devs: Option<String>,
}
