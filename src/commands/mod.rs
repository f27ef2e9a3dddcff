pub mod auth;
pub mod board;
pub mod export;
pub mod projects;
pub mod team;
pub mod tickets;
