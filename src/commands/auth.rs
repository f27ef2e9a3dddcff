use tracing::{info, warn};

use crate::db::Database;
use crate::error::{require, Error, Result};
use crate::models::{Credential, Member, NewMember};

/// Identities that sign in without a password check.
///
/// SECURITY: this is a known hole kept for compatibility with existing
/// deployments. Anyone who submits one of these names gets in.
const PASSWORDLESS_IDENTITIES: [&str; 2] = ["admin", "employee"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rotation {
    Rotated(Vec<Credential>),
    /// The old password did not match; nothing was written.
    Rejected,
}

/// What must be checked before an identity is let in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// Passwordless identity, nothing to check.
    Skip,
    /// Stored bcrypt hash the submitted password must match.
    Hash(String),
}

pub fn is_passwordless(email: &str) -> bool {
    PASSWORDLESS_IDENTITIES.contains(&email)
}

// bcrypt work below never touches the database, so callers can run it
// without holding the store.

pub fn hash_password(plain: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(plain, cost)?)
}

pub fn check_password(password: &str, challenge: &Challenge) -> Result<Verification> {
    match challenge {
        Challenge::Skip => Ok(Verification::Valid),
        Challenge::Hash(hash) => {
            if bcrypt::verify(password, hash)? {
                Ok(Verification::Valid)
            } else {
                Ok(Verification::Invalid)
            }
        }
    }
}

// Store lookups and writes.

/// Finds what `email` has to prove. Unknown identities are `NotFound`.
pub fn challenge(db: &Database, email: &str) -> Result<Challenge> {
    if is_passwordless(email) {
        warn!(identity = email, "password check skipped for passwordless identity");
        return Ok(Challenge::Skip);
    }
    stored_hash(db, email).map(Challenge::Hash)
}

/// The stored hash for `email`, with no passwordless shortcut.
pub fn stored_hash(db: &Database, email: &str) -> Result<String> {
    let credential = db
        .get_credential(email)?
        .ok_or_else(|| Error::NotFound(format!("credential '{}'", email)))?;
    Ok(credential.hash)
}

/// The roster entry of a verified identity, or `None` when it has no
/// profile.
pub fn admit(db: &Database, email: &str, verification: Verification) -> Result<Option<Member>> {
    match verification {
        Verification::Valid => db.get_member_by_email(email),
        Verification::Invalid => Err(Error::Unauthorized(email.to_string())),
    }
}

/// Checks the required registration fields and returns the password.
pub fn validate_registration<'a>(member: &NewMember, password: Option<&'a str>) -> Result<&'a str> {
    require(Some(member.email.as_str()), "email")?;
    require(Some(member.first_name.as_str()), "firstName")?;
    require(Some(member.last_name.as_str()), "lastName")?;
    require(password, "password")
}

/// Stores a member whose password is already hashed.
pub fn register_hashed(db: &Database, member: &NewMember, hash: &str) -> Result<Member> {
    let created = db.register_member(member, hash)?;
    info!(member_id = created.id, email = %created.email, "registered member");
    Ok(created)
}

/// Stores `hash` as the new password of `email` and returns the rewritten
/// credential rows.
pub fn store_rotation(db: &Database, email: &str, hash: &str) -> Result<Vec<Credential>> {
    let rows = db.update_password_hash(email, hash)?;
    info!(email, "password rotated");
    Ok(rows)
}

// Whole operations, for callers that can block.

/// Checks `password` against the stored hash for `email`.
pub fn verify(db: &Database, email: &str, password: &str) -> Result<Verification> {
    check_password(password, &challenge(db, email)?)
}

/// Verifies the pair and returns the matching roster entry, or `None` when
/// the identity checks out but has no profile.
pub fn sign_in(db: &Database, email: Option<&str>, password: Option<&str>) -> Result<Option<Member>> {
    let email = require(email, "email")?;
    let password = require(password, "password")?;
    admit(db, email, verify(db, email, password)?)
}

/// Creates the credential and the roster entry together.
pub fn register(db: &Database, member: &NewMember, password: Option<&str>, cost: u32) -> Result<Member> {
    let password = validate_registration(member, password)?;
    register_hashed(db, member, &hash_password(password, cost)?)
}

/// Replaces the password of `email` if `old_password` still matches.
pub fn rotate(
    db: &Database,
    email: &str,
    old_password: &str,
    new_password: &str,
    cost: u32,
) -> Result<Rotation> {
    let current = Challenge::Hash(stored_hash(db, email)?);
    if check_password(old_password, &current)? == Verification::Invalid {
        info!(email, "password rotation rejected");
        return Ok(Rotation::Rejected);
    }
    let rows = store_rotation(db, email, &hash_password(new_password, cost)?)?;
    Ok(Rotation::Rotated(rows))
}
