//! User directory: profiles keyed by principal id.
//!
//! Credentials belong to the identity provider; this module only owns the
//! `users` collection. Creating a user touches both, deleting a user only
//! removes the profile.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::identity::normalize_email;
use crate::backend::{Direction, Document, DocumentStore, IdentityProvider, Query, USERS};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(Error::InvalidArgument(format!(
                "invalid role '{other}': must be admin or user"
            ))),
        }
    }
}

/// Profile stored per principal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Partial profile for merge-writes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none()
    }
}

#[derive(Clone)]
pub struct UserDirectory {
    identity: Arc<dyn IdentityProvider>,
    documents: Arc<dyn DocumentStore>,
}

impl UserDirectory {
    pub fn new(identity: Arc<dyn IdentityProvider>, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            identity,
            documents,
        }
    }

    /// Create credentials and the matching profile
    ///
    /// If anything fails after the account exists, the account is removed
    /// again so no credential is left without a profile.
    pub fn create(&self, email: &str, password: &str, name: &str, role: Role) -> Result<UserRecord> {
        let name = non_empty("name", name)?;
        let email = non_empty("email", email)?;

        let principal = self.identity.create_account(email, password)?;
        let record = UserRecord {
            id: principal.uid.clone(),
            name: name.to_string(),
            email: email.to_string(),
            role,
        };

        let written = self
            .identity
            .set_display_name(&principal.uid, name)
            .and_then(|()| self.write_profile(&record));

        if let Err(err) = written {
            tracing::warn!(uid = %principal.uid, error = %err, "profile write failed; removing account");
            if let Err(cleanup) = self.identity.delete_account(&principal.uid) {
                tracing::warn!(
                    uid = %principal.uid,
                    error = %cleanup,
                    "account cleanup failed; credential left without profile"
                );
            }
            return Err(err);
        }

        tracing::info!(uid = %record.id, role = %record.role, "user created");
        Ok(record)
    }

    /// Profile of the signed-in principal, if there is one
    pub fn read_current(&self) -> Result<Option<UserRecord>> {
        match self.identity.current()? {
            Some(principal) => self.get(&principal.uid),
            None => Ok(None),
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<UserRecord>> {
        self.documents
            .get(USERS, id)?
            .map(|snapshot| decode_profile(&snapshot.id, snapshot.data))
            .transpose()
    }

    pub fn list_all(&self) -> Result<Vec<UserRecord>> {
        let snapshots = self
            .documents
            .query(&Query::collection(USERS).order_by("name", Direction::Ascending))?;
        snapshots
            .into_iter()
            .map(|snapshot| decode_profile(&snapshot.id, snapshot.data))
            .collect()
    }

    /// Merge-write the supplied fields
    pub fn update(&self, id: &str, updates: &UserUpdate) -> Result<()> {
        if updates.is_empty() {
            return Err(Error::InvalidArgument("no fields to update".to_string()));
        }
        if let Some(name) = updates.name.as_deref() {
            non_empty("name", name)?;
        }
        let mut updates = updates.clone();
        if let Some(email) = updates.email.take() {
            let email = normalize_email(&email)?;
            self.ensure_email_free(id, &email)?;
            updates.email = Some(email);
        }

        let fields = to_document(&updates)?;
        self.documents
            .merge(USERS, id, fields)
            .map_err(|err| match err {
                Error::DocumentNotFound { .. } => Error::UserNotFound(id.to_string()),
                other => other,
            })?;
        tracing::info!(uid = id, "user updated");
        Ok(())
    }

    /// Remove the profile; the credential stays with the identity provider
    pub fn delete(&self, id: &str) -> Result<()> {
        self.documents.delete(USERS, id)?;
        tracing::info!(uid = id, "user profile deleted");
        Ok(())
    }

    /// Profile emails are unique across the directory, ignoring case
    fn ensure_email_free(&self, id: &str, email: &str) -> Result<()> {
        let taken = self
            .list_all()?
            .into_iter()
            .any(|user| user.id != id && user.email.eq_ignore_ascii_case(email));
        if taken {
            Err(Error::EmailInUse(email.to_string()))
        } else {
            Ok(())
        }
    }

    fn write_profile(&self, record: &UserRecord) -> Result<()> {
        self.documents.set(USERS, &record.id, to_document(record)?)
    }
}

fn decode_profile(id: &str, data: Document) -> Result<UserRecord> {
    let mut record: UserRecord = serde_json::from_value(serde_json::Value::Object(data))?;
    // The document id is authoritative over any stored copy.
    record.id = id.to_string();
    Ok(record)
}

pub(crate) fn to_document<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Error::OperationFailed(format!(
            "expected an object document, got {other}"
        ))),
    }
}

fn non_empty<'a>(label: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::InvalidArgument(format!("{label} cannot be empty")))
    } else {
        Ok(trimmed)
    }
}
