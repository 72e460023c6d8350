//! Backend collaborator: identity provider and document store.
//!
//! The directory and task stores only talk to these two traits. `local`
//! ships a file-backed implementation; a hosted service plugs in by
//! implementing the same traits.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

pub mod identity;
pub mod local;

pub use identity::LocalIdentity;
pub use local::LocalDocumentStore;

/// Collection holding profile documents, keyed by principal id
pub const USERS: &str = "users";

/// Collection holding task documents, keyed by generated id
pub const TASKS: &str = "tasks";

/// A stored document: field name to JSON value
pub type Document = Map<String, Value>;

/// A document together with its id, as returned by reads and queries
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub id: String,
    pub data: Document,
}

/// Authenticated identity issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// The document store's native timestamp representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanos: value.timestamp_subsec_nanos(),
        }
    }

    pub fn to_datetime(self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.seconds, self.nanos)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Parse a stored field value as a timestamp
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_value(self) -> Value {
        serde_json::json!({ "seconds": self.seconds, "nanos": self.nanos })
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}

/// Sort direction for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Collection scan with an optional equality filter and ordering
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filter: Option<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Self {
            collection: name.to_string(),
            filter: None,
            order_by: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filter = Some((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match &self.filter {
            Some((field, expected)) => doc.get(field) == Some(expected),
            None => true,
        }
    }

    /// Apply filter and ordering to an unordered scan
    pub fn apply(&self, mut docs: Vec<DocumentSnapshot>) -> Vec<DocumentSnapshot> {
        docs.retain(|snapshot| self.matches(&snapshot.data));
        if let Some((field, direction)) = &self.order_by {
            docs.sort_by(|left, right| {
                let ordering = compare_field(left.data.get(field), right.data.get(field))
                    .then_with(|| left.id.cmp(&right.id));
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        docs
    }
}

/// Order two field values; missing values sort first
fn compare_field(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(left), Some(right)) => compare_values(left, right),
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    if let (Some(left), Some(right)) = (Timestamp::from_value(left), Timestamp::from_value(right)) {
        return left.cmp(&right);
    }
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            let left = left.as_f64().unwrap_or(0.0);
            let right = right.as_f64().unwrap_or(0.0);
            left.partial_cmp(&right).unwrap_or(Ordering::Equal)
        }
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        _ => left.to_string().cmp(&right.to_string()),
    }
}

/// Document database seam
pub trait DocumentStore: Send + Sync {
    /// Point read
    fn get(&self, collection: &str, id: &str) -> Result<Option<DocumentSnapshot>>;

    /// Point write, replacing the whole document
    fn set(&self, collection: &str, id: &str, data: Document) -> Result<()>;

    /// Merge-write: only the supplied fields change; the document must exist
    fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<()>;

    /// Store a new document under a generated id
    fn add(&self, collection: &str, data: Document) -> Result<String>;

    /// Point delete; deleting a missing document is not an error
    fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Collection scan
    fn query(&self, query: &Query) -> Result<Vec<DocumentSnapshot>>;
}

/// Callback invoked with the current auth state
pub type AuthCallback = Arc<dyn Fn(Option<&Principal>) + Send + Sync>;

/// Identity provider seam
pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self, email: &str, password: &str) -> Result<Principal>;

    /// Create credentials; the caller's own session is left untouched
    fn create_account(&self, email: &str, password: &str) -> Result<Principal>;

    /// Remove credentials for `uid`
    fn delete_account(&self, uid: &str) -> Result<()>;

    fn sign_out(&self) -> Result<()>;

    fn set_display_name(&self, uid: &str, name: &str) -> Result<()>;

    /// Currently signed-in principal, if any
    fn current(&self) -> Result<Option<Principal>>;

    /// Deliver the current state now and every later sign-in/sign-out
    fn subscribe(&self, callback: AuthCallback) -> Result<Subscription>;
}

type ListenerList = Mutex<Vec<(u64, AuthCallback)>>;

/// Registry of auth-state listeners shared by identity implementations
#[derive(Default)]
pub struct AuthListeners {
    next_id: Mutex<u64>,
    listeners: Arc<ListenerList>,
}

impl AuthListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, returning its unsubscribe handle
    pub fn register(&self, callback: AuthCallback) -> Subscription {
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            *next += 1;
            *next
        };
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, callback));

        let weak: Weak<ListenerList> = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = weak.upgrade() {
                listeners
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .retain(|(entry, _)| *entry != id);
            }
        })
    }

    pub fn notify(&self, principal: Option<&Principal>) {
        // Snapshot so callbacks may unsubscribe without deadlocking.
        let callbacks: Vec<AuthCallback> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(principal);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unsubscribe handle; dropping it also unsubscribes
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
