//! File-backed identity provider.
//!
//! Credentials live in `identity/accounts.json` as Argon2id PHC strings.
//! The signed-in principal of this client is persisted in
//! `identity/session.json` so it survives across CLI invocations.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthCallback, AuthListeners, IdentityProvider, Principal, Subscription};
use crate::error::{Error, Result};
use crate::storage::Storage;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    uid: String,
    email: String,
    password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl Account {
    fn principal(&self) -> Principal {
        Principal {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    uid: String,
    signed_in_at: DateTime<Utc>,
}

pub struct LocalIdentity {
    storage: Storage,
    listeners: AuthListeners,
}

impl LocalIdentity {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            listeners: AuthListeners::new(),
        }
    }

    fn load_accounts(&self) -> Result<AccountsFile> {
        Ok(self
            .storage
            .read_json_opt(&self.storage.accounts_file())?
            .unwrap_or_default())
    }

    /// Read-modify-write the registry under its lock
    fn update_accounts<T>(&self, apply: impl FnOnce(&mut AccountsFile) -> Result<T>) -> Result<T> {
        let path = self.storage.accounts_file();
        let _lock = self.storage.lock(&path)?;
        let mut file: AccountsFile = self.storage.read_json_opt(&path)?.unwrap_or_default();
        let value = apply(&mut file)?;
        self.storage.write_json(&path, &file)?;
        Ok(value)
    }

    fn session_uid(&self) -> Result<Option<String>> {
        let record: Option<SessionRecord> =
            self.storage.read_json_opt(&self.storage.session_file())?;
        Ok(record.map(|record| record.uid))
    }

    fn clear_session(&self) -> Result<bool> {
        let path = self.storage.session_file();
        let _lock = self.storage.lock(&path)?;
        self.storage.remove_file(&path)
    }
}

impl IdentityProvider for LocalIdentity {
    fn sign_in(&self, email: &str, password: &str) -> Result<Principal> {
        let email = normalize_email(email)?;
        let accounts = self.load_accounts()?;
        let account = accounts
            .accounts
            .iter()
            .find(|account| account.email.eq_ignore_ascii_case(&email))
            .ok_or(Error::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash)? {
            tracing::debug!(email = %email, "sign-in rejected");
            return Err(Error::InvalidCredentials);
        }

        let record = SessionRecord {
            uid: account.uid.clone(),
            signed_in_at: Utc::now(),
        };
        self.storage
            .write_json_locked(&self.storage.session_file(), &record)?;

        let principal = account.principal();
        tracing::info!(uid = %principal.uid, "signed in");
        self.listeners.notify(Some(&principal));
        Ok(principal)
    }

    fn create_account(&self, email: &str, password: &str) -> Result<Principal> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::InvalidArgument(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let password_hash = hash_password(password)?;

        let account = self.update_accounts(|file| {
            if file
                .accounts
                .iter()
                .any(|account| account.email.eq_ignore_ascii_case(&email))
            {
                return Err(Error::EmailInUse(email.clone()));
            }
            let account = Account {
                uid: Uuid::new_v4().simple().to_string(),
                email: email.clone(),
                password_hash,
                display_name: None,
                created_at: Utc::now(),
            };
            file.accounts.push(account.clone());
            Ok(account)
        })?;

        tracing::info!(uid = %account.uid, "account created");
        Ok(account.principal())
    }

    fn delete_account(&self, uid: &str) -> Result<()> {
        let removed = self.update_accounts(|file| {
            let before = file.accounts.len();
            file.accounts.retain(|account| account.uid != uid);
            Ok(before != file.accounts.len())
        })?;
        tracing::info!(uid, removed, "account deleted");

        if self.session_uid()?.as_deref() == Some(uid) {
            self.clear_session()?;
            self.listeners.notify(None);
        }
        Ok(())
    }

    fn sign_out(&self) -> Result<()> {
        let cleared = self.clear_session()?;
        tracing::info!(cleared, "signed out");
        self.listeners.notify(None);
        Ok(())
    }

    fn set_display_name(&self, uid: &str, name: &str) -> Result<()> {
        self.update_accounts(|file| {
            let account = file
                .accounts
                .iter_mut()
                .find(|account| account.uid == uid)
                .ok_or_else(|| Error::UserNotFound(uid.to_string()))?;
            account.display_name = Some(name.to_string());
            Ok(())
        })
    }

    fn current(&self) -> Result<Option<Principal>> {
        let Some(uid) = self.session_uid()? else {
            return Ok(None);
        };
        let accounts = self.load_accounts()?;
        Ok(accounts
            .accounts
            .iter()
            .find(|account| account.uid == uid)
            .map(Account::principal))
    }

    fn subscribe(&self, callback: AuthCallback) -> Result<Subscription> {
        let current = self.current()?;
        callback(current.as_ref());
        let subscription = self.listeners.register(callback);
        tracing::debug!(listeners = self.listeners.len(), "auth listener registered");
        Ok(subscription)
    }
}

/// Trim and check the address shape shared by accounts and profiles
pub(crate) fn normalize_email(email: &str) -> Result<String> {
    let trimmed = email.trim();
    let valid = trimmed
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
        && !trimmed.chars().any(char::is_whitespace);
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(Error::InvalidArgument(format!("invalid email '{trimmed}'")))
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| Error::Hashing(err.to_string()))
}

fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|err| Error::Hashing(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::sync::{Arc, Mutex};

    fn identity(dir: &std::path::Path) -> LocalIdentity {
        let storage = Storage::new(dir.to_path_buf(), &Config::default());
        storage.init().expect("init");
        LocalIdentity::new(storage)
    }

    #[test]
    fn create_then_sign_in() {
        let dir = tempfile::tempdir().expect("tempdir");
        let identity = identity(dir.path());

        let created = identity
            .create_account("ada@example.com", "secret1")
            .expect("create");
        assert!(identity.current().expect("current").is_none());

        let signed_in = identity
            .sign_in("ADA@example.com", "secret1")
            .expect("sign in");
        assert_eq!(signed_in.uid, created.uid);
        assert_eq!(identity.current().expect("current"), Some(signed_in));

        identity.sign_out().expect("sign out");
        assert!(identity.current().expect("current").is_none());
    }

    #[test]
    fn passwords_are_hashed_at_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let identity = identity(dir.path());
        identity
            .create_account("ada@example.com", "secret1")
            .expect("create");

        let raw = std::fs::read_to_string(identity.storage.accounts_file()).expect("read");
        assert!(!raw.contains("secret1"));
        assert!(raw.contains("$argon2"));
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let dir = tempfile::tempdir().expect("tempdir");
        let identity = identity(dir.path());
        identity
            .create_account("ada@example.com", "secret1")
            .expect("create");

        assert!(matches!(
            identity.sign_in("ada@example.com", "wrong!!"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            identity.sign_in("bob@example.com", "secret1"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn duplicate_email_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let identity = identity(dir.path());
        identity
            .create_account("ada@example.com", "secret1")
            .expect("create");
        assert!(matches!(
            identity.create_account("Ada@Example.com", "secret2"),
            Err(Error::EmailInUse(_))
        ));
    }

    #[test]
    fn weak_password_and_bad_email_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let identity = identity(dir.path());
        assert!(matches!(
            identity.create_account("ada@example.com", "123"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            identity.create_account("not-an-email", "secret1"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn delete_account_ends_its_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let identity = identity(dir.path());
        let created = identity
            .create_account("ada@example.com", "secret1")
            .expect("create");
        identity.sign_in("ada@example.com", "secret1").expect("sign in");

        identity.delete_account(&created.uid).expect("delete");
        assert!(identity.current().expect("current").is_none());
        assert!(matches!(
            identity.sign_in("ada@example.com", "secret1"),
            Err(Error::InvalidCredentials)
        ));
    }

    #[test]
    fn subscribe_sees_initial_state_and_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let identity = identity(dir.path());
        identity
            .create_account("ada@example.com", "secret1")
            .expect("create");

        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = identity
            .subscribe(Arc::new(move |principal: Option<&Principal>| {
                sink.lock()
                    .expect("lock")
                    .push(principal.map(|p| p.email.clone()));
            }))
            .expect("subscribe");

        identity.sign_in("ada@example.com", "secret1").expect("sign in");
        identity.sign_out().expect("sign out");
        subscription.unsubscribe();
        identity.sign_in("ada@example.com", "secret1").expect("sign in again");

        let seen = seen.lock().expect("lock").clone();
        assert_eq!(
            seen,
            vec![None, Some("ada@example.com".to_string()), None]
        );
    }

    #[test]
    fn display_name_is_reported_on_principal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let identity = identity(dir.path());
        let created = identity
            .create_account("ada@example.com", "secret1")
            .expect("create");
        identity
            .set_display_name(&created.uid, "Ada Lovelace")
            .expect("display name");

        let principal = identity.sign_in("ada@example.com", "secret1").expect("sign in");
        assert_eq!(principal.display_name.as_deref(), Some("Ada Lovelace"));
    }
}
