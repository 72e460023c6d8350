//! Application context shared by every command.
//!
//! Built once per process: config, storage, the two backend handles, the
//! directory and task stores on top of them, and the live session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::access::{authorize, Access, Route};
use crate::backend::{DocumentStore, IdentityProvider, LocalDocumentStore, LocalIdentity};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::storage::Storage;
use crate::task::TaskStore;
use crate::user::{Role, UserDirectory, UserRecord};

pub struct AppContext {
    pub root: PathBuf,
    pub config: Config,
    pub storage: Storage,
    pub identity: Arc<dyn IdentityProvider>,
    pub documents: Arc<dyn DocumentStore>,
    pub users: UserDirectory,
    pub tasks: TaskStore,
    pub session: Session,
}

impl AppContext {
    /// Open an initialized workspace
    pub fn open(root: &Path) -> Result<Self> {
        let config = Config::load_from_root(root)?;
        let storage = Storage::new(root.to_path_buf(), &config);
        storage.ensure_initialized()?;
        Self::assemble(root, config, storage)
    }

    /// Open a workspace, creating the data layout if it is missing
    pub fn create(root: &Path) -> Result<(Self, bool)> {
        let config = Config::load_from_root(root)?;
        let storage = Storage::new(root.to_path_buf(), &config);
        let created = storage.init()?;
        let ctx = Self::assemble(root, config, storage)?;
        Ok((ctx, created))
    }

    fn assemble(root: &Path, config: Config, storage: Storage) -> Result<Self> {
        tracing::debug!(root = %root.display(), data_dir = %storage.data_dir().display(), "opening workspace");
        let identity: Arc<dyn IdentityProvider> = Arc::new(LocalIdentity::new(storage.clone()));
        let documents: Arc<dyn DocumentStore> = Arc::new(LocalDocumentStore::new(storage.clone()));
        let users = UserDirectory::new(Arc::clone(&identity), Arc::clone(&documents));
        let tasks = TaskStore::new(Arc::clone(&documents));
        let session = Session::start(identity.as_ref())?;

        Ok(Self {
            root: root.to_path_buf(),
            config,
            storage,
            identity,
            documents,
            users,
            tasks,
            session,
        })
    }

    /// Profile of the session's principal, if any
    pub fn current_profile(&self) -> Result<Option<UserRecord>> {
        match self.session.principal() {
            Some(principal) => self.users.get(&principal.uid),
            None => Ok(None),
        }
    }

    /// Run the access guard, turning a redirect into a policy error
    pub fn require(&self, role: Option<Role>) -> Result<UserRecord> {
        let profile = self.current_profile()?;
        match (authorize(profile.as_ref(), role), profile) {
            (Access::Allowed, Some(profile)) => Ok(profile),
            (Access::RedirectTo(Route::SignIn), _) | (Access::Allowed, None) => {
                Err(Error::NotSignedIn)
            }
            (Access::RedirectTo(route), _) => Err(Error::Redirected {
                required: role.map(|role| role.as_str().to_string()).unwrap_or_default(),
                route,
            }),
        }
    }

    pub fn unknown_assignee(&self) -> &str {
        &self.config.tasks.unknown_assignee
    }

    pub fn shutdown(mut self) {
        self.session.shutdown();
    }
}
