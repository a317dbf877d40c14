//! Key-value session persistence: the signed-in user record and API token.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use shared::domain::Session;
use thiserror::Error;
use tracing::debug;

pub const USER_KEY: &str = "user";
pub const JWT_KEY: &str = "jwt";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session record under `{key}` is not a valid user record: {source}")]
    Malformed {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to encode session file {path}: {source}")]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write session file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
}

/// Reads the `"user"` record. `Ok(None)` means nobody is signed in.
pub fn load_session(store: &dyn SessionStore) -> Result<Option<Session>, SessionError> {
    let Some(raw) = store.get(USER_KEY) else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| SessionError::Malformed {
            key: USER_KEY,
            source,
        })
}

pub fn store_session(store: &dyn SessionStore, session: &Session) -> Result<(), SessionError> {
    let raw = serde_json::to_string(session).map_err(|source| SessionError::Malformed {
        key: USER_KEY,
        source,
    })?;
    store.set(USER_KEY, &raw)
}

#[derive(Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: &Session) -> Self {
        let store = Self::new();
        if let Ok(raw) = serde_json::to_string(session) {
            store.values().insert(USER_KEY.to_string(), raw);
        }
        store
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Session values kept as a flat JSON object on disk.
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> HashMap<String, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "session file unreadable");
                return HashMap::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            debug!(path = %self.path.display(), error = %err, "session file is not a JSON object");
            HashMap::new()
        })
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read_all();
        values.insert(key.to_string(), value.to_string());

        let encoded =
            serde_json::to_string_pretty(&values).map_err(|source| SessionError::Encode {
                path: self.path.clone(),
                source,
            })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SessionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, encoded).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
