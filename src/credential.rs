//! API key storage and change subscription.
//!
//! The key lives in the OS keychain (`keyring`), unless `GEMINI_API_KEY`
//! is set in the environment, which takes precedence at start-up.
//! Every change made through [`CredentialStore::set_api_key`] is published
//! on a `watch` channel; the pipeline reads the latest value at the start
//! of each session and never caches it across sessions.

use std::fmt;
use std::sync::Mutex;
use tokio::sync::watch;

pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
const KEYRING_SERVICE: &str = "latexscan";
const KEYRING_USER: &str = "gemini_api_key";

/// A configured API key. Non-empty by construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns `None` for empty (or whitespace-only) input.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars>)", self.0.len())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Keychain error: {0}")]
    Keychain(String),
}

/// Where the API key is persisted between runs.
pub trait SecretBackend: Send + Sync {
    fn read(&self) -> Result<Option<String>, CredentialError>;
    fn write(&self, secret: &str) -> Result<(), CredentialError>;
    fn clear(&self) -> Result<(), CredentialError>;
}

/// OS keychain entry `latexscan / gemini_api_key`.
pub struct KeyringBackend {
    service: String,
    user: String,
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
            user: KEYRING_USER.to_string(),
        }
    }
}

impl KeyringBackend {
    fn entry(&self) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, &self.user)
            .map_err(|e| CredentialError::Keychain(e.to_string()))
    }
}

impl SecretBackend for KeyringBackend {
    fn read(&self) -> Result<Option<String>, CredentialError> {
        match self.entry()?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CredentialError::Keychain(e.to_string())),
        }
    }

    fn write(&self, secret: &str) -> Result<(), CredentialError> {
        self.entry()?
            .set_password(secret)
            .map_err(|e| CredentialError::Keychain(e.to_string()))
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CredentialError::Keychain(e.to_string())),
        }
    }
}

/// Process-local storage, for tests and for keys supplied via environment.
#[derive(Default)]
pub struct MemoryBackend {
    secret: Mutex<Option<String>>,
}

impl SecretBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.secret.lock().map_err(poisoned)?.clone())
    }

    fn write(&self, secret: &str) -> Result<(), CredentialError> {
        *self.secret.lock().map_err(poisoned)? = Some(secret.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.secret.lock().map_err(poisoned)? = None;
        Ok(())
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> CredentialError {
    CredentialError::Keychain(e.to_string())
}

/// Owner of the current API key. Cheap to share behind an `Arc`.
pub struct CredentialStore {
    backend: Box<dyn SecretBackend>,
    tx: watch::Sender<Option<Credential>>,
}

impl CredentialStore {
    /// Open the store, seeding it from `env_override` or the backend.
    ///
    /// A backend read failure is logged and treated as "not configured"
    /// so the app still starts and the user can enter a key.
    pub fn open(backend: Box<dyn SecretBackend>, env_override: Option<String>) -> Self {
        let initial = match env_override.and_then(Credential::new) {
            Some(credential) => {
                log::info!("[CREDENTIAL] Using API key from {}", ENV_API_KEY);
                Some(credential)
            }
            None => match backend.read() {
                Ok(secret) => secret.and_then(Credential::new),
                Err(e) => {
                    log::warn!("[CREDENTIAL] Could not read stored key: {}", e);
                    None
                }
            },
        };

        log::info!(
            "[CREDENTIAL] API key {}",
            if initial.is_some() { "configured" } else { "not configured" }
        );

        let (tx, _rx) = watch::channel(initial);
        Self { backend, tx }
    }

    /// Keychain-backed store honouring `GEMINI_API_KEY`.
    pub fn from_environment() -> Self {
        Self::open(
            Box::new(KeyringBackend::default()),
            std::env::var(ENV_API_KEY).ok(),
        )
    }

    /// In-memory store holding `secret`, mostly for tests.
    pub fn in_memory(secret: Option<&str>) -> Self {
        let backend = MemoryBackend::default();
        if let Some(secret) = secret {
            // MemoryBackend::write cannot fail on a fresh mutex.
            let _ = backend.write(secret);
        }
        Self::open(Box::new(backend), None)
    }

    pub fn current(&self) -> Option<Credential> {
        self.tx.borrow().clone()
    }

    pub fn is_configured(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Receiver that observes every later key change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.tx.subscribe()
    }

    /// Persist a new key (empty input removes it) and notify subscribers.
    ///
    /// Returns whether a key is configured afterwards.
    pub fn set_api_key(&self, raw: &str) -> Result<bool, CredentialError> {
        let credential = Credential::new(raw);
        match &credential {
            Some(c) => self.backend.write(c.expose())?,
            None => self.backend.clear()?,
        }

        let configured = credential.is_some();
        self.tx.send_replace(credential);
        log::info!(
            "[CREDENTIAL] API key {}",
            if configured { "updated" } else { "cleared" }
        );
        Ok(configured)
    }
}
