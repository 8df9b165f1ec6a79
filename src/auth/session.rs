use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::auth::credentials::{self, check_secret, required};
use crate::db::models::User;
use crate::ids::IdClock;
use crate::storage::{Repository, RepositoryError, Snapshot};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No active session")]
    NoActiveSession,

    #[error("{0}")]
    Invalid(String),

    #[error("Current password does not match")]
    WrongPassword,

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub admin_username: String,
    pub admin_password: String,
    pub bcrypt_cost: u32,
    /// Artificial delay applied to every mutating call while the store is locked.
    pub latency: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password: "admin1234".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            latency: Duration::ZERO,
        }
    }
}

/// Fields of the resident user that a profile edit may replace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
}

/// Holds the single signed-in user of this board.
///
/// Login does not check the secret against any stored account: every
/// well-formed login becomes a fresh identity, and only the configured admin
/// pair yields `is_admin`. All writes run under one lock, including the
/// optional simulated latency, so at most one mutation is in flight.
pub struct SessionStore {
    user: Mutex<Option<User>>,
    repo: Repository<User>,
    ids: Arc<IdClock>,
    settings: SessionSettings,
}

impl SessionStore {
    pub async fn open(
        repo: Repository<User>,
        ids: Arc<IdClock>,
        settings: SessionSettings,
    ) -> Result<Self, RepositoryError> {
        let user = match repo.load_snapshot().await? {
            Snapshot::Found(user) => {
                ids.observe(user.id);
                tracing::info!("Restored session for {}", user.username);
                Some(user)
            }
            Snapshot::Missing => None,
            Snapshot::Corrupt(reason) => {
                tracing::warn!("Discarding unreadable session snapshot: {}", reason);
                repo.clear().await?;
                None
            }
        };

        Ok(Self {
            user: Mutex::new(user),
            repo,
            ids,
            settings,
        })
    }

    pub async fn current(&self) -> Option<User> {
        self.user.lock().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.user.lock().await.is_some()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, SessionError> {
        let mut resident = self.user.lock().await;
        self.settle().await;

        let handle = required("Username", username).map_err(SessionError::Invalid)?;
        check_secret(password).map_err(SessionError::Invalid)?;

        let is_admin =
            username == self.settings.admin_username && password == self.settings.admin_password;

        let user = User {
            id: self.ids.next_id(),
            name: None,
            username: handle.to_string(),
            password_hash: Some(credentials::hash_secret(password, self.settings.bcrypt_cost)?),
            is_admin,
        };

        self.repo.save(&user).await?;
        tracing::info!(user_id = user.id, is_admin, "Logged in as {}", user.username);
        *resident = Some(user.clone());
        Ok(user)
    }

    /// Registration never grants admin and does not check for duplicate handles.
    pub async fn register(
        &self,
        name: &str,
        username: &str,
        password: &str,
    ) -> Result<User, SessionError> {
        let mut resident = self.user.lock().await;
        self.settle().await;

        let name = required("Name", name).map_err(SessionError::Invalid)?;
        let handle = required("Username", username).map_err(SessionError::Invalid)?;
        check_secret(password).map_err(SessionError::Invalid)?;

        let user = User {
            id: self.ids.next_id(),
            name: Some(name.to_string()),
            username: handle.to_string(),
            password_hash: Some(credentials::hash_secret(password, self.settings.bcrypt_cost)?),
            is_admin: false,
        };

        self.repo.save(&user).await?;
        tracing::info!(user_id = user.id, "Registered {}", user.username);
        *resident = Some(user.clone());
        Ok(user)
    }

    /// Clearing an empty session is not an error.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let mut resident = self.user.lock().await;
        self.settle().await;

        self.repo.clear().await?;
        if let Some(user) = resident.take() {
            tracing::info!(user_id = user.id, "Logged out {}", user.username);
        }
        Ok(())
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, SessionError> {
        let mut resident = self.user.lock().await;
        self.settle().await;

        let mut user = resident.clone().ok_or(SessionError::NoActiveSession)?;
        if let Some(name) = update.name.as_deref() {
            user.name = Some(required("Name", name).map_err(SessionError::Invalid)?.to_string());
        }
        if let Some(username) = update.username.as_deref() {
            user.username = required("Username", username)
                .map_err(SessionError::Invalid)?
                .to_string();
        }

        self.repo.save(&user).await?;
        tracing::debug!(user_id = user.id, "Profile updated");
        *resident = Some(user.clone());
        Ok(user)
    }

    /// Replace the secret after checking the current one against the stored hash.
    pub async fn change_password(
        &self,
        current: &str,
        new_password: &str,
    ) -> Result<User, SessionError> {
        let mut resident = self.user.lock().await;
        self.settle().await;

        let mut user = resident.clone().ok_or(SessionError::NoActiveSession)?;
        // A record without a hash cannot prove the current secret
        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| credentials::verify_secret(current, hash));
        if !verified {
            return Err(SessionError::WrongPassword);
        }
        check_secret(new_password).map_err(SessionError::Invalid)?;

        user.password_hash = Some(credentials::hash_secret(
            new_password,
            self.settings.bcrypt_cost,
        )?);

        self.repo.save(&user).await?;
        tracing::info!(user_id = user.id, "Password changed");
        *resident = Some(user.clone());
        Ok(user)
    }

    pub async fn delete_account(&self) -> Result<(), SessionError> {
        let mut resident = self.user.lock().await;
        self.settle().await;

        let user = resident.clone().ok_or(SessionError::NoActiveSession)?;
        self.repo.clear().await?;
        *resident = None;
        tracing::info!(user_id = user.id, "Deleted account {}", user.username);
        Ok(())
    }

    async fn settle(&self) {
        if !self.settings.latency.is_zero() {
            tokio::time::sleep(self.settings.latency).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, SnapshotBackend, USER_KEY};

    fn fast_settings() -> SessionSettings {
        SessionSettings {
            bcrypt_cost: 4,
            ..SessionSettings::default()
        }
    }

    async fn open_store(backend: Arc<MemoryBackend>) -> SessionStore {
        SessionStore::open(
            Repository::new(backend, USER_KEY),
            Arc::new(IdClock::new()),
            fast_settings(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn admin_pair_grants_admin() {
        let store = open_store(Arc::new(MemoryBackend::new())).await;

        let admin = store.login("admin", "admin1234").await.unwrap();
        assert!(admin.is_admin);

        let other = store.login("admin", "admin12345").await.unwrap();
        assert!(!other.is_admin);
        assert_ne!(admin.id, other.id);
    }

    #[tokio::test]
    async fn any_login_succeeds_as_fresh_identity() {
        let store = open_store(Arc::new(MemoryBackend::new())).await;

        let first = store.login("kim", "secret").await.unwrap();
        let second = store.login("kim", "another").await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.current().await, Some(second));
    }

    #[tokio::test]
    async fn login_persists_hash_not_plaintext() {
        let backend = Arc::new(MemoryBackend::new());
        let store = open_store(backend.clone()).await;

        store.login("kim", "secret").await.unwrap();

        let blob = backend.get(USER_KEY).await.unwrap().unwrap();
        assert!(!blob.contains("secret"));
        assert!(blob.contains("passwordHash"));
    }

    #[tokio::test]
    async fn login_validates_fields() {
        let store = open_store(Arc::new(MemoryBackend::new())).await;

        assert!(matches!(
            store.login("  ", "secret").await,
            Err(SessionError::Invalid(_))
        ));
        assert!(matches!(
            store.login("kim", "abc").await,
            Err(SessionError::Invalid(_))
        ));
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn register_is_never_admin() {
        let store = open_store(Arc::new(MemoryBackend::new())).await;

        let user = store.register("Admin", "admin", "admin1234").await.unwrap();
        assert!(!user.is_admin);
        assert_eq!(user.name.as_deref(), Some("Admin"));
    }

    #[tokio::test]
    async fn session_survives_reopen() {
        let backend = Arc::new(MemoryBackend::new());
        let user = open_store(backend.clone())
            .await
            .register("Lee", "lee", "pass1")
            .await
            .unwrap();

        let reopened = open_store(backend).await;
        assert_eq!(reopened.current().await, Some(user));
    }

    #[tokio::test]
    async fn corrupt_snapshot_starts_signed_out() {
        let backend = Arc::new(MemoryBackend::with_entries([(USER_KEY, "{\"id\":")]));
        let store = open_store(backend.clone()).await;

        assert!(!store.is_authenticated().await);
        assert!(backend.get(USER_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_changes_require_a_session() {
        let store = open_store(Arc::new(MemoryBackend::new())).await;

        assert!(matches!(
            store.update_profile(ProfileUpdate::default()).await,
            Err(SessionError::NoActiveSession)
        ));
        assert!(matches!(
            store.change_password("old1", "new1").await,
            Err(SessionError::NoActiveSession)
        ));
        assert!(matches!(
            store.delete_account().await,
            Err(SessionError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn update_profile_merges_supplied_fields() {
        let store = open_store(Arc::new(MemoryBackend::new())).await;
        let user = store.register("Lee", "lee", "pass1").await.unwrap();

        let updated = store
            .update_profile(ProfileUpdate {
                name: Some("Lee Jay".into()),
                username: None,
            })
            .await
            .unwrap();

        assert_eq!(updated.id, user.id);
        assert_eq!(updated.name.as_deref(), Some("Lee Jay"));
        assert_eq!(updated.username, "lee");

        assert!(matches!(
            store
                .update_profile(ProfileUpdate {
                    name: None,
                    username: Some(" ".into()),
                })
                .await,
            Err(SessionError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn change_password_rejects_record_without_hash() {
        // Older snapshots kept the secret in a plaintext `password` field
        let legacy = r#"{"id":7,"username":"lee","password":"pass1","isAdmin":false}"#;
        let backend = Arc::new(MemoryBackend::with_entries([(USER_KEY, legacy)]));
        let store = open_store(backend).await;
        assert!(store.is_authenticated().await);

        for current in ["totally-wrong", "pass1"] {
            assert!(matches!(
                store.change_password(current, "newpass").await,
                Err(SessionError::WrongPassword)
            ));
        }
        assert!(store.current().await.unwrap().password_hash.is_none());
    }

    #[tokio::test]
    async fn change_password_checks_current_secret() {
        let store = open_store(Arc::new(MemoryBackend::new())).await;
        store.register("Lee", "lee", "pass1").await.unwrap();

        assert!(matches!(
            store.change_password("wrong", "pass2").await,
            Err(SessionError::WrongPassword)
        ));

        let user = store.change_password("pass1", "pass2").await.unwrap();
        let hash = user.password_hash.unwrap();
        assert!(credentials::verify_secret("pass2", &hash));
        assert!(!credentials::verify_secret("pass1", &hash));
    }

    #[tokio::test]
    async fn logout_and_delete_clear_the_snapshot() {
        let backend = Arc::new(MemoryBackend::new());
        let store = open_store(backend.clone()).await;

        store.login("kim", "secret").await.unwrap();
        store.logout().await.unwrap();
        assert!(store.current().await.is_none());
        assert!(backend.get(USER_KEY).await.unwrap().is_none());
        store.logout().await.unwrap();

        store.login("kim", "secret").await.unwrap();
        store.delete_account().await.unwrap();
        assert!(store.current().await.is_none());
        assert!(backend.get(USER_KEY).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_latency_serializes_writes() {
        let store = Arc::new(
            SessionStore::open(
                Repository::new(Arc::new(MemoryBackend::new()), USER_KEY),
                Arc::new(IdClock::new()),
                SessionSettings {
                    latency: Duration::from_millis(1000),
                    ..fast_settings()
                },
            )
            .await
            .unwrap(),
        );

        let started = tokio::time::Instant::now();
        let a = tokio::spawn({
            let store = store.clone();
            async move { store.login("first", "secret").await }
        });
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.login("second", "secret").await }
        });
        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        // Two one-second writes can only finish after two seconds when they queue
        assert!(started.elapsed() >= Duration::from_millis(2000));
        let resident = store.current().await.unwrap();
        assert!(resident == a || resident == b);
    }
}
