use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::{
    db::Store,
    error::AppError,
    models::admin::{LoginResponse, SessionRecord},
    services::metrics::ADMIN_LOGINS_COUNTER,
};

/// Session tokens are 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Only digests are persisted, so a leaked table cannot be replayed.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub struct AuthService;

impl AuthService {
    /// Creates the bootstrap admin account if it does not exist yet.
    pub async fn ensure_default_admin(
        store: &dyn Store,
        username: &str,
        password: &str,
        bcrypt_cost: u32,
    ) -> Result<bool, AppError> {
        if store.find_admin(username).await?.is_some() {
            return Ok(false);
        }
        let hash = bcrypt::hash(password, bcrypt_cost)
            .map_err(|e| AppError::Storage(anyhow::anyhow!("bcrypt hash failed: {e}")))?;
        store.insert_admin(username, &hash).await?;
        tracing::info!("Default admin user created (username: {username})");
        Ok(true)
    }

    pub async fn login(
        store: &dyn Store,
        username: Option<&str>,
        password: Option<&str>,
        ttl_hours: i64,
    ) -> Result<LoginResponse, AppError> {
        let (username, password) = match (username, password) {
            (Some(u), Some(p)) if !u.trim().is_empty() && !p.is_empty() => (u.trim(), p),
            _ => return Err(AppError::validation("Username and password are required")),
        };

        let admin = match store.find_admin(username).await? {
            Some(admin) => admin,
            None => {
                tracing::warn!("Admin login failed: unknown username {username}");
                ADMIN_LOGINS_COUNTER.with_label_values(&["failed"]).inc();
                return Err(AppError::InvalidCredentials);
            }
        };

        let valid = bcrypt::verify(password, &admin.password_hash).unwrap_or(false);
        if !valid {
            tracing::warn!("Admin login failed: invalid password for {username}");
            ADMIN_LOGINS_COUNTER.with_label_values(&["failed"]).inc();
            return Err(AppError::InvalidCredentials);
        }

        let token = generate_token();
        let now = Utc::now();
        let expires_at = now + Duration::hours(ttl_hours);
        store
            .insert_session(admin.id, &hash_token(&token), expires_at)
            .await?;

        let purged = store.purge_expired_sessions(Some(admin.id), now).await?;
        if purged > 0 {
            tracing::debug!(admin_id = admin.id, purged, "expired sessions removed");
        }

        ADMIN_LOGINS_COUNTER.with_label_values(&["success"]).inc();
        tracing::info!("Admin login successful for {}", admin.username);

        Ok(LoginResponse {
            success: true,
            token,
            username: admin.username,
            expires_at,
        })
    }

    /// Resolves a bearer token to its session. Unknown and expired tokens fail closed.
    pub async fn authenticate(store: &dyn Store, token: &str) -> Result<SessionRecord, AppError> {
        let session = store
            .find_session(&hash_token(token))
            .await?
            .ok_or(AppError::InvalidSession)?;
        if session.expires_at <= Utc::now() {
            return Err(AppError::InvalidSession);
        }
        Ok(session)
    }

    pub async fn logout(store: &dyn Store, token: &str) -> Result<(), AppError> {
        store.delete_session(&hash_token(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    async fn store_with_admin() -> MemoryStore {
        let store = MemoryStore::new();
        AuthService::ensure_default_admin(&store, "admin", "admin123", 4)
            .await
            .unwrap();
        store
    }

    #[test]
    fn tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_ne!(hash_token(&a), a);
        assert_eq!(hash_token(&a), hash_token(&a));
    }

    #[tokio::test]
    async fn default_admin_is_created_once() {
        let store = store_with_admin().await;
        assert!(!AuthService::ensure_default_admin(&store, "admin", "other", 4)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn login_issues_session_usable_until_logout() {
        let store = store_with_admin().await;
        let login = AuthService::login(&store, Some("admin"), Some("admin123"), 24)
            .await
            .unwrap();
        assert!(login.success);
        assert!(login.expires_at > Utc::now());

        let session = AuthService::authenticate(&store, &login.token).await.unwrap();
        assert_eq!(session.username, "admin");

        AuthService::logout(&store, &login.token).await.unwrap();
        assert!(matches!(
            AuthService::authenticate(&store, &login.token).await,
            Err(AppError::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let store = store_with_admin().await;
        let wrong = AuthService::login(&store, Some("admin"), Some("nope"), 24).await;
        let unknown = AuthService::login(&store, Some("root"), Some("admin123"), 24).await;
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AppError::InvalidCredentials)));
        assert!(matches!(
            AuthService::login(&store, Some("admin"), None, 24).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn expired_sessions_fail_closed() {
        let store = store_with_admin().await;
        let admin = store.find_admin("admin").await.unwrap().unwrap();
        let token = generate_token();
        store
            .insert_session(admin.id, &hash_token(&token), Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        assert!(store.find_session(&hash_token(&token)).await.unwrap().is_some());
        assert!(matches!(
            AuthService::authenticate(&store, &token).await,
            Err(AppError::InvalidSession)
        ));
    }
}
