use rand::Rng;

use crate::{
    db::Store,
    error::AppError,
    models::imam::{CreateImamRequest, Imam, ImamProfile, NewImam},
    services::{
        metrics::{status_label, ACCESS_CODE_CHECKS_COUNTER, IMAMS_CREATED_COUNTER},
        quota::validate_quota,
    },
};

/// Attempts at finding an unused access code before giving up.
pub const MAX_CODE_ATTEMPTS: usize = 100;

/// Random 6-digit code, never starting with 0.
pub fn random_access_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    code.to_string()
}

pub struct ImamService;

impl ImamService {
    pub async fn list(store: &dyn Store) -> Result<Vec<Imam>, AppError> {
        store.list_imams().await
    }

    pub async fn list_public(store: &dyn Store) -> Result<Vec<ImamProfile>, AppError> {
        let imams = store.list_imams().await?;
        Ok(imams.into_iter().map(ImamProfile::from).collect())
    }

    pub async fn create(store: &dyn Store, req: &CreateImamRequest) -> Result<Imam, AppError> {
        Self::create_with(store, req, random_access_code).await
    }

    /// Like [`ImamService::create`] with a caller-supplied code generator.
    pub async fn create_with<F>(
        store: &dyn Store,
        req: &CreateImamRequest,
        mut next_code: F,
    ) -> Result<Imam, AppError>
    where
        F: FnMut() -> String + Send,
    {
        let name = req
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::validation("Name and quota are required"))?;
        let quota = validate_quota(req.quota)?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let access_code = next_code();
            if store.access_code_exists(&access_code).await? {
                continue;
            }
            let new = NewImam {
                name: name.to_string(),
                access_code,
                quota,
            };
            // None means another request claimed the code between check and insert.
            if let Some(imam) = store.insert_imam(&new).await? {
                IMAMS_CREATED_COUNTER.inc();
                tracing::info!(imam_id = imam.id, quota, "imam created");
                return Ok(imam);
            }
        }

        tracing::error!("no unused access code after {MAX_CODE_ATTEMPTS} attempts");
        Err(AppError::CodeGenerationExhausted)
    }

    pub async fn delete(store: &dyn Store, id: i64) -> Result<(), AppError> {
        if !store.delete_imam(id).await? {
            return Err(AppError::NotFound("Imam"));
        }
        tracing::info!(imam_id = id, "imam deleted with their bookings");
        Ok(())
    }

    pub async fn verify_access_code(
        store: &dyn Store,
        access_code: Option<&str>,
    ) -> Result<ImamProfile, AppError> {
        let result = Self::lookup_code(store, access_code).await;
        ACCESS_CODE_CHECKS_COUNTER
            .with_label_values(&[status_label(&result)])
            .inc();
        result
    }

    async fn lookup_code(store: &dyn Store, access_code: Option<&str>) -> Result<ImamProfile, AppError> {
        let code = access_code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::validation("Access code is required"))?;
        store
            .find_imam_by_code(code)
            .await?
            .map(ImamProfile::from)
            .ok_or(AppError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn request(name: &str, quota: i64) -> CreateImamRequest {
        CreateImamRequest {
            name: Some(name.to_string()),
            quota: Some(quota),
        }
    }

    #[test]
    fn random_codes_are_six_digits() {
        for _ in 0..1000 {
            let code = random_access_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn same_name_twice_gets_distinct_codes() {
        let store = MemoryStore::new();
        let first = ImamService::create(&store, &request("Ali", 3)).await.unwrap();
        let second = ImamService::create(&store, &request("Ali", 3)).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_ne!(first.access_code, second.access_code);
    }

    #[tokio::test]
    async fn trims_name_and_validates_input() {
        let store = MemoryStore::new();
        let imam = ImamService::create(&store, &request("  Ustadz Hasan ", 5)).await.unwrap();
        assert_eq!(imam.name, "Ustadz Hasan");
        assert_eq!(imam.booked, 0);

        for bad in [request("   ", 3), request("Ali", 0), request("Ali", 31)] {
            assert!(matches!(
                ImamService::create(&store, &bad).await,
                Err(AppError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn retries_past_taken_codes() {
        let store = MemoryStore::new();
        ImamService::create_with(&store, &request("Ali", 3), || "111111".to_string())
            .await
            .unwrap();

        let mut codes = vec!["222222", "111111", "111111"];
        let imam = ImamService::create_with(&store, &request("Umar", 3), move || {
            codes.pop().unwrap_or("999999").to_string()
        })
        .await
        .unwrap();
        assert_eq!(imam.access_code, "222222");
    }

    #[tokio::test]
    async fn gives_up_after_bounded_attempts() {
        let store = MemoryStore::new();
        ImamService::create_with(&store, &request("Ali", 3), || "111111".to_string())
            .await
            .unwrap();

        let mut calls = 0;
        let err = ImamService::create_with(&store, &request("Umar", 3), || {
            calls += 1;
            "111111".to_string()
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::CodeGenerationExhausted));
        assert_eq!(calls, MAX_CODE_ATTEMPTS);
        assert_eq!(store.list_imams().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn verifies_access_codes() {
        let store = MemoryStore::new();
        let imam = ImamService::create(&store, &request("Ali", 3)).await.unwrap();

        let profile = ImamService::verify_access_code(&store, Some(&imam.access_code))
            .await
            .unwrap();
        assert_eq!(profile.id, imam.id);
        assert_eq!(profile.quota, 3);

        assert!(matches!(
            ImamService::verify_access_code(&store, Some("000000")).await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            ImamService::verify_access_code(&store, None).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn deleting_unknown_imam_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            ImamService::delete(&store, 42).await,
            Err(AppError::NotFound(_))
        ));
    }
}
