use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::info;

use super::challenge::{challenge_rejected, consume_challenge};
use super::{WebAuthnService, load_current_user};
use crate::cache::ObjectCache;
use crate::models::{
    ApiResponse, ErrorCode,
    webauthn::{
        entities::{ChallengePurpose, PendingChallenge},
        requests::RegisterCredentialRequest,
    },
};
use crate::services::{app_data, assignments::storage_error, invalidate_user_cache};

// base64url，不含填充
static CREDENTIAL_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{16,1023}$").expect("Invalid credential id regex"));

pub(crate) fn is_valid_credential_id(credential_id: &str) -> bool {
    CREDENTIAL_ID_RE.is_match(credential_id)
}

pub async fn register_credential(
    service: &WebAuthnService,
    req: RegisterCredentialRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let credential_id = req.credential_id.trim();
    if !is_valid_credential_id(credential_id) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            "Invalid credential id",
        )));
    }

    let user = match load_current_user(service, request).await? {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };

    let cache = app_data::<Arc<dyn ObjectCache>>(request)?;
    let expected = PendingChallenge {
        purpose: ChallengePurpose::Registration,
        user_id: Some(user.id),
    };
    if !consume_challenge(&cache, &req.challenge, &expected).await {
        info!("User {} presented an invalid registration challenge", user.id);
        return Ok(challenge_rejected());
    }

    let storage = service.get_storage(request)?;

    // 同一凭据只能属于一个用户
    match storage.get_user_by_credential_id(credential_id).await {
        Ok(Some(owner)) if owner.id != user.id => {
            return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
                ErrorCode::WebAuthnCredentialTaken,
                "Credential is already registered to another user",
            )));
        }
        Ok(_) => {}
        Err(e) => return Ok(storage_error("Failed to check credential", e)),
    }

    match storage
        .set_biometric_credential(user.id, Some(credential_id.to_string()))
        .await
    {
        Ok(_) => {
            invalidate_user_cache(request, user.id).await;
            info!("User {} registered a biometric credential", user.id);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("凭据已保存")))
        }
        Err(e) => Ok(storage_error("Failed to save credential", e)),
    }
}

pub async fn delete_credential(
    service: &WebAuthnService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match load_current_user(service, request).await? {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };

    if user.biometric_credential_id.is_none() {
        return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::WebAuthnCredentialMissing,
            "No biometric credential registered",
        )));
    }

    // 删除凭据同时关闭生物识别登录
    let storage = service.get_storage(request)?;
    match storage.set_biometric_credential(user.id, None).await {
        Ok(_) => {
            invalidate_user_cache(request, user.id).await;
            info!("User {} removed their biometric credential", user.id);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("凭据已删除")))
        }
        Err(e) => Ok(storage_error("Failed to remove credential", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::HttpMessage;

    #[test]
    fn test_credential_id_format() {
        assert!(is_valid_credential_id("AbCdEfGhIjKlMnOp_-1234"));
        assert!(!is_valid_credential_id("short"));
        assert!(!is_valid_credential_id("has spaces in the middle of it"));
        assert!(!is_valid_credential_id("padded-base64-value=="));
        assert!(!is_valid_credential_id(&"a".repeat(1024)));
    }

    mod handler {
        use super::*;
        use crate::cache::MokaCacheWrapper;
        use crate::config::{AppConfig, CacheConfig};
        use crate::models::users::{entities::UserRole, requests::CreateUserRequest};
        use crate::services::webauthn::challenge::create_challenge;
        use crate::storage::Storage;
        use crate::storage::sea_orm_storage::test_support::memory_storage;
        use actix_web::{body::to_bytes, http::StatusCode, test, web};

        const CREDENTIAL: &str = "UmVnaXN0ZXJlZENyZWRlbnRpYWw";

        struct Fixture {
            storage: Arc<dyn Storage>,
            cache: Arc<dyn ObjectCache>,
            config: AppConfig,
        }

        impl Fixture {
            async fn new() -> Self {
                Fixture {
                    storage: Arc::new(memory_storage().await),
                    cache: Arc::new(MokaCacheWrapper::new(&CacheConfig {
                        default_ttl: 60,
                        max_capacity: 100,
                    })),
                    config: AppConfig::for_tests(),
                }
            }

            async fn request_as(&self, user_id: i64) -> HttpRequest {
                let user = self.storage.get_user_by_id(user_id).await.unwrap().unwrap();
                let request = test::TestRequest::default()
                    .app_data(web::Data::new(self.storage.clone()))
                    .app_data(web::Data::new(self.cache.clone()))
                    .app_data(web::Data::new(self.config.clone()))
                    .to_http_request();
                request.extensions_mut().insert(user);
                request
            }

            async fn challenge_for(&self, user_id: i64) -> String {
                let response = create_challenge(&self.request_as(user_id).await)
                    .await
                    .unwrap();
                let body = to_bytes(response.into_body()).await.unwrap();
                let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
                json["data"]["challenge"].as_str().unwrap().to_string()
            }

            async fn register(&self, user_id: i64, challenge: String) -> StatusCode {
                let service = WebAuthnService::new_lazy();
                register_credential(
                    &service,
                    RegisterCredentialRequest {
                        credential_id: CREDENTIAL.to_string(),
                        challenge,
                    },
                    &self.request_as(user_id).await,
                )
                .await
                .unwrap()
                .status()
            }
        }

        #[tokio::test]
        async fn test_registration_requires_issued_challenge() {
            let f = Fixture::new().await;
            let user = create_user_in(&f, "t1@escuela.mx").await;

            assert_eq!(f.register(user, "made-up".into()).await, StatusCode::BAD_REQUEST);

            let challenge = f.challenge_for(user).await;
            assert_eq!(f.register(user, challenge.clone()).await, StatusCode::OK);
            let stored = f.storage.get_user_by_id(user).await.unwrap().unwrap();
            assert_eq!(stored.biometric_credential_id.as_deref(), Some(CREDENTIAL));

            // 已使用的挑战值失效
            assert_eq!(f.register(user, challenge).await, StatusCode::BAD_REQUEST);
        }

        #[tokio::test]
        async fn test_challenge_of_other_user_and_taken_credential() {
            let f = Fixture::new().await;
            let owner = create_user_in(&f, "t1@escuela.mx").await;
            let other = create_user_in(&f, "t2@escuela.mx").await;

            let owner_challenge = f.challenge_for(owner).await;
            assert_eq!(
                f.register(other, owner_challenge).await,
                StatusCode::BAD_REQUEST
            );

            let challenge = f.challenge_for(owner).await;
            assert_eq!(f.register(owner, challenge).await, StatusCode::OK);
            let challenge = f.challenge_for(other).await;
            assert_eq!(f.register(other, challenge).await, StatusCode::CONFLICT);
        }

        async fn create_user_in(f: &Fixture, email: &str) -> i64 {
            let user = f
                .storage
                .create_user(CreateUserRequest {
                    email: email.to_string(),
                    password: "hashed".into(),
                    full_name: email.to_string(),
                    role: UserRole::Teacher,
                })
                .await
                .unwrap();
            user.id
        }
    }
}
