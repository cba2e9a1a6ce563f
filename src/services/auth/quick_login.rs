use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::{AuthService, login::issue_login_response};
use crate::cache::ObjectCache;
use crate::models::{
    ApiResponse, ErrorCode,
    users::entities::UserStatus,
    webauthn::{
        entities::{ChallengePurpose, PendingChallenge},
        requests::QuickLoginRequest,
    },
};
use crate::services::{
    app_data,
    assignments::storage_error,
    webauthn::challenge::{consume_challenge, issue_challenge},
};
use crate::utils::jwt::JwtUtils;

const LOGIN_CHALLENGE: PendingChallenge = PendingChallenge {
    purpose: ChallengePurpose::Login,
    user_id: None,
};

/// 签发快速登录挑战
pub async fn handle_login_challenge(request: &HttpRequest) -> ActixResult<HttpResponse> {
    issue_challenge(request, LOGIN_CHALLENGE).await
}

/// 使用已登记的凭据登录
///
/// 断言签名由外部流程校验，这里要求一次性挑战值有效、凭据已登记且用户开启了生物识别。
pub async fn handle_quick_login(
    service: &AuthService,
    req: QuickLoginRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let cache = app_data::<Arc<dyn ObjectCache>>(request)?;
    if !consume_challenge(&cache, &req.challenge, &LOGIN_CHALLENGE).await {
        return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::WebAuthnChallengeInvalid,
            "Challenge is missing, expired or already used",
        )));
    }

    let storage = service.get_storage(request)?;
    let jwt = app_data::<JwtUtils>(request)?;

    let user = match storage
        .get_user_by_credential_id(req.credential_id.trim())
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!("Quick login with an unknown credential");
            return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
                ErrorCode::AuthFailed,
                "Credential is not registered",
            )));
        }
        Err(e) => return Ok(storage_error("Quick login lookup failed", e)),
    };

    if !user.biometric_enabled {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::BiometricDisabled,
            "Biometric login is disabled for this account",
        )));
    }

    if user.status != UserStatus::Active {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::Forbidden,
            "Account is not active",
        )));
    }

    if let Err(e) = storage.update_last_login(user.id).await {
        tracing::warn!("Failed to update last login for user {}: {}", user.id, e);
    }

    info!("User {} authenticated with a biometric credential", user.id);
    Ok(issue_login_response(&jwt, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaCacheWrapper;
    use crate::config::{AppConfig, CacheConfig};
    use crate::models::users::entities::UserRole;
    use crate::storage::Storage;
    use crate::storage::sea_orm_storage::test_support::{create_user, memory_storage};
    use actix_web::{body::to_bytes, http::StatusCode, test, web};

    const CREDENTIAL: &str = "QmlvbWV0cmljQ3JlZGVudGlhbA";

    struct Fixture {
        storage: Arc<dyn Storage>,
        cache: Arc<dyn ObjectCache>,
        config: AppConfig,
        user_id: i64,
    }

    async fn fixture(enabled: bool) -> Fixture {
        let storage = memory_storage().await;
        let user_id = create_user(&storage, "bio@escuela.mx", UserRole::Teacher).await;
        storage
            .set_biometric_credential(user_id, Some(CREDENTIAL.to_string()))
            .await
            .unwrap();
        storage.set_biometric_enabled(user_id, enabled).await.unwrap();

        Fixture {
            storage: Arc::new(storage),
            cache: Arc::new(MokaCacheWrapper::new(&CacheConfig {
                default_ttl: 60,
                max_capacity: 100,
            })),
            config: AppConfig::for_tests(),
            user_id,
        }
    }

    impl Fixture {
        fn request(&self) -> HttpRequest {
            test::TestRequest::default()
                .app_data(web::Data::new(self.storage.clone()))
                .app_data(web::Data::new(self.cache.clone()))
                .app_data(web::Data::new(self.config.clone()))
                .app_data(web::Data::new(JwtUtils::from_config(&self.config.jwt)))
                .to_http_request()
        }

        async fn challenge(&self) -> String {
            let response = handle_login_challenge(&self.request()).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = to_bytes(response.into_body()).await.unwrap();
            let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
            json["data"]["challenge"].as_str().unwrap().to_string()
        }

        async fn login(&self, credential_id: &str, challenge: String) -> StatusCode {
            let service = AuthService::new_lazy();
            handle_quick_login(
                &service,
                QuickLoginRequest {
                    credential_id: credential_id.to_string(),
                    challenge,
                },
                &self.request(),
            )
            .await
            .unwrap()
            .status()
        }
    }

    #[tokio::test]
    async fn test_quick_login_with_registered_credential() {
        let f = fixture(true).await;
        let challenge = f.challenge().await;
        assert_eq!(f.login(CREDENTIAL, challenge.clone()).await, StatusCode::OK);

        let user = f.storage.get_user_by_id(f.user_id).await.unwrap().unwrap();
        assert!(user.last_login.is_some());

        // 挑战值不能重复使用
        assert_eq!(f.login(CREDENTIAL, challenge).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_quick_login_rejections() {
        let f = fixture(true).await;
        assert_eq!(
            f.login(CREDENTIAL, "never-issued".into()).await,
            StatusCode::UNAUTHORIZED
        );
        let challenge = f.challenge().await;
        assert_eq!(
            f.login("VW5rbm93bkNyZWRlbnRpYWw", challenge).await,
            StatusCode::UNAUTHORIZED
        );

        let disabled = fixture(false).await;
        let challenge = disabled.challenge().await;
        assert_eq!(
            disabled.login(CREDENTIAL, challenge).await,
            StatusCode::FORBIDDEN
        );
    }
}
