use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::debug;

use crate::cache::{CacheResult, ObjectCache};
use crate::config::AppConfig;
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    webauthn::{
        entities::{ChallengePurpose, PendingChallenge},
        responses::ChallengeResponse,
    },
};
use crate::services::app_data;
use crate::utils::random_code::generate_random_code;

const CHALLENGE_LENGTH: usize = 32;

fn challenge_cache_key(challenge: &str) -> String {
    format!("webauthn_challenge:{challenge}")
}

/// 签发挑战值，缓存 `webauthn.challenge_ttl` 秒
pub(crate) async fn issue_challenge(
    request: &HttpRequest,
    pending: PendingChallenge,
) -> ActixResult<HttpResponse> {
    let config = app_data::<AppConfig>(request)?;
    let cache = app_data::<Arc<dyn ObjectCache>>(request)?;

    let challenge = generate_random_code(CHALLENGE_LENGTH);
    cache
        .insert(
            challenge_cache_key(&challenge),
            &pending,
            config.webauthn.challenge_ttl,
        )
        .await;
    debug!(
        "Issued {:?} challenge for user {:?}",
        pending.purpose, pending.user_id
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        ChallengeResponse {
            challenge,
            rp_id: config.webauthn.rp_id.clone(),
            rp_name: config.webauthn.rp_name.clone(),
            timeout: config.webauthn.challenge_ttl.saturating_mul(1000),
        },
        "Challenge created",
    )))
}

/// 消耗挑战值，用途与绑定用户都一致时返回 true
///
/// 挑战值只能使用一次，校验失败同样会被移除。
pub(crate) async fn consume_challenge(
    cache: &Arc<dyn ObjectCache>,
    challenge: &str,
    expected: &PendingChallenge,
) -> bool {
    let challenge = challenge.trim();
    if challenge.is_empty() {
        return false;
    }
    match cache
        .take::<PendingChallenge>(&challenge_cache_key(challenge))
        .await
    {
        CacheResult::Found(pending) => pending == *expected,
        CacheResult::NotFound => false,
    }
}

pub(crate) fn challenge_rejected() -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::error_empty(
        ErrorCode::WebAuthnChallengeInvalid,
        "Challenge is missing, expired or already used",
    ))
}

/// 已登录用户的注册挑战
pub async fn create_challenge(request: &HttpRequest) -> ActixResult<HttpResponse> {
    let Some(user_id) = RequireJWT::extract_user_id(request) else {
        return Ok(HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
    };

    issue_challenge(
        request,
        PendingChallenge {
            purpose: ChallengePurpose::Registration,
            user_id: Some(user_id),
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MokaCacheWrapper;
    use crate::config::CacheConfig;

    fn cache() -> Arc<dyn ObjectCache> {
        Arc::new(MokaCacheWrapper::new(&CacheConfig {
            default_ttl: 60,
            max_capacity: 100,
        }))
    }

    fn registration(user_id: i64) -> PendingChallenge {
        PendingChallenge {
            purpose: ChallengePurpose::Registration,
            user_id: Some(user_id),
        }
    }

    #[tokio::test]
    async fn test_challenge_is_single_use() {
        let cache = cache();
        cache
            .insert(challenge_cache_key("abc123"), &registration(7), 30)
            .await;

        assert!(consume_challenge(&cache, "abc123", &registration(7)).await);
        assert!(!consume_challenge(&cache, "abc123", &registration(7)).await);
    }

    #[tokio::test]
    async fn test_challenge_bound_to_purpose_and_user() {
        let cache = cache();
        cache
            .insert(challenge_cache_key("for-seven"), &registration(7), 30)
            .await;
        // 其他用户使用后挑战值作废
        assert!(!consume_challenge(&cache, "for-seven", &registration(8)).await);
        assert!(!consume_challenge(&cache, "for-seven", &registration(7)).await);

        let login = PendingChallenge {
            purpose: ChallengePurpose::Login,
            user_id: None,
        };
        cache
            .insert(challenge_cache_key("login"), &login, 30)
            .await;
        assert!(!consume_challenge(&cache, "login", &registration(7)).await);
        assert!(!consume_challenge(&cache, "", &login).await);
        assert!(!consume_challenge(&cache, "unknown", &login).await);
    }
}
