use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use crate::models::{
    ApiResponse, ErrorCode,
    auth::{LoginRequest, LoginResponse},
    users::entities::{User, UserStatus},
};
use crate::services::app_data;
use crate::utils::jwt::JwtUtils;
use crate::utils::password::verify_password;

use super::AuthService;

const LOGIN_FAILED: &str = "Email or password is incorrect";

pub async fn handle_login(
    service: &AuthService,
    login_request: LoginRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let jwt = app_data::<JwtUtils>(request)?;

    // 1. 根据邮箱获取用户信息
    let user = match storage.get_user_by_email(&login_request.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Ok(HttpResponse::Unauthorized()
                .json(ApiResponse::error_empty(ErrorCode::AuthFailed, LOGIN_FAILED)));
        }
        Err(e) => {
            tracing::error!("Login lookup failed: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("Login failed: {e}"),
                )),
            );
        }
    };

    // 2. 验证密码
    if !verify_password(&login_request.password, &user.password_hash) {
        tracing::info!("Failed login attempt for user {}", user.id);
        return Ok(HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::AuthFailed, LOGIN_FAILED)));
    }

    // 3. 检查账户状态
    if user.status != UserStatus::Active {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::Forbidden,
            "Account is not active",
        )));
    }

    // 4. 更新最后登录时间
    if let Err(e) = storage.update_last_login(user.id).await {
        tracing::warn!("Failed to update last login for user {}: {}", user.id, e);
    }

    // 5. 生成令牌
    Ok(issue_login_response(&jwt, user))
}

/// 为已验证的用户签发访问令牌
pub(super) fn issue_login_response(jwt: &JwtUtils, user: User) -> HttpResponse {
    match jwt.generate_access_token(user.id, &user.role.to_string()) {
        Ok(access_token) => {
            tracing::info!("User {} logged in successfully", user.id);

            let response = LoginResponse {
                access_token,
                expires_in: jwt.access_token_ttl_secs(),
                user,
                created_at: chrono::Utc::now(),
            };

            HttpResponse::Ok().json(ApiResponse::success(response, "Login successful"))
        }
        Err(e) => {
            tracing::error!("Failed to generate JWT token: {}", e);
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                "Login failed, unable to generate token",
            ))
        }
    }
}
