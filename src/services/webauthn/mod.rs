//! 生物识别（WebAuthn）辅助接口
//!
//! 凭据注册与断言校验由浏览器和外部流程完成，这里只负责
//! 依赖方参数、一次性挑战值以及用户上的开关与凭据记录。

pub mod challenge;
pub mod credential;
pub mod status;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::{
    ApiResponse, ErrorCode,
    users::entities::User,
    webauthn::requests::{RegisterCredentialRequest, ToggleBiometricRequest},
};
use crate::storage::Storage;

pub struct WebAuthnService {
    storage: Option<Arc<dyn Storage>>,
}

impl WebAuthnService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    // 生物识别状态
    pub async fn get_status(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        status::get_status(self, request).await
    }

    // 开关生物识别登录
    pub async fn toggle(
        &self,
        req: ToggleBiometricRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        status::toggle(self, req, request).await
    }

    // 生成挑战值
    pub async fn create_challenge(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        challenge::create_challenge(request).await
    }

    // 记录凭据
    pub async fn register_credential(
        &self,
        req: RegisterCredentialRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        credential::register_credential(self, req, request).await
    }

    // 删除凭据
    pub async fn delete_credential(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        credential::delete_credential(self, request).await
    }
}

/// 读取当前用户的最新记录（缓存中的用户不含凭据）
pub(crate) async fn load_current_user(
    service: &WebAuthnService,
    request: &HttpRequest,
) -> ActixResult<Result<User, HttpResponse>> {
    let Some(user_id) = crate::middlewares::RequireJWT::extract_user_id(request) else {
        return Ok(Err(HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录"))));
    };

    let storage = service.get_storage(request)?;
    Ok(match storage.get_user_by_id(user_id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(HttpResponse::NotFound()
            .json(ApiResponse::error_empty(ErrorCode::UserNotFound, "用户不存在"))),
        Err(e) => Err(super::assignments::storage_error("Failed to load user", e)),
    })
}
