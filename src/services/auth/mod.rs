pub mod login;
pub mod profile;
pub mod quick_login;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::{auth::LoginRequest, webauthn::requests::QuickLoginRequest};
use crate::storage::Storage;

pub struct AuthService {
    storage: Option<Arc<dyn Storage>>,
}

impl AuthService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    // 登录验证
    pub async fn login(
        &self,
        login_request: LoginRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        login::handle_login(self, login_request, request).await
    }

    // 生物识别快速登录挑战
    pub async fn quick_login_challenge(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        quick_login::handle_login_challenge(request).await
    }

    // 生物识别快速登录
    pub async fn quick_login(
        &self,
        req: QuickLoginRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        quick_login::handle_quick_login(self, req, request).await
    }

    // 获取当前用户信息
    pub async fn get_user(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        profile::handle_get_user(self, request).await
    }
}
