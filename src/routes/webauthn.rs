use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::webauthn::requests::{RegisterCredentialRequest, ToggleBiometricRequest};
use crate::services::WebAuthnService;

// 懒加载的全局 WebAuthnService 实例
static WEBAUTHN_SERVICE: Lazy<WebAuthnService> = Lazy::new(WebAuthnService::new_lazy);

pub async fn get_status(request: HttpRequest) -> ActixResult<HttpResponse> {
    WEBAUTHN_SERVICE.get_status(&request).await
}

pub async fn toggle(
    req: HttpRequest,
    toggle_data: web::Json<ToggleBiometricRequest>,
) -> ActixResult<HttpResponse> {
    WEBAUTHN_SERVICE.toggle(toggle_data.into_inner(), &req).await
}

pub async fn create_challenge(request: HttpRequest) -> ActixResult<HttpResponse> {
    WEBAUTHN_SERVICE.create_challenge(&request).await
}

pub async fn register_credential(
    req: HttpRequest,
    credential: web::Json<RegisterCredentialRequest>,
) -> ActixResult<HttpResponse> {
    WEBAUTHN_SERVICE
        .register_credential(credential.into_inner(), &req)
        .await
}

pub async fn delete_credential(request: HttpRequest) -> ActixResult<HttpResponse> {
    WEBAUTHN_SERVICE.delete_credential(&request).await
}

// 配置路由
pub fn configure_webauthn_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/webauthn")
            .wrap(middlewares::RequireJWT)
            .route("/status", web::get().to(get_status))
            .route("/toggle", web::post().to(toggle))
            .route("/challenge", web::post().to(create_challenge))
            .route("/credential", web::put().to(register_credential))
            .route("/credential", web::delete().to(delete_credential)),
    );
}
