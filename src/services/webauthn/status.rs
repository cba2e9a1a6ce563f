use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{WebAuthnService, load_current_user};
use crate::config::AppConfig;
use crate::models::{
    ApiResponse, ErrorCode,
    webauthn::{requests::ToggleBiometricRequest, responses::BiometricStatusResponse},
};
use crate::services::{app_data, assignments::storage_error, invalidate_user_cache};

pub async fn get_status(
    service: &WebAuthnService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match load_current_user(service, request).await? {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };
    let config = app_data::<AppConfig>(request)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        BiometricStatusResponse {
            enabled: user.biometric_enabled,
            registered: user.biometric_credential_id.is_some(),
            rp_id: config.webauthn.rp_id.clone(),
            origin: config.webauthn.origin.clone(),
        },
        "Biometric status retrieved successfully",
    )))
}

pub async fn toggle(
    service: &WebAuthnService,
    req: ToggleBiometricRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let user = match load_current_user(service, request).await? {
        Ok(user) => user,
        Err(response) => return Ok(response),
    };

    // 启用前必须已有凭据
    if req.enabled && user.biometric_credential_id.is_none() {
        return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::WebAuthnCredentialMissing,
            "No biometric credential registered",
        )));
    }

    let storage = service.get_storage(request)?;
    match storage.set_biometric_enabled(user.id, req.enabled).await {
        Ok(_) => {
            invalidate_user_cache(request, user.id).await;
            info!("User {} set biometric login to {}", user.id, req.enabled);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty(if req.enabled {
                "生物识别登录已启用"
            } else {
                "生物识别登录已关闭"
            })))
        }
        Err(e) => Ok(storage_error("Failed to update biometric setting", e)),
    }
}
