use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::{auth::LoginRequest, webauthn::requests::QuickLoginRequest};
use crate::services::AuthService;

// 懒加载的全局 AuthService 实例
static AUTH_SERVICE: Lazy<AuthService> = Lazy::new(AuthService::new_lazy);

pub async fn login(
    req: HttpRequest,
    login_data: web::Json<LoginRequest>,
) -> ActixResult<HttpResponse> {
    AUTH_SERVICE.login(login_data.into_inner(), &req).await
}

pub async fn quick_login_challenge(request: HttpRequest) -> ActixResult<HttpResponse> {
    AUTH_SERVICE.quick_login_challenge(&request).await
}

pub async fn quick_login(
    req: HttpRequest,
    login_data: web::Json<QuickLoginRequest>,
) -> ActixResult<HttpResponse> {
    AUTH_SERVICE.quick_login(login_data.into_inner(), &req).await
}

pub async fn get_user(request: HttpRequest) -> ActixResult<HttpResponse> {
    AUTH_SERVICE.get_user(&request).await
}

// 配置路由
pub fn configure_auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/auth")
            .route("/login", web::post().to(login))
            .service(
                web::resource("/quick-login")
                    .route(web::post().to(quick_login_challenge))
                    .route(web::put().to(quick_login)),
            )
            .service(
                web::scope("")
                    .wrap(middlewares::RequireJWT)
                    .route("/me", web::get().to(get_user)),
            ),
    );
}
