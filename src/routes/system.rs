use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, middleware, web};
use chrono::Utc;
use serde::Serialize;

use crate::config::AppConfig;
use crate::models::{ApiResponse, AppStartTime};
use crate::services::app_data;

#[derive(Debug, Serialize)]
struct HealthResponse {
    system_name: String,
    version: &'static str,
    environment: String,
    uptime_seconds: i64,
}

/// 存活检查，无需登录
pub async fn health(request: HttpRequest) -> ActixResult<HttpResponse> {
    let config = app_data::<AppConfig>(&request)?;
    let start = app_data::<AppStartTime>(&request)?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        HealthResponse {
            system_name: config.app.system_name.clone(),
            version: env!("CARGO_PKG_VERSION"),
            environment: config.app.environment.clone(),
            uptime_seconds: (Utc::now() - start.start_datetime).num_seconds(),
        },
        "ok",
    )))
}

// 配置路由
pub fn configure_system_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/system")
            .wrap(middleware::Compress::default())
            .route("/health", web::get().to(health)),
    );
}
