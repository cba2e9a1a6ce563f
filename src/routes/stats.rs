use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::users::entities::UserRole;
use crate::services::StatsService;

// 懒加载的全局 StatsService 实例
static STATS_SERVICE: Lazy<StatsService> = Lazy::new(StatsService::new_lazy);

pub async fn get_overview(request: HttpRequest) -> ActixResult<HttpResponse> {
    STATS_SERVICE.get_overview(&request).await
}

pub async fn get_my_stats(request: HttpRequest) -> ActixResult<HttpResponse> {
    STATS_SERVICE.get_my_stats(&request).await
}

// 配置路由
pub fn configure_stats_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/stats")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("/overview")
                    .route(web::get().to(get_overview))
                    .wrap(middlewares::RequireRole::new_any(UserRole::admin_roles())),
            )
            .service(
                web::resource("/mine")
                    .route(web::get().to(get_my_stats))
                    .wrap(middlewares::RequireRole::new_any(UserRole::teacher_roles())),
            ),
    );
}
