use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::users::entities::UserRole;
use crate::models::users::requests::{CreateUserRequest, UpdateUserRequest, UserListParams};
use crate::services::UserService;
use crate::utils::SafeIDI64;

static USER_SERVICE: Lazy<UserService> = Lazy::new(UserService::new_lazy);

async fn list_accounts(
    request: HttpRequest,
    params: web::Query<UserListParams>,
) -> ActixResult<HttpResponse> {
    USER_SERVICE.list_users(params.into_inner(), &request).await
}

async fn register_account(
    request: HttpRequest,
    body: web::Json<CreateUserRequest>,
) -> ActixResult<HttpResponse> {
    USER_SERVICE.create_user(body.into_inner(), &request).await
}

// 作业分配下拉框使用
async fn list_assignable_teachers(request: HttpRequest) -> ActixResult<HttpResponse> {
    USER_SERVICE.list_teacher_options(&request).await
}

async fn show_account(request: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    USER_SERVICE.get_user(id.0, &request).await
}

async fn edit_account(
    request: HttpRequest,
    id: SafeIDI64,
    body: web::Json<UpdateUserRequest>,
) -> ActixResult<HttpResponse> {
    USER_SERVICE.update_user(id.0, body.into_inner(), &request).await
}

async fn remove_account(request: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    USER_SERVICE.delete_user(id.0, &request).await
}

/// 账户管理，全部接口仅管理员可用
pub fn configure_user_routes(cfg: &mut web::ServiceConfig) {
    let admins_only = || middlewares::RequireRole::new_any(UserRole::admin_roles());

    cfg.service(
        web::scope("/api/v1/users")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .route(web::get().to(list_accounts))
                    .route(web::post().to(register_account))
                    .wrap(admins_only()),
            )
            // 需在 /{id} 之前注册
            .service(
                web::resource("/teachers")
                    .route(web::get().to(list_assignable_teachers))
                    .wrap(admins_only()),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(show_account))
                    .route(web::put().to(edit_account))
                    .route(web::delete().to(remove_account))
                    .wrap(admins_only()),
            ),
    );
}
