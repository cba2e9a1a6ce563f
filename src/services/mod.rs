pub mod assignments;
pub mod auth;
pub mod stats;
pub mod users;
pub mod webauthn;

pub use assignments::AssignmentService;
pub use auth::AuthService;
pub use stats::StatsService;
pub use users::UserService;
pub use webauthn::WebAuthnService;

use actix_web::{HttpRequest, Result as ActixResult, error::ErrorInternalServerError, web};
use std::sync::Arc;

use crate::cache::{ObjectCache, user_cache_key};
use crate::storage::Storage;

/// 从 app_data 中取出共享状态
pub(crate) fn app_data<T: 'static>(request: &HttpRequest) -> ActixResult<web::Data<T>> {
    request.app_data::<web::Data<T>>().cloned().ok_or_else(|| {
        tracing::error!("{} not found in app data", std::any::type_name::<T>());
        ErrorInternalServerError("Server state unavailable")
    })
}

pub(crate) fn storage_from_request(request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
    Ok(app_data::<Arc<dyn Storage>>(request)?.get_ref().clone())
}

/// 用户信息变化后清除认证缓存
pub(crate) async fn invalidate_user_cache(request: &HttpRequest, user_id: i64) {
    if let Some(cache) = request.app_data::<web::Data<Arc<dyn ObjectCache>>>() {
        cache.remove(&user_cache_key(user_id)).await;
    }
}
