use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::UserService;
use crate::models::{
    ApiResponse, ErrorCode,
    users::{
        requests::{UserListParams, UserListQuery},
        responses::{TeacherOption, TeacherOptionsResponse},
    },
};

pub async fn list_users(
    service: &UserService,
    query: UserListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let list_query = UserListQuery::from(query);

    match storage.list_users_with_pagination(list_query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "User list retrieved successfully",
        ))),
        Err(e) => Ok(
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                format!("Failed to retrieve user list: {e}"),
            )),
        ),
    }
}

/// 活跃教师列表，供作业分配使用
pub async fn list_teacher_options(
    service: &UserService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.list_active_teachers().await {
        Ok(teachers) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            TeacherOptionsResponse {
                items: teachers.into_iter().map(TeacherOption::from).collect(),
            },
            "Teacher list retrieved successfully",
        ))),
        Err(e) => Ok(
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                format!("Failed to retrieve teacher list: {e}"),
            )),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::{
        entities::{UserRole, UserStatus},
        requests::UpdateUserRequest,
    };
    use crate::storage::Storage;
    use crate::storage::sea_orm_storage::test_support::{create_user, memory_storage};
    use actix_web::{body::to_bytes, http::StatusCode, test, web};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_teacher_options_only_active_teachers() {
        let storage = memory_storage().await;
        create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        let active = create_user(&storage, "activa@escuela.mx", UserRole::Teacher).await;
        let inactive = create_user(&storage, "baja@escuela.mx", UserRole::Teacher).await;
        let storage: Arc<dyn Storage> = Arc::new(storage);
        storage
            .update_user(
                inactive,
                UpdateUserRequest {
                    email: None,
                    password: None,
                    full_name: None,
                    role: None,
                    status: Some(UserStatus::Inactive),
                },
            )
            .await
            .unwrap();

        let request = test::TestRequest::default()
            .app_data(web::Data::new(storage))
            .to_http_request();
        let response = list_teacher_options(&UserService::new_lazy(), &request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let items = json["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], active);
        assert_eq!(items[0]["email"], "activa@escuela.mx");
    }
}
