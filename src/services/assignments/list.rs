use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::Utc;

use super::{AssignmentService, storage_error};
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    assignments::{
        requests::{AssignmentListParams, AssignmentListQuery, MyAssignmentListParams},
        responses::{MyAssignmentListResponse, TeacherAssignmentView},
    },
    common::pagination::paginate_in_memory,
};
use crate::resolver::resolve_teacher_status;

/// 管理端列表，按存储的基础状态筛选
pub async fn list_assignments(
    service: &AssignmentService,
    query: AssignmentListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage
        .list_assignments_with_pagination(AssignmentListQuery::from(query))
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Assignment list retrieved successfully",
        ))),
        Err(e) => Ok(storage_error("Failed to retrieve assignment list", e)),
    }
}

/// 教师列表，状态为该教师的可见状态
pub async fn list_my_assignments(
    service: &AssignmentService,
    query: MyAssignmentListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(teacher_id) = RequireJWT::extract_user_id(request) else {
        return Ok(HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
    };
    let storage = service.get_storage(request)?;

    let assignments = match storage
        .list_teacher_assignments(teacher_id, query.search)
        .await
    {
        Ok(assignments) => assignments,
        Err(e) => return Ok(storage_error("Failed to retrieve assignment list", e)),
    };

    let now = Utc::now();
    let views: Vec<TeacherAssignmentView> = assignments
        .iter()
        .map(|a| TeacherAssignmentView::new(a, teacher_id, resolve_teacher_status(a, teacher_id, now)))
        .filter(|view| query.status.is_none_or(|status| view.status == status))
        .collect();

    let (items, pagination) = paginate_in_memory(
        views,
        Some(query.pagination.page),
        Some(query.pagination.size),
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        MyAssignmentListResponse { items, pagination },
        "Assignment list retrieved successfully",
    )))
}
