use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{AssignmentService, check_assignees, storage_error, validation_failed};
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    assignments::requests::{CreateAssignmentRequest, NewAssignment},
};
use crate::utils::validate::validate_title;

pub async fn create_assignment(
    service: &AssignmentService,
    req: CreateAssignmentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(created_by) = RequireJWT::extract_user_id(request) else {
        return Ok(HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
    };

    if let Err(msg) = validate_title(&req.title) {
        return Ok(validation_failed(msg));
    }

    if let Some(close_date) = req.close_date
        && close_date < req.due_date
    {
        return Ok(validation_failed("close_date must not be earlier than due_date"));
    }

    let storage = service.get_storage(request)?;

    // 面向全部教师的作业分配给当前所有活跃教师
    let assigned_to = if req.is_general {
        match storage.list_active_teachers().await {
            Ok(teachers) => teachers.into_iter().map(|t| t.id).collect(),
            Err(e) => return Ok(storage_error("Failed to load teachers", e)),
        }
    } else {
        if req.assigned_to.is_empty() {
            return Ok(validation_failed(
                "assigned_to must not be empty for a targeted assignment",
            ));
        }
        match check_assignees(&storage, &req.assigned_to).await {
            Ok(ids) => ids,
            Err(response) => return Ok(response),
        }
    };

    let new_assignment = NewAssignment {
        title: req.title.trim().to_string(),
        description: req.description,
        due_date: req.due_date,
        close_date: req.close_date,
        created_by,
        is_general: req.is_general,
        assigned_to,
    };

    match storage.create_assignment(new_assignment).await {
        Ok(assignment) => {
            info!(
                "Assignment {} created by {} for {} teachers",
                assignment.id,
                created_by,
                assignment.assigned_to.len()
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(assignment, "作业创建成功")))
        }
        Err(e) => Ok(storage_error("Assignment creation failed", e)),
    }
}
