use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::Utc;

use super::{AssignmentService, assignment_not_found, storage_error};
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    assignments::{entities::Assignment, responses::TeacherAssignmentView},
    users::entities::{User, UserRole},
};
use crate::resolver::resolve_teacher_status;

/// 教师能否看到该作业：已分配且不处于冻结状态
pub(crate) fn visible_to_teacher(assignment: &Assignment, teacher_id: i64) -> bool {
    assignment.is_assigned(teacher_id) && !assignment.status.is_hold()
}

pub async fn get_assignment(
    service: &AssignmentService,
    assignment_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
    };
    let storage = service.get_storage(request)?;

    let assignment = match storage.get_assignment_by_id(assignment_id).await {
        Ok(Some(assignment)) => assignment,
        Ok(None) => return Ok(assignment_not_found()),
        Err(e) => return Ok(storage_error("Failed to load assignment", e)),
    };

    respond_for_user(&user, assignment)
}

fn respond_for_user(user: &User, assignment: Assignment) -> ActixResult<HttpResponse> {
    match user.role {
        UserRole::Admin => Ok(HttpResponse::Ok().json(ApiResponse::success(
            assignment,
            "Assignment retrieved successfully",
        ))),
        UserRole::Teacher => {
            if !visible_to_teacher(&assignment, user.id) {
                return Ok(assignment_not_found());
            }
            let status = resolve_teacher_status(&assignment, user.id, Utc::now());
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                TeacherAssignmentView::new(&assignment, user.id, status),
                "Assignment retrieved successfully",
            )))
        }
    }
}
