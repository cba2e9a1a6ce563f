use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::{DateTime, Utc};
use tracing::info;

use super::{AssignmentService, assignment_not_found, get::visible_to_teacher, storage_error};
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    assignments::{
        entities::{Assignment, ResponsePatch, ResponseStatus, SubmissionStatus},
        requests::SubmitResponseRequest,
        responses::TeacherAssignmentView,
    },
};
use crate::resolver::{resolve_teacher_status, submission_status_at};

/// 根据提交时刻构造回复内容，已关闭时返回 `None`
pub(crate) fn submission_patch(
    assignment: &Assignment,
    req: SubmitResponseRequest,
    now: DateTime<Utc>,
) -> Option<ResponsePatch> {
    if req.draft {
        return Some(ResponsePatch {
            submitted_at: None,
            submission_status: SubmissionStatus::Draft,
            status: ResponseStatus::None,
            files: Some(req.files),
        });
    }

    let submission_status = submission_status_at(assignment.due_date, assignment.close_date, now)?;
    Some(ResponsePatch {
        submitted_at: Some(now),
        submission_status,
        status: ResponseStatus::Submitted,
        files: Some(req.files),
    })
}

pub async fn submit_response(
    service: &AssignmentService,
    assignment_id: i64,
    req: SubmitResponseRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(teacher_id) = RequireJWT::extract_user_id(request) else {
        return Ok(HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
    };
    let storage = service.get_storage(request)?;

    let assignment = match storage.get_assignment_by_id(assignment_id).await {
        Ok(Some(assignment)) => assignment,
        Ok(None) => return Ok(assignment_not_found()),
        Err(e) => return Ok(storage_error("Failed to load assignment", e)),
    };

    if !assignment.is_assigned(teacher_id) {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::AssignmentNotAssigned,
            "Assignment is not assigned to current user",
        )));
    }
    if !visible_to_teacher(&assignment, teacher_id) {
        return Ok(assignment_not_found());
    }

    let now = Utc::now();
    let Some(patch) = submission_patch(&assignment, req, now) else {
        return Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::AssignmentClosed,
            "Assignment is closed for submissions",
        )));
    };
    let submission_status = patch.submission_status;

    match storage
        .upsert_response(assignment_id, teacher_id, patch, now)
        .await
    {
        Ok(Some(updated)) => {
            info!(
                "Teacher {} submitted assignment {} ({})",
                teacher_id, assignment_id, submission_status
            );
            let status = resolve_teacher_status(&updated, teacher_id, now);
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                TeacherAssignmentView::new(&updated, teacher_id, status),
                "提交成功",
            )))
        }
        Ok(None) => Ok(assignment_not_found()),
        Err(e) => Ok(storage_error("Submission failed", e)),
    }
}
