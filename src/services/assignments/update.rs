use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::Utc;
use tracing::info;

use super::{
    AssignmentService, assignment_not_found, check_assignees, storage_error, validation_failed,
};
use crate::models::{
    ApiResponse,
    assignments::{
        entities::AssignmentStatus,
        requests::{AssignmentUpdate, UpdateAssignmentRequest},
    },
};
use crate::utils::validate::validate_title;

/// 管理端可以直接写入的基础状态：冻结状态，或用 active/pending 解除冻结
fn is_settable_status(status: AssignmentStatus) -> bool {
    status.is_hold() || matches!(status, AssignmentStatus::Active | AssignmentStatus::Pending)
}

pub async fn update_assignment(
    service: &AssignmentService,
    assignment_id: i64,
    req: UpdateAssignmentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    if let Some(ref title) = req.title
        && let Err(msg) = validate_title(title)
    {
        return Ok(validation_failed(msg));
    }

    if let Some(status) = req.status
        && !is_settable_status(status)
    {
        return Ok(validation_failed(format!(
            "Status '{status}' is derived from teacher responses and cannot be set directly"
        )));
    }

    let storage = service.get_storage(request)?;

    let existing = match storage.get_assignment_by_id(assignment_id).await {
        Ok(Some(assignment)) => assignment,
        Ok(None) => return Ok(assignment_not_found()),
        Err(e) => return Ok(storage_error("Failed to load assignment", e)),
    };

    // 合并后再校验日期顺序
    let due_date = req.due_date.unwrap_or(existing.due_date);
    let close_date = req.close_date.unwrap_or(existing.close_date);
    if let Some(close_date) = close_date
        && close_date < due_date
    {
        return Ok(validation_failed("close_date must not be earlier than due_date"));
    }

    let assigned_to = match req.assigned_to {
        Some(ids) if existing.is_general => {
            // 面向全部教师的作业不接受手动分配
            if !ids.is_empty() {
                return Ok(validation_failed(
                    "assigned_to cannot be changed on a general assignment",
                ));
            }
            None
        }
        Some(ids) if ids.is_empty() => {
            return Ok(validation_failed(
                "assigned_to must not be empty for a targeted assignment",
            ));
        }
        Some(ids) => match check_assignees(&storage, &ids).await {
            Ok(ids) => Some(ids),
            Err(response) => return Ok(response),
        },
        None => None,
    };

    let update = AssignmentUpdate {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        due_date: req.due_date,
        close_date: req.close_date,
        assigned_to,
        status: req.status,
    };

    match storage
        .update_assignment(assignment_id, update, Utc::now())
        .await
    {
        Ok(Some(assignment)) => {
            info!(
                "Assignment {} updated, base status {}",
                assignment.id, assignment.status
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(assignment, "作业更新成功")))
        }
        Ok(None) => Ok(assignment_not_found()),
        Err(e) => Ok(storage_error("Assignment update failed", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settable_statuses() {
        assert!(is_settable_status(AssignmentStatus::Scheduled));
        assert!(is_settable_status(AssignmentStatus::Cancelled));
        assert!(is_settable_status(AssignmentStatus::PublicationError));
        assert!(is_settable_status(AssignmentStatus::Active));
        assert!(is_settable_status(AssignmentStatus::Pending));
        assert!(!is_settable_status(AssignmentStatus::Completed));
        assert!(!is_settable_status(AssignmentStatus::CompletedLate));
        assert!(!is_settable_status(AssignmentStatus::NotDelivered));
    }
}
