use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use super::{AssignmentService, assignment_not_found, storage_error};
use crate::models::{
    ApiResponse, ErrorCode,
    assignments::{
        entities::Assignment,
        requests::OverrideTeacherStatusRequest,
        responses::{AssignmentTeachersResponse, TeacherStatusEntry},
    },
    users::entities::User,
};
use crate::resolver::{override_patch, resolve_teacher_status};
use crate::storage::Storage;

/// 组装各教师状态，已删除的用户只保留 ID
pub(crate) fn build_teacher_statuses(
    assignment: &Assignment,
    users: &[User],
    now: DateTime<Utc>,
) -> AssignmentTeachersResponse {
    let mut teachers: Vec<TeacherStatusEntry> = Vec::with_capacity(assignment.assigned_to.len());
    for &teacher_id in &assignment.assigned_to {
        if teachers.iter().any(|t| t.teacher_id == teacher_id) {
            continue;
        }
        let user = users.iter().find(|u| u.id == teacher_id);
        teachers.push(TeacherStatusEntry {
            teacher_id,
            full_name: user.map(|u| u.full_name.clone()),
            email: user.map(|u| u.email.clone()),
            status: resolve_teacher_status(assignment, teacher_id, now),
            response: assignment.response_for(teacher_id).cloned(),
        });
    }

    AssignmentTeachersResponse {
        assignment_id: assignment.id,
        base_status: assignment.status,
        teachers,
    }
}

async fn teacher_statuses_response(
    storage: &Arc<dyn Storage>,
    assignment: &Assignment,
    now: DateTime<Utc>,
    message: &str,
) -> HttpResponse {
    match storage.get_users_by_ids(&assignment.assigned_to).await {
        Ok(users) => HttpResponse::Ok().json(ApiResponse::success(
            build_teacher_statuses(assignment, &users, now),
            message,
        )),
        Err(e) => storage_error("Failed to load teachers", e),
    }
}

pub async fn list_teacher_statuses(
    service: &AssignmentService,
    assignment_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let assignment = match storage.get_assignment_by_id(assignment_id).await {
        Ok(Some(assignment)) => assignment,
        Ok(None) => return Ok(assignment_not_found()),
        Err(e) => return Ok(storage_error("Failed to load assignment", e)),
    };

    Ok(teacher_statuses_response(
        &storage,
        &assignment,
        Utc::now(),
        "Teacher statuses retrieved successfully",
    )
    .await)
}

pub async fn override_teacher_status(
    service: &AssignmentService,
    assignment_id: i64,
    teacher_id: i64,
    req: OverrideTeacherStatusRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let assignment = match storage.get_assignment_by_id(assignment_id).await {
        Ok(Some(assignment)) => assignment,
        Ok(None) => return Ok(assignment_not_found()),
        Err(e) => return Ok(storage_error("Failed to load assignment", e)),
    };

    if !assignment.is_assigned(teacher_id) {
        return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::AssignmentTeacherNotFound,
            "Teacher is not assigned to this assignment",
        )));
    }

    let now = Utc::now();
    let result = match override_patch(req.status, now) {
        Some(patch) => {
            storage
                .upsert_response(assignment_id, teacher_id, patch, now)
                .await
        }
        None => storage.reset_response(assignment_id, teacher_id, now).await,
    };

    match result {
        Ok(Some(updated)) => {
            info!(
                "Teacher {} status on assignment {} overridden to {}, base status {}",
                teacher_id, assignment_id, req.status, updated.status
            );
            Ok(teacher_statuses_response(&storage, &updated, now, "教师状态已更新").await)
        }
        Ok(None) => Ok(assignment_not_found()),
        Err(e) => Ok(storage_error("Status override failed", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assignments::entities::{
        AssignmentResponse, AssignmentStatus, ResponseStatus, SubmissionStatus, TeacherStatus,
    };
    use crate::models::users::entities::{UserRole, UserStatus};
    use chrono::{Duration, TimeZone};

    fn user(id: i64, name: &str) -> User {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        User {
            id,
            email: format!("{name}@example.edu"),
            full_name: name.to_string(),
            password_hash: String::new(),
            role: UserRole::Teacher,
            status: UserStatus::Active,
            biometric_enabled: false,
            biometric_credential_id: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_build_teacher_statuses() {
        let due = Utc.with_ymd_and_hms(2025, 3, 10, 23, 59, 59).unwrap();
        let assignment = Assignment {
            id: 9,
            title: "Informe".into(),
            description: None,
            due_date: due,
            close_date: None,
            created_by: 1,
            is_general: false,
            assigned_to: vec![2, 3, 2, 4],
            status: AssignmentStatus::Pending,
            responses: vec![AssignmentResponse {
                id: 1,
                teacher_id: 2,
                submitted_at: Some(due - Duration::hours(2)),
                submission_status: SubmissionStatus::OnTime,
                status: ResponseStatus::Submitted,
                files: vec![],
                updated_at: due - Duration::hours(2),
            }],
            created_at: due - Duration::days(5),
            updated_at: due - Duration::days(5),
        };
        let users = vec![user(2, "ana"), user(3, "luis")];

        let result = build_teacher_statuses(&assignment, &users, due + Duration::days(1));
        assert_eq!(result.assignment_id, 9);
        assert_eq!(result.teachers.len(), 3);

        assert_eq!(result.teachers[0].status, TeacherStatus::Completed);
        assert_eq!(result.teachers[0].full_name.as_deref(), Some("ana"));
        assert!(result.teachers[0].response.is_some());

        assert_eq!(result.teachers[1].status, TeacherStatus::NotDelivered);
        // 用户已被删除
        assert_eq!(result.teachers[2].teacher_id, 4);
        assert!(result.teachers[2].full_name.is_none());
    }
}
