use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::{DateTime, Utc};

use super::StatsService;
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    assignments::entities::{Assignment, TeacherStatus},
    stats::responses::{MyStatsResponse, OverviewStatsResponse},
};
use crate::resolver::resolve_teacher_status;
use crate::services::assignments::storage_error;

pub async fn get_overview(
    service: &StatsService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let by_status = match storage.count_assignments_by_status().await {
        Ok(counts) => counts,
        Err(e) => return Ok(storage_error("Failed to count assignments", e)),
    };
    let total_assignments = match storage.count_assignments().await {
        Ok(total) => total as i64,
        Err(e) => return Ok(storage_error("Failed to count assignments", e)),
    };
    let total_teachers = match storage.list_active_teachers().await {
        Ok(teachers) => teachers.len() as i64,
        Err(e) => return Ok(storage_error("Failed to count teachers", e)),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        OverviewStatsResponse {
            total_assignments,
            total_teachers,
            by_status,
        },
        "Statistics retrieved successfully",
    )))
}

/// 按教师可见状态汇总
pub(crate) fn tally_teacher_statuses(
    assignments: &[Assignment],
    teacher_id: i64,
    now: DateTime<Utc>,
) -> MyStatsResponse {
    let mut stats = MyStatsResponse::default();
    for assignment in assignments {
        stats.total += 1;
        match resolve_teacher_status(assignment, teacher_id, now) {
            TeacherStatus::Pending => stats.pending += 1,
            TeacherStatus::Completed => stats.completed += 1,
            TeacherStatus::CompletedLate => stats.completed_late += 1,
            TeacherStatus::NotDelivered => stats.not_delivered += 1,
        }
    }
    stats
}

pub async fn get_my_stats(
    service: &StatsService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(teacher_id) = RequireJWT::extract_user_id(request) else {
        return Ok(HttpResponse::Unauthorized()
            .json(ApiResponse::error_empty(ErrorCode::Unauthorized, "未登录")));
    };
    let storage = service.get_storage(request)?;

    match storage.list_teacher_assignments(teacher_id, None).await {
        Ok(assignments) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            tally_teacher_statuses(&assignments, teacher_id, Utc::now()),
            "Statistics retrieved successfully",
        ))),
        Err(e) => Ok(storage_error("Failed to retrieve assignments", e)),
    }
}
