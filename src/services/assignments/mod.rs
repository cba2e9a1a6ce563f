//! 作业服务
//!
//! 教师可见状态与基础状态均通过 `resolver` 计算，写入路径统一走
//! `Storage::upsert_response` / `reset_response` / `update_assignment`。

pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod submit;
pub mod teachers;
pub mod update;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::error;

use crate::errors::AppError;
use crate::models::{
    ApiResponse, ErrorCode,
    assignments::requests::{
        AssignmentListParams, CreateAssignmentRequest, MyAssignmentListParams,
        OverrideTeacherStatusRequest, SubmitResponseRequest, UpdateAssignmentRequest,
    },
};
use crate::storage::Storage;

pub struct AssignmentService {
    storage: Option<Arc<dyn Storage>>,
}

impl AssignmentService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    // 创建作业
    pub async fn create_assignment(
        &self,
        req: CreateAssignmentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_assignment(self, req, request).await
    }

    // 管理端作业列表
    pub async fn list_assignments(
        &self,
        query: AssignmentListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_assignments(self, query, request).await
    }

    // 教师作业列表
    pub async fn list_my_assignments(
        &self,
        query: MyAssignmentListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_my_assignments(self, query, request).await
    }

    // 作业详情
    pub async fn get_assignment(
        &self,
        assignment_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        get::get_assignment(self, assignment_id, request).await
    }

    // 更新作业
    pub async fn update_assignment(
        &self,
        assignment_id: i64,
        req: UpdateAssignmentRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        update::update_assignment(self, assignment_id, req, request).await
    }

    // 删除作业
    pub async fn delete_assignment(
        &self,
        assignment_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        delete::delete_assignment(self, assignment_id, request).await
    }

    // 教师提交
    pub async fn submit_response(
        &self,
        assignment_id: i64,
        req: SubmitResponseRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        submit::submit_response(self, assignment_id, req, request).await
    }

    // 各教师状态
    pub async fn list_teacher_statuses(
        &self,
        assignment_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        teachers::list_teacher_statuses(self, assignment_id, request).await
    }

    // 管理员覆盖教师状态
    pub async fn override_teacher_status(
        &self,
        assignment_id: i64,
        teacher_id: i64,
        req: OverrideTeacherStatusRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        teachers::override_teacher_status(self, assignment_id, teacher_id, req, request).await
    }
}

pub(crate) fn storage_error(context: &str, e: AppError) -> HttpResponse {
    error!("{}: {}", context, e);
    HttpResponse::InternalServerError().json(ApiResponse::error_empty(
        ErrorCode::InternalServerError,
        format!("{context}: {}", e.message()),
    ))
}

pub(crate) fn assignment_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error_empty(
        ErrorCode::AssignmentNotFound,
        "Assignment not found",
    ))
}

pub(crate) fn validation_failed(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::error_empty(
        ErrorCode::AssignmentValidationFailed,
        message,
    ))
}

/// 校验被分配的用户均为活跃教师，返回去重后的 ID
pub(crate) async fn check_assignees(
    storage: &Arc<dyn Storage>,
    teacher_ids: &[i64],
) -> Result<Vec<i64>, HttpResponse> {
    let mut ids: Vec<i64> = Vec::with_capacity(teacher_ids.len());
    for &id in teacher_ids {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    let users = storage
        .get_users_by_ids(&ids)
        .await
        .map_err(|e| storage_error("Failed to load teachers", e))?;

    let invalid: Vec<String> = ids
        .iter()
        .filter(|id| !users.iter().any(|u| u.id == **id && u.is_active_teacher()))
        .map(|id| id.to_string())
        .collect();
    if !invalid.is_empty() {
        return Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::AssignmentTeacherNotFound,
            format!("Unknown or inactive teacher ids: {}", invalid.join(", ")),
        )));
    }

    Ok(ids)
}
