use super::entities::{Assignment, AssignmentResponse, AssignmentStatus, TeacherStatus};
use crate::models::common::PaginationInfo;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AssignmentListResponse {
    pub items: Vec<Assignment>,
    pub pagination: PaginationInfo,
}

/// 教师视角下的作业
#[derive(Debug, Clone, Serialize)]
pub struct TeacherAssignmentView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub close_date: Option<DateTime<Utc>>,
    pub is_general: bool,
    /// 该教师的可见状态
    pub status: TeacherStatus,
    pub response: Option<AssignmentResponse>,
    pub created_at: DateTime<Utc>,
}

impl TeacherAssignmentView {
    pub fn new(assignment: &Assignment, teacher_id: i64, status: TeacherStatus) -> Self {
        Self {
            id: assignment.id,
            title: assignment.title.clone(),
            description: assignment.description.clone(),
            due_date: assignment.due_date,
            close_date: assignment.close_date,
            is_general: assignment.is_general,
            status,
            response: assignment.response_for(teacher_id).cloned(),
            created_at: assignment.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MyAssignmentListResponse {
    pub items: Vec<TeacherAssignmentView>,
    pub pagination: PaginationInfo,
}

/// 单个教师在某作业上的状态
#[derive(Debug, Serialize)]
pub struct TeacherStatusEntry {
    pub teacher_id: i64,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub status: TeacherStatus,
    pub response: Option<AssignmentResponse>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentTeachersResponse {
    pub assignment_id: i64,
    pub base_status: AssignmentStatus,
    pub teachers: Vec<TeacherStatusEntry>,
}

/// 对账结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReconcileOutcome {
    pub assignment_id: i64,
    pub previous: AssignmentStatus,
    pub current: AssignmentStatus,
}

impl ReconcileOutcome {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// 旧状态值的迁移结果
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LegacyStatusFix {
    pub from: String,
    pub to: AssignmentStatus,
    pub rows: u64,
}
