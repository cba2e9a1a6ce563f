use super::entities::{AssignmentStatus, TeacherStatus};
use crate::models::common::PaginationQuery;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// 创建作业请求
#[derive(Debug, Deserialize)]
pub struct CreateAssignmentRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>, // ISO 8601 格式，如 "2025-08-10T23:59:59Z"
    pub close_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_general: bool,
    #[serde(default)]
    pub assigned_to: Vec<i64>,
}

/// 更新作业请求
#[derive(Debug, Deserialize)]
pub struct UpdateAssignmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// 字段缺省为不修改，显式 null 为清除关闭时间
    #[serde(default, deserialize_with = "deserialize_present")]
    pub close_date: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Vec<i64>>,
    /// 仅允许冻结状态，或 active/pending 用于解除冻结
    pub status: Option<AssignmentStatus>,
}

/// 字段出现即为 Some，值本身可以是 null
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// 存储层使用的更新内容
#[derive(Debug, Clone, Default)]
pub struct AssignmentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    /// Some(None) 清除关闭时间
    pub close_date: Option<Option<DateTime<Utc>>>,
    pub assigned_to: Option<Vec<i64>>,
    pub status: Option<AssignmentStatus>,
}

// 存储层使用的新建内容
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub close_date: Option<DateTime<Utc>>,
    pub created_by: i64,
    pub is_general: bool,
    pub assigned_to: Vec<i64>,
}

/// 作业列表查询参数（管理端 HTTP 请求）
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentListParams {
    #[serde(flatten)]
    pub pagination: PaginationQuery,
    /// 基础状态过滤
    pub status: Option<AssignmentStatus>,
    pub created_by: Option<i64>,
    pub search: Option<String>,
}

// 用于存储层的内部查询参数
#[derive(Debug, Clone)]
pub struct AssignmentListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub status: Option<AssignmentStatus>,
    pub created_by: Option<i64>,
    pub search: Option<String>,
}

impl From<AssignmentListParams> for AssignmentListQuery {
    fn from(params: AssignmentListParams) -> Self {
        Self {
            page: Some(params.pagination.page),
            size: Some(params.pagination.size),
            status: params.status,
            created_by: params.created_by,
            search: params.search,
        }
    }
}

/// 教师作业列表查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct MyAssignmentListParams {
    #[serde(flatten)]
    pub pagination: PaginationQuery,
    /// 教师可见状态过滤
    pub status: Option<TeacherStatus>,
    pub search: Option<String>,
}

/// 教师提交请求
#[derive(Debug, Deserialize)]
pub struct SubmitResponseRequest {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub draft: bool,
}

/// 管理员覆盖教师状态
#[derive(Debug, Deserialize)]
pub struct OverrideTeacherStatusRequest {
    pub status: TeacherStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_close_date_absent_null_and_set() {
        let absent: UpdateAssignmentRequest = serde_json::from_str(r#"{"title":"Acta"}"#).unwrap();
        assert_eq!(absent.close_date, None);

        let cleared: UpdateAssignmentRequest =
            serde_json::from_str(r#"{"close_date":null}"#).unwrap();
        assert_eq!(cleared.close_date, Some(None));

        let set: UpdateAssignmentRequest =
            serde_json::from_str(r#"{"close_date":"2025-09-01T23:59:59Z"}"#).unwrap();
        assert_eq!(
            set.close_date.flatten().map(|dt| dt.to_rfc3339()),
            Some("2025-09-01T23:59:59+00:00".to_string())
        );
    }
}
