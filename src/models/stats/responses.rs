use serde::{Deserialize, Serialize};

/// 某个状态下的作业数量
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

/// 管理端概览：按基础状态统计
#[derive(Debug, Serialize)]
pub struct OverviewStatsResponse {
    pub total_assignments: i64,
    pub total_teachers: i64,
    pub by_status: Vec<StatusCount>,
}

/// 教师个人统计：按可见状态统计
#[derive(Debug, Serialize, Default, PartialEq)]
pub struct MyStatsResponse {
    pub total: i64,
    pub pending: i64,
    pub completed: i64,
    pub completed_late: i64,
    pub not_delivered: i64,
}
