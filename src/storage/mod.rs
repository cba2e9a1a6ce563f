use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::AppConfig;
use crate::models::{
    assignments::{
        entities::{Assignment, ResponsePatch},
        requests::{AssignmentListQuery, AssignmentUpdate, NewAssignment},
        responses::{AssignmentListResponse, LegacyStatusFix, ReconcileOutcome},
    },
    stats::responses::StatusCount,
    users::{
        entities::{User, UserRole},
        requests::{CreateUserRequest, UpdateUserRequest, UserListQuery},
        responses::UserListResponse,
    },
};

use crate::errors::Result;

pub mod sea_orm_storage;

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 用户管理方法
    // 创建用户（password 字段为已哈希的密码）
    async fn create_user(&self, user: CreateUserRequest) -> Result<User>;
    // 通过ID获取用户信息
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    // 批量获取用户信息
    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>>;
    // 通过邮箱获取用户信息
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    // 通过生物识别凭据获取用户
    async fn get_user_by_credential_id(&self, credential_id: &str) -> Result<Option<User>>;
    // 列出用户
    async fn list_users_with_pagination(&self, query: UserListQuery) -> Result<UserListResponse>;
    // 列出某角色的全部用户
    async fn list_users_by_role(&self, role: Option<UserRole>) -> Result<Vec<User>>;
    // 列出所有活跃教师
    async fn list_active_teachers(&self) -> Result<Vec<User>>;
    // 统计用户数量
    async fn count_users(&self) -> Result<u64>;
    // 更新用户信息（password 字段为已哈希的密码）
    async fn update_user(&self, id: i64, update: UpdateUserRequest) -> Result<Option<User>>;
    // 删除用户
    async fn delete_user(&self, id: i64) -> Result<bool>;
    // 更新用户最后登录时间
    async fn update_last_login(&self, id: i64) -> Result<bool>;
    // 开关生物识别登录
    async fn set_biometric_enabled(&self, id: i64, enabled: bool) -> Result<bool>;
    // 记录或清除生物识别凭据，清除时同时关闭生物识别登录
    async fn set_biometric_credential(&self, id: i64, credential_id: Option<String>)
    -> Result<bool>;

    /// 作业管理方法
    // 创建作业
    async fn create_assignment(&self, assignment: NewAssignment) -> Result<Assignment>;
    // 通过ID获取作业（含分配教师与回复）
    async fn get_assignment_by_id(&self, id: i64) -> Result<Option<Assignment>>;
    // 分页列出作业（按基础状态筛选）
    async fn list_assignments_with_pagination(
        &self,
        query: AssignmentListQuery,
    ) -> Result<AssignmentListResponse>;
    // 列出分配给某教师的全部作业
    async fn list_teacher_assignments(
        &self,
        teacher_id: i64,
        search: Option<String>,
    ) -> Result<Vec<Assignment>>;
    // 更新作业并重新计算基础状态
    async fn update_assignment(
        &self,
        id: i64,
        update: AssignmentUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>>;
    // 删除作业
    async fn delete_assignment(&self, id: i64) -> Result<bool>;
    // 作业总数
    async fn count_assignments(&self) -> Result<u64>;

    /// 回复与对账方法
    // 写入教师回复并在同一事务内重新计算基础状态
    async fn upsert_response(
        &self,
        assignment_id: i64,
        teacher_id: i64,
        patch: ResponsePatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>>;
    // 删除教师回复（重置为待完成）并重新计算基础状态
    async fn reset_response(
        &self,
        assignment_id: i64,
        teacher_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>>;
    // 重新计算单个作业的基础状态
    async fn reconcile_assignment(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ReconcileOutcome>>;
    // 重新计算全部作业的基础状态，dry_run 时只计算不写入
    async fn reconcile_all_assignments(
        &self,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<Vec<ReconcileOutcome>>;

    /// 统计与维护
    // 按基础状态统计作业数量
    async fn count_assignments_by_status(&self) -> Result<Vec<StatusCount>>;
    // 将旧版本遗留的状态值迁移到当前枚举
    async fn normalize_legacy_statuses(&self) -> Result<Vec<LegacyStatusFix>>;
}

/// 根据配置创建存储实例
pub async fn create_storage(config: &AppConfig) -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async(&config.database).await?;
    Ok(Arc::new(storage))
}
