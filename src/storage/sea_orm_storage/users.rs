use super::SeaOrmStorage;
use super::assignments::{load_assignment, lock_assignments, persist_reconciled};
use crate::entity::assignment_responses::{
    Column as ResponseColumn, Entity as AssignmentResponses,
};
use crate::entity::assignment_teachers::{
    Column as AssignmentTeacherColumn, Entity as AssignmentTeachers,
};
use crate::entity::assignments::{Column as AssignmentColumn, Entity as Assignments};
use crate::entity::users::{ActiveModel, Column, Entity as Users};
use crate::errors::{AppError, Result};
use crate::models::{
    PaginationInfo,
    common::pagination::normalize_page,
    users::{
        entities::{User, UserRole, UserStatus},
        requests::{CreateUserRequest, UpdateUserRequest, UserListQuery},
        responses::UserListResponse,
    },
};
use crate::utils::escape_like_pattern;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// 创建用户
    pub async fn create_user_impl(&self, req: CreateUserRequest) -> Result<User> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            email: Set(req.email),
            full_name: Set(req.full_name),
            password_hash: Set(req.password),
            role: Set(req.role.to_string()),
            status: Set(UserStatus::Active.to_string()),
            biometric_enabled: Set(false),
            biometric_credential_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("创建用户失败: {e}")))?;

        Ok(result.into_user())
    }

    /// 通过 ID 获取用户
    pub async fn get_user_by_id_impl(&self, id: i64) -> Result<Option<User>> {
        let result = Users::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 批量获取用户
    pub async fn get_users_by_ids_impl(&self, ids: &[i64]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = Users::find()
            .filter(Column::Id.is_in(ids.to_vec()))
            .order_by_asc(Column::FullName)
            .all(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("批量查询用户失败: {e}")))?;

        Ok(result.into_iter().map(|m| m.into_user()).collect())
    }

    /// 通过邮箱获取用户（不区分大小写）
    pub async fn get_user_by_email_impl(&self, email: &str) -> Result<Option<User>> {
        let result = Users::find()
            .filter(Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 通过生物识别凭据获取用户
    pub async fn get_user_by_credential_id_impl(
        &self,
        credential_id: &str,
    ) -> Result<Option<User>> {
        let result = Users::find()
            .filter(Column::BiometricCredentialId.eq(credential_id))
            .one(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("查询凭据所属用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 分页列出用户
    pub async fn list_users_with_pagination_impl(
        &self,
        query: UserListQuery,
    ) -> Result<UserListResponse> {
        let (page, size) = normalize_page(query.page, query.size);

        let mut select = Users::find();

        // 搜索条件
        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            let escaped = escape_like_pattern(search.trim());
            select = select.filter(
                Condition::any()
                    .add(Column::Email.contains(&escaped))
                    .add(Column::FullName.contains(&escaped)),
            );
        }

        // 角色筛选
        if let Some(ref role) = query.role {
            select = select.filter(Column::Role.eq(role.to_string()));
        }

        // 状态筛选
        if let Some(ref status) = query.status {
            select = select.filter(Column::Status.eq(status.to_string()));
        }

        // 排序
        select = select.order_by_desc(Column::CreatedAt);

        // 分页查询
        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| AppError::database_operation(format!("查询用户总数失败: {e}")))?;

        let users = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| AppError::database_operation(format!("查询用户列表失败: {e}")))?;

        Ok(UserListResponse {
            items: users.into_iter().map(|m| m.into_user()).collect(),
            pagination: PaginationInfo::new(page as i64, size as i64, total as i64),
        })
    }

    /// 列出全部用户，可按角色筛选
    pub async fn list_users_by_role_impl(&self, role: Option<UserRole>) -> Result<Vec<User>> {
        let mut select = Users::find();
        if let Some(role) = role {
            select = select.filter(Column::Role.eq(role.to_string()));
        }

        let users = select
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("查询用户列表失败: {e}")))?;

        Ok(users.into_iter().map(|m| m.into_user()).collect())
    }

    /// 列出所有活跃教师（包括旧角色名）
    pub async fn list_active_teachers_impl(&self) -> Result<Vec<User>> {
        let users = Users::find()
            .filter(Column::Role.is_in([UserRole::TEACHER, UserRole::LEGACY_TEACHER]))
            .filter(Column::Status.eq(UserStatus::Active.to_string()))
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("查询教师列表失败: {e}")))?;

        Ok(users.into_iter().map(|m| m.into_user()).collect())
    }

    /// 更新用户最后登录时间
    pub async fn update_last_login_impl(&self, id: i64) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = Users::update_many()
            .col_expr(Column::LastLogin, sea_orm::sea_query::Expr::value(now))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("更新最后登录时间失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 开关生物识别登录
    pub async fn set_biometric_enabled_impl(&self, id: i64, enabled: bool) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = Users::update_many()
            .col_expr(
                Column::BiometricEnabled,
                sea_orm::sea_query::Expr::value(enabled),
            )
            .col_expr(Column::UpdatedAt, sea_orm::sea_query::Expr::value(now))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("更新生物识别状态失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 记录或清除生物识别凭据
    pub async fn set_biometric_credential_impl(
        &self,
        id: i64,
        credential_id: Option<String>,
    ) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let mut update = Users::update_many()
            .col_expr(
                Column::BiometricCredentialId,
                sea_orm::sea_query::Expr::value(credential_id.clone()),
            )
            .col_expr(Column::UpdatedAt, sea_orm::sea_query::Expr::value(now));
        if credential_id.is_none() {
            update = update.col_expr(
                Column::BiometricEnabled,
                sea_orm::sea_query::Expr::value(false),
            );
        }

        let result = update
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("更新生物识别凭据失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 更新用户信息
    pub async fn update_user_impl(
        &self,
        id: i64,
        update: UpdateUserRequest,
    ) -> Result<Option<User>> {
        // 先检查用户是否存在
        let existing = self.get_user_by_id_impl(id).await?;
        if existing.is_none() {
            return Ok(None);
        }

        let now = chrono::Utc::now().timestamp();

        let mut model = ActiveModel {
            id: Set(id),
            updated_at: Set(now),
            ..Default::default()
        };

        if let Some(email) = update.email {
            model.email = Set(email);
        }

        if let Some(password) = update.password {
            model.password_hash = Set(password);
        }

        if let Some(full_name) = update.full_name {
            model.full_name = Set(full_name);
        }

        if let Some(role) = update.role {
            model.role = Set(role.to_string());
        }

        if let Some(status) = update.status {
            model.status = Set(status.to_string());
        }

        model
            .update(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("更新用户失败: {e}")))?;

        self.get_user_by_id_impl(id).await
    }

    /// 删除用户
    ///
    /// 仍是作业创建者的用户返回冲突错误。教师的分配与回复随用户删除，
    /// 所涉作业在同一事务内重新计算基础状态。
    pub async fn delete_user_impl(&self, id: i64) -> Result<bool> {
        let now = chrono::Utc::now();
        let txn = self.db.begin().await?;

        let created = Assignments::find()
            .filter(AssignmentColumn::CreatedBy.eq(id))
            .count(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("统计用户创建的作业失败: {e}")))?;
        if created > 0 {
            return Err(AppError::conflict(format!(
                "用户仍是 {created} 个作业的创建者，无法删除"
            )));
        }

        let assignment_ids: Vec<i64> = AssignmentTeachers::find()
            .select_only()
            .column(AssignmentTeacherColumn::AssignmentId)
            .filter(AssignmentTeacherColumn::TeacherId.eq(id))
            .into_tuple()
            .all(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("查询教师作业失败: {e}")))?;
        lock_assignments(&txn, &assignment_ids).await?;

        AssignmentResponses::delete_many()
            .filter(ResponseColumn::TeacherId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("删除教师回复失败: {e}")))?;
        AssignmentTeachers::delete_many()
            .filter(AssignmentTeacherColumn::TeacherId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("删除教师分配失败: {e}")))?;
        let result = Users::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("删除用户失败: {e}")))?;
        if result.rows_affected == 0 {
            return Ok(false);
        }

        for assignment_id in assignment_ids {
            if let Some(mut assignment) = load_assignment(&txn, assignment_id).await? {
                persist_reconciled(&txn, &mut assignment, now).await?;
            }
        }

        txn.commit().await?;
        Ok(true)
    }

    /// 统计用户数量
    pub async fn count_users_impl(&self) -> Result<u64> {
        let count = Users::find()
            .count(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("统计用户数量失败: {e}")))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{create_user, memory_storage};
    use super::*;
    use crate::models::assignments::{
        entities::{AssignmentStatus, ResponsePatch, ResponseStatus, SubmissionStatus},
        requests::NewAssignment,
    };
    use chrono::{Duration, Utc};

    fn assignment_for(
        created_by: i64,
        due: chrono::DateTime<Utc>,
        assigned_to: Vec<i64>,
    ) -> NewAssignment {
        NewAssignment {
            title: "Concentrado de calificaciones".into(),
            description: None,
            due_date: due,
            close_date: None,
            created_by,
            is_general: false,
            assigned_to,
        }
    }

    #[tokio::test]
    async fn test_user_crud() {
        let storage = memory_storage().await;
        let id = create_user(&storage, "ana@escuela.mx", UserRole::Teacher).await;

        let user = storage
            .get_user_by_email_impl("ANA@escuela.mx ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.status, UserStatus::Active);
        assert!(!user.biometric_enabled);

        let updated = storage
            .update_user_impl(
                id,
                UpdateUserRequest {
                    email: None,
                    password: None,
                    full_name: Some("Ana López".into()),
                    role: None,
                    status: Some(UserStatus::Suspended),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.full_name, "Ana López");
        assert_eq!(updated.status, UserStatus::Suspended);

        assert!(storage.delete_user_impl(id).await.unwrap());
        assert!(storage.get_user_by_id_impl(id).await.unwrap().is_none());
        assert!(!storage.delete_user_impl(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let storage = memory_storage().await;
        create_user(&storage, "dup@escuela.mx", UserRole::Teacher).await;
        let err = storage
            .create_user_impl(CreateUserRequest {
                email: "dup@escuela.mx".into(),
                password: "hashed".into(),
                full_name: "Dup".into(),
                role: UserRole::Admin,
            })
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_active_teachers_and_filters() {
        let storage = memory_storage().await;
        let t1 = create_user(&storage, "t1@escuela.mx", UserRole::Teacher).await;
        let t2 = create_user(&storage, "t2@escuela.mx", UserRole::Teacher).await;
        create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        storage
            .update_user_impl(
                t2,
                UpdateUserRequest {
                    email: None,
                    password: None,
                    full_name: None,
                    role: None,
                    status: Some(UserStatus::Inactive),
                },
            )
            .await
            .unwrap();

        let teachers = storage.list_active_teachers_impl().await.unwrap();
        assert_eq!(teachers.iter().map(|u| u.id).collect::<Vec<_>>(), vec![t1]);

        let page = storage
            .list_users_with_pagination_impl(UserListQuery {
                page: Some(1),
                size: Some(10),
                role: Some(UserRole::Teacher),
                status: None,
                search: Some("t2".into()),
            })
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
        assert_eq!(page.items[0].id, t2);
        assert_eq!(storage.count_users_impl().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_biometric_bookkeeping() {
        let storage = memory_storage().await;
        let id = create_user(&storage, "bio@escuela.mx", UserRole::Teacher).await;

        storage
            .set_biometric_credential_impl(id, Some("cred-123".into()))
            .await
            .unwrap();
        storage.set_biometric_enabled_impl(id, true).await.unwrap();
        let user = storage.get_user_by_id_impl(id).await.unwrap().unwrap();
        assert!(user.biometric_enabled);
        assert_eq!(user.biometric_credential_id.as_deref(), Some("cred-123"));
        let owner = storage
            .get_user_by_credential_id_impl("cred-123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(owner.id, id);

        // 清除凭据时同时关闭
        storage.set_biometric_credential_impl(id, None).await.unwrap();
        let user = storage.get_user_by_id_impl(id).await.unwrap().unwrap();
        assert!(!user.biometric_enabled);
        assert!(user.biometric_credential_id.is_none());
        assert!(
            storage
                .get_user_by_credential_id_impl("cred-123")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_assignment_creator_is_conflict() {
        let storage = memory_storage().await;
        let admin = create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        let teacher = create_user(&storage, "t1@escuela.mx", UserRole::Teacher).await;
        storage
            .create_assignment_impl(assignment_for(
                admin,
                Utc::now() + Duration::days(3),
                vec![teacher],
            ))
            .await
            .unwrap();

        let err = storage.delete_user_impl(admin).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        // 用户与作业都保留
        assert!(storage.get_user_by_id_impl(admin).await.unwrap().is_some());
        assert_eq!(storage.count_assignments_impl().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_teacher_reconciles_assignments() {
        let storage = memory_storage().await;
        let admin = create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        let t1 = create_user(&storage, "t1@escuela.mx", UserRole::Teacher).await;
        let t2 = create_user(&storage, "t2@escuela.mx", UserRole::Teacher).await;

        let now = Utc::now();
        let assignment = storage
            .create_assignment_impl(assignment_for(admin, now - Duration::days(1), vec![t1, t2]))
            .await
            .unwrap();
        let late = ResponsePatch {
            submitted_at: Some(now),
            submission_status: SubmissionStatus::Late,
            status: ResponseStatus::Submitted,
            files: Some(vec!["calificaciones.xlsx".into()]),
        };
        let assignment = storage
            .upsert_response_impl(assignment.id, t1, late, now)
            .await
            .unwrap()
            .unwrap();
        // t2 未提交且已过截止时间
        assert_eq!(assignment.status, AssignmentStatus::NotDelivered);

        assert!(storage.delete_user_impl(t2).await.unwrap());

        let stored = storage
            .get_assignment_by_id_impl(assignment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.assigned_to, vec![t1]);
        assert_eq!(stored.status, AssignmentStatus::CompletedLate);
    }
}
