//! 作业存储操作

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::SeaOrmStorage;
use crate::entity::assignment_responses::{
    Column as ResponseColumn, Entity as AssignmentResponses,
};
use crate::entity::assignment_teachers::{
    ActiveModel as AssignmentTeacherActiveModel, Column as AssignmentTeacherColumn,
    Entity as AssignmentTeachers,
};
use crate::entity::assignments::{ActiveModel, Column, Entity as Assignments, Model};
use crate::errors::{AppError, Result};
use crate::models::{
    PaginationInfo,
    assignments::{
        entities::{Assignment, AssignmentResponse, AssignmentStatus},
        requests::{AssignmentListQuery, AssignmentUpdate, NewAssignment},
        responses::{AssignmentListResponse, ReconcileOutcome},
    },
    common::pagination::normalize_page,
};
use crate::resolver::{next_base_status, reconcile_base_status};
use crate::utils::escape_like_pattern;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

/// 为作业加载分配教师与回复记录
pub(super) async fn hydrate_assignments<C: ConnectionTrait>(
    db: &C,
    models: Vec<Model>,
) -> Result<Vec<Assignment>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = models.iter().map(|m| m.id).collect();

    let links = AssignmentTeachers::find()
        .filter(AssignmentTeacherColumn::AssignmentId.is_in(ids.clone()))
        .order_by_asc(AssignmentTeacherColumn::Id)
        .all(db)
        .await
        .map_err(|e| AppError::database_operation(format!("查询作业分配失败: {e}")))?;
    let mut assigned: HashMap<i64, Vec<i64>> = HashMap::new();
    for link in links {
        assigned
            .entry(link.assignment_id)
            .or_default()
            .push(link.teacher_id);
    }

    let response_models = AssignmentResponses::find()
        .filter(ResponseColumn::AssignmentId.is_in(ids))
        .order_by_asc(ResponseColumn::Id)
        .all(db)
        .await
        .map_err(|e| AppError::database_operation(format!("查询作业回复失败: {e}")))?;
    let mut responses: HashMap<i64, Vec<AssignmentResponse>> = HashMap::new();
    for model in response_models {
        let assignment_id = model.assignment_id;
        responses
            .entry(assignment_id)
            .or_default()
            .push(model.into_response()?);
    }

    models
        .into_iter()
        .map(|m| {
            let id = m.id;
            m.into_assignment(
                assigned.remove(&id).unwrap_or_default(),
                responses.remove(&id).unwrap_or_default(),
            )
        })
        .collect()
}

/// 加载单个作业
pub(super) async fn load_assignment<C: ConnectionTrait>(
    db: &C,
    id: i64,
) -> Result<Option<Assignment>> {
    let Some(model) = Assignments::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| AppError::database_operation(format!("查询作业失败: {e}")))?
    else {
        return Ok(None);
    };

    Ok(hydrate_assignments(db, vec![model]).await?.pop())
}

/// 锁定作业行
///
/// 空写 `updated_at` 使事务先取得写锁（SQLite 为数据库写锁，PostgreSQL/MySQL 为行锁），
/// 之后的读取与回写不会与其他写事务交错。
pub(super) async fn lock_assignments<C: ConnectionTrait>(db: &C, ids: &[i64]) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    Assignments::update_many()
        .col_expr(
            Column::UpdatedAt,
            sea_orm::sea_query::Expr::col(Column::UpdatedAt),
        )
        .filter(Column::Id.is_in(ids.to_vec()))
        .exec(db)
        .await
        .map_err(|e| AppError::database_operation(format!("锁定作业失败: {e}")))?;
    Ok(())
}

/// 重新计算基础状态，变化时写回数据库
pub(super) async fn persist_reconciled<C: ConnectionTrait>(
    db: &C,
    assignment: &mut Assignment,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome> {
    let previous = assignment.status;
    let current = next_base_status(previous, reconcile_base_status(assignment, now));

    if current != previous {
        Assignments::update_many()
            .col_expr(
                Column::Status,
                sea_orm::sea_query::Expr::value(current.as_str()),
            )
            .col_expr(
                Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(now.timestamp()),
            )
            .filter(Column::Id.eq(assignment.id))
            .exec(db)
            .await
            .map_err(|e| AppError::database_operation(format!("更新作业状态失败: {e}")))?;
        assignment.status = current;
        assignment.updated_at = now;
    }

    Ok(ReconcileOutcome {
        assignment_id: assignment.id,
        previous,
        current,
    })
}

/// 写入分配教师，重复 ID 只保留一次
async fn insert_assignees<C: ConnectionTrait>(
    db: &C,
    assignment_id: i64,
    teacher_ids: &[i64],
) -> Result<()> {
    let mut seen = Vec::with_capacity(teacher_ids.len());
    for &teacher_id in teacher_ids {
        if seen.contains(&teacher_id) {
            continue;
        }
        seen.push(teacher_id);
        AssignmentTeacherActiveModel {
            assignment_id: Set(assignment_id),
            teacher_id: Set(teacher_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| AppError::database_operation(format!("分配教师失败: {e}")))?;
    }
    Ok(())
}

impl SeaOrmStorage {
    /// 创建作业
    pub async fn create_assignment_impl(&self, req: NewAssignment) -> Result<Assignment> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let model = ActiveModel {
            title: Set(req.title),
            description: Set(req.description),
            due_date: Set(req.due_date.timestamp()),
            close_date: Set(req.close_date.map(|dt| dt.timestamp())),
            created_by: Set(req.created_by),
            is_general: Set(req.is_general),
            status: Set(AssignmentStatus::Pending.to_string()),
            created_at: Set(now.timestamp()),
            updated_at: Set(now.timestamp()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::database_operation(format!("创建作业失败: {e}")))?;

        insert_assignees(&txn, model.id, &req.assigned_to).await?;

        let mut assignment = hydrate_assignments(&txn, vec![model])
            .await?
            .pop()
            .ok_or_else(|| AppError::database_operation("作业创建后无法读取"))?;
        persist_reconciled(&txn, &mut assignment, now).await?;

        txn.commit().await?;
        Ok(assignment)
    }

    /// 通过 ID 获取作业
    pub async fn get_assignment_by_id_impl(&self, id: i64) -> Result<Option<Assignment>> {
        load_assignment(&self.db, id).await
    }

    /// 分页列出作业
    pub async fn list_assignments_with_pagination_impl(
        &self,
        query: AssignmentListQuery,
    ) -> Result<AssignmentListResponse> {
        let (page, size) = normalize_page(query.page, query.size);

        let mut select = Assignments::find();

        // 基础状态筛选
        if let Some(status) = query.status {
            select = select.filter(Column::Status.eq(status.as_str()));
        }

        // 创建者筛选
        if let Some(created_by) = query.created_by {
            select = select.filter(Column::CreatedBy.eq(created_by));
        }

        // 搜索条件（按标题搜索）
        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            let escaped = escape_like_pattern(search.trim());
            select = select.filter(Column::Title.contains(&escaped));
        }

        select = select
            .order_by_desc(Column::DueDate)
            .order_by_desc(Column::Id);

        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| AppError::database_operation(format!("查询作业总数失败: {e}")))?;

        let models = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| AppError::database_operation(format!("查询作业列表失败: {e}")))?;

        Ok(AssignmentListResponse {
            items: hydrate_assignments(&self.db, models).await?,
            pagination: PaginationInfo::new(page as i64, size as i64, total as i64),
        })
    }

    /// 列出分配给教师的作业，冻结状态的作业对教师不可见
    pub async fn list_teacher_assignments_impl(
        &self,
        teacher_id: i64,
        search: Option<String>,
    ) -> Result<Vec<Assignment>> {
        let ids: Vec<i64> = AssignmentTeachers::find()
            .filter(AssignmentTeacherColumn::TeacherId.eq(teacher_id))
            .all(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("查询教师作业失败: {e}")))?
            .into_iter()
            .map(|link| link.assignment_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let holds: Vec<&str> = AssignmentStatus::ALL
            .iter()
            .filter(|s| s.is_hold())
            .map(|s| s.as_str())
            .collect();

        let mut select = Assignments::find()
            .filter(Column::Id.is_in(ids))
            .filter(Column::Status.is_not_in(holds));

        if let Some(ref search) = search
            && !search.trim().is_empty()
        {
            let escaped = escape_like_pattern(search.trim());
            select = select.filter(Column::Title.contains(&escaped));
        }

        let models = select
            .order_by_asc(Column::DueDate)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("查询教师作业失败: {e}")))?;

        hydrate_assignments(&self.db, models).await
    }

    /// 更新作业并重新计算基础状态
    ///
    /// 替换分配教师时，被移除教师的回复一并删除。
    pub async fn update_assignment_impl(
        &self,
        id: i64,
        update: AssignmentUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>> {
        let txn = self.db.begin().await?;
        lock_assignments(&txn, &[id]).await?;

        let Some(existing) = Assignments::find_by_id(id)
            .one(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("查询作业失败: {e}")))?
        else {
            return Ok(None);
        };

        let mut model: ActiveModel = existing.into();
        model.updated_at = Set(now.timestamp());

        if let Some(title) = update.title {
            model.title = Set(title);
        }

        if let Some(description) = update.description {
            model.description = Set(Some(description));
        }

        if let Some(due_date) = update.due_date {
            model.due_date = Set(due_date.timestamp());
        }

        // Some(None) 表示清除关闭时间
        if let Some(close_date) = update.close_date {
            model.close_date = Set(close_date.map(|dt| dt.timestamp()));
        }

        if let Some(status) = update.status {
            model.status = Set(status.to_string());
        }

        let model = model
            .update(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("更新作业失败: {e}")))?;

        if let Some(assigned_to) = update.assigned_to {
            AssignmentResponses::delete_many()
                .filter(ResponseColumn::AssignmentId.eq(id))
                .filter(ResponseColumn::TeacherId.is_not_in(assigned_to.clone()))
                .exec(&txn)
                .await
                .map_err(|e| AppError::database_operation(format!("清除移除教师的回复失败: {e}")))?;
            AssignmentTeachers::delete_many()
                .filter(AssignmentTeacherColumn::AssignmentId.eq(id))
                .exec(&txn)
                .await
                .map_err(|e| AppError::database_operation(format!("清除作业分配失败: {e}")))?;
            insert_assignees(&txn, id, &assigned_to).await?;
        }

        let mut assignment = hydrate_assignments(&txn, vec![model])
            .await?
            .pop()
            .ok_or_else(|| AppError::database_operation("作业更新后无法读取"))?;
        persist_reconciled(&txn, &mut assignment, now).await?;

        txn.commit().await?;
        Ok(Some(assignment))
    }

    /// 删除作业及其分配与回复
    pub async fn delete_assignment_impl(&self, id: i64) -> Result<bool> {
        let txn = self.db.begin().await?;

        AssignmentResponses::delete_many()
            .filter(ResponseColumn::AssignmentId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("删除作业回复失败: {e}")))?;
        AssignmentTeachers::delete_many()
            .filter(AssignmentTeacherColumn::AssignmentId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("删除作业分配失败: {e}")))?;
        let result = Assignments::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("删除作业失败: {e}")))?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    /// 统计作业数量
    pub async fn count_assignments_impl(&self) -> Result<u64> {
        let count = Assignments::find()
            .count(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("统计作业数量失败: {e}")))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{create_user, memory_storage};
    use super::*;
    use crate::models::assignments::entities::{ResponsePatch, ResponseStatus, SubmissionStatus};
    use crate::models::users::entities::UserRole;
    use chrono::{Duration, TimeZone};

    fn new_assignment(created_by: i64, due: DateTime<Utc>, assigned_to: Vec<i64>) -> NewAssignment {
        NewAssignment {
            title: "Reporte de evaluación".into(),
            description: Some("Primer parcial".into()),
            due_date: due,
            close_date: None,
            created_by,
            is_general: false,
            assigned_to,
        }
    }

    #[tokio::test]
    async fn test_create_dedups_assignees_and_reconciles() {
        let storage = memory_storage().await;
        let admin = create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        let t1 = create_user(&storage, "t1@escuela.mx", UserRole::Teacher).await;

        let past_due = Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap();
        let assignment = storage
            .create_assignment_impl(new_assignment(admin, past_due, vec![t1, t1]))
            .await
            .unwrap();
        assert_eq!(assignment.assigned_to, vec![t1]);
        // 截止时间已过且无人提交
        assert_eq!(assignment.status, AssignmentStatus::NotDelivered);

        let loaded = storage
            .get_assignment_by_id_impl(assignment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status, AssignmentStatus::NotDelivered);
        assert_eq!(loaded.description.as_deref(), Some("Primer parcial"));
    }

    #[tokio::test]
    async fn test_list_filters_by_base_status() {
        let storage = memory_storage().await;
        let admin = create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        let t1 = create_user(&storage, "t1@escuela.mx", UserRole::Teacher).await;

        let future = Utc::now() + Duration::days(7);
        let past = Utc::now() - Duration::days(7);
        storage
            .create_assignment_impl(new_assignment(admin, future, vec![t1]))
            .await
            .unwrap();
        storage
            .create_assignment_impl(new_assignment(admin, past, vec![t1]))
            .await
            .unwrap();

        let pending = storage
            .list_assignments_with_pagination_impl(AssignmentListQuery {
                page: Some(1),
                size: Some(10),
                status: Some(AssignmentStatus::Pending),
                created_by: None,
                search: None,
            })
            .await
            .unwrap();
        assert_eq!(pending.pagination.total, 1);
        assert_eq!(pending.items[0].due_date.timestamp(), future.timestamp());

        let all = storage
            .list_assignments_with_pagination_impl(AssignmentListQuery {
                page: Some(1),
                size: Some(10),
                status: None,
                created_by: Some(admin),
                search: Some("evaluación".into()),
            })
            .await
            .unwrap();
        assert_eq!(all.pagination.total, 2);
        assert_eq!(storage.count_assignments_impl().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_hold_and_release_reconciles() {
        let storage = memory_storage().await;
        let admin = create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        let t1 = create_user(&storage, "t1@escuela.mx", UserRole::Teacher).await;
        let now = Utc::now();
        let created = storage
            .create_assignment_impl(new_assignment(admin, now - Duration::days(1), vec![t1]))
            .await
            .unwrap();

        let held = storage
            .update_assignment_impl(
                created.id,
                AssignmentUpdate {
                    status: Some(AssignmentStatus::Cancelled),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(held.status, AssignmentStatus::Cancelled);

        // 冻结状态的作业不出现在教师列表中
        assert!(
            storage
                .list_teacher_assignments_impl(t1, None)
                .await
                .unwrap()
                .is_empty()
        );

        let released = storage
            .update_assignment_impl(
                created.id,
                AssignmentUpdate {
                    status: Some(AssignmentStatus::Active),
                    due_date: Some(now + Duration::days(3)),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(released.status, AssignmentStatus::Pending);
        assert_eq!(
            storage
                .list_teacher_assignments_impl(t1, None)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_assignees_and_delete() {
        let storage = memory_storage().await;
        let admin = create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        let t1 = create_user(&storage, "t1@escuela.mx", UserRole::Teacher).await;
        let t2 = create_user(&storage, "t2@escuela.mx", UserRole::Teacher).await;
        let created = storage
            .create_assignment_impl(new_assignment(
                admin,
                Utc::now() + Duration::days(1),
                vec![t1],
            ))
            .await
            .unwrap();

        let updated = storage
            .update_assignment_impl(
                created.id,
                AssignmentUpdate {
                    assigned_to: Some(vec![t2]),
                    ..Default::default()
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.assigned_to, vec![t2]);
        assert!(
            storage
                .list_teacher_assignments_impl(t1, None)
                .await
                .unwrap()
                .is_empty()
        );

        assert!(storage.delete_assignment_impl(created.id).await.unwrap());
        assert!(
            storage
                .get_assignment_by_id_impl(created.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            storage
                .update_assignment_impl(created.id, AssignmentUpdate::default(), Utc::now())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_reassign_drops_responses_of_removed_teachers() {
        let storage = memory_storage().await;
        let admin = create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        let t1 = create_user(&storage, "t1@escuela.mx", UserRole::Teacher).await;
        let t2 = create_user(&storage, "t2@escuela.mx", UserRole::Teacher).await;
        let now = Utc::now();
        let created = storage
            .create_assignment_impl(new_assignment(admin, now + Duration::days(2), vec![t1, t2]))
            .await
            .unwrap();

        let on_time = |file: &str| ResponsePatch {
            submitted_at: Some(now),
            submission_status: SubmissionStatus::OnTime,
            status: ResponseStatus::Submitted,
            files: Some(vec![file.to_string()]),
        };
        for teacher in [t1, t2] {
            storage
                .upsert_response_impl(created.id, teacher, on_time("evidencia.pdf"), now)
                .await
                .unwrap();
        }

        let updated = storage
            .update_assignment_impl(
                created.id,
                AssignmentUpdate {
                    assigned_to: Some(vec![t2]),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.responses.len(), 1);
        assert_eq!(updated.responses[0].teacher_id, t2);

        // 重新分配后不会恢复旧回复
        let readded = storage
            .update_assignment_impl(
                created.id,
                AssignmentUpdate {
                    assigned_to: Some(vec![t1, t2]),
                    ..Default::default()
                },
                now,
            )
            .await
            .unwrap()
            .unwrap();
        assert!(readded.response_for(t1).is_none());
        assert_eq!(readded.status, AssignmentStatus::Pending);
    }

    #[tokio::test]
    async fn test_close_date_set_and_cleared() {
        let storage = memory_storage().await;
        let admin = create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        let due = Utc.with_ymd_and_hms(2030, 3, 1, 23, 59, 59).unwrap();
        let created = storage
            .create_assignment_impl(new_assignment(admin, due, Vec::new()))
            .await
            .unwrap();

        let close = due + Duration::days(7);
        let closed = storage
            .update_assignment_impl(
                created.id,
                AssignmentUpdate {
                    close_date: Some(Some(close)),
                    ..Default::default()
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.close_date, Some(close));

        // 未提供关闭时间时保持原值
        let renamed = storage
            .update_assignment_impl(
                created.id,
                AssignmentUpdate {
                    title: Some("Acta de cierre".into()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.close_date, Some(close));

        let cleared = storage
            .update_assignment_impl(
                created.id,
                AssignmentUpdate {
                    close_date: Some(None),
                    ..Default::default()
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.close_date, None);
    }
}
