//! 教师回复写入与基础状态对账
//!
//! 回复的写入与基础状态的重新计算在同一事务内完成。事务先锁定作业行再读取，
//! 并发写入同一作业时依次执行，不会覆盖彼此的结果。

use chrono::{DateTime, Utc};

use super::SeaOrmStorage;
use super::assignments::{
    hydrate_assignments, load_assignment, lock_assignments, persist_reconciled,
};
use crate::entity::assignment_responses::{
    ActiveModel as ResponseActiveModel, Column as ResponseColumn, Entity as AssignmentResponses,
};
use crate::entity::assignments::{Column, Entity as Assignments};
use crate::errors::{AppError, Result};
use crate::models::assignments::{
    entities::{Assignment, ResponsePatch},
    responses::ReconcileOutcome,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use tracing::{debug, info};

impl SeaOrmStorage {
    /// 写入教师回复
    pub async fn upsert_response_impl(
        &self,
        assignment_id: i64,
        teacher_id: i64,
        patch: ResponsePatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>> {
        let txn = self.db.begin().await?;
        lock_assignments(&txn, &[assignment_id]).await?;

        // 作业不存在时直接返回
        if Assignments::find_by_id(assignment_id)
            .one(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("查询作业失败: {e}")))?
            .is_none()
        {
            return Ok(None);
        }

        let existing = AssignmentResponses::find()
            .filter(ResponseColumn::AssignmentId.eq(assignment_id))
            .filter(ResponseColumn::TeacherId.eq(teacher_id))
            .one(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("查询教师回复失败: {e}")))?;

        let files = patch
            .files
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        match existing {
            Some(model) => {
                let mut active: ResponseActiveModel = model.into();
                active.submitted_at = Set(patch.submitted_at.map(|dt| dt.timestamp()));
                active.submission_status = Set(patch.submission_status.to_string());
                active.status = Set(patch.status.to_string());
                if files.is_some() {
                    active.files = Set(files);
                }
                active.updated_at = Set(now.timestamp());
                active
                    .update(&txn)
                    .await
                    .map_err(|e| AppError::database_operation(format!("更新教师回复失败: {e}")))?;
            }
            None => {
                ResponseActiveModel {
                    assignment_id: Set(assignment_id),
                    teacher_id: Set(teacher_id),
                    submitted_at: Set(patch.submitted_at.map(|dt| dt.timestamp())),
                    submission_status: Set(patch.submission_status.to_string()),
                    status: Set(patch.status.to_string()),
                    files: Set(files),
                    created_at: Set(now.timestamp()),
                    updated_at: Set(now.timestamp()),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(|e| AppError::database_operation(format!("创建教师回复失败: {e}")))?;
            }
        }

        let Some(mut assignment) = load_assignment(&txn, assignment_id).await? else {
            return Ok(None);
        };
        let outcome = persist_reconciled(&txn, &mut assignment, now).await?;

        txn.commit().await?;

        debug!(
            "Response of teacher {} on assignment {} stored, base status {} -> {}",
            teacher_id, assignment_id, outcome.previous, outcome.current
        );
        Ok(Some(assignment))
    }

    /// 删除教师回复
    pub async fn reset_response_impl(
        &self,
        assignment_id: i64,
        teacher_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>> {
        let txn = self.db.begin().await?;
        lock_assignments(&txn, &[assignment_id]).await?;

        AssignmentResponses::delete_many()
            .filter(ResponseColumn::AssignmentId.eq(assignment_id))
            .filter(ResponseColumn::TeacherId.eq(teacher_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::database_operation(format!("删除教师回复失败: {e}")))?;

        let Some(mut assignment) = load_assignment(&txn, assignment_id).await? else {
            return Ok(None);
        };
        persist_reconciled(&txn, &mut assignment, now).await?;

        txn.commit().await?;
        Ok(Some(assignment))
    }

    /// 重新计算单个作业的基础状态
    pub async fn reconcile_assignment_impl(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ReconcileOutcome>> {
        let txn = self.db.begin().await?;
        lock_assignments(&txn, &[id]).await?;

        let Some(mut assignment) = load_assignment(&txn, id).await? else {
            return Ok(None);
        };
        let outcome = persist_reconciled(&txn, &mut assignment, now).await?;

        txn.commit().await?;
        Ok(Some(outcome))
    }

    /// 重新计算全部作业的基础状态
    ///
    /// 按批次处理，每批一个事务；`dry_run` 时只计算结果。
    pub async fn reconcile_all_assignments_impl(
        &self,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<Vec<ReconcileOutcome>> {
        const BATCH_SIZE: u64 = 200;

        let mut outcomes = Vec::new();
        let mut last_id = 0i64;

        loop {
            let ids: Vec<i64> = Assignments::find()
                .select_only()
                .column(Column::Id)
                .filter(Column::Id.gt(last_id))
                .order_by_asc(Column::Id)
                .limit(BATCH_SIZE)
                .into_tuple()
                .all(&self.db)
                .await
                .map_err(|e| AppError::database_operation(format!("查询作业列表失败: {e}")))?;
            let Some(&last) = ids.last() else {
                break;
            };
            last_id = last;

            let txn = self.db.begin().await?;
            if !dry_run {
                lock_assignments(&txn, &ids).await?;
            }
            let models = Assignments::find()
                .filter(Column::Id.is_in(ids))
                .order_by_asc(Column::Id)
                .all(&txn)
                .await
                .map_err(|e| AppError::database_operation(format!("查询作业列表失败: {e}")))?;

            for mut assignment in hydrate_assignments(&txn, models).await? {
                let outcome = if dry_run {
                    let current = crate::resolver::next_base_status(
                        assignment.status,
                        crate::resolver::reconcile_base_status(&assignment, now),
                    );
                    ReconcileOutcome {
                        assignment_id: assignment.id,
                        previous: assignment.status,
                        current,
                    }
                } else {
                    persist_reconciled(&txn, &mut assignment, now).await?
                };
                outcomes.push(outcome);
            }

            txn.commit().await?;
        }

        let changed = outcomes.iter().filter(|o| o.changed()).count();
        info!(
            "Reconciled {} assignments, {} changed{}",
            outcomes.len(),
            changed,
            if dry_run { " (dry run)" } else { "" }
        );
        Ok(outcomes)
    }
}
