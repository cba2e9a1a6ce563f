//! 统计与维护操作

use super::SeaOrmStorage;
use crate::entity::assignments::{Column, Entity as Assignments};
use crate::errors::{AppError, Result};
use crate::models::assignments::{entities::AssignmentStatus, responses::LegacyStatusFix};
use crate::models::stats::responses::StatusCount;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

/// 旧版本使用过的状态值
const LEGACY_STATUS_MAP: [(&str, AssignmentStatus); 4] = [
    ("expired", AssignmentStatus::NotDelivered),
    ("late", AssignmentStatus::CompletedLate),
    ("overdue", AssignmentStatus::NotDelivered),
    ("submitted", AssignmentStatus::Completed),
];

impl SeaOrmStorage {
    /// 按存储的基础状态统计作业数量
    pub async fn count_assignments_by_status_impl(&self) -> Result<Vec<StatusCount>> {
        let rows: Vec<(String, i64)> = Assignments::find()
            .select_only()
            .column(Column::Status)
            .column_as(Column::Id.count(), "count")
            .group_by(Column::Status)
            .order_by_asc(Column::Status)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("统计作业状态失败: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    /// 迁移旧状态值，其余未知值重置为 pending
    pub async fn normalize_legacy_statuses_impl(&self) -> Result<Vec<LegacyStatusFix>> {
        let mut fixes = Vec::new();

        for (from, to) in LEGACY_STATUS_MAP {
            let rows = self.rewrite_status(from, to).await?;
            if rows > 0 {
                fixes.push(LegacyStatusFix {
                    from: from.to_string(),
                    to,
                    rows,
                });
            }
        }

        for count in self.count_assignments_by_status_impl().await? {
            if count.status.parse::<AssignmentStatus>().is_ok() {
                continue;
            }
            let rows = self
                .rewrite_status(&count.status, AssignmentStatus::Pending)
                .await?;
            if rows > 0 {
                fixes.push(LegacyStatusFix {
                    from: count.status,
                    to: AssignmentStatus::Pending,
                    rows,
                });
            }
        }

        Ok(fixes)
    }

    async fn rewrite_status(&self, from: &str, to: AssignmentStatus) -> Result<u64> {
        let result = Assignments::update_many()
            .col_expr(Column::Status, sea_orm::sea_query::Expr::value(to.as_str()))
            .col_expr(
                Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().timestamp()),
            )
            .filter(Column::Status.eq(from))
            .exec(&self.db)
            .await
            .map_err(|e| AppError::database_operation(format!("迁移作业状态失败: {e}")))?;

        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{create_user, memory_storage};
    use super::*;
    use crate::models::assignments::requests::NewAssignment;
    use crate::models::users::entities::UserRole;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_counts_and_legacy_normalization() {
        let storage = memory_storage().await;
        let admin = create_user(&storage, "admin@escuela.mx", UserRole::Admin).await;
        let mut ids = Vec::new();
        for title in ["a", "b", "c", "d"] {
            let assignment = storage
                .create_assignment_impl(NewAssignment {
                    title: title.into(),
                    description: None,
                    due_date: Utc::now() + Duration::days(1),
                    close_date: None,
                    created_by: admin,
                    is_general: false,
                    assigned_to: vec![],
                })
                .await
                .unwrap();
            ids.push(assignment.id);
        }

        // 模拟旧数据
        for (id, legacy) in ids.iter().zip(["expired", "late", "weird", "pending"]) {
            Assignments::update_many()
                .col_expr(Column::Status, sea_orm::sea_query::Expr::value(legacy))
                .filter(Column::Id.eq(*id))
                .exec(&storage.db)
                .await
                .unwrap();
        }

        // 未知状态在读取时被拒绝
        assert!(storage.get_assignment_by_id_impl(ids[2]).await.is_err());

        let fixes = storage.normalize_legacy_statuses_impl().await.unwrap();
        assert_eq!(
            fixes,
            vec![
                LegacyStatusFix {
                    from: "expired".into(),
                    to: AssignmentStatus::NotDelivered,
                    rows: 1
                },
                LegacyStatusFix {
                    from: "late".into(),
                    to: AssignmentStatus::CompletedLate,
                    rows: 1
                },
                LegacyStatusFix {
                    from: "weird".into(),
                    to: AssignmentStatus::Pending,
                    rows: 1
                },
            ]
        );

        let counts = storage.count_assignments_by_status_impl().await.unwrap();
        assert_eq!(
            counts,
            vec![
                StatusCount {
                    status: "completed-late".into(),
                    count: 1
                },
                StatusCount {
                    status: "not-delivered".into(),
                    count: 1
                },
                StatusCount {
                    status: "pending".into(),
                    count: 2
                },
            ]
        );
    }
}
