//! 作业实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub due_date: i64,
    pub close_date: Option<i64>,
    pub created_by: i64,
    pub is_general: bool,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedBy",
        to = "super::users::Column::Id"
    )]
    Creator,
    #[sea_orm(has_many = "super::assignment_teachers::Entity")]
    AssignmentTeachers,
    #[sea_orm(has_many = "super::assignment_responses::Entity")]
    AssignmentResponses,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Creator.def()
    }
}

impl Related<super::assignment_teachers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignmentTeachers.def()
    }
}

impl Related<super::assignment_responses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AssignmentResponses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// 解析存储的基础状态，未知值视为数据错误
    pub fn parse_status(
        &self,
    ) -> crate::errors::Result<crate::models::assignments::entities::AssignmentStatus> {
        use crate::errors::AppError;

        self.status.parse().map_err(|_| {
            AppError::database_operation(format!(
                "Assignment {} has unknown status '{}'",
                self.id, self.status
            ))
        })
    }

    // 从数据库模型转换为业务模型
    pub fn into_assignment(
        self,
        assigned_to: Vec<i64>,
        responses: Vec<crate::models::assignments::entities::AssignmentResponse>,
    ) -> crate::errors::Result<crate::models::assignments::entities::Assignment> {
        use crate::models::assignments::entities::Assignment;

        let status = self.parse_status()?;
        Ok(Assignment {
            id: self.id,
            title: self.title,
            description: self.description,
            due_date: super::ts_to_datetime(self.due_date),
            close_date: self.close_date.map(super::ts_to_datetime),
            created_by: self.created_by,
            is_general: self.is_general,
            assigned_to,
            status,
            responses,
            created_at: super::ts_to_datetime(self.created_at),
            updated_at: super::ts_to_datetime(self.updated_at),
        })
    }
}
