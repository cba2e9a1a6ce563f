//! 教师回复实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assignment_responses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub assignment_id: i64,
    pub teacher_id: i64,
    pub submitted_at: Option<i64>,
    pub submission_status: String,
    pub status: String,
    // JSON 数组
    #[sea_orm(column_type = "Text", nullable)]
    pub files: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::assignments::Entity",
        from = "Column::AssignmentId",
        to = "super::assignments::Column::Id"
    )]
    Assignment,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::TeacherId",
        to = "super::users::Column::Id"
    )]
    Teacher,
}

impl Related<super::assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teacher.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// 从数据库模型转换为业务模型
impl Model {
    pub fn into_response(
        self,
    ) -> crate::errors::Result<crate::models::assignments::entities::AssignmentResponse> {
        use crate::errors::AppError;
        use crate::models::assignments::entities::{
            AssignmentResponse, ResponseStatus, SubmissionStatus,
        };

        // 空字符串视为未提交
        let submission_status = match self.submission_status.trim() {
            "" => SubmissionStatus::None,
            s => s.parse::<SubmissionStatus>().map_err(|_| {
                AppError::database_operation(format!(
                    "Response {} has unknown submission status '{s}'",
                    self.id
                ))
            })?,
        };
        let status = match self.status.trim() {
            "" => ResponseStatus::None,
            s => s.parse::<ResponseStatus>().map_err(|_| {
                AppError::database_operation(format!(
                    "Response {} has unknown status '{s}'",
                    self.id
                ))
            })?,
        };
        let files = match self.files.as_deref() {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str::<Vec<String>>(raw)?,
        };

        Ok(AssignmentResponse {
            id: self.id,
            teacher_id: self.teacher_id,
            submitted_at: self.submitted_at.map(super::ts_to_datetime),
            submission_status,
            status,
            files,
            updated_at: super::ts_to_datetime(self.updated_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assignments::entities::{ResponseStatus, SubmissionStatus};

    fn model(submission_status: &str, status: &str, files: Option<&str>) -> Model {
        Model {
            id: 1,
            assignment_id: 1,
            teacher_id: 2,
            submitted_at: Some(1_754_000_000),
            submission_status: submission_status.into(),
            status: status.into(),
            files: files.map(String::from),
            created_at: 1_754_000_000,
            updated_at: 1_754_000_000,
        }
    }

    #[test]
    fn test_into_response_parses_statuses_and_files() {
        let r = model("late", "submitted", Some(r#"["acta.pdf","anexo.docx"]"#))
            .into_response()
            .unwrap();
        assert_eq!(r.submission_status, SubmissionStatus::Late);
        assert_eq!(r.status, ResponseStatus::Submitted);
        assert_eq!(r.files, vec!["acta.pdf", "anexo.docx"]);
    }

    #[test]
    fn test_missing_submission_status_is_none() {
        let r = model("", "", None).into_response().unwrap();
        assert_eq!(r.submission_status, SubmissionStatus::None);
        assert_eq!(r.status, ResponseStatus::None);
        assert!(r.files.is_empty());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = model("early", "submitted", None).into_response().unwrap_err();
        assert_eq!(err.code(), "E004");
        assert!(model("on-time", "graded", None).into_response().is_err());
    }
}
