//! 预导入模块，方便使用

pub use super::assignment_responses::{
    ActiveModel as AssignmentResponseActiveModel, Entity as AssignmentResponses,
    Model as AssignmentResponseModel,
};
pub use super::assignment_teachers::{
    ActiveModel as AssignmentTeacherActiveModel, Entity as AssignmentTeachers,
    Model as AssignmentTeacherModel,
};
pub use super::assignments::{
    ActiveModel as AssignmentActiveModel, Entity as Assignments, Model as AssignmentModel,
};
pub use super::users::{ActiveModel as UserActiveModel, Entity as Users, Model as UserModel};
