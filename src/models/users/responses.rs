use super::entities::User;
use crate::models::common::PaginationInfo;
use serde::Serialize;

// 用户响应
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}

// 用户列表响应
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub items: Vec<User>,
    pub pagination: PaginationInfo,
}

/// 分配作业时可选的教师
#[derive(Debug, Serialize)]
pub struct TeacherOption {
    pub id: i64,
    pub full_name: String,
    pub email: String,
}

impl From<User> for TeacherOption {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TeacherOptionsResponse {
    pub items: Vec<TeacherOption>,
}
