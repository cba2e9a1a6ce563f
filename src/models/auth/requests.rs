use serde::Deserialize;

// 用户登录请求（来自HTTP请求）
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// 登录邮箱
    pub email: String,
    /// 密码
    pub password: String,
}
