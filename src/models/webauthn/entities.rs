use serde::{Deserialize, Serialize};

/// 挑战值用途
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChallengePurpose {
    /// 已登录用户注册凭据
    Registration,
    /// 未登录用户使用凭据快速登录
    Login,
}

/// 缓存中等待使用的挑战值
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingChallenge {
    pub purpose: ChallengePurpose,
    /// 注册挑战绑定的用户
    pub user_id: Option<i64>,
}
