use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BiometricStatusResponse {
    pub enabled: bool,
    pub registered: bool,
    pub rp_id: String,
    pub origin: String,
}

/// 注册/认证挑战
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
    pub rp_id: String,
    pub rp_name: String,
    // 毫秒
    pub timeout: u64,
}
