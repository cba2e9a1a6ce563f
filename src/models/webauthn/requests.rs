use serde::Deserialize;

/// 开关生物识别登录
#[derive(Debug, Deserialize)]
pub struct ToggleBiometricRequest {
    pub enabled: bool,
}

/// 记录由浏览器端注册流程生成的凭据
#[derive(Debug, Deserialize)]
pub struct RegisterCredentialRequest {
    pub credential_id: String,
    /// 本次注册使用的挑战值，必须由 `POST /challenge` 签发且未过期
    pub challenge: String,
}

/// 生物识别快速登录
#[derive(Debug, Deserialize)]
pub struct QuickLoginRequest {
    pub credential_id: String,
    pub challenge: String,
}
