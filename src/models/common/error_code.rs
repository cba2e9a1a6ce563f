use serde::Serialize;

/// 业务错误码
///
/// 以千位区分模块：1xxx 通用，2xxx 认证，3xxx 用户，4xxx 任务，5xxx 生物识别。
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    InternalServerError = 1005,

    AuthFailed = 2000,

    UserNotFound = 3000,
    UserAlreadyExists = 3001,
    UserEmailInvalid = 3002,
    UserPasswordInvalid = 3003,
    UserCreationFailed = 3004,
    UserUpdateFailed = 3005,
    UserDeleteFailed = 3006,
    UserOwnsAssignments = 3007,

    AssignmentNotFound = 4000,
    AssignmentValidationFailed = 4001,
    AssignmentNotAssigned = 4002,
    AssignmentClosed = 4003,
    AssignmentTeacherNotFound = 4004,

    WebAuthnCredentialMissing = 5000,
    WebAuthnChallengeInvalid = 5001,
    BiometricDisabled = 5002,
    WebAuthnCredentialTaken = 5003,
}
