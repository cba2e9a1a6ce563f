use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 为字符串枚举生成 `as_str` / `Display` / `FromStr`
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $value:literal),* $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)*
                    _ => Err(format!("Invalid {}: {s}", stringify!($name))),
                }
            }
        }
    };
}

/// 作业基础状态（存储在作业上，供管理端筛选）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AssignmentStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "completed-late")]
    CompletedLate,
    #[serde(rename = "not-delivered")]
    NotDelivered,
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "scheduled")]
    Scheduled,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "publication_error")]
    PublicationError,
}

string_enum!(AssignmentStatus {
    Pending => "pending",
    Completed => "completed",
    CompletedLate => "completed-late",
    NotDelivered => "not-delivered",
    Active => "active",
    Scheduled => "scheduled",
    Cancelled => "cancelled",
    PublicationError => "publication_error",
});

impl AssignmentStatus {
    pub const ALL: [AssignmentStatus; 8] = [
        AssignmentStatus::Pending,
        AssignmentStatus::Completed,
        AssignmentStatus::CompletedLate,
        AssignmentStatus::NotDelivered,
        AssignmentStatus::Active,
        AssignmentStatus::Scheduled,
        AssignmentStatus::Cancelled,
        AssignmentStatus::PublicationError,
    ];

    /// 管理端设置的生命周期冻结状态，对账时保持不变
    pub fn is_hold(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Scheduled
                | AssignmentStatus::Cancelled
                | AssignmentStatus::PublicationError
        )
    }
}

/// 教师可见状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TeacherStatus {
    Pending,
    Completed,
    CompletedLate,
    NotDelivered,
}

string_enum!(TeacherStatus {
    Pending => "pending",
    Completed => "completed",
    CompletedLate => "completed-late",
    NotDelivered => "not-delivered",
});

impl TeacherStatus {
    pub const ALL: [TeacherStatus; 4] = [
        TeacherStatus::Pending,
        TeacherStatus::Completed,
        TeacherStatus::CompletedLate,
        TeacherStatus::NotDelivered,
    ];
}

impl From<TeacherStatus> for AssignmentStatus {
    fn from(status: TeacherStatus) -> Self {
        match status {
            TeacherStatus::Pending => AssignmentStatus::Pending,
            TeacherStatus::Completed => AssignmentStatus::Completed,
            TeacherStatus::CompletedLate => AssignmentStatus::CompletedLate,
            TeacherStatus::NotDelivered => AssignmentStatus::NotDelivered,
        }
    }
}

/// 提交时效状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionStatus {
    OnTime,
    Late,
    Closed,
    Draft,
    #[default]
    None,
}

string_enum!(SubmissionStatus {
    OnTime => "on-time",
    Late => "late",
    Closed => "closed",
    Draft => "draft",
    None => "none",
});

/// 回复内部状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseStatus {
    Submitted,
    Reviewed,
    #[default]
    None,
}

string_enum!(ResponseStatus {
    Submitted => "submitted",
    Reviewed => "reviewed",
    None => "none",
});

/// 教师对某个作业的回复记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentResponse {
    pub id: i64,
    pub teacher_id: i64,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submission_status: SubmissionStatus,
    pub status: ResponseStatus,
    pub files: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

/// 对回复记录的写入内容
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePatch {
    pub submitted_at: Option<DateTime<Utc>>,
    pub submission_status: SubmissionStatus,
    pub status: ResponseStatus,
    // None 表示保留原有文件
    pub files: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    // 截止时间
    pub due_date: DateTime<Utc>,
    // 关闭时间，之后不再接受提交
    pub close_date: Option<DateTime<Utc>>,
    pub created_by: i64,
    // 是否面向全部教师
    pub is_general: bool,
    pub assigned_to: Vec<i64>,
    pub status: AssignmentStatus,
    pub responses: Vec<AssignmentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn is_assigned(&self, teacher_id: i64) -> bool {
        self.assigned_to.contains(&teacher_id)
    }

    pub fn response_for(&self, teacher_id: i64) -> Option<&AssignmentResponse> {
        self.responses.iter().find(|r| r.teacher_id == teacher_id)
    }
}
