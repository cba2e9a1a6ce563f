pub mod assignments;
pub mod auth;
pub mod common;
pub mod stats;
pub mod users;
pub mod webauthn;

use chrono::{DateTime, Utc};

pub use common::{ApiResponse, ErrorCode, PaginationInfo, PaginationQuery};

#[derive(Clone)]
pub struct AppStartTime {
    pub start_datetime: DateTime<Utc>,
}
