//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod assignments;
mod responses;
mod stats;
mod users;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// 数据库繁忙时写事务的最大重试次数
const BUSY_RETRIES: u32 = 5;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async(config: &DatabaseConfig) -> Result<Self> {
        let db_url = Self::build_database_url(&config.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite:") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| AppError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM storage initialized, database: {}", db_url);

        Ok(Self { db })
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        let in_memory = url.contains(":memory:");
        let mut opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .pragma("temp_store", "memory");
        if !in_memory {
            opt = opt
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .pragma("cache_size", "-64000");
        }

        // 内存数据库每个连接相互独立，只能使用单连接
        let max_connections = if in_memory { 1 } else { config.pool_size };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.timeout))
            .idle_timeout(None)
            .connect_with(opt)
            .await
            .map_err(|e| AppError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.pool_size)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.timeout))
            .acquire_timeout(Duration::from_secs(config.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| AppError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 写事务遇到数据库繁忙时退避重试
    async fn retry_on_busy<T, F, Fut>(&self, operation: &str, mut run: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match run().await {
                Err(e) if e.is_busy() && attempt < BUSY_RETRIES => {
                    attempt += 1;
                    warn!(
                        "{} hit a busy database, retry {}/{}: {}",
                        operation,
                        attempt,
                        BUSY_RETRIES,
                        e.message()
                    );
                    tokio::time::sleep(Duration::from_millis(25 * u64::from(attempt))).await;
                }
                result => return result,
            }
        }
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    pub(crate) fn build_database_url(url: &str) -> Result<String> {
        let url = url.trim();
        if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url == ":memory:" {
            Ok("sqlite::memory:".to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{url}?mode=rwc"))
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(AppError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

// Storage trait 实现
use crate::models::{
    assignments::{
        entities::{Assignment, ResponsePatch},
        requests::{AssignmentListQuery, AssignmentUpdate, NewAssignment},
        responses::{AssignmentListResponse, LegacyStatusFix, ReconcileOutcome},
    },
    stats::responses::StatusCount,
    users::{
        entities::{User, UserRole},
        requests::{CreateUserRequest, UpdateUserRequest, UserListQuery},
        responses::UserListResponse,
    },
};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn create_user(&self, user: CreateUserRequest) -> Result<User> {
        self.create_user_impl(user).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        self.get_users_by_ids_impl(ids).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.get_user_by_email_impl(email).await
    }

    async fn get_user_by_credential_id(&self, credential_id: &str) -> Result<Option<User>> {
        self.get_user_by_credential_id_impl(credential_id).await
    }

    async fn list_users_with_pagination(&self, query: UserListQuery) -> Result<UserListResponse> {
        self.list_users_with_pagination_impl(query).await
    }

    async fn list_users_by_role(&self, role: Option<UserRole>) -> Result<Vec<User>> {
        self.list_users_by_role_impl(role).await
    }

    async fn list_active_teachers(&self) -> Result<Vec<User>> {
        self.list_active_teachers_impl().await
    }

    async fn count_users(&self) -> Result<u64> {
        self.count_users_impl().await
    }

    async fn update_user(&self, id: i64, update: UpdateUserRequest) -> Result<Option<User>> {
        self.update_user_impl(id, update).await
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        self.retry_on_busy("delete_user", || self.delete_user_impl(id))
            .await
    }

    async fn update_last_login(&self, id: i64) -> Result<bool> {
        self.update_last_login_impl(id).await
    }

    async fn set_biometric_enabled(&self, id: i64, enabled: bool) -> Result<bool> {
        self.set_biometric_enabled_impl(id, enabled).await
    }

    async fn set_biometric_credential(
        &self,
        id: i64,
        credential_id: Option<String>,
    ) -> Result<bool> {
        self.set_biometric_credential_impl(id, credential_id).await
    }

    // 作业模块
    async fn create_assignment(&self, assignment: NewAssignment) -> Result<Assignment> {
        self.create_assignment_impl(assignment).await
    }

    async fn get_assignment_by_id(&self, id: i64) -> Result<Option<Assignment>> {
        self.get_assignment_by_id_impl(id).await
    }

    async fn list_assignments_with_pagination(
        &self,
        query: AssignmentListQuery,
    ) -> Result<AssignmentListResponse> {
        self.list_assignments_with_pagination_impl(query).await
    }

    async fn list_teacher_assignments(
        &self,
        teacher_id: i64,
        search: Option<String>,
    ) -> Result<Vec<Assignment>> {
        self.list_teacher_assignments_impl(teacher_id, search).await
    }

    async fn update_assignment(
        &self,
        id: i64,
        update: AssignmentUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>> {
        self.retry_on_busy("update_assignment", || {
            self.update_assignment_impl(id, update.clone(), now)
        })
        .await
    }

    async fn delete_assignment(&self, id: i64) -> Result<bool> {
        self.delete_assignment_impl(id).await
    }

    async fn count_assignments(&self) -> Result<u64> {
        self.count_assignments_impl().await
    }

    // 回复与对账模块
    async fn upsert_response(
        &self,
        assignment_id: i64,
        teacher_id: i64,
        patch: ResponsePatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>> {
        self.retry_on_busy("upsert_response", || {
            self.upsert_response_impl(assignment_id, teacher_id, patch.clone(), now)
        })
        .await
    }

    async fn reset_response(
        &self,
        assignment_id: i64,
        teacher_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Assignment>> {
        self.retry_on_busy("reset_response", || {
            self.reset_response_impl(assignment_id, teacher_id, now)
        })
        .await
    }

    async fn reconcile_assignment(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ReconcileOutcome>> {
        self.retry_on_busy("reconcile_assignment", || {
            self.reconcile_assignment_impl(id, now)
        })
        .await
    }

    async fn reconcile_all_assignments(
        &self,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<Vec<ReconcileOutcome>> {
        self.retry_on_busy("reconcile_all_assignments", || {
            self.reconcile_all_assignments_impl(now, dry_run)
        })
        .await
    }

    // 统计模块
    async fn count_assignments_by_status(&self) -> Result<Vec<StatusCount>> {
        self.count_assignments_by_status_impl().await
    }

    async fn normalize_legacy_statuses(&self) -> Result<Vec<LegacyStatusFix>> {
        self.normalize_legacy_statuses_impl().await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SeaOrmStorage;
    use crate::config::DatabaseConfig;
    use crate::models::users::{entities::UserRole, requests::CreateUserRequest};
    use crate::storage::Storage;

    /// 内存 SQLite 存储，已执行迁移
    pub async fn memory_storage() -> SeaOrmStorage {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            pool_size: 1,
            timeout: 5,
        };
        SeaOrmStorage::new_async(&config)
            .await
            .expect("in-memory storage")
    }

    /// 临时文件 SQLite 存储（WAL，多连接）
    pub async fn file_storage(name: &str) -> (SeaOrmStorage, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "assignment-tracker-{}-{}-{}.db",
            name,
            std::process::id(),
            chrono::Utc::now().timestamp_micros()
        ));
        let config = DatabaseConfig {
            url: path.to_string_lossy().into_owned(),
            pool_size: 4,
            timeout: 5,
        };
        let storage = SeaOrmStorage::new_async(&config)
            .await
            .expect("file storage");
        (storage, path)
    }

    pub fn remove_database_files(path: &std::path::Path) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.as_os_str().to_owned();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }

    pub async fn create_user(storage: &SeaOrmStorage, email: &str, role: UserRole) -> i64 {
        storage
            .create_user(CreateUserRequest {
                email: email.to_string(),
                password: "hashed".to_string(),
                full_name: email.split('@').next().unwrap_or(email).to_string(),
                role,
            })
            .await
            .expect("create user")
            .id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_database_url() {
        assert_eq!(
            SeaOrmStorage::build_database_url("assignments.db").unwrap(),
            "sqlite://assignments.db?mode=rwc"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url(":memory:").unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url("postgres://u:p@db/tracker").unwrap(),
            "postgres://u:p@db/tracker"
        );
        let err = SeaOrmStorage::build_database_url("mongodb+srv://cluster/db").unwrap_err();
        assert_eq!(err.code(), "E002");
    }

    #[tokio::test]
    async fn test_retry_on_busy() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let storage = test_support::memory_storage().await;

        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = storage
            .retry_on_busy("flaky write", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::database_operation("database is locked"))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        // 其他错误不重试
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = storage
            .retry_on_busy("failing write", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::database_operation("no such table: assignments"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // 持续繁忙时有限次后放弃
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<()> = storage
            .retry_on_busy("locked write", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::database_operation("database is locked"))
            })
            .await;
        assert!(result.unwrap_err().is_busy());
        assert_eq!(counter.load(Ordering::SeqCst), BUSY_RETRIES + 1);
    }
}
