//! 对象缓存
//!
//! 缓存值统一以 JSON 字符串存储，`get`/`insert` 负责序列化。

pub mod object_cache;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::config::CacheConfig;

pub use object_cache::moka::MokaCacheWrapper;

/// 缓存查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    Found(T),
    NotFound,
}

#[async_trait]
pub trait ObjectCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> CacheResult<String>;
    /// ttl 以秒计，0 表示使用默认 TTL
    async fn insert_raw(&self, key: String, value: String, ttl: u64);
    /// 取出并移除，同一键只能取到一次
    async fn take_raw(&self, key: &str) -> CacheResult<String>;
    async fn remove(&self, key: &str);
    async fn invalidate_all(&self);
}

impl dyn ObjectCache {
    /// 读取并反序列化，数据损坏时移除该键
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<T> {
        match self.get_raw(key).await {
            CacheResult::Found(json) => match serde_json::from_str::<T>(&json) {
                Ok(value) => CacheResult::Found(value),
                Err(_) => {
                    tracing::debug!("Dropping undecodable cache entry: {}", key);
                    self.remove(key).await;
                    CacheResult::NotFound
                }
            },
            CacheResult::NotFound => CacheResult::NotFound,
        }
    }

    /// 取出并反序列化
    pub async fn take<T: DeserializeOwned>(&self, key: &str) -> CacheResult<T> {
        match self.take_raw(key).await {
            CacheResult::Found(json) => serde_json::from_str::<T>(&json)
                .map(CacheResult::Found)
                .unwrap_or(CacheResult::NotFound),
            CacheResult::NotFound => CacheResult::NotFound,
        }
    }

    pub async fn insert<T: Serialize>(&self, key: String, value: &T, ttl: u64) {
        if let Ok(json) = serde_json::to_string(value) {
            self.insert_raw(key, json, ttl).await;
        }
    }
}

/// 已认证用户的缓存键
pub fn user_cache_key(user_id: i64) -> String {
    format!("user:{user_id}")
}

/// 创建缓存实例
pub fn create_cache(config: &CacheConfig) -> Arc<dyn ObjectCache> {
    Arc::new(MokaCacheWrapper::new(config))
}
