//! Assignment Tracker - 教师作业跟踪后端服务
//!
//! 管理员向教师下发作业，教师提交回复，系统据此计算每位教师的
//! 可见状态以及作业的基础状态。
//!
//! # 架构
//! - `cache`: 缓存层（Moka）
//! - `config`: 配置管理
//! - `entity`: SeaORM 数据库实体
//! - `errors`: 统一错误处理
//! - `middlewares`: 认证授权中间件
//! - `models`: 数据模型定义
//! - `resolver`: 教师状态与基础状态的计算规则
//! - `routes`: API 路由层
//! - `runtime`: 运行时生命周期管理
//! - `services`: 业务逻辑层
//! - `storage`: 数据存储层（SeaORM）
//! - `utils`: 工具函数

pub mod cache;
pub mod config;
pub mod entity;
pub mod errors;
pub mod middlewares;
pub mod models;
pub mod resolver;
pub mod routes;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod utils;
