//! sqlport: dialect-portability statement execution engine
//!
//! Runs SQL written for one dialect against another target and records every
//! failure in a stable taxonomy so corrections can be driven from it.
//!
//! ## 架构
//! - sql: 语句清洗、分类、内存目标使用的解析器与表达式求值
//! - catalog: 批次内学到的表结构与生成的主键
//! - engine: 值合成、INSERT 依赖排序、分阶段执行与清理
//! - taxonomy: 驱动错误 → (code, category)
//! - target: 连接抽象与进程内 Spanner 风格目标
//! - report / runner: 报告、累计结果文件、并发评估
//!
//! ## Example
//! ```
//! use sqlport::{EngineConfig, ExecutionEngine, MemoryConnection};
//!
//! let mut conn = MemoryConnection::new();
//! let mut engine = ExecutionEngine::new(&mut conn, EngineConfig::for_spanner()).unwrap();
//! let result = engine
//!     .execute_statements(&[
//!         "CREATE TABLE departments (dept_id STRING(36) NOT NULL DEFAULT (GENERATE_UUID()), \
//!          dept_name STRING(100)) PRIMARY KEY (dept_id)",
//!         "INSERT INTO departments (dept_name) VALUES (@dept_name) THEN RETURN dept_id",
//!         "DROP TABLE ghost",
//!     ])
//!     .unwrap();
//! assert_eq!(result.executed_count, 3);
//! assert!(result.errors.is_empty());
//! engine.cleanup().unwrap();
//! ```

pub mod config;
pub mod types;
pub mod sql;
pub mod catalog;
pub mod taxonomy;
pub mod target;
pub mod engine;
pub mod report;
pub mod runner;

mod error;

pub use config::{EngineConfig, ForeignKeyHint, TablePriority};
pub use error::{DriverError, DriverResult, EngineError, Result};

pub use catalog::{IdentifierRegistry, SchemaTracker};
pub use engine::{
    ExecutionEngine, ExecutionError, ExecutionResult, InsertId, InsertResult, OtherResult,
    QueryResult, ValueSynthesizer,
};
pub use report::{FileReport, ResultsStore};
pub use runner::{run_units, EvaluationUnit, UnitOutcome};
pub use sql::split_statements;
pub use target::{Connection, ErrorStyle, FixtureCleanup, MemoryConnection, Repository};
pub use taxonomy::{ErrorCategory, ErrorCode, Taxonomy};
pub use types::{Kind, QuoteStyle, Statement, Value};
