//! Statement execution engine
//!
//! - Synthesizer: placeholder values
//! - Orderer: INSERT dependency order
//! - Executor: staged batch execution and cleanup
//! - Result: per-statement and aggregate outcomes

pub mod executor;
pub mod orderer;
pub mod result;
pub mod synthesizer;

pub use executor::{CreatedObject, ExecutionEngine, ObjectKind};
pub use orderer::{insert_target, order_inserts};
pub use result::{ExecutionError, ExecutionResult, InsertId, InsertResult, OtherResult, QueryResult};
pub use synthesizer::ValueSynthesizer;

#[cfg(test)]
mod scenarios;
