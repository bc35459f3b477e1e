//! Concurrent evaluation of independent units
//!
//! One thread per unit. Each worker opens its own connection through the
//! factory (which receives the unit id, so it can pick an isolated database)
//! and builds its own engine. Outcomes are fanned in through one channel and
//! every worker is joined before they are collected.

use crate::config::EngineConfig;
use crate::engine::{ExecutionEngine, ExecutionResult};
use crate::error::{EngineError, Result};
use crate::target::Connection;
use crossbeam::channel;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One file, generated SQL string or pipeline iteration
#[derive(Debug, Clone)]
pub struct EvaluationUnit {
    pub id: String,
    pub statements: Vec<String>,
}

impl EvaluationUnit {
    pub fn new(id: impl Into<String>, statements: Vec<String>) -> Self {
        Self {
            id: id.into(),
            statements,
        }
    }
}

#[derive(Debug)]
pub struct UnitOutcome {
    pub id: String,
    /// `Err` only for setup failures (connection, config, worker panic)
    pub result: Result<ExecutionResult>,
    pub cleanup_error: Option<String>,
    pub elapsed: Duration,
}

/// Runs every unit on its own thread; outcomes come back in input order
pub fn run_units<C, F>(units: &[EvaluationUnit], config: &EngineConfig, connect: F) -> Vec<UnitOutcome>
where
    C: Connection,
    F: Fn(&str) -> Result<C> + Sync,
{
    let (tx, rx) = channel::unbounded::<(usize, UnitOutcome)>();

    std::thread::scope(|s| {
        let connect = &connect;
        let handles: Vec<_> = units
            .iter()
            .enumerate()
            .map(|(idx, unit)| {
                let tx = tx.clone();
                s.spawn(move || {
                    let outcome = run_unit(unit, config, connect);
                    // the receiver lives until every worker has been joined
                    let _ = tx.send((idx, outcome));
                })
            })
            .collect();

        for (handle, unit) in handles.into_iter().zip(units) {
            if handle.join().is_err() {
                warn!(unit = %unit.id, "evaluation worker panicked");
            }
        }
    });
    drop(tx);

    let mut slots: Vec<Option<UnitOutcome>> = units.iter().map(|_| None).collect();
    for (idx, outcome) in rx.iter() {
        slots[idx] = Some(outcome);
    }

    slots
        .into_iter()
        .zip(units)
        .map(|(slot, unit)| {
            slot.unwrap_or_else(|| UnitOutcome {
                id: unit.id.clone(),
                result: Err(EngineError::WorkerPanicked(unit.id.clone())),
                cleanup_error: None,
                elapsed: Duration::ZERO,
            })
        })
        .collect()
}

fn run_unit<C, F>(unit: &EvaluationUnit, config: &EngineConfig, connect: &F) -> UnitOutcome
where
    C: Connection,
    F: Fn(&str) -> Result<C>,
{
    let start = Instant::now();
    let mut cleanup_error = None;

    let result = connect(&unit.id).and_then(|mut conn| {
        let mut engine = ExecutionEngine::new(&mut conn, config.clone())?;
        let result = engine.execute_statements(unit.statements.as_slice())?;
        if let Err(e) = engine.cleanup() {
            warn!(unit = %unit.id, error = %e, "cleanup failed");
            cleanup_error = Some(e.to_string());
        }
        Ok(result)
    });

    let elapsed = start.elapsed();
    match &result {
        Ok(r) => info!(
            unit = %unit.id,
            executed = r.executed_count,
            errors = r.errors.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "unit finished"
        ),
        Err(e) => warn!(unit = %unit.id, error = %e, "unit could not be evaluated"),
    }

    UnitOutcome {
        id: unit.id.clone(),
        result,
        cleanup_error,
        elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::MemoryConnection;

    fn unit(id: &str, table: &str) -> EvaluationUnit {
        EvaluationUnit::new(
            id,
            vec![
                format!("CREATE TABLE {} (id INT64 NOT NULL, name STRING(20)) PRIMARY KEY (id)", table),
                format!("INSERT INTO {} (id, name) VALUES (@id, @name)", table),
                format!("SELECT * FROM {}", table),
            ],
        )
    }

    #[test]
    fn test_units_are_isolated_and_ordered() {
        // same table name in every unit: only safe with one target per unit
        let units: Vec<_> = (0..4).map(|i| unit(&format!("unit-{}", i), "notes")).collect();
        let outcomes = run_units(&units, &EngineConfig::default(), |_| Ok(MemoryConnection::new()));

        assert_eq!(outcomes.len(), 4);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.id, format!("unit-{}", i));
            let result = outcome.result.as_ref().unwrap();
            assert!(result.errors.is_empty(), "{:?}", result.errors);
            assert_eq!(result.query_results[0].row_count, 1);
            assert!(outcome.cleanup_error.is_none());
        }
    }

    #[test]
    fn test_connection_failure_is_per_unit() {
        let units = vec![unit("good", "a"), unit("bad", "b")];
        let outcomes = run_units(&units, &EngineConfig::default(), |id| {
            if id == "bad" {
                Err(EngineError::Connection("no database for unit".into()))
            } else {
                Ok(MemoryConnection::new())
            }
        });
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(EngineError::Connection(_))));
    }

    #[test]
    fn test_panicking_worker_is_reported() {
        let units = vec![unit("fine", "a"), unit("boom", "b")];
        let outcomes = run_units(&units, &EngineConfig::default(), |id| {
            if id == "boom" {
                panic!("factory exploded");
            }
            Ok(MemoryConnection::new())
        });
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(&outcomes[1].result, Err(EngineError::WorkerPanicked(id)) if id == "boom"));
    }

    #[test]
    fn test_no_units() {
        let outcomes = run_units(&[], &EngineConfig::default(), |_| Ok(MemoryConnection::new()));
        assert!(outcomes.is_empty());
    }
}
