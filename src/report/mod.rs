//! Reporting over execution results
//!
//! - Tally: stable frequency ranking
//! - Summary: per-file report and correction hints
//! - Accumulated: shared results file

pub mod accumulated;
pub mod summary;
pub mod tally;

pub use accumulated::{AccumulatedResults, ResultsStore, RunRecord};
pub use summary::{FileReport, RankedItem, ReportedError};
pub use tally::{Tally, TallyEntry};
