//! Extraction and summary of RCPSP solver experiments.
//!
//! The pipeline has three stages, one binary each:
//!
//! - `extract` turns benchmark solution files into `optimals.csv`.
//! - `process` parses the solver logs of every result folder, joins the
//!   bounds and writes the raw, aggregated, optimal and satisfiable tables.
//! - `visualize` summarizes those tables as LaTeX and histograms.
#![recursion_limit = "1024"]
#![warn(missing_docs)]

#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod errors;
pub mod logger;

mod setting;
pub use crate::setting::Setting;

mod cursor;
pub use crate::cursor::{LineCursor, ScanState};

pub mod observation;
pub use crate::observation::{read_rows, write_rows, Observation, Outcome, RawObservation};

pub mod bound;
pub use crate::bound::{extract_bounds, load_bounds, BoundRecord, Bounds};

pub mod runlog;
pub use crate::runlog::{parse_batch, run_ranges, BadRuns, RunLogParser, RunRange};

pub mod aggregate;
pub use crate::aggregate::{aggregate, process_batches, separate_sat_opt, sort_rows, StrategyOrder};

pub mod summary;
pub use crate::summary::{metric_means, nodes_per_second, SummaryRow};

pub mod latex;
pub use crate::latex::{write_latex, LatexTable};

pub mod plot;
pub use crate::plot::Metric;
