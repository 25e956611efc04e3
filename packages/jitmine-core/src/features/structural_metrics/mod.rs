/// Structural Metrics
///
/// Runs an external static-analysis tool (CK-style, CSV output) against a
/// checked-out commit. Any tool failure is fatal for the run: there is no
/// metrics-less success state.
pub mod error;
pub mod runner;
pub mod table;

pub use error::MetricsToolError;
pub use runner::{CommandMetricsRunner, StaticMetricsRunner, StructuralMetricsRunner};
pub use table::{parse_metrics_csv, StructuralMetricsRow, StructuralMetricsTable};
