/// Tabular datasets
///
/// - `DataFrame`: named f64 columns, column-major
/// - `DatasetConfig`: cleaning rules + optional feature selection + target
/// - `CleaningRule`: ordered row/column cleaning applied before selection
pub mod cleaning;
pub mod config;
pub mod frame;

pub use cleaning::CleaningRule;
pub use config::DatasetConfig;
pub use frame::{Column, DataFrame, DatasetError};
