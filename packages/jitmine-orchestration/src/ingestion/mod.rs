//! Ingestion pipelines
//!
//! Repository → history metrics → issue/bug linkage → structural metrics,
//! each stage persisted before the next calculation starts.

pub mod context;
pub mod services;
pub mod steps;
pub mod strategy;

pub use context::{IngestionContext, IngestionServices, ServiceFactory};
pub use services::ConfiguredServiceFactory;
pub use strategy::IngestionStrategy;
