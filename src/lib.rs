//! # matflow-rs: bounded concurrent matrix dataflow
//!
//! A pipeline of threaded stages that generates synthetic byte matrices,
//! analyses each one along three independent branches, joins the results,
//! derives two aggregate outputs per matrix and throttles admission with a
//! feedback edge, so at most `max_in_flight` matrices are ever between
//! admission and release.
//!
//! ## Architecture
//!
//! - **Pipeline**: one thread per stage, connected by crossbeam channels
//!   (see [`pipeline`] for the graph)
//! - **Config**: TOML file and command-line layers resolved into a
//!   validated [`PipelineConfig`]
//! - **Compute**: the synchronous device-compute boundary with a host
//!   reference backend
//!
//! ## Example
//!
//! ```no_run
//! use matflow_rs::{PipelineBuilder, PipelineConfig};
//!
//! fn main() -> matflow_rs::Result<()> {
//!     let config = PipelineConfig::new(128, 4)?
//!         .with_item_count(20)
//!         .with_log_file("brightness.log");
//!
//!     let report = PipelineBuilder::new(config).build()?.run()?;
//!     assert!(report.is_balanced());
//!     println!("{} aggregates", report.aggregates.len());
//!     Ok(())
//! }
//! ```

pub mod compute;
pub mod config;
pub mod error;
pub mod pipeline;

// Re-export commonly used types
pub use compute::{Buffer2, ComputeError, CpuDevice, DeviceCompute, KernelSource, Program};
pub use config::{Cli, ConfigError, PipelineConfig, RawConfig};
pub use error::{FlowError, Result, ResultExt};
pub use pipeline::nodes::{AnalysisKind, ExtremumSeed};
pub use pipeline::{
    ItemId, Matrix, Pipeline, PipelineBuilder, PipelineError, PipelineEvent, PipelineReport,
};
