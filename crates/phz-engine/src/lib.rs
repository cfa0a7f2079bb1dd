//! Running the phz posterior engine over many sources.
//!
//! [`RunConfig`] holds the tunables of a run and is validated once into a
//! [`RunContext`], which also owns the cancellation flag shared by every
//! worker. [`run_sources`] scores sources on a pool of worker threads and
//! hands each result bundle to an [`OrderedDispatcher`], which forwards the
//! bundles to the downstream [`OutputHandler`] strictly in the declared
//! source order, whatever order the workers finish in.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod dispatch;
pub mod handler;
pub mod pipeline;
pub mod pool;

pub use config::{CollapseType, ConfigError, MarginalizationConfig, RunConfig};
pub use context::RunContext;
pub use dispatch::OrderedDispatcher;
pub use handler::{MultiHandler, OutputHandler};
pub use pipeline::SourcePipeline;
pub use pool::run_sources;
