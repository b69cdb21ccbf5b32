pub mod audit;
pub mod clusterer;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod normalizer;
pub mod pipeline;
pub mod processor;

pub use pipeline::Pipeline;

/// Tracing targets, one per component named in the design (§2, §7). Kept as
/// `&'static str` rather than an enum so `tracing`'s `target = "..."` macro
/// argument can take them directly.
pub const TARGET_STORE: &str = "store";
pub const TARGET_EXTRACTOR: &str = "extractor";
pub const TARGET_NORMALIZER: &str = "normalizer";
pub const TARGET_CLUSTERER: &str = "clusterer";
pub const TARGET_PROCESSOR: &str = "processor";
pub const TARGET_AUDIT: &str = "audit";
