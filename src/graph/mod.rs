//! Include graph: value types, the incremental engine, building from a
//! workspace configuration, and cycle detection.

pub mod builder;
pub mod cycles;
pub mod engine;
pub mod types;

pub use builder::{build_graph, enumerate_sources, extract_one, populate, rebuild_file, scan_stats, ScanStats};
pub use cycles::{include_cycles, IncludeCycle};
pub use engine::DependencyGraph;
pub use types::{GraphStats, IncludeEntry, ResolvedIncludeEntry, SourceFile};
