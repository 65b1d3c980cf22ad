//! fragment_assembler library
//!
//! Greedy, error-tolerant reconstruction of a string from short overlapping
//! fragments: an offset-specific overlap index, chains of spliced fragments,
//! and a multi-round driver that merges chains while relaxing the required
//! overlap.

pub mod overlap;
pub mod chain;
pub mod assembly;
pub mod fragments;
pub mod instances;

pub use overlap::{is_prefix, is_suffix, OverlapError, OverlapIndex};
pub use chain::Chain;
pub use assembly::{
    assemble,
    Assembly,
    AssemblyConfig,
    AssemblyDriver,
    AssemblyError,
    ChainId,
};
pub use fragments::{read_fragments, FragmentError};
pub use instances::{run_instance, scan_instances, InstanceReport, RunOptions};
