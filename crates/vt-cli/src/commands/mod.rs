//! CLI command implementations.

pub mod checkpoint;
pub mod query;
pub mod rank;
pub mod rollover;
pub mod run;
pub mod status;
pub mod util;
