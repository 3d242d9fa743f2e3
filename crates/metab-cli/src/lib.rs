//! Library half of the `metab` binary: logging setup and pipeline flows.

pub mod logging;
pub mod pipeline;
