//! Outbound chat messaging used by front ends to report results and progress.

pub mod port;
pub mod throttled;
pub mod types;
