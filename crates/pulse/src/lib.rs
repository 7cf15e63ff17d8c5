//! Pulse - weekly search-performance reporting
//!
//! Fetches query data from Search Console and channel data from GA4 for a
//! reporting week and the week before it, compares the two, derives
//! plain-language insights and writes a markdown report with CSV exports.

pub mod commands;
pub mod config;
pub mod output;
pub mod period;
pub mod pipeline;
pub mod report;
pub mod sources;
