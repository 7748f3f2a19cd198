//! Integration testing module
//!
//! End-to-end tests for the stitching server:
//! - Feed resolution against mocked upstreams
//! - Multivariant and media manifest generation
//! - Error status mapping

pub mod e2e;
