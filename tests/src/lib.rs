//! # Desk Companion Test Suite
//!
//! Unified test crate for flows that cross service boundaries. Behavior
//! local to one crate is tested inside that crate; everything here wires
//! two or more services over the shared bus.
//!
//! ## Running Tests
//!
//! ```bash
//! # All integration flows
//! cargo test -p companion-tests
//!
//! # By area
//! cargo test -p companion-tests integration::lifecycle
//! cargo test -p companion-tests integration::monitoring
//! cargo test -p companion-tests integration::plugin_flows
//! ```

pub mod integration;
