//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters and virtual time.  All tests run on the host
//! with no real hardware required.

mod lifecycle_tests;
mod mock_hw;
mod transition_tests;
