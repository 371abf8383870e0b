//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that drives a fully assembled
//! [`homie32::boot::BootMode`] through its public `setup`/`tick` surface
//! against the scripted doubles in `mock_net`, the way the firmware binary
//! drives the real adapters. All tests run on the host (x86_64) with no
//! real hardware required.

mod lifecycle_tests;
mod mock_net;
mod normal_mode_tests;
mod portal_flow_tests;
mod standalone_tests;
