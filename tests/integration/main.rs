//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the client end to end
//! against the simulated transport and a recording display sink.  All
//! tests run on the host with no radio required.

mod mock_display;
mod service_flow_tests;
mod threaded_session_tests;
