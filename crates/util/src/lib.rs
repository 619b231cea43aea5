//! Helpers shared by the Cogwork crates: blocking calls with deadlines,
//! tracing setup, and path handling.

pub mod async_runtime;
pub mod logging;
mod path_processing;

pub use async_runtime::{block_on_future, run_blocking_with_timeout};
pub use logging::{init_test_tracing, init_tracing};
pub use path_processing::{config_file_path, expand_tilde};
