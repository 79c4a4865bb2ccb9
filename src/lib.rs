pub mod cli;
pub mod codec;
pub mod error;
pub mod ingest;
pub mod probe;
pub mod shutdown;
pub mod stream;

#[cfg(target_os = "linux")]
pub mod xdp;

pub use error::{FlowatchError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
