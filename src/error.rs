use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowatchError {
    #[error("eBPF error: {0}")]
    EbpfError(String),

    #[error("Failed to load eBPF program: {0}")]
    ProgramLoadFailed(String),

    #[error("Failed to attach eBPF program to {interface}: {reason}")]
    AttachFailed { interface: String, reason: String },

    #[error("Failed to open flow event stream: {0}")]
    StreamOpenFailed(String),

    #[error("Failed to remove memlock limit: {0}")]
    MemlockLimit(std::io::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Kernel version {version} is too old. Minimum required: {min_version}")]
    KernelVersionTooOld {
        version: String,
        min_version: String,
    },
}

pub type Result<T> = std::result::Result<T, FlowatchError>;
