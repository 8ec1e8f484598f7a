use std::io;

use thiserror::Error;

/// Fatal failures of a sort run. None are recoverable: the first one
/// aborts the whole run before any output is produced.
#[derive(Debug, Error)]
pub enum SortError {
    /// The scratch copy of the input could not be allocated.
    #[error("cannot allocate scratch buffer of {0} bytes")]
    Allocation(usize),

    /// A process or thread worker could not be created or reaped.
    #[error("{op} failed: {source}")]
    WorkerLaunch {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// A relayed child result did not match its declared size.
    #[error("worker transfer: received {got} bytes, expected {expected}")]
    WorkerTransfer { expected: usize, got: usize },

    /// A worker terminated abnormally or reported a nonzero status.
    #[error("worker exited with status {status}")]
    WorkerExit { status: i32 },
}
