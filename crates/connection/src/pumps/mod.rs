//! Per-channel I/O tasks sharing one cancellation token.

pub(crate) mod ping;
pub(crate) mod read;
pub(crate) mod write;
