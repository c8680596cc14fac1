//! HTTP transport capability and status classification.

mod classify;
mod transport;

pub use classify::{Outcome, classify};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};

#[cfg(test)]
pub use transport::MockTransport;
