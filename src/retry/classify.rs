use crate::error::{ConnectionFault, UpstreamError};
use http::StatusCode;
use std::error::Error as StdError;
use std::io;

/// Exposes the signals used to decide whether a failure is transient.
///
/// A failure is retryable when it carries status 429, any status >= 500, or
/// a connection-reset signal. Everything else is terminal.
pub trait Classify {
    /// HTTP-style status carried by the failure, if any
    fn status_code(&self) -> Option<u16> {
        None
    }

    /// Whether the failure is a low-level connection reset
    fn is_connection_reset(&self) -> bool {
        false
    }

    fn is_retryable(&self) -> bool {
        match self.status_code() {
            Some(429) => true,
            Some(status) if status >= 500 => true,
            _ => self.is_connection_reset(),
        }
    }
}

impl Classify for UpstreamError {
    fn status_code(&self) -> Option<u16> {
        self.status
    }

    fn is_connection_reset(&self) -> bool {
        self.connection == Some(ConnectionFault::Reset)
    }
}

impl Classify for io::Error {
    fn is_connection_reset(&self) -> bool {
        self.kind() == io::ErrorKind::ConnectionReset
    }
}

impl Classify for StatusCode {
    fn status_code(&self) -> Option<u16> {
        Some(self.as_u16())
    }
}

impl Classify for reqwest::Error {
    fn status_code(&self) -> Option<u16> {
        self.status().map(|s| s.as_u16())
    }

    fn is_connection_reset(&self) -> bool {
        let mut source = self.source();
        while let Some(err) = source {
            if let Some(io_err) = err.downcast_ref::<io::Error>() {
                if io_err.kind() == io::ErrorKind::ConnectionReset {
                    return true;
                }
            }
            source = err.source();
        }
        false
    }
}

impl<T: Classify + ?Sized> Classify for Box<T> {
    fn status_code(&self) -> Option<u16> {
        (**self).status_code()
    }

    fn is_connection_reset(&self) -> bool {
        (**self).is_connection_reset()
    }
}
