use std::io::{Read, Write};
use std::time::Duration;

use crate::Result;

/// Byte stream connecting the host to the instrument firmware.
///
/// A read that finds no data either returns `Ok(0)` or fails with `TimedOut`, `WouldBlock` or
/// `Interrupted`; all of these mean "nothing yet" to the callers in this crate.
pub trait Port: Read + Write + Send {
    /// Bound the duration of the next blocking `read`.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;
}

impl<P: Port + ?Sized> Port for Box<P> {
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_timeout(timeout)
    }
}

pub mod serial;

#[cfg(test)]
pub mod mock;
