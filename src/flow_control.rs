//! Flow-control windows (RFC 7540 Sections 5.2 and 6.9)
//!
//! Windows are signed: a SETTINGS_INITIAL_WINDOW_SIZE decrease can push a
//! window below zero, and the holder must then wait for WINDOW_UPDATEs to
//! climb back above zero before sending. Whether a violation is fatal to
//! the stream or the connection depends on which window it hit, so errors
//! here carry no level; the dispatcher assigns one.

use thiserror::Error;

/// Largest legal window size, 2^31 - 1.
pub const MAX_WINDOW_SIZE: u32 = 0x7FFF_FFFF;

/// Default initial window size for streams and the connection.
pub const DEFAULT_WINDOW_SIZE: u32 = 65_535;

/// Window arithmetic violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    /// WINDOW_UPDATE would push the window past 2^31 - 1
    #[error("window increment overflows 2^31-1")]
    Overflow,
    /// Peer sent more flow-controlled octets than the window allowed
    #[error("flow-control window exceeded by {0} octets")]
    Exceeded(i64),
}

/// One direction of one flow-control window.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    current: i64,
    initial: u32,
}

impl Window {
    pub fn new(initial: u32) -> Self {
        Window {
            current: initial as i64,
            initial,
        }
    }

    /// Octets currently available. Negative means the window is overdrawn
    /// after a SETTINGS shrink.
    pub fn available(&self) -> i64 {
        self.current
    }

    /// Whether `n` octets fit right now.
    pub fn can_send(&self, n: usize) -> bool {
        self.current >= n as i64
    }

    /// Account for `n` flow-controlled octets. Fails when the peer (or the
    /// caller) overdraws the window.
    pub fn consume(&mut self, n: usize) -> Result<(), WindowError> {
        let next = self.current - n as i64;
        if next < 0 {
            return Err(WindowError::Exceeded(-next));
        }
        self.current = next;
        Ok(())
    }

    /// Apply a WINDOW_UPDATE increment. Zero increments are a protocol
    /// error and rejected by the dispatcher before this point.
    pub fn expand(&mut self, increment: u32) -> Result<(), WindowError> {
        let next = self.current + increment as i64;
        if next > MAX_WINDOW_SIZE as i64 {
            return Err(WindowError::Overflow);
        }
        self.current = next;
        Ok(())
    }

    /// Re-base on a new SETTINGS_INITIAL_WINDOW_SIZE: the delta between old
    /// and new initial values is applied to the current balance, which may
    /// go negative. Growth past 2^31 - 1 is an overflow.
    pub fn update_initial_size(&mut self, new_initial: u32) -> Result<(), WindowError> {
        let delta = new_initial as i64 - self.initial as i64;
        let next = self.current + delta;
        if next > MAX_WINDOW_SIZE as i64 {
            return Err(WindowError::Overflow);
        }
        self.current = next;
        self.initial = new_initial;
        Ok(())
    }
}

impl Default for Window {
    fn default() -> Self {
        Window::new(DEFAULT_WINDOW_SIZE)
    }
}
