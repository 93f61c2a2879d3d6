//! Unified error types for the Urbanite controller.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the top-level startup path's error handling
//! uniform. All variants are `Copy` so they can be cheaply passed around
//! without allocation.
//!
//! Runtime I/O cannot fail in this system — a guard that finds the hardware
//! not ready simply leaves its FSM in place until the next fire. The only
//! fallible operations are the peripheral `init()` calls, which validate the
//! caller-supplied peripheral id against the board's mirror tables.

use core::fmt;

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A peripheral id does not exist in the board's mirror tables.
    /// This is a programming error and is fatal at startup.
    InvalidPeripheralId {
        /// Which port table rejected the id ("button", "ultrasound", "display").
        peripheral: &'static str,
        /// The offending id.
        id: u32,
    },
    /// Peripheral initialisation failed for a board-level reason.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPeripheralId { peripheral, id } => {
                write!(f, "invalid {peripheral} id: {id}")
            }
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Controller-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_peripheral_and_id() {
        let e = Error::InvalidPeripheralId {
            peripheral: "ultrasound",
            id: 7,
        };
        assert_eq!(e.to_string(), "invalid ultrasound id: 7");
    }
}
