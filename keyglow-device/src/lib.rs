//! Device abstraction layer for keyglow
//!
//! This crate defines what the render loop needs from a lighting device:
//!
//! - an ordered, stable list of key blocks
//! - bulk color reads and per-block color writes
//! - a commit operation that makes pending writes visible at once
//! - inbound queue flushing, read timeout control and resynchronization
//!
//! Transport backends implement [`Device`]. The [`sim`] module provides an
//! in-memory implementation used for dry runs and tests.

pub mod error;
pub mod sim;
pub mod types;

pub use error::{DeviceError, ErrorCode};
pub use sim::{CallStats, DeviceOp, SimulatedDevice};
pub use types::{BlockId, ColorDirective, KeyBlock, KeyColor, KeyId};

/// A lighting device with per-key color control
///
/// All methods take `&self`: backends handle their own interior locking, the
/// same way transports do. A render loop assumes it is the only user of the
/// device while it runs; nothing here enforces that.
pub trait Device: Send {
    /// Key blocks, in device enumeration order. Must not change over the
    /// lifetime of the device handle.
    fn blocks(&self) -> &[KeyBlock];

    /// Read the current color of every key in `block`
    fn get_colors(&self, block: &KeyBlock) -> Result<Vec<KeyColor>, DeviceError>;

    /// Queue color changes for keys of `block`
    ///
    /// Changes become visible on the next [`Device::commit_colors`].
    fn set_colors(&self, block: &KeyBlock, directives: &[ColorDirective])
        -> Result<(), DeviceError>;

    /// Apply all queued color changes as one hardware update
    fn commit_colors(&self) -> Result<(), DeviceError>;

    /// Drop any reports waiting in the inbound queue
    fn flush(&self) -> Result<(), DeviceError>;

    /// Set the read timeout in microseconds (0 disables timeout detection)
    fn set_timeout(&self, micros: u32);

    /// Try to restore a consistent communication state after an error
    ///
    /// Returns `false` if the device could not be recovered.
    fn resync(&self) -> bool;

    /// Number of keys in each block, in block order
    fn block_sizes(&self) -> Vec<usize> {
        self.blocks().iter().map(|b| b.keys().len()).collect()
    }
}
