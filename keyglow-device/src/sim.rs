//! In-memory lighting device
//!
//! `SimulatedDevice` keeps per-key colors in memory, applies writes on commit
//! like real hardware does, and counts every call. Errors can be queued per
//! operation to exercise recovery paths without hardware.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::DeviceError;
use crate::types::{BlockId, ColorDirective, KeyBlock, KeyColor, KeyId};
use crate::Device;

/// Device operation that can be targeted by fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOp {
    GetColors,
    SetColors,
    Commit,
    Flush,
}

/// Per-operation call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    pub get_colors: usize,
    pub set_colors: usize,
    pub commits: usize,
    pub flushes: usize,
    pub resyncs: usize,
    pub timeouts_set: usize,
}

impl CallStats {
    /// Calls that would have touched the transport
    pub fn io_calls(&self) -> usize {
        self.get_colors + self.set_colors + self.commits + self.flushes
    }
}

struct SimState {
    /// Committed colors, per block then per key
    colors: Vec<Vec<KeyColor>>,
    /// Writes waiting for commit: (block index, directive)
    pending: Vec<(usize, ColorDirective)>,
    /// Every successful set_colors call, in order
    sent: Vec<(BlockId, Vec<ColorDirective>)>,
    faults: VecDeque<(DeviceOp, DeviceError)>,
    resync_ok: bool,
    timeout_us: u32,
    stats: CallStats,
}

impl SimState {
    fn take_fault(&mut self, op: DeviceOp) -> Result<(), DeviceError> {
        match self.faults.iter().position(|(o, _)| *o == op) {
            Some(pos) => match self.faults.remove(pos) {
                Some((_, err)) => {
                    debug!("Simulated {:?} failure: {}", op, err);
                    Err(err)
                }
                None => Ok(()),
            },
            None => Ok(()),
        }
    }
}

/// Cloneable handle to an in-memory device
///
/// Clones share state, so a test can hand one clone to a render loop and
/// inspect the device through another.
#[derive(Clone)]
pub struct SimulatedDevice {
    blocks: Arc<Vec<KeyBlock>>,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedDevice {
    /// Build a device from `(name, key count)` pairs
    ///
    /// Key ids are assigned sequentially across the whole device, starting
    /// at 1, so every key id is unique.
    pub fn new(layout: &[(&str, usize)]) -> Self {
        let mut next_id: KeyId = 1;
        let blocks = layout
            .iter()
            .enumerate()
            .map(|(idx, &(name, count))| {
                let keys: Vec<KeyId> = (0..count)
                    .map(|_| {
                        let id = next_id;
                        next_id = next_id.wrapping_add(1);
                        id
                    })
                    .collect();
                KeyBlock::new(idx as BlockId, name, keys)
            })
            .collect();
        Self::with_blocks(blocks)
    }

    /// Build a device from explicit key blocks. All keys start black.
    pub fn with_blocks(blocks: Vec<KeyBlock>) -> Self {
        let colors = blocks
            .iter()
            .map(|b| {
                b.keys()
                    .iter()
                    .map(|&id| KeyColor {
                        id,
                        ..KeyColor::default()
                    })
                    .collect()
            })
            .collect();

        Self {
            blocks: Arc::new(blocks),
            state: Arc::new(Mutex::new(SimState {
                colors,
                pending: Vec::new(),
                sent: Vec::new(),
                faults: VecDeque::new(),
                resync_ok: true,
                timeout_us: 0,
                stats: CallStats::default(),
            })),
        }
    }

    /// Queue an error to be returned by the next call to `op`
    pub fn inject(&self, op: DeviceOp, error: DeviceError) {
        self.state.lock().faults.push_back((op, error));
    }

    /// Choose what subsequent `resync` calls return
    pub fn set_resync_result(&self, ok: bool) {
        self.state.lock().resync_ok = ok;
    }

    pub fn stats(&self) -> CallStats {
        self.state.lock().stats
    }

    /// Drain the log of successful `set_colors` calls
    pub fn take_sent(&self) -> Vec<(BlockId, Vec<ColorDirective>)> {
        std::mem::take(&mut self.state.lock().sent)
    }

    /// Committed color of a key, by block index and key position
    pub fn color(&self, block: usize, key: usize) -> KeyColor {
        self.state.lock().colors[block][key]
    }

    /// Overwrite the committed color of a key, as if set by another program
    pub fn set_color(&self, block: usize, key: usize, red: u8, green: u8, blue: u8) {
        let mut state = self.state.lock();
        let color = &mut state.colors[block][key];
        color.red = red;
        color.green = green;
        color.blue = blue;
    }

    /// Last value passed to `set_timeout`
    pub fn timeout(&self) -> u32 {
        self.state.lock().timeout_us
    }

    fn block_index(&self, block: &KeyBlock) -> Result<usize, DeviceError> {
        self.blocks
            .iter()
            .position(|b| b.id() == block.id())
            .ok_or(DeviceError::UnknownBlock(block.id()))
    }
}

impl Device for SimulatedDevice {
    fn blocks(&self) -> &[KeyBlock] {
        &self.blocks
    }

    fn get_colors(&self, block: &KeyBlock) -> Result<Vec<KeyColor>, DeviceError> {
        let idx = self.block_index(block)?;
        let mut state = self.state.lock();
        state.stats.get_colors += 1;
        state.take_fault(DeviceOp::GetColors)?;
        Ok(state.colors[idx].clone())
    }

    fn set_colors(
        &self,
        block: &KeyBlock,
        directives: &[ColorDirective],
    ) -> Result<(), DeviceError> {
        let idx = self.block_index(block)?;
        let mut state = self.state.lock();
        state.stats.set_colors += 1;
        state.take_fault(DeviceOp::SetColors)?;

        if let Some(bad) = directives.iter().find(|d| block.key_index(d.id).is_none()) {
            return Err(DeviceError::Transport(format!(
                "key {} is not part of block {}",
                bad.id,
                block.name()
            )));
        }

        trace!("Queued {} directives for block {}", directives.len(), block.name());
        state.pending.extend(directives.iter().map(|&d| (idx, d)));
        state.sent.push((block.id(), directives.to_vec()));
        Ok(())
    }

    fn commit_colors(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.stats.commits += 1;
        state.take_fault(DeviceOp::Commit)?;

        let pending = std::mem::take(&mut state.pending);
        for (block_idx, directive) in &pending {
            if let Some(pos) = self.blocks[*block_idx].key_index(directive.id) {
                let color = &mut state.colors[*block_idx][pos];
                color.red = directive.red;
                color.green = directive.green;
                color.blue = directive.blue;
            }
        }
        trace!("Committed {} key updates", pending.len());
        Ok(())
    }

    fn flush(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.stats.flushes += 1;
        state.take_fault(DeviceOp::Flush)
    }

    fn set_timeout(&self, micros: u32) {
        let mut state = self.state.lock();
        state.stats.timeouts_set += 1;
        state.timeout_us = micros;
    }

    fn resync(&self) -> bool {
        let mut state = self.state.lock();
        state.stats.resyncs += 1;
        state.pending.clear();
        state.resync_ok
    }
}
