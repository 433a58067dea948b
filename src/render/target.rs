//! Block-structured color buffer.
//!
//! A [`RenderTarget`] holds one [`RgbaColor`] per key for every block of a
//! device, in a single allocation. Storage is a vector of 32-byte aligned
//! chunks of eight colors, so the buffer start is aligned for vector loads.
//! Each block starts on a chunk boundary; the unused colors between the end
//! of one block and the start of the next are padding. Keys are addressed by
//! `(block, offset)`, relative to the block start.

use std::collections::TryReserveError;

use zerocopy::IntoBytes;

use super::blend as bytes;
use crate::color::RgbaColor;

/// Alignment of the buffer and of every block start, in bytes
pub const ALIGN_BYTES: usize = 32;

/// Number of colors per aligned chunk
pub const ALIGN_COLORS: usize = ALIGN_BYTES / std::mem::size_of::<RgbaColor>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C, align(32))]
struct ColorChunk([RgbaColor; ALIGN_COLORS]);

const _: () = assert!(std::mem::size_of::<ColorChunk>() == ALIGN_BYTES);
const _: () = assert!(std::mem::align_of::<ColorChunk>() == ALIGN_BYTES);

impl ColorChunk {
    const EMPTY: Self = Self([RgbaColor::TRANSPARENT; ALIGN_COLORS]);
}

/// Position and size of one block, in colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockSpan {
    start: usize,
    len: usize,
}

/// Round `value` up to the next multiple of `alignment` (a power of two)
fn align(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// Color buffer covering all key blocks of a device
///
/// Move-only: duplicating a buffer is never needed by the render loop.
#[derive(Debug)]
pub struct RenderTarget {
    chunks: Vec<ColorChunk>,
    blocks: Vec<BlockSpan>,
}

impl RenderTarget {
    /// Create a buffer with one block per entry of `block_sizes`
    ///
    /// All colors start fully transparent. Aborts the process if memory
    /// cannot be allocated; use [`RenderTarget::try_new`] to handle that.
    pub fn new(block_sizes: &[usize]) -> Self {
        let (blocks, total) = Self::layout(block_sizes);
        Self {
            chunks: vec![ColorChunk::EMPTY; total / ALIGN_COLORS],
            blocks,
        }
    }

    /// Like [`RenderTarget::new`], reporting allocation failure as an error
    pub fn try_new(block_sizes: &[usize]) -> Result<Self, TryReserveError> {
        let (blocks, total) = Self::layout(block_sizes);
        let mut chunks = Vec::new();
        chunks.try_reserve_exact(total / ALIGN_COLORS)?;
        chunks.resize(total / ALIGN_COLORS, ColorChunk::EMPTY);
        Ok(Self { chunks, blocks })
    }

    /// Compute block spans and the padded total, in colors
    fn layout(block_sizes: &[usize]) -> (Vec<BlockSpan>, usize) {
        let mut blocks = Vec::with_capacity(block_sizes.len());
        let mut total = 0;
        for &len in block_sizes {
            blocks.push(BlockSpan { start: total, len });
            total = align(total + len, ALIGN_COLORS);
        }
        (blocks, total)
    }

    /// Total number of colors, padding included
    pub fn len(&self) -> usize {
        self.chunks.len() * ALIGN_COLORS
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of addressable keys in `block`
    pub fn block_len(&self, block: usize) -> usize {
        self.blocks[block].len
    }

    /// Index of the first color of `block` in the flat storage
    pub fn block_offset(&self, block: usize) -> usize {
        self.blocks[block].start
    }

    /// Start of the storage, for alignment and identity checks
    pub fn as_ptr(&self) -> *const RgbaColor {
        self.chunks.as_ptr().cast()
    }

    #[inline]
    fn at(&self, index: usize) -> &RgbaColor {
        &self.chunks[index / ALIGN_COLORS].0[index % ALIGN_COLORS]
    }

    #[inline]
    fn at_mut(&mut self, index: usize) -> &mut RgbaColor {
        &mut self.chunks[index / ALIGN_COLORS].0[index % ALIGN_COLORS]
    }

    /// Color of key `offset` in `block`
    ///
    /// The offset is not checked against the block size; an offset past the
    /// end of the block lands in padding or the next block.
    #[inline]
    pub fn get(&self, block: usize, offset: usize) -> &RgbaColor {
        self.at(self.blocks[block].start + offset)
    }

    /// Mutable color of key `offset` in `block`
    #[inline]
    pub fn get_mut(&mut self, block: usize, offset: usize) -> &mut RgbaColor {
        let index = self.blocks[block].start + offset;
        self.at_mut(index)
    }

    /// Iterate the addressable colors of `block`
    pub fn block(&self, block: usize) -> impl Iterator<Item = &RgbaColor> + '_ {
        let span = self.blocks[block];
        (span.start..span.start + span.len).map(move |i| self.at(i))
    }

    /// Set every addressable key of every block to `color`
    pub fn fill(&mut self, color: RgbaColor) {
        for b in 0..self.blocks.len() {
            let span = self.blocks[b];
            for i in span.start..span.start + span.len {
                *self.at_mut(i) = color;
            }
        }
    }

    /// Whether `other` has the same blocks at the same offsets
    pub fn same_layout(&self, other: &RenderTarget) -> bool {
        self.blocks == other.blocks && self.chunks.len() == other.chunks.len()
    }

    /// Whether `other` has the same layout and identical storage bytes
    pub fn same_contents(&self, other: &RenderTarget) -> bool {
        self.same_layout(other)
            && self
                .chunks
                .iter()
                .zip(&other.chunks)
                .all(|(a, b)| bytes::equal(a.0.as_bytes(), b.0.as_bytes()))
    }

    /// Create a transparent buffer with the same block layout
    pub fn with_layout_of(other: &RenderTarget) -> Self {
        Self {
            chunks: vec![ColorChunk::EMPTY; other.chunks.len()],
            blocks: other.blocks.clone(),
        }
    }
}

/// Exchange the storage and layout of two buffers without copying colors
pub fn swap(lhs: &mut RenderTarget, rhs: &mut RenderTarget) {
    std::mem::swap(&mut lhs.chunks, &mut rhs.chunks);
    std::mem::swap(&mut lhs.blocks, &mut rhs.blocks);
}

/// Composite `src` over `dst` across the whole storage, padding included
///
/// # Panics
/// If the buffers differ in size.
pub fn blend(dst: &mut RenderTarget, src: &RenderTarget) {
    assert_eq!(dst.len(), src.len(), "blend requires equal sizes");
    for (d, s) in dst.chunks.iter_mut().zip(&src.chunks) {
        bytes::blend(d.0.as_mut_bytes(), s.0.as_bytes());
    }
}
