//! Identifier allocator for colour-coded picking.
//!
//! Every pickable object owns a contiguous [`IdBlock`] of identifiers. The
//! identifiers are written per vertex (or once per object) into a colour buffer
//! as four big-endian bytes, rendered into the pick target and decoded again
//! from a single pixel read. `0` never leaves the allocator: a cleared pick
//! target decodes to it, so it means "no hit".
//!
//! The allocator keeps a watermark (the highest identifier ever handed out
//! that is still part of the allocated universe) and a free list of reclaimed
//! ranges. Allocation is first fit over the free list, falling back to
//! extending the watermark. Freed blocks merge with their neighbours and a
//! block that ends at the watermark retracts it instead of staying in the
//! list, so alloc/free churn of trailing objects never grows the universe.

/// Inclusive range `start..=end` of identifiers. `start` is never zero for a
/// block returned by [`ColorCoder::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdBlock {
    pub start: u32,
    pub end: u32,
}

impl IdBlock {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: u32) -> bool {
        id != 0 && self.start <= id && id <= self.end
    }

    pub fn overlaps(&self, other: &IdBlock) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn ids(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// Encodes `id` as the RGBA8 colour written into the pick target.
pub fn encode_id(id: u32) -> [u8; 4] {
    id.to_be_bytes()
}

/// Decodes a pick target pixel. `None` is the background.
pub fn decode_id(rgba: [u8; 4]) -> Option<u32> {
    match u32::from_be_bytes(rgba) {
        0 => None,
        id => Some(id),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColorCoder {
    watermark: u32,
    free: Vec<IdBlock>,
}

impl ColorCoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `count` fresh identifiers and appends their encoded colours to
    /// `codes`. `None` when `count` is zero or the identifier space is
    /// exhausted; `codes` is left untouched in that case.
    pub fn allocate(&mut self, count: u32, codes: &mut Vec<[u8; 4]>) -> Option<IdBlock> {
        if count == 0 {
            return None;
        }
        let block = match self.free.iter().position(|block| block.len() >= count) {
            Some(idx) => {
                let candidate = &mut self.free[idx];
                let block = IdBlock::new(candidate.start, candidate.start + (count - 1));
                if candidate.len() == count {
                    self.free.remove(idx);
                } else {
                    candidate.start += count;
                }
                block
            }
            None => {
                let end = match self.watermark.checked_add(count) {
                    Some(end) => end,
                    None => {
                        log::warn!(
                            "pick identifier space exhausted, cannot allocate {count} ids above {}",
                            self.watermark
                        );
                        return None;
                    }
                };
                let block = IdBlock::new(self.watermark + 1, end);
                self.watermark = end;
                block
            }
        };
        codes.reserve(count as usize);
        codes.extend(block.ids().map(encode_id));
        Some(block)
    }

    /// Returns `block` to the allocator. Degenerate blocks and blocks starting
    /// at the sentinel are ignored.
    pub fn free(&mut self, block: IdBlock) {
        if block.start == 0 || block.end < block.start {
            return;
        }
        debug_assert!(
            block.end <= self.watermark,
            "{block:?} was never allocated (watermark {})",
            self.watermark
        );
        debug_assert!(
            !self.free.iter().any(|free| free.overlaps(&block)),
            "{block:?} is freed twice"
        );

        let mut merged = block;
        // right neighbour
        if let Some(idx) = self
            .free
            .iter()
            .position(|free| merged.end.checked_add(1) == Some(free.start))
        {
            merged.end = self.free.remove(idx).end;
        }
        // left neighbour
        if let Some(idx) = self
            .free
            .iter()
            .position(|free| free.end.checked_add(1) == Some(merged.start))
        {
            merged.start = self.free.remove(idx).start;
        }

        if merged.end == self.watermark {
            self.watermark = merged.start - 1;
        } else {
            self.free.push(merged);
        }
    }

    /// Highest identifier of the allocated universe.
    pub fn watermark(&self) -> u32 {
        self.watermark
    }

    pub fn free_blocks(&self) -> &[IdBlock] {
        &self.free
    }
}

