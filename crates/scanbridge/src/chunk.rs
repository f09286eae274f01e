//! Partially consumable byte span

use crate::{Result, TransferError};

/// One appended byte span and the reader's cursor into it.
///
/// The bytes are fixed at creation; only the cursor moves.
#[derive(Debug)]
pub(crate) struct Chunk {
    data: Box<[u8]>,
    offset: usize,
}

impl Chunk {
    /// Copy `bytes` into a freshly allocated chunk.
    ///
    /// Allocation failure is reported instead of aborting the process.
    pub(crate) fn try_copy_from(bytes: &[u8]) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(bytes.len())
            .map_err(|source| TransferError::OutOfMemory {
                requested: bytes.len(),
                source,
            })?;
        data.extend_from_slice(bytes);
        Ok(Self {
            data: data.into_boxed_slice(),
            offset: 0,
        })
    }

    /// Total size of the chunk as appended
    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    /// Bytes not yet handed to the reader
    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub(crate) fn is_consumed(&self) -> bool {
        self.remaining() == 0
    }

    /// Copy as many unread bytes as fit into `out` and advance the cursor.
    pub(crate) fn take_into(&mut self, out: &mut [u8]) -> usize {
        let count = self.remaining().min(out.len());
        out[..count].copy_from_slice(&self.data[self.offset..self.offset + count]);
        self.offset += count;
        count
    }

    /// Copy up to `max` unread bytes into a new `Vec` and advance the cursor.
    pub(crate) fn take_vec(&mut self, max: usize) -> Vec<u8> {
        let count = self.remaining().min(max);
        let out = self.data[self.offset..self.offset + count].to_vec();
        self.offset += count;
        out
    }
}
