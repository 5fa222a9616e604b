//! Fixed-capacity byte stream holding framed records
//!
//! Every record is laid out as
//!
//! ```text
//! +-----------+-----------+----------------+-----------+
//! | head tag  | size      | payload        | tail tag  |
//! | u16 LE    | u16 LE    | `size` bytes   | u16 LE    |
//! +-----------+-----------+----------------+-----------+
//! ```
//!
//! The free region after the last record stays zeroed. Appends verify the
//! previous tail tag and that the free region is untouched, so a caller that
//! overran its payload is caught on the next append. Replay verifies both
//! tags of every record.

use byteorder::{ByteOrder, LittleEndian};
use tracing::{error, trace};

use crate::core::{Result, StoreError};

/// Magic value opening every record
pub const HEAD_TAG: u16 = 0x5555;
/// Magic value closing every record
pub const TAIL_TAG: u16 = 0xEEEE;
/// Head tag plus payload size
pub const HEAD_SIZE: usize = 4;
pub const TAIL_SIZE: usize = 2;
/// Framing bytes added to every payload
pub const FRAME_OVERHEAD: usize = HEAD_SIZE + TAIL_SIZE;
/// Hard cap on one chunk's capacity
pub const MAX_CHUNK_SIZE: usize = 1024 * 1000;
/// Largest payload the size field can describe
pub const MAX_RECORD_PAYLOAD: usize = i16::MAX as usize;

/// Writable payload region returned by [`Chunk::append`]
#[derive(Debug)]
pub struct Slot<'a> {
    /// Offset of the payload inside the chunk
    pub offset: usize,
    pub bytes: &'a mut [u8],
}

/// One append-only buffer of framed records
#[derive(Debug)]
pub struct Chunk {
    /// Allocation sequence number, used in diagnostics
    sequence: usize,
    buffer: Vec<u8>,
    write_pos: usize,
    read_pos: usize,
    record_count: usize,
}

impl Chunk {
    /// Allocate a zeroed chunk; capacity is capped at [`MAX_CHUNK_SIZE`]
    pub fn with_capacity(sequence: usize, capacity: usize) -> Result<Self> {
        let capacity = capacity.min(MAX_CHUNK_SIZE);
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| StoreError::out_of_memory(capacity, MAX_CHUNK_SIZE))?;
        buffer.resize(capacity, 0);

        Ok(Self {
            sequence,
            buffer,
            write_pos: 0,
            read_pos: 0,
            record_count: 0,
        })
    }

    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// Total bytes this chunk may hold
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes taken by framed records
    pub fn used_size(&self) -> usize {
        self.write_pos
    }

    pub fn free_space(&self) -> usize {
        self.capacity() - self.write_pos
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// True while the read cursor has not reached the last record
    pub fn has_unread(&self) -> bool {
        self.read_pos + FRAME_OVERHEAD <= self.write_pos
    }

    /// Frame a new record of `payload_len` bytes
    ///
    /// Returns `Ok(None)` when the record does not fit; the chunk is then full
    /// for this record size and left unchanged.
    pub fn append(&mut self, payload_len: usize) -> Result<Option<Slot<'_>>> {
        if payload_len > MAX_RECORD_PAYLOAD {
            return Err(StoreError::record_too_large(payload_len, MAX_RECORD_PAYLOAD));
        }

        let total = payload_len + FRAME_OVERHEAD;
        if self.write_pos + total > self.capacity() {
            return Ok(None);
        }

        if self.write_pos > 0 {
            let tail_at = self.write_pos - TAIL_SIZE;
            let found = LittleEndian::read_u16(&self.buffer[tail_at..self.write_pos]);
            if found != TAIL_TAG {
                error!(chunk = self.sequence, offset = tail_at, "Previous record tail overwritten");
                return Err(StoreError::corruption(self.sequence, tail_at, TAIL_TAG, found));
            }
        }

        let span = self.write_pos..self.write_pos + total;
        if let Some(dirty) = self.buffer[span.clone()].iter().position(|b| *b != 0) {
            let offset = span.start + dirty;
            error!(chunk = self.sequence, offset, "Free region written past last record");
            return Err(StoreError::corruption(
                self.sequence,
                offset,
                0,
                u16::from(self.buffer[offset]),
            ));
        }

        let head = span.start;
        let payload = head + HEAD_SIZE;
        let tail = payload + payload_len;
        LittleEndian::write_u16(&mut self.buffer[head..head + 2], HEAD_TAG);
        LittleEndian::write_u16(&mut self.buffer[head + 2..payload], payload_len as u16);
        LittleEndian::write_u16(&mut self.buffer[tail..span.end], TAIL_TAG);

        self.write_pos = span.end;
        self.record_count += 1;
        trace!(chunk = self.sequence, offset = payload, len = payload_len, "Framed record");

        Ok(Some(Slot {
            offset: payload,
            bytes: &mut self.buffer[payload..tail],
        }))
    }

    /// Next record payload in append order, or `Ok(None)` at the end of the chunk
    pub fn replay_next(&mut self) -> Result<Option<(usize, &[u8])>> {
        if !self.has_unread() {
            return Ok(None);
        }

        let (payload, end) = self.check_frame(self.read_pos + HEAD_SIZE)?;
        self.read_pos = end;
        Ok(Some((payload.start, &self.buffer[payload])))
    }

    /// Rewind the read cursor for a fresh replay pass
    pub fn reset_read(&mut self) {
        self.read_pos = 0;
    }

    /// Validated payload previously returned at `offset`
    pub fn payload_at(&self, offset: usize) -> Result<&[u8]> {
        let (payload, _) = self.check_frame(offset)?;
        Ok(&self.buffer[payload])
    }

    /// Mutable access to a stored payload for in-place patching
    ///
    /// The payload length is fixed; framing bytes are never exposed.
    pub fn payload_at_mut(&mut self, offset: usize) -> Result<&mut [u8]> {
        let (payload, _) = self.check_frame(offset)?;
        Ok(&mut self.buffer[payload])
    }

    /// Validate the frame around the payload starting at `payload_offset`
    fn check_frame(&self, payload_offset: usize) -> Result<(std::ops::Range<usize>, usize)> {
        if payload_offset < HEAD_SIZE || payload_offset + TAIL_SIZE > self.write_pos {
            return Err(StoreError::decode(
                payload_offset,
                "record offset outside used region",
            ));
        }

        let head = payload_offset - HEAD_SIZE;
        let tag = LittleEndian::read_u16(&self.buffer[head..head + 2]);
        if tag != HEAD_TAG {
            error!(chunk = self.sequence, offset = head, "Head tag mismatch");
            return Err(StoreError::corruption(self.sequence, head, HEAD_TAG, tag));
        }

        let size = LittleEndian::read_u16(&self.buffer[head + 2..payload_offset]) as usize;
        let tail = payload_offset + size;
        let end = tail + TAIL_SIZE;
        if end > self.write_pos {
            error!(chunk = self.sequence, offset = head, size, "Record overruns used region");
            return Err(StoreError::decode(
                head,
                format!("record size {} overruns used region", size),
            ));
        }

        let tag = LittleEndian::read_u16(&self.buffer[tail..end]);
        if tag != TAIL_TAG {
            error!(chunk = self.sequence, offset = tail, "Tail tag mismatch");
            return Err(StoreError::corruption(self.sequence, tail, TAIL_TAG, tag));
        }

        Ok((payload_offset..tail, end))
    }

    #[cfg(test)]
    pub(crate) fn raw_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }
}
