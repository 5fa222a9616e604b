//! Chunked append-only arena for graphical-object records
//!
//! [`Chunk`] frames and validates records inside one buffer,
//! [`ChunkManager`] chains chunks into a single append/replay stream and
//! [`GraphicalObject`] is the record model encoded into that stream.

pub mod chunk;
pub mod manager;
pub mod record;

pub use chunk::{Chunk, Slot, FRAME_OVERHEAD, MAX_CHUNK_SIZE, MAX_RECORD_PAYLOAD};
pub use manager::{ChunkManager, RecordRef, StoreConfig, DEFAULT_GROWTH_HINT, MIN_CHUNK_SIZE};
pub use record::{
    truncate_label, Geometry, GraphicalObject, Label, ObjectKind, HEADER_LEN, MAX_LABEL_LEN,
};
