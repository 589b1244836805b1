//! Snapshot codec
//!
//! The whole table mapping is persisted as one blob:
//!
//! ```text
//! +-------+---------+----------------+------------------+
//! | magic | version | payload length | JSON payload     |
//! | 4 B   | u32 LE  | u64 LE         | `length` bytes   |
//! +-------+---------+----------------+------------------+
//! ```
//!
//! Only [`encode`] and [`decode`] know the layout, so the storage engine can
//! swap it for something incremental without touching anything else.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use indexmap::IndexMap;

use super::table::Table;
use crate::error::{Error, Result};

/// File magic, "LYDB"
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"LYDB";

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

const HEADER_SIZE: usize = 4 + 4 + 8;

/// Table name -> table, in creation order
pub type TableMap = IndexMap<String, Table>;

/// Serialize the table mapping into a snapshot blob
pub fn encode(tables: &TableMap) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(tables)?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&SNAPSHOT_MAGIC);
    buf.write_u32::<LittleEndian>(SNAPSHOT_VERSION)?;
    buf.write_u64::<LittleEndian>(payload.len() as u64)?;
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Deserialize a snapshot blob produced by [`encode`]
pub fn decode(bytes: &[u8]) -> Result<TableMap> {
    if bytes.len() < HEADER_SIZE {
        return Err(Error::Snapshot(format!(
            "truncated header: {} bytes",
            bytes.len()
        )));
    }

    let mut cursor = Cursor::new(bytes);
    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if magic != SNAPSHOT_MAGIC {
        return Err(Error::Snapshot(format!("invalid magic: {:02x?}", magic)));
    }

    let version = cursor.read_u32::<LittleEndian>()?;
    if version != SNAPSHOT_VERSION {
        return Err(Error::Snapshot(format!("unsupported version: {}", version)));
    }

    let length = cursor.read_u64::<LittleEndian>()? as usize;
    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != length {
        return Err(Error::Snapshot(format!(
            "payload length mismatch: header says {}, found {}",
            length,
            payload.len()
        )));
    }

    serde_json::from_slice(payload).map_err(|e| Error::Snapshot(format!("corrupt payload: {}", e)))
}
