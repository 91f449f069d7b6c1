//! Wire format for items crossing a process boundary.
//!
//! In-process ports move `Item`s (`Arc<dyn Any + Send + Sync>`) for free;
//! crossing a process boundary needs a concrete, serializable type, so the
//! wire format is generic over `T`. Framing is a 4-byte little-endian
//! length prefix followed by a `bincode`-encoded [`WireItem<T>`], mirroring
//! the teacher's choice of a compact binary codec for frame payloads
//! (`rmp-serde` there; `bincode` here — see `DESIGN.md`).

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use super::error::Result;

#[derive(Serialize, Deserialize)]
pub enum WireItem<T> {
    Data(T),
    None,
    Stop,
}

pub fn write_framed<T: Serialize, W: Write>(writer: &mut W, item: &WireItem<T>) -> Result<()> {
    let bytes = bincode::serialize(item)?;
    writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Reads one framed message. `Ok(None)` means clean EOF (the writer side
/// closed, which a bridge thread treats like an upstream `Stop`).
pub fn read_framed<T: for<'de> Deserialize<'de>, R: Read>(
    reader: &mut R,
) -> Result<Option<WireItem<T>>> {
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_bytes) as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(Some(bincode::deserialize(&buf)?))
}
