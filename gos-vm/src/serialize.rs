// gos-vm - Bytecode compiler and virtual machine for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Binary serialization of chunks (`.gbc` files).
//!
//! Layout, little-endian for multi-byte scalars:
//!
//! ```text
//! magic   4 bytes  "GOSB"
//! version u16      currently 1
//! codelen u32
//! code    codelen bytes   (jump targets inside stay big-endian)
//! nconst  u16
//! consts  1-byte tag + payload each:
//!           0 unit, 1 number (f64), 2 bool (1 byte),
//!           3 string (u16 length + UTF-8 bytes)
//! maxslot u16
//! ```

use std::fmt;
use std::fs;
use std::path::Path;

use gos_parser::PrimValue;

use crate::chunk::Chunk;

/// File magic: "GOSB".
pub const MAGIC: [u8; 4] = [0x47, 0x4F, 0x53, 0x42];

/// Current format version.
pub const VERSION: u16 = 1;

/// Default file extension for serialized chunks.
pub const CHUNK_EXTENSION: &str = "gbc";

const TAG_UNIT: u8 = 0;
const TAG_NUMBER: u8 = 1;
const TAG_BOOL: u8 = 2;
const TAG_STRING: u8 = 3;

/// Serialization or deserialization failure.
#[derive(Debug, Clone)]
pub enum SerializeError {
    /// Not a chunk file.
    BadMagic,
    /// Chunk written by an incompatible version.
    UnsupportedVersion(u16),
    /// Constant tag byte that is not defined.
    UnknownTag(u8),
    /// Input ended before the structure did.
    Truncated,
    /// Bytes left over after the structure ended.
    TrailingData,
    /// String constant is not valid UTF-8.
    InvalidString,
    /// A string constant longer than the format can record.
    StringTooLong,
    /// More constants than the format can record.
    TooManyConstants,
    /// I/O failure reading or writing a chunk file.
    Io(String),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::BadMagic => write!(f, "Serializer error: not a Gos bytecode file"),
            SerializeError::UnsupportedVersion(v) => {
                write!(f, "Serializer error: unsupported format version {}", v)
            }
            SerializeError::UnknownTag(tag) => {
                write!(f, "Serializer error: unknown constant tag {}", tag)
            }
            SerializeError::Truncated => write!(f, "Serializer error: truncated input"),
            SerializeError::TrailingData => {
                write!(f, "Serializer error: trailing bytes after chunk")
            }
            SerializeError::InvalidString => {
                write!(f, "Serializer error: string constant is not valid UTF-8")
            }
            SerializeError::StringTooLong => {
                write!(f, "Serializer error: string constant too long")
            }
            SerializeError::TooManyConstants => {
                write!(f, "Serializer error: too many constants")
            }
            SerializeError::Io(msg) => write!(f, "Serializer error: {}", msg),
        }
    }
}

impl std::error::Error for SerializeError {}

/// Result type for serialization.
pub type Result<T> = std::result::Result<T, SerializeError>;

/// Encode a chunk into its binary form.
pub fn save(chunk: &Chunk) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(chunk.code.len() + 64);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());

    out.extend_from_slice(&(chunk.code.len() as u32).to_le_bytes());
    out.extend_from_slice(&chunk.code);

    let nconst: u16 = chunk
        .constants
        .len()
        .try_into()
        .map_err(|_| SerializeError::TooManyConstants)?;
    out.extend_from_slice(&nconst.to_le_bytes());
    for constant in &chunk.constants {
        match constant {
            PrimValue::Unit => out.push(TAG_UNIT),
            PrimValue::Number(n) => {
                out.push(TAG_NUMBER);
                out.extend_from_slice(&n.to_le_bytes());
            }
            PrimValue::Bool(b) => {
                out.push(TAG_BOOL);
                out.push(*b as u8);
            }
            PrimValue::Str(s) => {
                out.push(TAG_STRING);
                let len: u16 = s
                    .len()
                    .try_into()
                    .map_err(|_| SerializeError::StringTooLong)?;
                out.extend_from_slice(&len.to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }

    out.extend_from_slice(&chunk.max_slot.to_le_bytes());
    Ok(out)
}

/// Decode a chunk from its binary form.
pub fn load(bytes: &[u8]) -> Result<Chunk> {
    let mut reader = Reader { bytes, pos: 0 };

    if reader.take(4)? != MAGIC {
        return Err(SerializeError::BadMagic);
    }
    let version = reader.u16()?;
    if version != VERSION {
        return Err(SerializeError::UnsupportedVersion(version));
    }

    let code_len = reader.u32()? as usize;
    let code = reader.take(code_len)?.to_vec();

    let nconst = reader.u16()? as usize;
    let mut constants = Vec::with_capacity(nconst);
    for _ in 0..nconst {
        let tag = reader.u8()?;
        let constant = match tag {
            TAG_UNIT => PrimValue::Unit,
            TAG_NUMBER => {
                let raw: [u8; 8] = reader.take(8)?.try_into().expect("8 bytes requested");
                PrimValue::Number(f64::from_le_bytes(raw))
            }
            TAG_BOOL => PrimValue::Bool(reader.u8()? != 0),
            TAG_STRING => {
                let len = reader.u16()? as usize;
                let raw = reader.take(len)?;
                let s = std::str::from_utf8(raw).map_err(|_| SerializeError::InvalidString)?;
                PrimValue::Str(s.to_string())
            }
            other => return Err(SerializeError::UnknownTag(other)),
        };
        constants.push(constant);
    }

    let max_slot = reader.u16()?;

    if reader.pos != bytes.len() {
        return Err(SerializeError::TrailingData);
    }

    Ok(Chunk {
        code,
        constants,
        max_slot,
    })
}

/// Write a chunk to a file.
pub fn save_file(chunk: &Chunk, path: &Path) -> Result<()> {
    let bytes = save(chunk)?;
    fs::write(path, bytes).map_err(|e| SerializeError::Io(e.to_string()))
}

/// Read a chunk from a file.
pub fn load_file(path: &Path) -> Result<Chunk> {
    let bytes = fs::read(path).map_err(|e| SerializeError::Io(e.to_string()))?;
    load(&bytes)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(SerializeError::Truncated)?;
        if end > self.bytes.len() {
            return Err(SerializeError::Truncated);
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let raw: [u8; 2] = self.take(2)?.try_into().expect("2 bytes requested");
        Ok(u16::from_le_bytes(raw))
    }

    fn u32(&mut self) -> Result<u32> {
        let raw: [u8; 4] = self.take(4)?.try_into().expect("4 bytes requested");
        Ok(u32::from_le_bytes(raw))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::OpCode;

    fn sample_chunk() -> Chunk {
        let mut chunk = Chunk::new();
        chunk.add_constant(PrimValue::Number(1.5)).unwrap();
        chunk.add_constant(PrimValue::Str("hi".into())).unwrap();
        chunk.add_constant(PrimValue::Bool(true)).unwrap();
        chunk.add_constant(PrimValue::Unit).unwrap();
        chunk.code = vec![
            OpCode::LoadConst as u8,
            0,
            OpCode::Jump as u8,
            0x00,
            0x05,
            OpCode::Halt as u8,
        ];
        chunk.max_slot = 7;
        chunk
    }

    #[test]
    fn test_round_trip() {
        let chunk = sample_chunk();
        let loaded = load(&save(&chunk).unwrap()).unwrap();
        assert_eq!(loaded, chunk);
    }

    #[test]
    fn test_magic_and_version_header() {
        let bytes = save(&sample_chunk()).unwrap();
        assert_eq!(&bytes[0..4], b"GOSB");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), VERSION);
    }

    #[test]
    fn test_code_bytes_kept_verbatim() {
        // Jump targets stay big-endian inside the code stream.
        let chunk = sample_chunk();
        let bytes = save(&chunk).unwrap();
        let code_start = 4 + 2 + 4;
        assert_eq!(&bytes[code_start..code_start + chunk.code.len()], &chunk.code[..]);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = save(&sample_chunk()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(load(&bytes), Err(SerializeError::BadMagic)));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut bytes = save(&sample_chunk()).unwrap();
        bytes[4] = 9;
        assert!(matches!(
            load(&bytes),
            Err(SerializeError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_rejects_truncated_input() {
        let bytes = save(&sample_chunk()).unwrap();
        for len in 0..bytes.len() {
            assert!(
                load(&bytes[..len]).is_err(),
                "prefix of {} bytes should not load",
                len
            );
        }
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = save(&sample_chunk()).unwrap();
        bytes.push(0);
        assert!(matches!(load(&bytes), Err(SerializeError::TrailingData)));
    }

    #[test]
    fn test_rejects_unknown_tag() {
        let mut chunk = Chunk::new();
        chunk.add_constant(PrimValue::Unit).unwrap();
        let mut bytes = save(&chunk).unwrap();
        // The single constant's tag sits right after the count.
        let tag_pos = 4 + 2 + 4 + 2;
        bytes[tag_pos] = 42;
        assert!(matches!(load(&bytes), Err(SerializeError::UnknownTag(42))));
    }

    #[test]
    fn test_empty_chunk_round_trip() {
        let chunk = Chunk::new();
        let loaded = load(&save(&chunk).unwrap()).unwrap();
        assert_eq!(loaded, chunk);
    }
}
