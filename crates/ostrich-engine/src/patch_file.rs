use std::path::Path;

use ostrich_types::{first_unsorted, EncodedDelta};

use crate::error::{EngineError, EngineResult};
use crate::index::Patch;

/// Patch file magic bytes.
pub const MAGIC: &[u8; 4] = b"OSTP";

/// Current patch file format version.
pub const FORMAT_VERSION: u32 = 1;

/// Header: magic + format + version + entry count + CRC32 + payload length.
const HEADER_SIZE: usize = 24;

/// Trailer: BLAKE3 checksum of header and payload.
const TRAILER_SIZE: usize = 32;

/// zstd level for patch payloads.
const COMPRESSION_LEVEL: i32 = 3;

/// Serialize a patch into its on-disk form.
///
/// ```text
/// [4 bytes: "OSTP"]
/// [4 bytes: format version (u32 BE)]
/// [4 bytes: archive version (u32 BE)]
/// [4 bytes: entry count (u32 BE)]
/// [4 bytes: CRC32 of payload (u32 BE)]
/// [4 bytes: payload length (u32 BE)]
/// [N bytes: payload = zstd(bincode(Vec<EncodedDelta>))]
/// [32 bytes: BLAKE3 of everything above]
/// ```
pub fn encode(patch: &Patch) -> EngineResult<Vec<u8>> {
    let serialized =
        bincode::serialize(&patch.deltas).map_err(|e| EngineError::Serialization(e.to_string()))?;
    let payload = zstd::encode_all(serialized.as_slice(), COMPRESSION_LEVEL)?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len() + TRAILER_SIZE);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
    bytes.extend_from_slice(&patch.version.to_be_bytes());
    bytes.extend_from_slice(&(patch.deltas.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&crc32fast::hash(&payload).to_be_bytes());
    bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&payload);

    let checksum = blake3::hash(&bytes);
    bytes.extend_from_slice(checksum.as_bytes());
    Ok(bytes)
}

/// Parse and verify a patch file read from `path`.
pub fn decode(path: &Path, bytes: &[u8]) -> EngineResult<Patch> {
    let corrupt = |reason: String| EngineError::CorruptPatch {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.len() < HEADER_SIZE + TRAILER_SIZE {
        return Err(corrupt(format!("file too short ({} bytes)", bytes.len())));
    }
    if &bytes[..4] != MAGIC {
        return Err(corrupt("bad magic".into()));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - TRAILER_SIZE);
    let computed = blake3::hash(body);
    if computed.as_bytes().as_slice() != trailer {
        return Err(corrupt(format!(
            "checksum mismatch: expected {}, computed {}",
            hex::encode(trailer),
            computed.to_hex()
        )));
    }

    let format = read_u32(body, 4);
    if format != FORMAT_VERSION {
        return Err(corrupt(format!("unsupported format version {format}")));
    }
    let version = read_u32(body, 8);
    let count = read_u32(body, 12) as usize;
    let expected_crc = read_u32(body, 16);
    let length = read_u32(body, 20) as usize;

    let payload = &body[HEADER_SIZE..];
    if payload.len() != length {
        return Err(corrupt(format!(
            "payload length {} does not match header {length}",
            payload.len()
        )));
    }
    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(corrupt(format!(
            "CRC mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"
        )));
    }

    let serialized = zstd::decode_all(payload).map_err(|e| corrupt(e.to_string()))?;
    let deltas: Vec<EncodedDelta> =
        bincode::deserialize(&serialized).map_err(|e| corrupt(e.to_string()))?;
    if deltas.len() != count {
        return Err(corrupt(format!(
            "entry count {} does not match header {count}",
            deltas.len()
        )));
    }
    if let Some(index) = first_unsorted(&deltas) {
        return Err(corrupt(format!("entry {index} is out of SPO order")));
    }

    Ok(Patch { version, deltas })
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
