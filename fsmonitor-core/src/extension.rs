//! The on-disk clean-bitmap index extension codec.
//!
//! Wire format (V2; V1 is read-only, kept for backward compatibility):
//!
//! ```text
//! ext := u32 version_be
//!      | version==1 : u64 timestamp_be         -> token = decimal_ascii(timestamp)
//!      | version==2 : NUL-terminated UTF-8 token
//!      | u32 ewah_size_be
//!      | ewah_size bytes : serialized compressed bitmap
//! ```

use crate::bitmap::CleanBitmap;
use crate::errors::ExtensionError;
use crate::token::Token;

const VERSION_1: u32 = 1;
const VERSION_2: u32 = 2;

/// Minimum byte length of any well-formed extension: a version word, at
/// least one byte of token/timestamp, and the bitmap-size word.
const MIN_LEN: usize = 4 + 1 + 4;

/// Parse the extension payload into its token and bitmap.
///
/// Fails with [`ExtensionError::Corrupt`] if the buffer is shorter than the
/// minimum possible extension, [`ExtensionError::BadVersion`] if the header
/// names an unknown version, and [`ExtensionError::CorruptBitmap`] if the
/// bitmap parser does not consume exactly `ewah_size` bytes.
pub fn parse(bytes: &[u8]) -> Result<(Token, CleanBitmap), ExtensionError> {
    if bytes.len() < MIN_LEN {
        return Err(ExtensionError::Corrupt);
    }

    let mut offset = 0usize;
    let version = read_u32(bytes, &mut offset);

    let token = match version {
        VERSION_1 => {
            if bytes.len() < offset + 8 {
                return Err(ExtensionError::Corrupt);
            }
            let timestamp = read_u64(bytes, &mut offset);
            Token::from_nanos(timestamp)
        }
        VERSION_2 => {
            let nul_pos = bytes[offset..]
                .iter()
                .position(|&b| b == 0)
                .ok_or(ExtensionError::MalformedToken)?;
            let token_str = std::str::from_utf8(&bytes[offset..offset + nul_pos])
                .map_err(|_| ExtensionError::MalformedToken)?;
            let token = Token::new(token_str);
            offset += nul_pos + 1;
            token
        }
        other => return Err(ExtensionError::BadVersion(other)),
    };

    if bytes.len() < offset + 4 {
        return Err(ExtensionError::Corrupt);
    }
    let ewah_size = read_u32(bytes, &mut offset) as usize;
    if bytes.len() < offset + ewah_size {
        return Err(ExtensionError::CorruptBitmap);
    }

    let bitmap_bytes = &bytes[offset..offset + ewah_size];
    let (bitmap, consumed) = CleanBitmap::parse(bitmap_bytes).ok_or(ExtensionError::CorruptBitmap)?;
    if consumed != ewah_size {
        return Err(ExtensionError::CorruptBitmap);
    }

    Ok((token, bitmap))
}

/// Check the invariant the caller of [`parse`] is responsible for asserting:
/// the bitmap's bit range must not exceed the number of live index entries,
/// unless a split-index is in effect (an orthogonal mechanism this crate
/// does not model; pass `split_index = true` to skip the check).
pub fn check_bitmap_bounds(
    bitmap: &CleanBitmap,
    entries: usize,
    split_index: bool,
) -> Result<(), ExtensionError> {
    if !split_index && bitmap.bit_count() > entries {
        return Err(ExtensionError::BitmapExceedsIndex { bitmap_bits: bitmap.bit_count(), entries });
    }
    Ok(())
}

/// Emit the extension payload. Always writes V2, regardless of what version
/// was last read.
pub fn emit(token: &Token, bitmap: &CleanBitmap) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&VERSION_2.to_be_bytes());
    out.extend_from_slice(token.as_str().as_bytes());
    out.push(0);

    let size_patch_at = out.len();
    out.extend_from_slice(&0u32.to_be_bytes());

    let bitmap_bytes = bitmap.serialize();
    out.extend_from_slice(&bitmap_bytes);

    let size = (bitmap_bytes.len() as u32).to_be_bytes();
    out[size_patch_at..size_patch_at + 4].copy_from_slice(&size);

    out
}

fn read_u32(bytes: &[u8], offset: &mut usize) -> u32 {
    let value = u32::from_be_bytes(bytes[*offset..*offset + 4].try_into().unwrap());
    *offset += 4;
    value
}

fn read_u64(bytes: &[u8], offset: &mut usize) -> u64 {
    let value = u64::from_be_bytes(bytes[*offset..*offset + 8].try_into().unwrap());
    *offset += 8;
    value
}
