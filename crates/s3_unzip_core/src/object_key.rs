use percent_encoding::percent_decode_str;

use crate::error::{Result, UnzipError};

pub const ZIP_EXTENSION: &str = "zip";

/// Decode an S3 notification key: `+` becomes a space, then `%XX` escapes are
/// decoded as UTF-8.
///
/// Unlike `percent_decode_str` on its own, a `%` that is not followed by two hex
/// digits is rejected instead of passed through.
pub fn decode_object_key(raw: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    ensure_well_formed_escapes(raw, &spaced)?;

    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|error| UnzipError::KeyDecode {
            key: raw.to_string(),
            reason: format!("decoded bytes are not UTF-8: {error}"),
        })
}

fn ensure_well_formed_escapes(raw: &str, spaced: &str) -> Result<()> {
    let bytes = spaced.as_bytes();
    let mut index = 0;
    while let Some(offset) = bytes[index..].iter().position(|byte| *byte == b'%') {
        let at = index + offset;
        match bytes.get(at + 1..at + 3) {
            Some(&[high, low]) if high.is_ascii_hexdigit() && low.is_ascii_hexdigit() => {
                index = at + 3;
            }
            _ => {
                return Err(UnzipError::KeyDecode {
                    key: raw.to_string(),
                    reason: format!("incomplete escape sequence at byte {at}"),
                });
            }
        }
    }
    Ok(())
}

/// Extension of the last path segment, without the dot. Empty when the file
/// name has no dot.
pub fn file_extension(key: &str) -> &str {
    let name_start = key
        .rfind(|c: char| c == '/' || c == '\\')
        .map_or(0, |separator| separator + 1);
    let name = &key[name_start..];
    name.rfind('.').map_or("", |dot| &name[dot + 1..])
}

/// Case-sensitive: `report.ZIP` is not an archive key.
pub fn is_zip_key(key: &str) -> bool {
    file_extension(key) == ZIP_EXTENSION
}
