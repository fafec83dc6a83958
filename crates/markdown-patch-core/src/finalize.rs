//! Byte-level finalization: re-encoding with the document's original
//! encoding.

use markdown_outline::Encoding;

use crate::error::PatchError;

const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

pub(crate) fn encode(content: &str, encoding: Encoding) -> Result<Vec<u8>, PatchError> {
    match encoding {
        Encoding::Utf8 => Ok(content.as_bytes().to_vec()),
        Encoding::Utf8Bom => {
            let mut bytes = Vec::with_capacity(content.len() + BOM.len());
            bytes.extend_from_slice(BOM);
            bytes.extend_from_slice(content.as_bytes());
            Ok(bytes)
        }
        Encoding::Latin1 => {
            let mut bytes = Vec::with_capacity(content.len());
            for ch in content.chars() {
                let code = ch as u32;
                if code > 0xFF {
                    return Err(PatchError::Encoding(format!(
                        "character {ch:?} cannot be encoded as latin-1"
                    )));
                }
                bytes.push(code as u8);
            }
            Ok(bytes)
        }
    }
}
