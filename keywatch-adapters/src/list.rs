//! Parser for the plain-text identity lists referenced by each monitor.
//!
//! One identity per line: either a 192 character hex BLS key or a bech32
//! account address. Blank lines and lines starting with `#` are ignored, and
//! a value may be wrapped in double quotes.
//!
//! ```text
//! # our validators
//! erd1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5z5tpwxqergd3c8g7rusq4707q5
//! "0123...abcd"
//! ```

use std::path::Path;

use keywatch_types::{Address, IdentityList, ADDRESS_HRP, ADDRESS_LEN, BLS_HEX_KEY_LEN};

use crate::AdapterError;

const COMMENT_MARKER: char = '#';

/// Read and parse a list file.
pub fn parse_list_file(path: impl AsRef<Path>) -> Result<IdentityList, AdapterError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| AdapterError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_list(&contents)
}

/// Parse list contents. Fails on the first invalid line, naming it by its
/// zero-based index.
pub fn parse_list(contents: &str) -> Result<IdentityList, AdapterError> {
    let mut list = IdentityList::default();

    for (index, line) in contents.split('\n').enumerate() {
        let line = line.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }

        parse_line(unquote(line), &mut list).map_err(|reason| AdapterError::ListFile {
            line: index,
            reason,
        })?;
    }

    Ok(list)
}

fn unquote(line: &str) -> &str {
    line.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(line)
}

fn parse_line(value: &str, list: &mut IdentityList) -> Result<(), String> {
    if value.len() == BLS_HEX_KEY_LEN {
        hex::decode(value).map_err(|e| format!("invalid BLS key: {e}"))?;
        list.bls_hex_keys.push(value.to_string());
        return Ok(());
    }

    let address = decode_address(value)?;
    list.addresses.push(address);
    Ok(())
}

/// Decode a bech32 account address.
pub fn decode_address(value: &str) -> Result<Address, String> {
    let (hrp, data) =
        bech32::decode(value).map_err(|e| format!("invalid bech32 address {value}: {e}"))?;

    if hrp.to_lowercase() != ADDRESS_HRP {
        return Err(format!(
            "invalid bech32 address {value}: expected prefix {ADDRESS_HRP}"
        ));
    }
    if data.len() != ADDRESS_LEN {
        return Err(format!(
            "invalid bech32 address {value}: decoded length {} is not {ADDRESS_LEN}",
            data.len()
        ));
    }

    Ok(Address {
        hex: hex::encode(data),
        bech32: value.to_string(),
    })
}
