// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Display helpers for binary payloads

use std::fmt::Write;

/// Encode bytes as lower-case hex
pub fn to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Render bytes as ASCII where printable, escaping everything else as `\xNN`
pub fn escape_ascii(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len());

    for b in data {
        match b {
            b'\\' => s.push_str("\\\\"),
            0x20..=0x7e => s.push(*b as char),
            _ => {
                // Writing to a String cannot fail
                let _ = write!(s, "\\x{:02x}", b);
            }
        }
    }

    s
}
