// SPDX-License-Identifier: MIT
//
// Contact Center Bridge: Dialer Plug-in to HTTP Backend Bridge
// Copyright (c) 2025 Contact Center Bridge Contributors

//! Fixed-width parameter buffer format
//!
//! The dialer exchanges parameters as a flat byte buffer:
//! ```text
//! ┌────────┬──────────────┬────────────────┬─────┬──────────────┬────────────────┐
//! │ Count  │ Key 0        │ Value 0        │ ... │ Key n-1      │ Value n-1      │
//! │ 2 bytes│ 32 bytes     │ 128 bytes      │     │ 32 bytes     │ 128 bytes      │
//! │ ASCII  │ zero padded  │ zero padded    │     │ zero padded  │ zero padded    │
//! └────────┴──────────────┴────────────────┴─────┴──────────────┴────────────────┘
//! ```
//!
//! A field holds the bytes up to its first zero byte, or the whole field when it has none.
//! The outbound buffer uses the same layout with exactly one record.

use crate::{Error, Result};
use std::collections::btree_map::{self, BTreeMap};

/// Count header size in bytes
pub const HEADER_SIZE: usize = 2;

/// Key field size in bytes
pub const KEY_SIZE: usize = 32;

/// Value field size in bytes
pub const VALUE_SIZE: usize = 128;

/// One key/value record
pub const PAIR_SIZE: usize = KEY_SIZE + VALUE_SIZE;

/// Largest parameter count accepted from the header
pub const MAX_PARAMETERS: usize = 100;

/// Size of the outbound buffer: header plus a single record (162 bytes)
pub const RESPONSE_SIZE: usize = HEADER_SIZE + PAIR_SIZE;

/// Decoded parameters, iterated in ascending key order.
///
/// Keys and values are kept as the raw field bytes. Dialer hosts send ANSI code-page text, so
/// nothing here assumes UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter; a repeated key replaces the earlier value
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&[u8]> {
        self.entries.get(key.as_ref()).map(Vec::as_slice)
    }

    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.entries.contains_key(key.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pairs in ascending byte order of the key
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

impl<K: Into<Vec<u8>>, V: Into<Vec<u8>>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

impl IntoIterator for ParameterSet {
    type Item = (Vec<u8>, Vec<u8>);
    type IntoIter = btree_map::IntoIter<Vec<u8>, Vec<u8>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Parse the count header the way C `atoi` does.
///
/// Leading whitespace and one sign are accepted, then digits up to the first non-digit.
/// No digits at all yields 0, so a header of `"AB"` declares zero parameters. Hosts rely on
/// this leniency, so it is kept rather than rejected.
pub fn parse_count(header: &[u8]) -> i64 {
    let mut bytes = header
        .iter()
        .copied()
        .skip_while(|&b| matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r'))
        .peekable();

    let negative = match bytes.peek() {
        Some(b'-') => {
            bytes.next();
            true
        }
        Some(b'+') => {
            bytes.next();
            false
        }
        _ => false,
    };

    let magnitude = bytes
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d - b'0')));

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Validate a declared count against [`MAX_PARAMETERS`].
///
/// Negative counts are rejected too: the dialer ABI treats the count as unsigned, where a
/// negative value wraps to something far above the limit.
pub fn checked_count(declared: i64) -> Result<usize> {
    usize::try_from(declared)
        .ok()
        .filter(|&n| n <= MAX_PARAMETERS)
        .ok_or(Error::TooManyParameters {
            declared,
            limit: MAX_PARAMETERS,
        })
}

/// Number of bytes an inbound buffer declaring `count` records occupies
pub fn inbound_len(count: usize) -> usize {
    HEADER_SIZE + count * PAIR_SIZE
}

/// Decode an inbound buffer into its parameters.
///
/// Reads at most `2 + count * 160` bytes; trailing bytes are ignored.
pub fn decode(buffer: &[u8]) -> Result<ParameterSet> {
    let header = buffer.get(..HEADER_SIZE).ok_or_else(|| {
        Error::InvalidInput(format!(
            "buffer holds {} bytes, count header needs {}",
            buffer.len(),
            HEADER_SIZE
        ))
    })?;

    let count = checked_count(parse_count(header))?;
    let mut params = ParameterSet::new();

    for index in 0..count {
        let start = HEADER_SIZE + index * PAIR_SIZE;
        let end = start + PAIR_SIZE;
        let record = buffer.get(start..end).ok_or(Error::TruncatedBuffer {
            index,
            required: end,
            actual: buffer.len(),
        })?;

        let (key, value) = record.split_at(KEY_SIZE);
        params.insert(field_bytes(key), field_bytes(value));
    }

    Ok(params)
}

/// Text view of a fixed-width field, for display and logging.
///
/// Invalid UTF-8 is replaced rather than rejected; the wire path uses [`field_bytes`].
pub fn field_str(field: &[u8]) -> String {
    String::from_utf8_lossy(field_bytes(field)).into_owned()
}

/// Bytes of a fixed-width field up to its first zero byte
pub fn field_bytes(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// Fill a fixed-width field with `strncpy(field, content, max)` semantics.
///
/// Copies until the first zero byte of `content` or `max` bytes, whichever comes first, and
/// zeroes the rest of the field. Returns the number of content bytes written.
pub fn write_field(field: &mut [u8], content: &[u8], max: usize) -> usize {
    let limit = max.min(field.len());
    let len = content
        .iter()
        .take(limit)
        .position(|&b| b == 0)
        .unwrap_or_else(|| content.len().min(limit));

    field[..len].copy_from_slice(&content[..len]);
    field[len..].fill(0);
    len
}

/// Write a single-record outbound buffer: `"01"`, key, value.
///
/// The key keeps at most 31 bytes and the value at most 127, so both fields always end in a
/// zero byte. Only the first [`RESPONSE_SIZE`] bytes of `out` are touched. Returns the number of
/// value bytes written.
pub fn encode_response(out: &mut [u8], key: &str, value: &[u8]) -> Result<usize> {
    let actual = out.len();
    let record = out
        .get_mut(..RESPONSE_SIZE)
        .ok_or(Error::OutputBufferTooSmall {
            required: RESPONSE_SIZE,
            actual,
        })?;

    let (header, pair) = record.split_at_mut(HEADER_SIZE);
    let (key_field, value_field) = pair.split_at_mut(KEY_SIZE);

    header.copy_from_slice(b"01");
    write_field(key_field, key.as_bytes(), KEY_SIZE - 1);
    Ok(write_field(value_field, value, VALUE_SIZE - 1))
}

/// Read back a single-record outbound buffer.
///
/// Returns `None` when the buffer declares no record, as an untouched zeroed buffer does.
pub fn decode_response(buffer: &[u8]) -> Result<Option<(String, String)>> {
    Ok(decode(buffer)?.iter().next().map(|(key, value)| {
        (
            String::from_utf8_lossy(key).into_owned(),
            String::from_utf8_lossy(value).into_owned(),
        )
    }))
}

/// Build an inbound buffer from key/value pairs.
///
/// Keys longer than 32 bytes and values longer than 128 bytes are cut to their field width
/// without a terminating zero, as dialer hosts do. More than 99 pairs cannot be expressed by a
/// two-digit header.
pub fn encode_parameters<I, K, V>(pairs: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    let pairs: Vec<(K, V)> = pairs.into_iter().collect();
    if pairs.len() > 99 {
        return Err(Error::TooManyParameters {
            declared: pairs.len() as i64,
            limit: 99,
        });
    }

    let mut buffer = vec![0u8; inbound_len(pairs.len())];
    buffer[..HEADER_SIZE].copy_from_slice(format!("{:02}", pairs.len()).as_bytes());

    for (index, (key, value)) in pairs.iter().enumerate() {
        let start = HEADER_SIZE + index * PAIR_SIZE;
        let (key_field, value_field) = buffer[start..start + PAIR_SIZE].split_at_mut(KEY_SIZE);

        let key = key.as_ref();
        let key_len = key.len().min(KEY_SIZE);
        key_field[..key_len].copy_from_slice(&key[..key_len]);

        let value = value.as_ref();
        let value_len = value.len().min(VALUE_SIZE);
        value_field[..value_len].copy_from_slice(&value[..value_len]);
    }

    Ok(buffer)
}
