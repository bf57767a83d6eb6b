// SPDX-License-Identifier: MIT
//
// Contact Center Bridge: Dialer Plug-in to HTTP Backend Bridge
// Copyright (c) 2025 Contact Center Bridge Contributors

//! Backend request URL construction

use crate::{codec::ParameterSet, config::RequestConfig, CONTROL_PARAMETER};
use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC};

/// Everything except ASCII letters, digits and `-_.~` is escaped
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Keys keep printable ASCII as is; only bytes a URL cannot carry raw are escaped
const QUERY_KEY: &AsciiSet = &CONTROLS.add(b' ');

/// Percent-encode the raw bytes of a query value; space becomes `%20`, never `+`.
///
/// Bytes are escaped one by one whatever their encoding, so code-page text such as `0xBA`
/// reaches the backend as `%BA`.
pub fn percent_encode(value: impl AsRef<[u8]>) -> String {
    percent_encoding::percent_encode(value.as_ref(), QUERY_VALUE).to_string()
}

/// Build the backend GET URL from decoded parameters.
///
/// The result is `base_url?k1=v1&k2=v2...` with keys in ascending order and the control
/// parameter left out. Values are percent-encoded; keys are copied verbatim, so a key holding
/// `&` or `=` changes the shape of the query string. Dialer scripts depend on the verbatim keys.
/// Key bytes outside printable ASCII are escaped, since a URL cannot hold them raw.
pub fn build_url(params: &ParameterSet, config: &RequestConfig) -> String {
    let query = params
        .iter()
        .filter(|(key, _)| *key != CONTROL_PARAMETER.as_bytes())
        .map(|(key, value)| {
            format!(
                "{}={}",
                percent_encoding::percent_encode(key, QUERY_KEY),
                percent_encode(value)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    let mut url = String::with_capacity(config.base_url.len() + 1 + query.len());
    url.push_str(&config.base_url);
    url.push('?');
    url.push_str(&query);
    url
}
