//! Flickr request signing
//!
//! `api_sig` is the hex MD5 of the shared secret followed by every request
//! parameter as `keyvalue`, sorted by key. The digest is fixed by the Flickr
//! auth protocol.

use md5::{Digest, Md5};

/// Concatenate parameters as `k1v1k2v2...` in key order
pub fn flatten_params(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    sorted.iter().fold(String::new(), |mut acc, (k, v)| {
        acc.push_str(k);
        acc.push_str(v);
        acc
    })
}

/// Compute `api_sig` for a parameter set (which must already include
/// `api_key` and `auth_token`)
pub fn sign_params(secret: &str, params: &[(&str, String)]) -> String {
    let mut hasher = Md5::new();
    hasher.update(secret.as_bytes());
    hasher.update(flatten_params(params).as_bytes());
    hex::encode(hasher.finalize())
}
