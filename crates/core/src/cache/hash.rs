//! Body digests for stored responses.

use sha2::{Digest, Sha256};

/// SHA-256 of a response body, hex encoded.
///
/// Lets a revalidation tell whether the network copy actually changed.
pub fn content_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}
