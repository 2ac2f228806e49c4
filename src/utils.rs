use md5::{Digest, Md5};

/// APOP proof for `secret`: MD5 over the greeting timestamp (angle brackets
/// included) followed by the secret, as lower-case hex.
pub fn apop_digest(timestamp: &str, secret: &str) -> String {
    let hasher = Md5::new().chain(timestamp).chain(secret);
    format!("{:x}", hasher.result())
}
