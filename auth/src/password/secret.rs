use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::rand_core::RngCore;

/// Random secret for single-use links, hex encoded.
///
/// # Arguments
/// * `bytes` - Entropy in bytes; the returned string is twice as long
pub fn generate_secret(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);

    hex::encode(buffer)
}
