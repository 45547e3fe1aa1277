/*++

Licensed under the Apache-2.0 license.

File Name:

   key.rs

Abstract:

    Conversion between RSA keys and processed public key blobs.

--*/

use anyhow::{bail, Context};
use openssl::bn::{BigNum, BigNumContext};
use openssl::pkey::{HasPublic, Public};
use openssl::rsa::{Rsa, RsaRef};
use vboot_error::{VbootError, VbootResult};
use vboot_image_types::*;

/// Convert an RSA public key to a processed key blob
///
/// Blob layout, all little-endian:
/// `len (words) | n0inv | n (len words) | rr = R^2 mod n (len words)`
/// where `R = 2^(32 * len)` and `n0inv = -n^-1 mod 2^32`.
pub fn processed_pub_key<T: HasPublic>(rsa: &RsaRef<T>) -> anyhow::Result<Vec<u8>> {
    let key_bytes = rsa.size() as usize;
    if key_bytes % 4 != 0 {
        bail!("RSA modulus of {key_bytes} bytes is not word aligned");
    }
    if rsa.e() != &BigNum::from_u32(RSA_PUBLIC_EXPONENT)? {
        bail!("RSA public exponent must be {RSA_PUBLIC_EXPONENT}");
    }

    let n = rsa.n().to_vec_padded(key_bytes as i32)?;
    let n0 = u32::from_be_bytes(n[key_bytes - 4..].try_into()?);
    if n0 & 1 == 0 {
        bail!("RSA modulus is even");
    }

    let mut ctx = BigNumContext::new()?;
    let mut r_squared = BigNum::new()?;
    r_squared.set_bit((key_bytes * 8 * 2) as i32)?;
    let mut rr = BigNum::new()?;
    rr.nnmod(&r_squared, rsa.n(), &mut ctx)?;
    let rr = rr.to_vec_padded(key_bytes as i32)?;

    let mut blob = Vec::with_capacity(PROCESSED_KEY_PREAMBLE_SIZE + 2 * key_bytes);
    blob.extend_from_slice(&((key_bytes / 4) as u32).to_le_bytes());
    blob.extend_from_slice(&inverse_mod_word(n0).wrapping_neg().to_le_bytes());
    blob.extend(n.iter().rev());
    blob.extend(rr.iter().rev());
    Ok(blob)
}

/// Rebuild an RSA public key from a processed key blob
pub fn rsa_pub_key_from_processed(blob: &[u8]) -> VbootResult<Rsa<Public>> {
    let key_bits =
        processed_key_modulus_bits(blob).ok_or(VbootError::CRYPTO_INVALID_PUB_KEY)?;
    let key_bytes = key_bits / 8;
    if key_bytes == 0 || blob.len() != PROCESSED_KEY_PREAMBLE_SIZE + 2 * key_bytes {
        return Err(VbootError::CRYPTO_INVALID_PUB_KEY);
    }

    let n: Vec<u8> = blob[PROCESSED_KEY_PREAMBLE_SIZE..PROCESSED_KEY_PREAMBLE_SIZE + key_bytes]
        .iter()
        .rev()
        .copied()
        .collect();

    let n = BigNum::from_slice(&n).map_err(|_| VbootError::CRYPTO_INVALID_PUB_KEY)?;
    if n.num_bits() as usize != key_bits || !n.is_bit_set(0) {
        return Err(VbootError::CRYPTO_INVALID_PUB_KEY);
    }
    let e = BigNum::from_u32(RSA_PUBLIC_EXPONENT).map_err(|_| VbootError::CRYPTO_INVALID_PUB_KEY)?;
    Rsa::from_public_components(n, e).map_err(|_| VbootError::CRYPTO_INVALID_PUB_KEY)
}

/// Generate an RSA key pair for an algorithm
///
/// # Returns
///
/// * `(ImageRsaPrivKey, Vec<u8>)` - Private key and processed public key
pub fn generate_rsa_key(algorithm: AlgorithmId) -> anyhow::Result<(ImageRsaPrivKey, Vec<u8>)> {
    let bits = algorithm.key_bits();
    let rsa = Rsa::generate(bits as u32)
        .with_context(|| format!("Failed to generate {bits}-bit RSA key"))?;
    let pub_key = processed_pub_key(&rsa)?;
    let priv_key = ImageRsaPrivKey::from_der(rsa.private_key_to_der()?);
    Ok((priv_key, pub_key))
}

/// Inverse of an odd word modulo 2^32, by Newton iteration
fn inverse_mod_word(n0: u32) -> u32 {
    // n0 * n0 == 1 mod 8, and every step doubles the number of correct bits
    let mut inv = n0;
    for _ in 0..4 {
        inv = inv.wrapping_mul(2u32.wrapping_sub(n0.wrapping_mul(inv)));
    }
    inv
}
