/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains crypto utilities needed to generate and verify images.

--*/

mod key;

use std::path::Path;

use anyhow::{bail, Context};
use openssl::error::ErrorStack;
use openssl::hash::{Hasher, MessageDigest};
use openssl::md::{Md, MdRef};
use openssl::pkey::{PKey, Public};
use openssl::pkey_ctx::PkeyCtx;
use openssl::rsa::{Padding, Rsa};
use vboot_error::{VbootError, VbootResult};
use vboot_image_gen::ImageGeneratorCrypto;
use vboot_image_types::*;
use vboot_image_verify::ImageVerificationEnv;

pub use key::{generate_rsa_key, processed_pub_key, rsa_pub_key_from_processed};

#[derive(Default)]
pub struct OsslCrypto {}

fn message_digest(hash: HashKind) -> MessageDigest {
    match hash {
        HashKind::Sha1 => MessageDigest::sha1(),
        HashKind::Sha256 => MessageDigest::sha256(),
        HashKind::Sha512 => MessageDigest::sha512(),
    }
}

fn signature_md(hash: HashKind) -> &'static MdRef {
    match hash {
        HashKind::Sha1 => Md::sha1(),
        HashKind::Sha256 => Md::sha256(),
        HashKind::Sha512 => Md::sha512(),
    }
}

fn verify_ctx(pkey: &PKey<Public>, hash: HashKind) -> Result<PkeyCtx<Public>, ErrorStack> {
    let mut ctx = PkeyCtx::new(pkey)?;
    ctx.verify_init()?;
    ctx.set_rsa_padding(Padding::PKCS1)?;
    ctx.set_signature_md(signature_md(hash))?;
    Ok(ctx)
}

/// Digest the concatenation of `data`
pub fn digest_parts(hash: HashKind, data: &[&[u8]]) -> Result<Vec<u8>, ErrorStack> {
    let mut hasher = Hasher::new(message_digest(hash))?;
    for part in data {
        hasher.update(part)?;
    }
    Ok(hasher.finish()?.to_vec())
}

/// Read an RSA key pair from a private key PEM file
///
/// # Returns
///
/// * `(ImageRsaPrivKey, Vec<u8>)` - Private key and processed public key
pub fn rsa_key_pair_from_pem(path: &Path) -> anyhow::Result<(ImageRsaPrivKey, Vec<u8>)> {
    let key_bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read private key PEM file {}", path.display()))?;
    let rsa = Rsa::private_key_from_pem(&key_bytes)
        .with_context(|| format!("Invalid RSA private key {}", path.display()))?;

    let pub_key = processed_pub_key(&rsa)?;
    Ok((ImageRsaPrivKey::from_der(rsa.private_key_to_der()?), pub_key))
}

impl ImageGeneratorCrypto for OsslCrypto {
    fn digest(&self, hash: HashKind, data: &[&[u8]]) -> anyhow::Result<Vec<u8>> {
        Ok(digest_parts(hash, data)?)
    }

    fn rsa_sign(
        &self,
        algorithm: AlgorithmId,
        digest: &[u8],
        priv_key: &ImageRsaPrivKey,
    ) -> anyhow::Result<Vec<u8>> {
        let rsa = Rsa::private_key_from_der(priv_key.der())?;
        let key_bits = rsa.size() as usize * 8;
        if key_bits != algorithm.key_bits() {
            bail!("{algorithm} cannot sign with a {key_bits}-bit key");
        }

        let pkey = PKey::from_rsa(rsa)?;
        let mut ctx = PkeyCtx::new(&pkey)?;
        ctx.sign_init()?;
        ctx.set_rsa_padding(Padding::PKCS1)?;
        ctx.set_signature_md(signature_md(algorithm.hash()))?;

        let mut sig = vec![];
        ctx.sign_to_vec(digest, &mut sig)?;
        Ok(sig)
    }

    fn rsa_priv_key_from_pem(path: &Path) -> anyhow::Result<ImageRsaPrivKey> {
        let (priv_key, _) = rsa_key_pair_from_pem(path)?;
        Ok(priv_key)
    }

    fn rsa_processed_pub_key_from_pem(path: &Path) -> anyhow::Result<Vec<u8>> {
        let key_bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read key PEM file {}", path.display()))?;

        if let Ok(rsa) = Rsa::public_key_from_pem(&key_bytes) {
            return processed_pub_key(&rsa);
        }
        if let Ok(rsa) = Rsa::public_key_from_pem_pkcs1(&key_bytes) {
            return processed_pub_key(&rsa);
        }
        let rsa = Rsa::private_key_from_pem(&key_bytes)
            .with_context(|| format!("No RSA key found in {}", path.display()))?;
        processed_pub_key(&rsa)
    }
}

impl ImageVerificationEnv for OsslCrypto {
    fn digest(&mut self, hash: HashKind, data: &[&[u8]]) -> VbootResult<Vec<u8>> {
        digest_parts(hash, data).map_err(|_| VbootError::CRYPTO_DIGEST_FAILURE)
    }

    fn rsa_verify(
        &mut self,
        algorithm: AlgorithmId,
        digest: &[u8],
        pub_key: &[u8],
        sig: &[u8],
    ) -> VbootResult<bool> {
        if sig.len() != algorithm.signature_size() {
            return Ok(false);
        }

        let rsa = rsa_pub_key_from_processed(pub_key)?;
        let pkey = PKey::from_rsa(rsa).map_err(|_| VbootError::CRYPTO_INVALID_PUB_KEY)?;
        let mut ctx = verify_ctx(&pkey, algorithm.hash())
            .map_err(|_| VbootError::CRYPTO_VERIFY_FAILURE)?;

        // A malformed signature surfaces as an error rather than `false`
        match ctx.verify(digest, sig) {
            Ok(valid) => Ok(valid),
            Err(err) => {
                log::debug!("{algorithm} verification error: {err}");
                Ok(false)
            }
        }
    }
}
