/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the kernel image generator.

--*/

mod generator;

pub use generator::ImageGenerator;

use std::path::Path;
use vboot_image_types::*;

/// Image Generator Executable
pub trait ImageGeneratorExecutable {
    /// Two-part version tag
    fn version(&self) -> [u32; 2];

    /// Executable Load Address
    fn load_addr(&self) -> u64;

    /// Executable Entry Point
    fn entry_point(&self) -> u64;

    /// Executable Content
    fn content(&self) -> &[u8];

    /// Executable Size
    fn size(&self) -> u64 {
        self.content().len() as u64
    }
}

/// In-memory kernel payload
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KernelExecutable {
    pub version: [u32; 2],

    pub load_addr: u64,

    pub entry_point: u64,

    pub content: Vec<u8>,
}

impl KernelExecutable {
    /// Create a payload at version 1.0 with zero load and entry addresses
    pub fn new(content: Vec<u8>) -> Self {
        Self {
            version: [1, 0],
            content,
            ..Default::default()
        }
    }
}

impl ImageGeneratorExecutable for KernelExecutable {
    fn version(&self) -> [u32; 2] {
        self.version
    }

    fn load_addr(&self) -> u64 {
        self.load_addr
    }

    fn entry_point(&self) -> u64 {
        self.entry_point
    }

    fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Image Generator Crypto Trait
pub trait ImageGeneratorCrypto {
    /// Calculate a digest over the concatenation of `data`
    fn digest(&self, hash: HashKind, data: &[&[u8]]) -> anyhow::Result<Vec<u8>>;

    /// Calculate an RSA PKCS#1 v1.5 signature over a precomputed digest
    fn rsa_sign(
        &self,
        algorithm: AlgorithmId,
        digest: &[u8],
        priv_key: &ImageRsaPrivKey,
    ) -> anyhow::Result<Vec<u8>>;

    /// Read RSA Private Key from PEM file
    fn rsa_priv_key_from_pem(path: &Path) -> anyhow::Result<ImageRsaPrivKey>;

    /// Read an RSA key from PEM file and convert it to a processed public key
    fn rsa_processed_pub_key_from_pem(path: &Path) -> anyhow::Result<Vec<u8>>;
}

/// Image Generator Configuration
pub struct ImageGeneratorConfig<E>
where
    E: ImageGeneratorExecutable,
{
    pub firmware_sign_algorithm: AlgorithmId,

    pub kernel_sign_algorithm: AlgorithmId,

    pub kernel_key_version: u32,

    /// Processed kernel public key
    pub kernel_pub_key: Vec<u8>,

    pub firmware_priv_key: ImageRsaPrivKey,

    pub kernel_priv_key: ImageRsaPrivKey,

    pub cmd_line: String,

    pub kernel: E,
}
