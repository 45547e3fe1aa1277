/*++

Licensed under the Apache-2.0 license.

File Name:

   algorithm.rs

Abstract:

    Signing algorithm registry. Every on-wire key and signature size is
    derived from this table.

--*/

use core::fmt;

use vboot_error::{VbootError, VbootResult};

/// Number of supported signing algorithms
pub const ALGORITHM_COUNT: usize = 12;

/// Public exponent shared by every processed key
pub const RSA_PUBLIC_EXPONENT: u32 = 65537;

/// Size of the `len` and `n0inv` words at the start of a processed key
pub const PROCESSED_KEY_PREAMBLE_SIZE: usize = 8;

/// Hash function paired with an RSA modulus size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashKind {
    Sha1,
    Sha256,
    Sha512,
}

impl HashKind {
    /// Digest size in bits
    pub const fn bits(self) -> usize {
        match self {
            HashKind::Sha1 => 160,
            HashKind::Sha256 => 256,
            HashKind::Sha512 => 512,
        }
    }

    /// Digest size in bytes
    pub const fn digest_size(self) -> usize {
        self.bits() / 8
    }

    /// Lowercase name, e.g. `sha256`
    pub const fn name(self) -> &'static str {
        match self {
            HashKind::Sha1 => "sha1",
            HashKind::Sha256 => "sha256",
            HashKind::Sha512 => "sha512",
        }
    }
}

/// Signing algorithm identifier as stored in the kernel header
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlgorithmId {
    Rsa1024Sha1 = 0,
    Rsa1024Sha256 = 1,
    Rsa1024Sha512 = 2,
    Rsa2048Sha1 = 3,
    Rsa2048Sha256 = 4,
    Rsa2048Sha512 = 5,
    Rsa4096Sha1 = 6,
    Rsa4096Sha256 = 7,
    Rsa4096Sha512 = 8,
    Rsa8192Sha1 = 9,
    Rsa8192Sha256 = 10,
    Rsa8192Sha512 = 11,
}

/// Registry entry for a single algorithm
#[derive(Debug, PartialEq, Eq)]
pub struct AlgorithmInfo {
    pub id: AlgorithmId,

    /// Human readable name, e.g. `RSA2048 SHA256`
    pub name: &'static str,

    /// RSA modulus size in bits
    pub key_bits: usize,

    /// Hash applied to the signed data
    pub hash: HashKind,
}

impl AlgorithmInfo {
    const fn new(id: AlgorithmId, name: &'static str, key_bits: usize, hash: HashKind) -> Self {
        Self {
            id,
            name,
            key_bits,
            hash,
        }
    }

    /// Modulus size in bytes
    pub const fn key_bytes(&self) -> usize {
        self.key_bits / 8
    }

    /// Size of the processed public key blob: preamble, modulus and R^2 mod N
    pub const fn processed_key_size(&self) -> usize {
        PROCESSED_KEY_PREAMBLE_SIZE + 2 * self.key_bytes()
    }

    /// Size of a PKCS#1 v1.5 signature
    pub const fn signature_size(&self) -> usize {
        self.key_bytes()
    }

    pub const fn hash_bits(&self) -> usize {
        self.hash.bits()
    }
}

const ALGORITHM_TABLE: [AlgorithmInfo; ALGORITHM_COUNT] = [
    AlgorithmInfo::new(AlgorithmId::Rsa1024Sha1, "RSA1024 SHA1", 1024, HashKind::Sha1),
    AlgorithmInfo::new(AlgorithmId::Rsa1024Sha256, "RSA1024 SHA256", 1024, HashKind::Sha256),
    AlgorithmInfo::new(AlgorithmId::Rsa1024Sha512, "RSA1024 SHA512", 1024, HashKind::Sha512),
    AlgorithmInfo::new(AlgorithmId::Rsa2048Sha1, "RSA2048 SHA1", 2048, HashKind::Sha1),
    AlgorithmInfo::new(AlgorithmId::Rsa2048Sha256, "RSA2048 SHA256", 2048, HashKind::Sha256),
    AlgorithmInfo::new(AlgorithmId::Rsa2048Sha512, "RSA2048 SHA512", 2048, HashKind::Sha512),
    AlgorithmInfo::new(AlgorithmId::Rsa4096Sha1, "RSA4096 SHA1", 4096, HashKind::Sha1),
    AlgorithmInfo::new(AlgorithmId::Rsa4096Sha256, "RSA4096 SHA256", 4096, HashKind::Sha256),
    AlgorithmInfo::new(AlgorithmId::Rsa4096Sha512, "RSA4096 SHA512", 4096, HashKind::Sha512),
    AlgorithmInfo::new(AlgorithmId::Rsa8192Sha1, "RSA8192 SHA1", 8192, HashKind::Sha1),
    AlgorithmInfo::new(AlgorithmId::Rsa8192Sha256, "RSA8192 SHA256", 8192, HashKind::Sha256),
    AlgorithmInfo::new(AlgorithmId::Rsa8192Sha512, "RSA8192 SHA512", 8192, HashKind::Sha512),
];

// Row i must describe algorithm i, with a word-aligned modulus.
const _: () = {
    let mut i = 0;
    while i < ALGORITHM_COUNT {
        assert!(ALGORITHM_TABLE[i].id as usize == i);
        assert!(ALGORITHM_TABLE[i].key_bits > 0 && ALGORITHM_TABLE[i].key_bits % 32 == 0);
        i += 1;
    }
};

static ALGORITHMS: [AlgorithmInfo; ALGORITHM_COUNT] = ALGORITHM_TABLE;

impl AlgorithmId {
    /// Registry entry for this algorithm
    pub fn info(self) -> &'static AlgorithmInfo {
        &ALGORITHMS[self as usize]
    }

    /// All algorithms, weakest first
    pub fn all() -> impl Iterator<Item = AlgorithmId> {
        ALGORITHMS.iter().map(|info| info.id)
    }

    pub fn processed_key_size(self) -> usize {
        self.info().processed_key_size()
    }

    pub fn signature_size(self) -> usize {
        self.info().signature_size()
    }

    pub fn key_bits(self) -> usize {
        self.info().key_bits
    }

    pub fn hash(self) -> HashKind {
        self.info().hash
    }

    pub fn hash_bits(self) -> usize {
        self.info().hash_bits()
    }
}

impl TryFrom<u32> for AlgorithmId {
    type Error = VbootError;

    fn try_from(value: u32) -> VbootResult<Self> {
        ALGORITHMS
            .get(value as usize)
            .map(|info| info.id)
            .ok_or(VbootError::REGISTRY_UNKNOWN_ALGORITHM)
    }
}

impl From<AlgorithmId> for u32 {
    fn from(value: AlgorithmId) -> Self {
        value as u32
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}

/// Processed key size for a raw algorithm id
pub fn processed_key_size(id: u32) -> VbootResult<usize> {
    Ok(AlgorithmId::try_from(id)?.processed_key_size())
}

/// Signature size for a raw algorithm id
pub fn signature_size(id: u32) -> VbootResult<usize> {
    Ok(AlgorithmId::try_from(id)?.signature_size())
}

/// Modulus size in bits for a raw algorithm id
pub fn key_bits(id: u32) -> VbootResult<usize> {
    Ok(AlgorithmId::try_from(id)?.key_bits())
}

/// Hash size in bits for a raw algorithm id
pub fn hash_bits(id: u32) -> VbootResult<usize> {
    Ok(AlgorithmId::try_from(id)?.hash_bits())
}

/// Returns the modulus size in bits recorded in a processed key blob, or
/// `None` if the blob is too short to carry its own length word.
pub fn processed_key_modulus_bits(blob: &[u8]) -> Option<usize> {
    let words = blob.get(..4)?;
    let words = u32::from_le_bytes(words.try_into().ok()?);
    (words as usize).checked_mul(32)
}
