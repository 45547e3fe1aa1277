/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Kernel image verification library.

--*/

mod verifier;

use core::fmt;

use vboot_error::VbootResult;
use vboot_image_types::*;

pub use verifier::ImageVerifier;

/// Result of verifying a kernel blob
///
/// Anything other than `Success` means the image must not be booted.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyOutcome {
    Success = 0,
    ParseFailed = 1,
    ChecksumFailed = 2,
    KeySignatureFailed = 3,
    DataSignatureFailed = 4,
}

impl VerifyOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            VerifyOutcome::Success => "VERIFY_KERNEL_SUCCESS",
            VerifyOutcome::ParseFailed => "VERIFY_FAILED_PARSE",
            VerifyOutcome::ChecksumFailed => "VERIFY_FAILED_CHECKSUM",
            VerifyOutcome::KeySignatureFailed => "VERIFY_FAILED_KEY_SIGNATURE",
            VerifyOutcome::DataSignatureFailed => "VERIFY_FAILED_DATA_SIGNATURE",
        }
    }

    pub fn is_success(self) -> bool {
        self == VerifyOutcome::Success
    }
}

impl fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which stages of the chain to run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Parse, checksum, kernel key signature and kernel signature
    #[default]
    Full,

    /// Stop after the kernel key signature; the payload need not be present
    HeaderOnly,
}

/// Verified kernel information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelVerificationInfo {
    pub header_version: u32,

    pub firmware_sign_algorithm: AlgorithmId,

    pub kernel_sign_algorithm: AlgorithmId,

    /// Anti-rollback counter, for the caller to compare against its own
    pub kernel_key_version: u32,

    /// Two-part version tag from the options
    pub kernel_version: [u32; 2],

    pub kernel_len: u64,

    pub load_addr: u64,

    pub entry_point: u64,

    /// Serialized size of the whole image
    pub image_size: usize,

    /// False in header-only mode
    pub payload_verified: bool,
}

impl KernelVerificationInfo {
    fn new(
        header: &KernelHeader,
        options: &KernelOptions,
        image_size: usize,
        payload_verified: bool,
    ) -> Self {
        Self {
            header_version: header.header_version(),
            firmware_sign_algorithm: header.firmware_sign_algorithm(),
            kernel_sign_algorithm: header.kernel_sign_algorithm(),
            kernel_key_version: header.kernel_key_version(),
            kernel_version: [options.version[0].get(), options.version[1].get()],
            kernel_len: options.kernel_len.get(),
            load_addr: options.kernel_load_addr.get(),
            entry_point: options.kernel_entry_addr.get(),
            image_size,
            payload_verified,
        }
    }
}

/// Image Verification Environment
pub trait ImageVerificationEnv {
    /// Calculate a digest over the concatenation of `data`
    fn digest(&mut self, hash: HashKind, data: &[&[u8]]) -> VbootResult<Vec<u8>>;

    /// Perform RSA PKCS#1 v1.5 verification of `sig` over a precomputed digest
    fn rsa_verify(
        &mut self,
        algorithm: AlgorithmId,
        digest: &[u8],
        pub_key: &[u8],
        sig: &[u8],
    ) -> VbootResult<bool>;
}

impl<T: ImageVerificationEnv + ?Sized> ImageVerificationEnv for &mut T {
    fn digest(&mut self, hash: HashKind, data: &[&[u8]]) -> VbootResult<Vec<u8>> {
        (**self).digest(hash, data)
    }

    fn rsa_verify(
        &mut self,
        algorithm: AlgorithmId,
        digest: &[u8],
        pub_key: &[u8],
        sig: &[u8],
    ) -> VbootResult<bool> {
        (**self).rsa_verify(algorithm, digest, pub_key, sig)
    }
}
