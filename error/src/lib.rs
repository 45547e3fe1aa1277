/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the verified boot crates for error
    handling.

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::fmt;
use core::num::{NonZeroU32, TryFromIntError};

/// Verified Boot Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VbootError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code, plus a lookup of the
/// documentation string used by the `Display` implementation.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: VbootError = VbootError::new_const($value);
        )*

        /// Returns the description of a known error code
        pub fn description(&self) -> Option<&'static str> {
            let code = self.0.get();
            $(
                if code == $value {
                    return Some($doc);
                }
            )*
            None
        }

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl VbootError {
    /// Create an error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get a VbootError from a u32 is to
    /// use `VbootError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("VbootError cannot be 0"),
        }
    }

    define_error_constants![
        (
            REGISTRY_UNKNOWN_ALGORITHM,
            0x0001_0001,
            "Algorithm id is outside the supported range"
        ),
        (
            IMAGE_PARSE_TRUNCATED_HEADER,
            0x0002_0001,
            "Blob is shorter than the kernel header"
        ),
        (
            IMAGE_PARSE_MAGIC_MISMATCH,
            0x0002_0002,
            "Kernel header magic mismatch"
        ),
        (
            IMAGE_PARSE_UNKNOWN_ALGORITHM,
            0x0002_0003,
            "Kernel header names an unknown signing algorithm"
        ),
        (
            IMAGE_PARSE_HEADER_LEN_MISMATCH,
            0x0002_0004,
            "Declared header length does not match the header shape"
        ),
        (
            IMAGE_PARSE_TRUNCATED,
            0x0002_0005,
            "Blob is shorter than the declared image extent"
        ),
        (
            IMAGE_PARSE_KERNEL_LEN_MISMATCH,
            0x0002_0006,
            "Declared kernel length does not match the remaining blob"
        ),
        (
            IMAGE_MODEL_KERNEL_KEY_SIZE_MISMATCH,
            0x0003_0001,
            "Kernel public key size does not match the kernel algorithm"
        ),
        (
            IMAGE_MODEL_HEADER_LEN_MISMATCH,
            0x0003_0002,
            "Header length does not match the header shape"
        ),
        (
            IMAGE_MODEL_KEY_SIGNATURE_SIZE_MISMATCH,
            0x0003_0003,
            "Kernel key signature size does not match the firmware algorithm"
        ),
        (
            IMAGE_MODEL_KERNEL_SIGNATURE_SIZE_MISMATCH,
            0x0003_0004,
            "Kernel signature size does not match the kernel algorithm"
        ),
        (
            IMAGE_MODEL_KERNEL_LEN_MISMATCH,
            0x0003_0005,
            "Kernel length in options does not match the payload"
        ),
        (
            IMAGE_MODEL_CMD_LINE_TOO_LONG,
            0x0003_0006,
            "Kernel command line does not fit the options buffer"
        ),
        (
            IMAGE_MODEL_CMD_LINE_EMBEDDED_NUL,
            0x0003_0007,
            "Kernel command line contains a NUL byte"
        ),
        (
            IMAGE_MODEL_HEADER_CHECKSUM_UNSET,
            0x0003_0008,
            "Header checksum was never computed"
        ),
        (
            IMAGE_GEN_KERNEL_KEY_SIZE_MISMATCH,
            0x0004_0001,
            "Kernel public key does not match the processed key size"
        ),
        (
            IMAGE_GEN_HEADER_CHECKSUM_FAILURE,
            0x0004_0002,
            "Failed to compute the header checksum"
        ),
        (
            IMAGE_GEN_KERNEL_KEY_SIGNATURE_FAILURE,
            0x0004_0003,
            "Failed to sign the kernel key with the firmware key"
        ),
        (
            IMAGE_GEN_KERNEL_SIGNATURE_FAILURE,
            0x0004_0004,
            "Failed to sign the kernel with the kernel key"
        ),
        (
            CRYPTO_DIGEST_FAILURE,
            0x0005_0001,
            "Digest computation failed"
        ),
        (
            CRYPTO_INVALID_PUB_KEY,
            0x0005_0002,
            "Processed public key blob is malformed"
        ),
        (
            CRYPTO_VERIFY_FAILURE,
            0x0005_0003,
            "Signature primitive failed"
        ),
    ];
}

impl fmt::Display for VbootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            Some(desc) => write!(f, "{desc} (0x{:08x})", self.0.get()),
            None => write!(f, "Unknown error (0x{:08x})", self.0.get()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VbootError {}

impl From<core::num::NonZeroU32> for crate::VbootError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::VbootError(val)
    }
}

impl From<VbootError> for core::num::NonZeroU32 {
    fn from(val: VbootError) -> Self {
        val.0
    }
}

impl From<VbootError> for u32 {
    fn from(val: VbootError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for VbootError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(VbootError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type VbootResult<T> = Result<T, VbootError>;
