/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the signed kernel image.

--*/

mod algorithm;

use core::fmt;
use core::mem::size_of;
use core::ops::Range;

use getset::{CopyGetters, Getters};
use memoffset::span_of;
use vboot_error::{VbootError, VbootResult};
use zerocopy::byteorder::little_endian::{U32, U64};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub use algorithm::*;

pub const KERNEL_MAGIC_SIZE: usize = 8;
pub const KERNEL_MAGIC: [u8; KERNEL_MAGIC_SIZE] = *b"CHROMEOS";
pub const KERNEL_HEADER_VERSION: u32 = 1;
pub const KERNEL_CMD_LINE_SIZE: usize = 4096;
pub const HEADER_CHECKSUM_HASH: HashKind = HashKind::Sha512;
pub const HEADER_CHECKSUM_SIZE: usize = HEADER_CHECKSUM_HASH.digest_size();
pub const HEADER_LEN_FIELD_SIZE: usize = size_of::<u32>();
pub const KERNEL_HEADER_PREFIX_SIZE: usize = size_of::<KernelHeaderPrefix>();
pub const KERNEL_OPTIONS_SIZE: usize = size_of::<KernelOptions>();

pub type HeaderChecksum = [u8; HEADER_CHECKSUM_SIZE];

/// Fixed-size leading part of the kernel header
#[repr(C)]
#[derive(
    FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct KernelHeaderPrefix {
    pub magic: [u8; KERNEL_MAGIC_SIZE],

    pub header_version: U32,

    pub firmware_sign_algorithm: U32,

    pub kernel_sign_algorithm: U32,

    pub kernel_key_version: U32,
}

/// Kernel header
///
/// Carries the kernel public key and the metadata the firmware key vouches
/// for. `header_len` is fixed at construction from the kernel signing
/// algorithm, so the only mutation left afterwards is storing the checksum.
/// An image cannot be assembled from a header whose checksum was never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Getters, CopyGetters)]
pub struct KernelHeader {
    /// Header format version
    #[getset(get_copy = "pub")]
    header_version: u32,

    /// Algorithm of the firmware key that signs this header
    #[getset(get_copy = "pub")]
    firmware_sign_algorithm: AlgorithmId,

    /// Algorithm of the kernel key carried in this header
    #[getset(get_copy = "pub")]
    kernel_sign_algorithm: AlgorithmId,

    /// Anti-rollback counter of the kernel key
    #[getset(get_copy = "pub")]
    kernel_key_version: u32,

    /// Processed kernel public key
    #[getset(get = "pub")]
    kernel_sign_key: Vec<u8>,

    /// Serialized size of this header
    #[getset(get_copy = "pub")]
    header_len: u32,

    /// SHA-512 over every header byte preceding this field
    #[getset(get = "pub")]
    header_checksum: HeaderChecksum,

    header_checksum_set: bool,
}

impl KernelHeader {
    /// Create a header with a zeroed checksum
    ///
    /// # Arguments
    ///
    /// * `header_version` - Header format version
    /// * `firmware_sign_algorithm` - Algorithm of the firmware signing key
    /// * `kernel_sign_algorithm` - Algorithm of the kernel signing key
    /// * `kernel_key_version` - Kernel key version
    /// * `kernel_sign_key` - Processed kernel public key
    pub fn new(
        header_version: u32,
        firmware_sign_algorithm: AlgorithmId,
        kernel_sign_algorithm: AlgorithmId,
        kernel_key_version: u32,
        kernel_sign_key: Vec<u8>,
    ) -> VbootResult<Self> {
        if kernel_sign_key.len() != kernel_sign_algorithm.processed_key_size() {
            return Err(VbootError::IMAGE_MODEL_KERNEL_KEY_SIZE_MISMATCH);
        }
        let header_len = u32::try_from(Self::size_for(kernel_sign_algorithm))
            .map_err(|_| VbootError::IMAGE_MODEL_HEADER_LEN_MISMATCH)?;

        Ok(Self {
            header_version,
            firmware_sign_algorithm,
            kernel_sign_algorithm,
            kernel_key_version,
            kernel_sign_key,
            header_len,
            header_checksum: [0u8; HEADER_CHECKSUM_SIZE],
            header_checksum_set: false,
        })
    }

    /// Serialized header size for a kernel signing algorithm
    pub fn size_for(kernel_sign_algorithm: AlgorithmId) -> usize {
        KERNEL_HEADER_PREFIX_SIZE
            + kernel_sign_algorithm.processed_key_size()
            + HEADER_LEN_FIELD_SIZE
            + HEADER_CHECKSUM_SIZE
    }

    pub fn magic(&self) -> &[u8; KERNEL_MAGIC_SIZE] {
        &KERNEL_MAGIC
    }

    /// Store the header checksum
    pub fn set_header_checksum(&mut self, checksum: HeaderChecksum) {
        self.header_checksum = checksum;
        self.header_checksum_set = true;
    }

    /// Whether a checksum has been stored since construction
    pub fn has_header_checksum(&self) -> bool {
        self.header_checksum_set
    }

    /// Fixed-size leading part of the header
    pub fn prefix(&self) -> KernelHeaderPrefix {
        KernelHeaderPrefix {
            magic: KERNEL_MAGIC,
            header_version: U32::new(self.header_version),
            firmware_sign_algorithm: U32::new(self.firmware_sign_algorithm.into()),
            kernel_sign_algorithm: U32::new(self.kernel_sign_algorithm.into()),
            kernel_key_version: U32::new(self.kernel_key_version),
        }
    }

    /// Header bytes covered by the checksum
    pub fn checksummed_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.header_len as usize);
        bytes.extend_from_slice(self.prefix().as_bytes());
        bytes.extend_from_slice(&self.kernel_sign_key);
        bytes.extend_from_slice(&self.header_len.to_le_bytes());
        bytes
    }

    /// Serialized header, checksum included
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.checksummed_bytes();
        bytes.extend_from_slice(&self.header_checksum);
        bytes
    }
}

/// Kernel options
///
/// Covered, together with the kernel payload, by the kernel signature.
#[repr(C)]
#[derive(
    FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct KernelOptions {
    /// Two-part version tag
    pub version: [U32; 2],

    /// NUL padded kernel command line
    pub cmd_line: [u8; KERNEL_CMD_LINE_SIZE],

    /// Payload size in bytes
    pub kernel_len: U64,

    pub kernel_load_addr: U64,

    pub kernel_entry_addr: U64,
}

impl KernelOptions {
    /// Create kernel options
    ///
    /// The command line is NUL padded, so it must leave room for at least one
    /// NUL and must not contain one itself.
    pub fn new(
        version: [u32; 2],
        cmd_line: &str,
        kernel_len: u64,
        kernel_load_addr: u64,
        kernel_entry_addr: u64,
    ) -> VbootResult<Self> {
        if cmd_line.len() >= KERNEL_CMD_LINE_SIZE {
            return Err(VbootError::IMAGE_MODEL_CMD_LINE_TOO_LONG);
        }
        if cmd_line.as_bytes().contains(&0) {
            return Err(VbootError::IMAGE_MODEL_CMD_LINE_EMBEDDED_NUL);
        }

        let mut options = Self::new_zeroed();
        options.version = [U32::new(version[0]), U32::new(version[1])];
        options.cmd_line[..cmd_line.len()].copy_from_slice(cmd_line.as_bytes());
        options.kernel_len = U64::new(kernel_len);
        options.kernel_load_addr = U64::new(kernel_load_addr);
        options.kernel_entry_addr = U64::new(kernel_entry_addr);
        Ok(options)
    }

    /// Command line bytes up to the first NUL, or the whole buffer if full
    pub fn cmd_line_bytes(&self) -> &[u8] {
        let end = self
            .cmd_line
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(KERNEL_CMD_LINE_SIZE);
        &self.cmd_line[..end]
    }

    /// Returns `Range` of the `kernel_len` field within the options
    pub fn kernel_len_range() -> Range<usize> {
        span_of!(KernelOptions, kernel_len)
    }

    /// Returns `Range` of the command line within the options
    pub fn cmd_line_range() -> Range<usize> {
        span_of!(KernelOptions, cmd_line)
    }
}

/// RSA private signing key (PKCS#1 DER), zeroized on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ImageRsaPrivKey(Vec<u8>);

impl ImageRsaPrivKey {
    pub fn from_der(der: Vec<u8>) -> Self {
        Self(der)
    }

    pub fn der(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ImageRsaPrivKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRsaPrivKey").finish_non_exhaustive()
    }
}

/// Byte ranges of every region of a serialized kernel image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelImageLayout {
    pub header: Range<usize>,

    pub kernel_sign_key: Range<usize>,

    pub header_len: Range<usize>,

    pub header_checksum: Range<usize>,

    pub kernel_key_signature: Range<usize>,

    pub options: Range<usize>,

    pub kernel_signature: Range<usize>,

    pub kernel_data: Range<usize>,
}

impl KernelImageLayout {
    /// Compute the layout of an image
    ///
    /// `kernel_len` comes from the options and must already be bounded by
    /// the caller.
    pub fn new(
        firmware_sign_algorithm: AlgorithmId,
        kernel_sign_algorithm: AlgorithmId,
        kernel_len: usize,
    ) -> Self {
        let kernel_sign_key = KERNEL_HEADER_PREFIX_SIZE
            ..KERNEL_HEADER_PREFIX_SIZE + kernel_sign_algorithm.processed_key_size();
        let header_len = kernel_sign_key.end..kernel_sign_key.end + HEADER_LEN_FIELD_SIZE;
        let header_checksum = header_len.end..header_len.end + HEADER_CHECKSUM_SIZE;
        let header = 0..header_checksum.end;
        let kernel_key_signature =
            header.end..header.end + firmware_sign_algorithm.signature_size();
        let options = kernel_key_signature.end..kernel_key_signature.end + KERNEL_OPTIONS_SIZE;
        let kernel_signature = options.end..options.end + kernel_sign_algorithm.signature_size();
        let kernel_data = kernel_signature.end..kernel_signature.end + kernel_len;

        Self {
            header,
            kernel_sign_key,
            header_len,
            header_checksum,
            kernel_key_signature,
            options,
            kernel_signature,
            kernel_data,
        }
    }

    /// Header bytes covered by the checksum
    pub fn checksummed(&self) -> Range<usize> {
        self.header.start..self.header_checksum.start
    }

    /// Bytes needed to verify the header in header-only mode
    pub fn preamble_size(&self) -> usize {
        self.options.end
    }

    /// Total serialized size
    pub fn image_size(&self) -> usize {
        self.kernel_data.end
    }
}

/// Signed kernel image
///
/// Owns every buffer of the image. Fields are read-only once the image is
/// assembled; re-signing produces a new image.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct KernelImage {
    /// Header
    #[getset(get = "pub")]
    header: KernelHeader,

    /// Firmware key signature over the header
    #[getset(get = "pub")]
    kernel_key_signature: Vec<u8>,

    /// Options
    #[getset(get = "pub")]
    options: KernelOptions,

    /// Kernel key signature over options and payload
    #[getset(get = "pub")]
    kernel_signature: Vec<u8>,

    /// Payload
    #[getset(get = "pub")]
    kernel_data: Vec<u8>,
}

impl KernelImage {
    /// Assemble an image, checking every size against the registry
    ///
    /// The header must carry a stored checksum.
    pub fn from_parts(
        header: KernelHeader,
        kernel_key_signature: Vec<u8>,
        options: KernelOptions,
        kernel_signature: Vec<u8>,
        kernel_data: Vec<u8>,
    ) -> VbootResult<Self> {
        let kernel_alg = header.kernel_sign_algorithm();
        let firmware_alg = header.firmware_sign_algorithm();

        if header.kernel_sign_key().len() != kernel_alg.processed_key_size() {
            return Err(VbootError::IMAGE_MODEL_KERNEL_KEY_SIZE_MISMATCH);
        }
        if header.header_len() as usize != KernelHeader::size_for(kernel_alg) {
            return Err(VbootError::IMAGE_MODEL_HEADER_LEN_MISMATCH);
        }
        if !header.has_header_checksum() {
            return Err(VbootError::IMAGE_MODEL_HEADER_CHECKSUM_UNSET);
        }
        if kernel_key_signature.len() != firmware_alg.signature_size() {
            return Err(VbootError::IMAGE_MODEL_KEY_SIGNATURE_SIZE_MISMATCH);
        }
        if kernel_signature.len() != kernel_alg.signature_size() {
            return Err(VbootError::IMAGE_MODEL_KERNEL_SIGNATURE_SIZE_MISMATCH);
        }
        if options.kernel_len.get() != kernel_data.len() as u64 {
            return Err(VbootError::IMAGE_MODEL_KERNEL_LEN_MISMATCH);
        }

        Ok(Self {
            header,
            kernel_key_signature,
            options,
            kernel_signature,
            kernel_data,
        })
    }

    /// Split the image back into its parts
    pub fn into_parts(self) -> (KernelHeader, Vec<u8>, KernelOptions, Vec<u8>, Vec<u8>) {
        (
            self.header,
            self.kernel_key_signature,
            self.options,
            self.kernel_signature,
            self.kernel_data,
        )
    }

    pub fn layout(&self) -> KernelImageLayout {
        KernelImageLayout::new(
            self.header.firmware_sign_algorithm(),
            self.header.kernel_sign_algorithm(),
            self.kernel_data.len(),
        )
    }

    /// Serialized size of the image
    pub fn size(&self) -> usize {
        self.layout().image_size()
    }
}
