/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Kernel image serialization & deserialization routines.

--*/
use core::ops::Range;
use std::io::Write;

use vboot_error::{VbootError, VbootResult};
use vboot_image_types::*;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, IntoBytes};

/// Kernel Image Writer
pub struct KernelImageWriter<W: Write> {
    writer: W,
}

impl<W: Write> KernelImageWriter<W> {
    /// Create an instance of `KernelImageWriter`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write Kernel Image
    pub fn write(&mut self, image: &KernelImage) -> anyhow::Result<()> {
        self.writer.write_all(&image.header().to_bytes())?;
        self.writer.write_all(image.kernel_key_signature())?;
        self.writer.write_all(image.options().as_bytes())?;
        self.writer.write_all(image.kernel_signature())?;
        self.writer.write_all(image.kernel_data())?;
        Ok(())
    }
}

/// Flatten an image into its on-wire form
pub fn to_bytes(image: &KernelImage) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(image.size());
    bytes.extend_from_slice(&image.header().to_bytes());
    bytes.extend_from_slice(image.kernel_key_signature());
    bytes.extend_from_slice(image.options().as_bytes());
    bytes.extend_from_slice(image.kernel_signature());
    bytes.extend_from_slice(image.kernel_data());
    bytes
}

/// Header, kernel key signature and options of a serialized image
#[derive(Debug)]
pub struct KernelImagePreamble<'a> {
    pub header: KernelHeader,

    pub kernel_key_signature: &'a [u8],

    pub options: KernelOptions,

    /// Layout of the whole image as declared by the preamble
    pub layout: KernelImageLayout,
}

fn region<'a>(blob: &'a [u8], range: &Range<usize>, err: VbootError) -> VbootResult<&'a [u8]> {
    blob.get(range.clone()).ok_or(err)
}

/// Parse the kernel header at the start of `blob`
///
/// Magic, algorithm ids and the declared header length are validated before
/// any algorithm-dependent slicing.
pub fn parse_header(blob: &[u8]) -> VbootResult<KernelHeader> {
    let (prefix, _) = KernelHeaderPrefix::read_from_prefix(blob)
        .map_err(|_| VbootError::IMAGE_PARSE_TRUNCATED_HEADER)?;

    if prefix.magic != KERNEL_MAGIC {
        return Err(VbootError::IMAGE_PARSE_MAGIC_MISMATCH);
    }

    let firmware_sign_algorithm = AlgorithmId::try_from(prefix.firmware_sign_algorithm.get())
        .map_err(|_| VbootError::IMAGE_PARSE_UNKNOWN_ALGORITHM)?;
    let kernel_sign_algorithm = AlgorithmId::try_from(prefix.kernel_sign_algorithm.get())
        .map_err(|_| VbootError::IMAGE_PARSE_UNKNOWN_ALGORITHM)?;

    let layout = KernelImageLayout::new(firmware_sign_algorithm, kernel_sign_algorithm, 0);
    let header_bytes = region(blob, &layout.header, VbootError::IMAGE_PARSE_TRUNCATED_HEADER)?;

    let header_len = region(
        header_bytes,
        &layout.header_len,
        VbootError::IMAGE_PARSE_TRUNCATED_HEADER,
    )?;
    let header_len = U32::read_from_bytes(header_len)
        .map_err(|_| VbootError::IMAGE_PARSE_TRUNCATED_HEADER)?
        .get();
    if header_len as usize != layout.header.len() {
        return Err(VbootError::IMAGE_PARSE_HEADER_LEN_MISMATCH);
    }

    let kernel_sign_key = region(
        header_bytes,
        &layout.kernel_sign_key,
        VbootError::IMAGE_PARSE_TRUNCATED_HEADER,
    )?;
    let checksum = region(
        header_bytes,
        &layout.header_checksum,
        VbootError::IMAGE_PARSE_TRUNCATED_HEADER,
    )?;
    let checksum = HeaderChecksum::try_from(checksum)
        .map_err(|_| VbootError::IMAGE_PARSE_TRUNCATED_HEADER)?;

    let mut header = KernelHeader::new(
        prefix.header_version.get(),
        firmware_sign_algorithm,
        kernel_sign_algorithm,
        prefix.kernel_key_version.get(),
        kernel_sign_key.to_vec(),
    )
    .map_err(|_| VbootError::IMAGE_PARSE_HEADER_LEN_MISMATCH)?;
    header.set_header_checksum(checksum);

    Ok(header)
}

/// Parse header, kernel key signature and options
///
/// The payload and kernel signature are not required to be present, which
/// lets a caller learn the full image size from a prefix of the blob.
pub fn parse_preamble(blob: &[u8]) -> VbootResult<KernelImagePreamble<'_>> {
    let header = parse_header(blob)?;
    let firmware_sign_algorithm = header.firmware_sign_algorithm();
    let kernel_sign_algorithm = header.kernel_sign_algorithm();

    let layout = KernelImageLayout::new(firmware_sign_algorithm, kernel_sign_algorithm, 0);
    let kernel_key_signature = region(
        blob,
        &layout.kernel_key_signature,
        VbootError::IMAGE_PARSE_TRUNCATED,
    )?;
    let options = region(blob, &layout.options, VbootError::IMAGE_PARSE_TRUNCATED)?;
    let options =
        KernelOptions::read_from_bytes(options).map_err(|_| VbootError::IMAGE_PARSE_TRUNCATED)?;

    // The payload extent must be representable before any layout math uses it
    let kernel_len = usize::try_from(options.kernel_len.get())
        .ok()
        .filter(|len| layout.kernel_data.start.checked_add(*len).is_some())
        .ok_or(VbootError::IMAGE_PARSE_KERNEL_LEN_MISMATCH)?;

    Ok(KernelImagePreamble {
        header,
        kernel_key_signature,
        options,
        layout: KernelImageLayout::new(firmware_sign_algorithm, kernel_sign_algorithm, kernel_len),
    })
}

/// Reconstruct an image from its on-wire form
///
/// The declared kernel length must account for exactly the bytes that
/// follow the kernel signature.
pub fn from_bytes(blob: &[u8]) -> VbootResult<KernelImage> {
    let preamble = parse_preamble(blob)?;
    let layout = &preamble.layout;

    let kernel_signature = region(
        blob,
        &layout.kernel_signature,
        VbootError::IMAGE_PARSE_TRUNCATED,
    )?;
    if blob.len() != layout.image_size() {
        return Err(VbootError::IMAGE_PARSE_KERNEL_LEN_MISMATCH);
    }
    let kernel_data = region(
        blob,
        &layout.kernel_data,
        VbootError::IMAGE_PARSE_KERNEL_LEN_MISMATCH,
    )?;

    KernelImage::from_parts(
        preamble.header,
        preamble.kernel_key_signature.to_vec(),
        preamble.options,
        kernel_signature.to_vec(),
        kernel_data.to_vec(),
    )
}
