/*++

Licensed under the Apache-2.0 license.

File Name:

   generator.rs

Abstract:

    Kernel image generator

--*/
use anyhow::Context;
use vboot_error::VbootError;
use vboot_image_types::*;
use zerocopy::IntoBytes;

use crate::*;

/// Image generator
pub struct ImageGenerator<Crypto: ImageGeneratorCrypto> {
    crypto: Crypto,
}

impl<Crypto: ImageGeneratorCrypto> ImageGenerator<Crypto> {
    /// Create an instance `ImageGenerator`
    pub fn new(crypto: Crypto) -> Self {
        Self { crypto }
    }

    /// Generate image
    ///
    /// # Arguments
    ///
    /// * `config` - Image generator configuration
    ///
    /// # Returns
    ///
    /// * `KernelImage` - Signed kernel image
    pub fn generate<E>(&self, config: &ImageGeneratorConfig<E>) -> anyhow::Result<KernelImage>
    where
        E: ImageGeneratorExecutable,
    {
        log::debug!(
            "Generating kernel image: firmware algorithm {}, kernel algorithm {}, {} byte payload",
            config.firmware_sign_algorithm,
            config.kernel_sign_algorithm,
            config.kernel.size()
        );

        // Create Header
        let header = self.gen_header(
            config.firmware_sign_algorithm,
            config.kernel_sign_algorithm,
            config.kernel_key_version,
            &config.kernel_pub_key,
        )?;

        // Create Options
        let options = Self::gen_options(&config.kernel, &config.cmd_line)?;

        // Sign the header with the firmware key, then options and payload
        // with the kernel key
        let kernel_key_signature =
            self.kernel_key_signature(&header, &config.firmware_priv_key)?;
        let kernel_signature = self.kernel_signature(
            config.kernel_sign_algorithm,
            &options,
            config.kernel.content(),
            &config.kernel_priv_key,
        )?;

        let image = KernelImage::from_parts(
            header,
            kernel_key_signature,
            options,
            kernel_signature,
            config.kernel.content().to_vec(),
        )?;

        Ok(image)
    }

    /// Replace the payload of an image and sign it with a kernel key
    ///
    /// The header and the kernel key signature are kept as is, so the firmware
    /// key is not needed.
    pub fn resign_kernel<E>(
        &self,
        image: KernelImage,
        kernel: &E,
        cmd_line: &str,
        kernel_priv_key: &ImageRsaPrivKey,
    ) -> anyhow::Result<KernelImage>
    where
        E: ImageGeneratorExecutable,
    {
        let (header, kernel_key_signature, _, _, _) = image.into_parts();
        let kernel_sign_algorithm = header.kernel_sign_algorithm();

        let options = Self::gen_options(kernel, cmd_line)?;
        let kernel_signature = self.kernel_signature(
            kernel_sign_algorithm,
            &options,
            kernel.content(),
            kernel_priv_key,
        )?;

        let image = KernelImage::from_parts(
            header,
            kernel_key_signature,
            options,
            kernel_signature,
            kernel.content().to_vec(),
        )?;

        Ok(image)
    }

    /// Generate header, checksum included
    pub fn gen_header(
        &self,
        firmware_sign_algorithm: AlgorithmId,
        kernel_sign_algorithm: AlgorithmId,
        kernel_key_version: u32,
        kernel_pub_key: &[u8],
    ) -> anyhow::Result<KernelHeader> {
        if kernel_pub_key.len() != kernel_sign_algorithm.processed_key_size() {
            return Err(VbootError::IMAGE_GEN_KERNEL_KEY_SIZE_MISMATCH).with_context(|| {
                format!(
                    "Kernel public key is {} bytes, {} expects {}",
                    kernel_pub_key.len(),
                    kernel_sign_algorithm,
                    kernel_sign_algorithm.processed_key_size()
                )
            });
        }

        let mut header = KernelHeader::new(
            KERNEL_HEADER_VERSION,
            firmware_sign_algorithm,
            kernel_sign_algorithm,
            kernel_key_version,
            kernel_pub_key.to_vec(),
        )?;

        // header_len is final at this point
        let checksum = self.header_checksum(&header)?;
        header.set_header_checksum(checksum);

        Ok(header)
    }

    /// Calculate header checksum over every header byte preceding the checksum
    pub fn header_checksum(&self, header: &KernelHeader) -> anyhow::Result<HeaderChecksum> {
        let digest = self
            .crypto
            .digest(HEADER_CHECKSUM_HASH, &[&header.checksummed_bytes()])
            .context(VbootError::IMAGE_GEN_HEADER_CHECKSUM_FAILURE)?;

        HeaderChecksum::try_from(digest.as_slice())
            .map_err(|_| VbootError::IMAGE_GEN_HEADER_CHECKSUM_FAILURE)
            .with_context(|| format!("Header checksum is {} bytes", digest.len()))
    }

    /// Generate options for an executable
    pub fn gen_options<E>(kernel: &E, cmd_line: &str) -> anyhow::Result<KernelOptions>
    where
        E: ImageGeneratorExecutable,
    {
        let version = kernel.version();
        let options = KernelOptions::new(
            version,
            cmd_line,
            kernel.size(),
            kernel.load_addr(),
            kernel.entry_point(),
        )
        .with_context(|| format!("Invalid command line of {} bytes", cmd_line.len()))?;

        Ok(options)
    }

    /// Sign the header with the firmware private key
    pub fn kernel_key_signature(
        &self,
        header: &KernelHeader,
        firmware_priv_key: &ImageRsaPrivKey,
    ) -> anyhow::Result<Vec<u8>> {
        let algorithm = header.firmware_sign_algorithm();
        self.sign(
            algorithm,
            &[&header.to_bytes()],
            firmware_priv_key,
            VbootError::IMAGE_GEN_KERNEL_KEY_SIGNATURE_FAILURE,
        )
    }

    /// Sign options and payload with the kernel private key
    pub fn kernel_signature(
        &self,
        kernel_sign_algorithm: AlgorithmId,
        options: &KernelOptions,
        kernel_data: &[u8],
        kernel_priv_key: &ImageRsaPrivKey,
    ) -> anyhow::Result<Vec<u8>> {
        self.sign(
            kernel_sign_algorithm,
            &[options.as_bytes(), kernel_data],
            kernel_priv_key,
            VbootError::IMAGE_GEN_KERNEL_SIGNATURE_FAILURE,
        )
    }

    fn sign(
        &self,
        algorithm: AlgorithmId,
        data: &[&[u8]],
        priv_key: &ImageRsaPrivKey,
        err: VbootError,
    ) -> anyhow::Result<Vec<u8>> {
        let sig = self
            .crypto
            .digest(algorithm.hash(), data)
            .and_then(|digest| self.crypto.rsa_sign(algorithm, &digest, priv_key))
            .map_err(|e| {
                log::warn!("{algorithm} signing failed: {e:#}");
                e
            })
            .context(err)?;

        if sig.len() != algorithm.signature_size() {
            return Err(err).with_context(|| {
                format!(
                    "{algorithm} signature is {} bytes, expected {}",
                    sig.len(),
                    algorithm.signature_size()
                )
            });
        }

        Ok(sig)
    }
}
