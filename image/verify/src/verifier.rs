/*++

Licensed under the Apache-2.0 license.

File Name:

    verifier.rs

Abstract:

    This file is the main implementation of the kernel image verifier.

--*/

use crate::*;
use vboot_error::VbootError;
use vboot_image_serde::{from_bytes, parse_preamble};
use zerocopy::IntoBytes;

/// Image Verifier
pub struct ImageVerifier<Env: ImageVerificationEnv> {
    /// Verification Environment
    env: Env,

    /// Firmware algorithm the caller expects, if it knows one
    firmware_sign_algorithm: Option<AlgorithmId>,
}

impl<Env: ImageVerificationEnv> ImageVerifier<Env> {
    /// Create a new instance `ImageVerifier`
    ///
    /// # Arguments
    ///
    /// * `env` - Environment
    pub fn new(env: Env) -> Self {
        Self {
            env,
            firmware_sign_algorithm: None,
        }
    }

    /// Only accept images whose header claims `algorithm` for the firmware key
    pub fn with_firmware_algorithm(mut self, algorithm: AlgorithmId) -> Self {
        self.firmware_sign_algorithm = Some(algorithm);
        self
    }

    /// Verify a serialized kernel image end to end
    ///
    /// # Arguments
    ///
    /// * `firmware_pub_key` - Processed firmware public key
    /// * `blob` - Serialized kernel image
    ///
    /// # Returns
    ///
    /// * `VerifyOutcome` - Outcome of the first failing stage, or `Success`
    pub fn verify(&mut self, firmware_pub_key: &[u8], blob: &[u8]) -> VerifyOutcome {
        match self.verify_kernel(firmware_pub_key, blob, VerifyMode::Full) {
            Ok(_) => VerifyOutcome::Success,
            Err(outcome) => outcome,
        }
    }

    /// Verify the header and the kernel key signature only
    ///
    /// `blob` needs to hold header, kernel key signature and options. The
    /// returned info carries the full image size so the caller knows how
    /// much more to read.
    pub fn verify_header_only(
        &mut self,
        firmware_pub_key: &[u8],
        blob: &[u8],
    ) -> Result<KernelVerificationInfo, VerifyOutcome> {
        self.verify_kernel(firmware_pub_key, blob, VerifyMode::HeaderOnly)
    }

    /// Verify a serialized kernel image
    ///
    /// # Arguments
    ///
    /// * `firmware_pub_key` - Processed firmware public key
    /// * `blob` - Serialized kernel image
    /// * `mode` - Stages to run
    ///
    /// # Returns
    ///
    /// * `KernelVerificationInfo` - Information about the verified kernel
    pub fn verify_kernel(
        &mut self,
        firmware_pub_key: &[u8],
        blob: &[u8],
        mode: VerifyMode,
    ) -> Result<KernelVerificationInfo, VerifyOutcome> {
        match mode {
            VerifyMode::Full => {
                let image = from_bytes(blob)
                    .map_err(|err| Self::reject(VerifyOutcome::ParseFailed, err))?;

                self.verify_header(firmware_pub_key, image.header(), image.kernel_key_signature())?;
                self.verify_kernel_signature(
                    image.header(),
                    image.options(),
                    image.kernel_signature(),
                    image.kernel_data(),
                )?;

                log::debug!("Kernel image verified: {} bytes", image.size());
                Ok(KernelVerificationInfo::new(
                    image.header(),
                    image.options(),
                    image.size(),
                    true,
                ))
            }
            VerifyMode::HeaderOnly => {
                let preamble = parse_preamble(blob)
                    .map_err(|err| Self::reject(VerifyOutcome::ParseFailed, err))?;

                self.verify_header(
                    firmware_pub_key,
                    &preamble.header,
                    preamble.kernel_key_signature,
                )?;

                log::debug!(
                    "Kernel header verified: image is {} bytes",
                    preamble.layout.image_size()
                );
                Ok(KernelVerificationInfo::new(
                    &preamble.header,
                    &preamble.options,
                    preamble.layout.image_size(),
                    false,
                ))
            }
        }
    }

    /// Verify the header checksum, then the firmware signature over the header
    fn verify_header(
        &mut self,
        firmware_pub_key: &[u8],
        header: &KernelHeader,
        kernel_key_signature: &[u8],
    ) -> Result<(), VerifyOutcome> {
        // Checksum
        let checksum = self
            .env
            .digest(HEADER_CHECKSUM_HASH, &[&header.checksummed_bytes()])
            .map_err(|err| Self::reject(VerifyOutcome::ChecksumFailed, err))?;
        if checksum.as_slice() != header.header_checksum() {
            log::warn!("Kernel header checksum mismatch");
            return Err(VerifyOutcome::ChecksumFailed);
        }

        // Kernel key signature
        let algorithm = header.firmware_sign_algorithm();
        self.check_firmware_key(algorithm, firmware_pub_key)?;

        let digest = self
            .env
            .digest(algorithm.hash(), &[&header.to_bytes()])
            .map_err(|err| Self::reject(VerifyOutcome::KeySignatureFailed, err))?;
        match self
            .env
            .rsa_verify(algorithm, &digest, firmware_pub_key, kernel_key_signature)
        {
            Ok(true) => Ok(()),
            Ok(false) => {
                log::warn!("Kernel key signature ({algorithm}) rejected");
                Err(VerifyOutcome::KeySignatureFailed)
            }
            Err(err) => Err(Self::reject(VerifyOutcome::KeySignatureFailed, err)),
        }
    }

    /// The header names the firmware algorithm, so bound that claim by the
    /// key actually supplied.
    fn check_firmware_key(
        &self,
        algorithm: AlgorithmId,
        firmware_pub_key: &[u8],
    ) -> Result<(), VerifyOutcome> {
        if let Some(expected) = self.firmware_sign_algorithm {
            if expected != algorithm {
                log::warn!("Header claims firmware algorithm {algorithm}, expected {expected}");
                return Err(VerifyOutcome::KeySignatureFailed);
            }
        }

        if firmware_pub_key.len() != algorithm.processed_key_size()
            || processed_key_modulus_bits(firmware_pub_key) != Some(algorithm.key_bits())
        {
            log::warn!(
                "Firmware key of {} bytes does not match {algorithm}",
                firmware_pub_key.len()
            );
            return Err(VerifyOutcome::KeySignatureFailed);
        }

        Ok(())
    }

    /// Verify the kernel signature over options and payload
    fn verify_kernel_signature(
        &mut self,
        header: &KernelHeader,
        options: &KernelOptions,
        kernel_signature: &[u8],
        kernel_data: &[u8],
    ) -> Result<(), VerifyOutcome> {
        let algorithm = header.kernel_sign_algorithm();

        let digest = self
            .env
            .digest(algorithm.hash(), &[options.as_bytes(), kernel_data])
            .map_err(|err| Self::reject(VerifyOutcome::DataSignatureFailed, err))?;
        match self.env.rsa_verify(
            algorithm,
            &digest,
            header.kernel_sign_key(),
            kernel_signature,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => {
                log::warn!("Kernel signature ({algorithm}) rejected");
                Err(VerifyOutcome::DataSignatureFailed)
            }
            Err(err) => Err(Self::reject(VerifyOutcome::DataSignatureFailed, err)),
        }
    }

    fn reject(outcome: VerifyOutcome, err: VbootError) -> VerifyOutcome {
        log::warn!("{outcome}: {err}");
        outcome
    }
}
