// Licensed under the Apache-2.0 license


use vboot_image_crypto::generate_rsa_key;
use vboot_image_gen::{ImageGeneratorConfig, KernelExecutable};
use vboot_image_types::*;

pub use fake_crypto::{fake_key_pair, FakeCrypto};

pub const DEFAULT_KERNEL_KEY_VERSION: u32 = 1;
pub const DEFAULT_CMD_LINE: &str = "console=ttyS0 root=/dev/sda3 ro";

/// Signing keys for one firmware/kernel algorithm pair
pub struct TestKeys {
    pub firmware_sign_algorithm: AlgorithmId,
    pub kernel_sign_algorithm: AlgorithmId,
    pub firmware_priv_key: ImageRsaPrivKey,
    pub firmware_pub_key: Vec<u8>,
    pub kernel_priv_key: ImageRsaPrivKey,
    pub kernel_pub_key: Vec<u8>,
}

impl TestKeys {
    /// Keys for `FakeCrypto`
    pub fn fake(firmware_sign_algorithm: AlgorithmId, kernel_sign_algorithm: AlgorithmId) -> Self {
        let (firmware_priv_key, firmware_pub_key) = fake_key_pair(firmware_sign_algorithm, 1);
        let (kernel_priv_key, kernel_pub_key) = fake_key_pair(kernel_sign_algorithm, 2);
        Self {
            firmware_sign_algorithm,
            kernel_sign_algorithm,
            firmware_priv_key,
            firmware_pub_key,
            kernel_priv_key,
            kernel_pub_key,
        }
    }

    /// Freshly generated RSA keys for `OsslCrypto`
    pub fn openssl(
        firmware_sign_algorithm: AlgorithmId,
        kernel_sign_algorithm: AlgorithmId,
    ) -> anyhow::Result<Self> {
        let (firmware_priv_key, firmware_pub_key) = generate_rsa_key(firmware_sign_algorithm)?;
        let (kernel_priv_key, kernel_pub_key) = generate_rsa_key(kernel_sign_algorithm)?;
        Ok(Self {
            firmware_sign_algorithm,
            kernel_sign_algorithm,
            firmware_priv_key,
            firmware_pub_key,
            kernel_priv_key,
            kernel_pub_key,
        })
    }

    /// Generator configuration signing `content` with these keys
    pub fn config(&self, content: Vec<u8>) -> ImageGeneratorConfig<KernelExecutable> {
        ImageGeneratorConfig {
            firmware_sign_algorithm: self.firmware_sign_algorithm,
            kernel_sign_algorithm: self.kernel_sign_algorithm,
            kernel_key_version: DEFAULT_KERNEL_KEY_VERSION,
            kernel_pub_key: self.kernel_pub_key.clone(),
            firmware_priv_key: self.firmware_priv_key.clone(),
            kernel_priv_key: self.kernel_priv_key.clone(),
            cmd_line: DEFAULT_CMD_LINE.into(),
            kernel: KernelExecutable::new(content),
        }
    }
}
