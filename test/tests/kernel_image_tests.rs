// Licensed under the Apache-2.0 license

use vboot_error::VbootError;
use vboot_image_gen::{ImageGenerator, KernelExecutable};
use vboot_image_serde::{from_bytes, to_bytes};
use vboot_image_types::*;
use vboot_image_verify::{ImageVerifier, VerifyMode, VerifyOutcome};
use vboot_test::{FakeCrypto, TestKeys};

const FW_ALG: AlgorithmId = AlgorithmId::Rsa2048Sha256;
const KERNEL_ALG: AlgorithmId = AlgorithmId::Rsa1024Sha1;

fn build(keys: &TestKeys, content: Vec<u8>) -> Vec<u8> {
    let generator = ImageGenerator::new(FakeCrypto::default());
    let image = generator.generate(&keys.config(content)).unwrap();
    to_bytes(&image)
}

fn verify(firmware_pub_key: &[u8], blob: &[u8]) -> (VerifyOutcome, usize) {
    let mut crypto = FakeCrypto::default();
    let outcome = ImageVerifier::new(&mut crypto).verify(firmware_pub_key, blob);
    (outcome, crypto.verify_calls())
}

#[test]
fn test_round_trip() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let generator = ImageGenerator::new(FakeCrypto::default());
    let image = generator.generate(&keys.config(vec![b'K'; 4000])).unwrap();

    let blob = to_bytes(&image);
    assert_eq!(blob.len(), image.size());
    assert_eq!(from_bytes(&blob), Ok(image));
}

#[test]
fn test_every_algorithm_pair_verifies() {
    for firmware_alg in AlgorithmId::all() {
        for kernel_alg in AlgorithmId::all() {
            let keys = TestKeys::fake(firmware_alg, kernel_alg);
            let blob = build(&keys, vec![b'K'; 1024]);

            let (outcome, calls) = verify(&keys.firmware_pub_key, &blob);
            assert_eq!(
                outcome,
                VerifyOutcome::Success,
                "{firmware_alg} / {kernel_alg}"
            );
            assert_eq!(calls, 2);
        }
    }
}

#[test]
fn test_rsa8192_kernel_under_rsa1024_firmware() {
    let keys = TestKeys::fake(AlgorithmId::Rsa1024Sha1, AlgorithmId::Rsa8192Sha512);
    let blob = build(&keys, vec![b'K'; 512000]);

    let layout = KernelImageLayout::new(
        AlgorithmId::Rsa1024Sha1,
        AlgorithmId::Rsa8192Sha512,
        512000,
    );
    assert_eq!(layout.header.len(), 24 + 2056 + 4 + 64);
    assert_eq!(blob.len(), layout.image_size());
    assert_eq!(
        verify(&keys.firmware_pub_key, &blob).0,
        VerifyOutcome::Success
    );
}

#[test]
fn test_header_bit_flips() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let blob = build(&keys, vec![b'K'; 256]);
    let layout = KernelImageLayout::new(FW_ALG, KERNEL_ALG, 256);

    // header_version, kernel_key_version and the kernel key are only caught
    // by the checksum
    let checksum_only = [8..12, 20..24, layout.kernel_sign_key.clone()];

    for offset in layout.header.clone() {
        for bit in 0..8 {
            let mut corrupted = blob.clone();
            corrupted[offset] ^= 1 << bit;

            let (outcome, _) = verify(&keys.firmware_pub_key, &corrupted);
            assert_ne!(outcome, VerifyOutcome::Success, "byte {offset} bit {bit}");
            if checksum_only.iter().any(|range| range.contains(&offset)) {
                assert_eq!(
                    outcome,
                    VerifyOutcome::ChecksumFailed,
                    "byte {offset} bit {bit}"
                );
            }
        }
    }
}

#[test]
fn test_checksum_field_corruption() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let mut blob = build(&keys, vec![b'K'; 256]);
    let layout = KernelImageLayout::new(FW_ALG, KERNEL_ALG, 256);

    blob[layout.header_checksum.end - 1] ^= 0x80;
    assert_eq!(
        verify(&keys.firmware_pub_key, &blob),
        (VerifyOutcome::ChecksumFailed, 0)
    );
}

#[test]
fn test_kernel_key_signature_corruption() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let mut blob = build(&keys, vec![b'K'; 256]);
    let layout = KernelImageLayout::new(FW_ALG, KERNEL_ALG, 256);

    blob[layout.kernel_key_signature.start + 3] ^= 0x01;
    assert_eq!(
        verify(&keys.firmware_pub_key, &blob),
        (VerifyOutcome::KeySignatureFailed, 1)
    );
}

#[test]
fn test_payload_corruption() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let blob = build(&keys, vec![b'K'; 512000]);
    let layout = KernelImageLayout::new(FW_ALG, KERNEL_ALG, 512000);

    for offset in [
        layout.kernel_data.start,
        layout.kernel_data.start + 4096,
        layout.kernel_data.end - 1,
    ] {
        let mut corrupted = blob.clone();
        corrupted[offset] ^= 0x20;
        assert_eq!(
            verify(&keys.firmware_pub_key, &corrupted),
            (VerifyOutcome::DataSignatureFailed, 2)
        );
    }
}

#[test]
fn test_options_and_kernel_signature_corruption() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let blob = build(&keys, vec![b'K'; 1024]);
    let layout = KernelImageLayout::new(FW_ALG, KERNEL_ALG, 1024);

    // Load address
    let mut corrupted = blob.clone();
    corrupted[layout.options.end - 12] ^= 0x01;
    assert_eq!(
        verify(&keys.firmware_pub_key, &corrupted).0,
        VerifyOutcome::DataSignatureFailed
    );

    // First command line byte
    let mut corrupted = blob.clone();
    corrupted[layout.options.start + KernelOptions::cmd_line_range().start] ^= 0x01;
    assert_eq!(
        verify(&keys.firmware_pub_key, &corrupted).0,
        VerifyOutcome::DataSignatureFailed
    );

    let mut corrupted = blob.clone();
    corrupted[layout.kernel_signature.start] ^= 0x01;
    assert_eq!(
        verify(&keys.firmware_pub_key, &corrupted).0,
        VerifyOutcome::DataSignatureFailed
    );
}

#[test]
fn test_wrong_firmware_key() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let blob = build(&keys, vec![b'K'; 1024]);
    let (_, other_pub_key) = vboot_test::fake_key_pair(FW_ALG, 99);

    assert_eq!(
        verify(&other_pub_key, &blob),
        (VerifyOutcome::KeySignatureFailed, 1)
    );
}

#[test]
fn test_firmware_key_of_other_algorithm() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let blob = build(&keys, vec![b'K'; 1024]);
    let (_, rsa4096_key) = vboot_test::fake_key_pair(AlgorithmId::Rsa4096Sha256, 1);

    assert_eq!(
        verify(&rsa4096_key, &blob),
        (VerifyOutcome::KeySignatureFailed, 0)
    );
}

#[test]
fn test_kernel_len_mismatch() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let blob = build(&keys, vec![b'K'; 1024]);

    let mut longer = blob.clone();
    longer.push(b'K');
    assert_eq!(
        verify(&keys.firmware_pub_key, &longer),
        (VerifyOutcome::ParseFailed, 0)
    );

    let shorter = &blob[..blob.len() - 1];
    assert_eq!(
        verify(&keys.firmware_pub_key, shorter),
        (VerifyOutcome::ParseFailed, 0)
    );

    let layout = KernelImageLayout::new(FW_ALG, KERNEL_ALG, 1024);
    let kernel_len = layout.options.start + KernelOptions::kernel_len_range().start;
    let mut declared = blob.clone();
    declared[kernel_len] ^= 0x01;
    assert_eq!(
        verify(&keys.firmware_pub_key, &declared),
        (VerifyOutcome::ParseFailed, 0)
    );
}

#[test]
fn test_header_only() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let blob = build(&keys, vec![b'K'; 65536]);
    let layout = KernelImageLayout::new(FW_ALG, KERNEL_ALG, 65536);

    let mut crypto = FakeCrypto::default();
    let info = ImageVerifier::new(&mut crypto)
        .verify_kernel(
            &keys.firmware_pub_key,
            &blob[..layout.preamble_size()],
            VerifyMode::HeaderOnly,
        )
        .unwrap();
    assert_eq!(crypto.verify_calls(), 1);
    assert_eq!(info.image_size, blob.len());
    assert_eq!(info.kernel_len, 65536);
    assert_eq!(info.kernel_key_version, 1);
    assert!(!info.payload_verified);

    // The payload is not looked at
    let mut corrupted = blob.clone();
    corrupted[layout.kernel_data.start] ^= 0x01;
    let result = ImageVerifier::new(&mut crypto)
        .verify_header_only(&keys.firmware_pub_key, &corrupted);
    assert!(result.is_ok());
}

#[test]
fn test_resign_kernel() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let generator = ImageGenerator::new(FakeCrypto::default());
    let image = generator.generate(&keys.config(vec![b'K'; 1024])).unwrap();

    let kernel = KernelExecutable {
        load_addr: 0x0010_0000,
        entry_point: 0x0010_0200,
        ..KernelExecutable::new(vec![b'N'; 2048])
    };
    let resigned = generator
        .resign_kernel(image.clone(), &kernel, "quiet", &keys.kernel_priv_key)
        .unwrap();
    assert_eq!(resigned.header(), image.header());
    assert_eq!(
        verify(&keys.firmware_pub_key, &to_bytes(&resigned)).0,
        VerifyOutcome::Success
    );

    // Only the key in the header can sign the payload
    let (other_priv_key, _) = vboot_test::fake_key_pair(KERNEL_ALG, 42);
    let forged = generator
        .resign_kernel(image, &kernel, "quiet", &other_priv_key)
        .unwrap();
    assert_eq!(
        verify(&keys.firmware_pub_key, &to_bytes(&forged)).0,
        VerifyOutcome::DataSignatureFailed
    );
}

#[test]
fn test_cmd_line_filling_options_buffer() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let generator = ImageGenerator::new(FakeCrypto::default());
    let image = generator.generate(&keys.config(vec![b'K'; 512])).unwrap();

    // No NUL left anywhere in the command line
    let (header, kernel_key_signature, mut options, _, kernel_data) = image.into_parts();
    options.cmd_line = [b'a'; KERNEL_CMD_LINE_SIZE];
    let kernel_signature = generator
        .kernel_signature(KERNEL_ALG, &options, &kernel_data, &keys.kernel_priv_key)
        .unwrap();
    let image = KernelImage::from_parts(
        header,
        kernel_key_signature,
        options,
        kernel_signature,
        kernel_data,
    )
    .unwrap();

    let blob = to_bytes(&image);
    assert_eq!(from_bytes(&blob), Ok(image));
    assert_eq!(
        verify(&keys.firmware_pub_key, &blob),
        (VerifyOutcome::Success, 2)
    );
}

#[test]
fn test_header_without_checksum_is_not_assembled() {
    let keys = TestKeys::fake(FW_ALG, KERNEL_ALG);
    let generator = ImageGenerator::new(FakeCrypto::default());
    let image = generator.generate(&keys.config(vec![b'K'; 64])).unwrap();
    let (header, kernel_key_signature, options, kernel_signature, kernel_data) =
        image.into_parts();

    let unchecksummed = KernelHeader::new(
        header.header_version(),
        header.firmware_sign_algorithm(),
        header.kernel_sign_algorithm(),
        header.kernel_key_version(),
        header.kernel_sign_key().clone(),
    )
    .unwrap();
    assert_eq!(
        KernelImage::from_parts(
            unchecksummed,
            kernel_key_signature,
            options,
            kernel_signature,
            kernel_data,
        )
        .err(),
        Some(VbootError::IMAGE_MODEL_HEADER_CHECKSUM_UNSET)
    );
}
