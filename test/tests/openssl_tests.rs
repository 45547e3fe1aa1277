// Licensed under the Apache-2.0 license

use openssl::rsa::Rsa;
use vboot_image_crypto::{processed_pub_key, rsa_key_pair_from_pem, OsslCrypto};
use vboot_image_gen::{ImageGenerator, ImageGeneratorCrypto};
use vboot_image_serde::to_bytes;
use vboot_image_types::*;
use vboot_image_verify::{ImageVerifier, VerifyOutcome};
use vboot_test::TestKeys;

fn build_and_verify(keys: &TestKeys, content: Vec<u8>) -> (Vec<u8>, VerifyOutcome) {
    let generator = ImageGenerator::new(OsslCrypto::default());
    let image = generator.generate(&keys.config(content)).unwrap();
    let blob = to_bytes(&image);

    let outcome = ImageVerifier::new(OsslCrypto::default()).verify(&keys.firmware_pub_key, &blob);
    (blob, outcome)
}

#[test]
fn test_rsa2048_firmware_rsa1024_kernel() {
    let keys = TestKeys::openssl(AlgorithmId::Rsa2048Sha256, AlgorithmId::Rsa1024Sha1).unwrap();
    let (blob, outcome) = build_and_verify(&keys, vec![b'K'; 512000]);

    let header_len = KernelHeader::size_for(AlgorithmId::Rsa1024Sha1);
    assert_eq!(header_len, 356);
    assert_eq!(blob.len(), header_len + 256 + KERNEL_OPTIONS_SIZE + 128 + 512000);
    assert_eq!(outcome, VerifyOutcome::Success);

    let mut corrupted = blob.clone();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x01;
    assert_eq!(
        ImageVerifier::new(OsslCrypto::default()).verify(&keys.firmware_pub_key, &corrupted),
        VerifyOutcome::DataSignatureFailed
    );
}

#[test]
fn test_rsa4096_firmware_rsa2048_kernel() {
    let keys =
        TestKeys::openssl(AlgorithmId::Rsa4096Sha512, AlgorithmId::Rsa2048Sha256).unwrap();
    let (_, outcome) = build_and_verify(&keys, vec![b'K'; 65536]);
    assert_eq!(outcome, VerifyOutcome::Success);
}

#[test]
fn test_rsa1024_firmware_rsa4096_kernel() {
    let keys = TestKeys::openssl(AlgorithmId::Rsa1024Sha256, AlgorithmId::Rsa4096Sha1).unwrap();
    let (_, outcome) = build_and_verify(&keys, vec![b'K'; 4096]);
    assert_eq!(outcome, VerifyOutcome::Success);
}

#[test]
fn test_wrong_firmware_key() {
    let keys = TestKeys::openssl(AlgorithmId::Rsa2048Sha256, AlgorithmId::Rsa1024Sha1).unwrap();
    let other = TestKeys::openssl(AlgorithmId::Rsa2048Sha256, AlgorithmId::Rsa1024Sha1).unwrap();

    let generator = ImageGenerator::new(OsslCrypto::default());
    let blob = to_bytes(&generator.generate(&keys.config(vec![b'K'; 1024])).unwrap());

    let outcome = ImageVerifier::new(OsslCrypto::default()).verify(&other.firmware_pub_key, &blob);
    assert_eq!(outcome, VerifyOutcome::KeySignatureFailed);
}

#[test]
fn test_keys_from_pem() {
    let rsa = Rsa::generate(1024).unwrap();
    let dir = std::env::temp_dir().join(format!("vboot-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let priv_path = dir.join("key_rsa1024.pem");
    std::fs::write(&priv_path, rsa.private_key_to_pem().unwrap()).unwrap();
    let pub_path = dir.join("key_rsa1024.pub.pem");
    std::fs::write(&pub_path, rsa.public_key_to_pem().unwrap()).unwrap();

    let expected = processed_pub_key(&rsa).unwrap();
    let (priv_key, pub_key) = rsa_key_pair_from_pem(&priv_path).unwrap();
    assert_eq!(pub_key, expected);
    assert_eq!(priv_key.der(), rsa.private_key_to_der().unwrap().as_slice());
    assert_eq!(
        OsslCrypto::rsa_processed_pub_key_from_pem(&pub_path).unwrap(),
        expected
    );
    assert_eq!(
        OsslCrypto::rsa_processed_pub_key_from_pem(&priv_path).unwrap(),
        expected
    );
    assert!(OsslCrypto::rsa_processed_pub_key_from_pem(&dir.join("missing.pem")).is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}
