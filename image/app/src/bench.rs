/*++

Licensed under the Apache-2.0 license.

File Name:

   bench.rs

Abstract:

    File contains the kernel image verification benchmark.

--*/

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::ArgMatches;
use vboot_image_crypto::{generate_rsa_key, rsa_key_pair_from_pem, OsslCrypto};
use vboot_image_gen::*;
use vboot_image_serde::to_bytes;
use vboot_image_types::*;
use vboot_image_verify::ImageVerifier;

/// Payload sizes and their labels
const PAYLOAD_SIZES: [(usize, &str); 3] = [
    (512000, "small"),
    (1024000, "medium"),
    (4096000, "large"),
];

const BENCH_KERNEL_KEY_VERSION: u32 = 1;

type KeyPair = (ImageRsaPrivKey, Vec<u8>);

/// Whether a firmware/kernel algorithm pair is worth measuring
///
/// Only pairs where the kernel algorithm is no stronger than the firmware
/// algorithm are measured.
pub(crate) fn should_benchmark(firmware: AlgorithmId, kernel: AlgorithmId) -> bool {
    let firmware_sig = firmware.signature_size();
    let kernel_sig = kernel.signature_size();

    if kernel_sig > firmware_sig {
        return false;
    }
    !(kernel_sig == firmware_sig && kernel.hash_bits() > firmware.hash_bits())
}

/// Machine readable name of a measurement
pub(crate) fn metric_name(label: &str, firmware: AlgorithmId, kernel: AlgorithmId) -> String {
    format!(
        "ms_firmware_{label}_rsa{}_{}_rsa{}_{}",
        firmware.key_bits(),
        firmware.hash().name(),
        kernel.key_bits(),
        kernel.hash().name()
    )
}

/// Load `key_rsa<bits>.pem` from `key_dir`, or generate a key
fn load_key(key_dir: Option<&Path>, algorithm: AlgorithmId) -> anyhow::Result<KeyPair> {
    match key_dir {
        Some(dir) => {
            let path = dir.join(format!("key_rsa{}.pem", algorithm.key_bits()));
            rsa_key_pair_from_pem(&path)
        }
        None => {
            log::info!("Generating {}-bit RSA key", algorithm.key_bits());
            generate_rsa_key(algorithm)
        }
    }
}

fn payload(size: usize, random: bool) -> anyhow::Result<Vec<u8>> {
    let mut payload = vec![b'K'; size];
    if random {
        openssl::rand::rand_bytes(&mut payload).context("Failed to generate payload")?;
    }
    Ok(payload)
}

/// Run the command
pub(crate) fn run_cmd(args: &ArgMatches) -> anyhow::Result<()> {
    let key_dir: Option<&PathBuf> = args.get_one::<PathBuf>("key-dir");

    let iterations: &u32 = args
        .get_one::<u32>("iterations")
        .with_context(|| "iterations arg not specified")?;

    let random_payload = args.get_flag("random-payload");

    // One key per modulus size, shared by every hash variant
    let mut keys: BTreeMap<usize, KeyPair> = BTreeMap::new();
    for algorithm in AlgorithmId::all() {
        if !keys.contains_key(&algorithm.key_bits()) {
            let key = load_key(key_dir.map(PathBuf::as_path), algorithm)?;
            keys.insert(algorithm.key_bits(), key);
        }
    }

    let generator = ImageGenerator::new(OsslCrypto::default());
    let mut verifier = ImageVerifier::new(OsslCrypto::default());

    for firmware in AlgorithmId::all() {
        for kernel in AlgorithmId::all() {
            if !should_benchmark(firmware, kernel) {
                continue;
            }

            let (firmware_priv_key, firmware_pub_key) = &keys[&firmware.key_bits()];
            let (kernel_priv_key, kernel_pub_key) = &keys[&kernel.key_bits()];

            for (size, label) in PAYLOAD_SIZES {
                let config = ImageGeneratorConfig {
                    firmware_sign_algorithm: firmware,
                    kernel_sign_algorithm: kernel,
                    kernel_key_version: BENCH_KERNEL_KEY_VERSION,
                    kernel_pub_key: kernel_pub_key.clone(),
                    firmware_priv_key: firmware_priv_key.clone(),
                    kernel_priv_key: kernel_priv_key.clone(),
                    cmd_line: String::new(),
                    kernel: KernelExecutable::new(payload(size, random_payload)?),
                };
                let image = generator.generate(&config).with_context(|| {
                    format!("Couldn't create signed kernel image ({firmware} / {kernel})")
                })?;
                let blob = to_bytes(&image);

                let start = Instant::now();
                for _ in 0..*iterations {
                    let outcome = verifier.verify(firmware_pub_key, &blob);
                    if !outcome.is_success() {
                        log::warn!("Kernel verification failed ({firmware} / {kernel}): {outcome}");
                    }
                }
                let ms = start.elapsed().as_secs_f64() * 1000.0 / f64::from(*iterations);

                eprintln!("# Kernel ({label}, Algo = {firmware} / {kernel}):\t{ms:.2} ms/verification");
                println!("{}:{ms:.2}", metric_name(label, firmware, kernel));
            }
        }
    }

    Ok(())
}
