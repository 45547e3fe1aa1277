/*++

Licensed under the Apache-2.0 license.

File Name:

   verify.rs

Abstract:

    File contains implementation of the kernel image verification command.

--*/

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::ArgMatches;
use vboot_image_crypto::OsslCrypto;
use vboot_image_verify::{ImageVerifier, VerifyMode};

use crate::algorithm_arg;

/// Run the command
pub(crate) fn run_cmd(args: &ArgMatches) -> anyhow::Result<()> {
    let fw_key_path: &PathBuf = args
        .get_one::<PathBuf>("fw-key")
        .with_context(|| "fw-key arg not specified")?;

    let image_path: &PathBuf = args
        .get_one::<PathBuf>("image")
        .with_context(|| "image arg not specified")?;

    let mode = if args.get_flag("header-only") {
        VerifyMode::HeaderOnly
    } else {
        VerifyMode::Full
    };

    let fw_key = std::fs::read(fw_key_path)
        .with_context(|| format!("Failed to read {}", fw_key_path.display()))?;
    let blob = std::fs::read(image_path)
        .with_context(|| format!("Failed to read {}", image_path.display()))?;

    let mut verifier = ImageVerifier::new(OsslCrypto::default());
    if args.contains_id("fw-algo") {
        verifier = verifier.with_firmware_algorithm(algorithm_arg(args, "fw-algo")?);
    }

    match verifier.verify_kernel(&fw_key, &blob, mode) {
        Ok(info) => {
            println!("VERIFY_KERNEL_SUCCESS");
            println!(
                "algorithms: {} / {}",
                info.firmware_sign_algorithm, info.kernel_sign_algorithm
            );
            println!("kernel key version: {}", info.kernel_key_version);
            println!(
                "kernel version: {}.{}",
                info.kernel_version[0], info.kernel_version[1]
            );
            println!("kernel length: {}", info.kernel_len);
            println!("load address: {:#x}", info.load_addr);
            println!("entry point: {:#x}", info.entry_point);
            println!("image size: {}", info.image_size);
            if !info.payload_verified {
                println!("payload not verified");
            }
            Ok(())
        }
        Err(outcome) => {
            println!("{outcome}");
            bail!("{} failed verification: {outcome}", image_path.display())
        }
    }
}
