/*++

Licensed under the Apache-2.0 license.

File Name:

   mod.rs

Abstract:

    File contains implementation of the kernel image creation command.

--*/

mod config;

use anyhow::Context;
use clap::ArgMatches;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use vboot_image_crypto::OsslCrypto as Crypto;
use vboot_image_gen::*;
use vboot_image_serde::KernelImageWriter;
use vboot_image_types::ImageRsaPrivKey;

use crate::algorithm_arg;
use config::KeyConfig;

/// Run the command
pub(crate) fn run_cmd(args: &ArgMatches) -> anyhow::Result<()> {
    let config_path: &PathBuf = args
        .get_one::<PathBuf>("key-config")
        .with_context(|| "key-config arg not specified")?;

    let firmware_sign_algorithm = algorithm_arg(args, "fw-algo")?;
    let kernel_sign_algorithm = algorithm_arg(args, "kernel-algo")?;

    let kernel_key_version: &u32 = args
        .get_one::<u32>("kernel-key-version")
        .with_context(|| "kernel-key-version arg not specified")?;

    let kernel_path: &PathBuf = args
        .get_one::<PathBuf>("kernel")
        .with_context(|| "kernel arg not specified")?;

    let cmd_line: &String = args
        .get_one::<String>("cmd-line")
        .with_context(|| "cmd-line arg not specified")?;

    let load_addr: &u64 = args
        .get_one::<u64>("load-addr")
        .with_context(|| "load-addr arg not specified")?;

    let entry_addr: &u64 = args
        .get_one::<u64>("entry-addr")
        .with_context(|| "entry-addr arg not specified")?;

    let version_major: &u32 = args
        .get_one::<u32>("version-major")
        .with_context(|| "version-major arg not specified")?;

    let version_minor: &u32 = args
        .get_one::<u32>("version-minor")
        .with_context(|| "version-minor arg not specified")?;

    let out_path: &PathBuf = args
        .get_one::<PathBuf>("out")
        .with_context(|| "out arg not specified")?;

    let config = config::load_key_config(config_path)?;
    let config_dir = config_path
        .parent()
        .with_context(|| "Invalid parent path")?;

    let content = std::fs::read(kernel_path)
        .with_context(|| format!("Failed to read kernel {}", kernel_path.display()))?;
    let kernel = KernelExecutable {
        version: [*version_major, *version_minor],
        load_addr: *load_addr,
        entry_point: *entry_addr,
        content,
    };

    let (firmware_priv_key, kernel_priv_key, kernel_pub_key) = keys(config_dir, &config)?;

    let gen_config = ImageGeneratorConfig::<KernelExecutable> {
        firmware_sign_algorithm,
        kernel_sign_algorithm,
        kernel_key_version: *kernel_key_version,
        kernel_pub_key,
        firmware_priv_key,
        kernel_priv_key,
        cmd_line: cmd_line.clone(),
        kernel,
    };

    let generator = ImageGenerator::new(Crypto::default());
    let image = generator.generate(&gen_config)?;

    let out_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(out_path)
        .with_context(|| format!("Failed to create file {}", out_path.display()))?;

    let mut writer = KernelImageWriter::new(out_file);
    writer.write(&image)?;

    log::info!(
        "Wrote {} byte kernel image to {}",
        image.size(),
        out_path.display()
    );
    Ok(())
}

/// Load the firmware private key and the kernel key pair
fn keys(
    config_dir: &Path,
    config: &KeyConfig,
) -> anyhow::Result<(ImageRsaPrivKey, ImageRsaPrivKey, Vec<u8>)> {
    let firmware_priv_key =
        Crypto::rsa_priv_key_from_pem(&config_dir.join(&config.firmware_priv_key))?;

    let kernel_priv_path = config_dir.join(&config.kernel_priv_key);
    let kernel_priv_key = Crypto::rsa_priv_key_from_pem(&kernel_priv_path)?;

    let kernel_pub_key = match &config.kernel_pub_key {
        Some(path) => {
            let path = config_dir.join(path);
            std::fs::read(&path)
                .with_context(|| format!("Failed to read kernel public key {}", path.display()))?
        }
        None => Crypto::rsa_processed_pub_key_from_pem(&kernel_priv_path)?,
    };

    Ok((firmware_priv_key, kernel_priv_key, kernel_pub_key))
}
