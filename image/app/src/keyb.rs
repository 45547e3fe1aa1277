/*++

Licensed under the Apache-2.0 license.

File Name:

   keyb.rs

Abstract:

    File contains the processed public key conversion command.

--*/

use std::path::PathBuf;

use anyhow::Context;
use clap::ArgMatches;
use vboot_image_crypto::{digest_parts, OsslCrypto};
use vboot_image_gen::ImageGeneratorCrypto;
use vboot_image_types::HashKind;

/// Run the command
pub(crate) fn run_cmd(args: &ArgMatches) -> anyhow::Result<()> {
    let key_path: &PathBuf = args
        .get_one::<PathBuf>("key")
        .with_context(|| "key arg not specified")?;

    let out_path: &PathBuf = args
        .get_one::<PathBuf>("out")
        .with_context(|| "out arg not specified")?;

    let pub_key = OsslCrypto::rsa_processed_pub_key_from_pem(key_path)?;
    std::fs::write(out_path, &pub_key)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;

    let digest = digest_parts(HashKind::Sha256, &[&pub_key])?;
    log::info!(
        "Wrote {} byte processed key to {} (sha256 {})",
        pub_key.len(),
        out_path.display(),
        hex::encode(digest)
    );

    Ok(())
}
