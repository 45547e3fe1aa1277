/*++

Licensed under the Apache-2.0 license.

File Name:

   main.rs

Abstract:

    Main entry point of the kernel imaging application

--*/
use std::path::PathBuf;

use anyhow::Context;
use clap::{arg, value_parser, ArgMatches, Command};
use vboot_image_types::AlgorithmId;

mod bench;
mod create;
mod keyb;
mod verify;

/// Parse an integer given in decimal or `0x` hexadecimal
fn parse_u64(value: &str) -> Result<u64, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid number {value}: {e}"))
}

/// Fetch an algorithm id argument
pub(crate) fn algorithm_arg(args: &ArgMatches, name: &str) -> anyhow::Result<AlgorithmId> {
    let id: &u32 = args
        .get_one::<u32>(name)
        .with_context(|| format!("{name} arg not specified"))?;

    AlgorithmId::try_from(*id).with_context(|| format!("Unknown algorithm id {id} for {name}"))
}

/// Entry point
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let sub_cmds = vec![
        Command::new("keyb")
            .about("Convert an RSA key to a processed public key blob")
            .arg(
                arg!(--"key" <FILE> "RSA public or private key PEM file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"out" <FILE> "Output file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            ),
        Command::new("create")
            .about("Create a signed kernel image")
            .arg(
                arg!(--"key-config" <FILE> "Key Configuration file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"fw-algo" <U32> "Firmware signing algorithm id")
                    .required(true)
                    .value_parser(value_parser!(u32)),
            )
            .arg(
                arg!(--"kernel-algo" <U32> "Kernel signing algorithm id")
                    .required(true)
                    .value_parser(value_parser!(u32)),
            )
            .arg(
                arg!(--"kernel-key-version" <U32> "Kernel key version")
                    .required(true)
                    .value_parser(value_parser!(u32)),
            )
            .arg(
                arg!(--"kernel" <FILE> "Kernel binary")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"cmd-line" <STRING> "Kernel command line")
                    .required(false)
                    .default_value("")
                    .value_parser(value_parser!(String)),
            )
            .arg(
                arg!(--"load-addr" <U64> "Kernel load address")
                    .required(false)
                    .default_value("0")
                    .value_parser(parse_u64),
            )
            .arg(
                arg!(--"entry-addr" <U64> "Kernel entry point")
                    .required(false)
                    .default_value("0")
                    .value_parser(parse_u64),
            )
            .arg(
                arg!(--"version-major" <U32> "Kernel major version")
                    .required(false)
                    .default_value("1")
                    .value_parser(value_parser!(u32)),
            )
            .arg(
                arg!(--"version-minor" <U32> "Kernel minor version")
                    .required(false)
                    .default_value("0")
                    .value_parser(value_parser!(u32)),
            )
            .arg(
                arg!(--"out" <FILE> "Output file")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            ),
        Command::new("verify")
            .about("Verify a signed kernel image")
            .arg(
                arg!(--"fw-key" <FILE> "Processed firmware public key")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"image" <FILE> "Kernel image")
                    .required(true)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"fw-algo" <U32> "Expected firmware signing algorithm id")
                    .required(false)
                    .value_parser(value_parser!(u32)),
            )
            .arg(arg!(--"header-only" "Stop after the kernel key signature")),
        Command::new("bench")
            .about("Benchmark kernel image verification")
            .arg(
                arg!(--"key-dir" <DIR> "Directory holding key_rsa<bits>.pem files")
                    .required(false)
                    .value_parser(value_parser!(PathBuf)),
            )
            .arg(
                arg!(--"iterations" <U32> "Verifications per measurement")
                    .required(false)
                    .default_value("30")
                    .value_parser(value_parser!(u32).range(1..)),
            )
            .arg(arg!(--"random-payload" "Fill payloads with random bytes")),
    ];

    let cmd = Command::new("vboot-image-app")
        .arg_required_else_help(true)
        .subcommands(sub_cmds)
        .about("Signed kernel imaging tools")
        .get_matches();

    let result = match cmd.subcommand() {
        Some(("keyb", args)) => keyb::run_cmd(args),
        Some(("create", args)) => create::run_cmd(args),
        Some(("verify", args)) => verify::run_cmd(args),
        Some(("bench", args)) => bench::run_cmd(args),
        _ => unreachable!(),
    };

    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
