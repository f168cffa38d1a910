//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use datamap::runtimedata::{sanitize_identifier, DataWithVersion, Version};
use datamap::runtimes::{layout_map_for, RUNTIMES};
use datamap::{resolve, Binary};
use gettextrs::{bind_textdomain_codeset, gettext, setlocale, textdomain, LocaleCategory};
use plib::PROJECT_NAME;

/// structlayout - extract struct layouts from DWARF debug information
#[derive(Parser)]
#[command(version, about = gettext("structlayout - extract struct layouts from DWARF debug information"))]
struct Args {
    #[arg(short, long, help = gettext("Name of the predefined runtime, e.g. glibc, musl"))]
    runtime: String,

    #[arg(short = 'v', long = "runtime-version", help = gettext("Version of the runtime the layout is generated for, e.g. 2.35"))]
    runtime_version: String,

    #[arg(short, long, default_value = ".", help = gettext("Directory to write the layout file under"))]
    output: PathBuf,

    #[arg(help = gettext("ELF file with debug information"))]
    file: PathBuf,
}

fn structlayout(args: &Args) -> Result<PathBuf, Box<dyn Error>> {
    let mut map = layout_map_for(&args.runtime, &args.runtime_version).ok_or_else(|| {
        format!(
            "{}: {} ({}: {})",
            gettext("unknown runtime"),
            args.runtime,
            gettext("expected one of"),
            RUNTIMES.join(", ")
        )
    })?;
    let version: Version = args.runtime_version.parse()?;

    let binary = Binary::open(&args.file)
        .map_err(|e| format!("{}: {}", args.file.display(), e))?;
    resolve(map.as_mut(), &binary)?;
    let layout = DataWithVersion::new(version, map.as_ref());

    let dir = args.output.join("layout");
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!(
        "{}_{}.yaml",
        args.runtime,
        sanitize_identifier(&args.runtime_version)
    ));
    fs::write(&path, layout.to_yaml()?)?;
    Ok(path)
}

fn main() -> Result<(), Box<dyn Error>> {
    setlocale(LocaleCategory::LcAll, "");
    textdomain(PROJECT_NAME)?;
    bind_textdomain_codeset(PROJECT_NAME, "UTF-8")?;
    env_logger::init();

    let args = Args::parse();

    let mut exit_code = 0;

    match structlayout(&args) {
        Ok(path) => log::info!("layout file written: {}", path.display()),
        Err(e) => {
            exit_code = 1;
            eprintln!("structlayout: {}", e);
        }
    }

    std::process::exit(exit_code)
}
