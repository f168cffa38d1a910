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
use datamap::runtimedata::{merge_layouts, DataWithVersion};
use gettextrs::{bind_textdomain_codeset, gettext, setlocale, textdomain, LocaleCategory};
use plib::PROJECT_NAME;

/// mergelayout - merge per-version layout files into version ranges
#[derive(Parser)]
#[command(version, about = gettext("mergelayout - merge per-version layout files into version ranges"))]
struct Args {
    #[arg(short, long, default_value = ".", help = gettext("Directory to write the merged layout files to"))]
    output: PathBuf,

    #[arg(required = true, help = gettext("Layout files written by structlayout, or a single glob pattern"))]
    inputs: Vec<String>,
}

/// A lone input is a glob pattern, several inputs are file names.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    if inputs.len() != 1 {
        log::info!("merging {} files", inputs.len());
        return Ok(inputs.iter().map(PathBuf::from).collect());
    }

    let pattern = &inputs[0];
    let matches = glob::glob(pattern)?.collect::<Result<Vec<_>, _>>()?;
    if matches.is_empty() {
        return Err(format!("{}: {}", gettext("no files found"), pattern).into());
    }
    log::info!("pattern {} matched {} files", pattern, matches.len());
    Ok(matches)
}

fn mergelayout(args: &Args) -> Result<usize, Box<dyn Error>> {
    let mut layouts = Vec::new();
    for path in expand_inputs(&args.inputs)? {
        log::debug!("reading {}", path.display());
        let text = fs::read_to_string(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
        let layout =
            DataWithVersion::from_yaml(&text).map_err(|e| format!("{}: {}", path.display(), e))?;
        layouts.push(layout);
    }

    let merged = merge_layouts(layouts);
    fs::create_dir_all(&args.output)?;
    for (range, data) in &merged {
        let path = args.output.join(format!("{}.yaml", range));
        fs::write(&path, serde_yaml::to_string(data)?)?;
        log::info!("wrote {}", path.display());
    }
    Ok(merged.len())
}

fn main() -> Result<(), Box<dyn Error>> {
    setlocale(LocaleCategory::LcAll, "");
    textdomain(PROJECT_NAME)?;
    bind_textdomain_codeset(PROJECT_NAME, "UTF-8")?;
    env_logger::init();

    let args = Args::parse();

    let mut exit_code = 0;

    match mergelayout(&args) {
        Ok(n) => log::info!("{} version ranges written to {}", n, args.output.display()),
        Err(e) => {
            exit_code = 1;
            eprintln!("mergelayout: {}", e);
        }
    }

    std::process::exit(exit_code)
}
