// Copyright 2023, 2024 Viktor Reusch
//
// This file is part of kml_gpx_convert.
//
// kml_gpx_convert is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// kml_gpx_convert is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License
// for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with kml_gpx_convert. If not, see <https://www.gnu.org/licenses/>.

//! Command-line interface for the KML-to-GPX converter.

use std::{
    fs::File,
    io::{stdin, stdout, BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use kml_gpx_convert::{convert, ConvertOptions, MergePolicy};
use log::{error, info};

/// Convert a KML 2.2 file to a GPX 1.1 file.
#[derive(Parser, Debug)]
#[command(name = "kml2gpx", version)]
struct Cli {
    /// KML file to convert. Reads from STDIN if omitted.
    #[arg(value_name = "KML")]
    input: Option<PathBuf>,

    /// Write the result to this file instead of STDOUT.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Merge all tracks (placemarks) of a folder into one track.
    ///
    /// This results in one track per folder. Useful if a single track had
    /// to be divided into multiple placemarks in the KML file.
    #[arg(short = 't', long)]
    merge_tracks: bool,

    /// Merge all tracks (placemarks) of all folders into one track.
    #[arg(short = 'f', long)]
    merge_folders: bool,

    /// Convert KML points to GPX waypoints. They are skipped otherwise.
    #[arg(short = 'w', long)]
    add_waypoints: bool,

    /// Verbosity level (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> ConvertOptions {
        ConvertOptions {
            merge_tracks: self.merge_tracks,
            merge_folders: self.merge_folders,
            add_waypoints: self.add_waypoints,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("conversion failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let options = cli.options();
    info!(
        "converting {} from KML to GPX with {:?} merge policy, waypoints: {}",
        cli.input
            .as_ref()
            .map_or_else(|| "STDIN".to_string(), |p| format!("{p:?}")),
        MergePolicy::from(&options),
        options.add_waypoints
    );

    let mut sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {path:?}"))?,
        )),
        None => Box::new(stdout().lock()),
    };

    let document = match &cli.input {
        Some(path) => {
            let source = File::open(path).with_context(|| format!("cannot open {path:?}"))?;
            convert(source, &mut sink, &options)?
        }
        None => convert(stdin().lock(), &mut sink, &options)?,
    };
    writeln!(sink)?;
    sink.flush()?;

    info!(
        "wrote {} track(s) and {} waypoint(s) to {}",
        document.tracks().len(),
        document.waypoints().len(),
        cli.output
            .as_ref()
            .map_or_else(|| "STDOUT".to_string(), |p| format!("{p:?}"))
    );
    Ok(())
}
