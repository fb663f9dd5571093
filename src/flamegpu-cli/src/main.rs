// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use flamegpu_compat::codegen::TIMESTAMP_FORMAT;
use flamegpu_compat::{GenerateRequest, generate, open_project, parse, to_json};

#[derive(Parser, Debug)]
#[command(
    name = "flamegpu",
    version,
    about = "Generate FLAME GPU model scripts and recover models from them"
)]
struct Cli {
    /// Log more: -v for progress, -vv for detail.  RUST_LOG applies otherwise.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a model script and one stub per agent function
    Generate {
        /// Project document (JSON)
        #[arg(long)]
        model: PathBuf,
        /// Directory the model's own directory is created in
        #[arg(long)]
        output: PathBuf,
        /// Model name; defaults to the project file's stem
        #[arg(long)]
        name: Option<String>,
        /// Script template to fill in instead of the built-in one
        #[arg(long, env = "FLAMEGPU_TEMPLATE")]
        template: Option<PathBuf>,
        /// Header timestamp, as "dd/mm/YYYY - HH:MM:SS"
        #[arg(long, value_parser = parse_timestamp)]
        timestamp: Option<NaiveDateTime>,
    },
    /// Recover a project document from a model script
    Import {
        script: PathBuf,
        /// Where to write the project document; stdout when unset
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_timestamp(s: &str) -> std::result::Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
}

fn default_model_name(model: &Path) -> Result<String> {
    model
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("can't derive a model name from '{}'", model.display()))
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_generate(
    model: &Path,
    output: &Path,
    name: Option<String>,
    template: Option<&Path>,
    timestamp: Option<NaiveDateTime>,
) -> Result<()> {
    let file = File::open(model).with_context(|| format!("opening '{}'", model.display()))?;
    let mut reader = BufReader::new(file);
    let project = open_project(&mut reader)
        .with_context(|| format!("reading project '{}'", model.display()))?;

    let name = match name {
        Some(name) => name,
        None => default_model_name(model)?,
    };
    let mut request = GenerateRequest::new(&name, output);
    request.timestamp = timestamp;
    if let Some(template) = template {
        let text = fs::read_to_string(template)
            .with_context(|| format!("reading template '{}'", template.display()))?;
        request.template = Some(text);
    }

    let script = generate(&request, &project)
        .with_context(|| format!("generating '{}' into '{}'", name, output.display()))?;
    info!(script = %script.display(), "generated model");
    println!("{}", script.display());

    Ok(())
}

fn run_import(script: &Path, output: Option<&Path>) -> Result<()> {
    let project = parse(script).with_context(|| format!("importing '{}'", script.display()))?;
    let json = to_json(&project)?;

    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing '{}'", path.display()))?;
            info!(path = %path.display(), "wrote project document");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Generate {
            model,
            output,
            name,
            template,
            timestamp,
        } => run_generate(&model, &output, name, template.as_deref(), timestamp),
        Command::Import { script, output } => run_import(&script, output.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn timestamps_use_the_header_format() {
        let ts = parse_timestamp("01/03/2024 - 09:05:07").unwrap();
        assert_eq!("2024-03-01 09:05:07", ts.to_string());
        assert!(parse_timestamp("2024-03-01").is_err());
    }

    #[test]
    fn model_name_from_path() {
        assert_eq!(
            "predator_prey",
            default_model_name(Path::new("models/predator_prey.json")).unwrap()
        );
    }

    #[test]
    fn generate_arguments() {
        let cli = Cli::try_parse_from([
            "flamegpu",
            "-vv",
            "generate",
            "--model",
            "m.json",
            "--output",
            "out",
            "--timestamp",
            "31/12/2025 - 23:59:59",
        ])
        .unwrap();
        assert_eq!(2, cli.verbose);
        match cli.command {
            Command::Generate {
                model,
                name,
                timestamp,
                ..
            } => {
                assert_eq!(PathBuf::from("m.json"), model);
                assert_eq!(None, name);
                assert!(timestamp.is_some());
            }
            Command::Import { .. } => panic!("expected generate"),
        }
    }
}
