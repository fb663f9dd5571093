// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::info;

use flamegpu_engine::datamodel::Project;
pub use flamegpu_engine::{self as engine, Result};

pub mod codegen;
pub mod importer;

pub use codegen::{MODEL_TEMPLATE, Rendered, Stub};

/// Where and how to write a generated model.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub model_name: String,
    /// Output root; files land in a `model_name` directory below it.
    pub output_dir: PathBuf,
    /// Template text.  The shipped template is used when unset.
    pub template: Option<String>,
    /// Stamped into the script header; defaults to the local time.
    pub timestamp: Option<NaiveDateTime>,
}

impl GenerateRequest {
    pub fn new(model_name: &str, output_dir: &Path) -> Self {
        GenerateRequest {
            model_name: model_name.to_owned(),
            output_dir: output_dir.to_owned(),
            template: None,
            timestamp: None,
        }
    }
}

/// Write the model script and one stub per agent function, returning
/// the script's path.  Existing files are overwritten; a failure part
/// way through leaves whatever was already written.
pub fn generate(request: &GenerateRequest, project: &Project) -> Result<PathBuf> {
    let template = request.template.as_deref().unwrap_or(MODEL_TEMPLATE);
    let timestamp = request
        .timestamp
        .unwrap_or_else(|| Local::now().naive_local());
    let rendered = codegen::render(&request.model_name, template, project, timestamp);

    let export_root = request.output_dir.join(&request.model_name);
    fs::create_dir_all(&export_root)?;

    for stub in rendered.stubs.iter() {
        let path = export_root.join(&stub.file_name);
        fs::write(&path, &stub.contents)?;
        info!(path = %path.display(), "wrote function stub");
    }

    let script_path = export_root.join(format!("{}.py", request.model_name));
    fs::write(&script_path, &rendered.script)?;
    info!(path = %script_path.display(), "wrote model script");

    Ok(script_path)
}

/// Recover a model from the script at `path`.
pub fn parse(path: &Path) -> Result<Project> {
    let source = fs::read_to_string(path)?;
    importer::import_source(&source)
}

pub fn parse_source(source: &str) -> Result<Project> {
    importer::import_source(source)
}

pub fn open_project(reader: &mut dyn BufRead) -> Result<Project> {
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    engine::json::from_str(&contents)
}

pub fn to_json(project: &Project) -> Result<String> {
    engine::json::to_string(project)
}
