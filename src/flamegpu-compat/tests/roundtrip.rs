// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs::{self, File};
use std::io::BufReader;

use chrono::NaiveDate;

use flamegpu_compat::{GenerateRequest, generate, open_project, parse};
use flamegpu_engine::datamodel::{GlobalVariable, Project};

static TEST_MODELS: &[&str] = &["test/models/predator_prey.json", "test/models/network.json"];

fn load(path: &str) -> Project {
    let file_path = format!("../../{}", path);
    let f = File::open(file_path).unwrap();
    let mut f = BufReader::new(f);
    open_project(&mut f).unwrap()
}

/// Known round-trip exclusion: the template's run settings
/// (`VISUALISATION`, `DEBUG_PRINTING`, `ENSEMBLE`, `STEPS` and
/// `LOG_FREQUENCY`) are uppercase constants, so they read back as Int
/// globals the model never declared.  Only the model's own globals are
/// compared.
fn model_globals(expected: &Project, recovered: &Project) -> Vec<GlobalVariable> {
    recovered
        .globals
        .iter()
        .filter(|g| expected.global(&g.name).is_some())
        .cloned()
        .collect()
}

#[test]
fn roundtrips_model() {
    for &path in TEST_MODELS {
        eprintln!("model: {}", path);
        let expected = load(path);

        let dir = tempfile::tempdir().unwrap();
        let mut request = GenerateRequest::new("roundtrip", dir.path());
        request.timestamp = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5));
        let script = generate(&request, &expected).unwrap();

        let recovered = parse(&script).unwrap();

        assert_eq!(expected.agents, recovered.agents, "agents of {}", path);
        assert_eq!(expected.layers, recovered.layers, "layers of {}", path);
        assert_eq!(
            expected.connections, recovered.connections,
            "connections of {}", path
        );
        assert_eq!(
            expected.globals,
            model_globals(&expected, &recovered),
            "globals of {}",
            path
        );
        assert!(recovered.visualization.is_none());
    }
}

#[test]
fn writes_one_stub_per_function() {
    for &path in TEST_MODELS {
        let project = load(path);
        let dir = tempfile::tempdir().unwrap();
        let script = generate(&GenerateRequest::new("stubs", dir.path()), &project).unwrap();

        assert_eq!(dir.path().join("stubs").join("stubs.py"), script);
        for agent in project.agents.iter() {
            for function in agent.functions.iter() {
                let stub = dir.path().join("stubs").join(format!("{}.cpp", function.name));
                let contents = fs::read_to_string(&stub).unwrap();
                assert!(
                    contents.starts_with(&format!("FLAMEGPU_AGENT_FUNCTION({},", function.name)),
                    "stub for {}::{} in {}",
                    agent.name,
                    function.name,
                    path
                );
            }
        }
    }
}
