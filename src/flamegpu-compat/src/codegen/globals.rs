// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use tracing::debug;

use flamegpu_engine::datamodel::GlobalVariable;
use flamegpu_engine::literal::format_literal;
use flamegpu_engine::scheme;

/// Module level constants, one per global.
pub(super) fn render_all_globals(globals: &[GlobalVariable]) -> String {
    if globals.is_empty() {
        return "# No global variables defined".to_owned();
    }
    globals
        .iter()
        .map(|g| format!("{} = {}", g.name, format_literal(g.var_type, &g.value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Environment property declarations.  Macro properties take their
/// dimensions from the value literal.
pub(super) fn render_model_globals(globals: &[GlobalVariable]) -> String {
    if globals.is_empty() {
        return "# No model globals configured".to_owned();
    }
    globals
        .iter()
        .map(|g| {
            let method = if g.is_macro {
                scheme::macro_property_method(g.var_type)
            } else {
                scheme::env_property_method(g.var_type)
            };
            debug!(global = %g.name, method, "rendering environment property");
            format!(
                "{}.{method}(\"{}\", {})",
                scheme::ENV_HANDLE,
                g.name,
                format_literal(g.var_type, &g.value)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Host init function fetching a handle to every macro property.  The
/// values themselves are left for the modeller to fill in.
pub(super) fn render_macro_initialization(globals: &[GlobalVariable]) -> String {
    let macros: Vec<&GlobalVariable> = globals.iter().filter(|g| g.is_macro).collect();
    if macros.is_empty() {
        return "# No macro properties initialisation required".to_owned();
    }

    let mut lines = vec![
        "# Initialize the MacroProperties".to_owned(),
        "class initMacroProperties(pyflamegpu.HostFunction):".to_owned(),
        "    def run(self, FLAMEGPU):".to_owned(),
        "        # Fetch a handle to each macro property".to_owned(),
    ];
    for g in macros.iter() {
        lines.push(format!(
            "        {} = FLAMEGPU.environment.{}(\"{}\")",
            g.name,
            scheme::macro_property_accessor(g.var_type),
            g.name
        ));
    }
    lines.push("        # TODO: initialize values. All 0 by default".to_owned());
    lines.push(String::new());
    lines.push("        return".to_owned());
    lines.push(String::new());
    lines.push("initialMacroProperties = initMacroProperties()".to_owned());
    lines.push("model.addInitFunction(initialMacroProperties)".to_owned());

    lines.join("\n")
}
