// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration Schema Generator
//!
//! Prints the JSON schema of the edge orchestrator configuration document, for
//! editor completion and CI validation of configuration files.
//!
//! Usage:
//!   cargo run --bin configschema > deploy/edge-config.schema.json

use edge_orchestrator::config::EdgeConfig;
use schemars::schema_for;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema_for!(EdgeConfig);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
