//! Seed package commands.

use super::{Context, print_json};
use anyhow::Result;
use phoenix_application::ExportOptions;
use phoenix_core::Environment;
use phoenix_core::seed::ConflictStrategy;
use serde_json::json;
use std::path::Path;

pub fn export(
    ctx: &Context,
    world_id: &str,
    from: Option<Environment>,
    include_attachments: bool,
    name: Option<String>,
) -> Result<()> {
    let package = ctx.seeds().export_seed(
        world_id,
        ExportOptions {
            environment: from,
            include_attachments,
            destination_name: name,
        },
    )?;
    print_json(&json!({ "package": package }))
}

pub fn analyze(ctx: &Context, package: &Path) -> Result<()> {
    let analysis = ctx.seeds().analyze_conflicts(&ctx.resolve_package(package))?;
    print_json(&analysis)
}

pub fn import(ctx: &Context, package: &Path, strategy: &ConflictStrategy) -> Result<()> {
    let report = ctx.seeds().import_seed(&ctx.resolve_package(package), strategy)?;
    print_json(&report)
}

/// Prints the verdict and returns it.
pub fn validate(ctx: &Context, package: &Path) -> Result<bool> {
    let package = ctx.resolve_package(package);
    let valid = ctx.seeds().validate_seed(&package);
    print_json(&json!({ "package": package, "valid": valid }))?;
    Ok(valid)
}

pub fn list(ctx: &Context) -> Result<()> {
    print_json(&ctx.seeds().list_seeds()?)
}
