//! Backup, restore, transfer and sync commands.

use super::{Context, print_json};
use anyhow::Result;
use phoenix_application::TransferOptions;
use phoenix_core::Environment;
use serde_json::json;
use std::path::Path;

pub fn backup(ctx: &Context) -> Result<()> {
    let path = ctx.environments().backup_environment(ctx.environment)?;
    print_json(&json!({ "environment": ctx.environment, "backup": path }))
}

pub fn backups(ctx: &Context) -> Result<()> {
    print_json(&ctx.environments().list_backups()?)
}

pub fn restore(ctx: &Context, file: &Path, overwrite: bool) -> Result<()> {
    let report = ctx
        .environments()
        .restore_backup(file, ctx.environment, overwrite)?;
    print_json(&report)
}

pub fn transfer(
    ctx: &Context,
    source: Environment,
    target: Environment,
    world_ids: Vec<String>,
    overwrite: bool,
    include_attachments: bool,
) -> Result<()> {
    let report = ctx.environments().transfer_data(TransferOptions {
        source,
        target,
        world_ids,
        overwrite,
        include_attachments,
    })?;
    print_json(&report)
}

pub fn sync(ctx: &Context, source: Environment, target: Environment) -> Result<()> {
    print_json(&ctx.environments().sync_environments(source, target)?)
}
