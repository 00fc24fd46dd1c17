//! Orphan, expiry and health commands.

use super::{Context, print_json};
use anyhow::Result;
use chrono::Utc;
use serde_json::json;

pub fn orphans(ctx: &Context, delete: bool) -> Result<()> {
    let blobs = ctx
        .housekeeping()
        .delete_orphaned_blobs(ctx.environment, !delete)?;
    print_json(&json!({ "deleted": delete, "orphanedBlobs": blobs }))
}

pub fn cleanup(ctx: &Context, apply: bool) -> Result<()> {
    let worlds = ctx
        .housekeeping()
        .cleanup_expired_worlds(ctx.environment, Utc::now(), !apply)?;
    print_json(&json!({ "deleted": apply, "expiredWorlds": worlds }))
}

/// Prints the report and returns whether the environment is healthy.
pub fn health(ctx: &Context) -> Result<bool> {
    let report = ctx.housekeeping().health_report(ctx.environment, Utc::now())?;
    print_json(&report)?;
    Ok(report.is_healthy())
}
