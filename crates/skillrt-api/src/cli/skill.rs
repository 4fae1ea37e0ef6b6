//! Catalog subcommands: list, show, check.

use anyhow::{Context, Result};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use skillrt_types::presence::PresenceStatus;
use skillrt_types::skill::{SkillFilter, SkillKind};

use crate::http::handlers::skill::SkillSummary;
use crate::state::AppState;

fn status_color(status: PresenceStatus) -> Color {
    match status {
        PresenceStatus::Present => Color::Green,
        PresenceStatus::Missing => Color::Yellow,
        PresenceStatus::Error => Color::Red,
        PresenceStatus::Unknown => Color::DarkGrey,
    }
}

/// List indexed skills.
pub async fn list_skills(
    state: &AppState,
    kind: Option<SkillKind>,
    prefix: Option<String>,
    json: bool,
) -> Result<()> {
    state.registry.ensure_available()?;

    let mut filter = SkillFilter::all();
    if let Some(kind) = kind {
        filter = filter.with_kind(kind);
    }
    if let Some(prefix) = prefix {
        filter = filter.with_name_prefix(prefix);
    }

    let summaries: Vec<SkillSummary> = state
        .registry
        .list(&filter)
        .iter()
        .map(|r| SkillSummary::new(r, state.presence_book.get(&r.def)))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!();
        println!("  No skills found.");
        println!(
            "  Add one under {}",
            style(state.data_dir.join("skills").display()).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Type"),
            Cell::new("Status"),
            Cell::new("Enabled"),
            Cell::new("Description"),
        ]);

    for s in &summaries {
        let status = s.presence.as_ref().map(|p| p.status).unwrap_or_default();
        let enabled = if s.enabled {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&s.name).fg(Color::Cyan),
            Cell::new(s.kind.to_string()),
            Cell::new(status.to_string()).fg(status_color(status)),
            enabled,
            Cell::new(&s.description),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} skill(s), registry generation {}",
        style(summaries.len()).bold(),
        state.registry.snapshot().generation()
    );
    Ok(())
}

/// Show one skill's metadata and instructions.
pub async fn show_skill(state: &AppState, name: &str, json: bool) -> Result<()> {
    state.registry.ensure_available()?;
    let record = state
        .registry
        .resolve_name(name, &SkillFilter::all())
        .with_context(|| format!("Skill '{name}' not found"))?;

    if json {
        let detail = serde_json::json!({
            "skill": SkillSummary::new(&record, state.presence_book.get(&record.def)),
            "instructions": record.instructions,
        });
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style(&record.def.name).cyan().bold(),
        style(format!("({})", record.def.kind)).dim()
    );
    println!("  {}", record.description);
    println!();
    println!("  {}  {}", style("Location:").dim(), record.def.location);
    if let Some(root) = &record.root_dir {
        println!("  {}  {}", style("Root:    ").dim(), root.display());
    }
    println!("  {}  {}", style("Digest:  ").dim(), record.digest);
    if !record.enabled {
        println!("  {}", style("Disabled").red());
    }
    for (key, value) in &record.properties {
        println!("  {}  {}", style(format!("{key}:")).dim(), value);
    }
    println!();
    println!("  {}", style("── Instructions ──").dim());
    println!();
    for line in record.instructions.lines() {
        println!("  {line}");
    }
    println!();
    Ok(())
}

/// Force a rescan and print the per-source outcome plus presence records.
pub async fn check(state: &AppState, json: bool) -> Result<()> {
    let forced = state.presence.force().await;
    let report = state
        .presence_book
        .last_report()
        .context("Skill refresh produced no report")?;

    if json {
        let entries: Vec<serde_json::Value> = state
            .presence_book
            .entries()
            .into_iter()
            .map(|(def, record)| serde_json::json!({ "skill": def, "presence": record }))
            .collect();
        let out = serde_json::json!({
            "healthy": forced.is_ok() && report.failed_sources() == 0,
            "report": report,
            "presence": entries,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let mark = |ok: bool| {
        if ok {
            format!("{}", style("✓").green())
        } else {
            format!("{}", style("✗").red())
        }
    };

    println!();
    println!("  {} Skill sources", style("🔍").bold());
    println!();
    for source in &report.sources {
        match &source.error {
            None => println!(
                "  {} {} ({} skill(s))",
                mark(true),
                source.source_id,
                source.skills
            ),
            Some(e) => println!("  {} {}: {}", mark(false), source.source_id, style(e).red()),
        }
        for parse_error in &source.parse_errors {
            println!("      {} {}", style("!").yellow(), style(parse_error).dim());
        }
    }

    let entries = state.presence_book.entries();
    if !entries.is_empty() {
        println!();
        println!("  {}", style("── Presence ──").dim());
        for (def, record) in &entries {
            let status = match record.status {
                PresenceStatus::Present => style(record.status.to_string()).green(),
                PresenceStatus::Missing => style(record.status.to_string()).yellow(),
                PresenceStatus::Error => style(record.status.to_string()).red(),
                PresenceStatus::Unknown => style(record.status.to_string()).dim(),
            };
            println!("  {:<9} {}", status, def);
            if let Some(err) = &record.last_check_error {
                println!("            {}", style(err).dim());
            }
        }
    }
    println!();

    if let Err(e) = forced {
        anyhow::bail!("Skill refresh failed: {e}");
    }
    Ok(())
}
