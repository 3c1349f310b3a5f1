//! Markdown rendering of a plan for the preview surface.

use super::model::CollectionDiff;
use crate::plan::Plan;

/// Items listed per section before the rest are folded into a count
const SECTION_ITEM_CAP: usize = 20;

/// Render a plan as a Markdown preview.
///
/// The output has a header (source, target, mode), a totals line, one
/// section per non-empty collection and, if any, the duplicate names that
/// were skipped.
pub fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    let totals = plan.totals();

    out.push_str("# Sync preview\n\n");
    out.push_str(&format!("- Source: {} ({})\n", plan.source.name, plan.source.id));
    out.push_str(&format!("- Target: {} ({})\n", plan.target.name, plan.target.id));
    let transactional = if plan.mode.transactional {
        "transactional"
    } else {
        "non-transactional"
    };
    out.push_str(&format!(
        "- Mode: prune {}, overwrites {}, {}\n\n",
        on_off(plan.mode.prune),
        on_off(plan.mode.sync_overwrites),
        transactional
    ));
    out.push_str(&format!(
        "**{} to create, {} to update, {} to delete**\n",
        totals.create, totals.update, totals.delete
    ));

    if plan.diff.is_empty() {
        out.push_str("\nTarget already matches the source; only positions will be checked.\n");
    }

    for (collection, diff) in plan.diff.collections() {
        if diff.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {}\n", collection.label()));
        render_collection(&mut out, diff, plan.mode.prune);
    }

    if !plan.diff.ignored_duplicates.is_empty() {
        out.push_str("\n## Skipped duplicates\n");
        for dup in &plan.diff.ignored_duplicates {
            out.push_str(&format!(
                "- {} `{}` (id {}, name already used by id {})\n",
                collection_noun(dup.collection),
                dup.name,
                dup.ignored_id,
                dup.kept_id
            ));
        }
    }

    out
}

fn render_collection(out: &mut String, diff: &CollectionDiff, prune: bool) {
    let created = diff.create.iter().map(|n| format!("+ {}", n));
    let updated = diff.update.iter().map(|u| {
        let fields: Vec<&str> = u.fields.iter().map(|f| f.as_str()).collect();
        format!("~ {} ({})", u.name, fields.join(", "))
    });
    let deleted = diff.delete.iter().map(|n| {
        if prune {
            format!("- {}", n)
        } else {
            format!("- {} (kept, prune is off)", n)
        }
    });

    let lines: Vec<String> = created.chain(updated).chain(deleted).collect();
    for line in lines.iter().take(SECTION_ITEM_CAP) {
        out.push_str(&format!("    {}\n", line));
    }
    if lines.len() > SECTION_ITEM_CAP {
        out.push_str(&format!("    ... and {} more\n", lines.len() - SECTION_ITEM_CAP));
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn collection_noun(collection: crate::keys::Collection) -> &'static str {
    use crate::keys::Collection;
    match collection {
        Collection::Roles => "role",
        Collection::Categories => "category",
        Collection::TextChannels => "text channel",
        Collection::VoiceChannels => "voice channel",
    }
}
