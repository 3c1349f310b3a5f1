//! Preview-side halves of the officer, clan-wars and overwrite-ceiling
//! scenarios. The apply halves live in the engine crate.
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{category, member_overwrites, role, set_topic, space, text_channel};
use spacesync_core::diff::{render_plan, ChangedField};
use spacesync_core::{Plan, PlanMode};

#[test]
fn test_scenario_missing_officer_role_is_planned_for_creation() {
    // GIVEN a source with a hoisted "Officer" role and a target without it
    let mut source = space(1, "Main");
    let mut officer = role(11, "Officer", 1);
    officer.hoist = true;
    source.roles.push(officer);
    let target = space(2, "Mirror");

    // WHEN building the plan
    let plan = Plan::build(&source, &target, PlanMode::default());

    // THEN the role is the only creation
    assert_eq!(plan.diff.roles.create, vec!["Officer".to_string()]);
    assert_eq!(plan.totals().create, 1);
    assert_eq!(plan.totals().update, 0);
}

#[test]
fn test_scenario_category_and_child_channel_are_both_created() {
    // GIVEN "Clan Wars" owning "general" in the source only
    let mut source = space(1, "Main");
    source.categories.push(category(20, "Clan Wars", 0));
    source.channels.push(text_channel(30, "general", 0, Some(20)));
    let target = space(2, "Mirror");

    // WHEN building the plan
    let plan = Plan::build(&source, &target, PlanMode::default());

    // THEN both appear under their collections
    assert_eq!(plan.diff.categories.create, vec!["Clan Wars".to_string()]);
    assert_eq!(plan.diff.text_channels.create, vec!["general".to_string()]);
}

#[test]
fn test_scenario_oversized_overwrites_still_plan_an_update() {
    // GIVEN "general" with 150 overwrites and a new topic in the source
    let mut source = space(1, "Main");
    let mut general = text_channel(30, "general", 0, None);
    general.overwrites = member_overwrites(150);
    set_topic(&mut general, "new topic");
    source.channels.push(general);

    let mut target = space(2, "Mirror");
    let mut existing = text_channel(60, "general", 0, None);
    set_topic(&mut existing, "old topic");
    target.channels.push(existing);

    // WHEN building the plan
    let plan = Plan::build(&source, &target, PlanMode::default());

    // THEN general is an update touching the topic
    let entry = plan
        .diff
        .text_channels
        .update_for("general")
        .expect("general should be updated");
    assert!(entry.fields.contains(&ChangedField::Topic));
}

#[test]
fn test_preview_renders_every_section() {
    let mut source = space(1, "Main");
    source.roles.push(role(11, "Officer", 1));
    source.categories.push(category(20, "Clan Wars", 0));
    let mut target = space(2, "Mirror");
    target.roles.push(role(21, "Retired", 1));

    let plan = Plan::build(
        &source,
        &target,
        PlanMode {
            prune: true,
            ..PlanMode::default()
        },
    );
    let text = render_plan(&plan);

    assert!(text.contains("## Roles"));
    assert!(text.contains("+ Officer"));
    assert!(text.contains("- Retired"));
    assert!(!text.contains("kept, prune is off"));
    assert!(text.contains("## Categories"));
}

#[test]
fn test_case_variants_are_listed_as_skipped() {
    let mut source = space(1, "Main");
    source.roles.push(role(11, "Officer", 1));
    source.roles.push(role(12, "officer", 2));
    let target = space(2, "Mirror");

    let plan = Plan::build(&source, &target, PlanMode::default());
    assert_eq!(plan.diff.roles.create.len(), 1);
    assert!(render_plan(&plan).contains("## Skipped duplicates"));
}
