//! Group command handlers.

use std::fmt::Write;
use std::sync::Arc;

use hermes_core::{DataStore, EntityId, Group, GroupItem, Registries, Session};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, GroupsArgs, GroupsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Parent")]
    parent: String,
    #[tabled(rename = "Layout")]
    layout: String,
    #[tabled(rename = "Order")]
    order: i64,
    #[tabled(rename = "Items")]
    items: usize,
}

fn row(group: &Arc<Group>, registries: &Registries) -> GroupRow {
    GroupRow {
        id: group.id.to_string(),
        name: util::or_dash(group.name.as_deref()),
        parent: if group.parent.is_root() {
            "-".into()
        } else {
            group.parent.to_string()
        },
        layout: format!("{:?}", registries.layouts.resolve(group.layout.as_str())),
        order: group.order,
        items: group.content.len(),
    }
}

// ── Tree ────────────────────────────────────────────────────────────

/// Nested view of one group, for structured output.
#[derive(Serialize)]
struct GroupNode {
    id: EntityId,
    name: Option<String>,
    layout: String,
    content: Vec<GroupItem>,
    children: Vec<GroupNode>,
}

fn build_tree(store: &DataStore, parent: EntityId) -> Vec<GroupNode> {
    store
        .children_of(parent)
        .iter()
        .map(|group| GroupNode {
            id: group.id,
            name: group.name.clone(),
            layout: group.layout.clone(),
            content: group.sorted_content(),
            children: build_tree(store, group.id),
        })
        .collect()
}

fn render_tree(nodes: &[GroupNode], store: &DataStore, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        let _ = writeln!(
            out,
            "{indent}{} (#{})",
            node.name.as_deref().unwrap_or("(unnamed)"),
            node.id
        );
        for item in &node.content {
            let device = store
                .device(item.device)
                .and_then(|d| d.name.clone())
                .unwrap_or_else(|| format!("device #{}", item.device));
            let board = store
                .board(item.board)
                .map_or_else(|| format!("unknown board #{}", item.board), |b| b.display_name());
            let _ = writeln!(out, "{indent}  - {device} on {board}");
        }
        render_tree(&node.children, store, depth + 1, out);
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(session: &Session, args: GroupsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::wait_for_snapshot(session).await?;
    let store = session.store();

    match args.command {
        GroupsCommand::List => {
            let snap = store.groups_snapshot();
            let out = output::render_list(
                &global.output,
                &snap,
                |g| row(g, session.registries()),
                |g| g.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        GroupsCommand::Tree => {
            let tree = build_tree(store, EntityId::ROOT);
            let out = output::render_single(
                &global.output,
                &tree,
                |nodes| {
                    let mut text = String::new();
                    render_tree(nodes, store, 0, &mut text);
                    text.trim_end().to_owned()
                },
                |nodes| {
                    nodes
                        .iter()
                        .map(|n| n.id.to_string())
                        .collect::<Vec<_>>()
                        .join("\n")
                },
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
