//! Plain-text rendering of the session state.

use std::fmt::{self, Display, Formatter};

use arbor_domain::lists::EnvironmentLists;
use arbor_domain::{AggregateTree, TreeNode, TreeStateTable};

/// Renders an aggregate as an indented outline.
///
/// Empty sub-roots are skipped. Directories show `+` when collapsed and `-`
/// when expanded in the UI state table; every node shows its order.
#[must_use]
pub fn render_tree(tree: &AggregateTree, state: &TreeStateTable) -> String {
    TreeOutline { tree, state }.to_string()
}

/// Renders the global list followed by every project group.
#[must_use]
pub fn render_environments(lists: &EnvironmentLists) -> String {
    EnvironmentOutline(lists).to_string()
}

struct TreeOutline<'a> {
    tree: &'a AggregateTree,
    state: &'a TreeStateTable,
}

impl TreeOutline<'_> {
    fn write_node(&self, f: &mut Formatter<'_>, node: &TreeNode, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        if node.is_dir() {
            let expanded = self.state.get(&node.id).is_some_and(|row| row.expanded);
            let marker = if expanded { '-' } else { '+' };
            writeln!(f, "{indent}{marker} {}/ #{}", node.name, node.order)?;
            for child in node.sorted_children() {
                self.write_node(f, child, depth + 1)?;
            }
            Ok(())
        } else {
            let protocol = node
                .protocol
                .map(|protocol| format!(" {protocol:?}").to_uppercase())
                .unwrap_or_default();
            writeln!(f, "{indent}  {}{protocol} #{}", node.name, node.order)
        }
    }
}

impl Display for TreeOutline<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.tree.name, self.tree.id)?;
        for root in self.tree.roots() {
            if root.child_nodes.is_empty() {
                continue;
            }
            writeln!(f, "  {}/", root.path)?;
            for child in root.sorted_children() {
                self.write_node(f, child, 2)?;
            }
        }
        Ok(())
    }
}

struct EnvironmentOutline<'a>(&'a EnvironmentLists);

impl Display for EnvironmentOutline<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Environments")?;
        for env in &self.0.globals {
            writeln!(f, "  {} #{}", env.name, env.order)?;
        }
        for group in &self.0.groups {
            writeln!(f, "  [{}]", group.project_id)?;
            for env in &group.environments {
                writeln!(f, "    {} #{}", env.name, env.order)?;
            }
        }
        Ok(())
    }
}
