use std::collections::HashSet;

use serde_json::Value;

pub const MAX_CHAIN_DEPTH: usize = 32;
pub const MAX_CHAIN_NODES: usize = 512;

/// Flattens an evolution chain node into species names, pre-order: a node is
/// emitted before its `evolves_to` children, children in document order.
pub fn walk_chain(root: &Value) -> Vec<String> {
    let mut names = Vec::new();
    if !root.is_object() {
        return names;
    }

    let mut seen = HashSet::new();
    let mut stack = vec![(root, 0usize)];
    let mut visited = 0usize;

    while let Some((node, depth)) = stack.pop() {
        visited += 1;
        if visited > MAX_CHAIN_NODES {
            tracing::warn!(visited, "evolution chain exceeds node bound; truncating");
            break;
        }

        if let Some(name) = node
            .get("species")
            .and_then(|v| v.get("name"))
            .and_then(|v| v.as_str())
        {
            let name = name.to_lowercase();
            if !seen.insert(name.clone()) {
                continue;
            }
            names.push(name);
        }

        if depth + 1 >= MAX_CHAIN_DEPTH {
            continue;
        }
        if let Some(children) = node.get("evolves_to").and_then(|v| v.as_array()) {
            for child in children.iter().rev().filter(|child| child.is_object()) {
                stack.push((child, depth + 1));
            }
        }
    }

    names
}
