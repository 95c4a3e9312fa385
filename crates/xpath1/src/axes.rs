//! Contains pure functions for collecting nodes along each XPath axis.
//!
//! Every collector returns its nodes in proximity order: document order for forward
//! axes, nearest-first for reverse axes. Predicates number nodes in this order.

use crate::ast::Axis;
use crate::datasource::{DataSourceNode, NodeType};

/// Collects the nodes on `axis` relative to `node`, in proximity order.
pub fn collect<'a, N: DataSourceNode<'a>>(axis: Axis, node: N) -> Vec<N> {
    match axis {
        Axis::SelfAxis => vec![node],
        Axis::Child => node.children().collect(),
        Axis::Attribute => collect_attribute_nodes(node),
        Axis::Descendant => collect_descendant_nodes(node),
        Axis::DescendantOrSelf => {
            let mut results = vec![node];
            results.extend(collect_descendant_nodes(node));
            results
        }
        Axis::Parent => node.parent().into_iter().collect(),
        Axis::Ancestor => collect_ancestor_nodes(node),
        Axis::AncestorOrSelf => {
            let mut results = vec![node];
            results.extend(collect_ancestor_nodes(node));
            results
        }
        Axis::FollowingSibling => collect_following_sibling_nodes(node),
        Axis::PrecedingSibling => collect_preceding_sibling_nodes(node),
        Axis::Following => collect_following_nodes(node),
        Axis::Preceding => collect_preceding_nodes(node),
    }
}

fn collect_attribute_nodes<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    if node.node_type() == NodeType::Element {
        node.attributes().collect()
    } else {
        Vec::new()
    }
}

/// Preorder walk with an explicit stack. Children are pushed in reverse so they
/// pop in document order.
fn collect_descendant_nodes<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let mut results = Vec::new();
    let mut stack: Vec<N> = node.children().collect();
    stack.reverse();
    while let Some(current) = stack.pop() {
        results.push(current);
        let mut children: Vec<N> = current.children().collect();
        children.reverse();
        stack.extend(children);
    }
    results
}

fn collect_ancestor_nodes<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let mut results = Vec::new();
    let mut current = node.parent();
    while let Some(p) = current {
        results.push(p);
        current = p.parent();
    }
    results
}

// Attributes have a parent but are not among its children, so the sibling axes
// are empty for them.
fn is_sibling_bearing<'a, N: DataSourceNode<'a>>(node: N) -> bool {
    node.node_type() != NodeType::Attribute
}

fn collect_following_sibling_nodes<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    match node.parent() {
        Some(parent) if is_sibling_bearing(node) => {
            parent.children().skip_while(|sibling| *sibling != node).skip(1).collect()
        }
        _ => Vec::new(),
    }
}

fn collect_preceding_sibling_nodes<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    match node.parent() {
        Some(parent) if is_sibling_bearing(node) => {
            let mut siblings: Vec<N> = parent.children().take_while(|sibling| *sibling != node).collect();
            siblings.reverse();
            siblings
        }
        _ => Vec::new(),
    }
}

fn collect_following_nodes<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let mut results = Vec::new();
    // An attribute is followed by its element's content.
    if node.node_type() == NodeType::Attribute {
        if let Some(parent) = node.parent() {
            results.extend(collect_descendant_nodes(parent));
        }
    }
    let mut current = Some(node);
    while let Some(c) = current {
        for sibling in collect_following_sibling_nodes(c) {
            results.push(sibling);
            results.extend(collect_descendant_nodes(sibling));
        }
        current = c.parent();
    }
    results.sort();
    results
}

fn collect_preceding_nodes<'a, N: DataSourceNode<'a>>(node: N) -> Vec<N> {
    let mut results = Vec::new();
    let mut current = Some(node);
    while let Some(c) = current {
        for sibling in collect_preceding_sibling_nodes(c) {
            results.push(sibling);
            results.extend(collect_descendant_nodes(sibling));
        }
        current = c.parent();
    }
    results.sort();
    results.reverse();
    results
}
