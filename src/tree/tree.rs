use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;

use crate::error::RouterError;
use crate::pattern::{ParsedPattern, Token, TokenKind};
use crate::route::Route;

use super::node::{common_prefix_len, DynamicChild, Node};

/// Per-method collection of radix trees.
///
/// Kept as a `BTreeMap` rather than a hash map so `iter()` produces a
/// deterministic method ordering; iteration order stays stable across
/// repeated calls against the same snapshot.
#[derive(Clone)]
pub struct Tree {
    pub roots: BTreeMap<String, Node>,
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            roots: BTreeMap::new(),
        }
    }

    pub fn insert(
        &mut self,
        method: &str,
        parsed: &ParsedPattern,
        route: Route,
    ) -> Result<Arc<Route>, RouterError> {
        let root = self
            .roots
            .entry(method.to_string())
            .or_insert_with(|| Node::new(Vec::new()));
        let leaf = insert_tokens(root, &parsed.tokens);
        if let Some(existing) = leaf.route.clone() {
            return Err(RouterError::RouteExist {
                pattern: route.pattern,
                conflicting: existing.pattern.clone(),
            });
        }
        let route = Arc::new(route);
        leaf.route = Some(route.clone());
        recompute_tsr(root);
        Ok(route)
    }

    pub fn delete(
        &mut self,
        method: &str,
        parsed: &ParsedPattern,
        pattern: &str,
    ) -> Result<Arc<Route>, RouterError> {
        let not_found = || RouterError::RouteNotFound {
            method: method.to_string(),
            pattern: pattern.to_string(),
        };
        let root = self.roots.get_mut(method).ok_or_else(not_found)?;
        let leaf = find_leaf_mut(root, &parsed.tokens).ok_or_else(not_found)?;
        let removed = leaf.route.take().ok_or_else(not_found)?;
        prune(root, &parsed.tokens);
        recompute_tsr(root);
        if root.is_empty_leaf() {
            self.roots.remove(method);
        }
        Ok(removed)
    }

    pub fn get(&self, method: &str, parsed: &ParsedPattern) -> Option<Arc<Route>> {
        let root = self.roots.get(method)?;
        find_leaf(root, &parsed.tokens).and_then(|n| n.route.clone())
    }

    pub fn root(&self, method: &str) -> Option<&Node> {
        self.roots.get(method)
    }

    /// Eagerly collects every registered route as `(method, route)`, in
    /// deterministic method-then-pre-order. Cheap on a published
    /// snapshot; capturing it up front gives point-in-time semantics
    /// even if the caller holds it across further writes elsewhere.
    pub fn iter(&self) -> Vec<(String, Arc<Route>)> {
        let mut out = Vec::new();
        for (method, root) in &self.roots {
            collect(root, method, &mut out);
        }
        out
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

fn collect(node: &Node, method: &str, out: &mut Vec<(String, Arc<Route>)>) {
    if let Some(r) = &node.route {
        out.push((method.to_string(), r.clone()));
    }
    for child in &node.statics {
        collect(child, method, out);
    }
    for p in &node.params {
        collect(&p.node, method, out);
    }
    for w in &node.wildcards {
        collect(&w.node, method, out);
    }
}

fn insert_tokens<'n>(mut node: &'n mut Node, tokens: &[Token]) -> &'n mut Node {
    for token in tokens {
        node = match &token.kind {
            TokenKind::Static(s) => insert_static(node, s.as_bytes()),
            TokenKind::Param { name, regex } => insert_dynamic(node, name, regex, false),
            TokenKind::Wildcard { name, regex } => insert_dynamic(node, name, regex, true),
        };
        if token.host_boundary {
            node.is_host_boundary = true;
        }
    }
    node
}

fn insert_static<'n>(mut node: &'n mut Node, mut bytes: &[u8]) -> &'n mut Node {
    while !bytes.is_empty() {
        let first = bytes[0];
        match node.find_static(first) {
            None => {
                let new_node = Box::new(Node::new(bytes.to_vec()));
                node.insert_static_sorted(new_node);
                let idx = node.find_static(first).unwrap();
                node = node.statics[idx].as_mut();
                bytes = &bytes[bytes.len()..];
            }
            Some(idx) => {
                let child_len = node.statics[idx].prefix.len();
                let common = common_prefix_len(&node.statics[idx].prefix, bytes);
                if common < child_len {
                    split_child(node, idx, common);
                }
                node = node.statics[idx].as_mut();
                bytes = &bytes[common..];
            }
        }
    }
    node
}

/// Splits the static child at `idx` so its prefix becomes exactly
/// `common` bytes long, demoting the remainder to a new single child
/// of the split-off node.
fn split_child(parent: &mut Node, idx: usize, common: usize) {
    let mut old = std::mem::replace(&mut parent.statics[idx], Box::new(Node::new(Vec::new())));
    let suffix = old.prefix[common..].to_vec();
    let mut intermediate = Node::new(old.prefix[..common].to_vec());
    old.prefix = suffix;
    intermediate.statics.push(old);
    parent.statics[idx] = Box::new(intermediate);
}

fn insert_dynamic<'n>(
    node: &'n mut Node,
    name: &str,
    regex: &Option<Arc<Regex>>,
    is_wildcard: bool,
) -> &'n mut Node {
    let children = if is_wildcard {
        &mut node.wildcards
    } else {
        &mut node.params
    };
    if Node::find_dynamic(children, regex).is_none() {
        children.push(DynamicChild {
            name: name.to_string(),
            regex: regex.clone(),
            node: Box::new(Node::new(Vec::new())),
        });
    }
    Node::find_dynamic(children, regex).unwrap().node.as_mut()
}

fn find_leaf_mut<'n>(mut node: &'n mut Node, tokens: &[Token]) -> Option<&'n mut Node> {
    for token in tokens {
        node = match &token.kind {
            TokenKind::Static(s) => find_static_mut(node, s.as_bytes())?,
            TokenKind::Param { regex, .. } => {
                Node::find_dynamic(&mut node.params, regex)?.node.as_mut()
            }
            TokenKind::Wildcard { regex, .. } => {
                Node::find_dynamic(&mut node.wildcards, regex)?.node.as_mut()
            }
        };
    }
    Some(node)
}

fn find_static_mut<'n>(mut node: &'n mut Node, mut bytes: &[u8]) -> Option<&'n mut Node> {
    while !bytes.is_empty() {
        let idx = node.find_static(bytes[0])?;
        let child_len = node.statics[idx].prefix.len();
        if common_prefix_len(&node.statics[idx].prefix, bytes) != child_len {
            return None;
        }
        node = node.statics[idx].as_mut();
        bytes = &bytes[child_len..];
    }
    Some(node)
}

fn find_leaf<'n>(mut node: &'n Node, tokens: &[Token]) -> Option<&'n Node> {
    for token in tokens {
        node = match &token.kind {
            TokenKind::Static(s) => find_static(node, s.as_bytes())?,
            TokenKind::Param { regex, .. } => {
                &Node::find_dynamic_ref(&node.params, regex)?.node
            }
            TokenKind::Wildcard { regex, .. } => {
                &Node::find_dynamic_ref(&node.wildcards, regex)?.node
            }
        };
    }
    Some(node)
}

fn find_static<'n>(mut node: &'n Node, mut bytes: &[u8]) -> Option<&'n Node> {
    while !bytes.is_empty() {
        let child = node.find_static_ref(bytes[0])?;
        if common_prefix_len(&child.prefix, bytes) != child.prefix.len() {
            return None;
        }
        bytes = &bytes[child.prefix.len()..];
        node = child;
    }
    Some(node)
}

fn prune(node: &mut Node, tokens: &[Token]) {
    let Some((first, rest)) = tokens.split_first() else {
        return;
    };
    match &first.kind {
        TokenKind::Static(s) => prune_static_bytes(node, s.as_bytes(), rest),
        TokenKind::Param { regex, .. } => prune_dynamic(&mut node.params, regex, rest),
        TokenKind::Wildcard { regex, .. } => prune_dynamic(&mut node.wildcards, regex, rest),
    }
}

fn prune_static_bytes(node: &mut Node, bytes: &[u8], rest: &[Token]) {
    if bytes.is_empty() {
        prune(node, rest);
        return;
    }
    let Some(idx) = node.find_static(bytes[0]) else {
        return;
    };
    let child_len = node.statics[idx].prefix.len().min(bytes.len());
    prune_static_bytes(node.statics[idx].as_mut(), &bytes[child_len..], rest);
    merge_or_remove_static(node, idx);
}

fn prune_dynamic(children: &mut Vec<DynamicChild>, regex: &Option<Arc<Regex>>, rest: &[Token]) {
    let Some(pos) = children.iter().position(|c| c.same_signature(regex)) else {
        return;
    };
    prune(&mut children[pos].node, rest);
    if children[pos].node.is_empty_leaf() {
        children.remove(pos);
    }
}

fn merge_or_remove_static(parent: &mut Node, idx: usize) {
    if parent.statics[idx].is_empty_leaf() {
        parent.statics.remove(idx);
        return;
    }
    let mergeable = {
        let child = &parent.statics[idx];
        child.route.is_none()
            && child.params.is_empty()
            && child.wildcards.is_empty()
            && child.statics.len() == 1
    };
    if mergeable {
        let mut child = std::mem::replace(&mut parent.statics[idx], Box::new(Node::new(Vec::new())));
        let mut grandchild = child.statics.pop().unwrap();
        let mut merged_prefix = child.prefix;
        merged_prefix.extend_from_slice(&grandchild.prefix);
        grandchild.prefix = merged_prefix;
        parent.statics[idx] = grandchild;
    }
}

/// Recomputes `tsr_route` tree-wide. Runs in O(tree size) after every
/// write; writes are rare relative to lookups, so this trades write
/// latency for a branch-free lookup-time check.
fn recompute_tsr(node: &mut Node) {
    for child in node.statics.iter_mut() {
        recompute_tsr(child);
    }
    for p in node.params.iter_mut() {
        recompute_tsr(&mut p.node);
    }
    for w in node.wildcards.iter_mut() {
        recompute_tsr(&mut w.node);
    }

    node.tsr_route = None;
    if let Some(r) = node.route.clone() {
        if let Some(idx) = node.slash_static_child_index() {
            if let Some(child_route) = node.statics[idx].route.clone() {
                node.tsr_route = Some(child_route);
                node.statics[idx].tsr_route = Some(r);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{ParseLimits, Parser};
    use crate::route::test_handler;

    fn parse(pattern: &str) -> ParsedPattern {
        Parser::parse(
            pattern,
            ParseLimits {
                allow_regexp_param: true,
                max_params: None,
                max_param_key_bytes: None,
            },
        )
        .unwrap()
    }

    fn route(pattern: &str) -> Route {
        Route::new(pattern, 0, test_handler())
    }

    #[test]
    fn insert_then_get_roundtrip() {
        let mut tree = Tree::new();
        let parsed = parse("/foo/bar");
        tree.insert("GET", &parsed, route("/foo/bar")).unwrap();
        let found = tree.get("GET", &parsed).unwrap();
        assert_eq!(found.pattern, "/foo/bar");
    }

    #[test]
    fn duplicate_insert_conflicts() {
        let mut tree = Tree::new();
        let parsed = parse("/foo/bar");
        tree.insert("GET", &parsed, route("/foo/bar")).unwrap();
        let err = tree.insert("GET", &parsed, route("/foo/bar")).unwrap_err();
        assert!(matches!(err, RouterError::RouteExist { .. }));
    }

    #[test]
    fn delete_is_inverse_of_insert() {
        let mut tree = Tree::new();
        let parsed_a = parse("/foo/bar");
        let parsed_b = parse("/foo/baz");
        tree.insert("GET", &parsed_a, route("/foo/bar")).unwrap();
        tree.insert("GET", &parsed_b, route("/foo/baz")).unwrap();

        tree.delete("GET", &parsed_a, "/foo/bar").unwrap();
        assert!(tree.get("GET", &parsed_a).is_none());
        assert!(tree.get("GET", &parsed_b).is_some());

        // Re-registering the deleted route must succeed (no leftover leaf).
        tree.insert("GET", &parsed_a, route("/foo/bar")).unwrap();
        assert!(tree.get("GET", &parsed_a).is_some());
    }

    #[test]
    fn delete_missing_route_not_found() {
        let mut tree = Tree::new();
        let parsed = parse("/foo/bar");
        let err = tree.delete("GET", &parsed, "/foo/bar").unwrap_err();
        assert!(matches!(err, RouterError::RouteNotFound { .. }));
    }

    #[test]
    fn delete_removes_method_root_when_tree_becomes_empty() {
        let mut tree = Tree::new();
        let parsed = parse("/foo/bar");
        tree.insert("GET", &parsed, route("/foo/bar")).unwrap();
        tree.delete("GET", &parsed, "/foo/bar").unwrap();
        assert!(tree.root("GET").is_none());
    }

    #[test]
    fn iter_enumerates_every_registered_route_once() {
        let mut tree = Tree::new();
        for p in ["/foo/bar", "/foo/{id}", "/foo/*{rest}"] {
            let parsed = parse(p);
            tree.insert("GET", &parsed, route(p)).unwrap();
        }
        let mut patterns: Vec<String> = tree.iter().into_iter().map(|(_, r)| r.pattern.clone()).collect();
        patterns.sort();
        assert_eq!(patterns, vec!["/foo/*{rest}", "/foo/bar", "/foo/{id}"]);
    }
}
