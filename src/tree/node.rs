use std::sync::Arc;

use regex::Regex;

use crate::route::Route;

/// A child edge keyed by a (possibly absent) regex signature rather
/// than a literal byte: descending into a param/wildcard child
/// matches by regex signature, not by name — the name only labels a
/// capture, it never participates in matching.
#[derive(Clone)]
pub struct DynamicChild {
    pub name: String,
    pub regex: Option<Arc<Regex>>,
    pub node: Box<Node>,
}

impl DynamicChild {
    pub(crate) fn same_signature(&self, regex: &Option<Arc<Regex>>) -> bool {
        match (&self.regex, regex) {
            (None, None) => true,
            (Some(a), Some(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// One node of a per-method radix tree.
///
/// `statics` is kept sorted by the first byte of each child's prefix
/// so lookup and insert can binary-search it. `params` and `wildcards`
/// are kept in registration order; lookup tries regex-constrained
/// entries (in that order) before the single unconstrained one, per
/// so static beats param beats wildcard, and constrained wins over unconstrained.
#[derive(Clone)]
pub struct Node {
    pub prefix: Vec<u8>,
    pub statics: Vec<Box<Node>>,
    pub params: Vec<DynamicChild>,
    pub wildcards: Vec<DynamicChild>,
    pub route: Option<Arc<Route>>,
    pub tsr_route: Option<Arc<Route>>,
    pub is_host_boundary: bool,
}

impl Node {
    pub fn new(prefix: Vec<u8>) -> Self {
        Node {
            prefix,
            statics: Vec::new(),
            params: Vec::new(),
            wildcards: Vec::new(),
            route: None,
            tsr_route: None,
            is_host_boundary: false,
        }
    }

    pub fn is_empty_leaf(&self) -> bool {
        self.route.is_none()
            && self.statics.is_empty()
            && self.params.is_empty()
            && self.wildcards.is_empty()
    }

    /// Index of the static child whose prefix starts with `byte`, if any.
    pub fn find_static(&self, byte: u8) -> Option<usize> {
        self.statics
            .binary_search_by_key(&byte, |n| n.prefix[0])
            .ok()
    }

    pub fn insert_static_sorted(&mut self, node: Box<Node>) {
        let byte = node.prefix[0];
        match self.statics.binary_search_by_key(&byte, |n| n.prefix[0]) {
            Ok(_) => unreachable!("duplicate static first-byte child"),
            Err(pos) => self.statics.insert(pos, node),
        }
    }

    pub fn find_dynamic<'a>(
        children: &'a mut Vec<DynamicChild>,
        regex: &Option<Arc<Regex>>,
    ) -> Option<&'a mut DynamicChild> {
        children.iter_mut().find(|c| c.same_signature(regex))
    }

    pub fn find_dynamic_ref<'a>(
        children: &'a [DynamicChild],
        regex: &Option<Arc<Regex>>,
    ) -> Option<&'a DynamicChild> {
        children.iter().find(|c| c.same_signature(regex))
    }

    /// Index of the static child whose prefix starts with `byte` (immutable variant).
    pub fn find_static_ref(&self, byte: u8) -> Option<&Node> {
        self.find_static(byte).map(|idx| self.statics[idx].as_ref())
    }

    pub fn slash_static_child(&self) -> Option<&Node> {
        self.statics
            .iter()
            .find(|c| c.prefix.as_slice() == b"/")
            .map(|b| b.as_ref())
    }

    pub fn slash_static_child_index(&self) -> Option<usize> {
        self.statics.iter().position(|c| c.prefix.as_slice() == b"/")
    }
}

/// Longest common byte prefix of `a` and `b`.
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
