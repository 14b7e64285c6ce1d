use std::sync::Arc;

use crate::params::Params;
use crate::route::{Route, TrailingSlash};
use crate::tree::{DynamicChild, Node};

#[derive(Clone, Copy)]
enum Phase {
    Host,
    Path,
}

enum Outcome<'t> {
    Matched(Arc<Route>),
    Miss { empty_reach: Option<&'t Node> },
}

/// Iterates regex-constrained children first (in registration order),
/// then the single unconstrained one last.
fn ordered(children: &[DynamicChild]) -> impl Iterator<Item = &DynamicChild> {
    children
        .iter()
        .filter(|c| c.regex.is_some())
        .chain(children.iter().filter(|c| c.regex.is_none()))
}

fn better<'t>(current: Option<&'t Node>, candidate: Option<&'t Node>) -> Option<&'t Node> {
    current.or(candidate)
}

/// Backtracking descent over one node, consuming `host_rem` while in
/// `Phase::Host` and then `path_rem` in `Phase::Path`. Static children
/// are tried first, then regex-constrained params/wildcards in
/// registration order, then the unconstrained fallback of each — this
/// is the static-beats-param-beats-wildcard priority order.
fn descend<'p, 't>(
    node: &'t Node,
    phase: Phase,
    host_rem: &'p str,
    path_rem: &'p str,
    params: &mut Params<'p>,
) -> Outcome<'t> {
    let active = match phase {
        Phase::Host => host_rem,
        Phase::Path => path_rem,
    };

    if active.is_empty() {
        return match phase {
            Phase::Host => descend(node, Phase::Path, host_rem, path_rem, params),
            Phase::Path => match &node.route {
                Some(r) => Outcome::Matched(r.clone()),
                None => Outcome::Miss {
                    empty_reach: Some(node),
                },
            },
        };
    }

    let mut best: Option<&'t Node> = None;

    if let Some(idx) = node.find_static(active.as_bytes()[0]) {
        let child = &node.statics[idx];
        let clen = child.prefix.len();
        if active.len() >= clen && active.as_bytes()[..clen] == child.prefix[..] {
            let rest = &active[clen..];
            let outcome = match phase {
                Phase::Host => descend(child, Phase::Host, rest, path_rem, params),
                Phase::Path => descend(child, Phase::Path, host_rem, rest, params),
            };
            match outcome {
                Outcome::Matched(r) => return Outcome::Matched(r),
                Outcome::Miss { empty_reach } => best = better(best, empty_reach),
            }
        } else if matches!(phase, Phase::Path)
            && clen == active.len() + 1
            && child.prefix[clen - 1] == b'/'
            && child.prefix[..active.len()] == *active.as_bytes()
        {
            // A compressed edge spanning exactly `active` + "/": the
            // registered route is one trailing slash longer than what
            // was requested. Surface it so `attempt`'s TSR handling can
            // offer it, symmetric with the longer-than-registered case.
            best = better(best, Some(child.as_ref()));
        }
    }

    let sep = match phase {
        Phase::Host => b'.',
        Phase::Path => b'/',
    };
    let split_at = active
        .as_bytes()
        .iter()
        .position(|&b| b == sep)
        .unwrap_or(active.len());
    let candidate = &active[..split_at];
    let remainder = &active[split_at..];

    if !candidate.is_empty() {
        for child in ordered(&node.params) {
            if let Some(re) = &child.regex {
                if !re.is_match(candidate) {
                    continue;
                }
            }
            let mark = params.len();
            if !params.push(&child.name, candidate) {
                continue;
            }
            let outcome = match phase {
                Phase::Host => descend(&child.node, Phase::Host, remainder, path_rem, params),
                Phase::Path => descend(&child.node, Phase::Path, host_rem, remainder, params),
            };
            match outcome {
                Outcome::Matched(r) => return Outcome::Matched(r),
                Outcome::Miss { empty_reach } => best = better(best, empty_reach),
            }
            params.truncate(mark);
        }
    }

    for child in ordered(&node.wildcards) {
        for len in (0..=active.len()).rev() {
            let candidate = &active[..len];
            let remainder = &active[len..];
            if let Some(re) = &child.regex {
                if !re.is_match(candidate) {
                    continue;
                }
            }
            let mark = params.len();
            if !params.push(&child.name, candidate) {
                continue;
            }
            let outcome = match phase {
                Phase::Host => descend(&child.node, Phase::Host, remainder, path_rem, params),
                Phase::Path => descend(&child.node, Phase::Path, host_rem, remainder, params),
            };
            match outcome {
                Outcome::Matched(r) => return Outcome::Matched(r),
                Outcome::Miss { empty_reach } => best = better(best, empty_reach),
            }
            params.truncate(mark);
        }
    }

    Outcome::Miss { empty_reach: best }
}

fn attempt<'p, 't>(
    root: &'t Node,
    host: &'p str,
    path: &'p str,
    params: &mut Params<'p>,
) -> (Option<Arc<Route>>, bool) {
    let phase_start = if host.is_empty() {
        Phase::Path
    } else {
        Phase::Host
    };
    let outcome = descend(root, phase_start, host, path, params);
    let empty_reach = match outcome {
        Outcome::Matched(r) => return (Some(r), false),
        Outcome::Miss { empty_reach } => empty_reach,
    };

    // TSR case 1: path ends in '/' — retry with the trailing slash
    // trimmed.
    if path.len() > 1 && path.ends_with('/') {
        params.clear();
        let trimmed = &path[..path.len() - 1];
        if let Outcome::Matched(r) = descend(root, phase_start, host, trimmed, params) {
            if r.trailing_slash != TrailingSlash::Strict {
                return (Some(r), true);
            }
        }
        params.clear();
    }

    // TSR case 2: path doesn't end in '/' — either the reached node is
    // itself exactly one trailing slash short of a registered route
    // (compressed-edge case), or it was fully reached without a route
    // of its own and has a '/' child that does (uncompressed case).
    if !path.ends_with('/') {
        if let Some(node) = empty_reach {
            let candidate = node
                .route
                .clone()
                .or_else(|| node.slash_static_child().and_then(|c| c.route.clone()));
            if let Some(r) = candidate {
                if r.trailing_slash != TrailingSlash::Strict {
                    params.clear();
                    return (Some(r), true);
                }
            }
        }
    }

    (None, false)
}

/// Matches `host`+`path` against `root`, falling back to a path-only
/// attempt (patterns with no hostname) if the hostname subtree doesn't
/// match at all — falls back to path-only routes stored under the
/// root with an empty host prefix.
pub fn lookup<'p>(
    root: &Node,
    host: &'p str,
    path: &'p str,
    params: &mut Params<'p>,
) -> (Option<Arc<Route>>, bool) {
    let (route, tsr) = attempt(root, host, path, params);
    if route.is_some() {
        return (route, tsr);
    }
    if host.is_empty() {
        return (None, false);
    }
    params.clear();
    attempt(root, "", path, params)
}
