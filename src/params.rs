/// Caller-owned capture buffer for a single lookup.
///
/// `Router::lookup` never allocates on a matching or non-matching
/// request; the caller provides a `Params` sized up front (typically
/// via `Params::with_capacity(router.max_route_params())`) and the
/// engine writes borrowed slices of the caller's own `host`/`path`
/// strings into it.
#[derive(Debug, Default)]
pub struct Params<'a> {
    entries: Vec<(&'a str, &'a str)>,
    max: Option<usize>,
}

impl<'a> Params<'a> {
    pub fn new() -> Self {
        Params {
            entries: Vec::new(),
            max: None,
        }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Params {
            entries: Vec::with_capacity(cap),
            max: Some(cap),
        }
    }

    /// Appends a capture. Returns `false` (and drops the write) if the
    /// buffer is already at its configured capacity — lookup treats
    /// this as a non-match rather than panicking, since a caller that
    /// under-sized the buffer relative to `RouterOptions::max_route_params`
    /// made a configuration error, not the request's fault.
    pub(crate) fn push(&mut self, key: &'a str, value: &'a str) -> bool {
        if let Some(max) = self.max {
            if self.entries.len() >= max {
                return false;
            }
        }
        self.entries.push((key, value));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.entries.iter().copied()
    }
}
