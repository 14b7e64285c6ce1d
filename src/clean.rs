/// Cleans a request path per the `FixedPath` normalization rule:
/// resolves `.` and `..` segments, collapses consecutive `/`, and
/// preserves a trailing slash if and only if the original path had one.
///
/// This is a pure utility, not wired into `Router::lookup` itself —
/// lookup is the CPU-bound hot path and must not allocate, while
/// cleaning always allocates a new path. A caller honoring
/// `RouterOptions::fixed_path` retries on its own:
///
/// ```ignore
/// let (route, tsr) = router.lookup(method, host, path, &mut params);
/// if route.is_none() && router.options().fixed_path != FixedPath::Strict {
///     let cleaned = radixmux::clean_path(path);
///     params.clear();
///     let (route, _) = router.lookup(method, host, &cleaned, &mut params);
///     // FixedPath::Redirect: the caller redirects to `cleaned`.
///     // FixedPath::Relaxed: the caller serves the match directly.
/// }
/// ```
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }

    let mut cleaned = String::with_capacity(path.len());
    for s in &stack {
        cleaned.push('/');
        cleaned.push_str(s);
    }
    if cleaned.is_empty() {
        cleaned.push('/');
    } else if trailing_slash {
        cleaned.push('/');
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::clean_path;

    #[test]
    fn collapses_consecutive_slashes() {
        assert_eq!(clean_path("/foo//bar"), "/foo/bar");
    }

    #[test]
    fn resolves_dot_and_dotdot_segments() {
        assert_eq!(clean_path("/foo/./bar"), "/foo/bar");
        assert_eq!(clean_path("/foo/../bar"), "/bar");
        assert_eq!(clean_path("/foo//../bar"), "/bar");
    }

    #[test]
    fn preserves_trailing_slash_only_if_present() {
        assert_eq!(clean_path("/foo/bar/"), "/foo/bar/");
        assert_eq!(clean_path("/foo/bar"), "/foo/bar");
    }

    #[test]
    fn empty_path_becomes_root() {
        assert_eq!(clean_path(""), "/");
    }

    #[test]
    fn dotdot_past_root_is_absorbed() {
        assert_eq!(clean_path("/../foo"), "/foo");
        assert_eq!(clean_path("/.."), "/");
    }
}
