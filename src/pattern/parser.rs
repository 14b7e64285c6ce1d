use super::token::{Token, ParsedPattern};
use crate::error::RouterError;
use regex::Regex;
use std::sync::Arc;

/// Compile-time limits a `Router` enforces while parsing a pattern.
///
/// Grouped into one struct so `Parser::parse` takes a single argument
/// instead of three unrelated bools/options — mirrors how the tree's
/// own options (`RouterOptions`, see `options.rs`) are threaded through
/// the public API.
#[derive(Debug, Clone, Copy)]
pub struct ParseLimits {
    pub allow_regexp_param: bool,
    pub max_params: Option<usize>,
    pub max_param_key_bytes: Option<usize>,
}

impl Default for ParseLimits {
    fn default() -> Self {
        ParseLimits {
            allow_regexp_param: false,
            max_params: None,
            max_param_key_bytes: None,
        }
    }
}

/// Parses and validates a pattern string into a token stream.
pub struct Parser;

impl Parser {
    pub fn parse(pattern: &str, limits: ParseLimits) -> Result<ParsedPattern, RouterError> {
        if pattern.is_empty() {
            return invalid(pattern, "pattern must not be empty");
        }
        if pattern.as_bytes().contains(&0) {
            return invalid(pattern, "pattern must not contain NUL bytes");
        }

        let host_split = find_host_split(pattern)?;
        let (host_part, path_part) = pattern.split_at(host_split);

        let mut tokens = Vec::new();
        if !host_part.is_empty() {
            let mut host_tokens = parse_hostname(pattern, host_part, limits.allow_regexp_param)?;
            if let Some(last) = host_tokens.last_mut() {
                last.host_boundary = true;
            }
            tokens.append(&mut host_tokens);
        }

        let path_tokens = parse_path(pattern, path_part, limits.allow_regexp_param)?;
        validate_no_traversal(pattern, &path_tokens)?;
        tokens.extend(path_tokens);

        let mut param_count = 0usize;
        for t in &tokens {
            match &t.kind {
                super::token::TokenKind::Param { name, .. }
                | super::token::TokenKind::Wildcard { name, .. } => {
                    param_count += 1;
                    if let Some(max) = limits.max_param_key_bytes {
                        if name.len() > max {
                            return Err(RouterError::ParamKeyTooLarge {
                                key: name.clone(),
                                max,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        if let Some(max) = limits.max_params {
            if param_count > max {
                return Err(RouterError::TooManyParams { max });
            }
        }

        Ok(ParsedPattern {
            tokens,
            param_count,
            host_split,
        })
    }
}

fn invalid<T>(pattern: &str, reason: &str) -> Result<T, RouterError> {
    Err(RouterError::InvalidRoute {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    })
}

/// Finds the byte offset of the first depth-0 `/`, i.e. where the path
/// starts. Brace depth is tracked so a `/` inside a `{name:regex}`
/// body never counts (rule 1).
fn find_host_split(pattern: &str) -> Result<usize, RouterError> {
    let mut depth: i32 = 0;
    for (i, b) in pattern.bytes().enumerate() {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return invalid(pattern, "unbalanced '}' in pattern");
                }
            }
            b'/' if depth == 0 => return Ok(i),
            _ => {}
        }
    }
    if depth != 0 {
        return invalid(pattern, "unbalanced '{' in pattern");
    }
    invalid(pattern, "pattern must contain a path (missing '/')")
}

/// Parses `{name}` / `{name:regex}` starting at `chars[start]` which
/// must be `{`. Returns the token and the byte offset just past the
/// matching `}`.
fn parse_dynamic(
    pattern: &str,
    body: &str,
    start: usize,
    is_wildcard: bool,
    allow_regexp_param: bool,
) -> Result<(Token, usize), RouterError> {
    let bytes = body.as_bytes();
    debug_assert_eq!(bytes[start], b'{');
    let mut depth = 0i32;
    let mut end = None;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
        i += 1;
    }
    let end = end.ok_or_else(|| RouterError::InvalidRoute {
        pattern: pattern.to_string(),
        reason: "unterminated '{' in parameter".to_string(),
    })?;

    let inner = &body[start + 1..end];
    let (name, regex_src) = match inner.find(':') {
        Some(idx) => (&inner[..idx], Some(&inner[idx + 1..])),
        None => (inner, None),
    };

    if name.is_empty() {
        return invalid(pattern, "parameter name must not be empty");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return invalid(
            pattern,
            "parameter name may only contain letters, digits, '_' and '.'",
        );
    }

    let regex = match regex_src {
        None => None,
        Some(src) => {
            if !allow_regexp_param {
                return invalid(
                    pattern,
                    "regex-constrained parameters are disabled by router configuration",
                );
            }
            let anchored = format!("^(?:{src})$");
            let re = Regex::new(&anchored).map_err(|e| RouterError::InvalidRoute {
                pattern: pattern.to_string(),
                reason: format!("invalid regex for parameter '{name}': {e}"),
            })?;
            if re.captures_len() > 1 {
                return invalid(
                    pattern,
                    "capturing groups are forbidden in parameter regex; use (?:...)",
                );
            }
            Some(Arc::new(re))
        }
    };

    let token = if is_wildcard {
        Token::wildcard(name, regex)
    } else {
        Token::param(name, regex)
    };
    Ok((token, end + 1))
}

/// Parses the hostname portion (no trailing `/`). Enforces rule 2.
fn parse_hostname(
    pattern: &str,
    host: &str,
    allow_regexp_param: bool,
) -> Result<Vec<Token>, RouterError> {
    if host.len() > 255 {
        return invalid(pattern, "hostname exceeds 255 bytes");
    }

    let mut tokens: Vec<Token> = Vec::new();
    let mut static_buf = String::new();
    let mut label_static_len = 0usize;
    let mut label_dynamic_count = 0usize;
    let mut label_first_static: Option<char> = None;
    let mut label_last_static: Option<char> = None;
    let mut label_first_is_dynamic = false;
    let mut label_last_is_dynamic = false;
    let mut label_nonempty = false;
    let mut host_has_param = false;
    let mut host_all_digits = true;

    let bytes = host.as_bytes();
    let mut i = 0usize;

    macro_rules! flush_static {
        () => {
            if !static_buf.is_empty() {
                tokens.push(Token::static_bytes(std::mem::take(&mut static_buf)));
            }
        };
    }

    let finish_label = |pattern: &str,
                         label_nonempty: bool,
                         label_static_len: usize,
                         label_first_static: Option<char>,
                         label_last_static: Option<char>,
                         label_first_is_dynamic: bool,
                         label_last_is_dynamic: bool|
     -> Result<(), RouterError> {
        if !label_nonempty {
            return invalid(pattern, "hostname labels must not be empty");
        }
        if label_static_len > 63 {
            return invalid(pattern, "hostname label exceeds 63 bytes");
        }
        if !label_first_is_dynamic {
            if let Some(c) = label_first_static {
                if !c.is_ascii_alphanumeric() {
                    return invalid(pattern, "hostname label must begin with an alphanumeric");
                }
            }
        }
        if !label_last_is_dynamic {
            if let Some(c) = label_last_static {
                if !c.is_ascii_alphanumeric() {
                    return invalid(pattern, "hostname label must end with an alphanumeric");
                }
            }
        }
        Ok(())
    };

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'*' => return invalid(pattern, "wildcards are not allowed in the hostname"),
            b'.' => {
                finish_label(
                    pattern,
                    label_nonempty,
                    label_static_len,
                    label_first_static,
                    label_last_static,
                    label_first_is_dynamic,
                    label_last_is_dynamic,
                )?;
                // Kept as literal content in `static_buf` (like `parse_path`
                // keeps '/'), not dropped — the tree matches hostnames byte
                // for byte, dots included.
                static_buf.push('.');
                label_static_len = 0;
                label_dynamic_count = 0;
                label_first_static = None;
                label_last_static = None;
                label_first_is_dynamic = false;
                label_last_is_dynamic = false;
                label_nonempty = false;
                i += 1;
            }
            b'{' => {
                if label_dynamic_count >= 1 {
                    return invalid(
                        pattern,
                        "only one parameter is allowed per hostname label",
                    );
                }
                flush_static!();
                let (token, next) = parse_dynamic(pattern, host, i, false, allow_regexp_param)?;
                host_has_param = true;
                label_dynamic_count += 1;
                label_nonempty = true;
                if label_static_len == 0 && label_first_static.is_none() {
                    label_first_is_dynamic = true;
                }
                label_last_is_dynamic = true;
                tokens.push(token);
                i = next;
            }
            _ => {
                let c = b as char;
                if c.is_ascii_uppercase() {
                    return invalid(pattern, "uppercase letters are not allowed in the hostname");
                }
                if !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
                    return invalid(pattern, "invalid character in hostname label");
                }
                if !c.is_ascii_digit() {
                    host_all_digits = false;
                }
                if label_first_static.is_none() {
                    label_first_static = Some(c);
                }
                label_last_static = Some(c);
                label_last_is_dynamic = false;
                label_static_len += 1;
                label_nonempty = true;
                static_buf.push(c);
                i += 1;
            }
        }
    }
    flush_static!();
    finish_label(
        pattern,
        label_nonempty,
        label_static_len,
        label_first_static,
        label_last_static,
        label_first_is_dynamic,
        label_last_is_dynamic,
    )?;

    if !host_has_param && host_all_digits {
        return invalid(
            pattern,
            "an all-numeric hostname is forbidden unless it contains a parameter",
        );
    }

    Ok(tokens)
}

/// Parses the path portion (starting with `/`). Enforces rule 3/4.
fn parse_path(
    pattern: &str,
    path: &str,
    allow_regexp_param: bool,
) -> Result<Vec<Token>, RouterError> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut static_buf = String::new();
    let mut segment_dynamic_count = 0usize;
    let mut last_dynamic_was_wildcard: Option<bool> = None;
    let mut static_since_last_wildcard = String::new();

    let bytes = path.as_bytes();
    let mut i = 0usize;

    macro_rules! flush_static {
        () => {
            if !static_buf.is_empty() {
                tokens.push(Token::static_bytes(std::mem::take(&mut static_buf)));
            }
        };
    }

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'/' => {
                segment_dynamic_count = 0;
                static_buf.push('/');
                static_since_last_wildcard.push('/');
                i += 1;
            }
            b'*' if i + 1 < bytes.len() && bytes[i + 1] == b'{' => {
                if segment_dynamic_count >= 1 {
                    return invalid(pattern, "only one parameter or wildcard is allowed per path segment");
                }
                if last_dynamic_was_wildcard == Some(true)
                    && static_since_last_wildcard.trim_matches('/').is_empty()
                {
                    return invalid(pattern, "two consecutive wildcard segments are forbidden");
                }
                flush_static!();
                let (token, next) = parse_dynamic(pattern, path, i + 1, true, allow_regexp_param)?;
                segment_dynamic_count += 1;
                last_dynamic_was_wildcard = Some(true);
                static_since_last_wildcard.clear();
                tokens.push(token);
                i = next;
            }
            b'*' => {
                return invalid(pattern, "'*' must be followed by '{name}'");
            }
            b'{' => {
                if segment_dynamic_count >= 1 {
                    return invalid(pattern, "only one parameter or wildcard is allowed per path segment");
                }
                flush_static!();
                let (token, next) = parse_dynamic(pattern, path, i, false, allow_regexp_param)?;
                segment_dynamic_count += 1;
                last_dynamic_was_wildcard = Some(false);
                static_since_last_wildcard.push_str("x");
                tokens.push(token);
                i = next;
            }
            _ => {
                let c = b as char;
                static_buf.push(c);
                static_since_last_wildcard.push(c);
                i += 1;
            }
        }
    }
    flush_static!();

    Ok(tokens)
}

/// Post-pass traversal check (rule 3), run against a reconstruction of
/// the path where every dynamic token is replaced by a neutral
/// placeholder byte. This keeps the check honest against authored
/// static structure without false-positiving on `/` bytes that happen
/// to appear inside a parameter's regex body.
fn validate_no_traversal(pattern: &str, path_tokens: &[Token]) -> Result<(), RouterError> {
    let mut check = String::new();
    for t in path_tokens {
        match &t.kind {
            super::token::TokenKind::Static(s) => check.push_str(s),
            _ => check.push('P'),
        }
    }
    if check.contains("//") || check.contains("/./") || check.contains("/../") {
        return invalid(pattern, "path must not contain '//', '/./' or '/../'");
    }
    if check.ends_with("/.") || check.ends_with("/..") {
        return invalid(pattern, "path must not end with '/.' or '/..'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::token::TokenKind;

    fn limits(allow_regexp_param: bool) -> ParseLimits {
        ParseLimits {
            allow_regexp_param,
            max_params: None,
            max_param_key_bytes: None,
        }
    }

    #[test]
    fn static_only_path() {
        let parsed = Parser::parse("/foo/bar", limits(false)).unwrap();
        assert_eq!(parsed.host_split, 0);
        assert_eq!(parsed.param_count, 0);
        assert_eq!(parsed.tokens.len(), 1);
        assert!(matches!(&parsed.tokens[0].kind, TokenKind::Static(s) if s == "/foo/bar"));
    }

    #[test]
    fn path_param_and_wildcard() {
        let parsed = Parser::parse("/foo/{id}/*{rest}", limits(false)).unwrap();
        assert_eq!(parsed.param_count, 2);
        let kinds: Vec<&TokenKind> = parsed.tokens.iter().map(|t| &t.kind).collect();
        assert!(matches!(kinds[0], TokenKind::Static(s) if s == "/foo/"));
        assert!(matches!(kinds[1], TokenKind::Param { name, .. } if name == "id"));
        assert!(matches!(kinds[2], TokenKind::Static(s) if s == "/"));
        assert!(matches!(kinds[3], TokenKind::Wildcard { name, .. } if name == "rest"));
    }

    #[test]
    fn hostname_is_split_and_boundary_marked() {
        let parsed = Parser::parse("{s}.b.c/x", limits(false)).unwrap();
        assert_eq!(parsed.host_split, 7);
        let last_host_token = parsed
            .tokens
            .iter()
            .take_while(|t| !matches!(&t.kind, TokenKind::Static(s) if s.starts_with('/')))
            .last()
            .unwrap();
        assert!(last_host_token.host_boundary);
    }

    #[test]
    fn regex_param_rejected_unless_allowed() {
        let err = Parser::parse("/foo/{id:[0-9]+}", limits(false)).unwrap_err();
        assert!(matches!(err, RouterError::InvalidRoute { .. }));
        Parser::parse("/foo/{id:[0-9]+}", limits(true)).unwrap();
    }

    #[test]
    fn regex_with_capturing_group_rejected() {
        let err = Parser::parse("/foo/{id:([0-9]+)}", limits(true)).unwrap_err();
        assert!(matches!(err, RouterError::InvalidRoute { .. }));
    }

    #[test]
    fn two_dynamic_tokens_per_segment_rejected() {
        let err = Parser::parse("/foo/{a}{b}", limits(false)).unwrap_err();
        assert!(matches!(err, RouterError::InvalidRoute { .. }));
    }

    #[test]
    fn consecutive_wildcard_segments_rejected() {
        let err = Parser::parse("/foo/*{a}/*{b}", limits(false)).unwrap_err();
        assert!(matches!(err, RouterError::InvalidRoute { .. }));
    }

    #[test]
    fn traversal_sequences_rejected() {
        assert!(Parser::parse("/foo//bar", limits(false)).is_err());
        assert!(Parser::parse("/foo/./bar", limits(false)).is_err());
        assert!(Parser::parse("/foo/../bar", limits(false)).is_err());
    }

    #[test]
    fn all_numeric_hostname_without_param_rejected() {
        let err = Parser::parse("123.456/x", limits(false)).unwrap_err();
        assert!(matches!(err, RouterError::InvalidRoute { .. }));
        Parser::parse("123.{s}/x", limits(false)).unwrap();
    }

    #[test]
    fn param_key_too_large() {
        let mut l = limits(false);
        l.max_param_key_bytes = Some(2);
        let err = Parser::parse("/foo/{abcd}", l).unwrap_err();
        assert!(matches!(err, RouterError::ParamKeyTooLarge { .. }));
    }

    #[test]
    fn too_many_params() {
        let mut l = limits(false);
        l.max_params = Some(1);
        let err = Parser::parse("/foo/{a}/{b}", l).unwrap_err();
        assert!(matches!(err, RouterError::TooManyParams { max: 1 }));
    }

    #[test]
    fn empty_pattern_rejected() {
        assert!(Parser::parse("", limits(false)).is_err());
    }
}
