use crate::error::RouterError;
use crate::pattern::ParseLimits;
use crate::route::{FixedPath, TrailingSlash};

/// In-process builder configuration for a `Router`.
///
/// Unlike the rest of the pack this crate was pulled from,
/// `RouterOptions` is not file- or environment-sourced: a caller
/// embedding this router constructs one directly and passes it to
/// `Router::new`. There is no config file format, no env var
/// precedence chain, and no hot-reload — those concerns belong to
/// whatever process wires this crate into a server.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub trailing_slash: TrailingSlash,
    pub fixed_path: FixedPath,
    pub allow_regexp_param: bool,
    pub max_route_params: usize,
    pub max_route_param_key_bytes: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        RouterOptions {
            trailing_slash: TrailingSlash::Strict,
            fixed_path: FixedPath::Strict,
            allow_regexp_param: true,
            max_route_params: 32,
            max_route_param_key_bytes: 64,
        }
    }
}

impl RouterOptions {
    pub fn validate(&self) -> Result<(), RouterError> {
        if self.max_route_params == 0 {
            return Err(RouterError::InvalidConfig {
                reason: "max_route_params must be at least 1".into(),
            });
        }
        if self.max_route_param_key_bytes == 0 {
            return Err(RouterError::InvalidConfig {
                reason: "max_route_param_key_bytes must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn parse_limits(&self) -> ParseLimits {
        ParseLimits {
            allow_regexp_param: self.allow_regexp_param,
            max_params: Some(self.max_route_params),
            max_param_key_bytes: Some(self.max_route_param_key_bytes),
        }
    }
}
