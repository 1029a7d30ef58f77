//! Prefix-matched proxy rules, compiled once at startup

use regex::Regex;
use reqwest::Url;

use crate::config::RuleConfig;

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule prefix must start with '/': {0:?}")]
    InvalidPrefix(String),

    #[error("invalid upstream target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("upstream target must use http or https: {0:?}")]
    UnsupportedScheme(String),

    #[error("invalid rewrite pattern {pattern:?}: {source}")]
    InvalidRewrite {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
struct CompiledRewrite {
    pattern: Regex,
    replace: String,
}

/// A single compiled proxy rule. Immutable for the lifetime of the
/// server process.
#[derive(Debug, Clone)]
pub struct ProxyRule {
    prefix: String,
    origin: String,
    change_origin: bool,
    secure: bool,
    segment_boundary: bool,
    rewrite: Option<CompiledRewrite>,
}

impl ProxyRule {
    pub fn compile(config: &RuleConfig) -> Result<Self, RuleError> {
        if !config.prefix.starts_with('/') {
            return Err(RuleError::InvalidPrefix(config.prefix.clone()));
        }

        let url = Url::parse(&config.target).map_err(|e| RuleError::InvalidTarget {
            target: config.target.clone(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(RuleError::UnsupportedScheme(config.target.clone()));
        }

        if url.host_str().is_none() {
            return Err(RuleError::InvalidTarget {
                target: config.target.clone(),
                reason: "missing host".to_string(),
            });
        }

        let rewrite = match &config.rewrite {
            Some(rw) => {
                let pattern =
                    Regex::new(&rw.pattern).map_err(|e| RuleError::InvalidRewrite {
                        pattern: rw.pattern.clone(),
                        source: e,
                    })?;
                Some(CompiledRewrite {
                    pattern,
                    replace: rw.replace.clone(),
                })
            }
            None => None,
        };

        let origin = config
            .target
            .strip_suffix('/')
            .unwrap_or(&config.target)
            .to_string();

        Ok(Self {
            prefix: config.prefix.clone(),
            origin,
            change_origin: config.change_origin,
            secure: config.secure,
            segment_boundary: config.segment_boundary,
            rewrite,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn change_origin(&self) -> bool {
        self.change_origin
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn segment_boundary(&self) -> bool {
        self.segment_boundary
    }

    /// Whether this rule claims the given request path.
    pub fn matches(&self, path: &str) -> bool {
        if !path.starts_with(&self.prefix) {
            return false;
        }
        if self.segment_boundary {
            matches!(path.as_bytes().get(self.prefix.len()), None | Some(b'/'))
        } else {
            true
        }
    }

    /// Rewrite a matched path for the upstream. The default rewrite
    /// strips the leading occurrence of the prefix; only the first
    /// occurrence at the start of the path is removed.
    pub fn rewrite_path(&self, path: &str) -> String {
        match &self.rewrite {
            Some(rw) => rw
                .pattern
                .replacen(path, 1, rw.replace.as_str())
                .into_owned(),
            None => path[self.prefix.len()..].to_string(),
        }
    }

    /// Join the rewritten path and original query onto the upstream
    /// origin. An empty path lands on the upstream root; a rewritten
    /// path without a leading '/' gains one here.
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> String {
        let mut url = String::with_capacity(
            self.origin.len() + path.len() + query.map_or(0, |q| q.len() + 1) + 1,
        );
        url.push_str(&self.origin);
        if !path.is_empty() && !path.starts_with('/') {
            url.push('/');
        }
        url.push_str(path);
        if let Some(q) = query {
            url.push('?');
            url.push_str(q);
        }
        url
    }
}

/// Ordered rule collection. Rules are tried in config order; the first
/// match wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ProxyRule>,
}

impl RuleSet {
    pub fn compile(configs: &[RuleConfig]) -> Result<Self, RuleError> {
        let rules = configs
            .iter()
            .map(ProxyRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn find(&self, path: &str) -> Option<&ProxyRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProxyRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
