//! Route authorization policy
//!
//! An ordered, first-match-wins table of glob-style path rules, fixed at
//! startup. Anything that matches no rule requires authentication. This is
//! the explicit form of the interceptor-chain matcher list: the route guard
//! consults it on every inbound request before handler dispatch.

/// One path rule
#[derive(Debug, Clone)]
pub struct RouteRule {
    /// Glob-style pattern: exact path, or a `*` suffix for prefix matching
    /// (`/login*` matches `/login` and `/login2`, `/css/*` matches
    /// everything under `/css/`)
    pub pattern: &'static str,
    pub requires_auth: bool,
}

impl RouteRule {
    fn matches(&self, path: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => path.starts_with(prefix),
            None => path == self.pattern,
        }
    }
}

/// Static route authorization table
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    rules: Vec<RouteRule>,
}

impl RoutePolicy {
    /// The application's route table
    ///
    /// Public: landing, login (including `?error=true` retries), error page,
    /// health check, static assets, and the login-flow endpoints themselves.
    /// Everything else requires an authenticated session.
    pub fn new() -> Self {
        Self {
            rules: vec![
                RouteRule { pattern: "/", requires_auth: false },
                RouteRule { pattern: "/login*", requires_auth: false },
                RouteRule { pattern: "/error", requires_auth: false },
                RouteRule { pattern: "/health", requires_auth: false },
                RouteRule { pattern: "/favicon.ico", requires_auth: false },
                RouteRule { pattern: "/css/*", requires_auth: false },
                RouteRule { pattern: "/js/*", requires_auth: false },
                RouteRule { pattern: "/webjars/*", requires_auth: false },
                RouteRule { pattern: "/oauth2/*", requires_auth: false },
                RouteRule { pattern: "/logout", requires_auth: false },
            ],
        }
    }

    /// Whether a request path may be served without a session
    ///
    /// Matches against the path only; a query string is ignored.
    /// Unmatched paths require authentication.
    pub fn is_public(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map(|rule| !rule.requires_auth)
            .unwrap_or(false)
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths() {
        let policy = RoutePolicy::new();
        assert!(policy.is_public("/"));
        assert!(policy.is_public("/login"));
        assert!(policy.is_public("/login?error=true"));
        assert!(policy.is_public("/error"));
        assert!(policy.is_public("/css/app.css"));
        assert!(policy.is_public("/js/vendor/htmx.min.js"));
        assert!(policy.is_public("/webjars/bootstrap/css/bootstrap.css"));
        assert!(policy.is_public("/oauth2/authorize/github"));
        assert!(policy.is_public("/oauth2/callback/github?code=x&state=y"));
    }

    #[test]
    fn protected_paths() {
        let policy = RoutePolicy::new();
        assert!(!policy.is_public("/home"));
        assert!(!policy.is_public("/profile"));
        assert!(!policy.is_public("/api/user"));
        assert!(!policy.is_public("/anything/else"));
    }

    #[test]
    fn root_rule_is_exact_not_prefix() {
        let policy = RoutePolicy::new();
        assert!(policy.is_public("/"));
        assert!(!policy.is_public("/home"));
        assert!(!policy.is_public("/x"));
    }

    #[test]
    fn first_match_wins() {
        let policy = RoutePolicy {
            rules: vec![
                RouteRule { pattern: "/admin/health", requires_auth: false },
                RouteRule { pattern: "/admin/*", requires_auth: true },
            ],
        };
        assert!(policy.is_public("/admin/health"));
        assert!(!policy.is_public("/admin/users"));
    }
}
