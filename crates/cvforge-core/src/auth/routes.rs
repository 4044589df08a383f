//! Route classification for the auto-login guard.

pub const LANDING_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";
pub const REGISTER_ROUTE: &str = "/register";

/// Routes where a silent login must never start. Landing on them after a
/// failed attempt would otherwise bounce the user straight back into one.
const SUPPRESSED_ROUTES: [&str; 3] = [LANDING_ROUTE, LOGIN_ROUTE, REGISTER_ROUTE];

/// Strip query string, fragment and trailing slash: `/login/?next=/x` -> `/login`.
pub fn normalize(route: &str) -> &str {
    let end = route.find(['?', '#']).unwrap_or(route.len());
    let path = &route[..end];
    match path.trim_end_matches('/') {
        "" => LANDING_ROUTE,
        trimmed => trimmed,
    }
}

pub fn suppresses_auto_login(route: &str) -> bool {
    let path = normalize(route);
    SUPPRESSED_ROUTES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/login?next=/dashboard"), "/login");
        assert_eq!(normalize("/register/"), "/register");
        assert_eq!(normalize("/profile#skills"), "/profile");
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/?ref=ad"), "/");
    }

    #[test]
    fn test_suppressed_routes() {
        assert!(suppresses_auto_login("/"));
        assert!(suppresses_auto_login("/login"));
        assert!(suppresses_auto_login("/register"));
        assert!(suppresses_auto_login("/Login?next=%2Fjobs"));
    }

    #[test]
    fn test_app_routes_allowed() {
        assert!(!suppresses_auto_login("/dashboard"));
        assert!(!suppresses_auto_login("/profile"));
        assert!(!suppresses_auto_login("/resume-builder"));
        assert!(!suppresses_auto_login("/login-help"));
    }
}
