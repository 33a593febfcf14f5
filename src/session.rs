//! UX marker cookie set after the admin check passes. It only tells the
//! console to skip the sign-in screen; every protected load still checks the
//! signed-in email against `admin_users`.

use crate::config::SessionConfig;

pub fn admin_cookie(config: &SessionConfig) -> String {
    format!(
        "{}=1; Path=/; Max-Age={}; SameSite=Lax",
        config.cookie_name, config.max_age_seconds
    )
}

pub fn clear_admin_cookie(config: &SessionConfig) -> String {
    format!("{}=; Path=/; Max-Age=0; SameSite=Lax", config.cookie_name)
}

/// Whether a `Cookie` request header carries the marker.
pub fn has_admin_cookie(cookie_header: &str, config: &SessionConfig) -> bool {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .any(|(name, value)| name == config.cookie_name && !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let config = SessionConfig::default();
        assert_eq!(
            admin_cookie(&config),
            "snapwin_admin=1; Path=/; Max-Age=28800; SameSite=Lax"
        );
        assert_eq!(
            clear_admin_cookie(&config),
            "snapwin_admin=; Path=/; Max-Age=0; SameSite=Lax"
        );
    }

    #[test]
    fn test_has_admin_cookie() {
        let config = SessionConfig::default();
        assert!(has_admin_cookie("theme=dark; snapwin_admin=1", &config));
        assert!(!has_admin_cookie("snapwin_admin=", &config));
        assert!(!has_admin_cookie("other=1", &config));
    }
}
