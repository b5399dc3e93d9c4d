use tracing::warn;

use crate::model::identity::Identity;
use crate::model::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    DailyReport,
    Dashboard,
    ProjectEntry,
    Orders,
    CostSummary,
    WageManager,
}

impl Route {
    pub const ALL: [Route; 8] = [
        Route::Login,
        Route::Register,
        Route::DailyReport,
        Route::Dashboard,
        Route::ProjectEntry,
        Route::Orders,
        Route::CostSummary,
        Route::WageManager,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::DailyReport => "/daily-report",
            Route::Dashboard => "/dashboard",
            Route::ProjectEntry => "/project-entry",
            Route::Orders => "/orders",
            Route::CostSummary => "/cost-summary",
            Route::WageManager => "/wage-manager",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Route::Login => "ログイン",
            Route::Register => "新規登録",
            Route::DailyReport => "日報",
            Route::Dashboard => "ダッシュボード",
            Route::ProjectEntry => "工事登録",
            Route::Orders => "発注入力",
            Route::CostSummary => "原価集計",
            Route::WageManager => "時給管理",
        }
    }

    /// The root path redirects to the login page.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Some(Route::Login);
        }
        Route::ALL.iter().copied().find(|r| r.path() == trimmed)
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Register)
    }

    fn allows(&self, role: Role) -> bool {
        match self {
            Route::WageManager => role.manages_wages(),
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(Route),
    Forbidden,
}

/// Decides whether `identity` may open `route`. Anonymous visitors of a
/// protected route are sent to the login page.
pub fn guard(route: Route, identity: Option<&Identity>) -> Access {
    if route.is_public() {
        return Access::Allow;
    }
    match identity {
        None => Access::Redirect(Route::Login),
        Some(id) if !route.allows(id.role) => {
            warn!("{} ({}) refused access to {}", id.user_id, id.role, route.path());
            Access::Forbidden
        }
        Some(_) => Access::Allow,
    }
}

/// Menu entries shown for a role.
pub fn nav_links(role: Role) -> &'static [Route] {
    match role {
        Role::Worker => &[Route::DailyReport],
        Role::Staff => &[Route::Orders, Route::CostSummary, Route::WageManager],
        Role::Sales => &[Route::ProjectEntry, Route::Orders],
        Role::Unrecognized => &[],
    }
}

/// Page opened right after login.
pub fn landing(role: Role) -> Option<Route> {
    match role {
        Role::Worker => Some(Route::DailyReport),
        Role::Staff => Some(Route::CostSummary),
        Role::Sales => Some(Route::ProjectEntry),
        Role::Unrecognized => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_round_trip_and_root_redirect() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/"), Some(Route::Login));
        assert_eq!(Route::from_path("/order-entry"), None);
    }

    #[test]
    fn test_guard() {
        assert_eq!(guard(Route::Login, None), Access::Allow);
        assert_eq!(guard(Route::Dashboard, None), Access::Redirect(Route::Login));

        let worker = Identity::new("u1", "Sato", Role::Worker);
        assert_eq!(guard(Route::Dashboard, Some(&worker)), Access::Allow);
        assert_eq!(guard(Route::WageManager, Some(&worker)), Access::Forbidden);

        let staff = Identity::new("s1", "Suzuki", Role::Staff);
        assert_eq!(guard(Route::WageManager, Some(&staff)), Access::Allow);
    }

    #[test]
    fn test_links_point_at_real_routes() {
        for role in [Role::Worker, Role::Staff, Role::Sales, Role::Unrecognized] {
            for link in nav_links(role) {
                assert_eq!(Route::from_path(link.path()), Some(*link));
                assert_ne!(guard(*link, Some(&Identity::new("x", "x", role))), Access::Forbidden);
            }
        }
        assert_eq!(landing(Role::Staff), Some(Route::CostSummary));
        assert_eq!(landing(Role::Unrecognized), None);
    }
}
