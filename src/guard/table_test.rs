use super::*;

#[test]
fn portal_table_is_valid() {
    assert_eq!(RouteTable::portal().validate(), Ok(()));
}

#[test]
fn every_protected_prefix_classifies_protected() {
    let table = RouteTable::portal();
    for prefix in PROTECTED_PREFIXES {
        assert_eq!(table.classify(prefix), RouteClass::Protected, "{prefix}");
        assert_eq!(table.classify(&format!("{prefix}/123")), RouteClass::Protected, "{prefix}/123");
    }
}

#[test]
fn prefix_requires_segment_boundary() {
    let table = RouteTable::portal();
    assert_eq!(table.classify("/patients/123"), RouteClass::Protected);
    assert_eq!(table.classify("/patients/123/notes"), RouteClass::Protected);
    assert_eq!(table.classify("/patientsfoo"), RouteClass::Neutral);
    assert_eq!(table.classify("/dashboards"), RouteClass::Neutral);
}

#[test]
fn auth_only_paths_match_exactly() {
    let table = RouteTable::portal();
    for path in AUTH_ONLY_PATHS {
        assert_eq!(table.classify(path), RouteClass::AuthOnly, "{path}");
    }
    assert_eq!(table.classify("/login/help"), RouteClass::Neutral);
    assert_eq!(table.classify("/register2"), RouteClass::Neutral);
}

#[test]
fn root_and_unknown_paths_are_neutral() {
    let table = RouteTable::portal();
    assert!(table.is_root("/"));
    assert_eq!(table.classify("/"), RouteClass::Neutral);
    assert_eq!(table.classify("/reset-password"), RouteClass::Neutral);
    assert_eq!(table.classify("/api/auth/identity"), RouteClass::Neutral);
}

#[test]
fn overlapping_table_is_rejected() {
    let table = RouteTable { auth_only: &["/login", "/settings/login"], ..RouteTable::portal() };
    assert_eq!(table.validate(), Err(RouteTableError::Overlap("/settings/login")));
}

#[test]
fn login_outside_auth_only_is_rejected() {
    let table = RouteTable { login: "/signin", ..RouteTable::portal() };
    assert_eq!(table.validate(), Err(RouteTableError::LoginNotAuthOnly("/signin")));
}

#[test]
fn dashboard_outside_protected_is_rejected() {
    let table = RouteTable { dashboard: "/home", ..RouteTable::portal() };
    assert_eq!(table.validate(), Err(RouteTableError::DashboardNotProtected("/home")));
}

#[test]
fn exclusions_cover_assets_favicon_and_png() {
    assert!(is_excluded("/favicon.ico"));
    assert!(is_excluded("/static/app.css"));
    assert!(is_excluded("/_image/thumb"));
    assert!(is_excluded("/logo.png"));
    assert!(is_excluded("/patients/photo.png"));
}

#[test]
fn exclusions_do_not_cover_pages() {
    for path in ["/", "/dashboard", "/login", "/patients/123", "/favicon.ico/x", "/static", "/logo.jpg"] {
        assert!(!is_excluded(path), "{path} should be guarded");
    }
}
