use super::*;

#[test]
fn parses_three_part_path() {
    let path: ColumnPath = "colvault.agents.password".parse().unwrap();
    assert_eq!(path.database(), "colvault");
    assert_eq!(path.table(), "agents");
    assert_eq!(path.column(), "password");
    assert_eq!(path.to_string(), "colvault.agents.password");
}

#[test]
fn database_may_contain_dashes() {
    let path: ColumnPath = "cv-managed.agents.username".parse().unwrap();
    assert_eq!(path.database(), "cv-managed");
}

#[test]
fn rejects_wrong_arity() {
    assert!("agents.password".parse::<ColumnPath>().is_err());
    assert!("a.b.c.d".parse::<ColumnPath>().is_err());
}

#[test]
fn rejects_empty_components() {
    let err = "colvault..password".parse::<ColumnPath>().unwrap_err();
    assert!(err.to_string().contains("table must not be empty"));
}

#[test]
fn serde_uses_dotted_string() {
    let path = ColumnPath::new("colvault", "sso_details", "client_secret").unwrap();
    let json = serde_json::to_string(&path).unwrap();
    assert_eq!(json, r#""colvault.sso_details.client_secret""#);
    let back: ColumnPath = serde_json::from_str(&json).unwrap();
    assert_eq!(back, path);
}

#[test]
fn ordering_groups_by_table() {
    let mut paths = vec![
        ColumnPath::new("db", "sso_details", "access_token").unwrap(),
        ColumnPath::new("db", "agents", "username").unwrap(),
        ColumnPath::new("db", "agents", "password").unwrap(),
    ];
    paths.sort();
    let rendered: Vec<String> = paths.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec!["db.agents.password", "db.agents.username", "db.sso_details.access_token"]
    );
}
