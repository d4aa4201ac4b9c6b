use super::*;

#[test]
fn test_parse_minimal_config() {
    let yaml = r#"
name: edge
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.name, "edge");
    assert_eq!(config.database.path, "colvault.duckdb");
    assert_eq!(config.database.name, "colvault");
    assert_eq!(config.encryption.key_path, "colvault.key");
    assert_eq!(config.encryption.failure_policy, FailurePolicy::FailFast);
    assert_eq!(config.encryption.batch_size, 500);
    assert!(config.encryption.tables.is_none());
    assert_eq!(config.service.name, "colvault-server");
    assert_eq!(config.service.stop_timeout_secs, 30);
    assert!(config.migration.target_version.is_none());
    config.validate().unwrap();
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
name: edge
database:
  path: data/cv.duckdb
  name: cv-managed
encryption:
  key_path: secrets/cv.key
  failure_policy: best_effort
  batch_size: 50
  tables:
    - table: agents
      identifiers: [agent_id]
      columns:
        - name: password
        - name: azure_options
          json_fields: [client_id, client_secret]
service:
  name: cv-managed
  supervisorctl: /usr/bin/supervisorctl
  stop_timeout_secs: 5
migration:
  target_version: 3
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    config.validate().unwrap();
    assert_eq!(config.database.name, "cv-managed");
    assert_eq!(config.encryption.failure_policy, FailurePolicy::BestEffort);
    assert_eq!(config.encryption.batch_size, 50);
    let tables = config.encryption.tables.as_ref().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].columns[1].json_fields, vec!["client_id", "client_secret"]);
    assert_eq!(config.migration.target_version, Some(3));

    let root = Path::new("/srv/cv");
    assert_eq!(
        config.database_path_absolute(root),
        PathBuf::from("/srv/cv/data/cv.duckdb")
    );
    assert_eq!(
        config.key_path_absolute(root),
        PathBuf::from("/srv/cv/secrets/cv.key")
    );
}

#[test]
fn test_memory_path_is_not_joined() {
    let config: Config = serde_yaml::from_str("name: t\ndatabase:\n  path: \":memory:\"\n").unwrap();
    assert_eq!(
        config.database_path_absolute(Path::new("/srv")),
        PathBuf::from(IN_MEMORY_PATH)
    );
}

#[test]
fn test_unknown_field_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("name: t\nunknown: 1\n");
    assert!(result.is_err());
}

#[test]
fn test_zero_batch_size_rejected() {
    let config: Config =
        serde_yaml::from_str("name: t\nencryption:\n  batch_size: 0\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("batch_size"));
}

#[test]
fn test_empty_name_rejected() {
    let config: Config = serde_yaml::from_str("name: \"\"\n").unwrap();
    assert!(matches!(
        config.validate(),
        Err(CoreError::ConfigInvalid { .. })
    ));
}

#[test]
fn test_dotted_database_name_rejected() {
    let config: Config = serde_yaml::from_str("name: t\ndatabase:\n  name: a.b\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_duplicate_table_rejected() {
    let yaml = r#"
name: t
encryption:
  tables:
    - table: agents
      identifiers: [agent_id]
      columns: [{name: password}]
    - table: agents
      identifiers: [agent_id]
      columns: [{name: username}]
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("more than once"));
}

#[test]
fn test_table_without_identifiers_rejected() {
    let yaml = r#"
name: t
encryption:
  tables:
    - table: agents
      identifiers: []
      columns: [{name: password}]
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_identifier_cannot_be_encrypted() {
    let yaml = r#"
name: t
encryption:
  tables:
    - table: agents
      identifiers: [agent_id]
      columns: [{name: agent_id}]
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_injection_in_column_name_rejected() {
    let yaml = r#"
name: t
encryption:
  tables:
    - table: agents
      identifiers: [agent_id]
      columns: [{name: "password = 'x'; --"}]
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_load_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("colvault.yml"), "name: from_dir\n").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "from_dir");
}

#[test]
fn test_load_from_dir_yaml_extension() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("colvault.yaml"), "name: alt\n").unwrap();
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "alt");
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}
