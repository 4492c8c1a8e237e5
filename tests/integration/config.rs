//! Configuration loading and backend selection tests.

use gridrun::{create_backend, BackendKind, Config, ConfigError, EventBus};

#[test]
fn test_config_file_selects_grid_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gridrun.yaml");
    std::fs::write(
        &path,
        "backend: grid\ngrid:\n  nodes: \"1:ppn=2\"\n  stdout_dir: /out\n  stderr_dir: /err\n",
    )
    .unwrap();

    let config = Config::from_yaml_file(&path).unwrap();
    assert_eq!(config.backend, BackendKind::Grid);

    let backend = create_backend(&config, EventBus::new());
    assert_eq!(backend.kind(), BackendKind::Grid);
}

#[test]
fn test_default_selection_is_local() {
    let backend = create_backend(&Config::default(), EventBus::new());
    assert_eq!(backend.kind(), BackendKind::Local);
}

#[test]
fn test_unrecognized_backend_name_fails_at_load() {
    let err = Config::from_yaml_str("backend: kubernetes\n").unwrap_err();
    match err {
        ConfigError::UnknownBackend(name) => assert_eq!(name, "kubernetes"),
        other => panic!("expected UnknownBackend, got {:?}", other),
    }
}

#[test]
fn test_grid_tunables_pass_through() {
    let config = Config::from_yaml_str(
        "backend: grid\ngrid:\n  nodes: \"4\"\n  poll_interval_ms: 100\n  abort_grace_ms: 900\n",
    )
    .unwrap();

    assert_eq!(config.grid.poll_interval().as_millis(), 100);
    assert_eq!(config.grid.abort_grace().as_millis(), 900);
    assert_eq!(config.grid.nodes, "4");
}
