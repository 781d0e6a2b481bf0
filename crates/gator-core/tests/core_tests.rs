//! Tests for gator-core: errors, configuration loading and validation

use gator_core::*;
use std::io::Write;

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn invalid_specification_keeps_source_chain() {
    let yaml_err = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad indentation");
    let err = Error::invalid_specification_from("could not parse changeset", yaml_err);
    assert!(err.is_specification_error());
    assert!(!err.is_git_error());
    assert_eq!(err.to_string(), "invalid specification: could not parse changeset");
    assert_eq!(
        err.display_chain(),
        "invalid specification: could not parse changeset: bad indentation"
    );
}

#[test]
fn git_operation_display() {
    let err = Error::git_operation("git diff --cached", "fatal: not a git repository");
    assert!(err.is_git_error());
    assert_eq!(
        err.to_string(),
        "git operation failed: git diff --cached - fatal: not a git repository"
    );
}

#[test]
fn io_error_converts() {
    fn read_missing() -> Result<String> {
        Ok(std::fs::read_to_string("/definitely/not/here")?)
    }
    assert!(matches!(read_missing(), Err(Error::Io(_))));
}

// ===========================================================================
// Configuration
// ===========================================================================

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
repositories = ["some-org/some-repo", "some-org/other-repo"]
github_username = "somebody"
github_token = "sometoken"
clone_directory = "/tmp/gator-clones"
labels = ["gator", "dependencies"]
"#
    )
    .unwrap();

    let config = Configuration::load(file.path()).unwrap();
    assert!(!config.dry_run);
    assert_eq!(config.github_domain, "github.com");
    let repos = config.repository_names().unwrap();
    assert_eq!(repos.len(), 2);
    assert_eq!(
        config.clone_path(&repos[1]),
        std::path::PathBuf::from("/tmp/gator-clones/other-repo")
    );
    config.validate().unwrap();
}

#[test]
fn load_missing_file_is_configuration_error() {
    let err = Configuration::load(std::path::Path::new("/no/such/gator.toml")).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn validate_requires_credentials() {
    let config = Configuration::default();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("github_username"));

    let config = Configuration {
        github_username: "somebody".into(),
        ..Configuration::default()
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("github_token"));
}

#[test]
fn validate_rejects_malformed_repository() {
    let config = Configuration {
        github_username: "somebody".into(),
        github_token: "sometoken".into(),
        repositories: vec!["not-a-full-name".into()],
        ..Configuration::default()
    };
    assert!(matches!(config.validate(), Err(Error::Configuration(_))));
}

#[test]
fn wrong_value_type_is_rejected() {
    let err = Configuration::from_toml_str("dry_run = \"yes\"").unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}
