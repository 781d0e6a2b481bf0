//! Tests for gator-resources: registry, changeset parsing, built-in filters and code changes

use gator_core::{Capability, Error, ResourceDescriptor, Result};
use gator_resources::*;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const SOME_REGEX_PYTHON_VERSION: &str = r"python\d{1}\.?\d+";
const SOME_FILE_NAME: &str = "foo.txt";
const SOME_DIR_NAME: &str = "some-dir-name";
const ANOTHER_DIR_NAME: &str = "another-dir-name";
const SOME_FILE_CONTENT_PYTHON38: &str = "foobar\npython38";
const SOME_FILE_CONTENT_GIBBERISH: &str = "fhsdjkhgfkjlds";

const SOME_VALID_CHANGESET: &str = r#"
kind: Changeset
version: v1alpha
spec:
  name: time to do a thing
  issueTitle: stuff
  issueBody: other stuff
  filters:
    - kind: RegexFilter
      version: v1alpha
      spec:
        regex: '([ t]+)bo1c2:'
        paths:
          - "asd"
          - k8s.yml
  codeChanges:
    - kind: RegexReplaceCodeChange
      version: v1alpha
      spec:
        replacements:
          - regex: 'black==(22\.1\.0|21\.\w+)'
            replaceTerm: "black==22.3.0"
            paths:
              - "requirements-test.txt"
"#;

const DO_NOTHING_CHANGESET: &str = r#"
kind: Changeset
version: v1alpha
spec:
  name: time to do a thing
  codeChanges:
    - kind: DoNothingCodeChange
      version: v1alpha
      spec:
        someValue: "concrete value"
"#;

fn parse_resource(yaml: &str) -> Result<GatorResource> {
    let registry = ResourceRegistry::with_builtins();
    let node: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
    build_resource(&registry, &node)
}

fn changeset_with(section: &str, resources: &str) -> String {
    format!(
        "kind: Changeset\nversion: v1alpha\nspec:\n  name: some-name\n  {}:\n{}",
        section, resources
    )
}

/// Every file under `root`, relative path to content.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    recursive_path_contents(root)
        .unwrap()
        .map(|(path, content)| (path.strip_prefix(root).unwrap().to_path_buf(), content))
        .collect()
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

// ===========================================================================
// Custom resources used by the registry tests
// ===========================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct DoNothingSpec {
    #[allow(dead_code)]
    some_value: String,
}

#[derive(Debug)]
struct DoNothing;

impl CodeChange for DoNothing {
    fn apply_change(&self, _root: &Path) -> Result<()> {
        Ok(())
    }
}

impl ResourceSpec for DoNothingSpec {
    const KIND: &'static str = "DoNothingCodeChange";
    const VERSION: &'static str = "v1alpha";
    const CAPABILITY: Capability = Capability::CodeChange;

    fn into_behavior(self) -> Result<Behavior> {
        Ok(Behavior::code_change(DoNothing))
    }
}

/// Declares the filter capability but builds a code change.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MislabeledSpec {}

impl ResourceSpec for MislabeledSpec {
    const KIND: &'static str = "MislabeledFilter";
    const VERSION: &'static str = "v1alpha";
    const CAPABILITY: Capability = Capability::Filter;

    fn into_behavior(self) -> Result<Behavior> {
        Ok(Behavior::code_change(DoNothing))
    }
}

/// A hand-written resource type with arbitrary declared capabilities.
struct Declared {
    kind: &'static str,
    capabilities: Vec<Capability>,
}

impl ResourceType for Declared {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(self.kind, "v1alpha")
    }

    fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    fn build(&self, _spec: serde_yaml::Value) -> Result<Behavior> {
        Ok(Behavior::code_change(DoNothing))
    }
}

// ===========================================================================
// ResourceRegistry
// ===========================================================================

#[test]
fn registry_new_is_empty() {
    let registry = ResourceRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.kinds().is_empty());
}

#[test]
fn register_custom_resource_then_parse() {
    let mut registry = ResourceRegistry::with_builtins();
    registry.register_spec::<DoNothingSpec>().unwrap();
    assert!(registry.contains("DoNothingCodeChange"));

    let changeset = build_changeset(&registry, DO_NOTHING_CHANGESET).unwrap();
    assert!(changeset.has_code_changes());
    let tmp = tempfile::tempdir().unwrap();
    for change in changeset.code_changes() {
        change.apply_change(tmp.path()).unwrap();
    }
}

#[test]
fn custom_resource_unknown_to_another_registry() {
    let mut registry = ResourceRegistry::with_builtins();
    registry.register_spec::<DoNothingSpec>().unwrap();

    // Registries are independent values
    let other = ResourceRegistry::with_builtins();
    let err = build_changeset(&other, DO_NOTHING_CHANGESET).unwrap_err();
    assert!(err
        .to_string()
        .contains("No active resources found of kind: DoNothingCodeChange"));
}

#[test]
fn built_behavior_with_wrong_capability_is_specification_error() {
    let mut registry = ResourceRegistry::with_builtins();
    registry.register_spec::<MislabeledSpec>().unwrap();

    let err = build_changeset(
        &registry,
        &changeset_with(
            "filters",
            "    - kind: MislabeledFilter\n      version: v1alpha\n      spec: {}\n",
        ),
    )
    .unwrap_err();
    assert!(err.is_specification_error(), "{}", err);
    assert!(err.to_string().contains("MislabeledFilter declares filter"), "{}", err);
}

#[test]
fn register_without_capability_fails_and_leaves_registry_unchanged() {
    let mut registry = ResourceRegistry::with_builtins();
    let before = registry.kinds();
    let err = registry
        .register(Declared {
            kind: "SomeClass",
            capabilities: vec![],
        })
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResource(_)));
    assert!(err.to_string().contains("filter or the code change"));
    assert_eq!(registry.kinds(), before);
}

#[test]
fn register_with_both_capabilities_fails() {
    let mut registry = ResourceRegistry::new();
    let err = registry
        .register(Declared {
            kind: "Both",
            capabilities: vec![Capability::Filter, Capability::CodeChange],
        })
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResource(_)));
    assert!(registry.is_empty());
}

#[test]
fn register_without_kind_fails() {
    let mut registry = ResourceRegistry::new();
    let err = registry
        .register(Declared {
            kind: "",
            capabilities: vec![Capability::CodeChange],
        })
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResource(_)));
    assert!(err.to_string().contains("non-empty 'kind'"));
    assert!(registry.is_empty());
}

#[test]
fn register_overrides_builtin() {
    let mut registry = ResourceRegistry::with_builtins();
    let count = registry.len();
    registry
        .register(Declared {
            kind: "RegexFilter",
            capabilities: vec![Capability::CodeChange],
        })
        .unwrap();
    assert_eq!(registry.len(), count);

    // The override builds a code change, so it no longer fits under `filters`
    let text = changeset_with(
        "filters",
        "    - kind: RegexFilter\n      version: v1alpha\n      spec: {}\n",
    );
    let err = build_changeset(&registry, &text).unwrap_err();
    assert!(err.to_string().contains("expected a filter"), "{}", err);
}

// ===========================================================================
// build_changeset
// ===========================================================================

#[test]
fn build_changeset_valid() {
    let registry = ResourceRegistry::with_builtins();
    let changeset = build_changeset(&registry, SOME_VALID_CHANGESET).unwrap();
    assert_eq!(changeset.version(), "v1alpha");
    assert_eq!(changeset.name(), "time to do a thing");
    assert_eq!(changeset.issue_title(), Some("stuff"));
    assert_eq!(changeset.issue_body(), Some("other stuff"));
    assert_eq!(changeset.filter_resources().len(), 1);
    assert_eq!(changeset.code_change_resources().len(), 1);

    let filter = &changeset.filter_resources()[0];
    assert_eq!(filter.kind(), "RegexFilter");
    assert_eq!(filter.capability(), Capability::Filter);
    assert_eq!(filter.spec()["paths"][1].as_str(), Some("k8s.yml"));

    let summary = changeset.to_string();
    assert!(summary.contains("RegexReplaceCodeChange/v1alpha [code change]"), "{}", summary);
}

#[test]
fn build_changeset_is_deterministic() {
    let registry = ResourceRegistry::with_builtins();
    let first = build_changeset(&registry, SOME_VALID_CHANGESET).unwrap();
    let second = build_changeset(&registry, SOME_VALID_CHANGESET).unwrap();
    assert_eq!(first, second);

    let renamed = SOME_VALID_CHANGESET.replace("time to do a thing", "another thing");
    assert_ne!(first, build_changeset(&registry, &renamed).unwrap());
}

#[test]
fn build_changeset_invalid_yaml() {
    let registry = ResourceRegistry::with_builtins();
    let err = build_changeset(&registry, "not: real: \n- : -").unwrap_err();
    assert!(err.is_specification_error());
}

#[test]
fn build_changeset_unknown_top_level_field() {
    let registry = ResourceRegistry::with_builtins();
    let err = build_changeset(&registry, "some-unknown-field: value\n").unwrap_err();
    assert!(err.is_specification_error());
    let msg = err.to_string();
    assert!(msg.contains("some-unknown-field"), "{}", msg);
    assert!(msg.contains("missing field(s): kind, version, spec"), "{}", msg);
}

#[test]
fn build_changeset_unknown_spec_field() {
    let registry = ResourceRegistry::with_builtins();
    let text = SOME_VALID_CHANGESET.replace("issueBody", "issue_body");
    let err = build_changeset(&registry, &text).unwrap_err();
    assert!(err.to_string().contains("unknown field(s): issue_body"), "{}", err);
}

#[test]
fn build_changeset_unknown_resource() {
    let registry = ResourceRegistry::with_builtins();
    let text = changeset_with(
        "filters",
        "    - kind: SomeUnknownFilter\n      version: v1alpha\n      spec:\n        stuff: stuff\n",
    );
    let err = build_changeset(&registry, &text).unwrap_err();
    assert!(err.is_specification_error());
    assert!(err.to_string().contains("SomeUnknownFilter"));
    // Parsing never adds kinds
    assert!(!registry.contains("SomeUnknownFilter"));
}

#[test]
fn build_changeset_resource_without_kind() {
    let registry = ResourceRegistry::with_builtins();
    let text = changeset_with(
        "filters",
        "    - version: v1alpha\n      spec:\n        stuff: stuff\n",
    );
    let err = build_changeset(&registry, &text).unwrap_err();
    assert!(err
        .to_string()
        .contains("Resource is not valid, must contain top-level field 'kind'"));
}

#[test]
fn build_changeset_resource_spec_mismatch_wraps_cause() {
    let registry = ResourceRegistry::with_builtins();
    let text = changeset_with(
        "filters",
        "    - kind: RegexFilter\n      version: v1alpha\n      spec:\n        regex: x\n        paths: [a]\n        extra: 1\n",
    );
    let err = build_changeset(&registry, &text).unwrap_err();
    assert!(err
        .to_string()
        .contains("Could not parse resource spec into the corresponding model"));
    assert!(err.display_chain().contains("extra"), "{}", err.display_chain());
}

#[test]
fn build_changeset_resource_version_mismatch() {
    let registry = ResourceRegistry::with_builtins();
    let text = changeset_with(
        "filters",
        "    - kind: RegexFilter\n      version: v2\n      spec:\n        regex: x\n        paths: [a]\n",
    );
    let err = build_changeset(&registry, &text).unwrap_err();
    assert!(err.to_string().contains("unsupported version 'v2'"), "{}", err);
}

#[test]
fn build_changeset_code_change_listed_as_filter() {
    let registry = ResourceRegistry::with_builtins();
    let text = changeset_with(
        "filters",
        "    - kind: RemoveFileCodeChange\n      version: v1alpha\n      spec:\n        files: [a]\n",
    );
    let err = build_changeset(&registry, &text).unwrap_err();
    assert!(err.to_string().contains("filters[0]"), "{}", err);
}

#[test]
fn build_changeset_invalid_regex_fails_before_any_run() {
    let registry = ResourceRegistry::with_builtins();
    let text = changeset_with(
        "filters",
        "    - kind: RegexFilter\n      version: v1alpha\n      spec:\n        regex: '(unclosed'\n        paths: [a]\n",
    );
    assert!(build_changeset(&registry, &text)
        .unwrap_err()
        .is_specification_error());
}

// ===========================================================================
// build_resource
// ===========================================================================

#[test]
fn build_resource_valid() {
    let resource = parse_resource(
        r#"
kind: RegexReplaceCodeChange
version: v1alpha
spec:
  replacements:
    - regex: 'black==22\.1\.0'
      replaceTerm: "black==22.3.0"
      paths:
        - "requirements-test.txt"
"#,
    )
    .unwrap();
    assert_eq!(resource.capability(), Capability::CodeChange);
    assert!(resource.as_code_change().is_some());
    assert!(resource.as_filter().is_none());
}

#[test]
fn build_resource_without_kind() {
    let err = parse_resource("stuff: stuff").unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid specification: Resource is not valid, must contain top-level field 'kind'"
    );
}

#[test]
fn build_resource_nonexistent_kind() {
    let err = parse_resource("kind: nonexistent").unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid specification: No active resources found of kind: nonexistent"
    );
}

#[test]
fn build_resource_missing_fields() {
    let err = parse_resource("kind: RegexFilter").unwrap_err();
    assert!(err.to_string().contains("missing field(s): version, spec"), "{}", err);
}

// ===========================================================================
// RegexFilter
// ===========================================================================

fn python_filter(paths: &[&str]) -> RegexFilter {
    RegexFilter::new(
        SOME_REGEX_PYTHON_VERSION,
        paths.iter().map(|p| p.to_string()).collect(),
    )
    .unwrap()
}

#[test]
fn regex_filter_path_does_not_exist() {
    let tmp = tempfile::tempdir().unwrap();
    for path in [SOME_DIR_NAME, SOME_FILE_NAME] {
        assert!(!python_filter(&[path]).matches(tmp.path()).unwrap());
    }
}

#[test]
fn regex_filter_absolute_path_does_not_exist() {
    let tmp = tempfile::tempdir().unwrap();
    let absolute = tmp.path().join(SOME_FILE_NAME);
    let filter = python_filter(&[absolute.to_str().unwrap()]);
    assert!(!filter.matches(tmp.path()).unwrap());
}

#[test]
fn regex_filter_single_file_match() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), SOME_FILE_NAME, SOME_FILE_CONTENT_PYTHON38);
    assert!(python_filter(&[SOME_FILE_NAME]).matches(tmp.path()).unwrap());
}

#[test]
fn regex_filter_directory_or_nested_file_match() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        &format!("{}/{}", SOME_DIR_NAME, SOME_FILE_NAME),
        SOME_FILE_CONTENT_PYTHON38,
    );
    let nested = format!("{}/{}", SOME_DIR_NAME, SOME_FILE_NAME);
    for path in [SOME_DIR_NAME, nested.as_str()] {
        assert!(python_filter(&[path]).matches(tmp.path()).unwrap(), "{}", path);
    }
}

#[test]
fn regex_filter_match_in_one_of_many_paths() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        &format!("{}/{}", SOME_DIR_NAME, SOME_FILE_NAME),
        SOME_FILE_CONTENT_GIBBERISH,
    );
    write(
        tmp.path(),
        &format!("{}/{}", ANOTHER_DIR_NAME, SOME_FILE_NAME),
        SOME_FILE_CONTENT_PYTHON38,
    );
    let filter = python_filter(&[SOME_DIR_NAME, ANOTHER_DIR_NAME]);
    assert!(filter.matches(tmp.path()).unwrap());
}

#[test]
fn regex_filter_one_specified_dir_missing() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        &format!("{}/{}", ANOTHER_DIR_NAME, SOME_FILE_NAME),
        SOME_FILE_CONTENT_PYTHON38,
    );
    let filter = python_filter(&[SOME_DIR_NAME, ANOTHER_DIR_NAME]);
    assert!(filter.matches(tmp.path()).unwrap());
}

#[test]
fn regex_filter_no_match() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), SOME_FILE_NAME, SOME_FILE_CONTENT_GIBBERISH);
    assert!(!python_filter(&[SOME_FILE_NAME]).matches(tmp.path()).unwrap());
}

#[test]
fn regex_filter_ignores_git_internals() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), ".git/config", SOME_FILE_CONTENT_PYTHON38);
    assert!(!python_filter(&["."]).matches(tmp.path()).unwrap());
}

// ===========================================================================
// Code changes
// ===========================================================================

fn apply(resource_yaml: &str, root: &Path) {
    let resource = parse_resource(resource_yaml).unwrap();
    resource
        .as_code_change()
        .expect("code change")
        .apply_change(root)
        .unwrap();
}

const NEW_FILE: &str = r##"
kind: NewFileCodeChange
version: v1alpha
spec:
  files:
    - filePath: docs/some-dir/README.md
      fileContent: "# hello\n"
    - filePath: existing.txt
      fileContent: "replacement"
"##;

const REGEX_REPLACE_DIR: &str = r#"
kind: RegexReplaceCodeChange
version: v1alpha
spec:
  replacements:
    - regex: 'python3\.8'
      replaceTerm: "python3.10"
      paths: [src, Dockerfile]
"#;

#[test]
fn new_file_creates_parents_and_skips_existing() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "existing.txt", "original");
    apply(NEW_FILE, tmp.path());

    let files = snapshot(tmp.path());
    assert_eq!(files[Path::new("docs/some-dir/README.md")], "# hello\n");
    assert_eq!(files[Path::new("existing.txt")], "original");
}

#[test]
fn new_file_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    apply(NEW_FILE, tmp.path());
    let once = snapshot(tmp.path());
    apply(NEW_FILE, tmp.path());
    assert_eq!(snapshot(tmp.path()), once);
}

#[test]
fn regex_replace_rewrites_every_file_under_paths() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "src/a.py", "#!/usr/bin/env python3.8\n");
    write(tmp.path(), "src/nested/b.cfg", "python3.8 python3.8\n");
    write(tmp.path(), "Dockerfile", "FROM python3.8-slim\n");
    write(tmp.path(), "untouched.txt", "python3.8\n");

    apply(REGEX_REPLACE_DIR, tmp.path());

    let files = snapshot(tmp.path());
    assert_eq!(files[Path::new("src/a.py")], "#!/usr/bin/env python3.10\n");
    assert_eq!(files[Path::new("src/nested/b.cfg")], "python3.10 python3.10\n");
    assert_eq!(files[Path::new("Dockerfile")], "FROM python3.10-slim\n");
    assert_eq!(files[Path::new("untouched.txt")], "python3.8\n");
}

#[test]
fn regex_replace_is_idempotent_and_skips_unchanged_files() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "Dockerfile", "FROM python3.8-slim\n");
    apply(REGEX_REPLACE_DIR, tmp.path());
    let once = snapshot(tmp.path());
    let modified = std::fs::metadata(tmp.path().join("Dockerfile"))
        .unwrap()
        .modified()
        .unwrap();

    apply(REGEX_REPLACE_DIR, tmp.path());
    assert_eq!(snapshot(tmp.path()), once);
    let modified_again = std::fs::metadata(tmp.path().join("Dockerfile"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(modified, modified_again);
}

#[test]
fn regex_replace_missing_paths_are_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    apply(REGEX_REPLACE_DIR, tmp.path());
    assert!(snapshot(tmp.path()).is_empty());
}

#[test]
fn remove_file_missing_is_noop() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "keep.txt", "x");
    apply(
        "kind: RemoveFileCodeChange\nversion: v1alpha\nspec:\n  files: [some-file-dne]\n",
        tmp.path(),
    );
    assert_eq!(snapshot(tmp.path()).len(), 1);
}

#[test]
fn remove_file_removes_emptied_parent_one_level() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "outer/inner/last.txt", "x");
    apply(
        "kind: RemoveFileCodeChange\nversion: v1alpha\nspec:\n  files: [outer/inner/last.txt]\n",
        tmp.path(),
    );
    assert!(!tmp.path().join("outer/inner").exists());
    // Only one level is cleaned up
    assert!(tmp.path().join("outer").is_dir());
}

#[test]
fn remove_file_keeps_non_empty_parent() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "dir/a.txt", "x");
    write(tmp.path(), "dir/b.txt", "y");
    apply(
        "kind: RemoveFileCodeChange\nversion: v1alpha\nspec:\n  files: [dir/a.txt]\n",
        tmp.path(),
    );
    let files = snapshot(tmp.path());
    assert_eq!(files.keys().collect::<Vec<_>>(), vec![Path::new("dir/b.txt")]);
}

// ===========================================================================
// End to end: filter then change a pinned requirement
// ===========================================================================

#[test]
fn requirements_filter_and_replace() {
    let changeset_text = r#"
kind: Changeset
version: v1alpha
spec:
  name: bump black
  filters:
    - kind: RegexFilter
      version: v1alpha
      spec:
        regex: 'python\d\.?\d+'
        paths: [requirements.txt]
  codeChanges:
    - kind: RegexReplaceCodeChange
      version: v1alpha
      spec:
        replacements:
          - regex: '22\.1\.0'
            replaceTerm: "22.3.0"
            paths: [requirements.txt]
"#;
    let original = "# python3.8\nblack==22.1.0\nrequests==2.27.1\n";
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "requirements.txt", original);

    let registry = create_default_registry();
    let changeset = build_changeset(&registry, changeset_text).unwrap();

    let mut filters = changeset.filters();
    assert!(filters.all(|f| f.matches(tmp.path()).unwrap()));
    for change in changeset.code_changes() {
        change.apply_change(tmp.path()).unwrap();
    }

    let updated = std::fs::read_to_string(tmp.path().join("requirements.txt")).unwrap();
    assert_eq!(updated, original.replace("22.1.0", "22.3.0"));
}
