//! Changeset parser — YAML document to validated, immutable `Changeset`
//!
//! A Changeset bundles the filters that decide whether a repository is in
//! scope with the code changes to apply to it:
//!
//! * filters run first; any filter that does not match excludes the repository
//! * filters all pass and no code changes are declared: an issue is opened
//! * code changes that modify content lead to a pull request
//!
//! Everything is validated here, before any repository is touched.

use crate::model::{CodeChange, Filter, GatorResource};
use crate::registry::ResourceRegistry;
use crate::schema::{self, FieldSet};
use gator_core::{Capability, Error, Result, CHANGESET_KIND, VERSION_V1ALPHA};
use serde_yaml::Value;
use std::fmt;
use tracing::debug;

const DOCUMENT_FIELDS: FieldSet = FieldSet::new(&["kind", "version", "spec"], &[]);
const CHANGESET_SPEC_FIELDS: FieldSet = FieldSet::new(
    &["name"],
    &["issueTitle", "issueBody", "filters", "codeChanges"],
);
const RESOURCE_FIELDS: FieldSet = FieldSet::new(&["kind", "version", "spec"], &[]);

#[derive(Debug, PartialEq)]
pub struct ChangesetSpec {
    name: String,
    issue_title: Option<String>,
    issue_body: Option<String>,
    filters: Vec<GatorResource>,
    code_changes: Vec<GatorResource>,
}

#[derive(Debug, PartialEq)]
pub struct Changeset {
    kind: String,
    version: String,
    spec: ChangesetSpec,
}

impl Changeset {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn spec(&self) -> &ChangesetSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn issue_title(&self) -> Option<&str> {
        self.spec.issue_title.as_deref()
    }

    pub fn issue_body(&self) -> Option<&str> {
        self.spec.issue_body.as_deref()
    }

    /// Title for issues and pull requests; the changeset name when no title is set.
    pub fn issue_title_or_name(&self) -> &str {
        self.issue_title().unwrap_or(&self.spec.name)
    }

    pub fn filter_resources(&self) -> &[GatorResource] {
        &self.spec.filters
    }

    pub fn code_change_resources(&self) -> &[GatorResource] {
        &self.spec.code_changes
    }

    pub fn filters(&self) -> impl Iterator<Item = &dyn Filter> {
        self.spec.filters.iter().filter_map(|r| r.as_filter())
    }

    pub fn code_changes(&self) -> impl Iterator<Item = &dyn CodeChange> {
        self.spec.code_changes.iter().filter_map(|r| r.as_code_change())
    }

    pub fn has_code_changes(&self) -> bool {
        !self.spec.code_changes.is_empty()
    }
}

impl fmt::Display for Changeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' ({}): {} filter(s), {} code change(s)",
            self.kind,
            self.spec.name,
            self.version,
            self.spec.filters.len(),
            self.spec.code_changes.len()
        )?;
        for resource in self.spec.filters.iter().chain(&self.spec.code_changes) {
            write!(f, "\n  - {} [{}]", resource.descriptor(), resource.capability())?;
        }
        Ok(())
    }
}

/// Parse raw YAML into a Changeset, resolving every resource through `registry`.
pub fn build_changeset(registry: &ResourceRegistry, text: &str) -> Result<Changeset> {
    let document: Value = serde_yaml::from_str(text)
        .map_err(|e| Error::invalid_specification_from("Could not parse changeset document", e))?;

    let top = schema::expect_mapping(&document, "changeset")?;
    DOCUMENT_FIELDS.check(top, "changeset")?;

    let kind = schema::required_string(top, "kind", "changeset")?;
    if kind != CHANGESET_KIND {
        return Err(Error::invalid_specification(format!(
            "changeset: expected kind '{}', got '{}'",
            CHANGESET_KIND, kind
        )));
    }
    let version = schema::required_string(top, "version", "changeset")?;
    if version != VERSION_V1ALPHA {
        return Err(Error::invalid_specification(format!(
            "changeset: unsupported version '{}', expected '{}'",
            version, VERSION_V1ALPHA
        )));
    }

    let spec_node = top
        .get("spec")
        .ok_or_else(|| Error::invalid_specification("changeset: missing field(s): spec"))?;
    let spec = schema::expect_mapping(spec_node, "changeset spec")?;
    CHANGESET_SPEC_FIELDS.check(spec, "changeset spec")?;

    let name = schema::required_string(spec, "name", "changeset spec")?;
    let issue_title = schema::optional_string(spec, "issueTitle", "changeset spec")?;
    let issue_body = schema::optional_string(spec, "issueBody", "changeset spec")?;
    let filters = build_list(registry, spec, "filters", Capability::Filter)?;
    let code_changes = build_list(registry, spec, "codeChanges", Capability::CodeChange)?;

    debug!(
        "Built changeset '{}' with {} filter(s) and {} code change(s)",
        name,
        filters.len(),
        code_changes.len()
    );

    Ok(Changeset {
        kind,
        version,
        spec: ChangesetSpec {
            name,
            issue_title,
            issue_body,
            filters,
            code_changes,
        },
    })
}

fn build_list(
    registry: &ResourceRegistry,
    spec: &serde_yaml::Mapping,
    field: &str,
    expected: Capability,
) -> Result<Vec<GatorResource>> {
    let Some(items) = schema::optional_sequence(spec, field, "changeset spec")? else {
        return Ok(Vec::new());
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let resource = build_resource(registry, item)
                .map_err(|e| prefix_error(&format!("{}[{}]", field, i), e))?;
            if resource.capability() != expected {
                return Err(Error::invalid_specification(format!(
                    "{}[{}]: kind '{}' is a {}, expected a {}",
                    field,
                    i,
                    resource.kind(),
                    resource.capability(),
                    expected
                )));
            }
            Ok(resource)
        })
        .collect()
}

/// Build a single resource from an already-parsed `{kind, version, spec}` node.
pub fn build_resource(registry: &ResourceRegistry, node: &Value) -> Result<GatorResource> {
    let map = schema::expect_mapping(node, "resource")?;

    let kind = match map.get("kind") {
        Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
        _ => {
            return Err(Error::invalid_specification(
                "Resource is not valid, must contain top-level field 'kind'",
            ))
        }
    };

    let resource_type = registry.resolve(&kind).ok_or_else(|| {
        Error::invalid_specification(format!("No active resources found of kind: {}", kind))
    })?;

    let context = format!("resource '{}'", kind);
    RESOURCE_FIELDS.check(map, &context)?;

    let descriptor = resource_type.descriptor();
    let version = schema::required_string(map, "version", &context)?;
    if version != descriptor.version {
        return Err(Error::invalid_specification(format!(
            "{}: unsupported version '{}', expected '{}'",
            context, version, descriptor.version
        )));
    }

    let spec = map.get("spec").cloned().unwrap_or(Value::Null);
    let behavior = resource_type.build(spec.clone())?;
    Ok(GatorResource::new(descriptor, spec, behavior))
}

/// Locate a nested error within the document without losing its source.
fn prefix_error(location: &str, err: Error) -> Error {
    match err {
        Error::InvalidSpecification { message, source } => Error::InvalidSpecification {
            message: format!("{}: {}", location, message),
            source,
        },
        other => other,
    }
}
