//! CW-004: Config and schema loading with validation.
//!
//! Validates structural constraints of codeweft.yaml before any target runs:
//! - `generates` keys unique, also after path normalization
//! - module, visitorClass and command text non-empty
//! - `policy.jobs` at least 1
//!
//! Schema documents are YAML or JSON serializations of the type model.

use super::model::Namespace;
use super::resolver::normalize_path;
use super::types::*;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a codeweft.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<GenConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;
    parse_config(&content)
}

/// Parse a codeweft.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<GenConfig> {
    serde_yaml_ng::from_str(yaml)
        .map_err(|e| Error::ConfigInvalid(vec![format!("YAML parse error: {}", e)]))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &GenConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.schema.trim().is_empty() {
        errors.push(ValidationError {
            message: "schema must not be empty".to_string(),
        });
    }

    if config.policy.jobs == 0 {
        errors.push(ValidationError {
            message: "policy.jobs must be at least 1".to_string(),
        });
    }

    let mut normalized: HashMap<std::path::PathBuf, &str> = HashMap::new();
    for (path, target) in &config.generates {
        if path.trim().is_empty() {
            errors.push(ValidationError {
                message: "target path must not be empty".to_string(),
            });
            continue;
        }

        let key = normalize_path(Path::new(path));
        if let Some(first) = normalized.insert(key, path) {
            errors.push(ValidationError {
                message: format!("targets '{}' and '{}' write the same file", first, path),
            });
        }

        if target.module.trim().is_empty() {
            errors.push(ValidationError {
                message: format!("target '{}' has no module", path),
            });
        }
        if target.visitor_class.trim().is_empty() {
            errors.push(ValidationError {
                message: format!("target '{}' has no visitorClass", path),
            });
        }
        for (i, cmd) in target.run_after.iter().enumerate() {
            if cmd.command.trim().is_empty() {
                errors.push(ValidationError {
                    message: format!("target '{}' runAfter[{}] has an empty command", path, i),
                });
            }
        }
    }

    errors
}

/// Parse and validate in one step; validation errors become `ConfigInvalid`.
pub fn load_config(path: &Path) -> Result<GenConfig> {
    let config = parse_config_file(path)?;
    let errors = validate_config(&config);
    if errors.is_empty() {
        Ok(config)
    } else {
        Err(Error::ConfigInvalid(
            errors.into_iter().map(|e| e.message).collect(),
        ))
    }
}

/// Load a schema document (`.json` → JSON, anything else → YAML) and check
/// the model invariants.
pub fn load_schema(path: &Path) -> Result<Namespace> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("failed to read schema {}", path.display()), e))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let namespace = if is_json {
        parse_schema_json(&content)
    } else {
        parse_schema_yaml(&content)
    }
    .map_err(|message| Error::SchemaInvalid {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(namespace)
}

fn parse_schema_yaml(content: &str) -> std::result::Result<Namespace, String> {
    let ns: Namespace =
        serde_yaml_ng::from_str(content).map_err(|e| format!("YAML parse error: {}", e))?;
    check_model(ns)
}

fn parse_schema_json(content: &str) -> std::result::Result<Namespace, String> {
    let ns: Namespace =
        serde_json::from_str(content).map_err(|e| format!("JSON parse error: {}", e))?;
    check_model(ns)
}

fn check_model(ns: Namespace) -> std::result::Result<Namespace, String> {
    let errors = ns.validate();
    if errors.is_empty() {
        Ok(ns)
    } else {
        Err(errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
schema: schema.yaml
config:
  package: demo
generates:
  out/types.md:
    module: ./generators/markdown.luau
    visitorClass: MarkdownVisitor
    runAfter:
      - command: echo done
"#;

    #[test]
    fn test_cw004_parse_valid() {
        let config = parse_config(VALID).unwrap();
        assert_eq!(config.schema, "schema.yaml");
        let errors = validate_config(&config);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors.iter().map(|e| &e.message).collect::<Vec<_>>());
    }

    #[test]
    fn test_cw004_parse_invalid_yaml() {
        let result = parse_config("not: [valid: yaml: {{");
        assert!(matches!(result, Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn test_cw004_duplicate_key_is_config_invalid() {
        let yaml = r#"
schema: s.yaml
generates:
  a.txt: { module: m, visitorClass: V }
  a.txt: { module: m, visitorClass: V }
"#;
        assert!(matches!(parse_config(yaml), Err(Error::ConfigInvalid(_))));
    }

    #[test]
    fn test_cw004_normalized_collision() {
        let yaml = r#"
schema: s.yaml
generates:
  out/a.txt: { module: m, visitorClass: V }
  ./out/a.txt: { module: m, visitorClass: V }
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("same file")));
    }

    #[test]
    fn test_cw004_missing_module_and_class() {
        let yaml = r#"
schema: s.yaml
generates:
  a.txt: { module: "", visitorClass: " " }
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("no module")));
        assert!(errors.iter().any(|e| e.message.contains("no visitorClass")));
    }

    #[test]
    fn test_cw004_empty_command() {
        let yaml = r#"
schema: s.yaml
generates:
  a.txt:
    module: m
    visitorClass: V
    runAfter:
      - command: ""
"#;
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("runAfter[0]")));
    }

    #[test]
    fn test_cw004_zero_jobs() {
        let yaml = "schema: s.yaml\npolicy:\n  jobs: 0\n";
        let config = parse_config(yaml).unwrap();
        let errors = validate_config(&config);
        assert!(errors.iter().any(|e| e.message.contains("jobs")));
    }

    #[test]
    fn test_cw004_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codeweft.yaml");
        std::fs::write(&path, VALID).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.generates.len(), 1);
    }

    #[test]
    fn test_cw004_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(&dir.path().join("nope.yaml"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_cw004_load_schema_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(
            &path,
            r#"
name: demo
types:
  - name: User
    fields:
      - { name: id, type: { kind: primitive, name: string } }
"#,
        )
        .unwrap();
        let ns = load_schema(&path).unwrap();
        assert_eq!(ns.name, "demo");
        assert_eq!(ns.types[0].fields[0].name, "id");
    }

    #[test]
    fn test_cw004_load_schema_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(
            &path,
            r#"{"name":"demo","aliases":[{"name":"Id","type":{"kind":"primitive","name":"string"}}]}"#,
        )
        .unwrap();
        let ns = load_schema(&path).unwrap();
        assert_eq!(ns.aliases[0].name, "Id");
    }

    #[test]
    fn test_cw004_load_schema_rejects_invariant_violation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(
            &path,
            r#"
name: demo
aliases:
  - { name: A, type: { kind: alias, name: B } }
  - { name: B, type: { kind: alias, name: A } }
"#,
        )
        .unwrap();
        match load_schema(&path) {
            Err(Error::SchemaInvalid { message, .. }) => assert!(message.contains("alias cycle")),
            other => panic!("expected SchemaInvalid, got {:?}", other),
        }
    }
}
