//! CW-006: Traversal context. Per-target cursor, merged config and output.

use super::model::{
    AliasDefinition, AnyType, EnumDefinition, EnumValue, Field, Namespace, TypeDefinition,
    UnionDefinition,
};
use super::types::ConfigMap;

/// Position of the traversal inside the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor<'a> {
    pub namespace: Option<&'a Namespace>,
    pub type_def: Option<&'a TypeDefinition>,
    pub field: Option<&'a Field>,
    pub enum_def: Option<&'a EnumDefinition>,
    pub enum_value: Option<&'a EnumValue>,
    pub union_def: Option<&'a UnionDefinition>,
    pub union_member: Option<&'a AnyType>,
    pub alias: Option<&'a AliasDefinition>,
}

impl Cursor<'_> {
    /// Human-readable description of the node under the cursor.
    pub fn describe(&self) -> String {
        if let (Some(t), Some(f)) = (self.type_def, self.field) {
            return format!("field {}.{}", t.name, f.name);
        }
        if let Some(t) = self.type_def {
            return format!("type {}", t.name);
        }
        if let (Some(e), Some(v)) = (self.enum_def, self.enum_value) {
            return format!("enum value {}.{}", e.name, v.name);
        }
        if let Some(e) = self.enum_def {
            return format!("enum {}", e.name);
        }
        if let Some(u) = self.union_def {
            return match self.union_member.and_then(AnyType::name) {
                Some(member) => format!("union member {}.{}", u.name, member),
                None => format!("union {}", u.name),
            };
        }
        if let Some(a) = self.alias {
            return format!("alias {}", a.name);
        }
        match self.namespace {
            Some(ns) => format!("namespace {}", ns.name),
            None => "document".to_string(),
        }
    }
}

/// Mutable state threaded through one target's traversal.
pub struct Context<'a> {
    target: String,
    config: ConfigMap,
    namespace: &'a Namespace,
    cursor: Cursor<'a>,
    output: String,
}

impl<'a> Context<'a> {
    /// `config` must already be merged (target over global).
    pub fn new(target: impl Into<String>, namespace: &'a Namespace, config: ConfigMap) -> Self {
        Self {
            target: target.into(),
            config,
            namespace,
            cursor: Cursor::default(),
            output: String::new(),
        }
    }

    /// Output path this traversal produces.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn config(&self) -> &ConfigMap {
        &self.config
    }

    pub fn config_value(&self, key: &str) -> Option<&serde_yaml_ng::Value> {
        self.config.get(key)
    }

    /// String config value; non-string scalars are rendered.
    pub fn config_str(&self, key: &str) -> Option<String> {
        match self.config.get(key)? {
            serde_yaml_ng::Value::String(s) => Some(s.clone()),
            serde_yaml_ng::Value::Bool(b) => Some(b.to_string()),
            serde_yaml_ng::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn namespace(&self) -> &'a Namespace {
        self.namespace
    }

    pub fn cursor(&self) -> &Cursor<'a> {
        &self.cursor
    }

    pub fn current_type(&self) -> Option<&'a TypeDefinition> {
        self.cursor.type_def
    }

    pub fn current_field(&self) -> Option<&'a Field> {
        self.cursor.field
    }

    pub fn current_enum(&self) -> Option<&'a EnumDefinition> {
        self.cursor.enum_def
    }

    pub fn current_enum_value(&self) -> Option<&'a EnumValue> {
        self.cursor.enum_value
    }

    pub fn current_union(&self) -> Option<&'a UnionDefinition> {
        self.cursor.union_def
    }

    pub fn current_union_member(&self) -> Option<&'a AnyType> {
        self.cursor.union_member
    }

    pub fn current_alias(&self) -> Option<&'a AliasDefinition> {
        self.cursor.alias
    }

    /// Append to the output buffer.
    pub fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub fn writeln(&mut self, text: &str) {
        self.output.push_str(text);
        self.output.push('\n');
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Mutable access to the output buffer, for script bridges.
    pub(crate) fn output_mut(&mut self) -> &mut String {
        &mut self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }

    // Cursor movement is reserved for the engine.

    pub(crate) fn enter_namespace(&mut self) {
        self.cursor = Cursor {
            namespace: Some(self.namespace),
            ..Cursor::default()
        };
    }

    pub(crate) fn set_type(&mut self, t: Option<&'a TypeDefinition>) {
        self.cursor.type_def = t;
        self.cursor.field = None;
    }

    pub(crate) fn set_field(&mut self, f: Option<&'a Field>) {
        self.cursor.field = f;
    }

    pub(crate) fn set_enum(&mut self, e: Option<&'a EnumDefinition>) {
        self.cursor.enum_def = e;
        self.cursor.enum_value = None;
    }

    pub(crate) fn set_enum_value(&mut self, v: Option<&'a EnumValue>) {
        self.cursor.enum_value = v;
    }

    pub(crate) fn set_union(&mut self, u: Option<&'a UnionDefinition>) {
        self.cursor.union_def = u;
        self.cursor.union_member = None;
    }

    pub(crate) fn set_union_member(&mut self, m: Option<&'a AnyType>) {
        self.cursor.union_member = m;
    }

    pub(crate) fn set_alias(&mut self, a: Option<&'a AliasDefinition>) {
        self.cursor.alias = a;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml_ng::Value;

    fn namespace() -> Namespace {
        let mut ns = Namespace::new("demo");
        ns.types.push(TypeDefinition {
            name: "User".into(),
            description: None,
            fields: vec![Field {
                name: "id".into(),
                ty: AnyType::primitive("string"),
                description: None,
            }],
        });
        ns
    }

    #[test]
    fn test_cw006_write_accumulates() {
        let ns = namespace();
        let mut ctx = Context::new("out.txt", &ns, ConfigMap::new());
        ctx.write("a");
        ctx.writeln("b");
        ctx.write("c");
        assert_eq!(ctx.output(), "ab\nc");
        assert_eq!(ctx.into_output(), "ab\nc");
    }

    #[test]
    fn test_cw006_config_access() {
        let ns = namespace();
        let mut config = ConfigMap::new();
        config.insert("package".into(), Value::String("demo".into()));
        config.insert("strict".into(), Value::Bool(true));
        config.insert("nested".into(), Value::Sequence(vec![]));
        let ctx = Context::new("out.txt", &ns, config);
        assert_eq!(ctx.config_str("package").as_deref(), Some("demo"));
        assert_eq!(ctx.config_str("strict").as_deref(), Some("true"));
        assert_eq!(ctx.config_str("nested"), None);
        assert!(ctx.config_value("nested").is_some());
        assert_eq!(ctx.config_str("missing"), None);
    }

    #[test]
    fn test_cw006_cursor_describe() {
        let ns = namespace();
        let mut ctx = Context::new("out.txt", &ns, ConfigMap::new());
        assert_eq!(ctx.cursor().describe(), "document");
        ctx.enter_namespace();
        assert_eq!(ctx.cursor().describe(), "namespace demo");
        ctx.set_type(ns.types.first());
        assert_eq!(ctx.cursor().describe(), "type User");
        ctx.set_field(ns.types[0].fields.first());
        assert_eq!(ctx.cursor().describe(), "field User.id");
        ctx.set_type(None);
        assert_eq!(ctx.current_field().map(|f| f.name.as_str()), None);
    }
}
