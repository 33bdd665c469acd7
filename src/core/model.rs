//! CW-001: Type model handed to visitors.
//!
//! A `Namespace` is produced once per run (by an external parser, or loaded
//! from a schema document) and shared read-only by every target.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum nesting of structural types (`List`, `Map`, `Optional`).
pub const MAX_TYPE_DEPTH: usize = 64;

/// Rendering used for kinds this build does not know about.
pub const UNKNOWN_TYPE: &str = "unknown";

// ============================================================================
// Namespace and definitions
// ============================================================================

/// Root of a parsed schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declaration order is output order.
    #[serde(default)]
    pub types: Vec<TypeDefinition>,

    #[serde(default)]
    pub enums: Vec<EnumDefinition>,

    #[serde(default)]
    pub unions: Vec<UnionDefinition>,

    #[serde(default)]
    pub aliases: Vec<AliasDefinition>,
}

/// A named record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub fields: Vec<Field>,
}

/// A field of a `TypeDefinition`. Optionality lives in `ty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: AnyType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,

    pub index: u32,

    /// Human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub members: Vec<AnyType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type")]
    pub ty: AnyType,
}

// ============================================================================
// AnyType
// ============================================================================

/// Any type reference, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnyType {
    Primitive {
        name: String,
    },
    Alias {
        name: String,
    },
    Enum {
        name: String,
    },
    Type {
        name: String,
    },
    Union {
        name: String,
    },
    List {
        #[serde(rename = "type")]
        ty: Box<AnyType>,
    },
    Map {
        #[serde(rename = "keyType")]
        key: Box<AnyType>,
        #[serde(rename = "valueType")]
        value: Box<AnyType>,
    },
    Optional {
        #[serde(rename = "type")]
        ty: Box<AnyType>,
    },
    /// A kind emitted by a newer schema producer.
    #[serde(other)]
    Unknown,
}

/// Discriminant of an `AnyType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Primitive,
    Alias,
    Enum,
    Type,
    Union,
    List,
    Map,
    Optional,
    Unknown,
}

impl Kind {
    pub const ALL: [Kind; 9] = [
        Kind::Primitive,
        Kind::Alias,
        Kind::Enum,
        Kind::Type,
        Kind::Union,
        Kind::List,
        Kind::Map,
        Kind::Optional,
        Kind::Unknown,
    ];
}

impl AnyType {
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive { name: name.into() }
    }

    pub fn named_type(name: impl Into<String>) -> Self {
        Self::Type { name: name.into() }
    }

    pub fn alias(name: impl Into<String>) -> Self {
        Self::Alias { name: name.into() }
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        Self::Enum { name: name.into() }
    }

    pub fn union(name: impl Into<String>) -> Self {
        Self::Union { name: name.into() }
    }

    pub fn list(inner: AnyType) -> Self {
        Self::List {
            ty: Box::new(inner),
        }
    }

    pub fn map(key: AnyType, value: AnyType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Wrap in `Optional`. An already-optional type is returned unchanged.
    pub fn optional(inner: AnyType) -> Self {
        match inner {
            Self::Optional { .. } => inner,
            other => Self::Optional {
                ty: Box::new(other),
            },
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Self::Primitive { .. } => Kind::Primitive,
            Self::Alias { .. } => Kind::Alias,
            Self::Enum { .. } => Kind::Enum,
            Self::Type { .. } => Kind::Type,
            Self::Union { .. } => Kind::Union,
            Self::List { .. } => Kind::List,
            Self::Map { .. } => Kind::Map,
            Self::Optional { .. } => Kind::Optional,
            Self::Unknown => Kind::Unknown,
        }
    }

    /// Name of a named kind; `None` for structural kinds.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Primitive { name }
            | Self::Alias { name }
            | Self::Enum { name }
            | Self::Type { name }
            | Self::Union { name } => Some(name),
            Self::List { .. } | Self::Map { .. } | Self::Optional { .. } | Self::Unknown => None,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional { .. })
    }

    /// Strip one `Optional` wrapper, if present.
    pub fn unwrap_optional(&self) -> &AnyType {
        match self {
            Self::Optional { ty } => ty,
            other => other,
        }
    }
}

/// Render a type in its canonical textual form.
///
/// | kind | rendering |
/// |---|---|
/// | named | the name |
/// | `List(T)` | `T[]` |
/// | `Map(K, V)` | `{K: V}` |
/// | `Optional(T)` | `T` |
/// | unknown | `unknown` |
pub fn expand_type(ty: &AnyType) -> Result<String, ModelError> {
    let mut out = String::new();
    expand_into(ty, 0, &mut out)?;
    Ok(out)
}

fn expand_into(ty: &AnyType, depth: usize, out: &mut String) -> Result<(), ModelError> {
    if depth >= MAX_TYPE_DEPTH {
        return Err(ModelError::TypeDepthExceeded {
            max: MAX_TYPE_DEPTH,
        });
    }
    match ty {
        AnyType::Primitive { name }
        | AnyType::Alias { name }
        | AnyType::Enum { name }
        | AnyType::Type { name }
        | AnyType::Union { name } => out.push_str(name),
        AnyType::List { ty } => {
            expand_into(ty, depth + 1, out)?;
            out.push_str("[]");
        }
        AnyType::Map { key, value } => {
            out.push('{');
            expand_into(key, depth + 1, out)?;
            out.push_str(": ");
            expand_into(value, depth + 1, out)?;
            out.push('}');
        }
        AnyType::Optional { ty } => expand_into(ty, depth + 1, out)?,
        AnyType::Unknown => out.push_str(UNKNOWN_TYPE),
    }
    Ok(())
}

/// Structural depth of a type (named kinds are depth 1).
fn type_depth(ty: &AnyType) -> usize {
    // Iterative so hostile input cannot blow the stack before the depth check.
    let mut stack = vec![(ty, 1usize)];
    let mut max = 0;
    while let Some((t, d)) = stack.pop() {
        max = max.max(d);
        match t {
            AnyType::List { ty } | AnyType::Optional { ty } => stack.push((ty, d + 1)),
            AnyType::Map { key, value } => {
                stack.push((key, d + 1));
                stack.push((value, d + 1));
            }
            _ => {}
        }
    }
    max
}

fn find_nested_optional(ty: &AnyType) -> bool {
    let mut stack = vec![ty];
    while let Some(t) = stack.pop() {
        match t {
            AnyType::Optional { ty } => {
                if ty.is_optional() {
                    return true;
                }
                stack.push(ty);
            }
            AnyType::List { ty } => stack.push(ty),
            AnyType::Map { key, value } => {
                stack.push(key);
                stack.push(value);
            }
            _ => {}
        }
    }
    false
}

// ============================================================================
// Namespace queries and validation
// ============================================================================

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            types: Vec::new(),
            enums: Vec::new(),
            unions: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn find_alias(&self, name: &str) -> Option<&AliasDefinition> {
        self.aliases.iter().find(|a| a.name == name)
    }

    /// Follow an alias chain to the first non-alias type.
    pub fn resolve_alias(&self, name: &str) -> Result<&AnyType, ModelError> {
        let mut chain = vec![name.to_string()];
        let mut current = self
            .find_alias(name)
            .ok_or_else(|| ModelError::UnknownAlias {
                name: name.to_string(),
            })?;
        loop {
            match &current.ty {
                AnyType::Alias { name: next } => {
                    if chain.iter().any(|seen| seen == next) {
                        chain.push(next.clone());
                        return Err(ModelError::AliasCycle { chain });
                    }
                    chain.push(next.clone());
                    current = self
                        .find_alias(next)
                        .ok_or_else(|| ModelError::UnknownAlias { name: next.clone() })?;
                }
                other => return Ok(other),
            }
        }
    }

    /// Every `AnyType` in the namespace with a human-readable location.
    fn type_references(&self) -> Vec<(String, &AnyType)> {
        let mut refs = Vec::new();
        for t in &self.types {
            for f in &t.fields {
                refs.push((format!("{}.{}", t.name, f.name), &f.ty));
            }
        }
        for u in &self.unions {
            for (i, m) in u.members.iter().enumerate() {
                refs.push((format!("union {}[{}]", u.name, i), m));
            }
        }
        for a in &self.aliases {
            refs.push((format!("alias {}", a.name), &a.ty));
        }
        refs
    }

    /// Check the model invariants. Returns every violation found.
    pub fn validate(&self) -> Vec<ModelError> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        let names = self
            .types
            .iter()
            .map(|t| &t.name)
            .chain(self.enums.iter().map(|e| &e.name))
            .chain(self.unions.iter().map(|u| &u.name))
            .chain(self.aliases.iter().map(|a| &a.name));
        for name in names {
            if !seen.insert(name.as_str()) {
                errors.push(ModelError::DuplicateName { name: name.clone() });
            }
        }

        for (location, ty) in self.type_references() {
            if type_depth(ty) > MAX_TYPE_DEPTH {
                errors.push(ModelError::TypeDepthExceeded {
                    max: MAX_TYPE_DEPTH,
                });
                continue;
            }
            if find_nested_optional(ty) {
                errors.push(ModelError::NestedOptional { location });
            }
        }

        for alias in &self.aliases {
            if let Err(e @ ModelError::AliasCycle { .. }) = self.resolve_alias(&alias.name) {
                if !errors.contains(&e) {
                    errors.push(e);
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn string() -> AnyType {
        AnyType::primitive("string")
    }

    #[test]
    fn test_cw001_expand_named_kinds() {
        assert_eq!(expand_type(&string()).unwrap(), "string");
        assert_eq!(expand_type(&AnyType::named_type("User")).unwrap(), "User");
        assert_eq!(expand_type(&AnyType::alias("UUID")).unwrap(), "UUID");
        assert_eq!(expand_type(&AnyType::enumeration("Color")).unwrap(), "Color");
        assert_eq!(expand_type(&AnyType::union("Shape")).unwrap(), "Shape");
    }

    #[test]
    fn test_cw001_expand_optional_list() {
        let t = AnyType::optional(AnyType::list(string()));
        assert_eq!(expand_type(&t).unwrap(), "string[]");
    }

    #[test]
    fn test_cw001_expand_map() {
        let t = AnyType::map(string(), AnyType::named_type("Target"));
        assert_eq!(expand_type(&t).unwrap(), "{string: Target}");
    }

    #[test]
    fn test_cw001_expand_nested_structural() {
        let t = AnyType::optional(AnyType::list(AnyType::map(string(), AnyType::primitive("i64"))));
        assert_eq!(expand_type(&t).unwrap(), "{string: i64}[]");
    }

    #[test]
    fn test_cw001_expand_unknown_sentinel() {
        assert_eq!(expand_type(&AnyType::Unknown).unwrap(), "unknown");
        let t = AnyType::list(AnyType::Unknown);
        assert_eq!(expand_type(&t).unwrap(), "unknown[]");
    }

    #[test]
    fn test_cw001_expand_depth_bounded() {
        let mut t = string();
        for _ in 0..(MAX_TYPE_DEPTH + 5) {
            t = AnyType::list(t);
        }
        assert_eq!(
            expand_type(&t),
            Err(ModelError::TypeDepthExceeded { max: MAX_TYPE_DEPTH })
        );
    }

    #[test]
    fn test_cw001_every_kind_renders() {
        // Adding a variant without a rendering rule fails here, not in production.
        for kind in Kind::ALL {
            let sample = match kind {
                Kind::Primitive => string(),
                Kind::Alias => AnyType::alias("A"),
                Kind::Enum => AnyType::enumeration("E"),
                Kind::Type => AnyType::named_type("T"),
                Kind::Union => AnyType::union("U"),
                Kind::List => AnyType::list(string()),
                Kind::Map => AnyType::map(string(), string()),
                Kind::Optional => AnyType::optional(string()),
                Kind::Unknown => AnyType::Unknown,
            };
            assert_eq!(sample.kind(), kind);
            let rendered = expand_type(&sample).unwrap();
            assert!(!rendered.is_empty());
            if kind != Kind::Unknown {
                assert_ne!(rendered, UNKNOWN_TYPE, "{:?} fell through", kind);
            }
        }
    }

    #[test]
    fn test_cw001_optional_collapses() {
        let once = AnyType::optional(string());
        let twice = AnyType::optional(once.clone());
        assert_eq!(once, twice);
        assert!(twice.is_optional());
        assert_eq!(twice.unwrap_optional(), &string());
    }

    #[test]
    fn test_cw001_name_accessor() {
        assert_eq!(AnyType::named_type("User").name(), Some("User"));
        assert_eq!(AnyType::list(string()).name(), None);
        assert_eq!(AnyType::Unknown.name(), None);
    }

    #[test]
    fn test_cw001_deserialize_tagged_kinds() {
        let yaml = r#"
kind: map
keyType: { kind: primitive, name: string }
valueType:
  kind: optional
  type: { kind: list, type: { kind: type, name: Target } }
"#;
        let t: AnyType = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(
            t,
            AnyType::map(string(), AnyType::optional(AnyType::list(AnyType::named_type("Target"))))
        );
        assert_eq!(expand_type(&t).unwrap(), "{string: Target[]}");
    }

    #[test]
    fn test_cw001_deserialize_unknown_kind() {
        let t: AnyType = serde_json::from_str(r#"{"kind":"stream"}"#).unwrap();
        assert_eq!(t, AnyType::Unknown);
    }

    #[test]
    fn test_cw001_namespace_roundtrip_order() {
        let yaml = r#"
name: demo.v1
types:
  - name: User
    fields:
      - { name: id, type: { kind: primitive, name: string } }
      - { name: email, type: { kind: optional, type: { kind: primitive, name: string } } }
      - { name: age, type: { kind: primitive, name: u8 } }
"#;
        let ns: Namespace = serde_yaml_ng::from_str(yaml).unwrap();
        let fields: Vec<_> = ns.types[0].fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["id", "email", "age"]);
        assert!(ns.validate().is_empty());
    }

    fn ns_with_aliases(aliases: &[(&str, AnyType)]) -> Namespace {
        let mut ns = Namespace::new("test");
        for (name, ty) in aliases {
            ns.aliases.push(AliasDefinition {
                name: name.to_string(),
                description: None,
                ty: ty.clone(),
            });
        }
        ns
    }

    #[test]
    fn test_cw001_resolve_alias_chain() {
        let ns = ns_with_aliases(&[("A", AnyType::alias("B")), ("B", string())]);
        assert_eq!(ns.resolve_alias("A").unwrap(), &string());
    }

    #[test]
    fn test_cw001_resolve_alias_cycle() {
        let ns = ns_with_aliases(&[("A", AnyType::alias("B")), ("B", AnyType::alias("A"))]);
        match ns.resolve_alias("A") {
            Err(ModelError::AliasCycle { chain }) => assert_eq!(chain, vec!["A", "B", "A"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_cw001_resolve_alias_unknown() {
        let ns = ns_with_aliases(&[("A", AnyType::alias("Missing"))]);
        assert!(matches!(
            ns.resolve_alias("A"),
            Err(ModelError::UnknownAlias { .. })
        ));
    }

    #[test]
    fn test_cw001_validate_nested_optional() {
        let mut ns = Namespace::new("test");
        ns.types.push(TypeDefinition {
            name: "T".into(),
            description: None,
            fields: vec![Field {
                name: "f".into(),
                // Built by hand; the constructor would collapse it.
                ty: AnyType::Optional {
                    ty: Box::new(AnyType::Optional {
                        ty: Box::new(string()),
                    }),
                },
                description: None,
            }],
        });
        let errors = ns.validate();
        assert_eq!(
            errors,
            vec![ModelError::NestedOptional {
                location: "T.f".into()
            }]
        );
    }

    #[test]
    fn test_cw001_validate_duplicates_and_cycles() {
        let mut ns = ns_with_aliases(&[("A", AnyType::alias("A"))]);
        ns.types.push(TypeDefinition {
            name: "A".into(),
            description: None,
            fields: vec![],
        });
        let errors = ns.validate();
        assert!(errors.contains(&ModelError::DuplicateName { name: "A".into() }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ModelError::AliasCycle { .. })));
    }

    fn arb_type() -> impl Strategy<Value = AnyType> {
        let leaf = prop_oneof![
            "[a-z]{1,8}".prop_map(AnyType::primitive),
            "[A-Z][a-z]{0,6}".prop_map(AnyType::named_type),
            "[A-Z][a-z]{0,6}".prop_map(AnyType::enumeration),
            Just(AnyType::Unknown),
        ];
        leaf.prop_recursive(6, 32, 2, |inner| {
            prop_oneof![
                inner.clone().prop_map(AnyType::list),
                inner.clone().prop_map(AnyType::optional),
                (inner.clone(), inner).prop_map(|(k, v)| AnyType::map(k, v)),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_expand_total_and_deterministic(t in arb_type()) {
            let a = expand_type(&t).unwrap();
            let b = expand_type(&t).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert!(!a.is_empty());
        }

        #[test]
        fn prop_optional_is_invisible(t in arb_type()) {
            let opt = AnyType::optional(t.clone());
            prop_assert_eq!(expand_type(&opt).unwrap(), expand_type(&t).unwrap());
        }

        #[test]
        fn prop_list_appends_brackets(t in arb_type()) {
            let list = AnyType::list(t.clone());
            prop_assert_eq!(expand_type(&list).unwrap(), format!("{}[]", expand_type(&t).unwrap()));
        }
    }
}
