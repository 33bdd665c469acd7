//! CW-005: Visitor capability interface.
//!
//! A visitor implements any subset of the hooks; every method defaults to a
//! no-op. Hooks may append to the context's output and mutate their own
//! state. The model is only ever handed out by shared reference.

use super::context::Context;
use std::fmt;

/// Error raised from inside a hook.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type HookResult = Result<(), HookError>;

/// Every traversal hook, in the order the engine can fire them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    DocumentBefore,
    Namespace,
    TypesBefore,
    TypeBefore,
    TypeField,
    TypeAfter,
    TypesAfter,
    EnumsBefore,
    EnumBefore,
    EnumValue,
    EnumAfter,
    EnumsAfter,
    UnionsBefore,
    UnionBefore,
    UnionMember,
    UnionAfter,
    UnionsAfter,
    AliasesBefore,
    AliasBefore,
    AliasAfter,
    AliasesAfter,
    DocumentAfter,
}

impl Hook {
    pub const ALL: [Hook; 22] = [
        Hook::DocumentBefore,
        Hook::Namespace,
        Hook::TypesBefore,
        Hook::TypeBefore,
        Hook::TypeField,
        Hook::TypeAfter,
        Hook::TypesAfter,
        Hook::EnumsBefore,
        Hook::EnumBefore,
        Hook::EnumValue,
        Hook::EnumAfter,
        Hook::EnumsAfter,
        Hook::UnionsBefore,
        Hook::UnionBefore,
        Hook::UnionMember,
        Hook::UnionAfter,
        Hook::UnionsAfter,
        Hook::AliasesBefore,
        Hook::AliasBefore,
        Hook::AliasAfter,
        Hook::AliasesAfter,
        Hook::DocumentAfter,
    ];

    /// Method name a script visitor defines for this hook.
    pub fn method_name(self) -> &'static str {
        match self {
            Self::DocumentBefore => "visitDocumentBefore",
            Self::Namespace => "visitNamespace",
            Self::TypesBefore => "visitTypesBefore",
            Self::TypeBefore => "visitTypeBefore",
            Self::TypeField => "visitTypeField",
            Self::TypeAfter => "visitTypeAfter",
            Self::TypesAfter => "visitTypesAfter",
            Self::EnumsBefore => "visitEnumsBefore",
            Self::EnumBefore => "visitEnumBefore",
            Self::EnumValue => "visitEnumValue",
            Self::EnumAfter => "visitEnumAfter",
            Self::EnumsAfter => "visitEnumsAfter",
            Self::UnionsBefore => "visitUnionsBefore",
            Self::UnionBefore => "visitUnionBefore",
            Self::UnionMember => "visitUnionMember",
            Self::UnionAfter => "visitUnionAfter",
            Self::UnionsAfter => "visitUnionsAfter",
            Self::AliasesBefore => "visitAliasesBefore",
            Self::AliasBefore => "visitAliasBefore",
            Self::AliasAfter => "visitAliasAfter",
            Self::AliasesAfter => "visitAliasesAfter",
            Self::DocumentAfter => "visitDocumentAfter",
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Set of hooks a visitor implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HookSet(u32);

impl HookSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        Hook::ALL.iter().fold(Self::empty(), |set, h| set.with(*h))
    }

    pub fn with(mut self, hook: Hook) -> Self {
        self.insert(hook);
        self
    }

    pub fn insert(&mut self, hook: Hook) {
        self.0 |= hook.bit();
    }

    pub fn contains(&self, hook: Hook) -> bool {
        self.0 & hook.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Hook> + '_ {
        Hook::ALL.into_iter().filter(|h| self.contains(*h))
    }
}

/// A generator. Cursor state (current type, field, ...) is read from the context.
#[allow(unused_variables)]
pub trait Visitor {
    /// Hooks this visitor actually implements. Used for diagnostics only;
    /// the engine calls every hook and relies on the no-op defaults.
    fn hooks(&self) -> HookSet {
        HookSet::all()
    }

    fn visit_document_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_namespace(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn visit_types_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_type_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_type_field(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_type_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_types_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn visit_enums_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_enum_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_enum_value(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_enum_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_enums_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn visit_unions_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_union_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_union_member(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_union_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_unions_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn visit_aliases_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_alias_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_alias_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
    fn visit_aliases_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn visit_document_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        Ok(())
    }
}

/// Route a hook to the matching trait method.
pub fn dispatch<V: Visitor + ?Sized>(visitor: &mut V, hook: Hook, ctx: &mut Context<'_>) -> HookResult {
    match hook {
        Hook::DocumentBefore => visitor.visit_document_before(ctx),
        Hook::Namespace => visitor.visit_namespace(ctx),
        Hook::TypesBefore => visitor.visit_types_before(ctx),
        Hook::TypeBefore => visitor.visit_type_before(ctx),
        Hook::TypeField => visitor.visit_type_field(ctx),
        Hook::TypeAfter => visitor.visit_type_after(ctx),
        Hook::TypesAfter => visitor.visit_types_after(ctx),
        Hook::EnumsBefore => visitor.visit_enums_before(ctx),
        Hook::EnumBefore => visitor.visit_enum_before(ctx),
        Hook::EnumValue => visitor.visit_enum_value(ctx),
        Hook::EnumAfter => visitor.visit_enum_after(ctx),
        Hook::EnumsAfter => visitor.visit_enums_after(ctx),
        Hook::UnionsBefore => visitor.visit_unions_before(ctx),
        Hook::UnionBefore => visitor.visit_union_before(ctx),
        Hook::UnionMember => visitor.visit_union_member(ctx),
        Hook::UnionAfter => visitor.visit_union_after(ctx),
        Hook::UnionsAfter => visitor.visit_unions_after(ctx),
        Hook::AliasesBefore => visitor.visit_aliases_before(ctx),
        Hook::AliasBefore => visitor.visit_alias_before(ctx),
        Hook::AliasAfter => visitor.visit_alias_after(ctx),
        Hook::AliasesAfter => visitor.visit_aliases_after(ctx),
        Hook::DocumentAfter => visitor.visit_document_after(ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_cw005_method_names_unique() {
        let names: HashSet<_> = Hook::ALL.iter().map(|h| h.method_name()).collect();
        assert_eq!(names.len(), Hook::ALL.len());
        assert!(names.iter().all(|n| n.starts_with("visit")));
    }

    #[test]
    fn test_cw005_hookset_ops() {
        let mut set = HookSet::empty();
        assert!(set.is_empty());
        set.insert(Hook::TypeField);
        set.insert(Hook::DocumentAfter);
        assert!(set.contains(Hook::TypeField));
        assert!(!set.contains(Hook::TypeBefore));
        assert_eq!(set.len(), 2);
        let hooks: Vec<_> = set.iter().collect();
        assert_eq!(hooks, vec![Hook::TypeField, Hook::DocumentAfter]);
    }

    #[test]
    fn test_cw005_hookset_all() {
        assert_eq!(HookSet::all().len(), Hook::ALL.len());
    }

    #[test]
    fn test_cw005_display_uses_method_name() {
        assert_eq!(Hook::EnumValue.to_string(), "visitEnumValue");
    }
}
