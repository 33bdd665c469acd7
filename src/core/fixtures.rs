//! Shared test fixtures.

use super::context::Context;
use super::model::*;
use super::visitor::{HookResult, Visitor};
use crate::error::TargetError;
use crate::loader::VisitorSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// `shop.v1`: two types, one enum, one union, one alias.
pub(crate) fn sample_namespace() -> Namespace {
    let mut ns = Namespace::new("shop.v1");
    ns.types.push(TypeDefinition {
        name: "Order".into(),
        description: Some("A customer order".into()),
        fields: vec![
            Field {
                name: "id".into(),
                ty: AnyType::primitive("string"),
                description: None,
            },
            Field {
                name: "items".into(),
                ty: AnyType::list(AnyType::named_type("Item")),
                description: None,
            },
            Field {
                name: "note".into(),
                ty: AnyType::optional(AnyType::primitive("string")),
                description: None,
            },
        ],
    });
    ns.types.push(TypeDefinition {
        name: "Item".into(),
        description: None,
        fields: vec![Field {
            name: "sku".into(),
            ty: AnyType::primitive("string"),
            description: None,
        }],
    });
    ns.enums.push(EnumDefinition {
        name: "Status".into(),
        description: None,
        values: vec![
            EnumValue {
                name: "Open".into(),
                index: 0,
                display: None,
                description: None,
            },
            EnumValue {
                name: "Closed".into(),
                index: 1,
                display: None,
                description: None,
            },
        ],
    });
    ns.unions.push(UnionDefinition {
        name: "Payment".into(),
        description: None,
        members: vec![AnyType::named_type("Card"), AnyType::named_type("Cash")],
    });
    ns.aliases.push(AliasDefinition {
        name: "Sku".into(),
        description: None,
        ty: AnyType::primitive("string"),
    });
    ns
}


/// Writes one line per type and counts every hook it receives.
pub(crate) struct CountingVisitor {
    pub(crate) calls: Arc<AtomicUsize>,
    pub(crate) prefix: String,
}

impl Visitor for CountingVisitor {
    fn visit_document_before(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn visit_namespace(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let header = match ctx.config_str("header") {
            Some(h) => format!("{}{} {}", self.prefix, h, ctx.namespace().name),
            None => format!("{}{}", self.prefix, ctx.namespace().name),
        };
        ctx.writeln(&header);
        Ok(())
    }

    fn visit_type_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(t) = ctx.current_type() {
            ctx.writeln(&format!("type {}", t.name));
        }
        Ok(())
    }

    fn visit_document_after(&mut self, _ctx: &mut Context<'_>) -> HookResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory visitor registry keyed by `(module, export)`.
#[derive(Default)]
pub(crate) struct StaticSource {
    calls: Arc<AtomicUsize>,
    prefixes: HashMap<(String, String), String>,
}

impl StaticSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a counting visitor that prefixes its namespace line.
    pub(crate) fn with(mut self, module: &str, export: &str, prefix: &str) -> Self {
        self.prefixes
            .insert((module.to_string(), export.to_string()), prefix.to_string());
        self
    }

    /// Total hooks fired across every instance.
    pub(crate) fn hook_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VisitorSource for StaticSource {
    fn instantiate(&self, module: &str, export: &str) -> Result<Box<dyn Visitor>, TargetError> {
        match self.prefixes.get(&(module.to_string(), export.to_string())) {
            Some(prefix) => Ok(Box::new(CountingVisitor {
                calls: Arc::clone(&self.calls),
                prefix: prefix.clone(),
            })),
            None => Err(TargetError::ModuleLoad {
                module: module.to_string(),
                message: "no such module".to_string(),
            }),
        }
    }
}
