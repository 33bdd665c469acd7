//! CW-007: Traversal engine. A fixed pre-order walk driving one visitor.
//!
//! Order:
//! document-before → namespace →
//! types (before, each type: before, fields, after; after) →
//! enums (before, each enum: before, values, after; after) →
//! unions (before, each union: before, members, after; after) →
//! aliases (before, each alias: before, after; after) →
//! document-after
//!
//! The engine never touches storage. The first failing hook aborts the walk.

use super::context::Context;
use super::visitor::{dispatch, Hook, Visitor};
use crate::error::TargetError;

/// Walk the context's namespace, firing hooks on `visitor`.
pub fn traverse<V: Visitor + ?Sized>(visitor: &mut V, ctx: &mut Context<'_>) -> Result<(), TargetError> {
    let ns = ctx.namespace();

    fire(visitor, ctx, Hook::DocumentBefore)?;
    ctx.enter_namespace();
    fire(visitor, ctx, Hook::Namespace)?;

    fire(visitor, ctx, Hook::TypesBefore)?;
    for t in &ns.types {
        ctx.set_type(Some(t));
        fire(visitor, ctx, Hook::TypeBefore)?;
        for f in &t.fields {
            ctx.set_field(Some(f));
            fire(visitor, ctx, Hook::TypeField)?;
        }
        ctx.set_field(None);
        fire(visitor, ctx, Hook::TypeAfter)?;
    }
    ctx.set_type(None);
    fire(visitor, ctx, Hook::TypesAfter)?;

    fire(visitor, ctx, Hook::EnumsBefore)?;
    for e in &ns.enums {
        ctx.set_enum(Some(e));
        fire(visitor, ctx, Hook::EnumBefore)?;
        for v in &e.values {
            ctx.set_enum_value(Some(v));
            fire(visitor, ctx, Hook::EnumValue)?;
        }
        ctx.set_enum_value(None);
        fire(visitor, ctx, Hook::EnumAfter)?;
    }
    ctx.set_enum(None);
    fire(visitor, ctx, Hook::EnumsAfter)?;

    fire(visitor, ctx, Hook::UnionsBefore)?;
    for u in &ns.unions {
        ctx.set_union(Some(u));
        fire(visitor, ctx, Hook::UnionBefore)?;
        for m in &u.members {
            ctx.set_union_member(Some(m));
            fire(visitor, ctx, Hook::UnionMember)?;
        }
        ctx.set_union_member(None);
        fire(visitor, ctx, Hook::UnionAfter)?;
    }
    ctx.set_union(None);
    fire(visitor, ctx, Hook::UnionsAfter)?;

    fire(visitor, ctx, Hook::AliasesBefore)?;
    for a in &ns.aliases {
        ctx.set_alias(Some(a));
        fire(visitor, ctx, Hook::AliasBefore)?;
        fire(visitor, ctx, Hook::AliasAfter)?;
    }
    ctx.set_alias(None);
    fire(visitor, ctx, Hook::AliasesAfter)?;

    fire(visitor, ctx, Hook::DocumentAfter)?;
    Ok(())
}

fn fire<V: Visitor + ?Sized>(visitor: &mut V, ctx: &mut Context<'_>, hook: Hook) -> Result<(), TargetError> {
    dispatch(visitor, hook, ctx).map_err(|e| {
        let node = ctx.cursor().describe();
        tracing::debug!(output = ctx.target(), %hook, %node, "hook failed");
        TargetError::VisitorRuntime {
            hook: hook.method_name().to_string(),
            node,
            message: e.0,
        }
    })
}
