//! CW-012: Luau visitor bridge.
//!
//! Every instance owns a fresh Luau VM, so no script state leaks between
//! targets. Hooks are instance methods named after `Hook::method_name`,
//! called as `instance:hook(ctx)`.

use super::bundle::Bundle;
use crate::core::context::Context;
use crate::core::model::{expand_type, AnyType};
use crate::core::visitor::{Hook, HookError, HookResult, HookSet, Visitor};
use crate::error::TargetError;
use mlua::{Function, Lua, LuaSerdeExt, SerializeOptions, Table, Value, Variadic};
use serde::Serialize;

/// A visitor implemented by a bundled Luau module.
pub struct LuaVisitor {
    lua: Lua,
    instance: Table,
    hooks: HookSet,
    namespace: Option<Table>,
    config: Option<Table>,
}

fn serialize_options() -> SerializeOptions {
    SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false)
}

impl LuaVisitor {
    /// Execute the bundle and instantiate `export`.
    pub fn instantiate(bundle: &Bundle, module: &str, export: &str) -> Result<Self, TargetError> {
        let load_error = |e: mlua::Error| TargetError::ModuleLoad {
            module: module.to_string(),
            message: trim_traceback(&e.to_string()),
        };
        let missing = |reason: String| TargetError::VisitorExportMissing {
            module: module.to_string(),
            export: export.to_string(),
            reason,
        };

        let lua = Lua::new();
        install_helpers(&lua).map_err(load_error)?;

        let exports: Value = lua
            .load(bundle.source.as_str())
            .set_name(format!("@{}", bundle.entry.display()))
            .eval()
            .map_err(load_error)?;
        let exports = match exports {
            Value::Table(t) => t,
            other => {
                return Err(missing(format!(
                    "module returned {} instead of an export table",
                    script_type_name(&other)
                )))
            }
        };

        let value: Value = exports.get(export).map_err(load_error)?;
        let instance = match value {
            Value::Nil => return Err(missing("export not found".to_string())),
            Value::Function(factory) => construct(&factory).map_err(missing)?,
            Value::Table(t) => match t.get::<Value>("new").map_err(load_error)? {
                Value::Function(new) => construct(&new).map_err(missing)?,
                _ => t,
            },
            other => {
                return Err(missing(format!(
                    "export is a {}, expected a table or a function",
                    script_type_name(&other)
                )))
            }
        };

        let hooks = detect_hooks(&instance);
        if hooks.is_empty() {
            tracing::warn!(module, export, "visitor implements no recognized hooks");
        } else {
            tracing::debug!(module, export, hooks = hooks.len(), "visitor instantiated");
        }

        Ok(Self {
            lua,
            instance,
            hooks,
            namespace: None,
            config: None,
        })
    }

    fn call(&mut self, hook: Hook, ctx: &mut Context<'_>) -> HookResult {
        if !self.hooks.contains(hook) {
            return Ok(());
        }
        self.call_script(hook, ctx).map_err(|e| {
            let full = e.to_string();
            tracing::debug!(%hook, error = %full, "script hook failed");
            HookError::new(trim_traceback(&full))
        })
    }

    fn call_script(&mut self, hook: Hook, ctx: &mut Context<'_>) -> mlua::Result<()> {
        let func: Function = self.instance.get(hook.method_name())?;
        let ctx_table = self.context_table(ctx)?;
        let instance = self.instance.clone();
        let out = ctx.output_mut();

        self.lua.scope(|scope| {
            let write = scope.create_function_mut(move |_, args: Variadic<Value>| {
                // Accept both `ctx:write(s)` and `ctx.write(s)`.
                let text: String = match args.last() {
                    Some(Value::String(s)) => s.to_string_lossy().into(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Integer(i)) => i.to_string(),
                    other => {
                        return Err(mlua::Error::RuntimeError(format!(
                            "write expects a string, got {}",
                            other.map_or("nothing", |v| script_type_name(v))
                        )))
                    }
                };
                out.push_str(&text);
                Ok(())
            })?;
            ctx_table.set("write", write)?;
            func.call::<()>((instance, ctx_table.clone()))
        })
    }

    /// Build the `ctx` table for one hook call.
    fn context_table(&mut self, ctx: &Context<'_>) -> mlua::Result<Table> {
        let namespace = match &self.namespace {
            Some(t) => t.clone(),
            None => {
                let t = frozen_table(&self.lua, ctx.namespace())?;
                self.namespace = Some(t.clone());
                t
            }
        };
        let config = match &self.config {
            Some(t) => t.clone(),
            None => {
                let t = frozen_table(&self.lua, ctx.config())?;
                self.config = Some(t.clone());
                t
            }
        };

        let table = self.lua.create_table()?;
        table.set("target", ctx.target())?;
        table.set("namespace", namespace)?;
        table.set("config", config)?;

        let cursor = ctx.cursor();
        if let Some(t) = cursor.type_def {
            table.set("type", self.lua.to_value_with(t, serialize_options())?)?;
        }
        if let Some(f) = cursor.field {
            table.set("field", self.lua.to_value_with(f, serialize_options())?)?;
        }
        if let Some(e) = cursor.enum_def {
            table.set("enum", self.lua.to_value_with(e, serialize_options())?)?;
        }
        if let Some(v) = cursor.enum_value {
            table.set("value", self.lua.to_value_with(v, serialize_options())?)?;
        }
        if let Some(u) = cursor.union_def {
            table.set("union", self.lua.to_value_with(u, serialize_options())?)?;
        }
        if let Some(m) = cursor.union_member {
            table.set("member", self.lua.to_value_with(m, serialize_options())?)?;
        }
        if let Some(a) = cursor.alias {
            table.set("alias", self.lua.to_value_with(a, serialize_options())?)?;
        }
        Ok(table)
    }
}

impl Visitor for LuaVisitor {
    fn hooks(&self) -> HookSet {
        self.hooks
    }

    fn visit_document_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::DocumentBefore, ctx)
    }
    fn visit_namespace(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::Namespace, ctx)
    }
    fn visit_types_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::TypesBefore, ctx)
    }
    fn visit_type_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::TypeBefore, ctx)
    }
    fn visit_type_field(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::TypeField, ctx)
    }
    fn visit_type_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::TypeAfter, ctx)
    }
    fn visit_types_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::TypesAfter, ctx)
    }
    fn visit_enums_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::EnumsBefore, ctx)
    }
    fn visit_enum_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::EnumBefore, ctx)
    }
    fn visit_enum_value(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::EnumValue, ctx)
    }
    fn visit_enum_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::EnumAfter, ctx)
    }
    fn visit_enums_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::EnumsAfter, ctx)
    }
    fn visit_unions_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::UnionsBefore, ctx)
    }
    fn visit_union_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::UnionBefore, ctx)
    }
    fn visit_union_member(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::UnionMember, ctx)
    }
    fn visit_union_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::UnionAfter, ctx)
    }
    fn visit_unions_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::UnionsAfter, ctx)
    }
    fn visit_aliases_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::AliasesBefore, ctx)
    }
    fn visit_alias_before(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::AliasBefore, ctx)
    }
    fn visit_alias_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::AliasAfter, ctx)
    }
    fn visit_aliases_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::AliasesAfter, ctx)
    }
    fn visit_document_after(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.call(Hook::DocumentAfter, ctx)
    }
}

/// Call a factory or `Class.new()` and require a table back.
fn construct(ctor: &Function) -> Result<Table, String> {
    match ctor.call::<Value>(()) {
        Ok(Value::Table(t)) => Ok(t),
        Ok(other) => Err(format!(
            "constructor returned {} instead of a table",
            script_type_name(&other)
        )),
        Err(e) => Err(format!("constructor failed: {}", trim_traceback(&e.to_string()))),
    }
}

fn detect_hooks(instance: &Table) -> HookSet {
    let mut set = HookSet::empty();
    for hook in Hook::ALL {
        if matches!(instance.get::<Value>(hook.method_name()), Ok(Value::Function(_))) {
            set.insert(hook);
        }
    }
    set
}

fn frozen_table<T: Serialize + ?Sized>(lua: &Lua, value: &T) -> mlua::Result<Table> {
    match lua.to_value_with(value, serialize_options())? {
        Value::Table(t) => {
            freeze(&t)?;
            Ok(t)
        }
        other => Err(mlua::Error::RuntimeError(format!(
            "expected a table, got {}",
            other.type_name()
        ))),
    }
}

/// Mark `table` and every table nested in it read-only.
fn freeze(table: &Table) -> mlua::Result<()> {
    for pair in table.clone().pairs::<Value, Value>() {
        if let (_, Value::Table(child)) = pair? {
            freeze(&child)?;
        }
    }
    table.set_readonly(true);
    Ok(())
}

/// Script-facing type name; Luau has a single number type.
fn script_type_name(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) | Value::Number(_) => "number",
        other => other.type_name(),
    }
}

/// The `codeweft` global available to every generator.
fn install_helpers(lua: &Lua) -> mlua::Result<()> {
    let helpers = lua.create_table()?;
    helpers.set(
        "expandType",
        lua.create_function(|lua, value: Value| {
            let ty: AnyType = lua.from_value(value)?;
            expand_type(&ty).map_err(mlua::Error::external)
        })?,
    )?;
    helpers.set(
        "isOptional",
        lua.create_function(|lua, value: Value| {
            let ty: AnyType = lua.from_value(value)?;
            Ok(ty.is_optional())
        })?,
    )?;
    helpers.set("version", env!("CARGO_PKG_VERSION"))?;
    helpers.set_readonly(true);
    lua.globals().set("codeweft", helpers)?;
    Ok(())
}

fn trim_traceback(message: &str) -> String {
    message
        .split("\nstack traceback:")
        .next()
        .unwrap_or(message)
        .trim()
        .to_string()
}
