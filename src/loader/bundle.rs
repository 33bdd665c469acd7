//! CW-011: Bundler. Flattens a module and its `require` graph into one chunk.
//!
//! Each script module becomes a loader function receiving its own `require`,
//! bound to the dependencies resolved for that file. Raw text resources are
//! embedded as quoted string literals. The entry module's return value is the chunk's
//! return value.

use super::resolve::{self, ModuleKind};
use regex::Regex;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A bundled generator module, ready to execute.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Entry file
    pub entry: PathBuf,
    /// Every file in the bundle, entry first, discovery order
    pub modules: Vec<PathBuf>,
    /// Single executable chunk
    pub source: String,
}

struct ModuleRecord {
    path: PathBuf,
    kind: ModuleKind,
    body: String,
    deps: Vec<(String, usize)>,
}

fn require_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\brequire\s*\(?\s*["']"#).expect("require pattern is valid"))
}

fn export_type_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([ \t]*)export[ \t]+(type\b)").expect("export type pattern is valid")
    })
}

/// Bundle the module at `entry` with everything it requires.
pub fn bundle(entry: &Path) -> Result<Bundle, String> {
    let mut builder = Builder::default();
    builder.add(entry)?;

    let modules: Vec<PathBuf> = builder.records.iter().map(|r| r.path.clone()).collect();
    let source = builder.emit();
    Ok(Bundle {
        entry: entry.to_path_buf(),
        modules,
        source,
    })
}

#[derive(Default)]
struct Builder {
    records: Vec<ModuleRecord>,
    index: HashMap<PathBuf, usize>,
}

impl Builder {
    fn add(&mut self, path: &Path) -> Result<usize, String> {
        let key = std::fs::canonicalize(path)
            .map_err(|e| format!("cannot resolve {}: {}", path.display(), e))?;
        if let Some(&id) = self.index.get(&key) {
            return Ok(id);
        }

        let content = std::fs::read_to_string(&key)
            .map_err(|e| format!("cannot read {}: {}", key.display(), e))?;
        let kind = resolve::module_kind(&key);
        let id = self.records.len();
        self.index.insert(key.clone(), id);
        self.records.push(ModuleRecord {
            path: key.clone(),
            kind,
            body: String::new(),
            deps: Vec::new(),
        });

        if kind == ModuleKind::RawText {
            self.records[id].body = content;
            return Ok(id);
        }

        let importer_dir = key.parent().unwrap_or_else(|| Path::new("."));
        let mut deps = Vec::new();
        for spec in scan_requires(&content) {
            if deps.iter().any(|(s, _)| s == &spec) {
                continue;
            }
            let resolved = resolve::resolve_module(&spec, importer_dir)
                .map_err(|e| format!("{} (required from {})", e, key.display()))?;
            let dep_id = self.add(&resolved)?;
            deps.push((spec, dep_id));
        }

        let record = &mut self.records[id];
        record.body = lower_type_exports(&content);
        record.deps = deps;
        Ok(id)
    }

    fn emit(&self) -> String {
        let mut out = String::new();
        let entry_name = self
            .records
            .first()
            .map(|r| display_name(&r.path))
            .unwrap_or_default();
        let _ = writeln!(out, "-- codeweft bundle: {}", entry_name);
        out.push_str(PRELUDE);

        for (id, record) in self.records.iter().enumerate() {
            let _ = write!(
                out,
                "__modules[{}] = {{ name = {}, deps = {{",
                id + 1,
                lua_string(&display_name(&record.path))
            );
            for (spec, dep) in &record.deps {
                let _ = write!(out, " [{}] = {},", lua_string(spec), dep + 1);
            }
            out.push_str(" }, ");
            match record.kind {
                ModuleKind::RawText => {
                    let _ = writeln!(out, "text = {} }}", lua_string(&record.body));
                }
                ModuleKind::Script => {
                    out.push_str("init = function(require, ...)\n");
                    out.push_str(&record.body);
                    out.push_str("\nend }\n");
                }
            }
        }

        out.push_str("return __load(1)\n");
        out
    }
}

const PRELUDE: &str = r#"local __modules = {}
local __state = {}
local function __load(id)
    local state = __state[id]
    if state ~= nil then
        if state.loading then
            error("circular require of " .. __modules[id].name, 2)
        end
        return state.value
    end
    local m = __modules[id]
    if m.text ~= nil then
        __state[id] = { value = m.text }
        return m.text
    end
    __state[id] = { loading = true }
    local function require(spec)
        local dep = m.deps[spec]
        if dep == nil then
            error("module '" .. tostring(spec) .. "' was not bundled", 2)
        end
        return __load(dep)
    end
    local value = m.init(require)
    if value == nil then
        value = true
    end
    __state[id] = { value = value }
    return value
end
"#;

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// `require` targets in source order. Calls inside comments and string
/// literals are ignored.
pub fn scan_requires(source: &str) -> Vec<String> {
    let masked = mask_non_code(source);
    let bytes = masked.as_bytes();
    require_re()
        .find_iter(&masked)
        .filter(|m| {
            // `obj.require(...)` and `obj:require(...)` are method calls.
            m.start() == 0 || !matches!(bytes[m.start() - 1], b'.' | b':')
        })
        .filter_map(|m| quoted_argument(source, m.end() - 1))
        .collect()
}

/// Contents of the one-line quoted literal opening at `quote`, read from the
/// unmasked source.
fn quoted_argument(source: &str, quote: usize) -> Option<String> {
    let delim = source.as_bytes()[quote] as char;
    let rest = &source[quote + 1..];
    let end = rest.find(|c: char| c == delim || c == '\n')?;
    let arg = &rest[..end];
    (rest[end..].starts_with(delim) && !arg.is_empty()).then(|| arg.to_string())
}

/// Blank out comments and the contents of string literals, keeping quote
/// characters, long-bracket delimiters and line breaks at their offsets.
fn mask_non_code(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut blank = |from: usize, to: usize| {
        for b in &mut out[from.min(bytes.len())..to.min(bytes.len())] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    };
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' | b'`' => {
                let quote = bytes[i];
                let start = i + 1;
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                blank(start, i);
                i += 1;
            }
            b'[' => match long_bracket_level(bytes, i) {
                Some(level) => {
                    let end = skip_long_bracket(bytes, i, level);
                    let close = level + 2;
                    blank(i + close, end.saturating_sub(close).max(i + close));
                    i = end;
                }
                None => i += 1,
            },
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = match long_bracket_level(bytes, i + 2) {
                    Some(level) => skip_long_bracket(bytes, i + 2, level),
                    None => bytes[i..]
                        .iter()
                        .position(|&b| b == b'\n')
                        .map_or(bytes.len(), |p| i + p),
                };
                blank(i, end);
                i = end;
            }
            _ => i += 1,
        }
    }
    // Whole UTF-8 sequences are replaced by ASCII spaces.
    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

/// Level of a long bracket opening at `i` (`[[` → 0, `[==[` → 2).
fn long_bracket_level(bytes: &[u8], i: usize) -> Option<usize> {
    if bytes.get(i) != Some(&b'[') {
        return None;
    }
    let mut j = i + 1;
    while bytes.get(j) == Some(&b'=') {
        j += 1;
    }
    (bytes.get(j) == Some(&b'[')).then_some(j - i - 1)
}

/// Index just past the matching close bracket (or end of input).
fn skip_long_bracket(bytes: &[u8], open: usize, level: usize) -> usize {
    let mut close = Vec::with_capacity(level + 2);
    close.push(b']');
    close.extend(std::iter::repeat(b'=').take(level));
    close.push(b']');
    let body_start = open + level + 2;
    bytes[body_start.min(bytes.len())..]
        .windows(close.len())
        .position(|w| w == close.as_slice())
        .map_or(bytes.len(), |p| body_start + p + close.len())
}

/// Module-level `export type` is not legal inside a function body.
fn lower_type_exports(source: &str) -> String {
    export_type_re().replace_all(source, "${1}${2}").into_owned()
}

/// Quoted Lua string literal. Control bytes use three-digit decimal escapes
/// so the text survives the lexer byte for byte.
fn lua_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\{:03}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
