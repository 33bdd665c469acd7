//! CW-010: Module reference resolution.
//!
//! - `./x`, `../x`, absolute → file path relative to the importer
//! - anything else → package, searched in `luau_packages/` of the importer's
//!   directory and every ancestor
//!
//! Candidates per reference: exact file (when it carries an extension),
//! then `x.luau`, `x.lua`, `x/init.luau`, `x/init.lua`.

use std::path::{Path, PathBuf};

/// Extensions compiled as script code.
pub const SCRIPT_EXTENSIONS: [&str; 2] = ["luau", "lua"];

/// Extension passed through to the importer as a plain string.
pub const RAW_TEXT_EXTENSION: &str = "html";

/// Directory searched for package-style references.
pub const PACKAGES_DIR: &str = "luau_packages";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Script,
    RawText,
}

/// How a resolved file is treated by the bundler.
pub fn module_kind(path: &Path) -> ModuleKind {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case(RAW_TEXT_EXTENSION) => ModuleKind::RawText,
        _ => ModuleKind::Script,
    }
}

/// True for `./`, `../` and absolute references.
pub fn is_path_reference(spec: &str) -> bool {
    spec.starts_with("./")
        || spec.starts_with("../")
        || spec == "."
        || spec == ".."
        || Path::new(spec).is_absolute()
}

/// Resolve a reference made from a file living in `importer_dir`.
pub fn resolve_module(spec: &str, importer_dir: &Path) -> Result<PathBuf, String> {
    if spec.trim().is_empty() {
        return Err("empty module reference".to_string());
    }

    if is_path_reference(spec) {
        let base = importer_dir.join(spec);
        return first_existing(&base)
            .ok_or_else(|| format!("module '{}' not found (looked for {})", spec, base.display()));
    }

    for dir in importer_dir.ancestors() {
        let base = dir.join(PACKAGES_DIR).join(spec);
        if let Some(found) = first_existing(&base) {
            return Ok(found);
        }
    }
    Err(format!(
        "package '{}' not found in any {}/ directory above {}",
        spec,
        PACKAGES_DIR,
        importer_dir.display()
    ))
}

fn first_existing(base: &Path) -> Option<PathBuf> {
    candidates(base).into_iter().find(|p| p.is_file())
}

fn candidates(base: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if base.extension().is_some() {
        out.push(base.to_path_buf());
    }
    for ext in SCRIPT_EXTENSIONS {
        let mut with_ext = base.as_os_str().to_os_string();
        with_ext.push(".");
        with_ext.push(ext);
        out.push(PathBuf::from(with_ext));
    }
    for ext in SCRIPT_EXTENSIONS {
        out.push(base.join(format!("init.{}", ext)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "return {}").unwrap();
    }

    #[test]
    fn test_cw010_path_reference_detection() {
        assert!(is_path_reference("./gen"));
        assert!(is_path_reference("../gen"));
        assert!(is_path_reference("/abs/gen.luau"));
        assert!(!is_path_reference("markdown"));
        assert!(!is_path_reference("scope/markdown"));
    }

    #[test]
    fn test_cw010_resolve_relative_with_extension_probe() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("gen/ts.luau"));
        let found = resolve_module("./gen/ts", dir.path()).unwrap();
        assert!(found.ends_with("gen/ts.luau"));
        assert_eq!(module_kind(&found), ModuleKind::Script);
    }

    #[test]
    fn test_cw010_resolve_exact_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("gen.lua"));
        let found = resolve_module("./gen.lua", dir.path()).unwrap();
        assert!(found.ends_with("gen.lua"));
    }

    #[test]
    fn test_cw010_resolve_directory_init() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("lib/init.luau"));
        let found = resolve_module("./lib", dir.path()).unwrap();
        assert!(found.ends_with("lib/init.luau"));
    }

    #[test]
    fn test_cw010_luau_preferred_over_lua() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("x.luau"));
        touch(&dir.path().join("x.lua"));
        let found = resolve_module("./x", dir.path()).unwrap();
        assert!(found.ends_with("x.luau"));
    }

    #[test]
    fn test_cw010_resolve_package_from_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("luau_packages/strings/init.luau"));
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        let found = resolve_module("strings", &nested).unwrap();
        assert!(found.ends_with("luau_packages/strings/init.luau"));
    }

    #[test]
    fn test_cw010_missing_module() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_module("./nope", dir.path()).unwrap_err();
        assert!(err.contains("not found"));
        let err = resolve_module("nope", dir.path()).unwrap_err();
        assert!(err.contains("package 'nope'"));
    }

    #[test]
    fn test_cw010_module_kind() {
        assert_eq!(module_kind(Path::new("page.html")), ModuleKind::RawText);
        assert_eq!(module_kind(Path::new("page.HTML")), ModuleKind::RawText);
        assert_eq!(module_kind(Path::new("gen.luau")), ModuleKind::Script);
        assert_eq!(module_kind(Path::new("data.txt")), ModuleKind::Script);
    }
}
