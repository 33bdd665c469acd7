//! CW-009: Module loader. Resolves generator modules, bundles them once per
//! run and instantiates one visitor per target.

pub mod bundle;
pub mod lua;
pub mod resolve;

use crate::core::visitor::Visitor;
use crate::error::TargetError;
use bundle::Bundle;
use lua::LuaVisitor;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// Produces a fresh visitor instance for a `(module, export)` pair.
pub trait VisitorSource: Sync {
    fn instantiate(&self, module: &str, export: &str) -> Result<Box<dyn Visitor>, TargetError>;
}

type BundleSlot = Arc<OnceLock<Result<Arc<Bundle>, TargetError>>>;

/// Loads generator modules relative to the config file's directory.
///
/// Bundles are cached per `(module, export)` for the loader's lifetime.
/// Concurrent requests for the same key build it once; the others wait.
pub struct ModuleLoader {
    base_dir: PathBuf,
    cache: Mutex<HashMap<(String, String), BundleSlot>>,
    builds: AtomicUsize,
}

impl ModuleLoader {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            cache: Mutex::new(HashMap::new()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Bundled source for `module`, built on first request.
    pub fn bundle(&self, module: &str, export: &str) -> Result<Arc<Bundle>, TargetError> {
        let slot = {
            let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                cache
                    .entry((module.to_string(), export.to_string()))
                    .or_default(),
            )
        };
        slot.get_or_init(|| self.build(module)).clone()
    }

    fn build(&self, module: &str) -> Result<Arc<Bundle>, TargetError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let load_error = |message: String| TargetError::ModuleLoad {
            module: module.to_string(),
            message,
        };
        let entry = resolve::resolve_module(module, &self.base_dir).map_err(load_error)?;
        let bundled = bundle::bundle(&entry).map_err(load_error)?;
        tracing::debug!(
            module,
            entry = %entry.display(),
            files = bundled.modules.len(),
            "bundled generator module"
        );
        Ok(Arc::new(bundled))
    }

    /// Number of bundles built so far.
    pub fn bundles_built(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl VisitorSource for ModuleLoader {
    fn instantiate(&self, module: &str, export: &str) -> Result<Box<dyn Visitor>, TargetError> {
        let bundle = self.bundle(module, export)?;
        let visitor = LuaVisitor::instantiate(&bundle, module, export)?;
        Ok(Box::new(visitor))
    }
}
