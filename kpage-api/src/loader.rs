//! Isolated module loader
//!
//! Every compiled page is loaded into its own [`ExecutionUnit`]. The loader
//! exclusively owns the unit, the unit exclusively owns the loaded module,
//! and [`EntryPoint`]s only hold weak references: once the loader unloads,
//! every entry point obtained from it stops working.
//!
//! While loaded, a unit is registered with the [`ModuleHost`] as a dynamic
//! module, so it never becomes a compile reference for later pages.

use crate::backend::CompiledArtifact;
use crate::error::{PageError, PageResult};
use kpage_core::{Executor, LimitConfig, LoadedModule, ModuleBuilder, ModuleHost, ModuleId};
use std::fmt;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

static NEXT_UNIT: AtomicU64 = AtomicU64::new(0);

/// Identity of one execution unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Container owning one loaded page module
#[derive(Debug)]
pub struct ExecutionUnit {
    id: UnitId,
    /// `<root-path>:<counter>`
    name: String,
    module: LoadedModule,
    host: Arc<ModuleHost>,
    registration: ModuleId,
    limits: LimitConfig,
}

impl ExecutionUnit {
    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &LoadedModule {
        &self.module
    }
}

/// A resolved page class inside a live execution unit
#[derive(Debug, Clone)]
pub struct EntryPoint {
    unit: Weak<ExecutionUnit>,
    unit_id: UnitId,
    unit_name: String,
    class: usize,
    class_name: String,
}

impl EntryPoint {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Whether the owning unit is still loaded
    pub fn is_loaded(&self) -> bool {
        self.unit.strong_count() > 0
    }

    /// Render the page class.
    pub fn render(&self) -> PageResult<String> {
        let unit = self
            .unit
            .upgrade()
            .ok_or_else(|| PageError::Unloaded(self.unit_name.clone()))?;
        let output = Executor::new(&unit.module, &unit.host, &unit.limits).render(self.class)?;
        Ok(output)
    }
}

/// Creates, owns and tears down one execution unit
#[derive(Debug)]
pub struct IsolatedModuleLoader {
    host: Arc<ModuleHost>,
    limits: LimitConfig,
    unit: Option<Arc<ExecutionUnit>>,
}

impl IsolatedModuleLoader {
    pub fn new(host: Arc<ModuleHost>, limits: LimitConfig) -> Self {
        Self {
            host,
            limits,
            unit: None,
        }
    }

    /// Load `artifact` into a fresh unit named after `path` and resolve
    /// `class_name`.
    ///
    /// `Ok(None)` means the module loaded but does not define the class;
    /// the unit stays loaded until [`unload`](Self::unload) or drop.
    pub fn load(
        &mut self,
        path: &str,
        mut artifact: CompiledArtifact,
        class_name: &str,
    ) -> PageResult<Option<EntryPoint>> {
        // A loader owns at most one unit
        self.unload(None)?;

        let id = UnitId(NEXT_UNIT.fetch_add(1, Ordering::SeqCst) + 1);
        let name = format!("{}:{}", path, id);
        info!(target: "kpage::loader", unit = %name, module = %artifact.module_name, "execution unit created");

        let symbols = artifact.symbols.as_mut().map(|stream| stream as &mut dyn Read);
        let module = LoadedModule::load(&mut artifact.image, symbols)?;

        let mut registration = ModuleBuilder::new(name.clone()).dynamic(true);
        for class in 0..module.class_count() {
            registration = registration.plain_type(module.class_name(class).map_err(kpage_core::LoadError::from)?);
        }
        let registration = self.host.register(registration);

        let unit = Arc::new(ExecutionUnit {
            id,
            name,
            module,
            host: Arc::clone(&self.host),
            registration,
            limits: self.limits.clone(),
        });
        let entry_point = unit.module.find_class(class_name).map(|class| EntryPoint {
            unit: Arc::downgrade(&unit),
            unit_id: unit.id,
            unit_name: unit.name.clone(),
            class,
            class_name: class_name.to_string(),
        });
        if entry_point.is_none() {
            warn!(target: "kpage::loader", unit = %unit.name, class = class_name, "type not found");
        }
        self.unit = Some(unit);
        Ok(entry_point)
    }

    /// The unit currently owned, if any
    pub fn unit(&self) -> Option<&ExecutionUnit> {
        self.unit.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.unit.is_some()
    }

    /// Unload the owned unit. Returns `false` when nothing was loaded.
    ///
    /// When `entry_point` is given it must come from this loader's unit;
    /// otherwise nothing is unloaded and [`PageError::ForeignModule`] is
    /// returned.
    pub fn unload(&mut self, entry_point: Option<&EntryPoint>) -> PageResult<bool> {
        let Some(unit) = self.unit.as_ref() else {
            return Ok(false);
        };
        if let Some(entry_point) = entry_point {
            if entry_point.unit_id != unit.id {
                return Err(PageError::ForeignModule {
                    unit: unit.name.clone(),
                    entry_unit: entry_point.unit_name.clone(),
                });
            }
        }

        // take() makes the teardown one-shot
        if let Some(unit) = self.unit.take() {
            self.host.unregister(unit.registration);
            info!(target: "kpage::loader", unit = %unit.name, "execution unit unloaded");
            if Arc::strong_count(&unit) > 1 {
                debug!(target: "kpage::loader", unit = %unit.name, "unit still rendering, released afterwards");
            }
        }
        Ok(true)
    }
}

impl Drop for IsolatedModuleLoader {
    fn drop(&mut self) {
        // unload(None) never fails
        let _ = self.unload(None);
    }
}
