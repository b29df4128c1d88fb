use core::fmt;
use std::fmt::{Display, Formatter};

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::{errors::SchemaError, statement::StatementId};

/// Identity of a loaded module or submodule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleId(pub(crate) u32);

impl ModuleId {
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl Display for ModuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Whether a module was loaded to be implemented or only to satisfy imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Conformance {
    #[default]
    Implemented,
    ImportOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub prefix: String,
    pub module_name: String,
    pub revision: Option<String>,
    pub bound: Option<ModuleId>,
}

#[derive(Debug, Clone)]
pub struct ModuleInfo {
    pub(crate) id: ModuleId,
    pub(crate) name: String,
    pub(crate) is_submodule: bool,
    pub(crate) root: StatementId,
    pub(crate) revision: Option<String>,
    pub(crate) namespace: Option<String>,
    pub(crate) own_prefix: Option<String>,
    pub(crate) imports: Vec<Import>,
    pub(crate) includes: Vec<String>,
    pub(crate) belongs_to: Option<String>,
    pub(crate) owner: Option<ModuleId>,
    pub(crate) submodules: Vec<ModuleId>,
    pub(crate) conformance: Conformance,
}

impl ModuleInfo {
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_submodule(&self) -> bool {
        self.is_submodule
    }

    #[must_use]
    pub fn root(&self) -> StatementId {
        self.root
    }

    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// The namespace declared by this module. Submodules declare none; use
    /// [`Registry::namespace_of`] to get the inherited one.
    #[must_use]
    pub fn declared_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// For a module its own `prefix`, for a submodule the prefix given in
    /// `belongs-to`.
    #[must_use]
    pub fn own_prefix(&self) -> Option<&str> {
        self.own_prefix.as_deref()
    }

    #[must_use]
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    #[must_use]
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    #[must_use]
    pub fn belongs_to(&self) -> Option<&str> {
        self.belongs_to.as_deref()
    }

    #[must_use]
    pub fn submodules(&self) -> &[ModuleId] {
        &self.submodules
    }

    #[must_use]
    pub fn conformance(&self) -> Conformance {
        self.conformance
    }
}

/// All loaded modules, with their prefix tables.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    modules: Vec<ModuleInfo>,
    by_root: FxHashMap<StatementId, ModuleId>,
}

impl Registry {
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn next_id(&self) -> ModuleId {
        ModuleId(self.modules.len() as u32)
    }

    pub(crate) fn register(&mut self, name: &str, is_submodule: bool, root: StatementId) -> ModuleId {
        let id = self.next_id();
        self.modules.push(ModuleInfo {
            id,
            name: name.to_string(),
            is_submodule,
            root,
            revision: None,
            namespace: None,
            own_prefix: None,
            imports: Vec::new(),
            includes: Vec::new(),
            belongs_to: None,
            owner: None,
            submodules: Vec::new(),
            conformance: Conformance::Implemented,
        });
        self.by_root.insert(root, id);
        id
    }

    #[must_use]
    pub fn get(&self, id: ModuleId) -> Option<&ModuleInfo> {
        self.modules.get(id.0 as usize)
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownModule`] if `id` was never registered.
    pub fn info(&self, id: ModuleId) -> Result<&ModuleInfo, SchemaError> {
        self.get(id).ok_or(SchemaError::UnknownModule(id))
    }

    pub(crate) fn info_mut(&mut self, id: ModuleId) -> Result<&mut ModuleInfo, SchemaError> {
        self.modules
            .get_mut(id.0 as usize)
            .ok_or(SchemaError::UnknownModule(id))
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleInfo> {
        self.modules.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Every registered module or submodule with this name, in load order.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|info| info.name == name)
            .map(|info| info.id)
            .collect()
    }

    #[must_use]
    pub fn by_root(&self, root: StatementId) -> Option<ModuleId> {
        self.by_root.get(&root).copied()
    }

    #[must_use]
    pub fn root(&self, id: ModuleId) -> Option<StatementId> {
        self.get(id).map(ModuleInfo::root)
    }

    /// The module a submodule belongs to, or the module itself.
    #[must_use]
    pub fn owning_module(&self, id: ModuleId) -> Option<ModuleId> {
        let info = self.get(id)?;
        if info.is_submodule {
            info.owner
        } else {
            Some(id)
        }
    }

    #[must_use]
    pub fn namespace_of(&self, id: ModuleId) -> Option<&str> {
        let owner = self.owning_module(id)?;
        self.get(owner)?.declared_namespace()
    }

    /// Resolves `prefix` as written inside `module`.
    #[must_use]
    pub fn resolve_prefix(&self, module: ModuleId, prefix: &str) -> Option<ModuleId> {
        let info = self.get(module)?;
        if info.own_prefix.as_deref() == Some(prefix) {
            return self.owning_module(module);
        }
        info.imports
            .iter()
            .find(|import| import.prefix == prefix)
            .and_then(|import| import.bound)
    }

    /// Binds imports and `belongs-to` references to registered modules.
    pub(crate) fn link(&mut self) {
        let mut import_bindings = Vec::new();
        let mut owner_bindings = Vec::new();

        for info in &self.modules {
            for (index, import) in info.imports.iter().enumerate() {
                let candidates: Vec<&ModuleInfo> = self
                    .modules
                    .iter()
                    .filter(|candidate| {
                        !candidate.is_submodule && candidate.name == import.module_name
                    })
                    .collect();
                let exact = import.revision.as_ref().and_then(|revision| {
                    candidates
                        .iter()
                        .find(|candidate| candidate.revision.as_ref() == Some(revision))
                });
                let bound = match (exact, candidates.as_slice()) {
                    (Some(candidate), _) | (None, [candidate]) => Some(candidate.id),
                    _ => None,
                };
                import_bindings.push((info.id, index, bound));
            }

            if let Some(owner_name) = &info.belongs_to {
                let candidates: Vec<&ModuleInfo> = self
                    .modules
                    .iter()
                    .filter(|candidate| !candidate.is_submodule && &candidate.name == owner_name)
                    .collect();
                let including: Vec<&&ModuleInfo> = candidates
                    .iter()
                    .filter(|candidate| candidate.includes.contains(&info.name))
                    .collect();
                let owner = match (including.as_slice(), candidates.as_slice()) {
                    ([candidate], _) => Some(candidate.id),
                    (_, [candidate]) => Some(candidate.id),
                    _ => None,
                };
                owner_bindings.push((info.id, owner));
            }
        }

        for (module, index, bound) in import_bindings {
            if let Some(import) = self
                .modules
                .get_mut(module.0 as usize)
                .and_then(|info| info.imports.get_mut(index))
            {
                import.bound = bound;
            }
        }

        for info in &mut self.modules {
            info.submodules.clear();
        }
        for (submodule, owner) in owner_bindings {
            if let Some(info) = self.modules.get_mut(submodule.0 as usize) {
                info.owner = owner;
            }
            if let Some(owner) = owner
                && let Some(info) = self.modules.get_mut(owner.0 as usize)
            {
                info.submodules.push(submodule);
            }
        }
    }
}
