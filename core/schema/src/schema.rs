use crate::{
    annotations::Annotations,
    arena::Arena,
    errors::SchemaError,
    keyword::Keyword,
    registry::{Conformance, Import, ModuleId, Registry},
    statement::{Origin, StatementId, StatementKind, Status},
};

/// The forest of module trees together with the registry that names them and
/// the side tables the resolvers fill in.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub arena: Arena,
    pub registry: Registry,
    pub annotations: Annotations,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the root of a new module or submodule tree.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NotAModuleRoot`] for anything but `module` and `submodule`.
    pub fn begin_module(
        &mut self,
        keyword: Keyword,
        name: &str,
        line: u32,
    ) -> Result<(ModuleId, StatementId), SchemaError> {
        if !keyword.is_module_root() {
            return Err(SchemaError::NotAModuleRoot(keyword));
        }
        let module = self.registry.next_id();
        let root = self.arena.add_root(
            keyword.into(),
            Some(name.to_string()),
            Origin { module, line },
        );
        let registered = self
            .registry
            .register(name, keyword == Keyword::Submodule, root);
        debug_assert_eq!(module, registered);
        Ok((module, root))
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownStatement`] if `parent` is not in the arena.
    pub fn add_statement(
        &mut self,
        parent: StatementId,
        kind: impl Into<StatementKind>,
        argument: Option<&str>,
        line: u32,
    ) -> Result<StatementId, SchemaError> {
        self.arena
            .add_child(parent, kind.into(), argument.map(str::to_string), line)
    }

    /// Reads the header statements of a populated module tree into the registry.
    ///
    /// # Errors
    ///
    /// Fails if the module is unknown or another module with the same name and
    /// revision is already registered.
    pub fn finish_module(
        &mut self,
        module: ModuleId,
        conformance: Conformance,
    ) -> Result<(), SchemaError> {
        let info = self.registry.info(module)?;
        let root = info.root();
        let is_submodule = info.is_submodule();
        let arena = &self.arena;

        let revision = arena
            .children_of_kind(root, Keyword::Revision)
            .into_iter()
            .map(|revision| arena.trimmed_argument(revision).to_string())
            .max();
        let namespace = arena
            .first_child_of_kind(root, Keyword::Namespace)
            .map(|namespace| arena.trimmed_argument(namespace).to_string());
        let belongs_to = arena.first_child_of_kind(root, Keyword::BelongsTo);
        let own_prefix = if is_submodule {
            belongs_to.and_then(|belongs_to| arena.first_child_of_kind(belongs_to, Keyword::Prefix))
        } else {
            arena.first_child_of_kind(root, Keyword::Prefix)
        }
        .map(|prefix| arena.trimmed_argument(prefix).to_string());

        let mut imports = Vec::new();
        for import in arena.children_of_kind(root, Keyword::Import) {
            let prefix = arena
                .first_child_of_kind(import, Keyword::Prefix)
                .ok_or(SchemaError::MissingArgument {
                    keyword: "prefix",
                    statement: import,
                })?;
            imports.push(Import {
                prefix: arena.trimmed_argument(prefix).to_string(),
                module_name: arena.trimmed_argument(import).to_string(),
                revision: arena
                    .first_child_of_kind(import, Keyword::RevisionDate)
                    .map(|date| arena.trimmed_argument(date).to_string()),
                bound: None,
            });
        }
        let includes = arena
            .children_of_kind(root, Keyword::Include)
            .into_iter()
            .map(|include| arena.trimmed_argument(include).to_string())
            .collect();
        let belongs_to = belongs_to.map(|belongs_to| arena.trimmed_argument(belongs_to).to_string());

        let name = info.name().to_string();
        if self.registry.modules().any(|other| {
            other.id() != module && other.name() == name && other.revision == revision
        }) {
            return Err(SchemaError::DuplicateModule { name, revision });
        }

        let info = self.registry.info_mut(module)?;
        info.revision = revision;
        info.namespace = namespace;
        info.own_prefix = own_prefix;
        info.imports = imports;
        info.includes = includes;
        info.belongs_to = belongs_to;
        info.conformance = conformance;
        Ok(())
    }

    /// Binds imports and submodules once every module has been finished.
    pub fn link_modules(&mut self) {
        self.registry.link();
    }

    /// Deep-copies `template` under `into` (or detached) and carries its
    /// provenance annotations over to the copy.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownStatement`] if an id is not in the arena.
    pub fn clone_statement(
        &mut self,
        into: Option<StatementId>,
        template: StatementId,
    ) -> Result<StatementId, SchemaError> {
        let (copy, clone_map) = self.arena.clone_subtree(into, template)?;
        self.annotations.carry_over(&clone_map);
        Ok(copy)
    }

    /// The module whose tree currently holds `id`.
    #[must_use]
    pub fn tree_module(&self, id: StatementId) -> Option<ModuleId> {
        self.registry.by_root(self.arena.root_of(id))
    }

    /// The module whose source text produced `id`; prefixes written in the
    /// statement resolve through this module's table.
    #[must_use]
    pub fn source_module(&self, id: StatementId) -> Option<ModuleId> {
        self.arena.get(id).map(|statement| statement.origin().module)
    }

    #[must_use]
    pub fn module_name(&self, module: ModuleId) -> Option<&str> {
        self.registry.get(module).map(|info| info.name())
    }

    /// Namespace `id` lives in. Falls back to the namespace of the tree's
    /// module until effective namespaces have been assigned.
    #[must_use]
    pub fn effective_namespace(&self, id: StatementId) -> Option<&str> {
        let module = self
            .annotations
            .effective_namespace
            .get(&id)
            .copied()
            .or_else(|| self.tree_module(id))?;
        self.registry.namespace_of(module)
    }

    #[must_use]
    pub fn explicit_status(&self, id: StatementId) -> Option<Status> {
        self.arena
            .first_child_of_kind(id, Keyword::Status)
            .and_then(|status| self.arena.trimmed_argument(status).parse().ok())
    }

    #[must_use]
    pub fn status_of(&self, id: StatementId) -> Status {
        self.explicit_status(id).unwrap_or_default()
    }

    /// The trimmed argument of `id`, empty when there is none.
    #[must_use]
    pub fn identifier(&self, id: StatementId) -> &str {
        self.arena.trimmed_argument(id)
    }

    /// Whether both statements currently hang in trees of the same module,
    /// counting submodules as part of their owner.
    #[must_use]
    pub fn in_same_module(&self, a: StatementId, b: StatementId) -> bool {
        let owner = |id| {
            self.tree_module(id)
                .and_then(|module| self.registry.owning_module(module))
        };
        match (owner(a), owner(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
