//! Visibility of `typedef` and `grouping` definitions.

use yangkit_schema::{Schema, keyword::Keyword, registry::ModuleId, statement::StatementId};

/// The statements whose children are searched for a definition, nearest
/// first.
///
/// For a reference inside the module that defines it, this is every ancestor
/// of the referencing statement up to the module root, followed by the roots
/// of the module's submodules. For a reference into another module only the
/// roots of that module and its submodules are visible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeChain {
    scopes: Vec<StatementId>,
}

impl ScopeChain {
    #[must_use]
    pub fn enclosing(schema: &Schema, statement: StatementId, module: ModuleId) -> Self {
        let mut scopes = schema.arena.ancestors(statement);
        for root in Self::module_roots(schema, module) {
            if !scopes.contains(&root) {
                scopes.push(root);
            }
        }
        Self { scopes }
    }

    #[must_use]
    pub fn module_level(schema: &Schema, module: ModuleId) -> Self {
        Self {
            scopes: Self::module_roots(schema, module),
        }
    }

    /// Root of the owning module followed by the roots of its submodules.
    fn module_roots(schema: &Schema, module: ModuleId) -> Vec<StatementId> {
        let Some(owner) = schema.registry.owning_module(module) else {
            return schema.registry.root(module).into_iter().collect();
        };
        let Some(info) = schema.registry.get(owner) else {
            return Vec::new();
        };
        std::iter::once(info.root())
            .chain(
                info.submodules()
                    .iter()
                    .filter_map(|submodule| schema.registry.root(*submodule)),
            )
            .collect()
    }

    #[must_use]
    pub fn scopes(&self) -> &[StatementId] {
        &self.scopes
    }

    /// First `keyword` statement named `name` found walking the chain.
    #[must_use]
    pub fn find(&self, schema: &Schema, keyword: Keyword, name: &str) -> Option<StatementId> {
        self.scopes.iter().find_map(|scope| {
            schema
                .arena
                .children(*scope)
                .iter()
                .copied()
                .find(|child| schema.arena.is(*child, keyword) && schema.identifier(*child) == name)
        })
    }
}
