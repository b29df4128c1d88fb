use rustc_hash::FxHashMap;

use crate::{
    errors::SchemaError,
    keyword::Keyword,
    statement::{Origin, Statement, StatementId, StatementKind},
};

/// Pairs of `(template, clone)` ids produced by a deep copy, in pre-order.
pub type CloneMap = Vec<(StatementId, StatementId)>;

/// Owning storage for every statement of every module tree.
///
/// Parent and child links are kept on the statements themselves and are only
/// ever changed through the methods below, so a statement is listed in the
/// children of exactly the statement its `parent` points at.
#[derive(Default, Clone, Debug)]
pub struct Arena {
    pub(crate) nodes: FxHashMap<StatementId, Statement>,
    next_id: u32,
}

impl Arena {
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: StatementId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn get(&self, id: StatementId) -> Option<&Statement> {
        self.nodes.get(&id)
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownStatement`] if `id` is not in the arena.
    pub fn statement(&self, id: StatementId) -> Result<&Statement, SchemaError> {
        self.nodes.get(&id).ok_or(SchemaError::UnknownStatement(id))
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownStatement`] if `id` is not in the arena.
    pub fn statement_mut(&mut self, id: StatementId) -> Result<&mut Statement, SchemaError> {
        self.nodes
            .get_mut(&id)
            .ok_or(SchemaError::UnknownStatement(id))
    }

    #[must_use]
    pub fn kind(&self, id: StatementId) -> Option<&StatementKind> {
        self.get(id).map(Statement::kind)
    }

    #[must_use]
    pub fn keyword(&self, id: StatementId) -> Option<Keyword> {
        self.get(id).and_then(Statement::keyword)
    }

    #[must_use]
    pub fn is(&self, id: StatementId, keyword: Keyword) -> bool {
        self.keyword(id) == Some(keyword)
    }

    #[must_use]
    pub fn argument(&self, id: StatementId) -> Option<&str> {
        self.get(id).and_then(Statement::argument)
    }

    #[must_use]
    pub fn trimmed_argument(&self, id: StatementId) -> &str {
        self.get(id).map_or("", Statement::trimmed_argument)
    }

    #[must_use]
    pub fn parent(&self, id: StatementId) -> Option<StatementId> {
        self.get(id).and_then(Statement::parent)
    }

    #[must_use]
    pub fn children(&self, id: StatementId) -> &[StatementId] {
        self.get(id).map_or(&[], Statement::children)
    }

    #[must_use]
    pub fn children_of_kind(&self, id: StatementId, keyword: Keyword) -> Vec<StatementId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is(*child, keyword))
            .collect()
    }

    #[must_use]
    pub fn children_matching(&self, id: StatementId, kind: &StatementKind) -> Vec<StatementId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.kind(*child) == Some(kind))
            .collect()
    }

    #[must_use]
    pub fn first_child_of_kind(&self, id: StatementId, keyword: Keyword) -> Option<StatementId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.is(*child, keyword))
    }

    #[must_use]
    pub fn has_child_of_kind(&self, id: StatementId, keyword: Keyword) -> bool {
        self.first_child_of_kind(id, keyword).is_some()
    }

    /// Ancestors of `id`, nearest first, not including `id` itself.
    #[must_use]
    pub fn ancestors(&self, id: StatementId) -> Vec<StatementId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            result.push(ancestor);
            current = self.parent(ancestor);
        }
        result
    }

    #[must_use]
    pub fn root_of(&self, id: StatementId) -> StatementId {
        self.ancestors(id).last().copied().unwrap_or(id)
    }

    #[must_use]
    pub fn is_ancestor_of(&self, ancestor: StatementId, id: StatementId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// The subtree rooted at `id` in pre-order, `id` first.
    #[must_use]
    pub fn descendants(&self, id: StatementId) -> Vec<StatementId> {
        let mut result = Vec::new();
        if !self.contains(id) {
            return result;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }

    /// Pre-order walk of the subtree below `id` collecting statements of one kind.
    #[must_use]
    pub fn descendants_of_kind(&self, id: StatementId, keyword: Keyword) -> Vec<StatementId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.is(*node, keyword))
            .collect()
    }

    /// Creates a statement without a parent.
    pub fn add_root(
        &mut self,
        kind: StatementKind,
        argument: Option<String>,
        origin: Origin,
    ) -> StatementId {
        let id = self.allocate_id();
        self.nodes.insert(
            id,
            Statement {
                id,
                kind,
                argument,
                parent: None,
                children: Vec::new(),
                origin,
            },
        );
        id
    }

    /// Appends a new statement under `parent`. The new statement inherits the
    /// origin module of its parent.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownStatement`] if `parent` is not in the arena.
    pub fn add_child(
        &mut self,
        parent: StatementId,
        kind: StatementKind,
        argument: Option<String>,
        line: u32,
    ) -> Result<StatementId, SchemaError> {
        let module = self.statement(parent)?.origin.module;
        self.add_child_with_origin(parent, kind, argument, Origin { module, line })
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownStatement`] if `parent` is not in the arena.
    pub fn add_child_with_origin(
        &mut self,
        parent: StatementId,
        kind: StatementKind,
        argument: Option<String>,
        origin: Origin,
    ) -> Result<StatementId, SchemaError> {
        self.statement(parent)?;
        let id = self.add_root(kind, argument, origin);
        self.attach(parent, id, None)?;
        Ok(id)
    }

    /// Deep-copies `template` and appends the copy under `into`, or leaves it
    /// detached when `into` is `None`. Kinds, arguments and origins are copied;
    /// nothing else is.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownStatement`] if `template` or `into` is not in the arena.
    pub fn clone_subtree(
        &mut self,
        into: Option<StatementId>,
        template: StatementId,
    ) -> Result<(StatementId, CloneMap), SchemaError> {
        if let Some(into) = into {
            self.statement(into)?;
        }
        let mut clone_map = CloneMap::new();
        let root = self.clone_detached(template, &mut clone_map)?;
        if let Some(into) = into {
            self.attach(into, root, None)?;
        }
        Ok((root, clone_map))
    }

    fn clone_detached(
        &mut self,
        template: StatementId,
        clone_map: &mut CloneMap,
    ) -> Result<StatementId, SchemaError> {
        let source = self.statement(template)?;
        let kind = source.kind.clone();
        let argument = source.argument.clone();
        let origin = source.origin;
        let children = source.children.clone();

        let copy = self.add_root(kind, argument, origin);
        clone_map.push((template, copy));
        for child in children {
            let child_copy = self.clone_detached(child, clone_map)?;
            self.attach(copy, child_copy, None)?;
        }
        Ok(copy)
    }

    /// Puts `new` at the position `old` occupies under its parent and drops
    /// the subtree rooted at `old`.
    ///
    /// # Errors
    ///
    /// Fails if either id is unknown, `old` has no parent, or `old` is an
    /// ancestor of `new`.
    pub fn replace_child_in_place(
        &mut self,
        old: StatementId,
        new: StatementId,
    ) -> Result<(), SchemaError> {
        let parent = self
            .parent(old)
            .ok_or(SchemaError::UnknownStatement(old))?;
        self.statement(new)?;
        if self.is_ancestor_of(old, new) {
            return Err(SchemaError::CyclicMove {
                statement: new,
                target: old,
            });
        }
        self.detach(new)?;
        let position = self
            .children(parent)
            .iter()
            .position(|child| *child == old)
            .ok_or(SchemaError::NotAChild { parent, child: old })?;
        self.detach(old)?;
        self.attach(parent, new, Some(position))?;
        self.drop_subtree(old);
        Ok(())
    }

    /// Re-parents `child` as the last child of `new_parent`.
    ///
    /// # Errors
    ///
    /// Fails if either id is unknown or `new_parent` lies inside the subtree of `child`.
    pub fn move_child(
        &mut self,
        child: StatementId,
        new_parent: StatementId,
    ) -> Result<(), SchemaError> {
        self.insert_child_at(new_parent, usize::MAX, child)
    }

    /// Re-parents `child` under `parent` at `index`; an index past the end appends.
    ///
    /// # Errors
    ///
    /// Fails if either id is unknown or `parent` lies inside the subtree of `child`.
    pub fn insert_child_at(
        &mut self,
        parent: StatementId,
        index: usize,
        child: StatementId,
    ) -> Result<(), SchemaError> {
        self.statement(child)?;
        self.statement(parent)?;
        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(SchemaError::CyclicMove {
                statement: child,
                target: parent,
            });
        }
        self.detach(child)?;
        self.attach(parent, child, Some(index))
    }

    /// Moves every statement in `children`, in order, to the end of `parent`.
    ///
    /// # Errors
    ///
    /// Fails on the first statement that cannot be moved.
    pub fn add_children(
        &mut self,
        parent: StatementId,
        children: &[StatementId],
    ) -> Result<(), SchemaError> {
        for child in children {
            self.move_child(*child, parent)?;
        }
        Ok(())
    }

    /// Removes the listed direct children of `parent` together with their subtrees.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::NotAChild`] if one of `children` hangs elsewhere;
    /// nothing is removed in that case.
    pub fn remove_children(
        &mut self,
        parent: StatementId,
        children: &[StatementId],
    ) -> Result<(), SchemaError> {
        for child in children {
            if self.parent(*child) != Some(parent) {
                return Err(SchemaError::NotAChild {
                    parent,
                    child: *child,
                });
            }
        }
        for child in children {
            self.remove(*child)?;
        }
        Ok(())
    }

    /// Detaches `id` from its parent and drops its whole subtree.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownStatement`] if `id` is not in the arena.
    pub fn remove(&mut self, id: StatementId) -> Result<(), SchemaError> {
        self.detach(id)?;
        self.drop_subtree(id);
        Ok(())
    }

    fn allocate_id(&mut self) -> StatementId {
        self.next_id += 1;
        StatementId(self.next_id)
    }

    fn detach(&mut self, id: StatementId) -> Result<(), SchemaError> {
        let parent = self.statement_mut(id)?.parent.take();
        if let Some(parent) = parent
            && let Some(parent_node) = self.nodes.get_mut(&parent)
        {
            parent_node.children.retain(|child| *child != id);
        }
        Ok(())
    }

    fn attach(
        &mut self,
        parent: StatementId,
        child: StatementId,
        index: Option<usize>,
    ) -> Result<(), SchemaError> {
        self.statement_mut(child)?.parent = Some(parent);
        let parent_node = self.statement_mut(parent)?;
        match index {
            Some(index) if index <= parent_node.children.len() => {
                parent_node.children.insert(index, child);
            }
            _ => parent_node.children.push(child),
        }
        Ok(())
    }

    fn drop_subtree(&mut self, id: StatementId) {
        for node in self.descendants(id) {
            self.nodes.remove(&node);
        }
    }
}
