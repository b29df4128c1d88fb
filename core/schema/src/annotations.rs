//! Typed side tables that record facts about statements without widening
//! the statement record itself.

use core::fmt;
use std::fmt::{Display, Formatter};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::{
    arena::CloneMap,
    registry::ModuleId,
    statement::{StatementId, StatementKind, Status},
};

/// A root-level typedef traversed while flattening a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypedefRef {
    pub namespace: String,
    pub module: String,
    pub name: String,
}

/// The augment that relocated a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AugmentRef {
    pub augment: StatementId,
    pub module: ModuleId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviateOperation {
    Add,
    Replace,
    Delete,
    NotSupported,
}

impl DeviateOperation {
    /// Application order across all deviations.
    pub const PHASES: [DeviateOperation; 4] = [
        DeviateOperation::Add,
        DeviateOperation::Replace,
        DeviateOperation::Delete,
        DeviateOperation::NotSupported,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DeviateOperation::Add => "add",
            DeviateOperation::Replace => "replace",
            DeviateOperation::Delete => "delete",
            DeviateOperation::NotSupported => "not-supported",
        }
    }

    #[must_use]
    pub fn from_argument(argument: &str) -> Option<Self> {
        match argument.trim() {
            "add" => Some(DeviateOperation::Add),
            "replace" => Some(DeviateOperation::Replace),
            "delete" => Some(DeviateOperation::Delete),
            "not-supported" => Some(DeviateOperation::NotSupported),
            _ => None,
        }
    }
}

impl Display for DeviateOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a deviation record talks about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeviatedStatement {
    /// A statement that still exists, e.g. one added or replaced by a deviate.
    Present(StatementId),
    /// A statement that was deleted or declared not supported.
    Removed {
        kind: StatementKind,
        argument: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviationRecord {
    pub operation: DeviateOperation,
    pub deviate: StatementId,
    pub statement: DeviatedStatement,
}

#[derive(Debug, Clone, Default)]
pub struct Annotations {
    pub not_resolvable: FxHashSet<StatementId>,
    pub usage_counts: FxHashMap<StatementId, u32>,
    pub typedef_chain: FxHashMap<StatementId, Vec<TypedefRef>>,
    pub typedef_origin: FxHashMap<StatementId, StatementId>,
    pub originally_defined_in: FxHashMap<StatementId, String>,
    pub grouping_origin: FxHashMap<StatementId, StatementId>,
    pub augmented_by: FxHashMap<StatementId, AugmentRef>,
    pub when_applies_to_parent: FxHashSet<StatementId>,
    pub deviation_history: FxHashMap<StatementId, Vec<DeviationRecord>>,
    pub effective_namespace: FxHashMap<StatementId, ModuleId>,
    pub effective_status: FxHashMap<StatementId, Status>,
    pub effective_config: FxHashMap<StatementId, bool>,
    pub notes: FxHashMap<StatementId, Vec<String>>,
}

impl Annotations {
    /// Copies provenance entries from each template to its clone. Resolution
    /// state (markers, counters, deviation history, effective values, notes)
    /// stays with the template.
    pub fn carry_over(&mut self, clone_map: &CloneMap) {
        for (template, copy) in clone_map {
            if let Some(chain) = self.typedef_chain.get(template).cloned() {
                self.typedef_chain.insert(*copy, chain);
            }
            if let Some(typedef) = self.typedef_origin.get(template).copied() {
                self.typedef_origin.insert(*copy, typedef);
            }
            if let Some(module) = self.originally_defined_in.get(template).cloned() {
                self.originally_defined_in.insert(*copy, module);
            }
            if let Some(grouping) = self.grouping_origin.get(template).copied() {
                self.grouping_origin.insert(*copy, grouping);
            }
            if let Some(augment) = self.augmented_by.get(template).copied() {
                self.augmented_by.insert(*copy, augment);
            }
            if self.when_applies_to_parent.contains(template) {
                self.when_applies_to_parent.insert(*copy);
            }
        }
    }

    pub fn mark_not_resolvable(&mut self, id: StatementId) {
        self.not_resolvable.insert(id);
    }

    #[must_use]
    pub fn is_not_resolvable(&self, id: StatementId) -> bool {
        self.not_resolvable.contains(&id)
    }

    pub fn increment_usage(&mut self, definition: StatementId) {
        *self.usage_counts.entry(definition).or_insert(0) += 1;
    }

    #[must_use]
    pub fn usage_count(&self, definition: StatementId) -> u32 {
        self.usage_counts.get(&definition).copied().unwrap_or(0)
    }

    pub fn record_deviation(&mut self, id: StatementId, record: DeviationRecord) {
        self.deviation_history.entry(id).or_default().push(record);
    }

    #[must_use]
    pub fn deviation_history(&self, id: StatementId) -> &[DeviationRecord] {
        self.deviation_history.get(&id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn was_deviated_by(&self, id: StatementId, operation: DeviateOperation) -> bool {
        self.deviation_history(id)
            .iter()
            .any(|record| record.operation == operation)
    }

    pub fn add_note(&mut self, id: StatementId, note: impl Into<String>) {
        self.notes.entry(id).or_default().push(note.into());
    }

    #[must_use]
    pub fn notes(&self, id: StatementId) -> &[String] {
        self.notes.get(&id).map_or(&[], Vec::as_slice)
    }
}
