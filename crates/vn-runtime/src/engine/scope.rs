use std::collections::BTreeMap;

use vn_core::VariableSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One level of variables and flags. `parent` is a lookup link into the
/// owning `ScopeChain`, never ownership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableScope {
    variables: BTreeMap<String, String>,
    flags: BTreeMap<String, bool>,
    parent: Option<ScopeId>,
}

impl VariableScope {
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn local_variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn local_flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }

    pub fn clear(&mut self) {
        self.variables.clear();
        self.flags.clear();
    }
}

/// Arena of scopes. Children are only appended by `push_child` and only
/// removed by `truncate`, so the parent links always point backwards and the
/// chain can never contain a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeChain {
    scopes: Vec<VariableScope>,
}

impl Default for ScopeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeChain {
    pub fn new() -> Self {
        Self {
            scopes: vec![VariableScope::default()],
        }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn scope(&self, id: ScopeId) -> Option<&VariableScope> {
        self.scopes.get(id.0)
    }

    pub fn push_child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(VariableScope {
            parent: Some(parent),
            ..VariableScope::default()
        });
        id
    }

    /// Drops every scope created after `keep`.
    pub fn truncate(&mut self, keep: ScopeId) {
        self.scopes.truncate(keep.0 + 1);
    }

    pub fn reset(&mut self) {
        self.scopes.truncate(1);
        self.scopes[0].clear();
    }

    fn chain(&self, from: ScopeId) -> impl Iterator<Item = &VariableScope> + '_ {
        let mut cursor = self.scopes.get(from.0);
        std::iter::from_fn(move || {
            let current = cursor?;
            cursor = current.parent.and_then(|parent| self.scopes.get(parent.0));
            Some(current)
        })
    }

    pub fn get(&self, from: ScopeId, name: &str) -> Option<&str> {
        self.chain(from).find_map(|scope| scope.local_variable(name))
    }

    pub fn get_flag(&self, from: ScopeId, name: &str) -> bool {
        self.chain(from)
            .find_map(|scope| scope.local_flag(name))
            .unwrap_or(false)
    }

    pub fn has_flag(&self, from: ScopeId, name: &str) -> bool {
        self.chain(from).any(|scope| scope.local_flag(name).is_some())
    }

    pub fn set(&mut self, at: ScopeId, name: impl Into<String>, value: impl Into<String>) {
        if let Some(scope) = self.scopes.get_mut(at.0) {
            scope.variables.insert(name.into(), value.into());
        }
    }

    pub fn set_flag(&mut self, at: ScopeId, name: impl Into<String>, value: bool) {
        if let Some(scope) = self.scopes.get_mut(at.0) {
            scope.flags.insert(name.into(), value);
        }
    }

    pub fn clear(&mut self, at: ScopeId) {
        if let Some(scope) = self.scopes.get_mut(at.0) {
            scope.clear();
        }
    }

    /// Variables and flags visible from `from`, innermost definitions winning.
    pub fn snapshot(&self, from: ScopeId) -> VariableSnapshot {
        let mut snapshot = VariableSnapshot::default();
        for scope in self.chain(from) {
            for (name, value) in &scope.variables {
                snapshot
                    .variables
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
            for (name, value) in &scope.flags {
                snapshot.flags.entry(name.clone()).or_insert(*value);
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_falls_back_to_parent() {
        let mut chain = ScopeChain::new();
        chain.set(ScopeId::ROOT, "name", "Alice");
        chain.set_flag(ScopeId::ROOT, "met", true);
        let child = chain.push_child(ScopeId::ROOT);

        assert_eq!(chain.get(child, "name"), Some("Alice"));
        assert!(chain.get_flag(child, "met"));
        assert_eq!(chain.get(child, "missing"), None);
        assert!(!chain.get_flag(child, "missing"));
    }

    #[test]
    fn child_writes_shadow_without_mutating_parent() {
        let mut chain = ScopeChain::new();
        chain.set(ScopeId::ROOT, "x", "1");
        let child = chain.push_child(ScopeId::ROOT);
        chain.set(child, "x", "2");
        chain.set_flag(child, "brave", true);

        assert_eq!(chain.get(child, "x"), Some("2"));
        assert_eq!(chain.get(ScopeId::ROOT, "x"), Some("1"));

        chain.truncate(ScopeId::ROOT);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.get(ScopeId::ROOT, "x"), Some("1"));
        assert!(!chain.get_flag(ScopeId::ROOT, "brave"));
    }

    #[test]
    fn explicit_false_flag_shadows_parent_true() {
        let mut chain = ScopeChain::new();
        chain.set_flag(ScopeId::ROOT, "lit", true);
        let child = chain.push_child(ScopeId::ROOT);
        chain.set_flag(child, "lit", false);
        assert!(!chain.get_flag(child, "lit"));
        assert!(chain.has_flag(child, "lit"));
        assert!(chain.get_flag(ScopeId::ROOT, "lit"));
    }

    #[test]
    fn snapshot_prefers_innermost_values() {
        let mut chain = ScopeChain::new();
        chain.set(ScopeId::ROOT, "x", "outer");
        chain.set(ScopeId::ROOT, "y", "kept");
        let child = chain.push_child(ScopeId::ROOT);
        chain.set(child, "x", "inner");

        let snapshot = chain.snapshot(child);
        assert_eq!(snapshot.variables["x"], "inner");
        assert_eq!(snapshot.variables["y"], "kept");
    }

    #[test]
    fn clear_and_reset_empty_scopes() {
        let mut chain = ScopeChain::new();
        chain.set(ScopeId::ROOT, "x", "1");
        let child = chain.push_child(ScopeId::ROOT);
        chain.set(child, "y", "2");
        chain.clear(child);
        assert_eq!(chain.get(child, "y"), None);
        assert_eq!(chain.get(child, "x"), Some("1"));

        chain.reset();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.get(ScopeId::ROOT, "x"), None);
        assert!(chain.scope(ScopeId::ROOT).is_some_and(|root| root.parent().is_none()));
    }
}
