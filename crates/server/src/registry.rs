// Monitored submodules, keyed by submodule repository name.

use std::collections::HashMap;

use subsync_common::types::SubmoduleBinding;

/// Read-only lookup table built once from configuration.
#[derive(Debug, Clone, Default)]
pub struct SubmoduleRegistry {
    bindings: HashMap<String, SubmoduleBinding>,
}

impl SubmoduleRegistry {
    /// Build from validated bindings. Later duplicates of a repo name win;
    /// config validation rejects duplicates before this is reached.
    pub fn new(bindings: impl IntoIterator<Item = SubmoduleBinding>) -> Self {
        let bindings = bindings
            .into_iter()
            .map(|binding| (binding.submodule_repo.clone(), binding))
            .collect();
        Self { bindings }
    }

    /// `None` means the repository is not monitored.
    pub fn lookup(&self, submodule_repo: &str) -> Option<&SubmoduleBinding> {
        self.bindings.get(submodule_repo)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubmoduleBinding> {
        self.bindings.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(repo: &str, mount_path: &str) -> SubmoduleBinding {
        SubmoduleBinding {
            submodule_repo: repo.into(),
            submodule_branch: "main".into(),
            parent_repo: "app".into(),
            parent_branch: "main".into(),
            mount_path: mount_path.into(),
        }
    }

    #[test]
    fn lookup_finds_binding_by_repo_name() {
        let registry = SubmoduleRegistry::new([binding("lib", "vendor/lib"), binding("ui", "ui")]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("lib").map(|b| b.mount_path.as_str()), Some("vendor/lib"));
        assert_eq!(registry.lookup("ui").map(|b| b.mount_path.as_str()), Some("ui"));
    }

    #[test]
    fn unknown_repo_is_not_monitored() {
        let registry = SubmoduleRegistry::new([binding("lib", "vendor/lib")]);
        assert!(registry.lookup("other").is_none());
        assert!(registry.lookup("acme/lib").is_none(), "lookup is by short name only");
    }

    #[test]
    fn empty_registry() {
        let registry = SubmoduleRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.iter().count(), 0);
    }
}
