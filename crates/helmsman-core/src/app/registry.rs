//! KindRegistry - このプロセスが扱うリソース種別の登録
//!
//! プロセス起動時に 1 度だけ構築し、参照で各コンポーネントに渡します。
//! グローバルな登録（init 時の副作用）は使いません。
//!
//! # 使用例
//! ```ignore
//! let mut registry = KindRegistry::new();
//! registry.register(GroupVersionKind::k8s_assistant())?;
//! let controller = ControllerBuilder::new(&registry).store(store).engine(engine).build()?;
//! ```

use std::collections::BTreeSet;

use crate::domain::GroupVersionKind;

/// Set of resource kinds known to this process.
#[derive(Debug, Default)]
pub struct KindRegistry {
    kinds: BTreeSet<GroupVersionKind>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("kind '{0}' is already registered")]
    AlreadyRegistered(GroupVersionKind),
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: GroupVersionKind) -> Result<(), RegistryError> {
        if self.kinds.contains(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }
        self.kinds.insert(kind);
        Ok(())
    }

    pub fn contains(&self, kind: &GroupVersionKind) -> bool {
        self.kinds.contains(kind)
    }

    pub fn registered_kinds(&self) -> Vec<GroupVersionKind> {
        self.kinds.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_contains() {
        let mut registry = KindRegistry::new();
        registry.register(GroupVersionKind::k8s_assistant()).unwrap();
        assert!(registry.contains(&GroupVersionKind::k8s_assistant()));
        assert!(!registry.contains(&GroupVersionKind::new("", "v1", "ConfigMap")));
    }

    #[test]
    fn test_double_registration() {
        let mut registry = KindRegistry::new();
        registry.register(GroupVersionKind::k8s_assistant()).unwrap();
        let result = registry.register(GroupVersionKind::k8s_assistant());
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn test_registered_kinds() {
        let mut registry = KindRegistry::new();
        registry.register(GroupVersionKind::k8s_assistant()).unwrap();
        assert_eq!(
            registry.registered_kinds(),
            vec![GroupVersionKind::k8s_assistant()]
        );
    }
}
