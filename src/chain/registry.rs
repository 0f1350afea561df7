//! Injector registry — dispatch by chain kind
//!
//! Populated once at assembler construction. Dispatch is a keyed lookup
//! on the closed [`ChainKind`] enum; `register` replaces, so embedders
//! can swap a built-in for their own implementation.

use super::traits::ChainInjector;
use crate::recipe::ChainKind;
use std::collections::HashMap;

/// Holds one injector per chain kind
pub struct InjectorRegistry {
    injectors: HashMap<ChainKind, Box<dyn ChainInjector>>,
}

impl InjectorRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            injectors: HashMap::new(),
        }
    }

    /// A registry with both built-in injectors
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(super::StackInjector::new()));
        registry.register(Box::new(super::ExtensionInjector::new()));
        registry
    }

    /// Register an injector under its own kind, replacing any existing
    /// entry for that kind
    pub fn register(&mut self, injector: Box<dyn ChainInjector>) {
        self.injectors.insert(injector.kind(), injector);
    }

    /// The injector for a kind, if one is registered
    pub fn get(&self, kind: ChainKind) -> Option<&dyn ChainInjector> {
        self.injectors.get(&kind).map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.injectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.injectors.is_empty()
    }
}

impl Default for InjectorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{Assembly, AssembleError};
    use crate::chain::InjectOutcome;
    use crate::recipe::ChainDecl;
    use serde_json::Value;

    #[test]
    fn test_builtins_cover_both_kinds() {
        let registry = InjectorRegistry::with_builtins();
        assert_eq!(registry.len(), 2);
        assert!(registry.get(ChainKind::Stack).is_some());
        assert!(registry.get(ChainKind::Extension).is_some());
    }

    #[test]
    fn test_empty_registry_has_no_match() {
        let registry = InjectorRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(ChainKind::Stack).is_none());
    }

    struct NoopInjector;

    impl ChainInjector for NoopInjector {
        fn kind(&self) -> ChainKind {
            ChainKind::Stack
        }

        fn inject(
            &self,
            _asm: &mut Assembly,
            _decl: &ChainDecl,
            _items: &Value,
        ) -> Result<InjectOutcome, AssembleError> {
            Ok(InjectOutcome::Skipped)
        }
    }

    #[test]
    fn test_register_replaces_same_kind() {
        let mut registry = InjectorRegistry::with_builtins();
        registry.register(Box::new(NoopInjector));
        assert_eq!(registry.len(), 2);
    }
}
