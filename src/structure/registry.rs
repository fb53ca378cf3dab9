// Tue Jan 13 2026 - Alex

use crate::config::LayoutConfig;
use crate::marshal::StructIO;
use crate::structure::{LayoutBuilder, LayoutError, NestedResolver, StructId, StructLayout, StructTypeDescriptor};
use crate::utils::logging::ScopedTimer;
use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static GLOBAL: Lazy<LayoutRegistry> = Lazy::new(LayoutRegistry::default);

/// Process-wide cache of struct layouts, built lazily and at most once per type.
pub struct LayoutRegistry {
    config: LayoutConfig,
    layouts: RwLock<AHashMap<StructId, Arc<StructLayout>>>,
    build: Mutex<BuildState>,
    builds: AtomicUsize,
}

#[derive(Default)]
struct BuildState {
    descriptors: AHashMap<StructId, Arc<StructTypeDescriptor>>,
    /// Types whose layout is being computed right now.
    building: AHashSet<StructId>,
}

/// Resolver handed to the builder while the build lock is held, so nested
/// lookups reuse the lock instead of taking it again.
struct BuildContext<'r, 's> {
    registry: &'r LayoutRegistry,
    state: &'s mut BuildState,
}

impl NestedResolver for BuildContext<'_, '_> {
    fn resolve(&mut self, id: &StructId) -> Result<Arc<StructLayout>, LayoutError> {
        let registry = self.registry;
        if let Some(layout) = registry.layouts.read().get(id) {
            return Ok(layout.clone());
        }
        if self.state.building.contains(id) {
            return Err(LayoutError::RecursiveEmbedding(id.to_string()));
        }
        let desc = self
            .state
            .descriptors
            .get(id)
            .cloned()
            .ok_or_else(|| LayoutError::UnknownStruct(id.to_string()))?;

        self.state.building.insert(id.clone());
        let result = {
            let _timer = ScopedTimer::new(&format!("layout {}", id));
            LayoutBuilder::new(&registry.config).build(&desc, self)
        };
        self.state.building.remove(id);

        match result {
            Ok(layout) => {
                let layout = Arc::new(layout);
                registry.builds.fetch_add(1, Ordering::Relaxed);
                registry.layouts.write().insert(id.clone(), layout.clone());
                log::debug!(
                    "Built layout {}: size {}, align {}, {} solid ranges",
                    id,
                    layout.size(),
                    layout.alignment().as_usize(),
                    layout.solid_ranges().len()
                );
                Ok(layout)
            }
            Err(err) => {
                log::warn!("Layout build failed for {}: {}", id, err);
                Err(err)
            }
        }
    }
}

impl LayoutRegistry {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            layouts: RwLock::new(AHashMap::new()),
            build: Mutex::new(BuildState::default()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Registry shared by the whole process, configured for the host platform.
    pub fn global() -> &'static LayoutRegistry {
        &GLOBAL
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Records the descriptor of a struct type. Re-registering a type whose
    /// layout is already built is only accepted with an identical descriptor.
    pub fn register(&self, desc: StructTypeDescriptor) -> Result<(), LayoutError> {
        let mut state = self.build.lock();
        if let Some(existing) = state.descriptors.get(desc.id()) {
            if **existing != desc && self.layouts.read().contains_key(desc.id()) {
                return Err(LayoutError::DescriptorConflict(desc.id().to_string()));
            }
        }
        state.descriptors.insert(desc.id().clone(), Arc::new(desc));
        Ok(())
    }

    pub fn is_registered(&self, id: &StructId) -> bool {
        self.build.lock().descriptors.contains_key(id)
    }

    /// Returns the layout of `id`, building it (and any struct it embeds) on first use.
    pub fn get_layout(&self, id: &StructId) -> Result<Arc<StructLayout>, LayoutError> {
        if let Some(layout) = self.layouts.read().get(id) {
            return Ok(layout.clone());
        }
        let mut state = self.build.lock();
        BuildContext { registry: self, state: &mut state }.resolve(id)
    }

    /// Layout of `id` if it has already been built.
    pub fn get_cached(&self, id: &StructId) -> Option<Arc<StructLayout>> {
        self.layouts.read().get(id).cloned()
    }

    pub fn struct_io(&self, id: &StructId) -> Result<StructIO, LayoutError> {
        Ok(StructIO::with_config(self.get_layout(id)?, &self.config))
    }

    pub fn size(&self) -> usize {
        self.layouts.read().len()
    }

    /// Number of layouts computed since the registry was created.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Forgets built layouts; descriptors stay registered. Layouts already
    /// handed out remain valid.
    pub fn clear(&self) {
        let _state = self.build.lock();
        self.layouts.write().clear();
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Platform;
    use crate::structure::{FieldDescriptor, FieldKind, IntWidth};
    use rayon::prelude::*;

    fn registry() -> LayoutRegistry {
        LayoutRegistry::new(LayoutConfig::for_platform(Platform::lp64()))
    }

    #[test]
    fn test_self_referential_pointer() {
        let registry = registry();
        registry
            .register(
                StructTypeDescriptor::sequential("list")
                    .field(FieldDescriptor::signed("value", IntWidth::W32))
                    .field(FieldDescriptor::pointer("next", FieldKind::Struct("list".into()))),
            )
            .unwrap();

        let layout = registry.get_layout(&"list".into()).unwrap();
        let next = layout.field("next").unwrap();
        assert_eq!(next.byte_length(), 8);
        assert_eq!(next.byte_offset(), 8);
        assert_eq!(layout.size(), 16);
        assert!(layout.has_pointers());
    }

    #[test]
    fn test_self_pointer_on_32_bit() {
        let registry = LayoutRegistry::new(LayoutConfig::for_platform(Platform::ilp32()));
        registry
            .register(
                StructTypeDescriptor::sequential("tree")
                    .field(FieldDescriptor::pointer("left", FieldKind::Struct("tree".into())))
                    .field(FieldDescriptor::pointer("right", FieldKind::Struct("tree".into()))),
            )
            .unwrap();
        let layout = registry.get_layout(&"tree".into()).unwrap();
        assert_eq!(layout.field("right").unwrap().byte_length(), 4);
        assert_eq!(layout.size(), 8);
    }

    #[test]
    fn test_recursive_embedding_rejected_and_not_cached() {
        let registry = registry();
        registry
            .register(
                StructTypeDescriptor::sequential("a")
                    .field(FieldDescriptor::unsigned("x", IntWidth::W8))
                    .field(FieldDescriptor::nested("b", "b")),
            )
            .unwrap();
        registry
            .register(StructTypeDescriptor::sequential("b").field(FieldDescriptor::nested("a", "a")))
            .unwrap();

        let err = registry.get_layout(&"a".into()).unwrap_err();
        assert_eq!(err, LayoutError::RecursiveEmbedding("a".to_string()));
        assert_eq!(registry.size(), 0);

        // Fixing the descriptor makes the next lookup succeed.
        registry
            .register(StructTypeDescriptor::sequential("b").field(FieldDescriptor::pointer("a", FieldKind::Struct("a".into()))))
            .unwrap();
        let layout = registry.get_layout(&"a".into()).unwrap();
        assert_eq!(layout.size(), 16);
        assert_eq!(registry.size(), 2);
    }

    #[test]
    fn test_unknown_struct() {
        let err = registry().get_layout(&"ghost".into()).unwrap_err();
        assert_eq!(err, LayoutError::UnknownStruct("ghost".to_string()));
    }

    #[test]
    fn test_nested_layout_shared() {
        let registry = registry();
        registry
            .register(StructTypeDescriptor::sequential("inner").field(FieldDescriptor::unsigned("v", IntWidth::W16)))
            .unwrap();
        registry
            .register(StructTypeDescriptor::sequential("outer").field(FieldDescriptor::nested("i", "inner")))
            .unwrap();

        let outer = registry.get_layout(&"outer".into()).unwrap();
        let inner = registry.get_cached(&"inner".into()).unwrap();
        assert!(Arc::ptr_eq(outer.field("i").unwrap().nested_layout().unwrap(), &inner));
        assert_eq!(registry.build_count(), 2);
    }

    #[test]
    fn test_reregister_after_build() {
        let registry = registry();
        let desc = StructTypeDescriptor::sequential("s").field(FieldDescriptor::unsigned("v", IntWidth::W16));
        registry.register(desc.clone()).unwrap();
        registry.get_layout(&"s".into()).unwrap();

        assert!(registry.register(desc).is_ok());
        let changed = StructTypeDescriptor::sequential("s").field(FieldDescriptor::unsigned("v", IntWidth::W32));
        assert_eq!(
            registry.register(changed).unwrap_err(),
            LayoutError::DescriptorConflict("s".to_string())
        );
    }

    #[test]
    fn test_concurrent_lookups_build_once() {
        let registry = registry();
        registry
            .register(
                StructTypeDescriptor::sequential("shared")
                    .field(FieldDescriptor::signed("a", IntWidth::W64))
                    .field(FieldDescriptor::unsigned("b", IntWidth::W8)),
            )
            .unwrap();

        let layouts: Vec<_> = (0..64)
            .into_par_iter()
            .map(|_| registry.get_layout(&"shared".into()).unwrap())
            .collect();

        assert_eq!(registry.build_count(), 1);
        assert!(layouts.iter().all(|l| Arc::ptr_eq(l, &layouts[0])));
    }

    #[test]
    fn test_global_registry() {
        let global = LayoutRegistry::global();
        global
            .register(StructTypeDescriptor::sequential("global_counter").field(FieldDescriptor::unsigned("v", IntWidth::W32)))
            .unwrap();
        assert_eq!(global.get_layout(&"global_counter".into()).unwrap().size(), 4);
        assert!(std::ptr::eq(global, LayoutRegistry::global()));
    }
}
