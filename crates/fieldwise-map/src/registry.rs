//! Process-wide mapper cache.
//!
//! A registry hands out one shared [`Mapper`] per (destination type, source
//! type, configuration identity) triple, so the cost of cataloguing and
//! compiling is paid once. Callers needing a private instance ask for a
//! fresh one instead.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use fieldwise_model::Reflect;

use crate::error::MapError;
use crate::mapper::{Mapper, MapperConfig};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    destination: TypeId,
    source: TypeId,
    config: String,
}

impl RegistryKey {
    fn new<D: Reflect, S: Reflect>(config: &MapperConfig) -> Self {
        Self {
            destination: TypeId::of::<D>(),
            source: TypeId::of::<S>(),
            config: config.identity(),
        }
    }
}

/// Insert-if-absent cache of type-erased mappers.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: Mutex<HashMap<RegistryKey, Arc<dyn Any + Send + Sync>>>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry instance.
    pub fn shared() -> &'static Self {
        static SHARED: OnceLock<MapperRegistry> = OnceLock::new();
        SHARED.get_or_init(Self::new)
    }

    /// Shared mapper under the default configuration, created on first
    /// request.
    pub fn get<D: Reflect, S: Reflect>(&self) -> Arc<Mapper<D, S>> {
        self.get_with(MapperConfig::default())
    }

    /// Shared mapper under an explicit configuration. Configurations with
    /// distinct identities cache independently.
    pub fn get_with<D: Reflect, S: Reflect>(&self, config: MapperConfig) -> Arc<Mapper<D, S>> {
        let key = RegistryKey::new::<D, S>(&config);
        let mut mappers = self.mappers.lock().expect("registry lock poisoned");
        let entry = mappers
            .entry(key)
            .or_insert_with(|| {
                tracing::debug!(
                    destination = std::any::type_name::<D>(),
                    source = std::any::type_name::<S>(),
                    config = %config.identity(),
                    "caching new mapper"
                );
                Arc::new(Mapper::<D, S>::with_config(config))
            })
            .clone();
        drop(mappers);
        match entry.downcast::<Mapper<D, S>>() {
            Ok(mapper) => mapper,
            // the key carries both TypeIds, so the stored type is fixed
            Err(_) => unreachable!("registry entry type matches its key"),
        }
    }

    /// A private mapper under the default configuration, never cached.
    pub fn get_new<D: Reflect, S: Reflect>(&self) -> Mapper<D, S> {
        Mapper::new()
    }

    /// A private mapper under an explicit configuration, never cached.
    pub fn get_new_with<D: Reflect, S: Reflect>(&self, config: MapperConfig) -> Mapper<D, S> {
        Mapper::with_config(config)
    }

    /// Replace the cached default-configuration mapper for this type pair
    /// with a freshly configured one.
    ///
    /// The new mapper is built and configured outside the registry lock,
    /// then swapped in atomically. In-flight callers holding the previous
    /// mapper keep mapping with it; later lookups see the replacement.
    pub fn configure<D: Reflect, S: Reflect>(
        &self,
        author: impl FnOnce(&Mapper<D, S>),
    ) -> Arc<Mapper<D, S>> {
        let config = MapperConfig::default();
        let mapper = Arc::new(Mapper::<D, S>::with_config(config.clone()));
        author(&mapper);

        let key = RegistryKey::new::<D, S>(&config);
        let erased: Arc<dyn Any + Send + Sync> = mapper.clone();
        self.mappers
            .lock()
            .expect("registry lock poisoned")
            .insert(key, erased);
        mapper
    }

    /// One-call mapping through the cached default mapper.
    pub fn map<D, S>(&self, source: &S) -> Result<D, MapError>
    where
        D: Reflect + Default,
        S: Reflect,
    {
        self.get::<D, S>().map(source)
    }

    /// One-call mapping onto an existing destination instance.
    pub fn map_into<D: Reflect, S: Reflect>(
        &self,
        destination: &mut D,
        source: &S,
    ) -> Result<(), MapError> {
        self.get::<D, S>().map_into(destination, source)
    }

    pub fn len(&self) -> usize {
        self.mappers.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MapperRegistry({} mappers)", self.len())
    }
}
