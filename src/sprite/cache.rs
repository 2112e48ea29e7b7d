//! Keyed store of loaded sprite assets, addressed by generational handles

use super::{ShapeFlags, SpriteAsset};
use crate::asset::AssetSource;
use crate::display::PixelSurface;
use crate::error::LoadError;
use std::collections::HashMap;
use std::rc::Rc;

/// Stable reference to a cached asset. Goes stale when the asset is removed;
/// a stale handle never resolves to whatever reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteHandle {
    index: u32,
    generation: u32,
}

struct Entry {
    asset: SpriteAsset,
    access_count: u64,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

pub struct SpriteCache {
    assets: Rc<dyn AssetSource>,
    slots: Vec<Slot>,
    by_name: HashMap<String, SpriteHandle>,
    free: Vec<u32>,
}

#[inline]
fn key(name: &str) -> String {
    name.to_ascii_uppercase()
}

impl SpriteCache {
    pub fn new(assets: Rc<dyn AssetSource>) -> Self {
        Self {
            assets,
            slots: Vec::new(),
            by_name: HashMap::new(),
            free: Vec::new(),
        }
    }

    /// Handle for `name`, loading it from the asset source on first use
    pub fn get_or_load(&mut self, name: &str) -> Result<SpriteHandle, LoadError> {
        if let Some(handle) = self.handle(name) {
            if let Some(entry) = self.entry_mut(handle) {
                entry.access_count += 1;
            }
            return Ok(handle);
        }

        let data = self.assets.read(name).ok_or_else(|| {
            log::warn!("sprite {} not found", name);
            LoadError::NotFound(name.to_string())
        })?;
        let asset = SpriteAsset::from_bytes(name, data).map_err(|e| {
            log::warn!("sprite {} failed to load: {}", name, e);
            e
        })?;
        log::debug!(
            "loaded sprite {} ({} frames, {}x{})",
            name,
            asset.frame_count(),
            asset.size().0,
            asset.size().1
        );
        let handle = self.insert(asset);
        if let Some(entry) = self.entry_mut(handle) {
            entry.access_count = 1;
        }
        Ok(handle)
    }

    /// Parse `data` and cache it under `name`, replacing any previous asset
    pub fn load_bytes(&mut self, name: &str, data: &[u8]) -> Result<SpriteHandle, LoadError> {
        let asset = SpriteAsset::from_bytes(name, data)?;
        Ok(self.insert(asset))
    }

    /// Take ownership of an already built asset. An asset cached under the
    /// same name is evicted first.
    pub fn insert(&mut self, asset: SpriteAsset) -> SpriteHandle {
        let name = key(asset.name());
        if let Some(old) = self.by_name.get(&name).copied() {
            self.remove(old);
        }

        let entry = Entry {
            asset,
            access_count: 0,
        };
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                SpriteHandle {
                    index,
                    generation: slot.generation,
                }
            },
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                SpriteHandle {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            },
        };
        self.by_name.insert(name, handle);
        handle
    }

    pub fn handle(&self, name: &str) -> Option<SpriteHandle> {
        self.by_name.get(&key(name)).copied()
    }

    fn entry(&self, handle: SpriteHandle) -> Option<&Entry> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, handle: SpriteHandle) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    pub fn get(&self, handle: SpriteHandle) -> Option<&SpriteAsset> {
        self.entry(handle).map(|e| &e.asset)
    }

    pub fn get_mut(&mut self, handle: SpriteHandle) -> Option<&mut SpriteAsset> {
        self.entry_mut(handle).map(|e| &mut e.asset)
    }

    /// How many times the asset was requested or drawn through the cache
    pub fn access_count(&self, handle: SpriteHandle) -> u64 {
        self.entry(handle).map_or(0, |e| e.access_count)
    }

    /// Evict one asset. Returns false for a stale handle.
    pub fn remove(&mut self, handle: SpriteHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation {
            return false;
        }
        let Some(entry) = slot.entry.take() else {
            return false;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.by_name.remove(&key(entry.asset.name()));
        log::debug!("evicted sprite {}", entry.asset.name());
        true
    }

    pub fn remove_name(&mut self, name: &str) -> bool {
        self.handle(name).is_some_and(|h| self.remove(h))
    }

    /// Evict everything. Outstanding handles all go stale.
    pub fn clear(&mut self) {
        let handles: Vec<SpriteHandle> = self.by_name.values().copied().collect();
        for handle in handles {
            self.remove(handle);
        }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Bytes of decoded frame data across all cached assets
    pub fn memory_usage(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|s| s.entry.as_ref())
            .map(|e| e.asset.cache_size())
            .sum()
    }

    /// Plain transparent draw of a cached asset
    pub fn draw(
        &mut self,
        handle: SpriteHandle,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        frame: usize,
        flags: ShapeFlags,
    ) -> bool {
        let Some(entry) = self.entry_mut(handle) else {
            return false;
        };
        entry.access_count += 1;
        entry.asset.draw(surface, x, y, frame, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetStore;
    use crate::sprite::RawShape;

    fn cache_with(names: &[&str]) -> SpriteCache {
        let mut store = AssetStore::new();
        for name in names {
            store.insert(name, RawShape::encode(2, 2, &[&[1, 2, 3, 4], &[5, 6, 7, 8]]));
        }
        store.insert("BROKEN.SHP", vec![1, 2, 3]);
        SpriteCache::new(Rc::new(store))
    }

    #[test]
    fn test_get_or_load_reuses_entry() {
        let mut cache = cache_with(&["TANK.SHP"]);
        let a = cache.get_or_load("tank.shp").unwrap();
        let b = cache.get_or_load("TANK.SHP").unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.access_count(a), 2);
        assert_eq!(cache.get(a).unwrap().frame_count(), 2);
    }

    #[test]
    fn test_load_failures() {
        let mut cache = cache_with(&[]);
        assert_eq!(
            cache.get_or_load("MISSING.SHP"),
            Err(LoadError::NotFound("MISSING.SHP".into()))
        );
        assert!(matches!(
            cache.get_or_load("BROKEN.SHP"),
            Err(LoadError::Truncated { .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_stale_handles_after_remove() {
        let mut cache = cache_with(&["A.SHP", "B.SHP"]);
        let a = cache.get_or_load("A.SHP").unwrap();
        assert!(cache.remove(a));
        assert!(!cache.remove(a));
        assert!(cache.get(a).is_none());

        // Slot reuse does not revive the old handle
        let b = cache.get_or_load("B.SHP").unwrap();
        assert_eq!(b.index, a.index);
        assert!(cache.get(a).is_none());
        assert!(cache.get(b).is_some());
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let mut cache = cache_with(&[]);
        let data = RawShape::encode(1, 1, &[&[1]]);
        let first = cache.load_bytes("X.SHP", &data).unwrap();
        let second = cache.load_bytes("x.shp", &data).unwrap();
        assert_ne!(first, second);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(first).is_none());
        assert_eq!(cache.handle("X.SHP"), Some(second));
    }

    #[test]
    fn test_memory_usage_and_clear() {
        let mut cache = cache_with(&["A.SHP", "B.SHP"]);
        let a = cache.get_or_load("A.SHP").unwrap();
        let b = cache.get_or_load("B.SHP").unwrap();
        assert_eq!(cache.memory_usage(), 0);
        cache.get_mut(a).unwrap().precache_all();
        assert_eq!(cache.memory_usage(), 8);

        let mut surface = PixelSurface::new(4, 4);
        let mut s = surface.lock().unwrap();
        assert!(cache.draw(b, &mut s, 0, 0, 1, ShapeFlags::NONE));
        assert_eq!(s.get_pixel(1, 1), Some(8));
        assert_eq!(cache.memory_usage(), 12);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.memory_usage(), 0);
        assert!(!cache.draw(b, &mut s, 0, 0, 0, ShapeFlags::NONE));
    }
}
