//! Rendering collaborator interface
//!
//! The simulation never holds render state of its own. It reports instance
//! transforms to a `RenderBackend`, which owns meshes, batches and picking.
//! `SceneSync` keeps the bookkeeping of which simulation object lives in
//! which batch slot.

use std::collections::{BTreeMap, HashMap, HashSet};

use anyhow::anyhow;
use futures::executor::block_on;
use futures::future::{BoxFuture, FutureExt};
use log::{debug, error};

use super::shapes::{ResolvedTile, TileShape};
use super::traffic_light::LightPhase;
use super::types::{Position, VehicleId};
use super::vehicle::SimVehicle;

/// Identifies an instanced batch registered with the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchHandle(pub usize);

/// One instanced batch per distinct model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKey {
    Tile(TileShape),
    Grass,
    Vehicle,
    Light(LightPhase),
}

impl BatchKey {
    pub fn model_url(&self) -> &'static str {
        match self {
            BatchKey::Tile(shape) => shape.model_url(),
            BatchKey::Grass => "models/tiles/tile-grass.glb",
            BatchKey::Vehicle => "models/vehicles/car.glb",
            BatchKey::Light(LightPhase::Green) => "models/lights/traffic-light-green.glb",
            BatchKey::Light(LightPhase::Yellow | LightPhase::YellowDelay) => {
                "models/lights/traffic-light-yellow.glb"
            }
            BatchKey::Light(LightPhase::Red | LightPhase::RedDelay) => {
                "models/lights/traffic-light-red.glb"
            }
        }
    }
}

/// Pointer location handed to the backend for picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerCoord {
    pub x: f32,
    pub y: f32,
}

impl PointerCoord {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A loaded model
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAsset {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub position: Position,
    /// Y-axis rotation in radians
    pub rotation: f32,
}

impl Transform {
    pub fn new(position: Position, rotation: f32) -> Self {
        Self { position, rotation }
    }
}

pub trait RenderBackend {
    fn register_instance_batch(&mut self, key: BatchKey) -> BatchHandle;
    fn set_instance_transform(&mut self, handle: BatchHandle, index: usize, transform: Transform);
    fn hide_instance(&mut self, handle: BatchHandle, index: usize);
    /// Instances under the pointer, nearest first
    fn hit_test(&self, pointer: PointerCoord) -> Vec<(BatchHandle, usize)>;
    fn load_asset(&mut self, url: &str) -> BoxFuture<'static, anyhow::Result<MeshAsset>>;
}

/// What a simulation object is, for drawing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectKind {
    Road(ResolvedTile),
    Vehicle(VehicleId),
    Light(LightPhase),
    Grass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldObject {
    pub kind: ObjectKind,
    pub transform: Transform,
}

impl WorldObject {
    pub fn new(kind: ObjectKind, transform: Transform) -> Self {
        Self { kind, transform }
    }
}

pub trait Renderable {
    fn batch_key(&self) -> BatchKey;
    fn transform(&self) -> Transform;
}

impl Renderable for WorldObject {
    fn batch_key(&self) -> BatchKey {
        match self.kind {
            ObjectKind::Road(tile) => BatchKey::Tile(tile.shape),
            ObjectKind::Vehicle(_) => BatchKey::Vehicle,
            ObjectKind::Light(phase) => BatchKey::Light(phase),
            ObjectKind::Grass => BatchKey::Grass,
        }
    }

    fn transform(&self) -> Transform {
        self.transform
    }
}

impl From<&SimVehicle> for WorldObject {
    fn from(vehicle: &SimVehicle) -> Self {
        WorldObject::new(
            ObjectKind::Vehicle(vehicle.id),
            Transform::new(vehicle.position, vehicle.heading),
        )
    }
}

/// Stable identity of a drawn object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstanceKey {
    /// Linear cell index
    Tile(usize),
    Grass(usize),
    /// Vehicle slot
    Vehicle(usize),
    /// `cell_index * 4 + side`
    Light(usize),
}

impl InstanceKey {
    fn index(&self) -> usize {
        match *self {
            InstanceKey::Tile(i)
            | InstanceKey::Grass(i)
            | InstanceKey::Vehicle(i)
            | InstanceKey::Light(i) => i,
        }
    }
}

/// Batch registration and instance placement on top of a backend
#[derive(Debug, Default)]
pub struct SceneSync {
    batches: HashMap<BatchKey, BatchHandle>,
    failed: HashSet<BatchKey>,
    placed: HashMap<InstanceKey, BatchHandle>,
    by_slot: HashMap<(BatchHandle, usize), InstanceKey>,
}

impl SceneSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch for `key`, loading its model first. A failed load is logged
    /// once and remembered; the key never gets a batch afterwards.
    pub fn ensure_batch<R: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut R,
        key: BatchKey,
    ) -> Option<BatchHandle> {
        if let Some(handle) = self.batches.get(&key) {
            return Some(*handle);
        }
        if self.failed.contains(&key) {
            return None;
        }

        match block_on(backend.load_asset(key.model_url())) {
            Ok(asset) => {
                let handle = backend.register_instance_batch(key);
                debug!("Registered batch {:?} for {}", handle, asset.url);
                self.batches.insert(key, handle);
                Some(handle)
            }
            Err(err) => {
                error!("Failed to load {}: {:#}", key.model_url(), err);
                self.failed.insert(key);
                None
            }
        }
    }

    pub fn is_available<R: RenderBackend + ?Sized>(&mut self, backend: &mut R, key: BatchKey) -> bool {
        self.ensure_batch(backend, key).is_some()
    }

    /// Show `object` as `instance`, moving it out of its previous batch if
    /// the batch changed. Returns false when the model is unavailable.
    pub fn place<R: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut R,
        instance: InstanceKey,
        object: &impl Renderable,
    ) -> bool {
        let Some(handle) = self.ensure_batch(backend, object.batch_key()) else {
            return false;
        };
        if let Some(previous) = self.placed.get(&instance).copied() {
            if previous != handle {
                self.hide(backend, instance);
            }
        }
        backend.set_instance_transform(handle, instance.index(), object.transform());
        self.placed.insert(instance, handle);
        self.by_slot.insert((handle, instance.index()), instance);
        true
    }

    pub fn hide<R: RenderBackend + ?Sized>(&mut self, backend: &mut R, instance: InstanceKey) {
        if let Some(handle) = self.placed.remove(&instance) {
            backend.hide_instance(handle, instance.index());
            self.by_slot.remove(&(handle, instance.index()));
        }
    }

    /// Reverse lookup of a picked batch slot
    pub fn instance_at(&self, handle: BatchHandle, index: usize) -> Option<InstanceKey> {
        self.by_slot.get(&(handle, index)).copied()
    }

    pub fn is_placed(&self, instance: InstanceKey) -> bool {
        self.placed.contains_key(&instance)
    }
}

/// In-memory backend for headless runs and tests.
///
/// Pointer coordinates are read as ground-plane `(x, z)`; an instance is hit
/// when the pointer lies within half a cell of its position.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    batches: Vec<BatchKey>,
    visible: BTreeMap<(BatchHandle, usize), Transform>,
    failing_urls: HashSet<String>,
    loads: usize,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later load of `url` fail
    pub fn fail_asset(&mut self, url: &str) {
        self.failing_urls.insert(url.to_string());
    }

    pub fn batch_key(&self, handle: BatchHandle) -> Option<BatchKey> {
        self.batches.get(handle.0).copied()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn load_count(&self) -> usize {
        self.loads
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Number of visible instances drawn with `key`
    pub fn visible_in(&self, key: BatchKey) -> usize {
        self.visible
            .keys()
            .filter(|(handle, _)| self.batch_key(*handle) == Some(key))
            .count()
    }

    pub fn transform_of(&self, handle: BatchHandle, index: usize) -> Option<Transform> {
        self.visible.get(&(handle, index)).copied()
    }
}

impl RenderBackend for HeadlessRenderer {
    fn register_instance_batch(&mut self, key: BatchKey) -> BatchHandle {
        self.batches.push(key);
        BatchHandle(self.batches.len() - 1)
    }

    fn set_instance_transform(&mut self, handle: BatchHandle, index: usize, transform: Transform) {
        self.visible.insert((handle, index), transform);
    }

    fn hide_instance(&mut self, handle: BatchHandle, index: usize) {
        self.visible.remove(&(handle, index));
    }

    fn hit_test(&self, pointer: PointerCoord) -> Vec<(BatchHandle, usize)> {
        let target = Position::new(pointer.x, pointer.y);
        let mut hits: Vec<(f32, BatchHandle, usize)> = self
            .visible
            .iter()
            .filter(|(_, t)| {
                (t.position.x - target.x).abs() <= 0.5 && (t.position.z - target.z).abs() <= 0.5
            })
            .map(|((handle, index), t)| (t.position.distance(&target), *handle, *index))
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then((a.1, a.2).cmp(&(b.1, b.2))));
        hits.into_iter().map(|(_, handle, index)| (handle, index)).collect()
    }

    fn load_asset(&mut self, url: &str) -> BoxFuture<'static, anyhow::Result<MeshAsset>> {
        self.loads += 1;
        let result = if self.failing_urls.contains(url) {
            Err(anyhow!("asset {} is unavailable", url))
        } else {
            Ok(MeshAsset {
                url: url.to_string(),
            })
        };
        futures::future::ready(result).boxed()
    }
}
