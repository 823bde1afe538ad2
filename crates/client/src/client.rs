use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use driftlands_backdrop::{Backdrop, MaskCache, NebulaBake, NebulaBaker};
use driftlands_common::{ChunkCoord, TileCoord, Viewport};
use driftlands_input::{DragCapture, MoveIntent, PointerEvent};
use driftlands_render::{
    CatalogError, DrawList, EntityAppearance, EntitySprite, ImageCache, ImageInfo, ObjectCatalog, ObjectSprite,
    SpriteCompositor, SpriteStats,
};
use driftlands_replica::{ProtocolError, ReplicaState};
use driftlands_stream::{FetchError, Minimap, StreamError, TileRegistry, TileStore, WorldMeta};
use driftlands_terrain::{RuleTable, TerrainCompositor, TerrainStats};
use glam::Vec2;

use crate::BootError;
use crate::boot::{BootTracker, STEP_DUST, STEP_NEBULA, STEP_STARS, STEP_TERRAIN, StepStatus};
use crate::clock::CameraState;
use crate::config::ClientConfig;
use crate::deferred::{DeferredInit, Launcher};
use crate::frame::{FrameContext, FrameTick};
use crate::nebula::{inline_launcher, nebula_seeds, thread_launcher};
use crate::stats::FrameStats;

/// Output of one composed frame.
#[derive(Debug)]
pub struct Frame {
    pub context: FrameContext,
    /// Back to front: backdrop, terrain, sprites.
    pub draw: DrawList,
    /// Chunks the host should fetch and report through
    /// [`Client::complete_chunk`].
    pub chunk_requests: Vec<ChunkCoord>,
    /// Sprite images the host should load and report through
    /// [`Client::complete_image`].
    pub image_requests: Vec<String>,
    /// Repeat move intents from a held drag.
    pub intents: Vec<MoveIntent>,
    pub terrain: TerrainStats,
    pub sprites: SpriteStats,
}

/// The client core: owns every subsystem and composes one draw list per
/// refresh.
///
/// Asynchronous results (chunks, images, server messages) come in through
/// the `complete_*`/`apply_*` methods between frames; [`Client::frame`]
/// only reads committed state and never fails.
pub struct Client {
    config: ClientConfig,
    boot: BootTracker,
    camera: CameraState,
    stats: FrameStats,
    origin_ms: Option<f64>,
    viewport: Viewport,
    frames: u64,

    store: TileStore,
    registry: TileRegistry,
    minimap: Minimap,
    terrain: TerrainCompositor,

    backdrop: Backdrop,
    baker: NebulaBaker,
    masks: Arc<Mutex<MaskCache>>,
    nebula: Option<DeferredInit<Vec<NebulaBake>>>,
    bakes: Vec<NebulaBake>,

    replica: ReplicaState,
    catalog: ObjectCatalog,
    images: ImageCache,
    sprites: SpriteCompositor,
    appearance: EntityAppearance,

    drag: DragCapture,
}

impl Client {
    pub fn new(meta: WorldMeta, config: ClientConfig) -> Result<Self, BootError> {
        let _span = tracing::info_span!("client_boot", seed = config.seed).entered();
        config.validate()?;
        meta.validate()?;
        let baker = NebulaBaker::new(config.backdrop.nebula.clone())?;

        let mut boot = BootTracker::new();
        let mut steps = vec![STEP_STARS, STEP_DUST, STEP_TERRAIN];
        if config.nebula_bakes > 0 {
            steps.push(STEP_NEBULA);
        }
        boot.begin(steps);

        boot.start(STEP_STARS);
        boot.start(STEP_DUST);
        let backdrop = Backdrop::new(config.seed, config.backdrop.clone());
        boot.done(STEP_STARS);
        boot.done(STEP_DUST);

        let masks = Arc::new(Mutex::new(match config.caches.masks.and_then(NonZeroUsize::new) {
            Some(cap) => MaskCache::new(cap),
            None => MaskCache::unbounded(),
        }));
        let images = match config.caches.images.and_then(NonZeroUsize::new) {
            Some(cap) => ImageCache::new(cap),
            None => ImageCache::unbounded(),
        };
        let nebula = (config.nebula_bakes > 0).then(|| {
            let seeds = nebula_seeds(config.seed, config.nebula_bakes);
            DeferredInit::new(STEP_NEBULA, config.boot, inline_launcher(baker.clone(), masks.clone(), seeds))
        });

        boot.start(STEP_TERRAIN);
        let store = TileStore::new(meta, config.stream.clone())?;
        let minimap = Minimap::new(&store);
        let terrain = TerrainCompositor::new(config.atlas, RuleTable::default(), config.seed);

        let viewport = Viewport {
            scale: config.frame.view_scale,
            ..Viewport::default()
        };
        // start over the middle of the world until the server says otherwise
        let center = Vec2::new(meta.width_tiles as f32, meta.height_tiles as f32) * 0.5 * terrain.tile_world_size();

        tracing::info!(
            width = meta.width_tiles,
            height = meta.height_tiles,
            chunk_size = meta.chunk_size,
            "client ready to run"
        );

        Ok(Self {
            camera: CameraState::new(center),
            stats: FrameStats::new(config.frame.stats_window),
            origin_ms: None,
            viewport: viewport.with_center(center),
            frames: 0,
            store,
            registry: TileRegistry::default(),
            minimap,
            terrain,
            backdrop,
            baker,
            masks,
            nebula,
            bakes: Vec::new(),
            replica: ReplicaState::new(config.replica),
            catalog: ObjectCatalog::new(),
            images,
            sprites: SpriteCompositor::new(config.sprites.clone()),
            appearance: EntityAppearance {
                sprite: "entities/wanderer.png".into(),
                size: Vec2::new(32.0, 48.0),
            },
            drag: DragCapture::new(config.input),
            boot,
            config,
        })
    }

    /// Swap the nebula launcher. Only possible before it has run.
    pub fn set_nebula_launcher(&mut self, launcher: Launcher<Vec<NebulaBake>>) -> bool {
        match &self.nebula {
            Some(init) if !init.is_launched() => {
                self.nebula = Some(DeferredInit::new(STEP_NEBULA, self.config.boot, launcher));
                true
            }
            _ => false,
        }
    }

    /// Bake the nebula on a worker thread instead of inline.
    pub fn use_threaded_nebula(&mut self) -> bool {
        let seeds = nebula_seeds(self.config.seed, self.config.nebula_bakes);
        let launcher = thread_launcher(self.baker.clone(), self.masks.clone(), seeds);
        self.set_nebula_launcher(launcher)
    }

    /// Compose one frame.
    pub fn frame(&mut self, tick: FrameTick) -> Frame {
        let _span = tracing::info_span!("frame", index = tick.frame_index).entered();
        let started = Instant::now();

        // everything returned so far has been painted
        if self.frames > 0 {
            self.poll_nebula(tick.now_ms);
        }

        if let Some(local) = self.replica.step(tick.dt) {
            self.camera.target = local;
        }
        let camera = self
            .camera
            .update(tick.dt, self.config.frame.camera_half_life_ms / 1000.0);
        self.viewport = self.viewport.with_center(camera);
        let origin = *self.origin_ms.get_or_insert(tick.now_ms);
        let ctx = FrameContext {
            frame_index: tick.frame_index,
            now_ms: tick.now_ms,
            elapsed_ms: (tick.now_ms - origin).max(0.0),
            dt: tick.dt,
            viewport: self.viewport,
            camera,
        };

        let intents = self.drag.tick(ctx.now_ms, &ctx.viewport).into_iter().collect();
        let chunk_requests = self.stream(&ctx);

        let mut draw = DrawList::new();
        self.backdrop.update(ctx.dt, &ctx.viewport);
        self.backdrop.draw(&ctx.viewport, ctx.time_s(), &mut draw);
        let terrain = self.terrain.compose(&self.store, &ctx.viewport, &mut draw);
        let sprites = self.compose_sprites(&ctx, &mut draw);

        self.stats.record(started.elapsed(), ctx.dt);
        self.frames += 1;
        tracing::trace!(commands = draw.len(), "frame composed");

        Frame {
            context: ctx,
            draw,
            chunk_requests,
            image_requests: self.images.take_requests(),
            intents,
            terrain,
            sprites,
        }
    }

    fn poll_nebula(&mut self, now_ms: f64) {
        let Some(init) = self.nebula.as_mut() else {
            return;
        };
        if let Some(bakes) = init.poll(now_ms, &mut self.boot) {
            let keys: Vec<String> = bakes.iter().map(|b| b.key.clone()).collect();
            self.backdrop.attach_nebula(&keys);
            self.bakes = bakes;
        }
        if init.is_finished() {
            self.nebula = None;
        }
    }

    fn stream(&mut self, ctx: &FrameContext) -> Vec<ChunkCoord> {
        let (tx, ty) = self.terrain.world_to_tile(ctx.camera);
        let requests = self
            .store
            .preload_around_point(tx, ty, self.config.stream.preload_radius);

        if self.boot.status(STEP_TERRAIN) == Some(&StepStatus::Working) {
            let meta = self.store.meta();
            let focus = TileCoord::new(tx, ty).chunk(meta.chunk_size);
            if self.store.is_cached(focus) || !meta.contains_chunk(focus) {
                self.boot.done(STEP_TERRAIN);
            }
        }
        self.minimap.refresh(&self.store, &self.registry);
        requests
    }

    fn compose_sprites(&mut self, ctx: &FrameContext, draw: &mut DrawList) -> SpriteStats {
        let objects: Vec<ObjectSprite<'_>> = self
            .replica
            .objects()
            .iter()
            .filter_map(|obj| match self.catalog.get(&obj.def_id) {
                Some(def) => Some(ObjectSprite {
                    id: obj.id.as_str(),
                    def,
                    position: obj.position,
                }),
                None => {
                    tracing::trace!(id = %obj.id, def = %obj.def_id, "object without definition");
                    None
                }
            })
            .collect();

        let mut entities: Vec<EntitySprite<'_>> = self
            .replica
            .remote_poses(ctx.now_ms)
            .map(|(id, pose)| EntitySprite {
                id: id.as_str(),
                pose,
                appearance: &self.appearance,
                local: false,
            })
            .collect();
        if let (Some(id), Some(pose)) = (self.replica.local_id(), self.replica.local_pose()) {
            entities.push(EntitySprite {
                id: id.as_str(),
                pose,
                appearance: &self.appearance,
                local: true,
            });
        }

        self.sprites.compose(
            &objects,
            &entities,
            &ctx.viewport,
            ctx.now_ms,
            ctx.dt,
            &mut self.images,
            draw,
        )
    }

    /// Apply one text frame from the server socket.
    pub fn apply_server_text(&mut self, text: &str, now_ms: f64) -> Result<(), ProtocolError> {
        self.replica.apply_text(text, now_ms)
    }

    /// Report the outcome of a chunk request.
    pub fn complete_chunk(&mut self, coord: ChunkCoord, result: Result<Vec<u8>, FetchError>) -> Result<(), StreamError> {
        self.store.complete_fetch(coord, result)
    }

    /// Report the outcome of a sprite image load.
    pub fn complete_image(&mut self, key: &str, result: Result<ImageInfo, String>) {
        if let Err(err) = &result {
            tracing::warn!(key, %err, "sprite image failed to load");
        }
        self.images.complete(key, result);
    }

    /// Load the object definition list and queue every sprite it names.
    pub fn load_object_catalog(&mut self, body: &str) -> Result<usize, CatalogError> {
        let catalog = ObjectCatalog::from_json(body)?;
        for path in catalog.sprite_paths() {
            self.images.require(path);
        }
        self.images.require(&self.appearance.sprite);
        self.catalog = catalog;
        tracing::debug!(defs = self.catalog.len(), "object catalog loaded");
        Ok(self.catalog.len())
    }

    /// Feed a pointer event. Press emits at once; repeats come from
    /// [`Frame::intents`].
    pub fn pointer(&mut self, event: PointerEvent, now_ms: f64) -> Option<MoveIntent> {
        self.drag.handle(event, now_ms, &self.viewport)
    }

    pub fn resize(&mut self, size: Vec2) {
        self.viewport.size = size.max(Vec2::ONE);
    }

    pub fn set_entity_appearance(&mut self, appearance: EntityAppearance) {
        self.appearance = appearance;
    }

    /// Camera target used until a local entity exists.
    pub fn set_camera_target(&mut self, target: Vec2) {
        self.camera.target = target;
    }

    pub fn boot(&self) -> &BootTracker {
        &self.boot
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    pub fn minimap(&self) -> &Minimap {
        &self.minimap
    }

    pub fn replica(&self) -> &ReplicaState {
        &self.replica
    }

    pub fn backdrop(&self) -> &Backdrop {
        &self.backdrop
    }

    /// Finished nebula bakes, for upload by the host renderer.
    pub fn nebula_bakes(&self) -> &[NebulaBake] {
        &self.bakes
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}
