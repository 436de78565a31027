//! Effect orchestration: layout (re)generation, the Assembled/Scattered
//! state machine, and the per-tick schedule.
//!
//! One [`ShatterEffect`] owns one generation of shards at a time. A
//! re-partition (initial load, resize, randomize) replaces the whole vec
//! and bumps the generation epoch, which invalidates any staggered
//! retargets still pending from the previous generation. Rapid repeated
//! toggles are allowed to overlap: a pending retarget only assigns a new
//! scatter destination, so the latest one simply wins.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::compositor::{Compositor, FrameRGBA};
use crate::foundation::core::SurfaceSize;
use crate::foundation::error::{ShatterError, ShatterResult};
use crate::partition::partition;
use crate::physics;
use crate::schedule::RetargetQueue;
use crate::shard::{CoverFit, Shard};
use crate::source::{SourceImage, decode_source, fallback_image};

/// Per-index stagger between shard scatter starts on a toggle. Produces a
/// cascading shatter instead of a simultaneous one.
pub const TOGGLE_STAGGER_SECS: f64 = 0.02;

/// Upper bound for the per-shard random delay applied on a layout
/// randomization.
pub const RANDOMIZE_MAX_DELAY_SECS: f64 = 1.0;

/// The sampling grid resolves the shorter surface side into this many
/// steps. Coarser than pixel resolution on purpose; see
/// [`crate::partition`].
const SAMPLING_GRID_DIVISIONS: f64 = 120.0;

/// Constructor/initialization parameters, all defaulted.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// Locator of the source raster image. `None` uses the generated
    /// fallback from the start.
    pub image_source: Option<String>,
    /// Shard density rows; effective seed count is `rows * cols`.
    pub rows: u32,
    /// Shard density columns.
    pub cols: u32,
    /// Logical drawing-surface width in pixels.
    pub surface_width: u32,
    /// Logical drawing-surface height in pixels.
    pub surface_height: u32,
    /// Starting state.
    pub initial_assembled: bool,
    /// Whether the host UI should render toggle/randomize/density
    /// affordances. Presentation hint only; the core never reads it.
    pub show_controls: bool,
    /// Whether a pointer click on the surface toggles the effect.
    pub click_to_toggle: bool,
    /// Opaque background color drawn behind the shards. `None` leaves
    /// uncovered pixels transparent.
    pub background_rgba: Option<[u8; 4]>,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            image_source: None,
            rows: 12,
            cols: 12,
            surface_width: 800,
            surface_height: 800,
            initial_assembled: false,
            show_controls: true,
            click_to_toggle: true,
            background_rgba: None,
        }
    }
}

impl EffectConfig {
    /// Reject densities and surface sizes the pipeline assumes positive.
    pub fn validate(&self) -> ShatterResult<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ShatterError::config("rows and cols must be > 0"));
        }
        if self.surface_width == 0 || self.surface_height == 0 {
            return Err(ShatterError::config("surface width/height must be > 0"));
        }
        Ok(())
    }

    /// Requested seed count for the partitioner.
    pub fn seed_count(&self) -> usize {
        (self.rows as usize) * (self.cols as usize)
    }

    fn surface(&self) -> ShatterResult<SurfaceSize> {
        SurfaceSize::new(self.surface_width, self.surface_height)
    }
}

/// Notification fired after every Assembled/Scattered flip.
pub type ToggleCallback = Box<dyn FnMut(bool)>;

/// One live instance of the image-shattering effect.
///
/// The host owns the frame scheduler and input source: it calls
/// [`tick`](Self::tick) once per display refresh, then
/// [`render`](Self::render), and forwards clicks to
/// [`pointer_click`](Self::pointer_click). After
/// [`destroy`](Self::destroy) every entry point is inert, so a stale host
/// callback chain can never mutate a torn-down shard set.
pub struct ShatterEffect {
    config: EffectConfig,
    rng: Pcg64,

    source: SourceImage,
    viewport: SurfaceSize,
    compositor: Compositor,

    shards: Vec<Shard>,
    assembled: bool,
    epoch: u64,
    clock: f64,
    queue: RetargetQueue,

    destroyed: bool,
    on_toggle: Option<ToggleCallback>,
}

impl std::fmt::Debug for ShatterEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShatterEffect")
            .field("config", &self.config)
            .field("viewport", &self.viewport)
            .field("assembled", &self.assembled)
            .field("epoch", &self.epoch)
            .field("clock", &self.clock)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl ShatterEffect {
    /// Create an effect with an entropy-seeded random source.
    pub fn new(config: EffectConfig, image_bytes: Option<&[u8]>) -> ShatterResult<Self> {
        Self::build(config, image_bytes, Pcg64::from_entropy())
    }

    /// Create an effect with a deterministic random source. Layouts and
    /// scatter targets are reproducible for the same seed and inputs.
    pub fn with_seed(
        config: EffectConfig,
        image_bytes: Option<&[u8]>,
        seed: u64,
    ) -> ShatterResult<Self> {
        Self::build(config, image_bytes, Pcg64::seed_from_u64(seed))
    }

    fn build(config: EffectConfig, image_bytes: Option<&[u8]>, rng: Pcg64) -> ShatterResult<Self> {
        config.validate()?;
        let viewport = config.surface()?;

        let source = match image_bytes {
            Some(bytes) => decode_source(bytes).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "source image failed to decode, using fallback");
                fallback_image(viewport.width, viewport.height)
            }),
            None => fallback_image(viewport.width, viewport.height),
        };

        let mut compositor = Compositor::new(viewport).with_clear_rgba(config.background_rgba);
        compositor.set_source(&source)?;

        let mut effect = Self {
            assembled: config.initial_assembled,
            config,
            rng,
            source,
            viewport,
            compositor,
            shards: Vec::new(),
            epoch: 0,
            clock: 0.0,
            queue: RetargetQueue::new(),
            destroyed: false,
            on_toggle: None,
        };
        effect.repartition()?;
        if !effect.assembled {
            effect.stagger_scatter_indexed();
        }
        Ok(effect)
    }

    /// Register the state-flip notification callback.
    pub fn set_on_toggle(&mut self, callback: impl FnMut(bool) + 'static) {
        self.on_toggle = Some(Box::new(callback));
    }

    /// Current state flag.
    pub fn is_assembled(&self) -> bool {
        self.assembled
    }

    /// The live shard set of the current generation.
    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    /// Number of live shards. May be below `rows * cols` when degenerate
    /// cells were dropped; never above it.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Configuration this effect was built with (density kept current).
    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    /// Staggered retargets not yet fired. Host introspection.
    pub fn pending_retargets(&self) -> usize {
        self.queue.len()
    }

    /// True once [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Flip Assembled/Scattered. Entering Scattered draws fresh random
    /// destinations, cascading across shards by index.
    pub fn toggle(&mut self) {
        if self.destroyed {
            return;
        }
        self.assembled = !self.assembled;
        if !self.assembled {
            self.stagger_scatter_indexed();
        }
        self.fire_on_toggle();
    }

    /// Regenerate the layout from scratch: new seeds, new cells, new
    /// shards, forced Scattered so every randomize looks like a fresh
    /// shatter.
    pub fn randomize_layout(&mut self) {
        if self.destroyed {
            return;
        }
        if let Err(e) = self.repartition() {
            // Only reachable on degenerate surfaces; construction would
            // have failed there already, so keep going with an empty
            // generation rather than surprising the host mid-animation.
            tracing::warn!(error = %e, "layout randomization kept no cells");
        }
        let was_assembled = self.assembled;
        self.assembled = false;
        self.stagger_scatter_random();
        if was_assembled {
            self.fire_on_toggle();
        }
    }

    /// Change shard density. Equivalent to a randomize with the new
    /// density.
    pub fn set_density(&mut self, rows: u32, cols: u32) -> ShatterResult<()> {
        if rows == 0 || cols == 0 {
            return Err(ShatterError::config("rows and cols must be > 0"));
        }
        if self.destroyed {
            return Ok(());
        }
        self.config.rows = rows;
        self.config.cols = cols;
        self.randomize_layout();
        Ok(())
    }

    /// Adopt a new viewport: silent re-partition against the new region,
    /// preserving the Assembled/Scattered state. Errs when the new
    /// surface is zero-sized or too small to carry a single polygon.
    pub fn resize(&mut self, width: u32, height: u32) -> ShatterResult<()> {
        let viewport = SurfaceSize::new(width, height)?;
        if self.destroyed {
            return Ok(());
        }
        self.viewport = viewport;
        self.config.surface_width = width;
        self.config.surface_height = height;
        self.compositor.resize(viewport);
        self.repartition()?;
        if !self.assembled {
            // No cascade on resize; the new generation scatters in place.
            let viewport = self.viewport;
            let Self { shards, rng, .. } = self;
            for shard in shards.iter_mut() {
                shard.scatter(viewport, rng);
            }
        }
        Ok(())
    }

    /// Pointer click on the surface. Honors `click_to_toggle`.
    pub fn pointer_click(&mut self) {
        if self.config.click_to_toggle {
            self.toggle();
        }
    }

    /// Advance the effect by `dt` seconds: fire due retargets, then
    /// integrate every shard. All shards are integrated before any shard
    /// is drawn, so a later [`render`](Self::render) never observes a
    /// partially updated set.
    pub fn tick(&mut self, dt: f64) {
        if self.destroyed {
            return;
        }
        self.clock += dt;

        let viewport = self.viewport;
        let epoch = self.epoch;
        let clock = self.clock;
        let Self {
            queue, shards, rng, ..
        } = self;
        queue.drain_due(epoch, clock, |i| {
            if let Some(shard) = shards.get_mut(i) {
                shard.scatter(viewport, rng);
            }
        });

        for shard in self.shards.iter_mut() {
            physics::step(shard, self.assembled, dt);
        }
    }

    /// Draw the current shard set.
    pub fn render(&mut self) -> ShatterResult<FrameRGBA> {
        if self.destroyed {
            return Err(ShatterError::render("effect is destroyed"));
        }
        self.compositor.render(&self.shards)
    }

    /// Tear down: clears the shard set and invalidates every pending
    /// retarget. Subsequent ticks, toggles and randomizes are no-ops.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.epoch += 1;
        self.queue.clear();
        self.shards.clear();
    }

    /// Replace the shard set from a fresh partition of the current
    /// viewport. Bumps the epoch so stale deferred retargets never touch
    /// the new generation. Fails when every cell degenerates, which only
    /// happens for surfaces too small to carry a single polygon.
    fn repartition(&mut self) -> ShatterResult<()> {
        self.epoch += 1;
        self.queue.clear();

        let region = self.viewport.bounds();
        let step = (self.viewport.min_side() / SAMPLING_GRID_DIVISIONS).max(1.0);
        let requested = self.config.seed_count();
        let cells = partition(requested, region, step, &mut self.rng);

        let fit = CoverFit::compute(self.source.width, self.source.height, self.viewport);
        self.shards = cells
            .into_iter()
            .map(|cell| Shard::new(cell, fit, &mut self.rng))
            .collect();

        if self.shards.is_empty() {
            return Err(ShatterError::geometry(
                "partition produced no renderable cells",
            ));
        }
        if self.shards.len() < requested {
            tracing::debug!(
                requested,
                actual = self.shards.len(),
                "partition dropped degenerate cells"
            );
        }
        Ok(())
    }

    fn stagger_scatter_indexed(&mut self) {
        for i in 0..self.shards.len() {
            let due = self.clock + (i as f64) * TOGGLE_STAGGER_SECS;
            self.queue.schedule(self.epoch, due, i);
        }
    }

    fn stagger_scatter_random(&mut self) {
        for i in 0..self.shards.len() {
            let due = self.clock + self.rng.gen_range(0.0..RANDOMIZE_MAX_DELAY_SECS);
            self.queue.schedule(self.epoch, due, i);
        }
    }

    fn fire_on_toggle(&mut self) {
        let assembled = self.assembled;
        if let Some(cb) = self.on_toggle.as_mut() {
            cb(assembled);
        }
    }
}
