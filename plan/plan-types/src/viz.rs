//! Process-wide debug visualization registry.
//!
//! Planner components publish marker batches to named channels; a host
//! application may install a [`MarkerVisualizer`] to consume them. The
//! registry is a mutex-guarded process singleton with an explicit
//! init/teardown API. Publishing is best-effort: with no visualizer
//! installed, or a channel below its configured level, markers are dropped
//! silently. Publishers are blocked only while the visualizer consumes, so
//! visualizers should copy quickly.
//!
//! # Example
//!
//! ```
//! use plan_types::viz::{self, Marker, VizLevel};
//!
//! viz::init();
//! viz::set_level("collision", VizLevel::Debug);
//! // No visualizer installed: this is dropped, not an error.
//! viz::publish("collision", VizLevel::Info, &[Marker::sphere("s", [0.0; 3], 0.1)]);
//! viz::shutdown();
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

/// Severity levels of visualization channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VizLevel {
    /// Verbose development output.
    Debug,
    /// Normal output.
    Info,
    /// Something surprising.
    Warn,
    /// Something wrong.
    Error,
}

/// A visualization marker: a sphere or a polyline in the planning frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Namespace the marker belongs to.
    pub ns: String,
    /// Sphere center or polyline vertices.
    pub points: Vec<[f64; 3]>,
    /// Sphere radius or line width, in meters.
    pub scale: f64,
    /// RGBA color in `[0, 1]`.
    pub color: [f32; 4],
}

impl Marker {
    /// Creates a single-sphere marker with a default color.
    #[must_use]
    pub fn sphere(ns: impl Into<String>, center: [f64; 3], radius: f64) -> Self {
        Self {
            ns: ns.into(),
            points: vec![center],
            scale: radius,
            color: [0.8, 0.3, 0.5, 1.0],
        }
    }

    /// Creates a polyline marker with a default color.
    #[must_use]
    pub fn line(ns: impl Into<String>, points: Vec<[f64; 3]>, width: f64) -> Self {
        Self {
            ns: ns.into(),
            points,
            scale: width,
            color: [0.3, 0.8, 0.5, 1.0],
        }
    }
}

/// Consumes published markers. Keep `publish` fast: all publishers block
/// while it runs.
pub trait MarkerVisualizer: Send {
    /// Receives one published batch.
    fn publish(&mut self, channel: &str, markers: &[Marker]);
}

#[derive(Default)]
struct Registry {
    initialized: bool,
    channels: HashMap<String, VizLevel>,
    visualizer: Option<Box<dyn MarkerVisualizer>>,
}

static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();

fn registry() -> &'static Mutex<Registry> {
    REGISTRY.get_or_init(|| Mutex::new(Registry::default()))
}

fn with_registry<T>(f: impl FnOnce(&mut Registry) -> T) -> T {
    let mut guard = registry().lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

/// Initializes the registry. Idempotent.
pub fn init() {
    with_registry(|r| r.initialized = true);
}

/// Tears the registry down, dropping the installed visualizer and all
/// channel configuration.
pub fn shutdown() {
    with_registry(|r| {
        r.initialized = false;
        r.channels.clear();
        r.visualizer = None;
    });
}

/// Sets the minimum level at which a channel publishes.
pub fn set_level(channel: &str, level: VizLevel) {
    with_registry(|r| {
        r.channels.insert(channel.to_owned(), level);
    });
}

/// Returns a channel's configured level. Unconfigured channels default to
/// [`VizLevel::Info`].
#[must_use]
pub fn level(channel: &str) -> VizLevel {
    with_registry(|r| r.channels.get(channel).copied().unwrap_or(VizLevel::Info))
}

/// Installs the active visualizer, replacing any previous one.
pub fn set_visualizer(visualizer: Box<dyn MarkerVisualizer>) {
    with_registry(|r| r.visualizer = Some(visualizer));
}

/// Removes the active visualizer.
pub fn clear_visualizer() {
    with_registry(|r| r.visualizer = None);
}

/// Publishes a marker batch to a channel. Best-effort: dropped when the
/// registry is uninitialized, the level is below the channel's, or no
/// visualizer is installed.
pub fn publish(channel: &str, level: VizLevel, markers: &[Marker]) {
    with_registry(|r| {
        if !r.initialized {
            return;
        }
        let min = r.channels.get(channel).copied().unwrap_or(VizLevel::Info);
        if level < min {
            return;
        }
        if let Some(viz) = r.visualizer.as_mut() {
            viz.publish(channel, markers);
        }
    });
}
