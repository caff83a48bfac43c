//! Backend seam: the rendering engine and its surfaces.
//!
//! Implementations are synchronous; the pool and the orchestrator drive them
//! from `tokio::task::spawn_blocking`. Every method may be called from any
//! thread, so implementations are `Send + Sync`.

use crate::theme::ViewportSpec;
use crate::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Stable identifier of a surface within one engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub String);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SurfaceId {
    fn from(s: &str) -> Self {
        SurfaceId(s.to_string())
    }
}

/// An isolated page inside the engine that markup is loaded into and
/// captured from.
pub trait RenderSurface: Send + Sync {
    fn id(&self) -> SurfaceId;

    /// Apply a viewport (size and device scale factor)
    fn configure(&self, viewport: &ViewportSpec) -> Result<()>;

    /// Load a complete HTML document. When `ready_selector` is given, waits
    /// up to `ready_timeout` for it and reports whether it appeared; a
    /// timeout is not an error.
    fn load(&self, markup: &str, ready_selector: Option<&str>, ready_timeout: Duration)
        -> Result<bool>;

    /// Rendered height in CSS pixels of the first element matching `selector`
    fn measure_height(&self, selector: &str) -> Result<u32>;

    /// PNG of the first element matching `selector`
    fn capture(&self, selector: &str, transparent: bool) -> Result<Vec<u8>>;

    /// Close the surface. Must be idempotent.
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// A launched rendering engine
pub trait Engine: Send + Sync {
    fn new_surface(&self) -> Result<Arc<dyn RenderSurface>>;

    /// Every surface the engine currently has open, tracked or not
    fn surfaces(&self) -> Result<Vec<Arc<dyn RenderSurface>>>;

    /// Terminate the engine process
    fn shutdown(&self) -> Result<()>;
}

/// Factory the pool uses to launch its engine lazily
pub trait EngineLauncher: Send + Sync {
    fn launch(&self) -> Result<Arc<dyn Engine>>;
}

impl<F> EngineLauncher for F
where
    F: Fn() -> Result<Arc<dyn Engine>> + Send + Sync,
{
    fn launch(&self) -> Result<Arc<dyn Engine>> {
        self()
    }
}
