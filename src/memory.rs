//! In-process backend that renders nothing.
//!
//! Behaves like a real engine as far as the pool can observe: surfaces are
//! created, listed, configured, captured and closed, with counters exposed for
//! assertions. Failures and delays can be injected. Used by the test suite
//! and the benches; also handy for exercising the pipeline on machines
//! without Chrome.

use crate::surface::{Engine, EngineLauncher, RenderSurface, SurfaceId};
use crate::theme::ViewportSpec;
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// PNG signature; captures start with it
pub const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Default)]
struct Shared {
    launches: AtomicUsize,
    next_id: AtomicUsize,
    live: Mutex<Vec<Arc<MemorySurface>>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
    peak_open: AtomicUsize,
    content_height: AtomicU32,
    fail_launch: AtomicBool,
    fail_capture: AtomicBool,
    fail_close: AtomicBool,
    never_ready: AtomicBool,
    capture_delay_ms: AtomicU32,
    open_delay_ms: AtomicU32,
    shut_down: AtomicBool,
    last_markup: Mutex<Option<String>>,
    last_viewport: Mutex<Option<ViewportSpec>>,
}

impl Shared {
    fn open_count(&self) -> usize {
        self.live.lock().map(|l| l.len()).unwrap_or(0)
    }
}

/// Launcher and inspection handle of the in-memory backend. Clones share
/// state.
#[derive(Clone)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let shared = Shared::default();
        shared.content_height.store(640, Ordering::SeqCst);
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Height reported by `measure_height`
    pub fn with_content_height(self, height: u32) -> Self {
        self.shared.content_height.store(height, Ordering::SeqCst);
        self
    }

    /// Blocking delay applied inside every capture
    pub fn with_capture_delay(self, delay: Duration) -> Self {
        self.shared
            .capture_delay_ms
            .store(delay.as_millis() as u32, Ordering::SeqCst);
        self
    }

    /// Blocking delay applied while the engine opens a surface
    pub fn with_open_delay(self, delay: Duration) -> Self {
        self.shared
            .open_delay_ms
            .store(delay.as_millis() as u32, Ordering::SeqCst);
        self
    }

    pub fn fail_launch(&self, fail: bool) {
        self.shared.fail_launch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_capture(&self, fail: bool) {
        self.shared.fail_capture.store(fail, Ordering::SeqCst);
    }

    pub fn fail_close(&self, fail: bool) {
        self.shared.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Make `load` report that the ready marker never appeared
    pub fn never_ready(&self, never: bool) {
        self.shared.never_ready.store(never, Ordering::SeqCst);
    }

    pub fn launches(&self) -> usize {
        self.shared.launches.load(Ordering::SeqCst)
    }

    /// Surfaces currently open in the engine
    pub fn open_surfaces(&self) -> usize {
        self.shared.open_count()
    }

    /// Highest number of simultaneously open surfaces seen so far
    pub fn peak_open(&self) -> usize {
        self.shared.peak_open.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shut_down.load(Ordering::SeqCst)
    }

    /// Markup most recently loaded into any surface
    pub fn last_markup(&self) -> Option<String> {
        self.shared.last_markup.lock().ok().and_then(|m| m.clone())
    }

    /// Viewport most recently applied to any surface
    pub fn last_viewport(&self) -> Option<ViewportSpec> {
        self.shared.last_viewport.lock().ok().and_then(|v| *v)
    }

    /// Open a surface behind the pool's back, as a crashed caller would
    /// leave one.
    pub fn spawn_stray_surface(&self) -> Result<SurfaceId> {
        if self.launches() == 0 {
            return Err(Error::Other("engine has not been launched".into()));
        }
        Ok(open_surface(&self.shared)?.id())
    }
}

fn open_surface(shared: &Arc<Shared>) -> Result<Arc<MemorySurface>> {
    if shared.shut_down.load(Ordering::SeqCst) {
        return Err(Error::Surface("engine has been shut down".into()));
    }
    let n = shared.next_id.fetch_add(1, Ordering::SeqCst);
    let surface = Arc::new(MemorySurface {
        id: SurfaceId(format!("memory-{}", n)),
        shared: Arc::clone(shared),
        closed: AtomicBool::new(false),
    });
    let mut live = shared
        .live
        .lock()
        .map_err(|_| Error::Other("memory engine state poisoned".into()))?;
    live.push(Arc::clone(&surface));
    shared.opened.fetch_add(1, Ordering::SeqCst);
    shared.peak_open.fetch_max(live.len(), Ordering::SeqCst);
    Ok(surface)
}

impl EngineLauncher for MemoryBackend {
    fn launch(&self) -> Result<Arc<dyn Engine>> {
        if self.shared.fail_launch.load(Ordering::SeqCst) {
            return Err(Error::EngineInit("memory engine launch refused".into()));
        }
        self.shared.launches.fetch_add(1, Ordering::SeqCst);
        self.shared.shut_down.store(false, Ordering::SeqCst);
        Ok(Arc::new(MemoryEngine {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MemoryEngine {
    shared: Arc<Shared>,
}

impl Engine for MemoryEngine {
    fn new_surface(&self) -> Result<Arc<dyn RenderSurface>> {
        let delay = self.shared.open_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay as u64));
        }
        Ok(open_surface(&self.shared)?)
    }

    fn surfaces(&self) -> Result<Vec<Arc<dyn RenderSurface>>> {
        let live = self
            .shared
            .live
            .lock()
            .map_err(|_| Error::Other("memory engine state poisoned".into()))?;
        Ok(live
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn RenderSurface>)
            .collect())
    }

    fn shutdown(&self) -> Result<()> {
        self.shared.shut_down.store(true, Ordering::SeqCst);
        let drained: Vec<_> = match self.shared.live.lock() {
            Ok(mut live) => live.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for surface in drained {
            surface.mark_closed();
        }
        Ok(())
    }
}

struct MemorySurface {
    id: SurfaceId,
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl MemorySurface {
    /// Returns false when the surface was already closed
    fn mark_closed(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.shared.closed.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Surface(format!("surface {} is closed", self.id)));
        }
        Ok(())
    }
}

impl RenderSurface for MemorySurface {
    fn id(&self) -> SurfaceId {
        self.id.clone()
    }

    fn configure(&self, viewport: &ViewportSpec) -> Result<()> {
        self.ensure_open()?;
        if let Ok(mut last) = self.shared.last_viewport.lock() {
            *last = Some(*viewport);
        }
        Ok(())
    }

    fn load(
        &self,
        markup: &str,
        ready_selector: Option<&str>,
        _ready_timeout: Duration,
    ) -> Result<bool> {
        self.ensure_open()?;
        if let Ok(mut last) = self.shared.last_markup.lock() {
            *last = Some(markup.to_string());
        }
        if self.shared.never_ready.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(match ready_selector {
            Some(selector) => {
                let name = selector.trim_start_matches(['.', '#']);
                markup.contains(name)
            }
            None => true,
        })
    }

    fn measure_height(&self, _selector: &str) -> Result<u32> {
        self.ensure_open()?;
        Ok(self.shared.content_height.load(Ordering::SeqCst))
    }

    fn capture(&self, selector: &str, _transparent: bool) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let delay = self.shared.capture_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay as u64));
        }
        if self.shared.fail_capture.load(Ordering::SeqCst) {
            return Err(Error::Capture(format!("no element matches {}", selector)));
        }
        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(self.id.0.as_bytes());
        Ok(png)
    }

    fn close(&self) -> Result<()> {
        if self.mark_closed() {
            if let Ok(mut live) = self.shared.live.lock() {
                live.retain(|s| s.id != self.id);
            }
        }
        if self.shared.fail_close.load(Ordering::SeqCst) {
            return Err(Error::Surface(format!("close of {} reported an error", self.id)));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surfaces_are_listed_until_closed() {
        let backend = MemoryBackend::new();
        let engine = backend.launch().unwrap();
        let a = engine.new_surface().unwrap();
        let _b = engine.new_surface().unwrap();
        assert_eq!(engine.surfaces().unwrap().len(), 2);

        a.close().unwrap();
        a.close().unwrap();
        assert!(a.is_closed());
        assert_eq!(backend.closed(), 1);
        assert_eq!(backend.open_surfaces(), 1);
        assert_eq!(backend.peak_open(), 2);
    }

    #[test]
    fn capture_produces_png_bytes() {
        let backend = MemoryBackend::new();
        let engine = backend.launch().unwrap();
        let s = engine.new_surface().unwrap();
        assert!(s.load("<div class=\"container\"></div>", Some(".container"), Duration::ZERO).unwrap());
        assert!(!s.load("<p></p>", Some(".container"), Duration::ZERO).unwrap());
        assert!(s.capture(".container", true).unwrap().starts_with(&PNG_MAGIC));

        backend.fail_capture(true);
        assert!(matches!(s.capture(".container", true), Err(Error::Capture(_))));
    }

    #[test]
    fn launch_failures_and_shutdown() {
        let backend = MemoryBackend::new();
        assert!(backend.spawn_stray_surface().is_err());
        backend.fail_launch(true);
        assert!(matches!(backend.launch(), Err(Error::EngineInit(_))));
        backend.fail_launch(false);

        let engine = backend.launch().unwrap();
        backend.spawn_stray_surface().unwrap();
        engine.shutdown().unwrap();
        assert!(backend.is_shut_down());
        assert_eq!(backend.open_surfaces(), 0);
        assert!(engine.new_surface().is_err());
    }
}
