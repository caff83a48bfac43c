//! Browser pool: bounded, leak-safe access to rendering surfaces.
//!
//! The pool lazily launches one engine and hands out at most
//! `max_concurrent` surfaces at a time. Callers beyond the bound wait in FIFO
//! order. Every handed-out surface carries a deadline after which it is
//! force-closed, and a periodic sweep closes any engine surface the pool does
//! not track.
//!
//! A surface is closed only by whoever removes it from the tracked set.
//! Creation plus insertion, release, and the sweep all hold the membership
//! lock, so a surface that is being created is never mistaken for a leak and
//! a release racing a sweep closes it once.

use crate::config::PoolConfig;
use crate::surface::{Engine, EngineLauncher, RenderSurface, SurfaceId};
use crate::theme::ViewportSpec;
use crate::{Error, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{OnceCell, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub active: usize,
    pub max: usize,
    pub available: usize,
}

struct Tracked {
    surface: Arc<dyn RenderSurface>,
    timer: Option<JoinHandle<()>>,
    // Returned to the semaphore once the entry is dropped, after close
    _permit: OwnedSemaphorePermit,
}

#[derive(Default)]
struct PoolState {
    tracked: HashMap<SurfaceId, Tracked>,
    reconciler: Option<JoinHandle<()>>,
}

struct PoolInner {
    config: PoolConfig,
    launcher: Arc<dyn EngineLauncher>,
    engine: OnceCell<Arc<dyn Engine>>,
    permits: Arc<Semaphore>,
    state: Mutex<PoolState>,
    membership: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl PoolInner {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(reconciler) = state.reconciler.take() {
            reconciler.abort();
        }
        for (_, entry) in state.tracked.drain() {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
        }
    }
}

/// Cloneable handle to a browser pool
#[derive(Clone)]
pub struct BrowserPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for BrowserPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserPool")
            .field("stats", &self.stats())
            .field("launched", &self.inner.engine.initialized())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl BrowserPool {
    /// Create a pool that launches its engine through `launcher` on first use.
    pub fn new<L>(config: PoolConfig, launcher: L) -> Result<Self>
    where
        L: EngineLauncher + 'static,
    {
        Self::with_launcher(config, Arc::new(launcher))
    }

    pub fn with_launcher(config: PoolConfig, launcher: Arc<dyn EngineLauncher>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                permits: Arc::new(Semaphore::new(config.max_concurrent)),
                config,
                launcher,
                engine: OnceCell::new(),
                state: Mutex::new(PoolState::default()),
                membership: tokio::sync::Mutex::new(()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Pool backed by headless Chrome
    #[cfg(feature = "cdp")]
    pub fn chrome(config: PoolConfig) -> Result<Self> {
        let launcher = crate::cdp::CdpLauncher::new(&config);
        Self::new(config, launcher)
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Launch the engine if needed. Concurrent callers share one launch; a
    /// failed launch is not cached, so a later call retries.
    pub async fn init(&self) -> Result<Arc<dyn Engine>> {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }
        let inner = &self.inner;
        let engine = inner
            .engine
            .get_or_try_init(|| async move {
                let launcher = Arc::clone(&inner.launcher);
                info!("Launching rendering engine");
                let launched = tokio::task::spawn_blocking(move || launcher.launch())
                    .await
                    .map_err(Error::from)
                    .and_then(|r| r);
                match launched {
                    Ok(engine) => Ok(engine),
                    Err(Error::EngineInit(msg)) => Err(Error::EngineInit(msg)),
                    Err(other) => Err(Error::EngineInit(other.to_string())),
                }
            })
            .await?;
        let engine = Arc::clone(engine);
        self.start_reconciler();
        Ok(engine)
    }

    fn start_reconciler(&self) {
        let mut state = self.inner.lock_state();
        if state.reconciler.is_some() || self.is_closed() {
            return;
        }
        let weak: Weak<PoolInner> = Arc::downgrade(&self.inner);
        let period = self.inner.config.reconcile_interval;
        state.reconciler = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let pool = match weak.upgrade() {
                    Some(inner) => BrowserPool { inner },
                    None => break,
                };
                if let Err(e) = pool.reconcile_now().await {
                    warn!("Leak reconciliation failed: {}", e);
                }
            }
        }));
        debug!("Leak reconciliation scheduled every {:?}", period);
    }

    /// Wait for capacity, then create and configure a surface.
    pub async fn acquire(&self, viewport: &ViewportSpec) -> Result<SurfaceLease> {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }
        let waiting = Arc::clone(&self.inner.permits).acquire_owned();
        let permit = match self.inner.config.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, waiting)
                .await
                .map_err(|_| Error::AcquireTimeout(limit.as_millis() as u64))?,
            None => waiting.await,
        }
        .map_err(|_| Error::PoolClosed)?;

        let engine = self.init().await?;

        let surface = {
            let _membership = self.inner.membership.lock().await;
            if self.is_closed() {
                return Err(Error::PoolClosed);
            }
            let surface = tokio::task::spawn_blocking(move || engine.new_surface()).await??;
            self.track(Arc::clone(&surface), permit);
            surface
        };
        let id = surface.id();
        debug!("Surface {} acquired ({} active)", id, self.stats().active);

        let configured = {
            let surface = Arc::clone(&surface);
            let viewport = *viewport;
            tokio::task::spawn_blocking(move || surface.configure(&viewport))
                .await
                .map_err(Error::from)
                .and_then(|r| r)
        };
        if let Err(e) = configured {
            self.release_surface(&id).await;
            return Err(e);
        }

        Ok(SurfaceLease {
            pool: self.clone(),
            surface,
            id,
            released: false,
        })
    }

    fn track(&self, surface: Arc<dyn RenderSurface>, permit: OwnedSemaphorePermit) {
        let id = surface.id();
        let timer = self.arm_timer(id.clone());
        self.inner.lock_state().tracked.insert(
            id,
            Tracked {
                surface,
                timer: Some(timer),
                _permit: permit,
            },
        );
    }

    fn arm_timer(&self, id: SurfaceId) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let deadline = self.inner.config.surface_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            if let Some(inner) = weak.upgrade() {
                let pool = BrowserPool { inner };
                if pool.is_tracked(&id) {
                    warn!("Surface {} not released within {:?}; force-closing", id, deadline);
                    pool.release_inner(&id, true).await;
                }
            }
        })
    }

    /// Release a surface by id. Returns whether it was tracked; releasing an
    /// unknown or already released surface is a no-op.
    pub async fn release_surface(&self, id: &SurfaceId) -> bool {
        self.release_inner(id, false).await
    }

    async fn release_inner(&self, id: &SurfaceId, from_timer: bool) -> bool {
        let _membership = self.inner.membership.lock().await;
        self.close_tracked(id, from_timer).await
    }

    /// Remove and close one tracked surface. Callers hold the membership lock.
    async fn close_tracked(&self, id: &SurfaceId, from_timer: bool) -> bool {
        let entry = match self.inner.lock_state().tracked.remove(id) {
            Some(entry) => entry,
            None => return false,
        };
        if !from_timer {
            if let Some(timer) = &entry.timer {
                timer.abort();
            }
        }

        let surface = Arc::clone(&entry.surface);
        match tokio::task::spawn_blocking(move || surface.close()).await {
            Ok(Ok(())) => debug!("Surface {} released", id),
            Ok(Err(e)) => warn!("Failed to close surface {}: {}", id, e),
            Err(e) => warn!("Close task for surface {} failed: {}", id, e),
        }
        drop(entry);
        true
    }

    pub fn is_tracked(&self, id: &SurfaceId) -> bool {
        self.inner.lock_state().tracked.contains_key(id)
    }

    /// Close every engine surface the pool does not track. Returns how many
    /// were closed. Runs periodically once the engine is up.
    pub async fn reconcile_now(&self) -> Result<usize> {
        let engine = match self.inner.engine.get() {
            Some(engine) => Arc::clone(engine),
            None => return Ok(0),
        };
        let _membership = self.inner.membership.lock().await;
        let visible = tokio::task::spawn_blocking(move || engine.surfaces()).await??;

        let leaked: Vec<Arc<dyn RenderSurface>> = {
            let state = self.inner.lock_state();
            visible
                .into_iter()
                .filter(|s| !s.is_closed() && !state.tracked.contains_key(&s.id()))
                .collect()
        };
        if leaked.is_empty() {
            return Ok(0);
        }

        warn!("Found {} leaked surface(s); closing", leaked.len());
        let count = leaked.len();
        for surface in leaked {
            let id = surface.id();
            match tokio::task::spawn_blocking(move || surface.close()).await {
                Ok(Ok(())) => warn!("Closed leaked surface {}", id),
                Ok(Err(e)) => warn!("Failed to close leaked surface {}: {}", id, e),
                Err(e) => warn!("Close task for leaked surface {} failed: {}", id, e),
            }
        }
        Ok(count)
    }

    /// Stop reconciliation, release every tracked surface and terminate the
    /// engine. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.permits.close();

        // An acquire holding membership finishes tracking its surface first
        let membership = self.inner.membership.lock().await;
        let (reconciler, ids) = {
            let mut state = self.inner.lock_state();
            let ids: Vec<SurfaceId> = state.tracked.keys().cloned().collect();
            (state.reconciler.take(), ids)
        };
        if let Some(reconciler) = reconciler {
            reconciler.abort();
        }
        futures::future::join_all(ids.iter().map(|id| self.close_tracked(id, false))).await;
        drop(membership);

        if let Some(engine) = self.inner.engine.get().cloned() {
            tokio::task::spawn_blocking(move || engine.shutdown()).await??;
        }
        info!("Browser pool shut down");
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        let active = self.inner.lock_state().tracked.len();
        let max = self.inner.config.max_concurrent;
        PoolStats {
            active,
            max,
            available: max.saturating_sub(active),
        }
    }
}

/// A surface handed out by the pool.
///
/// Call [`SurfaceLease::release`] when done. Dropping an unreleased lease
/// schedules the release on the current runtime.
pub struct SurfaceLease {
    pool: BrowserPool,
    surface: Arc<dyn RenderSurface>,
    id: SurfaceId,
    released: bool,
}

impl SurfaceLease {
    pub fn id(&self) -> &SurfaceId {
        &self.id
    }

    /// Shared handle to the surface, for use from blocking tasks
    pub fn surface(&self) -> Arc<dyn RenderSurface> {
        Arc::clone(&self.surface)
    }

    pub async fn release(mut self) {
        self.released = true;
        self.pool.release_surface(&self.id).await;
    }
}

impl Deref for SurfaceLease {
    type Target = dyn RenderSurface;

    fn deref(&self) -> &Self::Target {
        self.surface.as_ref()
    }
}

impl fmt::Debug for SurfaceLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceLease")
            .field("id", &self.id)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for SurfaceLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pool = self.pool.clone();
                let id = self.id.clone();
                handle.spawn(async move {
                    pool.release_surface(&id).await;
                });
            }
            Err(_) => warn!(
                "Surface {} dropped outside a runtime; the deadline or the sweep will close it",
                self.id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use std::time::Duration;

    fn pool(backend: &MemoryBackend, max: usize) -> BrowserPool {
        let config = PoolConfig {
            max_concurrent: max,
            ..PoolConfig::default()
        };
        BrowserPool::new(config, backend.clone()).unwrap()
    }

    #[tokio::test]
    async fn init_is_lazy_and_shared() {
        let backend = MemoryBackend::new();
        let pool = pool(&backend, 2);
        assert_eq!(backend.launches(), 0);

        let (a, b) = tokio::join!(pool.init(), pool.init());
        a.unwrap();
        b.unwrap();
        assert_eq!(backend.launches(), 1);
    }

    #[tokio::test]
    async fn lease_release_is_idempotent() {
        let backend = MemoryBackend::new();
        let pool = pool(&backend, 2);
        let lease = pool.acquire(&ViewportSpec::default()).await.unwrap();
        let id = lease.id().clone();
        assert_eq!(pool.stats().active, 1);
        assert_eq!(
            backend.last_viewport(),
            Some(ViewportSpec::default())
        );

        lease.release().await;
        assert!(!pool.release_surface(&id).await);
        assert_eq!(pool.stats(), PoolStats { active: 0, max: 2, available: 2 });
        assert_eq!(backend.closed(), 1);
    }

    #[tokio::test]
    async fn dropped_lease_is_released() {
        let backend = MemoryBackend::new();
        let pool = pool(&backend, 1);
        drop(pool.acquire(&ViewportSpec::default()).await.unwrap());

        // The drop schedules a release; the next acquire waits for it.
        let lease = tokio::time::timeout(
            Duration::from_secs(2),
            pool.acquire(&ViewportSpec::default()),
        )
        .await
        .expect("capacity returned")
        .unwrap();
        lease.release().await;
        assert_eq!(backend.open_surfaces(), 0);
    }

    #[tokio::test]
    async fn acquire_timeout_is_reported() {
        let backend = MemoryBackend::new();
        let config = PoolConfig {
            max_concurrent: 1,
            acquire_timeout: Some(Duration::from_millis(50)),
            ..PoolConfig::default()
        };
        let pool = BrowserPool::new(config, backend).unwrap();
        let held = pool.acquire(&ViewportSpec::default()).await.unwrap();
        let err = pool.acquire(&ViewportSpec::default()).await.unwrap_err();
        assert!(matches!(err, Error::AcquireTimeout(50)));
        held.release().await;
    }

    #[tokio::test]
    async fn close_errors_are_swallowed() {
        let backend = MemoryBackend::new();
        let pool = pool(&backend, 1);
        let lease = pool.acquire(&ViewportSpec::default()).await.unwrap();
        backend.fail_close(true);
        lease.release().await;
        assert_eq!(pool.stats().active, 0);
    }

    #[tokio::test]
    async fn shutdown_waits_for_in_flight_acquire() {
        let backend = MemoryBackend::new().with_open_delay(Duration::from_millis(100));
        let pool = pool(&backend, 2);
        pool.init().await.unwrap();

        let acquiring = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire(&ViewportSpec::default()).await })
        };
        // Let the acquire take membership and start opening its surface
        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.shutdown().await.unwrap();

        // Whether or not the acquire handed out a lease, nothing stays tracked
        let lease = acquiring.await.unwrap();
        assert_eq!(pool.stats().active, 0);
        assert_eq!(backend.opened(), 1);
        assert_eq!(backend.open_surfaces(), 0);
        assert!(backend.is_shut_down());
        drop(lease);

        let err = pool.acquire(&ViewportSpec::default()).await.unwrap_err();
        assert!(matches!(err, Error::PoolClosed));
    }
}
