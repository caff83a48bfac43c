//! Chrome DevTools Protocol backend (uses the `headless_chrome` crate)
//!
//! One Chrome process serves the whole pool; every surface is a tab. The
//! crate's API is blocking, which is why the pool drives these calls from
//! `spawn_blocking`.

use crate::config::PoolConfig;
use crate::surface::{Engine, EngineLauncher, RenderSurface, SurfaceId};
use crate::theme::ViewportSpec;
use crate::{Error, Result};
use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::{Emulation, Page, DOM};
use headless_chrome::types::Bounds;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Flags that keep a long-lived headless Chrome stable in containers
static STABILITY_FLAGS: [&str; 9] = [
    "--no-sandbox",
    "--disable-gpu",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--no-first-run",
    "--no-zygote",
];

/// Launches headless Chrome for the pool
#[derive(Debug, Clone)]
pub struct CdpLauncher {
    chrome_path: Option<PathBuf>,
    window_size: (u32, u32),
}

impl CdpLauncher {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            chrome_path: config.chrome_path.clone(),
            window_size: (1200, crate::theme::INITIAL_HEIGHT),
        }
    }
}

impl EngineLauncher for CdpLauncher {
    fn launch(&self) -> Result<Arc<dyn Engine>> {
        let args: Vec<&OsStr> = STABILITY_FLAGS.iter().map(|f| OsStr::new(*f)).collect();

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some(self.window_size))
            // The pool owns the lifetime; never let Chrome idle out underneath it
            .idle_browser_timeout(Duration::from_secs(60 * 60 * 24 * 365))
            .path(self.chrome_path.clone())
            .args(args)
            .build()
            .map_err(|e| Error::EngineInit(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::EngineInit(format!("Failed to launch browser: {}", e)))?;

        // Tabs present right after launch belong to Chrome, not to the pool.
        let initial: HashSet<String> = browser
            .get_tabs()
            .lock()
            .map(|tabs| tabs.iter().map(|t| t.get_target_id().to_string()).collect())
            .unwrap_or_default();

        info!(
            "Launched headless Chrome (version: {})",
            browser
                .get_version()
                .map(|v| v.product)
                .unwrap_or_else(|_| "unknown".into())
        );

        Ok(Arc::new(CdpEngine {
            browser: Mutex::new(Some(browser)),
            initial,
            closed: ClosedTargets::default(),
        }))
    }
}

/// Target ids of tabs the pool has closed.
///
/// A closed tab stays in the browser's tab list until Chrome reports it
/// destroyed, so every wrapper of the same target consults this set.
#[derive(Debug, Clone, Default)]
struct ClosedTargets(Arc<Mutex<HashSet<String>>>);

impl ClosedTargets {
    /// Record `id` as closed. Returns false if it already was.
    fn mark(&self, id: &str) -> bool {
        match self.0.lock() {
            Ok(mut set) => set.insert(id.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(id.to_string()),
        }
    }

    fn contains(&self, id: &str) -> bool {
        match self.0.lock() {
            Ok(set) => set.contains(id),
            Err(poisoned) => poisoned.into_inner().contains(id),
        }
    }

    /// Forget ids that no longer appear in the tab list
    fn retain_listed(&self, listed: &HashSet<&str>) {
        if let Ok(mut set) = self.0.lock() {
            set.retain(|id| listed.contains(id.as_str()));
        }
    }
}

/// A running Chrome process
pub struct CdpEngine {
    browser: Mutex<Option<Browser>>,
    initial: HashSet<String>,
    closed: ClosedTargets,
}

impl CdpEngine {
    fn with_browser<T>(&self, f: impl FnOnce(&Browser) -> Result<T>) -> Result<T> {
        let guard = self
            .browser
            .lock()
            .map_err(|_| Error::Other("browser handle poisoned".into()))?;
        match guard.as_ref() {
            Some(browser) => f(browser),
            None => Err(Error::Surface("browser has been shut down".into())),
        }
    }

    fn wrap(&self, tab: Arc<Tab>) -> Arc<dyn RenderSurface> {
        Arc::new(CdpSurface {
            target_id: tab.get_target_id().to_string(),
            tab,
            closed: self.closed.clone(),
        })
    }
}

impl Engine for CdpEngine {
    fn new_surface(&self) -> Result<Arc<dyn RenderSurface>> {
        let tab = self.with_browser(|b| {
            b.new_tab()
                .map_err(|e| Error::Surface(format!("Failed to create tab: {}", e)))
        })?;
        Ok(self.wrap(tab))
    }

    fn surfaces(&self) -> Result<Vec<Arc<dyn RenderSurface>>> {
        let tabs = self.with_browser(|b| {
            let tabs = b
                .get_tabs()
                .lock()
                .map_err(|_| Error::Other("tab list poisoned".into()))?;
            Ok(tabs.clone())
        })?;
        let listed: HashSet<&str> = tabs.iter().map(|t| t.get_target_id().as_str()).collect();
        self.closed.retain_listed(&listed);
        Ok(tabs
            .iter()
            .filter(|t| {
                let id = t.get_target_id().as_str();
                !self.initial.contains(id) && !self.closed.contains(id)
            })
            .map(|t| self.wrap(Arc::clone(t)))
            .collect())
    }

    fn shutdown(&self) -> Result<()> {
        let browser = self
            .browser
            .lock()
            .map_err(|_| Error::Other("browser handle poisoned".into()))?
            .take();
        if browser.is_some() {
            // Dropping the handle terminates the child process
            drop(browser);
            info!("Headless Chrome terminated");
        }
        Ok(())
    }
}

/// One Chrome tab
pub struct CdpSurface {
    tab: Arc<Tab>,
    target_id: String,
    closed: ClosedTargets,
}

impl CdpSurface {
    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Surface(format!("tab {} is closed", self.target_id)));
        }
        Ok(())
    }

    fn set_transparent_background(&self, transparent: bool) -> Result<()> {
        let color = transparent.then_some(DOM::RGBA {
            r: 0,
            g: 0,
            b: 0,
            a: Some(0.0),
        });
        self.tab
            .call_method(Emulation::SetDefaultBackgroundColorOverride { color })
            .map_err(|e| Error::Capture(format!("Failed to set background override: {}", e)))?;
        Ok(())
    }
}

impl RenderSurface for CdpSurface {
    fn id(&self) -> SurfaceId {
        SurfaceId(self.target_id.clone())
    }

    fn configure(&self, viewport: &ViewportSpec) -> Result<()> {
        self.ensure_open()?;
        self.tab
            .set_bounds(Bounds::Normal {
                left: Some(0),
                top: Some(0),
                width: Some(viewport.width.max(viewport.min_width) as f64),
                height: Some(viewport.height as f64),
            })
            .map_err(|e| Error::Surface(format!("Failed to set viewport: {}", e)))?;
        self.tab
            .call_method(device_metrics(viewport)?)
            .map_err(|e| Error::Surface(format!("Failed to set device metrics: {}", e)))?;
        Ok(())
    }

    fn load(
        &self,
        markup: &str,
        ready_selector: Option<&str>,
        ready_timeout: Duration,
    ) -> Result<bool> {
        self.ensure_open()?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(markup.as_bytes());
        let url = format!("data:text/html;charset=utf-8;base64,{}", encoded);

        self.tab
            .navigate_to(&url)
            .map_err(|e| Error::Surface(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::Surface(format!("Wait for navigation failed: {}", e)))?;

        match ready_selector {
            Some(selector) => match self
                .tab
                .wait_for_element_with_custom_timeout(selector, ready_timeout)
            {
                Ok(_) => Ok(true),
                Err(e) => {
                    debug!("Ready marker {} not found: {}", selector, e);
                    Ok(false)
                }
            },
            None => Ok(true),
        }
    }

    fn measure_height(&self, selector: &str) -> Result<u32> {
        self.ensure_open()?;
        let selector_json = serde_json::to_string(selector)
            .map_err(|e| Error::Capture(format!("Invalid selector: {}", e)))?;
        let script = format!(
            "(function(){{const el=document.querySelector({});return el?Math.ceil(el.getBoundingClientRect().height):0;}})()",
            selector_json
        );
        let eval = self
            .tab
            .evaluate(&script, false)
            .map_err(|e| Error::Capture(format!("Height measurement failed: {}", e)))?;

        eval.value
            .as_ref()
            .and_then(|v| v.as_f64())
            .map(|h| h.max(0.0) as u32)
            .ok_or_else(|| Error::Capture("No value returned from height measurement".into()))
    }

    fn capture(&self, selector: &str, transparent: bool) -> Result<Vec<u8>> {
        self.ensure_open()?;
        self.set_transparent_background(transparent)?;

        let element = self
            .tab
            .find_element(selector)
            .map_err(|e| Error::Capture(format!("Element {} not found: {}", selector, e)))?;
        let mut clip = element
            .get_box_model()
            .map_err(|e| Error::Capture(format!("Failed to get box model: {}", e)))?
            .border_viewport();
        // Device metrics already carry the scale factor
        clip.scale = 1.0;

        let png = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::Capture(format!("Screenshot failed: {}", e)))?;

        if transparent {
            if let Err(e) = self.set_transparent_background(false) {
                warn!("Failed to reset background override: {}", e);
            }
        }
        Ok(png)
    }

    fn close(&self) -> Result<()> {
        if !self.closed.mark(&self.target_id) {
            return Ok(());
        }
        self.tab.close(true)?;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.contains(&self.target_id)
    }
}

/// Per-tab viewport emulation, the one place the device scale factor applies.
///
/// Built from JSON so optional protocol fields stay unset.
fn device_metrics(viewport: &ViewportSpec) -> Result<Emulation::SetDeviceMetricsOverride> {
    let params = serde_json::json!({
        "width": viewport.width.max(viewport.min_width),
        "height": viewport.height,
        "deviceScaleFactor": viewport.device_scale_factor,
        "mobile": false,
    });
    serde_json::from_value(params)
        .map_err(|e| Error::Surface(format!("Invalid device metrics: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launcher_takes_pool_settings() {
        let config = PoolConfig {
            chrome_path: Some(PathBuf::from("/opt/chrome")),
            ..PoolConfig::default()
        };
        let launcher = CdpLauncher::new(&config);
        assert_eq!(launcher.chrome_path, Some(PathBuf::from("/opt/chrome")));
        assert_eq!(launcher.window_size, (1200, crate::theme::INITIAL_HEIGHT));
    }

    #[test]
    fn device_metrics_carry_scale_once() {
        let viewport = ViewportSpec {
            device_scale_factor: 2.0,
            ..ViewportSpec::new(880, 300)
        };
        let metrics = device_metrics(&viewport).unwrap();
        assert_eq!(metrics.width, 880);
        assert_eq!(metrics.height, 300);
        assert_eq!(metrics.device_scale_factor, 2.0);
        assert!(!metrics.mobile);
        assert_eq!(metrics.scale, None);
    }

    #[test]
    fn closed_targets_are_shared_and_close_once() {
        let closed = ClosedTargets::default();
        let other_wrapper = closed.clone();
        assert!(closed.mark("tab-1"));
        assert!(other_wrapper.contains("tab-1"));
        assert!(!other_wrapper.mark("tab-1"));

        // Chrome has since dropped the tab from its list
        let listed: HashSet<&str> = ["tab-2"].into_iter().collect();
        closed.retain_listed(&listed);
        assert!(!other_wrapper.contains("tab-1"));
    }

    #[test]
    #[ignore] // Requires Chrome to be installed
    fn test_cdp_surface_round_trip() {
        let launcher = CdpLauncher::new(&PoolConfig::default());
        let engine = launcher.launch().expect("launch chrome");
        let surface = engine.new_surface().unwrap();
        surface.configure(&ViewportSpec::new(800, 600)).unwrap();
        let ready = surface
            .load(
                r#"<html><body><div class="container" style="height:120px">x</div></body></html>"#,
                Some(".container"),
                Duration::from_secs(5),
            )
            .unwrap();
        assert!(ready);
        assert_eq!(surface.measure_height(".container").unwrap(), 120);
        let png = surface.capture(".container", true).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
        assert_eq!(engine.surfaces().unwrap().len(), 1);
        surface.close().unwrap();
        // Closed tabs are skipped even before Chrome drops them from its list
        assert!(engine.surfaces().unwrap().is_empty());
        engine.shutdown().unwrap();
    }
}
