//! Application-owned config context
//!
//! Holds the platform handles, the current config and the single in-flight
//! fetch. Created once by the application root and passed by reference to
//! whatever needs configuration.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use tracing::{debug, info, warn};

use crate::acquire::{self, Acquired, ConfigSource};
use crate::cache::{is_fresh, ConfigCache};
use crate::config::Settings;
use crate::device::DeviceInfo;
use crate::error::{ConfigError, Result};
use crate::model::RuntimeConfig;
use crate::platform::{Clock, HttpClient, Storage};

type SharedAcquire = Shared<LocalBoxFuture<'static, Result<Acquired>>>;

/// Platform handles used by the context
#[derive(Clone)]
pub struct Platform {
    pub http: Rc<dyn HttpClient>,
    pub storage: Rc<dyn Storage>,
    pub clock: Rc<dyn Clock>,
}

/// Outcome of a cold start
#[derive(Debug, Clone, PartialEq)]
pub struct Bootstrap {
    pub acquired: Acquired,
    /// Served from the cache; the caller should schedule `refresh()`
    pub refresh_recommended: bool,
}

pub struct ConfigContext {
    platform: Platform,
    settings: Rc<Settings>,
    device: Rc<DeviceInfo>,
    current: Rc<RefCell<Option<RuntimeConfig>>>,
    in_flight: RefCell<Option<(u64, SharedAcquire)>>,
    next_generation: Cell<u64>,
}

impl ConfigContext {
    pub fn new(platform: Platform, settings: Settings, device: DeviceInfo) -> Self {
        Self {
            platform,
            settings: Rc::new(settings),
            device: Rc::new(device),
            current: Rc::new(RefCell::new(None)),
            in_flight: RefCell::new(None),
            next_generation: Cell::new(0),
        }
    }

    /// Cache-first cold start
    ///
    /// A fresh cache entry is installed without touching the network.
    /// Otherwise the full remote chain runs and blocks the caller.
    pub async fn bootstrap(&self) -> Result<Bootstrap> {
        let cache = ConfigCache::new(self.platform.storage.as_ref());
        if let Some(cached) = cache.read().await {
            if is_fresh(&cached.config, self.platform.clock.now_millis()) {
                debug!("fresh runtime config found in cache");
                let config = acquire::fill_anon_key(cached.config, &self.settings);
                self.install(&config);
                return Ok(Bootstrap {
                    acquired: Acquired {
                        config,
                        source: ConfigSource::Cache { stale: false },
                    },
                    refresh_recommended: true,
                });
            }
            debug!("cached runtime config expired, fetching");
        }

        let acquired = self.acquire().await?;
        let refresh_recommended = matches!(acquired.source, ConfigSource::Cache { .. });
        Ok(Bootstrap {
            acquired,
            refresh_recommended,
        })
    }

    /// Run the fallback chain; concurrent callers share one fetch
    ///
    /// The caller joins the in-flight fetch when `acquire` is called, not
    /// when the returned future is first polled.
    pub fn acquire(&self) -> impl Future<Output = Result<Acquired>> + '_ {
        let (generation, fetch) = self.in_flight_or_start();

        async move {
            let result = fetch.await;

            let mut in_flight = self.in_flight.borrow_mut();
            if matches!(&*in_flight, Some((g, _)) if *g == generation) {
                *in_flight = None;
            }

            result
        }
    }

    /// Re-run acquisition; the current config is kept if it fails
    pub async fn refresh(&self) -> Result<Acquired> {
        let result = self.acquire().await;
        if let Err(e) = &result {
            warn!(error = %e, "runtime config refresh failed, keeping current config");
        }
        result
    }

    pub fn current(&self) -> Option<RuntimeConfig> {
        self.current.borrow().clone()
    }

    /// Current config, or `NotReady` so dependent subsystems refuse to start
    pub fn require(&self) -> Result<RuntimeConfig> {
        self.current().ok_or(ConfigError::NotReady)
    }

    /// Flag lookup; everything is disabled until a config is installed
    pub fn feature_enabled(&self, name: &str) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(|config| config.feature_enabled(name))
    }

    fn install(&self, config: &RuntimeConfig) {
        *self.current.borrow_mut() = Some(config.clone());
    }

    fn in_flight_or_start(&self) -> (u64, SharedAcquire) {
        let mut in_flight = self.in_flight.borrow_mut();
        if let Some((generation, fetch)) = in_flight.as_ref() {
            debug!("joining in-flight runtime config fetch");
            return (*generation, fetch.clone());
        }

        let generation = self.next_generation.get();
        self.next_generation.set(generation + 1);

        let platform = self.platform.clone();
        let settings = self.settings.clone();
        let device = self.device.clone();
        let current = self.current.clone();

        let fetch = async move {
            let result = acquire::acquire(
                &settings,
                &device,
                platform.http.as_ref(),
                platform.storage.as_ref(),
                platform.clock.as_ref(),
            )
            .await;

            if let Ok(acquired) = &result {
                *current.borrow_mut() = Some(acquired.config.clone());
                info!(source = ?acquired.source, "runtime config installed");
            }
            result
        }
        .boxed_local()
        .shared();

        *in_flight = Some((generation, fetch.clone()));
        (generation, fetch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionMode;
    use crate::test_support::{
        envelope_body, sample_config, test_device, test_settings, MockClock, MockHttp, MockStorage,
        SAMPLE_LAST_UPDATED_MILLIS,
    };

    const SECURE: &str = "/api/client-runtime-config/secure";
    const FRESH_NOW: u64 = SAMPLE_LAST_UPDATED_MILLIS + 60_000;

    fn context(http: Rc<MockHttp>, storage: Rc<MockStorage>, now: u64) -> ConfigContext {
        ConfigContext::new(
            Platform {
                http,
                storage,
                clock: Rc::new(MockClock(now)),
            },
            test_settings(),
            test_device(),
        )
    }

    #[tokio::test]
    async fn test_bootstrap_fresh_cache_skips_network() {
        let http = Rc::new(MockHttp::new());
        let storage = Rc::new(MockStorage::new());
        ConfigCache::new(storage.as_ref())
            .write(&sample_config(), ExecutionMode::Development, SAMPLE_LAST_UPDATED_MILLIS)
            .await
            .unwrap();

        let ctx = context(http.clone(), storage, FRESH_NOW);
        let boot = ctx.bootstrap().await.unwrap();

        assert_eq!(boot.acquired.source, ConfigSource::Cache { stale: false });
        assert!(boot.refresh_recommended);
        assert!(http.calls().is_empty());
        assert_eq!(ctx.current(), Some(sample_config()));
    }

    #[tokio::test]
    async fn test_bootstrap_without_cache_fetches() {
        let http = Rc::new(MockHttp::new());
        http.respond(SECURE, 200, envelope_body(&sample_config()));
        let storage = Rc::new(MockStorage::new());

        let ctx = context(http.clone(), storage, FRESH_NOW);
        let boot = ctx.bootstrap().await.unwrap();

        assert_eq!(boot.acquired.source, ConfigSource::Secure);
        assert!(!boot.refresh_recommended);
        assert_eq!(http.calls().len(), 1);
        assert!(ctx.require().is_ok());
    }

    #[tokio::test]
    async fn test_bootstrap_expired_cache_fetches() {
        let http = Rc::new(MockHttp::new());
        http.respond(SECURE, 200, envelope_body(&sample_config()));
        let storage = Rc::new(MockStorage::new());
        ConfigCache::new(storage.as_ref())
            .write(&sample_config(), ExecutionMode::Development, SAMPLE_LAST_UPDATED_MILLIS)
            .await
            .unwrap();

        let now = SAMPLE_LAST_UPDATED_MILLIS + sample_config().metadata.ttl * 1000 + 1;
        let ctx = context(http.clone(), storage, now);
        let boot = ctx.bootstrap().await.unwrap();

        assert_eq!(boot.acquired.source, ConfigSource::Secure);
        assert_eq!(http.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_total_failure_leaves_context_empty() {
        let http = Rc::new(MockHttp::new());
        let storage = Rc::new(MockStorage::new());

        let ctx = context(http, storage, FRESH_NOW);
        let err = ctx.bootstrap().await.unwrap_err();

        assert_eq!(err.error_key(), "config_unavailable");
        assert_eq!(ctx.require().unwrap_err(), ConfigError::NotReady);
        assert!(!ctx.feature_enabled("coins"));
    }

    #[tokio::test]
    async fn test_concurrent_acquire_shares_one_fetch() {
        let http = Rc::new(MockHttp::new());
        http.respond(SECURE, 200, envelope_body(&sample_config()));
        http.yield_before_response(true);
        let storage = Rc::new(MockStorage::new());

        let ctx = context(http.clone(), storage, FRESH_NOW);
        let (a, b, c) = futures::join!(ctx.acquire(), ctx.acquire(), ctx.acquire());

        assert_eq!(http.calls().len(), 1);
        assert_eq!(a.unwrap(), b.clone().unwrap());
        assert_eq!(b.unwrap().source, ConfigSource::Secure);
        assert!(c.is_ok());
    }

    #[tokio::test]
    async fn test_acquire_joins_fetch_at_call_time() {
        let http = Rc::new(MockHttp::new());
        http.respond(SECURE, 200, envelope_body(&sample_config()));
        http.yield_before_response(true);
        let storage = Rc::new(MockStorage::new());

        let ctx = context(http.clone(), storage, FRESH_NOW);
        let first = ctx.acquire();
        let second = ctx.acquire();

        // The first caller drives the fetch to completion before the second is polled
        let first = first.await.unwrap();
        let second = second.await.unwrap();

        assert_eq!(http.calls().len(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_sequential_acquire_fetches_again() {
        let http = Rc::new(MockHttp::new());
        http.respond(SECURE, 200, envelope_body(&sample_config()));
        let storage = Rc::new(MockStorage::new());

        let ctx = context(http.clone(), storage, FRESH_NOW);
        ctx.acquire().await.unwrap();
        ctx.acquire().await.unwrap();

        assert_eq!(http.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_current_config() {
        let http = Rc::new(MockHttp::new());
        http.respond(SECURE, 200, envelope_body(&sample_config()));
        let storage = Rc::new(MockStorage::new());

        let ctx = context(http.clone(), storage.clone(), FRESH_NOW);
        ctx.acquire().await.unwrap();

        http.clear();
        storage.clear();
        assert!(ctx.refresh().await.is_err());
        assert_eq!(ctx.current(), Some(sample_config()));
    }

    #[tokio::test]
    async fn test_feature_flags_follow_installed_config() {
        let http = Rc::new(MockHttp::new());
        http.respond(SECURE, 200, envelope_body(&sample_config()));
        let ctx = context(http, Rc::new(MockStorage::new()), FRESH_NOW);

        assert!(!ctx.feature_enabled("coins"));
        ctx.acquire().await.unwrap();
        assert!(ctx.feature_enabled("coins"));
        assert!(!ctx.feature_enabled("vip"));
    }
}
