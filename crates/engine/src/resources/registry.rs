use std::{
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use cogwork_types::ResourceError;
use cogwork_util::run_blocking_with_timeout;
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::{ResourceFactory, ResourceHandle};

/// Per-family state: the factory, the published handle and the construction lock.
struct FamilySlot {
    family: String,
    factory: Arc<dyn ResourceFactory>,
    handle: RwLock<Option<ResourceHandle>>,
    /// Serialises construction and teardown for this family only.
    construct_lock: Mutex<()>,
    constructions: AtomicU64,
    /// Set while a worker thread is inside `connect`, including one the caller gave up on.
    attaching: Arc<AtomicBool>,
}

impl FamilySlot {
    fn cached(&self) -> Option<ResourceHandle> {
        self.handle.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, handle: Option<ResourceHandle>) -> Option<ResourceHandle> {
        let mut slot = self.handle.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, handle)
    }
}

/// Registry of lazily created, process-wide application handles.
///
/// The registry is an explicit value shared by `Arc`: several workflow runs may
/// use one registry from different threads, and concurrent [`instance`] calls
/// for the same family construct at most once.
///
/// [`instance`]: ResourceRegistry::instance
pub struct ResourceRegistry {
    slots: RwLock<IndexMap<String, Arc<FamilySlot>>>,
    acquire_timeout: Option<Duration>,
}

impl ResourceRegistry {
    /// Create a registry that constructs handles inline on the calling thread.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(IndexMap::new()),
            acquire_timeout: None,
        }
    }

    /// Create a registry that gives up on construction after `timeout`.
    ///
    /// Construction then runs on a worker thread; a handle that arrives after
    /// the deadline is shut down instead of being published. The abandoned
    /// worker cannot be interrupted, so until it returns further `instance`
    /// calls for that family fail fast instead of starting a second `connect`.
    pub fn with_acquire_timeout(timeout: Duration) -> Self {
        Self {
            slots: RwLock::new(IndexMap::new()),
            acquire_timeout: Some(timeout),
        }
    }

    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }

    /// Register the factory for its family. Each family accepts one factory.
    pub fn register(&self, factory: Arc<dyn ResourceFactory>) -> Result<(), ResourceError> {
        let family = factory.family().to_string();
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if slots.contains_key(&family) {
            return Err(ResourceError::already_registered(family));
        }
        debug!(family = %family, "registered resource factory");
        slots.insert(
            family.clone(),
            Arc::new(FamilySlot {
                family,
                factory,
                handle: RwLock::new(None),
                construct_lock: Mutex::new(()),
                constructions: AtomicU64::new(0),
                attaching: Arc::new(AtomicBool::new(false)),
            }),
        );
        Ok(())
    }

    /// Return the live handle for `family`, constructing it on first demand.
    ///
    /// Callers between two [`quit`](ResourceRegistry::quit) calls observe the
    /// same `Arc`.
    pub fn instance(&self, family: &str) -> Result<ResourceHandle, ResourceError> {
        let slot = self.slot(family)?;
        if let Some(handle) = slot.cached() {
            return Ok(handle);
        }

        let _guard = slot.construct_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.cached() {
            return Ok(handle);
        }

        let handle = self.construct(&slot)?;
        slot.constructions.fetch_add(1, Ordering::SeqCst);
        slot.publish(Some(Arc::clone(&handle)));
        info!(family = %slot.family, "attached to application");
        Ok(handle)
    }

    /// Tear down the live handle for `family`, if any.
    ///
    /// Returns whether a handle was torn down. Teardown failures are logged and
    /// swallowed; the cache is cleared either way so the next
    /// [`instance`](ResourceRegistry::instance) call constructs afresh.
    pub fn quit(&self, family: &str) -> Result<bool, ResourceError> {
        let slot = self.slot(family)?;
        let _guard = slot.construct_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.publish(None) {
            Some(handle) => {
                teardown(&slot.family, &handle);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Quit every family, returning how many live handles were torn down.
    pub fn shutdown(&self) -> usize {
        let slots: Vec<Arc<FamilySlot>> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut torn_down = 0;
        for slot in slots {
            let _guard = slot.construct_lock.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(handle) = slot.publish(None) {
                teardown(&slot.family, &handle);
                torn_down += 1;
            }
        }
        if torn_down > 0 {
            info!(count = torn_down, "resource registry shut down");
        }
        torn_down
    }

    /// Quit every family whose handle nobody outside the registry still holds.
    ///
    /// Hosts sharing one registry between runs call this when a run finishes:
    /// handles still referenced by another run's actions stay live. Returns how
    /// many handles were torn down.
    pub fn release_idle(&self) -> usize {
        let slots: Vec<Arc<FamilySlot>> = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut torn_down = 0;
        for slot in slots {
            let _guard = slot.construct_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let idle = {
                let mut published = slot.handle.write().unwrap_or_else(PoisonError::into_inner);
                if published.as_ref().is_some_and(|handle| Arc::strong_count(handle) > 1) {
                    debug!(family = %slot.family, "application handle still in use; keeping it live");
                    None
                } else {
                    published.take()
                }
            };
            if let Some(handle) = idle {
                teardown(&slot.family, &handle);
                torn_down += 1;
            }
        }
        torn_down
    }

    /// Whether `family` currently has a published handle.
    pub fn is_live(&self, family: &str) -> bool {
        self.slot(family).map(|slot| slot.cached().is_some()).unwrap_or(false)
    }

    /// Number of successful constructions for `family` since registration.
    pub fn constructions(&self, family: &str) -> u64 {
        self.slot(family)
            .map(|slot| slot.constructions.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Registered family names in registration order.
    pub fn families(&self) -> Vec<String> {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }

    fn slot(&self, family: &str) -> Result<Arc<FamilySlot>, ResourceError> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(family)
            .cloned()
            .ok_or_else(|| ResourceError::unknown_family(family))
    }

    fn construct(&self, slot: &FamilySlot) -> Result<ResourceHandle, ResourceError> {
        let family = slot.family.as_str();
        debug!(family, "constructing application handle");

        let Some(timeout) = self.acquire_timeout else {
            return slot.factory.connect().map_err(|reason| ResourceError::acquisition(family, reason));
        };

        if slot.attaching.swap(true, Ordering::SeqCst) {
            return Err(ResourceError::acquisition(family, "a previous attach attempt has not finished yet"));
        }
        let attaching = AttachGuard(Arc::clone(&slot.attaching));
        let factory = Arc::clone(&slot.factory);
        let late_family = family.to_string();
        let outcome = run_blocking_with_timeout(
            timeout,
            move || {
                let _attaching = attaching;
                factory.connect()
            },
            move |late: Result<ResourceHandle, String>| {
                if let Ok(handle) = late {
                    warn!(family = %late_family, "application handle arrived after the acquire deadline; shutting it down");
                    teardown(&late_family, &handle);
                }
            },
        )
        .map_err(|error| ResourceError::acquisition(family, error.to_string()))?;

        match outcome {
            Some(result) => result.map_err(|reason| ResourceError::acquisition(family, reason)),
            None => {
                warn!(family, ?timeout, "timed out attaching to application");
                Err(ResourceError::timeout(family, timeout))
            }
        }
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("families", &self.families())
            .field("acquire_timeout", &self.acquire_timeout)
            .finish()
    }
}

/// Clears a slot's `attaching` flag when the worker finishes, panics, or never starts.
struct AttachGuard(Arc<AtomicBool>);

impl Drop for AttachGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn teardown(family: &str, handle: &ResourceHandle) {
    match handle.shutdown() {
        Ok(()) => info!(family, "application handle shut down"),
        Err(reason) => warn!(family, %reason, "error while shutting down application handle"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{ApplicationHandle, FnFactory, downcast_handle};
    use std::sync::atomic::AtomicUsize;

    struct Engine {
        id: usize,
        shutdowns: Arc<AtomicUsize>,
        fail_shutdown: bool,
    }

    impl ApplicationHandle for Engine {
        fn shutdown(&self) -> Result<(), String> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            if self.fail_shutdown { Err("endpoint already gone".into()) } else { Ok(()) }
        }
    }

    fn engine_factory(family: &str, fail_shutdown: bool) -> (Arc<dyn ResourceFactory>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let connects = Arc::new(AtomicUsize::new(0));
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let (connect_counter, shutdown_counter) = (connects.clone(), shutdowns.clone());
        let factory: Arc<dyn ResourceFactory> = Arc::new(FnFactory::new(family, move || -> Result<ResourceHandle, String> {
            let id = connect_counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Engine {
                id,
                shutdowns: shutdown_counter.clone(),
                fail_shutdown,
            }) as ResourceHandle)
        }));
        (factory, connects, shutdowns)
    }

    #[test]
    fn instance_is_cached_until_quit() {
        let registry = ResourceRegistry::new();
        let (factory, connects, shutdowns) = engine_factory("cad", false);
        registry.register(factory).unwrap();

        let first = registry.instance("cad").unwrap();
        let second = registry.instance("cad").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert!(registry.is_live("cad"));

        assert!(registry.quit("cad").unwrap());
        assert!(!registry.is_live("cad"));
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert!(!registry.quit("cad").unwrap());

        let third = registry.instance("cad").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(registry.constructions("cad"), 2);
        assert_eq!(downcast_handle::<Engine>(&third).map(|engine| engine.id), Some(1));
    }

    #[test]
    fn unknown_and_duplicate_families_are_rejected() {
        let registry = ResourceRegistry::new();
        assert_eq!(registry.instance("sheet").err().unwrap(), ResourceError::unknown_family("sheet"));

        let (factory, _, _) = engine_factory("sheet", false);
        registry.register(factory.clone()).unwrap();
        assert_eq!(registry.register(factory).unwrap_err(), ResourceError::already_registered("sheet"));
        assert_eq!(registry.families(), vec!["sheet".to_string()]);
    }

    #[test]
    fn construction_failure_carries_diagnostic() {
        let registry = ResourceRegistry::new();
        registry
            .register(Arc::new(FnFactory::new("xml", || -> Result<ResourceHandle, String> {
                Err("COM server not registered".to_string())
            })))
            .unwrap();

        let error = registry.instance("xml").err().unwrap();
        assert_eq!(error, ResourceError::acquisition("xml", "COM server not registered"));
        assert!(!registry.is_live("xml"));
        assert_eq!(registry.constructions("xml"), 0);
    }

    #[test]
    fn teardown_errors_are_swallowed_and_shutdown_quits_everything() {
        let registry = ResourceRegistry::new();
        let (cad, _, cad_shutdowns) = engine_factory("cad", true);
        let (sheet, _, sheet_shutdowns) = engine_factory("sheet", false);
        registry.register(cad).unwrap();
        registry.register(sheet).unwrap();
        registry.instance("cad").unwrap();
        registry.instance("sheet").unwrap();

        assert_eq!(registry.shutdown(), 2);
        assert_eq!(cad_shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(sheet_shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(registry.shutdown(), 0);
    }

    #[test]
    fn slow_construction_times_out_and_late_handle_is_torn_down() {
        let registry = ResourceRegistry::with_acquire_timeout(Duration::from_millis(20));
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let shutdown_counter = shutdowns.clone();
        registry
            .register(Arc::new(FnFactory::new("slow", move || -> Result<ResourceHandle, String> {
                std::thread::sleep(Duration::from_millis(150));
                Ok(Arc::new(Engine {
                    id: 0,
                    shutdowns: shutdown_counter.clone(),
                    fail_shutdown: false,
                }) as ResourceHandle)
            })))
            .unwrap();

        let error = registry.instance("slow").err().unwrap();
        assert_eq!(error, ResourceError::timeout("slow", Duration::from_millis(20)));
        assert!(!registry.is_live("slow"));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while shutdowns.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_idle_keeps_handles_that_are_still_held() {
        let registry = ResourceRegistry::new();
        let (cad, _, cad_shutdowns) = engine_factory("cad", false);
        let (sheet, _, sheet_shutdowns) = engine_factory("sheet", false);
        registry.register(cad).unwrap();
        registry.register(sheet).unwrap();

        let held = registry.instance("cad").unwrap();
        drop(registry.instance("sheet").unwrap());

        assert_eq!(registry.release_idle(), 1);
        assert!(registry.is_live("cad"));
        assert!(!registry.is_live("sheet"));
        assert_eq!(cad_shutdowns.load(Ordering::SeqCst), 0);
        assert_eq!(sheet_shutdowns.load(Ordering::SeqCst), 1);

        let again = registry.instance("cad").unwrap();
        assert!(Arc::ptr_eq(&held, &again));
        drop((held, again));
        assert_eq!(registry.release_idle(), 1);
        assert_eq!(cad_shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retry_while_abandoned_attach_is_running_does_not_connect_again() {
        let registry = ResourceRegistry::with_acquire_timeout(Duration::from_millis(20));
        let connects = Arc::new(AtomicUsize::new(0));
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let (connect_counter, shutdown_counter) = (connects.clone(), shutdowns.clone());
        registry
            .register(Arc::new(FnFactory::new("slow", move || -> Result<ResourceHandle, String> {
                connect_counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(200));
                Ok(Arc::new(Engine {
                    id: 0,
                    shutdowns: shutdown_counter.clone(),
                    fail_shutdown: false,
                }) as ResourceHandle)
            })))
            .unwrap();

        assert_eq!(registry.instance("slow").err().unwrap(), ResourceError::timeout("slow", Duration::from_millis(20)));
        let retry = registry.instance("slow").err().unwrap();
        assert!(matches!(retry, ResourceError::Acquisition { ref reason, .. } if reason.contains("not finished")));
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while shutdowns.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);

        assert_eq!(registry.instance("slow").err().unwrap(), ResourceError::timeout("slow", Duration::from_millis(20)));
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }
}
