//! The project: root wrapper and owner of all identity state for one store.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use nmrid_store::{DataStore, Notification, NotifyError, NotifyFn, NotifyKey, StoreClass, StoreEvent};
use nmrid_types::{ClassKind, Handle, Pid};
use tracing::{debug, info, warn};

use crate::cache::{IdentityCache, WrapperId, WrapperRecord};
use crate::config::ProjectConfig;
use crate::descriptor;
use crate::error::{WrapError, WrapResult};
use crate::hooks;
use crate::init::{self, InitStats};
use crate::listener::{Action, ListenerFn, ListenerId, ListenerRegistry, WrapperEvent};
use crate::notifier::NotifierRegistry;
use crate::verify::{self, VerifyReport};
use crate::wrapper::Wrapper;

/// State shared by a project and every wrapper it hands out.
///
/// Wrappers and store callbacks hold only `Weak` references to it. No
/// `RefCell` borrow is held while control passes to a listener, so listeners
/// may mutate the store and trigger nested hooks.
pub(crate) struct ProjectContext {
    store: Rc<dyn DataStore>,
    config: ProjectConfig,
    cache: RefCell<IdentityCache>,
    notifiers: RefCell<NotifierRegistry>,
    listeners: RefCell<ListenerRegistry>,
    attached: Cell<bool>,
}

impl ProjectContext {
    pub(crate) fn cache(&self) -> Ref<'_, IdentityCache> {
        self.cache.borrow()
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.attached.get()
    }

    pub(crate) fn wrapper_for(self: &Rc<Self>, id: WrapperId) -> Option<Wrapper> {
        let cache = self.cache.borrow();
        cache.get(id).map(|record| Wrapper::new(id, record, Rc::downgrade(self)))
    }

    fn subscribe_all(self: &Rc<Self>) {
        let mut registry = self.notifiers.borrow_mut();
        for desc in descriptor::breadth_first() {
            for key in desc.watched_events(self.config.track_renames) {
                registry.subscribe(&*self.store, key, self.store_callback());
            }
        }
    }

    fn store_callback(self: &Rc<Self>) -> NotifyFn {
        let weak = Rc::downgrade(self);
        Rc::new(move |notification: &Notification| match weak.upgrade() {
            Some(ctx) => ctx
                .dispatch(notification)
                .map_err(|e| Box::new(e) as NotifyError),
            None => Ok(()),
        })
    }

    fn dispatch(self: &Rc<Self>, notification: &Notification) -> WrapResult<()> {
        if !self.is_attached() {
            return Ok(());
        }
        match notification.event {
            StoreEvent::Create => self
                .object_appeared(notification.class, notification.handle)
                .map(drop),
            StoreEvent::Delete => self.object_about_to_vanish(notification.handle).map(drop),
            StoreEvent::Rename => self.object_renamed(notification.handle).map(drop),
        }
    }

    fn object_appeared(self: &Rc<Self>, class: StoreClass, handle: Handle) -> WrapResult<Vec<Wrapper>> {
        let created = {
            let mut cache = self.cache.borrow_mut();
            hooks::on_object_appeared(&*self.store, &mut cache, class, handle)?
        };
        let events: Vec<WrapperEvent> = {
            let cache = self.cache.borrow();
            created
                .iter()
                .filter_map(|id| {
                    let record = cache.get(*id)?;
                    Some(self.event(Action::Create, *id, record, None))
                })
                .collect()
        };
        self.notify_listeners(&events)?;
        Ok(events.into_iter().map(|e| e.wrapper).collect())
    }

    fn object_about_to_vanish(self: &Rc<Self>, handle: Handle) -> WrapResult<Vec<Pid>> {
        let evicted = {
            let mut cache = self.cache.borrow_mut();
            hooks::on_object_about_to_vanish(&*self.store, &mut cache, handle)?
        };
        let events: Vec<WrapperEvent> = evicted
            .iter()
            .map(|(id, record)| self.event(Action::Delete, *id, record, None))
            .collect();
        self.notify_listeners(&events)?;
        Ok(events.into_iter().map(|e| e.pid).collect())
    }

    fn object_renamed(self: &Rc<Self>, handle: Handle) -> WrapResult<Vec<Wrapper>> {
        let changes = {
            let mut cache = self.cache.borrow_mut();
            hooks::on_object_renamed(&*self.store, &mut cache, handle)?
        };
        let events: Vec<WrapperEvent> = {
            let cache = self.cache.borrow();
            changes
                .into_iter()
                .filter_map(|change| {
                    let record = cache.get(change.id)?;
                    Some(self.event(Action::Rename, change.id, record, Some(change.old_pid)))
                })
                .collect()
        };
        self.notify_listeners(&events)?;
        Ok(events.into_iter().map(|e| e.wrapper).collect())
    }

    fn event(
        self: &Rc<Self>,
        action: Action,
        id: WrapperId,
        record: &WrapperRecord,
        old_pid: Option<Pid>,
    ) -> WrapperEvent {
        WrapperEvent {
            action,
            kind: record.kind,
            pid: record.pid.clone(),
            old_pid,
            wrapper: Wrapper::new(id, record, Rc::downgrade(self)),
        }
    }

    fn notify_listeners(&self, events: &[WrapperEvent]) -> WrapResult<()> {
        for event in events {
            let callbacks = self.listeners.borrow().matching(event.kind, event.action);
            for callback in callbacks {
                callback(event)?;
            }
        }
        Ok(())
    }

    fn detach(&self) -> usize {
        if !self.attached.replace(false) {
            return 0;
        }
        let removed = self.notifiers.borrow_mut().unsubscribe_all(&*self.store);
        self.cache.borrow_mut().clear();
        self.listeners.borrow_mut().clear();
        info!(subscriptions = removed, "project detached");
        removed
    }
}

impl Drop for ProjectContext {
    fn drop(&mut self) {
        if self.attached.get() {
            let removed = self.notifiers.get_mut().unsubscribe_all(&*self.store);
            debug!(subscriptions = removed, "project dropped while attached");
        }
    }
}

/// A store attachment: the root wrapper and the owner of the identity cache,
/// the notifier registry and the listeners.
///
/// Cloning is cheap and yields another handle to the same project. The
/// attachment ends on [`detach`](Self::detach) or when the last clone is
/// dropped.
#[derive(Clone)]
pub struct Project {
    ctx: Rc<ProjectContext>,
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("attached", &self.ctx.is_attached())
            .field("wrappers", &self.ctx.cache.borrow().len())
            .field("subscriptions", &self.ctx.notifiers.borrow().len())
            .finish()
    }
}

impl Project {
    pub(crate) fn from_context(ctx: Rc<ProjectContext>) -> Self {
        Self { ctx }
    }

    /// Attach to `store` with the default configuration.
    pub fn attach(store: Rc<dyn DataStore>) -> WrapResult<Self> {
        Self::attach_with_config(store, ProjectConfig::default())
    }

    /// Subscribe to every event the class hierarchy watches, then wrap every
    /// object already in the store.
    pub fn attach_with_config(store: Rc<dyn DataStore>, config: ProjectConfig) -> WrapResult<Self> {
        let ctx = Rc::new(ProjectContext {
            store,
            config,
            cache: RefCell::new(IdentityCache::new()),
            notifiers: RefCell::new(NotifierRegistry::new()),
            listeners: RefCell::new(ListenerRegistry::new()),
            attached: Cell::new(true),
        });
        ctx.subscribe_all();

        let stats = {
            let mut cache = ctx.cache.borrow_mut();
            init::initialize_tree(&*ctx.store, &mut cache)?
        };
        let project = Self { ctx };
        let name = project.name()?;
        info!(
            %name,
            wrappers = stats.created,
            subscriptions = project.ctx.notifiers.borrow().len(),
            "project attached"
        );

        if project.ctx.config.verify_on_attach {
            let report = project.verify()?;
            for violation in &report.violations {
                warn!(handle = ?violation.handle, kind = ?violation.kind, "{}", violation.description);
            }
        }
        Ok(project)
    }

    /// End the attachment: unsubscribe from the store and drop every wrapper.
    ///
    /// Returns the number of store subscriptions removed; a second call
    /// removes nothing.
    pub fn detach(&self) -> usize {
        self.ctx.detach()
    }

    pub fn is_attached(&self) -> bool {
        self.ctx.is_attached()
    }

    pub fn store(&self) -> Rc<dyn DataStore> {
        Rc::clone(&self.ctx.store)
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.ctx.config
    }

    fn ensure_attached(&self) -> WrapResult<()> {
        if self.ctx.is_attached() {
            Ok(())
        } else {
            Err(WrapError::Detached)
        }
    }

    // ---------------------------------------------------------------
    // Root wrapper
    // ---------------------------------------------------------------

    /// The project itself as a wrapper.
    pub fn as_wrapper(&self) -> WrapResult<Wrapper> {
        self.ensure_attached()?;
        let root = self.ctx.store.root();
        let id = self
            .ctx
            .cache
            .borrow()
            .lookup_by_handle(root)
            .ok_or(WrapError::Evicted { handle: root })?;
        self.ctx
            .wrapper_for(id)
            .ok_or(WrapError::Evicted { handle: root })
    }

    /// `PR:<name>`.
    pub fn pid(&self) -> WrapResult<Pid> {
        self.as_wrapper()?.pid()
    }

    pub fn name(&self) -> WrapResult<String> {
        Ok(self.pid()?.parts().first().cloned().unwrap_or_default())
    }

    /// Number of live wrappers, the project included.
    pub fn len(&self) -> usize {
        self.ctx.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------

    /// Resolve a rendered pid. Malformed text is an error, an unknown pid
    /// is `None`.
    pub fn get_by_pid(&self, text: &str) -> WrapResult<Option<Wrapper>> {
        self.ensure_attached()?;
        let pid = Pid::parse_with(text, self.ctx.config.accept_long_pids)?;
        Ok(self.lookup_pid(&pid))
    }

    /// Resolve an already parsed pid.
    pub fn lookup_pid(&self, pid: &Pid) -> Option<Wrapper> {
        let id = self.ctx.cache.borrow().lookup_by_pid(pid)?;
        self.ctx.wrapper_for(id)
    }

    /// The wrapper for a store handle, if it is wrapped.
    pub fn get_by_handle(&self, handle: Handle) -> Option<Wrapper> {
        let id = self.ctx.cache.borrow().lookup_by_handle(handle)?;
        self.ctx.wrapper_for(id)
    }

    /// Every live wrapper of `kind`, in creation order.
    pub fn all(&self, kind: ClassKind) -> Vec<Wrapper> {
        let ids: Vec<WrapperId> = self
            .ctx
            .cache
            .borrow()
            .iter()
            .filter(|(_, record)| record.kind == kind)
            .map(|(id, _)| id)
            .collect();
        ids.into_iter().filter_map(|id| self.ctx.wrapper_for(id)).collect()
    }

    /// Plural link from the project, e.g. `chains` or `peaks`.
    pub fn plural(&self, name: &str) -> WrapResult<Vec<Wrapper>> {
        self.as_wrapper()?.plural(name)
    }

    // ---------------------------------------------------------------
    // Lifecycle hooks
    // ---------------------------------------------------------------

    /// Wrap a newly created store object. Normally driven by the store's
    /// create notification.
    pub fn object_appeared(&self, class: StoreClass, handle: Handle) -> WrapResult<Vec<Wrapper>> {
        self.ensure_attached()?;
        self.ctx.object_appeared(class, handle)
    }

    /// Evict the wrapper of a deleted store object. Returns the pids of the
    /// evicted wrappers.
    pub fn object_about_to_vanish(&self, handle: Handle) -> WrapResult<Vec<Pid>> {
        self.ensure_attached()?;
        self.ctx.object_about_to_vanish(handle)
    }

    /// Recompute pids after a store object's key changed.
    pub fn object_renamed(&self, handle: Handle) -> WrapResult<Vec<Wrapper>> {
        self.ensure_attached()?;
        self.ctx.object_renamed(handle)
    }

    /// Re-run the tree walk; only wraps handles missing from the cache.
    pub fn initialize_tree(&self) -> WrapResult<InitStats> {
        self.ensure_attached()?;
        let mut cache = self.ctx.cache.borrow_mut();
        init::initialize_tree(&*self.ctx.store, &mut cache)
    }

    // ---------------------------------------------------------------
    // Listeners and diagnostics
    // ---------------------------------------------------------------

    /// Call `callback` after `action` happens to a wrapper of `kind`
    /// (`None` for every class). Listeners are dropped on detach.
    pub fn register_listener<F>(&self, kind: Option<ClassKind>, action: Action, callback: F) -> ListenerId
    where
        F: Fn(&WrapperEvent) -> WrapResult<()> + 'static,
    {
        let callback: ListenerFn = Rc::new(callback);
        self.ctx.listeners.borrow_mut().register(kind, action, callback)
    }

    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.ctx.listeners.borrow_mut().unregister(id)
    }

    /// Check the identity cache against the store.
    pub fn verify(&self) -> WrapResult<VerifyReport> {
        self.ensure_attached()?;
        let cache = self.ctx.cache.borrow();
        verify::verify(&*self.ctx.store, &cache)
    }

    /// Store subscriptions currently held.
    pub fn subscriptions(&self) -> Vec<NotifyKey> {
        self.ctx.notifiers.borrow().keys()
    }
}
