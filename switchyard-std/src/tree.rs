//! # Component tree and registration engine
//!
//! Every component lives in a rooted tree. A component starts out as the root
//! of its own one-node tree (`parent == self`, `root == self`); registering it
//! under another component moves it, with its whole subtree, into that
//! component's tree and re-stamps the cached root on every descendant.
//!
//! Parents own their children. Parent and root links are weak, so dropping
//! the last handle to a root drops the whole tree.
//!
//! Structural changes (register, unregister, handler additions) and handler
//! list snapshots are serialised by one process-wide lock. Handlers never run
//! while it is held, so a handler may freely register or unregister
//! components.

use crate::{
    bus::Queued,
    handlers::{BoundHandler, HandlerMeta, HandlerTable, short_type_name},
    singleton::{self, Singleton},
};
use std::{
    any::{Any, TypeId},
    collections::{HashMap, VecDeque},
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak},
};
use switchyard_core::{
    ComponentId, Event, Handler, HandlerOutput, RegistrationError, WILDCARD,
};

static STRUCTURE: RwLock<()> = RwLock::new(());

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn structure_read() -> RwLockReadGuard<'static, ()> {
    read(&STRUCTURE)
}

fn structure_write() -> RwLockWriteGuard<'static, ()> {
    write(&STRUCTURE)
}

/// A type that can live in the component tree.
///
/// # Example
///
/// ```rust,ignore
/// struct Root;
///
/// impl Component for Root {
///     fn handlers() -> HandlerTable<Self> {
///         HandlerTable::<Self>::new().with(HandlerSpec::<Self>::method("request", |_, _| {
///             Box::pin(async { "Hello World!".into_reply() })
///         }))
///     }
/// }
///
/// let root = Manager::new(Root);
/// ```
pub trait Component: Send + Sync + 'static {
    /// The handler table of this type, built once per instance.
    fn handlers() -> HandlerTable<Self>
    where
        Self: Sized;

    /// The uniqueness constraint of this type.
    fn singleton() -> Singleton
    where
        Self: Sized,
    {
        Singleton::None
    }

    /// Role tags this type carries, for [`Singleton::Tag`] checks.
    fn tags() -> &'static [&'static str]
    where
        Self: Sized,
    {
        &[]
    }

    /// Default channel of an instance.
    fn channel(&self) -> &str {
        WILDCARD
    }

    /// Components this instance holds, registered as its children when it is
    /// wrapped in a [`Manager`].
    fn subcomponents(&self) -> Vec<Manager> {
        Vec::new()
    }
}

/// Payload of the `registered` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registered {
    /// The component that joined a tree.
    pub component: ComponentId,
    /// Its new parent.
    pub parent: ComponentId,
}

/// Payload of the `unregistered` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unregistered {
    /// The component that left its tree.
    pub component: ComponentId,
    /// The parent it was attached to.
    pub parent: ComponentId,
}

pub(crate) struct Links {
    parent: Weak<Node>,
    root: Weak<Node>,
    children: Vec<Arc<Node>>,
}

pub(crate) type ResolvedHandlers = Arc<[Arc<BoundHandler>]>;

pub(crate) struct Node {
    pub(crate) id: ComponentId,
    pub(crate) type_name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) singleton: Singleton,
    pub(crate) tags: &'static [&'static str],
    pub(crate) channel: String,
    instance: Arc<dyn Any + Send + Sync>,
    pub(crate) handlers: RwLock<Vec<Arc<BoundHandler>>>,
    links: RwLock<Links>,
    pub(crate) queue: Mutex<VecDeque<Queued>>,
    pub(crate) cache: Mutex<HashMap<(String, String), ResolvedHandlers>>,
}

impl Node {
    pub(crate) fn parent(self: &Arc<Self>) -> Arc<Node> {
        read(&self.links)
            .parent
            .upgrade()
            .unwrap_or_else(|| Arc::clone(self))
    }

    pub(crate) fn root(self: &Arc<Self>) -> Arc<Node> {
        read(&self.links)
            .root
            .upgrade()
            .unwrap_or_else(|| Arc::clone(self))
    }

    fn children(&self) -> Vec<Arc<Node>> {
        read(&self.links).children.clone()
    }

    fn stamp_root(&self, root: &Arc<Node>) {
        write(&self.links).root = Arc::downgrade(root);
        for child in self.children() {
            child.stamp_root(root);
        }
    }

    fn invalidate(&self) {
        lock(&self.cache).clear();
    }
}

/// Pre-order list of `node` and all its descendants.
pub(crate) fn flatten_nodes(node: &Arc<Node>) -> Vec<Arc<Node>> {
    let mut out = Vec::new();
    let mut stack = vec![Arc::clone(node)];
    while let Some(next) = stack.pop() {
        let children = next.children();
        out.push(next);
        stack.extend(children.into_iter().rev());
    }
    out
}

/// A handle to a component in the tree.
///
/// Every component is also a manager of events: `fire`, `send`, `push` and
/// `flush` called on any handle operate on the tree the component currently
/// belongs to. Handles are cheap to clone and compare equal when they refer
/// to the same component.
#[derive(Clone)]
pub struct Manager {
    pub(crate) node: Arc<Node>,
}

impl Manager {
    /// Wrap a component, on its own default channel.
    ///
    /// Its [`subcomponents`](Component::subcomponents) are registered as
    /// children; one that cannot be registered is logged and skipped. Use
    /// [`try_new`](Manager::try_new) to get the error instead.
    pub fn new<T: Component>(component: T) -> Self {
        let channel = component.channel().to_string();
        let (manager, children) = Self::build(component, channel);
        manager.attach_lenient(children);
        manager
    }

    /// Wrap a component, failing if one of its subcomponents cannot be
    /// registered under it.
    pub fn try_new<T: Component>(component: T) -> Result<Self, RegistrationError> {
        let channel = component.channel().to_string();
        let (manager, children) = Self::build(component, channel);
        manager.attach(children)?;
        Ok(manager)
    }

    /// Wrap a component, on an explicit channel.
    pub fn with_channel<T: Component>(component: T, channel: impl Into<String>) -> Self {
        let (manager, children) = Self::build(component, channel.into());
        manager.attach_lenient(children);
        manager
    }

    fn attach(&self, children: Vec<Manager>) -> Result<(), RegistrationError> {
        for child in children {
            child.register(self)?;
        }
        Ok(())
    }

    fn attach_lenient(&self, children: Vec<Manager>) {
        for child in children {
            if let Err(error) = child.register(self) {
                tracing::warn!(
                    component = self.type_name(),
                    child = child.type_name(),
                    %error,
                    "subcomponent not registered"
                );
            }
        }
    }

    fn build<T: Component>(component: T, channel: String) -> (Self, Vec<Manager>) {
        let instance = Arc::new(component);
        let children = instance.subcomponents();
        let table = T::handlers();
        let id = ComponentId::next();
        let type_name = short_type_name::<T>();

        let node = Arc::new_cyclic(|weak: &Weak<Node>| {
            let mut handlers = table.bind(id, &instance, &channel);
            handlers.push(Arc::new(BoundHandler::new(
                id,
                HandlerMeta::new("unregister"),
                &channel,
                UnregisterSelf {
                    id,
                    node: weak.clone(),
                },
            )));

            Node {
                id,
                type_name,
                type_id: TypeId::of::<T>(),
                singleton: T::singleton(),
                tags: T::tags(),
                channel,
                instance,
                handlers: RwLock::new(handlers),
                links: RwLock::new(Links {
                    parent: weak.clone(),
                    root: weak.clone(),
                    children: Vec::new(),
                }),
                queue: Mutex::new(VecDeque::new()),
                cache: Mutex::new(HashMap::new()),
            }
        });

        tracing::trace!(component = type_name, %id, channel = %node.channel, "component created");
        (Self { node }, children)
    }

    /// The component's identity.
    pub fn id(&self) -> ComponentId {
        self.node.id
    }

    /// Short type name of the wrapped component.
    pub fn type_name(&self) -> &'static str {
        self.node.type_name
    }

    /// The channel the component's handlers listen on by default.
    pub fn channel(&self) -> &str {
        &self.node.channel
    }

    /// Typed access to the wrapped component.
    pub fn component<T: Component>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.node.instance).downcast::<T>().ok()
    }

    /// The owning component, or `self` for a root.
    pub fn parent(&self) -> Manager {
        Manager {
            node: self.node.parent(),
        }
    }

    /// The root of the tree this component belongs to.
    pub fn root(&self) -> Manager {
        Manager {
            node: self.node.root(),
        }
    }

    /// Whether this component is the root of its tree.
    pub fn is_root(&self) -> bool {
        Arc::ptr_eq(&self.node.parent(), &self.node)
    }

    /// Directly owned components, in registration order.
    pub fn children(&self) -> Vec<Manager> {
        self.node
            .children()
            .into_iter()
            .map(|node| Manager { node })
            .collect()
    }

    /// This component and all its descendants, pre-order.
    pub fn flatten(&self) -> Vec<Manager> {
        flatten_nodes(&self.node)
            .into_iter()
            .map(|node| Manager { node })
            .collect()
    }

    /// Whether `other` is this component or one of its descendants.
    pub fn contains(&self, other: &Manager) -> bool {
        flatten_nodes(&self.node)
            .iter()
            .any(|n| Arc::ptr_eq(n, &other.node))
    }

    /// Register `child` under this component.
    pub fn add_child(&self, child: &Manager) -> Result<(), RegistrationError> {
        child.register(self)
    }

    /// Insert this component (and its subtree) under `parent`.
    ///
    /// Fails without touching the tree if a singleton declared anywhere in
    /// this subtree is already present in `parent`'s tree, or if `parent` is
    /// one of this component's descendants. A component attached elsewhere is
    /// detached first. Registering a component under itself detaches it.
    ///
    /// On success a `registered` event carrying [`Registered`] is queued on
    /// the new root.
    pub fn register(&self, parent: &Manager) -> Result<(), RegistrationError> {
        let _structure = structure_write();

        if Arc::ptr_eq(&self.node, &parent.node) {
            if !self.is_root() {
                self.detach_locked();
            }
            return Ok(());
        }

        if self.contains(parent) {
            return Err(RegistrationError::Cycle {
                component: self.node.type_name,
                id: self.node.id,
            });
        }

        let new_root = parent.node.root();
        singleton::check(&self.node, &new_root)?;

        let current_parent = self.node.parent();
        if Arc::ptr_eq(&current_parent, &parent.node) {
            return Ok(());
        }
        if !Arc::ptr_eq(&current_parent, &self.node) {
            self.detach_locked();
        }

        let pending: Vec<Queued> = lock(&self.node.queue).drain(..).collect();
        write(&self.node.links).parent = Arc::downgrade(&parent.node);
        write(&parent.node.links).children.push(Arc::clone(&self.node));
        self.node.stamp_root(&new_root);
        // The joining subtree ranks after everything already in the tree.
        for node in flatten_nodes(&self.node) {
            for handler in read(&node.handlers).iter() {
                handler.restamp();
            }
        }

        self.node.invalidate();
        new_root.invalidate();

        let mut queue = lock(&new_root.queue);
        queue.extend(pending);
        queue.push_back(Queued::new(
            Event::new("registered").with_arg(Registered {
                component: self.node.id,
                parent: parent.node.id,
            }),
            self.node.channel.clone(),
        ));
        drop(queue);

        tracing::debug!(
            component = self.node.type_name,
            id = %self.node.id,
            parent = parent.node.type_name,
            parent_id = %parent.node.id,
            "registered"
        );
        Ok(())
    }

    /// Detach this component from its parent.
    ///
    /// Queues an `unregistered` event carrying [`Unregistered`] on the tree
    /// being left, then resets `parent` and `root` to this component across
    /// its subtree.
    pub fn unregister(&self) {
        let _structure = structure_write();
        self.detach_locked();
    }

    /// Build the event that asks component `id` to unregister itself.
    ///
    /// Every component handles `unregister`, but only the one named in the
    /// event acts on it.
    pub fn unregister_event(id: ComponentId) -> Event {
        Event::new("unregister").with_arg(id)
    }

    fn detach_locked(&self) {
        let old_root = self.node.root();
        let parent = self.node.parent();

        lock(&old_root.queue).push_back(Queued::new(
            Event::new("unregistered").with_arg(Unregistered {
                component: self.node.id,
                parent: parent.id,
            }),
            self.node.channel.clone(),
        ));

        if !Arc::ptr_eq(&parent, &self.node) {
            write(&parent.links)
                .children
                .retain(|c| !Arc::ptr_eq(c, &self.node));
            write(&self.node.links).parent = Arc::downgrade(&self.node);
        }
        self.node.stamp_root(&self.node);

        old_root.invalidate();
        self.node.invalidate();

        tracing::debug!(
            component = self.node.type_name,
            id = %self.node.id,
            parent_id = %parent.id,
            "unregistered"
        );
    }

    /// Attach an extra handler to this component at runtime.
    pub fn add_handler(&self, meta: HandlerMeta, handler: impl Handler) {
        let _structure = structure_write();
        let bound = BoundHandler::new(self.node.id, meta, &self.node.channel, handler);
        write(&self.node.handlers).push(Arc::new(bound));
        self.node.root().invalidate();
    }

    /// Remove every handler of this component bound as `binding`.
    ///
    /// Returns whether anything was removed.
    pub fn remove_handler(&self, binding: &str) -> bool {
        let _structure = structure_write();
        let mut handlers = write(&self.node.handlers);
        let before = handlers.len();
        handlers.retain(|h| h.binding() != binding);
        let removed = handlers.len() != before;
        drop(handlers);
        if removed {
            self.node.root().invalidate();
        }
        removed
    }

    /// Handlers of this component, in binding order.
    pub fn handlers(&self) -> Vec<Arc<BoundHandler>> {
        read(&self.node.handlers).clone()
    }
}

impl PartialEq for Manager {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Manager {}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("type", &self.node.type_name)
            .field("id", &self.node.id)
            .field("channel", &self.node.channel)
            .finish()
    }
}

struct UnregisterSelf {
    id: ComponentId,
    node: Weak<Node>,
}

impl Handler for UnregisterSelf {
    async fn handle(&self, event: &mut Event) -> HandlerOutput {
        if event.find::<ComponentId>() != Some(&self.id) {
            return Ok(None);
        }
        if let Some(node) = self.node.upgrade() {
            Manager { node }.unregister();
        }
        Ok(None)
    }
}
