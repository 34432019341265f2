//! Handler registry: static per-type handler tables and their bound form.
//!
//! A component type describes its handlers once, as a [`HandlerTable`] of
//! [`HandlerSpec`]s. When an instance is wrapped in a
//! [`Manager`](crate::Manager) the table is bound to that instance, producing
//! the [`BoundHandler`]s the bus dispatches to.
//!
//! # Example
//!
//! ```rust,ignore
//! impl Component for Greeter {
//!     fn handlers() -> HandlerTable<Self> {
//!         HandlerTable::<Self>::new().with(
//!             HandlerSpec::<Self>::method("hello", |this, event| Box::pin(this.hello(event)))
//!                 .on(&["request"])
//!                 .with_priority(1.0),
//!         )
//!     }
//! }
//! ```

use bitflags::bitflags;
use std::{
    borrow::Cow,
    fmt,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use switchyard_core::{
    BoxFuture, ComponentId, DynHandler, Event, Handler, HandlerOutput, channel_matches,
    name_matches,
};

bitflags! {
    /// Behavioural flags of a handler.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HandlerFlags: u8 {
        /// Runs before normal handlers; a non-null result stops propagation.
        const FILTER = 1 << 0;
        /// Suppresses an inherited handler with the same binding name.
        const OVERRIDE = 1 << 1;
    }
}

/// A handler method of component type `T`.
pub type Method<T> =
    Arc<dyn for<'a> Fn(&'a T, &'a mut Event) -> BoxFuture<'a, HandlerOutput> + Send + Sync>;

fn erase<T, F>(method: F) -> Method<T>
where
    F: for<'a> Fn(&'a T, &'a mut Event) -> BoxFuture<'a, HandlerOutput> + Send + Sync + 'static,
{
    Arc::new(method)
}

/// Everything about a handler except the code it runs.
#[derive(Debug, Clone)]
pub struct HandlerMeta {
    binding: Cow<'static, str>,
    events: Vec<Cow<'static, str>>,
    channel: Option<Cow<'static, str>>,
    priority: f64,
    flags: HandlerFlags,
}

impl HandlerMeta {
    /// Metadata for a handler bound as `binding`, listening for the event of
    /// the same name at priority 0.
    pub fn new(binding: impl Into<Cow<'static, str>>) -> Self {
        Self {
            binding: binding.into(),
            events: Vec::new(),
            channel: None,
            priority: 0.0,
            flags: HandlerFlags::empty(),
        }
    }

    /// Listen for these event-name patterns instead of the binding name.
    pub fn on(mut self, events: &[&'static str]) -> Self {
        self.events = events.iter().map(|e| Cow::Borrowed(*e)).collect();
        self
    }

    /// Listen for one more event-name pattern.
    pub fn event(mut self, event: impl Into<Cow<'static, str>>) -> Self {
        self.events.push(event.into());
        self
    }

    /// Bind to a channel other than the owning component's.
    pub fn channel(mut self, channel: impl Into<Cow<'static, str>>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Set priority (higher runs first). Default is 0.
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    /// Mark as a filter.
    pub fn filter(mut self) -> Self {
        self.flags |= HandlerFlags::FILTER;
        self
    }

    /// Mark as overriding an inherited handler of the same binding name.
    pub fn overrides(mut self) -> Self {
        self.flags |= HandlerFlags::OVERRIDE;
        self
    }

    /// The binding name.
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// The event-name patterns this handler listens for.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.patterns().iter().map(|e| &**e)
    }

    /// The priority.
    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// The flags.
    pub fn flags(&self) -> HandlerFlags {
        self.flags
    }

    // Without explicit events a handler listens for its binding name.
    fn patterns(&self) -> &[Cow<'static, str>] {
        if self.events.is_empty() {
            std::slice::from_ref(&self.binding)
        } else {
            &self.events
        }
    }
}

/// One entry of a component type's handler table.
pub struct HandlerSpec<T> {
    meta: HandlerMeta,
    method: Method<T>,
    // Binding in the base table, for specs pulled in by `inherit`.
    inherited: Option<Cow<'static, str>>,
}

impl<T: Send + Sync + 'static> HandlerSpec<T> {
    /// Declare `method` as a handler bound under `binding`.
    ///
    /// Without [`on`](Self::on) the handler listens for the event named
    /// `binding`.
    pub fn method<F>(binding: impl Into<Cow<'static, str>>, method: F) -> Self
    where
        F: for<'a> Fn(&'a T, &'a mut Event) -> BoxFuture<'a, HandlerOutput> + Send + Sync + 'static,
    {
        Self {
            meta: HandlerMeta::new(binding),
            method: erase(method),
            inherited: None,
        }
    }

    /// See [`HandlerMeta::on`].
    pub fn on(mut self, events: &[&'static str]) -> Self {
        self.meta = self.meta.on(events);
        self
    }

    /// See [`HandlerMeta::event`].
    pub fn event(mut self, event: impl Into<Cow<'static, str>>) -> Self {
        self.meta = self.meta.event(event);
        self
    }

    /// See [`HandlerMeta::channel`].
    pub fn channel(mut self, channel: impl Into<Cow<'static, str>>) -> Self {
        self.meta = self.meta.channel(channel);
        self
    }

    /// See [`HandlerMeta::with_priority`].
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.meta = self.meta.with_priority(priority);
        self
    }

    /// See [`HandlerMeta::filter`].
    pub fn filter(mut self) -> Self {
        self.meta = self.meta.filter();
        self
    }

    /// See [`HandlerMeta::overrides`].
    pub fn overrides(mut self) -> Self {
        self.meta = self.meta.overrides();
        self
    }

    /// The metadata.
    pub fn meta(&self) -> &HandlerMeta {
        &self.meta
    }
}

impl<T> fmt::Debug for HandlerSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerSpec").field(&self.meta).finish()
    }
}

/// The ordered handler table of a component type.
pub struct HandlerTable<T> {
    specs: Vec<HandlerSpec<T>>,
}

impl<T: Send + Sync + 'static> HandlerTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// Append a spec.
    ///
    /// A spec flagged [`OVERRIDE`](HandlerFlags::OVERRIDE) drops any base
    /// handler already inherited under the same binding.
    pub fn with(mut self, spec: HandlerSpec<T>) -> Self {
        if spec.meta.flags.contains(HandlerFlags::OVERRIDE) {
            self.specs.retain(|own| {
                let shadowed = own.inherited.as_deref() == Some(spec.meta.binding());
                if shadowed {
                    tracing::trace!(binding = %own.meta.binding, "inherited handler overridden");
                }
                !shadowed
            });
        }
        self.specs.push(spec);
        self
    }

    /// Bind a base type's table into this one.
    ///
    /// Every base handler is kept under the composite binding
    /// `"{Base}_{binding}"`, still listening for its original events, unless
    /// this table holds a spec with the same binding flagged
    /// [`OVERRIDE`](HandlerFlags::OVERRIDE), whether it was added before or
    /// after this call. `project` reaches the base part of a `T`.
    pub fn inherit<B: Send + Sync + 'static>(
        mut self,
        base: HandlerTable<B>,
        project: fn(&T) -> &B,
    ) -> Self {
        let base_name = short_type_name::<B>();
        for spec in base.specs {
            let overridden = self.specs.iter().any(|own| {
                own.inherited.is_none()
                    && own.meta.binding == spec.meta.binding
                    && own.meta.flags.contains(HandlerFlags::OVERRIDE)
            });
            if overridden {
                tracing::trace!(base = base_name, binding = %spec.meta.binding, "inherited handler overridden");
                continue;
            }

            let mut meta = spec.meta.clone();
            meta.events = spec.meta.patterns().to_vec();
            meta.binding = Cow::Owned(format!("{base_name}_{}", spec.meta.binding));
            let base_method = spec.method;
            self.specs.push(HandlerSpec {
                meta,
                method: erase::<T, _>(move |this, event| base_method(project(this), event)),
                inherited: Some(spec.meta.binding),
            });
        }
        self
    }

    /// Number of specs.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Iterate over spec metadata in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &HandlerMeta> {
        self.specs.iter().map(|s| &s.meta)
    }

    pub(crate) fn bind(
        self,
        owner: ComponentId,
        instance: &Arc<T>,
        channel: &str,
    ) -> Vec<Arc<BoundHandler>> {
        self.specs
            .into_iter()
            .map(|spec| {
                let target = BoundMethod {
                    target: Arc::clone(instance),
                    method: spec.method,
                };
                Arc::new(BoundHandler::new(owner, spec.meta, channel, target))
            })
            .collect()
    }
}

impl<T: Send + Sync + 'static> Default for HandlerTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

struct BoundMethod<T> {
    target: Arc<T>,
    method: Method<T>,
}

impl<T: Send + Sync + 'static> Handler for BoundMethod<T> {
    fn handle(&self, event: &mut Event) -> impl Future<Output = HandlerOutput> + Send {
        async move { (self.method)(&*self.target, event).await }
    }
}

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// A handler attached to a live component.
pub struct BoundHandler {
    owner: ComponentId,
    binding: String,
    events: Vec<Cow<'static, str>>,
    channel: String,
    priority: f64,
    flags: HandlerFlags,
    sequence: AtomicU64,
    target: Box<dyn DynHandler>,
}

impl BoundHandler {
    pub(crate) fn new(
        owner: ComponentId,
        meta: HandlerMeta,
        component_channel: &str,
        target: impl Handler,
    ) -> Self {
        let channel = meta
            .channel
            .as_deref()
            .unwrap_or(component_channel)
            .to_string();
        Self {
            owner,
            events: meta.patterns().to_vec(),
            binding: meta.binding.into_owned(),
            channel,
            priority: meta.priority,
            flags: meta.flags,
            sequence: AtomicU64::new(next_sequence()),
            target: Box::new(target),
        }
    }

    /// The owning component.
    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    /// The binding name.
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// The channel this handler listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The priority.
    pub fn priority(&self) -> f64 {
        self.priority
    }

    /// Registration order among all handlers; breaks priority ties.
    ///
    /// Taken when the handler is added and taken again when its component
    /// joins a tree.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }

    pub(crate) fn restamp(&self) {
        self.sequence.store(next_sequence(), Ordering::Relaxed);
    }

    /// Whether this is a filter handler.
    pub fn is_filter(&self) -> bool {
        self.flags.contains(HandlerFlags::FILTER)
    }

    /// Whether this handler hears event `name` fired on `channel`.
    pub fn matches(&self, channel: &str, name: &str) -> bool {
        channel_matches(&self.channel, channel) && self.events.iter().any(|p| name_matches(p, name))
    }

    pub(crate) fn target(&self) -> &dyn DynHandler {
        &*self.target
    }
}

impl fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHandler")
            .field("owner", &self.owner)
            .field("binding", &self.binding)
            .field("events", &self.events)
            .field("channel", &self.channel)
            .field("priority", &self.priority)
            .field("flags", &self.flags)
            .field("sequence", &self.sequence())
            .finish()
    }
}

/// Last path segment of a type name, without generics.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::IntoReply;

    struct Base;

    impl Base {
        fn table() -> HandlerTable<Self> {
            HandlerTable::new()
                .with(HandlerSpec::method("started", |_: &Base, _| {
                    Box::pin(async { "base started".into_reply() })
                }))
                .with(HandlerSpec::method("stopped", |_: &Base, _| {
                    Box::pin(async { "base stopped".into_reply() })
                }))
        }
    }

    struct Derived {
        base: Base,
    }

    impl Derived {
        fn table() -> HandlerTable<Self> {
            HandlerTable::new()
                .with(
                    HandlerSpec::method("stopped", |_: &Derived, _| {
                        Box::pin(async { "derived stopped".into_reply() })
                    })
                    .overrides(),
                )
                .inherit(Base::table(), |d| &d.base)
        }
    }

    impl Derived {
        fn table_override_last() -> HandlerTable<Self> {
            HandlerTable::new().inherit(Base::table(), |d: &Derived| &d.base).with(
                HandlerSpec::method("stopped", |_: &Derived, _| {
                    Box::pin(async { "derived stopped".into_reply() })
                })
                .overrides(),
            )
        }
    }

    #[test]
    fn test_inherit_renames_and_respects_override() {
        let table = Derived::table();
        let bindings: Vec<_> = table.iter().map(|m| m.binding().to_string()).collect();
        assert_eq!(bindings, vec!["stopped", "Base_started"]);

        let inherited = table.iter().nth(1).unwrap();
        assert_eq!(inherited.events().collect::<Vec<_>>(), vec!["started"]);
    }

    #[test]
    fn test_override_after_inherit_drops_base_handler() {
        let table = Derived::table_override_last();
        let bindings: Vec<_> = table.iter().map(|m| m.binding().to_string()).collect();
        assert_eq!(bindings, vec!["Base_started", "stopped"]);
    }

    #[test]
    fn test_plain_spec_keeps_inherited_handler() {
        let table = HandlerTable::<Derived>::new()
            .inherit(Base::table(), |d| &d.base)
            .with(HandlerSpec::method("stopped", |_: &Derived, _| {
                Box::pin(async { "derived stopped".into_reply() })
            }));
        let bindings: Vec<_> = table.iter().map(|m| m.binding().to_string()).collect();
        assert_eq!(bindings, vec!["Base_started", "Base_stopped", "stopped"]);
    }

    #[tokio::test]
    async fn test_bound_method_runs_against_instance() {
        let table = Derived::table_override_last();
        let instance = Arc::new(Derived { base: Base });
        let bound = table.bind(ComponentId::next(), &instance, "*");
        let stopped = bound.iter().find(|h| h.binding() == "stopped").unwrap();

        let mut event = Event::new("stopped");
        let value = stopped.target().handle_dyn(&mut event).await.unwrap().unwrap();
        assert_eq!(value.downcast::<String>().unwrap(), "derived stopped");
    }

    #[test]
    fn test_sequence_follows_creation_and_restamp() {
        let make = || {
            BoundHandler::new(
                ComponentId::next(),
                HandlerMeta::new("x"),
                "*",
                switchyard_core::handler_fn(|_: &mut Event| ()),
            )
        };
        let first = make();
        let second = make();
        assert!(first.sequence() < second.sequence());

        first.restamp();
        assert!(first.sequence() > second.sequence());
    }

    #[tokio::test]
    async fn test_inherited_method_runs_against_base() {
        let table = Derived::table();
        let instance = Arc::new(Derived { base: Base });
        let bound = table.bind(ComponentId::next(), &instance, "*");
        let started = bound.iter().find(|h| h.binding() == "Base_started").unwrap();

        assert!(started.matches("*", "started"));
        let mut event = Event::new("started");
        let value = started.target().handle_dyn(&mut event).await.unwrap().unwrap();
        assert_eq!(value.downcast::<String>().unwrap(), "base started");
    }

    #[test]
    fn test_meta_defaults_to_binding_name() {
        let meta = HandlerMeta::new("request").with_priority(2.5).filter();
        assert_eq!(meta.events().collect::<Vec<_>>(), vec!["request"]);
        assert!(meta.flags().contains(HandlerFlags::FILTER));
        assert_eq!(meta.priority(), 2.5);

        let explicit = HandlerMeta::new("tag").event("response").event("error");
        assert_eq!(explicit.events().collect::<Vec<_>>(), vec!["response", "error"]);
    }

    #[test]
    fn test_channel_override() {
        let meta = HandlerMeta::new("x").channel("irc");
        let bound = BoundHandler::new(
            ComponentId::next(),
            meta,
            "web",
            switchyard_core::handler_fn(|_: &mut Event| ()),
        );
        assert_eq!(bound.channel(), "irc");
        assert!(bound.matches("irc", "x"));
        assert!(!bound.matches("web", "x"));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Derived>(), "Derived");
        assert_eq!(short_type_name::<Vec<u8>>(), "Vec");
    }
}
