//! The event type carried by the bus.

use std::{any::Any, borrow::Cow, collections::BTreeMap, fmt};

type Arg = Box<dyn Any + Send + Sync>;

/// A named event with a positional and keyword payload.
///
/// Payload entries are type-erased; handlers recover them with
/// [`arg`](Event::arg) / [`find`](Event::find) and may rewrite them in place
/// (e.g. a response filter replacing `args[0]`).
///
/// # Example
///
/// ```rust,ignore
/// let mut event = Event::new("greet").with_arg(String::from("world"));
/// assert_eq!(event.arg::<String>(0).map(String::as_str), Some("world"));
/// ```
pub struct Event {
    name: Cow<'static, str>,
    args: Vec<Arg>,
    kwargs: BTreeMap<String, Arg>,
    done: bool,
}

impl Event {
    /// Create an event with an empty payload.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
            done: false,
        }
    }

    /// The event name handlers are matched against.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a positional argument.
    pub fn with_arg<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.args.push(Box::new(value));
        self
    }

    /// Set a keyword argument.
    pub fn with_kwarg<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.kwargs.insert(key.into(), Box::new(value));
        self
    }

    /// Number of positional arguments.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether the event carries no positional arguments.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Borrow positional argument `index` as `T`.
    pub fn arg<T: Any>(&self, index: usize) -> Option<&T> {
        self.args.get(index)?.downcast_ref()
    }

    /// Mutably borrow positional argument `index` as `T`.
    pub fn arg_mut<T: Any>(&mut self, index: usize) -> Option<&mut T> {
        self.args.get_mut(index)?.downcast_mut()
    }

    /// Replace positional argument `index`, appending if it is one past the end.
    ///
    /// Returns `false` when `index` is out of range.
    pub fn set_arg<T: Any + Send + Sync>(&mut self, index: usize, value: T) -> bool {
        match index.cmp(&self.args.len()) {
            std::cmp::Ordering::Less => {
                self.args[index] = Box::new(value);
                true
            }
            std::cmp::Ordering::Equal => {
                self.args.push(Box::new(value));
                true
            }
            std::cmp::Ordering::Greater => false,
        }
    }

    /// Move positional argument `index` out if it is a `T`, leaving `()` behind.
    pub fn take_arg<T: Any>(&mut self, index: usize) -> Option<T> {
        let slot = self.args.get_mut(index)?;
        if !slot.is::<T>() {
            return None;
        }
        let taken = std::mem::replace(slot, Box::new(()));
        taken.downcast::<T>().ok().map(|boxed| *boxed)
    }

    /// Borrow the first positional argument of type `T`.
    pub fn find<T: Any>(&self) -> Option<&T> {
        self.args.iter().find_map(|a| a.downcast_ref())
    }

    /// Mutably borrow the first positional argument of type `T`.
    pub fn find_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.args.iter_mut().find_map(|a| a.downcast_mut())
    }

    /// Borrow keyword argument `key` as `T`.
    pub fn kwarg<T: Any>(&self, key: &str) -> Option<&T> {
        self.kwargs.get(key)?.downcast_ref()
    }

    /// Whether dispatch of this event has completed.
    ///
    /// Set by the bus after every dispatch, whatever the event. Whether an
    /// HTTP response has been finalized is tracked separately, on the
    /// response itself.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Mark dispatch as completed. Called by the bus once every matching
    /// handler has run or propagation stopped.
    pub fn mark_done(&mut self) {
        self.done = true;
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("args", &self.args.len())
            .field("kwargs", &self.kwargs.keys().collect::<Vec<_>>())
            .field("done", &self.done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_is_clear_until_marked() {
        let mut event = Event::new("response");
        assert!(!event.is_done());
        event.mark_done();
        assert!(event.is_done());
    }

    #[test]
    fn positional_args_are_typed() {
        let event = Event::new("greet").with_arg(7u32).with_arg(String::from("hi"));
        assert_eq!(event.arg::<u32>(0), Some(&7));
        assert_eq!(event.arg::<u32>(1), None);
        assert_eq!(event.find::<String>().map(String::as_str), Some("hi"));
        assert_eq!(event.len(), 2);
    }

    #[test]
    fn args_can_be_rewritten_in_place() {
        let mut event = Event::new("response").with_arg(String::from("plain"));
        *event.arg_mut::<String>(0).unwrap() = "rewritten".into();
        assert_eq!(event.arg::<String>(0).unwrap(), "rewritten");

        assert!(event.set_arg(0, 3i64));
        assert_eq!(event.arg::<i64>(0), Some(&3));
        assert!(event.set_arg(1, true));
        assert!(!event.set_arg(5, true));
    }

    #[test]
    fn take_arg_only_moves_matching_type() {
        let mut event = Event::new("x").with_arg(String::from("owned"));
        assert_eq!(event.take_arg::<u8>(0), None);
        assert_eq!(event.take_arg::<String>(0).as_deref(), Some("owned"));
        assert_eq!(event.arg::<String>(0), None);
    }

    #[test]
    fn kwargs_lookup() {
        let event = Event::new("x").with_kwarg("retries", 3u8);
        assert_eq!(event.kwarg::<u8>("retries"), Some(&3));
        assert_eq!(event.kwarg::<u8>("missing"), None);
    }
}
