//! Handler return values.

use crate::error::BoxError;
use std::{any::Any, fmt};

/// What a handler invocation produces: nothing, a value, or an error.
pub type HandlerOutput = Result<Option<Value>, BoxError>;

/// A type-erased, non-null handler result.
///
/// The producing type's name is kept so that consumers which only understand
/// a fixed set of result types can report exactly what they were given.
pub struct Value {
    inner: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Name of the wrapped type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Borrow the wrapped value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Take the wrapped value out as `T`, or get `self` back unchanged.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let type_name = self.type_name;
        match self.inner.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(inner) => Err(Self { inner, type_name }),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Value").field(&self.type_name).finish()
    }
}

/// Trait for converting a handler's return into a [`HandlerOutput`].
///
/// # Default Implementations
///
/// - `()` → no value (the "null" result)
/// - `String` / `&'static str` → a `String` value
/// - `Value` → as is
/// - `Option<T>` → `None` is the null result, `Some` delegates
/// - `Result<T, E>` → delegates to `T` or propagates the error
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be returned from a handler",
    label = "missing `IntoReply` implementation",
    note = "Wrap arbitrary results in `Value::new(..)` or implement `IntoReply`."
)]
pub trait IntoReply {
    /// Convert into the bus-level handler output.
    fn into_reply(self) -> HandlerOutput;
}

impl IntoReply for () {
    fn into_reply(self) -> HandlerOutput {
        Ok(None)
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> HandlerOutput {
        Ok(Some(self))
    }
}

impl IntoReply for String {
    fn into_reply(self) -> HandlerOutput {
        Ok(Some(Value::new(self)))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> HandlerOutput {
        Ok(Some(Value::new(self.to_string())))
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> HandlerOutput {
        match self {
            Some(t) => t.into_reply(),
            None => Ok(None),
        }
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError>,
{
    fn into_reply(self) -> HandlerOutput {
        match self {
            Ok(t) => t.into_reply(),
            Err(e) => Err(e.into()),
        }
    }
}
