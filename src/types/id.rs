// ABOUTME: Phantom-typed identifiers for engine objects that can be streamed from.
// ABOUTME: Keeps container, exec, service and task ids from being mixed up.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker types for the phantom parameter. Empty enums cannot be instantiated.
pub enum ContainerMarker {}
pub enum ExecMarker {}
pub enum ServiceMarker {}
pub enum TaskMarker {}

/// Identifier (or name) of an engine object of kind `T`.
///
/// An `ExecId` cannot be passed where a `ContainerId` is expected, which
/// matters because both are opaque hex strings on the wire.
#[must_use = "IDs reference engine objects and should not be ignored"]
pub struct Id<T> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_inner(self) -> String {
        self.value
    }

    /// The id escaped for use as one segment of a request path.
    pub fn path_segment(&self) -> Cow<'_, str> {
        urlencoding::encode(&self.value)
    }

    /// First 12 characters, the way engines abbreviate ids in listings.
    pub fn short(&self) -> &str {
        match self.value.char_indices().nth(12) {
            Some((end, _)) => &self.value[..end],
            None => &self.value,
        }
    }
}

// T is only a marker, so none of these may require bounds on it.

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

pub type ContainerId = Id<ContainerMarker>;
pub type ExecId = Id<ExecMarker>;
pub type ServiceId = Id<ServiceMarker>;
pub type TaskId = Id<TaskMarker>;
