//! Object store facade.
//!
//! [`StoreAgent`] wraps any [`ObjectStore`] and applies an optional inbound
//! transform before `set` and an optional outbound transform after `get`.
//! Everything else is a faithful passthrough. A missing transform means
//! "pass through".

use karst_error::Result;
use karst_types::Scn;

/// A store of objects addressed by a dense integer id range.
///
/// This is the surface an array-file-backed object cache exposes; the
/// facade delegates to it without knowing how objects are laid out.
pub trait ObjectStore<T> {
    /// First valid object id.
    fn object_id_start(&self) -> i32;

    /// Number of object ids in the range.
    fn object_id_count(&self) -> i32;

    /// Retrieve the object at `object_id`, if present.
    fn get(&self, object_id: i32) -> Option<T>;

    /// Store `object` at `object_id`, stamped with `scn`.
    fn set(&mut self, object_id: i32, object: T, scn: Scn) -> Result<()>;

    /// Remove the object at `object_id`, stamped with `scn`.
    fn delete(&mut self, object_id: i32, scn: Scn) -> Result<()>;

    /// Flush pending changes to the backing store.
    fn persist(&mut self) -> Result<()>;
}

/// An in-place mutation applied to objects crossing the facade.
pub trait ObjectTransform<T> {
    /// Mutate `object` in place.
    fn apply(&self, object: &mut T);
}

impl<T, F> ObjectTransform<T> for F
where
    F: Fn(&mut T),
{
    fn apply(&self, object: &mut T) {
        self(object)
    }
}

/// A transforming wrapper around an [`ObjectStore`].
pub struct StoreAgent<T, S> {
    store: S,
    inbound: Option<Box<dyn ObjectTransform<T>>>,
    outbound: Option<Box<dyn ObjectTransform<T>>>,
}

impl<T, S: ObjectStore<T>> StoreAgent<T, S> {
    /// Wrap `store` with the given transforms; `None` passes through.
    pub fn new(
        store: S,
        inbound: Option<Box<dyn ObjectTransform<T>>>,
        outbound: Option<Box<dyn ObjectTransform<T>>>,
    ) -> Self {
        Self {
            store,
            inbound,
            outbound,
        }
    }

    /// The wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The inbound transform, if any.
    pub fn inbound(&self) -> Option<&dyn ObjectTransform<T>> {
        self.inbound.as_deref()
    }

    /// The outbound transform, if any.
    pub fn outbound(&self) -> Option<&dyn ObjectTransform<T>> {
        self.outbound.as_deref()
    }

    /// Unwrap back into the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<T, S: ObjectStore<T>> ObjectStore<T> for StoreAgent<T, S> {
    fn object_id_start(&self) -> i32 {
        self.store.object_id_start()
    }

    fn object_id_count(&self) -> i32 {
        self.store.object_id_count()
    }

    fn get(&self, object_id: i32) -> Option<T> {
        let mut object = self.store.get(object_id)?;
        if let Some(transform) = &self.outbound {
            transform.apply(&mut object);
        }
        Some(object)
    }

    fn set(&mut self, object_id: i32, mut object: T, scn: Scn) -> Result<()> {
        if let Some(transform) = &self.inbound {
            transform.apply(&mut object);
        }
        self.store.set(object_id, object, scn)
    }

    fn delete(&mut self, object_id: i32, scn: Scn) -> Result<()> {
        self.store.delete(object_id, scn)
    }

    fn persist(&mut self) -> Result<()> {
        self.store.persist()
    }
}
