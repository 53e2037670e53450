use std::any::Any;

/// Opaque token owning every renderer object a [`SceneInitializer`](super::backend::SceneInitializer) created.
///
/// Dropping the token releases all of it as a unit. The bridge never looks
/// inside; commands can downcast to the integrator's own type.
#[derive(Default)]
pub struct UserData(Option<Box<dyn Any>>);

impl UserData {
    pub fn new<T: Any>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    /// A token that owns nothing.
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref()?.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0.as_mut()?.downcast_mut::<T>()
    }
}

impl std::fmt::Debug for UserData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserData")
            .field("empty", &self.is_empty())
            .finish()
    }
}
