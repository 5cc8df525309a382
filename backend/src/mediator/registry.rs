//! Handler storage keyed by request `TypeId`

use super::{Request, RequestHandler};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Each entry holds an `Arc<dyn RequestHandler<R>>` for the request type `R`
/// it is keyed by, erased to `Any` so one map can hold every request type.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: HashMap<TypeId, &'static str>,
}

impl HandlerRegistry {
    /// Returns true when a previous handler for `R` was replaced
    pub(crate) fn insert<R: Request>(&mut self, handler: Arc<dyn RequestHandler<R>>) -> bool {
        let type_id = TypeId::of::<R>();
        self.names.insert(type_id, R::NAME);
        self.handlers
            .insert(type_id, Box::new(handler) as Box<dyn Any + Send + Sync>)
            .is_some()
    }

    pub(crate) fn get<R: Request>(&self) -> Option<Arc<dyn RequestHandler<R>>> {
        self.handlers
            .get(&TypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_ref::<Arc<dyn RequestHandler<R>>>())
            .cloned()
    }

    pub(crate) fn contains<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Registered request names, sorted
    pub(crate) fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.names.values().copied().collect();
        names.sort_unstable();
        names
    }
}
