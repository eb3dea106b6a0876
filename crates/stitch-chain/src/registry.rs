//! Ordered layer storage.
//!
//! The registry is append-only while a chain is built and read-only while it
//! dispatches. Insertion order is the walk order; duplicates are legal and
//! each one runs.

use crate::handler::{BoxedErrorHandler, BoxedHandler};
use crate::layer::{Layer, LayerKind};
use http::Method;
use stitch_core::MethodFilter;

/// Ordered list of layers.
#[derive(Clone, Default, Debug)]
pub struct Registry {
    layers: Vec<Layer>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one normal layer per handler, all with the same method filter.
    pub fn register<I>(&mut self, method: impl Into<MethodFilter>, handlers: I)
    where
        I: IntoIterator<Item = BoxedHandler>,
    {
        let method = method.into();
        self.layers.extend(
            handlers
                .into_iter()
                .map(|handler| Layer::normal(method.clone(), handler)),
        );
    }

    /// Appends one error layer per handler, all with the same method filter.
    pub fn register_error<I>(&mut self, method: impl Into<MethodFilter>, handlers: I)
    where
        I: IntoIterator<Item = BoxedErrorHandler>,
    {
        let method = method.into();
        self.layers.extend(
            handlers
                .into_iter()
                .map(|handler| Layer::error(method.clone(), handler)),
        );
    }

    /// Appends an already built layer.
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Finds the first layer at or after `from` that runs for `method` in
    /// `kind` mode.
    #[must_use]
    pub fn find(&self, from: usize, method: &Method, kind: LayerKind) -> Option<(usize, &Layer)> {
        self.layers
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, layer)| layer.matches(method, kind))
    }

    /// Returns the layer at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if no layer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Iterates over the layers in walk order.
    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }
}
