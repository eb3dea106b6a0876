//! A single registered layer.

use crate::handler::{BoxedErrorHandler, BoxedHandler};
use http::Method;
use std::fmt;
use stitch_core::MethodFilter;

/// Whether a layer runs during normal flow or while an error is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Runs while no error is pending.
    Normal,
    /// Runs only while an error is pending.
    Error,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// The handler stored in a layer. The variant fixes the layer's kind.
#[derive(Clone)]
pub enum LayerHandler {
    /// A normal handler.
    Normal(BoxedHandler),
    /// An error handler.
    Error(BoxedErrorHandler),
}

/// One entry of a [`Registry`](crate::Registry): a method filter plus a handler.
#[derive(Clone)]
pub struct Layer {
    method: MethodFilter,
    handler: LayerHandler,
}

impl Layer {
    /// Creates a normal layer.
    #[must_use]
    pub fn normal(method: impl Into<MethodFilter>, handler: BoxedHandler) -> Self {
        Self {
            method: method.into(),
            handler: LayerHandler::Normal(handler),
        }
    }

    /// Creates an error layer.
    #[must_use]
    pub fn error(method: impl Into<MethodFilter>, handler: BoxedErrorHandler) -> Self {
        Self {
            method: method.into(),
            handler: LayerHandler::Error(handler),
        }
    }

    /// Returns the layer kind.
    #[must_use]
    pub const fn kind(&self) -> LayerKind {
        match self.handler {
            LayerHandler::Normal(_) => LayerKind::Normal,
            LayerHandler::Error(_) => LayerKind::Error,
        }
    }

    /// Returns the method filter.
    #[must_use]
    pub const fn method(&self) -> &MethodFilter {
        &self.method
    }

    /// Returns the stored handler.
    #[must_use]
    pub const fn handler(&self) -> &LayerHandler {
        &self.handler
    }

    /// Returns the handler name, for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match &self.handler {
            LayerHandler::Normal(handler) => handler.name(),
            LayerHandler::Error(handler) => handler.name(),
        }
    }

    /// Returns `true` if this layer should run for `method` in `kind` mode.
    #[must_use]
    pub fn matches(&self, method: &Method, kind: LayerKind) -> bool {
        self.kind() == kind && self.method.matches(method)
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("method", &self.method)
            .field("kind", &self.kind())
            .field("handler", &self.name())
            .finish()
    }
}
