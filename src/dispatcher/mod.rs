//! # Dispatcher Module
//!
//! Hands a matched route to its action.
//!
//! [`Action::Handler`](crate::route::Action::Handler) routes call a function
//! registered with [`Dispatcher::register_handler`].
//! [`Action::Controller`](crate::route::Action::Controller) routes resolve the
//! class through a [`Container`] and call the named method on the returned
//! [`Controller`]. Either way the action sees the bound parameters with null
//! entries removed.
//!
//! Routing failures never reach an action: they become `404`, `405` or, for
//! `OPTIONS`, an empty `200` with an `Allow` header.

mod core;

pub use core::{
    Container, Controller, ControllerRegistry, Dispatcher, HandlerFn, HandlerRequest,
    HandlerResponse, HeaderVec, MAX_INLINE_HEADERS,
};
