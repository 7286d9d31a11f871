//! Flutter-facing bindings for the SimpleTodo core.

pub mod api;
