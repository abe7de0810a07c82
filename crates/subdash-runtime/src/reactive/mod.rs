#![forbid(unsafe_code)]

//! Change notification shared by the history and settings managers.
//!
//! Both managers expose the same `subscribe(fn) -> Subscription` shape. This
//! is the only integration surface with the presentation layer.

pub mod listeners;

pub use listeners::{ListenerSet, Subscription};
