//! Route table and the navigation guard.
//!
//! The host's router asks [`RouteGuard::before_each`] before every navigation and applies the
//! returned [`NavigationDecision`].

pub mod guard;
pub mod route;

pub use guard::{GuardState, RouteGuard};
pub use route::{NavigationDecision, Route, RouteName, RouteTarget, UnknownRoute};
