//! Proxied surface: distributed key admission plus upstream forwarding.

pub(crate) mod guard;
pub(crate) mod proxy;
