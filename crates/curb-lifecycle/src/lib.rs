//! The report lifecycle service and the notification dispatcher.
//!
//! [`service::ReportLifecycle`] is the surface the (external) HTTP layer
//! calls: it owns authorization, transition rules, cache consistency, and
//! notification policy, generic over the store and cache traits from
//! `curb-core`. [`dispatch`] runs delivery on a background task so no
//! operation ever waits on a provider.

pub mod cache;
pub mod dispatch;
pub mod service;

pub use dispatch::{Dispatcher, NotificationQueue, spawn_dispatcher};
pub use service::{
  AssignOutcome, LifecycleConfig, ReportLifecycle, ReportRef,
};

#[cfg(test)]
mod tests;
