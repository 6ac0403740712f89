//! Cluster configuration input.
//!
//! Configuration passes through two states before it is handed to the deployment engine:
//!
//! 1. [`raw`]: the configuration as written by the user (or generated by higher-level tooling). Every value is
//!    optional, nothing has been checked. Documents are read into this state by [`load`].
//! 2. [`ClusterSpecification`](crate::cluster::ClusterSpecification): the validated, fully defaulted result
//!    of [`translate`](crate::translate::translate).
//!
//! The [`fragment`] module contains the machinery shared by both directions: the [`FromFragment`] trait that
//! validated types implement, and the [`Diagnostics`] that collect every problem found along the way, each
//! with the path of the field it refers to.
//!
//! User code should never read the contents of raw fragments beyond handing them to the translation engine.
//!
//! [`FromFragment`]: fragment::FromFragment
//! [`Diagnostics`]: fragment::Diagnostics

pub mod fragment;
pub mod load;
pub mod raw;
