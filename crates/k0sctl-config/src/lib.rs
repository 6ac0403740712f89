//! Translation of declarative k0s cluster descriptions into k0sctl cluster specifications.
//!
//! A cluster description is read into the [raw configuration model](config::raw) (for example with
//! [`ClusterConfigFragment::load`]), then validated and normalized by [`translate()`]:
//!
//! ```
//! use k0sctl_config::{ClusterConfigFragment, translate};
//!
//! let raw = ClusterConfigFragment::from_yaml_str(
//!     "
//! metadata:
//!   name: c1
//! spec:
//!   k0s:
//!     version: 1.27.1
//!   host:
//!     - role: controller
//!       ssh:
//!         address: 10.0.0.1
//!         key_path: /k
//!         user: root
//! ",
//! )?;
//!
//! let translated = translate(raw).expect("configuration is valid");
//! assert_eq!(translated.cluster.k0s.channel, "stable");
//! # Ok::<(), k0sctl_config::config::load::Error>(())
//! ```
//!
//! The shape of the accepted configuration is declared in [`schema`], the result is described in [`cluster`].

pub mod cluster;
pub mod config;
pub mod schema;
pub mod translate;
pub mod yaml;

pub use crate::{
    cluster::ClusterSpecification,
    config::{
        fragment::{Diagnostic, Diagnostics, Severity},
        raw::ClusterConfigFragment,
    },
    translate::{Translated, translate},
};
