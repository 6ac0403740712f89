//! The raw, unvalidated configuration tree.
//!
//! Every leaf is optional, so that an unset value can be told apart from one that was explicitly set. Nested
//! blocks that may appear at most once are modelled as [`Option`]s. For compatibility with block-list based
//! sources they also accept a list with zero or one entries.
use std::{fmt, marker::PhantomData};

use schemars::JsonSchema;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error as _, IgnoredAny, MapAccess, SeqAccess, Visitor, value::MapAccessDeserializer},
};

/// Top-level configuration document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClusterConfigFragment {
    /// Skip reset on destroy (default: false)
    pub skip_destroy: Option<bool>,

    /// Skip apply on create (default: false)
    pub skip_create: Option<bool>,

    /// Metadata for the k0sctl cluster.
    #[serde(default, deserialize_with = "nullable_block")]
    #[schemars(with = "Option<ClusterMetadataFragment>")]
    pub metadata: ClusterMetadataFragment,

    /// k0sctl installation specification.
    #[serde(default, deserialize_with = "nullable_block")]
    #[schemars(with = "Option<ClusterSpecFragment>")]
    pub spec: ClusterSpecFragment,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClusterMetadataFragment {
    /// Cluster name
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ClusterSpecFragment {
    /// k0s installation configuration.
    #[serde(default, deserialize_with = "nullable_block")]
    #[schemars(with = "Option<K0sFragment>")]
    pub k0s: K0sFragment,

    /// Individual host configuration, for each machine in the cluster.
    #[serde(rename = "host")]
    pub hosts: Option<Vec<HostFragment>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct K0sFragment {
    /// k0s version to install
    pub version: Option<String>,

    /// Repository installation channel (default: stable)
    pub channel: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HostFragment {
    /// Host machine role in the cluster
    pub role: Option<String>,

    /// Hook configuration for the host.
    #[serde(default, deserialize_with = "singleton_block")]
    #[schemars(with = "Option<SingletonOrList<HooksFragment>>")]
    pub hooks: Option<HooksFragment>,

    /// SSH connection for the host.
    #[serde(default, deserialize_with = "singleton_block")]
    #[schemars(with = "Option<SingletonOrList<SshFragment>>")]
    pub ssh: Option<SshFragment>,

    /// WinRM connection for the host.
    #[serde(default, deserialize_with = "singleton_block")]
    #[schemars(with = "Option<SingletonOrList<WinRmFragment>>")]
    pub winrm: Option<WinRmFragment>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HooksFragment {
    /// Commands to run around the apply operation.
    #[serde(default, deserialize_with = "singleton_block")]
    #[schemars(with = "Option<SingletonOrList<HookActionFragment>>")]
    pub apply: Option<HookActionFragment>,
}

/// A list of hook commands, as written in the document.
///
/// Hook lists are read leniently: a value that is not a list of strings is kept as [`Malformed`] instead of
/// failing the whole document, so that translation can fall back to an empty list.
///
/// [`Malformed`]: HookListFragment::Malformed
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum HookListFragment {
    /// Commands, of which some may be unknown (`null`).
    Commands(Vec<Option<String>>),

    /// Any other value, such as a scalar or a list of numbers.
    Malformed(serde_yaml::Value),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HookActionFragment {
    /// Commands to run on the host before the apply operation
    #[schemars(with = "Option<Vec<String>>")]
    pub before: Option<HookListFragment>,

    /// Commands to run on the host after the apply operation
    #[schemars(with = "Option<Vec<String>>")]
    pub after: Option<HookListFragment>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SshFragment {
    /// SSH endpoint address
    pub address: Option<String>,

    /// Path to the SSH private key
    pub key_path: Option<String>,

    /// SSH user
    pub user: Option<String>,

    /// SSH port (default: 22)
    pub port: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WinRmFragment {
    /// WinRM endpoint address
    pub address: Option<String>,

    /// WinRM user
    pub user: Option<String>,

    /// WinRM password
    pub password: Option<String>,

    /// WinRM port (default: 5985)
    pub port: Option<i64>,

    /// If false, plain HTTP is used for the WinRM transport (default: true)
    pub use_https: Option<bool>,

    /// If true, the TLS certificate of the WinRM endpoint is not verified (default: true)
    pub insecure: Option<bool>,
}

/// The accepted shapes of a singleton block, used to describe it in the JSON Schema.
#[allow(dead_code)]
#[derive(JsonSchema)]
#[serde(untagged)]
enum SingletonOrList<T> {
    List(Vec<T>),
    Single(T),
}

/// Deserializes an optional singleton block, which may also be written as a list of at most one entry.
///
/// Errors of the block itself, such as unknown fields, are passed through unchanged.
fn singleton_block<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    deserializer.deserialize_option(SingletonBlockVisitor(PhantomData))
}

struct SingletonBlockVisitor<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for SingletonBlockVisitor<T>
where
    T: Deserialize<'de>,
{
    type Value = Option<T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a block, or a list of at most one block")
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        T::deserialize(MapAccessDeserializer::new(map)).map(Some)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let Some(block) = seq.next_element()? else {
            return Ok(None);
        };

        let mut count = 1;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            count += 1;
        }
        if count > 1 {
            return Err(A::Error::invalid_length(count, &self));
        }

        Ok(Some(block))
    }
}

/// Deserializes a block that is treated as empty when set to `null`.
fn nullable_block<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
