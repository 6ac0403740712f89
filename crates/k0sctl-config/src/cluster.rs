//! The normalized cluster specification handed to the deployment engine.
//!
//! All values in here have been validated and defaulted by [`translate`](crate::translate::translate). The
//! types serialize using the field names of the k0sctl configuration file format.
use std::collections::BTreeMap;

use serde::Serialize;

/// The API version of the k0sctl configuration document.
pub const API_VERSION: &str = "k0sctl.k0sproject.io/v1beta1";

/// The kind of the k0sctl configuration document.
pub const KIND: &str = "cluster";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpecification {
    /// Identifier assigned during translation, derived from [`KIND`] and the cluster name.
    pub id: String,

    /// Instructs the deployment engine to skip the apply phase on create.
    pub skip_create: bool,

    /// Instructs the deployment engine to skip the reset phase on destroy.
    pub skip_destroy: bool,

    pub metadata: ClusterMetadata,
    pub k0s: K0sSpec,

    /// Hosts in input order, which is the order operations fan out in.
    pub hosts: Vec<HostRecord>,
}

impl ClusterSpecification {
    /// Returns the k0sctl `Cluster` document view of this specification.
    ///
    /// The lifecycle flags and the identifier are not part of the document, they only instruct the engine
    /// driving k0sctl.
    pub fn to_document(&self) -> ClusterDocument<'_> {
        ClusterDocument {
            api_version: API_VERSION,
            kind: KIND,
            metadata: &self.metadata,
            spec: DocumentSpec {
                hosts: self.hosts.iter().map(DocumentHost::from).collect(),
                k0s: &self.k0s,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClusterMetadata {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct K0sSpec {
    pub version: String,

    #[serde(rename = "versionChannel")]
    pub channel: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HostRecord {
    pub role: String,

    #[serde(flatten)]
    pub connection: ConnectionDescriptor,

    pub hooks: Hooks,
}

/// The method used to reach a host, exactly one per host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ConnectionDescriptor {
    #[serde(rename = "ssh")]
    Ssh(SshConnection),

    #[serde(rename = "winRM")]
    WinRm(WinRmConnection),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConnection {
    pub address: String,
    pub user: String,
    pub port: u16,
    pub key_path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinRmConnection {
    pub address: String,
    pub user: String,
    pub password: String,
    pub port: u16,

    #[serde(rename = "useHTTPS")]
    pub use_https: bool,
    pub insecure: bool,
}

/// The lifecycle operation a hook is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HookPhase {
    Apply,
}

/// Whether a hook runs before or after its phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HookTiming {
    Before,
    After,
}

/// Shell commands to run on a host, keyed by [`HookPhase`] and [`HookTiming`].
///
/// Commands are executed in list order. A missing phase means that no hooks run for it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Hooks(BTreeMap<HookPhase, BTreeMap<HookTiming, Vec<String>>>);

impl Hooks {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns whether any timing is configured for `phase`, even if its command lists are empty.
    pub fn contains_phase(&self, phase: HookPhase) -> bool {
        self.0.contains_key(&phase)
    }

    /// Returns the commands for `phase` and `timing`, or an empty slice if there are none.
    pub fn commands(&self, phase: HookPhase, timing: HookTiming) -> &[String] {
        self.0
            .get(&phase)
            .and_then(|timings| timings.get(&timing))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn insert(&mut self, phase: HookPhase, timing: HookTiming, commands: Vec<String>) {
        self.0.entry(phase).or_default().insert(timing, commands);
    }
}

/// The k0sctl `Cluster` document, see [`ClusterSpecification::to_document`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDocument<'a> {
    pub api_version: &'static str,
    pub kind: &'static str,
    pub metadata: &'a ClusterMetadata,
    pub spec: DocumentSpec<'a>,
}

#[derive(Debug, Serialize)]
pub struct DocumentSpec<'a> {
    pub hosts: Vec<DocumentHost<'a>>,
    pub k0s: &'a K0sSpec,
}

/// A host of the k0sctl document. Unlike [`HostRecord`], it leaves out hooks when there are none.
#[derive(Debug, Serialize)]
pub struct DocumentHost<'a> {
    pub role: &'a str,

    #[serde(flatten)]
    pub connection: &'a ConnectionDescriptor,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hooks: Option<&'a Hooks>,
}

impl<'a> From<&'a HostRecord> for DocumentHost<'a> {
    fn from(host: &'a HostRecord) -> Self {
        Self {
            role: &host.role,
            connection: &host.connection,
            hooks: (!host.hooks.is_empty()).then_some(&host.hooks),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cluster() -> ClusterSpecification {
        let mut hooks = Hooks::default();
        hooks.insert(HookPhase::Apply, HookTiming::After, vec!["echo done".to_owned()]);
        hooks.insert(HookPhase::Apply, HookTiming::Before, vec![]);

        ClusterSpecification {
            id: "cluster/c1".to_owned(),
            skip_create: false,
            skip_destroy: true,
            metadata: ClusterMetadata {
                name: "c1".to_owned(),
            },
            k0s: K0sSpec {
                version: "1.27.1".to_owned(),
                channel: "stable".to_owned(),
            },
            hosts: vec![
                HostRecord {
                    role: "controller".to_owned(),
                    connection: ConnectionDescriptor::Ssh(SshConnection {
                        address: "10.0.0.1".to_owned(),
                        user: "root".to_owned(),
                        port: 22,
                        key_path: "/k".to_owned(),
                    }),
                    hooks,
                },
                HostRecord {
                    role: "worker".to_owned(),
                    connection: ConnectionDescriptor::WinRm(WinRmConnection {
                        address: "10.0.0.2".to_owned(),
                        user: "Administrator".to_owned(),
                        password: "secret".to_owned(),
                        port: 5985,
                        use_https: true,
                        insecure: false,
                    }),
                    hooks: Hooks::default(),
                },
            ],
        }
    }

    #[test]
    fn hook_lookup() {
        let cluster = cluster();
        let hooks = &cluster.hosts[0].hooks;

        assert!(hooks.contains_phase(HookPhase::Apply));
        assert_eq!(hooks.commands(HookPhase::Apply, HookTiming::After), ["echo done"]);
        assert!(hooks.commands(HookPhase::Apply, HookTiming::Before).is_empty());
        assert!(
            cluster.hosts[1]
                .hooks
                .commands(HookPhase::Apply, HookTiming::Before)
                .is_empty()
        );
    }

    #[test]
    fn serialize_document() {
        let cluster = cluster();
        let document = serde_json::to_value(cluster.to_document()).expect("document must serialize");

        assert_eq!(
            document,
            json!({
                "apiVersion": "k0sctl.k0sproject.io/v1beta1",
                "kind": "cluster",
                "metadata": { "name": "c1" },
                "spec": {
                    "hosts": [
                        {
                            "role": "controller",
                            "ssh": { "address": "10.0.0.1", "user": "root", "port": 22, "keyPath": "/k" },
                            "hooks": { "apply": { "before": [], "after": ["echo done"] } },
                        },
                        {
                            "role": "worker",
                            "winRM": {
                                "address": "10.0.0.2",
                                "user": "Administrator",
                                "password": "secret",
                                "port": 5985,
                                "useHTTPS": true,
                                "insecure": false,
                            },
                        },
                    ],
                    "k0s": { "version": "1.27.1", "versionChannel": "stable" },
                },
            })
        );
    }

    #[test]
    fn serialize_specification() {
        let value = serde_json::to_value(cluster()).expect("specification must serialize");

        assert_eq!(value["id"], "cluster/c1");
        assert_eq!(value["skipCreate"], false);
        assert_eq!(value["skipDestroy"], true);
        assert_eq!(value["hosts"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["hosts"][1]["hooks"], json!({}));
    }
}
