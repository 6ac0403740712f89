//! Declarative description of the accepted cluster configuration.
//!
//! The [`CLUSTER_SCHEMA`] tree declares every field a cluster configuration may contain: its
//! name, primitive [`FieldKind`], [`Cardinality`] and, for nested blocks, how often the block may
//! be repeated. The descriptor only describes what a single field may look like in isolation.
//! Relationships between fields (such as "exactly one connection method per host") are enforced
//! by [`translate`](crate::translate::translate).
//!
//! The default values declared here are the single source of truth: the translation engine
//! resolves unset fields using the same constants.

use serde::Serialize;

pub const DEFAULT_K0S_CHANNEL: &str = "stable";
pub const DEFAULT_SSH_PORT: i64 = 22;
pub const DEFAULT_WINRM_PORT: i64 = 5985;
pub const DEFAULT_WINRM_USE_HTTPS: bool = true;
pub const DEFAULT_WINRM_INSECURE: bool = true;
pub const DEFAULT_SKIP_CREATE: bool = false;
pub const DEFAULT_SKIP_DESTROY: bool = false;

/// The minimum number of `spec.host` entries a cluster needs.
pub const MIN_HOSTS: usize = 1;

/// The primitive kind of an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "snake_case")]
pub enum FieldKind {
    String,
    Int,
    Bool,
    StringList,
}

/// A statically known default value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DefaultValue {
    String(&'static str),
    Int(i64),
    Bool(bool),
    EmptyList,
}

/// Whether (and how) an attribute has to be provided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Cardinality {
    /// The attribute must be set by the user.
    Required,

    /// The attribute is optional, unset values are replaced by the given default.
    Default(DefaultValue),

    /// The attribute is optional and stays unset if not provided.
    Nullable,

    /// The attribute is assigned by the translation engine and cannot be set by the user.
    Computed,
}

/// How often a nested block may appear in its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Repetition {
    /// Exactly one instance, which is implicitly empty if not provided.
    Single,

    /// A list of instances, bounded by `min` and (if set) `max`.
    List { min: usize, max: Option<usize> },
}

impl Repetition {
    /// An optional singleton, modelled as a list with zero or one entries.
    pub const AT_MOST_ONE: Self = Self::List {
        min: 0,
        max: Some(1),
    };

    /// Returns whether `count` instances satisfy this repetition.
    pub fn allows(&self, count: usize) -> bool {
        match *self {
            Self::Single => count == 1,
            Self::List { min, max } => count >= min && max.is_none_or(|max| count <= max),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub cardinality: Cardinality,
    pub description: &'static str,
}

impl AttributeDescriptor {
    const fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            cardinality: Cardinality::Required,
            description,
        }
    }

    const fn defaulted(
        name: &'static str,
        kind: FieldKind,
        default: DefaultValue,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            cardinality: Cardinality::Default(default),
            description,
        }
    }

    const fn computed(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            cardinality: Cardinality::Computed,
            description,
        }
    }

    pub fn is_required(&self) -> bool {
        self.cardinality == Cardinality::Required
    }

    /// Returns the value used when the attribute is not set, if any.
    pub fn default_value(&self) -> Option<DefaultValue> {
        match self.cardinality {
            Cardinality::Default(value) => Some(value),
            Cardinality::Required | Cardinality::Nullable | Cardinality::Computed => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDescriptor {
    pub name: &'static str,
    pub repetition: Repetition,
    pub description: &'static str,
    pub attributes: &'static [AttributeDescriptor],
    pub blocks: &'static [BlockDescriptor],
}

/// Either kind of entry that can be found in a [`BlockDescriptor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Descriptor<'a> {
    Attribute(&'a AttributeDescriptor),
    Block(&'a BlockDescriptor),
}

impl BlockDescriptor {
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    pub fn block(&self, name: &str) -> Option<&Self> {
        self.blocks.iter().find(|block| block.name == name)
    }

    /// Resolves a dotted path relative to this block.
    ///
    /// List indices are ignored, so both `spec.host.ssh` and `spec.host[2].ssh` resolve to the
    /// `ssh` block descriptor. An empty path resolves to the block itself.
    pub fn lookup(&self, path: &str) -> Option<Descriptor<'_>> {
        let mut current = self;
        let mut segments = path
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.split_once('[').map_or(segment, |(name, _)| name))
            .peekable();

        while let Some(segment) = segments.next() {
            if let Some(block) = current.block(segment) {
                current = block;
                continue;
            }

            // Attributes are leaves, nothing may follow them.
            let attribute = current.attribute(segment)?;
            return segments
                .peek()
                .is_none()
                .then_some(Descriptor::Attribute(attribute));
        }

        Some(Descriptor::Block(current))
    }
}

const HOOK_ACTION_ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::defaulted(
        "before",
        FieldKind::StringList,
        DefaultValue::EmptyList,
        "Commands to run on the host before the apply operation",
    ),
    AttributeDescriptor::defaulted(
        "after",
        FieldKind::StringList,
        DefaultValue::EmptyList,
        "Commands to run on the host after the apply operation",
    ),
];

const SSH_ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::required("address", FieldKind::String, "SSH endpoint address"),
    AttributeDescriptor::required("key_path", FieldKind::String, "Path to the SSH private key"),
    AttributeDescriptor::required("user", FieldKind::String, "SSH user"),
    AttributeDescriptor::defaulted(
        "port",
        FieldKind::Int,
        DefaultValue::Int(DEFAULT_SSH_PORT),
        "SSH port",
    ),
];

const WINRM_ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor::required("address", FieldKind::String, "WinRM endpoint address"),
    AttributeDescriptor::required("user", FieldKind::String, "WinRM user"),
    AttributeDescriptor::required("password", FieldKind::String, "WinRM password"),
    AttributeDescriptor::defaulted(
        "port",
        FieldKind::Int,
        DefaultValue::Int(DEFAULT_WINRM_PORT),
        "WinRM port",
    ),
    AttributeDescriptor::defaulted(
        "use_https",
        FieldKind::Bool,
        DefaultValue::Bool(DEFAULT_WINRM_USE_HTTPS),
        "If false, plain HTTP is used for the WinRM transport",
    ),
    AttributeDescriptor::defaulted(
        "insecure",
        FieldKind::Bool,
        DefaultValue::Bool(DEFAULT_WINRM_INSECURE),
        "If true, the TLS certificate of the WinRM endpoint is not verified",
    ),
];

const HOST_BLOCK: BlockDescriptor = BlockDescriptor {
    name: "host",
    repetition: Repetition::List {
        min: MIN_HOSTS,
        max: None,
    },
    description: "Individual host configuration, for each machine in the cluster",
    attributes: &[AttributeDescriptor::required(
        "role",
        FieldKind::String,
        "Host machine role in the cluster",
    )],
    blocks: &[
        BlockDescriptor {
            name: "hooks",
            repetition: Repetition::AT_MOST_ONE,
            description: "Hook configuration for the host",
            attributes: &[],
            blocks: &[BlockDescriptor {
                name: "apply",
                repetition: Repetition::AT_MOST_ONE,
                description: "Commands to run around the apply operation",
                attributes: HOOK_ACTION_ATTRIBUTES,
                blocks: &[],
            }],
        },
        BlockDescriptor {
            name: "ssh",
            repetition: Repetition::AT_MOST_ONE,
            description: "SSH connection for the host",
            attributes: SSH_ATTRIBUTES,
            blocks: &[],
        },
        BlockDescriptor {
            name: "winrm",
            repetition: Repetition::AT_MOST_ONE,
            description: "WinRM connection for the host",
            attributes: WINRM_ATTRIBUTES,
            blocks: &[],
        },
    ],
};

/// The root of the accepted configuration tree.
pub const CLUSTER_SCHEMA: BlockDescriptor = BlockDescriptor {
    name: "cluster",
    repetition: Repetition::Single,
    description: "k0s cluster installation using k0sctl",
    attributes: &[
        AttributeDescriptor::computed("id", FieldKind::String, "Cluster identifier"),
        AttributeDescriptor::defaulted(
            "skip_destroy",
            FieldKind::Bool,
            DefaultValue::Bool(DEFAULT_SKIP_DESTROY),
            "Skip reset on destroy",
        ),
        AttributeDescriptor::defaulted(
            "skip_create",
            FieldKind::Bool,
            DefaultValue::Bool(DEFAULT_SKIP_CREATE),
            "Skip apply on create",
        ),
    ],
    blocks: &[
        BlockDescriptor {
            name: "metadata",
            repetition: Repetition::Single,
            description: "Metadata for the k0sctl cluster",
            attributes: &[AttributeDescriptor::required(
                "name",
                FieldKind::String,
                "Cluster name",
            )],
            blocks: &[],
        },
        BlockDescriptor {
            name: "spec",
            repetition: Repetition::Single,
            description: "k0sctl installation specification",
            attributes: &[],
            blocks: &[
                BlockDescriptor {
                    name: "k0s",
                    repetition: Repetition::Single,
                    description: "k0s installation configuration",
                    attributes: &[
                        AttributeDescriptor::required(
                            "version",
                            FieldKind::String,
                            "k0s version to install",
                        ),
                        AttributeDescriptor::defaulted(
                            "channel",
                            FieldKind::String,
                            DefaultValue::String(DEFAULT_K0S_CHANNEL),
                            "Repository installation channel",
                        ),
                    ],
                    blocks: &[],
                },
                HOST_BLOCK,
            ],
        },
    ],
};
