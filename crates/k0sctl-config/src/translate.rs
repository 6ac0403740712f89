//! The validation and normalization engine.
//!
//! [`translate`] walks a [`ClusterConfigFragment`], resolves defaults, enforces the invariants that cannot be
//! expressed by the [schema descriptor](crate::schema) alone and produces a [`ClusterSpecification`]. It is a
//! pure function of its input: it performs no I/O, keeps no state between calls, and produces identical output
//! (including the order of diagnostics) for identical input.
use tracing::{debug, info, instrument, warn};

use crate::{
    cluster::{
        ClusterMetadata, ClusterSpecification, ConnectionDescriptor, HookPhase, HookTiming, Hooks,
        HostRecord, K0sSpec, KIND, SshConnection, WinRmConnection,
    },
    config::{
        fragment::{Diagnostics, FromFragment, Problem, Validator},
        raw::{
            ClusterConfigFragment, ClusterMetadataFragment, HookListFragment, HooksFragment,
            HostFragment, K0sFragment, SshFragment, WinRmFragment,
        },
    },
    schema::{
        DEFAULT_K0S_CHANNEL, DEFAULT_SKIP_CREATE, DEFAULT_SKIP_DESTROY, DEFAULT_SSH_PORT,
        DEFAULT_WINRM_INSECURE, DEFAULT_WINRM_PORT, DEFAULT_WINRM_USE_HTTPS, MIN_HOSTS,
    },
};

/// A successfully translated configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Translated {
    pub cluster: ClusterSpecification,

    /// Non-fatal diagnostics, such as ambiguous connection methods.
    pub warnings: Diagnostics,
}

/// Validates and normalizes `raw` into a [`ClusterSpecification`].
///
/// Every problem in the document is reported, not just the first one. If any of them is fatal, only the
/// [`Diagnostics`] (including warnings) are returned and no partial specification is produced.
#[instrument(skip_all)]
pub fn translate(raw: ClusterConfigFragment) -> Result<Translated, Diagnostics> {
    let mut diagnostics = Diagnostics::default();
    let cluster = ClusterSpecification::from_fragment(raw, &Validator::root(), &mut diagnostics);

    match cluster {
        Some(cluster) if !diagnostics.has_errors() => {
            info!(
                cluster.name = %cluster.metadata.name,
                hosts = cluster.hosts.len(),
                warnings = diagnostics.len(),
                "translated cluster configuration"
            );
            Ok(Translated {
                cluster,
                warnings: diagnostics,
            })
        }
        _ => {
            info!(
                errors = diagnostics.errors().count(),
                "cluster configuration is invalid"
            );
            Err(diagnostics)
        }
    }
}

impl FromFragment for ClusterSpecification {
    type Fragment = ClusterConfigFragment;

    fn from_fragment(
        fragment: Self::Fragment,
        validator: &Validator,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        let metadata = ClusterMetadata::from_fragment(
            fragment.metadata,
            &validator.field("metadata"),
            diagnostics,
        );

        let spec = validator.field("spec");
        let k0s = K0sSpec::from_fragment(fragment.spec.k0s, &spec.field("k0s"), diagnostics);
        let hosts = hosts_from_fragment(fragment.spec.hosts, &spec.field("host"), diagnostics);

        let metadata = metadata?;
        Some(Self {
            id: format!("{KIND}/{name}", name = metadata.name),
            skip_create: fragment.skip_create.unwrap_or(DEFAULT_SKIP_CREATE),
            skip_destroy: fragment.skip_destroy.unwrap_or(DEFAULT_SKIP_DESTROY),
            metadata,
            k0s: k0s?,
            hosts: hosts?,
        })
    }
}

impl FromFragment for ClusterMetadata {
    type Fragment = ClusterMetadataFragment;

    fn from_fragment(
        fragment: Self::Fragment,
        validator: &Validator,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        let name = validator
            .field("name")
            .required_non_empty(fragment.name, diagnostics)?;
        Some(Self { name })
    }
}

impl FromFragment for K0sSpec {
    type Fragment = K0sFragment;

    fn from_fragment(
        fragment: Self::Fragment,
        validator: &Validator,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        let version = validator
            .field("version")
            .required(fragment.version, diagnostics)?;
        Some(Self {
            version,
            channel: fragment
                .channel
                .unwrap_or_else(|| DEFAULT_K0S_CHANNEL.to_owned()),
        })
    }
}

/// Validates every host, in input order, so that the problems of all hosts are reported together.
fn hosts_from_fragment(
    hosts: Option<Vec<HostFragment>>,
    validator: &Validator,
    diagnostics: &mut Diagnostics,
) -> Option<Vec<HostRecord>> {
    let hosts = hosts.unwrap_or_default();
    if hosts.len() < MIN_HOSTS {
        diagnostics.push(validator.error(Problem::TooFewHosts { min: MIN_HOSTS }));
        return None;
    }

    let records: Vec<Option<HostRecord>> = hosts
        .into_iter()
        .enumerate()
        .map(|(index, host)| HostRecord::from_fragment(host, &validator.index(index), diagnostics))
        .collect();
    records.into_iter().collect()
}

impl FromFragment for HostRecord {
    type Fragment = HostFragment;

    fn from_fragment(
        fragment: Self::Fragment,
        validator: &Validator,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        let role = validator
            .field("role")
            .required_non_empty(fragment.role, diagnostics);
        let connection = ConnectionDescriptor::from_fragment(
            (fragment.ssh, fragment.winrm),
            validator,
            diagnostics,
        );
        let hooks = resolve_hooks(fragment.hooks, &validator.field("hooks"));

        let host = Self {
            role: role?,
            connection: connection?,
            hooks,
        };
        debug!(path = %validator.path(), role = %host.role, "resolved host");
        Some(host)
    }
}

impl FromFragment for ConnectionDescriptor {
    /// The SSH and WinRM blocks of a host, of which exactly one should be set.
    type Fragment = (Option<SshFragment>, Option<WinRmFragment>);

    fn from_fragment(
        fragment: Self::Fragment,
        validator: &Validator,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        match fragment {
            (Some(ssh), winrm) => {
                if winrm.is_some() {
                    warn!(
                        path = %validator.path(),
                        "host has both ssh and winrm configured, using ssh"
                    );
                    diagnostics.push(validator.warning(Problem::AmbiguousConnectionMethod));
                }
                SshConnection::from_fragment(ssh, &validator.field("ssh"), diagnostics)
                    .map(Self::Ssh)
            }
            (None, Some(winrm)) => {
                WinRmConnection::from_fragment(winrm, &validator.field("winrm"), diagnostics)
                    .map(Self::WinRm)
            }
            (None, None) => {
                diagnostics.push(validator.error(Problem::NoConnectionMethod));
                None
            }
        }
    }
}

impl FromFragment for SshConnection {
    type Fragment = SshFragment;

    fn from_fragment(
        fragment: Self::Fragment,
        validator: &Validator,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        let address = validator
            .field("address")
            .required(fragment.address, diagnostics);
        let key_path = validator
            .field("key_path")
            .required(fragment.key_path, diagnostics);
        let user = validator.field("user").required(fragment.user, diagnostics);
        let port = resolve_port(
            fragment.port,
            DEFAULT_SSH_PORT,
            &validator.field("port"),
            diagnostics,
        );

        Some(Self {
            address: address?,
            user: user?,
            port: port?,
            key_path: key_path?,
        })
    }
}

impl FromFragment for WinRmConnection {
    type Fragment = WinRmFragment;

    fn from_fragment(
        fragment: Self::Fragment,
        validator: &Validator,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        let address = validator
            .field("address")
            .required(fragment.address, diagnostics);
        let user = validator.field("user").required(fragment.user, diagnostics);
        let password = validator
            .field("password")
            .required(fragment.password, diagnostics);
        let port = resolve_port(
            fragment.port,
            DEFAULT_WINRM_PORT,
            &validator.field("port"),
            diagnostics,
        );

        Some(Self {
            address: address?,
            user: user?,
            password: password?,
            port: port?,
            use_https: fragment.use_https.unwrap_or(DEFAULT_WINRM_USE_HTTPS),
            insecure: fragment.insecure.unwrap_or(DEFAULT_WINRM_INSECURE),
        })
    }
}

/// Applies `default` to an unset port and checks that the result fits into a TCP port.
fn resolve_port(
    port: Option<i64>,
    default: i64,
    validator: &Validator,
    diagnostics: &mut Diagnostics,
) -> Option<u16> {
    let port = port.unwrap_or(default);
    match u16::try_from(port) {
        Ok(valid) if valid > 0 => Some(valid),
        _ => {
            diagnostics.push(validator.error(Problem::PortOutOfRange { port }));
            None
        }
    }
}

/// The outcome of reading a list of hook commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListExtraction {
    /// The list was not set.
    Absent,

    /// All elements of the list are known.
    Extracted(Vec<String>),

    /// The list is malformed or contains unknown elements, and cannot be used.
    Degraded { unknown_elements: usize },
}

impl ListExtraction {
    /// Returns the extracted commands, falling back to an empty list for absent and degraded lists.
    pub fn into_commands(self) -> Vec<String> {
        match self {
            Self::Extracted(commands) => commands,
            Self::Absent | Self::Degraded { .. } => Vec::new(),
        }
    }
}

/// Reads a list of hook commands.
///
/// A list with unknown or non-string elements is [degraded](ListExtraction::Degraded). A value that is not a
/// list at all counts as a single unknown element.
pub fn extract_string_list(list: Option<HookListFragment>) -> ListExtraction {
    let commands = match list {
        None => return ListExtraction::Absent,
        Some(HookListFragment::Commands(commands)) => commands,
        Some(HookListFragment::Malformed(value)) => {
            let unknown_elements = value.as_sequence().map_or(1, |elements| {
                elements.iter().filter(|element| !element.is_string()).count()
            });
            return ListExtraction::Degraded { unknown_elements };
        }
    };

    let unknown_elements = commands.iter().filter(|command| command.is_none()).count();
    if unknown_elements > 0 {
        return ListExtraction::Degraded { unknown_elements };
    }

    ListExtraction::Extracted(commands.into_iter().flatten().collect())
}

/// Resolves the hooks of a host. This never fails: lists that cannot be extracted are replaced by empty ones.
fn resolve_hooks(hooks: Option<HooksFragment>, validator: &Validator) -> Hooks {
    let mut resolved = Hooks::default();
    let Some(apply) = hooks.and_then(|hooks| hooks.apply) else {
        return resolved;
    };

    let phase = HookPhase::Apply.to_string();
    let apply_validator = validator.field(&phase);
    for (timing, list) in [
        (HookTiming::Before, apply.before),
        (HookTiming::After, apply.after),
    ] {
        let commands = match extract_string_list(list) {
            ListExtraction::Degraded { unknown_elements } => {
                let timing_name = timing.to_string();
                warn!(
                    path = %apply_validator.field(&timing_name).path(),
                    unknown_elements,
                    "hook list contains unknown elements, falling back to an empty list"
                );
                Vec::new()
            }
            extraction => extraction.into_commands(),
        };
        resolved.insert(HookPhase::Apply, timing, commands);
    }

    resolved
}
