use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand, ValueEnum};
use k0sctl_config::{
    ClusterConfigFragment, Diagnostics, Translated,
    config::load::{self, InputFormat},
    schema::CLUSTER_SCHEMA,
    translate,
    yaml::{self, SerializeOptions},
};
use snafu::{ResultExt, Snafu};
use tracing::{info, warn};

mod logging;

const APP_NAME: &str = "k0sctl-translate";
const LOG_ENV: &str = "K0SCTL_TRANSLATE_LOG";
const INPUT_ENV: &str = "K0SCTL_TRANSLATE_CONFIG";

/// The path which selects stdin as input.
const STDIN: &str = "-";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitializeLogging { source: logging::Error },

    #[snafu(display("failed to read cluster configuration from {input}", input = input.display()))]
    ReadConfiguration { source: load::Error, input: PathBuf },

    #[snafu(display("cluster configuration is invalid"))]
    InvalidConfiguration { source: Diagnostics },

    #[snafu(display("failed to serialize output as YAML"))]
    SerializeYaml { source: yaml::Error },

    #[snafu(display("failed to serialize output as JSON"))]
    SerializeJson { source: serde_json::Error },

    #[snafu(display("failed to create output file {path}", path = path.display()))]
    CreateOutput {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to write output"))]
    WriteOutput { source: std::io::Error },
}

#[derive(Debug, Parser)]
#[command(name = APP_NAME, author, version, about = "Translates k0s cluster descriptions into k0sctl configuration")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Translates a cluster description and writes the result
    Translate {
        /// The cluster description to read, `-` reads YAML or JSON from stdin
        #[arg(env = INPUT_ENV)]
        input: PathBuf,

        /// Writes the result to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Validates a cluster description and reports every problem found in it
    Validate {
        /// The cluster description to read, `-` reads YAML or JSON from stdin
        #[arg(env = INPUT_ENV)]
        input: PathBuf,
    },

    /// Prints the accepted configuration surface
    Schema {
        #[arg(short, long, value_enum, default_value_t)]
        format: SchemaFormat,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "kebab-case")]
enum OutputFormat {
    /// The k0sctl `Cluster` document
    #[default]
    K0sctl,

    /// The full cluster specification, including lifecycle flags, as YAML
    SpecYaml,

    /// The full cluster specification, including lifecycle flags, as JSON
    SpecJson,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, strum::Display)]
#[strum(serialize_all = "kebab-case")]
enum SchemaFormat {
    /// The attribute and block descriptors as YAML
    #[default]
    Descriptor,

    /// The JSON Schema of the accepted configuration
    JsonSchema,
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    logging::initialize_logging(LOG_ENV, APP_NAME).context(InitializeLoggingSnafu)?;

    match cli.command {
        Command::Translate {
            input,
            output,
            format,
        } => {
            let translated = load_and_translate(&input)?;
            let rendered = render(&translated, format)?;
            write_output(output.as_deref(), &rendered)?;
            info!(%format, "wrote translated cluster configuration");
            Ok(())
        }
        Command::Validate { input } => {
            let translated = load_and_translate(&input)?;
            write_output(None, &validation_summary(&translated))
        }
        Command::Schema { format } => {
            let rendered = match format {
                SchemaFormat::Descriptor => {
                    yaml::to_string(&CLUSTER_SCHEMA, &SerializeOptions::default())
                        .context(SerializeYamlSnafu)?
                }
                SchemaFormat::JsonSchema => {
                    let schema = schemars::schema_for!(ClusterConfigFragment);
                    let mut json =
                        serde_json::to_string_pretty(&schema).context(SerializeJsonSnafu)?;
                    json.push('\n');
                    json
                }
            };
            write_output(None, &rendered)
        }
    }
}

fn load_and_translate(input: &Path) -> Result<Translated, Error> {
    let raw = if input == Path::new(STDIN) {
        ClusterConfigFragment::from_reader(InputFormat::Yaml, std::io::stdin().lock())
    } else {
        ClusterConfigFragment::load(input)
    }
    .context(ReadConfigurationSnafu { input })?;

    let translated = translate(raw).context(InvalidConfigurationSnafu)?;
    for warning in &translated.warnings {
        warn!(path = %warning.path(), "{}", warning.problem());
    }
    Ok(translated)
}

fn validation_summary(translated: &Translated) -> String {
    format!(
        "cluster {name} is valid, {hosts} host(s), {warnings} warning(s)\n",
        name = translated.cluster.metadata.name,
        hosts = translated.cluster.hosts.len(),
        warnings = translated.warnings.len(),
    )
}

fn render(translated: &Translated, format: OutputFormat) -> Result<String, Error> {
    let cluster = &translated.cluster;
    match format {
        OutputFormat::K0sctl => {
            yaml::to_string(&cluster.to_document(), &SerializeOptions::default())
                .context(SerializeYamlSnafu)
        }
        OutputFormat::SpecYaml => {
            yaml::to_string(cluster, &SerializeOptions::default()).context(SerializeYamlSnafu)
        }
        OutputFormat::SpecJson => {
            let mut json = serde_json::to_string_pretty(cluster).context(SerializeJsonSnafu)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn write_output(path: Option<&Path>, content: &str) -> Result<(), Error> {
    let mut writer: Box<dyn Write> = match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).context(CreateOutputSnafu { path })?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };

    writer
        .write_all(content.as_bytes())
        .context(WriteOutputSnafu)?;
    writer.flush().context(WriteOutputSnafu)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use clap::CommandFactory;
    use indoc::indoc;
    use k0sctl_config::cluster::{ClusterMetadata, ClusterSpecification, K0sSpec};
    use rstest::rstest;
    use tempfile::NamedTempFile;

    use super::*;

    fn translated() -> Translated {
        Translated {
            cluster: ClusterSpecification {
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
                hosts: Vec::new(),
            },
            warnings: Diagnostics::default(),
        }
    }

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temporary file must be created");
        file.write_all(content.as_bytes())
            .expect("temporary file must be written");
        file
    }

    #[test]
    fn validate_reports_warnings_in_summary() {
        let file = config_file(indoc! {"
            metadata:
              name: c1
            spec:
              k0s:
                version: 1.27.1
              host:
                - role: controller
                  ssh:
                    address: 10.0.0.1
                    key_path: /k
                    user: root
                  winrm:
                    address: 10.0.0.1
                    user: Administrator
                    password: secret
        "});

        let translated = load_and_translate(file.path()).expect("configuration must be valid");

        assert_eq!(
            validation_summary(&translated),
            "cluster c1 is valid, 1 host(s), 1 warning(s)\n"
        );
    }

    #[test]
    fn validate_reports_every_diagnostic() {
        let file = config_file(indoc! {"
            metadata:
              name: c1
            spec:
              host: []
        "});

        let error = load_and_translate(file.path()).expect_err("configuration must be invalid");

        assert!(matches!(error, Error::InvalidConfiguration { .. }), "{error:?}");
        assert_eq!(error.to_string(), "cluster configuration is invalid");
        let diagnostics = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(
            diagnostics.as_deref(),
            Some(
                "error: spec.k0s.version: field is required\n\
                 error: spec.host: at least 1 host is required"
            )
        );
    }

    #[test]
    fn validate_reports_unreadable_input() {
        let error = load_and_translate(Path::new("/does/not/exist.yaml"))
            .expect_err("missing files must not load");

        assert!(matches!(error, Error::ReadConfiguration { .. }), "{error:?}");
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case(&["k0sctl-translate", "translate", "cluster.yaml"], OutputFormat::K0sctl, None)]
    #[case(
        &["k0sctl-translate", "translate", "-", "--format", "spec-json", "--output", "out.json"],
        OutputFormat::SpecJson,
        Some("out.json")
    )]
    fn parse_translate(
        #[case] args: &[&str],
        #[case] expected_format: OutputFormat,
        #[case] expected_output: Option<&str>,
    ) {
        let cli = Cli::try_parse_from(args).expect("arguments must parse");

        assert!(matches!(
            cli.command,
            Command::Translate { ref output, format, .. }
                if format == expected_format && output.as_deref() == expected_output.map(Path::new)
        ));
    }

    #[test]
    fn reject_unknown_format() {
        Cli::try_parse_from(["k0sctl-translate", "schema", "--format", "markdown"])
            .expect_err("unknown formats must be rejected");
    }

    #[test]
    fn render_k0sctl_document() {
        let rendered = render(&translated(), OutputFormat::K0sctl).expect("document must render");

        assert!(rendered.starts_with("---\n"));
        assert!(rendered.contains("apiVersion: k0sctl.k0sproject.io/v1beta1"));
        assert!(!rendered.contains("skipDestroy"));
    }

    #[test]
    fn render_spec_json() {
        let rendered = render(&translated(), OutputFormat::SpecJson).expect("spec must render");

        let value: serde_json::Value =
            serde_json::from_str(&rendered).expect("rendered spec must be valid JSON");
        assert_eq!(value["id"], "cluster/c1");
        assert_eq!(value["skipDestroy"], true);
        assert_eq!(value["k0s"]["versionChannel"], "stable");
    }
}
