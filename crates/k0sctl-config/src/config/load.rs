//! Reading [`ClusterConfigFragment`]s from YAML or JSON documents.
use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use snafu::{ResultExt, Snafu};
use tracing::{debug, trace};

use crate::config::raw::ClusterConfigFragment;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to open configuration file {path}", path = path.display()))]
    OpenFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse configuration as YAML"))]
    ParseYaml { source: serde_yaml::Error },

    #[snafu(display("failed to parse configuration as JSON"))]
    ParseJson { source: serde_json::Error },
}

/// The document formats a configuration can be read from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum InputFormat {
    /// YAML, which also accepts JSON documents.
    #[default]
    Yaml,
    Json,
}

impl InputFormat {
    /// Guesses the format from the file extension, falling back to YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some(extension) if extension.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

impl ClusterConfigFragment {
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context(ParseYamlSnafu)
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        serde_json::from_str(input).context(ParseJsonSnafu)
    }

    pub fn from_reader<R: Read>(format: InputFormat, reader: R) -> Result<Self> {
        match format {
            InputFormat::Yaml => serde_yaml::from_reader(reader).context(ParseYamlSnafu),
            InputFormat::Json => serde_json::from_reader(reader).context(ParseJsonSnafu),
        }
    }

    /// Reads the configuration at `path`, using the format matching its extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = InputFormat::from_path(path);
        trace!(path = %path.display(), %format, "reading cluster configuration");

        let file = File::open(path).context(OpenFileSnafu { path })?;
        let fragment = Self::from_reader(format, BufReader::new(file))?;
        debug!(
            hosts = fragment.spec.hosts.as_ref().map_or(0, Vec::len),
            "read cluster configuration"
        );

        Ok(fragment)
    }
}
