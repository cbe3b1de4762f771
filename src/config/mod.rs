//! Harvester configuration.
//!
//! Following the same layered-provider approach the teacher uses for its
//! own [`Config`](https://api.rocket.rs/master/rocket/struct.Config.html):
//! defaults, overridden by an optional TOML file, overridden by
//! `CERTGREP_`-prefixed environment variables.

mod format;

pub use format::OutputFormat;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::{Figment, Metadata, Profile, Provider};
use serde::{Deserialize, Serialize};

/// Where the structured sighting log (spec.md §4.6) is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// `<output_root>/<run>/extractor.log`.
    File,
    /// Standard output.
    Stdout,
}

/// Harvester configuration, extracted via [`Config::figment`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Certificate encodings to persist per digest. **(default: `{pem}`)**
    pub output_formats: HashSet<OutputFormat>,
    /// Root directory under which a run-scoped subdirectory is created.
    /// **(default: `certs`)**
    pub output_root: PathBuf,
    /// Destination for the sighting log. **(default: `file`)**
    pub log_target: LogTarget,
    /// BPF capture filter. **(default: `tcp`)**
    pub bpf: String,
    /// Age past which an idle stream is flushed. **(default: `30s`)**
    #[serde(with = "duration_secs")]
    pub max_age: Duration,
    /// Per-stream reorder-buffer cap before an early flush is forced.
    /// **(default: 4 MiB)**
    pub max_reorder_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_formats: HashSet::from([OutputFormat::Pem]),
            output_root: PathBuf::from("certs"),
            log_target: LogTarget::File,
            bpf: "tcp".into(),
            max_age: Duration::from_secs(30),
            max_reorder_buffer: 4 * 1024 * 1024,
        }
    }
}

impl Config {
    /// The default provider figment used to build a [`Config`].
    ///
    /// Reads, in ascending priority order: [`Config::default()`], then
    /// `Certgrep.toml` (or the file named in `CERTGREP_CONFIG`), then
    /// `CERTGREP_`-prefixed environment variables.
    pub fn figment() -> Figment {
        Figment::from(Config::default())
            .merge(Toml::file(Env::var_or("CERTGREP_CONFIG", "Certgrep.toml")).nested())
            .merge(Env::prefixed("CERTGREP_").global())
    }

    /// Extracts a `Config` from `provider`, failing on invalid values.
    pub fn try_from<T: Provider>(provider: T) -> figment::error::Result<Self> {
        Figment::from(provider).extract()
    }
}

impl Provider for Config {
    fn metadata(&self) -> Metadata {
        Metadata::named("Certgrep Config")
    }

    fn data(&self) -> figment::error::Result<figment::value::Map<Profile, figment::value::Dict>> {
        Serialized::defaults(self).data()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.output_formats, HashSet::from([OutputFormat::Pem]));
        assert_eq!(config.max_age, Duration::from_secs(30));
        assert_eq!(config.bpf, "tcp");
    }

    #[test]
    fn figment_extracts_defaults_with_no_overrides() {
        let config: Config = Figment::from(Config::default()).extract().unwrap();
        assert_eq!(config, Config::default());
    }
}
