//! AWS client settings.
//!
//! Flags (and the `AWS_*` variables clap reads for them) win over the
//! `--config` file, which wins over `COMPREHEND_*` variables, which win over
//! the active profile of the shared AWS credentials file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use comprehend_aws::{ClientConfig, Credentials, DEFAULT_REGION};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "COMPREHEND";

const DEFAULT_PROFILE: &str = "default";

#[derive(Args, Debug, Clone, Default)]
pub struct AwsArgs {
  /// AWS access key ID.
  #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
  pub access_key: Option<String>,

  /// AWS secret access key.
  #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
  pub secret_key: Option<String>,

  /// Session token for temporary credentials.
  #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
  pub session_token: Option<String>,

  /// AWS region (default: us-east-1).
  #[arg(long, env = "AWS_REGION")]
  pub region: Option<String>,

  /// Custom endpoint, e.g. a local emulator.
  #[arg(long, value_name = "URL")]
  pub endpoint_url: Option<String>,

  /// Profile to read from the shared credentials file.
  #[arg(long, env = "AWS_PROFILE")]
  pub profile: Option<String>,
}

impl AwsArgs {
  pub fn profile(&self) -> &str { self.profile.as_deref().unwrap_or(DEFAULT_PROFILE) }
}

/// Shape of the optional config file and of the `COMPREHEND_*` variables.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct FileSettings {
  pub access_key_id:     Option<String>,
  pub secret_access_key: Option<String>,
  pub session_token:     Option<String>,
  pub region:            Option<String>,
  pub endpoint_url:      Option<String>,
}

impl FileSettings {
  /// Fill every unset field from `fallback`.
  pub fn or(self, fallback: FileSettings) -> FileSettings {
    FileSettings {
      access_key_id:     self.access_key_id.or(fallback.access_key_id),
      secret_access_key: self.secret_access_key.or(fallback.secret_access_key),
      session_token:     self.session_token.or(fallback.session_token),
      region:            self.region.or(fallback.region),
      endpoint_url:      self.endpoint_url.or(fallback.endpoint_url),
    }
  }
}

/// One `[profile]` section of the shared credentials file.
#[derive(Debug, Default, Deserialize)]
struct ProfileSection {
  aws_access_key_id:     Option<String>,
  aws_secret_access_key: Option<String>,
  aws_session_token:     Option<String>,
}

/// Merge `env` with the config file at `path`, the file taking precedence.
pub fn load(path: Option<&Path>, env: Environment) -> Result<FileSettings> {
  let mut builder = Config::builder().add_source(env);
  if let Some(path) = path {
    builder = builder.add_source(File::from(path).required(true));
  }

  builder
    .build()
    .context("failed to read settings")?
    .try_deserialize()
    .context("failed to deserialise settings")
}

/// `AWS_SHARED_CREDENTIALS_FILE`, else `~/.aws/credentials`.
pub fn shared_credentials_path() -> Option<PathBuf> {
  std::env::var_os("AWS_SHARED_CREDENTIALS_FILE")
    .map(PathBuf::from)
    .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".aws/credentials")))
}

/// Credentials of `profile` in the INI file at `path`. A missing file or
/// profile yields empty settings.
pub fn load_profile(path: &Path, profile: &str) -> Result<FileSettings> {
  if !path.is_file() {
    return Ok(FileSettings::default());
  }

  let ini = Config::builder()
    .add_source(File::new(&path.to_string_lossy(), FileFormat::Ini))
    .build()
    .with_context(|| format!("failed to read credentials file {}", path.display()))?;

  let section = match ini.get::<ProfileSection>(profile) {
    Ok(section) => section,
    Err(ConfigError::NotFound(_)) => return Ok(FileSettings::default()),
    Err(e) => {
      return Err(e).with_context(|| format!("failed to read profile {profile} in {}", path.display()));
    }
  };

  Ok(FileSettings {
    access_key_id: section.aws_access_key_id,
    secret_access_key: section.aws_secret_access_key,
    session_token: section.aws_session_token,
    ..FileSettings::default()
  })
}

fn pick(flag: &Option<String>, setting: Option<String>) -> Option<String> {
  flag.clone().or(setting).filter(|v| !v.is_empty())
}

pub fn resolve(args: &AwsArgs, file: FileSettings) -> Result<ClientConfig> {
  let access_key = pick(&args.access_key, file.access_key_id);
  let secret_key = pick(&args.secret_key, file.secret_access_key);

  let (Some(access_key_id), Some(secret_access_key)) = (access_key, secret_key) else {
    bail!(
      "missing AWS credentials: pass --access-key and --secret-key, set \
       AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, add access_key_id and \
       secret_access_key to the config file, or select a profile of the shared \
       credentials file with --profile"
    );
  };

  Ok(ClientConfig {
    credentials:  Credentials {
      access_key_id,
      secret_access_key,
      session_token: pick(&args.session_token, file.session_token),
    },
    region:       pick(&args.region, file.region).unwrap_or_else(|| DEFAULT_REGION.to_owned()),
    endpoint_url: pick(&args.endpoint_url, file.endpoint_url),
  })
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  fn env(vars: &[(&str, &str)]) -> Environment {
    let map = vars
      .iter()
      .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
      .collect::<config::Map<String, String>>();
    Environment::with_prefix(ENV_PREFIX).source(Some(map))
  }

  fn toml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
  }

  #[test]
  fn environment_alone() {
    let settings = load(
      None,
      env(&[("COMPREHEND_ACCESS_KEY_ID", "AKID"), ("COMPREHEND_REGION", "eu-west-1")]),
    )
    .unwrap();

    assert_eq!(settings.access_key_id.as_deref(), Some("AKID"));
    assert_eq!(settings.region.as_deref(), Some("eu-west-1"));
    assert_eq!(settings.secret_access_key, None);
  }

  #[test]
  fn file_overrides_environment() {
    let file = toml_file("region = \"ap-south-1\"\nsecret_access_key = \"from-file\"\n");

    let settings = load(
      Some(file.path()),
      env(&[("COMPREHEND_REGION", "eu-west-1"), ("COMPREHEND_ACCESS_KEY_ID", "AKID")]),
    )
    .unwrap();

    assert_eq!(settings.region.as_deref(), Some("ap-south-1"));
    assert_eq!(settings.secret_access_key.as_deref(), Some("from-file"));
    assert_eq!(settings.access_key_id.as_deref(), Some("AKID"));
  }

  #[test]
  fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load(Some(&dir.path().join("nope.toml")), env(&[])).unwrap_err();
    assert!(err.to_string().contains("failed to read settings"));
  }

  const CREDENTIALS: &str = "\
[default]
aws_access_key_id = DEFAULTKEY
aws_secret_access_key = default-secret

[work]
aws_access_key_id = WORKKEY
aws_secret_access_key = work/secret+1
aws_session_token = work-token
";

  fn credentials_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CREDENTIALS.as_bytes()).unwrap();
    file
  }

  #[test]
  fn named_profile_from_shared_credentials() {
    let file = credentials_file();

    let settings = load_profile(file.path(), "work").unwrap();

    assert_eq!(settings.access_key_id.as_deref(), Some("WORKKEY"));
    assert_eq!(settings.secret_access_key.as_deref(), Some("work/secret+1"));
    assert_eq!(settings.session_token.as_deref(), Some("work-token"));
    assert_eq!(settings.region, None);
  }

  #[test]
  fn default_profile_is_used_without_profile_flag() {
    let file = credentials_file();

    let settings = load_profile(file.path(), AwsArgs::default().profile()).unwrap();
    let config = resolve(&AwsArgs::default(), settings).unwrap();

    assert_eq!(config.credentials.access_key_id, "DEFAULTKEY");
    assert_eq!(config.credentials.secret_access_key, "default-secret");
  }

  #[test]
  fn missing_profile_or_file_gives_nothing() {
    let file = credentials_file();
    assert_eq!(load_profile(file.path(), "nope").unwrap(), FileSettings::default());

    let dir = tempfile::tempdir().unwrap();
    assert_eq!(
      load_profile(&dir.path().join("credentials"), "default").unwrap(),
      FileSettings::default()
    );
  }

  #[test]
  fn config_settings_win_over_profile() {
    let file = credentials_file();
    let configured = FileSettings {
      access_key_id: Some("CONFIGKEY".into()),
      region: Some("eu-west-1".into()),
      ..FileSettings::default()
    };

    let merged = configured.or(load_profile(file.path(), "work").unwrap());

    assert_eq!(merged.access_key_id.as_deref(), Some("CONFIGKEY"));
    assert_eq!(merged.secret_access_key.as_deref(), Some("work/secret+1"));
    assert_eq!(merged.region.as_deref(), Some("eu-west-1"));
  }

  #[test]
  fn flags_override_file_and_region_defaults() {
    let args = AwsArgs {
      access_key: Some("flag-key".into()),
      ..AwsArgs::default()
    };
    let file = FileSettings {
      access_key_id: Some("file-key".into()),
      secret_access_key: Some("file-secret".into()),
      ..FileSettings::default()
    };

    let config = resolve(&args, file).unwrap();

    assert_eq!(config.credentials.access_key_id, "flag-key");
    assert_eq!(config.credentials.secret_access_key, "file-secret");
    assert_eq!(config.credentials.session_token, None);
    assert_eq!(config.region, "us-east-1");
    assert_eq!(config.endpoint_url, None);
  }

  #[test]
  fn missing_credentials_are_rejected() {
    let args = AwsArgs { access_key: Some("AKID".into()), ..AwsArgs::default() };
    let err = resolve(&args, FileSettings::default()).unwrap_err();
    assert!(err.to_string().starts_with("missing AWS credentials"));

    let blank = AwsArgs {
      access_key: Some(String::new()),
      secret_key: Some("secret".into()),
      ..AwsArgs::default()
    };
    assert!(resolve(&blank, FileSettings::default()).is_err());
  }
}
