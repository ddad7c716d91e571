use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{find_config_file, read_config, read_config_at};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    #[serde(default)]
    auth: Auth,
    admin: Option<Admin>,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
}

/// Token lifetimes.
#[derive(Debug, Deserialize)]
pub struct Auth {
    #[serde(default = "default_access_token_minutes")]
    access_token_minutes: i64,
    #[serde(default = "default_refresh_token_days")]
    refresh_token_days: i64,
    #[serde(default = "default_reset_token_minutes")]
    reset_token_minutes: i64,
}

/// Bootstrap admin account, created at startup when missing.
#[derive(Debug, Deserialize)]
pub struct Admin {
    email: String,
    password: String,
}

fn default_access_token_minutes() -> i64 {
    15
}

fn default_refresh_token_days() -> i64 {
    7
}

fn default_reset_token_minutes() -> i64 {
    60
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
            reset_token_minutes: default_reset_token_minutes(),
        }
    }
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let bytes = read_config(use_local)?;
                    Self::from_slice(&bytes)
                };

                match read_cfg(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Failed to load config.");
                        std::process::exit(1);
                    }
                }
            })
            .await
    }

    pub fn from_slice(bytes: &[u8]) -> ConfigResult<Self> {
        let config: Self = toml::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.app.jwt.is_empty() {
            return Err(ConfigError::Invalid("app.jwt must not be empty"));
        }
        let auth = &self.auth;
        if auth.access_token_minutes <= 0
            || auth.refresh_token_days <= 0
            || auth.reset_token_minutes <= 0
        {
            return Err(ConfigError::Invalid("token lifetimes must be positive"));
        }
        Ok(())
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    #[inline]
    pub fn admin(&self) -> Option<&Admin> {
        self.admin.as_ref()
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }
}

impl Auth {
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_minutes)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_token_days)
    }

    pub fn reset_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.reset_token_minutes)
    }
}

impl Admin {
    #[inline]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[inline]
    pub fn password(&self) -> &str {
        &self.password
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn config_test() {
        let config = Config::get_or_init(true).await;
        assert_eq!(config.host().bindto(), "127.0.0.1:5000"); // defaults
    }

    #[test]
    fn auth_section_defaults_when_missing() {
        let config = Config::from_slice(
            br#"
            [host]
            bindto = "0.0.0.0:8080"

            [app]
            jwt = "secret"
            database_uri = "postgres://localhost/db"
            "#,
        )
        .unwrap();

        assert!(!config.app().docs());
        assert!(config.admin().is_none());
        assert_eq!(config.auth().access_token_ttl(), chrono::Duration::minutes(15));
        assert_eq!(config.auth().refresh_token_ttl(), chrono::Duration::days(7));
        assert_eq!(config.auth().reset_token_ttl(), chrono::Duration::minutes(60));
    }

    #[test]
    fn partial_auth_section_keeps_other_defaults() {
        let config = Config::from_slice(
            br#"
            [host]
            bindto = "0.0.0.0:8080"

            [app]
            jwt = "secret"
            database_uri = "postgres://localhost/db"

            [auth]
            refresh_token_days = 30

            [admin]
            email = "root@example.com"
            password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(config.auth().refresh_token_ttl(), chrono::Duration::days(30));
        assert_eq!(config.auth().access_token_ttl(), chrono::Duration::minutes(15));
        assert_eq!(config.admin().map(|a| a.email()), Some("root@example.com"));
    }

    #[test]
    fn missing_host_is_an_error() {
        let result = Config::from_slice(b"[app]\njwt = \"x\"\ndatabase_uri = \"y\"\n");
        assert!(matches!(result, Err(ConfigError::TomlDeError(_))));
    }

    #[test]
    fn rejects_empty_secret_and_zero_lifetimes() {
        let base = "[host]\nbindto = \"0.0.0.0:8080\"\n[app]\ndatabase_uri = \"y\"\n";

        let empty_jwt = format!("{base}jwt = \"\"\n");
        assert!(matches!(
            Config::from_slice(empty_jwt.as_bytes()),
            Err(ConfigError::Invalid(_))
        ));

        let zero_ttl = format!("{base}jwt = \"x\"\n[auth]\naccess_token_minutes = 0\n");
        assert!(matches!(
            Config::from_slice(zero_ttl.as_bytes()),
            Err(ConfigError::Invalid(_))
        ));
    }
}
