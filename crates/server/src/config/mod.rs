use std::sync::OnceLock;

use figment::Figment;
use figment::providers::{Env, Format, Toml};

mod logger;
mod server_config;

pub use logger::*;
pub use server_config::*;

pub static CONFIG: OnceLock<ServerConfig> = OnceLock::new();

/// Layers `FEDMOCK_` environment variables over the TOML file named by
/// `FEDMOCK_CONFIG`, or `fedmock.toml`.
pub fn figment() -> Figment {
    Figment::new()
        .merge(Toml::file(Env::var("FEDMOCK_CONFIG").as_deref().unwrap_or("fedmock.toml")))
        .merge(Env::prefixed("FEDMOCK_").split("__").global())
}

pub fn init() {
    let conf = match figment().extract::<ServerConfig>() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("It looks like your config is invalid. The following error occurred: {e}");
            std::process::exit(1);
        }
    };

    if CONFIG.set(conf).is_err() {
        eprintln!("config is already initialized");
    }
}

pub fn get() -> &'static ServerConfig {
    match CONFIG.get() {
        Some(conf) => conf,
        None => panic!("config is not initialized"),
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;
    use crate::core::serde::base64;

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|_jail| {
            let conf: ServerConfig = figment().extract()?;
            assert_eq!(conf.listen_addr, "0.0.0.0:8448");
            assert_eq!(conf.server_name, "localhost:8448");
            assert_eq!(conf.key_discovery_prefix, "/_matrix/key/v2");
            assert!(conf.accept_invalid_certs);
            assert!(conf.tls.is_none());
            assert_eq!(conf.logger.format, "pretty");

            let settings = conf.federation_settings();
            assert_eq!(settings.scheme, "https");
            assert_eq!(settings.max_request_size, 8 * 1024 * 1024);
            assert_eq!(conf.identity().unwrap().key_id(), "ed25519:1");
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "fedmock.toml",
                r#"
                server_name = "s.test:8448"
                key_version = "a_1"
                federation_scheme = "http"

                [tls]
                cert = "cert.pem"
                key = "key.pem"

                [logger]
                format = "json"
                "#,
            )?;
            jail.set_env("FEDMOCK_SERVER_NAME", "t.test:8448");
            jail.set_env("FEDMOCK_LOGGER__LEVEL", "warn");

            let conf: ServerConfig = figment().extract()?;
            assert_eq!(conf.server_name, "t.test:8448");
            assert_eq!(conf.federation_settings().scheme, "http");
            assert_eq!(conf.tls.as_ref().map(|tls| tls.cert.as_str()), Some("cert.pem"));
            assert_eq!(conf.logger.format, "json");
            assert_eq!(conf.logger.level, "warn");

            let identity = conf.identity().unwrap();
            assert_eq!(identity.name(), "t.test:8448");
            assert_eq!(identity.key_id(), "ed25519:a_1");
            Ok(())
        });
    }

    #[test]
    fn signing_key_seeds_identity() {
        Jail::expect_with(|jail| {
            jail.set_env("FEDMOCK_SIGNING_KEY", base64::encode([7u8; 32]));
            let conf: ServerConfig = figment().extract()?;
            let first = conf.identity().unwrap();
            let second = conf.identity().unwrap();
            assert_eq!(first.public_key(), second.public_key());
            assert_eq!(first.secret_key(), [7u8; 32]);

            jail.set_env("FEDMOCK_SIGNING_KEY", base64::encode([7u8; 16]));
            let conf: ServerConfig = figment().extract()?;
            assert!(conf.identity().is_err());
            Ok(())
        });
    }
}
