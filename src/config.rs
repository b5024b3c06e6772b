// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

//! Store configuration, read from a TOML file.
//!
//! ```toml
//! [store]
//! description = "test store"
//! max_objects = 128
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use toml;

pub const DEFAULT_CONF_NAME: &str = "store.conf";

/// The `[store]` section
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Free form name, shown in log messages
    pub description: Option<String>,
    /// Maximum number of objects held at the same time, no limit if unset
    pub max_objects: Option<usize>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    pub fn new() -> Config {
        Config::default()
    }

    /// Returns the store description or a generic name
    pub fn description(&self) -> &str {
        match self.store.description {
            Some(ref d) => d.as_str(),
            None => "p11store",
        }
    }

    pub fn max_objects(&self) -> Option<usize> {
        self.store.max_objects
    }

    pub fn find_conf() -> Result<String> {
        /* First check for our own env var,
         * this has the highest precedence */
        if let Ok(var) = env::var("P11STORE_CONF") {
            return Ok(var);
        }
        /* Freedesktop specification for config dirs first
         * then fallback to use $HOME/.config */
        let conffile = match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) => format!("{}/p11store/{}", xdg, DEFAULT_CONF_NAME),
            Err(_) => match env::var("HOME") {
                Ok(home) => {
                    format!("{}/.config/p11store/{}", home, DEFAULT_CONF_NAME)
                }
                Err(_) => {
                    return Err(Error::config_error(
                        "no configuration directory available",
                    ))
                }
            },
        };
        if Path::new(&conffile).is_file() {
            Ok(conffile)
        } else {
            Err(Error::config_error(format!("{} not found", conffile)))
        }
    }

    pub fn from_file(filename: &str) -> Result<Config> {
        let config_str = fs::read_to_string(filename)?;
        Config::from_str(&config_str)
    }

    /// Loads the configuration file found by [Config::find_conf], or
    /// returns the default configuration if there is none
    ///
    /// A file that exists but can't be parsed is an error.
    pub fn default_config() -> Result<Config> {
        match Config::find_conf() {
            Ok(filename) => Config::from_file(&filename),
            Err(_) => Ok(Config::default()),
        }
    }

    /// Serializes the configuration back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(Error::config_error)
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Config> {
        let conf: Config = toml::from_str(s)?;
        Ok(conf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pkcs11::CKR_ARGUMENTS_BAD;

    use serial_test::{parallel, serial};

    fn write_conf(name: &str, content: &str) -> String {
        let path = env::temp_dir().join(format!(
            "p11store-{}-{}.conf",
            name,
            std::process::id()
        ));
        fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    #[parallel]
    fn parse_full_config() {
        let conf = Config::from_str(
            "[store]\ndescription = \"test store\"\nmax_objects = 128\n",
        )
        .unwrap();
        assert_eq!(conf.description(), "test store");
        assert_eq!(conf.max_objects(), Some(128));
    }

    #[test]
    #[parallel]
    fn empty_config_is_default() {
        let conf: Config = "".parse().unwrap();
        assert_eq!(conf, Config::default());
        assert_eq!(conf.description(), "p11store");
        assert_eq!(conf.max_objects(), None);

        let conf: Config = "[store]\n".parse().unwrap();
        assert_eq!(conf, Config::new());
    }

    #[test]
    #[parallel]
    fn bad_config() {
        let err = Config::from_str("[store]\nmax_objects = \"many\"\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.rv(), CKR_ARGUMENTS_BAD);

        let err = Config::from_str("[store\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let err = Config::from_file("/nonexistent/p11store/store.conf")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    #[parallel]
    fn serialize_config() {
        let mut conf = Config::new();
        conf.store.max_objects = Some(3);
        let text = conf.to_toml().unwrap();
        assert_eq!(Config::from_str(&text).unwrap(), conf);
    }

    #[test]
    #[serial]
    fn find_conf_from_env() {
        let filename = write_conf("env", "[store]\nmax_objects = 7\n");
        env::set_var("P11STORE_CONF", &filename);
        assert_eq!(Config::find_conf().unwrap(), filename);
        let conf = Config::default_config().unwrap();
        assert_eq!(conf.max_objects(), Some(7));
        env::remove_var("P11STORE_CONF");
        fs::remove_file(&filename).unwrap();
    }

    #[test]
    #[serial]
    fn find_conf_in_xdg_dir() {
        let saved = env::var("XDG_CONFIG_HOME").ok();
        env::remove_var("P11STORE_CONF");

        let xdg = env::temp_dir()
            .join(format!("p11store-xdg-{}", std::process::id()));
        let dir = xdg.join("p11store");
        fs::create_dir_all(&dir).unwrap();
        env::set_var("XDG_CONFIG_HOME", &xdg);

        /* nothing there yet */
        assert!(Config::find_conf().is_err());
        assert_eq!(Config::default_config().unwrap(), Config::default());

        fs::write(
            dir.join(DEFAULT_CONF_NAME),
            "[store]\ndescription = \"xdg\"\n",
        )
        .unwrap();
        let conf = Config::default_config().unwrap();
        assert_eq!(conf.description(), "xdg");

        match saved {
            Some(v) => env::set_var("XDG_CONFIG_HOME", v),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
        fs::remove_dir_all(&xdg).unwrap();
    }
}
