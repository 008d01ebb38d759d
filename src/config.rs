//! Settings shared by computation and document functions.
//!
//! Nothing here is global: load a [`FiscalConfig`] once and pass the parts
//! that are needed ([`TaxRates`], the timezone) into each call.

use serde::{Deserialize, Serialize};

use crate::core::{FiscalError, TaxRates};

/// Prefix of environment variables read by [`FiscalConfig::load`],
/// e.g. `FISKAL__ENDPOINT__HOST`.
pub const ENV_PREFIX: &str = "FISKAL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiscalConfig {
    /// IANA name of the taxpayer's timezone. All document and protection
    /// code timestamps are written in it.
    pub timezone: String,
    pub tax_rates: TaxRates,
    pub endpoint: Endpoint,
}

impl Default for FiscalConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Zagreb".into(),
            tax_rates: TaxRates::default(),
            endpoint: Endpoint::default(),
        }
    }
}

/// Where requests are posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "cis.porezna-uprava.hr".into(),
            port: 8449,
            path: "/FiskalizacijaService".into(),
        }
    }
}

impl Endpoint {
    /// The CIS test environment.
    pub fn test() -> Self {
        Self {
            host: "cistest.apis-it.hr".into(),
            port: 8449,
            path: "/FiskalizacijaServiceTest".into(),
        }
    }
}

impl FiscalConfig {
    /// The configured timezone, resolved against the tz database.
    #[cfg(feature = "fiscal")]
    pub fn timezone(&self) -> Result<chrono_tz::Tz, FiscalError> {
        self.timezone
            .parse()
            .map_err(|e| FiscalError::Config(format!("unknown timezone '{}': {e}", self.timezone)))
    }

    /// Layer an optional TOML file and `FISKAL__*` environment variables
    /// over the defaults. Nested keys use `__` in variable names.
    #[cfg(feature = "config")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, FiscalError> {
        let path = path.as_ref();
        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::new(&path.to_string_lossy(), ::config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;
        let config: Self = settings.try_deserialize().map_err(config_err)?;
        tracing::debug!(path = %path.display(), timezone = %config.timezone, "loaded configuration");
        Ok(config)
    }

    /// Parse TOML text over the defaults, without consulting the environment.
    #[cfg(feature = "config")]
    pub fn from_toml(text: &str) -> Result<Self, FiscalError> {
        ::config::Config::builder()
            .add_source(::config::File::from_str(text, ::config::FileFormat::Toml))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(config_err)
    }
}

#[cfg(feature = "config")]
fn config_err(e: ::config::ConfigError) -> FiscalError {
    FiscalError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults() {
        let config = FiscalConfig::default();
        assert_eq!(config.timezone, "Europe/Zagreb");
        assert_eq!(config.tax_rates.vat_standard, dec!(0.25));
        assert_eq!(config.endpoint.host, "cis.porezna-uprava.hr");
        assert_eq!(config.endpoint.port, 8449);
        assert_eq!(config.endpoint.path, "/FiskalizacijaService");
    }

    #[cfg(feature = "fiscal")]
    #[test]
    fn resolves_timezone() {
        let mut config = FiscalConfig::default();
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Zagreb);
        config.timezone = "Mars/Olympus".into();
        assert!(matches!(config.timezone(), Err(FiscalError::Config(_))));
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_overrides_defaults() {
        let config = FiscalConfig::from_toml(
            r#"
            timezone = "Europe/Vienna"

            [tax_rates]
            vat_lower = "0.05"

            [endpoint]
            host = "cistest.apis-it.hr"
            "#,
        )
        .unwrap();
        assert_eq!(config.timezone, "Europe/Vienna");
        assert_eq!(config.tax_rates.vat_lower, dec!(0.05));
        assert_eq!(config.tax_rates.vat_standard, dec!(0.25));
        assert_eq!(config.endpoint.host, "cistest.apis-it.hr");
        assert_eq!(config.endpoint.port, 8449);
    }

    #[cfg(feature = "config")]
    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = FiscalConfig::load("/nonexistent/fiskal.toml").unwrap();
        assert_eq!(config.endpoint, FiscalConfig::default().endpoint);
    }
}
