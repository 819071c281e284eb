//! Backend registration and dispatch
//!
//! This module provides a centralized registry for all bus backends, with
//! support for feature-gated inclusion, backend-string parsing and dynamic
//! help text generation.

use std::collections::HashMap;

/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory bus emulator (buses=<a;b>,fill=<byte>,script=<hex>,refuse_open=1)",
    });

    #[cfg(feature = "linux-spi")]
    backends.push(BackendInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description: "Linux spidev interface (dev_dir=<dir>)",
    });

    backends
}

/// Generate a short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let backends = available_backends();
    let names: Vec<&str> = backends.iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Parsed backend parameters
#[derive(Debug)]
pub struct BackendParams {
    /// Backend name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl BackendParams {
    /// Parameters as borrowed key-value pairs, for backend option parsers
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a backend string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
pub fn parse_backend_params(s: &str) -> Result<BackendParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    if name.is_empty() {
        return Err("Backend name cannot be empty".into());
    }

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(BackendParams {
        name: name.to_string(),
        params,
    })
}

/// An opened bus backend
pub enum Backend {
    /// In-memory emulator
    #[cfg(feature = "dummy")]
    Dummy(spilink_dummy::DummyBus),
    /// Linux spidev
    #[cfg(feature = "linux-spi")]
    LinuxSpi(spilink_linux_spi::LinuxSpiBus),
}

/// Open a backend from a `name:key=value` string
///
/// # Example
/// ```ignore
/// let backend = open_backend("linux_spi:dev_dir=/dev")?;
/// ```
pub fn open_backend(spec: &str) -> Result<Backend, Box<dyn std::error::Error>> {
    let params = parse_backend_params(spec)?;
    log::debug!("Opening backend {} with {:?}", params.name, params.params);

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" => {
            let config = spilink_dummy::parse_options(&params.pairs())?;
            Ok(Backend::Dummy(spilink_dummy::DummyBus::new(config)))
        }

        #[cfg(feature = "linux-spi")]
        "linux_spi" | "linux-spi" | "spidev" => {
            let config = spilink_linux_spi::parse_options(&params.pairs())?;
            Ok(Backend::LinuxSpi(spilink_linux_spi::LinuxSpiBus::new(config)))
        }

        _ => Err(format!("Unknown backend: {}", params.name).into()),
    }
}

/// Run `$body` with `$bus` bound to the concrete provider inside `$backend`
macro_rules! with_backend {
    ($backend:expr, $bus:ident => $body:expr) => {
        match $backend {
            #[cfg(feature = "dummy")]
            $crate::backends::Backend::Dummy($bus) => $body,
            #[cfg(feature = "linux-spi")]
            $crate::backends::Backend::LinuxSpi($bus) => $body,
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_params() {
        let params = parse_backend_params("dummy").unwrap();
        assert_eq!(params.name, "dummy");
        assert!(params.params.is_empty());

        let params = parse_backend_params("linux_spi:dev_dir=/dev,extra=1").unwrap();
        assert_eq!(params.name, "linux_spi");
        assert_eq!(params.params.get("dev_dir"), Some(&"/dev".to_string()));
        assert_eq!(params.params.get("extra"), Some(&"1".to_string()));
        assert_eq!(params.pairs().len(), 2);
    }

    #[test]
    fn test_parse_backend_params_errors() {
        assert!(parse_backend_params("dummy:novalue").is_err());
        assert!(parse_backend_params(":a=b").is_err());
    }

    #[test]
    fn test_unknown_backend() {
        assert!(open_backend("nonexistent").is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_backend() {
        let backend = open_backend("dummy:buses=SPI5").unwrap();
        let names = with_backend!(backend, bus => {
            use spilink_core::SpiBusProvider;
            bus.list_buses().unwrap()
        });
        assert!(names.iter().any(|b| b.name == "SPI5"));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_dummy_backend_options() {
        match open_backend("dummy:buses=SPI0;SPI1,fill=0xA5").unwrap() {
            Backend::Dummy(bus) => {
                assert_eq!(bus.config().buses, vec!["SPI0".to_string(), "SPI1".to_string()]);
                assert_eq!(bus.config().behavior, spilink_dummy::DummyBehavior::Fill(0xA5));
            }
            #[allow(unreachable_patterns)]
            _ => panic!("expected the dummy backend"),
        }

        assert!(open_backend("dummy:script=012").is_err());
    }
}
