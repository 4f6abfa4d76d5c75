//! Monitored system definitions

use super::{fold_lower, fold_upper};
use crate::config::SystemConfig;
use crate::error::{AppError, AppResult};
use crate::rfc::{Credential, Logon, ServerCoordinates};

/// One monitored system, validated and normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemDefinition {
    name: String,
    usage: String,
    tags: Vec<String>,
    user: String,
    lang: String,
    client: String,
    coordinates: ServerCoordinates,
}

impl SystemDefinition {
    /// Validate a `[[systems]]` entry
    ///
    /// Name, usage and server host are lower-cased since they end up as label values.
    /// The language key is upper-cased as the logon expects it.
    pub fn from_config(cfg: &SystemConfig) -> AppResult<Self> {
        let mut missing = Vec::new();
        for (field, value) in [
            ("name", &cfg.name),
            ("usage", &cfg.usage),
            ("user", &cfg.user),
            ("lang", &cfg.lang),
            ("client", &cfg.client),
            ("server", &cfg.server),
            ("sysnr", &cfg.sysnr),
        ] {
            if value.trim().is_empty() {
                missing.push(field);
            }
        }
        if !missing.is_empty() {
            let name = if cfg.name.trim().is_empty() {
                "<unnamed>".to_string()
            } else {
                fold_lower(&cfg.name)
            };
            return Err(AppError::Config(format!(
                "system '{}': missing mandatory field(s): {}",
                name,
                missing.join(", ")
            )));
        }

        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            name: fold_lower(&cfg.name),
            usage: fold_lower(&cfg.usage),
            tags: cfg.tags.iter().map(|t| fold_lower(t)).collect(),
            user: cfg.user.trim().to_string(),
            lang: fold_upper(&cfg.lang),
            client: cfg.client.trim().to_string(),
            coordinates: ServerCoordinates {
                ashost: fold_lower(&cfg.server),
                sysnr: cfg.sysnr.trim().to_string(),
                mshost: optional(&cfg.mshost),
                msserv: optional(&cfg.msserv),
                group: optional(&cfg.group),
                saprouter: optional(&cfg.saprouter),
            },
        })
    }

    /// True when every tag of `filter` is carried by this system
    ///
    /// Both sides are compared case-insensitively. An empty filter matches every system.
    pub fn has_tags(&self, filter: &[String]) -> bool {
        filter.iter().all(|wanted| {
            let wanted = fold_lower(wanted);
            self.tags.iter().any(|tag| *tag == wanted)
        })
    }

    /// System name (lower case); also the server label of the primary connection
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn client(&self) -> &str {
        &self.client
    }

    /// Coordinates of the primary connection
    pub fn coordinates(&self) -> &ServerCoordinates {
        &self.coordinates
    }

    /// Logon parameters for this system with the given password
    pub fn logon<'a>(&'a self, credential: &'a Credential) -> Logon<'a> {
        Logon {
            system: &self.name,
            user: &self.user,
            client: &self.client,
            lang: &self.lang,
            credential,
        }
    }
}
