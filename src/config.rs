//! Process-wide configuration.
//!
//! The configuration is installed at most once, either explicitly through
//! [`init`] or implicitly (with [`Config::default`]) on first use of anything
//! that reads it. It is immutable afterwards.

use std::sync::OnceLock;

use crate::error::{Error, Result};

static GLOBAL: OnceLock<Config> = OnceLock::new();

/// Configuration for the collection engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of nested sub-order levels a sparse map descends before
    /// colliding keys are kept in a sorted bucket instead.
    pub max_nesting_depth: usize,
    /// Number of lexical sub-orders (per lexical order kind) allocated once
    /// in the interned order table. Deeper offsets allocate on demand.
    pub interned_sub_orders: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_nesting_depth: 16,
            interned_sub_orders: 16,
        }
    }
}

/// Installs the process-wide configuration.
///
/// Must run before the first collection is created to have any effect;
/// returns [`Error::AlreadyInitialized`] once a configuration (explicit or
/// default) is in place.
pub fn init(config: Config) -> Result<()> {
    let mut installed = false;
    GLOBAL.get_or_init(|| {
        installed = true;
        config.clone()
    });
    if !installed {
        return Err(Error::AlreadyInitialized);
    }
    tracing::debug!(?config, "ordex configuration installed");
    Ok(())
}

/// Returns the installed configuration, installing the default if needed.
pub fn global() -> &'static Config {
    GLOBAL.get_or_init(|| {
        tracing::debug!("ordex configuration defaulted");
        Config::default()
    })
}
