//! Plugin utilities.
//!
//! A [`Plugin`] creates objects from [`Metadata`] (consisting of a name and optional configuration).
//! It is used to recreate the [chunk codec](`crate::codec`) recorded in the index map of a key, so a reader does not need to be configured with the codec used at write time.
//!
//! Plugins are registered at compile time using the [inventory] crate.
//! At runtime, a name matching function is applied to identify which registered plugin is associated with the metadata.
//! If a match is found, the plugin is created from the metadata.

use thiserror::Error;

use crate::metadata::{ConfigurationInvalidError, Metadata};

/// A plugin.
pub struct Plugin<TPlugin> {
    /// the identifier of the plugin.
    identifier: &'static str,
    /// Tests if the name is a match for this plugin.
    match_name_fn: fn(name: &str) -> bool,
    /// Create an implementation of this plugin from metadata.
    create_fn: fn(metadata: &Metadata) -> Result<TPlugin, PluginCreateError>,
}

/// A plugin creation error.
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum PluginCreateError {
    /// An unsupported plugin.
    #[error("{plugin_type} {name} is not supported")]
    Unsupported { name: String, plugin_type: String },
    /// Invalid configuration.
    #[error(transparent)]
    ConfigurationInvalid(#[from] ConfigurationInvalidError),
    /// Other
    #[error("{_0}")]
    Other(String),
}

impl From<&str> for PluginCreateError {
    fn from(err_string: &str) -> Self {
        Self::Other(err_string.to_string())
    }
}

impl From<String> for PluginCreateError {
    fn from(err_string: String) -> Self {
        Self::Other(err_string)
    }
}

impl<TPlugin> Plugin<TPlugin> {
    /// Create a new plugin for registration.
    pub const fn new(
        identifier: &'static str,
        match_name_fn: fn(name: &str) -> bool,
        create_fn: fn(metadata: &Metadata) -> Result<TPlugin, PluginCreateError>,
    ) -> Self {
        Self {
            identifier,
            match_name_fn,
            create_fn,
        }
    }

    /// Create a `TPlugin` plugin from `metadata`.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginCreateError`] if plugin creation fails due to either:
    ///  - metadata name being unregistered,
    ///  - or the configuration is invalid.
    pub fn create(&self, metadata: &Metadata) -> Result<TPlugin, PluginCreateError> {
        (self.create_fn)(metadata)
    }

    /// Returns true if this plugin is associated with `name`.
    #[must_use]
    pub fn match_name(&self, name: &str) -> bool {
        (self.match_name_fn)(name)
    }

    /// Returns the identifier of the plugin.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        self.identifier
    }
}
