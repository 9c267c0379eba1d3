use derive_more::{Display, From};
use thiserror::Error;

use super::StorePrefix;

/// A store key.
///
/// A key is a `/` separated path such as `images/c0` or `images/index_map`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display)]
pub struct StoreKey(String);

/// An invalid store key.
#[derive(Debug, From, Error)]
#[error("invalid store key {0}")]
pub struct StoreKeyError(String);

/// A list of [`StoreKey`].
pub type StoreKeys = Vec<StoreKey>;

impl StoreKey {
    /// Create a new store key from `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreKeyError`] if `key` is not valid according to [`StoreKey::validate()`].
    pub fn new(key: impl Into<String>) -> Result<Self, StoreKeyError> {
        let key = key.into();
        if Self::validate(&key) {
            Ok(Self(key))
        } else {
            Err(StoreKeyError(key))
        }
    }

    /// Create a new store key from `key` without validation.
    ///
    /// # Safety
    ///
    /// `key` is not validated, so this can result in an invalid store key.
    #[must_use]
    pub unsafe fn new_unchecked(key: impl Into<String>) -> Self {
        let key = key.into();
        debug_assert!(Self::validate(&key));
        Self(key)
    }

    /// Extracts a string slice of the underlying key [String].
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a key.
    ///
    /// A key is a non-empty Unicode string which does not start or end with a `/` character, and has no empty path components.
    #[must_use]
    pub fn validate(key: &str) -> bool {
        !key.is_empty() && key.split('/').all(|component| !component.is_empty())
    }

    /// Returns true if the key has prefix `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &StorePrefix) -> bool {
        self.0.starts_with(prefix.as_str())
    }

    /// Convert to a [`StorePrefix`].
    #[must_use]
    pub fn to_prefix(&self) -> StorePrefix {
        unsafe { StorePrefix::new_unchecked(self.0.clone() + "/") }
    }

    /// Returns the key formed by appending `name` as a child path component.
    ///
    /// # Errors
    /// Returns [`StoreKeyError`] if the resulting key is invalid.
    pub fn child(&self, name: &str) -> Result<Self, StoreKeyError> {
        Self::new(format!("{}/{name}", self.0))
    }

    /// Returns the parent of this key.
    #[must_use]
    pub fn parent(&self) -> StorePrefix {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => unsafe { StorePrefix::new_unchecked(format!("{parent}/")) },
            None => StorePrefix::root(),
        }
    }
}

impl TryFrom<&str> for StoreKey {
    type Error = StoreKeyError;

    fn try_from(key: &str) -> Result<Self, Self::Error> {
        Self::new(key)
    }
}

impl TryFrom<String> for StoreKey {
    type Error = StoreKeyError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        Self::new(key)
    }
}
