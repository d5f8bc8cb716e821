//! Identity of a hosted service.

use std::fmt;

use thiserror::Error;

/// Name and version of a hosted service.
///
/// The name keys every registry lookup and becomes both a directory and a
/// file name, so it must be a single, non-empty path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceIdentity {
    name: String,
    version: String,
}

impl ServiceIdentity {
    /// Validates and builds an identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Result<Self, IdentityError> {
        let owned = name.into();
        validate_name(&owned)?;
        Ok(Self {
            name: owned,
            version: version.into(),
        })
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Service version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for ServiceIdentity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} v{}", self.name, self.version)
    }
}

/// Errors raised while validating a [`ServiceIdentity`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The service name was empty or only whitespace.
    #[error("service name must not be empty")]
    EmptyName,
    /// The service name cannot be used as a single path component.
    #[error("service name '{name}' must be a single path component")]
    InvalidName {
        /// Rejected name.
        name: String,
    },
}

pub(crate) fn validate_name(name: &str) -> Result<(), IdentityError> {
    if name.trim().is_empty() {
        return Err(IdentityError::EmptyName);
    }
    let separator = name.contains(['/', '\\']);
    let relative = name == "." || name == "..";
    if separator || relative || name.contains('\0') {
        return Err(IdentityError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn displays_name_and_version() {
        let identity = ServiceIdentity::new("demo", "1.2.3").expect("valid identity");
        assert_eq!(identity.to_string(), "demo v1.2.3");
        assert_eq!(identity.name(), "demo");
        assert_eq!(identity.version(), "1.2.3");
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    fn rejects_empty_names(#[case] name: &str) {
        assert_eq!(
            ServiceIdentity::new(name, "1.0"),
            Err(IdentityError::EmptyName)
        );
    }

    #[rstest]
    #[case::slash("a/b")]
    #[case::backslash("a\\b")]
    #[case::dot(".")]
    #[case::dot_dot("..")]
    fn rejects_names_that_escape_the_data_root(#[case] name: &str) {
        let error = ServiceIdentity::new(name, "1.0").expect_err("name should be rejected");
        assert!(matches!(error, IdentityError::InvalidName { .. }));
    }
}
