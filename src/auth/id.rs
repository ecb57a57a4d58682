//! Strongly typed identifiers for backend-owned records and the signed-in user.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $validate:ident) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				$validate($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$validate($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty or whitespace.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (entry, user, identity provider).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (entry, user, identity provider).
		kind: &'static str,
	},
	/// The identifier contains a character outside its allowed set.
	#[error("{kind} identifier contains disallowed character {found:?}.")]
	InvalidCharacter {
		/// Kind of identifier (entry, user, identity provider).
		kind: &'static str,
		/// First offending character.
		found: char,
	},
	/// The identifier is a relative path segment (`.` or `..`).
	#[error("{kind} identifier cannot be a relative path segment.")]
	RelativeSegment {
		/// Kind of identifier (entry, user, identity provider).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (entry, user, identity provider).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { EntryId, "Backend-assigned identifier of a blacklist entry.", "Entry", validate_entry }
def_id! {
	AnonymizedUserId,
	"Anonymized user identifier attached to outgoing requests.",
	"User",
	validate_user
}
def_id! {
	IdentityProviderId,
	"Slug of the third-party identity provider (e.g., `google`).",
	"IdentityProvider",
	validate_provider
}

fn validate_common(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}
	if let Some(found) = view.chars().find(|c| c.is_control()) {
		return Err(IdentifierError::InvalidCharacter { kind, found });
	}

	Ok(())
}

// Entry ids become a URL path segment; anything that could leave that segment is rejected.
fn validate_entry(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	validate_common(kind, view)?;

	if matches!(view, "." | "..") {
		return Err(IdentifierError::RelativeSegment { kind });
	}
	if let Some(found) = view.chars().find(|c| matches!(c, '/' | '\\' | '?' | '#' | '%')) {
		return Err(IdentifierError::InvalidCharacter { kind, found });
	}

	Ok(())
}

fn validate_user(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	validate_common(kind, view)
}

// Provider slugs are spliced into `verify-<slug>`.
fn validate_provider(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	validate_common(kind, view)?;

	match view.chars().find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')) {
		Some(found) => Err(IdentifierError::InvalidCharacter { kind, found }),
		None => Ok(()),
	}
}
