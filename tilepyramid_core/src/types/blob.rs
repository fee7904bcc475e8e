//! This module provides the [`Blob`] struct, a wrapper around [`Vec<u8>`] used for serialized tiles.
//!
//! # Examples
//!
//! ```rust
//! use tilepyramid_core::Blob;
//!
//! let blob = Blob::from(vec![0, 1, 2, 3]);
//! assert_eq!(blob.len(), 4);
//! assert_eq!(blob.as_slice(), &[0, 1, 2, 3]);
//! assert_eq!(blob.as_hex(), "00 01 02 03");
//! ```

use itertools::Itertools;
use std::fmt::{self, Debug};

/// Owned bytes of a serialized tile or a persisted row.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Blob(Vec<u8>);

impl Blob {
	#[must_use]
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	#[must_use]
	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	#[must_use]
	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}

	/// Space separated lowercase hex bytes, handy in test failures and debug logs.
	#[must_use]
	pub fn as_hex(&self) -> String {
		self.0.iter().map(|b| format!("{b:02x}")).join(" ")
	}

	#[must_use]
	pub fn len(&self) -> u64 {
		self.0.len() as u64
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Vec<u8>> for Blob {
	fn from(value: Vec<u8>) -> Self {
		Blob(value)
	}
}

impl From<&[u8]> for Blob {
	fn from(value: &[u8]) -> Self {
		Blob(value.to_vec())
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		const MAX: usize = 32;
		if self.0.len() <= MAX {
			write!(f, "Blob({}): {}", self.0.len(), self.as_hex())
		} else {
			let head = self.0[..MAX].iter().map(|b| format!("{b:02x}")).join(" ");
			write!(f, "Blob({}): {head} ...", self.0.len())
		}
	}
}
