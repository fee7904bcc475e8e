//! The feature provider side: sources of features and listeners for their edits.

mod memory;

pub use memory::*;

use anyhow::Result;
use std::collections::BTreeMap;
use tilepyramid_core::Envelope;
use tilepyramid_geometry::{Geometry, GeometryKind, geometry_envelope};

/// An attribute value of a feature.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
	Integer(i64),
	Real(f64),
	Text(String),
	Null,
}

/// A feature: id, optional geometry and attribute values.
#[derive(Clone, Debug, PartialEq)]
pub struct Feature {
	pub id: i64,
	pub geometry: Option<Geometry>,
	pub fields: BTreeMap<String, FieldValue>,
}

impl Feature {
	#[must_use]
	pub fn new(id: i64, geometry: Option<Geometry>) -> Feature {
		Feature {
			id,
			geometry,
			fields: BTreeMap::new(),
		}
	}

	#[must_use]
	pub fn with_field(mut self, name: &str, value: FieldValue) -> Feature {
		self.fields.insert(name.to_string(), value);
		self
	}

	/// The envelope of the geometry, or `None` if there is no (non-empty) geometry.
	#[must_use]
	pub fn envelope(&self) -> Option<Envelope> {
		self.geometry.as_ref().and_then(geometry_envelope)
	}
}

/// Parameters of a scan over a [`FeatureSource`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureQuery {
	/// Only return features whose envelope intersects this envelope.
	pub filter: Option<Envelope>,
	/// Leave attribute values out of the returned features.
	pub skip_fields: bool,
}

impl FeatureQuery {
	#[must_use]
	pub fn all() -> FeatureQuery {
		FeatureQuery::default()
	}

	#[must_use]
	pub fn geometry_only(filter: Option<Envelope>) -> FeatureQuery {
		FeatureQuery {
			filter,
			skip_fields: true,
		}
	}
}

/// A feature class the overview engine can read from.
pub trait FeatureSource: Send + Sync {
	fn name(&self) -> &str;

	/// The geometry kind of the class, or `None` if it has no geometry column.
	fn geometry_kind(&self) -> Option<GeometryKind>;

	/// The envelope of all features, or `None` if no feature has a geometry.
	fn extent(&self) -> Option<Envelope>;

	fn feature_count(&self) -> Result<u64>;

	/// A forward cursor over the features matching `query`, in ascending id order.
	fn features(&self, query: &FeatureQuery) -> Result<Box<dyn Iterator<Item = Feature> + '_>>;

	/// Reads a key/value property of the class.
	fn property(&self, key: &str) -> Option<String>;

	fn set_property(&self, key: &str, value: &str) -> Result<()>;
}

/// Receives edits of a feature class after they were applied.
pub trait FeatureListener: Send + Sync {
	fn on_feature_inserted(&self, feature: &Feature) -> Result<()>;

	fn on_feature_updated(&self, old: &Feature, new: &Feature) -> Result<()>;

	fn on_feature_deleted(&self, feature: &Feature) -> Result<()>;

	/// All features were deleted at once.
	fn on_features_deleted(&self) -> Result<()>;
}
