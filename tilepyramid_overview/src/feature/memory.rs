use super::{Feature, FeatureListener, FeatureQuery, FeatureSource, FieldValue};
use crate::OverviewError;
use anyhow::{Result, bail};
use parking_lot::RwLock;
use std::{
	collections::BTreeMap,
	sync::{
		Arc, Weak,
		atomic::{AtomicI64, Ordering},
	},
};
use tilepyramid_core::Envelope;
use tilepyramid_geometry::{Geometry, GeometryKind};

/// An in-process feature class.
///
/// Ids are assigned from 1 upwards. Listeners are held weakly and notified after the
/// internal lock has been released, so they may read the class again.
pub struct MemoryFeatureClass {
	name: String,
	geometry_kind: Option<GeometryKind>,
	features: RwLock<BTreeMap<i64, Feature>>,
	next_id: AtomicI64,
	properties: RwLock<BTreeMap<String, String>>,
	listeners: RwLock<Vec<Weak<dyn FeatureListener>>>,
}

impl MemoryFeatureClass {
	#[must_use]
	pub fn new(name: &str, geometry_kind: GeometryKind) -> MemoryFeatureClass {
		MemoryFeatureClass::create(name, Some(geometry_kind))
	}

	/// A plain attribute table.
	#[must_use]
	pub fn without_geometry(name: &str) -> MemoryFeatureClass {
		MemoryFeatureClass::create(name, None)
	}

	fn create(name: &str, geometry_kind: Option<GeometryKind>) -> MemoryFeatureClass {
		MemoryFeatureClass {
			name: name.to_string(),
			geometry_kind,
			features: RwLock::new(BTreeMap::new()),
			next_id: AtomicI64::new(1),
			properties: RwLock::new(BTreeMap::new()),
			listeners: RwLock::new(Vec::new()),
		}
	}

	/// Registers a listener. It is dropped from the list once the listener itself is dropped.
	pub fn subscribe<L: FeatureListener + 'static>(&self, listener: &Arc<L>) {
		let weak: Weak<L> = Arc::downgrade(listener);
		self.listeners.write().push(weak);
	}

	pub fn feature(&self, id: i64) -> Option<Feature> {
		self.features.read().get(&id).cloned()
	}

	pub fn len(&self) -> usize {
		self.features.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.features.read().is_empty()
	}

	/// Adds a feature and returns its id.
	///
	/// # Errors
	/// Returns a configuration error when a geometry is given to a class without geometry column.
	pub fn insert_feature(&self, geometry: Option<Geometry>, fields: BTreeMap<String, FieldValue>) -> Result<i64> {
		self.check_geometry(geometry.as_ref())?;
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let feature = Feature { id, geometry, fields };
		self.features.write().insert(id, feature.clone());
		self.notify(|listener| listener.on_feature_inserted(&feature));
		Ok(id)
	}

	/// Replaces geometry and fields of an existing feature.
	///
	/// # Errors
	/// Returns an error if the feature does not exist.
	pub fn update_feature(&self, id: i64, geometry: Option<Geometry>, fields: BTreeMap<String, FieldValue>) -> Result<()> {
		self.check_geometry(geometry.as_ref())?;
		let new = Feature { id, geometry, fields };
		let old = {
			let mut features = self.features.write();
			let Some(slot) = features.get_mut(&id) else {
				bail!("feature {id} does not exist in {}", self.name);
			};
			std::mem::replace(slot, new.clone())
		};
		self.notify(|listener| listener.on_feature_updated(&old, &new));
		Ok(())
	}

	/// Removes a feature. Returns `false` if it did not exist.
	pub fn delete_feature(&self, id: i64) -> bool {
		let Some(old) = self.features.write().remove(&id) else {
			return false;
		};
		self.notify(|listener| listener.on_feature_deleted(&old));
		true
	}

	pub fn delete_all(&self) {
		self.features.write().clear();
		self.notify(|listener| listener.on_features_deleted());
	}

	fn check_geometry(&self, geometry: Option<&Geometry>) -> Result<()> {
		if geometry.is_some() && self.geometry_kind.is_none() {
			return Err(OverviewError::Configuration(format!("{} has no geometry column", self.name)).into());
		}
		Ok(())
	}

	fn notify(&self, event: impl Fn(&dyn FeatureListener) -> Result<()>) {
		let listeners: Vec<Arc<dyn FeatureListener>> = {
			let mut listeners = self.listeners.write();
			listeners.retain(|weak| weak.strong_count() > 0);
			listeners.iter().filter_map(Weak::upgrade).collect()
		};
		for listener in listeners {
			if let Err(error) = event(listener.as_ref()) {
				log::warn!("feature listener of {} failed: {error:#}", self.name);
			}
		}
	}
}

impl FeatureSource for MemoryFeatureClass {
	fn name(&self) -> &str {
		&self.name
	}

	fn geometry_kind(&self) -> Option<GeometryKind> {
		self.geometry_kind
	}

	fn extent(&self) -> Option<Envelope> {
		self
			.features
			.read()
			.values()
			.filter_map(Feature::envelope)
			.reduce(|a, b| a.merged(&b))
	}

	fn feature_count(&self) -> Result<u64> {
		Ok(self.len() as u64)
	}

	fn features(&self, query: &FeatureQuery) -> Result<Box<dyn Iterator<Item = Feature> + '_>> {
		let features = self.features.read();
		let selected: Vec<Feature> = features
			.values()
			.filter(|feature| match &query.filter {
				Some(filter) => feature.envelope().is_some_and(|e| e.intersects(filter)),
				None => true,
			})
			.map(|feature| {
				if query.skip_fields {
					Feature::new(feature.id, feature.geometry.clone())
				} else {
					feature.clone()
				}
			})
			.collect();
		Ok(Box::new(selected.into_iter()))
	}

	fn property(&self, key: &str) -> Option<String> {
		self.properties.read().get(key).cloned()
	}

	fn set_property(&self, key: &str, value: &str) -> Result<()> {
		self.properties.write().insert(key.to_string(), value.to_string());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use geo::{LineString, Point};
	use parking_lot::Mutex;

	#[derive(Default)]
	struct Log(Mutex<Vec<String>>);

	impl FeatureListener for Log {
		fn on_feature_inserted(&self, feature: &Feature) -> Result<()> {
			self.0.lock().push(format!("insert {}", feature.id));
			Ok(())
		}
		fn on_feature_updated(&self, old: &Feature, new: &Feature) -> Result<()> {
			assert_eq!(old.id, new.id);
			self.0.lock().push(format!("update {}", new.id));
			Ok(())
		}
		fn on_feature_deleted(&self, feature: &Feature) -> Result<()> {
			self.0.lock().push(format!("delete {}", feature.id));
			Ok(())
		}
		fn on_features_deleted(&self) -> Result<()> {
			self.0.lock().push("delete all".to_string());
			Ok(())
		}
	}

	fn point(x: f64, y: f64) -> Option<Geometry> {
		Some(Point::new(x, y).into())
	}

	#[test]
	fn edits_notify_listeners() -> Result<()> {
		let class = MemoryFeatureClass::new("points", GeometryKind::Point);
		let log = Arc::new(Log::default());
		class.subscribe(&log);

		let id = class.insert_feature(point(1.0, 1.0), BTreeMap::new())?;
		assert_eq!(id, 1);
		class.update_feature(id, point(2.0, 2.0), BTreeMap::new())?;
		assert!(class.update_feature(99, None, BTreeMap::new()).is_err());
		assert!(class.delete_feature(id));
		assert!(!class.delete_feature(id));
		class.insert_feature(point(0.0, 0.0), BTreeMap::new())?;
		class.delete_all();

		assert_eq!(
			*log.0.lock(),
			vec!["insert 1", "update 1", "delete 1", "insert 2", "delete all"]
		);
		Ok(())
	}

	#[test]
	fn dropped_listeners_are_forgotten() -> Result<()> {
		let class = MemoryFeatureClass::new("points", GeometryKind::Point);
		let log = Arc::new(Log::default());
		class.subscribe(&log);
		drop(log);
		class.insert_feature(point(1.0, 1.0), BTreeMap::new())?;
		assert!(class.listeners.read().is_empty());
		Ok(())
	}

	#[test]
	fn spatial_filter_and_extent() -> Result<()> {
		let class = MemoryFeatureClass::new("lines", GeometryKind::Line);
		class.insert_feature(
			Some(LineString::from(vec![(0.0, 0.0), (10.0, 10.0)]).into()),
			BTreeMap::from([("name".to_string(), FieldValue::Text("a".to_string()))]),
		)?;
		class.insert_feature(Some(LineString::from(vec![(20.0, 20.0), (30.0, 25.0)]).into()), BTreeMap::new())?;
		class.insert_feature(None, BTreeMap::new())?;

		assert_eq!(class.extent(), Some(Envelope::new(0.0, 0.0, 30.0, 25.0)));
		assert_eq!(class.feature_count()?, 3);

		let hits: Vec<i64> = class
			.features(&FeatureQuery::geometry_only(Some(Envelope::new(5.0, 5.0, 6.0, 6.0))))?
			.map(|f| f.id)
			.collect();
		assert_eq!(hits, vec![1]);

		let first = class.features(&FeatureQuery::geometry_only(None))?.next().unwrap();
		assert!(first.fields.is_empty());
		let first = class.features(&FeatureQuery::all())?.next().unwrap();
		assert_eq!(first.fields["name"], FieldValue::Text("a".to_string()));
		Ok(())
	}

	#[test]
	fn table_without_geometry() {
		let class = MemoryFeatureClass::without_geometry("attributes");
		assert_eq!(class.geometry_kind(), None);
		assert!(class.insert_feature(point(0.0, 0.0), BTreeMap::new()).is_err());
		assert!(class.insert_feature(None, BTreeMap::new()).is_ok());
		assert_eq!(class.extent(), None);
	}

	#[test]
	fn properties() -> Result<()> {
		let class = MemoryFeatureClass::new("p", GeometryKind::Polygon);
		assert_eq!(class.property("zoom_levels"), None);
		class.set_property("zoom_levels", "0,1")?;
		assert_eq!(class.property("zoom_levels").as_deref(), Some("0,1"));
		Ok(())
	}
}
