//! End-to-end scenarios of the overview cache: building, incremental maintenance and lookup.

mod test_utilities;

use anyhow::Result;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use test_utilities::*;
use tilepyramid_core::{TILE_RESIZE, TileAddress, WORLD_BOUNDS, tile_envelope, tiles_for_extent};
use tilepyramid_geometry::{GeoEngine, GeometryEngine, GeometryKind, VectorTile, tile_geometry};
use tilepyramid_overview::{tiling::tolerance, *};

#[test]
fn world_at_zoom_zero_is_one_tile() {
	let tiles = tiles_for_extent(&WORLD_BOUNDS, 0, false, false);
	assert_eq!(tiles.len(), 1);
	assert_eq!(tiles[0].address, TileAddress::new(0, 0, 0));
	assert_eq!(tiles[0].envelope, WORLD_BOUNDS);
}

#[test]
fn point_feature_creates_one_row_per_zoom() {
	let fixture = Fixture::new(GeometryKind::Point);
	fixture.build("0,1,2");
	assert_eq!(fixture.engine.state(), OverviewState::Ready);

	let id = fixture.insert(point(5.0e6, 5.0e6));
	let rows = fixture.rows();
	assert_eq!(
		rows.keys().copied().collect::<Vec<_>>(),
		vec![TileAddress::new(0, 0, 0), TileAddress::new(1, 1, 1), TileAddress::new(2, 2, 2)]
	);
	for tile in rows.values() {
		assert_eq!(tile.item_count(), 1);
		assert_eq!(tile.feature_ids().collect::<Vec<_>>(), vec![id]);
	}

	assert!(fixture.class.delete_feature(id));
	assert!(fixture.rows().is_empty());
}

#[test]
fn moving_a_polygon_moves_its_items() -> Result<()> {
	let fixture = Fixture::new(GeometryKind::Polygon);
	fixture.build("2");
	let id = fixture.insert(square_in_tile(2, 0, 0));
	let other = fixture.insert(square_in_tile(2, 1, 0));

	let rows = fixture.rows();
	assert!(rows[&TileAddress::new(2, 0, 0)].contains_feature(id));
	assert!(!rows[&TileAddress::new(2, 1, 0)].contains_feature(id));

	fixture
		.class
		.update_feature(id, Some(square_in_tile(2, 1, 0)), Default::default())?;

	let rows = fixture.rows();
	assert!(!rows.contains_key(&TileAddress::new(2, 0, 0)));
	let moved = &rows[&TileAddress::new(2, 1, 0)];
	assert_eq!(moved.feature_ids().collect::<Vec<_>>(), vec![id, other]);
	Ok(())
}

#[test]
fn lookup_outside_zoom_set_tiles_on_the_fly() {
	let fixture = Fixture::new(GeometryKind::Mixed);
	for geometry in sample_geometries() {
		fixture.insert(geometry);
	}
	fixture.build("0,1,2");
	let rows_before = fixture.rows();

	let engine = GeoEngine;
	for (x, y) in [(1, 4), (4, 4), (3, 2), (5, 5)] {
		let envelope = tile_envelope(3, x, y);
		let mut expected = VectorTile::new();
		for id in 1..=sample_geometries().len() as i64 {
			let feature = fixture.class.feature(id).unwrap();
			let geometry = feature.geometry.unwrap();
			if !feature_envelope(&geometry).intersects(&envelope.resized(TILE_RESIZE)) {
				continue;
			}
			let precise = GeometryKind::of(&geometry).is_precise();
			let simplified = engine.simplify(&geometry, tolerance(3, precise, 256));
			expected.add(tile_geometry(&engine, id, &simplified, &envelope).unwrap(), false);
		}

		let tile = fixture
			.engine
			.get_tile(TileAddress::new(3, x as i32, y as i32), &envelope);
		assert_eq!(tile, expected, "tile (3, {x}, {y})");
	}

	assert_eq!(fixture.rows(), rows_before, "lookups must not write to the cache");
}

fn feature_envelope(geometry: &tilepyramid_geometry::Geometry) -> tilepyramid_core::Envelope {
	tilepyramid_geometry::geometry_envelope(geometry).unwrap()
}

#[test]
fn lookup_inside_zoom_set_reads_the_cache() {
	let fixture = Fixture::new(GeometryKind::Mixed);
	for geometry in sample_geometries() {
		fixture.insert(geometry);
	}
	fixture.build("0,2");
	let rows = fixture.rows();
	assert!(!rows.is_empty());

	for (address, cached) in &rows {
		let envelope = tile_envelope(address.zoom, i64::from(address.x), i64::from(address.y));
		assert_eq!(&fixture.engine.get_tile(*address, &envelope), cached);
	}

	// a zoom level 2 tile without features
	let empty = TileAddress::new(2, 1, 3);
	assert!(!rows.contains_key(&empty));
	assert!(fixture.engine.get_tile(empty, &tile_envelope(2, 1, 3)).is_empty());
}

#[test]
fn cached_and_computed_tiles_agree() {
	let fixture = Fixture::new(GeometryKind::Mixed);
	for geometry in sample_geometries() {
		fixture.insert(geometry);
	}
	let uncached: Vec<VectorTile> = (0..4)
		.flat_map(|x| (0..4).map(move |y| (x, y)))
		.map(|(x, y)| fixture.engine.get_tile(TileAddress::new(2, x, y), &tile_envelope(2, x.into(), y.into())))
		.collect();

	fixture.build("2");
	let cached: Vec<VectorTile> = (0..4)
		.flat_map(|x| (0..4).map(move |y| (x, y)))
		.map(|(x, y)| fixture.engine.get_tile(TileAddress::new(2, x, y), &tile_envelope(2, x.into(), y.into())))
		.collect();

	assert_eq!(uncached, cached);
}

#[test]
fn wrapped_address_resolves_to_canonical_tile() {
	let fixture = Fixture::new(GeometryKind::Polygon);
	fixture.insert(square_in_tile(1, 0, 1));
	fixture.build("1");

	let canonical = fixture.engine.get_tile(TileAddress::new(1, 0, 1), &tile_envelope(1, 0, 1));
	assert!(!canonical.is_empty());

	let wrapped = fixture
		.engine
		.get_tile(TileAddress::new(1, 0, 1).with_cross_extent(1), &tile_envelope(1, 2, 1));
	assert_eq!(wrapped, canonical);
}

#[test]
fn lookup_far_from_features_is_empty() {
	let fixture = Fixture::new(GeometryKind::Point);
	fixture.insert(point(5.0e6, 5.0e6));
	assert!(fixture.engine.get_tile(TileAddress::new(2, 0, 0), &tile_envelope(2, 0, 0)).is_empty());
	assert!(!fixture.engine.get_tile(TileAddress::new(2, 2, 2), &tile_envelope(2, 2, 2)).is_empty());
}

#[test]
fn lookup_during_rebuild_is_empty() {
	let class = Arc::new(MemoryFeatureClass::new("points", GeometryKind::Point));
	for i in 0..20 {
		class.insert_feature(Some(point(f64::from(i) * 1.0e5, 5.0e6)), Default::default()).unwrap();
	}
	let engine = Arc::new(OverviewEngine::new(class.clone(), Arc::new(MemoryHost::new()), test_config()).unwrap());

	let observed = Arc::new(parking_lot::Mutex::new(Vec::new()));
	let progress = {
		let engine = Arc::clone(&engine);
		let observed = Arc::clone(&observed);
		tilepyramid_core::progress::Progress::new(move |status, _, _| {
			if status == tilepyramid_core::progress::ProgressStatus::InProcess {
				let tile = engine.get_tile(TileAddress::new(0, 0, 0), &WORLD_BOUNDS);
				observed.lock().push((engine.state(), tile.is_empty()));
			}
			true
		})
	};
	let options = OverviewOptions::from_pairs(&[("ZOOM_LEVELS", "0")]).unwrap();
	engine.create_overviews(&options, &progress).unwrap();

	let observed = observed.lock();
	assert!(!observed.is_empty());
	assert!(observed.iter().all(|(state, empty)| *state == OverviewState::Building && *empty));
	assert_eq!(engine.get_tile(TileAddress::new(0, 0, 0), &WORLD_BOUNDS).item_count(), 20);
}
