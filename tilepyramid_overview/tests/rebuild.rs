//! Rebuild behavior: options, progress, cancellation, failures and lifecycle.

mod test_utilities;

use anyhow::Result;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::{
	collections::BTreeMap,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
};
use test_utilities::*;
use tilepyramid_core::{
	TileAddress, WORLD_BOUNDS, ZoomSet,
	progress::{Progress, ProgressRecorder, ProgressStatus},
};
use tilepyramid_geometry::GeometryKind;
use tilepyramid_overview::*;

fn populated(count: u32) -> Fixture {
	let fixture = Fixture::new(GeometryKind::Point);
	for i in 0..count {
		fixture.insert(point(f64::from(i) * 1.0e5 - 5.0e6, 3.0e6));
	}
	fixture
}

fn zooms(text: &str) -> OverviewOptions {
	OverviewOptions::new().with_zoom_levels(ZoomSet::parse(text).unwrap())
}

fn configuration_error(error: &anyhow::Error) -> bool {
	matches!(error.downcast_ref::<OverviewError>(), Some(OverviewError::Configuration(_)))
}

#[test]
fn nothing_to_do_without_zoom_levels() -> Result<()> {
	let fixture = populated(3);
	let outcome = fixture.engine.create_overviews(&OverviewOptions::new(), &Progress::silent())?;
	assert_eq!(outcome, RebuildOutcome::Skipped);
	assert!(!fixture.engine.has_overviews());
	assert_eq!(fixture.engine.state(), OverviewState::NoOverview);
	Ok(())
}

#[test]
fn completed_rebuild_persists_zoom_levels() -> Result<()> {
	let fixture = populated(10);
	let outcome = fixture.engine.create_overviews(&zooms("2,0,1"), &Progress::silent())?;
	assert_eq!(
		outcome,
		RebuildOutcome::Completed {
			features: 10,
			skipped_features: 0,
			failed_features: 0,
			tiles: fixture.rows().len() as u64,
		}
	);
	assert_eq!(fixture.class.property("zoom_levels").as_deref(), Some("0,1,2"));
	assert!(fixture.host.has_index("features_overviews"));

	let reopened = OverviewEngine::new(fixture.class.clone(), fixture.host.clone(), test_config())?;
	assert_eq!(reopened.state(), OverviewState::Ready);
	assert_eq!(reopened.zoom_levels(), ZoomSet::parse("0,1,2")?);
	assert_eq!(reopened.get_tile(TileAddress::new(0, 0, 0), &WORLD_BOUNDS).item_count(), 10);
	Ok(())
}

#[test]
fn existing_cache_needs_force() -> Result<()> {
	let fixture = populated(4);
	fixture.build("0");
	fixture.host.begin_batch()?;
	fixture.insert(point(1.0e6, 1.0e6));
	fixture.host.end_batch()?;
	assert_eq!(fixture.rows()[&TileAddress::new(0, 0, 0)].item_count(), 4);

	let outcome = fixture.engine.create_overviews(&OverviewOptions::new(), &Progress::silent())?;
	assert_eq!(outcome, RebuildOutcome::Skipped);

	let outcome = fixture
		.engine
		.create_overviews(&OverviewOptions::new().with_force(true), &Progress::silent())?;
	assert!(matches!(outcome, RebuildOutcome::Completed { features: 5, .. }));
	assert_eq!(fixture.rows()[&TileAddress::new(0, 0, 0)].item_count(), 5);
	Ok(())
}

#[test]
fn bulk_import_then_rebuild() -> Result<()> {
	let fixture = populated(2);
	fixture.build("0,1");

	fixture.host.begin_batch()?;
	for i in 0..5 {
		fixture.insert(point(6.0e6, f64::from(i) * 1.0e6));
	}
	fixture.host.end_batch()?;
	assert_eq!(fixture.rows()[&TileAddress::new(0, 0, 0)].item_count(), 2);

	let skipped = fixture.engine.on_rows_copied(&OverviewOptions::new(), &Progress::silent())?;
	assert_eq!(skipped, RebuildOutcome::Skipped);

	let options = OverviewOptions::from_list(&["CREATE_OVERVIEWS=YES"])?;
	let outcome = fixture.engine.on_rows_copied(&options, &Progress::silent())?;
	assert!(matches!(outcome, RebuildOutcome::Completed { features: 7, .. }));
	assert_eq!(fixture.rows()[&TileAddress::new(0, 0, 0)].item_count(), 7);
	assert_eq!(fixture.engine.zoom_levels(), ZoomSet::parse("0,1")?);
	Ok(())
}

#[test]
fn progress_is_monotonic_and_finishes() -> Result<()> {
	let fixture = populated(40);
	let recorder = ProgressRecorder::new();
	fixture.engine.create_overviews(&zooms("0,3"), &recorder.progress())?;

	let events = recorder.events();
	let (last, in_process) = events.split_last().unwrap();
	assert_eq!(last.status, ProgressStatus::Finished);
	assert_eq!(last.fraction, 1.0);
	assert!(in_process.iter().all(|e| e.status == ProgressStatus::InProcess));
	assert!(in_process.windows(2).all(|w| w[0].fraction <= w[1].fraction));
	assert!(in_process.iter().any(|e| e.fraction <= 0.5 && e.message.contains("tiling")));
	assert!(in_process.iter().any(|e| e.fraction > 0.5 && e.message.contains("saving")));
	Ok(())
}

#[test]
fn cancelled_first_build_leaves_no_cache() -> Result<()> {
	let fixture = populated(100);
	let recorder = ProgressRecorder::cancelling_after(3);
	let outcome = fixture.engine.create_overviews(&zooms("0,1"), &recorder.progress())?;

	assert_eq!(outcome, RebuildOutcome::Cancelled);
	assert_eq!(fixture.engine.state(), OverviewState::NoOverview);
	assert!(!fixture.engine.has_overviews());
	assert_eq!(fixture.class.property("zoom_levels"), None);
	assert!(recorder.events().iter().all(|e| e.status == ProgressStatus::InProcess));
	Ok(())
}

#[test]
fn cancelled_rebuild_keeps_previous_cache() -> Result<()> {
	let fixture = populated(100);
	fixture.build("0,1");
	let before = fixture.rows();

	let recorder = ProgressRecorder::cancelling_after(3);
	let options = zooms("2").with_force(true);
	let outcome = fixture.engine.create_overviews(&options, &recorder.progress())?;

	assert_eq!(outcome, RebuildOutcome::Cancelled);
	assert_eq!(fixture.engine.state(), OverviewState::Ready);
	assert_eq!(fixture.engine.zoom_levels(), ZoomSet::parse("0,1")?);
	assert_eq!(fixture.rows(), before);
	Ok(())
}

#[test]
fn unsupported_container_fails() {
	let fixture = Fixture::with_host(GeometryKind::Point, MemoryHost::with_kind(ContainerKind::Unsupported));
	fixture.insert(point(0.0, 0.0));
	let recorder = ProgressRecorder::new();
	let error = fixture
		.engine
		.create_overviews(&zooms("0"), &recorder.progress())
		.unwrap_err();
	assert!(configuration_error(&error));
	assert_eq!(recorder.last_status(), Some(ProgressStatus::CreateFailed));
	assert_eq!(fixture.engine.state(), OverviewState::NoOverview);
}

#[test]
fn class_without_geometry_is_rejected() {
	let class = Arc::new(MemoryFeatureClass::without_geometry("attributes"));
	let error = OverviewEngine::new(class, Arc::new(MemoryHost::new()), test_config())
		.err()
		.unwrap();
	assert!(configuration_error(&error));
}

#[test]
fn invalid_persisted_zoom_levels_are_ignored() -> Result<()> {
	let class = Arc::new(MemoryFeatureClass::new("points", GeometryKind::Point));
	class.set_property("zoom_levels", "0,x")?;
	let engine = OverviewEngine::new(class, Arc::new(MemoryHost::new()), test_config())?;
	assert!(engine.zoom_levels().is_empty());
	Ok(())
}

#[test]
fn rebuild_is_exclusive() -> Result<()> {
	let fixture = populated(5);
	let nested = Arc::new(Mutex::new(None));
	let progress = {
		let engine = Arc::clone(&fixture.engine);
		let nested = Arc::clone(&nested);
		Progress::new(move |status, _, _| {
			let mut nested = nested.lock();
			if status == ProgressStatus::InProcess && nested.is_none() {
				let result = engine.create_overviews(&zooms("0").with_force(true), &Progress::silent());
				let in_progress = result.is_err_and(|error| {
					matches!(error.downcast_ref::<OverviewError>(), Some(OverviewError::RebuildInProgress))
				});
				*nested = Some(in_progress);
			}
			true
		})
	};
	fixture.engine.create_overviews(&zooms("0"), &progress)?;
	assert_eq!(*nested.lock(), Some(true));
	Ok(())
}

#[test]
fn edits_during_rebuild_reach_the_cache() -> Result<()> {
	let fixture = populated(10);
	let inserted = Arc::new(Mutex::new(None));
	let progress = {
		let class = Arc::clone(&fixture.class);
		let inserted = Arc::clone(&inserted);
		Progress::new(move |status, _, _| {
			let mut inserted = inserted.lock();
			if status == ProgressStatus::InProcess && inserted.is_none() {
				*inserted = Some(class.insert_feature(Some(point(2.0e6, -4.0e6)), BTreeMap::new()).unwrap());
				assert!(class.delete_feature(1));
			}
			true
		})
	};
	let outcome = fixture.engine.create_overviews(&zooms("0,2"), &progress)?;
	assert!(matches!(outcome, RebuildOutcome::Completed { .. }));
	assert_eq!(fixture.engine.state(), OverviewState::Ready);

	let inserted = inserted.lock().unwrap();
	let after = fixture.rows();
	let world = &after[&TileAddress::new(0, 0, 0)];
	assert!(world.contains_feature(inserted));
	assert!(!world.contains_feature(1));
	assert_eq!(world.item_count(), 10);

	fixture.build("0,2");
	assert_eq!(fixture.rows(), after);
	Ok(())
}

#[test]
fn edits_during_cancelled_rebuild_reach_the_previous_cache() -> Result<()> {
	let fixture = populated(100);
	fixture.build("0");
	let progress = {
		let class = Arc::clone(&fixture.class);
		let reports = AtomicUsize::new(0);
		Progress::new(move |_, _, _| {
			let report = reports.fetch_add(1, Ordering::SeqCst) + 1;
			if report == 2 {
				class.delete_all();
			}
			report < 3
		})
	};
	let outcome = fixture.engine.create_overviews(&zooms("0,1").with_force(true), &progress)?;
	assert_eq!(outcome, RebuildOutcome::Cancelled);
	assert_eq!(fixture.engine.state(), OverviewState::Ready);
	assert_eq!(fixture.engine.zoom_levels(), ZoomSet::parse("0")?);
	assert!(fixture.engine.has_overviews());
	assert!(fixture.rows().is_empty());
	Ok(())
}

#[test]
fn storage_failure_keeps_previous_cache() -> Result<()> {
	let host = Arc::new(FailingHost::new());
	let class = Arc::new(MemoryFeatureClass::new("points", GeometryKind::Point));
	for i in 0..30 {
		class.insert_feature(Some(point(f64::from(i) * 1.0e6 - 1.5e7, 1.0e6)), Default::default())?;
	}
	let engine = OverviewEngine::new(class.clone(), host.clone(), test_config())?;
	engine.create_overviews(&zooms("0,3"), &Progress::silent())?;
	let before = cached_tiles(&host.inner, engine.table_name());
	assert!(before.len() > 3);

	host.fail_inserts_after(2);
	let recorder = ProgressRecorder::new();
	let error = engine
		.create_overviews(&zooms("0,3,4").with_force(true), &recorder.progress())
		.unwrap_err();

	assert!(matches!(
		error.downcast_ref::<OverviewError>(),
		Some(OverviewError::Storage(message)) if message.contains("disk full")
	));
	let events = recorder.events();
	let last = events.last().unwrap();
	assert_eq!(last.status, ProgressStatus::CreateFailed);
	assert!(last.message.contains("disk full"));

	assert_eq!(engine.state(), OverviewState::Ready);
	assert_eq!(engine.zoom_levels(), ZoomSet::parse("0,3")?);
	assert_eq!(class.property("zoom_levels").as_deref(), Some("0,3"));
	assert_eq!(cached_tiles(&host.inner, engine.table_name()), before);
	assert!(host.inner.has_index(engine.table_name()));
	Ok(())
}

#[test]
fn destroy_in_store_drops_the_table() -> Result<()> {
	let fixture = populated(3);
	fixture.build("0");
	fixture.engine.destroy()?;

	assert_eq!(fixture.host.destroyed_feature_classes(), vec!["features".to_string()]);
	assert!(fixture.host.table("features_overviews").is_none());
	assert!(!fixture.host.is_destroyed());
	assert_eq!(fixture.engine.state(), OverviewState::NoOverview);
	Ok(())
}

#[test]
fn destroy_in_simple_container_destroys_it() -> Result<()> {
	let fixture = Fixture::with_host(GeometryKind::Point, MemoryHost::with_kind(ContainerKind::Simple));
	fixture.insert(point(1.0, 1.0));
	fixture.build("0");
	fixture.engine.destroy()?;
	assert!(fixture.host.is_destroyed());
	assert!(fixture.host.destroyed_feature_classes().is_empty());
	Ok(())
}
