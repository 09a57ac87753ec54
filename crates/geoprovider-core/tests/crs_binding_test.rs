//! Integration tests for SRID binding on ProviderCore
//!
//! Verifies that:
//! - The factory in effect always matches the current SRID
//! - A change notification fires exactly when the SRID actually changes
//! - The factory service is consulted once at construction and once per change

use geoprovider_core::{GeometryFactory, GeometryFactoryService, ProviderCore};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct CountingService {
    requested: Mutex<Vec<i32>>,
}

impl GeometryFactoryService for CountingService {
    fn create_geometry_factory(&self, srid: i32) -> Arc<GeometryFactory> {
        self.requested.lock().unwrap().push(srid);
        Arc::new(GeometryFactory::new(srid))
    }
}

#[test]
fn test_listener_sees_rebuilt_factory_state() {
    let service = Arc::new(CountingService::default());
    let mut core = ProviderCore::with_factory_service("db://roads", 4326, service.clone());

    let observed = Arc::new(AtomicUsize::new(0));
    let counter = observed.clone();
    core.on_srid_changed(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    core.set_srid(3857).unwrap();
    core.set_srid(3857).unwrap();
    core.set_srid(4326).unwrap();

    assert_eq!(observed.load(Ordering::SeqCst), 2);
    assert_eq!(*service.requested.lock().unwrap(), vec![4326, 3857, 4326]);
    assert_eq!(core.geometry_factory().unwrap().srid(), 4326);
}

#[test]
fn test_listeners_run_in_registration_order() {
    let mut core = ProviderCore::new("", 0);
    let order = Arc::new(Mutex::new(Vec::new()));

    for tag in ["first", "second", "third"] {
        let order = order.clone();
        core.on_srid_changed(Box::new(move || order.lock().unwrap().push(tag)));
    }

    core.set_srid(4326).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn test_geometries_carry_current_srid() {
    let mut core = ProviderCore::new("", 4326);
    let before = core.geometry_factory().unwrap().point(1.0, 1.0);

    core.set_srid(2154).unwrap();
    let after = core.geometry_factory().unwrap().point(1.0, 1.0);

    assert_eq!(before.srid(), 4326);
    assert_eq!(after.srid(), 2154);
}

proptest! {
    #[test]
    fn prop_notifications_match_effective_changes(
        initial in 0i32..5,
        sequence in proptest::collection::vec(0i32..5, 0..40),
    ) {
        let service = Arc::new(CountingService::default());
        let mut core = ProviderCore::with_factory_service("", initial, service.clone());

        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        core.on_srid_changed(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let mut previous = initial;
        let mut expected_changes = 0;
        for srid in sequence {
            core.set_srid(srid).unwrap();
            if srid != previous {
                expected_changes += 1;
            }
            previous = srid;

            prop_assert_eq!(core.srid(), srid);
            prop_assert_eq!(core.geometry_factory().unwrap().srid(), srid);
        }

        prop_assert_eq!(notified.load(Ordering::SeqCst), expected_changes);
        prop_assert_eq!(service.requested.lock().unwrap().len(), expected_changes + 1);
    }
}
