/*
 * Copyright © 2025, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::{sync::Arc, thread, time::Duration};
use chrono::Utc;
use odin_feeds::{
    aircraft::Icao24,
    geo::LatLon,
    snapshot::AircraftSnapshotStore
};

fn icao (n: u32)->Icao24 { Icao24::new(n).unwrap() }

#[test]
fn test_version_bumps () {
    let store = AircraftSnapshotStore::default();
    assert_eq!( store.data_version(), 0);

    let (v,_) = store.update( |txn| txn.upsert( icao(1), Utc::now(), |w| { w.set_altitude( Some(1000)); }));
    assert_eq!( v, 1);

    // several changes in one transaction are one version
    let (v,_) = store.update( |txn| {
        txn.upsert( icao(1), Utc::now(), |w| { w.set_altitude( Some(2000)); });
        txn.upsert( icao(2), Utc::now(), |w| { w.set_callsign( Some("SWA1")); });
    });
    assert_eq!( v, 2);

    // same values are not observable
    let (v,_) = store.update( |txn| txn.upsert( icao(1), Utc::now(), |w| { w.set_altitude( Some(2000)); }));
    assert_eq!( v, 2);

    let (v,removed) = store.update( |txn| txn.remove( &icao(2)));
    assert!( removed);
    assert_eq!( v, 3);

    let (v,removed) = store.update( |txn| txn.remove( &icao(2)));
    assert!( !removed);
    assert_eq!( v, 3);
}

#[test]
fn test_attribute_versions () {
    let store = AircraftSnapshotStore::default();
    store.update( |txn| txn.upsert( icao(1), Utc::now(), |w| { w.set_altitude( Some(1000)).set_callsign( Some("UAL1")); }));
    store.update( |txn| txn.upsert( icao(1), Utc::now(), |w| { w.set_altitude( Some(1100)).set_callsign( Some("UAL1")); }));

    let snap = store.current();
    let rec = snap.get( &icao(1)).unwrap();
    println!("{rec}");
    assert_eq!( rec.first_seen_version, 1);
    assert_eq!( rec.last_changed_version, 2);
    assert_eq!( rec.altitude.changed(), 2);
    assert_eq!( rec.callsign.changed(), 1);
    assert!( rec.has_changed_since(1));
    assert!( !rec.has_changed_since(2));
}

#[test]
fn test_snapshot_isolation () {
    let store = AircraftSnapshotStore::default();
    store.update( |txn| txn.upsert( icao(1), Utc::now(), |w| { w.set_altitude( Some(1000)); }));

    let old = store.current();
    store.update( |txn| {
        txn.upsert( icao(1), Utc::now(), |w| { w.set_altitude( Some(5000)); });
        txn.upsert( icao(2), Utc::now(), |_| {});
    });
    let new = store.current();

    assert_eq!( old.data_version(), 1);
    assert_eq!( old.len(), 1);
    assert_eq!( old.get( &icao(1)).unwrap().altitude.get(), Some(1000));

    assert_eq!( new.data_version(), 2);
    assert_eq!( new.len(), 2);
    assert_eq!( new.get( &icao(1)).unwrap().altitude.get(), Some(5000));
}

#[test]
fn test_removal_history () {
    let store = AircraftSnapshotStore::new( 8, 2);
    store.update( |txn| for i in 1..=4 { txn.upsert( icao(i), Utc::now(), |_| {}) });   // v1
    store.update( |txn| txn.remove( &icao(1)));  // v2
    store.update( |txn| txn.remove( &icao(2)));  // v3

    let snap = store.current();
    assert!( snap.can_update_from(1));
    let removed: Vec<Icao24> = snap.removed_since(1).collect();
    assert_eq!( removed.len(), 2);
    assert_eq!( snap.removed_since(2).collect::<Vec<_>>(), vec![icao(2)]);

    // history only holds two entries - dropping the first one moves the horizon
    store.update( |txn| txn.remove( &icao(3)));  // v4
    let snap = store.current();
    assert!( !snap.can_update_from(1));
    assert!( snap.can_update_from(2));
    assert!( !snap.can_update_from(5)); // future versions are unknown

    // re-appearing aircraft are not reported as removed
    store.update( |txn| txn.upsert( icao(3), Utc::now(), |_| {}));  // v5
    let snap = store.current();
    assert_eq!( snap.removed_since(3).count(), 0);
}

#[test]
fn test_reset () {
    let store = AircraftSnapshotStore::default();
    store.update( |txn| txn.upsert( icao(1), Utc::now(), |_| {}));
    store.update( |txn| txn.upsert( icao(2), Utc::now(), |_| {}));

    let v = store.reset();
    assert_eq!( v, 3);

    let snap = store.current();
    assert!( snap.is_empty());
    assert_eq!( snap.reset_version(), 3);
    assert!( !snap.can_update_from(2));
    assert!( snap.can_update_from(3));
}

#[test]
fn test_expire () {
    let store = AircraftSnapshotStore::default();
    let t0 = Utc::now();
    store.update( |txn| {
        txn.upsert( icao(1), t0 - chrono::Duration::seconds(120), |_| {});
        txn.upsert( icao(2), t0, |_| {});
    });

    let (v,n) = store.update( |txn| txn.expire( t0, Duration::from_secs(60)));
    assert_eq!( n, 1);
    assert_eq!( v, 2);
    assert!( !store.current().contains( &icao(1)));
    assert!( store.current().contains( &icao(2)));
}

#[test]
fn test_trail () {
    let store = AircraftSnapshotStore::new( 3, 16);
    for i in 0..5 {
        store.update( |txn| txn.upsert( icao(1), Utc::now(), |w| {
            w.set_altitude( Some(1000 + i)).set_position( Some( LatLon::new( 37.0 + i as f64 * 0.01, -122.0)));
        }));
    }

    let snap = store.current();
    let rec = snap.get( &icao(1)).unwrap();
    assert_eq!( rec.trail.len(), 3);
    assert_eq!( rec.trail.front().map( |p| p.version), Some(3));
    assert_eq!( rec.trail_since(4).count(), 1);

    // invalid positions are ignored
    let (v,_) = store.update( |txn| txn.upsert( icao(1), Utc::now(), |w| { w.set_position( Some( LatLon::new( 95.0, 0.0))); }));
    assert_eq!( v, 5);
    assert_eq!( store.current().get( &icao(1)).unwrap().last_position().map( |p| p.lon), Some(-122.0));
}

#[test]
fn test_concurrent_readers () {
    let store = Arc::new( AircraftSnapshotStore::default());

    let readers: Vec<_> = (0..4).map( |_| {
        let store = store.clone();
        thread::spawn( move || {
            let mut last = 0;
            for _ in 0..1000 {
                let snap = store.current();
                let v = snap.data_version();
                assert!( v >= last);
                // every aircraft of a snapshot has the altitude of the version that published it
                for rec in snap.aircraft() {
                    assert!( rec.last_changed_version <= v);
                    assert_eq!( rec.altitude.get(), Some( rec.last_changed_version as i32));
                }
                last = v;
            }
        })
    }).collect();

    for i in 1..=500u32 {
        store.update( |txn| {
            let version = txn.pending_version() as i32;
            for n in 1..=10 {
                txn.upsert( icao(n), Utc::now(), |w| { w.set_altitude( Some(version)); });
            }
            if i % 50 == 0 { txn.remove( &icao(i % 10 + 1)); }
        });
    }

    for r in readers { r.join().unwrap(); }
    assert_eq!( store.data_version(), 500);
}
