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

use std::collections::HashSet;
use chrono::Utc;
use odin_feeds::{
    aircraft::Icao24,
    builder::{inclusion_level, AircraftListSnapshotBuilder, ClientContext, Inclusion, Redactions, TrustLevel},
    feed::Feed,
    filter::{decode_filter, FilterPredicate},
    geo::LatLon,
    snapshot::AircraftSnapshotStore
};

const A: u32 = 0xa00001;
const B: u32 = 0xa00002;

fn icao (n: u32)->Icao24 { Icao24::new(n).unwrap() }

fn local ()->ClientContext { ClientContext::new( TrustLevel::Local) }

fn filter (params: &[(&str,&str)])->FilterPredicate {
    decode_filter( params.iter().copied()).unwrap()
}

/// feed with two aircraft at version 1
fn test_feed ()->Feed {
    let feed = Feed::new( 1, "test", true, AircraftSnapshotStore::default());
    feed.aircraft().update( |txn| {
        txn.upsert( icao(A), Utc::now(), |w| {
            w.set_callsign( Some("UAL1")).set_altitude( Some(1000)).set_squawk( Some(123))
             .set_user_tag( Some("secret")).set_position( Some( LatLon::new( 37.0, -122.0)));
        });
        txn.upsert( icao(B), Utc::now(), |w| {
            w.set_callsign( Some("SWA2")).set_altitude( Some(5000));
        });
    });
    feed
}

#[test]
fn test_inclusion_level () {
    assert_eq!( inclusion_level( None, 5, false, false), Inclusion::Full);
    assert_eq!( inclusion_level( None, 5, true, false), Inclusion::Full);
    assert_eq!( inclusion_level( Some(3), 5, false, false), Inclusion::Full);
    assert_eq!( inclusion_level( Some(3), 5, true, false), Inclusion::Incremental);
    assert_eq!( inclusion_level( Some(5), 5, true, false), Inclusion::Omitted);
    assert_eq!( inclusion_level( Some(5), 5, true, true), Inclusion::Full);
}

#[test]
fn test_initial_and_incremental () {
    let feed = test_feed();
    let builder = AircraftListSnapshotBuilder::default();

    let delta = builder.build( &feed, None, None, &local());
    println!("{}", serde_json::to_string_pretty(&delta).unwrap());
    assert!( delta.full_refresh);
    assert_eq!( delta.last_data_version, 1);
    assert_eq!( delta.feed_id, 1);
    assert_eq!( delta.total_aircraft, 2);
    assert_eq!( delta.aircraft.len(), 2);
    assert!( delta.aircraft.iter().all( |a| a.is_full && a.icao.is_some()));
    assert_eq!( delta.aircraft[0].id, A); // ordered by id
    assert_eq!( delta.aircraft[0].squawk.as_deref(), Some("0123"));
    assert_eq!( delta.aircraft[0].trail.as_ref().map( |t| t.len()), Some(1));

    feed.aircraft().update( |txn| txn.upsert( icao(A), Utc::now(), |w| { w.set_altitude( Some(1100)); }));

    let delta = builder.build( &feed, Some(1), None, &local());
    assert!( !delta.full_refresh);
    assert_eq!( delta.last_data_version, 2);
    assert_eq!( delta.aircraft.len(), 1);
    let a = &delta.aircraft[0];
    assert_eq!( a.id, A);
    assert!( !a.is_full);
    assert_eq!( a.altitude, Some(1100));
    assert!( a.callsign.is_none() && a.icao.is_none() && a.latitude.is_none() && a.trail.is_none());

    // client is up to date
    let delta = builder.build( &feed, Some(2), None, &local());
    assert!( delta.aircraft.is_empty() && delta.removed.is_empty());
    assert_eq!( delta.last_data_version, 2);
}

#[test]
fn test_new_aircraft_is_full () {
    let feed = test_feed();
    let builder = AircraftListSnapshotBuilder::default();
    feed.aircraft().update( |txn| txn.upsert( icao(3), Utc::now(), |w| { w.set_callsign( Some("NEW")); }));

    let delta = builder.build( &feed, Some(1), None, &local());
    assert_eq!( delta.aircraft.len(), 1);
    assert!( delta.aircraft[0].is_full);
    assert_eq!( delta.aircraft[0].icao.as_deref(), Some("000003"));
}

#[test]
fn test_removals () {
    let feed = test_feed();
    let builder = AircraftListSnapshotBuilder::default();
    feed.aircraft().update( |txn| txn.remove( &icao(B)));

    let delta = builder.build( &feed, Some(1), None, &local());
    assert_eq!( delta.removed, vec![B]);
    assert!( delta.aircraft.is_empty());

    // a client that never saw B does not need the removal
    let delta = builder.build( &feed, Some(2), None, &local());
    assert!( delta.removed.is_empty());
}

#[test]
fn test_reset_forces_full_refresh () {
    let feed = test_feed();
    let builder = AircraftListSnapshotBuilder::default();
    feed.aircraft().reset();
    feed.aircraft().update( |txn| txn.upsert( icao(A), Utc::now(), |w| { w.set_altitude( Some(9000)); }));

    let delta = builder.build( &feed, Some(1), None, &local());
    assert!( delta.full_refresh);
    assert_eq!( delta.last_data_version, 3);
    assert_eq!( delta.aircraft.len(), 1);
    assert!( delta.aircraft[0].is_full);

    // versions from the future also get a full refresh
    let delta = builder.build( &feed, Some(42), None, &local());
    assert!( delta.full_refresh);
}

#[test]
fn test_filter_and_selected () {
    let feed = test_feed();
    let builder = AircraftListSnapshotBuilder::default();
    let f = filter( &[("FCALLS","UAL")]);

    let delta = builder.build( &feed, None, Some(&f), &local());
    assert_eq!( delta.total_aircraft, 2);
    assert_eq!( delta.aircraft.iter().map( |a| a.id).collect::<Vec<_>>(), vec![A]);

    // the selected aircraft bypasses the filter
    let mut client = local();
    client.selected_aircraft = Some( icao(B));
    let delta = builder.build( &feed, None, Some(&f), &client);
    assert_eq!( delta.aircraft.len(), 2);

    // .. and is always included, even if unchanged
    let delta = builder.build( &feed, Some(1), None, &client);
    assert!( !delta.full_refresh);
    assert_eq!( delta.aircraft.len(), 1);
    assert_eq!( delta.aircraft[0].id, B);
    assert!( delta.aircraft[0].callsign.is_none());
}

fn single_aircraft_feed (altitude: i32)->Feed {
    let feed = Feed::new( 1, "test", true, AircraftSnapshotStore::default());
    feed.aircraft().update( |txn| {
        txn.upsert( icao(A), Utc::now(), |w| { w.set_callsign( Some("UAL1")).set_altitude( Some(altitude)); });
    });
    feed
}

fn set_altitude (feed: &Feed, altitude: i32) {
    feed.aircraft().update( |txn| txn.upsert( icao(A), Utc::now(), |w| { w.set_altitude( Some(altitude)); }));
}

#[test]
fn test_aircraft_entering_filter () {
    let feed = single_aircraft_feed( 20000);
    let builder = AircraftListSnapshotBuilder::default();
    let f = filter( &[("FALTU","10000")]);

    let delta = builder.build( &feed, None, Some(&f), &local());
    assert!( delta.aircraft.is_empty());
    assert_eq!( delta.last_data_version, 1);

    set_altitude( &feed, 5000);

    // the client never saw A, it has to get the full record
    let delta = builder.build( &feed, Some(1), Some(&f), &local());
    println!("{delta:?}");
    assert!( delta.full_refresh);
    assert_eq!( delta.aircraft.len(), 1);
    let a = &delta.aircraft[0];
    assert!( a.is_full);
    assert_eq!( a.callsign.as_deref(), Some("UAL1"));
    assert!( a.icao.is_some());
    assert_eq!( a.altitude, Some(5000));
}

#[test]
fn test_aircraft_leaving_filter () {
    let feed = single_aircraft_feed( 5000);
    let builder = AircraftListSnapshotBuilder::default();
    let f = filter( &[("FALTU","10000")]);

    let delta = builder.build( &feed, None, Some(&f), &local());
    assert_eq!( delta.aircraft.len(), 1);

    set_altitude( &feed, 20000);

    // a full refresh without A makes the client drop it
    let delta = builder.build( &feed, Some(1), Some(&f), &local());
    assert!( delta.full_refresh);
    assert!( delta.aircraft.is_empty());

    // with a known aircraft list the client gets an explicit removal instead
    let mut client = local();
    client.known_aircraft = Some( HashSet::from([ icao(A)]));
    let delta = builder.build( &feed, Some(1), Some(&f), &client);
    assert!( !delta.full_refresh);
    assert_eq!( delta.removed, vec![A]);
}

#[test]
fn test_known_aircraft () {
    let feed = test_feed();
    let builder = AircraftListSnapshotBuilder::default();

    let mut client = local();
    client.known_aircraft = Some( HashSet::from([ icao(A), icao(0xbbbbbb)]));

    // B is not known by the client and hence sent in full, A is known and unchanged
    let f = filter( &[("FALTL","2000")]);
    let delta = builder.build( &feed, Some(1), Some(&f), &client);
    assert_eq!( delta.aircraft.len(), 1);
    assert_eq!( delta.aircraft[0].id, B);
    assert!( delta.aircraft[0].is_full);

    // A no longer passes the filter, 0xbbbbbb does not exist
    assert_eq!( delta.removed, vec![A, 0xbbbbbb]);
}

#[test]
fn test_resend_trails () {
    let feed = test_feed();
    let builder = AircraftListSnapshotBuilder::default();
    feed.aircraft().update( |txn| txn.upsert( icao(A), Utc::now(), |w| { w.set_position( Some( LatLon::new( 37.1, -122.1))); }));

    let delta = builder.build( &feed, Some(1), None, &local());
    assert_eq!( delta.aircraft.len(), 1);
    assert_eq!( delta.aircraft[0].trail.as_ref().map( |t| t.len()), Some(1)); // only the new point

    let mut client = local();
    client.resend_trails = true;
    let delta = builder.build( &feed, Some(2), None, &client);
    assert_eq!( delta.aircraft.len(), 2);
    let a = delta.aircraft.iter().find( |a| a.id == A).unwrap();
    assert!( a.is_full);
    assert_eq!( a.trail.as_ref().map( |t| t.len()), Some(2));
}

#[test]
fn test_distance () {
    let feed = test_feed();
    let builder = AircraftListSnapshotBuilder::default();

    let mut client = local();
    client.browser_location = Some( LatLon::new( 37.1, -122.0));
    let delta = builder.build( &feed, None, None, &client);

    let a = delta.aircraft.iter().find( |a| a.id == A).unwrap();
    let d = a.distance.unwrap();
    assert!( (d - 11.1).abs() < 0.2, "unexpected distance {d}");
    assert!( delta.aircraft.iter().find( |a| a.id == B).unwrap().distance.is_none()); // no position

    let f = filter( &[("FDSTU","20")]);
    let delta = builder.build( &feed, None, Some(&f), &client);
    assert_eq!( delta.aircraft.len(), 1);
}

#[test]
fn test_internet_redactions () {
    let feed = test_feed();
    let builder = AircraftListSnapshotBuilder::new( Redactions::default());

    let delta = builder.build( &feed, None, None, &local());
    assert_eq!( delta.aircraft[0].user_tag.as_deref(), Some("secret"));

    let internet = ClientContext::new( TrustLevel::Internet);
    let delta = builder.build( &feed, None, None, &internet);
    assert!( delta.aircraft[0].user_tag.is_none());

    // filters on redacted attributes are ignored
    let f = filter( &[("FUTQ","secret")]);
    assert_eq!( builder.build( &feed, None, Some(&f), &local()).aircraft.len(), 1);
    assert_eq!( builder.build( &feed, None, Some(&f), &internet).aircraft.len(), 2);
}

#[test]
fn test_json_keys () {
    let feed = test_feed();
    let builder = AircraftListSnapshotBuilder::default();
    let delta = builder.build( &feed, None, None, &local());

    let json = serde_json::to_value( &delta).unwrap();
    assert_eq!( json["feedId"], 1);
    assert_eq!( json["lastDataVersion"], 1);
    assert_eq!( json["fullRefresh"], true);
    assert!( json["serverTime"].is_i64());
    assert_eq!( json["aircraft"][0]["Id"], A);
    assert_eq!( json["aircraft"][0]["Call"], "UAL1");
    assert_eq!( json["aircraft"][0]["Icao"], "A00001");
    assert_eq!( json["aircraft"][0]["Sqk"], "0123");
    assert_eq!( json["aircraft"][0]["Full"], true);
    assert!( json["aircraft"][1].get("Lat").is_none());
    assert!( json["removed"].as_array().unwrap().is_empty());
}
