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

//! differential aircraft list computation.
//!
//! Clients poll with the DataVersion they got from their previous response. The builder compares this
//! against the per-attribute versions of the current feed snapshot and only sends what the client is
//! missing: complete records for aircraft the client does not know yet, changed attributes for the
//! ones it has, nothing for unchanged ones, plus the ids of aircraft that went away.

use std::{collections::HashSet, net::IpAddr};
use chrono::Utc;
use serde::{Serialize,Deserialize};
use tracing::debug;

use crate::{
    aircraft::{AircraftRecord, DataVersion, EngineType, Icao24, Species, WakeTurbulenceCategory},
    feed::Feed,
    filter::FilterPredicate,
    geo::LatLon
};

/* #region client context *******************************************************************/

#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub enum TrustLevel {
    Local,
    Internet,
}

impl TrustLevel {
    /// loopback, private, link-local and unique-local addresses are local, everything else is internet
    pub fn from_ip (ip: &IpAddr)->Self {
        let is_local = match ip {
            IpAddr::V4(ip) => ip.is_loopback() || ip.is_private() || ip.is_link_local(),
            IpAddr::V6(ip) => {
                if let Some(ip4) = ip.to_ipv4_mapped() {
                    ip4.is_loopback() || ip4.is_private() || ip4.is_link_local()
                } else {
                    let s0 = ip.segments()[0];
                    ip.is_loopback() || (s0 & 0xfe00) == 0xfc00 || (s0 & 0xffc0) == 0xfe80
                }
            }
        };
        if is_local { TrustLevel::Local } else { TrustLevel::Internet }
    }

    pub fn is_internet (&self)->bool { *self == TrustLevel::Internet }
}

/// what we know about the polling client
#[derive(Debug,Clone)]
pub struct ClientContext {
    pub trust_level: TrustLevel,
    pub browser_location: Option<LatLon>,
    pub selected_aircraft: Option<Icao24>,   // always included, regardless of filter
    pub resend_trails: bool,
    pub flight_simulator: bool,
    pub known_aircraft: Option<HashSet<Icao24>>, // what the client currently displays (if it told us)
    pub server_ticks: Option<i64>,           // server time of the previous response as echoed by the client
}

impl ClientContext {
    pub fn new (trust_level: TrustLevel)->Self {
        ClientContext {
            trust_level,
            browser_location: None,
            selected_aircraft: None,
            resend_trails: false,
            flight_simulator: false,
            known_aircraft: None,
            server_ticks: None,
        }
    }
}

/// aircraft attributes that can be withheld from internet clients (neither sent nor usable in filters)
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
#[serde(default)]
pub struct Redactions {
    pub user_tag: bool,
    pub interesting: bool,
    pub operator: bool,
}

impl Default for Redactions {
    fn default()->Self { Redactions { user_tag: true, interesting: false, operator: false } }
}

/* #endregion client context */

/* #region inclusion ************************************************************************/

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum Inclusion {
    Full,        // the client gets the complete record
    Incremental, // only attributes changed since the previous version
    Omitted,     // client is up to date
}

/// how much of a record has to be sent. `previous_version` is `None` if the client has no usable baseline
pub fn inclusion_level (previous_version: Option<DataVersion>, last_changed_version: DataVersion, client_has_base: bool, resend_trails: bool)->Inclusion {
    match previous_version {
        Some(v) if client_has_base && !resend_trails => {
            if last_changed_version > v { Inclusion::Incremental } else { Inclusion::Omitted }
        }
        _ => Inclusion::Full
    }
}

/* #endregion inclusion */

/* #region JSON model ***********************************************************************/

/// per aircraft delta. Only `Id` is always present, all other keys are only set if they changed
/// (or if this is a full record)
#[derive(Debug,Clone,PartialEq,Default,Serialize)]
pub struct AircraftJson {
    #[serde(rename="Id")] pub id: u32,
    #[serde(rename="Full", skip_serializing_if="std::ops::Not::not")] pub is_full: bool,
    #[serde(rename="Icao", skip_serializing_if="Option::is_none")] pub icao: Option<String>,
    #[serde(rename="Reg", skip_serializing_if="Option::is_none")] pub registration: Option<String>,
    #[serde(rename="Call", skip_serializing_if="Option::is_none")] pub callsign: Option<String>,
    #[serde(rename="Sqk", skip_serializing_if="Option::is_none")] pub squawk: Option<String>,
    #[serde(rename="Alt", skip_serializing_if="Option::is_none")] pub altitude: Option<i32>,
    #[serde(rename="Lat", skip_serializing_if="Option::is_none")] pub latitude: Option<f64>,
    #[serde(rename="Lon", skip_serializing_if="Option::is_none")] pub longitude: Option<f64>,
    #[serde(rename="Op", skip_serializing_if="Option::is_none")] pub operator: Option<String>,
    #[serde(rename="Type", skip_serializing_if="Option::is_none")] pub aircraft_type: Option<String>,
    #[serde(rename="Species", skip_serializing_if="Option::is_none")] pub species: Option<Species>,
    #[serde(rename="EngType", skip_serializing_if="Option::is_none")] pub engine_type: Option<EngineType>,
    #[serde(rename="WTC", skip_serializing_if="Option::is_none")] pub wtc: Option<WakeTurbulenceCategory>,
    #[serde(rename="Mil", skip_serializing_if="Option::is_none")] pub is_military: Option<bool>,
    #[serde(rename="Interested", skip_serializing_if="Option::is_none")] pub is_interesting: Option<bool>,
    #[serde(rename="Tag", skip_serializing_if="Option::is_none")] pub user_tag: Option<String>,
    #[serde(rename="Cou", skip_serializing_if="Option::is_none")] pub country: Option<String>,
    #[serde(rename="MustTransmitPos", skip_serializing_if="Option::is_none")] pub must_transmit_position: Option<bool>,
    #[serde(rename="Dst", skip_serializing_if="Option::is_none")] pub distance: Option<f64>,
    #[serde(rename="Trail", skip_serializing_if="Option::is_none")] pub trail: Option<Vec<(f64,f64,Option<i32>)>>, // [lat,lon,alt]
}

impl AircraftJson {
    pub fn id_only (record: &AircraftRecord)->Self {
        AircraftJson{ id: record.id(), ..AircraftJson::default() }
    }

    /// all attributes that changed after `since` (use 0 for a full record)
    fn from_record (record: &AircraftRecord, since: DataVersion, redactions: Option<&Redactions>)->Self {
        macro_rules! changed {
            ($field:ident) => { if record.$field.changed_since(since) { record.$field.value().cloned() } else { None } }
        }

        let redact_tag = redactions.map_or( false, |r| r.user_tag);
        let redact_interesting = redactions.map_or( false, |r| r.interesting);
        let redact_operator = redactions.map_or( false, |r| r.operator);
        let position = changed!(position);

        let trail: Vec<(f64,f64,Option<i32>)> = record.trail_since(since)
            .map( |p| (p.position.lat, p.position.lon, p.altitude))
            .collect();

        AircraftJson {
            id: record.id(),
            is_full: since == 0,
            icao: if since == 0 { Some( record.icao24.to_hex()) } else { None },
            registration: changed!(registration),
            callsign: changed!(callsign),
            squawk: changed!(squawk).map( |s| format!("{:04}", s)),
            altitude: changed!(altitude),
            latitude: position.map( |p| p.lat),
            longitude: position.map( |p| p.lon),
            operator: if redact_operator { None } else { changed!(operator) },
            aircraft_type: changed!(aircraft_type),
            species: changed!(species),
            engine_type: changed!(engine_type),
            wtc: changed!(wtc),
            is_military: changed!(is_military),
            is_interesting: if redact_interesting { None } else { changed!(is_interesting) },
            user_tag: if redact_tag { None } else { changed!(user_tag) },
            country: changed!(country),
            must_transmit_position: changed!(must_transmit_position),
            distance: None,
            trail: if trail.is_empty() { None } else { Some(trail) },
        }
    }
}

/// the aircraft list response
#[derive(Debug,Clone,PartialEq,Serialize)]
#[serde(rename_all="camelCase")]
pub struct AircraftListDelta {
    pub feed_id: i32,
    pub last_data_version: DataVersion, // what the client has to send with its next poll
    pub server_time: i64,               // epoch millis
    pub full_refresh: bool,             // client has to drop everything it has not received in this response
    pub total_aircraft: usize,          // number of aircraft in feed before filtering
    pub aircraft: Vec<AircraftJson>,
    pub removed: Vec<u32>,
}

impl AircraftListDelta {
    /// the response for unknown or inaccessible feeds
    pub fn empty (feed_id: i32)->Self {
        AircraftListDelta {
            feed_id,
            last_data_version: 0,
            server_time: Utc::now().timestamp_millis(),
            full_refresh: true,
            total_aircraft: 0,
            aircraft: Vec::new(),
            removed: Vec::new()
        }
    }
}

/* #endregion JSON model */

/// computes aircraft list deltas. Builders are stateless apart from their configuration and can be
/// shared between any number of concurrent requests
#[derive(Debug,Clone,Default)]
pub struct AircraftListSnapshotBuilder {
    redactions: Redactions,
}

impl AircraftListSnapshotBuilder {
    pub fn new (redactions: Redactions)->Self {
        AircraftListSnapshotBuilder{ redactions }
    }

    pub fn redactions (&self)->&Redactions { &self.redactions }

    pub fn build (&self, feed: &Feed, previous_version: Option<DataVersion>, filter: Option<&FilterPredicate>, client: &ClientContext)->AircraftListDelta {
        let snapshot = feed.aircraft().current(); // everything below only uses this immutable snapshot
        let data_version = snapshot.data_version();

        let redactions = if client.trust_level.is_internet() { Some(&self.redactions) } else { None };
        let filter = filter.map( |f| self.effective_filter( f, redactions)).filter( |f| !f.is_empty());

        // without a known aircraft list we can't tell which aircraft passed the filter at the client's last poll
        let has_baseline = filter.is_none() || client.known_aircraft.is_some();
        let previous_version = previous_version.filter( |v| has_baseline && snapshot.can_update_from(*v));
        let full_refresh = previous_version.is_none();

        let known = if full_refresh { None } else { client.known_aircraft.as_ref() };

        let mut aircraft: Vec<AircraftJson> = Vec::new();
        let mut removed: Vec<u32> = Vec::new();

        for record in snapshot.aircraft() {
            let distance = client.browser_location
                .and_then( |b| record.last_position().map( |p| b.distance_km(&p)));
            let is_selected = client.selected_aircraft == Some(record.icao24);

            let passes = is_selected || filter.as_ref().map_or( true, |f| f.passes( record, distance));
            if !passes {
                if known.is_some_and( |k| k.contains( &record.icao24)) { removed.push( record.id()) }
                continue
            }

            let client_has_base = match (known, previous_version) {
                (Some(known), _) => known.contains( &record.icao24),
                (None, Some(v)) => record.first_seen_version <= v,
                (None, None) => false
            };

            let mut json = match inclusion_level( previous_version, record.last_changed_version, client_has_base, client.resend_trails) {
                Inclusion::Full => AircraftJson::from_record( record, 0, redactions),
                Inclusion::Incremental => AircraftJson::from_record( record, previous_version.unwrap_or(0), redactions),
                Inclusion::Omitted if is_selected => AircraftJson::id_only( record),
                Inclusion::Omitted => continue,
            };
            json.distance = distance.map( |d| (d * 100.0).round() / 100.0);
            aircraft.push( json);
        }

        if let Some(v) = previous_version {
            match known {
                Some(known) => removed.extend( known.iter().filter( |id| !snapshot.contains(id)).map( |id| id.id())),
                None => removed.extend( snapshot.removed_since(v).map( |id| id.id()))
            }
        }

        aircraft.sort_by_key( |a| a.id);
        removed.sort_unstable();
        removed.dedup();

        debug!("feed {} aircraft list v{:?} -> v{}: {} of {} aircraft, {} removed", feed.unique_id(),
               previous_version, data_version, aircraft.len(), snapshot.len(), removed.len());

        AircraftListDelta {
            feed_id: feed.unique_id(),
            last_data_version: data_version,
            server_time: Utc::now().timestamp_millis(),
            full_refresh,
            total_aircraft: snapshot.len(),
            aircraft,
            removed
        }
    }

    /// internet clients can't filter on redacted attributes
    fn effective_filter (&self, filter: &FilterPredicate, redactions: Option<&Redactions>)->FilterPredicate {
        let mut filter = filter.clone();
        if let Some(r) = redactions {
            if r.user_tag { filter.user_tag = None; }
            if r.interesting { filter.is_interesting = None; }
            if r.operator { filter.operator = None; }
        }
        filter
    }
}
