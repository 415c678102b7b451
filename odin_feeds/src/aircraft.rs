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

use std::{collections::VecDeque, fmt, str::FromStr};
use chrono::{DateTime,Utc};
use serde::{Serialize,Deserialize};
use serde_repr::{Serialize_repr,Deserialize_repr};
use strum::FromRepr;

use crate::{geo::LatLon, errors::{OdinFeedsError,parse_error}};

/// monotonic per-feed state counter. Version 0 means "never changed"
pub type DataVersion = u64;

/* #region Icao24 ***************************************************************************/

/// 24 bit ICAO transponder address, which doubles as the unique aircraft id within a feed
#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,PartialOrd,Ord,Serialize,Deserialize)]
pub struct Icao24(u32);

impl Icao24 {
    pub const MAX: u32 = 0xffffff;

    pub fn new (addr: u32)->Option<Self> {
        if addr <= Self::MAX { Some(Icao24(addr)) } else { None }
    }

    pub fn id (&self)->u32 { self.0 }

    pub fn to_hex (&self)->String { format!("{:06X}", self.0) }
}

impl fmt::Display for Icao24 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "{:06X}", self.0)
    }
}

impl FromStr for Icao24 {
    type Err = OdinFeedsError;

    /// parses the hex representation (e.g. "A1B2C3")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u32::from_str_radix( s.trim(), 16).ok()
            .and_then( Icao24::new)
            .ok_or_else( || parse_error!("not a 24bit hex address: '{}'", s))
    }
}

/* #endregion Icao24 */

/* #region enumerations *********************************************************************/

// the discriminants are part of the wire protocol (filter values and JSON output)

#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,FromRepr,Serialize_repr,Deserialize_repr)]
#[repr(i32)]
pub enum Species {
    None = 0,
    LandPlane = 1,
    SeaPlane = 2,
    Amphibian = 3,
    Helicopter = 4,
    Gyrocopter = 5,
    Tiltwing = 6,
    GroundVehicle = 7,
    Tower = 8,
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,FromRepr,Serialize_repr,Deserialize_repr)]
#[repr(i32)]
pub enum EngineType {
    None = 0,
    Piston = 1,
    Turbo = 2,
    Jet = 3,
    Electric = 4,
    Rocket = 5,
}

#[derive(Debug,Clone,Copy,PartialEq,Eq,Hash,FromRepr,Serialize_repr,Deserialize_repr)]
#[repr(i32)]
pub enum WakeTurbulenceCategory {
    None = 0,
    Light = 1,
    Medium = 2,
    Heavy = 3,
}

/* #endregion enumerations */

/* #region Tracked **************************************************************************/

/// an optional attribute value together with the DataVersion in which it last changed
#[derive(Debug,Clone,PartialEq)]
pub struct Tracked<T> {
    value: Option<T>,
    changed: DataVersion,
}

impl<T> Default for Tracked<T> {
    fn default()->Self { Tracked{ value: None, changed: 0 } }
}

impl<T> Tracked<T> where T: PartialEq {
    pub fn value (&self)->Option<&T> { self.value.as_ref() }

    pub fn changed (&self)->DataVersion { self.changed }

    pub fn changed_since (&self, version: DataVersion)->bool { self.changed > version }

    /// set value and stamp it with `version`. Returns true if the value actually changed
    pub fn set (&mut self, value: Option<T>, version: DataVersion)->bool {
        if self.value != value {
            self.value = value;
            self.changed = version;
            true
        } else {
            false
        }
    }
}

impl<T> Tracked<T> where T: Copy {
    pub fn get (&self)->Option<T> { self.value }
}

/* #endregion Tracked */

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct TrailPoint {
    pub position: LatLon,
    pub altitude: Option<i32>,
    pub version: DataVersion,
}

/// the data model for a tracked aircraft as seen by the aircraft list protocol.
/// Records are owned by an [`crate::snapshot::AircraftSnapshot`] and only change through a
/// [`RecordWriter`] of a snapshot transaction
#[derive(Debug,Clone)]
pub struct AircraftRecord {
    pub icao24: Icao24,
    pub first_seen_version: DataVersion,
    pub last_changed_version: DataVersion,
    pub last_update: DateTime<Utc>,

    pub position: Tracked<LatLon>,
    pub altitude: Tracked<i32>,       // feet
    pub callsign: Tracked<String>,
    pub squawk: Tracked<u16>,         // the four octal digits read as decimal, e.g. 7700
    pub registration: Tracked<String>,
    pub operator: Tracked<String>,
    pub aircraft_type: Tracked<String>,
    pub species: Tracked<Species>,
    pub engine_type: Tracked<EngineType>,
    pub wtc: Tracked<WakeTurbulenceCategory>,
    pub is_military: Tracked<bool>,
    pub is_interesting: Tracked<bool>,
    pub user_tag: Tracked<String>,
    pub country: Tracked<String>,
    pub must_transmit_position: Tracked<bool>,

    pub trail: VecDeque<TrailPoint>, // used as a ringbuffer
}

impl AircraftRecord {
    pub fn new (icao24: Icao24, version: DataVersion, last_update: DateTime<Utc>)->Self {
        AircraftRecord {
            icao24,
            first_seen_version: version,
            last_changed_version: version,
            last_update,
            position: Tracked::default(),
            altitude: Tracked::default(),
            callsign: Tracked::default(),
            squawk: Tracked::default(),
            registration: Tracked::default(),
            operator: Tracked::default(),
            aircraft_type: Tracked::default(),
            species: Tracked::default(),
            engine_type: Tracked::default(),
            wtc: Tracked::default(),
            is_military: Tracked::default(),
            is_interesting: Tracked::default(),
            user_tag: Tracked::default(),
            country: Tracked::default(),
            must_transmit_position: Tracked::default(),
            trail: VecDeque::new(),
        }
    }

    pub fn id (&self)->u32 { self.icao24.id() }

    pub fn last_position (&self)->Option<LatLon> { self.position.get() }

    pub fn has_changed_since (&self, version: DataVersion)->bool { self.last_changed_version > version }

    pub fn trail_since (&self, version: DataVersion)->impl Iterator<Item=&TrailPoint> {
        self.trail.iter().filter( move |p| p.version > version)
    }
}

impl fmt::Display for AircraftRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "AircraftRecord( icao24: {}", self.icao24)?;
        if let Some(cs) = self.callsign.value() { write!( f, ", cs: \"{cs}\"")?; }
        if let Some(p) = self.position.value() { write!( f, ", pos: {p}")?; }
        if let Some(alt) = self.altitude.value() { write!( f, ", alt: {alt}")?; }
        write!( f, ", first_seen: {}, changed: {})", self.first_seen_version, self.last_changed_version)
    }
}

/* #region RecordWriter *********************************************************************/

/// mutable access to an AircraftRecord within a snapshot transaction. All setters stamp changed
/// attributes with the pending transaction version and report if anything observable changed
pub struct RecordWriter<'a> {
    record: &'a mut AircraftRecord,
    version: DataVersion,
    max_trail: usize,
    changed: bool,
}

// String attributes take &str so that unchanged values don't allocate
macro_rules! tracked_setter {
    ($fn_name:ident, $field:ident, String) => {
        pub fn $fn_name (&mut self, value: Option<&str>)->&mut Self {
            if self.record.$field.value().map(|s| s.as_str()) != value {
                self.record.$field.set( value.map(|s| s.to_string()), self.version);
                self.changed = true;
            }
            self
        }
    };
    ($fn_name:ident, $field:ident, $t:ty) => {
        pub fn $fn_name (&mut self, value: Option<$t>)->&mut Self {
            if self.record.$field.set( value, self.version) { self.changed = true; }
            self
        }
    };
}

impl<'a> RecordWriter<'a> {
    pub(crate) fn new (record: &'a mut AircraftRecord, version: DataVersion, max_trail: usize)->Self {
        RecordWriter{ record, version, max_trail, changed: false }
    }

    pub fn record (&self)->&AircraftRecord { &*self.record }

    pub(crate) fn has_changed (&self)->bool { self.changed }

    /// position changes also extend the trail. Invalid positions are ignored
    pub fn set_position (&mut self, position: Option<LatLon>)->&mut Self {
        if position.is_some_and( |p| !p.is_valid()) { return self }

        if self.record.position.set( position, self.version) {
            self.changed = true;
            if let Some(position) = position {
                self.push_trail_point( position);
            }
        }
        self
    }

    fn push_trail_point (&mut self, position: LatLon) {
        if self.max_trail == 0 { return }

        let altitude = self.record.altitude.get();
        let trail = &mut self.record.trail;
        if let Some(last) = trail.back() {
            if last.version == self.version { trail.pop_back(); } // only one point per version
        }
        while trail.len() >= self.max_trail { trail.pop_front(); }
        trail.push_back( TrailPoint{ position, altitude, version: self.version });
    }

    pub fn set_last_update (&mut self, last_update: DateTime<Utc>)->&mut Self {
        self.record.last_update = last_update;
        self
    }

    tracked_setter!{ set_altitude, altitude, i32 }
    tracked_setter!{ set_callsign, callsign, String }
    tracked_setter!{ set_squawk, squawk, u16 }
    tracked_setter!{ set_registration, registration, String }
    tracked_setter!{ set_operator, operator, String }
    tracked_setter!{ set_aircraft_type, aircraft_type, String }
    tracked_setter!{ set_species, species, Species }
    tracked_setter!{ set_engine_type, engine_type, EngineType }
    tracked_setter!{ set_wtc, wtc, WakeTurbulenceCategory }
    tracked_setter!{ set_military, is_military, bool }
    tracked_setter!{ set_interesting, is_interesting, bool }
    tracked_setter!{ set_user_tag, user_tag, String }
    tracked_setter!{ set_country, country, String }
    tracked_setter!{ set_must_transmit_position, must_transmit_position, bool }
}

/* #endregion RecordWriter */
