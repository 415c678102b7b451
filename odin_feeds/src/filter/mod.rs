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

//! typed aircraft filter predicates as decoded from the `F*` request parameters of aircraft list
//! requests (see [`decoder`]).
//!
//! A [`FilterPredicate`] is a flat set of optional sub-filters keyed by aircraft attribute. Absent
//! sub-filters do not constrain, a record passes if it passes all present ones. Each sub-filter can be
//! negated with its `reverse_condition` flag. String comparison is case-insensitive.

use crate::{
    aircraft::{AircraftRecord, EngineType, Species, Tracked, WakeTurbulenceCategory},
    geo::LatLon
};

pub mod decoder;
pub use decoder::decode_filter;

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum FilterCondition {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    Between,
}

/* #region sub-filters **********************************************************************/

#[derive(Debug,Clone,PartialEq)]
pub struct StringFilter {
    pub condition: FilterCondition,
    pub value: String,
    pub reverse_condition: bool,
}

impl StringFilter {
    pub fn new (condition: FilterCondition, value: impl ToString, reverse_condition: bool)->Self {
        StringFilter{ condition, value: value.to_string(), reverse_condition }
    }

    /// missing attribute values are compared as empty strings
    pub fn passes (&self, value: Option<&str>)->bool {
        let value = value.unwrap_or("").to_lowercase();
        let pattern = self.value.to_lowercase();

        let result = match self.condition {
            FilterCondition::Equals => value == pattern,
            FilterCondition::Contains => value.contains( pattern.as_str()),
            FilterCondition::StartsWith => value.starts_with( pattern.as_str()),
            FilterCondition::EndsWith => value.ends_with( pattern.as_str()),
            FilterCondition::Between => true, // not a string condition, decoder never creates it
        };
        result != self.reverse_condition
    }
}

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct BoolFilter {
    pub value: bool,
    pub reverse_condition: bool,
}

impl BoolFilter {
    /// missing attribute values count as false
    pub fn passes (&self, value: Option<bool>)->bool {
        (value.unwrap_or(false) == self.value) != self.reverse_condition
    }
}

#[derive(Debug,Clone,Copy,PartialEq)]
pub struct EnumFilter<E> {
    pub value: E,
    pub reverse_condition: bool,
}

impl<E> EnumFilter<E> where E: PartialEq + Copy {
    /// records without a value never equal the filter value
    pub fn passes (&self, value: Option<E>)->bool {
        (value == Some(self.value)) != self.reverse_condition
    }
}

/// inclusive range with independently set bounds
#[derive(Debug,Clone,Copy,PartialEq,Default)]
pub struct RangeFilter {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub reverse_condition: bool,
}

impl RangeFilter {
    pub fn condition (&self)->FilterCondition { FilterCondition::Between }

    pub fn has_bounds (&self)->bool { self.lower.is_some() || self.upper.is_some() }

    /// a record without a value does not lie within any set bound
    pub fn passes (&self, value: Option<f64>)->bool {
        let result = match value {
            Some(v) => {
                self.lower.map_or( true, |lower| v >= lower) && self.upper.map_or( true, |upper| v <= upper)
            }
            None => !self.has_bounds()
        };
        result != self.reverse_condition
    }
}

/// geographic bounding box given by its north-west (`first`) and south-east (`second`) corners.
/// Boxes with west > east cross the antimeridian
#[derive(Debug,Clone,Copy,PartialEq)]
pub struct BoundsFilter {
    pub first: LatLon,
    pub second: LatLon,
}

impl BoundsFilter {
    pub fn new (north: f64, west: f64, south: f64, east: f64)->Self {
        BoundsFilter{ first: LatLon::new(north,west), second: LatLon::new(south,east) }
    }

    pub fn north (&self)->f64 { self.first.lat }
    pub fn west (&self)->f64 { self.first.lon }
    pub fn south (&self)->f64 { self.second.lat }
    pub fn east (&self)->f64 { self.second.lon }

    pub fn contains (&self, p: &LatLon)->bool {
        let in_lat = p.lat <= self.north() && p.lat >= self.south();
        let in_lon = if self.west() <= self.east() {
            p.lon >= self.west() && p.lon <= self.east()
        } else {
            p.lon >= self.west() || p.lon <= self.east()
        };
        in_lat && in_lon
    }

    pub fn passes (&self, position: Option<LatLon>)->bool {
        position.map_or( false, |p| self.contains(&p))
    }
}

/* #endregion sub-filters */

/* #region field ids ************************************************************************/

// these identify the predicate slots the decoder table refers to

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum RangeField { Altitude, Squawk, Distance }

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum StringField { Callsign, Icao24, Registration, Operator, AircraftType, Country, UserTag }

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum BoolField { Interesting, Military, MustTransmitPosition }

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
pub enum EnumField { Species, EngineType, WakeTurbulenceCategory }

/* #endregion field ids */

#[derive(Debug,Clone,Default,PartialEq)]
pub struct FilterPredicate {
    pub altitude: Option<RangeFilter>,
    pub squawk: Option<RangeFilter>,
    pub distance: Option<RangeFilter>, // km from browser location

    pub callsign: Option<StringFilter>,
    pub icao24: Option<StringFilter>,
    pub registration: Option<StringFilter>,
    pub operator: Option<StringFilter>,
    pub aircraft_type: Option<StringFilter>,
    pub country: Option<StringFilter>,
    pub user_tag: Option<StringFilter>,

    pub species: Option<EnumFilter<Species>>,
    pub engine_type: Option<EnumFilter<EngineType>>,
    pub wtc: Option<EnumFilter<WakeTurbulenceCategory>>,

    pub is_interesting: Option<BoolFilter>,
    pub is_military: Option<BoolFilter>,
    pub must_transmit_position: Option<BoolFilter>,

    pub bounds: Option<BoundsFilter>,
}

impl FilterPredicate {
    pub fn is_empty (&self)->bool {
        *self == FilterPredicate::default()
    }

    pub fn range_mut (&mut self, field: RangeField)->&mut Option<RangeFilter> {
        match field {
            RangeField::Altitude => &mut self.altitude,
            RangeField::Squawk => &mut self.squawk,
            RangeField::Distance => &mut self.distance,
        }
    }

    pub fn string_mut (&mut self, field: StringField)->&mut Option<StringFilter> {
        match field {
            StringField::Callsign => &mut self.callsign,
            StringField::Icao24 => &mut self.icao24,
            StringField::Registration => &mut self.registration,
            StringField::Operator => &mut self.operator,
            StringField::AircraftType => &mut self.aircraft_type,
            StringField::Country => &mut self.country,
            StringField::UserTag => &mut self.user_tag,
        }
    }

    pub fn bool_mut (&mut self, field: BoolField)->&mut Option<BoolFilter> {
        match field {
            BoolField::Interesting => &mut self.is_interesting,
            BoolField::Military => &mut self.is_military,
            BoolField::MustTransmitPosition => &mut self.must_transmit_position,
        }
    }

    /// does `record` pass all present sub-filters. `distance_km` is the distance of the record from the
    /// requesting browser (if both positions are known)
    pub fn passes (&self, record: &AircraftRecord, distance_km: Option<f64>)->bool {
        passes_range( &self.altitude, record.altitude.get().map( |a| a as f64))
        && passes_range( &self.squawk, record.squawk.get().map( |s| s as f64))
        && passes_range( &self.distance, distance_km)

        && passes_string( &self.callsign, &record.callsign)
        && self.icao24.as_ref().map_or( true, |f| f.passes( Some( record.icao24.to_hex().as_str())))
        && passes_string( &self.registration, &record.registration)
        && passes_string( &self.operator, &record.operator)
        && passes_string( &self.aircraft_type, &record.aircraft_type)
        && passes_string( &self.country, &record.country)
        && passes_string( &self.user_tag, &record.user_tag)

        && self.species.as_ref().map_or( true, |f| f.passes( record.species.get()))
        && self.engine_type.as_ref().map_or( true, |f| f.passes( record.engine_type.get()))
        && self.wtc.as_ref().map_or( true, |f| f.passes( record.wtc.get()))

        && self.is_interesting.as_ref().map_or( true, |f| f.passes( record.is_interesting.get()))
        && self.is_military.as_ref().map_or( true, |f| f.passes( record.is_military.get()))
        && self.must_transmit_position.as_ref().map_or( true, |f| f.passes( record.must_transmit_position.get()))

        && self.bounds.as_ref().map_or( true, |f| f.passes( record.last_position()))
    }
}

#[inline]
fn passes_range (filter: &Option<RangeFilter>, value: Option<f64>)->bool {
    filter.as_ref().map_or( true, |f| f.passes(value))
}

#[inline]
fn passes_string (filter: &Option<StringFilter>, value: &Tracked<String>)->bool {
    filter.as_ref().map_or( true, |f| f.passes( value.value().map( |s| s.as_str())))
}
