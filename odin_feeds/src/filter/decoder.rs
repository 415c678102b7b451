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

//! decoder for the compact filter parameter grammar of aircraft list requests:
//!
//! ```text
//!   key   := 'F' field-token condition ['N']
//!   value := number | string | bool | enum-discriminant
//! ```
//!
//! The first three key characters select the field, the key then has to continue with the complete
//! field token (e.g. `FALT`, `FCALL`) and end in a single condition code, optionally followed by `N` for
//! negation. Condition codes are `L`/`U` (lower/upper range bound), `S`/`E`/`C`/`Q` (starts-with,
//! ends-with, contains, equals). Boolean and enumeration fields only accept `Q`.
//! The geographic bounding box is set from the four keys `FNBnd`, `FSBnd`, `FWBnd` and `FEBnd`.
//!
//! Decoding never fails - keys or values that don't fit are skipped, partially specified bounding
//! boxes are dropped. All key comparison is case-insensitive.

use std::collections::{BTreeMap,HashMap};
use lazy_static::lazy_static;
use tracing::trace;

use crate::aircraft::{EngineType, Species, WakeTurbulenceCategory};
use super::{
    BoolField, BoolFilter, BoundsFilter, EnumField, EnumFilter, FilterCondition, FilterPredicate,
    RangeField, RangeFilter, StringField, StringFilter
};

#[derive(Debug,Clone,Copy,PartialEq,Eq)]
enum FieldKind {
    Range(RangeField),
    String(StringField),
    Bool(BoolField),
    Enum(EnumField),
}

#[derive(Debug)]
struct FilterField {
    prefix: &'static str, // upper case, 3 chars
    token: &'static str,  // upper case full token
    kind: FieldKind,
}

const FILTER_FIELDS: &[FilterField] = &[
    FilterField{ prefix: "FAL", token: "FALT",   kind: FieldKind::Range( RangeField::Altitude) },
    FilterField{ prefix: "FSQ", token: "FSQK",   kind: FieldKind::Range( RangeField::Squawk) },
    FilterField{ prefix: "FDS", token: "FDST",   kind: FieldKind::Range( RangeField::Distance) },

    FilterField{ prefix: "FCA", token: "FCALL",  kind: FieldKind::String( StringField::Callsign) },
    FilterField{ prefix: "FIC", token: "FICO",   kind: FieldKind::String( StringField::Icao24) },
    FilterField{ prefix: "FRE", token: "FREG",   kind: FieldKind::String( StringField::Registration) },
    FilterField{ prefix: "FOP", token: "FOP",    kind: FieldKind::String( StringField::Operator) },
    FilterField{ prefix: "FTY", token: "FTYP",   kind: FieldKind::String( StringField::AircraftType) },
    FilterField{ prefix: "FCO", token: "FCOU",   kind: FieldKind::String( StringField::Country) },
    FilterField{ prefix: "FUT", token: "FUT",    kind: FieldKind::String( StringField::UserTag) },

    FilterField{ prefix: "FIN", token: "FINT",   kind: FieldKind::Bool( BoolField::Interesting) },
    FilterField{ prefix: "FMI", token: "FMIL",   kind: FieldKind::Bool( BoolField::Military) },
    FilterField{ prefix: "FNO", token: "FNOPOS", kind: FieldKind::Bool( BoolField::MustTransmitPosition) },

    FilterField{ prefix: "FSP", token: "FSPC",   kind: FieldKind::Enum( EnumField::Species) },
    FilterField{ prefix: "FEG", token: "FEGT",   kind: FieldKind::Enum( EnumField::EngineType) },
    FilterField{ prefix: "FWT", token: "FWTC",   kind: FieldKind::Enum( EnumField::WakeTurbulenceCategory) },
];

lazy_static! {
    static ref FIELD_TABLE: HashMap<&'static str,&'static FilterField> = {
        FILTER_FIELDS.iter().map( |f| (f.prefix, f)).collect()
    };
}

const NORTH_BOUND_KEY: &str = "FNBND";
const SOUTH_BOUND_KEY: &str = "FSBND";
const WEST_BOUND_KEY: &str = "FWBND";
const EAST_BOUND_KEY: &str = "FEBND";

/// decode filter predicate from request parameters. Non-filter parameters are ignored.
/// Returns `None` if no sub-filter could be decoded
pub fn decode_filter<I,K,V> (params: I)->Option<FilterPredicate>
    where I: IntoIterator<Item=(K,V)>, K: AsRef<str>, V: AsRef<str>
{
    // process in key order so that conflicting keys for the same field always resolve the same way
    let keys: BTreeMap<String,String> = params.into_iter()
        .filter( |(k,_)| is_filter_key( k.as_ref()))
        .map( |(k,v)| (k.as_ref().to_ascii_uppercase(), v.as_ref().to_string()))
        .collect();

    let mut predicate = FilterPredicate::default();
    let mut bounds: [Option<f64>;4] = [None; 4];

    for (key,value) in &keys {
        match key.as_str() {
            NORTH_BOUND_KEY => bounds[0] = parse_number(value),
            WEST_BOUND_KEY => bounds[1] = parse_number(value),
            SOUTH_BOUND_KEY => bounds[2] = parse_number(value),
            EAST_BOUND_KEY => bounds[3] = parse_number(value),
            _ => {
                if !decode_key( &mut predicate, key, value) {
                    trace!("ignoring filter parameter {key}={value}");
                }
            }
        }
    }

    if let [Some(north), Some(west), Some(south), Some(east)] = bounds {
        predicate.bounds = Some( BoundsFilter::new( north, west, south, east));
    }

    if predicate.is_empty() { None } else { Some(predicate) }
}

pub fn is_filter_key (key: &str)->bool {
    key.len() > 3 && key.starts_with( ['F','f'])
}

/// decode a single (upper case) key/value pair into `predicate`. Returns false if the pair was skipped
fn decode_key (predicate: &mut FilterPredicate, key: &str, value: &str)->bool {
    let Some(field) = key.get(..3).and_then( |prefix| FIELD_TABLE.get(prefix)) else { return false };
    let Some((code,reverse_condition)) = key.strip_prefix( field.token).and_then( split_condition) else { return false };

    match field.kind {
        FieldKind::Range(rf) => decode_range( predicate.range_mut(rf), code, reverse_condition, value),
        FieldKind::String(sf) => decode_string( predicate.string_mut(sf), code, reverse_condition, value),
        FieldKind::Bool(bf) => decode_bool( predicate.bool_mut(bf), code, reverse_condition, value),
        FieldKind::Enum(ef) => decode_enum( predicate, ef, code, reverse_condition, value),
    }
}

/// split key remainder into condition code and negation flag: "Q" -> ('Q',false), "QN" -> ('Q',true)
fn split_condition (suffix: &str)->Option<(char,bool)> {
    let mut chars = suffix.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(code), None, None) => Some( (code,false) ),
        (Some(code), Some('N'), None) => Some( (code,true) ),
        _ => None
    }
}

fn decode_range (slot: &mut Option<RangeFilter>, code: char, reverse_condition: bool, value: &str)->bool {
    let is_lower = match code {
        'L' => true,
        'U' => false,
        _ => return false
    };
    let Some(v) = parse_number(value) else { return false };

    // lower and upper bound keys accumulate into the same filter
    let filter = slot.get_or_insert_with( RangeFilter::default);
    if is_lower { filter.lower = Some(v) } else { filter.upper = Some(v) }
    filter.reverse_condition |= reverse_condition;
    true
}

fn decode_string (slot: &mut Option<StringFilter>, code: char, reverse_condition: bool, value: &str)->bool {
    let condition = match code {
        'S' => FilterCondition::StartsWith,
        'E' => FilterCondition::EndsWith,
        'C' => FilterCondition::Contains,
        'Q' => FilterCondition::Equals,
        _ => return false
    };
    *slot = Some( StringFilter::new( condition, value, reverse_condition));
    true
}

fn decode_bool (slot: &mut Option<BoolFilter>, code: char, reverse_condition: bool, value: &str)->bool {
    if code != 'Q' { return false }
    *slot = Some( BoolFilter{ value: parse_bool(value), reverse_condition });
    true
}

fn decode_enum (predicate: &mut FilterPredicate, field: EnumField, code: char, reverse_condition: bool, value: &str)->bool {
    if code != 'Q' { return false }
    let Ok(n) = value.trim().parse::<i32>() else { return false };

    let decoded = match field {
        EnumField::Species => Species::from_repr(n)
            .map( |value| predicate.species = Some( EnumFilter{ value, reverse_condition })),
        EnumField::EngineType => EngineType::from_repr(n)
            .map( |value| predicate.engine_type = Some( EnumFilter{ value, reverse_condition })),
        EnumField::WakeTurbulenceCategory => WakeTurbulenceCategory::from_repr(n)
            .map( |value| predicate.wtc = Some( EnumFilter{ value, reverse_condition })),
    };
    decoded.is_some() // undefined discriminants drop the filter
}

/// culture invariant (decimal point) floating point or integer value
fn parse_number (value: &str)->Option<f64> {
    value.trim().parse::<f64>().ok().filter( |v| v.is_finite())
}

/// "0" and "false" (any case) are false, everything else is true
fn parse_bool (value: &str)->bool {
    let value = value.trim();
    !(value == "0" || value.eq_ignore_ascii_case("false"))
}
