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

//! request parameter handling for the aircraft list and polar plot routes. Both the current and the legacy
//! parameter names are accepted, all parameter names are case-insensitive and values that do not parse
//! are treated as if the parameter was not given

use std::collections::{BTreeMap,HashSet};
use url::form_urlencoded;

use crate::{
    aircraft::{DataVersion, Icao24},
    builder::{ClientContext, TrustLevel},
    feed::FLIGHT_SIMULATOR_FEED_ID,
    filter::{FilterPredicate, decode_filter},
    geo::LatLon
};

// current name first, legacy alias second
pub const FEED_ID: &[&str] = &["feedid", "feed"];
pub const LATITUDE: &[&str] = &["latitude", "lat"];
pub const LONGITUDE: &[&str] = &["longitude", "lng"];
pub const LAST_DATA_VERSION: &[&str] = &["lastdataversion", "ldv"];
pub const SERVER_TICKS: &[&str] = &["serverticks", "stm"];
pub const RESEND_TRAILS: &[&str] = &["resendtrails", "refreshtrails"];
pub const SELECTED_AIRCRAFT: &[&str] = &["selectedaircraft", "selac"];
pub const FLIGHT_SIMULATOR: &[&str] = &["flightsimulator"];
pub const KNOWN_AIRCRAFT: &[&str] = &["icaos"];

/// merged query and form body parameters. Keys are stored in lower case, body values override query values
#[derive(Debug,Clone,Default,PartialEq)]
pub struct RequestParams {
    params: BTreeMap<String,String>,
}

impl RequestParams {
    /// `body` is expected to be `application/x-www-form-urlencoded` (which is what legacy clients post)
    pub fn from_parts (query: Option<&str>, body: &[u8])->Self {
        let mut params = BTreeMap::new();

        if let Some(query) = query {
            for (k,v) in form_urlencoded::parse( query.as_bytes()) {
                params.insert( k.to_lowercase(), v.into_owned());
            }
        }
        for (k,v) in form_urlencoded::parse( body) {
            params.insert( k.to_lowercase(), v.into_owned());
        }

        RequestParams{ params }
    }

    pub fn from_query (query: Option<&str>)->Self { Self::from_parts( query, &[]) }

    /// value of the first of `names` that is present
    pub fn get (&self, names: &[&str])->Option<&str> {
        names.iter().find_map( |name| self.params.get(*name)).map( |v| v.as_str())
    }

    pub fn get_parsed<T: std::str::FromStr> (&self, names: &[&str])->Option<T> {
        self.get(names).and_then( |v| v.trim().parse::<T>().ok())
    }

    pub fn get_flag (&self, names: &[&str])->bool {
        self.get(names).is_some_and( parse_flag)
    }

    pub fn iter (&self)->impl Iterator<Item=(&str,&str)> {
        self.params.iter().map( |(k,v)| (k.as_str(), v.as_str()))
    }

    pub fn len (&self)->usize { self.params.len() }

    pub fn is_empty (&self)->bool { self.params.is_empty() }
}

/// "1", "true", "on" and "yes" in any case
fn parse_flag (value: &str)->bool {
    let value = value.trim();
    value == "1" || ["true","on","yes"].iter().any( |s| value.eq_ignore_ascii_case(s))
}

/// everything the aircraft list builder needs to know about a request
#[derive(Debug,Clone)]
pub struct AircraftListArgs {
    pub feed_id: Option<i32>,                  // None: use the default feed
    pub previous_version: Option<DataVersion>, // None: client has no state yet
    pub filter: Option<FilterPredicate>,
    pub client: ClientContext,
}

impl AircraftListArgs {
    /// `route_feed_id` is the id given as path segment (if any), which takes precedence over parameters.
    /// Requests for the flight simulator (either through route or parameter) always refer to the
    /// flight simulator feed
    pub fn from_params (params: &RequestParams, route_feed_id: Option<i32>, flight_simulator_route: bool, trust_level: TrustLevel)->Self {
        let flight_simulator = flight_simulator_route || params.get_flag( FLIGHT_SIMULATOR);

        let feed_id = if flight_simulator {
            Some( FLIGHT_SIMULATOR_FEED_ID)
        } else {
            route_feed_id.or_else( || params.get_parsed::<i32>( FEED_ID))
        };

        // legacy clients send -1 if they don't have a version yet
        let previous_version = params.get_parsed::<i64>( LAST_DATA_VERSION)
            .and_then( |v| DataVersion::try_from(v).ok());

        let browser_location = match (params.get_parsed::<f64>( LATITUDE), params.get_parsed::<f64>( LONGITUDE)) {
            (Some(lat), Some(lon)) => Some( LatLon::new( lat, lon)).filter( |p| p.is_valid()),
            _ => None
        };

        let mut client = ClientContext::new( trust_level);
        client.browser_location = browser_location;
        client.selected_aircraft = params.get_parsed::<u32>( SELECTED_AIRCRAFT).and_then( Icao24::new);
        client.resend_trails = params.get_flag( RESEND_TRAILS);
        client.flight_simulator = flight_simulator;
        client.known_aircraft = params.get( KNOWN_AIRCRAFT).map( parse_known_aircraft);
        client.server_ticks = params.get_parsed::<i64>( SERVER_TICKS);

        AircraftListArgs {
            feed_id,
            previous_version,
            filter: decode_filter( params.iter()),
            client
        }
    }
}

/// '-' separated hex addresses, invalid entries are skipped
pub fn parse_known_aircraft (value: &str)->HashSet<Icao24> {
    value.split('-')
        .filter( |s| !s.trim().is_empty())
        .filter_map( |s| s.parse::<Icao24>().ok())
        .collect()
}
