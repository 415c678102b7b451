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

//! live aircraft feeds served through a versioned, differential aircraft list protocol with
//! compact `F*` filter parameters, plus per-feed receiver coverage (polar plot) aggregation.
//!
//! Aircraft records are populated through [`snapshot::AircraftSnapshotStore::update`] by whatever
//! ingests the feed data, clients poll through the routes of [`service::build_router`].

use std::{net::SocketAddr, path::Path};
use serde::{Serialize,Deserialize};

pub mod errors;
use errors::{config_error, Result};

pub mod geo;
pub mod aircraft;
pub mod snapshot;
pub mod filter;
pub mod polar;
pub mod feed;
pub mod builder;
pub mod request;
pub mod service;

use geo::LatLon;
use polar::{AltitudeRange, default_slices};
use builder::Redactions;
use snapshot::{DEFAULT_MAX_TRAIL, DEFAULT_REMOVAL_HISTORY};

pub use feed::{Feed, FeedRegistry, FLIGHT_SIMULATOR_FEED_ID};
pub use builder::{AircraftListSnapshotBuilder, ClientContext, TrustLevel};
pub use filter::{FilterPredicate, decode_filter};
pub use service::{FeedsState, build_router, spawn_server_task};

#[derive(Deserialize,Serialize,Debug,Clone)]
pub struct ServerConfig {
    pub sock_addr: SocketAddr,
}

impl ServerConfig {
    pub fn url (&self)->String { format!("http://{}", self.sock_addr) }
}

/// configuration of a single feed
#[derive(Deserialize,Serialize,Debug,Clone)]
pub struct FeedConfig {
    pub id: i32,
    pub name: String,

    #[serde(default="default_true")]
    pub visible: bool,

    #[serde(default)]
    pub local_only: bool, // feed is not accessible for internet clients

    #[serde(default)]
    pub receiver: Option<LatLon>, // if set the feed has a polar plot

    #[serde(default="default_slices")]
    pub polar_slices: Vec<AltitudeRange>,
}

impl FeedConfig {
    pub fn new (id: i32, name: impl ToString)->Self {
        FeedConfig { id, name: name.to_string(), visible: true, local_only: false, receiver: None, polar_slices: default_slices() }
    }
}

#[derive(Deserialize,Serialize,Debug,Clone)]
pub struct FeedsConfig {
    pub server: ServerConfig,

    #[serde(default)]
    pub internet_client_can_show_polar_plots: bool,

    #[serde(default)]
    pub internet_redactions: Redactions,

    #[serde(default="default_max_trail")]
    pub max_trail_points: usize,

    #[serde(default="default_removal_history")]
    pub removal_history: usize,

    #[serde(default)]
    pub feeds: Vec<FeedConfig>,

    #[serde(default)]
    pub flight_simulator: Option<FeedConfig>,
}

fn default_true ()->bool { true }
fn default_max_trail ()->usize { DEFAULT_MAX_TRAIL }
fn default_removal_history ()->usize { DEFAULT_REMOVAL_HISTORY }

/// read RON config from file
pub fn load_config<P: AsRef<Path>> (path: P)->Result<FeedsConfig> {
    let data = std::fs::read_to_string( path.as_ref())?;
    parse_config( &data)
}

pub fn parse_config (src: &str)->Result<FeedsConfig> {
    let config: FeedsConfig = ron::from_str( src)?;
    config.check()?;
    Ok(config)
}

impl FeedsConfig {
    /// the things serde can't check for us
    pub fn check (&self)->Result<()> {
        for fc in &self.feeds {
            if fc.id == FLIGHT_SIMULATOR_FEED_ID {
                return Err( config_error( format!("feed '{}' uses reserved id {}", fc.name, FLIGHT_SIMULATOR_FEED_ID)))
            }
        }
        for fc in self.feeds.iter().chain( self.flight_simulator.iter()) {
            if let Some(r) = fc.polar_slices.iter().find( |r| r.lower > r.higher) {
                return Err( config_error( format!("feed '{}' has empty polar slice {}..{}", fc.name, r.lower, r.higher)))
            }
            if fc.receiver.is_some_and( |p| !p.is_valid()) {
                return Err( config_error( format!("feed '{}' has invalid receiver position", fc.name)))
            }
        }
        Ok(())
    }
}
