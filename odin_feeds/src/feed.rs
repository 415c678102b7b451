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

use std::sync::Arc;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use crate::{
    builder::TrustLevel,
    errors::{OdinFeedsError, Result},
    polar::PolarCoverageAggregator,
    snapshot::AircraftSnapshotStore,
    FeedConfig, FeedsConfig
};

/// the reserved id under which the flight simulator source is served
pub const FLIGHT_SIMULATOR_FEED_ID: i32 = -1;

/// a named, numbered source of live aircraft data. Feeds are created by the feed management and
/// only read by the aircraft list and polar plot services
pub struct Feed {
    unique_id: i32,
    name: String,
    is_visible: bool,       // invisible feeds are neither listed nor resolvable by clients
    local_only: bool,       // hidden from internet clients
    aircraft: AircraftSnapshotStore,
    polar: Option<PolarCoverageAggregator>,
}

impl Feed {
    pub fn new (unique_id: i32, name: impl ToString, is_visible: bool, aircraft: AircraftSnapshotStore)->Self {
        Feed { unique_id, name: name.to_string(), is_visible, local_only: false, aircraft, polar: None }
    }

    pub fn from_config (config: &FeedConfig, max_trail: usize, max_removed: usize)->Self {
        let aircraft = AircraftSnapshotStore::new( max_trail, max_removed);
        let polar = config.receiver.map( |receiver| PolarCoverageAggregator::new( receiver, &config.polar_slices));
        Feed {
            unique_id: config.id,
            name: config.name.clone(),
            is_visible: config.visible,
            local_only: config.local_only,
            aircraft,
            polar
        }
    }

    pub fn with_polar (mut self, polar: PolarCoverageAggregator)->Self {
        self.polar = Some(polar);
        self
    }

    pub fn with_local_only (mut self, local_only: bool)->Self {
        self.local_only = local_only;
        self
    }

    pub fn unique_id (&self)->i32 { self.unique_id }
    pub fn name (&self)->&str { self.name.as_str() }
    pub fn is_visible (&self)->bool { self.is_visible }
    pub fn is_local_only (&self)->bool { self.local_only }

    pub fn aircraft (&self)->&AircraftSnapshotStore { &self.aircraft }
    pub fn polar (&self)->Option<&PolarCoverageAggregator> { self.polar.as_ref() }

    pub fn is_accessible_to (&self, trust_level: TrustLevel)->bool {
        !self.local_only || trust_level == TrustLevel::Local
    }

    pub fn summary (&self)->FeedSummary {
        FeedSummary { unique_id: self.unique_id, name: self.name.clone(), has_polar_plot: self.polar.is_some() }
    }
}

/// what clients get to see about a feed
#[derive(Debug,Clone,PartialEq,Serialize)]
#[serde(rename_all="PascalCase")]
pub struct FeedSummary {
    pub unique_id: i32,
    pub name: String,
    pub has_polar_plot: bool,
}

/// the set of feeds known to the server, plus the optional flight simulator source
#[derive(Default)]
pub struct FeedRegistry {
    feeds: DashMap<i32,Arc<Feed>>,
    flight_simulator: RwLock<Option<Arc<Feed>>>,
}

impl FeedRegistry {
    pub fn new ()->Self { FeedRegistry::default() }

    pub fn from_config (config: &FeedsConfig)->Result<Self> {
        let registry = FeedRegistry::new();
        for fc in &config.feeds {
            registry.add_feed( Feed::from_config( fc, config.max_trail_points, config.removal_history))?;
        }
        if let Some(fc) = &config.flight_simulator {
            registry.set_flight_simulator_feed( Feed::from_config( fc, config.max_trail_points, config.removal_history));
        }
        Ok(registry)
    }

    //--- the feed management interface

    pub fn add_feed (&self, feed: Feed)->Result<Arc<Feed>> {
        let id = feed.unique_id;
        if id == FLIGHT_SIMULATOR_FEED_ID || self.feeds.contains_key(&id) {
            return Err( OdinFeedsError::DuplicateFeedError(id))
        }

        info!("adding feed {} '{}' (visible: {})", id, feed.name, feed.is_visible);
        let feed = Arc::new(feed);
        self.feeds.insert( id, feed.clone());
        Ok(feed)
    }

    pub fn remove_feed (&self, id: i32)->Result<Arc<Feed>> {
        self.feeds.remove(&id)
            .map( |(_,feed)| feed)
            .ok_or( OdinFeedsError::UnknownFeedError(id))
    }

    pub fn set_flight_simulator_feed (&self, feed: Feed)->Arc<Feed> {
        info!("setting flight simulator feed '{}'", feed.name);
        let feed = Arc::new(feed);
        *self.flight_simulator.write() = Some(feed.clone());
        feed
    }

    //--- the client interface

    /// all visible feeds ordered by id. The flight simulator source is never listed
    pub fn list_visible_feeds (&self)->Vec<Arc<Feed>> {
        let mut list: Vec<Arc<Feed>> = self.feeds.iter()
            .filter( |e| e.value().is_visible)
            .map( |e| e.value().clone())
            .collect();
        list.sort_by_key( |f| f.unique_id);
        list
    }

    /// look up feed. If `ignore_invisible` is set, invisible feeds are treated as if they would not exist.
    /// [`FLIGHT_SIMULATOR_FEED_ID`] resolves to the flight simulator feed (if any)
    pub fn get_feed_by_id (&self, id: i32, ignore_invisible: bool)->Option<Arc<Feed>> {
        if id == FLIGHT_SIMULATOR_FEED_ID {
            return self.flight_simulator.read().clone()
        }

        self.feeds.get(&id)
            .map( |e| e.value().clone())
            .filter( |f| f.is_visible || !ignore_invisible)
    }

    /// all feeds including invisible ones and the flight simulator, in no particular order. This is only for
    /// the ingestion side and must not be used to answer client requests
    pub fn all_feeds (&self)->Vec<Arc<Feed>> {
        let mut list: Vec<Arc<Feed>> = self.feeds.iter().map( |e| e.value().clone()).collect();
        if let Some(sim) = self.flight_simulator.read().as_ref() { list.push( sim.clone()) }
        list
    }

    pub fn len (&self)->usize { self.feeds.len() }

    pub fn is_empty (&self)->bool { self.feeds.is_empty() }
}
