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

use std::{collections::BTreeMap, sync::Arc};
use parking_lot::{Mutex,RwLock};
use serde::{Serialize,Deserialize,Serializer};

use crate::geo::LatLon;

/// the farthest reception sample for a given bearing within an altitude slice
#[derive(Debug,Clone,Copy,PartialEq,Serialize)]
#[serde(rename_all="PascalCase")]
pub struct PolarPlot {
    pub bearing: u16,   // integer compass degrees 0..359
    pub altitude: i32,  // feet
    pub distance: f64,  // km from receiver
    pub latitude: f64,
    pub longitude: f64,
}

/// altitude band boundaries (inclusive, feet)
#[derive(Debug,Clone,Copy,PartialEq,Eq,Serialize,Deserialize)]
pub struct AltitudeRange {
    pub lower: i32,
    pub higher: i32,
}

impl AltitudeRange {
    pub fn new (lower: i32, higher: i32)->Self { AltitudeRange{lower,higher} }

    pub fn contains (&self, altitude: i32)->bool { altitude >= self.lower && altitude <= self.higher }
}

/// the default slices: all altitudes, then 10,000ft bands up to 30,000ft and everything above
pub fn default_slices ()->Vec<AltitudeRange> {
    vec![
        AltitudeRange::new( i32::MIN, i32::MAX),
        AltitudeRange::new( i32::MIN, 9_999),
        AltitudeRange::new( 10_000, 19_999),
        AltitudeRange::new( 20_000, 29_999),
        AltitudeRange::new( 30_000, i32::MAX),
    ]
}

#[derive(Debug,Clone,PartialEq,Serialize)]
pub struct PolarSlice {
    #[serde(rename="StartAltitude")]
    pub altitude_lower: i32,

    #[serde(rename="FinishAltitude")]
    pub altitude_higher: i32,

    #[serde(rename="Plots", serialize_with="serialize_plots")]
    pub plots: BTreeMap<u16,PolarPlot>, // bearing -> plot
}

fn serialize_plots<S> (plots: &BTreeMap<u16,PolarPlot>, serializer: S)->Result<S::Ok,S::Error> where S: Serializer {
    serializer.collect_seq( plots.values())
}

impl PolarSlice {
    pub fn new (range: AltitudeRange)->Self {
        PolarSlice{ altitude_lower: range.lower, altitude_higher: range.higher, plots: BTreeMap::new() }
    }

    pub fn range (&self)->AltitudeRange { AltitudeRange::new( self.altitude_lower, self.altitude_higher) }

    /// keep the plot with the longest distance per bearing. Returns true if `plot` was stored
    fn add (&mut self, plot: PolarPlot)->bool {
        match self.plots.get(&plot.bearing) {
            Some(existing) if existing.distance >= plot.distance => false,
            _ => {
                self.plots.insert( plot.bearing, plot);
                true
            }
        }
    }
}

/// point-in-time copy of all slices of an aggregator
pub type PolarPlotSnapshot = Arc<Vec<PolarSlice>>;

/// accumulates bearing/altitude reception samples of a single receiver.
///
/// The slice vector is published as an `Arc` that readers clone. Writers are serialized, build the modified
/// copy without blocking readers and only take the write lock to swap the published pointer
pub struct PolarCoverageAggregator {
    receiver: LatLon,
    slices: RwLock<PolarPlotSnapshot>,
    writer: Mutex<()>,
}

impl PolarCoverageAggregator {
    pub fn new (receiver: LatLon, ranges: &[AltitudeRange])->Self {
        let slices: Vec<PolarSlice> = ranges.iter().map( |r| PolarSlice::new(*r)).collect();
        PolarCoverageAggregator{ receiver, slices: RwLock::new( Arc::new(slices)), writer: Mutex::new(()) }
    }

    pub fn receiver (&self)->LatLon { self.receiver }

    pub fn snapshot (&self)->PolarPlotSnapshot {
        self.slices.read().clone()
    }

    /// add the position of a received aircraft. Bearing and distance are computed relative to the receiver.
    /// Returns the number of slices that were updated
    pub fn add_sample (&self, position: LatLon, altitude: i32)->usize {
        if !position.is_valid() { return 0 }

        let distance = self.receiver.distance_km(&position);
        let bearing = (self.receiver.bearing_to(&position).round() as u16) % 360;
        self.add_plot( PolarPlot{ bearing, altitude, distance, latitude: position.lat, longitude: position.lon })
    }

    /// add a pre-computed plot to all slices whose altitude range contains its altitude
    pub fn add_plot (&self, plot: PolarPlot)->usize {
        if plot.bearing >= 360 || !plot.distance.is_finite() { return 0 }

        let _guard = self.writer.lock();
        let current = self.snapshot();
        if !current.iter().any( |s| s.range().contains( plot.altitude) && s.plots.get(&plot.bearing).map_or( true, |p| p.distance < plot.distance)) {
            return 0 // don't copy the slices if nothing changes
        }

        let mut slices: Vec<PolarSlice> = current.as_ref().clone();
        drop(current);
        let n_added = slices.iter_mut()
            .filter( |s| s.range().contains( plot.altitude))
            .map( |s| s.add(plot))
            .filter( |is_added| *is_added)
            .count();

        *self.slices.write() = Arc::new(slices);
        n_added
    }

    pub fn clear (&self) {
        let _guard = self.writer.lock();
        let cleared: Vec<PolarSlice> = self.snapshot().iter().map( |s| PolarSlice::new( s.range())).collect();
        *self.slices.write() = Arc::new(cleared);
    }
}
