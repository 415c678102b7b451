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

//! minimal spherical earth geometry for distance-from-browser and receiver bearing computation.
//! Accuracy of the mean earth radius model is sufficient for display ranges and coverage plots

use std::fmt;
use serde::{Serialize,Deserialize};

pub const MEAN_EARTH_RADIUS_KM: f64 = 6371.0088;

#[derive(Debug,Clone,Copy,PartialEq,Serialize,Deserialize)]
pub struct LatLon {
    pub lat: f64, // degrees, north positive
    pub lon: f64, // degrees, east positive
}

impl LatLon {
    pub fn new (lat: f64, lon: f64)->Self { LatLon{lat,lon} }

    /// haversine great circle distance in km
    pub fn distance_km (&self, other: &LatLon)->f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let dphi = (other.lat - self.lat).to_radians();
        let dlambda = (other.lon - self.lon).to_radians();

        let a = (dphi/2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda/2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2( (1.0 - a).sqrt());
        MEAN_EARTH_RADIUS_KM * c
    }

    /// initial great circle bearing from self to other in degrees [0..360)
    pub fn bearing_to (&self, other: &LatLon)->f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let dlambda = (other.lon - self.lon).to_radians();

        let y = dlambda.sin() * phi2.cos();
        let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
        let deg = y.atan2(x).to_degrees();
        if deg < 0.0 { deg + 360.0 } else { deg }
    }

    pub fn is_valid (&self)->bool {
        self.lat.is_finite() && self.lon.is_finite() && self.lat.abs() <= 90.0 && self.lon.abs() <= 180.0
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!( f, "({:.5},{:.5})", self.lat, self.lon)
    }
}
