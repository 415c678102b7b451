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

//! the HTTP surface. None of the routes fails on bad input - unknown or inaccessible feeds produce
//! null or empty responses so that polling clients keep running

use std::{net::SocketAddr, sync::Arc};
use axum::{
    extract::{connect_info::ConnectInfo, Path as AxumPath, RawQuery, State},
    routing::get,
    Json, Router
};
use bytes::Bytes;
use serde::Serialize;
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{debug,info};

use crate::{
    builder::{AircraftListDelta, AircraftListSnapshotBuilder, TrustLevel},
    errors::Result,
    feed::{Feed, FeedRegistry, FeedSummary, FLIGHT_SIMULATOR_FEED_ID},
    polar::PolarPlotSnapshot,
    request::{AircraftListArgs, RequestParams, FEED_ID},
    FeedsConfig, ServerConfig
};

/// shared state of all route handlers
#[derive(Clone)]
pub struct FeedsState {
    registry: Arc<FeedRegistry>,
    builder: Arc<AircraftListSnapshotBuilder>,
    internet_client_can_show_polar_plots: bool,
}

impl FeedsState {
    pub fn new (registry: Arc<FeedRegistry>, builder: AircraftListSnapshotBuilder, internet_client_can_show_polar_plots: bool)->Self {
        FeedsState { registry, builder: Arc::new(builder), internet_client_can_show_polar_plots }
    }

    pub fn from_config (config: &FeedsConfig)->Result<Self> {
        let registry = Arc::new( FeedRegistry::from_config( config)?);
        let builder = AircraftListSnapshotBuilder::new( config.internet_redactions);
        Ok( FeedsState::new( registry, builder, config.internet_client_can_show_polar_plots))
    }

    pub fn registry (&self)->&Arc<FeedRegistry> { &self.registry }

    /// a feed the client could have discovered through the feed list
    fn listed_feed (&self, id: i32, trust_level: TrustLevel)->Option<Arc<Feed>> {
        if id == FLIGHT_SIMULATOR_FEED_ID { return None }
        self.registry.get_feed_by_id( id, true).filter( |f| f.is_accessible_to( trust_level))
    }

    /// the feed an aircraft list request refers to. Requests without feed id get the first listed feed
    fn aircraft_list_feed (&self, id: Option<i32>, trust_level: TrustLevel)->Option<Arc<Feed>> {
        match id {
            Some(id) => self.registry.get_feed_by_id( id, true).filter( |f| f.is_accessible_to( trust_level)),
            None => self.registry.list_visible_feeds().into_iter().find( |f| f.is_accessible_to( trust_level))
        }
    }
}

#[derive(Debug,Serialize)]
#[serde(rename_all="PascalCase")]
pub struct PolarPlotResponse {
    pub feed_id: Option<i32>,
    pub slices: PolarPlotSnapshot,
}

pub fn build_router (state: FeedsState)->Router {
    Router::new()
        .route( "/feeds", get( list_feeds))
        .route( "/feeds/{id}", get( get_feed))
        .route( "/feeds/polar-plot/{feed_id}", get( get_polar_plot))
        .route( "/feeds/aircraft-list", get( aircraft_list).post( aircraft_list))
        .route( "/feeds/aircraft-list/{feed_id}", get( aircraft_list_for_feed).post( aircraft_list_for_feed))

        // legacy routes
        .route( "/AircraftList.json", get( aircraft_list).post( aircraft_list))
        .route( "/FlightSimList.json", get( flight_sim_list).post( flight_sim_list))
        .route( "/PolarPlot.json", get( legacy_polar_plot))

        .with_state( state)
}

/// run the server as a tokio task. The task only terminates on server errors
pub fn spawn_server_task (config: &ServerConfig, router: Router)->JoinHandle<Result<()>> {
    tokio::spawn( serve( config.sock_addr, router))
}

async fn serve (sock_addr: SocketAddr, router: Router)->Result<()> {
    let listener = TcpListener::bind( sock_addr).await?;
    info!("serving feeds on http://{}", sock_addr);
    axum::serve( listener, router.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

/* #region handlers *************************************************************************/

async fn list_feeds (State(state): State<FeedsState>, ConnectInfo(addr): ConnectInfo<SocketAddr>)->Json<Vec<FeedSummary>> {
    let trust_level = TrustLevel::from_ip( &addr.ip());
    let list = state.registry.list_visible_feeds().iter()
        .filter( |f| f.is_accessible_to( trust_level))
        .map( |f| f.summary())
        .collect();
    Json(list)
}

/// invisible, inaccessible and unknown feeds all produce a JSON null
async fn get_feed (State(state): State<FeedsState>, ConnectInfo(addr): ConnectInfo<SocketAddr>, AxumPath(id): AxumPath<String>)->Json<Option<FeedSummary>> {
    let trust_level = TrustLevel::from_ip( &addr.ip());
    let summary = id.trim().parse::<i32>().ok()
        .and_then( |id| state.listed_feed( id, trust_level))
        .map( |f| f.summary());
    Json(summary)
}

async fn get_polar_plot (State(state): State<FeedsState>, ConnectInfo(addr): ConnectInfo<SocketAddr>, AxumPath(feed_id): AxumPath<String>)->Json<PolarPlotResponse> {
    let feed_id = feed_id.trim().parse::<i32>().ok();
    Json( polar_plot_response( &state, feed_id, TrustLevel::from_ip( &addr.ip())))
}

async fn legacy_polar_plot (State(state): State<FeedsState>, ConnectInfo(addr): ConnectInfo<SocketAddr>, RawQuery(query): RawQuery)->Json<PolarPlotResponse> {
    let params = RequestParams::from_query( query.as_deref());
    let feed_id = params.get_parsed::<i32>( FEED_ID);
    Json( polar_plot_response( &state, feed_id, TrustLevel::from_ip( &addr.ip())))
}

fn polar_plot_response (state: &FeedsState, feed_id: Option<i32>, trust_level: TrustLevel)->PolarPlotResponse {
    let is_permitted = state.internet_client_can_show_polar_plots || !trust_level.is_internet();

    let slices = feed_id
        .filter( |_| is_permitted)
        .and_then( |id| state.listed_feed( id, trust_level))
        .and_then( |f| f.polar().map( |p| p.snapshot()))
        .unwrap_or_default();

    PolarPlotResponse{ feed_id, slices }
}

async fn aircraft_list (State(state): State<FeedsState>, ConnectInfo(addr): ConnectInfo<SocketAddr>, RawQuery(query): RawQuery, body: Bytes)->Json<AircraftListDelta> {
    Json( aircraft_list_response( &state, addr, None, false, query.as_deref(), &body))
}

async fn aircraft_list_for_feed (State(state): State<FeedsState>, ConnectInfo(addr): ConnectInfo<SocketAddr>, AxumPath(feed_id): AxumPath<String>,
                                 RawQuery(query): RawQuery, body: Bytes)->Json<AircraftListDelta> {
    // an unparseable path id is an unknown feed, not a request for the default feed
    let feed_id = feed_id.trim().parse::<i32>().unwrap_or( i32::MIN);
    Json( aircraft_list_response( &state, addr, Some(feed_id), false, query.as_deref(), &body))
}

async fn flight_sim_list (State(state): State<FeedsState>, ConnectInfo(addr): ConnectInfo<SocketAddr>, RawQuery(query): RawQuery, body: Bytes)->Json<AircraftListDelta> {
    Json( aircraft_list_response( &state, addr, None, true, query.as_deref(), &body))
}

fn aircraft_list_response (state: &FeedsState, addr: SocketAddr, route_feed_id: Option<i32>, flight_simulator: bool, query: Option<&str>, body: &[u8])->AircraftListDelta {
    let trust_level = TrustLevel::from_ip( &addr.ip());
    let params = RequestParams::from_parts( query, body);
    let args = AircraftListArgs::from_params( &params, route_feed_id, flight_simulator, trust_level);

    match state.aircraft_list_feed( args.feed_id, trust_level) {
        Some(feed) => state.builder.build( &feed, args.previous_version, args.filter.as_ref(), &args.client),
        None => {
            debug!("aircraft list request from {} for unavailable feed {:?}", addr, args.feed_id);
            AircraftListDelta::empty( args.feed_id.unwrap_or_default())
        }
    }
}

/* #endregion handlers */
