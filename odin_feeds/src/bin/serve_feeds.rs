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

use std::time::Duration;
use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{debug,info};
use tracing_subscriber::EnvFilter;
use odin_feeds::{build_router, load_config, spawn_server_task, FeedsState};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "serve aircraft lists and polar plots of configured live feeds")]
pub struct Args {
    /// seconds after which aircraft without updates are removed (0: never)
    #[arg(long, default_value_t = 60)]
    pub max_age: u64,

    /// path of the RON config file
    #[arg(default_value = "odin_feeds/configs/odin_feeds.ron")]
    pub config: String,
}

#[tokio::main]
async fn main()->Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())  // use RUST_LOG to set max level
        .init();

    let args = Args::parse();
    let config = load_config( &args.config)?;
    let state = FeedsState::from_config( &config)?;
    info!("loaded {} feeds from {}", state.registry().len(), args.config);

    if args.max_age > 0 {
        let registry = state.registry().clone();
        let max_age = Duration::from_secs( args.max_age);

        tokio::spawn( async move {
            let mut interval = tokio::time::interval( Duration::from_secs(5));
            loop {
                interval.tick().await;
                for feed in registry.all_feeds() {
                    let (version,n_removed) = feed.aircraft().update( |txn| txn.expire( Utc::now(), max_age));
                    if n_removed > 0 {
                        debug!("removed {} stale aircraft from feed {} (now v{})", n_removed, feed.unique_id(), version);
                    }
                }
            }
        });
    }

    let server_task = spawn_server_task( &config.server, build_router( state));
    server_task.await??;

    Ok(())
}
