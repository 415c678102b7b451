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

//! per-feed aircraft state as a sequence of immutable, version stamped [`AircraftSnapshot`] values.
//!
//! There is exactly one writer per feed (the ingestion path), which mutates a private copy of the
//! current snapshot inside a [`SnapshotTxn`] and then publishes the result with a single pointer
//! swap. Readers (aircraft list requests) only clone the published `Arc` and hence never observe
//! partial updates, and never hold up the writer for more than that swap.
//! Untouched records are shared between consecutive snapshots.

use std::{collections::{HashMap,VecDeque}, sync::Arc, time::Duration};
use chrono::{DateTime,Utc};
use parking_lot::{Mutex,RwLock};
use tracing::{debug,trace};

use crate::aircraft::{AircraftRecord, DataVersion, Icao24, RecordWriter};

pub const DEFAULT_MAX_TRAIL: usize = 64;
pub const DEFAULT_REMOVAL_HISTORY: usize = 4096;

/// the immutable state of a feed at a given DataVersion
#[derive(Debug,Clone,Default)]
pub struct AircraftSnapshot {
    data_version: DataVersion,
    reset_version: DataVersion,   // version of the last reset, clients below have to do a full refresh
    history_horizon: DataVersion, // removals before this version were dropped from history
    aircraft: HashMap<Icao24,Arc<AircraftRecord>>,
    removed: VecDeque<(Icao24,DataVersion)>, // ordered by version
}

impl AircraftSnapshot {
    pub fn data_version (&self)->DataVersion { self.data_version }

    pub fn reset_version (&self)->DataVersion { self.reset_version }

    pub fn len (&self)->usize { self.aircraft.len() }

    pub fn is_empty (&self)->bool { self.aircraft.is_empty() }

    pub fn get (&self, icao24: &Icao24)->Option<&AircraftRecord> {
        self.aircraft.get(icao24).map( |r| r.as_ref())
    }

    pub fn contains (&self, icao24: &Icao24)->bool { self.aircraft.contains_key(icao24) }

    pub fn aircraft (&self)->impl Iterator<Item=&AircraftRecord> {
        self.aircraft.values().map( |r| r.as_ref())
    }

    /// can a client that holds `version` be brought up to date with a delta? This is not the case if the
    /// feed was reset after `version`, if we already dropped removals the client might not know about, or if
    /// the version is from the future (e.g. the feed was re-created with a new store)
    pub fn can_update_from (&self, version: DataVersion)->bool {
        version >= self.reset_version && version >= self.history_horizon && version <= self.data_version
    }

    /// ids of aircraft that were removed after `version` and have not re-appeared since
    pub fn removed_since (&self, version: DataVersion)->impl Iterator<Item=Icao24> {
        self.removed.iter()
            .rev()
            .take_while( move |(_,v)| *v > version)
            .filter( move |(icao24,_)| !self.aircraft.contains_key(icao24))
            .map( |(icao24,_)| *icao24)
    }
}

/// single writer transaction on a private copy of the current snapshot
pub struct SnapshotTxn {
    snapshot: AircraftSnapshot,
    version: DataVersion, // the version this txn publishes if anything observable changed
    max_trail: usize,
    max_removed: usize,
    is_observable: bool,  // do we have to bump the version
    is_modified: bool,    // do we have to publish at all
}

impl SnapshotTxn {
    pub fn pending_version (&self)->DataVersion { self.version }

    pub fn get (&self, icao24: &Icao24)->Option<&AircraftRecord> { self.snapshot.get(icao24) }

    pub fn len (&self)->usize { self.snapshot.len() }

    /// update existing or insert new aircraft. New aircraft count as an observable change even if `f` does not set any attribute
    pub fn upsert<F> (&mut self, icao24: Icao24, now: DateTime<Utc>, f: F) where F: FnOnce(&mut RecordWriter) {
        let version = self.version;
        let is_new = !self.snapshot.aircraft.contains_key(&icao24);

        let entry = self.snapshot.aircraft.entry(icao24)
            .or_insert_with( || Arc::new( AircraftRecord::new( icao24, version, now)));
        let record = Arc::make_mut(entry); // clones the record only if a reader still holds the old snapshot

        let mut writer = RecordWriter::new( record, version, self.max_trail);
        writer.set_last_update( now);
        f(&mut writer);

        if writer.has_changed() || is_new {
            record.last_changed_version = version;
            self.is_observable = true;
        }
        self.is_modified = true;
    }

    pub fn remove (&mut self, icao24: &Icao24)->bool {
        if self.snapshot.aircraft.remove(icao24).is_some() {
            self.record_removal( *icao24);
            true
        } else {
            false
        }
    }

    fn record_removal (&mut self, icao24: Icao24) {
        let removed = &mut self.snapshot.removed;
        while removed.len() >= self.max_removed {
            match removed.pop_front() {
                Some((_,v)) => self.snapshot.history_horizon = v,
                None => break
            }
        }
        removed.push_back( (icao24, self.version));
        self.is_observable = true;
        self.is_modified = true;
    }

    /// remove all aircraft that have not been updated for `max_age`. Returns the number of removed aircraft
    pub fn expire (&mut self, now: DateTime<Utc>, max_age: Duration)->usize {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or( chrono::Duration::MAX);
        let stale: Vec<Icao24> = self.snapshot.aircraft.values()
            .filter( |r| now.signed_duration_since(r.last_update) > max_age)
            .map( |r| r.icao24)
            .collect();

        for icao24 in &stale {
            self.remove( icao24);
        }
        stale.len()
    }

    /// drop all aircraft and removal history. Every client has to do a full refresh afterwards
    pub fn reset (&mut self) {
        self.snapshot.aircraft.clear();
        self.snapshot.removed.clear();
        self.snapshot.reset_version = self.version;
        self.snapshot.history_horizon = self.version;
        self.is_observable = true;
        self.is_modified = true;
    }
}

/// the per-feed publisher of AircraftSnapshots
pub struct AircraftSnapshotStore {
    published: RwLock<Arc<AircraftSnapshot>>,
    writer: Mutex<()>, // serializes update transactions
    max_trail: usize,
    max_removed: usize,
}

impl Default for AircraftSnapshotStore {
    fn default()->Self { AircraftSnapshotStore::new( DEFAULT_MAX_TRAIL, DEFAULT_REMOVAL_HISTORY) }
}

impl AircraftSnapshotStore {
    pub fn new (max_trail: usize, max_removed: usize)->Self {
        AircraftSnapshotStore {
            published: RwLock::new( Arc::new( AircraftSnapshot::default())),
            writer: Mutex::new(()),
            max_trail,
            max_removed: max_removed.max(1),
        }
    }

    /// the current snapshot. This is what every reader has to use for the duration of its request
    pub fn current (&self)->Arc<AircraftSnapshot> {
        self.published.read().clone()
    }

    pub fn data_version (&self)->DataVersion { self.published.read().data_version }

    /// execute ingestion transaction `f`. If `f` changed anything observable the new snapshot is published
    /// with a DataVersion that is exactly one above the previous one. Returns the DataVersion after the update
    pub fn update<F,R> (&self, f: F)->(DataVersion,R) where F: FnOnce(&mut SnapshotTxn)->R {
        let _guard = self.writer.lock();

        let current = self.current();
        let current_version = current.data_version;
        let mut txn = SnapshotTxn {
            snapshot: (*current).clone(), // shallow - records are shared Arcs
            version: current_version + 1,
            max_trail: self.max_trail,
            max_removed: self.max_removed,
            is_observable: false,
            is_modified: false,
        };
        drop(current);

        let result = f(&mut txn);

        if txn.is_modified {
            let mut snapshot = txn.snapshot;
            if txn.is_observable {
                snapshot.data_version = txn.version;
                trace!("publishing snapshot version {} with {} aircraft", snapshot.data_version, snapshot.aircraft.len());
            }
            let version = snapshot.data_version;
            *self.published.write() = Arc::new(snapshot);
            (version, result)
        } else {
            (current_version, result)
        }
    }

    pub fn reset (&self)->DataVersion {
        let (version,_) = self.update( |txn| txn.reset());
        debug!("snapshot store reset at version {version}");
        version
    }
}
