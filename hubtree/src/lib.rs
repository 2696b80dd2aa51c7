/*
* Licensed to Elasticsearch B.V. under one or more contributor
* license agreements. See the NOTICE file distributed with
* this work for additional information regarding copyright
* ownership. Elasticsearch B.V. licenses this file to you under
* the Apache License, Version 2.0 (the "License"); you may
* not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
*  http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing,
* software distributed under the License is distributed on an
* "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
* KIND, either express or implied.  See the License for the
* specific language governing permissions and limitations
* under the License.
*/

//! # Hubtree
//! A parallel, hub-based cover tree over a dense Euclidean point set, and
//! the fixed-radius point queries that turn it into an epsilon neighbor
//! graph.
//!
//! Construction groups unplaced points into *hubs*, each anchored at a
//! representative that already owns a tree vertex. A hub is repeatedly
//! split: the farthest member is promoted to a new representative, members
//! are reassigned to their nearest representative, and basins that moved far
//! enough from the anchor break off as child hubs. Hubs whose members all
//! sit within `split_ratio` of their hub radius, or that fall below
//! `min_hub_size`, convert their members to leaves. The promotion rule makes
//! the result deterministic for any worker count.
//!
//! Two schedulers share that split primitive: a level-synchronous driver
//! that processes the whole frontier batch by batch, and an asynchronous
//! driver that treats each hub as a task and streams emissions to a single
//! tree writer. Small hubs are finished whole by one task ("ghost" mode).

#![warn(missing_docs)]

pub mod errors;
pub use errors::{HubTreeError, HubTreeResult};

mod itree;
pub use itree::InsertTree;

mod hub;

mod builders;
pub use builders::CoverTreeBuilder;

mod tree;
pub use tree::CoverTree;

pub mod graph;
pub mod utils;

pub use pointset::{Metric, PointIndex, PointVector, Real, L1, L2};
