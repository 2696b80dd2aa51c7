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

//! The epsilon-graph driver: one radius query per point, in parallel. The
//! result is an adjacency list with self loops (every point is within 0 of
//! itself), symmetric because the metric is.

use crate::tree::CoverTree;
use pointset::{Metric, PointIndex, PointVector, Real};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

/// Builds the epsilon graph over every point the tree was built on.
/// Returns the adjacency lists and the total (directed) edge count.
pub fn build_epsilon_graph<M: Metric>(
    tree: &CoverTree<M>,
    radius: Real,
) -> (Vec<Vec<PointIndex>>, usize) {
    let points = tree.points();
    let graph: Vec<Vec<PointIndex>> = (0..points.len())
        .into_par_iter()
        .map(|id| tree.point_query(points.point(id), radius))
        .collect();
    let num_edges = graph.iter().map(Vec::len).sum();
    (graph, num_edges)
}

/// Compares every adjacency list against a brute-force scan. Slow by
/// design; this exists to check the tree, not to be used.
pub fn graph_is_correct<M: Metric>(
    points: &PointVector<M>,
    radius: Real,
    graph: &[Vec<PointIndex>],
) -> bool {
    if graph.len() != points.len() {
        return false;
    }
    let correct = AtomicBool::new(true);
    (0..points.len()).into_par_iter().for_each(|i| {
        if !correct.load(Ordering::Relaxed) {
            return;
        }
        let coords = points.point(i);
        let mut neighbors: Vec<PointIndex> = Vec::with_capacity(graph[i].len());
        for j in 0..points.len() {
            if M::dense(coords, points.point(j)) <= radius {
                neighbors.push(j);
            }
        }
        let mut found = graph[i].clone();
        found.sort_unstable();
        if found != neighbors {
            correct.store(false, Ordering::Relaxed);
        }
    });
    correct.into_inner()
}
