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

//! # The frozen cover tree
//! What construction leaves behind: the insert tree, the point set it was
//! built over, and a per-vertex radius sidecar. Everything here is read
//! only, so queries can run concurrently from as many threads as you like.

use crate::errors::HubTreeResult;
use crate::itree::InsertTree;
use pointset::{Metric, PointIndex, PointVector, Real};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// A built cover tree. `radii[v]` is the max distance from `v`'s point to
/// any point in the subtree rooted at `v`, fixed at freeze time.
#[derive(Debug, Clone)]
pub struct CoverTree<M: Metric> {
    points: Arc<PointVector<M>>,
    tree: InsertTree,
    radii: Vec<Real>,
}

impl<M: Metric> CoverTree<M> {
    /// Seals a finished insert tree: computes the radius sidecar by walking
    /// every vertex up to its ancestors, merged with an elementwise max.
    pub(crate) fn freeze(points: Arc<PointVector<M>>, tree: InsertTree) -> CoverTree<M> {
        let num_vertices = tree.num_vertices();
        let radii = (0..num_vertices)
            .into_par_iter()
            .fold(
                || vec![0.0 as Real; num_vertices],
                |mut acc, vertex| {
                    let coords = points.point(tree.item(vertex));
                    let mut walk = tree.parent(vertex);
                    while let Some(ancestor) = walk {
                        let d = M::dense(coords, points.point(tree.item(ancestor)));
                        if d > acc[ancestor] {
                            acc[ancestor] = d;
                        }
                        walk = tree.parent(ancestor);
                    }
                    acc
                },
            )
            .reduce(
                || vec![0.0 as Real; num_vertices],
                |mut a, b| {
                    for (ai, bi) in a.iter_mut().zip(b) {
                        if bi > *ai {
                            *ai = bi;
                        }
                    }
                    a
                },
            );
        CoverTree { points, tree, radii }
    }

    /// The point set the tree was built over.
    pub fn points(&self) -> &Arc<PointVector<M>> {
        &self.points
    }

    /// The number of tree vertices; equals the number of points.
    pub fn num_vertices(&self) -> usize {
        self.tree.num_vertices()
    }

    /// The number of tree levels.
    pub fn num_levels(&self) -> usize {
        self.tree.num_levels()
    }

    /// The root vertex id.
    pub fn root(&self) -> usize {
        0
    }

    /// The point a vertex stands for.
    pub fn vertex_point(&self, vertex: usize) -> PointIndex {
        self.tree.item(vertex)
    }

    /// The parent of a vertex, `None` for the root.
    pub fn parent(&self, vertex: usize) -> Option<usize> {
        self.tree.parent(vertex)
    }

    /// The children of a vertex.
    pub fn children(&self, vertex: usize) -> &[usize] {
        self.tree.get_children(vertex)
    }

    /// Depth from the root.
    pub fn level(&self, vertex: usize) -> usize {
        self.tree.level(vertex)
    }

    /// Subtree radius of a vertex; 0 for leaves.
    pub fn radius(&self, vertex: usize) -> Real {
        self.radii[vertex]
    }

    /// Every point within `radius` of `query`, by branch and bound: a
    /// subtree is visited only while its center distance minus its radius
    /// still reaches the ball.
    pub fn point_query(&self, query: &[Real], radius: Real) -> Vec<PointIndex> {
        let mut found = Vec::new();
        if self.tree.is_empty() {
            return found;
        }
        let mut worklist = vec![self.root()];
        while let Some(vertex) = worklist.pop() {
            let point = self.tree.item(vertex);
            let d = M::dense(query, self.points.point(point));
            if d <= radius {
                found.push(point);
            }
            if d - self.radii[vertex] <= radius {
                worklist.extend_from_slice(self.tree.get_children(vertex));
            }
        }
        found
    }

    /// Checks the finished tree against what construction promises for the
    /// given split ratio:
    /// every point owns exactly one vertex; levels step by one down every
    /// edge; every child sits within its parent's radius and carries a
    /// radius no larger; and internal siblings are pairwise separated by
    /// more than `split_ratio` times their parent's radius.
    pub fn is_correct(&self, split_ratio: Real) -> bool {
        let tree = &self.tree;
        let num_vertices = tree.num_vertices();

        if num_vertices != self.points.len() {
            return false;
        }
        let mut seen = vec![false; self.points.len()];
        for vertex in 0..num_vertices {
            let point = tree.item(vertex);
            if seen[point] {
                return false;
            }
            seen[point] = true;
        }

        let edges_ok = (0..num_vertices).into_par_iter().all(|vertex| {
            match tree.parent(vertex) {
                None => vertex == self.root() && tree.level(vertex) == 0,
                Some(parent) => {
                    let d = self
                        .points
                        .distance(tree.item(vertex), tree.item(parent));
                    tree.level(vertex) == tree.level(parent) + 1
                        && tree.get_children(parent).contains(&vertex)
                        && d <= self.radii[parent]
                        && self.radii[vertex] <= self.radii[parent]
                }
            }
        });
        if !edges_ok {
            return false;
        }

        (0..num_vertices).into_par_iter().all(|parent| {
            let internal: Vec<usize> = tree
                .get_children(parent)
                .iter()
                .copied()
                .filter(|c| !tree.get_children(*c).is_empty())
                .collect();
            let threshold = split_ratio * self.radii[parent];
            for (i, a) in internal.iter().enumerate() {
                for b in &internal[i + 1..] {
                    if self.points.distance(tree.item(*a), tree.item(*b)) <= threshold {
                        return false;
                    }
                }
            }
            true
        })
    }

    /// The trivial debug dump: one line per vertex,
    /// `id point parent level radius nchildren`.
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> HubTreeResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(
            out,
            "# vertices={} levels={}",
            self.num_vertices(),
            self.num_levels()
        )?;
        for vertex in 0..self.tree.num_vertices() {
            let parent = match self.tree.parent(vertex) {
                Some(p) => p as i64,
                None => -1,
            };
            writeln!(
                out,
                "{} {} {} {} {} {}",
                vertex,
                self.tree.item(vertex),
                parent,
                self.tree.level(vertex),
                self.radii[vertex],
                self.tree.get_children(vertex).len()
            )?;
        }
        out.flush()?;
        Ok(())
    }
}
