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

use crate::errors::{HubTreeError, HubTreeResult};
use crate::hub::{ChildHub, GhostParent, GhostVertex, Hub, RoundOutcome};
use crate::itree::InsertTree;
use crate::tree::CoverTree;
use crate::utils::StageTimer;
use pbr::ProgressBar;
use pointset::{Metric, PointIndex, PointVector, Real};
use rayon::prelude::*;
use std::fs::read_to_string;
use std::path::Path;
use std::sync::Arc;
use yaml_rust::YamlLoader;

use crossbeam_channel::{unbounded, Sender};
use yaml_rust::Yaml;

/// Yaml stores `12` and `12.0` as different types; accept either.
fn yaml_real(value: &Yaml) -> Option<Real> {
    value
        .as_f64()
        .or_else(|| value.as_i64().map(|x| x as f64))
        .map(|x| x as Real)
}

/// The parameters a build runs under, shared by both drivers and every
/// asynchronous worker.
#[derive(Debug)]
struct BuildParameters {
    split_ratio: Real,
    switch_size: Real,
    min_hub_size: usize,
    verbosity: u32,
}

/// A construction object for a covertree. Defaults follow the driver: split
/// ratio 0.5, minimum hub size 10, level-synchronous scheduling, no ghost
/// switching.
#[derive(Debug, Clone)]
pub struct CoverTreeBuilder {
    pub(crate) split_ratio: Real,
    pub(crate) switch_size: Real,
    pub(crate) min_hub_size: usize,
    pub(crate) level_synch: bool,
    pub(crate) verbosity: u32,
}

impl Default for CoverTreeBuilder {
    fn default() -> CoverTreeBuilder {
        CoverTreeBuilder {
            split_ratio: 0.5,
            switch_size: 0.0,
            min_hub_size: 10,
            level_synch: true,
            verbosity: 0,
        }
    }
}

impl CoverTreeBuilder {
    /// Creates a new builder with the driver defaults.
    pub fn new() -> CoverTreeBuilder {
        CoverTreeBuilder::default()
    }

    /// Creates a builder from a yaml config file. Missing fields keep their
    /// defaults.
    ///
    /// ```yaml
    /// ---
    /// split_ratio: 0.5
    /// switch_size: 100
    /// min_hub_size: 10
    /// level_synch: true
    /// verbosity: 0
    /// ```
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> HubTreeResult<Self> {
        let config = read_to_string(&path).map_err(HubTreeError::IoError)?;
        let params_files = YamlLoader::load_from_str(&config).map_err(|_| {
            HubTreeError::BadParameter {
                parameter: "config",
                message: "file is not valid yaml",
            }
        })?;
        let params = params_files.first().ok_or(HubTreeError::BadParameter {
            parameter: "config",
            message: "file holds no yaml document",
        })?;
        let defaults = CoverTreeBuilder::default();
        Ok(CoverTreeBuilder {
            split_ratio: yaml_real(&params["split_ratio"]).unwrap_or(defaults.split_ratio),
            switch_size: yaml_real(&params["switch_size"]).unwrap_or(defaults.switch_size),
            min_hub_size: params["min_hub_size"]
                .as_i64()
                .map(|x| x as usize)
                .unwrap_or(defaults.min_hub_size),
            level_synch: params["level_synch"].as_bool().unwrap_or(defaults.level_synch),
            verbosity: params["verbosity"]
                .as_i64()
                .map(|x| x as u32)
                .unwrap_or(defaults.verbosity),
        })
    }

    /// The nesting tightness, in `(0, 1)`. A hub keeps splitting until all
    /// its members sit within this fraction of its creation radius.
    pub fn set_split_ratio(&mut self, x: Real) -> &mut Self {
        self.split_ratio = x;
        self
    }
    /// Hub size at which the remaining subtree is built whole by one task;
    /// 0 disables the switch.
    pub fn set_switch_size(&mut self, x: Real) -> &mut Self {
        self.switch_size = x;
        self
    }
    /// Hubs at or below this size convert straight to leaves.
    pub fn set_min_hub_size(&mut self, x: usize) -> &mut Self {
        self.min_hub_size = x;
        self
    }
    /// Selects the batch scheduler (`true`) or the task scheduler (`false`).
    pub fn set_level_synch(&mut self, x: bool) -> &mut Self {
        self.level_synch = x;
        self
    }
    /// 0 is silent, 1 logs stages, 2 adds a progress bar.
    pub fn set_verbosity(&mut self, x: u32) -> &mut Self {
        self.verbosity = x;
        self
    }

    /// Builds the tree over the given points. Both schedulers place every
    /// point under the same parent; only vertex numbering may differ.
    pub fn build<M: Metric>(&self, points: Arc<PointVector<M>>) -> HubTreeResult<CoverTree<M>> {
        if !(self.split_ratio > 0.0 && self.split_ratio < 1.0) {
            return Err(HubTreeError::BadParameter {
                parameter: "split_ratio",
                message: "must lie strictly between 0 and 1",
            });
        }
        if self.switch_size < 0.0 {
            return Err(HubTreeError::BadParameter {
                parameter: "switch_size",
                message: "must be non-negative",
            });
        }
        if points.is_empty() {
            return Err(HubTreeError::EmptyPointSet);
        }

        let parameters = Arc::new(BuildParameters {
            split_ratio: self.split_ratio,
            switch_size: self.switch_size,
            min_hub_size: self.min_hub_size,
            verbosity: self.verbosity,
        });

        let mut tree = InsertTree::new();
        let root_vertex = tree.add_vertex(0, None);
        let root_hub = Hub::root(&points, root_vertex);

        if self.level_synch {
            build_level_synch(&points, &parameters, &mut tree, root_hub);
        } else {
            build_async(&points, &parameters, &mut tree, root_hub);
        }

        debug_assert_eq!(tree.num_vertices(), points.len());
        Ok(CoverTree::freeze(points, tree))
    }
}

/// One pending tree write from a level-synchronous round. Sorting the batch
/// by `(parent, point)` pins vertex numbering regardless of worker count.
struct Emission {
    parent: usize,
    point: PointIndex,
    payload: Option<ChildHub>,
}

fn build_level_synch<M: Metric>(
    points: &Arc<PointVector<M>>,
    parameters: &Arc<BuildParameters>,
    tree: &mut InsertTree,
    root_hub: Hub,
) {
    let timer = StageTimer::start();
    let mut progress = build_progress_bar(parameters, points.len());
    let mut active = vec![root_hub];
    let mut level = 0usize;
    while !active.is_empty() {
        let total_members: usize = active.iter().map(Hub::len).sum();
        if parameters.switch_size > 0.0
            && total_members as Real / active.len() as Real <= parameters.switch_size
        {
            // The frontier is fine-grained enough that batch synchronization
            // costs more than it buys. Finish each hub whole, one task each.
            active.sort_by_key(|h| h.vertex);
            let batches: Vec<Vec<GhostVertex>> = std::mem::take(&mut active)
                .into_par_iter()
                .map(|hub| {
                    hub.resolve_ghost(points, parameters.split_ratio, parameters.min_hub_size)
                })
                .collect();
            for batch in batches {
                let placed = replay_ghost_batch(tree, &batch);
                if let Some(pb) = progress.as_mut() {
                    pb.add(placed as u64);
                }
            }
            if parameters.verbosity > 0 {
                timer.log(
                    "build_level_synch",
                    format_args!("switched to ghost hubs at level {}", level),
                );
            }
            break;
        }

        let results: Vec<(Hub, RoundOutcome)> = std::mem::take(&mut active)
            .into_par_iter()
            .map(|mut hub| {
                let outcome =
                    hub.split_round(points, parameters.split_ratio, parameters.min_hub_size);
                (hub, outcome)
            })
            .collect();

        let mut emissions: Vec<Emission> = Vec::new();
        for (hub, outcome) in results {
            match outcome {
                RoundOutcome::Leaves(leaves) => {
                    emissions.extend(leaves.into_iter().map(|point| Emission {
                        parent: hub.vertex,
                        point,
                        payload: None,
                    }));
                }
                RoundOutcome::Extracted(children) => {
                    emissions.extend(children.into_iter().map(|child| Emission {
                        parent: hub.vertex,
                        point: child.representative,
                        payload: Some(child),
                    }));
                    active.push(hub);
                }
            }
        }
        emissions.sort_by_key(|e| (e.parent, e.point));
        let placed = emissions.len();
        for emission in emissions {
            let vertex = tree.add_vertex(emission.point, Some(emission.parent));
            if let Some(child) = emission.payload {
                active.push(child.into_hub(vertex));
            }
        }
        if let Some(pb) = progress.as_mut() {
            pb.add(placed as u64);
        }
        if parameters.verbosity > 0 {
            timer.log(
                "build_level_synch",
                format_args!(
                    "round {} [hubs={},vertices={}]",
                    level,
                    active.len(),
                    tree.num_vertices()
                ),
            );
        }
        level += 1;
    }
    if let Some(pb) = progress.as_mut() {
        pb.finish();
    }
}

/// Messages the asynchronous workers stream to the single tree writer.
enum BuilderMessage {
    /// A hub shed these basins; the writer emits their vertices and spawns
    /// a worker per new hub. The sender keeps running its own hub.
    Extracted {
        parent_vertex: usize,
        children: Vec<ChildHub>,
    },
    /// A hub converted; its remaining members become leaves. Final message
    /// of that hub's worker.
    Resolved {
        parent_vertex: usize,
        leaves: Vec<PointIndex>,
    },
    /// A small hub was finished whole by one worker. Final message.
    Ghost { vertices: Vec<GhostVertex> },
}

fn build_async<M: Metric>(
    points: &Arc<PointVector<M>>,
    parameters: &Arc<BuildParameters>,
    tree: &mut InsertTree,
    root_hub: Hub,
) {
    let timer = StageTimer::start();
    let mut progress = build_progress_bar(parameters, points.len());
    let (sender, receiver) = unbounded();
    spawn_worker(root_hub, points, parameters, &sender);

    let mut outstanding = 1usize;
    while outstanding > 0 {
        let message = receiver.recv().expect("builder channel disconnected");
        match message {
            BuilderMessage::Extracted {
                parent_vertex,
                children,
            } => {
                let placed = children.len();
                for child in children {
                    let vertex = tree.add_vertex(child.representative, Some(parent_vertex));
                    outstanding += 1;
                    spawn_worker(child.into_hub(vertex), points, parameters, &sender);
                }
                if let Some(pb) = progress.as_mut() {
                    pb.add(placed as u64);
                }
            }
            BuilderMessage::Resolved {
                parent_vertex,
                leaves,
            } => {
                let placed = leaves.len();
                for point in leaves {
                    tree.add_vertex(point, Some(parent_vertex));
                }
                if let Some(pb) = progress.as_mut() {
                    pb.add(placed as u64);
                }
                outstanding -= 1;
            }
            BuilderMessage::Ghost { vertices } => {
                let placed = replay_ghost_batch(tree, &vertices);
                if let Some(pb) = progress.as_mut() {
                    pb.add(placed as u64);
                }
                outstanding -= 1;
            }
        }
    }
    if let Some(pb) = progress.as_mut() {
        pb.finish();
    }
    if parameters.verbosity > 0 {
        timer.log(
            "build_async",
            format_args!("all hubs resolved [vertices={}]", tree.num_vertices()),
        );
    }
}

fn spawn_worker<M: Metric>(
    mut hub: Hub,
    points: &Arc<PointVector<M>>,
    parameters: &Arc<BuildParameters>,
    sender: &Sender<BuilderMessage>,
) {
    let points = Arc::clone(points);
    let parameters = Arc::clone(parameters);
    let sender = sender.clone();
    rayon::spawn(move || loop {
        if parameters.switch_size > 0.0 && (hub.len() as Real) <= parameters.switch_size {
            let vertices =
                hub.resolve_ghost(&points, parameters.split_ratio, parameters.min_hub_size);
            sender.send(BuilderMessage::Ghost { vertices }).unwrap();
            return;
        }
        match hub.split_round(&points, parameters.split_ratio, parameters.min_hub_size) {
            RoundOutcome::Leaves(leaves) => {
                sender
                    .send(BuilderMessage::Resolved {
                        parent_vertex: hub.vertex,
                        leaves,
                    })
                    .unwrap();
                return;
            }
            RoundOutcome::Extracted(children) => {
                sender
                    .send(BuilderMessage::Extracted {
                        parent_vertex: hub.vertex,
                        children,
                    })
                    .unwrap();
            }
        }
    });
}

/// Appends a pre-ordered ghost batch; local parent references resolve to the
/// ids assigned earlier in the same batch. Returns the number of vertices.
fn replay_ghost_batch(tree: &mut InsertTree, batch: &[GhostVertex]) -> usize {
    let mut assigned = Vec::with_capacity(batch.len());
    for ghost in batch {
        let parent = match ghost.parent {
            GhostParent::Vertex(v) => v,
            GhostParent::Local(k) => assigned[k],
        };
        assigned.push(tree.add_vertex(ghost.point, Some(parent)));
    }
    batch.len()
}

fn build_progress_bar(
    parameters: &BuildParameters,
    total_points: usize,
) -> Option<ProgressBar<std::io::Stdout>> {
    if parameters.verbosity > 1 {
        let mut pb = ProgressBar::new(total_points as u64);
        pb.format("╢▌▌░╟");
        Some(pb)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointset::L2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Write;

    fn random_cube(count: usize, dim: usize, seed: u64) -> Arc<PointVector<L2>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let data: Vec<Real> = (0..count * dim).map(|_| rng.gen::<Real>()).collect();
        Arc::new(PointVector::new(data, dim).unwrap())
    }

    /// point -> parent point, the mode-independent shape of the tree
    fn parent_points(tree: &CoverTree<L2>) -> Vec<Option<PointIndex>> {
        let mut out = vec![None; tree.num_vertices()];
        for v in 0..tree.num_vertices() {
            out[tree.vertex_point(v)] = tree.parent(v).map(|p| tree.vertex_point(p));
        }
        out
    }

    #[test]
    fn level_synch_build_covers_and_verifies() {
        let points = random_cube(300, 3, 17);
        let tree = CoverTreeBuilder::new()
            .set_min_hub_size(5)
            .build(Arc::clone(&points))
            .unwrap();
        assert_eq!(tree.num_vertices(), 300);
        assert!(tree.num_levels() >= 2);
        assert!(tree.is_correct(0.5));
    }

    #[test]
    fn async_build_matches_level_synch() {
        let points = random_cube(400, 4, 99);
        let batched = CoverTreeBuilder::new()
            .set_min_hub_size(4)
            .build(Arc::clone(&points))
            .unwrap();
        let tasked = CoverTreeBuilder::new()
            .set_min_hub_size(4)
            .set_level_synch(false)
            .build(Arc::clone(&points))
            .unwrap();
        assert!(tasked.is_correct(0.5));
        assert_eq!(parent_points(&batched), parent_points(&tasked));
    }

    #[test]
    fn ghost_switch_leaves_the_tree_unchanged() {
        let points = random_cube(400, 4, 3);
        let plain = CoverTreeBuilder::new()
            .set_min_hub_size(2)
            .build(Arc::clone(&points))
            .unwrap();
        let switched = CoverTreeBuilder::new()
            .set_min_hub_size(2)
            .set_switch_size(50.0)
            .build(Arc::clone(&points))
            .unwrap();
        let tasked_switched = CoverTreeBuilder::new()
            .set_min_hub_size(2)
            .set_switch_size(50.0)
            .set_level_synch(false)
            .build(Arc::clone(&points))
            .unwrap();
        assert!(switched.is_correct(0.5));
        assert_eq!(parent_points(&plain), parent_points(&switched));
        assert_eq!(parent_points(&plain), parent_points(&tasked_switched));
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let points = random_cube(10, 2, 0);
        let mut builder = CoverTreeBuilder::new();
        builder.set_split_ratio(1.5);
        assert!(matches!(
            builder.build(Arc::clone(&points)),
            Err(HubTreeError::BadParameter { .. })
        ));
        builder.set_split_ratio(0.0);
        assert!(builder.build(Arc::clone(&points)).is_err());
    }

    #[test]
    fn empty_point_set_is_rejected() {
        let points: Arc<PointVector<L2>> =
            Arc::new(PointVector::new(Vec::new(), 3).unwrap());
        assert!(matches!(
            CoverTreeBuilder::new().build(points),
            Err(HubTreeError::EmptyPointSet)
        ));
    }

    #[test]
    fn builder_reads_yaml_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "---\nsplit_ratio: 0.75\nmin_hub_size: 3\nlevel_synch: false\nswitch_size: 12"
        )
        .unwrap();
        file.flush().unwrap();
        let builder = CoverTreeBuilder::from_yaml(file.path()).unwrap();
        assert_eq!(builder.split_ratio, 0.75);
        assert_eq!(builder.min_hub_size, 3);
        assert!(!builder.level_synch);
        assert_eq!(builder.switch_size, 12.0);
        assert_eq!(builder.verbosity, 0);
    }
}
