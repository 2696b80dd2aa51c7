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

//! # The Hub
//! The construction-time unit of work: a set of unplaced points grouped
//! under a representative that already owns a tree vertex. Splitting a hub
//! promotes its farthest member to a fresh representative, reassigns every
//! member to its nearest representative, and breaks far basins off as child
//! hubs. All selection rules are keyed on `(distance, point id)`, which
//! makes the whole construction deterministic for any worker count.

use pointset::{Metric, PointIndex, PointVector, Real};
use rayon::prelude::*;

/// Below this many members the reassignment loop stays serial; the rayon
/// dispatch costs more than the distance work it saves.
const REASSIGN_PAR_CUTOFF: usize = 1024;

/// One unplaced point: where it is, and which of the hub's internal
/// representatives is currently nearest to it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct HubMember {
    pub(crate) point: PointIndex,
    pub(crate) dist: Real,
    pub(crate) rep: PointIndex,
}

/// A basin that broke off during a split. It becomes a [`Hub`] once the
/// tree writer has emitted the vertex for its representative.
#[derive(Debug)]
pub(crate) struct ChildHub {
    pub(crate) representative: PointIndex,
    pub(crate) members: Vec<HubMember>,
    pub(crate) radius: Real,
}

impl ChildHub {
    pub(crate) fn into_hub(self, vertex: usize) -> Hub {
        Hub {
            representative: self.representative,
            vertex,
            radius: self.radius,
            members: self.members,
            candidate_reps: Vec::new(),
        }
    }
}

/// What one promotion round produced.
#[derive(Debug)]
pub(crate) enum RoundOutcome {
    /// The hub resolved: the listed points become leaf vertices under the
    /// hub vertex, in ascending point order. The hub is spent.
    Leaves(Vec<PointIndex>),
    /// The hub promoted and shed these basins; it stays active.
    Extracted(Vec<ChildHub>),
}

#[derive(Debug)]
pub(crate) struct Hub {
    pub(crate) representative: PointIndex,
    /// Tree vertex of the representative; parent of everything this hub emits.
    pub(crate) vertex: usize,
    /// Hub radius at creation; the split threshold is `split_ratio * radius`.
    pub(crate) radius: Real,
    pub(crate) members: Vec<HubMember>,
    /// Promoted this round, not yet extracted. Never holds the hub's own
    /// representative.
    pub(crate) candidate_reps: Vec<PointIndex>,
}

impl Hub {
    /// The initial hub: every point except the root representative, with
    /// distances measured from it. The root vertex must already exist.
    pub(crate) fn root<M: Metric>(points: &PointVector<M>, vertex: usize) -> Hub {
        let representative = 0;
        let indexes: Vec<PointIndex> = (1..points.len()).collect();
        let dists = points.distances_to_point_index(representative, &indexes);
        let members: Vec<HubMember> = indexes
            .into_iter()
            .zip(dists)
            .map(|(point, dist)| HubMember {
                point,
                dist,
                rep: representative,
            })
            .collect();
        let radius = members.iter().fold(0.0, |a: Real, m| a.max(m.dist));
        Hub {
            representative,
            vertex,
            radius,
            members,
            candidate_reps: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    /// Index of the farthest member; ties go to the smallest point id.
    fn farthest(&self) -> usize {
        debug_assert!(!self.members.is_empty());
        let mut best = 0;
        for (i, m) in self.members.iter().enumerate().skip(1) {
            let b = &self.members[best];
            if m.dist > b.dist || (m.dist == b.dist && m.point < b.point) {
                best = i;
            }
        }
        best
    }

    /// One split round: either the hub converts to leaves, or the farthest
    /// member is promoted, members reassigned, and far basins extracted.
    pub(crate) fn split_round<M: Metric>(
        &mut self,
        points: &PointVector<M>,
        split_ratio: Real,
        min_hub_size: usize,
    ) -> RoundOutcome {
        let threshold = split_ratio * self.radius;
        let rho = self.members.iter().fold(0.0, |a: Real, m| a.max(m.dist));
        if self.members.len() <= min_hub_size || rho <= threshold {
            return RoundOutcome::Leaves(self.drain_leaves());
        }

        // Promote the farthest member. rho > threshold >= 0 here, so the
        // promoted point is distinct from every representative.
        let new_rep = self.members.swap_remove(self.farthest());
        debug_assert!(new_rep.dist > 0.0);
        self.candidate_reps.push(new_rep.point);

        // Reassign: strictly-smaller wins, so earlier representatives keep
        // ties and the outcome is order independent.
        let rep_coords = points.point(new_rep.point);
        let reassign = |m: &mut HubMember| {
            let d = M::dense(points.point(m.point), rep_coords);
            if d < m.dist {
                m.dist = d;
                m.rep = new_rep.point;
            }
        };
        if self.members.len() >= REASSIGN_PAR_CUTOFF {
            self.members.par_iter_mut().for_each(reassign);
        } else {
            self.members.iter_mut().for_each(reassign);
        }

        // Extract every candidate whose representative moved beyond the
        // split threshold, together with its basin. A promoted point always
        // qualifies (it was at least `rho` from the hub representative), so
        // candidates never survive a round.
        let mut extracted = Vec::new();
        for candidate in std::mem::take(&mut self.candidate_reps) {
            if points.distance(candidate, self.representative) > threshold {
                let (basin, kept): (Vec<HubMember>, Vec<HubMember>) = self
                    .members
                    .drain(..)
                    .partition(|m| m.rep == candidate);
                self.members = kept;
                let radius = basin.iter().fold(0.0, |a: Real, m| a.max(m.dist));
                extracted.push(ChildHub {
                    representative: candidate,
                    members: basin,
                    radius,
                });
            } else {
                self.candidate_reps.push(candidate);
            }
        }
        extracted.sort_by_key(|c| c.representative);
        RoundOutcome::Extracted(extracted)
    }

    /// Runs this hub, and every hub it sheds, to completion. Emissions come
    /// back as a flat batch the tree writer replays in order; `Local`
    /// parents index earlier entries of the same batch.
    pub(crate) fn resolve_ghost<M: Metric>(
        self,
        points: &PointVector<M>,
        split_ratio: Real,
        min_hub_size: usize,
    ) -> Vec<GhostVertex> {
        let mut out = Vec::with_capacity(self.len());
        let anchor = GhostParent::Vertex(self.vertex);
        let mut stack = vec![(self, anchor)];
        while let Some((mut hub, anchor)) = stack.pop() {
            match hub.split_round(points, split_ratio, min_hub_size) {
                RoundOutcome::Leaves(leaves) => {
                    for point in leaves {
                        out.push(GhostVertex { parent: anchor, point });
                    }
                }
                RoundOutcome::Extracted(children) => {
                    stack.push((hub, anchor));
                    for child in children {
                        let local = out.len();
                        out.push(GhostVertex {
                            parent: anchor,
                            point: child.representative,
                        });
                        // vertex id unknown until the writer replays the batch
                        stack.push((child.into_hub(usize::MAX), GhostParent::Local(local)));
                    }
                }
            }
        }
        out
    }

    /// Drains the remaining members into a sorted leaf list.
    fn drain_leaves(&mut self) -> Vec<PointIndex> {
        debug_assert!(
            self.candidate_reps.is_empty(),
            "hub {} converted with unextracted representatives",
            self.representative
        );
        let mut leaves: Vec<PointIndex> =
            self.members.drain(..).map(|m| m.point).collect();
        leaves.sort_unstable();
        leaves
    }
}

/// Parent reference inside a ghost batch: either a vertex the tree already
/// holds, or an earlier entry of the same batch.
#[derive(Clone, Copy, Debug)]
pub(crate) enum GhostParent {
    Vertex(usize),
    Local(usize),
}

/// One pre-ordered emission from a ghost-resolved hub.
#[derive(Debug)]
pub(crate) struct GhostVertex {
    pub(crate) parent: GhostParent,
    pub(crate) point: PointIndex,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pointset::L2;

    fn line_points(n: usize) -> PointVector<L2> {
        let mut data = Vec::new();
        for i in 0..n {
            data.extend_from_slice(&[i as Real, 0.0, 0.0]);
        }
        PointVector::new(data, 3).unwrap()
    }

    #[test]
    fn root_hub_measures_from_point_zero() {
        let points = line_points(10);
        let hub = Hub::root(&points, 0);
        assert_eq!(hub.representative, 0);
        assert_eq!(hub.len(), 9);
        assert_eq!(hub.radius, 9.0);
        assert!(hub.members.iter().all(|m| m.rep == 0));
    }

    #[test]
    fn small_hub_converts_to_sorted_leaves() {
        let points = line_points(5);
        let mut hub = Hub::root(&points, 0);
        match hub.split_round(&points, 0.5, 10) {
            RoundOutcome::Leaves(leaves) => assert_eq!(leaves, vec![1, 2, 3, 4]),
            other => panic!("expected leaves, got {:?}", other),
        }
        assert_eq!(hub.len(), 0);
    }

    #[test]
    fn far_basin_breaks_off() {
        let points = line_points(10);
        let mut hub = Hub::root(&points, 0);
        // radius 9, threshold 4.5; farthest member is point 9
        match hub.split_round(&points, 0.5, 1) {
            RoundOutcome::Extracted(children) => {
                assert_eq!(children.len(), 1);
                let child = &children[0];
                assert_eq!(child.representative, 9);
                // 5..9 are strictly closer to 9 than to 0
                let mut basin: Vec<PointIndex> =
                    child.members.iter().map(|m| m.point).collect();
                basin.sort_unstable();
                assert_eq!(basin, vec![5, 6, 7, 8]);
                assert_eq!(child.radius, 4.0);
            }
            other => panic!("expected an extraction, got {:?}", other),
        }
        // 1..4 stay behind, all still measured from the hub representative
        assert_eq!(hub.len(), 4);
        assert!(hub.members.iter().all(|m| m.rep == 0));
    }

    #[test]
    fn duplicate_points_convert_immediately() {
        let data = vec![1.0; 3 * 8];
        let points: PointVector<L2> = PointVector::new(data, 3).unwrap();
        let mut hub = Hub::root(&points, 0);
        assert_eq!(hub.radius, 0.0);
        match hub.split_round(&points, 0.5, 1) {
            RoundOutcome::Leaves(leaves) => assert_eq!(leaves.len(), 7),
            other => panic!("expected leaves, got {:?}", other),
        }
    }

    #[test]
    fn farthest_ties_go_to_the_smallest_id() {
        // points 1 and 2 both at distance 1 from point 0
        let data = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 0.0];
        let points: PointVector<L2> = PointVector::new(data, 3).unwrap();
        let mut hub = Hub::root(&points, 0);
        match hub.split_round(&points, 0.5, 0) {
            RoundOutcome::Extracted(children) => {
                assert_eq!(children[0].representative, 1);
            }
            other => panic!("expected an extraction, got {:?}", other),
        }
    }

    #[test]
    fn ghost_resolution_places_every_member() {
        let points = line_points(64);
        let hub = Hub::root(&points, 0);
        let batch = hub.resolve_ghost(&points, 0.5, 2);
        assert_eq!(batch.len(), 63);
        let mut seen: Vec<PointIndex> = batch.iter().map(|g| g.point).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 63);
        // local parent references only point backwards
        for (i, g) in batch.iter().enumerate() {
            if let GhostParent::Local(k) = g.parent {
                assert!(k < i);
            }
        }
    }
}
