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

use crate::errors::{PointSetError, PointSetResult};
use crate::{Metric, PointIndex, Real};
use rayon::prelude::*;
use std::cmp::min;
use std::marker::PhantomData;

#[inline]
fn chunk(data_dim: usize) -> usize {
    min(15000 / data_dim, 20).max(1)
}

/// A dense in-memory point container, row major. Read-only once built; safe
/// to share across threads freely.
#[derive(Debug, Clone)]
pub struct PointVector<M: Metric> {
    data: Vec<Real>,
    dim: usize,
    metric: PhantomData<M>,
}

impl<M: Metric> PointVector<M> {
    /// Wraps a flat coordinate buffer. The buffer length must be a multiple
    /// of `dim`.
    pub fn new(data: Vec<Real>, dim: usize) -> PointSetResult<PointVector<M>> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(PointSetError::DimensionMismatch {
                expected: dim,
                found: data.len(),
            });
        }
        Ok(PointVector {
            data,
            dim,
            metric: PhantomData,
        })
    }

    /// The number of points this container covers.
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    /// If this is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The dimension of the underlying data.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Indexes used for access.
    pub fn reference_indexes(&self) -> Vec<PointIndex> {
        (0..self.len()).collect()
    }

    /// Gets a point from this dataset. Indexing out of range is a programmer
    /// error and panics.
    #[inline]
    pub fn point(&self, pi: PointIndex) -> &[Real] {
        &self.data[pi * self.dim..(pi + 1) * self.dim]
    }

    /// Distance between two stored points.
    #[inline]
    pub fn distance(&self, i: PointIndex, j: PointIndex) -> Real {
        M::dense(self.point(i), self.point(j))
    }

    /// Distances from an arbitrary query point to a set of stored points.
    /// Parallelizes once the index list outgrows a few cache-sized chunks.
    pub fn distances_to_point(&self, x: &[Real], indexes: &[PointIndex]) -> Vec<Real> {
        let chunk = chunk(self.dim());
        let len = indexes.len();
        if len > chunk * 3 {
            let mut dists: Vec<Real> = vec![0.0; len];
            dists
                .par_chunks_mut(chunk)
                .zip(indexes.par_chunks(chunk))
                .for_each(|(chunk_dists, chunk_indexes)| {
                    for (d, i) in chunk_dists.iter_mut().zip(chunk_indexes) {
                        *d = M::dense(x, self.point(*i));
                    }
                });
            dists
        } else {
            indexes.iter().map(|i| M::dense(x, self.point(*i))).collect()
        }
    }

    /// Distances from a stored point to a set of stored points.
    pub fn distances_to_point_index(
        &self,
        i: PointIndex,
        indexes: &[PointIndex],
    ) -> Vec<Real> {
        self.distances_to_point(self.point(i), indexes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::L2;
    use assert_approx_eq::assert_approx_eq;

    fn grid_points() -> PointVector<L2> {
        // 0..10 along the x axis in 3d
        let mut data = Vec::new();
        for i in 0..10 {
            data.extend_from_slice(&[i as Real, 0.0, 0.0]);
        }
        PointVector::new(data, 3).unwrap()
    }

    #[test]
    fn rejects_ragged_data() {
        assert!(PointVector::<L2>::new(vec![0.0; 7], 3).is_err());
        assert!(PointVector::<L2>::new(vec![0.0; 6], 0).is_err());
        assert!(PointVector::<L2>::new(vec![0.0; 6], 3).is_ok());
    }

    #[test]
    fn indexed_distances() {
        let pv = grid_points();
        assert_eq!(pv.len(), 10);
        assert_eq!(pv.dim(), 3);
        assert_approx_eq!(pv.distance(2, 7), 5.0);
        assert_approx_eq!(pv.distance(4, 4), 0.0);
    }

    #[test]
    fn distances_to_point_matches_pairwise() {
        let pv = grid_points();
        let indexes = pv.reference_indexes();
        let dists = pv.distances_to_point_index(3, &indexes);
        for (j, d) in dists.iter().enumerate() {
            assert_approx_eq!(*d, pv.distance(3, j));
        }
    }

    #[test]
    fn parallel_and_serial_paths_agree() {
        let dim = 16;
        let count = 500;
        let data: Vec<Real> = (0..count * dim).map(|i| ((i * 31) % 97) as Real).collect();
        let pv = PointVector::<L2>::new(data, dim).unwrap();
        let indexes = pv.reference_indexes();
        // long list takes the rayon path, short slices take the serial one
        let long = pv.distances_to_point_index(0, &indexes);
        for (j, d) in long.iter().enumerate() {
            let short = pv.distances_to_point_index(0, &indexes[j..j + 1]);
            assert_approx_eq!(*d, short[0]);
        }
    }
}
