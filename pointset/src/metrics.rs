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

//! Supported distances

use crate::Real;
use std::fmt::Debug;

/// The trait that enables a metric. Implementations must satisfy the metric
/// axioms; the tree construction and queries rely on the triangle inequality.
pub trait Metric: 'static + Send + Sync + Debug + Clone {
    /// Distance between two dense points of equal dimension.
    fn dense(x: &[Real], y: &[Real]) -> Real;
    /// The norm, `dense(x, 0)`.
    fn norm(x: &[Real]) -> Real;
}

/// L2 norm, the square root of the sum of squares.
#[derive(Debug, Clone)]
pub struct L2 {}

impl Metric for L2 {
    #[inline]
    fn dense(x: &[Real], y: &[Real]) -> Real {
        let mut acc = [0.0; 8];
        let mut x_chunks = x.chunks_exact(8);
        let mut y_chunks = y.chunks_exact(8);
        for (xc, yc) in (&mut x_chunks).zip(&mut y_chunks) {
            for i in 0..8 {
                let diff = xc[i] - yc[i];
                acc[i] += diff * diff;
            }
        }
        let leftover = x_chunks
            .remainder()
            .iter()
            .zip(y_chunks.remainder())
            .map(|(xi, yi)| (xi - yi) * (xi - yi))
            .fold(0.0, |a, d| a + d);
        (leftover + acc.iter().sum::<Real>()).sqrt()
    }

    #[inline]
    fn norm(x: &[Real]) -> Real {
        let mut acc = [0.0; 8];
        let mut x_chunks = x.chunks_exact(8);
        for xc in &mut x_chunks {
            for i in 0..8 {
                acc[i] += xc[i] * xc[i];
            }
        }
        let leftover = x_chunks
            .remainder()
            .iter()
            .map(|xi| xi * xi)
            .fold(0.0, |a, d| a + d);
        (leftover + acc.iter().sum::<Real>()).sqrt()
    }
}

/// L1 norm, the sum of absolute values.
#[derive(Debug, Clone)]
pub struct L1 {}

impl Metric for L1 {
    #[inline]
    fn dense(x: &[Real], y: &[Real]) -> Real {
        x.iter()
            .zip(y)
            .map(|(xi, yi)| (xi - yi).abs())
            .fold(0.0, |a, d| a + d)
    }

    #[inline]
    fn norm(x: &[Real]) -> Real {
        x.iter().map(|xi| xi.abs()).fold(0.0, |a, d| a + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn l2_matches_naive() {
        let x: Vec<Real> = (0..37).map(|i| i as Real * 0.25).collect();
        let y: Vec<Real> = (0..37).map(|i| i as Real * -0.5 + 1.0).collect();
        let naive = x
            .iter()
            .zip(&y)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<Real>()
            .sqrt();
        assert_approx_eq!(L2::dense(&x, &y), naive);
    }

    #[test]
    fn l2_norm_is_self_distance_to_origin() {
        let x: Vec<Real> = (0..19).map(|i| (i as Real).sin()).collect();
        let zero = vec![0.0; 19];
        assert_approx_eq!(L2::norm(&x), L2::dense(&x, &zero));
    }

    #[test]
    fn l2_identity() {
        let x: Vec<Real> = vec![3.0, -4.0, 12.0];
        assert_approx_eq!(L2::dense(&x, &x), 0.0);
        assert_approx_eq!(L2::norm(&x), 13.0);
    }

    #[test]
    fn l1_matches_naive() {
        let x: Vec<Real> = vec![1.0, -2.0, 3.5];
        let y: Vec<Real> = vec![0.0, 2.0, -1.5];
        assert_approx_eq!(L1::dense(&x, &y), 10.0);
        assert_approx_eq!(L1::norm(&y), 3.5);
    }
}
