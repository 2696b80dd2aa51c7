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

//! # Point Set
//! Dense fixed-dimension point storage with pluggable metrics, and loaders
//! for the `fvecs`/`bvecs` family of vector files.

#![warn(missing_docs)]

mod metrics;
pub use metrics::*;

pub mod errors;
pub mod loaders;

mod points;
#[doc(inline)]
pub use points::*;

/// The floating point type all coordinates and distances use. Controlled at
/// build time: the `f64` feature widens every coordinate, distance and radius.
#[cfg(not(feature = "f64"))]
pub type Real = f32;
/// The floating point type all coordinates and distances use.
#[cfg(feature = "f64")]
pub type Real = f64;

/// To make things more obvious, we type the point index. Two points are the
/// same point exactly when their indexes agree; coordinate equality is not
/// point identity.
pub type PointIndex = usize;
