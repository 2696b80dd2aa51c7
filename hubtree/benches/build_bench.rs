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

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hubtree::{CoverTreeBuilder, PointVector, Real, L2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn random_cube(count: usize, dim: usize) -> Arc<PointVector<L2>> {
    let mut rng = StdRng::seed_from_u64(31);
    let data: Vec<Real> = (0..count * dim).map(|_| rng.gen::<Real>()).collect();
    Arc::new(PointVector::new(data, dim).unwrap())
}

fn build_benchmarks(c: &mut Criterion) {
    let points = random_cube(5000, 8);

    c.bench_function("build_level_synch_5k", |b| {
        b.iter(|| {
            CoverTreeBuilder::new()
                .set_min_hub_size(8)
                .build(black_box(Arc::clone(&points)))
                .unwrap()
        })
    });

    c.bench_function("build_async_5k", |b| {
        b.iter(|| {
            CoverTreeBuilder::new()
                .set_min_hub_size(8)
                .set_level_synch(false)
                .set_switch_size(64.0)
                .build(black_box(Arc::clone(&points)))
                .unwrap()
        })
    });
}

fn query_benchmarks(c: &mut Criterion) {
    let points = random_cube(5000, 8);
    let tree = CoverTreeBuilder::new()
        .set_min_hub_size(8)
        .build(Arc::clone(&points))
        .unwrap();

    c.bench_function("point_query_5k", |b| {
        let query = points.point(0);
        b.iter(|| tree.point_query(black_box(query), black_box(0.5)))
    });
}

criterion_group!(benches, build_benchmarks, query_benchmarks);
criterion_main!(benches);
