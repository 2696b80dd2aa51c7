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

//! Stage-stamped logging helpers. Every timed event goes out as
//! `[msg::<stage>,time=<sec.3f>] <payload>` on stdout; ops tooling greps
//! this surface, so the shape is stable.

use std::fmt::Display;
use std::time::Instant;

/// Wall-clock timer for one named stage.
#[derive(Debug)]
pub struct StageTimer {
    start: Instant,
}

impl StageTimer {
    /// Starts timing now.
    pub fn start() -> StageTimer {
        StageTimer {
            start: Instant::now(),
        }
    }

    /// Seconds since the timer started.
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Logs a timed event line for this stage and keeps the timer running.
    pub fn log<D: Display>(&self, stage: &str, payload: D) {
        log_msg(stage, self.elapsed(), payload);
    }
}

/// A timed event line: `[msg::<stage>,time=<sec.3f>] <payload>`.
pub fn log_msg<D: Display>(stage: &str, seconds: f64, payload: D) {
    println!("[msg::{},time={:.3}] {}", stage, seconds, payload);
}

/// An untimed parameter line: `[msg::<stage>] <payload>`.
pub fn log_param<D: Display>(stage: &str, payload: D) {
    println!("[msg::{}] {}", stage, payload);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_is_monotone() {
        let timer = StageTimer::start();
        let a = timer.elapsed();
        let b = timer.elapsed();
        assert!(a >= 0.0);
        assert!(b >= a);
    }
}
