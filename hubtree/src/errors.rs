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

//! The errors that can occur when a cover tree is building or saving.
//! Most errors are floated up from `pointset` as that's the i/o layer.

use pointset::errors::PointSetError;
use std::error::Error;
use std::fmt;
use std::io;

/// Helper type for a call that could go wrong.
pub type HubTreeResult<T> = Result<T, HubTreeError>;

/// Error type for the tree layer, mostly a wrapper around [`PointSetError`]
/// plus the builder's parameter validation.
#[derive(Debug)]
pub enum HubTreeError {
    /// Floated up from the point layer
    PointSetError(PointSetError),
    /// IO error when writing the tree dump
    IoError(io::Error),
    /// A builder parameter was out of its documented range
    BadParameter {
        /// The parameter that was rejected
        parameter: &'static str,
        /// What was wrong with it
        message: &'static str,
    },
    /// A tree cannot be built over zero points
    EmptyPointSet,
}

impl fmt::Display for HubTreeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HubTreeError::PointSetError(ref e) => write!(f, "{}", e),
            HubTreeError::IoError(ref e) => write!(f, "{}", e),
            HubTreeError::BadParameter { parameter, message } => {
                write!(f, "bad parameter '{}': {}", parameter, message)
            }
            HubTreeError::EmptyPointSet => write!(f, "cannot build a tree over zero points"),
        }
    }
}

impl Error for HubTreeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HubTreeError::PointSetError(ref e) => Some(e),
            HubTreeError::IoError(ref e) => Some(e),
            HubTreeError::BadParameter { .. } => None,
            HubTreeError::EmptyPointSet => None,
        }
    }
}

impl From<PointSetError> for HubTreeError {
    fn from(err: PointSetError) -> Self {
        HubTreeError::PointSetError(err)
    }
}

impl From<io::Error> for HubTreeError {
    fn from(err: io::Error) -> Self {
        HubTreeError::IoError(err)
    }
}

impl From<HubTreeError> for io::Error {
    fn from(err: HubTreeError) -> Self {
        match err {
            HubTreeError::IoError(e) => e,
            e => io::Error::new(io::ErrorKind::Other, Box::new(e)),
        }
    }
}
