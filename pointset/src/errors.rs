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

//! The errors that can occur when a point set is loading or working

use std::error::Error;
use std::fmt;
use std::io;

/// Helper type for a call that could go wrong.
pub type PointSetResult<T> = Result<T, PointSetError>;

/// Error type for the point layer. Mostly i/o and record-format trouble from
/// the vector-file loaders.
#[derive(Debug)]
pub enum PointSetError {
    /// IO error when opening or reading files
    IoError(io::Error),
    /// A record in a vector file was malformed
    BadRecord {
        /// The file the record came from
        file_name: String,
        /// Index of the offending record
        record: usize,
        /// What was wrong with it
        message: &'static str,
    },
    /// The data handed over does not agree with the declared dimension
    DimensionMismatch {
        /// The dimension the container was told to use
        expected: usize,
        /// The length that did not divide or match it
        found: usize,
    },
}

impl fmt::Display for PointSetError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PointSetError::IoError(ref e) => write!(f, "{}", e),
            PointSetError::BadRecord {
                file_name,
                record,
                message,
            } => write!(f, "bad record {} in '{}': {}", record, file_name, message),
            PointSetError::DimensionMismatch { expected, found } => write!(
                f,
                "data of length {} does not fit dimension {}",
                found, expected
            ),
        }
    }
}

impl Error for PointSetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PointSetError::IoError(ref e) => Some(e),
            PointSetError::BadRecord { .. } => None,
            PointSetError::DimensionMismatch { .. } => None,
        }
    }
}

impl From<io::Error> for PointSetError {
    fn from(err: io::Error) -> Self {
        PointSetError::IoError(err)
    }
}

impl From<PointSetError> for io::Error {
    fn from(err: PointSetError) -> Self {
        match err {
            PointSetError::IoError(e) => e,
            e => io::Error::new(io::ErrorKind::Other, Box::new(e)),
        }
    }
}
