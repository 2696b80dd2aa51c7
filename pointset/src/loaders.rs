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

//! Loaders for the `fvecs`/`bvecs` vector-file family: a flat sequence of
//! records, each an `int32` dimension followed by that many values (`f32` for
//! fvecs, `u8` for bvecs). Every record must agree on the dimension.

use crate::errors::{PointSetError, PointSetResult};
use crate::{Metric, PointVector, Real};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

fn file_name(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Reads the next record header. `Ok(None)` is a clean end of file; a partial
/// header is a truncation error.
fn read_dim<R: Read>(
    reader: &mut R,
    path: &Path,
    record: usize,
) -> PointSetResult<Option<usize>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < 4 {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(PointSetError::BadRecord {
                file_name: file_name(path),
                record,
                message: "truncated record header",
            });
        }
        filled += n;
    }
    let dim = i32::from_le_bytes(buf);
    if dim <= 0 {
        return Err(PointSetError::BadRecord {
            file_name: file_name(path),
            record,
            message: "non-positive dimension",
        });
    }
    Ok(Some(dim as usize))
}

fn read_payload<R: Read>(
    reader: &mut R,
    bytes: usize,
    path: &Path,
    record: usize,
) -> PointSetResult<Vec<u8>> {
    let mut payload = vec![0u8; bytes];
    reader
        .read_exact(&mut payload)
        .map_err(|_| PointSetError::BadRecord {
            file_name: file_name(path),
            record,
            message: "truncated record payload",
        })?;
    Ok(payload)
}

fn load<M: Metric, F>(path: &Path, value_bytes: usize, decode: F) -> PointSetResult<PointVector<M>>
where
    F: Fn(&[u8]) -> Real,
{
    let mut reader = BufReader::new(File::open(path)?);
    let mut data: Vec<Real> = Vec::new();
    let mut dim = 0;
    let mut record = 0;
    while let Some(record_dim) = read_dim(&mut reader, path, record)? {
        if record == 0 {
            dim = record_dim;
        } else if record_dim != dim {
            return Err(PointSetError::BadRecord {
                file_name: file_name(path),
                record,
                message: "record dimension disagrees with the first record",
            });
        }
        let payload = read_payload(&mut reader, dim * value_bytes, path, record)?;
        data.extend(payload.chunks_exact(value_bytes).map(&decode));
        record += 1;
    }
    if record == 0 {
        return Err(PointSetError::BadRecord {
            file_name: file_name(path),
            record: 0,
            message: "file holds no records",
        });
    }
    PointVector::new(data, dim)
}

/// Loads an `fvecs` file: each record value is a little-endian `f32`,
/// widened to [`Real`] as needed.
pub fn fvecs_from_file<M: Metric, P: AsRef<Path>>(path: P) -> PointSetResult<PointVector<M>> {
    load(path.as_ref(), 4, |b| {
        f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as Real
    })
}

/// Loads a `bvecs` file: each record value is a single byte.
pub fn bvecs_from_file<M: Metric, P: AsRef<Path>>(path: P) -> PointSetResult<PointVector<M>> {
    load(path.as_ref(), 1, |b| b[0] as Real)
}

/// Loads a vector file, picking the decoder from the file extension
/// (`.bvecs` for bytes, anything else is treated as fvecs).
pub fn vecs_from_file<M: Metric, P: AsRef<Path>>(path: P) -> PointSetResult<PointVector<M>> {
    match path.as_ref().extension().and_then(|e| e.to_str()) {
        Some("bvecs") => bvecs_from_file(path),
        _ => fvecs_from_file(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::L2;
    use assert_approx_eq::assert_approx_eq;
    use std::io::Write;

    fn write_fvecs(records: &[Vec<f32>]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for rec in records {
            file.write_all(&(rec.len() as i32).to_le_bytes()).unwrap();
            for v in rec {
                file.write_all(&v.to_le_bytes()).unwrap();
            }
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn fvecs_round_trip() {
        let file = write_fvecs(&[vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]]);
        let pv: PointVector<L2> = fvecs_from_file(file.path()).unwrap();
        assert_eq!(pv.len(), 2);
        assert_eq!(pv.dim(), 3);
        assert_approx_eq!(pv.point(1)[0], 3.0);
        assert_approx_eq!(pv.distance(0, 1), (27.0 as Real).sqrt());
    }

    #[test]
    fn bvecs_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for rec in [[1u8, 2, 3], [4, 5, 6]] {
            file.write_all(&3i32.to_le_bytes()).unwrap();
            file.write_all(&rec).unwrap();
        }
        file.flush().unwrap();
        let pv: PointVector<L2> = bvecs_from_file(file.path()).unwrap();
        assert_eq!(pv.len(), 2);
        assert_approx_eq!(pv.point(0)[2], 3.0);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&3i32.to_le_bytes()).unwrap();
        file.write_all(&1.0f32.to_le_bytes()).unwrap();
        file.flush().unwrap();
        match fvecs_from_file::<L2, _>(file.path()) {
            Err(PointSetError::BadRecord { record, .. }) => assert_eq!(record, 0),
            other => panic!("expected a bad record error, got {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn disagreeing_dims_are_rejected() {
        let file = write_fvecs(&[vec![0.0, 1.0], vec![1.0, 2.0, 3.0]]);
        assert!(fvecs_from_file::<L2, _>(file.path()).is_err());
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(fvecs_from_file::<L2, _>(file.path()).is_err());
    }
}
