//! MATLAB Level 5 MAT-file codec for double matrices and cell arrays
//!
//! Only the subset needed for time series results is supported: little-endian
//! files, uncompressed `miMATRIX` elements, real double matrices (stored with
//! any numeric element type) and cell arrays of those.

use crate::io::discovery::create_parent_dir;
use crate::io::error::{AnalysisError, Result};
use ndarray::{Array2, ShapeBuilder};
use std::path::Path;

const HEADER_TEXT_LEN: usize = 116;
const HEADER_LEN: usize = 128;
const VERSION: u16 = 0x0100;
const ENDIAN_LE: [u8; 2] = *b"IM";

// Data types
const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

// Array classes
const MX_CELL_CLASS: u8 = 1;
const MX_DOUBLE_CLASS: u8 = 6;

const FLAG_COMPLEX: u32 = 0x0800;

/// A value stored under a MAT-file variable name
#[derive(Debug, Clone, PartialEq)]
pub enum MatValue {
    /// Real double matrix
    Double(Array2<f64>),
    /// Cell array, elements in storage (column-major) order
    Cell(Vec<MatValue>),
}

impl MatValue {
    /// Cell array holding one matrix per element, saved as a 1 x N row
    pub fn cell_of_matrices(matrices: Vec<Array2<f64>>) -> Self {
        Self::Cell(matrices.into_iter().map(Self::Double).collect())
    }

    /// Matrices of a cell array of doubles
    ///
    /// Returns `None` if this is not a cell array or an element is not a
    /// double matrix.
    pub fn into_matrices(self) -> Option<Vec<Array2<f64>>> {
        match self {
            Self::Cell(items) => items
                .into_iter()
                .map(|item| match item {
                    Self::Double(m) => Some(m),
                    Self::Cell(_) => None,
                })
                .collect(),
            Self::Double(_) => None,
        }
    }
}

/// Encode named variables into MAT-file bytes
pub fn encode_mat(variables: &[(&str, &MatValue)]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);

    let created = chrono::Utc::now().format("%a %b %e %H:%M:%S %Y");
    let mut text = format!("MATLAB 5.0 MAT-file, Platform: neuroconn, Created on: {created}")
        .into_bytes();
    text.resize(HEADER_TEXT_LEN, b' ');
    out.extend_from_slice(&text);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&ENDIAN_LE);

    for (name, value) in variables {
        write_matrix(&mut out, name, value);
    }

    out
}

/// Write named variables to a MAT-file, creating parent directories
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written
pub fn write_mat<P: AsRef<Path>>(path: P, variables: &[(&str, &MatValue)]) -> Result<()> {
    let path = path.as_ref();
    create_parent_dir(path)?;

    std::fs::write(path, encode_mat(variables)).map_err(|e| AnalysisError::FileSystem {
        path: path.to_path_buf(),
        operation: "write MAT-file",
        source: e,
    })
}

/// Read every variable of a MAT-file, in file order
///
/// # Errors
///
/// Returns an error if the file cannot be read or uses unsupported features
pub fn read_mat<P: AsRef<Path>>(path: P) -> Result<Vec<(String, MatValue)>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| AnalysisError::FileSystem {
        path: path.to_path_buf(),
        operation: "read MAT-file",
        source: e,
    })?;
    decode_mat(&bytes, path)
}

/// Decode MAT-file bytes; `origin` is only used in error messages
///
/// # Errors
///
/// Returns an error on truncated data, big-endian files, compressed
/// elements, complex data or unsupported array classes
pub fn decode_mat(bytes: &[u8], origin: &Path) -> Result<Vec<(String, MatValue)>> {
    let mut reader = Reader {
        bytes,
        pos: 0,
        origin,
    };

    let header = reader.take(HEADER_LEN)?;
    if header.get(126..128) != Some(&ENDIAN_LE[..]) {
        return Err(reader.error("only little-endian Level 5 files are supported"));
    }

    let mut variables = Vec::new();
    while reader.remaining() >= 8 {
        let (data_type, size) = reader.tag()?;
        let element = reader.take(size)?;
        reader.align();

        match data_type {
            MI_MATRIX => {
                let mut inner = Reader {
                    bytes: element,
                    pos: 0,
                    origin,
                };
                variables.push(inner.matrix_body()?);
            }
            MI_COMPRESSED => return Err(reader.error("compressed elements are not supported")),
            other => return Err(reader.error(&format!("unexpected top-level element type {other}"))),
        }
    }

    Ok(variables)
}

const fn padded(len: usize) -> usize {
    len.div_ceil(8) * 8
}

fn push_tag(out: &mut Vec<u8>, data_type: u32, size: usize) {
    out.extend_from_slice(&data_type.to_le_bytes());
    out.extend_from_slice(&(size as u32).to_le_bytes());
}

fn push_padding(out: &mut Vec<u8>, written: usize) {
    out.resize(out.len() + padded(written) - written, 0);
}

fn write_matrix(out: &mut Vec<u8>, name: &str, value: &MatValue) {
    let mut body = Vec::new();

    let (class, dims) = match value {
        MatValue::Double(m) => (MX_DOUBLE_CLASS, [m.nrows(), m.ncols()]),
        MatValue::Cell(items) => (MX_CELL_CLASS, [1, items.len()]),
    };

    push_tag(&mut body, MI_UINT32, 8);
    body.extend_from_slice(&u32::from(class).to_le_bytes());
    body.extend_from_slice(&0u32.to_le_bytes());

    push_tag(&mut body, MI_INT32, 8);
    for dim in dims {
        body.extend_from_slice(&(dim as i32).to_le_bytes());
    }

    push_tag(&mut body, MI_INT8, name.len());
    body.extend_from_slice(name.as_bytes());
    push_padding(&mut body, name.len());

    match value {
        MatValue::Double(m) => {
            push_tag(&mut body, MI_DOUBLE, m.len() * 8);
            // Column-major storage
            for v in m.t() {
                body.extend_from_slice(&v.to_le_bytes());
            }
        }
        MatValue::Cell(items) => {
            for item in items {
                write_matrix(&mut body, "", item);
            }
        }
    }

    push_tag(out, MI_MATRIX, body.len());
    out.extend_from_slice(&body);
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    origin: &'a Path,
}

impl<'a> Reader<'a> {
    fn error(&self, reason: &str) -> AnalysisError {
        AnalysisError::MatFile {
            path: self.origin.to_path_buf(),
            reason: format!("{reason} (offset {})", self.pos),
        }
    }

    const fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| self.error("unexpected end of data"))?;
        let slice = self.bytes.get(self.pos..end).unwrap_or_default();
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let raw = self.take(4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(raw);
        Ok(u32::from_le_bytes(buf))
    }

    const fn align(&mut self) {
        self.pos = padded(self.pos);
    }

    fn tag(&mut self) -> Result<(u32, usize)> {
        let first = self.u32()?;
        let second = self.u32()?;
        Ok((first, second as usize))
    }

    // Small data elements pack type and size into the first word
    fn sub_element(&mut self) -> Result<(u32, &'a [u8])> {
        let first = self.u32()?;
        let small_size = (first >> 16) as usize;
        if small_size != 0 {
            let data = self.take(4)?;
            return Ok((first & 0xFFFF, data.get(..small_size).unwrap_or(data)));
        }

        let size = self.u32()? as usize;
        let data = self.take(size)?;
        self.align();
        Ok((first, data))
    }

    fn matrix_body(&mut self) -> Result<(String, MatValue)> {
        let (_, flags_data) = self.sub_element()?;
        let flags = numeric_values(MI_UINT32, flags_data)
            .and_then(|v| v.first().copied())
            .ok_or_else(|| self.error("missing array flags"))? as u32;
        let class = (flags & 0xFF) as u8;
        if flags & FLAG_COMPLEX != 0 {
            return Err(self.error("complex arrays are not supported"));
        }

        let (dims_type, dims_data) = self.sub_element()?;
        let dims: Vec<usize> = numeric_values(dims_type, dims_data)
            .ok_or_else(|| self.error("invalid dimensions"))?
            .into_iter()
            .map(|d| d as usize)
            .collect();

        let (_, name_data) = self.sub_element()?;
        let name = String::from_utf8_lossy(name_data).into_owned();

        let count: usize = dims.iter().product();
        let value = match class {
            MX_DOUBLE_CLASS => {
                let [rows, cols] = dims.as_slice() else {
                    return Err(self.error("only two-dimensional matrices are supported"));
                };
                let (data_type, data) = if count == 0 && self.remaining() == 0 {
                    (MI_DOUBLE, &[][..])
                } else {
                    self.sub_element()?
                };
                let values = numeric_values(data_type, data)
                    .ok_or_else(|| self.error(&format!("unsupported data type {data_type}")))?;
                let matrix = Array2::from_shape_vec((*rows, *cols).f(), values)
                    .map_err(|e| self.error(&e.to_string()))?;
                MatValue::Double(matrix)
            }
            MX_CELL_CLASS => {
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    let (data_type, size) = self.tag()?;
                    if data_type != MI_MATRIX {
                        return Err(self.error("cell element is not a matrix"));
                    }
                    let element = self.take(size)?;
                    self.align();
                    let mut inner = Reader {
                        bytes: element,
                        pos: 0,
                        origin: self.origin,
                    };
                    items.push(inner.matrix_body()?.1);
                }
                MatValue::Cell(items)
            }
            other => return Err(self.error(&format!("unsupported array class {other}"))),
        };

        Ok((name, value))
    }
}

fn numeric_values(data_type: u32, data: &[u8]) -> Option<Vec<f64>> {
    fn decode<const N: usize>(data: &[u8], convert: fn([u8; N]) -> f64) -> Vec<f64> {
        data.chunks_exact(N)
            .map(|chunk| {
                let mut buf = [0u8; N];
                buf.copy_from_slice(chunk);
                convert(buf)
            })
            .collect()
    }

    let values = match data_type {
        MI_INT8 => decode::<1>(data, |b| f64::from(i8::from_le_bytes(b))),
        MI_UINT8 => decode::<1>(data, |b| f64::from(u8::from_le_bytes(b))),
        MI_INT16 => decode::<2>(data, |b| f64::from(i16::from_le_bytes(b))),
        MI_UINT16 => decode::<2>(data, |b| f64::from(u16::from_le_bytes(b))),
        MI_INT32 => decode::<4>(data, |b| f64::from(i32::from_le_bytes(b))),
        MI_UINT32 => decode::<4>(data, |b| f64::from(u32::from_le_bytes(b))),
        MI_SINGLE => decode::<4>(data, |b| f64::from(f32::from_le_bytes(b))),
        MI_DOUBLE => decode::<8>(data, f64::from_le_bytes),
        MI_INT64 => decode::<8>(data, |b| i64::from_le_bytes(b) as f64),
        MI_UINT64 => decode::<8>(data, |b| u64::from_le_bytes(b) as f64),
        _ => return None,
    };
    Some(values)
}
