//! Minimal reader for constant tensors stored inside an ONNX model file.
//!
//! The swap model ships its identity projection matrix as the last graph
//! initializer. ONNX Runtime doesn't expose initializers, so this walks the
//! protobuf encoding directly and decodes only the fields needed:
//!
//! - `ModelProto.graph` (7)
//! - `GraphProto.initializer` (5, repeated)
//! - `TensorProto.dims` (1), `data_type` (2), `float_data` (4), `name` (8),
//!   `raw_data` (9)

use std::path::Path;

use thiserror::Error;

/// `TensorProto.DataType.FLOAT`.
const DATA_TYPE_FLOAT: u64 = 1;

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

#[derive(Error, Debug)]
pub enum InitializerError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed model protobuf: {0}")]
    Malformed(String),
    #[error("model graph has no initializers")]
    NoInitializers,
    #[error("initializer {name} has data type {data_type}, expected float")]
    UnsupportedType { name: String, data_type: u64 },
    #[error("initializer {name} holds {actual} values, dims {dims:?} need {expected}")]
    SizeMismatch {
        name: String,
        dims: Vec<i64>,
        expected: usize,
        actual: usize,
    },
}

/// A float tensor constant decoded from a model.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorInitializer {
    pub name: String,
    pub dims: Vec<i64>,
    pub data: Vec<f32>,
}

pub fn read_last_initializer(model_path: &Path) -> Result<TensorInitializer, InitializerError> {
    let bytes = std::fs::read(model_path)?;
    last_initializer(&bytes)
}

/// Decodes the last initializer of the model's graph.
pub fn last_initializer(model: &[u8]) -> Result<TensorInitializer, InitializerError> {
    let graph = last_field(model, 7)?.ok_or_else(|| malformed("model has no graph"))?;
    let tensor = last_field(graph, 5)?.ok_or(InitializerError::NoInitializers)?;
    decode_tensor(tensor)
}

/// Payload of the last length-delimited occurrence of `field` in `message`.
fn last_field(message: &[u8], field: u32) -> Result<Option<&[u8]>, InitializerError> {
    let mut reader = WireReader::new(message);
    let mut found = None;
    while !reader.is_done() {
        let (number, wire) = reader.key()?;
        if number == field && wire == WIRE_LEN {
            found = Some(reader.len_delimited()?);
        } else {
            reader.skip(wire)?;
        }
    }
    Ok(found)
}

fn decode_tensor(bytes: &[u8]) -> Result<TensorInitializer, InitializerError> {
    let mut reader = WireReader::new(bytes);
    let mut name = String::new();
    let mut dims = Vec::new();
    let mut data_type = DATA_TYPE_FLOAT;
    let mut float_data = Vec::new();
    let mut raw_data: Option<&[u8]> = None;

    while !reader.is_done() {
        match reader.key()? {
            (1, WIRE_VARINT) => dims.push(reader.varint()? as i64),
            (1, WIRE_LEN) => {
                let mut packed = WireReader::new(reader.len_delimited()?);
                while !packed.is_done() {
                    dims.push(packed.varint()? as i64);
                }
            }
            (2, WIRE_VARINT) => data_type = reader.varint()?,
            (4, WIRE_FIXED32) => float_data.push(f32::from_bits(reader.fixed32()?)),
            (4, WIRE_LEN) => {
                let packed = reader.len_delimited()?;
                float_data.extend(le_floats(packed)?);
            }
            (8, WIRE_LEN) => {
                name = String::from_utf8_lossy(reader.len_delimited()?).into_owned();
            }
            (9, WIRE_LEN) => raw_data = Some(reader.len_delimited()?),
            (_, wire) => reader.skip(wire)?,
        }
    }

    if data_type != DATA_TYPE_FLOAT {
        return Err(InitializerError::UnsupportedType { name, data_type });
    }

    let data = match raw_data {
        Some(raw) => le_floats(raw)?,
        None => float_data,
    };

    let expected = dims.iter().try_fold(1usize, |acc, &d| {
        usize::try_from(d).ok().and_then(|d| acc.checked_mul(d))
    });
    match expected {
        Some(expected) if expected == data.len() => Ok(TensorInitializer { name, dims, data }),
        Some(expected) => Err(InitializerError::SizeMismatch {
            name,
            dims,
            expected,
            actual: data.len(),
        }),
        None => Err(malformed(&format!("initializer {name} has invalid dims {dims:?}"))),
    }
}

fn le_floats(bytes: &[u8]) -> Result<Vec<f32>, InitializerError> {
    if bytes.len() % 4 != 0 {
        return Err(malformed("float payload is not a multiple of 4 bytes"));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn malformed(message: &str) -> InitializerError {
    InitializerError::Malformed(message.to_string())
}

/// Cursor over protobuf wire-format bytes.
struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn varint(&mut self) -> Result<u64, InitializerError> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or_else(|| malformed("truncated varint"))?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(malformed("varint longer than 10 bytes"))
    }

    fn key(&mut self) -> Result<(u32, u8), InitializerError> {
        let key = self.varint()?;
        let number = u32::try_from(key >> 3).map_err(|_| malformed("field number overflow"))?;
        Ok((number, (key & 0x7) as u8))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], InitializerError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| malformed("field runs past end of message"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn len_delimited(&mut self) -> Result<&'a [u8], InitializerError> {
        let len = usize::try_from(self.varint()?).map_err(|_| malformed("length overflow"))?;
        self.take(len)
    }

    fn fixed32(&mut self) -> Result<u32, InitializerError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip(&mut self, wire: u8) -> Result<(), InitializerError> {
        match wire {
            WIRE_VARINT => self.varint().map(|_| ()),
            WIRE_FIXED64 => self.take(8).map(|_| ()),
            WIRE_LEN => self.len_delimited().map(|_| ()),
            WIRE_FIXED32 => self.take(4).map(|_| ()),
            other => Err(malformed(&format!("unsupported wire type {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Encoding helpers ---

    fn varint(mut v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                return out;
            }
            out.push(byte | 0x80);
        }
    }

    fn key(field: u32, wire: u8) -> Vec<u8> {
        varint(((field as u64) << 3) | wire as u64)
    }

    fn len_field(field: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = key(field, WIRE_LEN);
        out.extend(varint(payload.len() as u64));
        out.extend_from_slice(payload);
        out
    }

    fn varint_field(field: u32, value: u64) -> Vec<u8> {
        let mut out = key(field, WIRE_VARINT);
        out.extend(varint(value));
        out
    }

    fn raw_tensor(name: &str, dims: &[u64], values: &[f32]) -> Vec<u8> {
        let mut out = Vec::new();
        for &d in dims {
            out.extend(varint_field(1, d));
        }
        out.extend(varint_field(2, DATA_TYPE_FLOAT));
        out.extend(len_field(8, name.as_bytes()));
        let raw: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        out.extend(len_field(9, &raw));
        out
    }

    fn model_with(initializers: &[Vec<u8>]) -> Vec<u8> {
        let mut graph = len_field(1, b"node bytes are skipped");
        graph.extend(len_field(2, b"main_graph"));
        for init in initializers {
            graph.extend(len_field(5, init));
        }
        let mut model = varint_field(1, 8); // ir_version
        model.extend(len_field(2, b"producer"));
        model.extend(len_field(7, &graph));
        model
    }

    // --- Tests ---

    #[test]
    fn test_reads_last_initializer_from_raw_data() {
        let model = model_with(&[
            raw_tensor("weight", &[2], &[9.0, 9.0]),
            raw_tensor("emap", &[2, 2], &[1.0, 2.0, 3.0, 4.5]),
        ]);

        let tensor = last_initializer(&model).unwrap();

        assert_eq!(tensor.name, "emap");
        assert_eq!(tensor.dims, vec![2, 2]);
        assert_eq!(tensor.data, vec![1.0, 2.0, 3.0, 4.5]);
    }

    #[test]
    fn test_reads_packed_float_data_and_packed_dims() {
        let mut tensor = Vec::new();
        let packed_dims: Vec<u8> = [1u64, 3].iter().flat_map(|&d| varint(d)).collect();
        tensor.extend(len_field(1, &packed_dims));
        let floats: Vec<u8> = [0.5f32, -1.0, 2.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        tensor.extend(len_field(4, &floats));
        tensor.extend(len_field(8, b"packed"));

        let decoded = last_initializer(&model_with(&[tensor])).unwrap();

        assert_eq!(decoded.dims, vec![1, 3]);
        assert_eq!(decoded.data, vec![0.5, -1.0, 2.0]);
    }

    #[test]
    fn test_reads_unpacked_float_data() {
        let mut tensor = varint_field(1, 2);
        for v in [3.0f32, 4.0] {
            tensor.extend(key(4, WIRE_FIXED32));
            tensor.extend(v.to_bits().to_le_bytes());
        }

        let decoded = last_initializer(&model_with(&[tensor])).unwrap();
        assert_eq!(decoded.data, vec![3.0, 4.0]);
    }

    #[test]
    fn test_skips_fixed64_fields() {
        let mut tensor = key(3, WIRE_FIXED64);
        tensor.extend([0u8; 8]);
        tensor.extend(raw_tensor("t", &[1], &[7.0]));

        let decoded = last_initializer(&model_with(&[tensor])).unwrap();
        assert_eq!(decoded.data, vec![7.0]);
    }

    #[test]
    fn test_no_graph_is_malformed() {
        let model = varint_field(1, 8);
        assert!(matches!(
            last_initializer(&model),
            Err(InitializerError::Malformed(_))
        ));
    }

    #[test]
    fn test_graph_without_initializers() {
        assert!(matches!(
            last_initializer(&model_with(&[])),
            Err(InitializerError::NoInitializers)
        ));
    }

    #[test]
    fn test_non_float_tensor_rejected() {
        let mut tensor = varint_field(1, 1);
        tensor.extend(varint_field(2, 7)); // INT64
        tensor.extend(len_field(9, &[0u8; 8]));

        assert!(matches!(
            last_initializer(&model_with(&[tensor])),
            Err(InitializerError::UnsupportedType { data_type: 7, .. })
        ));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let tensor = raw_tensor("short", &[2, 2], &[1.0, 2.0, 3.0]);
        assert!(matches!(
            last_initializer(&model_with(&[tensor])),
            Err(InitializerError::SizeMismatch {
                expected: 4,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_truncated_message_is_malformed() {
        let mut model = model_with(&[raw_tensor("t", &[1], &[1.0])]);
        model.truncate(model.len() - 2);
        assert!(matches!(
            last_initializer(&model),
            Err(InitializerError::Malformed(_))
        ));
    }

    #[test]
    fn test_reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.onnx");
        std::fs::write(&path, model_with(&[raw_tensor("m", &[1], &[2.5])])).unwrap();

        assert_eq!(read_last_initializer(&path).unwrap().data, vec![2.5]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            read_last_initializer(Path::new("/nonexistent/model.onnx")),
            Err(InitializerError::Io(_))
        ));
    }
}
