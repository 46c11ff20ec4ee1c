pub mod onnx_initializer;
pub mod onnx_inswapper;
