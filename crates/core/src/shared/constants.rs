pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

pub const SWAP_MODEL_NAME: &str = "inswapper_128.onnx";
pub const SWAP_MODEL_URL: &str =
    "https://github.com/facefusion/facefusion-assets/releases/download/models/inswapper_128.onnx";

/// Run full inference on every Nth frame.
pub const DEFAULT_STRIDE: usize = 2;

/// Concurrent frame-processing jobs across all requests.
pub const DEFAULT_WORKERS: usize = 4;

pub const DEFAULT_DETECTION_CONFIDENCE: f64 = 0.5;

/// Shown by most GIF players for frames that declare no delay.
pub const DEFAULT_FRAME_DELAY_MS: u32 = 100;

/// GIF quantizer speed (1 = best quality, 30 = fastest).
pub const DEFAULT_ENCODER_SPEED: i32 = 10;
