use std::sync::Arc;
use std::time::Instant;

use crate::animation::domain::animation_reader::AnimationReader;
use crate::animation::domain::animation_writer::AnimationWriter;
use crate::animation::domain::still_image_reader::StillImageReader;
use crate::identity::domain::identity_extractor::IdentityExtractor;
use crate::pipeline::frame_dispatcher::FrameDispatcher;
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::frame_sampler::FrameSampler;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::sequence_reconstructor::reconstruct;
use crate::shared::frame::Frame;
use crate::shared::swap_error::SwapError;

/// Orchestrates one swap request end to end.
///
/// `decode → lock identity → sample → dispatch → reconstruct → encode`
///
/// Holds only shared, immutable collaborators, so one instance serves any
/// number of concurrent requests.
pub struct SwapFacesUseCase {
    reader: Arc<dyn AnimationReader>,
    image_reader: Arc<dyn StillImageReader>,
    writer: Arc<dyn AnimationWriter>,
    extractor: IdentityExtractor,
    processor: Arc<FrameProcessor>,
    dispatcher: Arc<dyn FrameDispatcher>,
    sampler: FrameSampler,
}

impl SwapFacesUseCase {
    pub fn new(
        reader: Arc<dyn AnimationReader>,
        image_reader: Arc<dyn StillImageReader>,
        writer: Arc<dyn AnimationWriter>,
        extractor: IdentityExtractor,
        processor: Arc<FrameProcessor>,
        dispatcher: Arc<dyn FrameDispatcher>,
        sampler: FrameSampler,
    ) -> Self {
        Self {
            reader,
            image_reader,
            writer,
            extractor,
            processor,
            dispatcher,
            sampler,
        }
    }

    pub fn execute(
        &self,
        animation_bytes: &[u8],
        reference_bytes: &[u8],
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<u8>, SwapError> {
        let started = Instant::now();
        let animation = self
            .reader
            .read(animation_bytes)
            .map_err(|e| SwapError::InvalidInput(format!("could not decode animation: {e}")))?;
        if animation.frames.is_empty() {
            return Err(SwapError::InvalidInput("animation has no frames".into()));
        }
        let frame_count = animation.frames.len();
        logger.timing("decode", elapsed_ms(started));

        let started = Instant::now();
        let reference = self
            .image_reader
            .read(reference_bytes)
            .map_err(|e| SwapError::ImageLoad(e.to_string()))?;
        let identity = Arc::new(self.extractor.extract(&reference)?);
        logger.timing("identity", elapsed_ms(started));

        let samples = self.sampler.sample(frame_count);
        logger.info(&format!(
            "Swapping {} of {frame_count} frames (stride {})",
            samples.len(),
            self.sampler.stride()
        ));
        let sampled: Vec<Frame> = samples
            .indices()
            .iter()
            .map(|&i| animation.frames[i].clone())
            .collect();

        let started = Instant::now();
        let processed = self.dispatcher.dispatch_all(
            sampled,
            Arc::clone(&identity),
            Arc::clone(&self.processor),
            &mut |done, total| logger.progress(done, total),
        );
        logger.timing("dispatch", elapsed_ms(started));

        let degraded = processed.iter().filter(|p| p.is_degraded()).count();
        for result in &processed {
            logger.metric("faces_swapped", result.swapped_faces() as f64);
        }
        logger.metric("degraded_frames", degraded as f64);
        if degraded > 0 {
            log::warn!(
                "{degraded} of {} sampled frame(s) kept their original pixels",
                processed.len()
            );
        }

        let started = Instant::now();
        let output = reconstruct(frame_count, &samples, processed, &animation.frames)?;
        logger.timing("reconstruct", elapsed_ms(started));

        let started = Instant::now();
        let bytes = self
            .writer
            .write(output.frames(), &animation.metadata)
            .map_err(|e| SwapError::Encode(e.to_string()))?;
        logger.timing("encode", elapsed_ms(started));

        logger.summary();
        Ok(bytes)
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::domain::animation_reader::DecodedAnimation;
    use crate::detection::domain::detected_face::DetectedFace;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::identity::domain::face_embedder::FaceEmbedder;
    use crate::identity::domain::identity::Identity;
    use crate::pipeline::infrastructure::worker_pool_dispatcher::WorkerPoolDispatcher;
    use crate::pipeline::pipeline_logger::{NullPipelineLogger, StdoutPipelineLogger};
    use crate::shared::animation_metadata::AnimationMetadata;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::swap_error::DynError;
    use crate::swapping::domain::face_swapper::FaceSwapper;
    use std::collections::HashSet;
    use std::sync::Mutex;

    const W: u32 = 8;
    const H: u32 = 8;
    const SWAPPED: u8 = 250;

    // --- Stubs ---

    /// "Decodes" by ignoring the bytes and returning `count` RGBA frames whose
    /// red channel is the frame index.
    struct StubReader {
        count: usize,
    }

    impl AnimationReader for StubReader {
        fn read(&self, bytes: &[u8]) -> Result<DecodedAnimation, DynError> {
            if bytes == b"corrupt" {
                return Err("bad header".into());
            }
            let frames = (0..self.count)
                .map(|i| {
                    let px = [i as u8, 0, 0, 255];
                    let data = px.iter().copied().cycle().take((W * H * 4) as usize).collect();
                    Frame::new(data, W, H, 4, i)
                })
                .collect();
            Ok(DecodedAnimation {
                frames,
                metadata: AnimationMetadata {
                    width: W,
                    height: H,
                    frame_delays_ms: vec![70; self.count],
                },
            })
        }
    }

    struct StubImageReader;

    impl StillImageReader for StubImageReader {
        fn read(&self, bytes: &[u8]) -> Result<Frame, DynError> {
            match bytes {
                b"face" | b"blank" => Ok(Frame::new(bytes.repeat(3)[..12].to_vec(), 2, 2, 3, 0)),
                _ => Err("unknown image format".into()),
            }
        }
    }

    /// Records what it was asked to encode.
    struct RecordingWriter {
        written: Mutex<Vec<(Vec<Frame>, AnimationMetadata)>>,
        fail: bool,
    }

    impl RecordingWriter {
        fn new() -> Self {
            Self {
                written: Mutex::new(Vec::new()),
                fail: false,
            }
        }
    }

    impl AnimationWriter for RecordingWriter {
        fn write(
            &self,
            frames: &[Frame],
            metadata: &AnimationMetadata,
        ) -> Result<Vec<u8>, DynError> {
            if self.fail {
                return Err("disk full".into());
            }
            self.written
                .lock()
                .unwrap()
                .push((frames.to_vec(), metadata.clone()));
            Ok(b"GIF89a".to_vec())
        }
    }

    /// One face on every frame; none on the "blank" reference (first byte 'b').
    struct StubDetector {
        failing_frames: HashSet<usize>,
    }

    impl FaceDetector for StubDetector {
        fn detect(&self, frame: &Frame) -> Result<Vec<DetectedFace>, DynError> {
            if frame.width() == 2 && frame.data()[0] == b'b' {
                return Ok(vec![]);
            }
            if frame.width() == W && self.failing_frames.contains(&frame.index()) {
                return Err("detector crashed".into());
            }
            Ok(vec![DetectedFace::new(BoundingBox::new(1.0, 1.0, 4.0, 4.0), 0.9)])
        }
    }

    struct StubEmbedder;

    impl FaceEmbedder for StubEmbedder {
        fn embed(&self, _frame: &Frame, _face: &DetectedFace) -> Result<Vec<f32>, DynError> {
            Ok(vec![0.0, 1.0])
        }
    }

    /// Sets the green channel of the whole frame and counts calls.
    struct MarkingSwapper {
        calls: Mutex<usize>,
    }

    impl FaceSwapper for MarkingSwapper {
        fn swap(
            &self,
            frame: &Frame,
            _target: &DetectedFace,
            _identity: &Identity,
        ) -> Result<Frame, DynError> {
            *self.calls.lock().unwrap() += 1;
            let mut data = frame.data().to_vec();
            for px in data.chunks_exact_mut(3) {
                px[1] = SWAPPED;
            }
            Ok(Frame::new(data, frame.width(), frame.height(), 3, frame.index()))
        }
    }

    // --- Helpers ---

    struct Fixture {
        use_case: SwapFacesUseCase,
        writer: Arc<RecordingWriter>,
        swapper: Arc<MarkingSwapper>,
    }

    fn fixture(count: usize, stride: usize, failing_frames: &[usize]) -> Fixture {
        fixture_with_writer(count, stride, failing_frames, RecordingWriter::new())
    }

    fn fixture_with_writer(
        count: usize,
        stride: usize,
        failing_frames: &[usize],
        writer: RecordingWriter,
    ) -> Fixture {
        let detector: Arc<dyn FaceDetector> = Arc::new(StubDetector {
            failing_frames: failing_frames.iter().copied().collect(),
        });
        let swapper = Arc::new(MarkingSwapper {
            calls: Mutex::new(0),
        });
        let writer = Arc::new(writer);
        let use_case = SwapFacesUseCase::new(
            Arc::new(StubReader { count }),
            Arc::new(StubImageReader),
            writer.clone(),
            IdentityExtractor::new(detector.clone(), Arc::new(StubEmbedder)),
            Arc::new(FrameProcessor::new(detector, swapper.clone())),
            Arc::new(WorkerPoolDispatcher::new(2).unwrap()),
            FrameSampler::new(stride).unwrap(),
        );
        Fixture {
            use_case,
            writer,
            swapper,
        }
    }

    fn written_frames(f: &Fixture) -> Vec<Frame> {
        f.writer.written.lock().unwrap()[0].0.clone()
    }

    // --- Tests ---

    #[test]
    fn test_ten_frames_stride_two() {
        let f = fixture(10, 2, &[]);

        let bytes = f
            .use_case
            .execute(b"gif", b"face", &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(bytes, b"GIF89a");
        assert_eq!(*f.swapper.calls.lock().unwrap(), 5);
        let frames = written_frames(&f);
        assert_eq!(frames.len(), 10);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data()[1], SWAPPED);
            // Odd frames show their preceding even frame.
            assert_eq!(frame.data()[0], (i - i % 2) as u8);
        }
    }

    #[test]
    fn test_timing_metadata_passed_through() {
        let f = fixture(3, 2, &[]);
        f.use_case
            .execute(b"gif", b"face", &mut NullPipelineLogger)
            .unwrap();
        let metadata = f.writer.written.lock().unwrap()[0].1.clone();
        assert_eq!(metadata.frame_delays_ms, vec![70, 70, 70]);
    }

    #[test]
    fn test_failed_frame_and_its_follower_show_original() {
        let f = fixture(6, 2, &[2]);

        f.use_case
            .execute(b"gif", b"face", &mut NullPipelineLogger)
            .unwrap();

        let frames = written_frames(&f);
        assert_eq!(frames.len(), 6);
        assert_eq!(&frames[2].data()[..3], &[2, 0, 0]);
        assert_eq!(&frames[3].data()[..3], &[2, 0, 0]);
        assert_eq!(frames[4].data()[1], SWAPPED);
    }

    #[test]
    fn test_reference_without_face() {
        let f = fixture(4, 2, &[]);
        let err = f
            .use_case
            .execute(b"gif", b"blank", &mut NullPipelineLogger)
            .unwrap_err();
        assert!(matches!(err, SwapError::NoFaceDetected));
        assert!(f.writer.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_undecodable_reference() {
        let f = fixture(4, 2, &[]);
        let err = f
            .use_case
            .execute(b"gif", b"???", &mut NullPipelineLogger)
            .unwrap_err();
        assert!(matches!(err, SwapError::ImageLoad(_)));
    }

    #[test]
    fn test_undecodable_animation() {
        let f = fixture(4, 2, &[]);
        let err = f
            .use_case
            .execute(b"corrupt", b"face", &mut NullPipelineLogger)
            .unwrap_err();
        assert!(matches!(err, SwapError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_animation() {
        let f = fixture(0, 2, &[]);
        let err = f
            .use_case
            .execute(b"gif", b"face", &mut NullPipelineLogger)
            .unwrap_err();
        assert!(matches!(err, SwapError::InvalidInput(_)));
    }

    #[test]
    fn test_encode_failure() {
        let writer = RecordingWriter {
            fail: true,
            ..RecordingWriter::new()
        };
        let f = fixture_with_writer(2, 1, &[], writer);
        let err = f
            .use_case
            .execute(b"gif", b"face", &mut NullPipelineLogger)
            .unwrap_err();
        assert!(matches!(err, SwapError::Encode(_)));
    }

    #[test]
    fn test_single_frame() {
        let f = fixture(1, 4, &[]);
        f.use_case
            .execute(b"gif", b"face", &mut NullPipelineLogger)
            .unwrap();
        assert_eq!(written_frames(&f).len(), 1);
        assert_eq!(*f.swapper.calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let f = fixture(5, 2, &[]);
        let mut logger = NullPipelineLogger;
        f.use_case.execute(b"gif", b"face", &mut logger).unwrap();
        f.use_case.execute(b"gif", b"face", &mut logger).unwrap();

        let written = f.writer.written.lock().unwrap();
        assert_eq!(written[0].0, written[1].0);
    }

    #[test]
    fn test_logger_receives_stages_and_metrics() {
        let f = fixture(6, 2, &[4]);
        let mut logger = StdoutPipelineLogger::new(1);

        f.use_case.execute(b"gif", b"face", &mut logger).unwrap();

        for stage in ["decode", "identity", "dispatch", "reconstruct", "encode"] {
            assert!(logger.stage_ms(stage).is_some(), "missing stage {stage}");
        }
        let degraded = logger.metric_stats("degraded_frames").unwrap();
        assert_eq!(degraded.sum, 1.0);
        let swapped = logger.metric_stats("faces_swapped").unwrap();
        assert_eq!(swapped.count, 3);
        assert_eq!(swapped.sum, 2.0);
    }
}
