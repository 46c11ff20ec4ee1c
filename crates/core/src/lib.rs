pub mod animation {
    pub mod domain {
        pub mod animation_reader;
        pub mod animation_writer;
        pub mod still_image_reader;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod detected_face;
        pub mod face_detector;
        pub mod face_landmarks;
    }
    pub mod infrastructure;
}

pub mod identity {
    pub mod domain {
        pub mod face_embedder;
        pub mod identity;
        pub mod identity_extractor;
    }
    pub mod infrastructure;
}

pub mod swapping {
    pub mod domain {
        pub mod face_swapper;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod face_swap_service;
    pub mod frame_dispatcher;
    pub mod frame_processor;
    pub mod frame_sampler;
    pub mod infrastructure;
    pub mod list_faces_use_case;
    pub mod pipeline_logger;
    pub mod processed_frame;
    pub mod sequence_reconstructor;
    pub mod swap_faces_use_case;
}

pub mod shared {
    pub mod animation_metadata;
    pub mod bounding_box;
    pub mod constants;
    pub mod face_alignment;
    pub mod frame;
    pub mod model_resolver;
    pub mod swap_error;
}

pub use pipeline::face_swap_service::{
    FaceModels, FaceSwapService, HealthReport, ModelPaths, ModelState, SwapConfig,
};
pub use shared::swap_error::{ErrorClass, SwapError};
