pub mod shared {
    pub mod constants;
    pub mod detection;
    pub mod frame;
    pub mod model_resolver;
}

pub mod capture {
    pub mod domain {
        pub mod capture_backend;
        pub mod capture_error;
        pub mod capture_session;
        pub mod device_id;
        pub mod still_image_reader;
    }
    pub mod infrastructure {
        pub mod ffmpeg_camera;
        pub mod image_file_reader;
    }
}

pub mod detection {
    pub mod domain {
        pub mod detection_error;
        pub mod detector_profile;
        pub mod detector_registry;
        pub mod object_classifier;
    }
    pub mod infrastructure {
        pub mod haar_cascade;
        pub mod rect_grouping;
    }
}

pub mod pipeline {
    pub mod annotation;
    pub mod display_sink;
    pub mod frame_pipeline;
    pub mod pipeline_config;
    pub mod pipeline_controller;
    pub mod pipeline_logger;
    pub mod scale_to_fit;
    pub mod infrastructure {
        pub mod polling_loop;
    }
}

#[cfg(test)]
mod test_support;
