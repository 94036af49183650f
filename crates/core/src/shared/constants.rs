/// Upstream location of the stock OpenCV Haar cascades.
pub const CASCADE_BASE_URL: &str =
    "https://raw.githubusercontent.com/opencv/opencv/4.x/data/haarcascades";

/// Highest device index probed (exclusive) when enumerating cameras.
pub const MAX_PROBED_DEVICES: u32 = 10;

/// Default polling cadence of the live/file loop.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30;

pub const DEFAULT_DISPLAY_BOX: (u32, u32) = (640, 480);

pub const DEFAULT_CAPTURE_SIZE: (u32, u32) = (640, 480);
pub const DEFAULT_CAPTURE_FPS: u32 = 30;

/// Neighbour-merge tolerance used when grouping raw cascade hits.
pub const GROUP_EPS: f64 = 0.2;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
