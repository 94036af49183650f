//! Boosted Haar cascade classifier read from OpenCV's cascade XML.
//!
//! Only the current storage layout (`<cascade>` with `BOOST` stages over
//! upright `HAAR` features) is understood. Evaluation mirrors the usual
//! scheme: an image pyramid, a sliding window over each level,
//! variance-normalised rectangle features and early-exit stages, followed
//! by rectangle grouping.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use image::imageops::FilterType;
use image::GrayImage;
use serde::{Deserialize, Deserializer};

use crate::detection::domain::detector_profile::{DetectionParams, ProfileId};
use crate::detection::domain::object_classifier::{
    ClassifierError, ClassifierLoader, ObjectClassifier,
};
use crate::shared::constants::{CASCADE_BASE_URL, GROUP_EPS};
use crate::shared::detection::Detection;
use crate::shared::model_resolver::{self, ResourceLocations};

use super::rect_grouping::group_rectangles;

// ── XML layout ──

#[derive(Deserialize)]
struct StorageXml {
    cascade: Option<CascadeXml>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CascadeXml {
    stage_type: String,
    feature_type: String,
    #[serde(deserialize_with = "trimmed")]
    height: u32,
    #[serde(deserialize_with = "trimmed")]
    width: u32,
    stages: StagesXml,
    features: FeaturesXml,
}

#[derive(Deserialize)]
struct StagesXml {
    #[serde(rename = "_", default)]
    items: Vec<StageXml>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageXml {
    #[serde(deserialize_with = "trimmed")]
    stage_threshold: f64,
    weak_classifiers: WeakClassifiersXml,
}

#[derive(Deserialize)]
struct WeakClassifiersXml {
    #[serde(rename = "_", default)]
    items: Vec<WeakClassifierXml>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeakClassifierXml {
    internal_nodes: String,
    leaf_values: String,
}

#[derive(Deserialize)]
struct FeaturesXml {
    #[serde(rename = "_", default)]
    items: Vec<FeatureXml>,
}

#[derive(Deserialize)]
struct FeatureXml {
    rects: RectsXml,
    #[serde(default)]
    tilted: Option<String>,
}

#[derive(Deserialize)]
struct RectsXml {
    #[serde(rename = "_", default)]
    items: Vec<String>,
}

fn trimmed<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim().parse().map_err(serde::de::Error::custom)
}

fn numbers<T>(text: &str, what: &str) -> Result<Vec<T>, ClassifierError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.split_whitespace()
        .map(|tok| {
            tok.parse()
                .map_err(|e| ClassifierError::Malformed(format!("{what}: {tok:?}: {e}")))
        })
        .collect()
}

// ── Compiled cascade ──

#[derive(Clone, Debug)]
struct WeightedRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f64,
}

#[derive(Clone, Debug)]
struct Feature {
    rects: Vec<WeightedRect>,
}

#[derive(Clone, Copy, Debug)]
struct Node {
    feature: usize,
    threshold: f64,
    left: i32,
    right: i32,
}

#[derive(Clone, Debug)]
struct Tree {
    nodes: Vec<Node>,
    leaves: Vec<f64>,
}

#[derive(Clone, Debug)]
struct Stage {
    threshold: f64,
    trees: Vec<Tree>,
}

/// A parsed, validated cascade.
#[derive(Clone, Debug)]
pub struct HaarCascade {
    window: (u32, u32),
    stages: Vec<Stage>,
    features: Vec<Feature>,
}

impl HaarCascade {
    pub fn from_file(path: &Path) -> Result<Self, ClassifierError> {
        let xml = std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cascade = Self::from_xml(&xml)?;
        log::debug!(
            "Parsed {}: {}x{} window, {} stages, {} features",
            path.display(),
            cascade.window.0,
            cascade.window.1,
            cascade.stages.len(),
            cascade.features.len()
        );
        Ok(cascade)
    }

    pub fn from_xml(xml: &str) -> Result<Self, ClassifierError> {
        let storage: StorageXml = quick_xml::de::from_str(xml)?;
        let cascade = storage.cascade.ok_or_else(|| {
            ClassifierError::Unsupported("no <cascade> node (legacy layout?)".into())
        })?;

        if cascade.stage_type.trim() != "BOOST" {
            return Err(ClassifierError::Unsupported(format!(
                "stage type {}",
                cascade.stage_type.trim()
            )));
        }
        if cascade.feature_type.trim() != "HAAR" {
            return Err(ClassifierError::Unsupported(format!(
                "feature type {}",
                cascade.feature_type.trim()
            )));
        }
        let window = (cascade.width, cascade.height);
        if window.0 < 3 || window.1 < 3 {
            return Err(ClassifierError::Malformed(format!(
                "window {}x{} is too small",
                window.0, window.1
            )));
        }

        let features = cascade
            .features
            .items
            .iter()
            .enumerate()
            .map(|(i, f)| parse_feature(i, f, window))
            .collect::<Result<Vec<_>, _>>()?;

        let stages = cascade
            .stages
            .items
            .iter()
            .enumerate()
            .map(|(i, s)| parse_stage(i, s, features.len()))
            .collect::<Result<Vec<_>, _>>()?;

        if stages.is_empty() {
            return Err(ClassifierError::Malformed("cascade has no stages".into()));
        }

        Ok(Self {
            window,
            stages,
            features,
        })
    }

    /// Detector window size as `(width, height)`.
    pub fn window(&self) -> (u32, u32) {
        self.window
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Raw window hits over the whole pyramid, before grouping.
    fn scan(&self, gray: &GrayImage, params: &DetectionParams) -> Vec<Detection> {
        let (img_w, img_h) = gray.dimensions();
        let (win_w, win_h) = self.window;
        let (min_w, min_h) = params.min_size();
        let mut hits = Vec::new();

        let mut factor = 1.0f64;
        loop {
            let window_w = (f64::from(win_w) * factor).round() as u32;
            let window_h = (f64::from(win_h) * factor).round() as u32;
            let scaled_w = (f64::from(img_w) / factor).round() as u32;
            let scaled_h = (f64::from(img_h) / factor).round() as u32;
            if scaled_w < win_w || scaled_h < win_h {
                break;
            }

            if window_w >= min_w && window_h >= min_h {
                let level: Cow<'_, GrayImage> = if (scaled_w, scaled_h) == (img_w, img_h) {
                    Cow::Borrowed(gray)
                } else {
                    Cow::Owned(image::imageops::resize(
                        gray,
                        scaled_w,
                        scaled_h,
                        FilterType::Triangle,
                    ))
                };
                let integral = Integral::new(&level);
                let step = if factor > 2.0 { 1 } else { 2 };

                for y in (0..=scaled_h - win_h).step_by(step) {
                    for x in (0..=scaled_w - win_w).step_by(step) {
                        if self.accepts(&integral, x, y) {
                            hits.push(Detection::new(
                                (f64::from(x) * factor).round() as i32,
                                (f64::from(y) * factor).round() as i32,
                                window_w as i32,
                                window_h as i32,
                            ));
                        }
                    }
                }
            }

            factor *= params.scale_factor();
        }
        hits
    }

    /// Runs every stage on the window at `(x, y)`; false at the first
    /// rejecting stage.
    fn accepts(&self, ii: &Integral, x: u32, y: u32) -> bool {
        let (win_w, win_h) = self.window;
        let (norm_w, norm_h) = (win_w - 2, win_h - 2);
        let area = f64::from(norm_w * norm_h);
        let sum = ii.sum(x + 1, y + 1, norm_w, norm_h) as f64;
        let sq_sum = ii.sq_sum(x + 1, y + 1, norm_w, norm_h) as f64;
        let nf = area * sq_sum - sum * sum;
        let inv_norm = if nf > 0.0 { 1.0 / nf.sqrt() } else { 1.0 };

        let feature_value = |idx: usize| -> f64 {
            self.features[idx]
                .rects
                .iter()
                .map(|r| r.weight * ii.sum(x + r.x, y + r.y, r.width, r.height) as f64)
                .sum::<f64>()
                * inv_norm
        };

        self.stages.iter().all(|stage| {
            let total: f64 = stage
                .trees
                .iter()
                .map(|tree| {
                    let mut idx = 0i32;
                    loop {
                        let node = &tree.nodes[idx as usize];
                        idx = if feature_value(node.feature) < node.threshold {
                            node.left
                        } else {
                            node.right
                        };
                        if idx <= 0 {
                            break tree.leaves[(-idx) as usize];
                        }
                    }
                })
                .sum();
            total >= stage.threshold
        })
    }
}

impl ObjectClassifier for HaarCascade {
    fn detect_multi_scale(
        &self,
        gray: &GrayImage,
        params: &DetectionParams,
    ) -> Result<Vec<Detection>, ClassifierError> {
        let hits = self.scan(gray, params);
        let grouped = group_rectangles(hits, params.min_neighbors(), GROUP_EPS);
        log::trace!("{} detections", grouped.len());
        Ok(grouped)
    }
}

fn parse_feature(
    index: usize,
    xml: &FeatureXml,
    window: (u32, u32),
) -> Result<Feature, ClassifierError> {
    if xml.tilted.as_deref().is_some_and(|t| t.trim() != "0") {
        return Err(ClassifierError::Unsupported(format!("feature {index} is tilted")));
    }
    if xml.rects.items.is_empty() {
        return Err(ClassifierError::Malformed(format!("feature {index} has no rects")));
    }

    let rects = xml
        .rects
        .items
        .iter()
        .map(|text| {
            let what = format!("feature {index} rect");
            let values: Vec<f64> = numbers(text, &what)?;
            let [x, y, w, h, weight] = values[..] else {
                return Err(ClassifierError::Malformed(format!(
                    "{what} needs 5 values, got {}",
                    values.len()
                )));
            };
            let coord = |v: f64| (v >= 0.0 && v.fract() == 0.0).then_some(v as u32);
            let (Some(x), Some(y), Some(w), Some(h)) = (coord(x), coord(y), coord(w), coord(h))
            else {
                return Err(ClassifierError::Malformed(format!(
                    "{what} has non-integer or negative geometry"
                )));
            };
            if x + w > window.0 || y + h > window.1 {
                return Err(ClassifierError::Malformed(format!(
                    "{what} exceeds the {}x{} window",
                    window.0, window.1
                )));
            }
            Ok(WeightedRect {
                x,
                y,
                width: w,
                height: h,
                weight,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Feature { rects })
}

fn parse_stage(index: usize, xml: &StageXml, n_features: usize) -> Result<Stage, ClassifierError> {
    let trees = xml
        .weak_classifiers
        .items
        .iter()
        .enumerate()
        .map(|(t, weak)| {
            let what = format!("stage {index} tree {t}");
            let raw: Vec<f64> = numbers(&weak.internal_nodes, &what)?;
            let leaves: Vec<f64> = numbers(&weak.leaf_values, &what)?;
            if raw.is_empty() || raw.len() % 4 != 0 {
                return Err(ClassifierError::Malformed(format!(
                    "{what}: internal nodes come in groups of 4, got {}",
                    raw.len()
                )));
            }

            let nodes: Vec<Node> = raw
                .chunks_exact(4)
                .map(|c| Node {
                    left: c[0] as i32,
                    right: c[1] as i32,
                    feature: c[2] as usize,
                    threshold: c[3],
                })
                .collect();

            for node in &nodes {
                if node.feature >= n_features {
                    return Err(ClassifierError::Malformed(format!(
                        "{what} references feature {} of {n_features}",
                        node.feature
                    )));
                }
                for child in [node.left, node.right] {
                    let in_range = if child > 0 {
                        (child as usize) < nodes.len()
                    } else {
                        ((-child) as usize) < leaves.len()
                    };
                    if !in_range {
                        return Err(ClassifierError::Malformed(format!(
                            "{what} has a dangling child {child}"
                        )));
                    }
                }
            }
            Ok(Tree { nodes, leaves })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stage {
        threshold: xml.stage_threshold,
        trees,
    })
}

/// Summed-area tables of pixel values and squared pixel values.
struct Integral {
    stride: usize,
    sum: Vec<u64>,
    sq_sum: Vec<u64>,
}

impl Integral {
    fn new(gray: &GrayImage) -> Self {
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sq_sum = vec![0u64; stride * (h + 1)];

        for (y, row) in gray.as_raw().chunks_exact(w.max(1)).take(h).enumerate() {
            let (mut row_sum, mut row_sq) = (0u64, 0u64);
            for (x, &p) in row.iter().enumerate() {
                let p = u64::from(p);
                row_sum += p;
                row_sq += p * p;
                let i = (y + 1) * stride + x + 1;
                sum[i] = sum[i - stride] + row_sum;
                sq_sum[i] = sq_sum[i - stride] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sq_sum,
        }
    }

    fn rect(table: &[u64], stride: usize, x: u32, y: u32, w: u32, h: u32) -> u64 {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        (table[y1 * stride + x1] + table[y0 * stride + x0])
            - (table[y0 * stride + x1] + table[y1 * stride + x0])
    }

    fn sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::rect(&self.sum, self.stride, x, y, w, h)
    }

    fn sq_sum(&self, x: u32, y: u32, w: u32, h: u32) -> u64 {
        Self::rect(&self.sq_sum, self.stride, x, y, w, h)
    }
}

/// Loads cascades from disk, resolving built-ins through the bundled
/// directory, the user cache and finally an upstream download.
#[derive(Clone, Debug, Default)]
pub struct HaarCascadeLoader {
    locations: ResourceLocations,
}

impl HaarCascadeLoader {
    pub fn new(locations: ResourceLocations) -> Self {
        Self { locations }
    }

    pub fn resolve_builtin(&self, id: ProfileId) -> Result<PathBuf, ClassifierError> {
        let name = id.resource_name().ok_or_else(|| {
            ClassifierError::Unsupported(format!("{id} has no bundled resource"))
        })?;
        let url = format!("{CASCADE_BASE_URL}/{name}");
        let progress: model_resolver::ProgressFn = Box::new(move |done, total| {
            if total > 0 && done == total {
                log::debug!("Downloaded {done} bytes");
            }
        });
        Ok(model_resolver::resolve(name, &url, &self.locations, Some(progress))?)
    }
}

impl ClassifierLoader for HaarCascadeLoader {
    fn load_builtin(&self, id: ProfileId) -> Result<Arc<dyn ObjectClassifier>, ClassifierError> {
        let path = self.resolve_builtin(id)?;
        Ok(Arc::new(HaarCascade::from_file(&path)?))
    }

    fn load_file(&self, path: &Path) -> Result<Arc<dyn ObjectClassifier>, ClassifierError> {
        Ok(Arc::new(HaarCascade::from_file(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// A 4x4 cascade with one stump: "bottom half brighter than top half".
    const EDGE_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>4</height>
  <width>4</width>
  <stageParams>
    <maxWeakCount>1</maxWeakCount></stageParams>
  <featureParams>
    <maxCatCount>0</maxCatCount></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <!-- stage 0 -->
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 5.0000000000000000e-01</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 4 2 -1.</_>
        <_>
          0 2 4 2 1.</_></rects></_></features></cascade>
</opencv_storage>
"#;

    fn params(scale: f64, neighbors: i32, min: (i32, i32)) -> DetectionParams {
        DetectionParams::new(scale, neighbors, min).unwrap()
    }

    /// Black 40x40 with a white bar over columns 10..14, rows 10..12.
    fn bar_image() -> GrayImage {
        GrayImage::from_fn(40, 40, |x, y| {
            let lit = (10..14).contains(&x) && (10..12).contains(&y);
            image::Luma([if lit { 255 } else { 0 }])
        })
    }

    // ── Parsing ──

    #[test]
    fn test_parse_edge_cascade() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        assert_eq!(cascade.window(), (4, 4));
        assert_eq!(cascade.stage_count(), 1);
        assert_eq!(cascade.features[0].rects.len(), 2);
        let node = cascade.stages[0].trees[0].nodes[0];
        assert_eq!((node.left, node.right, node.feature), (0, -1, 0));
        assert_eq!(cascade.stages[0].trees[0].leaves, vec![-1.0, 1.0]);
    }

    #[test]
    fn test_rejects_tilted_features() {
        let xml = EDGE_CASCADE.replace("</rects></_>", "</rects>\n      <tilted>1</tilted></_>");
        let err = HaarCascade::from_xml(&xml).unwrap_err();
        assert!(matches!(err, ClassifierError::Unsupported(ref m) if m.contains("tilted")));
    }

    #[test]
    fn test_accepts_explicit_upright_flag() {
        let xml = EDGE_CASCADE.replace("</rects></_>", "</rects>\n      <tilted>0</tilted></_>");
        assert!(HaarCascade::from_xml(&xml).is_ok());
    }

    #[test]
    fn test_rejects_lbp() {
        let xml = EDGE_CASCADE.replace("<featureType>HAAR", "<featureType>LBP");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(ClassifierError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rejects_legacy_layout() {
        let xml = r#"<?xml version="1.0"?>
<opencv_storage>
<haarcascade_frontalface type_id="opencv-haar-classifier"><size>24 24</size></haarcascade_frontalface>
</opencv_storage>"#;
        assert!(matches!(
            HaarCascade::from_xml(xml),
            Err(ClassifierError::Unsupported(_))
        ));
    }

    #[test]
    fn test_rejects_dangling_feature_index() {
        let xml = EDGE_CASCADE.replace("0 -1 0 5.0", "0 -1 3 5.0");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(ClassifierError::Malformed(ref m)) if m.contains("feature 3")
        ));
    }

    #[test]
    fn test_rejects_rect_outside_window() {
        let xml = EDGE_CASCADE.replace("0 2 4 2 1.", "0 3 4 2 1.");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(ClassifierError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_garbage_numbers() {
        let xml = EDGE_CASCADE.replace("-1. 1.</leafValues>", "-1. one</leafValues>");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(ClassifierError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_non_xml() {
        assert!(HaarCascade::from_xml("not xml at all <<<").is_err());
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let err = HaarCascade::from_file(Path::new("/nonexistent/cascade.xml")).unwrap_err();
        assert!(matches!(err, ClassifierError::Io { .. }));
    }

    // ── Evaluation ──

    #[test]
    fn test_integral_rect_sums() {
        let img = GrayImage::from_fn(3, 2, |x, y| image::Luma([(y * 3 + x) as u8]));
        let ii = Integral::new(&img);
        assert_eq!(ii.sum(0, 0, 3, 2), 15);
        assert_eq!(ii.sum(1, 1, 2, 1), 9);
        assert_eq!(ii.sq_sum(0, 0, 2, 1), 1);
    }

    #[test]
    fn test_raw_hits_on_bar() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();

        let found = cascade
            .detect_multi_scale(&bar_image(), &params(10.0, 0, (0, 0)))
            .unwrap();

        let expected: HashSet<_> = [(8, 8), (10, 8), (12, 8)]
            .into_iter()
            .map(|(x, y)| Detection::new(x, y, 4, 4))
            .collect();
        assert_eq!(found.into_iter().collect::<HashSet<_>>(), expected);
    }

    #[test]
    fn test_uniform_image_has_no_hits() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let flat = GrayImage::from_pixel(40, 40, image::Luma([128]));
        let found = cascade
            .detect_multi_scale(&flat, &params(1.1, 0, (0, 0)))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_min_size_skips_small_windows() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let found = cascade
            .detect_multi_scale(&bar_image(), &params(10.0, 0, (5, 5)))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_image_smaller_than_window() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let tiny = GrayImage::new(3, 3);
        let found = cascade
            .detect_multi_scale(&tiny, &params(1.1, 0, (0, 0)))
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_image_the_size_of_the_window_is_scanned() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let edge = GrayImage::from_fn(4, 4, |_, y| image::Luma([if y >= 2 { 255 } else { 0 }]));

        let found = cascade
            .detect_multi_scale(&edge, &params(2.0, 0, (0, 0)))
            .unwrap();

        assert_eq!(found, vec![Detection::new(0, 0, 4, 4)]);
    }

    #[test]
    fn test_last_column_and_row_of_origins_are_scanned() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        // 10x10 with the edge in the bottom-right 4x4 corner, origin (6, 6)
        let corner = GrayImage::from_fn(10, 10, |x, y| {
            let lit = x >= 6 && y >= 8;
            image::Luma([if lit { 255 } else { 0 }])
        });

        let found = cascade
            .detect_multi_scale(&corner, &params(10.0, 0, (0, 0)))
            .unwrap();

        assert!(found.contains(&Detection::new(6, 6, 4, 4)), "{found:?}");
    }

    #[test]
    fn test_upscaled_levels_report_source_coordinates() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        // 80x80 bar image: the same bar at twice the size
        let big = GrayImage::from_fn(80, 80, |x, y| {
            let lit = (20..28).contains(&x) && (20..24).contains(&y);
            image::Luma([if lit { 255 } else { 0 }])
        });

        let found = cascade
            .detect_multi_scale(&big, &params(2.0, 0, (8, 8)))
            .unwrap();

        let second_level: Vec<_> = found.iter().filter(|d| d.width == 8).collect();
        assert!(!second_level.is_empty());
        for d in second_level {
            assert_eq!(d.height, 8);
            assert!(d.x >= 12 && d.right() <= 36, "{d:?}");
            assert!(d.y >= 8 && d.bottom() <= 36, "{d:?}");
        }
        for d in &found {
            assert!(d.x >= 0 && d.y >= 0 && d.right() <= 80 && d.bottom() <= 80, "{d:?}");
        }
    }

    // ── Loader ──

    #[test]
    fn test_loader_resolves_bundled_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("haarcascade_eye.xml"), EDGE_CASCADE).unwrap();
        let loader = HaarCascadeLoader::new(ResourceLocations {
            bundled_dir: Some(dir.path().to_path_buf()),
            cache_dir: Some(dir.path().join("cache")),
            allow_download: false,
        });

        assert!(loader.load_builtin(ProfileId::Eye).is_ok());
        assert!(matches!(
            loader.load_builtin(ProfileId::Smile),
            Err(ClassifierError::Resource(_))
        ));
        assert!(matches!(
            loader.load_builtin(ProfileId::Custom),
            Err(ClassifierError::Unsupported(_))
        ));
    }

    #[test]
    fn test_loader_reads_arbitrary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mine.xml");
        std::fs::write(&path, EDGE_CASCADE).unwrap();

        let loader = HaarCascadeLoader::default();

        assert!(loader.load_file(&path).is_ok());
    }
}
