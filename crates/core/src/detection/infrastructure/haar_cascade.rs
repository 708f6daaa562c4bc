//! Boosted Haar cascade classifier.
//!
//! Reads cascades in OpenCV's `opencv-cascade-classifier` XML layout
//! (the `haarcascade_*.xml` files shipped with OpenCV) and scans grayscale
//! frames with a sliding window over an image pyramid.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use roxmltree::{Document, Node};
use thiserror::Error;

use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::domain::rectangle_grouper::{group_rectangles, GROUP_EPS};
use crate::detection::infrastructure::integral_image::IntegralImage;
use crate::imaging::resize::resize_linear_exact;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Subtracted from every stage threshold when a cascade is loaded.
const STAGE_THRESHOLD_EPS: f32 = 1e-5;

/// Windows whose normalized contrast is below this are skipped outright.
const MIN_WINDOW_CONTRAST: f64 = 0.1;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("failed to read cascade {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed cascade XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("cascade is missing <{0}>")]
    MissingElement(&'static str),
    #[error("invalid cascade: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug)]
struct WeightedRect {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    weight: f32,
}

/// Weighted rectangles, either upright or rotated by 45°.
#[derive(Clone, Debug)]
struct HaarFeature {
    rects: Vec<WeightedRect>,
    tilted: bool,
}

#[derive(Clone, Copy, Debug)]
struct TreeNode {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f32,
}

/// One boosted decision tree. Child indices `<= 0` point at leaf `-idx`.
#[derive(Clone, Debug)]
struct WeakTree {
    nodes: Vec<TreeNode>,
    leaves: Vec<f32>,
}

#[derive(Clone, Debug)]
struct Stage {
    threshold: f32,
    trees: Vec<WeakTree>,
}

/// Outcome of running the cascade on a single window position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WindowVerdict {
    /// Too little contrast to be evaluated.
    Flat,
    Rejected { stage: usize },
    Accepted,
}

#[derive(Clone, Debug)]
pub struct HaarCascade {
    window: (u32, u32),
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
    has_tilted: bool,
}

impl HaarCascade {
    pub fn from_file(path: &Path) -> Result<Self, CascadeError> {
        let xml = fs::read_to_string(path).map_err(|e| CascadeError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let cascade = Self::from_xml(&xml)?;
        debug!(
            "Loaded cascade {} ({} stages, {} features, {}x{} window)",
            path.display(),
            cascade.stages.len(),
            cascade.features.len(),
            cascade.window.0,
            cascade.window.1
        );
        Ok(cascade)
    }

    pub fn from_xml(xml: &str) -> Result<Self, CascadeError> {
        let doc = Document::parse(xml)?;
        let root = doc
            .descendants()
            .find(|n| n.has_tag_name("cascade"))
            .ok_or(CascadeError::MissingElement("cascade"))?;

        let stage_type = text(child(root, "stageType")?);
        let feature_type = text(child(root, "featureType")?);
        if stage_type != "BOOST" || feature_type != "HAAR" {
            return Err(CascadeError::Invalid(format!(
                "unsupported cascade type {stage_type}/{feature_type}"
            )));
        }

        let width: u32 = parse_one(child(root, "width")?)?;
        let height: u32 = parse_one(child(root, "height")?)?;
        if width < 3 || height < 3 {
            return Err(CascadeError::Invalid(format!(
                "window {width}x{height} is too small"
            )));
        }

        let features = items(child(root, "features")?)
            .map(|node| parse_feature(node, width as usize, height as usize))
            .collect::<Result<Vec<_>, _>>()?;

        let stages = items(child(root, "stages")?)
            .map(|node| parse_stage(node, features.len()))
            .collect::<Result<Vec<_>, _>>()?;
        if stages.is_empty() {
            return Err(CascadeError::Invalid("cascade has no stages".into()));
        }

        let has_tilted = features.iter().any(|f| f.tilted);
        Ok(Self {
            window: (width, height),
            stages,
            features,
            has_tilted,
        })
    }

    /// Detection window size at scale 1.
    pub fn window(&self) -> (u32, u32) {
        self.window
    }

    /// Returns every window accepted by all stages, before grouping.
    ///
    /// The window grows by `scale_factor` per pyramid level until it no
    /// longer fits in the frame. Coordinates are in `gray`'s pixel space.
    pub fn detect_multi_scale(&self, gray: &Frame, scale_factor: f64) -> Vec<Region> {
        let mut hits = Vec::new();
        if gray.is_empty() {
            return hits;
        }
        let (win_w, win_h) = self.window;
        let (img_w, img_h) = (gray.width(), gray.height());

        let mut factor = 1.0f64;
        loop {
            let scaled_win_w = round(win_w as f64 * factor);
            let scaled_win_h = round(win_h as f64 * factor);
            if scaled_win_w > img_w as i64 || scaled_win_h > img_h as i64 {
                break;
            }

            let scale = factor as f32;
            let level_w = (img_w as f32 / scale).round_ties_even() as u32;
            let level_h = (img_h as f32 / scale).round_ties_even() as u32;
            let level = resize_linear_exact(gray, level_w, level_h);
            self.scan_level(&level, scale, (scaled_win_w, scaled_win_h), &mut hits);

            if scale_factor <= 1.0 {
                break;
            }
            factor *= scale_factor;
        }
        hits
    }

    fn scan_level(
        &self,
        level: &Frame,
        scale: f32,
        scaled_win: (i64, i64),
        hits: &mut Vec<Region>,
    ) {
        let (win_w, win_h) = (self.window.0 as usize, self.window.1 as usize);
        let (Some(max_x), Some(max_y)) = (
            (level.width() as usize).checked_sub(win_w),
            (level.height() as usize).checked_sub(win_h),
        ) else {
            return;
        };
        let step = if scale >= 2.0 { 1 } else { 2 };
        let integral = if self.has_tilted {
            IntegralImage::with_tilted(level)
        } else {
            IntegralImage::new(level)
        };

        let mut y = 0;
        while y <= max_y {
            let mut x = 0;
            while x <= max_x {
                match self.classify_window(&integral, x, y) {
                    WindowVerdict::Accepted => hits.push(Region::new(
                        (x as f32 * scale).round_ties_even() as i32,
                        (y as f32 * scale).round_ties_even() as i32,
                        scaled_win.0 as i32,
                        scaled_win.1 as i32,
                    )),
                    WindowVerdict::Rejected { stage: 0 } => x += step,
                    _ => {}
                }
                x += step;
            }
            y += step;
        }
    }

    fn classify_window(&self, integral: &IntegralImage, x: usize, y: usize) -> WindowVerdict {
        let (win_w, win_h) = (self.window.0 as usize, self.window.1 as usize);
        let (norm_w, norm_h) = (win_w - 2, win_h - 2);
        let area = (norm_w * norm_h) as f64;
        let sum = integral.rect_sum(x + 1, y + 1, norm_w, norm_h) as f64;
        let sq_sum = integral.rect_sq_sum(x + 1, y + 1, norm_w, norm_h) as f64;

        let spread = area * sq_sum - sum * sum;
        if spread <= 0.0 {
            return WindowVerdict::Flat;
        }
        let inv_norm = (1.0 / spread.sqrt()) as f32;
        if area * inv_norm as f64 >= MIN_WINDOW_CONTRAST {
            return WindowVerdict::Flat;
        }

        for (index, stage) in self.stages.iter().enumerate() {
            let mut total = 0.0f64;
            for tree in &stage.trees {
                let mut idx = 0i32;
                loop {
                    let node = tree.nodes[idx as usize];
                    let value = self.feature_value(node.feature, integral, x, y) * inv_norm;
                    idx = if value < node.threshold {
                        node.left
                    } else {
                        node.right
                    };
                    if idx <= 0 {
                        break;
                    }
                }
                total += tree.leaves[(-idx) as usize] as f64;
            }
            if total < stage.threshold as f64 {
                return WindowVerdict::Rejected { stage: index };
            }
        }
        WindowVerdict::Accepted
    }

    fn feature_value(&self, feature: usize, integral: &IntegralImage, x: usize, y: usize) -> f32 {
        let feature = &self.features[feature];
        feature
            .rects
            .iter()
            .map(|r| {
                let sum = if feature.tilted {
                    integral.tilted_sum(x + r.x, y + r.y, r.width, r.height)
                } else {
                    integral.rect_sum(x + r.x, y + r.y, r.width, r.height)
                };
                r.weight * sum as f32
            })
            .sum()
    }
}

/// [`ObjectDetector`] backed by a Haar cascade plus rectangle grouping.
pub struct CascadeDetector {
    cascade: HaarCascade,
    scale_factor: f64,
    min_neighbors: usize,
}

impl CascadeDetector {
    pub fn new(cascade: HaarCascade, scale_factor: f64, min_neighbors: usize) -> Self {
        Self {
            cascade,
            scale_factor,
            min_neighbors,
        }
    }
}

impl ObjectDetector for CascadeDetector {
    fn detect(&self, gray: &Frame) -> Vec<Region> {
        let raw = self.cascade.detect_multi_scale(gray, self.scale_factor);
        group_rectangles(&raw, self.min_neighbors, GROUP_EPS)
    }
}

fn round(v: f64) -> i64 {
    v.round_ties_even() as i64
}

fn child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> Result<Node<'a, 'input>, CascadeError> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or(CascadeError::MissingElement(name))
}

fn items<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("").trim()
}

fn parse_one<T: std::str::FromStr>(node: Node) -> Result<T, CascadeError> {
    let raw = text(node);
    raw.parse().map_err(|_| {
        CascadeError::Invalid(format!("<{}> has bad value {raw:?}", node.tag_name().name()))
    })
}

fn numbers(node: Node) -> Result<Vec<f64>, CascadeError> {
    text(node)
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>().map_err(|_| {
                CascadeError::Invalid(format!(
                    "<{}> has bad number {tok:?}",
                    node.tag_name().name()
                ))
            })
        })
        .collect()
}

fn parse_feature(node: Node, win_w: usize, win_h: usize) -> Result<HaarFeature, CascadeError> {
    let tilted = match node.children().find(|n| n.has_tag_name("tilted")).map(text) {
        None | Some("0") => false,
        Some("1") => true,
        Some(other) => {
            return Err(CascadeError::Invalid(format!("bad <tilted> value {other:?}")));
        }
    };

    let rects = items(child(node, "rects")?)
        .map(|r| {
            let v = numbers(r)?;
            if v.len() != 5 {
                return Err(CascadeError::Invalid(format!(
                    "feature rect needs 5 values, got {}",
                    v.len()
                )));
            }
            if v[..4].iter().any(|&c| c < 0.0 || c.fract() != 0.0) {
                return Err(CascadeError::Invalid(format!("bad feature rect {v:?}")));
            }
            let rect = WeightedRect {
                x: v[0] as usize,
                y: v[1] as usize,
                width: v[2] as usize,
                height: v[3] as usize,
                weight: v[4] as f32,
            };
            // A tilted rect spans columns x-h..x+w and rows y..y+w+h.
            let outside = if tilted {
                rect.x < rect.height
                    || rect.x + rect.width > win_w
                    || rect.y + rect.width + rect.height > win_h
            } else {
                rect.x + rect.width > win_w || rect.y + rect.height > win_h
            };
            if outside {
                return Err(CascadeError::Invalid(format!(
                    "feature rect {v:?} exceeds the {win_w}x{win_h} window"
                )));
            }
            Ok(rect)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if rects.is_empty() {
        return Err(CascadeError::Invalid("feature without rects".into()));
    }
    Ok(HaarFeature { rects, tilted })
}

fn parse_stage(node: Node, feature_count: usize) -> Result<Stage, CascadeError> {
    let threshold: f32 = parse_one(child(node, "stageThreshold")?)?;
    let trees = items(child(node, "weakClassifiers")?)
        .map(|weak| parse_tree(weak, feature_count))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stage {
        threshold: threshold - STAGE_THRESHOLD_EPS,
        trees,
    })
}

fn parse_tree(node: Node, feature_count: usize) -> Result<WeakTree, CascadeError> {
    let raw_nodes = numbers(child(node, "internalNodes")?)?;
    let leaves: Vec<f32> = numbers(child(node, "leafValues")?)?
        .into_iter()
        .map(|v| v as f32)
        .collect();

    if raw_nodes.is_empty() || raw_nodes.len() % 4 != 0 {
        return Err(CascadeError::Invalid(format!(
            "internalNodes length {} is not a multiple of 4",
            raw_nodes.len()
        )));
    }

    let nodes: Vec<TreeNode> = raw_nodes
        .chunks_exact(4)
        .map(|n| TreeNode {
            left: n[0] as i32,
            right: n[1] as i32,
            feature: n[2] as usize,
            threshold: n[3] as f32,
        })
        .collect();

    for (index, n) in nodes.iter().enumerate() {
        if n.feature >= feature_count {
            return Err(CascadeError::Invalid(format!(
                "feature index {} out of range ({feature_count} features)",
                n.feature
            )));
        }
        for link in [n.left, n.right] {
            // Node links only point forward, so evaluation always reaches a leaf.
            let ok = if link > 0 {
                (link as usize) > index && (link as usize) < nodes.len()
            } else {
                ((-link) as usize) < leaves.len()
            };
            if !ok {
                return Err(CascadeError::Invalid(format!("dangling tree link {link}")));
            }
        }
    }

    Ok(WeakTree { nodes, leaves })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 4x4 cascade with a single stump that fires on dark-to-bright
    /// vertical edges.
    pub(crate) const EDGE_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>4</height>
  <width>4</width>
  <stageNum>1</stageNum>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 1.0000000149011612e-01</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 4 4 -1.</_>
        <_>
          2 0 2 4 2.</_></rects></_></features></cascade>
</opencv_storage>
"#;

    fn edge_frame(w: u32, h: u32, edge: u32, dark_left: bool) -> Frame {
        let data = (0..h)
            .flat_map(|_| {
                (0..w).map(move |x| {
                    let left = x < edge;
                    if left == dark_left {
                        0
                    } else {
                        200
                    }
                })
            })
            .collect();
        Frame::new(data, w, h, 1)
    }

    #[test]
    fn test_parses_edge_cascade() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        assert_eq!(cascade.window(), (4, 4));
        assert_eq!(cascade.stages.len(), 1);
        assert_eq!(cascade.features[0].rects.len(), 2);
        assert!(cascade.stages[0].threshold < 0.0);
    }

    #[test]
    fn test_uniform_frame_has_no_hits() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let gray = Frame::new(vec![90; 20 * 20], 20, 20, 1);
        assert!(cascade.detect_multi_scale(&gray, 1.3).is_empty());
    }

    #[test]
    fn test_edge_windows_fire_at_base_scale() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let gray = edge_frame(20, 20, 10, true);
        let hits = cascade.detect_multi_scale(&gray, 1.3);

        let base: Vec<&Region> = hits.iter().filter(|r| r.width == 4).collect();
        // Only x = 8 puts the edge inside the inner 2x2 normalization area.
        assert_eq!(base.len(), 9);
        assert!(base.iter().all(|r| r.x == 8));
        assert!(hits.iter().all(|r| r.x <= 10 && r.right() >= 10));
    }

    #[test]
    fn test_reversed_edge_is_rejected() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let gray = edge_frame(20, 20, 10, false);
        assert!(cascade.detect_multi_scale(&gray, 1.3).is_empty());
    }

    #[test]
    fn test_frame_smaller_than_window() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let gray = Frame::new(vec![0, 255, 0, 255, 0, 255], 3, 2, 1);
        assert!(cascade.detect_multi_scale(&gray, 1.3).is_empty());
    }

    #[test]
    fn test_detector_groups_hits() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let gray = edge_frame(20, 20, 10, true);
        let raw = cascade.detect_multi_scale(&gray, 1.3);

        let ungrouped = CascadeDetector::new(cascade.clone(), 1.3, 0).detect(&gray);
        assert_eq!(ungrouped, raw);

        // Hits two pixels apart on a 4px window are not neighbours, so a
        // strict neighbour count filters them out.
        let grouped = CascadeDetector::new(cascade, 1.3, 3).detect(&gray);
        assert!(grouped.len() < raw.len());
    }

    #[test]
    fn test_rejects_tilted_rect_outside_window() {
        // Upright these rects fit; rotated, "0 0 4 4" reaches column -4.
        let xml = EDGE_CASCADE.replace("<rects>", "<tilted>1</tilted>\n      <rects>");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(CascadeError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_bad_tilted_flag() {
        let xml = EDGE_CASCADE.replace("<rects>", "<tilted>yes</tilted>\n      <rects>");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(CascadeError::Invalid(_))
        ));
    }

    /// 4x4 cascade with one rotated feature: the diamond under the top
    /// corner at pixel (1, 0) must be bright.
    const TILTED_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier"><stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>4</height>
  <width>4</width>
  <stageNum>1</stageNum>
  <stages>
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 1.3</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          2 0 2 2 1.</_></rects>
      <tilted>1</tilted></_></features></cascade>
</opencv_storage>
"#;

    /// Checkerboard centre (normalisation 1/400) plus one bright pixel.
    fn checker_with_bright_pixel(bright: (usize, usize)) -> Frame {
        let mut data = vec![0u8; 16];
        data[4 + 1] = 200;
        data[2 * 4 + 2] = 200;
        data[bright.1 * 4 + bright.0] = 255;
        Frame::new(data, 4, 4, 1)
    }

    #[test]
    fn test_tilted_feature_reads_rotated_rect() {
        let cascade = HaarCascade::from_xml(TILTED_CASCADE).unwrap();
        assert!(cascade.has_tilted);

        // (1, 0) lies in the diamond: (400 + 255) / 400 > 1.3.
        let inside = cascade.detect_multi_scale(&checker_with_bright_pixel((1, 0)), 1.0);
        assert_eq!(inside, vec![Region::new(0, 0, 4, 4)]);

        // (3, 0) lies in the upright rect "2 0 2 2" but not in the diamond.
        let outside = cascade.detect_multi_scale(&checker_with_bright_pixel((3, 0)), 1.0);
        assert!(outside.is_empty());
    }

    #[test]
    fn test_rejects_out_of_range_feature_index() {
        let xml = EDGE_CASCADE.replace("0 -1 0 1.0000000149011612e-01", "0 -1 3 0.1");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(CascadeError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_cyclic_tree() {
        // Node 1 links back to itself.
        let xml = EDGE_CASCADE.replace(
            "0 -1 0 1.0000000149011612e-01",
            "1 -1 0 0.1 1 -1 0 0.1",
        );
        let result = HaarCascade::from_xml(&xml);
        assert!(matches!(result, Err(CascadeError::Invalid(_))));
    }

    fn with_tree(nodes: &str, leaves: &str) -> String {
        EDGE_CASCADE
            .replace("0 -1 0 1.0000000149011612e-01", nodes)
            .replace("-1. 1.</leafValues>", &format!("{leaves}</leafValues>"))
    }

    #[test]
    fn test_rejects_backward_tree_link() {
        // Node 2 links back to node 1.
        let xml = with_tree("1 -1 0 0.1 2 -2 0 0.1 1 -3 0 0.1", "-1. 1. 0.5 0.25");
        let result = HaarCascade::from_xml(&xml);
        assert!(matches!(result, Err(CascadeError::Invalid(_))));
    }

    #[test]
    fn test_accepts_forward_tree_link() {
        let xml = with_tree("1 -1 0 0.1 0 -2 0 0.1", "-1. 1. 0.5");
        assert!(HaarCascade::from_xml(&xml).is_ok());
    }

    #[test]
    fn test_rejects_rect_outside_window() {
        let xml = EDGE_CASCADE.replace("2 0 2 4 2.", "3 0 2 4 2.");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(CascadeError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_cascade_element() {
        assert!(matches!(
            HaarCascade::from_xml("<opencv_storage/>"),
            Err(CascadeError::MissingElement("cascade"))
        ));
    }

    #[test]
    fn test_not_xml() {
        assert!(matches!(
            HaarCascade::from_xml("not xml at all <"),
            Err(CascadeError::Xml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            HaarCascade::from_file(Path::new("/nonexistent/cascade.xml")),
            Err(CascadeError::Io { .. })
        ));
    }
}
