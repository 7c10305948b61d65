//! Detection comparison scores.
//!
//! The score table ranks images by how well one set of detections matches
//! another: ground truth against a model's detections, or the detections
//! on an original image against those on its transformed counterpart.
//! Scores are per image, in `[0, 1]`.
//!
//! Two metrics cover the two kinds of input. When every annotation on both
//! sides carries a bounding box, the score is a class-agnostic pixelwise
//! IoU: the area of the intersection of the two box-union regions over the
//! area of their union. When any annotation lacks a box (classification
//! models emit label/score only), the score falls back to category
//! similarity: matched predicted category ids over the size of the
//! category-id-set union.
//!
//! Before scoring, annotations are normalized against the category table:
//! ids resolve from fallback labels, labels resolve from ids, and missing
//! confidence scores default to `1.0` (ground truth is certain).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetIndex;
use crate::model::{Annotation, CategoryId, ImageId};

/// Per-image annotation sets, keyed by image id.
///
/// This is the externally-carried image association of the data model: the
/// map owns the grouping, the annotations do not know their image.
pub type AnnotationsByImage = BTreeMap<ImageId, Vec<Annotation>>;

/// Resolves one annotation against the category table.
///
/// Fills whichever of `category_id` / `label` can be derived from the
/// other, and defaults a missing score to `1.0`. Unresolvable references
/// stay as they are - display code degrades to the fallback label, and
/// the similarity metric treats them as an unmatched class.
pub fn normalize_annotation(index: &DatasetIndex<'_>, annotation: &Annotation) -> Annotation {
    let mut normalized = annotation.clone();

    if normalized.category_id.is_none() {
        normalized.category_id = normalized
            .label
            .as_deref()
            .and_then(|label| index.category_by_name(label))
            .map(|category| category.id);
    }

    if let Some(category) = normalized.category_id.and_then(|id| index.category(id)) {
        normalized.label = Some(category.name.clone());
    }

    if normalized.score.is_none() {
        normalized.score = Some(1.0);
    }

    normalized
}

/// Normalizes a whole per-image annotation list.
pub fn normalize_annotations(index: &DatasetIndex<'_>, annotations: &[Annotation]) -> Vec<Annotation> {
    annotations
        .iter()
        .map(|annotation| normalize_annotation(index, annotation))
        .collect()
}

/// Category-set similarity between two annotation lists.
///
/// Counts predicted category ids that also occur in the actual set
/// (unresolved ids never match) and divides by the size of the union of
/// both id sets. Empty-against-empty scores `0.0` here; the all-empty case
/// is handled before the metric is chosen.
pub fn category_similarity(actual: &[Annotation], predicted: &[Annotation]) -> f64 {
    let actual_ids: HashSet<Option<CategoryId>> =
        actual.iter().map(|annotation| annotation.category_id).collect();
    let predicted_ids: HashSet<Option<CategoryId>> =
        predicted.iter().map(|annotation| annotation.category_id).collect();

    let matching = predicted_ids
        .iter()
        .filter(|id| id.is_some() && actual_ids.contains(*id))
        .count();

    let total = actual_ids.union(&predicted_ids).count();
    if total > 0 {
        matching as f64 / total as f64
    } else {
        0.0
    }
}

/// An axis-aligned box in corner form, the shape the scorer works in.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Aabb {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl Aabb {
    /// Converts from the model's `[x, y, width, height]` convention.
    fn from_xywh([x, y, w, h]: [f64; 4]) -> Self {
        Self {
            xmin: x,
            ymin: y,
            xmax: x + w,
            ymax: y + h,
        }
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        self.xmin <= x && x <= self.xmax && self.ymin <= y && y <= self.ymax
    }
}

/// Class-agnostic pixelwise IoU of two box sets.
///
/// Computes area(union(actual) ∩ union(predicted)) / area(union(actual) ∪
/// union(predicted)) exactly, by cutting the plane into the grid induced
/// by every box edge and classifying each cell by its center point.
/// Overlaps within one side count once. An empty union on both sides
/// scores `1.0`; one-sided emptiness scores `0.0`.
fn pixelwise_iou(actual: &[Aabb], predicted: &[Aabb]) -> f64 {
    let mut xs: Vec<f64> = Vec::with_capacity((actual.len() + predicted.len()) * 2);
    let mut ys: Vec<f64> = Vec::with_capacity((actual.len() + predicted.len()) * 2);
    for b in actual.iter().chain(predicted) {
        xs.extend([b.xmin, b.xmax]);
        ys.extend([b.ymin, b.ymax]);
    }
    xs.sort_by(f64::total_cmp);
    xs.dedup();
    ys.sort_by(f64::total_cmp);
    ys.dedup();

    let mut intersection = 0.0;
    let mut union_area = 0.0;

    for win_x in xs.windows(2) {
        let (x0, x1) = (win_x[0], win_x[1]);
        let cx = (x0 + x1) / 2.0;
        for win_y in ys.windows(2) {
            let (y0, y1) = (win_y[0], win_y[1]);
            let cy = (y0 + y1) / 2.0;

            let in_actual = actual.iter().any(|b| b.contains(cx, cy));
            let in_predicted = predicted.iter().any(|b| b.contains(cx, cy));
            if !(in_actual || in_predicted) {
                continue;
            }

            let area = (x1 - x0) * (y1 - y0);
            union_area += area;
            if in_actual && in_predicted {
                intersection += area;
            }
        }
    }

    if union_area > 0.0 {
        intersection / union_area
    } else {
        1.0
    }
}

fn boxes_of(annotations: &[Annotation]) -> Vec<Aabb> {
    annotations
        .iter()
        .filter_map(|annotation| annotation.bbox)
        .map(Aabb::from_xywh)
        .collect()
}

/// Scores predicted against actual annotations, image by image.
///
/// Iterates the images of `actual`; an image missing from `predicted`
/// counts as having no predictions. Images where both sides are empty
/// score `1.0`, images where only the ground truth is empty score `0.0`.
/// The remaining images all use the pixelwise-IoU metric when every
/// annotation on both sides carries a box, and category similarity
/// otherwise.
pub fn compute_scores(
    index: &DatasetIndex<'_>,
    actual: &AnnotationsByImage,
    predicted: &AnnotationsByImage,
) -> Vec<(ImageId, f64)> {
    let mut scores: Vec<(ImageId, f64)> = Vec::with_capacity(actual.len());
    let mut pairs: Vec<(ImageId, Vec<Annotation>, Vec<Annotation>)> = Vec::new();

    static EMPTY: Vec<Annotation> = Vec::new();
    for (&image_id, actual_annotations) in actual {
        let predicted_annotations = predicted.get(&image_id).unwrap_or(&EMPTY);

        if actual_annotations.is_empty() {
            // The scorer needs at least one ground-truth box; settle these
            // images directly.
            let score = if predicted_annotations.is_empty() { 1.0 } else { 0.0 };
            scores.push((image_id, score));
            continue;
        }

        pairs.push((
            image_id,
            normalize_annotations(index, actual_annotations),
            normalize_annotations(index, predicted_annotations),
        ));
    }

    // One metric for the whole run: boxes only work when every annotation
    // on both sides has one.
    let all_have_bbox = pairs.iter().all(|(_, actual_annotations, predicted_annotations)| {
        actual_annotations
            .iter()
            .chain(predicted_annotations)
            .all(|annotation| annotation.bbox.is_some())
    });

    for (image_id, actual_annotations, predicted_annotations) in &pairs {
        let score = if all_have_bbox {
            pixelwise_iou(&boxes_of(actual_annotations), &boxes_of(predicted_annotations))
        } else {
            category_similarity(actual_annotations, predicted_annotations)
        };
        scores.push((*image_id, score));
    }

    scores
}

/// The three per-image comparison scores the score table displays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageScores {
    /// Ground truth vs. detections on the original image.
    pub ground_to_detection: f64,

    /// Detections on the original image vs. detections on the transformed
    /// image.
    pub detection_to_transformed: f64,

    /// Ground truth vs. detections on the transformed image.
    pub ground_to_transformed: f64,
}

/// A partial update to [`ImageScores`]; unset fields keep their value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImageScoresPatch {
    pub ground_to_detection: Option<f64>,
    pub detection_to_transformed: Option<f64>,
    pub ground_to_transformed: Option<f64>,
}

impl ImageScores {
    /// Applies a partial update.
    pub fn apply(&mut self, patch: ImageScoresPatch) {
        if let Some(score) = patch.ground_to_detection {
            self.ground_to_detection = score;
        }
        if let Some(score) = patch.detection_to_transformed {
            self.detection_to_transformed = score;
        }
        if let Some(score) = patch.ground_to_transformed {
            self.ground_to_transformed = score;
        }
    }
}

/// Merges a partial update into a per-image score table, starting from
/// defaults for images not seen before.
pub fn update_image_scores(
    table: &mut BTreeMap<ImageId, ImageScores>,
    image_id: ImageId,
    patch: ImageScoresPatch,
) {
    table.entry(image_id).or_default().apply(patch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::model::{Category, ImageMetadata};

    fn make_dataset() -> Dataset {
        Dataset {
            images: vec![
                ImageMetadata::new(1u64, "a.jpg", 100, 100),
                ImageMetadata::new(2u64, "b.jpg", 100, 100),
            ],
            categories: vec![Category::new(1u64, "person"), Category::new(2u64, "dog")],
            annotations: BTreeMap::new(),
        }
    }

    fn boxed(id: u64, category: u64, bbox: [f64; 4]) -> Annotation {
        Annotation::new(id, category, bbox)
    }

    fn labeled(id: u64, label: &str) -> Annotation {
        Annotation {
            id: id.into(),
            category_id: None,
            label: Some(label.to_string()),
            score: Some(0.5),
            bbox: None,
        }
    }

    #[test]
    fn normalize_resolves_id_from_label() {
        let dataset = make_dataset();
        let index = dataset.index();

        let normalized = normalize_annotation(&index, &labeled(1, "dog"));
        assert_eq!(normalized.category_id, Some(CategoryId(2)));
        assert_eq!(normalized.label.as_deref(), Some("dog"));
    }

    #[test]
    fn normalize_resolves_label_from_id() {
        let dataset = make_dataset();
        let index = dataset.index();

        let normalized = normalize_annotation(&index, &boxed(1, 1, [0.0, 0.0, 1.0, 1.0]));
        assert_eq!(normalized.label.as_deref(), Some("person"));
    }

    #[test]
    fn normalize_defaults_score_to_certain() {
        let dataset = make_dataset();
        let index = dataset.index();

        let normalized = normalize_annotation(&index, &boxed(1, 1, [0.0, 0.0, 1.0, 1.0]));
        assert_eq!(normalized.score, Some(1.0));

        let kept = normalize_annotation(
            &index,
            &boxed(1, 1, [0.0, 0.0, 1.0, 1.0]).with_score(0.25),
        );
        assert_eq!(kept.score, Some(0.25));
    }

    #[test]
    fn normalize_leaves_unknown_labels_unresolved() {
        let dataset = make_dataset();
        let index = dataset.index();

        let normalized = normalize_annotation(&index, &labeled(1, "unicorn"));
        assert_eq!(normalized.category_id, None);
        assert_eq!(normalized.label.as_deref(), Some("unicorn"));
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = vec![Aabb::from_xywh([0.0, 0.0, 10.0, 10.0])];
        assert_eq!(pixelwise_iou(&a, &a), 1.0);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = vec![Aabb::from_xywh([0.0, 0.0, 10.0, 10.0])];
        let b = vec![Aabb::from_xywh([20.0, 20.0, 10.0, 10.0])];
        assert_eq!(pixelwise_iou(&a, &b), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        // intersection 5x10 = 50, union 150
        let a = vec![Aabb::from_xywh([0.0, 0.0, 10.0, 10.0])];
        let b = vec![Aabb::from_xywh([5.0, 0.0, 10.0, 10.0])];
        let iou = pixelwise_iou(&a, &b);
        assert!((iou - 1.0 / 3.0).abs() < 1e-12, "got {iou}");
    }

    #[test]
    fn iou_counts_same_side_overlap_once() {
        // two coincident actual boxes still cover 100 square units
        let a = vec![
            Aabb::from_xywh([0.0, 0.0, 10.0, 10.0]),
            Aabb::from_xywh([0.0, 0.0, 10.0, 10.0]),
        ];
        let b = vec![Aabb::from_xywh([0.0, 0.0, 10.0, 10.0])];
        assert_eq!(pixelwise_iou(&a, &b), 1.0);
    }

    #[test]
    fn iou_against_empty_prediction_is_zero() {
        let a = vec![Aabb::from_xywh([0.0, 0.0, 10.0, 10.0])];
        assert_eq!(pixelwise_iou(&a, &[]), 0.0);
    }

    #[test]
    fn category_similarity_counts_matches_over_union() {
        let dataset = make_dataset();
        let index = dataset.index();

        let actual = normalize_annotations(&index, &[labeled(1, "person"), labeled(2, "dog")]);
        let predicted = normalize_annotations(&index, &[labeled(3, "dog")]);

        // one match out of two distinct ids
        assert_eq!(category_similarity(&actual, &predicted), 0.5);
    }

    #[test]
    fn category_similarity_ignores_unresolved_matches() {
        let dataset = make_dataset();
        let index = dataset.index();

        // "unicorn" stays unresolved on both sides: None never matches
        let actual = normalize_annotations(&index, &[labeled(1, "unicorn")]);
        let predicted = normalize_annotations(&index, &[labeled(2, "unicorn")]);

        assert_eq!(category_similarity(&actual, &predicted), 0.0);
    }

    #[test]
    fn scores_settle_empty_images_without_a_metric() {
        let dataset = make_dataset();
        let index = dataset.index();

        let mut actual = AnnotationsByImage::new();
        actual.insert(ImageId(1), Vec::new());
        actual.insert(ImageId(2), Vec::new());

        let mut predicted = AnnotationsByImage::new();
        predicted.insert(ImageId(2), vec![boxed(1, 1, [0.0, 0.0, 5.0, 5.0])]);

        let scores = compute_scores(&index, &actual, &predicted);
        assert_eq!(scores, vec![(ImageId(1), 1.0), (ImageId(2), 0.0)]);
    }

    #[test]
    fn scores_use_iou_when_boxes_are_complete() {
        let dataset = make_dataset();
        let index = dataset.index();

        let mut actual = AnnotationsByImage::new();
        actual.insert(ImageId(1), vec![boxed(1, 1, [0.0, 0.0, 10.0, 10.0])]);

        let mut predicted = AnnotationsByImage::new();
        predicted.insert(ImageId(1), vec![boxed(2, 1, [0.0, 0.0, 10.0, 10.0])]);

        let scores = compute_scores(&index, &actual, &predicted);
        assert_eq!(scores, vec![(ImageId(1), 1.0)]);
    }

    #[test]
    fn scores_fall_back_to_category_similarity() {
        let dataset = make_dataset();
        let index = dataset.index();

        let mut actual = AnnotationsByImage::new();
        actual.insert(ImageId(1), vec![labeled(1, "person")]);

        let mut predicted = AnnotationsByImage::new();
        predicted.insert(ImageId(1), vec![labeled(2, "person")]);

        let scores = compute_scores(&index, &actual, &predicted);
        assert_eq!(scores, vec![(ImageId(1), 1.0)]);
    }

    #[test]
    fn one_boxless_annotation_switches_the_whole_run() {
        let dataset = make_dataset();
        let index = dataset.index();

        // image 1 has boxes, image 2 does not: both images score by
        // category similarity
        let mut actual = AnnotationsByImage::new();
        actual.insert(ImageId(1), vec![boxed(1, 1, [0.0, 0.0, 10.0, 10.0])]);
        actual.insert(ImageId(2), vec![labeled(2, "dog")]);

        let mut predicted = AnnotationsByImage::new();
        predicted.insert(ImageId(1), vec![boxed(3, 2, [50.0, 50.0, 10.0, 10.0])]);
        predicted.insert(ImageId(2), vec![labeled(4, "dog")]);

        let scores = compute_scores(&index, &actual, &predicted);
        // disjoint boxes but different categories: 0 matches over 2 ids
        assert_eq!(scores, vec![(ImageId(1), 0.0), (ImageId(2), 1.0)]);
    }

    #[test]
    fn image_scores_patch_merges_over_defaults() {
        let mut table = BTreeMap::new();
        update_image_scores(
            &mut table,
            ImageId(1),
            ImageScoresPatch {
                ground_to_detection: Some(0.75),
                ..Default::default()
            },
        );
        update_image_scores(
            &mut table,
            ImageId(1),
            ImageScoresPatch {
                ground_to_transformed: Some(0.5),
                ..Default::default()
            },
        );

        let scores = table[&ImageId(1)];
        assert_eq!(scores.ground_to_detection, 0.75);
        assert_eq!(scores.detection_to_transformed, 0.0);
        assert_eq!(scores.ground_to_transformed, 0.5);
    }
}
