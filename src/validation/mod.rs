//! Dataset validation for detviz.
//!
//! This module provides comprehensive validation of datasets, checking for:
//! - Structural integrity (unique IDs, valid references)
//! - Data quality (non-empty names, valid dimensions)
//! - Geometric validity (finite bounding boxes, within image bounds)
//!
//! Category references that resolve to nothing are special-cased: with a
//! fallback label present the display degrades gracefully (the label shows
//! verbatim), so the issue is a warning; without one it is an error.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::dataset::Dataset;
use crate::model::{Annotation, AnnotationId, CategoryId, ImageId, ImageMetadata};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,

    /// If set, compare declared image dimensions against the files found
    /// under this directory.
    pub image_root: Option<PathBuf>,
}

/// Validates a dataset and returns a report of all issues found.
///
/// This function performs comprehensive validation including:
/// - Checking for duplicate IDs (images, annotations, categories)
/// - Verifying category references resolve, or degrade to a fallback label
/// - Validating image dimensions are positive
/// - Validating category and file names are non-empty
/// - Checking bounding box validity (finite, positive extent, within bounds)
/// - Optionally probing image files on disk for dimension mismatches
pub fn validate_dataset(dataset: &Dataset, opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    // Build lookup maps for reference validation
    let category_ids: HashSet<CategoryId> = dataset.categories.iter().map(|c| c.id).collect();

    validate_images(dataset, &mut report);
    validate_categories(dataset, &mut report);
    validate_annotations(dataset, &category_ids, &mut report);

    if let Some(root) = opts.image_root.as_deref() {
        validate_image_files(dataset, root, &mut report);
    }

    report
}

/// Validates all images in the dataset.
fn validate_images(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();

    for (idx, image) in dataset.images.iter().enumerate() {
        let id = image.id.as_u64();

        // Check for duplicate IDs
        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "Duplicate image ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_ids.insert(image.id, idx);
        }

        // Check dimensions
        if image.width == 0 || image.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!(
                    "Invalid dimensions {}x{} (must be positive)",
                    image.width, image.height
                ),
                IssueContext::Image { id },
            ));
        }

        // Check filename
        if image.file_name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyFileName,
                "Empty filename",
                IssueContext::Image { id },
            ));
        }
    }
}

/// Validates all categories in the dataset.
fn validate_categories(dataset: &Dataset, report: &mut ValidationReport) {
    let mut seen_ids: HashMap<CategoryId, usize> = HashMap::new();
    let mut seen_names: HashMap<&str, CategoryId> = HashMap::new();

    for (idx, category) in dataset.categories.iter().enumerate() {
        let id = category.id.as_u64();

        // Check for duplicate IDs
        if let Some(first_idx) = seen_ids.get(&category.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!(
                    "Duplicate category ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_ids.insert(category.id, idx);
        }

        // Check for empty name
        if category.name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyCategoryName,
                "Empty category name",
                IssueContext::Category { id },
            ));
        } else if let Some(first_id) = seen_names.get(category.name.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateCategoryName,
                format!(
                    "Duplicate category name '{}' (also used by category {})",
                    category.name, first_id
                ),
                IssueContext::Category { id },
            ));
        } else {
            seen_names.insert(category.name.as_str(), category.id);
        }
    }
}

/// Validates all annotations in the dataset.
fn validate_annotations(
    dataset: &Dataset,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let mut seen_ids: HashSet<AnnotationId> = HashSet::new();
    let images_by_id: HashMap<ImageId, &ImageMetadata> =
        dataset.images.iter().map(|image| (image.id, image)).collect();

    for (&image_id, annotations) in &dataset.annotations {
        if !images_by_id.contains_key(&image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!(
                    "{} annotation(s) grouped under unknown image ID {}",
                    annotations.len(),
                    image_id
                ),
                IssueContext::Image { id: image_id.as_u64() },
            ));
        }

        for annotation in annotations {
            let id = annotation.id.as_u64();

            if !seen_ids.insert(annotation.id) {
                report.add(ValidationIssue::error(
                    IssueCode::DuplicateAnnotationId,
                    format!("Duplicate annotation ID {}", id),
                    IssueContext::Annotation { id },
                ));
            }

            validate_category_ref(annotation, category_ids, report);
            validate_bbox(annotation, images_by_id.get(&image_id).copied(), report);
        }
    }
}

/// Checks one annotation's category reference.
fn validate_category_ref(
    annotation: &Annotation,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let id = annotation.id.as_u64();
    let resolves = annotation
        .category_id
        .map(|category_id| category_ids.contains(&category_id))
        .unwrap_or(false);

    if resolves {
        return;
    }

    let described = match annotation.category_id {
        Some(category_id) => format!("references unknown category {}", category_id),
        None => "has no category reference".to_string(),
    };

    // A fallback label keeps the display working, so the unresolved
    // reference only warns. Without one there is nothing to show.
    if annotation.label.is_some() {
        report.add(ValidationIssue::warning(
            IssueCode::MissingCategoryRef,
            format!("Annotation {} (fallback label present)", described),
            IssueContext::Annotation { id },
        ));
    } else {
        report.add(ValidationIssue::error(
            IssueCode::MissingCategoryRef,
            format!("Annotation {} and no fallback label", described),
            IssueContext::Annotation { id },
        ));
    }
}

/// Checks one annotation's bounding box, against the image bounds when the
/// image is known.
fn validate_bbox(
    annotation: &Annotation,
    image: Option<&ImageMetadata>,
    report: &mut ValidationReport,
) {
    let Some([x, y, w, h]) = annotation.bbox else {
        return;
    };
    let id = annotation.id.as_u64();

    if !(x.is_finite() && y.is_finite() && w.is_finite() && h.is_finite()) {
        report.add(ValidationIssue::error(
            IssueCode::BBoxNotFinite,
            format!("Bounding box [{}, {}, {}, {}] has non-finite coordinates", x, y, w, h),
            IssueContext::Annotation { id },
        ));
        return;
    }

    if w <= 0.0 || h <= 0.0 {
        report.add(ValidationIssue::warning(
            IssueCode::InvalidBBoxExtent,
            format!("Bounding box has non-positive extent {}x{}", w, h),
            IssueContext::Annotation { id },
        ));
    }

    if let Some(image) = image {
        let (width, height) = (f64::from(image.width), f64::from(image.height));
        if x < 0.0 || y < 0.0 || x + w > width || y + h > height {
            report.add(ValidationIssue::warning(
                IssueCode::BBoxOutOfBounds,
                format!(
                    "Bounding box [{}, {}, {}, {}] extends outside image bounds {}x{}",
                    x, y, w, h, image.width, image.height
                ),
                IssueContext::Annotation { id },
            ));
        }
    }
}

/// Compares declared image dimensions against the files on disk.
fn validate_image_files(dataset: &Dataset, root: &Path, report: &mut ValidationReport) {
    for image in &dataset.images {
        if image.file_name.is_empty() {
            continue;
        }
        let id = image.id.as_u64();
        let path = root.join(&image.file_name);

        match imagesize::size(&path) {
            Ok(size) => {
                if size.width != image.width as usize || size.height != image.height as usize {
                    report.add(ValidationIssue::warning(
                        IssueCode::ImageDimensionsMismatch,
                        format!(
                            "Declared dimensions {}x{} but file is {}x{}",
                            image.width, image.height, size.width, size.height
                        ),
                        IssueContext::Image { id },
                    ));
                }
            }
            Err(_) => {
                report.add(ValidationIssue::warning(
                    IssueCode::ImageFileMissing,
                    format!("Image file '{}' could not be read", path.display()),
                    IssueContext::Image { id },
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use std::collections::BTreeMap;

    fn make_dataset() -> Dataset {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            ImageId(1),
            vec![Annotation::new(1u64, 1u64, [10.0, 10.0, 20.0, 20.0])],
        );

        Dataset {
            images: vec![ImageMetadata::new(1u64, "a.jpg", 100, 100)],
            categories: vec![Category::new(1u64, "person")],
            annotations,
        }
    }

    fn codes(report: &ValidationReport) -> Vec<IssueCode> {
        report.issues.iter().map(|issue| issue.code).collect()
    }

    #[test]
    fn clean_dataset_passes() {
        let report = validate_dataset(&make_dataset(), &ValidateOptions::default());
        assert!(report.is_clean(), "unexpected issues: {}", report);
    }

    #[test]
    fn detects_duplicate_image_ids() {
        let mut dataset = make_dataset();
        dataset.images.push(ImageMetadata::new(1u64, "b.jpg", 50, 50));

        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert!(codes(&report).contains(&IssueCode::DuplicateImageId));
        assert!(!report.is_ok());
    }

    #[test]
    fn detects_zero_dimensions() {
        let mut dataset = make_dataset();
        dataset.images[0].width = 0;

        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert!(codes(&report).contains(&IssueCode::InvalidImageDimensions));
    }

    #[test]
    fn detects_duplicate_category_names() {
        let mut dataset = make_dataset();
        dataset.categories.push(Category::new(2u64, "person"));

        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert!(codes(&report).contains(&IssueCode::DuplicateCategoryName));
        // duplicate names are a warning, not an error
        assert!(report.is_ok());
    }

    #[test]
    fn unresolved_category_with_fallback_label_warns() {
        let mut dataset = make_dataset();
        dataset.annotations.get_mut(&ImageId(1)).unwrap().push(
            Annotation::new(2u64, 99u64, [0.0, 0.0, 5.0, 5.0]).with_label("bird"),
        );

        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert!(codes(&report).contains(&IssueCode::MissingCategoryRef));
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn unresolved_category_without_fallback_is_an_error() {
        let mut dataset = make_dataset();
        dataset
            .annotations
            .get_mut(&ImageId(1))
            .unwrap()
            .push(Annotation::new(2u64, 99u64, [0.0, 0.0, 5.0, 5.0]));

        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert_eq!(report.error_count(), 1);
        assert!(codes(&report).contains(&IssueCode::MissingCategoryRef));
    }

    #[test]
    fn detects_annotations_under_unknown_image() {
        let mut dataset = make_dataset();
        dataset.annotations.insert(
            ImageId(9),
            vec![Annotation::new(5u64, 1u64, [0.0, 0.0, 1.0, 1.0])],
        );

        let report = validate_dataset(&dataset, &ValidateOptions::default());
        assert!(codes(&report).contains(&IssueCode::MissingImageRef));
    }

    #[test]
    fn detects_bad_bboxes() {
        let mut dataset = make_dataset();
        let annotations = dataset.annotations.get_mut(&ImageId(1)).unwrap();
        annotations.push(Annotation::new(2u64, 1u64, [0.0, 0.0, f64::NAN, 5.0]));
        annotations.push(Annotation::new(3u64, 1u64, [0.0, 0.0, -5.0, 5.0]));
        annotations.push(Annotation::new(4u64, 1u64, [90.0, 90.0, 20.0, 20.0]));

        let report = validate_dataset(&dataset, &ValidateOptions::default());
        let found = codes(&report);
        assert!(found.contains(&IssueCode::BBoxNotFinite));
        assert!(found.contains(&IssueCode::InvalidBBoxExtent));
        assert!(found.contains(&IssueCode::BBoxOutOfBounds));
    }

    #[test]
    fn missing_image_files_warn_when_probing() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let opts = ValidateOptions {
            strict: false,
            image_root: Some(dir.path().to_path_buf()),
        };

        let report = validate_dataset(&make_dataset(), &opts);
        assert!(codes(&report).contains(&IssueCode::ImageFileMissing));
        assert!(report.is_ok());
    }
}
