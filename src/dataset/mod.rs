//! Dataset loading and indexing.
//!
//! The exploration tool reads object detection datasets from COCO-style
//! JSON: top-level `images`, `categories` and `annotations` arrays, with
//! `[x, y, width, height]` bounding boxes in pixel coordinates. Detection
//! results reuse the same container with a per-annotation `score` (and a
//! `label` when the detector's vocabulary is not the dataset's category
//! table).
//!
//! Inside the crate, annotations are grouped per image id - the image
//! association lives in [`Dataset`], not in
//! [`Annotation`](crate::model::Annotation) itself.
//!
//! # Deterministic Output
//!
//! The writer produces deterministic output by sorting all lists by ID.
//! This ensures reproducible exports and meaningful diffs.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DetvizError;
use crate::model::{
    Annotation, AnnotationId, Category, CategoryId, ImageId, ImageMetadata, Vector4,
};

/// A loaded dataset: images, the category table, and annotations grouped
/// by the image they belong to.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    /// All images in the dataset.
    pub images: Vec<ImageMetadata>,

    /// The category lookup table.
    pub categories: Vec<Category>,

    /// Annotations per image id.
    pub annotations: BTreeMap<ImageId, Vec<Annotation>>,
}

impl Dataset {
    /// Returns the annotations for one image, empty if there are none.
    pub fn annotations_for(&self, id: ImageId) -> &[Annotation] {
        self.annotations.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns the total annotation count across all images.
    pub fn annotation_count(&self) -> usize {
        self.annotations.values().map(Vec::len).sum()
    }

    /// Builds borrowed id-to-entity lookup maps over this dataset.
    pub fn index(&self) -> DatasetIndex<'_> {
        DatasetIndex::new(self)
    }
}

/// Borrowed lookup maps over a [`Dataset`], built once and queried many
/// times: images by id, categories by id and by name.
#[derive(Clone, Debug)]
pub struct DatasetIndex<'a> {
    images: BTreeMap<ImageId, &'a ImageMetadata>,
    categories: BTreeMap<CategoryId, &'a Category>,
    categories_by_name: BTreeMap<&'a str, &'a Category>,
}

impl<'a> DatasetIndex<'a> {
    /// Builds the lookup maps for a dataset.
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            images: dataset.images.iter().map(|image| (image.id, image)).collect(),
            categories: dataset
                .categories
                .iter()
                .map(|category| (category.id, category))
                .collect(),
            categories_by_name: dataset
                .categories
                .iter()
                .map(|category| (category.name.as_str(), category))
                .collect(),
        }
    }

    /// Looks up an image by id.
    pub fn image(&self, id: ImageId) -> Option<&'a ImageMetadata> {
        self.images.get(&id).copied()
    }

    /// Looks up a category by id.
    pub fn category(&self, id: CategoryId) -> Option<&'a Category> {
        self.categories.get(&id).copied()
    }

    /// Looks up a category by name.
    pub fn category_by_name(&self, name: &str) -> Option<&'a Category> {
        self.categories_by_name.get(name).copied()
    }

    /// The label display logic consumers apply: the category name when the
    /// annotation's category id resolves, otherwise the annotation's own
    /// fallback label, verbatim.
    pub fn display_label<'b>(&self, annotation: &'b Annotation) -> Option<&'b str>
    where
        'a: 'b,
    {
        annotation
            .category_id
            .and_then(|id| self.category(id))
            .map(|category| category.name.as_str())
            .or(annotation.label.as_deref())
    }
}

// ============================================================================
// COCO Schema Types (internal to this module)
// ============================================================================

/// Top-level COCO dataset structure.
#[derive(Debug, Serialize, Deserialize)]
struct CocoDataset {
    images: Vec<CocoImage>,

    annotations: Vec<CocoAnnotation>,

    categories: Vec<CocoCategory>,
}

/// COCO image entry.
#[derive(Debug, Serialize, Deserialize)]
struct CocoImage {
    id: u64,
    width: u32,
    height: u32,
    file_name: String,
}

/// COCO category entry.
#[derive(Debug, Serialize, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,
}

/// COCO annotation entry.
#[derive(Debug, Serialize, Deserialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,

    /// Absent when the producing model's vocabulary is not the category
    /// table (a `label` is carried instead).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category_id: Option<u64>,

    /// Fallback label, carried by detection results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,

    /// COCO bbox format: [x, y, width, height] with (x,y) as top-left corner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bbox: Option<Vector4<f64>>,

    /// Score/confidence for detection results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

fn dataset_from_coco(coco: CocoDataset) -> Dataset {
    let images = coco
        .images
        .into_iter()
        .map(|image| ImageMetadata::new(image.id, image.file_name, image.width, image.height))
        .collect();

    let categories = coco
        .categories
        .into_iter()
        .map(|category| Category::new(category.id, category.name))
        .collect();

    let mut annotations: BTreeMap<ImageId, Vec<Annotation>> = BTreeMap::new();
    for entry in coco.annotations {
        annotations
            .entry(ImageId::new(entry.image_id))
            .or_default()
            .push(Annotation {
                id: AnnotationId::new(entry.id),
                category_id: entry.category_id.map(CategoryId::new),
                label: entry.label,
                score: entry.score,
                bbox: entry.bbox,
            });
    }

    Dataset {
        images,
        categories,
        annotations,
    }
}

fn dataset_to_coco(dataset: &Dataset) -> CocoDataset {
    let mut images: Vec<CocoImage> = dataset
        .images
        .iter()
        .map(|image| CocoImage {
            id: image.id.as_u64(),
            width: image.width,
            height: image.height,
            file_name: image.file_name.clone(),
        })
        .collect();
    images.sort_by_key(|image| image.id);

    let mut categories: Vec<CocoCategory> = dataset
        .categories
        .iter()
        .map(|category| CocoCategory {
            id: category.id.as_u64(),
            name: category.name.clone(),
        })
        .collect();
    categories.sort_by_key(|category| category.id);

    let mut annotations: Vec<CocoAnnotation> = dataset
        .annotations
        .iter()
        .flat_map(|(image_id, annotations)| {
            annotations.iter().map(move |annotation| CocoAnnotation {
                id: annotation.id.as_u64(),
                image_id: image_id.as_u64(),
                category_id: annotation.category_id.map(|id| id.as_u64()),
                label: annotation.label.clone(),
                bbox: annotation.bbox,
                score: annotation.score,
            })
        })
        .collect();
    annotations.sort_by_key(|annotation| annotation.id);

    CocoDataset {
        images,
        annotations,
        categories,
    }
}

/// Reads a dataset from a COCO JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_coco_json(path: &Path) -> Result<Dataset, DetvizError> {
    let file = File::open(path).map_err(DetvizError::Io)?;
    let reader = BufReader::new(file);

    let coco: CocoDataset =
        serde_json::from_reader(reader).map_err(|source| DetvizError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(dataset_from_coco(coco))
}

/// Writes a dataset to a COCO JSON file with id-sorted, deterministic
/// output.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_coco_json(path: &Path, dataset: &Dataset) -> Result<(), DetvizError> {
    let file = File::create(path).map_err(DetvizError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, &dataset_to_coco(dataset)).map_err(|source| {
        DetvizError::CocoJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Reads a dataset from a COCO JSON string.
///
/// Useful for testing without file I/O.
pub fn from_coco_str(json: &str) -> Result<Dataset, serde_json::Error> {
    serde_json::from_str(json).map(dataset_from_coco)
}

/// Writes a dataset to a COCO JSON string with id-sorted output.
///
/// Useful for testing without file I/O.
pub fn to_coco_string(dataset: &Dataset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&dataset_to_coco(dataset))
}

/// Checks whether a file looks like a COCO detection JSON.
///
/// Sniffs the content for the three required arrays rather than parsing;
/// unreadable input is simply not a COCO file.
pub fn is_coco_json(path: &Path) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };

    let mut content = String::new();
    if file.read_to_string(&mut content).is_err() {
        return false;
    }

    ["\"images\"", "\"categories\"", "\"annotations\""]
        .iter()
        .all(|key| content.contains(key))
}

/// Resolves an image file relative to the dataset file's directory.
pub fn image_path(dataset_path: &Path, image: &ImageMetadata) -> PathBuf {
    match dataset_path.parent() {
        Some(parent) => parent.join(&image.file_name),
        None => PathBuf::from(&image.file_name),
    }
}
