//! Property tests for the COCO JSON reader/writer.

use std::collections::BTreeMap;

use proptest::prelude::*;

use detviz::dataset::{from_coco_str, to_coco_string, Dataset};
use detviz::model::{Annotation, AnnotationId, Category, CategoryId, ImageId, ImageMetadata};

fn arb_annotation() -> impl Strategy<Value = Annotation> {
    (
        proptest::option::of(1u64..5),
        proptest::option::of("[a-z]{1,8}"),
        proptest::option::of(0.0f64..=1.0),
        proptest::option::of([0.0f64..100.0, 0.0f64..100.0, 1.0f64..50.0, 1.0f64..50.0]),
    )
        .prop_map(|(category, label, score, bbox)| Annotation {
            // ids are reassigned uniquely when the dataset is assembled
            id: AnnotationId::new(0),
            category_id: category.map(CategoryId::new),
            label,
            score,
            bbox,
        })
}

fn arb_dataset() -> impl Strategy<Value = Dataset> {
    (
        proptest::collection::vec((1u64..100, 1u32..2000, 1u32..2000), 0..5),
        proptest::collection::vec("[a-z]{1,8}", 0..4),
        proptest::collection::vec(arb_annotation(), 0..10),
    )
        .prop_map(|(image_rows, names, annotation_rows)| {
            let images: Vec<ImageMetadata> = image_rows
                .into_iter()
                .enumerate()
                .map(|(i, (id, w, h))| {
                    ImageMetadata::new(id + i as u64 * 100, format!("img{i}.jpg"), w, h)
                })
                .collect();

            let categories: Vec<Category> = names
                .into_iter()
                .enumerate()
                .map(|(i, name)| Category::new(i as u64 + 1, name))
                .collect();

            let mut annotations: BTreeMap<ImageId, Vec<Annotation>> = BTreeMap::new();
            for (i, mut annotation) in annotation_rows.into_iter().enumerate() {
                // unique increasing ids, spread round-robin across the images
                annotation.id = AnnotationId::new(i as u64 + 1);
                let image_id = images
                    .get(i % images.len().max(1))
                    .map(|image| image.id)
                    .unwrap_or(ImageId::new(1));
                annotations.entry(image_id).or_default().push(annotation);
            }

            Dataset {
                images,
                categories,
                annotations,
            }
        })
}

proptest! {
    #[test]
    fn coco_roundtrip_is_lossless(dataset in arb_dataset()) {
        let json = to_coco_string(&dataset).expect("serialize coco json");
        let restored = from_coco_str(&json).expect("parse coco json");

        prop_assert_eq!(dataset, restored);
    }

    #[test]
    fn coco_roundtrip_is_idempotent(dataset in arb_dataset()) {
        let first_json = to_coco_string(&dataset).expect("serialize first pass");
        let first = from_coco_str(&first_json).expect("parse first pass");

        let second_json = to_coco_string(&first).expect("serialize second pass");
        let second = from_coco_str(&second_json).expect("parse second pass");

        prop_assert_eq!(first, second);
    }
}
