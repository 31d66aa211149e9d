//! Prioritized reference templates, built once at startup and read-only afterwards.
//!
//! A template file is named `<priority>_<threshold>_<name>.png`, where priority and
//! threshold are positive integers without leading zeros. Anything else in the
//! template directory is ignored.

use std::path::Path;

use image::GrayImage;

use crate::errors::CatalogError;
use crate::features::{FeatureExtractor, Keypoint};
use crate::imgtools;

const TEMPLATE_EXTENSION: &str = ".png";

/// Priority, threshold and name decoded from a template filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateId {
    pub priority: u32,
    pub threshold: u32,
    pub name: String,
}

impl TemplateId {
    /// Parses `<priority>_<threshold>_<name>.png`. The name may itself contain
    /// underscores and dots but must not be empty.
    pub fn parse(filename: &str) -> Option<Self> {
        let stem = filename.strip_suffix(TEMPLATE_EXTENSION)?;
        let mut parts = stem.splitn(3, '_');
        let priority = parse_positive(parts.next()?)?;
        let threshold = parse_positive(parts.next()?)?;
        let name = parts.next()?;
        if name.is_empty() {
            return None;
        }
        Some(Self {
            priority,
            threshold,
            name: name.to_string(),
        })
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}{}",
            self.priority, self.threshold, self.name, TEMPLATE_EXTENSION
        )
    }
}

/// `[1-9][0-9]*` that fits in a u32
fn parse_positive(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok()
}

/// Reference image with its match threshold, priority and precomputed keypoints
#[derive(Debug, Clone)]
pub struct Template {
    pub image: GrayImage,
    pub name: String,
    /// raw descriptor-space distance a match must stay strictly below
    pub threshold: u32,
    pub priority: u32,
    keypoints: Vec<Keypoint>,
}

impl Template {
    /// Extracts the template's keypoints once; templates never change afterwards.
    /// An extraction failure is reported as `CatalogError::Features`, which the catalog
    /// builders turn into a skipped template.
    pub fn new<E: FeatureExtractor + ?Sized>(
        id: TemplateId,
        image: GrayImage,
        extractor: &E,
    ) -> Result<Self, CatalogError> {
        let keypoints = extractor
            .extract(&image)
            .map_err(|source| CatalogError::Features {
                name: id.name.clone(),
                source,
            })?;
        if keypoints.is_empty() {
            log::warn!("Template '{}' has no detectable features", id.name);
        }
        Ok(Self::from_keypoints(id, image, keypoints))
    }

    pub fn from_keypoints(id: TemplateId, image: GrayImage, keypoints: Vec<Keypoint>) -> Self {
        Self {
            image,
            name: id.name,
            threshold: id.threshold,
            priority: id.priority,
            keypoints,
        }
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }
}

/// Templates in ascending priority order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    templates: Vec<Template>,
}

impl Catalog {
    /// Orders templates by priority. The sort is stable, so equal priorities keep
    /// the order they were given in.
    pub fn from_templates(mut templates: Vec<Template>) -> Self {
        templates.sort_by_key(|t| t.priority);
        for pair in templates.windows(2) {
            if pair[0].priority == pair[1].priority {
                log::warn!(
                    "Templates '{}' and '{}' share priority {}, keeping listing order",
                    pair[0].name,
                    pair[1].name,
                    pair[0].priority
                );
            }
        }
        Self { templates }
    }

    /// Builds the catalog from (filename, image) pairs, silently dropping
    /// filenames that do not follow the template naming pattern
    pub fn from_images<I, E>(entries: I, extractor: &E) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (String, GrayImage)>,
        E: FeatureExtractor + ?Sized,
    {
        let mut templates = Vec::new();
        for (filename, image) in entries {
            match TemplateId::parse(&filename) {
                Some(id) => {
                    templates.extend(skip_unextractable(Template::new(id, image, extractor))?)
                }
                None => log::debug!("Skipping {filename}, not a template name"),
            }
        }
        Ok(Self::from_templates(templates))
    }

    /// Reads every `<priority>_<threshold>_<name>.png` in `directory`, converted to grayscale.
    /// Files are visited in name order so duplicate priorities resolve the same way on every run.
    pub fn load_directory<E>(directory: &Path, extractor: &E) -> Result<Self, CatalogError>
    where
        E: FeatureExtractor + ?Sized,
    {
        let unreadable = |source| CatalogError::Unreadable {
            path: directory.to_path_buf(),
            source,
        };
        let mut filenames: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(directory).map_err(unreadable)? {
            let entry = entry.map_err(unreadable)?;
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => filenames.push(name),
                Err(name) => log::debug!("Skipping non UTF-8 file name {name:?}"),
            }
        }
        filenames.sort();

        let mut templates = Vec::new();
        for filename in filenames {
            let Some(id) = TemplateId::parse(&filename) else {
                log::debug!("Skipping {filename}, not a template name");
                continue;
            };
            let image = imgtools::load_image_bw(&directory.join(&filename))?;
            log::debug!(
                "Loaded template '{}' priority={} threshold={} ({}x{})",
                id.name,
                id.priority,
                id.threshold,
                image.width(),
                image.height()
            );
            templates.extend(skip_unextractable(Template::new(id, image, extractor))?);
        }

        let catalog = Self::from_templates(templates);
        if catalog.is_empty() {
            log::warn!("No templates found in {}", directory.display());
        } else {
            log::info!(
                "Loaded {} templates from {}",
                catalog.len(),
                directory.display()
            );
        }
        Ok(catalog)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// A template whose features cannot be extracted is left out with a warning,
/// the same way a failed screenshot extraction only costs its cycle
fn skip_unextractable(
    template: Result<Template, CatalogError>,
) -> Result<Option<Template>, CatalogError> {
    match template {
        Ok(template) => Ok(Some(template)),
        Err(CatalogError::Features { name, source }) => {
            log::warn!("Skipping template '{name}': {source}");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Template;
    type IntoIter = std::slice::Iter<'a, Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.templates.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FeatureMatchError;

    struct NoFeatures;

    impl FeatureExtractor for NoFeatures {
        fn extract(&self, _image: &GrayImage) -> Result<Vec<Keypoint>, FeatureMatchError> {
            Ok(Vec::new())
        }
    }

    struct Unextractable;

    impl FeatureExtractor for Unextractable {
        fn extract(&self, image: &GrayImage) -> Result<Vec<Keypoint>, FeatureMatchError> {
            if image.width() == 0 {
                return Err(FeatureMatchError::DegenerateImage {
                    width: image.width(),
                    height: image.height(),
                });
            }
            Ok(Vec::new())
        }
    }

    fn blank() -> GrayImage {
        GrayImage::new(4, 4)
    }

    #[test]
    fn parses_valid_names() {
        let id = TemplateId::parse("3_10_door.png").unwrap();
        assert_eq!(id.priority, 3);
        assert_eq!(id.threshold, 10);
        assert_eq!(id.name, "door");
        assert_eq!(id.file_name(), "3_10_door.png");

        let id = TemplateId::parse("12_250_ok_button.v2.png").unwrap();
        assert_eq!(id.name, "ok_button.v2");
    }

    #[test]
    fn rejects_invalid_names() {
        for name in [
            "x_y_bad.png",
            "01_5_leadingzero.png",
            "1_05_leadingzero.png",
            "0_5_zero.png",
            "1_0_zero.png",
            "1_5_.png",
            "1_5.png",
            "1_5_name.jpg",
            "1_5_name.PNG",
            "-1_5_negative.png",
            "+1_5_plus.png",
            "99999999999_5_overflow.png",
        ] {
            assert_eq!(TemplateId::parse(name), None, "{name} should be rejected");
        }
    }

    #[test]
    fn filename_filtering_keeps_only_valid_templates() {
        let entries = vec![
            ("3_10_door.png".to_string(), blank()),
            ("x_y_bad.png".to_string(), blank()),
            ("01_5_leadingzero.png".to_string(), blank()),
        ];
        let catalog = Catalog::from_images(entries, &NoFeatures).unwrap();
        assert_eq!(catalog.len(), 1);
        let template = &catalog.templates()[0];
        assert_eq!(template.priority, 3);
        assert_eq!(template.threshold, 10);
        assert_eq!(template.name, "door");
    }

    #[test]
    fn sorted_by_numeric_priority() {
        let entries = vec![
            ("10_5_ten.png".to_string(), blank()),
            ("2_5_two.png".to_string(), blank()),
            ("9_5_nine.png".to_string(), blank()),
        ];
        let catalog = Catalog::from_images(entries, &NoFeatures).unwrap();
        let names: Vec<&str> = catalog.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["two", "nine", "ten"]);
    }

    #[test]
    fn equal_priorities_keep_listing_order() {
        let entries = vec![
            ("4_5_first.png".to_string(), blank()),
            ("1_5_top.png".to_string(), blank()),
            ("4_9_second.png".to_string(), blank()),
        ];
        let catalog = Catalog::from_images(entries, &NoFeatures).unwrap();
        let names: Vec<&str> = catalog.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["top", "first", "second"]);
    }

    #[test]
    fn unextractable_template_is_skipped() {
        let entries = vec![
            ("1_5_empty.png".to_string(), GrayImage::new(0, 4)),
            ("2_5_fine.png".to_string(), blank()),
        ];
        let catalog = Catalog::from_images(entries, &Unextractable).unwrap();
        let names: Vec<&str> = catalog.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["fine"]);

        let id = TemplateId::parse("1_5_empty.png").unwrap();
        let err = Template::new(id, GrayImage::new(0, 4), &Unextractable).unwrap_err();
        assert!(matches!(err, CatalogError::Features { .. }));
    }

    #[test]
    fn missing_directory_is_fatal() {
        let err = Catalog::load_directory(Path::new("no/such/templates/dir"), &NoFeatures)
            .unwrap_err();
        assert!(matches!(err, CatalogError::Unreadable { .. }));
    }
}
