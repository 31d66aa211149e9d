//! Priority-ordered decision: which template, if any, gets clicked this cycle.

use image::GrayImage;

use crate::aggregate::{aggregate, ClickPoint};
use crate::catalog::Catalog;
use crate::errors::FeatureMatchError;
use crate::features::{FeatureExtractor, Sift};
use crate::matcher::{match_points, MatchPolicy};

/// Winning template and where to click it
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub point: ClickPoint,
    pub template: String,
    pub priority: u32,
    /// number of accepted descriptor matches behind `point`
    pub matches: usize,
}

pub struct MatchEngine<E = Sift> {
    extractor: E,
    policy: MatchPolicy,
}

impl MatchEngine<Sift> {
    pub fn new() -> Self {
        Self::with_extractor(Sift::default())
    }
}

impl Default for MatchEngine<Sift> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: FeatureExtractor> MatchEngine<E> {
    pub fn with_extractor(extractor: E) -> Self {
        Self {
            extractor,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Walks the catalog in priority order and returns the first template whose
    /// accepted matches aggregate to a point. Later templates are never examined once one
    /// matches, however strong their match would be.
    ///
    /// `Ok(None)` is the ordinary no-match outcome. Screenshot keypoints are extracted once
    /// and shared by every template of the call.
    pub fn decide(
        &self,
        screenshot: &GrayImage,
        catalog: &Catalog,
    ) -> Result<Option<Detection>, FeatureMatchError> {
        if catalog.is_empty() {
            return Ok(None);
        }
        let screenshot_keypoints = self.extractor.extract(screenshot)?;
        log::debug!(
            "Screenshot {}x{} has {} keypoints",
            screenshot.width(),
            screenshot.height(),
            screenshot_keypoints.len()
        );

        for template in catalog {
            let points = match_points(
                template.keypoints(),
                &screenshot_keypoints,
                template.threshold as f32,
                self.policy,
            );
            log::debug!(
                "Template '{}' (priority {}): {} of {} keypoints matched",
                template.name,
                template.priority,
                points.len(),
                template.keypoints().len()
            );
            if let Some(point) = aggregate(&points) {
                return Ok(Some(Detection {
                    point,
                    template: template.name.clone(),
                    priority: template.priority,
                    matches: points.len(),
                }));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Template, TemplateId};
    use crate::features::{Descriptor, Keypoint, DESCRIPTOR_LEN};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn kp(x: f32, y: f32, first: f32) -> Keypoint {
        let mut values = [0.0; DESCRIPTOR_LEN];
        values[0] = first;
        Keypoint::new(x, y, Descriptor(values))
    }

    fn template(priority: u32, threshold: u32, name: &str, keypoints: Vec<Keypoint>) -> Template {
        let id = TemplateId {
            priority,
            threshold,
            name: name.to_string(),
        };
        Template::from_keypoints(id, GrayImage::new(8, 8), keypoints)
    }

    /// hands out the same screenshot keypoints and counts calls
    struct Fixed {
        keypoints: Vec<Keypoint>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(keypoints: Vec<Keypoint>) -> Self {
            Self {
                keypoints,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl FeatureExtractor for Fixed {
        fn extract(&self, _image: &GrayImage) -> Result<Vec<Keypoint>, FeatureMatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.keypoints.clone())
        }
    }

    struct Failing;

    impl FeatureExtractor for Failing {
        fn extract(&self, image: &GrayImage) -> Result<Vec<Keypoint>, FeatureMatchError> {
            Err(FeatureMatchError::DegenerateImage {
                width: image.width(),
                height: image.height(),
            })
        }
    }

    #[test]
    fn lower_priority_number_wins() {
        // screenshot has a weak match for "first" near (10, 10) and an exact match
        // for "second" at (500, 500)
        let screenshot = vec![kp(10.0, 10.0, 4.0), kp(500.0, 500.0, 100.0)];
        let catalog = Catalog::from_templates(vec![
            template(2, 50, "second", vec![kp(0.0, 0.0, 100.0)]),
            template(1, 50, "first", vec![kp(0.0, 0.0, 0.0)]),
        ]);
        let engine = MatchEngine::with_extractor(Fixed::new(screenshot));
        let detection = engine
            .decide(&GrayImage::new(1, 1), &catalog)
            .unwrap()
            .unwrap();
        assert_eq!(detection.template, "first");
        assert_eq!(detection.priority, 1);
        assert_eq!(detection.point, ClickPoint::new(10.0, 10.0));
        assert_eq!(detection.matches, 1);
    }

    #[test]
    fn falls_through_to_next_template() {
        let screenshot = vec![kp(30.0, 40.0, 100.0)];
        let catalog = Catalog::from_templates(vec![
            template(1, 5, "absent", vec![kp(0.0, 0.0, 0.0)]),
            template(2, 5, "present", vec![kp(0.0, 0.0, 101.0)]),
        ]);
        let engine = MatchEngine::with_extractor(Fixed::new(screenshot));
        let detection = engine.decide(&GrayImage::new(1, 1), &catalog).unwrap();
        assert_eq!(detection.map(|d| d.template), Some("present".to_string()));
    }

    #[test]
    fn screenshot_extracted_once_per_decision() {
        let catalog = Catalog::from_templates(vec![
            template(1, 1, "a", vec![kp(0.0, 0.0, 0.0)]),
            template(2, 1, "b", vec![kp(0.0, 0.0, 0.0)]),
            template(3, 1, "c", vec![kp(0.0, 0.0, 0.0)]),
        ]);
        let engine = MatchEngine::with_extractor(Fixed::new(vec![kp(1.0, 1.0, 200.0)]));
        assert_eq!(engine.decide(&GrayImage::new(1, 1), &catalog).unwrap(), None);
        assert_eq!(
            engine.extractor().calls.load(Ordering::SeqCst),
            1
        );
    }

    #[test]
    fn zero_thresholds_never_match() {
        let shared = vec![kp(5.0, 5.0, 0.0), kp(6.0, 6.0, 1.0)];
        let catalog = Catalog::from_templates(vec![
            template(1, 0, "a", shared.clone()),
            template(2, 0, "b", shared.clone()),
        ]);
        let engine = MatchEngine::with_extractor(Fixed::new(shared));
        for _ in 0..3 {
            assert_eq!(engine.decide(&GrayImage::new(1, 1), &catalog).unwrap(), None);
        }
    }

    #[test]
    fn empty_screenshot_features_is_no_point() {
        let catalog = Catalog::from_templates(vec![template(1, 500, "a", vec![kp(0.0, 0.0, 0.0)])]);
        let engine = MatchEngine::with_extractor(Fixed::new(Vec::new()));
        assert_eq!(engine.decide(&GrayImage::new(1, 1), &catalog).unwrap(), None);
    }

    #[test]
    fn empty_catalog_skips_extraction() {
        let engine = MatchEngine::with_extractor(Failing);
        assert_eq!(engine.decide(&GrayImage::new(0, 0), &Catalog::default()).unwrap(), None);
    }

    #[test]
    fn extraction_failure_is_reported() {
        let catalog = Catalog::from_templates(vec![template(1, 5, "a", vec![kp(0.0, 0.0, 0.0)])]);
        let engine = MatchEngine::with_extractor(Failing);
        let err = engine.decide(&GrayImage::new(0, 3), &catalog).unwrap_err();
        assert!(matches!(err, FeatureMatchError::DegenerateImage { .. }));
    }

    #[test]
    fn ratio_policy_is_applied() {
        let screenshot = vec![kp(1.0, 1.0, 1.0), kp(2.0, 2.0, 1.2)];
        let catalog = Catalog::from_templates(vec![template(1, 50, "a", vec![kp(0.0, 0.0, 0.0)])]);
        let engine = MatchEngine::with_extractor(Fixed::new(screenshot))
            .with_policy(MatchPolicy::RatioTest { ratio: 0.75 });
        assert_eq!(engine.decide(&GrayImage::new(1, 1), &catalog).unwrap(), None);
    }
}
