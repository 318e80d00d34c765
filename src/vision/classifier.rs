//! Priority classification of a frame

use super::capture::Frame;
use super::matcher::{match_template, MatchThresholds};
use super::template::{Cue, TemplateStore};
use crate::core::DetectedState;

/// Turns a frame into a single detected state
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    thresholds: MatchThresholds,
}

impl Classifier {
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &MatchThresholds {
        &self.thresholds
    }

    /// Try cues in [`Cue::PRIORITY`] order and return the first that matches.
    /// Later cues are not evaluated once one hits. Positions are absolute
    /// screen coordinates.
    pub fn classify(&self, frame: &Frame, store: &TemplateStore) -> DetectedState {
        for cue in Cue::PRIORITY {
            let Some(template) = store.get(cue) else {
                continue;
            };
            if let Some(found) = match_template(frame, template, &self.thresholds) {
                let position = found.absolute_center(frame.origin());
                log::debug!(
                    "Detected {} at {} (score={:.3}, mode={})",
                    cue,
                    position,
                    found.score,
                    found.mode
                );
                return DetectedState::new(cue.activity(), position, found.score)
                    .with_mode(found.mode);
            }
        }
        DetectedState::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ActivityState;
    use crate::region::Point;
    use crate::vision::matcher::EdgeParams;
    use crate::vision::template::Template;
    use image::{GrayImage, Luma};

    /// Seeded noise; different seeds are uncorrelated
    fn pattern(width: u32, height: u32, seed: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let mut h = x.wrapping_mul(374_761_393)
                ^ y.wrapping_mul(668_265_263)
                ^ seed.wrapping_mul(2_246_822_519);
            h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
            Luma([(h ^ (h >> 16)) as u8])
        })
    }

    fn store_with(cues: &[(Cue, u32)]) -> TemplateStore {
        cues.iter().fold(TemplateStore::new(), |store, &(cue, seed)| {
            store.with_template(Template::from_gray(
                cue,
                pattern(24, 18, seed),
                EdgeParams::default(),
            ))
        })
    }

    fn frame_with(patches: &[(u32, (u32, u32))], origin: Point) -> Frame {
        let mut canvas = GrayImage::from_pixel(160, 120, Luma([50]));
        for &(seed, (x, y)) in patches {
            image::imageops::replace(&mut canvas, &pattern(24, 18, seed), x as i64, y as i64);
        }
        Frame::new(canvas, origin, EdgeParams::default())
    }

    #[test]
    fn test_classify_nothing() {
        let store = store_with(&[(Cue::Spatula, 1)]);
        let frame = Frame::new(
            GrayImage::from_pixel(60, 60, Luma([50])),
            Point::default(),
            EdgeParams::default(),
        );
        let detected = Classifier::default().classify(&frame, &store);
        assert_eq!(detected.state, ActivityState::Idle);
    }

    #[test]
    fn test_classify_offsets_into_screen_space() {
        let store = store_with(&[(Cue::Spatula, 1), (Cue::CanCook, 4)]);
        let frame = frame_with(&[(4, (20, 30))], Point::new(1000, 500));

        let detected = Classifier::default().classify(&frame, &store);
        assert_eq!(detected.state, ActivityState::CanCook);
        assert_eq!(detected.position, Point::new(1000 + 20 + 12, 500 + 30 + 9));
        assert!(detected.score >= 0.70);
    }

    #[test]
    fn test_classify_prefers_higher_priority() {
        let store = store_with(&[
            (Cue::Spatula, 1),
            (Cue::Done, 2),
            (Cue::CannotCook, 3),
            (Cue::CanCook, 4),
            (Cue::Menu, 5),
        ]);

        let frame = frame_with(&[(5, (0, 0)), (4, (40, 0)), (2, (80, 60))], Point::default());
        let detected = Classifier::default().classify(&frame, &store);
        assert_eq!(detected.state, ActivityState::Done);

        let frame = frame_with(&[(5, (0, 0)), (1, (120, 90))], Point::default());
        let detected = Classifier::default().classify(&frame, &store);
        assert_eq!(detected.state, ActivityState::Quicktime);
        assert_eq!(detected.position, Point::new(132, 99));
    }

    #[test]
    fn test_missing_template_never_matches() {
        let store = store_with(&[(Cue::Spatula, 1)]);
        let frame = frame_with(&[(5, (10, 10))], Point::default());
        let detected = Classifier::default().classify(&frame, &store);
        assert!(detected.is_none());
    }
}
