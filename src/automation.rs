//! The capture, decide, click loop and the collaborators it drives.

use std::thread;
use std::time::Duration;

use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::catalog::Catalog;
use crate::engine::{Detection, MatchEngine};
use crate::errors::AutoClickError;
use crate::features::{FeatureExtractor, Sift};

/// Source of full screen grayscale frames
pub trait ScreenCapturer {
    fn capture(&mut self) -> Result<GrayImage, AutoClickError>;
}

pub trait PointerController {
    /// current pointer position in screen pixels
    fn position(&mut self) -> Result<(i32, i32), AutoClickError>;
    /// moves to (x, y) and performs a left click there
    fn click(&mut self, x: i32, y: i32) -> Result<(), AutoClickError>;
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), AutoClickError>;
}

/// Decides how long to wait before the next cycle
pub trait Pacer {
    fn next_delay(&mut self) -> Duration;
}

/// Uniformly random delay between `min` and `max` seconds, both inclusive
pub struct RandomPacer<R = StdRng> {
    min: f64,
    max: f64,
    rng: R,
}

impl RandomPacer<StdRng> {
    pub fn new(min: f64, max: f64) -> Self {
        Self::with_rng(min, max, StdRng::from_os_rng())
    }
}

impl<R: Rng> RandomPacer<R> {
    /// Bounds are reordered if given backwards and negative values are clamped to zero
    pub fn with_rng(min: f64, max: f64, rng: R) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min: min.max(0.0),
            max: max.max(0.0),
            rng,
        }
    }
}

impl<R: Rng> Pacer for RandomPacer<R> {
    fn next_delay(&mut self) -> Duration {
        let secs = self.rng.random_range(self.min..=self.max);
        Duration::from_secs_f64(secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Clicked(Detection),
    NoMatch,
}

pub struct AutoClicker<C, P, T, E = Sift> {
    capturer: C,
    pointer: P,
    pacer: T,
    engine: MatchEngine<E>,
    catalog: Catalog,
}

impl<C, P, T, E> AutoClicker<C, P, T, E>
where
    C: ScreenCapturer,
    P: PointerController,
    T: Pacer,
    E: FeatureExtractor,
{
    pub fn new(capturer: C, pointer: P, pacer: T, engine: MatchEngine<E>, catalog: Catalog) -> Self {
        Self {
            capturer,
            pointer,
            pacer,
            engine,
            catalog,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    pub fn capturer(&self) -> &C {
        &self.capturer
    }

    /// One capture and decision. On a detection the pointer clicks the point and then
    /// returns to where it was before.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, AutoClickError> {
        let screenshot = self.capturer.capture()?;
        let Some(detection) = self.engine.decide(&screenshot, &self.catalog)? else {
            log::info!("No matches found");
            return Ok(CycleOutcome::NoMatch);
        };

        let point = detection.point;
        if !point.x.is_finite() || !point.y.is_finite() || point.x < 0.0 || point.y < 0.0 {
            return Err(AutoClickError::OutOfBounds {
                x: point.x,
                y: point.y,
            });
        }
        let (x, y) = point.rounded();

        let saved = self.pointer.position()?;
        log::info!("Saved pointer position x={} y={}", saved.0, saved.1);
        log::info!(
            "Clicking on {} at coordinates x={} y={}",
            detection.template,
            point.x,
            point.y
        );
        // the pointer goes back even when the button press fails
        let clicked = self.pointer.click(x, y);
        self.pointer.move_to(saved.0, saved.1)?;
        clicked?;
        Ok(CycleOutcome::Clicked(detection))
    }

    /// Sleeps for the pacer's delay and runs a cycle, `max_cycles` times or forever when None.
    /// Failed extractions and captures only skip their cycle; every other error ends the run.
    pub fn run(&mut self, max_cycles: Option<u64>) -> Result<(), AutoClickError> {
        let mut cycles: u64 = 0;
        while max_cycles.map_or(true, |max| cycles < max) {
            let delay = self.pacer.next_delay();
            log::info!("Sleeping for {:.3} seconds", delay.as_secs_f64());
            thread::sleep(delay);

            match self.run_cycle() {
                Ok(_) => {}
                Err(AutoClickError::Match(err)) => {
                    log::info!("Ignoring feature matching error: {err}");
                }
                Err(err) if err.is_recoverable() => {
                    log::warn!("Skipping cycle: {err}");
                }
                Err(err) => return Err(err),
            }
            cycles += 1;
        }
        Ok(())
    }
}
