//! Main bot runner

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use parking_lot::Mutex;

use super::events::{BotEvent, EventCallback, EventHandler};
use super::machine::{Action, Control, StateMachine};
use super::state::{RunSummary, StopReason};
use crate::config::{millis, BotConfig, PreviewConfig, TimingConfig};
use crate::input::PointerDevice;
use crate::region::{Point, Region};
use crate::vision::{Classifier, ColorDisambiguator, EdgeParams, Frame, ScreenSource, TemplateStore};
use crate::Result;

/// Pointer position that aborts the run
pub const FAIL_SAFE_POINT: Point = Point::new(0, 0);

/// Cooperative cancellation flag shared between the poll loop and a listener
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. The loop notices at its next iteration.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Polls the screen, classifies, and drives the pointer until stopped
pub struct CookBot<S: ScreenSource, P: PointerDevice> {
    screen: S,
    pointer: P,
    templates: TemplateStore,
    classifier: Classifier,
    disambiguator: ColorDisambiguator,
    machine: StateMachine,
    /// Search area; `None` scans the full screen
    region: Option<Region>,
    edge_params: EdgeParams,
    timing: TimingConfig,
    preview: PreviewConfig,
    /// Event handler for observer callbacks
    events: Arc<Mutex<EventHandler>>,
}

impl<S: ScreenSource, P: PointerDevice> CookBot<S, P> {
    /// Assemble a bot from configuration and loaded templates
    pub fn new(config: &BotConfig, templates: TemplateStore, screen: S, pointer: P) -> Result<Self> {
        let disambiguator = ColorDisambiguator::from_config(&config.button)?;
        let machine = StateMachine::new(
            config.timing,
            config.clicks,
            disambiguator.region().center(),
        );
        Ok(Self {
            screen,
            pointer,
            templates,
            classifier: Classifier::new((&config.matching).into()),
            disambiguator,
            machine,
            region: None,
            edge_params: (&config.matching).into(),
            timing: config.timing,
            preview: config.preview,
            events: Arc::new(Mutex::new(EventHandler::new())),
        })
    }

    /// Restrict capture to `region`
    pub fn with_region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Register an observer callback
    pub fn on_event(&self, callback: EventCallback) {
        self.events.lock().on_event(callback);
    }

    fn emit(&self, event: BotEvent) {
        let events = self.events.lock();
        if events.has_listeners() {
            events.emit(&event);
        }
    }

    /// Trace the search region's outline with the pointer, then park at its
    /// center. Does nothing without a region.
    pub fn preview_region(&mut self) -> Result<()> {
        let Some(region) = self.region else {
            log::warn!("No region to preview, scanning full screen");
            return Ok(());
        };
        log::info!(
            "Previewing region {} (top-left {}, bottom-right {})",
            region,
            region.top_left(),
            region.bottom_right()
        );
        let step = millis(self.preview.step_ms);
        for _ in 0..self.preview.loops {
            for corner in region.outline() {
                self.pointer.move_to(corner)?;
                sleep(step);
            }
        }
        self.pointer.move_to(region.center())
    }

    /// Run the poll loop until the token is stopped, the ingredients run out,
    /// the fail-safe trips, or a capture fails.
    pub fn run(&mut self, token: &StopToken) -> Result<RunSummary> {
        log::info!(
            "Bot starting in {}ms ({})",
            self.timing.start_delay,
            match &self.region {
                Some(region) => format!("region {}", region),
                None => "full screen".to_string(),
            }
        );
        sleep(millis(self.timing.start_delay));

        let mut summary = RunSummary::new(StopReason::UserStop);
        let reason = loop {
            if token.is_stopped() {
                break StopReason::UserStop;
            }
            if let Control::Stop(reason) = self.poll(&mut summary)? {
                break reason;
            }
        };

        summary.reason = reason;
        log::info!("Bot stopped: {}", summary);
        self.emit(BotEvent::Stopped(summary));
        Ok(summary)
    }

    /// One iteration: capture, classify, disambiguate, dispatch
    fn poll(&mut self, summary: &mut RunSummary) -> Result<Control> {
        let frame = Frame::grab(&mut self.screen, self.region.as_ref(), self.edge_params)?;
        summary.polls += 1;

        let mut detected = self.classifier.classify(&frame, &self.templates);
        if self.machine.wants_verdict(&detected) {
            let verdict = self.disambiguator.check(
                &mut self.screen,
                &self.templates,
                self.classifier.thresholds(),
                self.edge_params,
            );
            if let Some(verdict) = &verdict {
                self.emit(BotEvent::Verdict(*verdict));
            }
            detected = self.machine.apply_verdict(detected, verdict.as_ref());
        }
        if !detected.is_none() {
            self.emit(BotEvent::detected(detected));
        }

        let step = self.machine.step(&detected);
        if let Some(reason) = self.execute(&step.actions, summary)? {
            return Ok(Control::Stop(reason));
        }
        if step.completes_dish() {
            summary.dishes += 1;
            log::info!("Dish #{} collected", summary.dishes);
        }
        Ok(step.control)
    }

    /// Deliver actions in order. Returns a stop reason if the fail-safe trips.
    fn execute(&mut self, actions: &[Action], summary: &mut RunSummary) -> Result<Option<StopReason>> {
        let gap = millis(self.timing.click_gap);
        for action in actions {
            match *action {
                Action::Click { at, style } => {
                    if self.pointer.position()? == FAIL_SAFE_POINT {
                        log::warn!("Pointer in the top-left corner, fail-safe stop");
                        return Ok(Some(StopReason::FailSafe));
                    }
                    self.pointer.click_at(at, style, gap)?;
                    summary.clicks += 1;
                    log::debug!("{} at {}", style, at);
                    self.emit(BotEvent::Clicked { at, style });
                }
                Action::Wait(duration) => sleep(duration),
            }
        }
        Ok(None)
    }
}

fn sleep(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
