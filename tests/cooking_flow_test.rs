//! End-to-end poll loop scenarios against scripted screens

use std::sync::Arc;

use image::{GrayImage, Luma};
use parking_lot::Mutex;

use cookbot::config::TimingConfig;
use cookbot::core::FAIL_SAFE_POINT;
use cookbot::input::PointerOp;
use cookbot::vision::{Color, EdgeParams, Template};
use cookbot::{
    ActivityState, BotConfig, BotEvent, ClickStyle, CookBot, CookbotError, Cue, MockPointer,
    MockScreen, Point, Region, StopReason, StopToken, TemplateStore,
};

const WIDTH: u32 = 24;
const HEIGHT: u32 = 18;

const TEAL: Color = Color::new(62, 205, 195);
const GRAY: Color = Color::new(189, 195, 192);

/// Seeded noise; different seeds are uncorrelated
fn noise(seed: u32) -> GrayImage {
    GrayImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let mut h = x.wrapping_mul(374_761_393)
            ^ y.wrapping_mul(668_265_263)
            ^ seed.wrapping_mul(2_246_822_519);
        h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
        Luma([(h ^ (h >> 16)) as u8])
    })
}

fn seed(cue: Cue) -> u32 {
    match cue {
        Cue::Spatula => 11,
        Cue::Done => 22,
        Cue::CannotCook => 33,
        Cue::CanCook => 44,
        Cue::Menu => 55,
    }
}

fn icon(cue: Cue) -> GrayImage {
    noise(seed(cue))
}

/// `cue`'s icon mixed with unrelated noise, so it matches at roughly 0.8
fn faded_icon(cue: Cue) -> GrayImage {
    let clean = icon(cue);
    let clutter = noise(999);
    GrayImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let a = clean.get_pixel(x, y)[0] as f32;
        let b = clutter.get_pixel(x, y)[0] as f32;
        Luma([(0.58 * a + 0.42 * b).round() as u8])
    })
}

fn all_templates() -> TemplateStore {
    [Cue::Spatula, Cue::Done, Cue::CannotCook, Cue::CanCook, Cue::Menu]
        .into_iter()
        .fold(TemplateStore::new(), |store, cue| {
            store.with_template(Template::from_gray(cue, icon(cue), EdgeParams::default()))
        })
}

fn screen_with(patches: &[(&GrayImage, (u32, u32))], width: u32, height: u32) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(width, height, Luma([50]));
    for (patch, (x, y)) in patches {
        image::imageops::replace(&mut canvas, *patch, *x as i64, *y as i64);
    }
    canvas
}

fn frame(patches: &[(&GrayImage, (u32, u32))]) -> GrayImage {
    screen_with(patches, 120, 90)
}

fn empty_frame() -> GrayImage {
    frame(&[])
}

fn button_region() -> Region {
    Region::from_corners(1000, 800, 1100, 860).unwrap()
}

fn config() -> BotConfig {
    let mut config = BotConfig::default();
    config.timing = TimingConfig::instant();
    config.preview.enabled = false;
    config.button.region = button_region().corners();
    config
}

fn bot(screen: MockScreen, pointer: MockPointer) -> CookBot<MockScreen, MockPointer> {
    CookBot::new(&config(), all_templates(), screen, pointer).unwrap()
}

fn record_events(bot: &CookBot<MockScreen, MockPointer>) -> Arc<Mutex<Vec<BotEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    bot.on_event(Box::new(move |event: &BotEvent| sink.lock().push(event.clone())));
    events
}

fn double_click_at(at: Point) -> [PointerOp; 5] {
    [
        PointerOp::Move(at),
        PointerOp::Press,
        PointerOp::Release,
        PointerOp::Press,
        PointerOp::Release,
    ]
}

#[test]
fn test_can_cook_double_clicks_once() {
    let token = StopToken::new();
    let faded = faded_icon(Cue::CanCook);
    let screen = MockScreen::new()
        .push_frame(frame(&[(&faded, (30, 20))]))
        .stop_when_drained(token.clone());

    let region = Region::from_corners(200, 100, 320, 190).unwrap();
    let mut bot = bot(screen, MockPointer::new()).with_region(Some(region));
    let events = record_events(&bot);

    let summary = bot.run(&token).unwrap();
    assert_eq!(summary.reason, StopReason::UserStop);
    assert_eq!(summary.polls, 1);
    assert_eq!(summary.clicks, 1);

    let expected = Point::new(200 + 30 + WIDTH as i32 / 2, 100 + 20 + HEIGHT as i32 / 2);
    assert_eq!(bot.pointer().ops(), &double_click_at(expected));
    assert_eq!(bot.machine().memory(), ActivityState::Idle);

    let detected = events
        .lock()
        .iter()
        .find_map(|event| match event {
            BotEvent::Detected { detected, .. } => Some(*detected),
            _ => None,
        })
        .unwrap();
    assert_eq!(detected.state, ActivityState::CanCook);
    assert!(detected.score >= 0.70 && detected.score < 0.95, "score {}", detected.score);
}

#[test]
fn test_spatula_clicked_every_poll() {
    let token = StopToken::new();
    let spatula = icon(Cue::Spatula);
    let screen = MockScreen::new()
        .push_frames(frame(&[(&spatula, (50, 40))]), 5)
        .stop_when_drained(token.clone());

    let mut bot = bot(screen, MockPointer::new());
    let events = record_events(&bot);

    let summary = bot.run(&token).unwrap();
    assert_eq!(summary.polls, 5);
    assert_eq!(summary.clicks, 5);
    assert_eq!(summary.dishes, 0);

    let target = Point::new(50 + 12, 40 + 9);
    let clicks: Vec<_> = events
        .lock()
        .iter()
        .filter_map(|event| match event {
            BotEvent::Clicked { at, style } => Some((*at, *style)),
            _ => None,
        })
        .collect();
    assert_eq!(clicks, vec![(target, ClickStyle::Double); 5]);
    assert_eq!(bot.machine().memory(), ActivityState::Quicktime);
}

#[test]
fn test_spatula_preempts_other_cues() {
    let token = StopToken::new();
    let (spatula, menu) = (icon(Cue::Spatula), icon(Cue::Menu));
    let screen = MockScreen::new()
        .push_frame(frame(&[(&menu, (0, 0)), (&spatula, (80, 60))]))
        .stop_when_drained(token.clone());

    let mut bot = bot(screen, MockPointer::new());
    let summary = bot.run(&token).unwrap();
    assert_eq!(summary.clicks, 1);
    assert_eq!(bot.pointer().moves(), vec![Point::new(92, 69)]);
}

#[test]
fn test_menu_then_teal_button_starts_cooking() {
    let token = StopToken::new();
    let menu = icon(Cue::Menu);
    let can_cook = icon(Cue::CanCook);
    let button = button_region();
    let sampled_at = Point::new(1000 + 40 + 12, 800 + 20 + 9);

    let screen = MockScreen::new()
        .push_frame(frame(&[(&menu, (10, 10))]))
        .push_frames(empty_frame(), 2)
        .stop_when_drained(token.clone())
        .with_region_frame(button, screen_with(&[(&can_cook, (40, 20))], 100, 60))
        .with_pixel(sampled_at, TEAL)
        .with_default_color(GRAY);

    let mut bot = bot(screen, MockPointer::new());
    let events = record_events(&bot);

    let summary = bot.run(&token).unwrap();
    assert_eq!(summary.polls, 3);
    assert_eq!(summary.clicks, 3);
    assert_eq!(summary.reason, StopReason::UserStop);
    assert!(!bot.machine().verify_armed());

    assert_eq!(
        bot.pointer().moves(),
        vec![Point::new(22, 19), Point::new(220, 260), button.center()]
    );

    let verdicts: Vec<_> = events
        .lock()
        .iter()
        .filter_map(|event| match event {
            BotEvent::Verdict(verdict) => Some(*verdict),
            _ => None,
        })
        .collect();
    assert_eq!(verdicts.len(), 1);
    assert_eq!(verdicts[0].state, ActivityState::CanCook);
    assert_eq!(verdicts[0].icon, Cue::CanCook);
    assert_eq!(verdicts[0].sampled_at, sampled_at);
    assert_eq!(verdicts[0].distance_can, 0);
}

#[test]
fn test_menu_then_gray_button_stops() {
    let token = StopToken::new();
    let menu = icon(Cue::Menu);
    let cannot_cook = icon(Cue::CannotCook);

    let screen = MockScreen::new()
        .push_frame(frame(&[(&menu, (10, 10))]))
        .push_frame(empty_frame())
        .stop_when_drained(token.clone())
        .with_region_frame(button_region(), screen_with(&[(&cannot_cook, (5, 5))], 100, 60))
        .with_default_color(GRAY);

    let mut bot = bot(screen, MockPointer::new());
    let summary = bot.run(&token).unwrap();
    assert_eq!(summary.reason, StopReason::IngredientsExhausted);
    assert_eq!(summary.clicks, 2);
}

#[test]
fn test_button_without_icon_retries_next_poll() {
    let token = StopToken::new();
    let menu = icon(Cue::Menu);

    let screen = MockScreen::new()
        .push_frame(frame(&[(&menu, (10, 10))]))
        .push_frames(empty_frame(), 3)
        .stop_when_drained(token.clone())
        .with_region_frame(button_region(), screen_with(&[], 100, 60));

    let mut bot = bot(screen, MockPointer::new());
    let summary = bot.run(&token).unwrap();
    assert_eq!(summary.clicks, 2);
    assert!(bot.machine().verify_armed());
}

#[test]
fn test_cannot_cook_ends_run() {
    let cannot_cook = icon(Cue::CannotCook);
    let screen = MockScreen::new().push_frame(frame(&[(&cannot_cook, (60, 30))]));

    let mut bot = bot(screen, MockPointer::new());
    let summary = bot.run(&StopToken::new()).unwrap();
    assert_eq!(summary.reason, StopReason::IngredientsExhausted);
    assert_eq!(summary.polls, 1);
    assert_eq!(summary.clicks, 0);
    assert!(bot.pointer().ops().is_empty());
}

#[test]
fn test_lingering_done_is_collected_again() {
    let token = StopToken::new();
    let done = icon(Cue::Done);
    let screen = MockScreen::new()
        .push_frames(frame(&[(&done, (20, 20))]), 2)
        .push_frame(empty_frame())
        .stop_when_drained(token.clone());

    let mut bot = bot(screen, MockPointer::new());
    let summary = bot.run(&token).unwrap();
    assert_eq!(summary.dishes, 2);
    assert_eq!(summary.clicks, 2);
    assert_eq!(bot.machine().memory(), ActivityState::Idle);
}

#[test]
fn test_capture_failure_propagates() {
    let mut bot = bot(MockScreen::new().failing(), MockPointer::new());
    let err = bot.run(&StopToken::new()).unwrap_err();
    assert!(matches!(err, CookbotError::Capture(_)));
}

#[test]
fn test_fail_safe_corner_stops_before_clicking() {
    let spatula = icon(Cue::Spatula);
    let screen = MockScreen::new().push_frame(frame(&[(&spatula, (50, 40))]));

    let mut bot = bot(screen, MockPointer::new().pinned_at(FAIL_SAFE_POINT));
    let summary = bot.run(&StopToken::new()).unwrap();
    assert_eq!(summary.reason, StopReason::FailSafe);
    assert_eq!(summary.clicks, 0);
    assert!(bot.pointer().ops().is_empty());
}

#[test]
fn test_pointer_failure_propagates() {
    let spatula = icon(Cue::Spatula);
    let screen = MockScreen::new().push_frame(frame(&[(&spatula, (50, 40))]));

    let mut bot = bot(screen, MockPointer::new().failing());
    let err = bot.run(&StopToken::new()).unwrap_err();
    assert!(matches!(err, CookbotError::Input(_)));
}

#[test]
fn test_stop_event_carries_summary() {
    let token = StopToken::new();
    let screen = MockScreen::new()
        .push_frame(empty_frame())
        .stop_when_drained(token.clone());

    let mut bot = bot(screen, MockPointer::new());
    let events = record_events(&bot);
    let summary = bot.run(&token).unwrap();

    let events = events.lock();
    assert!(matches!(events.last(), Some(BotEvent::Stopped(s)) if *s == summary));
    assert!(!events.iter().any(|e| matches!(e, BotEvent::Detected { .. })));
}
