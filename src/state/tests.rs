//! Tests for battle-state classification

use std::sync::Arc;

use crate::assets::MemorySource;
use crate::cache::TemplateCache;
use crate::frame::{Frame, Rect};
use crate::matching::{Template, TemplateCategory};
use crate::state::{AnchorSpec, GameState, StateClassifier, StateProfile};

const SCREEN_W: u32 = 200;
const SCREEN_H: u32 = 140;

/// Distinct deterministic 20x20 texture per seed.
fn patch(seed: u32) -> Frame {
    let mut data = Vec::with_capacity(400);
    for y in 0..20u32 {
        for x in 0..20u32 {
            let h = (x + seed * 97)
                .wrapping_mul(2_654_435_761)
                .wrapping_add((y + seed * 131).wrapping_mul(2_246_822_519));
            data.push(((h >> 16) & 0xff) as u8);
        }
    }
    Frame::from_raw(20, 20, 1, data).unwrap()
}

fn screen_with(patches: &[(&Frame, u32, u32)]) -> Frame {
    let mut data = vec![15u8; (SCREEN_W * SCREEN_H) as usize];
    for (frame, x, y) in patches {
        for py in 0..frame.height() {
            for px in 0..frame.width() {
                let dest = ((y + py) * SCREEN_W + x + px) as usize;
                data[dest] = frame.data()[(py * frame.width() + px) as usize];
            }
        }
    }
    Frame::from_raw(SCREEN_W, SCREEN_H, 1, data).unwrap()
}

struct Fixture {
    menu: Frame,
    result: Frame,
    command: Frame,
    command_bar: Frame,
    source: MemorySource,
}

fn fixture() -> Fixture {
    let menu = patch(1);
    let result = patch(2);
    let command = patch(3);
    let command_bar = patch(4);

    let mut source = MemorySource::new();
    source.insert(Template::new("ui/menu-banner", TemplateCategory::UiElement, menu.clone()).unwrap());
    source.insert(
        Template::new(
            "critical/result-banner",
            TemplateCategory::CriticalElement,
            result.clone(),
        )
        .unwrap(),
    );
    source.insert(
        Template::new("ui/attack-button", TemplateCategory::UiElement, command.clone()).unwrap(),
    );
    source.insert(
        Template::new("ui/command-bar", TemplateCategory::UiElement, command_bar.clone()).unwrap(),
    );

    Fixture {
        menu,
        result,
        command,
        command_bar,
        source,
    }
}

/// Priority order used across the tests: result screens outrank command
/// screens, menus come last.
fn profiles() -> Vec<StateProfile> {
    vec![
        StateProfile::new(GameState::BattleResult).with_anchor(
            AnchorSpec::new("critical/result-banner", TemplateCategory::CriticalElement)
                .with_roi(Rect::new(140, 10, 40, 40)),
        ),
        StateProfile::new(GameState::BattleCommand)
            .with_anchor(
                AnchorSpec::new("ui/attack-button", TemplateCategory::UiElement)
                    .with_roi(Rect::new(80, 50, 40, 40)),
            )
            .with_anchor(
                AnchorSpec::new("ui/command-bar", TemplateCategory::UiElement)
                    .with_roi(Rect::new(40, 50, 40, 40)),
            ),
        StateProfile::new(GameState::Menu).with_anchor(
            AnchorSpec::new("ui/menu-banner", TemplateCategory::UiElement)
                .with_roi(Rect::new(10, 90, 40, 40)),
        ),
    ]
}

fn classifier(source: MemorySource) -> StateClassifier<MemorySource> {
    StateClassifier::new(profiles(), Arc::new(TemplateCache::default()), source)
}

#[test]
fn test_higher_priority_state_wins_ambiguous_frame() {
    let fx = fixture();
    let frame = screen_with(&[(&fx.result, 150, 20), (&fx.menu, 20, 100)]);
    assert_eq!(classifier(fx.source).classify(&frame), GameState::BattleResult);
}

#[test]
fn test_falls_through_to_lower_priority_state() {
    let fx = fixture();
    let frame = screen_with(&[(&fx.menu, 20, 100)]);
    assert_eq!(classifier(fx.source).classify(&frame), GameState::Menu);
}

#[test]
fn test_blank_frame_is_unknown() {
    let fx = fixture();
    let frame = screen_with(&[]);
    assert_eq!(classifier(fx.source).classify(&frame), GameState::Unknown);
}

#[test]
fn test_all_anchors_of_a_profile_are_required() {
    let fx = fixture();
    // Attack button present, command bar missing: BattleCommand must not win.
    let frame = screen_with(&[(&fx.command, 90, 60), (&fx.menu, 20, 100)]);
    assert_eq!(classifier(fx.source).classify(&frame), GameState::Menu);

    let fx = fixture();
    let frame = screen_with(&[(&fx.command, 90, 60), (&fx.command_bar, 50, 60)]);
    assert_eq!(
        classifier(fx.source).classify(&frame),
        GameState::BattleCommand
    );
}

#[test]
fn test_missing_template_degrades_gracefully() {
    let fx = fixture();
    let mut broken = profiles();
    broken.insert(
        0,
        StateProfile::new(GameState::Loading).with_anchor(AnchorSpec::new(
            "ui/spinner-not-shipped",
            TemplateCategory::UiElement,
        )),
    );

    let frame = screen_with(&[(&fx.menu, 20, 100)]);
    let classifier = StateClassifier::new(broken, Arc::new(TemplateCache::default()), fx.source);
    assert_eq!(classifier.classify(&frame), GameState::Menu);
}

#[test]
fn test_classify_detailed_reports_anchor_matches() {
    let fx = fixture();
    let frame = screen_with(&[(&fx.command, 90, 60), (&fx.command_bar, 50, 60)]);

    let detailed = classifier(fx.source).classify_detailed(&frame);
    assert_eq!(detailed.state, GameState::BattleCommand);
    assert_eq!(detailed.anchor_matches.len(), 2);
    assert!(detailed.anchor_matches.iter().all(|m| m.found));
    assert_eq!(detailed.anchor_matches[0].region, Rect::new(90, 60, 20, 20));
    assert!(detailed.elapsed_ms >= 0.0);

    let unknown = classifier(fixture().source).classify_detailed(&screen_with(&[]));
    assert_eq!(unknown.state, GameState::Unknown);
    assert!(unknown.anchor_matches.is_empty());
}

#[test]
fn test_classifier_reuses_cached_templates() {
    let fx = fixture();
    let cache = Arc::new(TemplateCache::default());
    let classifier = StateClassifier::new(profiles(), Arc::clone(&cache), fx.source);

    let frame = screen_with(&[(&fx.menu, 20, 100)]);
    assert_eq!(classifier.classify(&frame), GameState::Menu);
    let after_first = cache.stats();
    assert!(after_first.miss_count > 0);
    assert!(after_first.entry_count > 0);

    assert_eq!(classifier.classify(&frame), GameState::Menu);
    let after_second = cache.stats();
    assert!(after_second.hit_count > after_first.hit_count);
    assert_eq!(after_second.entry_count, after_first.entry_count);
}
