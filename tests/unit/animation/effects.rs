use super::*;

fn stack(items: Vec<EffectKind>) -> EffectsConfig {
    EffectsConfig {
        enabled: true,
        seed: 7,
        items: items
            .into_iter()
            .map(|kind| EffectItem {
                kind,
                window: ActivationWindow::ALWAYS,
            })
            .collect(),
    }
}

#[test]
fn disabled_or_empty_stack_is_none() {
    let mut cfg = stack(vec![EffectKind::Pulse {
        amplitude: 0.5,
        frequency_hz: 1.0,
    }]);
    cfg.enabled = false;
    assert_eq!(cfg.resolve(FrameTime::at(0.25)), None);
    assert_eq!(stack(vec![]).resolve(FrameTime::at(0.25)), None);
}

#[test]
fn pulse_scales_uniformly() {
    let cfg = stack(vec![EffectKind::Pulse {
        amplitude: 0.5,
        frequency_hz: 1.0,
    }]);
    let adj = cfg.resolve(FrameTime::at(0.25)).unwrap();
    assert!((adj.scale_mul.x - 1.5).abs() < 1e-12);
    assert_eq!(adj.scale_mul.x, adj.scale_mul.y);
    let (o, s) = adj.apply(0.8, Vec2::new(2.0, 4.0));
    assert_eq!(o, 0.8);
    assert!((s.x - 3.0).abs() < 1e-12);
    assert!((s.y - 6.0).abs() < 1e-12);
}

#[test]
fn fade_ramps_then_holds() {
    let cfg = stack(vec![EffectKind::Fade {
        from: 0.0,
        to: 1.0,
        duration_secs: 2.0,
        ease: Ease::Linear,
    }]);
    assert_eq!(cfg.adjust(0.0).unwrap().opacity_mul, 0.0);
    assert_eq!(cfg.adjust(1.0).unwrap().opacity_mul, 0.5);
    assert_eq!(cfg.adjust(10.0).unwrap().opacity_mul, 1.0);
}

#[test]
fn blink_follows_duty_cycle() {
    let cfg = stack(vec![EffectKind::Blink {
        frequency_hz: 2.0,
        duty: 0.5,
        low: 0.25,
    }]);
    assert_eq!(cfg.adjust(0.1).unwrap().opacity_mul, 1.0);
    assert_eq!(cfg.adjust(0.3).unwrap().opacity_mul, 0.25);
}

#[test]
fn flicker_is_bounded_and_deterministic() {
    let cfg = stack(vec![EffectKind::Flicker {
        amount: 0.4,
        frequency_hz: 12.0,
    }]);
    for i in 0..50 {
        let t = f64::from(i) * 0.037;
        let a = cfg.adjust(t).unwrap().opacity_add;
        assert!((-0.4..=0.0).contains(&a), "{a}");
        assert_eq!(cfg.adjust(t).unwrap().opacity_add, a);
    }
}

#[test]
fn flicker_survives_huge_frequencies() {
    for frequency_hz in [1e30, f64::MAX] {
        let cfg = stack(vec![EffectKind::Flicker {
            amount: 0.2,
            frequency_hz,
        }]);
        for t in [0.0, 1.0, 2.5, 1e9] {
            let a = cfg.adjust(t).unwrap().opacity_add;
            assert!((-0.2..=0.0).contains(&a), "{frequency_hz} at {t}: {a}");
        }
    }
}

#[test]
fn windows_gate_individual_items() {
    let mut cfg = stack(vec![
        EffectKind::Pulse {
            amplitude: 0.5,
            frequency_hz: 1.0,
        },
        EffectKind::Blink {
            frequency_hz: 1.0,
            duty: 0.0,
            low: 0.5,
        },
    ]);
    cfg.items[1].window.start_delay_secs = 5.0;
    let early = cfg.adjust(0.25).unwrap();
    assert_eq!(early.opacity_mul, 1.0);
    let late = cfg.adjust(5.25).unwrap();
    assert_eq!(late.opacity_mul, 0.5);

    cfg.items[0].window.duration_secs = 1.0;
    assert!(!cfg.is_active(FrameTime::at(2.0)));
    assert_eq!(cfg.adjust(2.0), None);
}

#[test]
fn apply_clamps_opacity() {
    let adj = PropertyAdjust {
        opacity_mul: 3.0,
        opacity_add: 0.0,
        scale_mul: Vec2::new(1.0, 1.0),
    };
    assert_eq!(adj.apply(0.5, Vec2::new(1.0, 1.0)).0, 1.0);
    let adj = PropertyAdjust {
        opacity_add: -2.0,
        ..PropertyAdjust::default()
    };
    assert_eq!(adj.apply(0.5, Vec2::new(1.0, 1.0)).0, 0.0);
}
