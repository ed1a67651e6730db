use super::*;

#[test]
fn delay_gates_start() {
    let w = ActivationWindow {
        epoch_secs: 0.0,
        start_delay_secs: 1.0,
        duration_secs: 0.0,
    };
    assert!(!w.is_open(0.5));
    assert!(w.is_open(1.0));
    assert!(w.is_open(1e6));
}

#[test]
fn duration_closes_window_exclusively() {
    let w = ActivationWindow {
        epoch_secs: 0.0,
        start_delay_secs: 0.0,
        duration_secs: 1.0,
    };
    assert!(w.is_open(0.0));
    assert!(w.is_open(0.999));
    assert!(!w.is_open(1.0));
    assert!(!w.is_open(1.5));
}

#[test]
fn zero_duration_never_stops() {
    let w = ActivationWindow {
        epoch_secs: 2.0,
        start_delay_secs: 0.5,
        duration_secs: 0.0,
    };
    assert!(!w.is_open(2.4));
    assert!(w.is_open(2.5));
    assert!(w.is_open(10_000.0));
    assert_eq!(w.local_secs(3.0), 0.5);
    assert_eq!(w.local_secs(0.0), 0.0);
}

#[test]
fn speed_prefers_degrees_per_second() {
    assert_eq!(resolve_speed(Some(90.0), Some(2.0)), 90.0);
    assert_eq!(resolve_speed(None, Some(4.0)), 90.0);
    assert_eq!(resolve_speed(Some(f64::NAN), Some(4.0)), 90.0);
    assert_eq!(resolve_speed(None, Some(0.0)), 0.0);
    assert_eq!(resolve_speed(None, Some(-3.0)), 0.0);
    assert_eq!(resolve_speed(None, None), 0.0);
}

#[test]
fn direction_signs() {
    assert_eq!(Direction::Cw.sign(), 1.0);
    assert_eq!(Direction::Ccw.sign(), -1.0);
    assert_eq!(Direction::default(), Direction::Cw);
}
