// Integration test: Bar and RollingBar window behavior
//
// Checks the bar-boundary rules from the outside: edits and enable/disable
// only ever reach the next bar, and the display window always mirrors what
// was actually played.

use drumloop::sequencer::{Bar, GridShape, RollingBar};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn shapes() -> Vec<GridShape> {
    vec![
        GridShape::new(1, 1).unwrap(),
        GridShape::new(3, 4).unwrap(),
        GridShape::four_by_four(),
        GridShape::new(7, 3).unwrap(),
    ]
}

fn random_bar(shape: GridShape, rng: &mut StdRng) -> Arc<Bar> {
    let slots = (0..shape.grid_len()).map(|_| rng.gen_bool(0.4)).collect();
    Bar::pattern(shape, slots).unwrap()
}

#[test]
fn test_iterate_yields_grid_len_values_for_every_shape() {
    let mut rng = StdRng::seed_from_u64(11);
    for shape in shapes() {
        let empty = Bar::empty(shape);
        let pattern = random_bar(shape, &mut rng);

        assert_eq!(empty.iter().count(), shape.grid_len());
        assert_eq!(pattern.iter().count(), shape.grid_len());

        // Restartable: a second pass yields the same values
        let first: Vec<bool> = pattern.iter().collect();
        let second: Vec<bool> = pattern.iter().collect();
        assert_eq!(first, second);

        let mut iter = pattern.iter();
        for _ in 0..shape.grid_len() {
            assert!(iter.next().is_some());
        }
        assert!(iter.next().is_none());
    }
}

#[test]
fn test_disabled_first_bar_is_silent() {
    let shape = GridShape::four_by_four();
    let template = Bar::from_hits(shape, &[0, 4, 8, 12]).unwrap();
    let mut rolling = RollingBar::new(template, false);

    let first: Vec<bool> = (0..16).map(|_| rolling.next_tick()).collect();
    assert!(first.iter().all(|&hit| !hit));
}

#[test]
fn test_primed_first_bar_plays_template() {
    let shape = GridShape::four_by_four();
    let template = Bar::from_hits(shape, &[0, 4, 8, 12]).unwrap();
    let mut rolling = RollingBar::new(Arc::clone(&template), true);
    rolling.prime_current_to_template();

    let first: Vec<bool> = (0..16).map(|_| rolling.next_tick()).collect();
    let expected: Vec<bool> = template.iter().collect();
    assert_eq!(first, expected);
}

#[test]
fn test_enable_mid_bar_waits_for_next_bar() {
    let shape = GridShape::four_by_four();
    let template = Bar::from_hits(shape, &[0, 8]).unwrap();
    let mut rolling = RollingBar::new(Arc::clone(&template), false);

    let mut bar = vec![rolling.next_tick()];
    rolling.enable();
    bar.extend((0..15).map(|_| rolling.next_tick()));
    assert_eq!(bar, vec![false; 16]);

    let following: Vec<bool> = (0..16).map(|_| rolling.next_tick()).collect();
    assert_eq!(following, template.iter().collect::<Vec<_>>());
}

#[test]
fn test_disable_at_any_offset_finishes_the_bar() {
    let shape = GridShape::new(3, 4).unwrap();
    let template = Bar::from_hits(shape, &[0, 3, 5, 6, 11]).unwrap();
    let expected: Vec<bool> = template.iter().collect();

    for offset in 0..shape.grid_len() {
        let mut rolling = RollingBar::new(Arc::clone(&template), true);
        rolling.prime_current_to_template();

        let mut bar: Vec<bool> = (0..offset).map(|_| rolling.next_tick()).collect();
        rolling.disable();
        bar.extend((offset..shape.grid_len()).map(|_| rolling.next_tick()));
        assert_eq!(bar, expected, "disable at offset {}", offset);

        let next: Vec<bool> = (0..shape.grid_len()).map(|_| rolling.next_tick()).collect();
        assert!(next.iter().all(|&hit| !hit), "offset {}", offset);
    }
}

#[test]
fn test_display_mirrors_played_ticks() {
    let mut rng = StdRng::seed_from_u64(42);

    for shape in shapes() {
        let len = shape.grid_len();
        let template = random_bar(shape, &mut rng);
        let mut rolling = RollingBar::new(template, true);
        rolling.prime_current_to_template();

        let mut played: Vec<bool> = Vec::new();
        for n in 0..(len * 3 + 1) {
            let window = rolling.display();
            assert_eq!(window.len(), 2 * len);

            // Past half: last `len` ticks played, empty-bar padding before start
            let mut expected_past = vec![false; len.saturating_sub(played.len())];
            expected_past.extend(&played[played.len().saturating_sub(len)..]);
            assert_eq!(&window[..len], &expected_past[..], "{} after {} ticks", shape, n);

            // Future half: rest of current + head of next
            let offset = rolling.offset();
            let mut expected_future: Vec<bool> =
                rolling.current_bar().iter().skip(offset).collect();
            expected_future.extend(rolling.next_bar().iter().take(offset));
            assert_eq!(&window[len..], &expected_future[..], "{} after {} ticks", shape, n);

            played.push(rolling.next_tick());
        }
    }
}

#[test]
fn test_toggle_only_touches_next() {
    let shape = GridShape::four_by_four();
    let template = Bar::from_hits(shape, &[0, 8]).unwrap();
    let mut rolling = RollingBar::new(Arc::clone(&template), true);
    rolling.prime_current_to_template();
    for _ in 0..5 {
        rolling.next_tick();
    }

    let current_before: Vec<bool> = rolling.current_bar().iter().collect();
    let next_before: Vec<bool> = rolling.next_bar().iter().collect();

    assert!(!rolling.toggle_next_bar_tick(16));
    assert_eq!(rolling.next_bar().iter().collect::<Vec<_>>(), next_before);

    assert!(rolling.toggle_next_bar_tick(3));
    let next_after: Vec<bool> = rolling.next_bar().iter().collect();
    let changed: Vec<usize> = (0..16).filter(|&i| next_after[i] != next_before[i]).collect();
    assert_eq!(changed, vec![3]);
    assert_eq!(rolling.current_bar().iter().collect::<Vec<_>>(), current_before);

    // Remaining ticks of the in-flight bar are unaffected
    let rest: Vec<bool> = (5..16).map(|_| rolling.next_tick()).collect();
    assert_eq!(rest, current_before[5..].to_vec());
    let edited: Vec<bool> = (0..16).map(|_| rolling.next_tick()).collect();
    assert_eq!(edited, next_after);
}

#[test]
fn test_empty_bar_is_shared_per_shape() {
    let shape = GridShape::new(5, 2).unwrap();
    let a = RollingBar::new(Bar::from_hits(shape, &[1]).unwrap(), false);
    let b = RollingBar::new(Bar::from_hits(shape, &[2]).unwrap(), false);

    assert!(Arc::ptr_eq(a.next_bar(), b.next_bar()));
    assert!(Arc::ptr_eq(a.current_bar(), &Bar::empty(shape)));

    let other = RollingBar::new(Bar::from_hits(GridShape::new(2, 5).unwrap(), &[1]).unwrap(), false);
    assert!(!Arc::ptr_eq(a.next_bar(), other.next_bar()));
}

#[test]
fn test_parse_and_display_patterns() {
    let shape = GridShape::four_by_four();
    let bar = Bar::parse(shape, "x... ..x. |x-x- 0001").unwrap();
    assert_eq!(bar.to_pattern_string(), "x.....x.x.x....x");
    assert_eq!(bar.to_string(), "x...|..x.|x.x.|...x");
    assert_eq!(bar.hit_count(), 5);

    assert!(Bar::parse(shape, "x...").is_err());
    assert!(Bar::parse(shape, "x...x...x...x..?").is_err());
}
