//! Generator behaviour: Euclidean, Barlow/Wolrab/Dilcue, polygon and random
use rhythm_explorer::generators::{
    barlow, bell_random, dilcue, euclidean, euclidean_rotated, indispensability_ranking, polygon,
    random, wolrab, Algorithm,
};

#[test]
fn test_euclidean_length_and_onsets_for_all_valid_inputs() {
    for n in 1usize..=128 {
        for k in [0, 1, 2, 3, n / 2, n.saturating_sub(1), n, n + 5] {
            let pattern = euclidean(k, n).unwrap();
            assert_eq!(pattern.len(), n, "E({},{}) length", k, n);
            assert_eq!(pattern.onset_count(), k.min(n), "E({},{}) onsets", k, n);
        }
    }
}

#[test]
fn test_euclidean_primes() {
    for (k, n) in [(5, 13), (7, 17), (11, 31), (3, 7)] {
        let pattern = euclidean(k, n).unwrap();
        assert_eq!(pattern.onset_count(), k);
        assert!(pattern.get(0), "E({},{}) starts on the downbeat", k, n);
    }
}

#[test]
fn test_euclidean_known_rhythms() {
    assert_eq!(euclidean(3, 8).unwrap().to_string(), "10010010");
    assert_eq!(euclidean(2, 5).unwrap().to_string(), "10100");
    assert_eq!(euclidean(4, 12).unwrap().to_string(), "100100100100");
}

#[test]
fn test_euclidean_rotation() {
    assert_eq!(euclidean_rotated(3, 8, 1).unwrap().to_string(), "01001001");
    assert_eq!(euclidean_rotated(3, 8, -8).unwrap().to_string(), "10010010");
}

#[test]
fn test_barlow_uses_indispensability_order() {
    assert_eq!(indispensability_ranking(8), vec![0, 1, 3, 5, 7, 2, 6, 4]);
    assert_eq!(barlow(1, 8).unwrap().to_string(), "10000000");
    assert_eq!(barlow(3, 8).unwrap().to_string(), "11010000");
    assert_eq!(barlow(5, 8).unwrap().to_string(), "11010101");
    assert_eq!(barlow(12, 8).unwrap().onset_count(), 8);
}

#[test]
fn test_wolrab_picks_least_indispensable() {
    assert_eq!(wolrab(3, 8).unwrap().to_string(), "00101010");
    assert!(!wolrab(7, 8).unwrap().get(0), "downbeat is chosen last");
}

#[test]
fn test_dilcue_is_inverted_euclid() {
    assert_eq!(dilcue(3, 8).unwrap().to_string(), "01010010");
    assert_eq!(dilcue(3, 8).unwrap().onset_count(), 3);
}

#[test]
fn test_polygon_vertices() {
    assert_eq!(polygon(3, 0, 3).unwrap().to_string(), "111");
    assert_eq!(polygon(4, 0, 12).unwrap().to_string(), "100100100100");
    assert_eq!(polygon(3, 1, 12).unwrap().to_string(), "010001000100");
    assert_eq!(polygon(4, -1, 8).unwrap().to_string(), "01010101");
}

#[test]
fn test_polygon_collisions_reduce_onsets() {
    let pattern = polygon(5, 0, 4).unwrap();
    assert_eq!(pattern.onset_count(), 4, "two vertices share a step");
    assert!(polygon(0, 0, 4).is_err());
}

#[test]
fn test_random_is_seeded() {
    let a = random(5, 16, 1234).unwrap();
    let b = random(5, 16, 1234).unwrap();
    assert_eq!(a, b, "same seed gives the same pattern");
    assert_eq!(a.onset_count(), 5);
    assert_eq!(random(20, 16, 1).unwrap().onset_count(), 16);
}

#[test]
fn test_bell_random_stays_inside_bounds() {
    for seed in 0..100 {
        let pattern = bell_random(16, seed).unwrap();
        let onsets = pattern.onset_count();
        assert!((1..=15).contains(&onsets), "seed {} gave {} onsets", seed, onsets);
    }
}

#[test]
fn test_algorithm_letters() {
    for letter in ['e', 'b', 'w', 'd'] {
        let algorithm = Algorithm::from_letter(letter).unwrap();
        assert_eq!(algorithm.letter().to_ascii_lowercase(), letter);
    }
    assert_eq!(Algorithm::from_letter('x'), None);
}

#[test]
fn test_generators_reject_bad_step_counts() {
    assert!(euclidean(3, 0).is_err());
    assert!(barlow(3, 129).is_err());
    assert!(polygon(3, 0, 200).is_err());
}
