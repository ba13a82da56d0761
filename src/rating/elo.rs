//! ELO Math
//!
//! Pure functions. Ratings are integers; intermediate math is `f64`.

/// Rating assigned to players and teams with no history.
pub const DEFAULT_ELO: i32 = 1000;

/// Ratings never drop below this.
pub const MIN_ELO: i32 = 100;

/// K-factor while a player is provisional.
pub const K_PROVISIONAL: f64 = 40.0;

/// K-factor once established.
pub const K_ESTABLISHED: f64 = 32.0;

/// Games needed before the established K-factor applies.
pub const PROVISIONAL_GAMES: u32 = 30;

/// Expected score of `a` against `b`.
pub fn expected_score(a: i32, b: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(b - a) / 400.0))
}

/// K-factor for a player with `games_played` completed matches.
pub fn k_factor(games_played: u32) -> f64 {
    if games_played < PROVISIONAL_GAMES {
        K_PROVISIONAL
    } else {
        K_ESTABLISHED
    }
}

/// Rating after a game with result `actual_score` (1 win, 0.5 draw, 0 loss).
pub fn new_elo(current: i32, opponent: i32, actual_score: f64, games_played: u32) -> i32 {
    let delta = k_factor(games_played) * (actual_score - expected_score(current, opponent));
    let updated = (f64::from(current) + delta).round() as i32;
    updated.max(MIN_ELO)
}

/// Rounded mean rating of a roster, or [`DEFAULT_ELO`] when empty.
pub fn team_average(elos: &[i32]) -> i32 {
    if elos.is_empty() {
        return DEFAULT_ELO;
    }
    let sum: i64 = elos.iter().map(|&e| i64::from(e)).sum();
    (sum as f64 / elos.len() as f64).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equal_ratings_expect_half() {
        assert_eq!(expected_score(1000, 1000), 0.5);
        assert_eq!(expected_score(2400, 2400), 0.5);
    }

    #[test]
    fn test_reference_updates() {
        assert_eq!(new_elo(1000, 1000, 1.0, 50), 1016);
        assert_eq!(new_elo(1000, 1000, 0.0, 50), 984);
        assert_eq!(new_elo(1000, 1000, 1.0, 20), 1020);
        assert_eq!(new_elo(1000, 1000, 0.5, 50), 1000);
    }

    #[test]
    fn test_k_factor_boundary() {
        assert_eq!(k_factor(29), K_PROVISIONAL);
        assert_eq!(k_factor(30), K_ESTABLISHED);
    }

    #[test]
    fn test_floor_applies() {
        assert_eq!(new_elo(100, 3000, 0.0, 0), MIN_ELO);
        assert_eq!(new_elo(110, 110, 0.0, 0), MIN_ELO);
    }

    #[test]
    fn test_team_average() {
        assert_eq!(team_average(&[]), DEFAULT_ELO);
        assert_eq!(team_average(&[1000, 1200]), 1100);
        assert_eq!(team_average(&[1000, 1001]), 1001);
    }

    proptest! {
        #[test]
        fn prop_expected_scores_sum_to_one(a in 100i32..4000, b in 100i32..4000) {
            let sum = expected_score(a, b) + expected_score(b, a);
            prop_assert!((sum - 1.0).abs() < 1e-9);
        }

        #[test]
        fn prop_self_expected_is_half(r in 100i32..4000) {
            prop_assert!((expected_score(r, r) - 0.5).abs() < 1e-12);
        }

        #[test]
        fn prop_never_below_floor(
            current in 100i32..4000,
            opponent in 0i32..5000,
            result in prop::sample::select(vec![0.0f64, 0.5, 1.0]),
            games in 0u32..500,
        ) {
            prop_assert!(new_elo(current, opponent, result, games) >= MIN_ELO);
        }

        #[test]
        fn prop_win_never_lowers_rating(current in 100i32..4000, opponent in 100i32..4000, games in 0u32..100) {
            prop_assert!(new_elo(current, opponent, 1.0, games) >= current);
        }
    }
}
