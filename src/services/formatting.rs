//! Display helpers shared by the leaderboard and team views.

use crate::{dao::models::LAST_HOLE, services::leaderboard::DriveCount};

/// Render a score relative to par: `E` for even, `+n` over par, `-n` under par.
pub fn format_relative_to_par(relative_to_par: i64) -> String {
    match relative_to_par {
        0 => "E".to_owned(),
        n if n > 0 => format!("+{n}"),
        n => n.to_string(),
    }
}

/// Holes played so far, or `F` once the round is finished.
pub fn format_thru(holes_completed: usize) -> String {
    if holes_completed == usize::from(LAST_HOLE) {
        "F".to_owned()
    } else {
        holes_completed.to_string()
    }
}

/// True when every listed player drove at least `minimum` times.
pub fn meets_minimum_drives(drive_counts: &[DriveCount], minimum: u32) -> bool {
    drive_counts.iter().all(|drive| drive.count >= minimum)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::dao::models::PlayerEntity;

    fn drives(counts: &[u32]) -> Vec<DriveCount> {
        counts
            .iter()
            .map(|count| DriveCount {
                player: PlayerEntity {
                    id: Uuid::new_v4(),
                    name: "Player".into(),
                },
                count: *count,
            })
            .collect()
    }

    #[test]
    fn relative_scores_carry_their_sign() {
        assert_eq!(format_relative_to_par(0), "E");
        assert_eq!(format_relative_to_par(3), "+3");
        assert_eq!(format_relative_to_par(-4), "-4");
    }

    #[test]
    fn thru_shows_f_after_the_last_hole() {
        assert_eq!(format_thru(0), "0");
        assert_eq!(format_thru(17), "17");
        assert_eq!(format_thru(18), "F");
    }

    #[test]
    fn minimum_drives_requires_every_player() {
        assert!(meets_minimum_drives(&drives(&[5, 7]), 5));
        assert!(!meets_minimum_drives(&drives(&[5, 4]), 5));
        assert!(meets_minimum_drives(&drives(&[3, 3, 3, 9]), 3));
    }
}
