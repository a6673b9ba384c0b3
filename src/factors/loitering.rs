use crate::detect::ObjectDetection;
use crate::track::TrackHistoryStore;

use super::ratio;

/// Loiterers move less than this fraction of their height over the window.
const LOITER_DISPLACEMENT: f64 = 0.25;

/// Share of tracked people who have stayed put for at least `threshold_secs`.
///
/// Displacement is measured between the first and last retained samples, so
/// pacing back and forth in place still counts as loitering.
pub fn loitering(
    objects: &[ObjectDetection],
    tracks: &TrackHistoryStore,
    threshold_secs: f64,
) -> f64 {
    let mut tracked = 0;
    let mut loitering = 0;

    for (track_id, person) in objects
        .iter()
        .filter(|obj| obj.class.is_person())
        .filter_map(|obj| obj.tracked_id().map(|id| (id, obj)))
    {
        tracked += 1;
        let Some(history) = tracks.get(track_id) else {
            continue;
        };
        if history.len() < 2 || history.span_secs() < threshold_secs {
            continue;
        }
        if history.displacement() < person.bbox.height() * LOITER_DISPLACEMENT {
            loitering += 1;
        }
    }

    ratio(loitering, tracked).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;

    fn person(track_id: i64) -> ObjectDetection {
        ObjectDetection::new("person", 0.9, BBox::new(300.0, 200.0, 400.0, 600.0))
            .with_track(track_id)
    }

    #[test]
    fn stationary_person_past_threshold_loiters() {
        let mut tracks = TrackHistoryStore::default();
        for i in 0..=180 {
            tracks.record(4, [350.0, 400.0], i as f64 / 30.0);
        }
        assert_eq!(loitering(&[person(4)], &tracks, 5.0), 1.0);
    }

    #[test]
    fn short_history_does_not_loiter() {
        let mut tracks = TrackHistoryStore::default();
        for i in 0..15 {
            tracks.record(4, [350.0, 400.0], i as f64 / 30.0);
        }
        assert_eq!(loitering(&[person(4)], &tracks, 5.0), 0.0);
    }

    #[test]
    fn walker_does_not_loiter_and_dilutes_share() {
        let mut tracks = TrackHistoryStore::default();
        for i in 0..=180 {
            let t = i as f64 / 30.0;
            tracks.record(1, [350.0, 400.0], t);
            tracks.record(2, [100.0 + i as f64 * 3.0, 400.0], t);
        }
        assert_eq!(loitering(&[person(1), person(2)], &tracks, 5.0), 0.5);
    }

    #[test]
    fn untracked_people_are_ignored() {
        let tracks = TrackHistoryStore::default();
        assert_eq!(loitering(&[person(-1)], &tracks, 5.0), 0.0);
        assert_eq!(loitering(&[], &tracks, 5.0), 0.0);
    }
}
