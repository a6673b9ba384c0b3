use crate::detect::{distance, ObjectDetection, PoseDetection};

use super::ratio;

/// A bag farther than this many bag-heights from every person is unattended.
const UNATTENDED_DISTANCE: f64 = 3.0;

/// Share of bags with no person nearby.
///
/// Bags with nobody in frame are all unattended (1.0); no bags is 0.0.
pub fn unattended_object(objects: &[ObjectDetection], poses: &[PoseDetection]) -> f64 {
    let bags: Vec<&ObjectDetection> = objects
        .iter()
        .filter(|obj| obj.class.is_bag() && obj.bbox.is_valid())
        .collect();
    if bags.is_empty() {
        return 0.0;
    }

    let people: Vec<_> = poses
        .iter()
        .filter(|pose| pose.bbox.is_valid())
        .map(|pose| pose.bbox.center())
        .collect();
    if people.is_empty() {
        return 1.0;
    }

    let unattended = bags
        .iter()
        .filter(|bag| {
            let center = bag.bbox.center();
            let nearest = people
                .iter()
                .map(|person| distance(center, *person))
                .fold(f64::INFINITY, f64::min);
            nearest > bag.bbox.height() * UNATTENDED_DISTANCE
        })
        .count();

    ratio(unattended, bags.len())
}

/// People in frame relative to the calibrated crowd limit, capped at 1.0.
pub fn crowd_density(poses: &[PoseDetection], crowd_limit: usize) -> f64 {
    ratio(poses.len(), crowd_limit).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BBox;

    fn person_at(bbox: BBox) -> PoseDetection {
        PoseDetection {
            bbox,
            ..PoseDetection::default()
        }
    }

    fn backpack() -> ObjectDetection {
        ObjectDetection::new("backpack", 0.8, BBox::new(500.0, 300.0, 550.0, 350.0))
    }

    #[test]
    fn far_bag_is_unattended() {
        let poses = [person_at(BBox::new(80.0, 80.0, 180.0, 400.0))];
        assert_eq!(unattended_object(&[backpack()], &poses), 1.0);
    }

    #[test]
    fn bag_beside_owner_is_attended() {
        let poses = [person_at(BBox::new(450.0, 100.0, 550.0, 400.0))];
        assert_eq!(unattended_object(&[backpack()], &poses), 0.0);
    }

    #[test]
    fn bags_without_people_and_no_bags() {
        assert_eq!(unattended_object(&[backpack()], &[]), 1.0);
        assert_eq!(unattended_object(&[], &[]), 0.0);
    }

    #[test]
    fn density_scales_against_limit() {
        let poses = vec![PoseDetection::default(); 20];
        assert_eq!(crowd_density(&poses, 10), 1.0);
        assert_eq!(crowd_density(&poses[..5], 10), 0.5);
        assert_eq!(crowd_density(&poses, 0), 0.0);
    }
}
