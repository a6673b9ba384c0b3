use crate::detect::{ObjectDetection, WeaponDetection};

/// Highest weapon confidence this frame.
///
/// Considers explicit weapon-model detections and standard-object detections
/// whose class is in the lexical weapon set. 0.0 when neither is present.
pub fn weapon_presence(weapons: &[WeaponDetection], objects: &[ObjectDetection]) -> f64 {
    let from_weapon_model = weapons.iter().map(|w| w.confidence);
    let from_objects = objects
        .iter()
        .filter(|obj| obj.class.is_weapon())
        .map(|obj| obj.confidence);

    from_weapon_model
        .chain(from_objects)
        .filter(|c| c.is_finite())
        .fold(0.0, f64::max)
        .clamp(0.0, 1.0)
}
