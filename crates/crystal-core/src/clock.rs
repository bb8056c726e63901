//! Per-rod transforms for the twelve crystal rods.

use glam::{Mat4, Vec3};

use crate::scene::{CLOCK_POSITION, ROD_COUNT};

/// One rod draw: model and normal matrices plus the depth-write switch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RodInstance {
    pub model: Mat4,
    pub normal: Mat4,
    pub depth_write: bool,
}

impl RodInstance {
    fn new(model: Mat4, depth_write: bool) -> Self {
        Self {
            model,
            normal: model.inverse().transpose(),
            depth_write,
        }
    }
}

/// Transforms for every rod, in draw order.
///
/// Rod 0 comes first as an extra translucent instance scaled along Y by
/// `prism_scale` (the "time left this hour" indicator), drawn without depth
/// writes, followed by the twelve regular rods.
pub fn rod_transforms(minute_rotation: f32, hour_rotation: f32, prism_scale: f32) -> Vec<RodInstance> {
    let base = Mat4::from_rotation_z(hour_rotation.to_radians())
        * Mat4::from_rotation_y((-minute_rotation).to_radians());
    let sweep = Mat4::from_rotation_y((minute_rotation * 4.0).to_radians());
    let offset = Mat4::from_translation(CLOCK_POSITION);

    let mut rods = Vec::with_capacity(ROD_COUNT + 1);
    for k in 0..ROD_COUNT {
        let angle = (-30.0 * k as f32).to_radians();
        let placed = base * Mat4::from_rotation_z(angle) * sweep * offset;
        if k == 0 {
            let scale = Mat4::from_scale(Vec3::new(1.0, prism_scale.max(0.0), 1.0));
            rods.push(RodInstance::new(placed * scale, false));
        }
        rods.push(RodInstance::new(placed, true));
    }
    rods
}
