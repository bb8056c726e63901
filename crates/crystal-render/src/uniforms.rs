//! GPU uniform blocks and the mapping from named uniforms onto them.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crystal_core::scene::{CRYSTAL_MATERIAL, DIR_LIGHT, ORB_COUNT, ORB_LIGHT, PointLight, TUNNEL_LIGHT};

use crate::backend::{CameraFrame, UniformValue};

/// std140 point light. `attenuation` is (constant, linear, quadratic, 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub attenuation: [f32; 4],
}

impl From<&PointLight> for GpuPointLight {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.extend(1.0).into(),
            ambient: light.ambient.extend(0.0).into(),
            diffuse: light.diffuse.extend(0.0).into(),
            specular: light.specular.extend(0.0).into(),
            attenuation: [light.constant, light.linear, light.quadratic, 0.0],
        }
    }
}

/// Per-program state shared by every draw of a frame.
///
/// Matches `Scene` in the WGSL sources; every member is a vec4 so std140
/// and Rust layout agree without padding fields.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view_pos: [f32; 4],
    pub camera_right: [f32; 4],
    pub camera_up: [f32; 4],
    pub material_ambient: [f32; 4],
    pub material_diffuse: [f32; 4],
    /// `w` holds the shininess.
    pub material_specular: [f32; 4],
    pub dir_direction: [f32; 4],
    pub dir_ambient: [f32; 4],
    pub dir_diffuse: [f32; 4],
    pub dir_specular: [f32; 4],
    pub point_lights: [GpuPointLight; ORB_COUNT],
    pub tunnel_light: GpuPointLight,
    /// (time, width, height, 0)
    pub time_resolution: [f32; 4],
}

impl Default for SceneUniforms {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            view_pos: [0.0, 0.0, 0.0, 1.0],
            camera_right: [1.0, 0.0, 0.0, 0.0],
            camera_up: [0.0, 1.0, 0.0, 0.0],
            material_ambient: CRYSTAL_MATERIAL.ambient.extend(1.0).into(),
            material_diffuse: CRYSTAL_MATERIAL.diffuse.extend(1.0).into(),
            material_specular: CRYSTAL_MATERIAL
                .specular
                .extend(CRYSTAL_MATERIAL.shininess)
                .into(),
            dir_direction: DIR_LIGHT.direction.extend(0.0).into(),
            dir_ambient: DIR_LIGHT.ambient.extend(0.0).into(),
            dir_diffuse: DIR_LIGHT.diffuse.extend(0.0).into(),
            dir_specular: DIR_LIGHT.specular.extend(0.0).into(),
            point_lights: [GpuPointLight::from(&ORB_LIGHT); ORB_COUNT],
            tunnel_light: GpuPointLight::from(&TUNNEL_LIGHT),
            time_resolution: [0.0; 4],
        }
    }
}

impl SceneUniforms {
    pub fn set_camera(&mut self, camera: &CameraFrame) {
        self.view_proj = camera.view_proj.to_cols_array_2d();
        self.camera_right = camera.right.extend(0.0).into();
        self.camera_up = camera.up.extend(0.0).into();
    }
}

/// Per-draw block, bound with a dynamic offset.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub tint: [f32; 4],
}

impl DrawUniforms {
    pub fn new(model: Mat4, normal: Mat4, tint: Vec4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
            tint: tint.into(),
        }
    }
}

/// Fullscreen and overlay parameters, bound with a dynamic offset.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ScreenParams {
    pub tint: [f32; 4],
    /// (1/width, 1/height, width, height) of the destination.
    pub texel: [f32; 4],
}

impl ScreenParams {
    pub fn new(tint: Vec4, width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        Self {
            tint: tint.into(),
            texel: [1.0 / w, 1.0 / h, w, h],
        }
    }
}

/// Where a named uniform ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformBinding {
    /// Written into the scene block.
    Scene,
    /// A per-draw name; the draw call carries its value.
    PerDraw,
    /// Unknown name or wrong value type.
    Rejected,
}

fn set_xyz(slot: &mut [f32; 4], value: UniformValue) -> UniformBinding {
    match value {
        UniformValue::Vec3(v) => {
            slot[..3].copy_from_slice(&v.to_array());
            UniformBinding::Scene
        }
        _ => UniformBinding::Rejected,
    }
}

fn set_component(slot: &mut [f32; 4], index: usize, value: UniformValue) -> UniformBinding {
    match value {
        UniformValue::Float(f) => {
            slot[index] = f;
            UniformBinding::Scene
        }
        _ => UniformBinding::Rejected,
    }
}

fn apply_light_field(light: &mut GpuPointLight, field: &str, value: UniformValue) -> UniformBinding {
    match field {
        "position" => set_xyz(&mut light.position, value),
        "ambient" => set_xyz(&mut light.ambient, value),
        "diffuse" => set_xyz(&mut light.diffuse, value),
        "specular" => set_xyz(&mut light.specular, value),
        "constant" => set_component(&mut light.attenuation, 0, value),
        "linear" => set_component(&mut light.attenuation, 1, value),
        "quadratic" => set_component(&mut light.attenuation, 2, value),
        _ => UniformBinding::Rejected,
    }
}

/// Parse `pointLights[i].field` into `(i, field)`.
fn parse_point_light(name: &str) -> Option<(usize, &str)> {
    let rest = name.strip_prefix("pointLights[")?;
    let (index, field) = rest.split_once("].")?;
    Some((index.parse().ok()?, field))
}

/// Write the uniform `name` into `uniforms`.
pub fn apply_uniform(uniforms: &mut SceneUniforms, name: &str, value: UniformValue) -> UniformBinding {
    match name {
        "model" | "mNormal" => {
            return match value {
                UniformValue::Mat4(_) => UniformBinding::PerDraw,
                _ => UniformBinding::Rejected,
            };
        }
        "viewPos" => return set_xyz(&mut uniforms.view_pos, value),
        "time" => return set_component(&mut uniforms.time_resolution, 0, value),
        "resolution" => {
            return match value {
                UniformValue::Vec3(Vec3 { x, y, .. }) => {
                    uniforms.time_resolution[1] = x;
                    uniforms.time_resolution[2] = y;
                    UniformBinding::Scene
                }
                _ => UniformBinding::Rejected,
            };
        }
        _ => {}
    }

    if let Some(field) = name.strip_prefix("material.") {
        return match field {
            "ambient" => set_xyz(&mut uniforms.material_ambient, value),
            "diffuse" => set_xyz(&mut uniforms.material_diffuse, value),
            "specular" => set_xyz(&mut uniforms.material_specular, value),
            "shininess" => set_component(&mut uniforms.material_specular, 3, value),
            _ => UniformBinding::Rejected,
        };
    }
    if let Some(field) = name.strip_prefix("dirLight.") {
        return match field {
            "direction" => set_xyz(&mut uniforms.dir_direction, value),
            "ambient" => set_xyz(&mut uniforms.dir_ambient, value),
            "diffuse" => set_xyz(&mut uniforms.dir_diffuse, value),
            "specular" => set_xyz(&mut uniforms.dir_specular, value),
            _ => UniformBinding::Rejected,
        };
    }
    if let Some(field) = name.strip_prefix("tunlight.") {
        return apply_light_field(&mut uniforms.tunnel_light, field, value);
    }
    if let Some((index, field)) = parse_point_light(name) {
        return match uniforms.point_lights.get_mut(index) {
            Some(light) => apply_light_field(light, field, value),
            None => UniformBinding::Rejected,
        };
    }
    UniformBinding::Rejected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sizes_are_std140_multiples() {
        assert_eq!(std::mem::size_of::<GpuPointLight>(), 80);
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 144);
        assert_eq!(std::mem::size_of::<ScreenParams>(), 32);
        assert_eq!(std::mem::size_of::<SceneUniforms>() % 16, 0);
        assert_eq!(
            std::mem::size_of::<SceneUniforms>(),
            64 + 16 * 10 + 80 * ORB_COUNT + 80 + 16
        );
    }

    #[test]
    fn test_material_and_dir_light() {
        let mut u = SceneUniforms::default();
        let color = Vec3::new(0.1, 0.2, 0.3);
        assert_eq!(
            apply_uniform(&mut u, "material.diffuse", UniformValue::Vec3(color)),
            UniformBinding::Scene
        );
        assert_eq!(&u.material_diffuse[..3], &[0.1, 0.2, 0.3]);
        apply_uniform(&mut u, "material.shininess", UniformValue::Float(8.0));
        assert_eq!(u.material_specular[3], 8.0);
        apply_uniform(&mut u, "dirLight.direction", UniformValue::Vec3(Vec3::X));
        assert_eq!(&u.dir_direction[..3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_point_light_indexing() {
        let mut u = SceneUniforms::default();
        let pos = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(
            apply_uniform(&mut u, "pointLights[6].position", UniformValue::Vec3(pos)),
            UniformBinding::Scene
        );
        assert_eq!(&u.point_lights[6].position[..3], &[1.0, 2.0, 3.0]);
        apply_uniform(&mut u, "pointLights[2].quadratic", UniformValue::Float(0.5));
        assert_eq!(u.point_lights[2].attenuation[2], 0.5);
        assert_eq!(
            apply_uniform(&mut u, "pointLights[7].position", UniformValue::Vec3(pos)),
            UniformBinding::Rejected
        );
        assert_eq!(
            apply_uniform(&mut u, "pointLights[x].position", UniformValue::Vec3(pos)),
            UniformBinding::Rejected
        );
    }

    #[test]
    fn test_tunnel_light_time_and_resolution() {
        let mut u = SceneUniforms::default();
        apply_uniform(&mut u, "tunlight.position", UniformValue::Vec3(Vec3::Z * 30.0));
        assert_eq!(u.tunnel_light.position[2], 30.0);
        apply_uniform(&mut u, "time", UniformValue::Float(12.5));
        apply_uniform(&mut u, "resolution", UniformValue::Vec3(Vec3::new(800.0, 600.0, 0.0)));
        assert_eq!(u.time_resolution, [12.5, 800.0, 600.0, 0.0]);
    }

    #[test]
    fn test_per_draw_and_rejected_names() {
        let mut u = SceneUniforms::default();
        let before = u;
        assert_eq!(
            apply_uniform(&mut u, "model", UniformValue::Mat4(Mat4::IDENTITY)),
            UniformBinding::PerDraw
        );
        assert_eq!(
            apply_uniform(&mut u, "mNormal", UniformValue::Float(1.0)),
            UniformBinding::Rejected
        );
        assert_eq!(
            apply_uniform(&mut u, "normalMap", UniformValue::Int(4)),
            UniformBinding::Rejected
        );
        assert_eq!(
            apply_uniform(&mut u, "viewPos", UniformValue::Float(1.0)),
            UniformBinding::Rejected
        );
        assert_eq!(u, before);
    }

    #[test]
    fn test_screen_params_texel() {
        let p = ScreenParams::new(Vec4::ONE, 800, 0);
        assert_eq!(p.texel, [1.0 / 800.0, 1.0, 800.0, 1.0]);
    }

    #[test]
    fn test_defaults_carry_scene_lighting() {
        let u = SceneUniforms::default();
        assert_eq!(u.material_specular[3], CRYSTAL_MATERIAL.shininess);
        assert_eq!(u.point_lights[0].attenuation[..3], [1.0, 0.7, 1.8]);
        assert_eq!(u.tunnel_light.attenuation[1], 0.007);
    }
}
