//! WGSL sources for every pipeline.
//!
//! The lit programs share the `Scene`/`Draw` declarations, which mirror
//! [`crate::uniforms::SceneUniforms`] and [`crate::uniforms::DrawUniforms`].

macro_rules! scene_prelude {
    () => {
        r#"
struct PointLight {
    position: vec4<f32>,
    ambient: vec4<f32>,
    diffuse: vec4<f32>,
    specular: vec4<f32>,
    attenuation: vec4<f32>,
};

struct Scene {
    view_proj: mat4x4<f32>,
    view_pos: vec4<f32>,
    camera_right: vec4<f32>,
    camera_up: vec4<f32>,
    material_ambient: vec4<f32>,
    material_diffuse: vec4<f32>,
    material_specular: vec4<f32>,
    dir_direction: vec4<f32>,
    dir_ambient: vec4<f32>,
    dir_diffuse: vec4<f32>,
    dir_specular: vec4<f32>,
    point_lights: array<PointLight, 7>,
    tunnel_light: PointLight,
    time_resolution: vec4<f32>,
};

struct Draw {
    model: mat4x4<f32>,
    normal: mat4x4<f32>,
    tint: vec4<f32>,
};

@group(0) @binding(0) var<uniform> scene: Scene;
@group(0) @binding(1) var<uniform> draw: Draw;

fn attenuate(light: PointLight, distance: f32) -> f32 {
    let k = light.attenuation;
    return 1.0 / (k.x + k.y * distance + k.z * distance * distance);
}
"#
    };
}

macro_rules! lit_vertex {
    () => {
        r#"
struct LitOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
) -> LitOut {
    let world = draw.model * vec4<f32>(position, 1.0);
    var out: LitOut;
    out.clip = scene.view_proj * world;
    out.world_pos = world.xyz;
    out.normal = (draw.normal * vec4<f32>(normal, 0.0)).xyz;
    out.uv = uv;
    return out;
}
"#
    };
}

/// Phong crystal: one directional light plus the seven orb lights.
pub const CRYSTAL_SHADER: &str = concat!(
    scene_prelude!(),
    lit_vertex!(),
    r#"
fn shininess() -> f32 {
    return max(scene.material_specular.w * 128.0, 1.0);
}

fn point_contribution(light: PointLight, n: vec3<f32>, frag: vec3<f32>, view_dir: vec3<f32>) -> vec3<f32> {
    let to_light = light.position.xyz - frag;
    let distance = length(to_light);
    let l = to_light / max(distance, 0.0001);
    let diff = max(dot(n, l), 0.0);
    let spec = pow(max(dot(view_dir, reflect(-l, n)), 0.0), shininess());
    let ambient = light.ambient.rgb * scene.material_ambient.rgb;
    let diffuse = light.diffuse.rgb * diff * scene.material_diffuse.rgb;
    let specular = light.specular.rgb * spec * scene.material_specular.rgb;
    return (ambient + diffuse + specular) * attenuate(light, distance);
}

@fragment
fn fs_main(in: LitOut, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    var n = normalize(in.normal);
    n = select(-n, n, front);
    let view_dir = normalize(scene.view_pos.xyz - in.world_pos);

    let l = normalize(-scene.dir_direction.xyz);
    let diff = max(dot(n, l), 0.0);
    let spec = pow(max(dot(view_dir, reflect(-l, n)), 0.0), shininess());
    var color = scene.dir_ambient.rgb * scene.material_ambient.rgb
        + scene.dir_diffuse.rgb * diff * scene.material_diffuse.rgb
        + scene.dir_specular.rgb * spec * scene.material_specular.rgb;

    for (var i = 0u; i < 7u; i = i + 1u) {
        color += point_contribution(scene.point_lights[i], n, in.world_pos, view_dir);
    }
    return vec4<f32>(color * draw.tint.rgb, draw.tint.a);
}
"#
);

/// Tunnel walls: animated bands lit by the light carried at the camera.
///
/// Alpha comes from the tint so the layer composites additively.
pub const TUNNEL_SHADER: &str = concat!(
    scene_prelude!(),
    lit_vertex!(),
    r#"
@fragment
fn fs_main(in: LitOut) -> @location(0) vec4<f32> {
    let t = scene.time_resolution.x;
    let band = 0.5 + 0.5 * sin(in.uv.y * 60.0 - t * 1.5);
    let swirl = 0.5 + 0.5 * sin(in.uv.x * 18.849556 + in.uv.y * 25.0 + t * 0.7);
    let base = mix(vec3<f32>(0.01, 0.03, 0.08), vec3<f32>(0.06, 0.18, 0.42), band * swirl);

    let light = scene.tunnel_light;
    let n = normalize(in.normal);
    let to_light = light.position.xyz - in.world_pos;
    let distance = length(to_light);
    let diff = max(dot(n, to_light / max(distance, 0.0001)), 0.0);
    let lit = light.ambient.rgb + light.diffuse.rgb * diff * attenuate(light, distance);
    return vec4<f32>(base * lit * draw.tint.rgb, draw.tint.a);
}
"#
);

/// Glow billboards, six vertices per instance.
pub const ORB_SHADER: &str = concat!(
    scene_prelude!(),
    r#"
struct OrbOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) corner: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(
    @builtin(vertex_index) idx: u32,
    @location(0) center_size: vec4<f32>,
    @location(1) color: vec4<f32>,
) -> OrbOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[idx % 6u];
    let half_size = center_size.w * 0.5;
    let offset = scene.camera_right.xyz * corner.x + scene.camera_up.xyz * corner.y;
    let world = center_size.xyz + offset * half_size;

    var out: OrbOut;
    out.clip = scene.view_proj * vec4<f32>(world, 1.0);
    out.corner = corner;
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: OrbOut) -> @location(0) vec4<f32> {
    let d = length(in.corner);
    let glow = exp(-d * d * 4.0) * (1.0 - smoothstep(0.85, 1.0, d));
    let a = glow * in.color.a;
    return vec4<f32>(in.color.rgb * a, a);
}
"#
);

macro_rules! fullscreen_prelude {
    () => {
        r#"
struct Params {
    tint: vec4<f32>,
    // xy: 1 / size in pixels, zw: size in pixels
    texel: vec4<f32>,
};

struct FullscreenOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};
"#
    };
}

/// Layer composite and FXAA, both drawn as one fullscreen triangle.
pub const COMPOSITE_SHADER: &str = concat!(
    fullscreen_prelude!(),
    r#"
@group(0) @binding(0) var layer_tex: texture_2d<f32>;
@group(0) @binding(1) var layer_sampler: sampler;
@group(1) @binding(0) var<uniform> params: Params;

@vertex
fn vs_fullscreen(@builtin(vertex_index) idx: u32) -> FullscreenOut {
    let uv = vec2<f32>(f32((idx << 1u) & 2u), f32(idx & 2u));
    var out: FullscreenOut;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}

@fragment
fn fs_composite(in: FullscreenOut) -> @location(0) vec4<f32> {
    return textureSample(layer_tex, layer_sampler, in.uv) * params.tint;
}

fn luma(c: vec3<f32>) -> f32 {
    return dot(c, vec3<f32>(0.299, 0.587, 0.114));
}

fn tap(uv: vec2<f32>) -> vec4<f32> {
    return textureSample(layer_tex, layer_sampler, uv);
}

@fragment
fn fs_fxaa(in: FullscreenOut) -> @location(0) vec4<f32> {
    let t = params.texel.xy;
    let center = tap(in.uv);
    let nw = luma(tap(in.uv + vec2<f32>(-1.0, -1.0) * t).rgb);
    let ne = luma(tap(in.uv + vec2<f32>(1.0, -1.0) * t).rgb);
    let sw = luma(tap(in.uv + vec2<f32>(-1.0, 1.0) * t).rgb);
    let se = luma(tap(in.uv + vec2<f32>(1.0, 1.0) * t).rgb);
    let m = luma(center.rgb);
    let luma_min = min(m, min(min(nw, ne), min(sw, se)));
    let luma_max = max(m, max(max(nw, ne), max(sw, se)));

    var dir = vec2<f32>(-((nw + ne) - (sw + se)), (nw + sw) - (ne + se));
    let reduce = max((nw + ne + sw + se) * 0.03125, 1.0 / 128.0);
    let rcp = 1.0 / (min(abs(dir.x), abs(dir.y)) + reduce);
    dir = clamp(dir * rcp, vec2<f32>(-8.0), vec2<f32>(8.0)) * t;

    let a = 0.5 * (tap(in.uv + dir * (1.0 / 3.0 - 0.5)) + tap(in.uv + dir * (2.0 / 3.0 - 0.5)));
    let b = a * 0.5 + 0.25 * (tap(in.uv - dir * 0.5) + tap(in.uv + dir * 0.5));
    let lb = luma(b.rgb);
    let color = select(b, a, lb < luma_min || lb > luma_max);
    return color * params.tint;
}
"#
);

/// Pixel-space coloured quads for the date/time overlay.
pub const TEXT_SHADER: &str = concat!(
    fullscreen_prelude!(),
    r#"
@group(0) @binding(0) var<uniform> params: Params;

struct TextOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_text(@location(0) position: vec2<f32>, @location(1) color: vec4<f32>) -> TextOut {
    var out: TextOut;
    let ndc = vec2<f32>(position.x * 2.0 * params.texel.x - 1.0, 1.0 - position.y * 2.0 * params.texel.y);
    out.clip = vec4<f32>(ndc, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_text(in: TextOut) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color.rgb * in.color.a, in.color.a);
}
"#
);
