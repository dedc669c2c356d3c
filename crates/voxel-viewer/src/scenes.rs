//! Procedural demo content, built on loader threads.

use std::fmt;
use std::str::FromStr;

use glam::{Mat4, Vec3};
use voxel_engine::loader::ActorLoader;
use voxel_engine::scene::{ActorDesc, Geometry, Rgba};

const VOLUME_DIMS: [u32; 3] = [24, 24, 24];
const VOLUME_THRESHOLD: f32 = 0.05;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum SceneKind {
    #[default]
    Volume,
    Mesh,
    Mixed,
}

impl SceneKind {
    /// `1`, `2`, `3` on the keyboard.
    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            1 => Some(SceneKind::Volume),
            2 => Some(SceneKind::Mesh),
            3 => Some(SceneKind::Mixed),
            _ => None,
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SceneKind::Volume => "volume",
            SceneKind::Mesh => "mesh",
            SceneKind::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

impl FromStr for SceneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volume" => Ok(SceneKind::Volume),
            "mesh" => Ok(SceneKind::Mesh),
            "mixed" => Ok(SceneKind::Mixed),
            other => Err(format!("unknown scene `{other}` (volume|mesh|mixed)")),
        }
    }
}

/// Queues the jobs that build `kind`. Returns immediately.
pub fn load(loader: &ActorLoader, kind: SceneKind) {
    log::info!("loading {kind} scene");
    match kind {
        SceneKind::Volume => loader.spawn("density volume", || Ok(vec![density_volume()?])),
        SceneKind::Mesh => loader.spawn("spheres", || Ok(spheres())),
        SceneKind::Mixed => {
            loader.spawn("density volume", || Ok(vec![density_volume()?]));
            loader.spawn("spheres", || Ok(spheres()));
        }
    }
}

/// Gaussian blob with a brighter shell, centred on the default focus.
fn density_volume() -> anyhow::Result<ActorDesc> {
    let [nx, ny, nz] = VOLUME_DIMS;
    let mut intensities = Vec::with_capacity((nx * ny * nz) as usize);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let p = Vec3::new(
                    (x as f32 + 0.5) / nx as f32,
                    (y as f32 + 0.5) / ny as f32,
                    (z as f32 + 0.5) / nz as f32,
                ) - Vec3::splat(0.5);
                let r = p.length();
                let core = (-r * r / 0.02).exp();
                let shell = (-(r - 0.35).powi(2) / 0.002).exp() * 0.6;
                intensities.push((core + shell).min(1.0));
            }
        }
    }

    let geometry = Geometry::voxel_cubes(VOLUME_DIMS, &intensities, VOLUME_THRESHOLD)?;
    log::debug!("density volume: {} triangles", geometry.triangle_count());

    Ok(ActorDesc::dense_volume(geometry)
        .with_transform(Mat4::from_translation(Vec3::new(-0.5, -0.5, 0.0)))
        .with_color(Rgba::new(1.0, 0.75, 0.3, 0.15)))
}

fn spheres() -> Vec<ActorDesc> {
    [
        (Vec3::new(-0.3, 0.0, 0.5), Rgba::new(0.9, 0.2, 0.2, 0.45)),
        (Vec3::new(0.3, 0.0, 0.5), Rgba::new(0.2, 0.4, 0.9, 0.45)),
        (Vec3::new(0.0, 0.3, 0.3), Rgba::new(0.2, 0.9, 0.4, 0.35)),
    ]
    .into_iter()
    .map(|(center, color)| ActorDesc::mesh(Geometry::uv_sphere(center, 0.25, 32, 16)).with_color(color))
    .collect()
}
