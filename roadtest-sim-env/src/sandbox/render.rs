//! Pinhole rendering of the sandbox world into BGRA images.
use super::{
    world::{Camera, Vehicle},
    SandboxConfig,
};
use crate::sim::RawImage;

const SKY: [u8; 4] = [235, 206, 135, 255];
const ASPHALT: [u8; 4] = [70, 70, 70, 255];
const GRASS: [u8; 4] = [34, 139, 34, 255];
const LANE: [u8; 4] = [255, 255, 255, 255];
const OBSTACLE: [u8; 4] = [30, 30, 200, 255];

/// Length of a dash of the center line and of the gap after it.
const DASH: f32 = 3.0;
const LANE_HALF_WIDTH: f32 = 0.1;

pub(super) fn render(
    config: &SandboxConfig,
    vehicle: &Vehicle,
    camera: &Camera,
    frame: u64,
) -> RawImage {
    let (w, h) = (camera.width as usize, camera.height as usize);
    let (sin, cos) = vehicle.yaw.sin_cos();
    let m = camera.mount.transform;
    let cam_x = vehicle.x + m.x * cos - m.y * sin;
    let cam_y = vehicle.y + m.x * sin + m.y * cos;
    let cam_z = m.z.max(0.1);
    let focal = (w as f32 / 2.0) / (camera.fov.to_radians() / 2.0).tan();
    let horizon = h as f32 / 2.0;
    let center = w as f32 / 2.0;

    let mut bgra = Vec::with_capacity(w * h * 4);
    for row in 0..h {
        let below = row as f32 + 0.5 - horizon;
        for col in 0..w {
            let px = if below <= 0.0 {
                SKY
            } else {
                let depth = focal * cam_z / below;
                let lateral = (col as f32 + 0.5 - center) * depth / focal;
                let x = cam_x + depth * cos - lateral * sin;
                let y = cam_y + depth * sin + lateral * cos;
                if y.abs() > config.road_half_width {
                    GRASS
                } else if y.abs() < LANE_HALF_WIDTH && (x / DASH).floor().rem_euclid(2.0) == 0.0 {
                    LANE
                } else {
                    ASPHALT
                }
            };
            bgra.extend_from_slice(&px);
        }
    }

    // Far obstacles first, so near ones cover them.
    let mut visible: Vec<(f32, f32)> = config
        .obstacles
        .iter()
        .map(|o| {
            let (dx, dy) = (o.x - cam_x, o.y - cam_y);
            (dx * cos + dy * sin, -dx * sin + dy * cos)
        })
        .filter(|(forward, _)| *forward > 0.5)
        .collect();
    visible.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    for (forward, right) in visible {
        let half = config.obstacle_radius / forward * focal;
        let col_center = center + right / forward * focal;
        let bottom = horizon + cam_z / forward * focal;
        let cols = clip(col_center - half, col_center + half, w);
        let rows = clip(bottom - 2.0 * half, bottom, h);
        for row in rows.0..rows.1 {
            for col in cols.0..cols.1 {
                let i = (row * w + col) * 4;
                bgra[i..i + 4].copy_from_slice(&OBSTACLE);
            }
        }
    }

    RawImage {
        frame,
        width: camera.width,
        height: camera.height,
        bgra,
    }
}

fn clip(lo: f32, hi: f32, n: usize) -> (usize, usize) {
    let lo = lo.max(0.0).min(n as f32) as usize;
    let hi = hi.max(0.0).min(n as f32) as usize;
    (lo, hi.max(lo))
}
