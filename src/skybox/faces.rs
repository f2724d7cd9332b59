//! Cube faces and the camera setup for each

use crate::job::Dimensions;
use crate::textures::token_enum;

token_enum! {
    /// Skybox face, in processing order
    pub enum Face {
        Front => "ft",
        Left => "lf",
        Back => "bk",
        Up => "up",
        Right => "rt",
        Down => "dn",
    }
}

impl Face {
    /// Camera rotation in degrees (XYZ Euler)
    pub fn rotation(&self) -> [f32; 3] {
        match self {
            Face::Front => [90.0, 0.0, 90.0],
            Face::Left => [90.0, 0.0, 0.0],
            Face::Back => [90.0, 0.0, -90.0],
            Face::Up => [180.0, 0.0, 180.0],
            Face::Right => [90.0, 0.0, -180.0],
            Face::Down => [0.0, 0.0, -180.0],
        }
    }

    /// Front, left, back and right
    pub fn is_side(&self) -> bool {
        !matches!(self, Face::Up | Face::Down)
    }
}

/// Everything a renderer needs to draw one face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceView {
    pub face: Face,
    /// Degrees
    pub rotation: [f32; 3],
    pub dims: Dimensions,
    /// Vertical lens shift, as a fraction of the frame
    pub shift_y: f32,
    /// Render to a float EXR instead of an 8-bit TGA
    pub hdr: bool,
}

/// Views for all six faces in processing order.
///
/// Half-size skies render the sides at half height with the camera shifted
/// up, and always get a tiny 8x8 bottom.
pub fn face_views(size: u32, half_size: bool, no_bottom: bool, hdr: bool) -> Vec<FaceView> {
    let side_height = if half_size { size / 2 } else { size };
    let bottom = if no_bottom || half_size { 8 } else { size };

    Face::ALL
        .iter()
        .map(|&face| {
            let dims = match face {
                Face::Up => Dimensions::new(size, size),
                Face::Down => Dimensions::new(bottom, bottom),
                _ => Dimensions::new(size, side_height),
            };
            FaceView {
                face,
                rotation: face.rotation(),
                dims,
                shift_y: if half_size && face.is_side() { 0.25 } else { 0.0 },
                hdr,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_order() {
        let names: Vec<_> = Face::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["ft", "lf", "bk", "up", "rt", "dn"]);
    }

    #[test]
    fn test_full_size_views() {
        let views = face_views(1024, false, false, true);
        assert_eq!(views.len(), 6);
        assert!(views.iter().all(|v| v.dims == Dimensions::new(1024, 1024)));
        assert!(views.iter().all(|v| v.shift_y == 0.0 && v.hdr));
        assert_eq!(views[3].rotation, [180.0, 0.0, 180.0]);
    }

    #[test]
    fn test_half_size_views() {
        let views = face_views(512, true, false, false);
        let by_face = |f: Face| views.iter().find(|v| v.face == f).copied().unwrap();

        assert_eq!(by_face(Face::Front).dims, Dimensions::new(512, 256));
        assert_eq!(by_face(Face::Front).shift_y, 0.25);
        assert_eq!(by_face(Face::Up).dims, Dimensions::new(512, 512));
        assert_eq!(by_face(Face::Up).shift_y, 0.0);
        assert_eq!(by_face(Face::Down).dims, Dimensions::new(8, 8));
    }

    #[test]
    fn test_no_bottom() {
        let views = face_views(256, false, true, false);
        assert_eq!(views[5].face, Face::Down);
        assert_eq!(views[5].dims, Dimensions::new(8, 8));
        assert_eq!(views[0].dims, Dimensions::new(256, 256));
    }
}
