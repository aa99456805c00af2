//! Plain-text camera state files.
//!
//! A camera file holds three 3-vectors in order: eye, look-at center, up.
//! Numbers are separated by whitespace; `(`, `)` and `,` are accepted as
//! separators too, so `(0, 2, 10)` and `0 2 10` read the same.

use std::path::Path;

use frost_math::{Camera, Vec3};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid number '{0}' in camera file")]
    InvalidNumber(String),

    #[error("camera file needs 9 numbers (eye, center, up), found {0}")]
    WrongCount(usize),
}

/// Eye, target and up vector read from a camera file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub eye: Vec3,
    pub center: Vec3,
    pub up: Vec3,
}

impl CameraPose {
    pub fn from_camera(camera: &Camera) -> Self {
        Self {
            eye: camera.eye,
            center: camera.center,
            up: camera.up,
        }
    }

    /// Point `camera` along this pose.
    pub fn apply(&self, camera: &mut Camera) {
        camera.look_at(self.eye, self.center, self.up);
    }
}

pub fn parse_camera(text: &str) -> Result<CameraPose, CameraFileError> {
    let numbers = text
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | ','))
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|_| CameraFileError::InvalidNumber(token.to_string()))
        })
        .collect::<Result<Vec<f32>, _>>()?;

    if numbers.len() != 9 {
        return Err(CameraFileError::WrongCount(numbers.len()));
    }

    Ok(CameraPose {
        eye: Vec3::from_slice(&numbers[0..3]),
        center: Vec3::from_slice(&numbers[3..6]),
        up: Vec3::from_slice(&numbers[6..9]),
    })
}

pub fn read_camera_file(path: impl AsRef<Path>) -> Result<CameraPose, CameraFileError> {
    let text = std::fs::read_to_string(path)?;
    parse_camera(&text)
}

pub fn write_camera_file(path: impl AsRef<Path>, camera: &Camera) -> Result<(), CameraFileError> {
    let pose = CameraPose::from_camera(camera);
    let line = |v: Vec3| format!("{} {} {}", v.x, v.y, v.z);
    let text = format!("{}\n{}\n{}\n", line(pose.eye), line(pose.center), line(pose.up));
    std::fs::write(path, text)?;
    Ok(())
}
