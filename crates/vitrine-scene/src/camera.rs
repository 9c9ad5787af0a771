//! Orbit camera state

use vitrine_core::Vec3;

/// Duration of the follow animation when the selection changes
pub const FOLLOW_DURATION_MS: u64 = 500;

/// Perspective camera orbiting a target point
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Orbit target
    pub target: Vec3,
    pub fov: f64,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f64,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 20.0, 60.0),
            target: Vec3::ZERO,
            fov: 30.0,
            auto_rotate: true,
            auto_rotate_speed: 0.3,
            min_distance: 1.0,
            max_distance: 150.0,
        }
    }
}

/// Ease of the orbit target from one point to another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTween {
    pub from: Vec3,
    pub to: Vec3,
    pub duration_ms: u64,
}

impl CameraTween {
    pub fn follow(from: Vec3, to: Vec3) -> Self {
        Self {
            from,
            to,
            duration_ms: FOLLOW_DURATION_MS,
        }
    }

    /// Target after `elapsed_ms`, linear in time
    pub fn sample(&self, elapsed_ms: u64) -> Vec3 {
        if self.duration_ms == 0 || elapsed_ms >= self.duration_ms {
            return self.to;
        }
        self.from
            .lerp(self.to, elapsed_ms as f64 / self.duration_ms as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tween_sample() {
        let tween = CameraTween::follow(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(tween.sample(0), Vec3::ZERO);
        assert!(tween.sample(250).approx_eq(Vec3::new(5.0, 0.0, 0.0), 1e-9));
        assert_eq!(tween.sample(10_000), Vec3::new(10.0, 0.0, 0.0));
    }
}
