//! Cylindrical surface.

use std::f64::consts::TAU;

use pgeom_core::{Continuity, GeomError, Result};
use pgeom_math::{DVec3, Frame, Transform};
use serde::{Deserialize, Serialize};

use super::{grid, ParametricSurface};
use crate::derivative::trig_derivative;

/// A right circular cylinder around the frame's main axis:
///
/// `S(u, v) = O + R * (cos(u) * X + sin(u) * Y) + v * Z`
///
/// Periodic in u over `[0, 2*PI)`, infinite in v.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CylindricalSurface {
    frame: Frame,
    radius: f64,
}

impl CylindricalSurface {
    pub fn new(frame: Frame, radius: f64) -> Result<Self> {
        if radius < 0.0 {
            return Err(GeomError::construction("CylindricalSurface: negative radius"));
        }
        Ok(Self { frame, radius })
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: f64) -> Result<()> {
        if radius < 0.0 {
            return Err(GeomError::construction("CylindricalSurface: negative radius"));
        }
        self.radius = radius;
        Ok(())
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }
}

impl ParametricSurface for CylindricalSurface {
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        let f = &self.frame;
        Ok(Some(grid(nu, nv, |i, j| {
            let (c, s) = trig_derivative(u, i);
            let radial = (f.x_dir * c + f.y_dir * s) * self.radius;
            match (i, j) {
                (0, 0) => f.origin + radial + f.z_dir * v,
                (0, 1) => f.z_dir,
                (_, 0) => radial,
                _ => DVec3::ZERO,
            }
        })))
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        (0.0, TAU, f64::NEG_INFINITY, f64::INFINITY)
    }

    fn is_u_closed(&self) -> bool {
        true
    }

    fn is_v_closed(&self) -> bool {
        false
    }

    fn is_u_periodic(&self) -> bool {
        true
    }

    fn is_v_periodic(&self) -> bool {
        false
    }

    fn continuity(&self) -> Continuity {
        Continuity::CN
    }

    fn u_reverse(&mut self) {
        self.frame.reverse_y();
    }

    fn v_reverse(&mut self) {
        self.frame.reverse_z();
    }

    fn u_reversed_parameter(&self, u: f64) -> f64 {
        TAU - u
    }

    fn v_reversed_parameter(&self, v: f64) -> f64 {
        -v
    }

    fn transform(&mut self, t: &Transform) {
        self.frame.transform(t);
        self.radius *= t.scale_factor().abs();
    }

    fn transform_parameters(&self, u: f64, v: f64, t: &Transform) -> (f64, f64) {
        (u, v * t.scale_factor().abs())
    }
}
