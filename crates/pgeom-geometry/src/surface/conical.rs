//! Conical surface.

use std::f64::consts::{FRAC_PI_2, TAU};

use pgeom_core::{Continuity, GeomError, Result, Tolerance};
use pgeom_math::{DVec3, Frame, Point3, Transform};
use serde::{Deserialize, Serialize};

use super::{grid, ParametricSurface};
use crate::derivative::trig_derivative;

/// A right circular cone with reference radius `R` at `v = 0` and
/// semi-angle `alpha`:
///
/// `S(u, v) = O + (R + v * sin(alpha)) * (cos(u) * X + sin(u) * Y) + v * cos(alpha) * Z`
///
/// The parameter v is the distance along a generatrix. The apex sits at
/// `v = -R / sin(alpha)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConicalSurface {
    frame: Frame,
    radius: f64,
    semi_angle: f64,
}

fn check(radius: f64, semi_angle: f64) -> Result<()> {
    if radius < 0.0 {
        return Err(GeomError::construction("ConicalSurface: negative reference radius"));
    }
    let a = semi_angle.abs();
    if a <= Tolerance::ANGULAR || a >= FRAC_PI_2 - Tolerance::ANGULAR {
        return Err(GeomError::construction("ConicalSurface: semi-angle out of (0, PI/2)"));
    }
    Ok(())
}

impl ConicalSurface {
    pub fn new(frame: Frame, semi_angle: f64, radius: f64) -> Result<Self> {
        check(radius, semi_angle)?;
        Ok(Self {
            frame,
            radius,
            semi_angle,
        })
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn ref_radius(&self) -> f64 {
        self.radius
    }

    pub fn semi_angle(&self) -> f64 {
        self.semi_angle
    }

    pub fn set_ref_radius(&mut self, radius: f64) -> Result<()> {
        check(radius, self.semi_angle)?;
        self.radius = radius;
        Ok(())
    }

    pub fn set_semi_angle(&mut self, semi_angle: f64) -> Result<()> {
        check(self.radius, semi_angle)?;
        self.semi_angle = semi_angle;
        Ok(())
    }

    pub fn apex(&self) -> Point3 {
        let v = -self.radius / self.semi_angle.sin();
        self.frame.origin + self.frame.z_dir * (v * self.semi_angle.cos())
    }
}

impl ParametricSurface for ConicalSurface {
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        let f = &self.frame;
        let (sa, ca) = self.semi_angle.sin_cos();
        Ok(Some(grid(nu, nv, |i, j| {
            let (c, s) = trig_derivative(u, i);
            let dir = f.x_dir * c + f.y_dir * s;
            let r = match j {
                0 => self.radius + v * sa,
                1 => sa,
                _ => 0.0,
            };
            let mut d = dir * r;
            if i == 0 {
                match j {
                    0 => d += f.origin + f.z_dir * (v * ca),
                    1 => d += f.z_dir * ca,
                    _ => {}
                }
            }
            d
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
        self.semi_angle = -self.semi_angle;
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
