//! Spherical surface.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use pgeom_core::{Continuity, GeomError, Result};
use pgeom_math::{DVec3, Frame, Transform};
use serde::{Deserialize, Serialize};

use super::{grid, ParametricSurface};
use crate::derivative::trig_derivative;

/// A sphere parameterized by longitude `u` and latitude `v`:
///
/// `S(u, v) = O + R * cos(v) * (cos(u) * X + sin(u) * Y) + R * sin(v) * Z`
///
/// `u` in `[0, 2*PI)`, `v` in `[-PI/2, PI/2]`. The poles are degenerate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SphericalSurface {
    frame: Frame,
    radius: f64,
}

impl SphericalSurface {
    pub fn new(frame: Frame, radius: f64) -> Result<Self> {
        if radius < 0.0 {
            return Err(GeomError::construction("SphericalSurface: negative radius"));
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
            return Err(GeomError::construction("SphericalSurface: negative radius"));
        }
        self.radius = radius;
        Ok(())
    }

    pub fn area(&self) -> f64 {
        4.0 * PI * self.radius * self.radius
    }

    pub fn volume(&self) -> f64 {
        4.0 / 3.0 * PI * self.radius.powi(3)
    }

    pub(crate) fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }
}

impl ParametricSurface for SphericalSurface {
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        let f = &self.frame;
        Ok(Some(grid(nu, nv, |i, j| {
            let (cu, su) = trig_derivative(u, i);
            let (cv, sv) = trig_derivative(v, j);
            let mut d = (f.x_dir * cu + f.y_dir * su) * (self.radius * cv);
            if i == 0 {
                d += f.z_dir * (self.radius * sv);
                if j == 0 {
                    d += f.origin;
                }
            }
            d
        })))
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        (0.0, TAU, -FRAC_PI_2, FRAC_PI_2)
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
}
