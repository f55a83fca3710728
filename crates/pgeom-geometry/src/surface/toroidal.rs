//! Toroidal surface.

use std::f64::consts::{PI, TAU};

use pgeom_core::{Continuity, GeomError, Result};
use pgeom_math::{DVec3, Frame, Transform};
use serde::{Deserialize, Serialize};

use super::{grid, ParametricSurface};
use crate::derivative::trig_derivative;

/// A torus with major radius `R` around the main axis and minor radius `r`:
///
/// `S(u, v) = O + (R + r * cos(v)) * (cos(u) * X + sin(u) * Y) + r * sin(v) * Z`
///
/// Periodic in both directions over `[0, 2*PI)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToroidalSurface {
    frame: Frame,
    major_radius: f64,
    minor_radius: f64,
}

fn check(major: f64, minor: f64) -> Result<()> {
    if major < 0.0 || minor < 0.0 {
        return Err(GeomError::construction("ToroidalSurface: negative radius"));
    }
    Ok(())
}

impl ToroidalSurface {
    pub fn new(frame: Frame, major_radius: f64, minor_radius: f64) -> Result<Self> {
        check(major_radius, minor_radius)?;
        Ok(Self {
            frame,
            major_radius,
            minor_radius,
        })
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn major_radius(&self) -> f64 {
        self.major_radius
    }

    pub fn minor_radius(&self) -> f64 {
        self.minor_radius
    }

    pub fn set_major_radius(&mut self, r: f64) -> Result<()> {
        check(r, self.minor_radius)?;
        self.major_radius = r;
        Ok(())
    }

    pub fn set_minor_radius(&mut self, r: f64) -> Result<()> {
        check(self.major_radius, r)?;
        self.minor_radius = r;
        Ok(())
    }

    pub fn area(&self) -> f64 {
        4.0 * PI * PI * self.major_radius * self.minor_radius
    }

    pub fn volume(&self) -> f64 {
        2.0 * PI * PI * self.major_radius * self.minor_radius * self.minor_radius
    }
}

impl ParametricSurface for ToroidalSurface {
    fn partials(&self, u: f64, v: f64, nu: usize, nv: usize) -> Result<Option<Vec<Vec<DVec3>>>> {
        let f = &self.frame;
        let r = self.minor_radius;
        Ok(Some(grid(nu, nv, |i, j| {
            let (cu, su) = trig_derivative(u, i);
            let (cv, sv) = trig_derivative(v, j);
            let a = if j == 0 { self.major_radius + r * cv } else { r * cv };
            let mut d = (f.x_dir * cu + f.y_dir * su) * a;
            if i == 0 {
                d += f.z_dir * (r * sv);
                if j == 0 {
                    d += f.origin;
                }
            }
            d
        })))
    }

    fn bounds(&self) -> (f64, f64, f64, f64) {
        (0.0, TAU, 0.0, TAU)
    }

    fn is_u_closed(&self) -> bool {
        true
    }

    fn is_v_closed(&self) -> bool {
        true
    }

    fn is_u_periodic(&self) -> bool {
        true
    }

    fn is_v_periodic(&self) -> bool {
        true
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
        TAU - v
    }

    fn transform(&mut self, t: &Transform) {
        self.frame.transform(t);
        let s = t.scale_factor().abs();
        self.major_radius *= s;
        self.minor_radius *= s;
    }
}
