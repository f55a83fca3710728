//! Ellipse curve.

use std::f64::consts::TAU;

use pgeom_core::{Continuity, GeomError, Result, Tolerance};
use pgeom_math::{DVec3, Frame, Space};
use serde::{Deserialize, Serialize};

use super::circle::orthonormal_axes;
use super::ParametricCurve;
use crate::derivative::trig_derivative;

/// An ellipse parameterized over `[0, 2*PI)`:
///
/// `P(u) = center + major * cos(u) * x_dir + minor * sin(u) * y_dir`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Ellipse<P: Space> {
    center: P,
    x_dir: P,
    y_dir: P,
    major_radius: f64,
    minor_radius: f64,
}

fn check_radii(major: f64, minor: f64) -> Result<()> {
    if minor < 0.0 {
        return Err(GeomError::construction("Ellipse: negative minor radius"));
    }
    if major < minor {
        return Err(GeomError::construction("Ellipse: major radius below minor radius"));
    }
    Ok(())
}

impl<P: Space> Ellipse<P> {
    pub fn new(center: P, x_dir: P, y_dir: P, major_radius: f64, minor_radius: f64) -> Result<Self> {
        check_radii(major_radius, minor_radius)?;
        let (x_dir, y_dir) = orthonormal_axes(x_dir, y_dir)?;
        Ok(Self {
            center,
            x_dir,
            y_dir,
            major_radius,
            minor_radius,
        })
    }

    pub fn center(&self) -> P {
        self.center
    }

    pub fn x_dir(&self) -> P {
        self.x_dir
    }

    pub fn y_dir(&self) -> P {
        self.y_dir
    }

    pub fn major_radius(&self) -> f64 {
        self.major_radius
    }

    pub fn minor_radius(&self) -> f64 {
        self.minor_radius
    }

    pub fn set_major_radius(&mut self, major: f64) -> Result<()> {
        check_radii(major, self.minor_radius)?;
        self.major_radius = major;
        Ok(())
    }

    pub fn set_minor_radius(&mut self, minor: f64) -> Result<()> {
        check_radii(self.major_radius, minor)?;
        self.minor_radius = minor;
        Ok(())
    }

    pub fn eccentricity(&self) -> f64 {
        if self.major_radius == 0.0 {
            0.0
        } else {
            (self.major_radius.powi(2) - self.minor_radius.powi(2)).sqrt() / self.major_radius
        }
    }
}

impl Ellipse<DVec3> {
    pub fn from_frame(frame: &Frame, major_radius: f64, minor_radius: f64) -> Result<Self> {
        Self::new(frame.origin, frame.x_dir, frame.y_dir, major_radius, minor_radius)
    }
}

impl<P: Space> ParametricCurve<P> for Ellipse<P> {
    fn derivatives(&self, u: f64, order: usize) -> Result<Option<Vec<P>>> {
        let out = (0..=order)
            .map(|k| {
                let (c, s) = trig_derivative(u, k);
                let v = self.x_dir * (self.major_radius * c) + self.y_dir * (self.minor_radius * s);
                if k == 0 {
                    self.center + v
                } else {
                    v
                }
            })
            .collect();
        Ok(Some(out))
    }

    fn first_parameter(&self) -> f64 {
        0.0
    }

    fn last_parameter(&self) -> f64 {
        TAU
    }

    fn is_closed(&self) -> bool {
        true
    }

    fn is_periodic(&self) -> bool {
        true
    }

    fn continuity(&self) -> Continuity {
        Continuity::CN
    }

    fn reverse(&mut self) {
        self.y_dir = -self.y_dir;
    }

    fn reversed_parameter(&self, u: f64) -> f64 {
        TAU - u
    }

    fn transform(&mut self, t: &P::Transform) {
        self.center = P::transform_point(t, self.center);
        if let Some(x) = P::transform_vector(t, self.x_dir).try_unit(Tolerance::RESOLUTION) {
            self.x_dir = x;
        }
        if let Some(y) = P::transform_vector(t, self.y_dir).try_unit(Tolerance::RESOLUTION) {
            self.y_dir = y;
        }
        let s = P::scale_factor(t).abs();
        self.major_radius *= s;
        self.minor_radius *= s;
    }
}
