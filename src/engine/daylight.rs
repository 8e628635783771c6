// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! CIE Standard Sky luminance models and the daylight factor they drive.
//!
//! A point's daylight factor is the sum of its sky component (direct
//! light through each window), externally reflected component (light off
//! outdoor obstructions, approximated as a fraction of the sky
//! component), and internally reflected component (light bouncing
//! between room surfaces). EN 17037 considers 2% DF a typical minimum for
//! a well-daylit point.

use crate::geometry::Vector3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkyType {
    /// CIE Standard Overcast Sky: luminance depends only on altitude.
    Overcast,
    /// CIE Clear Sky: luminance also depends on angular distance from the sun.
    Clear,
}

#[derive(Clone, Copy, Debug)]
pub struct SkyModel {
    pub sky_type: SkyType,
    pub zenith_luminance_cd_m2: f64,
    pub sun_altitude_deg: f64,
    pub sun_azimuth_deg: f64,
}

impl SkyModel {
    pub fn overcast(zenith_luminance_cd_m2: f64) -> Self {
        Self {
            sky_type: SkyType::Overcast,
            zenith_luminance_cd_m2,
            sun_altitude_deg: 45.0,
            sun_azimuth_deg: 180.0,
        }
    }

    /// Sky luminance (cd/m^2) in the direction `(altitude_deg, azimuth_deg)`.
    pub fn luminance(&self, altitude_deg: f64, azimuth_deg: f64) -> f64 {
        match self.sky_type {
            SkyType::Overcast => cie_overcast_sky(altitude_deg, self.zenith_luminance_cd_m2),
            SkyType::Clear => cie_clear_sky(
                altitude_deg,
                azimuth_deg,
                self.sun_altitude_deg,
                self.sun_azimuth_deg,
                self.zenith_luminance_cd_m2,
            ),
        }
    }
}

/// CIE Standard Overcast Sky: `L = Lz * (1 + 2 sin(gamma)) / 3`, where
/// `gamma` is the altitude above the horizon. Luminance triples from
/// horizon to zenith regardless of azimuth.
pub fn cie_overcast_sky(altitude_deg: f64, zenith_luminance_cd_m2: f64) -> f64 {
    let gamma = altitude_deg.max(0.0).to_radians();
    zenith_luminance_cd_m2 * (1.0 + 2.0 * gamma.sin()) / 3.0
}

/// CIE Clear Sky (simplified gradation/scattering indicatrix), grading
/// luminance by angular distance `zeta` from the sun.
pub fn cie_clear_sky(altitude_deg: f64, azimuth_deg: f64, sun_altitude_deg: f64, sun_azimuth_deg: f64, zenith_luminance_cd_m2: f64) -> f64 {
    let gamma = altitude_deg.max(0.0).to_radians();
    let mut chi = (azimuth_deg - sun_azimuth_deg).abs();
    if chi > 180.0 {
        chi = 360.0 - chi;
    }
    let sun_gamma = sun_altitude_deg.to_radians();
    let cos_zeta = (gamma.sin() * sun_gamma.sin() + gamma.cos() * sun_gamma.cos() * chi.to_radians().cos()).clamp(-1.0, 1.0);
    let zeta = cos_zeta.acos();

    let phi = 1.0 + cos_zeta * cos_zeta;
    let f_gamma = 0.91 + 10.0 * (-3.0 * zeta).exp() + 0.45 * cos_zeta * cos_zeta;
    zenith_luminance_cd_m2 * f_gamma * phi / 10.0
}

/// Standard outdoor illuminance (lux) conventionally paired with a sky
/// type when converting daylight factor to absolute indoor illuminance.
pub fn standard_outdoor_illuminance_lux(sky_type: SkyType) -> f64 {
    match sky_type {
        SkyType::Overcast => 10_000.0,
        SkyType::Clear => 50_000.0,
    }
}

/// A glazed opening through which a daylight point receives sky light.
#[derive(Clone, Copy, Debug)]
pub struct Window {
    pub center: Vector3,
    pub width: f64,
    pub height: f64,
    /// Points from the window surface back into the room interior; a
    /// point sees sky through the window only when the direction toward
    /// the window has a negative dot product with this normal (unit
    /// length not required, normalized on use).
    pub normal: Vector3,
    pub transmittance: f64,
    /// Fraction of the opening that is glazed rather than frame.
    pub frame_factor: f64,
}

impl Window {
    pub fn glazed_area(&self) -> f64 {
        self.width * self.height * self.frame_factor
    }
}

fn solid_angle_to_window(point: Vector3, window: &Window) -> f64 {
    let to_window = window.center - point;
    let dist = to_window.length();
    if dist < 0.1 {
        return 0.0;
    }
    let cos_theta = to_window.normalize().dot(window.normal.normalize()).abs();
    window.glazed_area() * cos_theta / (dist * dist)
}

/// Sky component of the daylight factor (percent) at `point` through a
/// single `window`. Zero if the point cannot see through the window
/// (window facing away) or the window is essentially at the point.
fn sky_component_percent(point: Vector3, window: &Window, sky: &SkyModel) -> f64 {
    let to_window = window.center - point;
    let dist = to_window.length();
    if dist < 0.1 {
        return 0.0;
    }
    let direction = to_window / dist;
    let normal = window.normal.normalize();
    if direction.dot(normal) >= 0.0 {
        return 0.0;
    }

    let altitude = direction.z.clamp(-1.0, 1.0).asin().to_degrees();
    let l_sky = sky.luminance(altitude, 0.0);
    let omega = solid_angle_to_window(point, window);
    let sc = (l_sky * omega * window.transmittance) / (std::f64::consts::PI * 10_000.0);
    (sc * 100.0).max(0.0)
}

/// Internally reflected component of the daylight factor (percent), from
/// inter-reflection between room surfaces. `avg_reflectance` is the
/// area-weighted average of floor/wall/ceiling reflectance.
pub fn internal_reflected_component_percent(total_glazed_area: f64, floor_area: f64, avg_reflectance: f64) -> f64 {
    if total_glazed_area <= 0.0 || floor_area <= 0.0 {
        return 0.0;
    }
    let rho = avg_reflectance.clamp(0.0, 0.99);
    let irc = 0.85 * total_glazed_area * rho / (floor_area * (1.0 - rho * rho));
    irc.max(0.0) * 100.0
}

#[derive(Clone, Copy, Debug)]
pub struct DaylightFactorResult {
    pub daylight_factor_percent: f64,
    pub sky_component_percent: f64,
    pub externally_reflected_percent: f64,
    pub internally_reflected_percent: f64,
    pub illuminance_lux: f64,
}

impl DaylightFactorResult {
    /// EN 17037's commonly cited minimum median daylight factor.
    pub fn meets_en17037(&self, target_df_percent: f64) -> bool {
        self.daylight_factor_percent >= target_df_percent
    }
}

/// Daylight factor at `point` given the room's windows, the externally
/// reflected component approximated as 10% of the sky component.
pub fn calculate_daylight_factor(
    point: Vector3,
    windows: &[Window],
    floor_area: f64,
    avg_reflectance: f64,
    sky: &SkyModel,
) -> DaylightFactorResult {
    let sc: f64 = windows.iter().map(|w| sky_component_percent(point, w, sky)).sum();
    let erc = sc * 0.1;
    let total_glazed: f64 = windows.iter().map(Window::glazed_area).sum();
    let irc = internal_reflected_component_percent(total_glazed, floor_area, avg_reflectance);
    let df = sc + erc + irc;

    let outdoor = standard_outdoor_illuminance_lux(sky.sky_type);
    DaylightFactorResult {
        daylight_factor_percent: df,
        sky_component_percent: sc,
        externally_reflected_percent: erc,
        internally_reflected_percent: irc,
        illuminance_lux: df * outdoor / 100.0,
    }
}
