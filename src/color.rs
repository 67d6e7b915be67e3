use glam::Vec3;

/// One stop of the elevation ramp: everything below `threshold` (normalized
/// elevation) and above the previous stop takes this color.
pub struct RampStop {
    pub threshold: f32,
    pub label: &'static str,
    pub hsl: [f32; 3],
}

/// The fixed elevation ramp, thresholds ascending, first match wins.
///
/// This table is the ground truth for any displayed legend; the classifier
/// reads the same stops, so ramp and legend cannot drift apart.
pub const RAMP: [RampStop; 9] = [
    RampStop { threshold: 0.05, label: "Deep water", hsl: [210.0, 0.65, 0.35] },
    RampStop { threshold: 0.15, label: "Wetland", hsl: [135.0, 0.45, 0.22] },
    RampStop { threshold: 0.30, label: "Lowland", hsl: [115.0, 0.50, 0.33] },
    RampStop { threshold: 0.45, label: "Plain", hsl: [95.0, 0.45, 0.48] },
    RampStop { threshold: 0.60, label: "Foothill", hsl: [70.0, 0.35, 0.42] },
    RampStop { threshold: 0.72, label: "Highland", hsl: [30.0, 0.42, 0.35] },
    RampStop { threshold: 0.85, label: "Mountain", hsl: [28.0, 0.38, 0.52] },
    RampStop { threshold: 0.95, label: "Upper slope", hsl: [35.0, 0.30, 0.72] },
    RampStop { threshold: f32::INFINITY, label: "Peak", hsl: [0.0, 0.0, 0.93] },
];

/// Mid gray returned when a grid has no elevation range at all.
const NEUTRAL_HSL: [f32; 3] = [0.0, 0.0, 0.5];

/// A resolved legend row for presentation layers.
pub struct LegendEntry {
    pub label: &'static str,
    pub upper_bound: f32,
    pub color: Vec3,
}

/// The ramp with its stops converted to RGB, in display order.
pub fn legend() -> [LegendEntry; 9] {
    RAMP.map(|stop| LegendEntry {
        label: stop.label,
        upper_bound: stop.threshold,
        color: hsl_to_rgb(stop.hsl[0], stop.hsl[1], stop.hsl[2]),
    })
}

/// Map an elevation to its ramp color, given the grid's range.
///
/// Total over `[min, max]`; out-of-range inputs clamp to the boundary stops
/// and a degenerate range (max == min) yields the neutral gray rather than
/// dividing by zero.
pub fn classify(elevation: f32, min: f32, max: f32) -> Vec3 {
    let range = max - min;
    if !(range > 0.0) {
        return hsl_to_rgb(NEUTRAL_HSL[0], NEUTRAL_HSL[1], NEUTRAL_HSL[2]);
    }

    let t = ((elevation - min) / range).clamp(0.0, 1.0);
    for stop in &RAMP {
        if t < stop.threshold {
            return hsl_to_rgb(stop.hsl[0], stop.hsl[1], stop.hsl[2]);
        }
    }

    // Unreachable: the last stop's threshold is infinite.
    hsl_to_rgb(NEUTRAL_HSL[0], NEUTRAL_HSL[1], NEUTRAL_HSL[2])
}

/// Standard HSL to RGB, components in `[0, 1]`.
pub fn hsl_to_rgb(hue_degrees: f32, saturation: f32, lightness: f32) -> Vec3 {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let hp = hue_degrees.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());

    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let m = lightness - c / 2.0;
    Vec3::new(r + m, g + m, b + m)
}
