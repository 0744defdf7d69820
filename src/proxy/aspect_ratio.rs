// Aspect-ratio resolution
//
// Maps an arbitrary "WxH" size string onto the small set of aspect ratios
// the upstream service actually supports.

/// Supported upstream aspect-ratio buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Square,
    Landscape4x3,
    Portrait3x4,
    Wide16x9,
    Tall9x16,
}

/// Stable evaluation order for nearest-bucket resolution. Ties keep the
/// earlier entry.
pub const ASPECT_RATIOS: [AspectRatio; 5] = [
    AspectRatio::Square,
    AspectRatio::Landscape4x3,
    AspectRatio::Portrait3x4,
    AspectRatio::Wide16x9,
    AspectRatio::Tall9x16,
];

impl AspectRatio {
    /// Wire representation expected by the upstream task-creation endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Wide16x9 => "16:9",
            AspectRatio::Tall9x16 => "9:16",
        }
    }

    /// Numeric width/height value of the bucket.
    pub fn value(&self) -> f64 {
        match self {
            AspectRatio::Square => 1.0,
            AspectRatio::Landscape4x3 => 4.0 / 3.0,
            AspectRatio::Portrait3x4 => 3.0 / 4.0,
            AspectRatio::Wide16x9 => 16.0 / 9.0,
            AspectRatio::Tall9x16 => 9.0 / 16.0,
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a `"WxH"` size string to the nearest supported aspect ratio.
///
/// Returns `None` when the string does not parse to exactly two positive
/// finite numbers.
pub fn resolve(size: &str) -> Option<AspectRatio> {
    let (w, h) = size.split_once(|c| c == 'x' || c == 'X')?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
        return None;
    }

    let ratio = w / h;
    let mut best = AspectRatio::Square;
    let mut min_diff = (ratio - best.value()).abs();
    for candidate in ASPECT_RATIOS {
        let diff = (ratio - candidate.value()).abs();
        if diff < min_diff {
            min_diff = diff;
            best = candidate;
        }
    }
    Some(best)
}
