/// Linear 0..1 RGB triple used by the renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn from_u32(value: u32) -> Self {
        Self {
            r: f64::from((value >> 16) & 0xff) / 255.0,
            g: f64::from((value >> 8) & 0xff) / 255.0,
            b: f64::from(value & 0xff) / 255.0,
        }
    }

    /// Accepts `#rrggbb`, `rrggbb` and the `#rgb` shorthand.
    pub fn parse_hex(raw: &str) -> Option<Self> {
        let digits = raw.trim().trim_start_matches('#');
        let expanded;
        let digits = if digits.len() == 3 {
            expanded = digits.chars().flat_map(|ch| [ch, ch]).collect::<String>();
            expanded.as_str()
        } else {
            digits
        };
        if digits.len() != 6 {
            return None;
        }
        let bytes = hex::decode(digits).ok()?;
        Some(Self {
            r: f64::from(bytes[0]) / 255.0,
            g: f64::from(bytes[1]) / 255.0,
            b: f64::from(bytes[2]) / 255.0,
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{}", hex::encode(self.to_bytes()))
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        let channel = |value: f64| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b)]
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
        }
    }

    pub fn mix(a: Rgb, b: Rgb, t: f64) -> Self {
        Self {
            r: a.r + (b.r - a.r) * t,
            g: a.g + (b.g - a.g) * t,
            b: a.b + (b.b - a.b) * t,
        }
    }

    /// Returns `(h, s, l)` with every component in 0..1.
    pub fn to_hsl(&self) -> (f64, f64, f64) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let lightness = (min + max) / 2.0;
        if (max - min).abs() < f64::EPSILON {
            return (0.0, 0.0, lightness);
        }
        let delta = max - min;
        let saturation = if lightness <= 0.5 {
            delta / (max + min)
        } else {
            delta / (2.0 - max - min)
        };
        let hue = if max == self.r {
            (self.g - self.b) / delta + if self.g < self.b { 6.0 } else { 0.0 }
        } else if max == self.g {
            (self.b - self.r) / delta + 2.0
        } else {
            (self.r - self.g) / delta + 4.0
        };
        (hue / 6.0, saturation, lightness)
    }

    pub fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        if s == 0.0 {
            return Self { r: l, g: l, b: l };
        }
        let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let q = 2.0 * l - p;
        Self {
            r: hue_to_rgb(q, p, h + 1.0 / 3.0),
            g: hue_to_rgb(q, p, h),
            b: hue_to_rgb(q, p, h - 1.0 / 3.0),
        }
    }

    /// Hue wraps around, saturation and lightness clamp.
    pub fn offset_hsl(&self, dh: f64, ds: f64, dl: f64) -> Self {
        let (h, s, l) = self.to_hsl();
        Self::from_hsl(h + dh, s + ds, l + dl)
    }
}

fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 0.5 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * 6.0 * (2.0 / 3.0 - t);
    }
    p
}

#[cfg(test)]
mod tests {
    use super::Rgb;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(Rgb::parse_hex("#ff0000"), Some(Rgb::from_u32(0xff0000)));
        assert_eq!(Rgb::parse_hex("0f0"), Some(Rgb::from_u32(0x00ff00)));
        assert_eq!(Rgb::parse_hex("#12345"), None);
        assert_eq!(Rgb::parse_hex("#zzzzzz"), None);
        assert_eq!(Rgb::from_u32(0x00aaff).to_hex(), "#00aaff");
    }

    #[test]
    fn hsl_round_trips_primary_colors() {
        for value in [0xff0000, 0x00ff00, 0x0000ff, 0x336699, 0x808080] {
            let color = Rgb::from_u32(value);
            let (h, s, l) = color.to_hsl();
            assert_eq!(Rgb::from_hsl(h, s, l).to_bytes(), color.to_bytes());
        }
    }

    #[test]
    fn offset_hsl_shifts_red_toward_light_orange() {
        let shifted = Rgb::from_u32(0xff0000).offset_hsl(0.1, 0.2, 0.3);
        let (h, s, l) = shifted.to_hsl();
        assert!((h - 0.1).abs() < 1e-9);
        assert!((s - 1.0).abs() < 1e-9);
        assert!((l - 0.8).abs() < 1e-9);
    }
}
