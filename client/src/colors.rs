use landview_shared::colors::{parse_hex, region_rgb};

use crate::layer::ParcelStyle;

/// Format RGBA as a CSS color string.
pub fn rgba_css(r: u8, g: u8, b: u8, a: f64) -> String {
    format!("rgba({r},{g},{b},{a})")
}

/// `#RRGGBB` plus alpha as `rgba(...)`; unparseable input falls back to grey.
pub fn hex_with_alpha(hex: &str, alpha: f64) -> String {
    let (r, g, b) = parse_hex(hex).unwrap_or((128, 128, 128));
    rgba_css(r, g, b, alpha)
}

pub fn region_css(region: &str, alpha: f64) -> String {
    let (r, g, b) = region_rgb(region);
    rgba_css(r, g, b, alpha)
}

/// (fill, stroke) CSS colors for a parcel style.
pub fn style_css(style: &ParcelStyle) -> (String, String) {
    (
        hex_with_alpha(style.color, style.fill_opacity),
        hex_with_alpha(style.color, style.stroke_opacity),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::style_for;

    #[test]
    fn style_colors_carry_opacity() {
        let (fill, stroke) = style_css(&style_for("Dar es Salaam", false));
        assert_eq!(fill, "rgba(16,185,129,0.4)");
        assert_eq!(stroke, "rgba(16,185,129,0.8)");
    }

    #[test]
    fn bad_hex_is_grey() {
        assert_eq!(hex_with_alpha("nope", 1.0), "rgba(128,128,128,1)");
    }
}
