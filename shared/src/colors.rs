/// Stroke/fill color for parcels whose region has no assigned color.
pub const FALLBACK_REGION_COLOR: &str = "#3B82F6";

/// Fixed region palette. Region names match the backend's `region` property.
const REGION_COLORS: &[(&str, &str)] = &[
    ("Dar es Salaam", "#10B981"),
    ("Arusha", "#F59E0B"),
    ("Bagamoyo", "#8B5CF6"),
];

/// Hex color of a region, falling back to [`FALLBACK_REGION_COLOR`].
pub fn region_color_hex(region: &str) -> &'static str {
    REGION_COLORS
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, hex)| *hex)
        .unwrap_or(FALLBACK_REGION_COLOR)
}

/// Region color as `(r, g, b)`.
pub fn region_rgb(region: &str) -> (u8, u8, u8) {
    parse_hex(region_color_hex(region)).unwrap_or((0x3B, 0x82, 0xF6))
}

/// Parse `#RRGGBB` or `#RGB` (leading `#` optional).
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if !digits.is_ascii() {
        return None;
    }
    match digits.len() {
        6 => {
            let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
            let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
            let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
            Some((r, g, b))
        }
        3 => {
            let nibble = |i: usize| u8::from_str_radix(&digits[i..i + 1], 16).ok();
            let (r, g, b) = (nibble(0)?, nibble(1)?, nibble(2)?);
            Some((r * 17, g * 17, b * 17))
        }
        _ => None,
    }
}
