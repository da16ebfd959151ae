use crate::text::surface::SurfaceLighting;

/// Per-corner RGB from stored light values plus surface and sector extra light.
///
/// Single intensities spread the sector's extra light through its tint; RGBI
/// values add it to each channel unweighted.
pub fn corner_colors(
    lighting: &SurfaceLighting,
    extra_light: f32,
    sector_extra: f32,
    tint: [f32; 3],
) -> Option<Vec<[f32; 3]>> {
    match lighting {
        SurfaceLighting::None => None,
        SurfaceLighting::Intensity(values) => Some(
            values
                .iter()
                .map(|&i| {
                    let base = i + extra_light;
                    [
                        base + sector_extra * tint[0],
                        base + sector_extra * tint[1],
                        base + sector_extra * tint[2],
                    ]
                })
                .collect(),
        ),
        SurfaceLighting::Rgbi(values) => Some(
            values
                .iter()
                .map(|&[_, r, g, b]| {
                    let add = extra_light + sector_extra;
                    [r + add, g + add, b + add]
                })
                .collect(),
        ),
    }
}
