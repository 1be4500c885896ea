// Curlflow - GPU Curl-Noise Dye Advection
// Copyright (c) 2025 Filipe da Veiga Ventura Alves
// Licensed under MIT License

//! Pointer and window-size mapping between the presentation surface and the
//! square compute field.

/// Surface size for a window of `logical` size at `scale_factor` device pixels
/// per logical pixel, floored to whole pixels.
pub fn surface_size(logical: (f64, f64), scale_factor: f64) -> [u32; 2] {
    // The logical size usually came from a physical size divided by the same
    // factor; the epsilon keeps that round trip from losing a pixel.
    let device_px = |v: f64| ((v * scale_factor) + 1e-6).floor().max(0.0) as u32;
    [device_px(logical.0), device_px(logical.1)]
}

/// New surface size when the live window size disagrees with the configured
/// one. Zero-sized (minimised) windows never trigger a reconfigure.
pub fn reconcile(configured: [u32; 2], live: [u32; 2]) -> Option<[u32; 2]> {
    if live[0] == 0 || live[1] == 0 || live == configured {
        None
    } else {
        Some(live)
    }
}

/// Scale the upscale kernel applies to fit the field onto the surface.
pub fn field_scale(surface: [f32; 2], field: [f32; 2]) -> f32 {
    (surface[0] / field[0]).max(surface[1] / field[1])
}

/// Map a click in surface pixels to normalized field coordinates, snapped to
/// the texel grid. Clicks outside the visible scaled field are dropped.
pub fn normalize_click(click: [f32; 2], surface: [f32; 2], field: [f32; 2]) -> Option<[f32; 2]> {
    let scale = field_scale(surface, field);
    let scaled_w = field[0] * scale;
    let scaled_h = field[1] * scale;

    let [x, y] = click;
    if x < 0.0 || y < 0.0 || x >= scaled_w || y >= scaled_h {
        log::trace!("click {click:?} outside visible field");
        return None;
    }

    let texel_x = (x / scaled_w * field[0]).floor();
    let texel_y = (y / scaled_h * field[1]).floor();
    Some([texel_x / field[0], texel_y / field[1]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_size_floors_device_pixels() {
        assert_eq!(surface_size((800.0, 600.0), 1.0), [800, 600]);
        assert_eq!(surface_size((800.0, 600.0), 1.25), [1000, 750]);
        assert_eq!(surface_size((333.0, 101.0), 1.5), [499, 151]);
        assert_eq!(surface_size((1000.0 / 1.5, 700.0 / 1.5), 1.5), [1000, 700]);
    }

    #[test]
    fn reconcile_only_on_real_changes() {
        assert_eq!(reconcile([800, 600], [800, 600]), None);
        assert_eq!(reconcile([800, 600], [1024, 600]), Some([1024, 600]));
        assert_eq!(reconcile([800, 600], [0, 600]), None);
    }

    #[test]
    fn scale_covers_the_larger_ratio() {
        assert_eq!(field_scale([1024.0, 512.0], [512.0, 512.0]), 2.0);
        assert_eq!(field_scale([256.0, 768.0], [512.0, 512.0]), 1.5);
    }

    #[test]
    fn click_maps_to_texel_corner() {
        // 1024x512 surface over a 512 field: scale 2, visible field is 1024x1024.
        let n = normalize_click([512.0, 256.0], [1024.0, 512.0], [512.0, 512.0]).unwrap();
        assert_eq!(n, [0.5, 0.25]);

        // 3 surface pixels is texel 1 at scale 2.
        let n = normalize_click([3.0, 0.0], [1024.0, 512.0], [512.0, 512.0]).unwrap();
        assert_eq!(n, [1.0 / 512.0, 0.0]);
    }

    #[test]
    fn clicks_past_the_scaled_field_are_dropped() {
        // Scale 1.5 on a 64 field: visible area is 96x96.
        let surface = [96.0, 40.0];
        let field = [64.0, 64.0];
        assert!(normalize_click([95.9, 10.0], surface, field).is_some());
        assert!(normalize_click([96.0, 10.0], surface, field).is_none());
        assert!(normalize_click([10.0, 96.0], surface, field).is_none());
        assert!(normalize_click([-1.0, 10.0], surface, field).is_none());
    }
}
