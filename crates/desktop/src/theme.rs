use iced::color;
use iced::theme::Palette;
use iced::Theme;

use crate::settings::Appearance;

/// Resolve the iced Theme from the appearance settings.
pub fn resolve_theme(appearance: Appearance, high_contrast: bool) -> Theme {
    let dark = match appearance {
        Appearance::Dark => true,
        Appearance::Light => false,
        Appearance::System => detect_system_dark_mode(),
    };

    let palette = if dark { dark_palette() } else { light_palette() };
    let palette = if high_contrast {
        with_high_contrast(palette, dark)
    } else {
        palette
    };

    Theme::custom("FaceGate", palette)
}

fn dark_palette() -> Palette {
    Palette {
        background: color!(0x18, 0x1a, 0x1f),
        text: color!(0xd8, 0xdb, 0xe2),
        primary: color!(0x3d, 0x8b, 0xfd),
        success: color!(0x2e, 0xc2, 0x7e),
        warning: color!(0xf5, 0xb7, 0x00),
        danger: color!(0xf0, 0x4a, 0x4a),
    }
}

fn light_palette() -> Palette {
    Palette {
        background: color!(0xf7, 0xf8, 0xfa),
        text: color!(0x1b, 0x1e, 0x24),
        primary: color!(0x1f, 0x6f, 0xeb),
        success: color!(0x1a, 0x9c, 0x5b),
        warning: color!(0xd9, 0x8a, 0x00),
        danger: color!(0xd6, 0x33, 0x33),
    }
}

/// Pure black or white background and text; accents unchanged.
fn with_high_contrast(palette: Palette, dark: bool) -> Palette {
    let (background, text) = if dark {
        (color!(0x00, 0x00, 0x00), color!(0xff, 0xff, 0xff))
    } else {
        (color!(0xff, 0xff, 0xff), color!(0x00, 0x00, 0x00))
    };
    Palette {
        background,
        text,
        ..palette
    }
}

fn detect_system_dark_mode() -> bool {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("defaults")
            .args(["read", "-g", "AppleInterfaceStyle"])
            .output()
            .map(|o| {
                String::from_utf8_lossy(&o.stdout)
                    .trim()
                    .eq_ignore_ascii_case("dark")
            })
            .unwrap_or(true)
    }
    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}
