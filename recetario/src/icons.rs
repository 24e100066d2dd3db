use strum::{EnumString, IntoStaticStr};

/// The fixed set of album icons. Albums store the key as text; anything
/// unrecognized falls back to [`AlbumIcon::Utensils`] at render time.
#[derive(Debug, EnumString, IntoStaticStr, Clone, Copy, PartialEq, Eq, Default)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum AlbumIcon {
    Abuela,
    Navidad,
    #[strum(to_string = "niños", serialize = "ninos")]
    Ninos,
    Fiesta,
    Pollo,
    #[strum(to_string = "carne", serialize = "beef")]
    Carne,
    Fish,
    #[strum(to_string = "verdura", serialize = "salad")]
    Verdura,
    Rice,
    Soup,
    Pizza,
    Pasta,
    Pan,
    Egg,
    Cake,
    Dulces,
    IceCream,
    Cookie,
    Fruta,
    Coffee,
    Leche,
    Cerveza,
    Wine,
    Croissant,
    #[default]
    Utensils,
}

/// Selector ordering for the album creation dialog.
pub const ALBUM_ICONS: &[AlbumIcon] = &[
    AlbumIcon::Abuela,
    AlbumIcon::Navidad,
    AlbumIcon::Ninos,
    AlbumIcon::Fiesta,
    AlbumIcon::Pollo,
    AlbumIcon::Carne,
    AlbumIcon::Fish,
    AlbumIcon::Verdura,
    AlbumIcon::Rice,
    AlbumIcon::Soup,
    AlbumIcon::Pizza,
    AlbumIcon::Pasta,
    AlbumIcon::Pan,
    AlbumIcon::Egg,
    AlbumIcon::Cake,
    AlbumIcon::Dulces,
    AlbumIcon::IceCream,
    AlbumIcon::Cookie,
    AlbumIcon::Fruta,
    AlbumIcon::Coffee,
    AlbumIcon::Leche,
    AlbumIcon::Cerveza,
    AlbumIcon::Wine,
    AlbumIcon::Croissant,
];

impl AlbumIcon {
    /// Parse a stored key, falling back to the default for unknown keys.
    pub fn parse(key: &str) -> Self {
        key.parse().unwrap_or_default()
    }

    pub fn key(self) -> &'static str {
        self.into()
    }

    /// Glyph rendered in the gallery and print views.
    pub fn glyph(self) -> &'static str {
        match self {
            AlbumIcon::Abuela => "📖",
            AlbumIcon::Navidad => "🎄",
            AlbumIcon::Ninos => "👶",
            AlbumIcon::Fiesta => "🎉",
            AlbumIcon::Pollo => "🍗",
            AlbumIcon::Carne => "🥩",
            AlbumIcon::Fish => "🐟",
            AlbumIcon::Verdura => "🥗",
            AlbumIcon::Rice => "🍚",
            AlbumIcon::Soup => "🍲",
            AlbumIcon::Pizza => "🍕",
            AlbumIcon::Pasta => "🍝",
            AlbumIcon::Pan => "🥖",
            AlbumIcon::Egg => "🥚",
            AlbumIcon::Cake => "🎂",
            AlbumIcon::Dulces => "🍬",
            AlbumIcon::IceCream => "🍨",
            AlbumIcon::Cookie => "🍪",
            AlbumIcon::Fruta => "🍒",
            AlbumIcon::Coffee => "☕",
            AlbumIcon::Leche => "🥛",
            AlbumIcon::Cerveza => "🍺",
            AlbumIcon::Wine => "🍷",
            AlbumIcon::Croissant => "🥐",
            AlbumIcon::Utensils => "🍴",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_round_trip() {
        for icon in ALBUM_ICONS {
            assert_eq!(AlbumIcon::parse(icon.key()), *icon);
        }
    }

    #[test]
    fn unknown_keys_fall_back_to_default() {
        assert_eq!(AlbumIcon::parse("plasma-cannon"), AlbumIcon::Utensils);
        assert_eq!(AlbumIcon::parse(""), AlbumIcon::Utensils);
    }

    #[test]
    fn legacy_aliases_still_resolve() {
        assert_eq!(AlbumIcon::parse("beef"), AlbumIcon::Carne);
        assert_eq!(AlbumIcon::parse("salad"), AlbumIcon::Verdura);
        assert_eq!(AlbumIcon::parse("CAKE"), AlbumIcon::Cake);
    }
}
