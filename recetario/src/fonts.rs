use strum::{EnumString, IntoStaticStr};

/// Display fonts a recipe can be rendered in. Purely cosmetic: the stored
/// content never depends on the chosen font.
#[derive(Debug, EnumString, IntoStaticStr, Clone, Copy, PartialEq, Eq, Default)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum RecipeFont {
    Great,
    Allura,
    Courgette,
    #[default]
    Rotulador,
    Divertida,
    Libro,
}

pub const FONTS: &[RecipeFont] = &[
    RecipeFont::Great,
    RecipeFont::Allura,
    RecipeFont::Courgette,
    RecipeFont::Rotulador,
    RecipeFont::Divertida,
    RecipeFont::Libro,
];

impl RecipeFont {
    /// Parse a stored key, falling back to the default for unknown keys.
    pub fn parse(key: &str) -> Self {
        // Older rows stored the CSS class rather than the bare key.
        key.strip_prefix("font-")
            .unwrap_or(key)
            .parse()
            .unwrap_or_default()
    }

    pub fn key(self) -> &'static str {
        self.into()
    }

    pub fn css_class(self) -> String {
        format!("font-{}", self.key())
    }

    /// Label shown in the font picker.
    pub fn label(self) -> &'static str {
        match self {
            RecipeFont::Great => "Muy Elegante",
            RecipeFont::Allura => "Letra Fluida",
            RecipeFont::Courgette => "Gourmet",
            RecipeFont::Rotulador => "Rotulador",
            RecipeFont::Divertida => "Divertida",
            RecipeFont::Libro => "Libro de Cocina",
        }
    }
}
