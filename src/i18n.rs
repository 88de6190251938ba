use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const DEFAULT_LANGUAGE: &str = "es";
pub const LANGUAGES: &[&str] = &["es", "en"];

type Table = HashMap<&'static str, &'static str>;

const ES: &[(&str, &str)] = &[
    ("Inventory", "Inventario"),
    ("New", "+ Nuevo"),
    ("Import", "Importar"),
    ("Scan", "📷 Escanear"),
    ("Edit", "✏️ Editar"),
    ("Back", "Volver"),
    ("Save", "Guardar"),
    ("Search", "Buscar..."),
    ("No items found", "No se encontraron elementos."),
    ("Name", "Nombre"),
    ("Code", "Código"),
    ("Category", "Categoría"),
    ("Status", "Estado"),
    ("Quantity", "Cantidad"),
    ("Description", "Descripción"),
    ("Created At", "Fecha Alta"),
    ("Actions", "Acciones"),
    ("View", "Ver"),
    ("Download QR", "Descargar QR"),
    ("New Item", "Nuevo Elemento"),
    ("Edit Item", "Editar Elemento"),
    ("Import Items", "Importar Elementos"),
    ("Upload Excel", "Subir Excel"),
    ("Upload", "Subir"),
    ("Scan QR Code", "Escanear Código QR"),
    ("Detected Code", "Código detectado"),
    ("GARA Stock", "GARA Stock"),
    ("Language", "Idioma"),
    ("Dark Mode", "Modo Oscuro"),
    ("QR Code", "Código QR"),
    ("Search placeholder", "Buscar..."),
];

const EN: &[(&str, &str)] = &[
    ("Inventory", "Inventory"),
    ("New", "+ New"),
    ("Import", "Import"),
    ("Scan", "📷 Scan"),
    ("Edit", "✏️ Edit"),
    ("Back", "Back"),
    ("Save", "Save"),
    ("Search", "Search..."),
    ("No items found", "No items found."),
    ("Name", "Name"),
    ("Code", "Code"),
    ("Category", "Category"),
    ("Status", "Status"),
    ("Quantity", "Quantity"),
    ("Description", "Description"),
    ("Created At", "Created At"),
    ("Actions", "Actions"),
    ("View", "View"),
    ("Download QR", "Download QR"),
    ("New Item", "New Item"),
    ("Edit Item", "Edit Item"),
    ("Import Items", "Import Items"),
    ("Upload Excel", "Upload Excel"),
    ("Upload", "Upload"),
    ("Scan QR Code", "Scan QR Code"),
    ("Detected Code", "Detected Code"),
    ("GARA Stock", "GARA Stock"),
    ("Language", "Language"),
    ("Dark Mode", "Dark Mode"),
    ("QR Code", "QR Code"),
    ("Search placeholder", "Search..."),
];

static TRANSLATIONS: Lazy<HashMap<&'static str, Table>> = Lazy::new(|| {
    HashMap::from([
        ("es", ES.iter().copied().collect()),
        ("en", EN.iter().copied().collect()),
    ])
});

/// Two-letter language of a tag such as `es-AR`, defaulting to Spanish.
pub fn language_of(tag: Option<&str>) -> &'static str {
    let tag = tag.map(str::trim).unwrap_or_default();
    let prefix: String = tag.chars().take(2).flat_map(char::to_lowercase).collect();
    LANGUAGES
        .iter()
        .copied()
        .find(|lang| *lang == prefix)
        .unwrap_or(DEFAULT_LANGUAGE)
}

pub fn is_supported(lang: &str) -> bool {
    LANGUAGES.contains(&lang)
}

pub fn table(lang: Option<&str>) -> &'static Table {
    &TRANSLATIONS[language_of(lang)]
}

/// Translates a UI label; unknown labels come back unchanged.
pub fn translate<'a>(text: &'a str, lang: Option<&str>) -> &'a str {
    table(lang).get(text).copied().unwrap_or(text)
}
