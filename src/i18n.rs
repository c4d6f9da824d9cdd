// i18n.rs
//
// Runtime string catalogs for menus, dialog placeholders, status and log text.
// Catalogs are flat JSON objects, either one file per language
// (assets/i18n/<lang>.json) or a single assets/i18n.json keyed by language.
// Lookups fall back to the Spanish catalog, then to the key itself.

use once_cell::sync::OnceCell;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const FALLBACK_LANG: &str = "es";

/// Languages offered in the Language menu: (code, native name).
pub const LANGUAGES: [(&str, &str); 2] = [("es", "Español"), ("en", "English")];

type Catalog = HashMap<String, String>;

/// Selected catalog first, fallback second.
#[derive(Debug, Default)]
struct Catalogs {
    chain: Vec<Catalog>,
}

impl Catalogs {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.chain.iter().find_map(|c| c.get(key)).map(String::as_str)
    }
}

static CATALOGS: OnceCell<RwLock<Catalogs>> = OnceCell::new();

/// Looks for `rel` under `assets/` next to the executable, then under the working dir.
fn find_asset(rel: &Path) -> Option<PathBuf> {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("assets").join(rel)));
    beside_exe
        .into_iter()
        .chain(std::iter::once(Path::new("assets").join(rel)))
        .find(|p| p.exists())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text)
        .map_err(|e| log::warn!("ignoring malformed catalog {}: {e}", path.display()))
        .ok()
}

fn load_catalog(lang: &str) -> Catalog {
    let per_lang = find_asset(&Path::new("i18n").join(format!("{lang}.json")))
        .and_then(|p| read_json::<Catalog>(&p));
    if let Some(c) = per_lang {
        return c;
    }

    let combined = find_asset(Path::new("i18n.json"))
        .and_then(|p| read_json::<HashMap<String, Catalog>>(&p))
        .and_then(|mut all| all.remove(lang));
    combined.unwrap_or_else(|| {
        log::debug!("no catalog for language {lang}");
        Catalog::new()
    })
}

/// Switches the active language. Can be called again at runtime.
pub fn init(lang: impl Into<String>) {
    let lang = lang.into();
    let mut chain = vec![load_catalog(&lang)];
    if lang != FALLBACK_LANG {
        chain.push(load_catalog(FALLBACK_LANG));
    }
    let next = Catalogs { chain };

    match CATALOGS.get() {
        Some(lock) => {
            if let Ok(mut current) = lock.write() {
                *current = next;
            }
        }
        None => {
            let _ = CATALOGS.set(RwLock::new(next));
        }
    }
}

/// Localized text for `key`, or the key itself when no catalog has it.
pub fn tr(key: &str) -> String {
    CATALOGS
        .get()
        .and_then(|lock| lock.read().ok())
        .and_then(|c| c.lookup(key).map(str::to_string))
        .unwrap_or_else(|| key.to_string())
}

/// [`tr`] with `{name}` placeholders filled in; unknown placeholders stay as written.
pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    substitute(tr(key), args)
}

fn substitute(text: String, args: &[(&str, String)]) -> String {
    args.iter()
        .fold(text, |acc, (name, value)| acc.replace(&format!("{{{name}}}"), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_substituted_and_unknown_kept() {
        let s = substitute(
            "lon: {lon}°, lat: {lat}° {other}".to_string(),
            &[("lon", "12.5".to_string()), ("lat", "-3".to_string())],
        );
        assert_eq!(s, "lon: 12.5°, lat: -3° {other}");
    }

    #[test]
    fn missing_key_falls_back_to_key() {
        assert_eq!(tr("no.such.key.anywhere"), "no.such.key.anywhere");
    }

    #[test]
    fn selected_catalog_wins_over_fallback() {
        let mut selected = Catalog::new();
        selected.insert("menu.file".into(), "File".into());
        let mut fallback = Catalog::new();
        fallback.insert("menu.file".into(), "Archivo".into());
        fallback.insert("menu.exit".into(), "Salir".into());
        let c = Catalogs {
            chain: vec![selected, fallback],
        };
        assert_eq!(c.lookup("menu.file"), Some("File"));
        assert_eq!(c.lookup("menu.exit"), Some("Salir"));
        assert_eq!(c.lookup("menu.view"), None);
    }
}
