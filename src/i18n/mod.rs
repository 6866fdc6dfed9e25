//! Internationalization (i18n) support
//!
//! UI strings ship with built-in `pt-BR` and `en` tables; YAML (or JSON)
//! files in the site's `languages/` directory override them key by key.

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BUILTIN: &[(&str, &str)] = &[
    ("pt-BR", include_str!("languages/pt-BR.yml")),
    ("en", include_str!("languages/en.yml")),
];

/// Internationalization handler
pub struct I18n {
    /// Current language
    language: String,
    /// Flattened language data: lang -> dotted key -> translation
    translations: HashMap<String, HashMap<String, String>>,
}

impl I18n {
    /// Create a handler with no translations loaded
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            translations: HashMap::new(),
        }
    }

    /// Create a handler preloaded with the built-in tables
    pub fn with_builtin(language: &str) -> Self {
        let mut i18n = Self::new(language);
        for (lang, content) in BUILTIN {
            if let Err(e) = i18n.merge_str(lang, content) {
                tracing::warn!("Invalid built-in language table {}: {}", lang, e);
            }
        }
        i18n
    }

    /// Load language files from a directory, overriding loaded keys
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let ext = path.extension().and_then(|e| e.to_str());
            if !matches!(ext, Some("yml") | Some("yaml") | Some("json")) {
                continue;
            }

            let lang = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem.to_string(),
                None => continue,
            };

            // JSON is valid YAML, one parser covers both
            let content = fs::read_to_string(&path)?;
            match self.merge_str(&lang, &content) {
                Ok(()) => tracing::debug!("Loaded language file: {:?}", path),
                Err(e) => tracing::warn!("Failed to parse language file {:?}: {}", path, e),
            }
        }

        Ok(())
    }

    fn merge_str(&mut self, lang: &str, content: &str) -> Result<()> {
        let data: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(content)?;
        let table = self.translations.entry(lang.to_string()).or_default();
        flatten_translations(&data, "", table);
        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Languages to try for a lookup: exact, base language, then English
    fn fallbacks(&self) -> Vec<&str> {
        let mut chain = vec![self.language.as_str()];
        if let Some((base, _)) = self.language.split_once('-') {
            chain.push(base);
        }
        if self.language != "en" {
            chain.push("en");
        }
        chain
    }

    /// Get a translation by key
    /// Key can be nested like "not_found.title"
    pub fn get(&self, key: &str) -> String {
        self.fallbacks()
            .into_iter()
            .filter_map(|lang| self.translations.get(lang))
            .find_map(|table| table.get(key).cloned())
            .unwrap_or_else(|| key.to_string())
    }

    /// Get a translation with `%d` replaced by `count`
    pub fn get_count(&self, key: &str, count: usize) -> String {
        self.get(key).replace("%d", &count.to_string())
    }

    /// Check if a translation exists
    pub fn has(&self, key: &str) -> bool {
        self.fallbacks()
            .into_iter()
            .filter_map(|lang| self.translations.get(lang))
            .any(|table| table.contains_key(key))
    }

    /// Get all translations for the current language as a flat HashMap
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();
        for lang in self.fallbacks() {
            if let Some(table) = self.translations.get(lang) {
                for (k, v) in table {
                    result.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }
        result
    }
}

/// Flatten translations into a HashMap with dot-notation keys
fn flatten_translations(
    data: &HashMap<String, serde_yaml::Value>,
    prefix: &str,
    result: &mut HashMap<String, String>,
) {
    for (key, value) in data {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            serde_yaml::Value::String(s) => {
                result.insert(full_key, s.clone());
            }
            serde_yaml::Value::Number(n) => {
                result.insert(full_key, n.to_string());
            }
            serde_yaml::Value::Bool(b) => {
                result.insert(full_key, b.to_string());
            }
            serde_yaml::Value::Mapping(map) => {
                let nested: HashMap<String, serde_yaml::Value> = map
                    .iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v.clone())))
                    .collect();
                flatten_translations(&nested, &full_key, result);
            }
            _ => {}
        }
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::with_builtin("pt-BR")
    }
}
