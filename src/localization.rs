use anyhow::{Context, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use unic_langid::LanguageIdentifier;

/// Language used when the user's language is unknown or unsupported
pub const DEFAULT_LANGUAGE: &str = "ru";
/// Languages with a bundled resource
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["ru", "en"];

const RU_RESOURCE: &str = include_str!("../locales/ru/main.ftl");
const EN_RESOURCE: &str = include_str!("../locales/en/main.ftl");

/// Localization manager for the bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a manager from the resources compiled into the binary
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        for (language, source) in [("ru", RU_RESOURCE), ("en", EN_RESOURCE)] {
            bundles.insert(
                language.to_string(),
                Self::create_bundle(language, source.to_string())?,
            );
        }
        Ok(Self { bundles })
    }

    /// Create a manager from `<dir>/<lang>/main.ftl` files.
    ///
    /// Languages without a file on disk keep their bundled resource.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut manager = Self::new()?;
        for language in SUPPORTED_LANGUAGES {
            let path = dir.join(language).join("main.ftl");
            if !path.exists() {
                continue;
            }
            let source = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            manager
                .bundles
                .insert(language.to_string(), Self::create_bundle(language, source)?);
        }
        Ok(manager)
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(language: &str, source: String) -> Result<FluentBundle<FluentResource>> {
        let locale: LanguageIdentifier = language
            .parse()
            .with_context(|| format!("Invalid language identifier '{language}'"))?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Telegram renders the Unicode isolation marks as visible garbage
        bundle.set_use_isolating(false);

        let resource = match FluentResource::try_new(source) {
            Ok(resource) => resource,
            Err((resource, errors)) => {
                log::warn!("{} syntax errors in '{}' resource", errors.len(), language);
                resource
            }
        };
        if let Err(errors) = bundle.add_resource(resource) {
            log::warn!("{} duplicate messages in '{}' resource", errors.len(), language);
        }

        Ok(bundle)
    }

    pub fn has_language(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    /// Get a localized message, falling back to the default language
    pub fn get_message_in_language(
        &self,
        key: &str,
        language: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let language = if self.has_language(language) {
            language
        } else {
            DEFAULT_LANGUAGE
        };

        if let Some(message) = self.format(key, language, args) {
            return message;
        }
        if language != DEFAULT_LANGUAGE {
            if let Some(message) = self.format(key, DEFAULT_LANGUAGE, args) {
                return message;
            }
        }
        format!("Missing translation: {key}")
    }

    fn format(&self, key: &str, language: &str, args: Option<&HashMap<&str, &str>>) -> Option<String> {
        let bundle = self.bundles.get(language)?;
        let pattern = bundle.get_message(key)?.value()?;

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            fluent_args
        });

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            log::debug!("Formatting '{}' in '{}' reported {} errors", key, language, errors.len());
        }
        Some(value.into_owned())
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager
pub fn init_localization() -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_none() {
        let manager = LocalizationManager::new()?;
        let _ = LOCALIZATION_MANAGER.set(manager);
    }
    Ok(())
}

/// Get the global localization manager, initializing it from the bundled
/// resources on first use
pub fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER.get_or_init(|| {
        LocalizationManager::new().unwrap_or_else(|e| {
            log::error!("Failed to load bundled locales: {e:#}");
            LocalizationManager {
                bundles: HashMap::new(),
            }
        })
    })
}

/// Map a Telegram language code ("en", "en-US", "ru") to a supported language
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let primary = language_code
        .and_then(|code| code.split(['-', '_']).next())
        .map(str::to_lowercase);

    match primary.as_deref() {
        Some("en") => "en",
        _ => DEFAULT_LANGUAGE,
    }
}

/// Localized message in the user's language
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    get_localization_manager().get_message_in_language(key, detect_language(language_code), None)
}

/// Localized message with arguments in the user's language
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
    get_localization_manager().get_message_in_language(
        key,
        detect_language(language_code),
        Some(&args_map),
    )
}
