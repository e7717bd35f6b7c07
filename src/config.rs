use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;

use crate::db;
use crate::logging;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "guestlist";

pub const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub store_path: PathBuf,
    pub log_file: PathBuf,
    pub log_level: String,
    pub share_base_url: String,
    pub export: ExportConfig,
    /// Predefined groups offered by the group picker after the ones in use.
    pub groups: Vec<String>,
    pub keys: Keys,
    pub ui: UiConfig,
    pub top_bar: TopBarConfig,
    /// Problems found while reading the file that did not stop loading.
    pub warnings: Vec<String>,
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn default_groups() -> Vec<String> {
    [
        "가족", "친구", "직장", "학교", "다빈치", "YEHS", "ROTC", "롯데", "동국대", "군대", "기타",
    ]
    .iter()
    .map(|g| g.to_string())
    .collect()
}

// =============================================================================
// Export Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub csv_file_name: String,
    pub json_file_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_file_name: "wedding_contacts.csv".into(),
            json_file_name: "wedding_contacts.json".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ExportFile {
    csv_file_name: String,
    json_file_name: String,
}

impl Default for ExportFile {
    fn default() -> Self {
        let defaults = ExportConfig::default();
        Self {
            csv_file_name: defaults.csv_file_name,
            json_file_name: defaults.json_file_name,
        }
    }
}

impl From<ExportFile> for ExportConfig {
    fn from(file: ExportFile) -> Self {
        let defaults = ExportConfig::default();
        let pick = |value: String, fallback: String| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                fallback
            } else {
                trimmed.to_string()
            }
        };
        Self {
            csv_file_name: pick(file.csv_file_name, defaults.csv_file_name),
            json_file_name: pick(file.json_file_name, defaults.json_file_name),
        }
    }
}

// =============================================================================
// Top Bar Configuration
// =============================================================================

/// Actions available for top bar buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopBarAction {
    Help,
    Review,
    Results,
    Export,
    Share,
}

impl TopBarAction {
    /// Display title for the button
    pub fn title(&self) -> &'static str {
        match self {
            TopBarAction::Help => "HELP",
            TopBarAction::Review => "REVIEW",
            TopBarAction::Results => "RESULTS",
            TopBarAction::Export => "EXPORT",
            TopBarAction::Share => "SHARE",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "help" => Some(TopBarAction::Help),
            "review" => Some(TopBarAction::Review),
            "results" => Some(TopBarAction::Results),
            "export" => Some(TopBarAction::Export),
            "share" => Some(TopBarAction::Share),
            _ => None,
        }
    }
}

/// A single top bar button
#[derive(Debug, Clone)]
pub struct TopBarButton {
    pub key: String,
    pub action: TopBarAction,
}

impl TopBarButton {
    /// Get the function key number (1-12) or None if invalid
    pub fn function_key_number(&self) -> Option<u8> {
        parse_function_key(&self.key)
    }
}

fn parse_function_key(key: &str) -> Option<u8> {
    let upper = key.trim().to_ascii_uppercase();
    upper
        .strip_prefix('F')
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=12).contains(n))
}

#[derive(Debug, Clone)]
pub struct TopBarConfig {
    pub buttons: Vec<TopBarButton>,
}

impl Default for TopBarConfig {
    fn default() -> Self {
        Self {
            buttons: vec![
                TopBarButton {
                    key: "F1".into(),
                    action: TopBarAction::Help,
                },
                TopBarButton {
                    key: "F2".into(),
                    action: TopBarAction::Review,
                },
                TopBarButton {
                    key: "F3".into(),
                    action: TopBarAction::Results,
                },
                TopBarButton {
                    key: "F5".into(),
                    action: TopBarAction::Export,
                },
                TopBarButton {
                    key: "F7".into(),
                    action: TopBarAction::Share,
                },
            ],
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TopBarFile {
    #[serde(flatten)]
    buttons: HashMap<String, String>,
}

impl TopBarFile {
    fn into_config(self, warnings: &mut Vec<String>) -> TopBarConfig {
        if self.buttons.is_empty() {
            return TopBarConfig::default();
        }

        let mut buttons: Vec<TopBarButton> = Vec::new();
        for (key, action_str) in self.buttons {
            if parse_function_key(&key).is_none() {
                warnings.push(format!("invalid top_bar key '{}', expected F1-F12", key));
                continue;
            }
            let Some(action) = TopBarAction::from_str(&action_str) else {
                warnings.push(format!(
                    "invalid top_bar action '{}' for key '{}', expected one of: help, review, results, export, share",
                    action_str, key
                ));
                continue;
            };
            buttons.push(TopBarButton {
                key: key.trim().to_ascii_uppercase(),
                action,
            });
        }

        buttons.sort_by_key(|b| b.function_key_number().unwrap_or(0));

        if buttons.is_empty() {
            TopBarConfig::default()
        } else {
            TopBarConfig { buttons }
        }
    }
}

// =============================================================================
// UI Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
    pub invited: RgbColor,
    pub not_invited: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
            Hex(String),
        }

        match Helper::deserialize(deserializer)? {
            Helper::Array([r, g, b]) => Ok(RgbColor { r, g, b }),
            Helper::Map { r, g, b } => Ok(RgbColor { r, g, b }),
            Helper::Hex(hex) => parse_hex_color(&hex)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid color '{}'", hex))),
        }
    }
}

/// `#rrggbb` or `rrggbb`.
fn parse_hex_color(value: &str) -> Option<RgbColor> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(RgbColor::new(channel(0)?, channel(2)?, channel(4)?))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
    invited: RgbColor,
    not_invited: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(255, 165, 0),
            selection_bg: RgbColor::new(255, 165, 0),
            selection_fg: RgbColor::new(0, 0, 0),
            separator: RgbColor::new(255, 165, 0),
            status_fg: RgbColor::new(255, 165, 0),
            status_bg: RgbColor::new(0, 0, 0),
            invited: RgbColor::new(80, 200, 120),
            not_invited: RgbColor::new(160, 160, 160),
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        let c = file.colors;
        Self {
            colors: UiColors {
                border: c.border,
                selection_bg: c.selection_bg,
                selection_fg: c.selection_fg,
                separator: c.separator,
                status_fg: c.status_fg,
                status_bg: c.status_bg,
                invited: c.invited,
                not_invited: c.not_invited,
            },
        }
    }
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone, Default)]
pub struct Keys {
    /// Keys that work on every screen
    pub global: GlobalKeys,
    /// Keys for the one-at-a-time review card
    pub review: ReviewKeys,
    /// Keys for the filtered results list
    pub results: ResultsKeys,
    /// Keys for modal dialogs
    pub modal: ModalKeys,
    /// Keys for inline text inputs
    pub editor: EditorKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
    pub help: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReviewKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub first: Vec<String>,
    pub middle: Vec<String>,
    pub last: Vec<String>,
    pub group: Vec<String>,
    pub toggle_invited: Vec<String>,
    pub jump: Vec<String>,
    pub first_incomplete: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResultsKeys {
    pub search: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub page_down: Vec<String>,
    pub page_up: Vec<String>,
    pub tab_next: Vec<String>,
    pub tab_prev: Vec<String>,
    pub cycle_intimacy: Vec<String>,
    pub cycle_group: Vec<String>,
    pub clear: Vec<String>,
    pub open: Vec<String>,
    pub export: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ModalKeys {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub add: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EditorKeys {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
}

fn bind(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: bind(&["q"]),
            help: bind(&["F1", "?"]),
        }
    }
}

impl Default for ReviewKeys {
    fn default() -> Self {
        Self {
            next: bind(&["n", "Right"]),
            prev: bind(&["p", "Left"]),
            first: bind(&["Home"]),
            middle: bind(&["m"]),
            last: bind(&["End"]),
            group: bind(&["g"]),
            toggle_invited: bind(&["Space"]),
            jump: bind(&[":"]),
            first_incomplete: bind(&["f"]),
        }
    }
}

impl Default for ResultsKeys {
    fn default() -> Self {
        Self {
            search: bind(&["/"]),
            next: bind(&["j", "Down"]),
            prev: bind(&["k", "Up"]),
            page_down: bind(&["PageDown"]),
            page_up: bind(&["PageUp"]),
            tab_next: bind(&["Tab"]),
            tab_prev: bind(&["Backtab"]),
            cycle_intimacy: bind(&["i"]),
            cycle_group: bind(&["g"]),
            clear: bind(&["c"]),
            open: bind(&["Enter"]),
            export: bind(&["x"]),
        }
    }
}

impl Default for ModalKeys {
    fn default() -> Self {
        Self {
            cancel: bind(&["Escape", "q"]),
            confirm: bind(&["Enter"]),
            next: bind(&["j", "Down", "Tab"]),
            prev: bind(&["k", "Up", "Backtab"]),
            add: bind(&["a"]),
        }
    }
}

impl Default for EditorKeys {
    fn default() -> Self {
        Self {
            cancel: bind(&["Escape"]),
            confirm: bind(&["Enter"]),
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

impl Default for KeyBinding {
    fn default() -> Self {
        KeyBinding::Multiple(vec![])
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    review: ReviewKeysFile,
    results: ResultsKeysFile,
    modal: ModalKeysFile,
    editor: EditorKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
    help: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            help: KeyBinding::Multiple(defaults.help),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ReviewKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    first: KeyBinding,
    middle: KeyBinding,
    last: KeyBinding,
    group: KeyBinding,
    toggle_invited: KeyBinding,
    jump: KeyBinding,
    first_incomplete: KeyBinding,
}

impl Default for ReviewKeysFile {
    fn default() -> Self {
        let defaults = ReviewKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            first: KeyBinding::Multiple(defaults.first),
            middle: KeyBinding::Multiple(defaults.middle),
            last: KeyBinding::Multiple(defaults.last),
            group: KeyBinding::Multiple(defaults.group),
            toggle_invited: KeyBinding::Multiple(defaults.toggle_invited),
            jump: KeyBinding::Multiple(defaults.jump),
            first_incomplete: KeyBinding::Multiple(defaults.first_incomplete),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ResultsKeysFile {
    search: KeyBinding,
    next: KeyBinding,
    prev: KeyBinding,
    page_down: KeyBinding,
    page_up: KeyBinding,
    tab_next: KeyBinding,
    tab_prev: KeyBinding,
    cycle_intimacy: KeyBinding,
    cycle_group: KeyBinding,
    clear: KeyBinding,
    open: KeyBinding,
    export: KeyBinding,
}

impl Default for ResultsKeysFile {
    fn default() -> Self {
        let defaults = ResultsKeys::default();
        Self {
            search: KeyBinding::Multiple(defaults.search),
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            page_down: KeyBinding::Multiple(defaults.page_down),
            page_up: KeyBinding::Multiple(defaults.page_up),
            tab_next: KeyBinding::Multiple(defaults.tab_next),
            tab_prev: KeyBinding::Multiple(defaults.tab_prev),
            cycle_intimacy: KeyBinding::Multiple(defaults.cycle_intimacy),
            cycle_group: KeyBinding::Multiple(defaults.cycle_group),
            clear: KeyBinding::Multiple(defaults.clear),
            open: KeyBinding::Multiple(defaults.open),
            export: KeyBinding::Multiple(defaults.export),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ModalKeysFile {
    cancel: KeyBinding,
    confirm: KeyBinding,
    next: KeyBinding,
    prev: KeyBinding,
    add: KeyBinding,
}

impl Default for ModalKeysFile {
    fn default() -> Self {
        let defaults = ModalKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            confirm: KeyBinding::Multiple(defaults.confirm),
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            add: KeyBinding::Multiple(defaults.add),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EditorKeysFile {
    cancel: KeyBinding,
    confirm: KeyBinding,
}

impl Default for EditorKeysFile {
    fn default() -> Self {
        let defaults = EditorKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            confirm: KeyBinding::Multiple(defaults.confirm),
        }
    }
}

// =============================================================================
// Conversion from file types to runtime types
// =============================================================================

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                quit: file.global.quit.into_vec(),
                help: file.global.help.into_vec(),
            },
            review: ReviewKeys {
                next: file.review.next.into_vec(),
                prev: file.review.prev.into_vec(),
                first: file.review.first.into_vec(),
                middle: file.review.middle.into_vec(),
                last: file.review.last.into_vec(),
                group: file.review.group.into_vec(),
                toggle_invited: file.review.toggle_invited.into_vec(),
                jump: file.review.jump.into_vec(),
                first_incomplete: file.review.first_incomplete.into_vec(),
            },
            results: ResultsKeys {
                search: file.results.search.into_vec(),
                next: file.results.next.into_vec(),
                prev: file.results.prev.into_vec(),
                page_down: file.results.page_down.into_vec(),
                page_up: file.results.page_up.into_vec(),
                tab_next: file.results.tab_next.into_vec(),
                tab_prev: file.results.tab_prev.into_vec(),
                cycle_intimacy: file.results.cycle_intimacy.into_vec(),
                cycle_group: file.results.cycle_group.into_vec(),
                clear: file.results.clear.into_vec(),
                open: file.results.open.into_vec(),
                export: file.results.export.into_vec(),
            },
            modal: ModalKeys {
                cancel: file.modal.cancel.into_vec(),
                confirm: file.modal.confirm.into_vec(),
                next: file.modal.next.into_vec(),
                prev: file.modal.prev.into_vec(),
                add: file.modal.add.into_vec(),
            },
            editor: EditorKeys {
                cancel: file.editor.cancel.into_vec(),
                confirm: file.editor.confirm.into_vec(),
            },
        }
    }
}

// =============================================================================
// Key binding validation
// =============================================================================

/// Canonical form for collision detection. Single characters keep their case
/// ('M' is Shift+m); named keys are case-insensitive.
fn normalize_binding(binding: &str) -> String {
    let trimmed = binding.trim();
    if trimmed.chars().count() == 1 {
        trimmed.to_string()
    } else {
        match trimmed.to_ascii_lowercase().as_str() {
            "esc" => "escape".to_string(),
            "shift+tab" => "backtab".to_string(),
            "page_up" => "pageup".to_string(),
            "page_down" => "pagedown".to_string(),
            other => other.to_string(),
        }
    }
}

/// Check for collisions within a single context
fn check_context_collisions(bindings: &[(&str, &[String])], context_name: &str) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();

    for (action_name, keys) in bindings {
        for key in *keys {
            let normalized = normalize_binding(key);
            if normalized.is_empty() {
                continue;
            }
            if let Some(existing_action) = seen.get(&normalized) {
                bail!(
                    "key binding collision in [keys.{}]: '{}' is bound to both '{}' and '{}'",
                    context_name,
                    key,
                    existing_action,
                    action_name
                );
            }
            seen.insert(normalized, action_name);
        }
    }

    Ok(())
}

/// Validate all key bindings for collisions within each context. Digits 1-5
/// on the review screen always set intimacy, so they are reserved there.
fn validate_key_bindings(keys: &Keys) -> Result<()> {
    let global = [
        ("quit", keys.global.quit.as_slice()),
        ("help", keys.global.help.as_slice()),
    ];
    check_context_collisions(&global, "global")?;

    let intimacy = bind(&["1", "2", "3", "4", "5"]);
    let mut review = vec![
        ("set_intimacy", intimacy.as_slice()),
        ("next", keys.review.next.as_slice()),
        ("prev", keys.review.prev.as_slice()),
        ("first", keys.review.first.as_slice()),
        ("middle", keys.review.middle.as_slice()),
        ("last", keys.review.last.as_slice()),
        ("group", keys.review.group.as_slice()),
        ("toggle_invited", keys.review.toggle_invited.as_slice()),
        ("jump", keys.review.jump.as_slice()),
        ("first_incomplete", keys.review.first_incomplete.as_slice()),
    ];
    review.extend_from_slice(&global);
    check_context_collisions(&review, "review")?;

    let mut results = vec![
        ("search", keys.results.search.as_slice()),
        ("next", keys.results.next.as_slice()),
        ("prev", keys.results.prev.as_slice()),
        ("page_down", keys.results.page_down.as_slice()),
        ("page_up", keys.results.page_up.as_slice()),
        ("tab_next", keys.results.tab_next.as_slice()),
        ("tab_prev", keys.results.tab_prev.as_slice()),
        ("cycle_intimacy", keys.results.cycle_intimacy.as_slice()),
        ("cycle_group", keys.results.cycle_group.as_slice()),
        ("clear", keys.results.clear.as_slice()),
        ("open", keys.results.open.as_slice()),
        ("export", keys.results.export.as_slice()),
    ];
    results.extend_from_slice(&global);
    check_context_collisions(&results, "results")?;

    check_context_collisions(
        &[
            ("cancel", keys.modal.cancel.as_slice()),
            ("confirm", keys.modal.confirm.as_slice()),
            ("next", keys.modal.next.as_slice()),
            ("prev", keys.modal.prev.as_slice()),
            ("add", keys.modal.add.as_slice()),
        ],
        "modal",
    )?;

    check_context_collisions(
        &[
            ("cancel", keys.editor.cancel.as_slice()),
            ("confirm", keys.editor.confirm.as_slice()),
        ],
        "editor",
    )?;

    Ok(())
}

// =============================================================================
// Config file structure
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConfigFile {
    store_path: Option<PathBuf>,
    log_file: Option<PathBuf>,
    log_level: String,
    share_base_url: String,
    export: ExportFile,
    #[serde(default = "default_groups")]
    groups: Vec<String>,
    keys: KeysFile,
    ui: UiFile,
    top_bar: TopBarFile,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            store_path: None,
            log_file: None,
            log_level: "info".to_string(),
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
            export: ExportFile::default(),
            groups: default_groups(),
            keys: KeysFile::default(),
            ui: UiFile::default(),
            top_bar: TopBarFile::default(),
        }
    }
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

/// Load the configuration from `path_override` or the default location.
/// A missing file yields the defaults; a malformed one is an error.
pub fn load(path_override: Option<&Path>) -> Result<Config> {
    let path = match path_override {
        Some(path) => expand_tilde(path),
        None => config_path()?,
    };

    if !path.exists() {
        return build(ConfigFile::default(), path, Vec::new());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    parse(&raw, path)
}

/// Parse configuration text as if it had been read from `path`.
pub fn parse(raw: &str, path: PathBuf) -> Result<Config> {
    let value: toml::Value = toml::from_str(raw)
        .with_context(|| format!("failed to parse {} as TOML", path.display()))?;

    let warnings = unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", path.display()))?;

    build(cfg_file, path, warnings)
}

fn build(cfg_file: ConfigFile, path: PathBuf, mut warnings: Vec<String>) -> Result<Config> {
    let store_path = match cfg_file.store_path {
        Some(p) => expand_tilde(&p),
        None => db::default_path()?,
    };
    let log_file = match cfg_file.log_file {
        Some(p) => expand_tilde(&p),
        None => logging::default_log_path()?,
    };

    let share_base_url = match cfg_file.share_base_url.trim() {
        "" => DEFAULT_SHARE_BASE_URL.to_string(),
        url => url.trim_end_matches('/').to_string(),
    };

    let mut groups: Vec<String> = Vec::new();
    for group in cfg_file.groups {
        let group = group.trim();
        if !group.is_empty() && !groups.iter().any(|g| g == group) {
            groups.push(group.to_string());
        }
    }

    let keys: Keys = cfg_file.keys.into();
    validate_key_bindings(&keys)?;

    let top_bar = cfg_file.top_bar.into_config(&mut warnings);

    Ok(Config {
        config_path: path,
        store_path,
        log_file,
        log_level: cfg_file.log_level.trim().to_string(),
        share_base_url,
        export: cfg_file.export.into(),
        groups,
        keys,
        ui: cfg_file.ui.into(),
        top_bar,
        warnings,
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

fn unknown_keys(value: &toml::Value) -> Vec<String> {
    let mut warnings = Vec::new();
    let Some(table) = value.as_table() else {
        return warnings;
    };

    let known = HashSet::from([
        "store_path",
        "log_file",
        "log_level",
        "share_base_url",
        "export",
        "groups",
        "keys",
        "ui",
        "top_bar",
    ]);

    for key in table.keys() {
        if !known.contains(key.as_str()) {
            warnings.push(format!("unknown configuration key `{}`", key));
        }
    }

    if let Some(v) = table.get("export") {
        unknown_in_table(v, "export", &["csv_file_name", "json_file_name"], &mut warnings);
    }
    if let Some(v) = table.get("keys") {
        unknown_keys_section(v, &mut warnings);
    }
    if let Some(v) = table.get("ui") {
        unknown_in_table(v, "ui", &["colors"], &mut warnings);
        if let Some(colors) = v.get("colors") {
            unknown_in_table(
                colors,
                "ui.colors",
                &[
                    "border",
                    "selection_bg",
                    "selection_fg",
                    "separator",
                    "status_fg",
                    "status_bg",
                    "invited",
                    "not_invited",
                ],
                &mut warnings,
            );
        }
    }

    warnings
}

fn unknown_keys_section(value: &toml::Value, warnings: &mut Vec<String>) {
    let Some(table) = value.as_table() else {
        return;
    };

    let contexts: [(&str, &[&str]); 5] = [
        ("global", &["quit", "help"]),
        (
            "review",
            &[
                "next",
                "prev",
                "first",
                "middle",
                "last",
                "group",
                "toggle_invited",
                "jump",
                "first_incomplete",
            ],
        ),
        (
            "results",
            &[
                "search",
                "next",
                "prev",
                "page_down",
                "page_up",
                "tab_next",
                "tab_prev",
                "cycle_intimacy",
                "cycle_group",
                "clear",
                "open",
                "export",
            ],
        ),
        ("modal", &["cancel", "confirm", "next", "prev", "add"]),
        ("editor", &["cancel", "confirm"]),
    ];

    for key in table.keys() {
        if !contexts.iter().any(|(name, _)| *name == key.as_str()) {
            warnings.push(format!("unknown keys.* context `{}`", key));
        }
    }

    for (name, known) in contexts {
        if let Some(v) = table.get(name) {
            unknown_in_table(v, &format!("keys.{}", name), known, warnings);
        }
    }
}

fn unknown_in_table(
    value: &toml::Value,
    section: &str,
    known: &[&str],
    warnings: &mut Vec<String>,
) {
    let Some(table) = value.as_table() else {
        return;
    };
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            warnings.push(format!("unknown {} entry `{}`", section, key));
        }
    }
}
