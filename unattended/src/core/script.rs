//! Installer script model.
//!
//! Scripts are YAML mappings (JSON is accepted as a YAML subset). Only the
//! parts the unattended driver reasons about are modelled; everything else in
//! a script is left to the interpreter and ignored here.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

/// Marker inside a file URL meaning "the caller supplies this file locally".
pub const SENTINEL_MARKER: &str = "N/A";

/// Installer directive that asks for a menu choice.
pub const INPUT_MENU: &str = "input_menu";

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct InstallScript {
    pub name: Option<String>,
    pub runner: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    #[serde(alias = "game_slug")]
    pub slug: Option<String>,
    pub script: Option<ScriptBody>,
}

/// The `script` section: required files and the ordered installer steps.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ScriptBody {
    #[serde(default)]
    pub files: Vec<FileRequirement>,
    #[serde(default)]
    pub installer: Vec<InstallerStep>,
}

/// One `id: source` entry of `script.files`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, FileSource>")]
pub struct FileRequirement {
    pub id: String,
    pub source: FileSource,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FileSource {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        referer: Option<String>,
    },
}

/// One `directive: params` entry of `script.installer`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Value>")]
pub enum InstallerStep {
    InputMenu(InputMenu),
    Other { directive: String, params: Value },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InputMenu {
    /// Alias under which the chosen value is recorded.
    #[serde(rename = "id", default, deserialize_with = "scalar")]
    pub alias: String,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub preselect: Option<String>,
    #[serde(default)]
    pub options: Vec<MenuOption>,
}

/// One `option_id: label` entry of an input menu.
///
/// Ids and labels may be written as numbers or booleans (`- 720: low`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Mapping")]
pub struct MenuOption {
    pub id: String,
    pub label: String,
}

/// Answers an unattended run has to supply for a script, in script order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Requirements {
    pub files: Vec<FilePrompt>,
    pub menus: Vec<MenuPrompt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePrompt {
    pub id: String,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuPrompt {
    pub alias: String,
    pub description: Option<String>,
    pub options: Vec<String>,
}

impl InstallScript {
    /// Replace absent `description`/`notes` with empty strings.
    pub fn normalize(&mut self) {
        for field in [&mut self.description, &mut self.notes] {
            if field.is_none() {
                *field = Some(String::new());
            }
        }
    }

    pub fn files(&self) -> &[FileRequirement] {
        self.script
            .as_ref()
            .map(|body| body.files.as_slice())
            .unwrap_or_default()
    }

    pub fn installer(&self) -> &[InstallerStep] {
        self.script
            .as_ref()
            .map(|body| body.installer.as_slice())
            .unwrap_or_default()
    }

    /// File requirements the caller must supply locally.
    pub fn sentinel_files(&self) -> impl Iterator<Item = &FileRequirement> {
        self.files().iter().filter(|file| file.source.is_sentinel())
    }

    pub fn input_menus(&self) -> impl Iterator<Item = &InputMenu> {
        self.installer().iter().filter_map(InstallerStep::as_input_menu)
    }

    pub fn requirements(&self) -> Requirements {
        Requirements {
            files: self
                .sentinel_files()
                .map(|file| FilePrompt {
                    id: file.id.clone(),
                    prompt: file.source.prompt().map(str::to_string),
                })
                .collect(),
            menus: self
                .input_menus()
                .map(|menu| MenuPrompt {
                    alias: menu.alias.clone(),
                    description: menu.description.clone(),
                    options: menu.options.iter().map(|opt| opt.id.clone()).collect(),
                })
                .collect(),
        }
    }
}

impl FileSource {
    pub fn url(&self) -> &str {
        match self {
            FileSource::Url(url) => url,
            FileSource::Detailed { url, .. } => url,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.url().contains(SENTINEL_MARKER)
    }

    /// Prompt text following `N/A:` in a sentinel URL, if any.
    pub fn prompt(&self) -> Option<&str> {
        let url = self.url();
        let start = url.find(SENTINEL_MARKER)? + SENTINEL_MARKER.len();
        let rest = url[start..].trim_start_matches(':').trim();
        (!rest.is_empty()).then_some(rest)
    }
}

impl InstallerStep {
    pub fn directive(&self) -> &str {
        match self {
            InstallerStep::InputMenu(_) => INPUT_MENU,
            InstallerStep::Other { directive, .. } => directive,
        }
    }

    pub fn as_input_menu(&self) -> Option<&InputMenu> {
        match self {
            InstallerStep::InputMenu(menu) => Some(menu),
            InstallerStep::Other { .. } => None,
        }
    }
}

impl InputMenu {
    pub fn offers(&self, option_id: &str) -> bool {
        self.options.iter().any(|opt| opt.id == option_id)
    }
}

impl TryFrom<BTreeMap<String, FileSource>> for FileRequirement {
    type Error = String;

    fn try_from(map: BTreeMap<String, FileSource>) -> Result<Self, Self::Error> {
        let (id, source) = single_entry(map, "file")?;
        Ok(Self { id, source })
    }
}

impl TryFrom<BTreeMap<String, Value>> for InstallerStep {
    type Error = String;

    fn try_from(map: BTreeMap<String, Value>) -> Result<Self, Self::Error> {
        let (directive, params) = single_entry(map, "installer step")?;
        if directive != INPUT_MENU {
            return Ok(InstallerStep::Other { directive, params });
        }
        serde_yaml::from_value(params)
            .map(InstallerStep::InputMenu)
            .map_err(|err| format!("invalid {INPUT_MENU}: {err}"))
    }
}

impl TryFrom<Mapping> for MenuOption {
    type Error = String;

    fn try_from(map: Mapping) -> Result<Self, Self::Error> {
        let len = map.len();
        let mut entries = map.into_iter();
        let (Some((id, label)), 1) = (entries.next(), len) else {
            return Err(format!("menu option must have exactly one key, found {len}"));
        };
        let text = |value: &Value| {
            scalar_text(value)
                .ok_or_else(|| format!("menu option must be a scalar, found {value:?}"))
        };
        Ok(Self {
            id: text(&id)?,
            label: text(&label)?,
        })
    }
}

/// String form of a YAML scalar; `None` for sequences, mappings and null.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    scalar_text(&value)
        .ok_or_else(|| D::Error::custom(format!("expected a scalar, found {value:?}")))
}

fn optional_scalar<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => scalar_text(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a scalar, found {value:?}"))),
    }
}

fn single_entry<V>(map: BTreeMap<String, V>, what: &str) -> Result<(String, V), String> {
    let len = map.len();
    let mut entries = map.into_iter();
    match (entries.next(), len) {
        (Some(entry), 1) => Ok(entry),
        _ => Err(format!("{what} must have exactly one key, found {len}")),
    }
}
