//! Runtime options built from resolved classes.
//!
//! One concrete [`PromptOptions`] struct serves every class. The root of a
//! class's `_extends` chain picks an [`OptionsVariant`], and each variant
//! contributes one computation on top of the shared defaults:
//!
//! | Variant    | Adds                                                    |
//! |------------|---------------------------------------------------------|
//! | `Default`  | nothing                                                 |
//! | `Periodic` | date format from the period lookup, date-based titles   |
//! | `Chat`     | model-call default values and prompt template paths     |

use super::resolver::ResolvedTypeConfig;
use super::string_set::StringSet;
use super::types::{AppConfig, DEFAULT_IGNORE_FIELDS, progress_view};
use crate::collab::{
    ChronoDateFormatter, DateFormatter, FileSystem, PeriodFormatLookup, StaticPeriodFormats,
};
use crate::error::{EngineError, EngineResult};
use crate::logging::{DiagnosticKind, DiagnosticLog};
use crate::periodic::{self, NO_PERIOD, PERIODIC_FAMILY};
use heck::ToKebabCase;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::debug;

/// Name of the default value pointing at a class's include template.
pub const INCLUDE_FILE_FIELD: &str = "includeFile";

/// Root class of chat notes.
pub const CHAT_FAMILY: &str = "chat";

/// Model-call parameters injected as default values of chat notes.
pub const CHAT_PARAMS: [&str; 6] = [
    "temperature",
    "top_p",
    "presence_penalty",
    "frequency_penalty",
    "stream",
    "n",
];

// Used when the class does not set the parameter.
fn chat_fallback(name: &str) -> Value {
    match name {
        "temperature" => json!(0.1),
        "stream" => json!(true),
        _ => json!(1),
    }
}

const CHAT_IGNORE_FIELDS: [&str; 6] = [
    "stop", // null default value
    "top_p",
    "presence_penalty",
    "frequency_penalty",
    "stream",
    "n",
];

// Stripped from file name suffixes.
const ILLEGAL_TITLE_CHARS: &[char] = &[
    ':', '?', '!', '|', '#', '‘', '’', '\'', '"', '.', ',', '+', '%', '&', '=', '(', ')', '\\', '/',
];

/// Which specialized computation a class gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsVariant {
    Periodic,
    Chat,
    Default,
}

type VariantFn = fn(&OptionsFactory, &mut RecognizedFields, &mut PromptOptions);

impl OptionsVariant {
    /// Variant for the root of a class chain (the class itself for roots).
    pub fn for_family(family: &str) -> Self {
        match family {
            PERIODIC_FAMILY => OptionsVariant::Periodic,
            CHAT_FAMILY => OptionsVariant::Chat,
            _ => OptionsVariant::Default,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionsVariant::Periodic => "periodic",
            OptionsVariant::Chat => "chat",
            OptionsVariant::Default => "default",
        }
    }

    fn computation(self) -> VariantFn {
        match self {
            OptionsVariant::Periodic => OptionsFactory::compute_periodic,
            OptionsVariant::Chat => OptionsFactory::compute_chat,
            OptionsVariant::Default => OptionsFactory::compute_default,
        }
    }
}

/// `{name, value}` pair applied to a field without prompting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultValue {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl DefaultValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Prompt template locations for chat notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatParams {
    pub system_prompts: String,
    pub prompt_templates: String,
}

/// What the note-creation flow needs to know to prompt for a new note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptOptions {
    #[serde(rename = "type")]
    pub type_name: String,
    pub variant: OptionsVariant,
    pub date_fmt: String,
    pub title_sep: String,
    pub title_prefix: String,
    pub title_suffix: String,
    /// Chain the words of computed suffixes with dashes.
    pub title_suffix_stringify: bool,
    pub prompt_for_title: bool,
    pub prompt_for_prefix: bool,
    pub prompt_for_suffix: bool,
    pub prompt_for_alias: bool,
    pub prompt_for_task: bool,
    /// Answer "yes" to task prompts.
    pub task_assume_yes: bool,
    pub prompt_for_attachment: bool,
    pub prompt_for_project: bool,
    pub prompt_for_goal: bool,
    pub prompt_for_subfolder: bool,
    pub progress_bar_view: String,
    pub files_paths: Vec<String>,
    pub default_values: Vec<DefaultValue>,
    /// Fields never prompted for; their defaults apply without confirmation.
    pub ignore_fields: StringSet,
    pub include_default_templates: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatParams>,
    /// Resolved fields with no meaning to the options themselves (`url`, `selector`...).
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl PromptOptions {
    /// `prefix + sep + suffix`, or just the suffix when there is no prefix.
    pub fn title(&self) -> String {
        if self.title_prefix.is_empty() {
            self.title_suffix.clone()
        } else {
            format!("{}{}{}", self.title_prefix, self.title_sep, self.title_suffix)
        }
    }

    /// First default value configured for `field`.
    pub fn value_for_field(&self, field: &str) -> Option<&Value> {
        self.default_values
            .iter()
            .find(|dv| dv.name == field)
            .map(|dv| &dv.value)
    }

    pub fn ignores(&self, field: &str) -> bool {
        self.ignore_fields.has(field)
    }

    /// Title suffix computed from free text (a page title, a prompt answer).
    pub fn suffix_from_text(&self, text: &str) -> String {
        let sanitized: String = text
            .chars()
            .filter(|c| !ILLEGAL_TITLE_CHARS.contains(c))
            .collect::<String>()
            .to_lowercase();
        let collapsed = sanitized.split_whitespace().collect::<Vec<_>>().join(" ");
        if self.title_suffix_stringify {
            collapsed.to_kebab_case()
        } else {
            collapsed
        }
    }
}

/// What the note body needs to list related notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewOptions {
    #[serde(rename = "type")]
    pub type_name: String,
    pub title: String,
    /// Days covered: -1 none, 0 one day, 7 one week...
    pub period: i64,
    pub linked: bool,
    pub tags: StringSet,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// The recognized keys of a resolved class.
#[derive(Debug, Default, Deserialize)]
struct RecognizedFields {
    date_fmt: Option<String>,
    title_sep: Option<String>,
    title_prefix: Option<String>,
    title_suffix: Option<String>,
    title_suffix_stringify: Option<bool>,
    prompt_for_title: Option<bool>,
    prompt_for_prefix: Option<bool>,
    prompt_for_suffix: Option<bool>,
    prompt_for_alias: Option<bool>,
    prompt_for_task: Option<bool>,
    task_assume_yes: Option<bool>,
    prompt_for_attachment: Option<bool>,
    prompt_for_project: Option<bool>,
    prompt_for_goal: Option<bool>,
    prompt_for_subfolder: Option<bool>,
    progress_bar_view: Option<String>,
    files_paths: Option<Vec<String>>,
    default_values: Option<Vec<DefaultValue>>,
    ignore_fields: Option<Value>,
    include_default_templates: Option<bool>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ViewFields {
    period: Option<i64>,
    linked: Option<bool>,
    tags: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Builds prompt and view options from resolved classes.
pub struct OptionsFactory {
    config: AppConfig,
    files: Arc<dyn FileSystem>,
    periods: Arc<dyn PeriodFormatLookup>,
    dates: Arc<dyn DateFormatter>,
    diagnostics: DiagnosticLog,
}

impl OptionsFactory {
    /// Factory over `files`, with period formats taken from `config` and the
    /// local clock.
    pub fn new(config: AppConfig, files: Arc<dyn FileSystem>) -> Self {
        let periods = StaticPeriodFormats::new(config.period_formats.clone());
        Self {
            config,
            files,
            periods: Arc::new(periods),
            dates: Arc::new(ChronoDateFormatter::new()),
            diagnostics: DiagnosticLog::new(),
        }
    }

    pub fn with_period_formats(mut self, periods: Arc<dyn PeriodFormatLookup>) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_date_formatter(mut self, dates: Arc<dyn DateFormatter>) -> Self {
        self.dates = dates;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticLog) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Prompt options for a resolved class.
    ///
    /// The only suspension point is the include template existence check;
    /// its failure is returned, not swallowed.
    pub async fn create_prompt_options(
        &self,
        resolved: &ResolvedTypeConfig,
    ) -> EngineResult<PromptOptions> {
        let type_name = resolved.type_name();
        let variant = OptionsVariant::for_family(resolved.family());
        let mut fields = recognized_fields(resolved)?;

        let date_fmt = fields
            .date_fmt
            .clone()
            .unwrap_or_else(|| self.config.date_fmt.clone());
        let title_prefix = fields
            .title_prefix
            .clone()
            .unwrap_or_else(|| self.dates.format_today(&date_fmt));
        let title_suffix = fields
            .title_suffix
            .clone()
            .unwrap_or_else(|| type_name.to_string());

        let mut ignore_fields: StringSet = DEFAULT_IGNORE_FIELDS.into_iter().collect();
        if let Some(ref configured) = fields.ignore_fields {
            ignore_fields
                .add(configured)
                .map_err(|e| e.with_type(type_name))?;
        }

        let mut options = PromptOptions {
            type_name: type_name.to_string(),
            variant,
            date_fmt,
            title_sep: fields
                .title_sep
                .clone()
                .unwrap_or_else(|| self.config.title_sep.clone()),
            title_prefix,
            title_suffix,
            title_suffix_stringify: fields.title_suffix_stringify.unwrap_or(false),
            prompt_for_title: fields.prompt_for_title.unwrap_or(true),
            prompt_for_prefix: fields.prompt_for_prefix.unwrap_or(false),
            prompt_for_suffix: fields.prompt_for_suffix.unwrap_or(false),
            prompt_for_alias: fields.prompt_for_alias.unwrap_or(true),
            prompt_for_task: fields.prompt_for_task.unwrap_or(false),
            task_assume_yes: fields.task_assume_yes.unwrap_or(false),
            prompt_for_attachment: fields.prompt_for_attachment.unwrap_or(false),
            prompt_for_project: fields.prompt_for_project.unwrap_or(false),
            prompt_for_goal: fields.prompt_for_goal.unwrap_or(false),
            prompt_for_subfolder: fields.prompt_for_subfolder.unwrap_or(false),
            progress_bar_view: fields
                .progress_bar_view
                .clone()
                .unwrap_or_else(|| progress_view::PAGE.to_string()),
            files_paths: fields.files_paths.take().unwrap_or_default(),
            default_values: fields.default_values.take().unwrap_or_default(),
            ignore_fields,
            include_default_templates: fields.include_default_templates.unwrap_or(false),
            chat: None,
            extra: Map::new(),
        };

        (variant.computation())(self, &mut fields, &mut options);
        options.extra = fields.extra;

        if options.include_default_templates {
            self.include_template(&mut options).await?;
        }

        debug!(
            class = %type_name,
            variant = variant.as_str(),
            defaults = options.default_values.len(),
            "Built prompt options"
        );
        Ok(options)
    }

    /// View options for a resolved class and the title of the note being built.
    pub fn create_view_options(
        &self,
        resolved: &ResolvedTypeConfig,
        title: &str,
    ) -> EngineResult<ViewOptions> {
        let type_name = resolved.type_name();
        let view: ViewFields = match resolved.view() {
            Some(view) => serde_json::from_value(Value::Object(view.clone())).map_err(|e| {
                EngineError::invalid_config(format!("invalid view of '{}': {}", type_name, e))
                    .with_type(type_name)
            })?,
            None => ViewFields::default(),
        };

        let tags = match view.tags {
            Some(ref tags) => StringSet::try_from(tags).map_err(|e| e.with_type(type_name))?,
            None => StringSet::new(),
        };

        let period = match view.period {
            Some(period) => period,
            None if resolved.family() == PERIODIC_FAMILY => {
                periodic::view_period(type_name, title, self.dates.today())
            }
            None => NO_PERIOD,
        };

        Ok(ViewOptions {
            type_name: type_name.to_string(),
            title: title.to_string(),
            period,
            linked: view.linked.unwrap_or(false),
            tags,
            extra: view.extra,
        })
    }

    fn compute_default(&self, _: &mut RecognizedFields, _: &mut PromptOptions) {}

    fn compute_periodic(&self, fields: &mut RecognizedFields, options: &mut PromptOptions) {
        if let Some(format) = self.periods.format_for(&options.type_name) {
            options.date_fmt = format;
        }
        if fields.title_prefix.is_none() {
            options.title_prefix = String::new();
        }
        if fields.title_suffix.is_none() {
            options.title_suffix = self.dates.format_today(&options.date_fmt);
        }
    }

    fn compute_chat(&self, fields: &mut RecognizedFields, options: &mut PromptOptions) {
        for name in CHAT_PARAMS {
            let value = fields
                .extra
                .remove(name)
                .unwrap_or_else(|| chat_fallback(name));
            if options.value_for_field(name).is_none() {
                options.default_values.push(DefaultValue::new(name, value));
            }
        }
        options.ignore_fields.extend(CHAT_IGNORE_FIELDS);

        let template_root = &self.config.paths.template_root;
        let mut path = |key: &str, fallback: &str| match fields.extra.remove(key) {
            Some(Value::String(path)) => path,
            _ => format!("{}/chat/{}", template_root, fallback),
        };
        let system_prompts = path("system_prompts", "system");
        let prompt_templates = path("prompt_templates", "prompt");
        options.chat = Some(ChatParams {
            system_prompts,
            prompt_templates,
        });
    }

    async fn include_template(&self, options: &mut PromptOptions) -> EngineResult<()> {
        let include_dir = self.config.paths.include_template_dir();
        let path = format!("{}/{}.md", include_dir, options.type_name);

        if !self.files.exists(&path).await? {
            self.diagnostics.debug(
                DiagnosticKind::MissingIncludeTemplate,
                &options.type_name,
                format!("no include template at {}", path),
            );
            return Ok(());
        }

        if options.value_for_field(INCLUDE_FILE_FIELD).is_none() {
            options.default_values.push(DefaultValue::new(
                INCLUDE_FILE_FIELD,
                format!("[[{}/{}]]", include_dir, options.type_name),
            ));
        }
        Ok(())
    }
}

fn recognized_fields(resolved: &ResolvedTypeConfig) -> EngineResult<RecognizedFields> {
    let mut map = resolved.fields().clone();
    map.remove(super::field_op::VIEW_KEY);
    serde_json::from_value(Value::Object(map)).map_err(|e| {
        EngineError::invalid_config(format!(
            "invalid options for '{}': {}",
            resolved.type_name(),
            e
        ))
        .with_type(resolved.type_name())
    })
}
