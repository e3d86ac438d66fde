use crate::catalog::{ElementType, ElementTypes};
use crate::error::HintsError;
use crate::frames::messages::FrameAction;
use crate::hints::assign::CombinePolicy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What activating a hint does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HintsMode {
    #[default]
    Click,
    /// Click, then hint again for the next click
    ManyClick,
    /// Open links in background tabs while hints stay up
    ManyTab,
    BackgroundTab,
    ForegroundTab,
    /// Select the element's text
    Select,
}

/// Where the state machine goes after an activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterActivation {
    Exit,
    /// Start a new collection in the same mode
    Recollect,
    KeepHinting,
}

/// How a chosen element is acted upon
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationPlan {
    /// Done inside the element's frame
    Frame(FrameAction),
    /// Done by the browser
    OpenTab { url: String, foreground: bool },
}

impl HintsMode {
    pub const ALL: [HintsMode; 6] = [
        HintsMode::Click,
        HintsMode::ManyClick,
        HintsMode::ManyTab,
        HintsMode::BackgroundTab,
        HintsMode::ForegroundTab,
        HintsMode::Select,
    ];

    pub fn element_types(self) -> ElementTypes {
        match self {
            HintsMode::Select => ElementTypes::Selectable,
            _ => ElementTypes::Default,
        }
    }

    /// Selecting text is per element, so nothing is combined there
    pub fn combine_policy(self) -> CombinePolicy {
        match self {
            HintsMode::Select => CombinePolicy::Never,
            _ => CombinePolicy::SameUrl,
        }
    }

    pub fn after_activation(self) -> AfterActivation {
        match self {
            HintsMode::ManyClick => AfterActivation::Recollect,
            HintsMode::ManyTab => AfterActivation::KeepHinting,
            HintsMode::Click | HintsMode::BackgroundTab | HintsMode::ForegroundTab | HintsMode::Select => {
                AfterActivation::Exit
            }
        }
    }

    /// Decide how to activate an element. `alt` asks for the mode's
    /// alternate action. Tab modes fall back to clicking elements without a
    /// destination.
    pub fn plan(self, element_type: ElementType, url: Option<&str>, alt: bool) -> ActivationPlan {
        let url = url.filter(|url| !url.starts_with('#') && !url.is_empty());
        let tab = |foreground: bool| match url {
            Some(url) => ActivationPlan::OpenTab {
                url: url.to_string(),
                foreground,
            },
            None => ActivationPlan::Frame(FrameAction::Click),
        };
        match self {
            HintsMode::Select => ActivationPlan::Frame(FrameAction::Select),
            HintsMode::Click | HintsMode::ManyClick if alt => tab(false),
            HintsMode::Click | HintsMode::ManyClick => match element_type {
                ElementType::Textarea => ActivationPlan::Frame(FrameAction::Focus),
                _ => ActivationPlan::Frame(FrameAction::Click),
            },
            HintsMode::BackgroundTab | HintsMode::ManyTab => tab(alt),
            HintsMode::ForegroundTab => tab(!alt),
        }
    }
}

impl fmt::Display for HintsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HintsMode::Click => "click",
            HintsMode::ManyClick => "many-click",
            HintsMode::ManyTab => "many-tab",
            HintsMode::BackgroundTab => "background-tab",
            HintsMode::ForegroundTab => "foreground-tab",
            HintsMode::Select => "select",
        };
        f.write_str(name)
    }
}

impl FromStr for HintsMode {
    type Err = HintsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HintsMode::ALL
            .into_iter()
            .find(|mode| mode.to_string() == s)
            .ok_or_else(|| HintsError::InvalidOptions(format!("unknown hints mode: {}", s)))
    }
}
