use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ScoutError, ScoutResult};

/// Named UI element, independent of how it is found on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalTarget {
    Body,
    Username,
    Password,
    LoginSubmit,
    PageContent,
    SaveToFavorites,
    MessageInput,
    InviteToConnect,
    SkipForNow,
    SeeNextProfile,
}

impl LogicalTarget {
    pub const ALL: [LogicalTarget; 10] = [
        LogicalTarget::Body,
        LogicalTarget::Username,
        LogicalTarget::Password,
        LogicalTarget::LoginSubmit,
        LogicalTarget::PageContent,
        LogicalTarget::SaveToFavorites,
        LogicalTarget::MessageInput,
        LogicalTarget::InviteToConnect,
        LogicalTarget::SkipForNow,
        LogicalTarget::SeeNextProfile,
    ];

    /// Login-path targets. Failing to find one captures the page before the error propagates.
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            LogicalTarget::Body
                | LogicalTarget::Username
                | LogicalTarget::Password
                | LogicalTarget::LoginSubmit
                | LogicalTarget::PageContent
        )
    }

    /// Config key used under `[selectors]`.
    pub fn key(self) -> &'static str {
        match self {
            LogicalTarget::Body => "body",
            LogicalTarget::Username => "username",
            LogicalTarget::Password => "password",
            LogicalTarget::LoginSubmit => "login_submit",
            LogicalTarget::PageContent => "page_content",
            LogicalTarget::SaveToFavorites => "save_to_favorites",
            LogicalTarget::MessageInput => "message_input",
            LogicalTarget::InviteToConnect => "invite_to_connect",
            LogicalTarget::SkipForNow => "skip_for_now",
            LogicalTarget::SeeNextProfile => "see_next_profile",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.key() == key)
    }
}

impl fmt::Display for LogicalTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogicalTarget::Body => "page body",
            LogicalTarget::Username => "username field",
            LogicalTarget::Password => "password field",
            LogicalTarget::LoginSubmit => "login submit",
            LogicalTarget::PageContent => "profile content container",
            LogicalTarget::SaveToFavorites => "save to favorites control",
            LogicalTarget::MessageInput => "intro message input",
            LogicalTarget::InviteToConnect => "invite to connect control",
            LogicalTarget::SkipForNow => "skip for now control",
            LogicalTarget::SeeNextProfile => "see next profile control",
        };
        f.write_str(label)
    }
}

/// One concrete way of finding an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Name(String),
    Css(String),
    ClassName(String),
    XPath(String),
    TagName(String),
}

impl Locator {
    pub fn id(v: &str) -> Self {
        Locator::Id(v.to_string())
    }
    pub fn name(v: &str) -> Self {
        Locator::Name(v.to_string())
    }
    pub fn css(v: &str) -> Self {
        Locator::Css(v.to_string())
    }
    pub fn class(v: &str) -> Self {
        Locator::ClassName(v.to_string())
    }
    pub fn xpath(v: &str) -> Self {
        Locator::XPath(v.to_string())
    }
    pub fn tag(v: &str) -> Self {
        Locator::TagName(v.to_string())
    }

    /// WebDriver only knows css / xpath / id / link text; everything else is
    /// lowered to a CSS selector.
    pub fn to_css(&self) -> Option<String> {
        match self {
            Locator::Id(_) | Locator::XPath(_) => None,
            Locator::Css(css) => Some(css.clone()),
            Locator::Name(name) => Some(format!("[name=\"{}\"]", css_escape(name))),
            Locator::ClassName(class) => Some(format!(".{class}")),
            Locator::TagName(tag) => Some(tag.clone()),
        }
    }
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(v) => write!(f, "id:{v}"),
            Locator::Name(v) => write!(f, "name:{v}"),
            Locator::Css(v) => write!(f, "css:{v}"),
            Locator::ClassName(v) => write!(f, "class:{v}"),
            Locator::XPath(v) => write!(f, "xpath:{v}"),
            Locator::TagName(v) => write!(f, "tag:{v}"),
        }
    }
}

impl FromStr for Locator {
    type Err = ScoutError;

    /// Parses `strategy:value`, e.g. `css:input[type='email']`.
    fn from_str(s: &str) -> ScoutResult<Self> {
        let (strategy, value) = s
            .split_once(':')
            .ok_or_else(|| ScoutError::Config(format!("locator '{s}' is not strategy:value")))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ScoutError::Config(format!("locator '{s}' has an empty value")));
        }
        match strategy.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(Locator::id(value)),
            "name" => Ok(Locator::name(value)),
            "css" => Ok(Locator::css(value)),
            "class" => Ok(Locator::class(value)),
            "xpath" => Ok(Locator::xpath(value)),
            "tag" => Ok(Locator::tag(value)),
            other => Err(ScoutError::Config(format!("unknown locator strategy '{other}'"))),
        }
    }
}

/// Ordered fallback list for one target. First match wins, so the most
/// specific locator goes first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorChain {
    pub target: LogicalTarget,
    pub locators: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(target: LogicalTarget, locators: Vec<Locator>) -> Self {
        Self { target, locators }
    }

    /// Built-in chain for a target.
    pub fn builtin(target: LogicalTarget) -> Self {
        let locators = match target {
            LogicalTarget::Body => vec![Locator::tag("body")],
            LogicalTarget::Username => vec![
                Locator::id("ycid-input"),
                Locator::name("email"),
                Locator::name("username"),
                Locator::css("input[type='email']"),
                Locator::css("input[placeholder*='email']"),
                Locator::css("input[placeholder*='Email']"),
            ],
            LogicalTarget::Password => vec![
                Locator::id("password-input"),
                Locator::name("password"),
                Locator::css("input[type='password']"),
            ],
            LogicalTarget::LoginSubmit => vec![
                Locator::class("sign-in-button"),
                Locator::css("button[type='submit']"),
                Locator::css("input[type='submit']"),
                Locator::xpath("//button[contains(text(), 'Sign In')]"),
                Locator::xpath("//button[contains(text(), 'Login')]"),
                Locator::xpath("//input[@value='Sign In']"),
                Locator::xpath("//input[@value='Login']"),
            ],
            LogicalTarget::PageContent => vec![Locator::class("page-content")],
            LogicalTarget::SaveToFavorites => {
                vec![Locator::xpath("//div[contains(text(), 'Save to favorites')]")]
            }
            LogicalTarget::MessageInput => vec![Locator::tag("textarea")],
            LogicalTarget::InviteToConnect => {
                vec![Locator::xpath("//button[contains(text(), 'Invite to connect')]")]
            }
            LogicalTarget::SkipForNow => {
                vec![Locator::xpath("//button[contains(text(), 'Skip for now')]")]
            }
            LogicalTarget::SeeNextProfile => {
                vec![Locator::xpath("//button[contains(text(), 'See next profile')]")]
            }
        };
        Self::new(target, locators)
    }
}

/// Every target's chain, with optional per-target overrides from config.
#[derive(Debug, Clone)]
pub struct TargetCatalog {
    chains: HashMap<LogicalTarget, LocatorChain>,
}

impl TargetCatalog {
    pub fn builtin() -> Self {
        let chains = LogicalTarget::ALL
            .into_iter()
            .map(|t| (t, LocatorChain::builtin(t)))
            .collect();
        Self { chains }
    }

    /// Applies `[selectors]` overrides. An override replaces the whole chain.
    pub fn with_overrides(overrides: &HashMap<String, Vec<String>>) -> ScoutResult<Self> {
        let mut catalog = Self::builtin();
        for (key, specs) in overrides {
            let target = LogicalTarget::from_key(key)
                .ok_or_else(|| ScoutError::Config(format!("unknown selector target '{key}'")))?;
            if specs.is_empty() {
                return Err(ScoutError::Config(format!("selector override for '{key}' is empty")));
            }
            let locators = specs
                .iter()
                .map(|s| s.parse::<Locator>())
                .collect::<ScoutResult<Vec<_>>>()?;
            tracing::debug!(ui_target = key, count = locators.len(), "selector chain overridden");
            catalog.chains.insert(target, LocatorChain::new(target, locators));
        }
        Ok(catalog)
    }

    pub fn chain(&self, target: LogicalTarget) -> LocatorChain {
        self.chains
            .get(&target)
            .cloned()
            .unwrap_or_else(|| LocatorChain::builtin(target))
    }
}

impl Default for TargetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
