//! Domain vocabulary shared by the config, pages and suites

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Browser viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Narrow layouts emulate a touch device
    pub fn is_mobile(&self) -> bool {
        self.width < 768
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Viewport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w.trim().parse().map_err(|_| format!("bad width '{}'", w))?;
        let height = h.trim().parse().map_err(|_| format!("bad height '{}'", h))?;
        if width == 0 || height == 0 {
            return Err(format!("viewport must be non-zero, got '{}'", s));
        }
        Ok(Self { width, height })
    }
}

/// Named device class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportPreset {
    Mobile,
    Tablet,
    Desktop,
}

impl ViewportPreset {
    pub const ALL: [ViewportPreset; 3] = [
        ViewportPreset::Mobile,
        ViewportPreset::Tablet,
        ViewportPreset::Desktop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewportPreset::Mobile => "mobile",
            ViewportPreset::Tablet => "tablet",
            ViewportPreset::Desktop => "desktop",
        }
    }

    pub fn default_viewport(&self) -> Viewport {
        match self {
            ViewportPreset::Mobile => Viewport::new(375, 667),
            ViewportPreset::Tablet => Viewport::new(768, 1024),
            ViewportPreset::Desktop => Viewport::new(1280, 800),
        }
    }
}

/// Device profile a test runs under unless it pins its own viewport.
/// `Mobile` also turns on touch emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Project {
    Chromium,
    Mobile,
}

impl Project {
    pub const ALL: [Project; 2] = [Project::Chromium, Project::Mobile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Project::Chromium => "chromium",
            Project::Mobile => "mobile",
        }
    }

    pub fn preset(&self) -> ViewportPreset {
        match self {
            Project::Chromium => ViewportPreset::Desktop,
            Project::Mobile => ViewportPreset::Mobile,
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Project {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chromium" | "desktop" => Ok(Project::Chromium),
            "mobile" => Ok(Project::Mobile),
            other => Err(format!("unknown project '{}'", other)),
        }
    }
}

/// Logical page region. `Contact` is a scroll target only; the sidebar
/// navigation covers the first three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Intro,
    Career,
    Demos,
    Contact,
}

impl Section {
    pub const NAVIGABLE: [Section; 3] = [Section::Intro, Section::Career, Section::Demos];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Intro => "intro",
            Section::Career => "career",
            Section::Demos => "demos",
            Section::Contact => "contact",
        }
    }

    pub fn is_navigable(&self) -> bool {
        Self::NAVIGABLE.contains(self)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "intro" => Ok(Section::Intro),
            "career" => Ok(Section::Career),
            "demos" => Ok(Section::Demos),
            "contact" => Ok(Section::Contact),
            other => Err(format!("unknown section '{}'", other)),
        }
    }
}

/// Color scheme read from `html[data-theme]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Missing or unrecognised attribute values read as dark.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("light") => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

/// Frameworks showcased in the demos section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    Playwright,
    RubyCucumber,
    Codeceptjs,
}

impl Framework {
    pub const ALL: [Framework; 3] = [
        Framework::Playwright,
        Framework::RubyCucumber,
        Framework::Codeceptjs,
    ];

    /// Identifier used in `data-framework` and `card-*` test ids
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Playwright => "playwright",
            Framework::RubyCucumber => "ruby-cucumber",
            Framework::Codeceptjs => "codeceptjs",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External profile links shown in the top bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalLink {
    Github,
    Linkedin,
}

impl ExternalLink {
    pub const ALL: [ExternalLink; 2] = [ExternalLink::Github, ExternalLink::Linkedin];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalLink::Github => "github",
            ExternalLink::Linkedin => "linkedin",
        }
    }
}
