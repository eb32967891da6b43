//! The rendered unit of the bar.
//!
//! A [`Fragment`] is a plain data tree: labels, icons, buttons and rows, each
//! with a class list, an optional tooltip and a visibility flag. Widgets
//! derive fragments from state; the bar renders the tree to one text line
//! with [`Fragment::render`], or serializes it as JSON.

use serde::Serialize;

use crate::action::Action;

/// Attributes shared by every fragment kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attrs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    pub visible: bool,
}

impl Default for Attrs {
    fn default() -> Self {
        Self {
            classes: Vec::new(),
            tooltip: None,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    Empty,
    Label {
        text: String,
        #[serde(flatten)]
        attrs: Attrs,
    },
    Icon {
        name: String,
        #[serde(flatten)]
        attrs: Attrs,
    },
    Button {
        child: Box<Fragment>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<Action>,
        #[serde(flatten)]
        attrs: Attrs,
    },
    Row {
        children: Vec<Fragment>,
        #[serde(flatten)]
        attrs: Attrs,
    },
}

impl Fragment {
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::Label {
            text: text.into(),
            attrs: Attrs::default(),
        }
    }

    #[must_use]
    pub fn icon(name: impl Into<String>) -> Self {
        Self::Icon {
            name: name.into(),
            attrs: Attrs::default(),
        }
    }

    #[must_use]
    pub fn button(child: Fragment, action: Option<Action>) -> Self {
        Self::Button {
            child: Box::new(child),
            action,
            attrs: Attrs::default(),
        }
    }

    #[must_use]
    pub fn row(children: Vec<Fragment>) -> Self {
        Self::Row {
            children,
            attrs: Attrs::default(),
        }
    }

    /// Add a CSS-style class. Accepts space-separated lists.
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        if let Some(attrs) = self.attrs_mut() {
            attrs
                .classes
                .extend(class.split_whitespace().map(str::to_owned));
        }
        self
    }

    #[must_use]
    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        if let Some(attrs) = self.attrs_mut() {
            attrs.tooltip = Some(tooltip.into());
        }
        self
    }

    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        if let Some(attrs) = self.attrs_mut() {
            attrs.visible = visible;
        }
        self
    }

    #[must_use]
    pub fn attrs(&self) -> Option<&Attrs> {
        match self {
            Self::Empty => None,
            Self::Label { attrs, .. }
            | Self::Icon { attrs, .. }
            | Self::Button { attrs, .. }
            | Self::Row { attrs, .. } => Some(attrs),
        }
    }

    fn attrs_mut(&mut self) -> Option<&mut Attrs> {
        match self {
            Self::Empty => None,
            Self::Label { attrs, .. }
            | Self::Icon { attrs, .. }
            | Self::Button { attrs, .. }
            | Self::Row { attrs, .. } => Some(attrs),
        }
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attrs()
            .is_some_and(|attrs| attrs.classes.iter().any(|c| c == class))
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.attrs().is_some_and(|attrs| attrs.visible)
    }

    #[must_use]
    pub fn tooltip_text(&self) -> Option<&str> {
        self.attrs().and_then(|attrs| attrs.tooltip.as_deref())
    }

    /// Render to a single text line. Hidden and empty fragments render as
    /// nothing, and rows skip them.
    #[must_use]
    pub fn render(&self) -> String {
        if !self.is_visible() {
            return String::new();
        }
        match self {
            Self::Empty => String::new(),
            Self::Label { text, .. } => text.clone(),
            Self::Icon { name, .. } => icon_glyph(name).to_owned(),
            Self::Button { child, .. } => child.render(),
            Self::Row { children, .. } => children
                .iter()
                .map(Fragment::render)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Visible fragments carrying `class`, depth first.
    #[must_use]
    pub fn find_by_class(&self, class: &str) -> Vec<&Fragment> {
        let mut found = Vec::new();
        self.walk(&mut |fragment| {
            if fragment.has_class(class) {
                found.push(fragment);
            }
        });
        found
    }

    /// Actions of every visible button, depth first.
    #[must_use]
    pub fn actions(&self) -> Vec<&Action> {
        let mut found = Vec::new();
        self.walk(&mut |fragment| {
            if let Self::Button {
                action: Some(action),
                ..
            } = fragment
            {
                found.push(action);
            }
        });
        found
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Fragment)) {
        if !self.is_visible() {
            return;
        }
        visit(self);
        match self {
            Self::Button { child, .. } => child.walk(visit),
            Self::Row { children, .. } => {
                for child in children {
                    child.walk(visit);
                }
            }
            _ => {}
        }
    }
}

/// Text glyph for a symbolic icon name.
#[must_use]
pub fn icon_glyph(name: &str) -> &'static str {
    const EXACT: &[(&str, &str)] = &[
        ("view-app-grid-symbolic", "▦"),
        ("media-playback-pause-symbolic", "⏸"),
        ("media-playback-start-symbolic", "▶"),
        ("media-skip-backward-symbolic", "⏮"),
        ("media-skip-forward-symbolic", "⏭"),
        ("media-playlist-shuffle-symbolic", "🔀"),
        ("cpu-symbolic", "⚙"),
        ("drive-harddisk-symbolic", "▤"),
        ("weather-clear-symbolic", "☀"),
        ("weather-clear-night-symbolic", "☾"),
        ("video-display-symbolic", "▭"),
        ("preferences-system-symbolic", "≡"),
        ("preferences-system-notifications-symbolic", "🔔"),
        ("system-shutdown-symbolic", "⏻"),
        ("preferences-desktop-wallpaper-symbolic", "🖼"),
        ("bluetooth-symbolic", "ᛒ"),
        ("display-brightness-symbolic", "☼"),
        ("audio-volume-muted-symbolic", "🔇"),
        ("audio-volume-low-symbolic", "🔈"),
        ("audio-volume-medium-symbolic", "🔉"),
        ("audio-volume-high-symbolic", "🔊"),
    ];
    const PREFIX: &[(&str, &str)] = &[
        ("network-wireless", "📶"),
        ("network-wired", "🖧"),
        ("battery", "🔋"),
        ("audio-volume", "🔊"),
    ];
    if let Some((_, glyph)) = EXACT.iter().find(|(n, _)| *n == name) {
        return *glyph;
    }
    PREFIX
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map_or("·", |(_, glyph)| *glyph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_skips_hidden_and_empty() {
        let row = Fragment::row(vec![
            Fragment::label("a"),
            Fragment::Empty,
            Fragment::label("hidden").visible(false),
            Fragment::row(vec![]),
            Fragment::label("b"),
        ]);
        assert_eq!(row.render(), "a b");
    }

    #[test]
    fn hidden_row_renders_nothing() {
        let row = Fragment::row(vec![Fragment::label("x")]).visible(false);
        assert_eq!(row.render(), "");
        assert!(row.actions().is_empty());
    }

    #[test]
    fn icons_render_as_glyphs() {
        assert_eq!(Fragment::icon("media-playback-pause-symbolic").render(), "⏸");
        assert_eq!(Fragment::icon("network-wireless-signal-good-symbolic").render(), "📶");
        assert_eq!(Fragment::icon("no-such-icon").render(), "·");
    }

    #[test]
    fn classes_split_on_whitespace() {
        let button = Fragment::button(Fragment::label("1"), None).class("workspace focused");
        assert!(button.has_class("workspace"));
        assert!(button.has_class("focused"));
        assert!(!Fragment::Empty.has_class("workspace"));
    }

    #[test]
    fn builders_ignore_empty() {
        let empty = Fragment::Empty.class("x").tooltip("t").visible(true);
        assert_eq!(empty, Fragment::Empty);
        assert_eq!(empty.render(), "");
    }

    #[test]
    fn find_and_actions_walk_visible_tree() {
        let tree = Fragment::row(vec![
            Fragment::button(Fragment::label("1"), Some(Action::FocusWorkspace(1)))
                .class("workspace"),
            Fragment::button(Fragment::label("2"), Some(Action::FocusWorkspace(2)))
                .class("workspace")
                .visible(false),
        ]);
        assert_eq!(tree.find_by_class("workspace").len(), 1);
        assert_eq!(tree.actions(), vec![&Action::FocusWorkspace(1)]);
    }

    #[test]
    fn json_shape() {
        let frag = Fragment::label("12:00 PM").class("time").tooltip("now");
        let json = serde_json::to_value(&frag).unwrap();
        assert_eq!(json["kind"], "label");
        assert_eq!(json["text"], "12:00 PM");
        assert_eq!(json["classes"][0], "time");
        assert_eq!(json["tooltip"], "now");
        assert_eq!(json["visible"], true);
    }
}
