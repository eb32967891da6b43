//! The whole bar: three sections plus the control-center popup.

use barline_runtime::{Binding, BindingScope, Subscription};

use crate::fragment::Fragment;
use crate::state::BarState;

use super::buttons::{control_center_toggle, launcher, notifications, power, wallpaper};
use super::clock::{clock, mood};
use super::compositor::{client_title, workspaces};
use super::control_center::control_center;
use super::media::media;
use super::sensors::{cpu, gpu, ram, temperature};
use super::system::{battery, idle_inhibitor, network, tray, volume};
use super::weather::weather;
use super::{Widget, WidgetEnv};

const SECTION_SEPARATOR: &str = " | ";

/// A built bar. Dropping it releases every widget.
pub struct Bar {
    root: Binding<Fragment>,
    scope: BindingScope,
    widgets: Vec<Widget>,
}

fn section(scope: &mut BindingScope, class: &str, widgets: &[Widget]) -> Binding<Fragment> {
    let roots: Vec<Binding<Fragment>> = widgets.iter().map(|w| w.root.clone()).collect();
    let children = scope.own(Binding::collect(&roots));
    let class = class.to_owned();
    scope.own(children.map(move |children| Fragment::row(children.clone()).class(&class)))
}

impl Bar {
    #[must_use]
    pub fn build(env: &WidgetEnv, state: &BarState) -> Self {
        let left = vec![
            launcher(),
            workspaces(&state.compositor),
            client_title(&state.compositor),
        ];
        let center = vec![clock(env), media(state)];
        let right = vec![
            wallpaper(),
            weather(env),
            cpu(env),
            ram(env),
            temperature(env),
            gpu(env),
            volume(&state.audio),
            network(&state.network),
            battery(&state.battery),
            tray(&state.tray),
            control_center_toggle(),
            notifications(),
            idle_inhibitor(&state.ui),
            mood(env),
            power(),
        ];
        let popup = control_center(state);

        let mut scope = BindingScope::new();
        let sections = [
            section(&mut scope, "left", &left),
            section(&mut scope, "center", &center),
            section(&mut scope, "right", &right),
            popup.root.clone(),
        ];
        let all = scope.own(Binding::collect(&sections));
        let root = scope.own(all.map(|sections| Fragment::row(sections.clone()).class("bar")));

        let mut widgets = left;
        widgets.extend(center);
        widgets.extend(right);
        widgets.push(popup);
        Self {
            root,
            scope,
            widgets,
        }
    }

    #[must_use]
    pub fn fragment(&self) -> Fragment {
        self.root.get()
    }

    /// Current bar as text. See [`render_bar`].
    #[must_use]
    pub fn render(&self) -> String {
        self.root.with(render_bar)
    }

    /// Call `f` with each new bar fragment.
    pub fn subscribe(&self, f: impl Fn(&Fragment) + 'static) -> Subscription {
        self.root.subscribe(f)
    }

    /// Number of widgets on the bar, popup included.
    #[must_use]
    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }
}

impl Drop for Bar {
    fn drop(&mut self) {
        self.scope.clear();
        self.widgets.clear();
    }
}

impl std::fmt::Debug for Bar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bar")
            .field("widgets", &self.widgets.len())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Non-empty sections joined by `" | "`. A visible popup goes on a second
/// line.
#[must_use]
pub fn render_bar(bar: &Fragment) -> String {
    let Fragment::Row { children, .. } = bar else {
        return bar.render();
    };
    let (sections, popup) = children.split_at(children.len().min(3));
    let mut line = sections
        .iter()
        .map(Fragment::render)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR);
    for extra in popup {
        let text = extra.render();
        if !text.is_empty() {
            line.push('\n');
            line.push_str(&text);
        }
    }
    line
}
