//! Workspace switcher and focused-window title.

use barline_runtime::{Binding, BindingScope, map_each};

use crate::action::Action;
use crate::fragment::Fragment;
use crate::state::{Client, CompositorState, Workspace};

use super::{Widget, truncate};

const TITLE_MAX: usize = 50;

/// Normal workspaces (positive ids) in ascending order, each paired with
/// whether it is focused. Special workspaces are skipped.
#[must_use]
pub fn workspace_entries(list: &[Workspace], focused: Option<i32>) -> Vec<(i32, bool)> {
    let mut entries: Vec<(i32, bool)> = list
        .iter()
        .filter(|ws| ws.id > 0)
        .map(|ws| (ws.id, Some(ws.id) == focused))
        .collect();
    entries.sort_by_key(|(id, _)| *id);
    entries
}

fn workspace_button(id: i32, focused: bool) -> Fragment {
    let class = if focused { "workspace focused" } else { "workspace" };
    Fragment::button(
        Fragment::label(id.to_string()),
        Some(Action::FocusWorkspace(id)),
    )
    .class(class)
}

#[must_use]
pub fn workspaces(state: &CompositorState) -> Widget {
    let mut scope = BindingScope::new();
    let entries = scope.own(Binding::from2(
        &state.workspaces,
        &state.focused_workspace,
        |list, focused| workspace_entries(list, *focused),
    ));
    let buttons = scope.own(map_each(&entries, |entry: &(i32, bool)| {
        workspace_button(entry.0, entry.1)
    }));
    let root = buttons.map(|children| Fragment::row(children.clone()).class("workspaces"));
    Widget::new(root, scope)
}

#[must_use]
pub fn client_title(state: &CompositorState) -> Widget {
    let root = Binding::from_source(&state.focused_client, |client: &Option<Client>| {
        let text = client
            .as_ref()
            .map(|c| truncate(&c.title, TITLE_MAX))
            .unwrap_or_default();
        Fragment::label(text)
            .class("client-title")
            .visible(client.is_some())
    });
    Widget::new(root, BindingScope::new())
}
