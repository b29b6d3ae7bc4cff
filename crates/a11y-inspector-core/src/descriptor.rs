//! Attribute extraction for a single node.

use std::fmt::Write as _;

use crate::lease::Lease;
use crate::platform::NodeFlags;
use crate::platform::NodeHandle;
use crate::platform::ReportedAction;
use crate::record::CheckState;
use crate::record::NodeRecord;
use crate::record::Visibility;

const UNKNOWN_ROLE: &str = "??";

/// Builds the sparse attribute record for `node`, without children.
///
/// Reads only; the caller keeps ownership of `node`. A labeling node, if
/// any, is acquired and released here.
pub fn describe<H: NodeHandle>(node: &H) -> NodeRecord {
    let class_name = node.class_name();
    let role_description = node.role_description();
    let mut record = NodeRecord::bare(
        node.identity(),
        role_name(class_name.as_deref(), role_description.as_deref()),
    );

    if !node.is_visible_to_user() {
        record.visibility = Some(Visibility::Invisible);
    }

    let bounds = node.bounds_in_screen();
    record.x1 = bounds.left;
    record.y1 = bounds.top;
    record.x2 = bounds.right;
    record.y2 = bounds.bottom;

    record.pane_title = trimmed(node.pane_title());
    record.links = node
        .clickable_spans()
        .into_iter()
        .filter_map(|span| trimmed(Some(span)))
        .collect();
    record.text = trimmed(node.text());

    if let Some(label) = node.labeled_by().map(Lease::new) {
        record.labeled_by = labeled_by_text(&*label);
        record.labeled_by_id = Some(label.identity());
    }

    record.hint = trimmed(node.hint_text());
    record.content = trimmed(node.content_description());
    record.state = state_text(node.state(), node.state_description());

    if node.is_checkable() {
        record.checkable = Some(if node.is_checked() {
            CheckState::Checked
        } else {
            CheckState::NotChecked
        });
    }

    record.actions = ordered_actions(&node.actions());
    record.properties = property_names(node.flags());
    record.collection_info = node
        .collection_info()
        .map(|info| format!("Rows: {}, Columns: {}", info.row_count, info.column_count));
    record.heading = node.is_heading();
    record.collection_item_info = node.collection_item_info().map(|item| {
        format!("Row: {}, Column: {}", item.row_index, item.column_index)
    });

    record
}

/// `"Button"` for `android.widget.Button`, `"Button (Toggle)"` with a role
/// description.
pub fn role_name(class_name: Option<&str>, role_description: Option<&str>) -> String {
    let Some(class_name) = class_name.map(str::trim).filter(|c| !c.is_empty()) else {
        return UNKNOWN_ROLE.to_string();
    };
    let simple = class_name.rsplit('.').next().unwrap_or(class_name);

    match role_description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) => format!("{simple} ({description})"),
        None => simple.to_string(),
    }
}

/// Named actions in fixed priority order, regardless of reported order.
/// Unnamed platform actions are dropped.
pub fn ordered_actions(actions: &[ReportedAction]) -> Vec<String> {
    let mut known: Vec<(u8, String)> = actions
        .iter()
        .filter_map(|action| {
            let priority = action.kind.priority()?;
            let name = action.kind.name()?;
            let text = match action.label.as_deref().filter(|l| !l.is_empty()) {
                Some(label) => format!("{name} ({label})"),
                None => name.to_string(),
            };
            Some((priority, text))
        })
        .collect();
    known.sort_by_key(|(priority, _)| *priority);
    known.into_iter().map(|(_, text)| text).collect()
}

fn property_names(flags: NodeFlags) -> Vec<String> {
    let table = [
        (flags.focusable, "focusable"),
        (flags.screen_reader_focusable, "screen reader focusable"),
        (flags.focused, "focused"),
        (flags.selected, "selected"),
        (flags.scrollable, "scrollable"),
        (flags.clickable, "clickable"),
        (flags.long_clickable, "long clickable"),
        (flags.accessibility_focused, "accessibility focused"),
        (!flags.enabled, "disabled"),
    ];
    table
        .into_iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| name.to_string())
        .collect()
}

fn labeled_by_text<H: NodeHandle>(label: &H) -> Option<String> {
    trimmed(label.content_description()).or_else(|| trimmed(label.text()))
}

fn state_text(state: Option<String>, description: Option<String>) -> Option<String> {
    let state = trimmed(state)?;
    match description.filter(|d| !d.is_empty()) {
        Some(description) => Some(format!("{state} ({description})")),
        None => Some(state),
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Compact one-line rendering of a node for trace logs.
pub fn describe_line<H: NodeHandle>(node: &H) -> String {
    let mut line = String::new();
    let role = role_name(
        node.class_name().as_deref(),
        node.role_description().as_deref(),
    );
    let _ = write!(line, "{} {}", node.window_id(), role);

    if !node.is_visible_to_user() {
        line.push_str(":invisible");
    }

    let b = node.bounds_in_screen();
    let _ = write!(line, ":({}, {} - {}, {})", b.left, b.top, b.right, b.bottom);

    if let Some(pane) = trimmed(node.pane_title()) {
        let _ = write!(line, ":PANE{{{pane}}}");
    }
    if let Some(text) = trimmed(node.text()) {
        let _ = write!(line, ":TEXT{{{text}}}");
    }
    if let Some(content) = trimmed(node.content_description()) {
        let _ = write!(line, ":CONTENT{{{content}}}");
    }
    if let Some(state) = trimmed(node.state()) {
        let _ = write!(line, ":STATE{{{state}}}");
    }
    if node.is_checkable() {
        line.push_str(if node.is_checked() {
            ":checked"
        } else {
            ":not checked"
        });
    }

    let mut kinds: Vec<_> = node
        .actions()
        .into_iter()
        .filter_map(|a| a.kind.priority().map(|p| (p, a.kind)))
        .collect();
    kinds.sort_by_key(|(p, _)| *p);
    kinds.dedup_by_key(|(p, _)| *p);
    if !kinds.is_empty() {
        let tags: Vec<&str> = kinds.iter().filter_map(|(_, k)| k.tag()).collect();
        let _ = write!(line, "(action:{})", tags.join("/"));
    }

    let flags = node.flags();
    let markers = [
        (flags.focusable, ":focusable"),
        (flags.screen_reader_focusable, ":screenReaderfocusable"),
        (flags.focused, ":focused"),
        (flags.selected, ":selected"),
        (flags.scrollable, ":scrollable"),
        (flags.clickable, ":clickable"),
        (flags.long_clickable, ":longClickable"),
        (flags.accessibility_focused, ":accessibilityFocused"),
        (!flags.enabled, ":disabled"),
    ];
    for (set, marker) in markers {
        if set {
            line.push_str(marker);
        }
    }

    if let Some(info) = node.collection_info() {
        let _ = write!(line, ":collection#R{}C{}", info.row_count, info.column_count);
    }
    let item = node.collection_item_info();
    if node.is_heading() {
        line.push_str(":heading");
    } else if item.is_some() {
        line.push_str(":item");
    }
    if let Some(item) = item {
        let _ = write!(line, "#r{}c{}", item.row_index, item.column_index);
    }

    line.replace(['\n', '\r'], "")
}
