use crate::gateway::ChatMember;

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Inline mention link that notifies the user even without a username.
pub fn mention_link(member: &ChatMember) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        member.user_id.0,
        escape_html(&member.display_name)
    )
}

/// Tree-style listing of member names:
///
/// ```text
/// ├─Alice
/// ├─Bob
/// └─Carol
/// ```
pub fn tree_lines(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut lines: Vec<String> = names.into_iter().map(|n| format!("├─{n}")).collect();
    if let Some(last) = lines.last_mut() {
        *last = format!("└{}", &last["├".len()..]);
    }
    lines
}
