//! HTML fragments for the panel webview, plus the plain-text form of the
//! current cards that chat requests use as grounding.

use crate::aggregator::{ContextGroup, ContextRecord};

use super::state::ViewState;

const NO_CONTEXT: &str = "No context found for this selection.";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Fragment for the given view. The host wraps it in its page shell.
pub fn render_html(view: &ViewState) -> String {
    match view {
        ViewState::Welcome => concat!(
            "<div class=\"welcome\">",
            "<h2>ContextSync</h2>",
            "<p>Select code and run <b>Explain Intent</b> or <b>Show Context</b> ",
            "to see related Slack, Jira, Confluence and Notion discussions.</p>",
            "</div>"
        )
        .to_string(),
        ViewState::Loading => {
            "<div class=\"loading\"><div class=\"spinner\"></div><p>Gathering context...</p></div>"
                .to_string()
        }
        ViewState::Error { message } => {
            format!("<div class=\"error\"><p>{}</p></div>", escape_html(message))
        }
        // Markdown is rendered client-side; ship it escaped.
        ViewState::ContentMarkdown { markdown } => format!(
            "<div id=\"markdown-content\" class=\"markdown\">{}</div>",
            escape_html(markdown)
        ),
        ViewState::ContentCards { groups } => render_cards(groups),
    }
}

fn render_cards(groups: &[ContextGroup]) -> String {
    let mut html = String::from("<div class=\"cards-container\">");
    if groups.is_empty() {
        html.push_str(&format!("<p class=\"empty\">{}</p>", NO_CONTEXT));
    }
    for group in groups {
        html.push_str(&format!(
            "<div class=\"group {}\"><div class=\"group-header\"><span class=\"icon\">{}</span> {} <span class=\"count\">{}</span></div>",
            escape_html(&group.source.key().to_lowercase()),
            group.source.icon(),
            escape_html(group.source.label()),
            group.len()
        ));
        for record in &group.records {
            html.push_str(&render_card(record));
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}

fn render_card(record: &ContextRecord) -> String {
    let mut card = format!(
        "<div class=\"card\"><div class=\"card-title\">{}</div>",
        escape_html(&record.title_or_user)
    );
    // a zero score means the engine did not send one
    if record.relevance_score > 0.0 {
        card.push_str(&format!(
            "<span class=\"card-score\">{:.0}%</span>",
            record.relevance_score * 100.0
        ));
    }
    card.push_str(&format!(
        "<div class=\"card-summary\">{}</div>",
        escape_html(&record.content_summary)
    ));
    if !record.related_code_files.is_empty() {
        let files: Vec<String> = record.related_code_files.iter().map(|f| escape_html(f)).collect();
        card.push_str(&format!("<div class=\"card-files\">{}</div>", files.join(", ")));
    }
    if let Some(url) = &record.url {
        card.push_str(&format!(
            "<a class=\"card-link\" href=\"{}\">Open in {}</a>",
            escape_html(url),
            escape_html(record.source.label())
        ));
    }
    card.push_str("</div>");
    card
}

/// Plain text of the cards, one block per source group
pub fn context_text(groups: &[ContextGroup]) -> String {
    let mut text = String::new();
    for group in groups {
        text.push_str(&format!("{} ({})\n", group.source.label(), group.len()));
        for record in &group.records {
            text.push_str(&format!("- {}: {}\n", record.title_or_user, record.content_summary));
            if let Some(url) = &record.url {
                text.push_str(&format!("  {}\n", url));
            }
        }
    }
    text
}
