//! HTML pages shown in the browser after the redirect.

use crate::messages::Messages;

/// Data rendered into the callback page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub title: String,
    pub lines: Vec<String>,
    pub error_description: Option<String>,
}

impl Page {
    pub fn success(messages: &Messages) -> Self {
        Self {
            title: messages.success_title.to_string(),
            lines: messages.success_lines.iter().map(|l| l.to_string()).collect(),
            error_description: None,
        }
    }

    /// Error page whose description reads `"<description>: <cause>"`.
    pub fn error(messages: &Messages, description: &str, cause: &dyn std::fmt::Display) -> Self {
        Self {
            title: messages.error_title.to_string(),
            lines: Vec::new(),
            error_description: Some(format!("{}: {}", description, cause)),
        }
    }

    pub fn render(&self, messages: &Messages) -> String {
        let mut body = String::new();
        for line in &self.lines {
            body.push_str(&format!("      <p>{}</p>\n", escape_html(line)));
        }
        if let Some(desc) = &self.error_description {
            body.push_str(&format!(
                "      <p class=\"error\">{}</p>\n",
                escape_html(desc)
            ));
        }

        format!(
            r#"<!DOCTYPE html>
<html lang="{lang}">
  <head>
    <meta charset="utf-8">
    <title>Nimbus - {title}</title>
    <style>
      body {{ font-family: sans-serif; margin: 4rem auto; max-width: 36rem; color: #1f2933; }}
      h1 {{ font-size: 1.6rem; }}
      .error {{ color: #b42318; font-family: monospace; white-space: pre-wrap; }}
      footer {{ margin-top: 3rem; font-size: 0.85rem; }}
    </style>
  </head>
  <body>
    <main>
      <h1>{title}</h1>
{body}    </main>
    <footer>
      <a href="/term">{terms}</a> · <a href="/privacy">{privacy}</a>
    </footer>
  </body>
</html>
"#,
            lang = messages.locale.code(),
            title = escape_html(&self.title),
            body = body,
            terms = escape_html(messages.terms),
            privacy = escape_html(messages.privacy),
        )
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
