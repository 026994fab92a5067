use std::fmt::Write;

use crate::models::Task;

const INDEX: &str = include_str!("../static/index.html");

/// Renders the task page with an optional error banner.
pub fn render_index(tasks: &[Task], error: Option<&str>) -> String {
    let banner = match error {
        Some(message) => format!(r#"<p class="error">{}</p>"#, escape(message)),
        None => String::new(),
    };

    let mut rows = String::new();
    for task in tasks {
        let class = if task.completed { "task completed" } else { "task" };
        let action = if task.completed {
            String::new()
        } else {
            format!(r#"<a href="/tasks/{}/complete">complete</a> "#, task.id)
        };
        // writing into a String cannot fail
        let _ = writeln!(
            rows,
            r#"      <tr class="{class}"><td>{id}</td><td>{title}</td><td>{description}</td><td>{due}</td><td>{done}</td><td>{action}<a href="/tasks/{id}/delete">delete</a></td></tr>"#,
            id = task.id,
            title = escape(&task.title),
            description = escape(&task.description),
            due = escape(&task.due_date),
            done = if task.completed { "yes" } else { "no" },
        );
    }

    INDEX
        .replace("{{error}}", &banner)
        .replace("{{tasks}}", &rows)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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
